use std::fmt::Display;

use crate::{config::Environment, secret::SecretError};

/// Provider error body. Only `message` is relied upon, best effort.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Non-2xx answer from the provider
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ErrorResponse {
    /// Http status of the response
    pub code: u16,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_body(code: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Payment API Error: {code}"));
        Self { code, message }
    }
}

#[derive(Debug)]
pub enum GatewayError {
    MissingCredential(Environment),
    Credential(SecretError),
    Configuration(String),
    Entropy(rand::rand_core::OsError),
    /// Transport failure, kept exactly as the http client reported it
    RequestError(reqwest::Error),
    GatewayResponse(ErrorResponse),
    GatewayDeserialization {
        reason: String,
        /// Raw response body for diagnostics
        body: String,
    },
}

impl GatewayError {
    pub fn decoding(reason: impl Display, body: impl Into<String>) -> Self {
        Self::GatewayDeserialization {
            reason: reason.to_string(),
            body: body.into(),
        }
    }

    /// Http status for protocol errors
    pub fn code(&self) -> Option<u16> {
        match self {
            GatewayError::GatewayResponse(response) => Some(response.code),
            GatewayError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<SecretError> for GatewayError {
    fn from(value: SecretError) -> Self {
        match value {
            SecretError::Missing(env) => Self::MissingCredential(env),
            other => Self::Credential(other),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::RequestError(value)
    }
}

impl From<ErrorResponse> for GatewayError {
    fn from(value: ErrorResponse) -> Self {
        Self::GatewayResponse(value)
    }
}

impl From<rand::rand_core::OsError> for GatewayError {
    fn from(value: rand::rand_core::OsError) -> Self {
        Self::Entropy(value)
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Credential(e) => Some(e),
            GatewayError::RequestError(e) => Some(e),
            _ => None,
        }
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::MissingCredential(env) => write!(
                f,
                "missing credential {} for {env} environment",
                env.credential_name()
            ),
            GatewayError::Credential(e) => write!(f, "credential error: {e}"),
            GatewayError::Configuration(e) => write!(f, "configuration error: {e}"),
            GatewayError::Entropy(e) => write!(f, "failed to generate callback state: {e}"),
            GatewayError::RequestError(e) => write!(f, "http request error: {e}"),
            GatewayError::GatewayResponse(response) => {
                write!(f, "gateway response ({}): {}", response.code, response.message)
            }
            GatewayError::GatewayDeserialization { reason, .. } => {
                write!(f, "gateway response deserialization: {reason}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_from_body() {
        let response = ErrorResponse::from_body(
            400,
            r#"{"errorCode":"InvalidArgument","message":"Invalid amount"}"#,
        );
        assert_eq!(response.code, 400);
        assert_eq!(response.message, "Invalid amount");
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        let response = ErrorResponse::from_body(500, "<html>Internal Server Error</html>");
        assert_eq!(response.message, "Payment API Error: 500");
        let response = ErrorResponse::from_body(502, r#"{"message":""}"#);
        assert_eq!(response.message, "Payment API Error: 502");
    }

    #[test]
    fn missing_secret_becomes_missing_credential() {
        let error: GatewayError = SecretError::Missing(Environment::Dev).into();
        assert!(matches!(error, GatewayError::MissingCredential(Environment::Dev)));
        let error: GatewayError = SecretError::UnexpectedFormat(Environment::Dev).into();
        assert!(matches!(error, GatewayError::Credential(_)));
    }

    #[test]
    fn protocol_error_exposes_code() {
        let error = GatewayError::from(ErrorResponse::from_body(403, "{}"));
        assert_eq!(error.code(), Some(403));
        assert_eq!(error.to_string(), "gateway response (403): Payment API Error: 403");
        assert_eq!(GatewayError::decoding("bad", "{}").code(), None);
    }
}
