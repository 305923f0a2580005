use axum::http::StatusCode;
use serde::Serialize;
use uuid::Uuid;

use crate::gateway::{error::GatewayError, mask};

pub mod api;
pub mod interaction_log;
pub mod status;

pub type Result<T> = std::result::Result<T, ConnectErrorResponse>;

#[derive(Debug, Serialize)]
pub struct ConnectErrorResponse {
    #[serde(skip)]
    code: StatusCode,
    result: bool,
    error: String,
    logs: Vec<interaction_log::InteractionLog>,
}

impl std::error::Error for ConnectErrorResponse {}

impl std::fmt::Display for ConnectErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

impl ConnectErrorResponse {
    pub fn new(code: StatusCode, text: String, logs: Vec<interaction_log::InteractionLog>) -> Self {
        Self {
            code,
            result: false,
            error: text,
            logs,
        }
    }

    pub fn flow_not_found(flow_id: Uuid) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("payment flow {flow_id} not found"),
            vec![],
        )
    }

    /// Provider side failures are reported as a bad gateway, local
    /// configuration problems as internal errors
    pub fn gateway(error: &GatewayError, logs: Vec<interaction_log::InteractionLog>) -> Self {
        let code = match error {
            GatewayError::MissingCredential(_)
            | GatewayError::Credential(_)
            | GatewayError::Configuration(_)
            | GatewayError::Entropy(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::RequestError(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::RequestError(_)
            | GatewayError::GatewayResponse(_)
            | GatewayError::GatewayDeserialization { .. } => StatusCode::BAD_GATEWAY,
        };
        Self::new(code, error.to_string(), logs)
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }
}

impl axum::response::IntoResponse for ConnectErrorResponse {
    fn into_response(self) -> axum::response::Response {
        tracing::debug!(data = %mask::secure_serializable(&self), "Connect API error response payload");
        (self.code, axum::Json(self)).into_response()
    }
}
