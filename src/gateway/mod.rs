use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    config::{Config, Environment, ProviderUrls},
    connect::interaction_log::InteractionSpan,
    correlation::{self, CallbackState},
    gateway::{
        error::{ErrorResponse, GatewayError},
        payin::{PaymentOrder, PaymentRequest, PaymentResponse},
        status::PaymentStatusDetails,
    },
    secret::{Credential, SecretProvider},
};

pub mod auth;
pub mod error;
/// Type conversions between provider responses and connector types
mod from;
/// Requisite masking
pub mod mask;
pub mod payin;
/// Provider status response and status vocabulary
pub mod status;

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Outcome of a successful initiation.
///
/// Nothing inside the gateway remembers `state`; whoever drives the flow must
/// keep it as the expected callback state before sending the user to
/// `redirect_url`.
#[derive(Debug, Clone)]
pub struct InitiatedPayment {
    pub payment_id: String,
    pub ref_id: String,
    pub redirect_url: url::Url,
    pub state: CallbackState,
    /// Raw provider status at creation time
    pub status: String,
}

/// Typed boundary to the provider payments API
#[async_trait]
pub trait PaymentApi: std::fmt::Debug + Send + Sync {
    async fn initiate_payment(
        &self,
        order: &PaymentOrder,
        span: &mut InteractionSpan,
    ) -> Result<InitiatedPayment>;

    async fn payment_status(
        &self,
        payment_id: &str,
        environment: Environment,
        span: &mut InteractionSpan,
    ) -> Result<PaymentStatusDetails>;
}

#[derive(Debug, Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    secrets: Arc<dyn SecretProvider>,
    urls: ProviderUrls,
    callback_url: String,
}

impl PaymentGateway {
    pub fn new(
        client: reqwest::Client,
        secrets: Arc<dyn SecretProvider>,
        urls: ProviderUrls,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            secrets,
            urls,
            callback_url: callback_url.into(),
        }
    }

    pub fn from_config(
        config: &Config,
        secrets: Arc<dyn SecretProvider>,
    ) -> std::result::Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()?;
        Ok(Self::new(
            client,
            secrets,
            config.provider_urls.clone(),
            config.callback_url.as_str(),
        ))
    }

    fn credential(&self, environment: Environment) -> Result<Credential> {
        Ok(self.secrets.credential(environment)?)
    }

    /// `{base}/v2/payments[/{payment_id}]`, the id is percent-encoded as a path segment
    fn endpoint(&self, environment: Environment, payment_id: Option<&str>) -> Result<url::Url> {
        let base = self.urls.base_url(environment);
        let invalid = || GatewayError::Configuration(format!("invalid {environment} base url"));
        let mut url = url::Url::parse(base).map_err(|_| invalid())?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| invalid())?;
            segments.pop_if_empty().extend(["v2", "payments"]);
            if let Some(payment_id) = payment_id {
                segments.push(payment_id);
            }
        }
        Ok(url)
    }

    async fn create(
        &self,
        order: &PaymentOrder,
        span: &mut InteractionSpan,
    ) -> Result<InitiatedPayment> {
        let credential = self.credential(order.environment)?;
        let headers = auth::authenticated_headers(order.environment, &credential, true)?;
        let url = self.endpoint(order.environment, None)?;

        let ref_id = correlation::generate_ref_id();
        let state = correlation::generate_state()?;
        let request = PaymentRequest::new(order, &ref_id, &self.callback_url, state.as_str());

        let secured_request = mask::secure_serializable(&request);
        tracing::debug!(%url, data = %secured_request, "Payment API create payment request");
        span.set_request(url.to_string(), secured_request);

        let res = self
            .client
            .post(url)
            .headers(headers)
            .json(&request)
            .send()
            .await?;
        let body = read_response(res, span).await?;

        let response: PaymentResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::decoding(e, body.as_str()))?;
        if response.payment.initiation.ref_id != ref_id {
            tracing::warn!(
                sent = %ref_id,
                echoed = %response.payment.initiation.ref_id,
                "Provider echoed a different refId"
            );
        }
        InitiatedPayment::try_from((response, state))
            .map_err(|e| GatewayError::decoding(format!("invalid redirect url: {e}"), body))
    }
}

#[async_trait]
impl PaymentApi for PaymentGateway {
    async fn initiate_payment(
        &self,
        order: &PaymentOrder,
        span: &mut InteractionSpan,
    ) -> Result<InitiatedPayment> {
        let result = self.create(order, span).await;
        if let Err(e) = &result {
            span.set_error(e);
        }
        result
    }

    async fn payment_status(
        &self,
        payment_id: &str,
        environment: Environment,
        span: &mut InteractionSpan,
    ) -> Result<PaymentStatusDetails> {
        let result = self.status(payment_id, environment, span).await;
        if let Err(e) = &result {
            span.set_error(e);
        }
        result
    }
}

/// Record the response on the span and split off non-2xx answers
async fn read_response(res: reqwest::Response, span: &mut InteractionSpan) -> Result<String> {
    let status = res.status();
    span.set_response_status(status.as_u16());
    let body = res.text().await?;

    let secured_response = match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => mask::secure_value(&value),
        Err(_) => serde_json::Value::String(body.clone()),
    };
    tracing::debug!(%status, data = %secured_response, "Payment API response");
    span.set_response(secured_response);

    if !status.is_success() {
        return Err(ErrorResponse::from_body(status.as_u16(), &body).into());
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::StaticSecretProvider;

    fn gateway(base: &str) -> PaymentGateway {
        PaymentGateway::new(
            reqwest::Client::new(),
            Arc::new(StaticSecretProvider::new()),
            ProviderUrls::uniform(base),
            "obcheckout://payment-complete",
        )
    }

    #[test]
    fn endpoint_paths() {
        let gateway = gateway("http://127.0.0.1:8080");
        assert_eq!(
            gateway.endpoint(Environment::Sandbox, None).unwrap().as_str(),
            "http://127.0.0.1:8080/v2/payments"
        );
        assert_eq!(
            gateway
                .endpoint(Environment::Sandbox, Some("pm:abc"))
                .unwrap()
                .as_str(),
            "http://127.0.0.1:8080/v2/payments/pm:abc"
        );
    }

    #[test]
    fn payment_id_cannot_escape_path() {
        let gateway = gateway("http://127.0.0.1:8080/api");
        let url = gateway
            .endpoint(Environment::Dev, Some("../admin?x=1"))
            .unwrap();
        assert_eq!(url.path(), "/api/v2/payments/..%2Fadmin%3Fx=1");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn invalid_base_url_is_configuration_error() {
        let gateway = gateway("not a url");
        assert!(matches!(
            gateway.endpoint(Environment::Beta, None),
            Err(GatewayError::Configuration(_))
        ));
    }
}
