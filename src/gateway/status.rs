use serde::{Deserialize, Serialize};

use crate::{
    config::Environment,
    connect::interaction_log::InteractionSpan,
    gateway::{self, PaymentGateway, auth, error::GatewayError, payin::Amount},
};

/// Answer of `GET /v2/payments/{id}`. Same envelope as creation, without the
/// authentication block.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub payment: StatusPayment,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusPayment {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub status_reason_information: Option<String>,
    pub initiation: StatusInitiation,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusInitiation {
    pub ref_id: String,
    pub amount: Amount,
}

/// Projection of the provider status response the flow keeps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusDetails {
    /// Raw provider status, not mapped
    pub status: String,
    pub status_reason_information: Option<String>,
    pub currency: String,
    pub value: String,
    pub ref_id: String,
}

/// Status the caller acts upon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Success,
    Failure,
    Cancelled,
    Pending,
}

impl PaymentStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Ordered, first match wins. Matched case-insensitively as a substring of
/// the raw provider status.
pub const STATUS_TABLE: &[(&str, PaymentStatus)] = &[
    ("execution_successful", PaymentStatus::Success),
    ("settlement_completed", PaymentStatus::Success),
    ("authorization_failure", PaymentStatus::Failure),
    ("execution_rejected", PaymentStatus::Failure),
    ("expired", PaymentStatus::Failure),
    ("cancelled", PaymentStatus::Cancelled),
    ("initiation_pending", PaymentStatus::Pending),
    ("pending", PaymentStatus::Pending),
    ("processing", PaymentStatus::Pending),
];

/// Applied when nothing in [STATUS_TABLE] matches
pub const UNMAPPED_STATUS: PaymentStatus = PaymentStatus::Failure;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusMapping {
    pub status: PaymentStatus,
    /// false when the fallback was applied
    pub recognized: bool,
}

pub fn map_status(raw: &str) -> StatusMapping {
    let lowered = raw.to_ascii_lowercase();
    match STATUS_TABLE
        .iter()
        .find(|(needle, _)| lowered.contains(*needle))
    {
        Some((_, status)) => StatusMapping {
            status: *status,
            recognized: true,
        },
        None => {
            tracing::warn!(status = %raw, "Unmapped provider payment status");
            StatusMapping {
                status: UNMAPPED_STATUS,
                recognized: false,
            }
        }
    }
}

impl PaymentGateway {
    pub(super) async fn status(
        &self,
        payment_id: &str,
        environment: Environment,
        span: &mut InteractionSpan,
    ) -> gateway::Result<PaymentStatusDetails> {
        let credential = self.credential(environment)?;
        let headers = auth::authenticated_headers(environment, &credential, false)?;
        let url = self.endpoint(environment, Some(payment_id))?;
        span.set_request(url.to_string(), serde_json::Value::Null);
        tracing::debug!(%url, "Payment API status request");

        let res = self.client.get(url).headers(headers).send().await?;
        let body = gateway::read_response(res, span).await?;
        let response: StatusResponse =
            serde_json::from_str(&body).map_err(|e| GatewayError::decoding(e, body.as_str()))?;
        Ok(response.into())
    }
}
