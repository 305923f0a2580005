use serde::{Deserialize, Serialize};

use crate::config::Environment;

/// What the caller asks to be paid
#[derive(Debug, Clone)]
pub struct PaymentOrder {
    pub environment: Environment,
    pub currency: String,
    /// Decimal string, forwarded to the provider as is
    pub amount: String,
    pub local_instrument: String,
    pub creditor: Creditor,
}

/// Payee account.
///
/// Either `iban` or `sort_code` + `account_number` is expected, the provider
/// rejects anything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creditor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iban: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowType {
    FullHostedPages,
    EmbeddedHostedPages,
    ApiOnly,
}

#[derive(Debug, Serialize)]
pub struct PaymentRequest<'a> {
    pub initiation: Initiation<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Initiation<'a> {
    pub ref_id: &'a str,
    pub flow_type: FlowType,
    pub remittance_information_primary: String,
    pub remittance_information_secondary: String,
    pub amount: Amount,
    pub local_instrument: &'a str,
    pub creditor: &'a Creditor,
    pub callback_url: &'a str,
    pub callback_state: &'a str,
}

impl<'a> PaymentRequest<'a> {
    pub fn new(
        order: &'a PaymentOrder,
        ref_id: &'a str,
        callback_url: &'a str,
        callback_state: &'a str,
    ) -> Self {
        Self {
            initiation: Initiation {
                ref_id,
                flow_type: FlowType::FullHostedPages,
                remittance_information_primary: format!("Payment {ref_id}"),
                remittance_information_secondary: format!("Ref {ref_id}"),
                amount: Amount {
                    value: order.amount.clone(),
                    currency: order.currency.clone(),
                },
                local_instrument: &order.local_instrument,
                creditor: &order.creditor,
                callback_url,
                callback_state,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment: Payment,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub member_id: String,
    pub initiation: InitiationEcho,
    pub status: String,
    #[serde(default)]
    pub status_reason_information: Option<String>,
    pub authentication: Authentication,
}

/// Initiation as echoed back by the provider, computed fields are ignored
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiationEcho {
    pub ref_id: String,
    pub amount: Amount,
    #[serde(default)]
    pub local_instrument: Option<String>,
    #[serde(default)]
    pub creditor: Option<Creditor>,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub callback_state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    pub redirect_url: String,
}
