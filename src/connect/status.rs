pub mod req {
    use serde::Deserialize;

    use crate::{
        config::Environment,
        gateway::payin::{Creditor, PaymentOrder},
    };

    #[derive(Debug, Deserialize)]
    pub struct InitiateRequest {
        #[serde(default)]
        pub environment: Environment,
        pub currency: String,
        /// Decimal string, not validated before it reaches the provider
        pub amount: String,
        pub local_instrument: String,
        pub creditor: CreditorRequest,
    }

    /// Either `iban` or `sort_code` + `account_number`
    #[derive(Debug, Deserialize)]
    pub struct CreditorRequest {
        pub name: String,
        #[serde(default)]
        pub iban: Option<String>,
        #[serde(default)]
        pub sort_code: Option<String>,
        #[serde(default)]
        pub account_number: Option<String>,
    }

    impl From<InitiateRequest> for PaymentOrder {
        fn from(value: InitiateRequest) -> Self {
            let creditor = value.creditor;
            Self {
                environment: value.environment,
                currency: value.currency,
                amount: value.amount,
                local_instrument: value.local_instrument,
                creditor: Creditor {
                    name: creditor.name,
                    iban: creditor.iban,
                    sort_code: creditor.sort_code,
                    account_number: creditor.account_number,
                },
            }
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct StatusQuery {
        #[serde(default)]
        pub environment: Environment,
    }

    #[derive(Debug, Default, Deserialize)]
    pub struct PollQuery {
        /// Keep polling with backoff until the payment settles
        #[serde(default)]
        pub until_terminal: bool,
    }

    #[derive(Debug, Deserialize)]
    pub struct CallbackRequest {
        /// Deep-link uri the provider redirected to
        pub url: String,
    }
}

pub mod res {
    use serde::Serialize;
    use uuid::Uuid;

    use crate::{
        flow::FlowState,
        gateway::status::{PaymentStatus, PaymentStatusDetails, StatusMapping},
        poller::PollStop,
    };

    #[derive(Debug, Serialize)]
    pub struct Status {
        /// Mapped status of the payment (e.g. pending, success)
        pub status: PaymentStatus,
        /// False when the provider status is not in the mapping table
        pub recognized: bool,
        pub details: PaymentStatusDetails,
    }

    impl Status {
        pub fn new(mapping: StatusMapping, details: PaymentStatusDetails) -> Self {
            Self {
                status: mapping.status,
                recognized: mapping.recognized,
                details,
            }
        }
    }

    #[derive(Debug, Serialize)]
    pub struct Initiated {
        pub flow_id: Uuid,
        pub payment_id: String,
        pub ref_id: String,
        /// Hosted checkout page the user has to be sent to
        pub redirect_url: String,
        pub provider_status: String,
    }

    #[derive(Debug, Serialize)]
    pub struct Flow {
        pub flow_id: Uuid,
        #[serde(flatten)]
        pub flow: FlowState,
    }

    #[derive(Debug, Serialize)]
    pub struct Poll {
        #[serde(flatten)]
        pub flow: Flow,
        pub attempts: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub stop: Option<PollStop>,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::req::InitiateRequest;
    use crate::{config::Environment, gateway::payin::PaymentOrder};

    #[test]
    fn initiate_request_is_snake_case() {
        let request: InitiateRequest = serde_json::from_value(json!({
            "currency": "GBP",
            "amount": "1.00",
            "local_instrument": "FASTER_PAYMENTS",
            "creditor": {"name": "Acme", "sort_code": "040004", "account_number": "12345678"}
        }))
        .unwrap();
        let order = PaymentOrder::from(request);
        assert_eq!(order.environment, Environment::Sandbox);
        assert_eq!(order.creditor.sort_code.as_deref(), Some("040004"));
        assert_eq!(order.creditor.account_number.as_deref(), Some("12345678"));
        assert_eq!(order.creditor.iban, None);

        let provider_wire = serde_json::to_value(&order.creditor).unwrap();
        assert_eq!(provider_wire["sortCode"], "040004");
    }

    #[test]
    fn camel_case_creditor_is_not_accepted() {
        let request: InitiateRequest = serde_json::from_value(json!({
            "currency": "GBP",
            "amount": "1.00",
            "local_instrument": "FASTER_PAYMENTS",
            "creditor": {"name": "Acme", "sortCode": "040004"}
        }))
        .unwrap();
        assert_eq!(request.creditor.sort_code, None);
    }
}
