#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use obcheckout_connect::{
    config::{Environment, ProviderUrls},
    connect::interaction_log::InteractionSpan,
    correlation::{self, CallbackState},
    gateway::{
        self, InitiatedPayment, PaymentApi, PaymentGateway,
        error::{ErrorResponse, GatewayError},
        payin::{Creditor, PaymentOrder},
        status::PaymentStatusDetails,
    },
    secret::StaticSecretProvider,
};

pub const CALLBACK_URL: &str = "obcheckout://payment-complete";
/// base64 of `sandbox:key`
pub const SANDBOX_KEY: &str = "c2FuZGJveDprZXk=";

pub fn order(creditor_name: &str) -> PaymentOrder {
    PaymentOrder {
        environment: Environment::Sandbox,
        currency: "GBP".into(),
        amount: "10.00".into(),
        local_instrument: "FASTER_PAYMENTS".into(),
        creditor: Creditor {
            name: creditor_name.into(),
            sort_code: Some("040004".into()),
            account_number: Some("12345678".into()),
            ..Default::default()
        },
    }
}

pub fn gateway(base_url: &str) -> PaymentGateway {
    PaymentGateway::new(
        reqwest::Client::new(),
        Arc::new(StaticSecretProvider::new().with(Environment::Sandbox, SANDBOX_KEY)),
        ProviderUrls::uniform(base_url),
        CALLBACK_URL,
    )
}

pub fn create_body(payment_id: &str, redirect_url: &str) -> String {
    serde_json::json!({
        "payment": {
            "id": payment_id,
            "memberId": "m:member:1",
            "initiation": {
                "refId": "AbCd1234",
                "flowType": "FULL_HOSTED_PAGES",
                "amount": {"value": "10.00", "currency": "GBP"},
                "localInstrument": "FASTER_PAYMENTS",
                "creditor": {"name": "Acme", "sortCode": "040004", "accountNumber": "12345678"},
                "callbackUrl": CALLBACK_URL,
                "callbackState": "echoed"
            },
            "status": "INITIATION_PENDING",
            "authentication": {"redirectUrl": redirect_url}
        }
    })
    .to_string()
}

pub fn status_body(payment_id: &str, status: &str) -> String {
    serde_json::json!({
        "payment": {
            "id": payment_id,
            "memberId": "m:member:1",
            "status": status,
            "statusReasonInformation": null,
            "initiation": {
                "refId": "AbCd1234",
                "amount": {"value": "10.00", "currency": "GBP"}
            }
        }
    })
    .to_string()
}

pub fn details(status: &str) -> PaymentStatusDetails {
    PaymentStatusDetails {
        status: status.into(),
        status_reason_information: None,
        currency: "GBP".into(),
        value: "10.00".into(),
        ref_id: "AbCd1234".into(),
    }
}

pub fn callback_uri(payment_id: &str, state: &CallbackState) -> String {
    format!("{CALLBACK_URL}?payment-id={payment_id}&state={state}")
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Status(&'static str),
    ProviderError(u16),
}

/// Payment API double that counts calls and answers status requests from a script.
/// Once the script is exhausted the last answer repeats.
#[derive(Debug, Default)]
pub struct FakeApi {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    issued_states: Mutex<Vec<CallbackState>>,
    status_delay: Duration,
    pub initiate_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new(script: impl IntoIterator<Item = Scripted>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        })
    }

    /// Every status answer takes `delay` of tokio time
    pub fn slow(script: impl IntoIterator<Item = Scripted>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            status_delay: delay,
            ..Default::default()
        })
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn last_state(&self) -> CallbackState {
        self.issued_states
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("a payment was initiated")
    }
}

#[async_trait]
impl PaymentApi for FakeApi {
    async fn initiate_payment(
        &self,
        _order: &PaymentOrder,
        _span: &mut InteractionSpan,
    ) -> gateway::Result<InitiatedPayment> {
        self.initiate_calls.fetch_add(1, Ordering::SeqCst);
        let state = correlation::generate_state()?;
        self.issued_states.lock().unwrap().push(state.clone());
        Ok(InitiatedPayment {
            payment_id: "pm:1".into(),
            ref_id: correlation::generate_ref_id(),
            redirect_url: url::Url::parse("https://checkout.example/pay/pm:1").unwrap(),
            state,
            status: "INITIATION_PENDING".into(),
        })
    }

    async fn payment_status(
        &self,
        _payment_id: &str,
        _environment: Environment,
        _span: &mut InteractionSpan,
    ) -> gateway::Result<PaymentStatusDetails> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        let next = {
            let mut script = self.script.lock().unwrap();
            let mut last = self.last.lock().unwrap();
            if let Some(next) = script.pop_front() {
                *last = Some(next);
            }
            last.clone().expect("status script is not empty")
        };
        match next {
            Scripted::Status(status) => Ok(details(status)),
            Scripted::ProviderError(code) => Err(GatewayError::GatewayResponse(
                ErrorResponse::from_body(code, ""),
            )),
        }
    }
}
