//! Correlation state of one payment.
//!
//! A flow only changes through [transition], so the order in which callback
//! and poll results arrive is explicit.

use serde::Serialize;

use crate::{
    callback::CallbackOutcome,
    config::Environment,
    correlation::CallbackState,
    gateway::{
        InitiatedPayment,
        status::{PaymentStatus, PaymentStatusDetails, map_status},
    },
};

pub const REASON_STATE_MISMATCH: &str = "state mismatch";
pub const REASON_MISSING_PAYMENT_ID: &str = "payment identifier missing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Created,
    /// User is in the hosted checkout
    AwaitingCallback,
    /// Callback verified, status is being resolved
    AwaitingStatus,
    Completed,
}

/// Who produced [FlowState::reason]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonSource {
    /// Callback could not be bound to the initiated payment
    Correlation,
    /// `statusReasonInformation` reported by the provider
    Provider,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowState {
    pub environment: Environment,
    pub phase: Phase,
    #[serde(skip)]
    expected_state: Option<CallbackState>,
    pub ref_id: Option<String>,
    /// Payment created by the initiation
    pub created_payment_id: Option<String>,
    /// Payment confirmed by a verified callback, the poll target
    pub payment_id: Option<String>,
    pub status: Option<PaymentStatus>,
    pub reason: Option<String>,
    pub reason_source: Option<ReasonSource>,
    /// Latest successfully fetched provider status
    pub details: Option<PaymentStatusDetails>,
    pub is_checking: bool,
    pub polling_error: Option<String>,
    /// Raw status that was not in the mapping table
    pub unmapped_status: Option<String>,
}

#[derive(Debug, Clone)]
pub enum FlowEvent {
    Initiated(InitiatedPayment),
    Callback(CallbackOutcome),
    PollStarted,
    PollSucceeded(PaymentStatusDetails),
    PollFailed(String),
    Reset,
}

impl FlowState {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            phase: Phase::Created,
            expected_state: None,
            ref_id: None,
            created_payment_id: None,
            payment_id: None,
            status: None,
            reason: None,
            reason_source: None,
            details: None,
            is_checking: false,
            polling_error: None,
            unmapped_status: None,
        }
    }

    /// Payment id to poll, only available once the callback is verified
    pub fn poll_target(&self) -> Option<&str> {
        match self.phase {
            Phase::AwaitingStatus | Phase::Completed => self.payment_id.as_deref(),
            Phase::Created | Phase::AwaitingCallback => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    fn fail(mut self, reason: &str) -> Self {
        self.status = Some(PaymentStatus::Failure);
        self.reason = Some(reason.to_string());
        self.reason_source = Some(ReasonSource::Correlation);
        self.phase = Phase::Completed;
        self
    }
}

pub fn transition(state: FlowState, event: FlowEvent) -> FlowState {
    match event {
        FlowEvent::Reset => FlowState::new(state.environment),
        FlowEvent::Initiated(payment) => FlowState {
            phase: Phase::AwaitingCallback,
            expected_state: Some(payment.state),
            ref_id: Some(payment.ref_id),
            created_payment_id: Some(payment.payment_id),
            ..FlowState::new(state.environment)
        },
        FlowEvent::Callback(outcome) => on_callback(state, outcome),
        FlowEvent::PollStarted => {
            if state.poll_target().is_none() {
                return state;
            }
            FlowState {
                is_checking: true,
                ..state
            }
        }
        FlowEvent::PollSucceeded(details) => {
            let mapping = map_status(&details.status);
            if state.is_completed() && !mapping.status.is_terminal() {
                tracing::warn!(
                    status = %details.status,
                    "Provider reports a non-terminal status for a settled payment, keeping it"
                );
                return FlowState {
                    is_checking: false,
                    polling_error: None,
                    ..state
                };
            }
            let reason = details.status_reason_information.clone();
            let mut next = FlowState {
                is_checking: false,
                polling_error: None,
                status: Some(mapping.status),
                reason_source: reason.as_ref().map(|_| ReasonSource::Provider),
                reason,
                unmapped_status: (!mapping.recognized).then(|| details.status.clone()),
                details: Some(details),
                ..state
            };
            if mapping.status.is_terminal() {
                next.phase = Phase::Completed;
            }
            next
        }
        // Details of the last good poll are kept, the flow stays pollable.
        // A status confirmed by the provider is never overwritten.
        FlowEvent::PollFailed(error) => FlowState {
            is_checking: false,
            status: if state.is_completed() {
                state.status
            } else {
                Some(PaymentStatus::Failure)
            },
            polling_error: Some(error),
            ..state
        },
    }
}

fn on_callback(state: FlowState, outcome: CallbackOutcome) -> FlowState {
    if state.phase != Phase::AwaitingCallback {
        if outcome != CallbackOutcome::Ignored {
            tracing::warn!(phase = ?state.phase, "Callback outside of the checkout, ignoring");
        }
        return state;
    }
    match outcome {
        CallbackOutcome::Ignored => state,
        CallbackOutcome::MissingPaymentId => state.fail(REASON_MISSING_PAYMENT_ID),
        CallbackOutcome::Received { payment_id, state: received } => {
            let verified = match (&state.expected_state, received.as_deref()) {
                (Some(expected), Some(received)) => expected.verify(received),
                _ => false,
            };
            if !verified {
                tracing::warn!("Callback state does not match the initiated payment");
                return state.fail(REASON_STATE_MISMATCH);
            }
            if state.created_payment_id.as_deref() != Some(payment_id.as_str()) {
                tracing::warn!(
                    created = ?state.created_payment_id,
                    received = %payment_id,
                    "Callback payment id differs from the created payment"
                );
            }
            FlowState {
                phase: Phase::AwaitingStatus,
                payment_id: Some(payment_id),
                status: Some(PaymentStatus::Pending),
                reason: None,
                reason_source: None,
                ..state
            }
        }
    }
}
