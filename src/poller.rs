//! Status polling on top of the flow state machine.
//!
//! [StatusPoller::poll] is one request/response. [StatusPoller::poll_until_terminal]
//! repeats it with backoff until the payment settles, the deadline passes or
//! the caller cancels.

use std::{fmt::Display, sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    connect::interaction_log::{InteractionLog, InteractionSpan},
    flow::{FlowEvent, FlowState, transition},
    gateway::PaymentApi,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub multiplier: f64,
    pub max_interval: Duration,
    /// Overall bound on a [StatusPoller::poll_until_terminal] run
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            multiplier: 2.0,
            max_interval: Duration::from_secs(30),
            max_wait: Duration::from_secs(300),
        }
    }
}

impl PollPolicy {
    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier.max(1.0))
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}

/// Poll was not attempted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollRefused {
    /// No verified callback yet
    AwaitingCallback,
    /// Flow ended without a poll target (state mismatch, missing payment id)
    Rejected(String),
}

impl std::error::Error for PollRefused {}

impl Display for PollRefused {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PollRefused::AwaitingCallback => f.write_str("payment callback not received yet"),
            PollRefused::Rejected(reason) => write!(f, "payment flow rejected: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollStop {
    /// Payment reached success, failure or cancelled
    Terminal,
    DeadlineExceeded,
    Cancelled,
}

#[derive(Debug)]
pub struct PollReport {
    pub flow: FlowState,
    pub logs: Vec<InteractionLog>,
    pub attempts: usize,
    pub stop: PollStop,
}

#[derive(Debug, Clone)]
pub struct StatusPoller {
    api: Arc<dyn PaymentApi>,
}

impl StatusPoller {
    pub fn new(api: Arc<dyn PaymentApi>) -> Self {
        Self { api }
    }

    pub async fn poll(
        &self,
        flow: FlowState,
        logs: &mut Vec<InteractionLog>,
    ) -> Result<FlowState, PollRefused> {
        let Some(payment_id) = flow.poll_target().map(str::to_owned) else {
            return Err(refusal(&flow));
        };
        let environment = flow.environment;
        let flow = transition(flow, FlowEvent::PollStarted);

        let mut span = InteractionSpan::enter();
        let result = self
            .api
            .payment_status(&payment_id, environment, &mut span)
            .await;
        logs.push(span.interaction_log("status"));

        let event = match result {
            Ok(details) => {
                tracing::debug!(%payment_id, status = %details.status, "Fetched payment status");
                FlowEvent::PollSucceeded(details)
            }
            Err(e) => {
                tracing::error!(%payment_id, "Failed to fetch payment status: {e}");
                FlowEvent::PollFailed(e.to_string())
            }
        };
        Ok(transition(flow, event))
    }

    pub async fn poll_until_terminal(
        &self,
        mut flow: FlowState,
        policy: &PollPolicy,
        cancel: &CancellationToken,
    ) -> Result<PollReport, PollRefused> {
        if flow.poll_target().is_none() {
            return Err(refusal(&flow));
        }
        // None when the deadline is beyond what the clock can represent
        let deadline = tokio::time::Instant::now().checked_add(policy.max_wait);
        let mut interval = policy.initial_interval;
        let mut logs = Vec::new();
        let mut attempts = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(report(flow, logs, attempts, PollStop::Cancelled));
            }
            flow = self.poll(flow, &mut logs).await?;
            attempts += 1;

            let settled = flow.is_completed() && flow.polling_error.is_none();
            if settled {
                tracing::info!(attempts, status = ?flow.status, "Payment reached terminal status");
                return Ok(report(flow, logs, attempts, PollStop::Terminal));
            }

            let past_deadline = deadline.is_some_and(|deadline| {
                tokio::time::Instant::now()
                    .checked_add(interval)
                    .is_none_or(|next| next > deadline)
            });
            if past_deadline {
                tracing::warn!(attempts, "Gave up polling payment status");
                return Ok(report(flow, logs, attempts, PollStop::DeadlineExceeded));
            }
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(attempts, "Payment status polling cancelled");
                    return Ok(report(flow, logs, attempts, PollStop::Cancelled));
                }
                _ = tokio::time::sleep(interval) => {}
            }
            interval = policy.next_interval(interval);
        }
    }
}

fn refusal(flow: &FlowState) -> PollRefused {
    match &flow.reason {
        Some(reason) if flow.is_completed() => PollRefused::Rejected(reason.clone()),
        _ => PollRefused::AwaitingCallback,
    }
}

fn report(flow: FlowState, logs: Vec<InteractionLog>, attempts: usize, stop: PollStop) -> PollReport {
    PollReport {
        flow,
        logs,
        attempts,
        stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_is_capped() {
        let policy = PollPolicy {
            initial_interval: Duration::from_secs(1),
            multiplier: 3.0,
            max_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(60),
        };
        let second = policy.next_interval(policy.initial_interval);
        assert_eq!(second, Duration::from_secs(3));
        assert_eq!(policy.next_interval(second), Duration::from_secs(5));
    }

    #[test]
    fn huge_interval_does_not_overflow() {
        let policy = PollPolicy {
            initial_interval: Duration::MAX,
            max_interval: Duration::MAX,
            ..Default::default()
        };
        assert_eq!(policy.next_interval(Duration::MAX), Duration::MAX);
    }

    #[test]
    fn multiplier_below_one_does_not_shrink() {
        let policy = PollPolicy {
            multiplier: 0.5,
            ..Default::default()
        };
        assert_eq!(
            policy.next_interval(Duration::from_secs(2)),
            Duration::from_secs(2)
        );
    }
}
