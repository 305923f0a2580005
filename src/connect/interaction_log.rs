use std::time::Instant;

use serde::Serialize;
use time::OffsetDateTime;

pub const PROVIDER_NAME: &str = "hosted-checkout";

#[derive(Debug, Clone, Serialize)]
struct Request {
    url: String,
    params: serde_json::Value,
}

/// Record of one provider round trip, returned to the connect caller
#[derive(Debug, Clone, Serialize)]
pub struct InteractionLog {
    provider: String,
    request: Option<Request>,
    status: Option<u16>,
    response: Option<serde_json::Value>,
    error: Option<String>,
    kind: String,
    #[serde(with = "time::serde::rfc3339")]
    created_at: time::OffsetDateTime,
    duration: f32,
}

impl InteractionLog {
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

#[derive(Debug)]
pub struct InteractionSpan {
    started: Instant,
    request: Option<Request>,
    response: Option<serde_json::Value>,
    status: Option<u16>,
    error: Option<String>,
}

impl InteractionSpan {
    pub fn enter() -> Self {
        Self {
            started: Instant::now(),
            request: None,
            response: None,
            status: None,
            error: None,
        }
    }

    /// `params` must already be masked
    pub fn set_request(&mut self, url: String, params: serde_json::Value) {
        self.request = Some(Request { url, params });
    }

    pub fn set_response(&mut self, res: serde_json::Value) {
        self.response = Some(res);
    }

    pub fn set_response_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    pub fn set_error(&mut self, error: &impl std::fmt::Display) {
        self.error = Some(error.to_string());
    }

    pub fn interaction_log(self, kind: &str) -> InteractionLog {
        let created_at = OffsetDateTime::now_utc();
        InteractionLog {
            provider: PROVIDER_NAME.into(),
            request: self.request,
            status: self.status,
            response: self.response,
            error: self.error,
            kind: kind.into(),
            created_at,
            duration: self.started.elapsed().as_secs_f32(),
        }
    }
}
