//! Deep-link callback parsing
//!
//! The browser collaborator hands over the uri the provider redirected to,
//! `{scheme}://{host}?payment-id={id}&state={token}`.

use serde::Serialize;

pub const PAYMENT_ID_PARAM: &str = "payment-id";
pub const STATE_PARAM: &str = "state";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CallbackOutcome {
    /// Uri is not ours. Other deep links may arrive through the same channel.
    Ignored,
    MissingPaymentId,
    Received {
        payment_id: String,
        state: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParser {
    scheme: String,
    host: String,
}

impl CallbackParser {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    pub fn from_url(callback_url: &url::Url) -> Self {
        Self::new(
            callback_url.scheme(),
            callback_url.host_str().unwrap_or_default(),
        )
    }

    pub fn parse(&self, uri: &str) -> CallbackOutcome {
        let Ok(url) = url::Url::parse(uri) else {
            tracing::debug!("Ignoring unparseable callback uri");
            return CallbackOutcome::Ignored;
        };
        if !self.matches(&url) {
            tracing::debug!(scheme = url.scheme(), "Ignoring unrelated deep link");
            return CallbackOutcome::Ignored;
        }

        let payment_id = first_param(&url, PAYMENT_ID_PARAM).filter(|id| !id.is_empty());
        let state = first_param(&url, STATE_PARAM);
        match payment_id {
            Some(payment_id) => CallbackOutcome::Received { payment_id, state },
            None => {
                tracing::warn!("Callback carries no payment identifier");
                CallbackOutcome::MissingPaymentId
            }
        }
    }

    fn matches(&self, url: &url::Url) -> bool {
        url.scheme().eq_ignore_ascii_case(&self.scheme)
            && url
                .host_str()
                .is_some_and(|host| host.eq_ignore_ascii_case(&self.host))
    }
}

/// Only the first occurrence of a key is significant
fn first_param(url: &url::Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
