use std::{fmt::Display, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{callback::CallbackParser, poller::PollPolicy};

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_CALLBACK_URL: &str = "obcheckout://payment-complete";
const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);
/// Upper bound of `POLL_MAX_WAIT_SECS`
pub const MAX_POLL_WAIT: Duration = Duration::from_secs(24 * 60 * 60);
/// Upper bound of the poll intervals
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Provider environment a payment is created in.
///
/// Each environment has its own base url and its own named credential.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    #[default]
    Sandbox,
    Beta,
}

impl Environment {
    pub const ALL: [Environment; 3] = [Self::Dev, Self::Sandbox, Self::Beta];

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Dev => "https://api.dev.token.io",
            Self::Sandbox => "https://api.sandbox.token.io",
            Self::Beta => "https://api.beta.token.io",
        }
    }

    /// Name of the credential this environment authenticates with
    pub fn credential_name(self) -> &'static str {
        match self {
            Self::Dev => "DEV_API_KEY",
            Self::Sandbox => "SANDBOX_API_KEY",
            Self::Beta => "BETA_API_KEY",
        }
    }

    fn base_url_var(self) -> &'static str {
        match self {
            Self::Dev => "DEV_BASE_URL",
            Self::Sandbox => "SANDBOX_BASE_URL",
            Self::Beta => "BETA_BASE_URL",
        }
    }
}

impl Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dev => f.write_str("dev"),
            Self::Sandbox => f.write_str("sandbox"),
            Self::Beta => f.write_str("beta"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEnvironment(pub String);

impl std::error::Error for UnknownEnvironment {}

impl Display for UnknownEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown environment: {}", self.0)
    }
}

impl FromStr for Environment {
    type Err = UnknownEnvironment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "sandbox" => Ok(Self::Sandbox),
            "beta" => Ok(Self::Beta),
            _ => Err(UnknownEnvironment(s.to_string())),
        }
    }
}

/// Base urls of the provider API, one per [Environment]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderUrls {
    dev: String,
    sandbox: String,
    beta: String,
}

impl Default for ProviderUrls {
    fn default() -> Self {
        Self {
            dev: Environment::Dev.default_base_url().into(),
            sandbox: Environment::Sandbox.default_base_url().into(),
            beta: Environment::Beta.default_base_url().into(),
        }
    }
}

impl ProviderUrls {
    /// Point every environment at the same base url
    pub fn uniform(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            dev: base_url.clone(),
            sandbox: base_url.clone(),
            beta: base_url,
        }
    }

    pub fn from_env() -> Self {
        let mut urls = Self::default();
        for environment in Environment::ALL {
            if let Ok(url) = std::env::var(environment.base_url_var()) {
                *urls.slot_mut(environment) = url;
            }
        }
        urls
    }

    pub fn base_url(&self, environment: Environment) -> &str {
        let url = match environment {
            Environment::Dev => &self.dev,
            Environment::Sandbox => &self.sandbox,
            Environment::Beta => &self.beta,
        };
        url.trim_end_matches('/')
    }

    fn slot_mut(&mut self, environment: Environment) -> &mut String {
        match environment {
            Environment::Dev => &mut self.dev,
            Environment::Sandbox => &mut self.sandbox,
            Environment::Beta => &mut self.beta,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Deep-link uri the provider redirects back to after the hosted checkout
    pub callback_url: url::Url,
    pub provider_urls: ProviderUrls,
    pub provider_timeout: Duration,
    pub poll_policy: PollPolicy,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env_parse("PORT").unwrap_or(DEFAULT_PORT);
        let callback_url = std::env::var("CALLBACK_URL").unwrap_or_else(|_| {
            tracing::warn!("CALLBACK_URL is not defined, using default one");
            DEFAULT_CALLBACK_URL.to_string()
        });
        let callback_url = url::Url::parse(&callback_url)
            .map_err(|e| anyhow::anyhow!("CALLBACK_URL is not a valid uri: {e}"))?;
        if callback_url.host_str().is_none() {
            anyhow::bail!("CALLBACK_URL must have the form scheme://host");
        }

        let provider_timeout = env_parse("PROVIDER_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT);

        let mut poll_policy = PollPolicy::default();
        if let Some(ms) = env_parse("POLL_INITIAL_INTERVAL_MS") {
            poll_policy.initial_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse("POLL_MAX_INTERVAL_MS") {
            poll_policy.max_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse("POLL_MAX_WAIT_SECS") {
            poll_policy.max_wait = Duration::from_secs(secs);
        }
        check_poll_policy(&poll_policy)?;

        Ok(Self {
            port,
            callback_url,
            provider_urls: ProviderUrls::from_env(),
            provider_timeout,
            poll_policy,
        })
    }

    pub fn callback_parser(&self) -> CallbackParser {
        CallbackParser::from_url(&self.callback_url)
    }
}

fn check_poll_policy(policy: &PollPolicy) -> anyhow::Result<()> {
    if policy.initial_interval.is_zero() || policy.initial_interval > MAX_POLL_INTERVAL {
        anyhow::bail!(
            "POLL_INITIAL_INTERVAL_MS must be between 1 and {}",
            MAX_POLL_INTERVAL.as_millis()
        );
    }
    if policy.max_interval < policy.initial_interval || policy.max_interval > MAX_POLL_INTERVAL {
        anyhow::bail!(
            "POLL_MAX_INTERVAL_MS must be between POLL_INITIAL_INTERVAL_MS and {}",
            MAX_POLL_INTERVAL.as_millis()
        );
    }
    if policy.max_wait > MAX_POLL_WAIT {
        anyhow::bail!("POLL_MAX_WAIT_SECS must not exceed {}", MAX_POLL_WAIT.as_secs());
    }
    Ok(())
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_environment() {
        assert_eq!("sandbox".parse::<Environment>(), Ok(Environment::Sandbox));
        assert_eq!(" BETA ".parse::<Environment>(), Ok(Environment::Beta));
        assert!("prod".parse::<Environment>().is_err());
    }

    #[test]
    fn environment_serde_is_lowercase() {
        let json = serde_json::to_string(&Environment::Dev).unwrap();
        assert_eq!(json, "\"dev\"");
        let env: Environment = serde_json::from_str("\"beta\"").unwrap();
        assert_eq!(env, Environment::Beta);
    }

    #[test]
    fn environments_use_distinct_credentials() {
        let names: std::collections::HashSet<_> = Environment::ALL
            .iter()
            .map(|e| e.credential_name())
            .collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn poll_policy_bounds() {
        assert!(check_poll_policy(&PollPolicy::default()).is_ok());

        let endless = PollPolicy {
            max_wait: Duration::from_secs(u64::MAX),
            ..Default::default()
        };
        let err = check_poll_policy(&endless).unwrap_err();
        assert!(err.to_string().contains("POLL_MAX_WAIT_SECS"));

        let zero = PollPolicy {
            initial_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(check_poll_policy(&zero).is_err());

        let inverted = PollPolicy {
            initial_interval: Duration::from_secs(10),
            max_interval: Duration::from_secs(5),
            ..Default::default()
        };
        assert!(check_poll_policy(&inverted).is_err());
    }

    #[test]
    fn base_url_has_no_trailing_slash() {
        let urls = ProviderUrls::uniform("http://127.0.0.1:1234/");
        assert_eq!(urls.base_url(Environment::Beta), "http://127.0.0.1:1234");
    }
}
