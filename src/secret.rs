//! Provider credential lookup
//!
//! The secret store itself lives outside of this crate. The connector only
//! sees it through [SecretProvider].

use std::{collections::HashMap, fmt::Display};

use crate::config::Environment;

/// Provider API credential, already in the form sent after `Basic `
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Validate a raw secret value.
    ///
    /// The value ends up in an http header, so it must be non-empty visible ascii.
    pub fn parse(environment: Environment, raw: &str) -> Result<Self, SecretError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(SecretError::Missing(environment));
        }
        if !value.chars().all(|c| c.is_ascii_graphic()) {
            return Err(SecretError::UnexpectedFormat(environment));
        }
        Ok(Self(value.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    Missing(Environment),
    UnexpectedFormat(Environment),
}

impl std::error::Error for SecretError {}

impl Display for SecretError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretError::Missing(env) => write!(
                f,
                "credential {} for {env} environment is missing",
                env.credential_name()
            ),
            SecretError::UnexpectedFormat(env) => write!(
                f,
                "credential {} for {env} environment has unexpected format",
                env.credential_name()
            ),
        }
    }
}

pub trait SecretProvider: std::fmt::Debug + Send + Sync {
    fn credential(&self, environment: Environment) -> Result<Credential, SecretError>;
}

/// Reads credentials from the process environment.
///
/// This is the only lookup path: `.env` is merged into the environment on
/// startup and variables already set in the real environment win.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn credential(&self, environment: Environment) -> Result<Credential, SecretError> {
        match std::env::var(environment.credential_name()) {
            Ok(value) => Credential::parse(environment, &value),
            Err(std::env::VarError::NotPresent) => Err(SecretError::Missing(environment)),
            Err(std::env::VarError::NotUnicode(_)) => {
                Err(SecretError::UnexpectedFormat(environment))
            }
        }
    }
}

/// Fixed set of credentials, handy for embedding and tests
#[derive(Debug, Default, Clone)]
pub struct StaticSecretProvider {
    secrets: HashMap<Environment, String>,
}

impl StaticSecretProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, environment: Environment, secret: impl Into<String>) -> Self {
        self.secrets.insert(environment, secret.into());
        self
    }
}

impl SecretProvider for StaticSecretProvider {
    fn credential(&self, environment: Environment) -> Result<Credential, SecretError> {
        let raw = self
            .secrets
            .get(&environment)
            .ok_or(SecretError::Missing(environment))?;
        Credential::parse(environment, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_missing() {
        let secrets = StaticSecretProvider::new().with(Environment::Sandbox, "   ");
        assert_eq!(
            secrets.credential(Environment::Sandbox),
            Err(SecretError::Missing(Environment::Sandbox))
        );
    }

    #[test]
    fn secret_with_whitespace_inside_is_rejected() {
        let secrets = StaticSecretProvider::new().with(Environment::Dev, "abc def");
        assert_eq!(
            secrets.credential(Environment::Dev),
            Err(SecretError::UnexpectedFormat(Environment::Dev))
        );
    }

    #[test]
    fn credentials_are_per_environment() {
        let secrets = StaticSecretProvider::new().with(Environment::Beta, "YmV0YTprZXk=");
        assert_eq!(
            secrets.credential(Environment::Beta).unwrap().expose(),
            "YmV0YTprZXk="
        );
        assert!(secrets.credential(Environment::Sandbox).is_err());
    }

    #[test]
    fn debug_does_not_leak_credential() {
        let credential = Credential::parse(Environment::Dev, "super-secret").unwrap();
        assert!(!format!("{credential:?}").contains("super-secret"));
    }
}
