//! Callback correlation tokens.
//!
//! Every initiation gets a fresh `callbackState`. The provider echoes it on the
//! deep-link callback, and it is the only thing binding that callback to the
//! request that created the payment.

use std::fmt::Display;

use base64::prelude::*;
use rand::{Rng, TryRngCore, distr::Alphanumeric};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Number of random bytes in a correlation token
pub const STATE_BYTES: usize = 32;
pub const REF_ID_LEN: usize = 8;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackState(String);

impl CallbackState {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check the state received on the callback against this one.
    ///
    /// Exact, case-sensitive match. Every byte is compared.
    pub fn verify(&self, received: &str) -> bool {
        verify(received, self.as_str())
    }
}

impl std::fmt::Debug for CallbackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CallbackState(***)")
    }
}

impl Display for CallbackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 32 bytes from the OS random source, url-safe base64 without padding
pub fn generate_state() -> Result<CallbackState, rand::rand_core::OsError> {
    let mut bytes = [0u8; STATE_BYTES];
    rand::rngs::OsRng.try_fill_bytes(&mut bytes)?;
    Ok(CallbackState(BASE64_URL_SAFE_NO_PAD.encode(bytes)))
}

pub fn generate_ref_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(REF_ID_LEN)
        .map(char::from)
        .collect()
}

/// Constant time for equal lengths, a length mismatch is rejected right away
pub fn verify(received: &str, expected: &str) -> bool {
    received.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn state_is_256_bit_url_safe() {
        let state = generate_state().unwrap();
        // 32 bytes -> 43 chars without padding
        assert_eq!(state.as_str().len(), 43);
        assert!(
            state
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        let decoded = BASE64_URL_SAFE_NO_PAD.decode(state.as_str()).unwrap();
        assert_eq!(decoded.len(), STATE_BYTES);
    }

    #[test]
    fn states_are_unique() {
        let states: HashSet<_> = (0..1000)
            .map(|_| generate_state().unwrap().to_string())
            .collect();
        assert_eq!(states.len(), 1000);
    }

    #[test]
    fn ref_id_is_alphanumeric() {
        let ref_id = generate_ref_id();
        assert_eq!(ref_id.len(), REF_ID_LEN);
        assert!(ref_id.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn verify_is_exact_and_case_sensitive() {
        let state = generate_state().unwrap();
        assert!(state.verify(state.as_str()));
        assert!(!state.verify(&state.as_str().to_ascii_uppercase()));
        assert!(!state.verify(&state.as_str()[1..]));
        assert!(!state.verify(""));
        assert!(verify("abc", "abc"));
        assert!(!verify("abc", "abd"));
        assert!(!verify("abc", "abcd"));
        assert!(!verify("", "abc"));
    }
}
