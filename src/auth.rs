/*!
 * # Operator Access
 *
 * Operators are configured as name/key pairs. A presented key unlocks the
 * client when it matches one of them; nothing is issued or persisted.
 */

use serde::Deserialize;
use std::fmt;
use tracing::{debug, warn};
use validator::Validate;

use crate::errors::AuthError;

/// A configured operator.
#[derive(Clone, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct Operator {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub secret_key: String,
}

impl Operator {
    pub fn new(name: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Checks presented keys against the configured operators.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    operators: Vec<Operator>,
}

impl AccessGate {
    pub fn new(operators: Vec<Operator>) -> Self {
        Self { operators }
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Returns the operator owning `key`.
    pub fn verify(&self, key: &str) -> Result<&Operator, AuthError> {
        if self.operators.is_empty() {
            return Err(AuthError::NoOperatorsConfigured);
        }
        let key = key.trim();
        if key.is_empty() {
            return Err(AuthError::EmptyKey);
        }

        // Every operator is compared so timing does not depend on the match position
        let mut found = None;
        for operator in &self.operators {
            if constant_time_eq(operator.secret_key.as_bytes(), key.as_bytes()) && found.is_none() {
                found = Some(operator);
            }
        }

        match found {
            Some(operator) => {
                debug!(operator = %operator.name, "access granted");
                Ok(operator)
            }
            None => {
                warn!("access denied: unknown key");
                Err(AuthError::InvalidKey)
            }
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b) {
        diff |= x ^ y;
    }
    diff == 0
}
