use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header carrying the caller identity on every request.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// The caller a request acts on behalf of. Always a positive user id.
///
/// The value is trusted as asserted; nothing here verifies that a user with
/// this id exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Identity(i64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("identity is not an integer: {0:?}")]
    NotAnInteger(String),
    #[error("identity must be positive, got {0}")]
    NotPositive(i64),
}

impl Identity {
    pub fn new(id: i64) -> Result<Self, IdentityError> {
        if id > 0 {
            Ok(Self(id))
        } else {
            Err(IdentityError::NotPositive(id))
        }
    }

    pub fn id(self) -> i64 {
        self.0
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // i64 parsing would also take a leading '+'
        if s.starts_with('+') {
            return Err(IdentityError::NotAnInteger(s.to_string()));
        }
        let id: i64 = s
            .parse()
            .map_err(|_| IdentityError::NotAnInteger(s.to_string()))?;
        Self::new(id)
    }
}

impl TryFrom<i64> for Identity {
    type Error = IdentityError;

    fn try_from(id: i64) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<Identity> for i64 {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
