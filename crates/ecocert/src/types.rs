use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Non-decreasing integer supplied by the host for timestamps and expiry.
pub type Height = u64;

pub type AccommodationId = u64;

pub type AuditId = u64;

/// Authenticated caller identity supplied by the host environment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("principal is empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-call environment: who is calling and at what height.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Principal,
    pub height: Height,
}

impl CallContext {
    pub fn new(caller: Principal, height: Height) -> Self {
        Self { caller, height }
    }
}
