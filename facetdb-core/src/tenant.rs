//! Tenant identifier type
//!
//! Every query predicate set carries exactly one tenant id. The caller has
//! already resolved cross-tenant authorization; this layer only binds the id
//! into backend queries.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{FacetError, FacetResult};

/// Resolved querying tenant id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    /// Create a new tenant id
    pub fn new<S: Into<String>>(id: S) -> FacetResult<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(FacetError::validation("Tenant id cannot be empty"));
        }

        if id.len() > crate::MAX_TENANT_ID_LENGTH {
            return Err(FacetError::validation(format!(
                "Tenant id too long: {} > {}",
                id.len(),
                crate::MAX_TENANT_ID_LENGTH
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '-')
        {
            return Err(FacetError::validation(
                "Tenant id contains invalid characters",
            ));
        }

        Ok(Self(id))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TenantId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TenantId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
