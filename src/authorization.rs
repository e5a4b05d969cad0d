//! Requester identity and role checks.
//!
//! Roles are a typed set attached to the requester, checked by
//! set-intersection against the required roles of an operation — no
//! loosely-typed role blobs.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SummaryError;

/// Roles relevant to summary generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Doctor,
    Admin,
    Support,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Doctor => "doctor",
            Self::Admin => "admin",
            Self::Support => "support",
        }
    }
}

/// The authenticated principal asking for a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub id: Uuid,
    pub name: String,
    pub roles: HashSet<Role>,
}

impl Requester {
    pub fn new(name: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            roles: roles.into_iter().collect(),
        }
    }
}

/// Roles allowed to generate a discharge summary.
pub const SUMMARY_ROLES: &[Role] = &[Role::Doctor, Role::Admin, Role::Support];

/// Succeeds iff the requester holds at least one of `required`.
pub fn require_any_role(requester: &Requester, required: &[Role]) -> Result<(), SummaryError> {
    if required.iter().any(|role| requester.roles.contains(role)) {
        Ok(())
    } else {
        tracing::warn!(requester = %requester.name, "summary request denied: no matching role");
        Err(SummaryError::Unauthorized)
    }
}
