//! Capabilities and the Role → Capability table.
//!
//! Capabilities are `RESOURCE:ACTION` strings. Access tokens carry the set
//! granted to the user's role at sign time; nothing is looked up again when
//! the token is verified.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::users::Role;

/// Reserved marker carried only by refresh tokens.
pub const REFRESH_TOKEN: &str = "REFRESH_TOKEN";

/// Capability names used by the built-in routes.
pub mod capabilities {
    /// Read any user record
    pub const USER_ADMINISTRATION_READ: &str = "USER_ADMINISTRATION:read";
    /// Create, modify and delete user records
    pub const USER_ADMINISTRATION_WRITE: &str = "USER_ADMINISTRATION:write";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{0} is reserved for refresh tokens and cannot be granted to a role")]
    Reserved(&'static str),

    #[error("malformed capability {0:?}, expected RESOURCE:ACTION")]
    Malformed(String),
}

/// `RESOURCE:ACTION` with both halves non-empty.
pub fn is_well_formed(capability: &str) -> bool {
    match capability.split_once(':') {
        Some((resource, action)) => {
            !resource.is_empty() && !action.is_empty() && !action.contains(':')
        }
        None => false,
    }
}

/// Static, read-only mapping from role to granted capabilities.
///
/// Built once at startup and handed to the
/// [`AuthService`](super::AuthService); tests construct their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCapabilityMap {
    grants: HashMap<Role, Vec<String>>,
}

impl RoleCapabilityMap {
    /// Roles missing from `grants` get the empty set.
    pub fn new(grants: HashMap<Role, Vec<String>>) -> Result<Self, CapabilityError> {
        let mut normalized = HashMap::with_capacity(grants.len());
        for (role, mut caps) in grants {
            for cap in &caps {
                if cap == REFRESH_TOKEN {
                    return Err(CapabilityError::Reserved(REFRESH_TOKEN));
                }
                if !is_well_formed(cap) {
                    return Err(CapabilityError::Malformed(cap.clone()));
                }
            }
            caps.sort();
            caps.dedup();
            normalized.insert(role, caps);
        }
        Ok(Self { grants: normalized })
    }

    /// Capabilities granted to `role` (sorted, deduplicated)
    pub fn capabilities_for(&self, role: Role) -> Vec<String> {
        self.grants.get(&role).cloned().unwrap_or_default()
    }

    /// Every role with its grants, in role order
    pub fn entries(&self) -> Vec<RoleGrant> {
        let ordered: BTreeMap<Role, Vec<String>> = Role::ALL
            .iter()
            .map(|role| (*role, self.capabilities_for(*role)))
            .collect();
        ordered
            .into_iter()
            .map(|(role, capabilities)| RoleGrant { role, capabilities })
            .collect()
    }
}

impl Default for RoleCapabilityMap {
    fn default() -> Self {
        let mut grants = HashMap::new();
        grants.insert(
            Role::SuperUser,
            vec![
                capabilities::USER_ADMINISTRATION_READ.to_string(),
                capabilities::USER_ADMINISTRATION_WRITE.to_string(),
            ],
        );
        grants.insert(Role::RegularUser, Vec::new());
        Self { grants }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoleGrant {
    pub role: Role,
    #[schema(example = json!(["USER_ADMINISTRATION:read"]))]
    pub capabilities: Vec<String>,
}
