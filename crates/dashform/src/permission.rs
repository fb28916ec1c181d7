// File: src/permission.rs
// Purpose: Role and permission checks over a user profile

use crate::config::PermissionsConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// The permission source: any backend user record with this shape works
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    /// Tenants the user is a member of
    #[serde(default)]
    pub tenant_ids: Vec<String>,
    #[serde(default)]
    pub active_organization: Option<String>,
}

/// Raised by [`Permissions::require`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing permission '{permission}'")]
pub struct PermissionDenied {
    pub permission: String,
}

/// Granted roles and permissions of the signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions {
    roles: BTreeSet<String>,
    granted: BTreeSet<String>,
    admin_roles: BTreeSet<String>,
    wildcard: String,
    separator: String,
}

impl Permissions {
    pub fn new(profile: &UserProfile, config: &PermissionsConfig) -> Self {
        Self {
            roles: profile.roles.iter().cloned().collect(),
            granted: profile.permissions.iter().cloned().collect(),
            admin_roles: config.admin_roles.iter().cloned().collect(),
            wildcard: config.wildcard.clone(),
            separator: config.separator.clone(),
        }
    }

    /// No roles, no permissions (signed out)
    pub fn empty(config: &PermissionsConfig) -> Self {
        Self::new(&UserProfile::default(), config)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Administrative roles bypass every check
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|role| self.admin_roles.contains(role))
    }

    /// Admin bypass, exact grant, `resource:*` for any prefix of the
    /// permission, or a global `*:*` / `*`
    pub fn has_permission(&self, permission: &str) -> bool {
        if self.is_admin() || self.granted.contains(permission) {
            return true;
        }

        let global = format!("{0}{1}{0}", self.wildcard, self.separator);
        if self.granted.contains(&self.wildcard) || self.granted.contains(&global) {
            return true;
        }

        // billing:invoices:read is covered by billing:* and billing:invoices:*
        permission
            .match_indices(self.separator.as_str())
            .any(|(at, _)| {
                let scoped = format!("{}{}{}", &permission[..at], self.separator, self.wildcard);
                self.granted.contains(&scoped)
            })
    }

    /// False for an empty list
    pub fn has_any_permission<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions.iter().any(|p| self.has_permission(p.as_ref()))
    }

    /// True for an empty list
    pub fn has_all_permissions<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions.iter().all(|p| self.has_permission(p.as_ref()))
    }

    pub fn require(&self, permission: &str) -> Result<(), PermissionDenied> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(PermissionDenied {
                permission: permission.to_string(),
            })
        }
    }
}
