//! Static role gate: the short-circuit checked before any group lookup.
//!
//! The gate only ever resolves to *allow*. When it does not resolve, group
//! evaluation decides.

use atrium_core::UserId;

use crate::error::{AccessError, AccessResult};
use crate::registry::PermissionModule;
use crate::roles::StaticRole;
use crate::store::{RegistryStore, RoleSource};

/// Outcome of consulting the gate for one module.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The unique owner; passes everything.
    Owner,
    /// An admin whose module lists `ADMIN` among its allowed roles.
    EligibleAdmin,
    /// The gate has no say; evaluate groups.
    Unresolved,
}

/// Whether `role` passes the gate for `module`.
pub fn admin_eligible(role: StaticRole, module: &PermissionModule) -> bool {
    match role {
        StaticRole::Owner => true,
        StaticRole::Admin => module.allows_role(StaticRole::Admin),
        StaticRole::User => false,
    }
}

pub struct StaticRoleGate<'a, R: RegistryStore + ?Sized> {
    registry: &'a R,
    roles: &'a dyn RoleSource,
}

impl<'a, R: RegistryStore + ?Sized> StaticRoleGate<'a, R> {
    pub fn new(registry: &'a R, roles: &'a dyn RoleSource) -> Self {
        Self { registry, roles }
    }

    /// The user's static role; `UserNotFound` for unknown users.
    pub fn role(&self, user: UserId) -> AccessResult<StaticRole> {
        self.roles
            .role_of(user)?
            .ok_or(AccessError::UserNotFound(user))
    }

    pub fn is_owner(&self, user: UserId) -> AccessResult<bool> {
        Ok(self.role(user)? == StaticRole::Owner)
    }

    /// True for the owner, or for an admin on a module that allows admins.
    /// Unknown modules are never eligible.
    pub fn is_admin_eligible(&self, user: UserId, module_key: &str) -> AccessResult<bool> {
        let role = self.role(user)?;
        if role == StaticRole::Owner {
            return Ok(true);
        }
        Ok(self
            .registry
            .module(module_key)?
            .is_some_and(|module| admin_eligible(role, &module)))
    }

    /// Modules the user passes statically.
    pub fn eligible_modules(&self, user: UserId) -> AccessResult<Vec<PermissionModule>> {
        let role = self.role(user)?;
        Ok(self
            .registry
            .modules()?
            .into_iter()
            .filter(|m| admin_eligible(role, m))
            .collect())
    }

    pub fn resolve(&self, role: StaticRole, module: Option<&PermissionModule>) -> GateOutcome {
        match (role, module) {
            (StaticRole::Owner, _) => GateOutcome::Owner,
            (StaticRole::Admin, Some(module)) if admin_eligible(role, module) => {
                GateOutcome::EligibleAdmin
            }
            _ => GateOutcome::Unresolved,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn module(roles: &[StaticRole]) -> PermissionModule {
        PermissionModule {
            key: "finance".to_string(),
            name: "Finance".to_string(),
            description: String::new(),
            allowed_roles: roles.iter().copied().collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn owner_is_always_eligible() {
        assert!(admin_eligible(StaticRole::Owner, &module(&[])));
    }

    #[test]
    fn admin_needs_module_allowance() {
        assert!(admin_eligible(StaticRole::Admin, &module(&[StaticRole::Admin])));
        assert!(!admin_eligible(StaticRole::Admin, &module(&[StaticRole::User])));
    }

    #[test]
    fn plain_users_never_pass() {
        assert!(!admin_eligible(
            StaticRole::User,
            &module(&[StaticRole::User, StaticRole::Admin])
        ));
    }
}
