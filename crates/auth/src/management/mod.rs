//! Administrative services over groups, memberships and the registry.
//!
//! Every mutation takes the acting user explicitly, checks their static role,
//! writes through the store traits and publishes an [`AccessEvent`].

mod groups;
mod registry;

pub use groups::GroupService;
pub use registry::RegistryService;

use atrium_core::UserId;

use crate::error::{AccessError, AccessResult};
use crate::events::{AccessEvent, AccessEventSink};
use crate::permissions::{PermissionType, ResourceDescriptor, validate_key};
use crate::roles::StaticRole;
use crate::store::{RegistryStore, RoleSource};

/// Resolve the actor's role and reject plain users.
pub(crate) fn require_manager(
    roles: &dyn RoleSource,
    actor: UserId,
    operation: &str,
) -> AccessResult<StaticRole> {
    let role = roles.role_of(actor)?.ok_or(AccessError::UserNotFound(actor))?;
    if !role.can_manage() {
        tracing::warn!(actor = %actor, role = %role, operation, "management operation rejected");
        return Err(AccessError::Forbidden(format!(
            "role {role} may not {operation}"
        )));
    }
    Ok(role)
}

/// Key validation at the input boundary, reported as `InvalidPermissionKey`.
pub(crate) fn check_key(what: &str, key: &str) -> AccessResult<()> {
    validate_key(what, key).map_err(|e| AccessError::invalid_key(e.to_string()))
}

/// Fail with the matching `*NotFound` error for the first missing level of
/// the resource's ancestry.
pub(crate) fn ensure_registered<R: RegistryStore + ?Sized>(
    registry: &R,
    resource: &ResourceDescriptor,
) -> AccessResult<()> {
    let module = resource.module_key();
    if !registry.module_exists(module)? {
        return Err(AccessError::ModuleNotFound(module.to_string()));
    }
    let Some(page) = resource.page_key() else {
        return Ok(());
    };
    if !registry.page_exists(module, page)? {
        return Err(AccessError::PageNotFound(format!("{module}.{page}")));
    }
    if let (PermissionType::Component, Some(component)) =
        (resource.permission_type(), resource.component_key())
    {
        let page_key = format!("{module}.{page}");
        if !registry.component_exists(&page_key, component)? {
            return Err(AccessError::ComponentNotFound(format!("{page_key}.{component}")));
        }
    }
    Ok(())
}

pub(crate) fn publish(events: &dyn AccessEventSink, event: AccessEvent) {
    tracing::debug!(event_type = event.event_type(), "access event published");
    events.publish(&event);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRole(Option<StaticRole>);

    impl RoleSource for FixedRole {
        fn role_of(&self, _user: UserId) -> AccessResult<Option<StaticRole>> {
            Ok(self.0)
        }
    }

    #[test]
    fn plain_users_are_forbidden() {
        let err = require_manager(&FixedRole(Some(StaticRole::User)), UserId::new(), "create groups")
            .unwrap_err();
        assert_eq!(err.code(), "forbidden");
    }

    #[test]
    fn unknown_actor_is_reported() {
        let actor = UserId::new();
        let err = require_manager(&FixedRole(None), actor, "create groups").unwrap_err();
        assert_eq!(err, AccessError::UserNotFound(actor));
    }

    #[test]
    fn admins_and_owner_may_manage() {
        for role in [StaticRole::Admin, StaticRole::Owner] {
            assert_eq!(
                require_manager(&FixedRole(Some(role)), UserId::new(), "manage").unwrap(),
                role
            );
        }
    }

    #[test]
    fn malformed_keys_are_invalid_permission_keys() {
        let err = check_key("module", "Support-Desk").unwrap_err();
        assert_eq!(err.code(), "invalid_permission_key");
        assert!(check_key("module", "support_desk").is_ok());
    }
}
