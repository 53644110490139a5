//! Persistence seams consumed by the evaluator and the management services.
//!
//! Implementations must enforce the uniqueness and referential constraints
//! documented on each method atomically: two concurrent writers racing on
//! the same key must leave exactly one winner, the loser receiving the
//! documented error.

use serde::{Deserialize, Serialize};

use atrium_core::{GroupId, PermissionId, UserId};

use crate::error::AccessResult;
use crate::group::{GroupPermission, GroupRemoval, PermissionGroup, UserGroup};
use crate::permissions::{PermissionType, ResourceDescriptor};
use crate::registry::{PermissionComponent, PermissionModule, PermissionPage};
use crate::roles::StaticRole;

/// Static role lookup, owned by the user-management feature.
pub trait RoleSource: Send + Sync {
    /// `None` when the user does not exist.
    fn role_of(&self, user: UserId) -> AccessResult<Option<StaticRole>>;

    fn is_owner(&self, user: UserId) -> AccessResult<bool> {
        Ok(self.role_of(user)? == Some(StaticRole::Owner))
    }

    /// Every user the source can enumerate. Sources that cannot list users
    /// return nothing; snapshots then carry no user table.
    fn known_users(&self) -> AccessResult<Vec<UserRole>> {
        Ok(Vec::new())
    }
}

/// A user and their static role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role: StaticRole,
}

/// Catalog of modules, pages and components.
pub trait RegistryStore: Send + Sync {
    /// Fails with `NameConflict` if the key exists.
    fn insert_module(&self, module: PermissionModule) -> AccessResult<()>;
    /// Fails with `ModuleNotFound`.
    fn update_module(&self, module: PermissionModule) -> AccessResult<()>;
    /// Fails with `ModuleNotFound`, or `Conflict` while pages still reference it.
    fn remove_module(&self, key: &str) -> AccessResult<PermissionModule>;
    fn module(&self, key: &str) -> AccessResult<Option<PermissionModule>>;
    fn modules(&self) -> AccessResult<Vec<PermissionModule>>;

    /// Fails with `ModuleNotFound` or `NameConflict`.
    fn insert_page(&self, page: PermissionPage) -> AccessResult<()>;
    /// Fails with `PageNotFound`.
    fn update_page(&self, page: PermissionPage) -> AccessResult<()>;
    /// Fails with `PageNotFound`, or `Conflict` while components still reference it.
    fn remove_page(&self, module_key: &str, page_key: &str) -> AccessResult<PermissionPage>;
    fn page(&self, module_key: &str, page_key: &str) -> AccessResult<Option<PermissionPage>>;
    fn pages(&self) -> AccessResult<Vec<PermissionPage>>;

    /// `page_key` is dot-qualified. Fails with `PageNotFound` or `NameConflict`.
    fn insert_component(&self, component: PermissionComponent) -> AccessResult<()>;
    /// Fails with `ComponentNotFound`.
    fn update_component(&self, component: PermissionComponent) -> AccessResult<()>;
    /// Fails with `ComponentNotFound`.
    fn remove_component(
        &self,
        page_key: &str,
        component_key: &str,
    ) -> AccessResult<PermissionComponent>;
    fn component(
        &self,
        page_key: &str,
        component_key: &str,
    ) -> AccessResult<Option<PermissionComponent>>;
    fn components(&self) -> AccessResult<Vec<PermissionComponent>>;

    fn module_exists(&self, key: &str) -> AccessResult<bool> {
        Ok(self.module(key)?.is_some())
    }

    fn page_exists(&self, module_key: &str, page_key: &str) -> AccessResult<bool> {
        Ok(self.page(module_key, page_key)?.is_some())
    }

    fn component_exists(&self, page_key: &str, component_key: &str) -> AccessResult<bool> {
        Ok(self.component(page_key, component_key)?.is_some())
    }

    /// Whether the resource and its whole ancestry are registered.
    fn contains(&self, resource: &ResourceDescriptor) -> AccessResult<bool> {
        let module = resource.module_key();
        if !self.module_exists(module)? {
            return Ok(false);
        }
        let Some(page) = resource.page_key() else {
            return Ok(true);
        };
        if !self.page_exists(module, page)? {
            return Ok(false);
        }
        match (resource.permission_type(), resource.component_key()) {
            (PermissionType::Component, Some(component)) => {
                self.component_exists(&format!("{module}.{page}"), component)
            }
            _ => Ok(true),
        }
    }
}

/// Groups and their permission entries.
pub trait PermissionStore: Send + Sync {
    /// Fails with `NameConflict` (names compare case-insensitively).
    fn insert_group(&self, group: PermissionGroup) -> AccessResult<()>;
    /// Fails with `GroupNotFound` or `NameConflict`.
    fn update_group(&self, group: PermissionGroup) -> AccessResult<()>;
    /// Removes the group together with its entries and memberships.
    fn remove_group(&self, id: GroupId) -> AccessResult<GroupRemoval>;
    fn group(&self, id: GroupId) -> AccessResult<Option<PermissionGroup>>;
    fn groups(&self) -> AccessResult<Vec<PermissionGroup>>;

    /// Inserts every entry or none. Fails with `GroupNotFound`, or with
    /// `DuplicateKey` if any key exists or repeats within the batch.
    fn insert_permissions(&self, entries: Vec<GroupPermission>) -> AccessResult<()>;
    /// Fails with `PermissionNotFound` or `DuplicateKey`.
    fn update_permission(&self, entry: GroupPermission) -> AccessResult<()>;
    /// Fails with `PermissionNotFound`.
    fn remove_permission(&self, id: PermissionId) -> AccessResult<GroupPermission>;
    fn permission(&self, id: PermissionId) -> AccessResult<Option<GroupPermission>>;
    fn permissions(&self, group: GroupId) -> AccessResult<Vec<GroupPermission>>;

    /// Entries of `group` whose resource type is `module_key`.
    fn permissions_for_module(
        &self,
        group: GroupId,
        module_key: &str,
    ) -> AccessResult<Vec<GroupPermission>> {
        Ok(self
            .permissions(group)?
            .into_iter()
            .filter(|p| p.resource.module_key() == module_key)
            .collect())
    }
}

/// User-to-group assignments.
pub trait MembershipStore: Send + Sync {
    /// Fails with `GroupNotFound` or `UserAlreadyInGroup`.
    fn insert_membership(&self, membership: UserGroup) -> AccessResult<()>;
    /// Fails with `UserNotInGroup`.
    fn remove_membership(&self, group: GroupId, user: UserId) -> AccessResult<UserGroup>;
    fn members(&self, group: GroupId) -> AccessResult<Vec<UserGroup>>;
    fn memberships_for_user(&self, user: UserId) -> AccessResult<Vec<UserGroup>>;
}

/// Everything the access-control core persists.
pub trait AccessStore: RegistryStore + PermissionStore + MembershipStore {}

impl<T> AccessStore for T where T: RegistryStore + PermissionStore + MembershipStore + ?Sized {}
