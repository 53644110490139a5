use std::sync::Arc;

use chrono::Utc;

use atrium_core::{GroupId, MembershipId, PermissionId, UserId};

use crate::error::{AccessError, AccessResult};
use crate::evaluator::{Authorizer, PermissionRequest};
use crate::events::{AccessEvent, AccessEventSink};
use crate::group::{
    BulkAssignReport, GroupDetails, GroupPatch, GroupPermission, GroupRemoval, NewGroup,
    NewPermission, PermissionGroup, PermissionPatch, UserGroup,
};
use crate::roles::StaticRole;
use crate::store::{AccessStore, RoleSource};

use super::{ensure_registered, publish, require_manager};

/// Group, permission-entry and membership management.
///
/// Granting entries is guarded against privilege escalation: a non-owner
/// actor may only grant what their role is admitted to on the module and
/// what they can already do themselves. Denials are never restricted.
#[derive(Clone)]
pub struct GroupService {
    store: Arc<dyn AccessStore>,
    roles: Arc<dyn RoleSource>,
    authorizer: Arc<dyn Authorizer>,
    events: Arc<dyn AccessEventSink>,
}

impl GroupService {
    pub fn new(
        store: Arc<dyn AccessStore>,
        roles: Arc<dyn RoleSource>,
        authorizer: Arc<dyn Authorizer>,
        events: Arc<dyn AccessEventSink>,
    ) -> Self {
        Self {
            store,
            roles,
            authorizer,
            events,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Groups
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_group(&self, actor: UserId, input: NewGroup) -> AccessResult<PermissionGroup> {
        require_manager(self.roles.as_ref(), actor, "create groups")?;
        let name = normalized_name(&input.name)?;

        let group = PermissionGroup {
            id: GroupId::new(),
            name,
            description: input.description.trim().to_string(),
            created_by: actor,
            active: true,
            created_at: Utc::now(),
        };
        self.store.insert_group(group.clone())?;

        tracing::info!(group = %group.id, name = %group.name, actor = %actor, "group created");
        publish(
            self.events.as_ref(),
            AccessEvent::GroupCreated {
                group_id: group.id,
                actor,
                occurred_at: Utc::now(),
            },
        );
        Ok(group)
    }

    pub fn update_group(
        &self,
        actor: UserId,
        id: GroupId,
        patch: GroupPatch,
    ) -> AccessResult<PermissionGroup> {
        require_manager(self.roles.as_ref(), actor, "update groups")?;
        let mut group = self.group(id)?;

        if let Some(name) = patch.name {
            group.name = normalized_name(&name)?;
        }
        if let Some(description) = patch.description {
            group.description = description.trim().to_string();
        }
        if let Some(active) = patch.active {
            group.active = active;
        }
        self.store.update_group(group.clone())?;

        tracing::info!(group = %id, active = group.active, actor = %actor, "group updated");
        publish(
            self.events.as_ref(),
            AccessEvent::GroupUpdated {
                group_id: id,
                actor,
                occurred_at: Utc::now(),
            },
        );
        Ok(group)
    }

    /// Delete a group together with its entries and memberships.
    pub fn delete_group(&self, actor: UserId, id: GroupId) -> AccessResult<GroupRemoval> {
        require_manager(self.roles.as_ref(), actor, "delete groups")?;
        let removal = self.store.remove_group(id)?;

        tracing::info!(
            group = %id,
            permissions_removed = removal.permissions_removed,
            members_removed = removal.former_members.len(),
            actor = %actor,
            "group deleted"
        );
        publish(
            self.events.as_ref(),
            AccessEvent::GroupDeleted {
                group_id: id,
                former_members: removal.former_members.clone(),
                actor,
                occurred_at: Utc::now(),
            },
        );
        Ok(removal)
    }

    pub fn group(&self, id: GroupId) -> AccessResult<PermissionGroup> {
        self.store.group(id)?.ok_or(AccessError::GroupNotFound(id))
    }

    /// All groups ordered by name.
    pub fn groups(&self) -> AccessResult<Vec<PermissionGroup>> {
        let mut groups = self.store.groups()?;
        groups.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(groups)
    }

    pub fn group_details(&self, id: GroupId) -> AccessResult<GroupDetails> {
        Ok(GroupDetails {
            group: self.group(id)?,
            permissions: self.store.permissions(id)?,
            members: self.store.members(id)?,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Permission entries
    // ─────────────────────────────────────────────────────────────────────

    pub fn add_permission(
        &self,
        actor: UserId,
        group_id: GroupId,
        input: NewPermission,
    ) -> AccessResult<GroupPermission> {
        let mut added = self.add_permissions(actor, group_id, vec![input])?;
        added
            .pop()
            .ok_or_else(|| AccessError::storage("permission insert returned nothing"))
    }

    /// Add several entries atomically: all are stored or none is.
    pub fn add_permissions(
        &self,
        actor: UserId,
        group_id: GroupId,
        inputs: Vec<NewPermission>,
    ) -> AccessResult<Vec<GroupPermission>> {
        let role = require_manager(self.roles.as_ref(), actor, "edit group permissions")?;
        self.group(group_id)?;
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::with_capacity(inputs.len());
        for input in inputs {
            ensure_registered(self.store.as_ref(), &input.resource)?;
            self.check_creator_access(actor, role, &input)?;
            entries.push(GroupPermission {
                id: PermissionId::new(),
                group_id,
                resource: input.resource,
                action: input.action,
                granted: input.granted,
            });
        }
        self.store.insert_permissions(entries.clone())?;

        tracing::info!(group = %group_id, count = entries.len(), actor = %actor, "permissions added");
        self.permissions_changed(actor, group_id);
        Ok(entries)
    }

    /// Change an entry's action or granted flag. The resulting key must stay
    /// unique within the group.
    pub fn update_permission(
        &self,
        actor: UserId,
        id: PermissionId,
        patch: PermissionPatch,
    ) -> AccessResult<GroupPermission> {
        let role = require_manager(self.roles.as_ref(), actor, "edit group permissions")?;
        let mut entry = self
            .store
            .permission(id)?
            .ok_or(AccessError::PermissionNotFound(id))?;

        if let Some(action) = patch.action {
            entry.action = action;
        }
        if let Some(granted) = patch.granted {
            entry.granted = granted;
        }
        let as_input = NewPermission {
            resource: entry.resource.clone(),
            action: entry.action,
            granted: entry.granted,
        };
        self.check_creator_access(actor, role, &as_input)?;
        self.store.update_permission(entry.clone())?;

        tracing::info!(permission = %id, group = %entry.group_id, actor = %actor, "permission updated");
        self.permissions_changed(actor, entry.group_id);
        Ok(entry)
    }

    pub fn remove_permission(&self, actor: UserId, id: PermissionId) -> AccessResult<GroupPermission> {
        require_manager(self.roles.as_ref(), actor, "edit group permissions")?;
        let removed = self.store.remove_permission(id)?;

        tracing::info!(permission = %id, group = %removed.group_id, actor = %actor, "permission removed");
        self.permissions_changed(actor, removed.group_id);
        Ok(removed)
    }

    pub fn permissions(&self, group_id: GroupId) -> AccessResult<Vec<GroupPermission>> {
        self.group(group_id)?;
        self.store.permissions(group_id)
    }

    fn check_creator_access(
        &self,
        actor: UserId,
        role: StaticRole,
        input: &NewPermission,
    ) -> AccessResult<()> {
        if !input.granted || role == StaticRole::Owner {
            return Ok(());
        }

        let module_key = input.resource.module_key();
        let module = self
            .store
            .module(module_key)?
            .ok_or_else(|| AccessError::ModuleNotFound(module_key.to_string()))?;
        if !module.allows_role(role) {
            tracing::warn!(actor = %actor, role = %role, module = module_key, "grant outside allowed roles rejected");
            return Err(AccessError::CreatorAccessViolation(format!(
                "module '{module_key}' does not admit role {role}"
            )));
        }

        let request = PermissionRequest::new(input.resource.clone(), input.action);
        if !self.authorizer.is_allowed(actor, &request)? {
            tracing::warn!(actor = %actor, request = %request, "privilege escalation rejected");
            return Err(AccessError::CreatorAccessViolation(format!(
                "actor {actor} cannot grant {request} without holding it"
            )));
        }
        Ok(())
    }

    fn permissions_changed(&self, actor: UserId, group_id: GroupId) {
        publish(
            self.events.as_ref(),
            AccessEvent::PermissionsChanged {
                group_id,
                actor,
                occurred_at: Utc::now(),
            },
        );
    }

    // ─────────────────────────────────────────────────────────────────────
    // Memberships
    // ─────────────────────────────────────────────────────────────────────

    pub fn assign_user(&self, actor: UserId, group_id: GroupId, user: UserId) -> AccessResult<UserGroup> {
        require_manager(self.roles.as_ref(), actor, "assign users")?;
        self.group(group_id)?;
        self.ensure_user(user)?;
        self.insert_membership(actor, group_id, user)
    }

    /// Assign every listed user, skipping those already in the group.
    ///
    /// Unknown users fail the whole call before anything is assigned.
    pub fn assign_users(
        &self,
        actor: UserId,
        group_id: GroupId,
        users: &[UserId],
    ) -> AccessResult<BulkAssignReport> {
        require_manager(self.roles.as_ref(), actor, "assign users")?;
        self.group(group_id)?;
        for user in users {
            self.ensure_user(*user)?;
        }

        let mut report = BulkAssignReport::default();
        for &user in users {
            match self.insert_membership(actor, group_id, user) {
                Ok(_) => report.assigned.push(user),
                Err(AccessError::UserAlreadyInGroup { .. }) => report.already_members.push(user),
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }

    pub fn remove_user(&self, actor: UserId, group_id: GroupId, user: UserId) -> AccessResult<UserGroup> {
        require_manager(self.roles.as_ref(), actor, "remove users")?;
        self.group(group_id)?;
        let removed = self.store.remove_membership(group_id, user)?;

        tracing::info!(group = %group_id, user = %user, actor = %actor, "user removed from group");
        self.membership_changed(actor, group_id, user);
        Ok(removed)
    }

    pub fn members(&self, group_id: GroupId) -> AccessResult<Vec<UserGroup>> {
        self.group(group_id)?;
        self.store.members(group_id)
    }

    /// Groups the user belongs to, active or not, ordered by name.
    pub fn groups_for_user(&self, user: UserId) -> AccessResult<Vec<PermissionGroup>> {
        let mut groups = Vec::new();
        for membership in self.store.memberships_for_user(user)? {
            if let Some(group) = self.store.group(membership.group_id)? {
                groups.push(group);
            }
        }
        groups.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(groups)
    }

    fn ensure_user(&self, user: UserId) -> AccessResult<()> {
        match self.roles.role_of(user)? {
            Some(_) => Ok(()),
            None => Err(AccessError::UserNotFound(user)),
        }
    }

    fn insert_membership(&self, actor: UserId, group_id: GroupId, user: UserId) -> AccessResult<UserGroup> {
        let membership = UserGroup {
            id: MembershipId::new(),
            user_id: user,
            group_id,
            assigned_by: actor,
            assigned_at: Utc::now(),
        };
        self.store.insert_membership(membership.clone())?;

        tracing::info!(group = %group_id, user = %user, actor = %actor, "user assigned to group");
        self.membership_changed(actor, group_id, user);
        Ok(membership)
    }

    fn membership_changed(&self, actor: UserId, group_id: GroupId, user_id: UserId) {
        publish(
            self.events.as_ref(),
            AccessEvent::MembershipChanged {
                group_id,
                user_id,
                actor,
                occurred_at: Utc::now(),
            },
        );
    }
}

fn normalized_name(name: &str) -> AccessResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccessError::Validation("group name must not be empty".to_string()));
    }
    Ok(name.to_string())
}
