//! Permission groups, their entries and their memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atrium_core::{Entity, GroupId, MembershipId, PermissionId, UserId};

use crate::permissions::{Action, ResourceDescriptor};

/// An administrator-defined bundle of permission entries.
///
/// Entries and members are stored separately and referenced by `group_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_by: UserId,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for PermissionGroup {
    type Id = GroupId;

    fn id(&self) -> GroupId {
        self.id
    }
}

/// One (resource, action, granted) rule inside a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPermission {
    pub id: PermissionId,
    pub group_id: GroupId,
    pub resource: ResourceDescriptor,
    pub action: Action,
    pub granted: bool,
}

impl GroupPermission {
    pub fn key(&self) -> PermissionKey {
        PermissionKey {
            group_id: self.group_id,
            resource: self.resource.clone(),
            action: self.action,
        }
    }
}

impl Entity for GroupPermission {
    type Id = PermissionId;

    fn id(&self) -> PermissionId {
        self.id
    }
}

/// Uniqueness key of a permission entry: at most one entry per key per group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionKey {
    pub group_id: GroupId,
    pub resource: ResourceDescriptor,
    pub action: Action,
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "group {} {} {}", self.group_id, self.resource, self.action)
    }
}

/// Assignment of a user to a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroup {
    pub id: MembershipId,
    pub user_id: UserId,
    pub group_id: GroupId,
    pub assigned_by: UserId,
    pub assigned_at: DateTime<Utc>,
}

impl Entity for UserGroup {
    type Id = MembershipId;

    fn id(&self) -> MembershipId {
        self.id
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewGroup {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPermission {
    pub resource: ResourceDescriptor,
    pub action: Action,
    pub granted: bool,
}

impl NewPermission {
    pub fn grant(resource: ResourceDescriptor, action: Action) -> Self {
        Self {
            resource,
            action,
            granted: true,
        }
    }

    pub fn deny(resource: ResourceDescriptor, action: Action) -> Self {
        Self {
            resource,
            action,
            granted: false,
        }
    }
}

/// Partial update of a permission entry. The resource is fixed; re-targeting
/// an entry means removing it and adding a new one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionPatch {
    pub action: Option<Action>,
    pub granted: Option<bool>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Read views
// ─────────────────────────────────────────────────────────────────────────────

/// Group with its entries and members, loaded in one call.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetails {
    pub group: PermissionGroup,
    pub permissions: Vec<GroupPermission>,
    pub members: Vec<UserGroup>,
}

/// What a group deletion cascaded to.
#[derive(Debug, Clone, Serialize)]
pub struct GroupRemoval {
    pub group: PermissionGroup,
    pub permissions_removed: usize,
    /// Users that were members at deletion time.
    pub former_members: Vec<UserId>,
}

/// Outcome of a bulk user assignment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkAssignReport {
    pub assigned: Vec<UserId>,
    pub already_members: Vec<UserId>,
}
