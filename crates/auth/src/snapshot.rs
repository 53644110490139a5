//! Portable export and import of the whole access-control state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atrium_core::UserId;

use crate::error::{AccessError, AccessResult};
use crate::events::{AccessEvent, AccessEventSink};
use crate::group::{GroupPermission, PermissionGroup, UserGroup};
use crate::management::ensure_registered;
use crate::registry::{PermissionComponent, PermissionModule, PermissionPage};
use crate::roles::StaticRole;
use crate::store::{AccessStore, RoleSource, UserRole};

pub const SNAPSHOT_VERSION: u32 = 1;

/// A group with its entries and members embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    #[serde(flatten)]
    pub group: PermissionGroup,
    #[serde(default)]
    pub permissions: Vec<GroupPermission>,
    #[serde(default)]
    pub members: Vec<UserGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub modules: Vec<PermissionModule>,
    #[serde(default)]
    pub pages: Vec<PermissionPage>,
    #[serde(default)]
    pub components: Vec<PermissionComponent>,
    #[serde(default)]
    pub groups: Vec<GroupSnapshot>,
    #[serde(default)]
    pub users: Vec<UserRole>,
}

impl AccessSnapshot {
    /// Read everything through the store traits, in a stable order.
    pub fn export(store: &dyn AccessStore, roles: &dyn RoleSource) -> AccessResult<Self> {
        let mut modules = store.modules()?;
        modules.sort_by(|a, b| a.key.cmp(&b.key));
        let mut pages = store.pages()?;
        pages.sort_by_key(|p| p.qualified_key());
        let mut components = store.components()?;
        components.sort_by_key(|c| c.qualified_key());

        let mut groups = Vec::new();
        let mut stored = store.groups()?;
        stored.sort_by_key(|g| g.id);
        for group in stored {
            let mut permissions = store.permissions(group.id)?;
            permissions.sort_by(|a, b| a.key().cmp(&b.key()));
            let mut members = store.members(group.id)?;
            members.sort_by_key(|m| m.user_id);
            groups.push(GroupSnapshot {
                group,
                permissions,
                members,
            });
        }

        let mut users = roles.known_users()?;
        users.sort_by_key(|u| u.user_id);

        Ok(Self {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            modules,
            pages,
            components,
            groups,
            users,
        })
    }

    pub fn to_json(&self) -> AccessResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| AccessError::Validation(format!("snapshot serialization failed: {e}")))
    }

    pub fn from_json(json: &str) -> AccessResult<Self> {
        let snapshot: Self = serde_json::from_str(json)
            .map_err(|e| AccessError::Validation(format!("invalid snapshot: {e}")))?;
        snapshot.ensure_supported()?;
        Ok(snapshot)
    }

    pub fn ensure_supported(&self) -> AccessResult<()> {
        if self.version != SNAPSHOT_VERSION {
            return Err(AccessError::Validation(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        Ok(())
    }

    /// The unique owner recorded in the snapshot, if any.
    pub fn owner(&self) -> Option<UserId> {
        self.users
            .iter()
            .find(|u| u.role == StaticRole::Owner)
            .map(|u| u.user_id)
    }
}

/// Per-record-kind counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub modules: usize,
    pub pages: usize,
    pub components: usize,
    pub groups: usize,
    pub permissions: usize,
    pub memberships: usize,
}

impl ImportCounts {
    pub fn total(&self) -> usize {
        self.modules + self.pages + self.components + self.groups + self.permissions + self.memberships
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub created: ImportCounts,
    pub skipped: ImportCounts,
}

/// Conflicts and dangling references skip a record; anything else aborts.
fn skippable(err: &AccessError) -> bool {
    matches!(
        err,
        AccessError::NameConflict(_)
            | AccessError::DuplicateKey(_)
            | AccessError::UserAlreadyInGroup { .. }
            | AccessError::ModuleNotFound(_)
            | AccessError::PageNotFound(_)
            | AccessError::ComponentNotFound(_)
            | AccessError::GroupNotFound(_)
            | AccessError::UserNotFound(_)
            | AccessError::Conflict(_)
    )
}

/// Outcome of one insert attempt.
fn attempt(result: AccessResult<()>) -> AccessResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(err) if skippable(&err) => {
            tracing::debug!(error = %err, "snapshot record skipped");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Merge a snapshot into the store. Only the owner may import.
///
/// Existing records win: registry entries, groups, entries and memberships
/// that already exist (or conflict) are skipped and counted. Groups that
/// already exist by id still receive the snapshot's missing entries and
/// members. Entries on unregistered resources and memberships of users the
/// role source does not know are skipped. User roles are never imported.
pub fn import_snapshot(
    store: &dyn AccessStore,
    roles: &dyn RoleSource,
    events: &dyn AccessEventSink,
    actor: UserId,
    snapshot: &AccessSnapshot,
) -> AccessResult<ImportReport> {
    if !roles.is_owner(actor)? {
        tracing::warn!(actor = %actor, "snapshot import rejected for non-owner");
        return Err(AccessError::Forbidden(
            "only the owner may import a snapshot".to_string(),
        ));
    }
    snapshot.ensure_supported()?;

    let mut report = ImportReport::default();
    let mut touched_registry = Vec::new();

    for module in &snapshot.modules {
        if attempt(store.insert_module(module.clone()))? {
            report.created.modules += 1;
            touched_registry.push(module.key.clone());
        } else {
            report.skipped.modules += 1;
        }
    }
    for page in &snapshot.pages {
        if attempt(store.insert_page(page.clone()))? {
            report.created.pages += 1;
            touched_registry.push(page.qualified_key());
        } else {
            report.skipped.pages += 1;
        }
    }
    for component in &snapshot.components {
        if attempt(store.insert_component(component.clone()))? {
            report.created.components += 1;
            touched_registry.push(component.qualified_key());
        } else {
            report.skipped.components += 1;
        }
    }

    let mut published = Vec::new();
    for entry in &snapshot.groups {
        let group_id = entry.group.id;
        let usable = if store.group(group_id)?.is_some() {
            report.skipped.groups += 1;
            true
        } else if attempt(store.insert_group(entry.group.clone()))? {
            report.created.groups += 1;
            published.push(AccessEvent::GroupCreated {
                group_id,
                actor,
                occurred_at: Utc::now(),
            });
            true
        } else {
            report.skipped.groups += 1;
            false
        };

        if !usable {
            report.skipped.permissions += entry.permissions.len();
            report.skipped.memberships += entry.members.len();
            continue;
        }

        let mut permissions_created = 0;
        for permission in &entry.permissions {
            let mut permission = permission.clone();
            permission.group_id = group_id;
            let inserted = ensure_registered(store, &permission.resource)
                .and_then(|()| store.insert_permissions(vec![permission]));
            if attempt(inserted)? {
                permissions_created += 1;
            } else {
                report.skipped.permissions += 1;
            }
        }
        report.created.permissions += permissions_created;
        if permissions_created > 0 {
            published.push(AccessEvent::PermissionsChanged {
                group_id,
                actor,
                occurred_at: Utc::now(),
            });
        }

        for member in &entry.members {
            let mut member = member.clone();
            member.group_id = group_id;
            let user_id = member.user_id;
            let inserted = match roles.role_of(user_id)? {
                Some(_) => store.insert_membership(member),
                None => Err(AccessError::UserNotFound(user_id)),
            };
            if attempt(inserted)? {
                report.created.memberships += 1;
                published.push(AccessEvent::MembershipChanged {
                    group_id,
                    user_id,
                    actor,
                    occurred_at: Utc::now(),
                });
            } else {
                report.skipped.memberships += 1;
            }
        }
    }

    tracing::info!(
        actor = %actor,
        created = report.created.total(),
        skipped = report.skipped.total(),
        "snapshot imported"
    );
    for resource in touched_registry {
        events.publish(&AccessEvent::RegistryChanged {
            resource,
            actor,
            occurred_at: Utc::now(),
        });
    }
    for event in &published {
        events.publish(event);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use atrium_core::GroupId;

    use super::*;

    #[test]
    fn rejects_unknown_versions() {
        let json = r#"{"version": 99, "exported_at": "2026-01-01T00:00:00Z"}"#;
        let err = AccessSnapshot::from_json(json).unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version"));
    }

    #[test]
    fn missing_tables_default_to_empty() {
        let json = r#"{"version": 1, "exported_at": "2026-01-01T00:00:00Z"}"#;
        let snapshot = AccessSnapshot::from_json(json).unwrap();
        assert!(snapshot.modules.is_empty());
        assert!(snapshot.groups.is_empty());
        assert_eq!(snapshot.owner(), None);
    }

    #[test]
    fn malformed_resource_keys_are_rejected() {
        let group = GroupId::new();
        let json = format!(
            r#"{{
                "version": 1,
                "exported_at": "2026-01-01T00:00:00Z",
                "groups": [{{
                    "id": "{group}",
                    "name": "Support",
                    "created_by": "{creator}",
                    "active": true,
                    "created_at": "2026-01-01T00:00:00Z",
                    "permissions": [{{
                        "id": "{permission}",
                        "group_id": "{group}",
                        "resource": {{
                            "permission_type": "PAGE",
                            "resource_type": "support",
                            "resource_identifier": "Chat Page"
                        }},
                        "action": "READ",
                        "granted": true
                    }}]
                }}]
            }}"#,
            creator = UserId::new(),
            permission = atrium_core::PermissionId::new(),
        );
        assert!(AccessSnapshot::from_json(&json).is_err());
    }
}
