//! Change events emitted by the management services.
//!
//! Consumers use them for audit logging and for invalidating cached
//! decisions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use atrium_core::{GroupId, UserId};

/// Something that may change an access decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccessEvent {
    GroupCreated {
        group_id: GroupId,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    },
    /// Name, description or active flag changed.
    GroupUpdated {
        group_id: GroupId,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    },
    GroupDeleted {
        group_id: GroupId,
        former_members: Vec<UserId>,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    },
    PermissionsChanged {
        group_id: GroupId,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    },
    MembershipChanged {
        group_id: GroupId,
        user_id: UserId,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    },
    /// `resource` is the qualified registry key that changed.
    RegistryChanged {
        resource: String,
        actor: UserId,
        occurred_at: DateTime<Utc>,
    },
    /// Published by the user-management feature when a static role changes.
    RoleChanged {
        user_id: UserId,
        occurred_at: DateTime<Utc>,
    },
}

impl AccessEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AccessEvent::GroupCreated { .. } => "access.group.created",
            AccessEvent::GroupUpdated { .. } => "access.group.updated",
            AccessEvent::GroupDeleted { .. } => "access.group.deleted",
            AccessEvent::PermissionsChanged { .. } => "access.permissions.changed",
            AccessEvent::MembershipChanged { .. } => "access.membership.changed",
            AccessEvent::RegistryChanged { .. } => "access.registry.changed",
            AccessEvent::RoleChanged { .. } => "access.role.changed",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccessEvent::GroupCreated { occurred_at, .. }
            | AccessEvent::GroupUpdated { occurred_at, .. }
            | AccessEvent::GroupDeleted { occurred_at, .. }
            | AccessEvent::PermissionsChanged { occurred_at, .. }
            | AccessEvent::MembershipChanged { occurred_at, .. }
            | AccessEvent::RegistryChanged { occurred_at, .. }
            | AccessEvent::RoleChanged { occurred_at, .. } => *occurred_at,
        }
    }

    /// The group the event concerns, if any.
    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            AccessEvent::GroupCreated { group_id, .. }
            | AccessEvent::GroupUpdated { group_id, .. }
            | AccessEvent::GroupDeleted { group_id, .. }
            | AccessEvent::PermissionsChanged { group_id, .. }
            | AccessEvent::MembershipChanged { group_id, .. } => Some(*group_id),
            AccessEvent::RegistryChanged { .. } | AccessEvent::RoleChanged { .. } => None,
        }
    }
}

/// Receiver of access events. Publishing never fails the mutation that
/// caused it.
pub trait AccessEventSink: Send + Sync {
    fn publish(&self, event: &AccessEvent);
}

/// Discards events.
impl AccessEventSink for () {
    fn publish(&self, _event: &AccessEvent) {}
}

/// Fan out to several sinks in order.
impl<S: AccessEventSink + ?Sized> AccessEventSink for Vec<std::sync::Arc<S>> {
    fn publish(&self, event: &AccessEvent) {
        for sink in self {
            sink.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_are_namespaced() {
        let event = AccessEvent::MembershipChanged {
            group_id: GroupId::new(),
            user_id: UserId::new(),
            actor: UserId::new(),
            occurred_at: Utc::now(),
        };
        assert_eq!(event.event_type(), "access.membership.changed");
        assert!(event.group_id().is_some());
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = AccessEvent::RoleChanged {
            user_id: UserId::new(),
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "role_changed");
    }
}
