//! Effective permission set: everything a user can do, flattened for audit
//! and UI consumption.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use atrium_core::{GroupId, UserId};

use crate::evaluator::{Verdict, combine, resolve_group};
use crate::group::{GroupPermission, PermissionGroup};
use crate::permissions::{Action, ResourceDescriptor};
use crate::registry::PermissionModule;
use crate::roles::StaticRole;

/// Where an effective allowance comes from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionSource {
    StaticRole { role: StaticRole },
    Group { group_id: GroupId },
}

/// Actions the user effectively holds on one resource key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermission {
    pub resource: ResourceDescriptor,
    pub actions: BTreeSet<Action>,
    pub sources: BTreeSet<PermissionSource>,
}

/// An action explicitly and effectively denied on one resource key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveDenial {
    pub resource: ResourceDescriptor,
    pub action: Action,
    pub denied_by: Vec<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissionSet {
    pub user_id: UserId,
    pub role: StaticRole,
    /// Modules passed by the static role gate (all actions, all descendants).
    pub static_modules: BTreeSet<String>,
    pub permissions: Vec<EffectivePermission>,
    pub denials: Vec<EffectiveDenial>,
}

impl EffectivePermissionSet {
    /// Flatten static allowances and group entries.
    ///
    /// Each registered resource key mentioned by any group is evaluated for
    /// every action with the same per-group resolution and cross-group
    /// combination the evaluator uses. Keys under a statically allowed module
    /// are skipped; the gate never consults groups there.
    pub fn compute(
        user_id: UserId,
        role: StaticRole,
        static_modules: &[PermissionModule],
        groups: &[(PermissionGroup, Vec<GroupPermission>)],
        registered: &HashSet<ResourceDescriptor>,
    ) -> Self {
        let mut by_resource: BTreeMap<ResourceDescriptor, EffectivePermission> = BTreeMap::new();
        let mut static_keys = BTreeSet::new();

        for module in static_modules {
            let Ok(resource) = ResourceDescriptor::module(&module.key) else {
                continue;
            };
            static_keys.insert(module.key.clone());
            by_resource.insert(
                resource.clone(),
                EffectivePermission {
                    resource,
                    actions: Action::ALL.into_iter().collect(),
                    sources: BTreeSet::from([PermissionSource::StaticRole { role }]),
                },
            );
        }

        let keys: BTreeSet<&ResourceDescriptor> = groups
            .iter()
            .flat_map(|(_, entries)| entries.iter().map(|e| &e.resource))
            .filter(|r| registered.contains(*r) && !static_keys.contains(r.module_key()))
            .collect();

        let mut denials = Vec::new();
        for key in keys {
            for action in Action::ALL {
                let verdicts: Vec<(GroupId, Verdict)> = groups
                    .iter()
                    .map(|(group, entries)| (group.id, resolve_group(entries, key, action).verdict))
                    .collect();

                match combine(verdicts.iter().map(|(_, v)| *v)) {
                    Verdict::Allow => {
                        let effective = by_resource.entry(key.clone()).or_insert_with(|| {
                            EffectivePermission {
                                resource: key.clone(),
                                actions: BTreeSet::new(),
                                sources: BTreeSet::new(),
                            }
                        });
                        effective.actions.insert(action);
                        effective.sources.extend(
                            verdicts
                                .iter()
                                .filter(|(_, v)| *v == Verdict::Allow)
                                .map(|(group_id, _)| PermissionSource::Group { group_id: *group_id }),
                        );
                    }
                    Verdict::Deny => denials.push(EffectiveDenial {
                        resource: key.clone(),
                        action,
                        denied_by: verdicts
                            .iter()
                            .filter(|(_, v)| *v == Verdict::Deny)
                            .map(|(group_id, _)| *group_id)
                            .collect(),
                    }),
                    Verdict::NoOpinion => {}
                }
            }
        }

        Self {
            user_id,
            role,
            static_modules: static_keys,
            permissions: by_resource.into_values().collect(),
            denials,
        }
    }

    /// Actions held on exactly this resource key.
    pub fn actions_on(&self, resource: &ResourceDescriptor) -> BTreeSet<Action> {
        self.permissions
            .iter()
            .find(|p| &p.resource == resource)
            .map(|p| p.actions.clone())
            .unwrap_or_default()
    }

    /// Answer a request from the flattened set, walking the lineage
    /// most-specific-first. Meaningful for registered resources only.
    pub fn allows(&self, resource: &ResourceDescriptor, action: Action) -> bool {
        if self.static_modules.contains(resource.module_key()) {
            return true;
        }
        for level in resource.lineage() {
            if self
                .denials
                .iter()
                .any(|d| d.resource == level && d.action == action)
            {
                return false;
            }
            if self.actions_on(&level).contains(&action) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use atrium_core::PermissionId;

    use super::*;

    fn group(name: &str) -> PermissionGroup {
        PermissionGroup {
            id: GroupId::new(),
            name: name.to_string(),
            description: String::new(),
            created_by: UserId::new(),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn entry(group: &PermissionGroup, resource: ResourceDescriptor, action: Action, granted: bool) -> GroupPermission {
        GroupPermission {
            id: PermissionId::new(),
            group_id: group.id,
            resource,
            action,
            granted,
        }
    }

    #[test]
    fn group_grants_expand_along_the_action_scale() {
        let team = group("Support Team");
        let support = ResourceDescriptor::module("support").unwrap();
        let delete_message = ResourceDescriptor::component("support", "chat", "delete_message").unwrap();
        let groups = vec![(
            team.clone(),
            vec![
                entry(&team, support.clone(), Action::Write, true),
                entry(&team, delete_message.clone(), Action::Delete, false),
            ],
        )];
        let registered = HashSet::from([support.clone(), delete_message.clone()]);

        let set = EffectivePermissionSet::compute(UserId::new(), StaticRole::User, &[], &groups, &registered);

        assert_eq!(
            set.actions_on(&support),
            BTreeSet::from([Action::Read, Action::Write])
        );
        assert_eq!(
            set.actions_on(&delete_message),
            BTreeSet::from([Action::Read, Action::Write])
        );
        assert_eq!(set.denials.len(), 1);
        assert_eq!(set.denials[0].action, Action::Delete);
        assert!(set.allows(&ResourceDescriptor::page("support", "chat").unwrap(), Action::Write));
        assert!(!set.allows(&delete_message, Action::Delete));
    }

    #[test]
    fn deny_in_one_group_overrides_grant_in_another() {
        let grants = group("Writers");
        let denies = group("Restricted");
        let chat = ResourceDescriptor::page("support", "chat").unwrap();
        let groups = vec![
            (grants.clone(), vec![entry(&grants, chat.clone(), Action::Write, true)]),
            (denies.clone(), vec![entry(&denies, chat.clone(), Action::Write, false)]),
        ];
        let registered = HashSet::from([chat.clone()]);

        let set = EffectivePermissionSet::compute(UserId::new(), StaticRole::User, &[], &groups, &registered);

        assert_eq!(set.actions_on(&chat), BTreeSet::from([Action::Read]));
        assert_eq!(set.denials[0].denied_by, vec![denies.id]);
    }

    #[test]
    fn unregistered_keys_are_left_out() {
        let team = group("Team");
        let ghost = ResourceDescriptor::module("ghost").unwrap();
        let groups = vec![(team.clone(), vec![entry(&team, ghost.clone(), Action::Read, true)])];

        let set = EffectivePermissionSet::compute(UserId::new(), StaticRole::User, &[], &groups, &HashSet::new());
        assert!(set.permissions.is_empty());
    }

    #[test]
    fn static_modules_grant_everything_beneath_them() {
        let finance = PermissionModule {
            key: "finance".to_string(),
            name: "Finance".to_string(),
            description: String::new(),
            allowed_roles: BTreeSet::from([StaticRole::Admin]),
        };
        let set = EffectivePermissionSet::compute(UserId::new(), StaticRole::Admin, &[finance], &[], &HashSet::new());
        let invoice = ResourceDescriptor::component("finance", "invoices", "void").unwrap();
        assert!(set.allows(&invoice, Action::Delete));
        assert!(set.allows(&invoice, Action::Execute));
        assert!(set.static_modules.contains("finance"));
    }
}
