//! Permission evaluator: decides whether a user may perform an action on a
//! resource.
//!
//! Order of evaluation:
//! 1. the owner passes unconditionally;
//! 2. unregistered resources are denied (fail-closed);
//! 3. an admin passes on modules that admit the ADMIN role;
//! 4. otherwise every active group of the user gives a verdict, resolved
//!    most-specific-first along the resource lineage, and the verdicts are
//!    combined with deny-override, then OR, then default-deny.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use atrium_core::UserId;

use crate::effective::EffectivePermissionSet;
use crate::error::AccessResult;
use crate::explain::{Decision, DecisionReason, GroupVerdictDetail};
use crate::gate::{GateOutcome, StaticRoleGate};
use crate::group::{GroupPermission, PermissionGroup};
use crate::permissions::{Action, PermissionType, ResourceDescriptor};
use crate::store::{AccessStore, RoleSource};

// ─────────────────────────────────────────────────────────────────────────────
// Request / verdicts
// ─────────────────────────────────────────────────────────────────────────────

/// "May the user perform `action` on `resource`?"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub resource: ResourceDescriptor,
    pub action: Action,
}

impl PermissionRequest {
    pub fn new(resource: ResourceDescriptor, action: Action) -> Self {
        Self { resource, action }
    }

    /// Build from the five raw evaluator inputs (minus the user).
    pub fn parse(
        permission_type: PermissionType,
        resource_type: &str,
        resource_identifier: &str,
        action: Action,
    ) -> AccessResult<Self> {
        Ok(Self {
            resource: ResourceDescriptor::new(permission_type, resource_type, resource_identifier)?,
            action,
        })
    }
}

impl core::fmt::Display for PermissionRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} on {}", self.action, self.resource)
    }
}

/// A single group's opinion on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Deny,
    NoOpinion,
}

/// A group's verdict and the entry that produced it.
#[derive(Debug, Clone, Copy)]
pub struct GroupResolution<'a> {
    pub verdict: Verdict,
    pub decided_by: Option<&'a GroupPermission>,
}

/// Resolve one group's entries against a request.
///
/// Walks the resource lineage most-specific-first. At each level an entry
/// matches when it denies exactly `action`, or grants `action` or an action
/// that implies it. A deny beats a grant on the same level; the first level
/// with a match settles the verdict.
pub fn resolve_group<'a>(
    entries: &'a [GroupPermission],
    resource: &ResourceDescriptor,
    action: Action,
) -> GroupResolution<'a> {
    for level in resource.lineage() {
        let mut grant: Option<&GroupPermission> = None;

        for entry in entries.iter().filter(|e| e.resource == level) {
            if !entry.granted && entry.action == action {
                return GroupResolution {
                    verdict: Verdict::Deny,
                    decided_by: Some(entry),
                };
            }
            if entry.granted
                && entry.action.implies(action)
                && grant.is_none_or(|g| g.action != action)
            {
                grant = Some(entry);
            }
        }

        if grant.is_some() {
            return GroupResolution {
                verdict: Verdict::Allow,
                decided_by: grant,
            };
        }
    }

    GroupResolution {
        verdict: Verdict::NoOpinion,
        decided_by: None,
    }
}

/// Combine group verdicts: any deny wins, then any allow, else no opinion.
pub fn combine(verdicts: impl IntoIterator<Item = Verdict>) -> Verdict {
    let mut combined = Verdict::NoOpinion;
    for verdict in verdicts {
        match verdict {
            Verdict::Deny => return Verdict::Deny,
            Verdict::Allow => combined = Verdict::Allow,
            Verdict::NoOpinion => {}
        }
    }
    combined
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorizer surface
// ─────────────────────────────────────────────────────────────────────────────

/// The access-control surface the rest of the application calls.
///
/// The caller's user id is always passed explicitly.
pub trait Authorizer: Send + Sync {
    /// Evaluate a request and explain the outcome.
    fn check(&self, user: UserId, request: &PermissionRequest) -> AccessResult<Decision>;

    /// Full effective permission set, for audit and UI purposes.
    fn user_permissions(&self, user: UserId) -> AccessResult<EffectivePermissionSet>;

    fn is_allowed(&self, user: UserId, request: &PermissionRequest) -> AccessResult<bool> {
        Ok(self.check(user, request)?.allowed)
    }

    fn has_permission(
        &self,
        user: UserId,
        permission_type: PermissionType,
        resource_type: &str,
        resource_identifier: &str,
        action: Action,
    ) -> AccessResult<bool> {
        let request =
            PermissionRequest::parse(permission_type, resource_type, resource_identifier, action)?;
        self.is_allowed(user, &request)
    }

    fn has_module_access(&self, user: UserId, module_key: &str) -> AccessResult<bool> {
        self.has_module_action(user, module_key, Action::Read)
    }

    fn has_module_action(&self, user: UserId, module_key: &str, action: Action) -> AccessResult<bool> {
        let request = PermissionRequest::new(ResourceDescriptor::module(module_key)?, action);
        self.is_allowed(user, &request)
    }

    fn has_page_access(&self, user: UserId, module_key: &str, page_key: &str) -> AccessResult<bool> {
        self.has_page_action(user, module_key, page_key, Action::Read)
    }

    fn has_page_action(
        &self,
        user: UserId,
        module_key: &str,
        page_key: &str,
        action: Action,
    ) -> AccessResult<bool> {
        let request = PermissionRequest::new(ResourceDescriptor::page(module_key, page_key)?, action);
        self.is_allowed(user, &request)
    }

    /// `page_key` is dot-qualified (`module.page`).
    fn has_component_access(
        &self,
        user: UserId,
        page_key: &str,
        component_key: &str,
    ) -> AccessResult<bool> {
        self.has_component_action(user, page_key, component_key, Action::Read)
    }

    fn has_component_action(
        &self,
        user: UserId,
        page_key: &str,
        component_key: &str,
        action: Action,
    ) -> AccessResult<bool> {
        let request = PermissionRequest::new(
            ResourceDescriptor::component_of(page_key, component_key)?,
            action,
        );
        self.is_allowed(user, &request)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluator
// ─────────────────────────────────────────────────────────────────────────────

/// Store-backed evaluator. Stateless: every call reloads what it needs.
#[derive(Clone)]
pub struct PermissionEvaluator {
    store: Arc<dyn AccessStore>,
    roles: Arc<dyn RoleSource>,
}

impl PermissionEvaluator {
    pub fn new(store: Arc<dyn AccessStore>, roles: Arc<dyn RoleSource>) -> Self {
        Self { store, roles }
    }

    pub fn gate(&self) -> StaticRoleGate<'_, dyn AccessStore> {
        StaticRoleGate::new(self.store.as_ref(), self.roles.as_ref())
    }

    /// The user's active groups in id order.
    pub fn active_groups(&self, user: UserId) -> AccessResult<Vec<PermissionGroup>> {
        let mut groups = Vec::new();
        for membership in self.store.memberships_for_user(user)? {
            if let Some(group) = self.store.group(membership.group_id)? {
                if group.active {
                    groups.push(group);
                }
            }
        }
        groups.sort_by_key(|g| g.id);
        groups.dedup_by_key(|g| g.id);
        Ok(groups)
    }
}

impl Authorizer for PermissionEvaluator {
    fn check(&self, user: UserId, request: &PermissionRequest) -> AccessResult<Decision> {
        let gate = self.gate();
        let role = gate.role(user)?;

        let decide = |reason: DecisionReason, groups: Vec<GroupVerdictDetail>| {
            let decision = Decision::new(user, role, request.clone(), reason, groups);
            tracing::debug!(
                user = %user,
                role = %role,
                request = %request,
                allowed = decision.allowed,
                reason = ?decision.reason,
                "access evaluated"
            );
            decision
        };

        if gate.resolve(role, None) == GateOutcome::Owner {
            return Ok(decide(DecisionReason::OwnerBypass, Vec::new()));
        }

        if !self.store.contains(&request.resource)? {
            return Ok(decide(DecisionReason::UnregisteredResource, Vec::new()));
        }

        let module = self.store.module(request.resource.module_key())?;
        if gate.resolve(role, module.as_ref()) == GateOutcome::EligibleAdmin {
            return Ok(decide(DecisionReason::AdminEligible, Vec::new()));
        }

        let groups = self.active_groups(user)?;
        if groups.is_empty() {
            return Ok(decide(DecisionReason::NoActiveGroups, Vec::new()));
        }

        let mut details = Vec::with_capacity(groups.len());
        for group in groups {
            let entries = self
                .store
                .permissions_for_module(group.id, request.resource.module_key())?;
            let resolution = resolve_group(&entries, &request.resource, request.action);
            details.push(GroupVerdictDetail {
                group_id: group.id,
                group_name: group.name,
                verdict: resolution.verdict,
                decided_by: resolution.decided_by.cloned(),
            });
        }

        let reason = match combine(details.iter().map(|d| d.verdict)) {
            Verdict::Deny => DecisionReason::ExplicitDeny,
            Verdict::Allow => DecisionReason::GroupGrant,
            Verdict::NoOpinion => DecisionReason::NoMatchingGrant,
        };
        Ok(decide(reason, details))
    }

    fn user_permissions(&self, user: UserId) -> AccessResult<EffectivePermissionSet> {
        let gate = self.gate();
        let role = gate.role(user)?;
        let static_modules = gate.eligible_modules(user)?;

        let mut loaded = Vec::new();
        for group in self.active_groups(user)? {
            let entries = self.store.permissions(group.id)?;
            loaded.push((group, entries));
        }

        let mut registered = HashSet::new();
        for entry in loaded.iter().flat_map(|(_, entries)| entries) {
            if !registered.contains(&entry.resource) && self.store.contains(&entry.resource)? {
                registered.insert(entry.resource.clone());
            }
        }

        let set = EffectivePermissionSet::compute(user, role, &static_modules, &loaded, &registered);
        tracing::debug!(
            user = %user,
            role = %role,
            static_modules = set.static_modules.len(),
            permissions = set.permissions.len(),
            denials = set.denials.len(),
            "effective permissions computed"
        );
        Ok(set)
    }
}
