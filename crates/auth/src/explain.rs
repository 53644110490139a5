//! Auditable explanation of an access decision.
//!
//! Answers "why was this request allowed/denied?" without re-running the
//! evaluation.

use serde::Serialize;

use atrium_core::{GroupId, UserId};

use crate::evaluator::{PermissionRequest, Verdict};
use crate::group::GroupPermission;
use crate::roles::StaticRole;

/// Which rule produced the final answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    OwnerBypass,
    AdminEligible,
    UnregisteredResource,
    NoActiveGroups,
    ExplicitDeny,
    GroupGrant,
    NoMatchingGrant,
}

impl DecisionReason {
    pub fn allows(&self) -> bool {
        matches!(
            self,
            DecisionReason::OwnerBypass | DecisionReason::AdminEligible | DecisionReason::GroupGrant
        )
    }
}

/// One active group's verdict on the request.
#[derive(Debug, Clone, Serialize)]
pub struct GroupVerdictDetail {
    pub group_id: GroupId,
    pub group_name: String,
    pub verdict: Verdict,
    /// The entry that settled the verdict, absent for `NoOpinion`.
    pub decided_by: Option<GroupPermission>,
}

/// Result of evaluating one request, with its audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub user_id: UserId,
    pub role: StaticRole,
    pub request: PermissionRequest,
    pub allowed: bool,
    pub reason: DecisionReason,
    pub groups: Vec<GroupVerdictDetail>,
    /// Hints for an administrator when access was denied.
    pub suggestions: Vec<String>,
}

impl Decision {
    pub fn new(
        user_id: UserId,
        role: StaticRole,
        request: PermissionRequest,
        reason: DecisionReason,
        groups: Vec<GroupVerdictDetail>,
    ) -> Self {
        let suggestions = suggestions_for(reason, &request, &groups);
        Self {
            user_id,
            role,
            request,
            allowed: reason.allows(),
            reason,
            groups,
            suggestions,
        }
    }

    /// Groups whose verdict matched the final outcome.
    pub fn deciding_groups(&self) -> impl Iterator<Item = &GroupVerdictDetail> {
        let wanted = match self.reason {
            DecisionReason::ExplicitDeny => Some(Verdict::Deny),
            DecisionReason::GroupGrant => Some(Verdict::Allow),
            _ => None,
        };
        self.groups
            .iter()
            .filter(move |g| wanted == Some(g.verdict))
    }

    /// Human-readable one-liner.
    pub fn summary(&self) -> String {
        let request = &self.request;
        match self.reason {
            DecisionReason::OwnerBypass => format!("{request}: allowed, user is the owner"),
            DecisionReason::AdminEligible => format!(
                "{request}: allowed, module '{}' admits the ADMIN role",
                request.resource.module_key()
            ),
            DecisionReason::UnregisteredResource => {
                format!("{request}: denied, resource is not registered")
            }
            DecisionReason::NoActiveGroups => {
                format!("{request}: denied, user belongs to no active group")
            }
            DecisionReason::ExplicitDeny => format!(
                "{request}: denied explicitly by {}",
                names(self.deciding_groups())
            ),
            DecisionReason::GroupGrant => {
                format!("{request}: allowed by {}", names(self.deciding_groups()))
            }
            DecisionReason::NoMatchingGrant => {
                format!("{request}: denied, no group grants it")
            }
        }
    }
}

fn names<'a>(groups: impl Iterator<Item = &'a GroupVerdictDetail>) -> String {
    let names: Vec<String> = groups.map(|g| format!("'{}'", g.group_name)).collect();
    if names.is_empty() {
        "no group".to_string()
    } else {
        format!("group {}", names.join(", "))
    }
}

fn suggestions_for(
    reason: DecisionReason,
    request: &PermissionRequest,
    groups: &[GroupVerdictDetail],
) -> Vec<String> {
    match reason {
        DecisionReason::UnregisteredResource => vec![format!(
            "Register {} in the resource registry before granting access to it",
            request.resource
        )],
        DecisionReason::NoActiveGroups => vec![
            "Assign the user to a group that grants this access".to_string(),
            "Check whether the user's groups have been deactivated".to_string(),
        ],
        DecisionReason::ExplicitDeny => groups
            .iter()
            .filter(|g| g.verdict == Verdict::Deny)
            .filter_map(|g| {
                g.decided_by.as_ref().map(|entry| {
                    format!(
                        "Group '{}' denies {} on {}; remove that entry or the membership",
                        g.group_name, entry.action, entry.resource
                    )
                })
            })
            .collect(),
        DecisionReason::NoMatchingGrant => vec![
            format!(
                "Grant {} on {} or one of its ancestors to one of the user's groups",
                request.action, request.resource
            ),
        ],
        _ => Vec::new(),
    }
}
