//! Permission vocabulary: granularities, actions and resource descriptors.

use serde::{Deserialize, Serialize};

use atrium_core::{DomainError, DomainResult};

use crate::error::{AccessError, AccessResult};

// ─────────────────────────────────────────────────────────────────────────────
// Granularity
// ─────────────────────────────────────────────────────────────────────────────

/// Granularity of a protectable resource, coarsest first.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionType {
    Module,
    Page,
    Component,
}

impl PermissionType {
    pub const ALL: [PermissionType; 3] = [
        PermissionType::Module,
        PermissionType::Page,
        PermissionType::Component,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionType::Module => "MODULE",
            PermissionType::Page => "PAGE",
            PermissionType::Component => "COMPONENT",
        }
    }
}

impl core::fmt::Display for PermissionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for PermissionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MODULE" => Ok(PermissionType::Module),
            "PAGE" => Ok(PermissionType::Page),
            "COMPONENT" => Ok(PermissionType::Component),
            other => Err(DomainError::validation(format!(
                "unknown permission type '{other}'"
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

/// Action requested on a resource.
///
/// `Read < Write < Delete` form a scale: a granted action implies every lower
/// one. `Execute` stands alone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Read,
    Write,
    Delete,
    Execute,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Write, Action::Delete, Action::Execute];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "READ",
            Action::Write => "WRITE",
            Action::Delete => "DELETE",
            Action::Execute => "EXECUTE",
        }
    }

    fn rank(self) -> Option<u8> {
        match self {
            Action::Read => Some(0),
            Action::Write => Some(1),
            Action::Delete => Some(2),
            Action::Execute => None,
        }
    }

    /// Whether a grant of `self` also grants `other`.
    pub fn implies(self, other: Action) -> bool {
        if self == other {
            return true;
        }
        match (self.rank(), other.rank()) {
            (Some(granted), Some(requested)) => granted >= requested,
            _ => false,
        }
    }

    /// Every action implied by a grant of `self`, including itself.
    pub fn implied(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.implies(*a))
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Action {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "READ" => Ok(Action::Read),
            "WRITE" => Ok(Action::Write),
            "DELETE" => Ok(Action::Delete),
            "EXECUTE" => Ok(Action::Execute),
            other => Err(DomainError::validation(format!("unknown action '{other}'"))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Registry key format: lowercase ASCII alphanumerics and underscores.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Validate a registry key at the input boundary.
pub fn validate_key(what: &str, key: &str) -> DomainResult<()> {
    if key.is_empty() {
        return Err(DomainError::validation(format!("{what} key must not be empty")));
    }
    if !is_valid_key(key) {
        return Err(DomainError::validation(format!(
            "{what} key '{key}' must be lowercase alphanumeric or underscore"
        )));
    }
    Ok(())
}

/// Split a dot-qualified page key (`module.page`).
pub fn split_page_key(qualified: &str) -> AccessResult<(&str, &str)> {
    match qualified.split_once('.') {
        Some((module, page)) if is_valid_key(module) && is_valid_key(page) => Ok((module, page)),
        _ => Err(AccessError::invalid_key(format!(
            "page key '{qualified}' must have the form module.page"
        ))),
    }
}

fn check_segment(segment: &str, whole: &str) -> AccessResult<()> {
    if is_valid_key(segment) {
        Ok(())
    } else {
        Err(AccessError::invalid_key(format!(
            "segment '{segment}' of '{whole}' must be non-empty lowercase alphanumeric or underscore"
        )))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resource descriptor
// ─────────────────────────────────────────────────────────────────────────────

/// A protectable resource at one of the three granularities.
///
/// `resource_type` is always the module key. `resource_identifier` is the
/// module key for modules, the page key for pages and `page.component` for
/// components. Construction normalises an optional leading module segment
/// away, so two descriptors naming the same resource compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawResourceDescriptor")]
pub struct ResourceDescriptor {
    permission_type: PermissionType,
    resource_type: String,
    resource_identifier: String,
}

#[derive(Deserialize)]
struct RawResourceDescriptor {
    permission_type: PermissionType,
    resource_type: String,
    resource_identifier: String,
}

impl TryFrom<RawResourceDescriptor> for ResourceDescriptor {
    type Error = AccessError;

    fn try_from(raw: RawResourceDescriptor) -> Result<Self, Self::Error> {
        ResourceDescriptor::new(raw.permission_type, &raw.resource_type, &raw.resource_identifier)
    }
}

impl ResourceDescriptor {
    pub fn new(
        permission_type: PermissionType,
        resource_type: &str,
        resource_identifier: &str,
    ) -> AccessResult<Self> {
        let resource_type = resource_type.trim();
        let identifier = resource_identifier.trim();

        if resource_type.is_empty() {
            return Err(AccessError::invalid_key("resource type must not be empty"));
        }
        if identifier.is_empty() {
            return Err(AccessError::invalid_key("resource identifier must not be empty"));
        }
        check_segment(resource_type, resource_type)?;

        let segments: Vec<&str> = identifier.split('.').collect();
        let local: Vec<&str> = match (permission_type, segments.as_slice()) {
            (PermissionType::Module, [module]) if *module == resource_type => vec![*module],
            (PermissionType::Module, _) => {
                return Err(AccessError::invalid_key(format!(
                    "module identifier '{identifier}' must equal resource type '{resource_type}'"
                )));
            }
            (PermissionType::Page, [page]) => vec![*page],
            (PermissionType::Page, [module, page]) if *module == resource_type => vec![*page],
            (PermissionType::Page, _) => {
                return Err(AccessError::invalid_key(format!(
                    "page identifier '{identifier}' must be 'page' or '{resource_type}.page'"
                )));
            }
            (PermissionType::Component, [page, component]) => vec![*page, *component],
            (PermissionType::Component, [module, page, component])
                if *module == resource_type =>
            {
                vec![*page, *component]
            }
            (PermissionType::Component, _) => {
                return Err(AccessError::invalid_key(format!(
                    "component identifier '{identifier}' must be 'page.component'"
                )));
            }
        };

        for segment in &local {
            check_segment(segment, identifier)?;
        }

        Ok(Self {
            permission_type,
            resource_type: resource_type.to_string(),
            resource_identifier: local.join("."),
        })
    }

    pub fn module(module_key: &str) -> AccessResult<Self> {
        Self::new(PermissionType::Module, module_key, module_key)
    }

    pub fn page(module_key: &str, page_key: &str) -> AccessResult<Self> {
        Self::new(PermissionType::Page, module_key, page_key)
    }

    pub fn component(module_key: &str, page_key: &str, component_key: &str) -> AccessResult<Self> {
        Self::new(
            PermissionType::Component,
            module_key,
            &format!("{page_key}.{component_key}"),
        )
    }

    /// Component addressed by its dot-qualified page key (`module.page`).
    pub fn component_of(qualified_page_key: &str, component_key: &str) -> AccessResult<Self> {
        let (module, page) = split_page_key(qualified_page_key)?;
        Self::component(module, page, component_key)
    }

    pub fn permission_type(&self) -> PermissionType {
        self.permission_type
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_identifier(&self) -> &str {
        &self.resource_identifier
    }

    pub fn module_key(&self) -> &str {
        &self.resource_type
    }

    pub fn page_key(&self) -> Option<&str> {
        match self.permission_type {
            PermissionType::Module => None,
            PermissionType::Page => Some(&self.resource_identifier),
            PermissionType::Component => self.resource_identifier.split('.').next(),
        }
    }

    pub fn component_key(&self) -> Option<&str> {
        match self.permission_type {
            PermissionType::Component => self.resource_identifier.split('.').nth(1),
            _ => None,
        }
    }

    /// `module`, `module.page` or `module.page.component`.
    pub fn qualified(&self) -> String {
        match self.permission_type {
            PermissionType::Module => self.resource_type.clone(),
            _ => format!("{}.{}", self.resource_type, self.resource_identifier),
        }
    }

    /// The enclosing resource one level up, if any.
    pub fn parent(&self) -> Option<ResourceDescriptor> {
        match self.permission_type {
            PermissionType::Module => None,
            PermissionType::Page => Some(Self {
                permission_type: PermissionType::Module,
                resource_type: self.resource_type.clone(),
                resource_identifier: self.resource_type.clone(),
            }),
            PermissionType::Component => self.page_key().map(|page| Self {
                permission_type: PermissionType::Page,
                resource_type: self.resource_type.clone(),
                resource_identifier: page.to_string(),
            }),
        }
    }

    /// This resource followed by its ancestors, most specific first.
    pub fn lineage(&self) -> Vec<ResourceDescriptor> {
        let mut chain = vec![self.clone()];
        while let Some(parent) = chain.last().and_then(|d| d.parent()) {
            chain.push(parent);
        }
        chain
    }

    /// Whether `self` is `other` or lies beneath it.
    pub fn is_within(&self, other: &ResourceDescriptor) -> bool {
        self.lineage().iter().any(|d| d == other)
    }
}

impl core::fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.permission_type, self.qualified())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_implies_read_but_not_delete() {
        assert!(Action::Write.implies(Action::Read));
        assert!(!Action::Write.implies(Action::Delete));
        assert!(Action::Delete.implies(Action::Read));
        assert!(!Action::Read.implies(Action::Write));
    }

    #[test]
    fn execute_is_independent() {
        for action in [Action::Read, Action::Write, Action::Delete] {
            assert!(!Action::Execute.implies(action));
            assert!(!action.implies(Action::Execute));
        }
        assert!(Action::Execute.implies(Action::Execute));
    }

    #[test]
    fn implied_lists_lower_actions() {
        let implied: Vec<_> = Action::Delete.implied().collect();
        assert_eq!(implied, vec![Action::Read, Action::Write, Action::Delete]);
    }

    #[test]
    fn component_identifier_normalises_module_prefix() {
        let short = ResourceDescriptor::new(PermissionType::Component, "support", "chat.delete_message")
            .unwrap();
        let long = ResourceDescriptor::new(
            PermissionType::Component,
            "support",
            "support.chat.delete_message",
        )
        .unwrap();
        assert_eq!(short, long);
        assert_eq!(short.page_key(), Some("chat"));
        assert_eq!(short.component_key(), Some("delete_message"));
        assert_eq!(short.qualified(), "support.chat.delete_message");
    }

    #[test]
    fn lineage_runs_most_specific_first() {
        let component = ResourceDescriptor::component("support", "chat", "delete_message").unwrap();
        let lineage = component.lineage();
        assert_eq!(lineage.len(), 3);
        assert_eq!(lineage[0], component);
        assert_eq!(lineage[1], ResourceDescriptor::page("support", "chat").unwrap());
        assert_eq!(lineage[2], ResourceDescriptor::module("support").unwrap());
    }

    #[test]
    fn is_within_checks_ancestry() {
        let page = ResourceDescriptor::page("support", "chat").unwrap();
        let module = ResourceDescriptor::module("support").unwrap();
        let other = ResourceDescriptor::module("finance").unwrap();
        assert!(page.is_within(&module));
        assert!(page.is_within(&page));
        assert!(!module.is_within(&page));
        assert!(!page.is_within(&other));
    }

    #[test]
    fn empty_identifiers_are_rejected() {
        let err = ResourceDescriptor::new(PermissionType::Page, "support", "  ").unwrap_err();
        assert!(matches!(err, AccessError::InvalidPermissionKey(_)));

        let err = ResourceDescriptor::new(PermissionType::Module, "", "support").unwrap_err();
        assert!(matches!(err, AccessError::InvalidPermissionKey(_)));
    }

    #[test]
    fn malformed_identifiers_are_rejected() {
        assert!(ResourceDescriptor::new(PermissionType::Module, "support", "finance").is_err());
        assert!(ResourceDescriptor::new(PermissionType::Page, "support", "other.chat").is_err());
        assert!(ResourceDescriptor::new(PermissionType::Component, "support", "chat").is_err());
        assert!(ResourceDescriptor::new(PermissionType::Component, "support", "chat..x").is_err());
        assert!(ResourceDescriptor::new(PermissionType::Page, "Support", "chat").is_err());
    }

    #[test]
    fn component_of_splits_qualified_page() {
        let d = ResourceDescriptor::component_of("support.chat", "delete_message").unwrap();
        assert_eq!(d.module_key(), "support");
        assert!(ResourceDescriptor::component_of("chat", "delete_message").is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: ResourceDescriptor = serde_json::from_value(serde_json::json!({
            "permission_type": "PAGE",
            "resource_type": "support",
            "resource_identifier": "support.chat"
        }))
        .unwrap();
        assert_eq!(ok.resource_identifier(), "chat");

        let bad = serde_json::from_value::<ResourceDescriptor>(serde_json::json!({
            "permission_type": "MODULE",
            "resource_type": "support",
            "resource_identifier": "BAD"
        }));
        assert!(bad.is_err());
    }

    #[test]
    fn key_format() {
        assert!(is_valid_key("delete_message"));
        assert!(is_valid_key("v2"));
        assert!(!is_valid_key("Delete"));
        assert!(!is_valid_key("a-b"));
        assert!(!is_valid_key(""));
        assert!(validate_key("module", "a b").is_err());
    }
}
