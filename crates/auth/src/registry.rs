//! Resource registry model: the catalog of modules, pages and components that
//! permissions may refer to.
//!
//! Everything here is plain data plus pure inspection functions; persistence
//! lives behind [`crate::store::RegistryStore`].

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::roles::StaticRole;

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Coarsest protectable resource (a feature area).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionModule {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Roles that may assign this module to a group.
    #[serde(default)]
    pub allowed_roles: BTreeSet<StaticRole>,
}

impl PermissionModule {
    pub fn allows_role(&self, role: StaticRole) -> bool {
        self.allowed_roles.contains(&role)
    }
}

/// A page inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionPage {
    pub module_key: String,
    pub page_key: String,
    pub name: String,
    #[serde(default)]
    pub route_path: String,
    #[serde(default)]
    pub description: String,
}

impl PermissionPage {
    /// `module.page`, the key components use to reference their page.
    pub fn qualified_key(&self) -> String {
        format!("{}.{}", self.module_key, self.page_key)
    }
}

/// Leaf of the registry: a single UI action or widget on a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionComponent {
    /// Dot-qualified page key (`module.page`).
    pub page_key: String,
    pub component_key: String,
    pub name: String,
    #[serde(default)]
    pub component_type: String,
    #[serde(default)]
    pub description: String,
}

impl PermissionComponent {
    pub fn qualified_key(&self) -> String {
        format!("{}.{}", self.page_key, self.component_key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewModule {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub allowed_roles: BTreeSet<StaticRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPage {
    pub module_key: String,
    pub page_key: String,
    pub name: String,
    #[serde(default)]
    pub route_path: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComponent {
    /// Dot-qualified page key (`module.page`).
    pub page_key: String,
    pub component_key: String,
    pub name: String,
    #[serde(default)]
    pub component_type: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModulePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub allowed_roles: Option<BTreeSet<StaticRole>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagePatch {
    pub name: Option<String>,
    pub route_path: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentPatch {
    pub name: Option<String>,
    pub component_type: Option<String>,
    pub description: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Health check / cleanup
// ─────────────────────────────────────────────────────────────────────────────

/// Several pages claiming the same route path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateRoute {
    pub route_path: String,
    /// Qualified keys of the pages sharing the route.
    pub pages: Vec<String>,
}

/// Result of a registry health check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryHealthReport {
    /// Qualified keys of pages whose module no longer exists.
    pub orphaned_pages: Vec<String>,
    /// Qualified keys of components whose page no longer exists.
    pub orphaned_components: Vec<String>,
    pub duplicate_routes: Vec<DuplicateRoute>,
}

impl RegistryHealthReport {
    pub fn is_healthy(&self) -> bool {
        self.orphaned_pages.is_empty()
            && self.orphaned_components.is_empty()
            && self.duplicate_routes.is_empty()
    }
}

/// What a cleanup run removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub removed_pages: Vec<String>,
    pub removed_components: Vec<String>,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.removed_pages.len() + self.removed_components.len()
    }
}

/// Inspect the registry for orphans and duplicate routes.
pub fn inspect(
    modules: &[PermissionModule],
    pages: &[PermissionPage],
    components: &[PermissionComponent],
) -> RegistryHealthReport {
    let module_keys: HashSet<&str> = modules.iter().map(|m| m.key.as_str()).collect();
    let page_keys: HashSet<String> = pages.iter().map(|p| p.qualified_key()).collect();

    let mut orphaned_pages: Vec<String> = pages
        .iter()
        .filter(|p| !module_keys.contains(p.module_key.as_str()))
        .map(|p| p.qualified_key())
        .collect();
    orphaned_pages.sort();

    let mut orphaned_components: Vec<String> = components
        .iter()
        .filter(|c| !page_keys.contains(&c.page_key))
        .map(|c| c.qualified_key())
        .collect();
    orphaned_components.sort();

    let mut by_route: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for page in pages {
        let route = page.route_path.trim();
        if !route.is_empty() {
            by_route.entry(route).or_default().push(page.qualified_key());
        }
    }
    let duplicate_routes = by_route
        .into_iter()
        .filter(|(_, keys)| keys.len() > 1)
        .map(|(route, mut keys)| {
            keys.sort();
            DuplicateRoute {
                route_path: route.to_string(),
                pages: keys,
            }
        })
        .collect();

    RegistryHealthReport {
        orphaned_pages,
        orphaned_components,
        duplicate_routes,
    }
}

/// Plan a cleanup: orphaned pages plus every component that is orphaned
/// either now or once those pages are gone.
///
/// Removing the whole plan leaves nothing for a second run to find.
pub fn plan_cleanup(
    modules: &[PermissionModule],
    pages: &[PermissionPage],
    components: &[PermissionComponent],
) -> CleanupReport {
    let module_keys: HashSet<&str> = modules.iter().map(|m| m.key.as_str()).collect();
    let surviving_pages: HashSet<String> = pages
        .iter()
        .filter(|p| module_keys.contains(p.module_key.as_str()))
        .map(|p| p.qualified_key())
        .collect();

    let mut removed_pages: Vec<String> = pages
        .iter()
        .filter(|p| !module_keys.contains(p.module_key.as_str()))
        .map(|p| p.qualified_key())
        .collect();
    removed_pages.sort();

    let mut removed_components: Vec<String> = components
        .iter()
        .filter(|c| !surviving_pages.contains(&c.page_key))
        .map(|c| c.qualified_key())
        .collect();
    removed_components.sort();

    CleanupReport {
        removed_pages,
        removed_components,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySearchResults {
    pub modules: Vec<PermissionModule>,
    pub pages: Vec<PermissionPage>,
    pub components: Vec<PermissionComponent>,
}

impl RegistrySearchResults {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.pages.is_empty() && self.components.is_empty()
    }
}

fn matches(query: &str, fields: &[&str]) -> bool {
    fields.iter().any(|f| f.to_lowercase().contains(query))
}

/// Case-insensitive free-text search over keys, names, descriptions and
/// route paths. An empty query matches everything.
pub fn search(
    modules: &[PermissionModule],
    pages: &[PermissionPage],
    components: &[PermissionComponent],
    query: &str,
) -> RegistrySearchResults {
    let query = query.trim().to_lowercase();

    RegistrySearchResults {
        modules: modules
            .iter()
            .filter(|m| matches(&query, &[&m.key, &m.name, &m.description]))
            .cloned()
            .collect(),
        pages: pages
            .iter()
            .filter(|p| {
                matches(
                    &query,
                    &[&p.qualified_key(), &p.name, &p.description, &p.route_path],
                )
            })
            .cloned()
            .collect(),
        components: components
            .iter()
            .filter(|c| {
                matches(
                    &query,
                    &[&c.qualified_key(), &c.name, &c.description, &c.component_type],
                )
            })
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(key: &str) -> PermissionModule {
        PermissionModule {
            key: key.to_string(),
            name: key.to_uppercase(),
            description: format!("{key} area"),
            allowed_roles: BTreeSet::from([StaticRole::Admin]),
        }
    }

    fn page(module_key: &str, page_key: &str, route: &str) -> PermissionPage {
        PermissionPage {
            module_key: module_key.to_string(),
            page_key: page_key.to_string(),
            name: page_key.to_string(),
            route_path: route.to_string(),
            description: String::new(),
        }
    }

    fn component(page_key: &str, key: &str) -> PermissionComponent {
        PermissionComponent {
            page_key: page_key.to_string(),
            component_key: key.to_string(),
            name: key.to_string(),
            component_type: "button".to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn healthy_registry_reports_nothing() {
        let report = inspect(
            &[module("support")],
            &[page("support", "chat", "/support/chat")],
            &[component("support.chat", "delete_message")],
        );
        assert!(report.is_healthy());
    }

    #[test]
    fn finds_orphans_and_duplicate_routes() {
        let report = inspect(
            &[module("support")],
            &[
                page("support", "chat", "/chat"),
                page("support", "tickets", "/chat"),
                page("blog", "posts", "/blog"),
            ],
            &[component("support.inbox", "archive")],
        );
        assert_eq!(report.orphaned_pages, vec!["blog.posts".to_string()]);
        assert_eq!(report.orphaned_components, vec!["support.inbox.archive".to_string()]);
        assert_eq!(report.duplicate_routes.len(), 1);
        assert_eq!(
            report.duplicate_routes[0].pages,
            vec!["support.chat".to_string(), "support.tickets".to_string()]
        );
    }

    #[test]
    fn cleanup_plan_includes_components_of_orphaned_pages() {
        let plan = plan_cleanup(
            &[module("support")],
            &[page("blog", "posts", "/blog")],
            &[component("blog.posts", "publish")],
        );
        assert_eq!(plan.removed_pages, vec!["blog.posts".to_string()]);
        assert_eq!(plan.removed_components, vec!["blog.posts.publish".to_string()]);
        assert_eq!(plan.total(), 2);
    }

    #[test]
    fn search_is_case_insensitive_across_levels() {
        let modules = [module("support"), module("finance")];
        let pages = [page("support", "chat", "/support/chat")];
        let components = [component("support.chat", "delete_message")];

        let results = search(&modules, &pages, &components, "CHAT");
        assert!(results.modules.is_empty());
        assert_eq!(results.pages.len(), 1);
        assert_eq!(results.components.len(), 1);

        let everything = search(&modules, &pages, &components, "");
        assert_eq!(everything.modules.len(), 2);
    }
}
