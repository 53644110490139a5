use std::sync::Arc;

use chrono::Utc;

use atrium_core::UserId;

use crate::error::{AccessError, AccessResult};
use crate::events::{AccessEvent, AccessEventSink};
use crate::permissions::split_page_key;
use crate::registry::{
    self, CleanupReport, ComponentPatch, ModulePatch, NewComponent, NewModule, NewPage, PagePatch,
    PermissionComponent, PermissionModule, PermissionPage, RegistryHealthReport,
    RegistrySearchResults,
};
use crate::roles::StaticRole;
use crate::store::{AccessStore, RoleSource};

use super::{check_key, publish, require_manager};

/// Catalog management: create, update and delete registry entries, search,
/// health check and orphan cleanup.
#[derive(Clone)]
pub struct RegistryService {
    store: Arc<dyn AccessStore>,
    roles: Arc<dyn RoleSource>,
    events: Arc<dyn AccessEventSink>,
}

impl RegistryService {
    pub fn new(
        store: Arc<dyn AccessStore>,
        roles: Arc<dyn RoleSource>,
        events: Arc<dyn AccessEventSink>,
    ) -> Self {
        Self {
            store,
            roles,
            events,
        }
    }

    fn changed(&self, actor: UserId, resource: String) {
        publish(
            self.events.as_ref(),
            AccessEvent::RegistryChanged {
                resource,
                actor,
                occurred_at: Utc::now(),
            },
        );
    }

    // ── Modules ──────────────────────────────────────────────────────────

    pub fn create_module(&self, actor: UserId, input: NewModule) -> AccessResult<PermissionModule> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        check_key("module", &input.key)?;

        let module = PermissionModule {
            key: input.key,
            name: display_name(&input.name)?,
            description: input.description.trim().to_string(),
            allowed_roles: input.allowed_roles,
        };
        self.store.insert_module(module.clone())?;

        tracing::info!(module = %module.key, actor = %actor, "module registered");
        self.changed(actor, module.key.clone());
        Ok(module)
    }

    pub fn update_module(
        &self,
        actor: UserId,
        key: &str,
        patch: ModulePatch,
    ) -> AccessResult<PermissionModule> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        let mut module = self.module(key)?;
        if let Some(name) = patch.name {
            module.name = display_name(&name)?;
        }
        if let Some(description) = patch.description {
            module.description = description.trim().to_string();
        }
        if let Some(allowed_roles) = patch.allowed_roles {
            module.allowed_roles = allowed_roles;
        }
        self.store.update_module(module.clone())?;

        tracing::info!(module = key, actor = %actor, "module updated");
        self.changed(actor, module.key.clone());
        Ok(module)
    }

    /// Fails with `Conflict` while pages still reference the module.
    pub fn delete_module(&self, actor: UserId, key: &str) -> AccessResult<PermissionModule> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        let removed = self.store.remove_module(key)?;

        tracing::info!(module = key, actor = %actor, "module removed");
        self.changed(actor, removed.key.clone());
        Ok(removed)
    }

    pub fn module(&self, key: &str) -> AccessResult<PermissionModule> {
        self.store
            .module(key)?
            .ok_or_else(|| AccessError::ModuleNotFound(key.to_string()))
    }

    pub fn modules(&self) -> AccessResult<Vec<PermissionModule>> {
        let mut modules = self.store.modules()?;
        modules.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(modules)
    }

    /// Modules whose allowed roles include `role`.
    pub fn modules_for_role(&self, role: StaticRole) -> AccessResult<Vec<PermissionModule>> {
        Ok(self
            .modules()?
            .into_iter()
            .filter(|m| m.allows_role(role))
            .collect())
    }

    pub fn module_exists(&self, key: &str) -> AccessResult<bool> {
        self.store.module_exists(key)
    }

    // ── Pages ────────────────────────────────────────────────────────────

    /// Fails with `ModuleNotFound` if the module is absent.
    pub fn create_page(&self, actor: UserId, input: NewPage) -> AccessResult<PermissionPage> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        check_key("module", &input.module_key)?;
        check_key("page", &input.page_key)?;

        let page = PermissionPage {
            module_key: input.module_key,
            page_key: input.page_key,
            name: display_name(&input.name)?,
            route_path: input.route_path.trim().to_string(),
            description: input.description.trim().to_string(),
        };
        self.store.insert_page(page.clone())?;

        tracing::info!(page = %page.qualified_key(), actor = %actor, "page registered");
        self.changed(actor, page.qualified_key());
        Ok(page)
    }

    pub fn update_page(
        &self,
        actor: UserId,
        module_key: &str,
        page_key: &str,
        patch: PagePatch,
    ) -> AccessResult<PermissionPage> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        let mut page = self.page(module_key, page_key)?;
        if let Some(name) = patch.name {
            page.name = display_name(&name)?;
        }
        if let Some(route_path) = patch.route_path {
            page.route_path = route_path.trim().to_string();
        }
        if let Some(description) = patch.description {
            page.description = description.trim().to_string();
        }
        self.store.update_page(page.clone())?;

        tracing::info!(page = %page.qualified_key(), actor = %actor, "page updated");
        self.changed(actor, page.qualified_key());
        Ok(page)
    }

    /// Fails with `Conflict` while components still reference the page.
    pub fn delete_page(
        &self,
        actor: UserId,
        module_key: &str,
        page_key: &str,
    ) -> AccessResult<PermissionPage> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        let removed = self.store.remove_page(module_key, page_key)?;

        tracing::info!(page = %removed.qualified_key(), actor = %actor, "page removed");
        self.changed(actor, removed.qualified_key());
        Ok(removed)
    }

    pub fn page(&self, module_key: &str, page_key: &str) -> AccessResult<PermissionPage> {
        self.store
            .page(module_key, page_key)?
            .ok_or_else(|| AccessError::PageNotFound(format!("{module_key}.{page_key}")))
    }

    pub fn pages(&self) -> AccessResult<Vec<PermissionPage>> {
        let mut pages = self.store.pages()?;
        pages.sort_by_key(|p| p.qualified_key());
        Ok(pages)
    }

    pub fn page_exists(&self, module_key: &str, page_key: &str) -> AccessResult<bool> {
        self.store.page_exists(module_key, page_key)
    }

    // ── Components ───────────────────────────────────────────────────────

    /// `input.page_key` is dot-qualified. Fails with `PageNotFound` if the
    /// page is absent.
    pub fn create_component(
        &self,
        actor: UserId,
        input: NewComponent,
    ) -> AccessResult<PermissionComponent> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        split_page_key(&input.page_key)?;
        check_key("component", &input.component_key)?;

        let component = PermissionComponent {
            page_key: input.page_key,
            component_key: input.component_key,
            name: display_name(&input.name)?,
            component_type: input.component_type.trim().to_string(),
            description: input.description.trim().to_string(),
        };
        self.store.insert_component(component.clone())?;

        tracing::info!(component = %component.qualified_key(), actor = %actor, "component registered");
        self.changed(actor, component.qualified_key());
        Ok(component)
    }

    pub fn update_component(
        &self,
        actor: UserId,
        page_key: &str,
        component_key: &str,
        patch: ComponentPatch,
    ) -> AccessResult<PermissionComponent> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        let mut component = self.component(page_key, component_key)?;
        if let Some(name) = patch.name {
            component.name = display_name(&name)?;
        }
        if let Some(component_type) = patch.component_type {
            component.component_type = component_type.trim().to_string();
        }
        if let Some(description) = patch.description {
            component.description = description.trim().to_string();
        }
        self.store.update_component(component.clone())?;

        tracing::info!(component = %component.qualified_key(), actor = %actor, "component updated");
        self.changed(actor, component.qualified_key());
        Ok(component)
    }

    pub fn delete_component(
        &self,
        actor: UserId,
        page_key: &str,
        component_key: &str,
    ) -> AccessResult<PermissionComponent> {
        require_manager(self.roles.as_ref(), actor, "edit the registry")?;
        let removed = self.store.remove_component(page_key, component_key)?;

        tracing::info!(component = %removed.qualified_key(), actor = %actor, "component removed");
        self.changed(actor, removed.qualified_key());
        Ok(removed)
    }

    pub fn component(&self, page_key: &str, component_key: &str) -> AccessResult<PermissionComponent> {
        self.store
            .component(page_key, component_key)?
            .ok_or_else(|| AccessError::ComponentNotFound(format!("{page_key}.{component_key}")))
    }

    pub fn components(&self) -> AccessResult<Vec<PermissionComponent>> {
        let mut components = self.store.components()?;
        components.sort_by_key(|c| c.qualified_key());
        Ok(components)
    }

    pub fn component_exists(&self, page_key: &str, component_key: &str) -> AccessResult<bool> {
        self.store.component_exists(page_key, component_key)
    }

    // ── Search / maintenance ─────────────────────────────────────────────

    pub fn search(&self, query: &str) -> AccessResult<RegistrySearchResults> {
        Ok(registry::search(
            &self.modules()?,
            &self.pages()?,
            &self.components()?,
            query,
        ))
    }

    pub fn health_check(&self) -> AccessResult<RegistryHealthReport> {
        let report = registry::inspect(&self.modules()?, &self.pages()?, &self.components()?);
        if !report.is_healthy() {
            tracing::warn!(
                orphaned_pages = report.orphaned_pages.len(),
                orphaned_components = report.orphaned_components.len(),
                duplicate_routes = report.duplicate_routes.len(),
                "registry health check found problems"
            );
        }
        Ok(report)
    }

    /// Remove orphaned pages and components. A second run removes nothing.
    pub fn cleanup(&self, actor: UserId) -> AccessResult<CleanupReport> {
        require_manager(self.roles.as_ref(), actor, "clean up the registry")?;
        let plan = registry::plan_cleanup(&self.modules()?, &self.pages()?, &self.components()?);
        let mut report = CleanupReport::default();

        // Components first: pages refuse removal while referenced.
        for qualified in plan.removed_components {
            let Some((page_key, component_key)) = qualified.rsplit_once('.') else {
                continue;
            };
            match self.store.remove_component(page_key, component_key) {
                Ok(_) => report.removed_components.push(qualified),
                Err(AccessError::ComponentNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        for qualified in plan.removed_pages {
            let Some((module_key, page_key)) = qualified.split_once('.') else {
                continue;
            };
            match self.store.remove_page(module_key, page_key) {
                Ok(_) => report.removed_pages.push(qualified),
                Err(AccessError::PageNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        tracing::info!(
            removed_pages = report.removed_pages.len(),
            removed_components = report.removed_components.len(),
            actor = %actor,
            "registry cleanup finished"
        );
        for resource in report
            .removed_components
            .iter()
            .chain(report.removed_pages.iter())
        {
            self.changed(actor, resource.clone());
        }
        Ok(report)
    }
}

fn display_name(name: &str) -> AccessResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AccessError::Validation("name must not be empty".to_string()));
    }
    Ok(name.to_string())
}
