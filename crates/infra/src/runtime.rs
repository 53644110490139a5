//! Composition root: wires the store, evaluator, cache, audit log and
//! management services together.

use std::sync::Arc;

use chrono::Utc;

use atrium_auth::snapshot::{AccessSnapshot, ImportReport, import_snapshot};
use atrium_auth::{
    AccessEvent, AccessEventSink, AccessResult, AccessStore, Authorizer, GroupService,
    PermissionEvaluator, RegistryService, RoleSource, StaticRole,
};
use atrium_core::UserId;

use crate::audit::TracingAuditSink;
use crate::cache::CachedAuthorizer;
use crate::config::AccessConfig;
use crate::store::InMemoryAccessStore;

pub struct AccessRuntime {
    pub store: Arc<InMemoryAccessStore>,
    pub authorizer: Arc<dyn Authorizer>,
    /// Present when caching is enabled.
    pub cache: Option<Arc<CachedAuthorizer<PermissionEvaluator>>>,
    pub events: Arc<dyn AccessEventSink>,
    pub groups: GroupService,
    pub registry: RegistryService,
}

impl AccessRuntime {
    pub fn new(store: Arc<InMemoryAccessStore>, config: &AccessConfig) -> Self {
        Self::with_sinks(store, config, Vec::new())
    }

    /// Like [`AccessRuntime::new`], with extra event sinks after the audit log
    /// and the cache.
    pub fn with_sinks(
        store: Arc<InMemoryAccessStore>,
        config: &AccessConfig,
        extra: Vec<Arc<dyn AccessEventSink>>,
    ) -> Self {
        let access_store: Arc<dyn AccessStore> = store.clone();
        let roles: Arc<dyn RoleSource> = store.clone();
        let evaluator = PermissionEvaluator::new(access_store.clone(), roles.clone());

        let mut sinks: Vec<Arc<dyn AccessEventSink>> = vec![Arc::new(TracingAuditSink)];
        let (authorizer, cache) = if config.cache_enabled {
            let cache = Arc::new(CachedAuthorizer::new(
                evaluator,
                access_store.clone(),
                config.cache_max_users,
            ));
            sinks.push(cache.clone());
            (cache.clone() as Arc<dyn Authorizer>, Some(cache))
        } else {
            (Arc::new(evaluator) as Arc<dyn Authorizer>, None)
        };
        sinks.extend(extra);
        let events: Arc<dyn AccessEventSink> = Arc::new(sinks);

        tracing::debug!(
            cache_enabled = config.cache_enabled,
            cache_max_users = config.cache_max_users,
            "access runtime assembled"
        );
        Self {
            groups: GroupService::new(
                access_store.clone(),
                roles.clone(),
                authorizer.clone(),
                events.clone(),
            ),
            registry: RegistryService::new(access_store, roles, events.clone()),
            store,
            authorizer,
            cache,
            events,
        }
    }

    /// Change a user's static role on behalf of user management and
    /// announce it.
    pub fn set_role(&self, user: UserId, role: StaticRole) -> AccessResult<()> {
        let previous = self.store.set_role(user, role)?;
        if previous != Some(role) {
            tracing::info!(user = %user, role = %role, "static role changed");
            self.events.publish(&AccessEvent::RoleChanged {
                user_id: user,
                occurred_at: Utc::now(),
            });
        }
        Ok(())
    }

    pub fn export(&self) -> AccessResult<AccessSnapshot> {
        AccessSnapshot::export(self.store.as_ref(), self.store.as_ref())
    }

    pub fn import(&self, actor: UserId, snapshot: &AccessSnapshot) -> AccessResult<ImportReport> {
        import_snapshot(
            self.store.as_ref(),
            self.store.as_ref(),
            self.events.as_ref(),
            actor,
            snapshot,
        )
    }
}
