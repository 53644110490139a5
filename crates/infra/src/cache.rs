//! Per-user decision cache in front of an [`Authorizer`].
//!
//! Invalidation is driven by [`AccessEvent`]s: the cache is itself an
//! [`AccessEventSink`]. Every invalidation bumps a generation counter; a
//! result computed under an older generation is returned but never stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use atrium_auth::{
    AccessEvent, AccessEventSink, AccessResult, AccessStore, Authorizer, Decision,
    EffectivePermissionSet, PermissionRequest,
};
use atrium_core::{GroupId, UserId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub cached_users: usize,
}

#[derive(Default)]
struct UserEntry {
    decisions: HashMap<PermissionRequest, Decision>,
    effective: Option<EffectivePermissionSet>,
    last_used: u64,
}

#[derive(Default)]
struct CacheState {
    generation: u64,
    tick: u64,
    users: HashMap<UserId, UserEntry>,
}

impl CacheState {
    fn touch(&mut self, user: UserId) -> Option<&mut UserEntry> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.users.get_mut(&user)?;
        entry.last_used = tick;
        Some(entry)
    }

    /// Entry for `user`, evicting the least recently used user when full.
    fn slot(&mut self, user: UserId, max_users: usize) -> &mut UserEntry {
        if !self.users.contains_key(&user) && self.users.len() >= max_users {
            if let Some(victim) = self
                .users
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| *id)
            {
                self.users.remove(&victim);
            }
        }
        self.tick += 1;
        let tick = self.tick;
        let entry = self.users.entry(user).or_default();
        entry.last_used = tick;
        entry
    }

    fn invalidate(&mut self, users: impl IntoIterator<Item = UserId>) {
        self.generation += 1;
        for user in users {
            self.users.remove(&user);
        }
    }

    fn invalidate_all(&mut self) {
        self.generation += 1;
        self.users.clear();
    }
}

pub struct CachedAuthorizer<A> {
    inner: A,
    store: Arc<dyn AccessStore>,
    max_users: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<A: Authorizer> CachedAuthorizer<A> {
    /// `store` is consulted to find a group's members when that group
    /// changes.
    pub fn new(inner: A, store: Arc<dyn AccessStore>, max_users: usize) -> Self {
        Self {
            inner,
            store,
            max_users: max_users.max(1),
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            cached_users: self.state.lock().map(|s| s.users.len()).unwrap_or(0),
        }
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.invalidate_all();
        }
    }

    fn generation(&self) -> Option<u64> {
        self.state.lock().ok().map(|s| s.generation)
    }

    fn invalidate_group(&self, group_id: GroupId) {
        let members = self.store.members(group_id);
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        match members {
            Ok(members) => state.invalidate(members.into_iter().map(|m| m.user_id)),
            Err(err) => {
                tracing::warn!(group = %group_id, error = %err, "member lookup failed; clearing decision cache");
                state.invalidate_all();
            }
        }
    }
}

impl<A: Authorizer> Authorizer for CachedAuthorizer<A> {
    fn check(&self, user: UserId, request: &PermissionRequest) -> AccessResult<Decision> {
        if let Ok(mut state) = self.state.lock() {
            if let Some(decision) = state
                .touch(user)
                .and_then(|entry| entry.decisions.get(request))
            {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(decision.clone());
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let started = self.generation();
        let decision = self.inner.check(user, request)?;

        if let Ok(mut state) = self.state.lock() {
            if started == Some(state.generation) {
                state
                    .slot(user, self.max_users)
                    .decisions
                    .insert(request.clone(), decision.clone());
            }
        }
        Ok(decision)
    }

    fn user_permissions(&self, user: UserId) -> AccessResult<EffectivePermissionSet> {
        if let Ok(mut state) = self.state.lock() {
            if let Some(set) = state.touch(user).and_then(|entry| entry.effective.clone()) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(set);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let started = self.generation();
        let set = self.inner.user_permissions(user)?;

        if let Ok(mut state) = self.state.lock() {
            if started == Some(state.generation) {
                state.slot(user, self.max_users).effective = Some(set.clone());
            }
        }
        Ok(set)
    }
}

impl<A: Authorizer> AccessEventSink for CachedAuthorizer<A> {
    fn publish(&self, event: &AccessEvent) {
        match event {
            AccessEvent::MembershipChanged { user_id, .. } | AccessEvent::RoleChanged { user_id, .. } => {
                if let Ok(mut state) = self.state.lock() {
                    state.invalidate([*user_id]);
                }
            }
            AccessEvent::GroupDeleted { former_members, .. } => {
                if let Ok(mut state) = self.state.lock() {
                    state.invalidate(former_members.iter().copied());
                }
            }
            AccessEvent::GroupUpdated { group_id, .. } | AccessEvent::PermissionsChanged { group_id, .. } => {
                self.invalidate_group(*group_id);
            }
            // A new group has no members yet.
            AccessEvent::GroupCreated { .. } => {}
            AccessEvent::RegistryChanged { .. } => self.clear(),
        }
        tracing::debug!(event_type = event.event_type(), "decision cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use chrono::Utc;

    use atrium_auth::{Action, DecisionReason, ResourceDescriptor, StaticRole};

    use crate::store::InMemoryAccessStore;

    use super::*;

    /// Counts calls and always allows.
    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl Authorizer for Counting {
        fn check(&self, user: UserId, request: &PermissionRequest) -> AccessResult<Decision> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Decision::new(
                user,
                StaticRole::User,
                request.clone(),
                DecisionReason::GroupGrant,
                Vec::new(),
            ))
        }

        fn user_permissions(&self, user: UserId) -> AccessResult<EffectivePermissionSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EffectivePermissionSet {
                user_id: user,
                role: StaticRole::User,
                static_modules: Default::default(),
                permissions: Vec::new(),
                denials: Vec::new(),
            })
        }
    }

    fn request() -> PermissionRequest {
        PermissionRequest::new(ResourceDescriptor::module("support").unwrap(), Action::Read)
    }

    fn cache(max_users: usize) -> CachedAuthorizer<Counting> {
        CachedAuthorizer::new(Counting::default(), InMemoryAccessStore::arc(), max_users)
    }

    #[test]
    fn repeated_checks_hit_the_cache() {
        let cache = cache(8);
        let user = UserId::new();
        cache.check(user, &request()).unwrap();
        cache.check(user, &request()).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn membership_event_drops_only_that_user() {
        let cache = cache(8);
        let (alice, bob) = (UserId::new(), UserId::new());
        cache.check(alice, &request()).unwrap();
        cache.check(bob, &request()).unwrap();

        cache.publish(&AccessEvent::MembershipChanged {
            group_id: GroupId::new(),
            user_id: alice,
            actor: UserId::new(),
            occurred_at: Utc::now(),
        });
        cache.check(alice, &request()).unwrap();
        cache.check(bob, &request()).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn registry_event_clears_everything() {
        let cache = cache(8);
        let user = UserId::new();
        cache.user_permissions(user).unwrap();
        cache.publish(&AccessEvent::RegistryChanged {
            resource: "support".to_string(),
            actor: UserId::new(),
            occurred_at: Utc::now(),
        });
        assert_eq!(cache.stats().cached_users, 0);
    }

    #[test]
    fn least_recently_used_user_is_evicted() {
        let cache = cache(2);
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        cache.check(a, &request()).unwrap();
        cache.check(b, &request()).unwrap();
        cache.check(a, &request()).unwrap();
        cache.check(c, &request()).unwrap();
        assert_eq!(cache.stats().cached_users, 2);

        // `b` was evicted, `a` survived.
        cache.check(a, &request()).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 3);
        cache.check(b, &request()).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 4);
    }
}
