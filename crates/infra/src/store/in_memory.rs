//! In-memory implementation of every access-control store trait.
//!
//! All tables live behind a single lock, so each trait method is one atomic
//! transaction: uniqueness checks and the writes they guard cannot interleave
//! with another writer.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use atrium_auth::permissions::split_page_key;
use atrium_auth::snapshot::AccessSnapshot;
use atrium_auth::{
    AccessError, AccessResult, GroupPermission, GroupRemoval, MembershipStore, PermissionComponent,
    PermissionGroup, PermissionKey, PermissionModule, PermissionPage, PermissionStore,
    RegistryStore, RoleSource, StaticRole, UserGroup, UserRole,
};
use atrium_core::{Entity, GroupId, MembershipId, PermissionId, UserId};

#[derive(Debug, Default)]
struct Tables {
    modules: BTreeMap<String, PermissionModule>,
    /// Keyed by (module key, page key).
    pages: BTreeMap<(String, String), PermissionPage>,
    /// Keyed by (qualified page key, component key).
    components: BTreeMap<(String, String), PermissionComponent>,
    groups: BTreeMap<GroupId, PermissionGroup>,
    permissions: BTreeMap<PermissionId, GroupPermission>,
    permission_keys: HashMap<PermissionKey, PermissionId>,
    memberships: BTreeMap<MembershipId, UserGroup>,
    users: BTreeMap<UserId, StaticRole>,
}

impl Tables {
    fn group_name_taken(&self, name: &str, except: Option<GroupId>) -> bool {
        let name = name.to_lowercase();
        self.groups
            .values()
            .any(|g| Some(g.id) != except && g.name.to_lowercase() == name)
    }

    fn membership(&self, group: GroupId, user: UserId) -> Option<&UserGroup> {
        self.memberships
            .values()
            .find(|m| m.group_id == group && m.user_id == user)
    }
}

/// Insert a record whose id must not be present yet.
fn insert_new<E: Entity>(table: &mut BTreeMap<E::Id, E>, record: &E) -> AccessResult<()>
where
    E: Clone,
{
    let id = record.id();
    if table.contains_key(&id) {
        return Err(AccessError::Conflict(format!("duplicate record id {id:?}")));
    }
    table.insert(id, record.clone());
    Ok(())
}

/// In-memory access store for tests, benches and the CLI.
///
/// Also acts as the [`RoleSource`], holding the user table and enforcing the
/// single-owner rule.
#[derive(Debug, Default)]
pub struct InMemoryAccessStore {
    tables: RwLock<Tables>,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Restore a snapshot verbatim, like a database restore: no referential
    /// checks run, so legacy orphans survive and show up in health checks.
    /// Uniqueness still holds: a repeated group name, permission key or
    /// membership fails the restore.
    pub fn from_snapshot(snapshot: &AccessSnapshot) -> AccessResult<Self> {
        snapshot.ensure_supported()?;
        let mut tables = Tables {
            modules: snapshot
                .modules
                .iter()
                .map(|m| (m.key.clone(), m.clone()))
                .collect(),
            pages: snapshot
                .pages
                .iter()
                .map(|p| ((p.module_key.clone(), p.page_key.clone()), p.clone()))
                .collect(),
            components: snapshot
                .components
                .iter()
                .map(|c| ((c.page_key.clone(), c.component_key.clone()), c.clone()))
                .collect(),
            ..Tables::default()
        };

        for entry in &snapshot.groups {
            if tables.group_name_taken(&entry.group.name, None) {
                return Err(AccessError::NameConflict(entry.group.name.clone()));
            }
            insert_new(&mut tables.groups, &entry.group)?;
        }
        for permission in snapshot.groups.iter().flat_map(|g| &g.permissions) {
            let key = permission.key();
            if tables.permission_keys.contains_key(&key) {
                return Err(AccessError::DuplicateKey(key.to_string()));
            }
            insert_new(&mut tables.permissions, permission)?;
            tables.permission_keys.insert(key, permission.id);
        }
        for member in snapshot.groups.iter().flat_map(|g| &g.members) {
            if tables.membership(member.group_id, member.user_id).is_some() {
                return Err(AccessError::UserAlreadyInGroup {
                    user: member.user_id,
                    group: member.group_id,
                });
            }
            insert_new(&mut tables.memberships, member)?;
        }

        let owners = snapshot
            .users
            .iter()
            .filter(|u| u.role == StaticRole::Owner)
            .count();
        if owners > 1 {
            return Err(AccessError::Conflict(format!(
                "snapshot names {owners} owners; exactly one is allowed"
            )));
        }
        tables.users = snapshot.users.iter().map(|u| (u.user_id, u.role)).collect();

        tracing::info!(
            modules = tables.modules.len(),
            groups = tables.groups.len(),
            users = tables.users.len(),
            "access store restored from snapshot"
        );
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    fn read(&self) -> AccessResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AccessError::storage("access store lock poisoned"))
    }

    fn write(&self) -> AccessResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AccessError::storage("access store lock poisoned"))
    }

    // ── Users (owned by user management in a real deployment) ────────────

    /// Create or re-role a user. Returns the previous role.
    ///
    /// Fails with `Conflict` when a second owner would appear.
    pub fn set_role(&self, user: UserId, role: StaticRole) -> AccessResult<Option<StaticRole>> {
        let mut tables = self.write()?;
        if role == StaticRole::Owner {
            if let Some((existing, _)) = tables
                .users
                .iter()
                .find(|(id, r)| **r == StaticRole::Owner && **id != user)
            {
                return Err(AccessError::Conflict(format!(
                    "user {existing} is already the owner"
                )));
            }
        }
        Ok(tables.users.insert(user, role))
    }

    /// Register a new user with `role`.
    pub fn add_user(&self, role: StaticRole) -> AccessResult<UserId> {
        let user = UserId::new();
        self.set_role(user, role)?;
        Ok(user)
    }
}

impl RoleSource for InMemoryAccessStore {
    fn role_of(&self, user: UserId) -> AccessResult<Option<StaticRole>> {
        Ok(self.read()?.users.get(&user).copied())
    }

    fn known_users(&self) -> AccessResult<Vec<UserRole>> {
        Ok(self
            .read()?
            .users
            .iter()
            .map(|(user_id, role)| UserRole {
                user_id: *user_id,
                role: *role,
            })
            .collect())
    }
}

impl RegistryStore for InMemoryAccessStore {
    fn insert_module(&self, module: PermissionModule) -> AccessResult<()> {
        let mut tables = self.write()?;
        if tables.modules.contains_key(&module.key) {
            return Err(AccessError::NameConflict(module.key));
        }
        tables.modules.insert(module.key.clone(), module);
        Ok(())
    }

    fn update_module(&self, module: PermissionModule) -> AccessResult<()> {
        let mut tables = self.write()?;
        match tables.modules.get_mut(&module.key) {
            Some(existing) => {
                *existing = module;
                Ok(())
            }
            None => Err(AccessError::ModuleNotFound(module.key)),
        }
    }

    fn remove_module(&self, key: &str) -> AccessResult<PermissionModule> {
        let mut tables = self.write()?;
        if !tables.modules.contains_key(key) {
            return Err(AccessError::ModuleNotFound(key.to_string()));
        }
        let dependents = tables.pages.keys().filter(|(m, _)| m == key).count();
        if dependents > 0 {
            return Err(AccessError::Conflict(format!(
                "module '{key}' still has {dependents} page(s)"
            )));
        }
        tables
            .modules
            .remove(key)
            .ok_or_else(|| AccessError::ModuleNotFound(key.to_string()))
    }

    fn module(&self, key: &str) -> AccessResult<Option<PermissionModule>> {
        Ok(self.read()?.modules.get(key).cloned())
    }

    fn modules(&self) -> AccessResult<Vec<PermissionModule>> {
        Ok(self.read()?.modules.values().cloned().collect())
    }

    fn insert_page(&self, page: PermissionPage) -> AccessResult<()> {
        let mut tables = self.write()?;
        if !tables.modules.contains_key(&page.module_key) {
            return Err(AccessError::ModuleNotFound(page.module_key));
        }
        let key = (page.module_key.clone(), page.page_key.clone());
        if tables.pages.contains_key(&key) {
            return Err(AccessError::NameConflict(page.qualified_key()));
        }
        tables.pages.insert(key, page);
        Ok(())
    }

    fn update_page(&self, page: PermissionPage) -> AccessResult<()> {
        let mut tables = self.write()?;
        let key = (page.module_key.clone(), page.page_key.clone());
        match tables.pages.get_mut(&key) {
            Some(existing) => {
                *existing = page;
                Ok(())
            }
            None => Err(AccessError::PageNotFound(page.qualified_key())),
        }
    }

    fn remove_page(&self, module_key: &str, page_key: &str) -> AccessResult<PermissionPage> {
        let mut tables = self.write()?;
        let qualified = format!("{module_key}.{page_key}");
        let key = (module_key.to_string(), page_key.to_string());
        if !tables.pages.contains_key(&key) {
            return Err(AccessError::PageNotFound(qualified));
        }
        let dependents = tables
            .components
            .keys()
            .filter(|(page, _)| *page == qualified)
            .count();
        if dependents > 0 {
            return Err(AccessError::Conflict(format!(
                "page '{qualified}' still has {dependents} component(s)"
            )));
        }
        tables
            .pages
            .remove(&key)
            .ok_or(AccessError::PageNotFound(qualified))
    }

    fn page(&self, module_key: &str, page_key: &str) -> AccessResult<Option<PermissionPage>> {
        Ok(self
            .read()?
            .pages
            .get(&(module_key.to_string(), page_key.to_string()))
            .cloned())
    }

    fn pages(&self) -> AccessResult<Vec<PermissionPage>> {
        Ok(self.read()?.pages.values().cloned().collect())
    }

    fn insert_component(&self, component: PermissionComponent) -> AccessResult<()> {
        let (module_key, page_key) = split_page_key(&component.page_key)?;
        let page = (module_key.to_string(), page_key.to_string());

        let mut tables = self.write()?;
        if !tables.pages.contains_key(&page) {
            return Err(AccessError::PageNotFound(component.page_key));
        }
        let key = (component.page_key.clone(), component.component_key.clone());
        if tables.components.contains_key(&key) {
            return Err(AccessError::NameConflict(component.qualified_key()));
        }
        tables.components.insert(key, component);
        Ok(())
    }

    fn update_component(&self, component: PermissionComponent) -> AccessResult<()> {
        let mut tables = self.write()?;
        let key = (component.page_key.clone(), component.component_key.clone());
        match tables.components.get_mut(&key) {
            Some(existing) => {
                *existing = component;
                Ok(())
            }
            None => Err(AccessError::ComponentNotFound(component.qualified_key())),
        }
    }

    fn remove_component(
        &self,
        page_key: &str,
        component_key: &str,
    ) -> AccessResult<PermissionComponent> {
        self.write()?
            .components
            .remove(&(page_key.to_string(), component_key.to_string()))
            .ok_or_else(|| AccessError::ComponentNotFound(format!("{page_key}.{component_key}")))
    }

    fn component(
        &self,
        page_key: &str,
        component_key: &str,
    ) -> AccessResult<Option<PermissionComponent>> {
        Ok(self
            .read()?
            .components
            .get(&(page_key.to_string(), component_key.to_string()))
            .cloned())
    }

    fn components(&self) -> AccessResult<Vec<PermissionComponent>> {
        Ok(self.read()?.components.values().cloned().collect())
    }
}

impl PermissionStore for InMemoryAccessStore {
    fn insert_group(&self, group: PermissionGroup) -> AccessResult<()> {
        let mut tables = self.write()?;
        if tables.groups.contains_key(&group.id) {
            return Err(AccessError::Conflict(format!("group {} already exists", group.id)));
        }
        if tables.group_name_taken(&group.name, None) {
            return Err(AccessError::NameConflict(group.name));
        }
        tables.groups.insert(group.id, group);
        Ok(())
    }

    fn update_group(&self, group: PermissionGroup) -> AccessResult<()> {
        let mut tables = self.write()?;
        if !tables.groups.contains_key(&group.id) {
            return Err(AccessError::GroupNotFound(group.id));
        }
        if tables.group_name_taken(&group.name, Some(group.id)) {
            return Err(AccessError::NameConflict(group.name));
        }
        tables.groups.insert(group.id, group);
        Ok(())
    }

    fn remove_group(&self, id: GroupId) -> AccessResult<GroupRemoval> {
        let mut tables = self.write()?;
        let group = tables.groups.remove(&id).ok_or(AccessError::GroupNotFound(id))?;

        let before = tables.permissions.len();
        tables.permissions.retain(|_, p| p.group_id != id);
        let permissions_removed = before - tables.permissions.len();
        tables.permission_keys.retain(|key, _| key.group_id != id);

        let mut former_members = Vec::new();
        tables.memberships.retain(|_, m| {
            if m.group_id == id {
                former_members.push(m.user_id);
                false
            } else {
                true
            }
        });
        former_members.sort();

        Ok(GroupRemoval {
            group,
            permissions_removed,
            former_members,
        })
    }

    fn group(&self, id: GroupId) -> AccessResult<Option<PermissionGroup>> {
        Ok(self.read()?.groups.get(&id).cloned())
    }

    fn groups(&self) -> AccessResult<Vec<PermissionGroup>> {
        Ok(self.read()?.groups.values().cloned().collect())
    }

    fn insert_permissions(&self, entries: Vec<GroupPermission>) -> AccessResult<()> {
        let mut tables = self.write()?;

        let mut batch = HashMap::with_capacity(entries.len());
        for entry in &entries {
            if !tables.groups.contains_key(&entry.group_id) {
                return Err(AccessError::GroupNotFound(entry.group_id));
            }
            let key = entry.key();
            if tables.permission_keys.contains_key(&key) || batch.insert(key.clone(), entry.id).is_some() {
                return Err(AccessError::DuplicateKey(key.to_string()));
            }
            if tables.permissions.contains_key(&entry.id) {
                return Err(AccessError::Conflict(format!(
                    "permission entry {} already exists",
                    entry.id
                )));
            }
        }

        tables.permission_keys.extend(batch);
        tables
            .permissions
            .extend(entries.into_iter().map(|e| (e.id, e)));
        Ok(())
    }

    fn update_permission(&self, entry: GroupPermission) -> AccessResult<()> {
        let mut tables = self.write()?;
        let previous = tables
            .permissions
            .get(&entry.id)
            .map(GroupPermission::key)
            .ok_or(AccessError::PermissionNotFound(entry.id))?;

        let key = entry.key();
        if tables
            .permission_keys
            .get(&key)
            .is_some_and(|owner| *owner != entry.id)
        {
            return Err(AccessError::DuplicateKey(key.to_string()));
        }

        tables.permission_keys.remove(&previous);
        tables.permission_keys.insert(key, entry.id);
        tables.permissions.insert(entry.id, entry);
        Ok(())
    }

    fn remove_permission(&self, id: PermissionId) -> AccessResult<GroupPermission> {
        let mut tables = self.write()?;
        let removed = tables
            .permissions
            .remove(&id)
            .ok_or(AccessError::PermissionNotFound(id))?;
        let key = removed.key();
        if tables.permission_keys.get(&key) == Some(&id) {
            tables.permission_keys.remove(&key);
        }
        Ok(removed)
    }

    fn permission(&self, id: PermissionId) -> AccessResult<Option<GroupPermission>> {
        Ok(self.read()?.permissions.get(&id).cloned())
    }

    fn permissions(&self, group: GroupId) -> AccessResult<Vec<GroupPermission>> {
        Ok(self
            .read()?
            .permissions
            .values()
            .filter(|p| p.group_id == group)
            .cloned()
            .collect())
    }
}

impl MembershipStore for InMemoryAccessStore {
    fn insert_membership(&self, membership: UserGroup) -> AccessResult<()> {
        let mut tables = self.write()?;
        if !tables.groups.contains_key(&membership.group_id) {
            return Err(AccessError::GroupNotFound(membership.group_id));
        }
        if tables
            .membership(membership.group_id, membership.user_id)
            .is_some()
        {
            return Err(AccessError::UserAlreadyInGroup {
                user: membership.user_id,
                group: membership.group_id,
            });
        }
        tables.memberships.insert(membership.id, membership);
        Ok(())
    }

    fn remove_membership(&self, group: GroupId, user: UserId) -> AccessResult<UserGroup> {
        let mut tables = self.write()?;
        let id = tables
            .membership(group, user)
            .map(|m| m.id)
            .ok_or(AccessError::UserNotInGroup { user, group })?;
        tables
            .memberships
            .remove(&id)
            .ok_or(AccessError::UserNotInGroup { user, group })
    }

    fn members(&self, group: GroupId) -> AccessResult<Vec<UserGroup>> {
        Ok(self
            .read()?
            .memberships
            .values()
            .filter(|m| m.group_id == group)
            .cloned()
            .collect())
    }

    fn memberships_for_user(&self, user: UserId) -> AccessResult<Vec<UserGroup>> {
        Ok(self
            .read()?
            .memberships
            .values()
            .filter(|m| m.user_id == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;

    use atrium_auth::snapshot::{GroupSnapshot, SNAPSHOT_VERSION};
    use atrium_auth::{Action, ResourceDescriptor};

    use super::*;

    fn module(key: &str) -> PermissionModule {
        PermissionModule {
            key: key.to_string(),
            name: key.to_string(),
            description: String::new(),
            allowed_roles: BTreeSet::new(),
        }
    }

    fn page(module_key: &str, page_key: &str) -> PermissionPage {
        PermissionPage {
            module_key: module_key.to_string(),
            page_key: page_key.to_string(),
            name: page_key.to_string(),
            route_path: String::new(),
            description: String::new(),
        }
    }

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

    fn grant(group: GroupId, resource: ResourceDescriptor, action: Action) -> GroupPermission {
        GroupPermission {
            id: PermissionId::new(),
            group_id: group,
            resource,
            action,
            granted: true,
        }
    }

    fn membership(group: GroupId, user: UserId) -> UserGroup {
        UserGroup {
            id: MembershipId::new(),
            user_id: user,
            group_id: group,
            assigned_by: UserId::new(),
            assigned_at: Utc::now(),
        }
    }

    fn snapshot_of(groups: Vec<GroupSnapshot>) -> AccessSnapshot {
        AccessSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            modules: vec![module("support")],
            pages: vec![page("support", "chat")],
            components: Vec::new(),
            groups,
            users: Vec::new(),
        }
    }

    #[test]
    fn restore_rejects_repeated_permission_keys() {
        let g = group("Team");
        let chat = ResourceDescriptor::page("support", "chat").unwrap();
        let mut deny = grant(g.id, chat.clone(), Action::Read);
        deny.granted = false;
        let snapshot = snapshot_of(vec![GroupSnapshot {
            group: g.clone(),
            permissions: vec![grant(g.id, chat, Action::Read), deny],
            members: Vec::new(),
        }]);

        assert!(matches!(
            InMemoryAccessStore::from_snapshot(&snapshot),
            Err(AccessError::DuplicateKey(_))
        ));
    }

    #[test]
    fn restore_rejects_repeated_group_names_and_memberships() {
        let first = group("Support");
        let second = group("support");
        let names = snapshot_of(vec![
            GroupSnapshot { group: first.clone(), permissions: Vec::new(), members: Vec::new() },
            GroupSnapshot { group: second, permissions: Vec::new(), members: Vec::new() },
        ]);
        assert!(matches!(
            InMemoryAccessStore::from_snapshot(&names),
            Err(AccessError::NameConflict(_))
        ));

        let user = UserId::new();
        let members = snapshot_of(vec![GroupSnapshot {
            group: first.clone(),
            permissions: Vec::new(),
            members: vec![membership(first.id, user), membership(first.id, user)],
        }]);
        assert!(matches!(
            InMemoryAccessStore::from_snapshot(&members),
            Err(AccessError::UserAlreadyInGroup { .. })
        ));
    }

    #[test]
    fn restored_keys_stay_indexed_after_removal() {
        let g = group("Team");
        let chat = ResourceDescriptor::page("support", "chat").unwrap();
        let read = grant(g.id, chat.clone(), Action::Read);
        let write = grant(g.id, chat.clone(), Action::Write);
        let store = InMemoryAccessStore::from_snapshot(&snapshot_of(vec![GroupSnapshot {
            group: g.clone(),
            permissions: vec![read.clone(), write.clone()],
            members: Vec::new(),
        }]))
        .unwrap();

        store.remove_permission(write.id).unwrap();
        assert!(matches!(
            store.insert_permissions(vec![grant(g.id, chat.clone(), Action::Read)]),
            Err(AccessError::DuplicateKey(_))
        ));
        store
            .insert_permissions(vec![grant(g.id, chat, Action::Write)])
            .unwrap();
        assert_eq!(store.permissions(g.id).unwrap().len(), 2);
    }

    #[test]
    fn only_one_owner_may_exist() {
        let store = InMemoryAccessStore::new();
        let owner = store.add_user(StaticRole::Owner).unwrap();
        assert!(matches!(
            store.add_user(StaticRole::Owner),
            Err(AccessError::Conflict(_))
        ));
        assert_eq!(store.set_role(owner, StaticRole::Owner).unwrap(), Some(StaticRole::Owner));
    }

    #[test]
    fn group_names_are_unique_case_insensitively() {
        let store = InMemoryAccessStore::new();
        store.insert_group(group("Support Team")).unwrap();
        assert!(matches!(
            store.insert_group(group("support team")),
            Err(AccessError::NameConflict(_))
        ));
    }

    #[test]
    fn page_needs_its_module_and_blocks_module_removal() {
        let store = InMemoryAccessStore::new();
        assert!(matches!(
            store.insert_page(page("support", "chat")),
            Err(AccessError::ModuleNotFound(_))
        ));
        store.insert_module(module("support")).unwrap();
        store.insert_page(page("support", "chat")).unwrap();
        assert!(matches!(store.remove_module("support"), Err(AccessError::Conflict(_))));
        store.remove_page("support", "chat").unwrap();
        store.remove_module("support").unwrap();
    }

    #[test]
    fn batch_insert_is_all_or_nothing() {
        let store = InMemoryAccessStore::new();
        let g = group("Team");
        store.insert_group(g.clone()).unwrap();
        let support = ResourceDescriptor::module("support").unwrap();

        let err = store
            .insert_permissions(vec![
                grant(g.id, support.clone(), Action::Read),
                grant(g.id, support.clone(), Action::Read),
            ])
            .unwrap_err();
        assert!(matches!(err, AccessError::DuplicateKey(_)));
        assert!(store.permissions(g.id).unwrap().is_empty());
    }

    #[test]
    fn update_rejects_key_collisions_and_reindexes() {
        let store = InMemoryAccessStore::new();
        let g = group("Team");
        store.insert_group(g.clone()).unwrap();
        let support = ResourceDescriptor::module("support").unwrap();
        let read = grant(g.id, support.clone(), Action::Read);
        let write = grant(g.id, support.clone(), Action::Write);
        store.insert_permissions(vec![read.clone(), write.clone()]).unwrap();

        let mut clash = write.clone();
        clash.action = Action::Read;
        assert!(matches!(
            store.update_permission(clash),
            Err(AccessError::DuplicateKey(_))
        ));

        let mut moved = write.clone();
        moved.action = Action::Delete;
        store.update_permission(moved).unwrap();
        // The old WRITE key is free again.
        store
            .insert_permissions(vec![grant(g.id, support, Action::Write)])
            .unwrap();
    }

    #[test]
    fn removing_a_group_cascades() {
        let store = InMemoryAccessStore::new();
        let g = group("Team");
        store.insert_group(g.clone()).unwrap();
        store
            .insert_permissions(vec![grant(g.id, ResourceDescriptor::module("support").unwrap(), Action::Read)])
            .unwrap();
        let user = UserId::new();
        store.insert_membership(membership(g.id, user)).unwrap();

        let removal = store.remove_group(g.id).unwrap();
        assert_eq!(removal.permissions_removed, 1);
        assert_eq!(removal.former_members, vec![user]);
        assert!(store.memberships_for_user(user).unwrap().is_empty());
    }
}
