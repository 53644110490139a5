//! `atrium-auth`: group-based access control for modules, pages and
//! components.
//!
//! The crate is decoupled from transport and storage: persistence sits behind
//! the traits in [`store`], the user/role source behind [`RoleSource`].

pub mod effective;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod explain;
pub mod gate;
pub mod group;
pub mod management;
pub mod permissions;
pub mod registry;
pub mod roles;
pub mod snapshot;
pub mod store;

pub use effective::{EffectiveDenial, EffectivePermission, EffectivePermissionSet, PermissionSource};
pub use error::{AccessError, AccessResult};
pub use evaluator::{Authorizer, PermissionEvaluator, PermissionRequest, Verdict};
pub use events::{AccessEvent, AccessEventSink};
pub use explain::{Decision, DecisionReason, GroupVerdictDetail};
pub use gate::{GateOutcome, StaticRoleGate};
pub use group::{
    BulkAssignReport, GroupDetails, GroupPatch, GroupPermission, GroupRemoval, NewGroup,
    NewPermission, PermissionGroup, PermissionKey, PermissionPatch, UserGroup,
};
pub use management::{GroupService, RegistryService};
pub use permissions::{Action, PermissionType, ResourceDescriptor};
pub use registry::{
    CleanupReport, ComponentPatch, ModulePatch, NewComponent, NewModule, NewPage, PagePatch,
    PermissionComponent, PermissionModule, PermissionPage, RegistryHealthReport,
    RegistrySearchResults,
};
pub use roles::StaticRole;
pub use snapshot::{AccessSnapshot, GroupSnapshot, ImportReport, import_snapshot};
pub use store::{AccessStore, MembershipStore, PermissionStore, RegistryStore, RoleSource, UserRole};
