//! Access-control error taxonomy.

use thiserror::Error;

use atrium_core::{DomainError, GroupId, PermissionId, UserId};

/// Result type used across the access-control boundary.
pub type AccessResult<T> = Result<T, AccessError>;

/// Typed failures surfaced to callers of the evaluator and the management
/// services.
///
/// Evaluation never fails for business reasons; only malformed input
/// (`InvalidPermissionKey`), an unknown user (`UserNotFound`) or a storage
/// failure escape `Authorizer::check`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("group not found: {0}")]
    GroupNotFound(GroupId),

    #[error("permission entry not found: {0}")]
    PermissionNotFound(PermissionId),

    /// Duplicate group name or registry key.
    #[error("name already in use: {0}")]
    NameConflict(String),

    /// Duplicate (group, type, resource type, resource identifier, action).
    #[error("duplicate permission key: {0}")]
    DuplicateKey(String),

    #[error("user {user} is already a member of group {group}")]
    UserAlreadyInGroup { user: UserId, group: GroupId },

    #[error("user {user} is not a member of group {group}")]
    UserNotInGroup { user: UserId, group: GroupId },

    /// A non-owner tried to grant access they do not hold themselves.
    #[error("creator access violation: {0}")]
    CreatorAccessViolation(String),

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("page not found: {0}")]
    PageNotFound(String),

    #[error("component not found: {0}")]
    ComponentNotFound(String),

    /// Descriptive conflict, e.g. deleting a registry entry that still has
    /// dependents.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid permission key: {0}")]
    InvalidPermissionKey(String),

    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The actor's static role may not perform this operation at all.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl AccessError {
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidPermissionKey(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Stable machine-readable code for logs and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            AccessError::GroupNotFound(_) => "group_not_found",
            AccessError::PermissionNotFound(_) => "permission_not_found",
            AccessError::NameConflict(_) => "name_conflict",
            AccessError::DuplicateKey(_) => "duplicate_key",
            AccessError::UserAlreadyInGroup { .. } => "user_already_in_group",
            AccessError::UserNotInGroup { .. } => "user_not_in_group",
            AccessError::CreatorAccessViolation(_) => "creator_access_violation",
            AccessError::ModuleNotFound(_) => "module_not_found",
            AccessError::PageNotFound(_) => "page_not_found",
            AccessError::ComponentNotFound(_) => "component_not_found",
            AccessError::Conflict(_) => "conflict",
            AccessError::InvalidPermissionKey(_) => "invalid_permission_key",
            AccessError::UserNotFound(_) => "user_not_found",
            AccessError::Forbidden(_) => "forbidden",
            AccessError::Validation(_) => "validation_error",
            AccessError::Storage(_) => "storage_error",
        }
    }
}

impl From<DomainError> for AccessError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => AccessError::Validation(msg),
            DomainError::InvalidId(msg) => AccessError::Validation(msg),
            DomainError::Conflict(msg) => AccessError::Conflict(msg),
        }
    }
}
