//! `atrium-core`: identifiers and error primitives shared by every atrium crate.
//!
//! This crate has no storage or transport concerns.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{GroupId, MembershipId, PermissionId, UserId};
