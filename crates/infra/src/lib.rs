//! Infrastructure layer: in-memory persistence, decision caching, audit
//! logging and configuration for the access-control core.

pub mod audit;
pub mod cache;
pub mod config;
pub mod runtime;
pub mod store;


pub use audit::TracingAuditSink;
pub use cache::{CacheStats, CachedAuthorizer};
pub use config::{AccessConfig, ConfigError};
pub use runtime::AccessRuntime;
pub use store::InMemoryAccessStore;
