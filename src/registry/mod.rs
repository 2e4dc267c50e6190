//! Category registry: persisted state, keyword matching, id assignment.
//!
//! # Architecture
//!
//! ```text
//! CategoryAllocator
//!   - holds the exclusive lock across read -> decide -> write
//!   - matcher picks an existing category or signals a miss
//!   - RegistryStore loads and atomically replaces registry.json
//!   - AuditLog appends one line per decision
//!         |
//!    +---------+----------+
//!    |         |          |
//! matcher  RegistryStore AuditLog
//! ```
//!
//! The allocator is the only writer of registry content. Readers may load
//! the registry at any time without the lock because every save is an
//! atomic replace.

mod allocator;
mod audit;
mod error;
mod matcher;
mod store;

pub use allocator::{Assignment, AssignmentDecision, CategoryAllocator};
pub use audit::AuditLog;
pub use error::{RegistryError, RegistryResult};
pub use matcher::{extract_keywords, find_match};
pub use store::{CategoryEntry, Registry, RegistryStore, REGISTRY_FORMAT_VERSION};
