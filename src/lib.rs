pub mod backup;
pub mod cli;
pub mod config;
pub mod lock;
pub mod logging;
pub mod registry;
pub mod types;
pub mod watcher;

pub use backup::{BackupArchive, BackupError, RecoveryEngine};
pub use config::Settings;
pub use registry::{Assignment, AssignmentDecision, CategoryAllocator, Registry, RegistryError};
pub use types::{CategoryId, CategoryKey, WorkRequest};
pub use watcher::{DocumentGuardian, DocumentWatcher, WatchError};
