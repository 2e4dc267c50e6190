//! Lock-guarded category id assignment.

use chrono::Utc;
use std::fmt;

use super::audit::AuditLog;
use super::error::RegistryResult;
use super::matcher;
use super::store::RegistryStore;
use crate::config::Settings;
use crate::lock::{ExclusiveLock, LockGuard, MarkerLock};
use crate::types::{CategoryId, CategoryKey, WorkRequest};
use crate::{debug_event, log_event};

/// How an assignment was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentDecision {
    /// A keyword of an existing category matched the request.
    Matched,
    /// A new category was registered for the request.
    Registered,
    /// No keyword matched, but the derived key was already registered;
    /// the existing category's id is reused. Categories never merge.
    KeyCollision,
}

impl AssignmentDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Registered => "registered",
            Self::KeyCollision => "key-collision",
        }
    }
}

impl fmt::Display for AssignmentDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one assignment.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub id: CategoryId,
    pub key: CategoryKey,
    pub decision: AssignmentDecision,
}

/// Assigns category ids to work requests.
///
/// The allocator holds the exclusive lock across the whole
/// load -> decide -> save cycle, so concurrent processes serialize and
/// an id is never handed out twice. A matched or collided request never
/// writes; only a registration saves the registry.
pub struct CategoryAllocator {
    store: RegistryStore,
    lock: Box<dyn ExclusiveLock>,
    audit: AuditLog,
}

impl CategoryAllocator {
    pub fn new(store: RegistryStore, lock: Box<dyn ExclusiveLock>, audit: AuditLog) -> Self {
        Self { store, lock, audit }
    }

    /// Wire up an allocator from settings: marker-file lock, registry
    /// path, and audit path all from the `[registry]` section.
    pub fn from_settings(settings: &Settings) -> Self {
        let registry = &settings.registry;
        let lock = MarkerLock::new(registry.lock_path.clone())
            .with_timing(registry.lock_poll_interval(), registry.lock_max_wait())
            .with_stale_after(registry.lock_stale_after());

        Self::new(
            RegistryStore::new(registry.registry_path.clone()),
            Box::new(lock),
            AuditLog::new(registry.audit_path.clone()),
        )
    }

    /// Assign a category id for the request.
    ///
    /// Match first; only a miss attempts registration, and a registration
    /// whose derived key is already taken reuses the existing id instead
    /// of overwriting or merging.
    pub fn assign(&self, request: &WorkRequest) -> RegistryResult<Assignment> {
        let _guard = LockGuard::acquire(self.lock.as_ref())?;
        let mut registry = self.store.load()?;

        if let Some((key, entry)) = matcher::find_match(request, &registry) {
            let assignment = Assignment {
                id: entry.id.clone(),
                key: key.clone(),
                decision: AssignmentDecision::Matched,
            };
            self.audit.record(&assignment, &request.title);
            debug_event!(
                "registry",
                "matched",
                "'{}' -> {}",
                request.title,
                assignment.id
            );
            return Ok(assignment);
        }

        let key = CategoryKey::derive(&request.title);
        if let Some(existing) = registry.categories.get(&key) {
            let assignment = Assignment {
                id: existing.id.clone(),
                key,
                decision: AssignmentDecision::KeyCollision,
            };
            self.audit.record(&assignment, &request.title);
            log_event!(
                "registry",
                "key collision",
                "'{}' reuses {} ({})",
                request.title,
                assignment.id,
                assignment.key
            );
            return Ok(assignment);
        }

        let keywords = matcher::extract_keywords(request);
        let display_name = match request.title.trim() {
            "" => key.as_str().to_string(),
            title => title.to_string(),
        };
        let id = registry
            .register(key.clone(), display_name, keywords, Utc::now().date_naive())
            .id
            .clone();
        self.store.save(&mut registry)?;

        let assignment = Assignment {
            id,
            key,
            decision: AssignmentDecision::Registered,
        };
        self.audit.record(&assignment, &request.title);
        log_event!(
            "registry",
            "registered",
            "'{}' -> {} ({})",
            request.title,
            assignment.id,
            assignment.key
        );
        Ok(assignment)
    }
}
