//! Persisted registry model and its on-disk store.

use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::error::{RegistryError, RegistryResult};
use crate::types::{CategoryId, CategoryKey};

/// Version of the registry file format.
pub const REGISTRY_FORMAT_VERSION: u32 = 1;

/// One registered category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    /// Assigned id. Immutable once assigned.
    pub id: CategoryId,

    /// Human-readable name, taken from the registering request's title.
    pub display_name: String,

    /// Match keywords in priority order (at most five, lowercased).
    pub keywords: Vec<String>,

    /// Date the category was registered.
    pub created_date: NaiveDate,
}

/// The full category registry.
///
/// `categories` preserves registration order, which is also the matcher's
/// iteration order, so match outcomes are deterministic across save/load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    /// Version of the registry file format
    pub version: u32,

    /// Registered categories, keyed by normalized title, in registration order
    pub categories: IndexMap<CategoryKey, CategoryEntry>,

    /// The id the next registration will receive
    pub next_id: CategoryId,

    /// When the registry was last written
    pub last_updated: DateTime<Utc>,
}

impl Registry {
    /// A fresh registry with no categories and the id sequence at its start.
    pub fn empty() -> Self {
        Self {
            version: REGISTRY_FORMAT_VERSION,
            categories: IndexMap::new(),
            next_id: CategoryId::first(),
            last_updated: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Register a new category under `key`, advancing the id sequence.
    ///
    /// If `key` is already registered the existing entry is returned
    /// unchanged and the id sequence does not advance.
    pub fn register(
        &mut self,
        key: CategoryKey,
        display_name: impl Into<String>,
        keywords: Vec<String>,
        created_date: NaiveDate,
    ) -> &CategoryEntry {
        if self.categories.contains_key(&key) {
            return &self.categories[&key];
        }

        let id = self.next_id.clone();
        self.next_id = id.succ();

        self.categories.entry(key).or_insert(CategoryEntry {
            id,
            display_name: display_name.into(),
            keywords,
            created_date,
        })
    }

    /// Check the structural invariants of a loaded registry.
    ///
    /// Violations mean the file was edited by hand or written by a
    /// different version; callers must treat them as corruption and
    /// refuse to build on top.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != REGISTRY_FORMAT_VERSION {
            return Err(format!(
                "unsupported registry version {} (expected {REGISTRY_FORMAT_VERSION})",
                self.version
            ));
        }

        let mut seen: HashSet<&CategoryId> = HashSet::new();
        for (key, entry) in &self.categories {
            if !entry.id.is_well_formed() {
                return Err(format!("category '{key}' has malformed id '{}'", entry.id));
            }
            if !seen.insert(&entry.id) {
                return Err(format!("duplicate category id '{}'", entry.id));
            }
        }

        // The sequence must continue exactly one past the highest
        // assigned id; anything else means lost or replayed writes.
        let expected = self
            .categories
            .values()
            .map(|entry| &entry.id)
            .max()
            .map(CategoryId::succ)
            .unwrap_or_else(CategoryId::first);
        if self.next_id != expected {
            return Err(format!(
                "next_id '{}' does not continue the id sequence (expected '{expected}')",
                self.next_id
            ));
        }

        Ok(())
    }
}

/// Loads and saves the registry file.
///
/// Saves go through a temp file in the destination directory followed by
/// a rename, so a concurrent reader never observes a torn registry.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry, or a fresh empty one when the file is absent.
    ///
    /// A present file that fails parsing or validation is an error, never
    /// silently replaced.
    pub fn load(&self) -> RegistryResult<Registry> {
        if !self.path.exists() {
            return Ok(Registry::empty());
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| RegistryError::FileRead {
            path: self.path.clone(),
            source: e,
        })?;

        let registry: Registry =
            serde_json::from_str(&raw).map_err(|e| RegistryError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        registry.validate().map_err(|reason| RegistryError::Corrupt {
            path: self.path.clone(),
            reason,
        })?;

        Ok(registry)
    }

    /// Persist the registry atomically, stamping `last_updated`.
    pub fn save(&self, registry: &mut Registry) -> RegistryResult<()> {
        registry.last_updated = Utc::now();

        let json = serde_json::to_string_pretty(registry)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| RegistryError::FileWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;

        // Temp file in the same directory so the final rename stays on
        // one filesystem.
        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| RegistryError::FileWrite {
            path: self.path.clone(),
            source: e,
        })?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| RegistryError::FileWrite {
                path: self.path.clone(),
                source: e,
            })?;
        tmp.persist(&self.path).map_err(|e| RegistryError::FileWrite {
            path: self.path.clone(),
            source: e.error,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> RegistryStore {
        RegistryStore::new(dir.path().join("registry.json"))
    }

    #[test]
    fn test_load_missing_file_returns_fresh_registry() {
        let dir = TempDir::new().unwrap();
        let registry = store_in(&dir).load().unwrap();

        assert!(registry.is_empty());
        assert_eq!(registry.next_id, CategoryId::first());
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_register_advances_sequence() {
        let mut registry = Registry::empty();
        let today = Utc::now().date_naive();

        let first = registry
            .register(
                CategoryKey::derive("時間管理ツール"),
                "時間管理ツール",
                vec!["タイマー".to_string()],
                today,
            )
            .id
            .clone();
        let second = registry
            .register(
                CategoryKey::derive("家計簿アプリ"),
                "家計簿アプリ",
                vec!["収支".to_string()],
                today,
            )
            .id
            .clone();

        assert_eq!(first.as_str(), "001");
        assert_eq!(second.as_str(), "002");
        assert_eq!(registry.next_id.as_str(), "003");
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_register_same_key_returns_existing() {
        let mut registry = Registry::empty();
        let today = Utc::now().date_naive();
        let key = CategoryKey::derive("Budget App");

        let first = registry
            .register(key.clone(), "Budget App", vec![], today)
            .id
            .clone();
        let again = registry
            .register(key, "budget   app!!", vec![], today)
            .id
            .clone();

        assert_eq!(first, again);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.next_id.as_str(), "002");
    }

    #[test]
    fn test_save_load_round_trip_preserves_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let today = Utc::now().date_naive();

        let mut registry = Registry::empty();
        for title in ["zeta", "alpha", "midway"] {
            registry.register(
                CategoryKey::derive(title),
                title,
                vec![title.to_string()],
                today,
            );
        }
        store.save(&mut registry).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.next_id, registry.next_id);

        // Registration order, not alphabetical order
        let ids: Vec<&str> = loaded.categories.values().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["001", "002", "003"]);
        let keys: Vec<&str> = loaded.categories.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "midway"]);
    }

    #[test]
    fn test_load_rejects_unparsable_file() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not json at all").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let raw = r#"{
            "version": 99,
            "categories": {},
            "next_id": "001",
            "last_updated": "2026-08-25T00:00:00Z"
        }"#;
        fs::write(store.path(), raw).unwrap();

        let err = store.load().unwrap_err();
        match err {
            RegistryError::Corrupt { reason, .. } => {
                assert!(reason.contains("version"), "unexpected reason: {reason}");
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_duplicate_ids() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let raw = r#"{
            "version": 1,
            "categories": {
                "alpha": {"id": "001", "display_name": "alpha", "keywords": [], "created_date": "2026-08-25"},
                "beta": {"id": "001", "display_name": "beta", "keywords": [], "created_date": "2026-08-25"}
            },
            "next_id": "002",
            "last_updated": "2026-08-25T00:00:00Z"
        }"#;
        fs::write(store.path(), raw).unwrap();

        let err = store.load().unwrap_err();
        match err {
            RegistryError::Corrupt { reason, .. } => {
                assert!(reason.contains("duplicate"), "unexpected reason: {reason}");
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_sequence_gap() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        // next_id skips ahead of the highest assigned id
        let raw = r#"{
            "version": 1,
            "categories": {
                "alpha": {"id": "001", "display_name": "alpha", "keywords": [], "created_date": "2026-08-25"}
            },
            "next_id": "005",
            "last_updated": "2026-08-25T00:00:00Z"
        }"#;
        fs::write(store.path(), raw).unwrap();

        let err = store.load().unwrap_err();
        match err {
            RegistryError::Corrupt { reason, .. } => {
                assert!(reason.contains("next_id"), "unexpected reason: {reason}");
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn test_load_rejects_stale_next_id() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        // next_id never advanced past the highest assigned id
        let raw = r#"{
            "version": 1,
            "categories": {
                "alpha": {"id": "001", "display_name": "alpha", "keywords": [], "created_date": "2026-08-25"}
            },
            "next_id": "001",
            "last_updated": "2026-08-25T00:00:00Z"
        }"#;
        fs::write(store.path(), raw).unwrap();

        let err = store.load().unwrap_err();
        match err {
            RegistryError::Corrupt { reason, .. } => {
                assert!(reason.contains("next_id"), "unexpected reason: {reason}");
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn test_id_width_grows_past_three_digits() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let today = Utc::now().date_naive();

        let mut registry = Registry::empty();
        registry.next_id = CategoryId::from_number(999);
        registry.register(CategoryKey::derive("big"), "big", vec![], today);
        assert_eq!(registry.next_id.as_str(), "1000");

        registry.register(CategoryKey::derive("bigger"), "bigger", vec![], today);
        assert_eq!(registry.next_id.as_str(), "1001");

        store.save(&mut registry).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.next_id.as_str(), "1001");
    }
}
