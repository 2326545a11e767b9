//! The pantry: ingredients a user has accumulated across sessions.
//!
//! Entries are deduplicated on [`normalize`]d names while keeping the display
//! name exactly as first submitted. Every mutation writes the full snapshot
//! through the injected [`PantryPersistence`]; persistence failures are logged
//! and never surface to the caller.

pub mod persistence;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

pub use persistence::{JsonFilePersistence, MemoryPersistence, PantryPersistence, PersistenceError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
}

/// Comparison key for ingredient names: lowercase, outer whitespace trimmed.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// In-memory pantry backed by a persistence layer.
///
/// Mutations take `&mut self`, so the read-modify-persist sequence is never
/// interleaved. Share across threads behind a `Mutex`.
pub struct PantryStore<P: PantryPersistence> {
    ingredients: Vec<Ingredient>,
    persistence: P,
}

impl<P: PantryPersistence> PantryStore<P> {
    /// Seeds the store from the last persisted snapshot.
    ///
    /// An unreadable snapshot is quarantined and the pantry starts empty.
    /// Entries whose name duplicates an earlier one, or is blank, are dropped
    /// and the cleaned snapshot written back.
    pub fn open(persistence: P) -> Self {
        let restored = match persistence.load() {
            Ok(ingredients) => ingredients,
            Err(e) => {
                match persistence.quarantine() {
                    Ok(Some(backup)) => warn!(
                        error = %e,
                        backup = %backup.display(),
                        "unreadable pantry snapshot moved aside, starting empty"
                    ),
                    Ok(None) => warn!(error = %e, "failed to restore pantry snapshot, starting empty"),
                    Err(quarantine_error) => warn!(
                        error = %e,
                        %quarantine_error,
                        "failed to restore or move aside pantry snapshot, starting empty"
                    ),
                }
                Vec::new()
            }
        };

        let restored_count = restored.len();
        let ingredients = dedup_restored(restored);
        let store = Self {
            ingredients,
            persistence,
        };
        let dropped = restored_count - store.ingredients.len();
        if dropped > 0 {
            debug!(dropped, "dropped duplicate or blank entries from restored pantry");
            store.persist();
        }
        debug!(count = store.ingredients.len(), "pantry opened");
        store
    }

    /// Adds `name` unless it normalizes to empty or is already present.
    /// Returns the new entry, or `None` for a no-op.
    pub fn add_ingredient(&mut self, name: &str) -> Option<&Ingredient> {
        let key = normalize(name);
        if key.is_empty() || self.contains(name) {
            debug!(name, "skipping empty or duplicate pantry ingredient");
            return None;
        }

        let now = Utc::now();
        self.ingredients.push(Ingredient {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            added_at: now,
        });
        self.persist();
        self.ingredients.last()
    }

    pub fn remove_ingredient(&mut self, id: &str) {
        let before = self.ingredients.len();
        self.ingredients.retain(|ingredient| ingredient.id != id);
        if self.ingredients.len() != before {
            self.persist();
        }
    }

    pub fn clear_pantry(&mut self) {
        self.ingredients.clear();
        self.persist();
    }

    /// Display names in insertion order.
    pub fn list_names(&self) -> Vec<String> {
        self.ingredients.iter().map(|i| i.name.clone()).collect()
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn contains(&self, name: &str) -> bool {
        let key = normalize(name);
        self.ingredients.iter().any(|i| normalize(&i.name) == key)
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    fn persist(&self) {
        if let Err(e) = self.persistence.save(&self.ingredients) {
            warn!(error = %e, "failed to persist pantry snapshot");
        }
    }
}

/// Keeps the first entry per normalized name, in order.
fn dedup_restored(restored: Vec<Ingredient>) -> Vec<Ingredient> {
    let mut seen = HashSet::new();
    restored
        .into_iter()
        .filter(|ingredient| {
            let key = normalize(&ingredient.name);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}
