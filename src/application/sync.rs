//! Write-through synchronizer binding the preference cache to the store.
//!
//! Every mutation follows the same discipline: validate arguments, apply the
//! store mutation, and only then mirror the result into the in-memory index.
//! A failed or partially-applied store write leaves the cache untouched, so
//! the cache can run behind the store (a conservative miss) but never ahead
//! of it (a stale hit). Reads are served from the cache alone.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use metrics::{counter, gauge};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::store::{PreferenceStore, StoreError};
use crate::domain::preferences::{PriceRange, UserPreference};

#[derive(Debug, Error)]
pub enum PreferenceError {
    /// Caller error, surfaced before any store or cache effect.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A price-range operation referenced a category that was never added.
    #[error("no preference exists for category `{category}`")]
    NotFound { category: String },
    /// The store acknowledged fewer row changes than the mutation required.
    #[error("store applied {actual} of {expected} expected row changes")]
    PartialWrite { expected: u64, actual: u64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// In-memory preference index kept write-through-consistent with the store.
///
/// Owns its cache outright; lifecycle matches the store handle it was
/// constructed with. A single writer guard serializes mutations end to end,
/// which is what upholds the consistency invariant under concurrent callers.
/// Readers never take the writer guard: they observe either the pre- or
/// post-state of an in-flight mutation, both of which are consistent.
pub struct PreferenceSync {
    store: Arc<dyn PreferenceStore>,
    cache: RwLock<HashMap<String, UserPreference>>,
    writer: Mutex<()>,
}

impl PreferenceSync {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            writer: Mutex::new(()),
        }
    }

    /// Populate the cache from the store's full listing.
    ///
    /// Must run before the synchronizer serves reads in a process that
    /// reopened an existing store, otherwise rows persisted by a previous
    /// generation would be invisible. Returns the number of live preferences.
    pub async fn warm(&self) -> Result<usize, PreferenceError> {
        let _writer = self.writer.lock().await;
        let all = self.store.list_all().await?;
        let count = all.len();

        let mut cache = self.cache_write("warm");
        cache.clear();
        for preference in all {
            cache.insert(preference.category.clone(), preference);
        }
        drop(cache);

        gauge!("dealsift_preferences_live").set(count as f64);
        debug!(preferences = count, "warmed preference cache");
        Ok(count)
    }

    /// Register a new interest category with no price filter.
    ///
    /// Re-adding a live category is an idempotent no-op returning `Ok(true)`;
    /// neither store nor cache is touched.
    pub async fn add_category(&self, category: &str) -> Result<bool, PreferenceError> {
        Self::require_category(category)?;

        let _writer = self.writer.lock().await;
        if self.cache_read("add_category").contains_key(category) {
            debug!(category, "category already live; add is a no-op");
            return Ok(true);
        }

        let preference = UserPreference::new(category);
        let inserted = self
            .store
            .insert_many(std::slice::from_ref(&preference))
            .await?;
        Self::require_rows(1, inserted)?;

        let mut cache = self.cache_write("add_category");
        cache.insert(preference.category.clone(), preference);
        gauge!("dealsift_preferences_live").set(cache.len() as f64);
        debug!(category, "added category");
        Ok(true)
    }

    /// Remove a category and its bounds. `Ok(false)` when it was never live.
    pub async fn remove_category(&self, category: &str) -> Result<bool, PreferenceError> {
        Self::require_category(category)?;

        let _writer = self.writer.lock().await;
        let Some(preference) = self.cache_read("remove_category").get(category).cloned()
        else {
            return Ok(false);
        };

        let deleted = self
            .store
            .delete_many(std::slice::from_ref(&preference))
            .await?;
        Self::require_rows(1, deleted)?;

        let mut cache = self.cache_write("remove_category");
        cache.remove(category);
        gauge!("dealsift_preferences_live").set(cache.len() as f64);
        debug!(category, "removed category");
        Ok(true)
    }

    /// Attach an inclusive price range to an existing category.
    ///
    /// The category must already be live; a range can never create one.
    /// Bounds are stored verbatim, with no ordering imposed.
    pub async fn set_price_range(
        &self,
        category: &str,
        range: PriceRange,
    ) -> Result<bool, PreferenceError> {
        Self::require_category(category)?;

        let _writer = self.writer.lock().await;
        let Some(mut preference) = self.cache_read("set_price_range").get(category).cloned()
        else {
            return Err(PreferenceError::NotFound {
                category: category.to_string(),
            });
        };

        let updated = self.store.update_bounds(category, range.min, range.max).await?;
        Self::require_rows(1, updated)?;

        preference.set_price_range(range);
        self.cache_write("set_price_range")
            .insert(preference.category.clone(), preference);
        debug!(category, min = range.min, max = range.max, "set price range");
        Ok(true)
    }

    /// Reset a category's bounds to the unset state.
    ///
    /// Idempotent on a category with no range set; `Ok(false)` when the
    /// category itself does not exist.
    pub async fn clear_price_range(&self, category: &str) -> Result<bool, PreferenceError> {
        Self::require_category(category)?;

        let _writer = self.writer.lock().await;
        let Some(mut preference) = self.cache_read("clear_price_range").get(category).cloned()
        else {
            return Ok(false);
        };

        let updated = self
            .store
            .update_bounds(category, PriceRange::UNSET.min, PriceRange::UNSET.max)
            .await?;
        Self::require_rows(1, updated)?;

        preference.clear_price_range();
        self.cache_write("clear_price_range")
            .insert(preference.category.clone(), preference);
        debug!(category, "cleared price range");
        Ok(true)
    }

    /// Bounds last successfully set for `category`, or zeros if never set or
    /// cleared. Cache-authoritative: the write-through ordering guarantees
    /// the cache never runs ahead of the store.
    pub fn price_range(&self, category: &str) -> Result<PriceRange, PreferenceError> {
        match self.find_in_cache(category) {
            Some(preference) => Ok(preference.price_range()),
            None => Err(PreferenceError::NotFound {
                category: category.to_string(),
            }),
        }
    }

    /// Pure cache read; never touches the store.
    pub fn find_in_cache(&self, category: &str) -> Option<UserPreference> {
        let found = self.cache_read("find_in_cache").get(category).cloned();
        match found {
            Some(preference) => {
                counter!("dealsift_cache_hit_total").increment(1);
                Some(preference)
            }
            None => {
                counter!("dealsift_cache_miss_total").increment(1);
                None
            }
        }
    }

    /// Number of live preferences in the cache.
    pub fn cached_len(&self) -> usize {
        self.cache_read("cached_len").len()
    }

    fn require_category(category: &str) -> Result<(), PreferenceError> {
        if category.is_empty() {
            return Err(PreferenceError::InvalidArgument(
                "category must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    fn require_rows(expected: u64, actual: u64) -> Result<(), PreferenceError> {
        if actual != expected {
            return Err(PreferenceError::PartialWrite { expected, actual });
        }
        Ok(())
    }

    fn cache_read(&self, op: &'static str) -> RwLockReadGuard<'_, HashMap<String, UserPreference>> {
        match self.cache.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(op, "recovered from poisoned preference cache lock");
                poisoned.into_inner()
            }
        }
    }

    fn cache_write(
        &self,
        op: &'static str,
    ) -> RwLockWriteGuard<'_, HashMap<String, UserPreference>> {
        match self.cache.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(op, "recovered from poisoned preference cache lock");
                poisoned.into_inner()
            }
        }
    }
}
