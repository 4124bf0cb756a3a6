//! Behavioral suite for the write-through synchronizer, run against an
//! in-memory store double with failure injection.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;

use dealsift::application::filter::NotificationFilter;
use dealsift::application::store::{PreferenceStore, StoreError};
use dealsift::application::sync::{PreferenceError, PreferenceSync};
use dealsift::domain::preferences::{PriceRange, UserPreference};

/// Store double: a plain vector behind a mutex, plus switches that make
/// writes fail outright or under-report their affected-row counts.
#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<UserPreference>>,
    fail_writes: AtomicBool,
    short_counts: AtomicBool,
}

impl MemoryStore {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn fail_writes(&self, on: bool) {
        self.fail_writes.store(on, Ordering::SeqCst);
    }

    fn short_counts(&self, on: bool) {
        self.short_counts.store(on, Ordering::SeqCst);
    }

    fn seed(&self, preferences: Vec<UserPreference>) {
        self.rows.lock().unwrap().extend(preferences);
    }

    fn categories(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|preference| preference.category.clone())
            .collect()
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Persistence("injected write failure".to_string()));
        }
        Ok(())
    }

    fn report(&self, actual: u64) -> u64 {
        if self.short_counts.load(Ordering::SeqCst) {
            actual.saturating_sub(1)
        } else {
            actual
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn create_schema(&self) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn drop_schema(&self) -> Result<bool, StoreError> {
        self.rows.lock().unwrap().clear();
        Ok(true)
    }

    async fn list_all(&self) -> Result<Vec<UserPreference>, StoreError> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn get_by_category(
        &self,
        category: &str,
    ) -> Result<Option<UserPreference>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|preference| preference.category == category)
            .cloned())
    }

    async fn insert_many(&self, preferences: &[UserPreference]) -> Result<u64, StoreError> {
        self.check_write()?;
        let mut rows = self.rows.lock().unwrap();
        rows.extend_from_slice(preferences);
        Ok(self.report(preferences.len() as u64))
    }

    async fn delete_many(&self, preferences: &[UserPreference]) -> Result<u64, StoreError> {
        self.check_write()?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| {
            !preferences
                .iter()
                .any(|preference| preference.category == row.category)
        });
        Ok(self.report((before - rows.len()) as u64))
    }

    async fn update_bounds(
        &self,
        category: &str,
        min: f64,
        max: f64,
    ) -> Result<u64, StoreError> {
        self.check_write()?;
        let mut rows = self.rows.lock().unwrap();
        let mut updated = 0;
        for row in rows.iter_mut() {
            if row.category == category {
                row.min_price = min;
                row.max_price = max;
                updated += 1;
            }
        }
        Ok(self.report(updated))
    }

    async fn close(&self) {}
}

fn sync_over(store: &Arc<MemoryStore>) -> PreferenceSync {
    PreferenceSync::new(store.clone() as Arc<dyn PreferenceStore>)
}

#[tokio::test]
async fn adding_categories_populates_store_and_cache() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    for category in ["gardening", "electronics", "test category"] {
        assert!(sync.add_category(category).await.unwrap());
    }

    let stored = store.categories();
    for category in ["gardening", "electronics", "test category"] {
        assert!(stored.iter().any(|stored| stored == category));

        let cached = sync.find_in_cache(category).expect("cached preference");
        assert_eq!(cached.category, category);
        assert!(!cached.has_price_range());
    }
}

#[tokio::test]
async fn adding_empty_category_is_invalid() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    let error = sync.add_category("").await.unwrap_err();
    assert!(matches!(error, PreferenceError::InvalidArgument(_)));
    assert!(store.categories().is_empty());
    assert_eq!(sync.cached_len(), 0);
}

#[tokio::test]
async fn adding_duplicate_category_is_idempotent() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    assert!(sync.add_category("gardening").await.unwrap());
    assert!(sync.add_category("gardening").await.unwrap());

    assert_eq!(store.categories(), vec!["gardening".to_string()]);
    assert_eq!(sync.cached_len(), 1);
}

#[tokio::test]
async fn removing_categories_evicts_store_and_cache() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    for category in [
        "gardening",
        "electronics",
        "test category",
        "policeman",
        "policewoman",
    ] {
        sync.add_category(category).await.unwrap();
    }

    assert!(sync.remove_category("policeman").await.unwrap());
    assert!(sync.remove_category("policewoman").await.unwrap());

    let stored = store.categories();
    assert!(!stored.iter().any(|category| category == "policeman"));
    assert!(!stored.iter().any(|category| category == "policewoman"));

    assert!(sync.find_in_cache("policeman").is_none());
    assert!(sync.find_in_cache("policewoman").is_none());
    assert!(sync.find_in_cache("gardening").is_some());
}

#[tokio::test]
async fn removing_empty_category_is_invalid() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    let error = sync.remove_category("").await.unwrap_err();
    assert!(matches!(error, PreferenceError::InvalidArgument(_)));
}

#[tokio::test]
async fn removing_unknown_category_returns_false() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    assert!(!sync.remove_category("never added").await.unwrap());
}

#[tokio::test]
async fn set_price_range_is_visible_in_store_and_cache() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    for category in ["test_cat", "test_cat2", "test_cat3"] {
        sync.add_category(category).await.unwrap();
    }

    assert!(
        sync.set_price_range("test_cat2", PriceRange::new(10.0, 100.0))
            .await
            .unwrap()
    );

    let stored = store
        .get_by_category("test_cat2")
        .await
        .unwrap()
        .expect("stored preference");
    assert_eq!(stored.min_price, 10.0);
    assert_eq!(stored.max_price, 100.0);

    let cached = sync.find_in_cache("test_cat2").expect("cached preference");
    assert_eq!(cached.min_price, 10.0);
    assert_eq!(cached.max_price, 100.0);

    // Neighbors keep their zero bounds.
    assert!(!sync.find_in_cache("test_cat").unwrap().has_price_range());
}

#[tokio::test]
async fn set_price_range_on_unknown_category_is_not_found() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    let error = sync
        .set_price_range("fake_category", PriceRange::new(10.0, 100.0))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        PreferenceError::NotFound { ref category } if category == "fake_category"
    ));

    assert!(store.categories().is_empty());
    assert_eq!(sync.cached_len(), 0);
}

#[tokio::test]
async fn set_price_range_on_empty_category_is_invalid() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    let error = sync
        .set_price_range("", PriceRange::new(10.0, 100.0))
        .await
        .unwrap_err();
    assert!(matches!(error, PreferenceError::InvalidArgument(_)));
}

#[tokio::test]
async fn clear_price_range_resets_bounds_in_store_and_cache() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    for category in ["test_cat", "test_cat2", "test_cat3"] {
        sync.add_category(category).await.unwrap();
        sync.set_price_range(category, PriceRange::new(10.0, 100.0))
            .await
            .unwrap();
    }

    assert!(sync.clear_price_range("test_cat2").await.unwrap());

    let stored = store
        .get_by_category("test_cat2")
        .await
        .unwrap()
        .expect("stored preference");
    assert_eq!(stored.min_price, 0.0);
    assert_eq!(stored.max_price, 0.0);

    let cached = sync.find_in_cache("test_cat2").expect("cached preference");
    assert!(!cached.has_price_range());

    // Untouched neighbor keeps its bounds.
    assert!(sync.find_in_cache("test_cat3").unwrap().has_price_range());
}

#[tokio::test]
async fn clear_price_range_is_idempotent_without_a_range() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    sync.add_category("gardening").await.unwrap();
    assert!(sync.clear_price_range("gardening").await.unwrap());
    assert!(sync.clear_price_range("gardening").await.unwrap());
}

#[tokio::test]
async fn clear_price_range_on_unknown_category_returns_false() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    assert!(!sync.clear_price_range("never added").await.unwrap());
}

#[tokio::test]
async fn price_range_returns_the_last_successfully_set_bounds() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    sync.add_category("cars").await.unwrap();
    sync.set_price_range("cars", PriceRange::new(100.0, 856.0))
        .await
        .unwrap();

    assert_eq!(
        sync.price_range("cars").unwrap(),
        PriceRange::new(100.0, 856.0)
    );

    sync.clear_price_range("cars").await.unwrap();
    assert_eq!(sync.price_range("cars").unwrap(), PriceRange::UNSET);

    let error = sync.price_range("bikes").unwrap_err();
    assert!(matches!(error, PreferenceError::NotFound { .. }));
}

#[tokio::test]
async fn cache_misses_for_categories_never_added() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    assert!(sync.find_in_cache("cars").is_none());
}

#[tokio::test]
async fn store_failure_leaves_the_cache_unchanged() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    sync.add_category("electronics").await.unwrap();
    store.fail_writes(true);

    let error = sync.add_category("gardening").await.unwrap_err();
    assert!(matches!(error, PreferenceError::Store(_)));
    assert!(sync.find_in_cache("gardening").is_none());

    let error = sync
        .set_price_range("electronics", PriceRange::new(10.0, 100.0))
        .await
        .unwrap_err();
    assert!(matches!(error, PreferenceError::Store(_)));
    assert!(!sync.find_in_cache("electronics").unwrap().has_price_range());
}

#[tokio::test]
async fn partial_write_leaves_the_cache_unchanged() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    store.short_counts(true);
    let error = sync.add_category("gardening").await.unwrap_err();
    assert!(matches!(
        error,
        PreferenceError::PartialWrite {
            expected: 1,
            actual: 0
        }
    ));
    assert!(sync.find_in_cache("gardening").is_none());
}

#[tokio::test]
async fn validation_precedes_every_store_effect() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    // Writes would fail loudly, so an InvalidArgument result proves the
    // store was never consulted.
    store.fail_writes(true);

    let error = sync.add_category("").await.unwrap_err();
    assert!(matches!(error, PreferenceError::InvalidArgument(_)));
    let error = sync.clear_price_range("").await.unwrap_err();
    assert!(matches!(error, PreferenceError::InvalidArgument(_)));
}

#[tokio::test]
async fn warm_restores_the_cache_from_the_store() {
    let store = MemoryStore::new();
    store.seed(vec![
        UserPreference::new("gardening"),
        UserPreference::with_bounds("electronics", 10.0, 100.0),
    ]);

    let sync = sync_over(&store);
    assert_eq!(sync.warm().await.unwrap(), 2);

    assert!(sync.find_in_cache("gardening").is_some());
    let cached = sync.find_in_cache("electronics").expect("cached preference");
    assert_eq!(cached.price_range(), PriceRange::new(10.0, 100.0));
}

#[tokio::test]
async fn worked_example_scenario() {
    let store = MemoryStore::new();
    let sync = sync_over(&store);

    for category in ["gardening", "electronics", "test category"] {
        sync.add_category(category).await.unwrap();
    }
    for category in ["gardening", "electronics", "test category"] {
        assert!(sync.find_in_cache(category).is_some());
    }

    sync.set_price_range("electronics", PriceRange::new(10.0, 100.0))
        .await
        .unwrap();
    assert_eq!(
        sync.price_range("electronics").unwrap(),
        PriceRange::new(10.0, 100.0)
    );

    sync.remove_category("gardening").await.unwrap();
    assert!(sync.find_in_cache("gardening").is_none());
    assert!(sync.find_in_cache("electronics").is_some());
    assert!(sync.find_in_cache("test category").is_some());
}

#[tokio::test]
async fn notification_filter_matches_category_and_bounds() {
    let store = MemoryStore::new();
    let sync = Arc::new(sync_over(&store));

    sync.add_category("gardening").await.unwrap();
    sync.add_category("electronics").await.unwrap();
    sync.set_price_range("electronics", PriceRange::new(10.0, 100.0))
        .await
        .unwrap();

    let filter = NotificationFilter::new(sync.clone());

    // Unknown category never notifies.
    assert!(!filter.should_notify("boats", Some(5.0)));

    // No bounds: any price, parsed or not.
    assert!(filter.should_notify("gardening", Some(9999.0)));
    assert!(filter.should_notify("gardening", None));

    // Bounded: inclusive endpoints, out-of-range and unpriced are dropped.
    assert!(filter.should_notify("electronics", Some(10.0)));
    assert!(filter.should_notify("electronics", Some(100.0)));
    assert!(!filter.should_notify("electronics", Some(9.5)));
    assert!(!filter.should_notify("electronics", Some(101.0)));
    assert!(!filter.should_notify("electronics", None));
}
