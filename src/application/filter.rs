//! Read-only query surface consumed by the scraper/notifier.

use std::sync::Arc;

use tracing::debug;

use crate::application::sync::PreferenceSync;

/// Decides whether a scraped listing is worth a notification.
///
/// Holds a shared handle on the synchronizer and answers from its cache; the
/// store is never consulted on this path.
pub struct NotificationFilter {
    preferences: Arc<PreferenceSync>,
}

impl NotificationFilter {
    pub fn new(preferences: Arc<PreferenceSync>) -> Self {
        Self { preferences }
    }

    /// `true` when the listing's category is a live preference and its price
    /// satisfies the category's bounds.
    ///
    /// A category with no range set matches any price, including an unparsed
    /// one. A bounded category only matches a known in-range price: when the
    /// scraper could not extract a price, there is no way to show the bound
    /// is satisfied, so the listing is dropped.
    pub fn should_notify(&self, category: &str, price: Option<f64>) -> bool {
        let Some(preference) = self.preferences.find_in_cache(category) else {
            return false;
        };

        if !preference.has_price_range() {
            return true;
        }

        match price {
            Some(price) => preference.price_range().contains(price),
            None => {
                debug!(category, "dropping unpriced listing for bounded category");
                false
            }
        }
    }
}
