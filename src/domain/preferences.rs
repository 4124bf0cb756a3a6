//! Preference entities mirrored from persistent storage.

use serde::Serialize;

/// Inclusive price bound attached to a category.
///
/// `(0.0, 0.0)` is the unset state: a preference carrying it filters on
/// category alone. Clearing a range restores this state, which is
/// indistinguishable from "never set".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub const UNSET: PriceRange = PriceRange { min: 0.0, max: 0.0 };

    /// Bounds are stored verbatim; no `min <= max` ordering is imposed.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_unset(&self) -> bool {
        self.min == 0.0 && self.max == 0.0
    }

    /// Both endpoints are inclusive.
    pub fn contains(&self, price: f64) -> bool {
        self.min <= price && price <= self.max
    }
}

/// One live user preference: an interest category plus optional price bounds.
///
/// Identity is the `category` string, case-sensitive and matched exactly.
/// The backing store may attach a surrogate row id, but it never crosses the
/// store contract boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserPreference {
    pub category: String,
    pub min_price: f64,
    pub max_price: f64,
}

impl UserPreference {
    /// A fresh preference with no price filter applied.
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            min_price: 0.0,
            max_price: 0.0,
        }
    }

    pub fn with_bounds(category: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            category: category.into(),
            min_price: min,
            max_price: max,
        }
    }

    pub fn price_range(&self) -> PriceRange {
        PriceRange::new(self.min_price, self.max_price)
    }

    pub fn has_price_range(&self) -> bool {
        !self.price_range().is_unset()
    }

    pub fn set_price_range(&mut self, range: PriceRange) {
        self.min_price = range.min;
        self.max_price = range.max;
    }

    pub fn clear_price_range(&mut self) {
        self.set_price_range(PriceRange::UNSET);
    }
}
