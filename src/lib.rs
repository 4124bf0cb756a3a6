//! Preference core of a marketplace-deal notification bot: interest
//! categories and price bounds, write-through cached over SQLite.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
