//! Service layer of the ServLink marketplace.
//! - `storage` persists named record collections in a text key-value medium.
//! - `auth` and `session` handle identity; `ratings` keeps derived aggregates honest.
//! - `marketplace` exposes every domain operation over one shared store.

pub mod errors;
pub mod storage;
pub mod auth;
pub mod session;
pub mod ratings;
pub mod marketplace;
pub mod notifications;
pub mod runtime;
#[cfg(test)]
pub mod test_support;

pub use marketplace::{Marketplace, MarketplaceSettings};
