//! Record shapes persisted by the ServLink store, plus the pure functions that
//! coerce loosely typed input into them.

pub mod errors;
pub mod ids;
pub mod category;
pub mod normalize;
pub mod user;
pub mod listing;
pub mod appointment;
pub mod message;
pub mod review;
pub mod stats;
