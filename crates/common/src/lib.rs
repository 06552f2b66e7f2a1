//! Shared runtime helpers for the ServLink workspace: logging setup and
//! startup checks of the data directory.

pub mod env;
pub mod utils;
