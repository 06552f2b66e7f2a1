//! Auth module: three-layer architecture (domain, repository, service).
//!
//! Registration, login and password change over the `users` collection.
//! Credentials are stored and compared as plain text.

pub mod domain;
pub mod errors;
pub mod repository;
pub mod service;
pub mod repo;

pub use service::AuthService;
