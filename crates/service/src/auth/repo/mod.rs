pub mod store;

pub use store::StoreUserRepository;
