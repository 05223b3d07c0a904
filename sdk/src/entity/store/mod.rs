//! Entity store implementation module

pub mod backend;
pub mod store;

pub use backend::StorageBackend;
pub use store::Store;
