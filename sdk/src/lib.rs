pub mod config;
pub mod entity;
pub mod logging;
pub mod testing;

// Re-export entity framework components
pub use entity::{
    Decorated, Decorator, DecoratorError, DecoratorResult, Direction, FieldAccessible, Finder,
    Record, RecordHandle, RecordId, StorageBackend, Store, TypeSchema, Value,
};

pub use config::StoreConfig;
pub use logging::init_logging;
pub use testing::{MemoryDatabase, TestStore};
