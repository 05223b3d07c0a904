//! Testing support for decorator-based code
//!
//! [`MemoryDatabase`] is a deterministic, in-memory [`StorageBackend`]
//! (records ordered by id, property and field conditions, ordering and
//! ranges). [`TestStore`] wraps it in a [`Store`].
//!
//! ```rust,ignore
//! use entity_decorator::testing::TestStore;
//!
//! let store = TestStore::in_memory();
//! let article = Article::create(&store)?;
//! article.set("title", "Hello")?;
//! let id = article.save(&store)?;
//! assert!(Article::find(&store, id)?.is_some());
//! ```
//!
//! [`StorageBackend`]: crate::entity::StorageBackend
//! [`Store`]: crate::entity::Store

pub mod memory_database;

pub use memory_database::*;
