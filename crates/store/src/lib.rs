//! Transactional entity store for the Syllabus catalog.
//!
//! Writers open a [`Transaction`] with [`EntityStore::begin`], read and stage
//! writes against its consistent view, and hand it back to
//! [`EntityStore::commit`]. Every staged mutation lands together or none do.
//! [`MemoryStore`] keeps the catalog in memory, optionally backed by a JSON
//! file that several processes can share.

pub mod catalog;
pub mod error;
pub mod memory;
pub mod store;
pub mod transaction;

pub use catalog::{Catalog, CatalogDocument};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::EntityStore;
pub use transaction::{LessonFilter, Mutation, Transaction};
