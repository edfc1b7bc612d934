//! Vector index and its durable store

pub mod locks;
pub mod store;
pub mod vector_index;

pub use locks::StoreLocks;
pub use store::{IndexStore, LoadedIndex, Registry, RegistryEntry, StoreManifest};
pub use vector_index::{Metric, VectorIndex};
