//! Repository wiring for embedding applications.
//!
//! # Responsibility
//! - Bind abstract repository identifiers to factories.
//! - Let providers contribute several bindings at once.

pub mod container;

pub use container::{
    ContainerError, RepositoryBinding, RepositoryContainer, RepositoryFactory, RepositoryProvider,
};
