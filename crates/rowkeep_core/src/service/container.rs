//! In-process repository container.
//!
//! # Invariants
//! - Identifiers are trimmed; blank identifiers are never bound.
//! - One factory per identifier; rebinding is rejected.
//! - Every `resolve` builds a fresh repository instance.

use crate::repo::Repository;
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Builds one repository instance per call.
pub type RepositoryFactory<'c> = Box<dyn Fn() -> Box<dyn Repository + 'c> + 'c>;

/// Binding/resolution errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    MissingInterface(String),
    DuplicateBinding(String),
    NotBound(String),
}

impl Display for ContainerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingInterface(value) => {
                write!(f, "no repository interface specified (got `{value}`)")
            }
            Self::DuplicateBinding(value) => {
                write!(f, "repository interface already bound: {value}")
            }
            Self::NotBound(value) => write!(f, "repository interface not bound: {value}"),
        }
    }
}

impl Error for ContainerError {}

/// One interface-to-factory pair contributed by a provider.
pub struct RepositoryBinding<'c> {
    pub interface: String,
    pub factory: RepositoryFactory<'c>,
}

impl<'c> RepositoryBinding<'c> {
    pub fn new<F>(interface: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Repository + 'c> + 'c,
    {
        Self {
            interface: interface.into(),
            factory: Box::new(factory),
        }
    }
}

/// Source of repository bindings, registered in one step.
pub trait RepositoryProvider<'c> {
    fn bindings(&self) -> Vec<RepositoryBinding<'c>>;
}

/// Maps repository identifiers to factories.
///
/// `'c` is typically the lifetime of the connection the factories borrow.
#[derive(Default)]
pub struct RepositoryContainer<'c> {
    bindings: BTreeMap<String, RepositoryFactory<'c>>,
}

impl<'c> RepositoryContainer<'c> {
    pub fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    /// Binds `interface` to `factory`.
    pub fn bind<F>(&mut self, interface: &str, factory: F) -> Result<(), ContainerError>
    where
        F: Fn() -> Box<dyn Repository + 'c> + 'c,
    {
        self.insert(interface, Box::new(factory))
    }

    /// Binds every binding of `provider` in order, stopping at the first
    /// failure.
    pub fn register_provider<P>(&mut self, provider: &P) -> Result<usize, ContainerError>
    where
        P: RepositoryProvider<'c> + ?Sized,
    {
        let bindings = provider.bindings();
        let count = bindings.len();
        for binding in bindings {
            self.insert(&binding.interface, binding.factory)?;
        }
        Ok(count)
    }

    /// Builds a new repository for `interface`.
    pub fn resolve(&self, interface: &str) -> Result<Box<dyn Repository + 'c>, ContainerError> {
        let normalized = interface.trim();
        let factory = self
            .bindings
            .get(normalized)
            .ok_or_else(|| ContainerError::NotBound(normalized.to_string()))?;
        debug!("event=container_resolve module=service status=ok interface={normalized}");
        Ok(factory())
    }

    pub fn is_bound(&self, interface: &str) -> bool {
        self.bindings.contains_key(interface.trim())
    }

    /// Returns sorted interface identifiers.
    pub fn interfaces(&self) -> Vec<&str> {
        self.bindings.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    fn insert(
        &mut self,
        interface: &str,
        factory: RepositoryFactory<'c>,
    ) -> Result<(), ContainerError> {
        let normalized = interface.trim();
        if normalized.is_empty() {
            return Err(ContainerError::MissingInterface(interface.to_string()));
        }
        if self.bindings.contains_key(normalized) {
            return Err(ContainerError::DuplicateBinding(normalized.to_string()));
        }
        self.bindings.insert(normalized.to_string(), factory);
        Ok(())
    }
}
