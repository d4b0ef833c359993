//! Component repository: the queryable set of descriptors.
//!
//! The container only ever asks a repository two questions: which
//! descriptors provide an interface, and whether a type is a component
//! interface at all. [`ComponentRepository`] captures that contract;
//! [`Repository`] is the in-memory implementation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::descriptor::ComponentDescriptor;
use crate::key::DependencyKey;

/// Read-only view of registered component descriptors.
pub trait ComponentRepository: Send + Sync {
    /// Descriptors providing `interface`, in registration order.
    fn find_descriptors(&self, interface: &DependencyKey) -> Vec<Arc<ComponentDescriptor>>;

    /// Returns `true` if `interface` is known as a component interface, even
    /// when nothing currently implements it.
    fn is_component_interface(&self, interface: &DependencyKey) -> bool;

    /// Full names of every known interface, for "did you mean?" hints.
    fn interface_names(&self) -> Vec<&'static str> {
        Vec::new()
    }
}

/// In-memory descriptor repository, indexed by provided interface.
///
/// Populated through [`RepositoryBuilder`] and immutable afterwards.
/// Several descriptors may provide the same interface: whether that is an
/// error depends on how the interface is resolved.
#[derive(Default)]
pub struct Repository {
    descriptors: Vec<Arc<ComponentDescriptor>>,
    by_interface: HashMap<DependencyKey, Vec<usize>>,
}

impl Repository {
    pub fn builder() -> RepositoryBuilder {
        RepositoryBuilder::default()
    }

    /// A repository with no descriptors.
    pub fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn descriptors(&self) -> &[Arc<ComponentDescriptor>] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl ComponentRepository for Repository {
    fn find_descriptors(&self, interface: &DependencyKey) -> Vec<Arc<ComponentDescriptor>> {
        let found: Vec<_> = self
            .by_interface
            .get(interface)
            .map(|indices| indices.iter().map(|&i| Arc::clone(&self.descriptors[i])).collect())
            .unwrap_or_default();
        trace!(interface = %interface, found = found.len(), "Repository lookup");
        found
    }

    fn is_component_interface(&self, interface: &DependencyKey) -> bool {
        self.by_interface.contains_key(interface)
    }

    fn interface_names(&self) -> Vec<&'static str> {
        self.by_interface.keys().map(|key| key.type_name()).collect()
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("descriptors", &self.descriptors.len())
            .field("interfaces", &self.by_interface.len())
            .finish()
    }
}

/// Collects descriptors into a [`Repository`].
#[derive(Default)]
pub struct RepositoryBuilder {
    repository: Repository,
}

impl RepositoryBuilder {
    /// Registers a descriptor under every interface it provides.
    pub fn register(mut self, descriptor: Arc<ComponentDescriptor>) -> Self {
        let index = self.repository.descriptors.len();
        for interface in descriptor.interfaces() {
            self.repository.by_interface.entry(interface).or_default().push(index);
        }
        debug!(
            component = descriptor.name(),
            scope = %descriptor.scope(),
            "Registered descriptor"
        );
        self.repository.descriptors.push(descriptor);
        self
    }

    /// Declares a component interface that may have no implementation.
    pub fn interface<I: ?Sized + 'static>(mut self) -> Self {
        self.repository
            .by_interface
            .entry(DependencyKey::of::<I>())
            .or_default();
        self
    }

    pub fn build(self) -> Arc<Repository> {
        debug!(
            descriptors = self.repository.len(),
            interfaces = self.repository.by_interface.len(),
            "Repository built"
        );
        Arc::new(self.repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::Signature;

    trait Storage: Send + Sync {}
    trait Index: Send + Sync {}

    struct Disk;
    impl Storage for Disk {}
    impl Index for Disk {}

    struct Memory;
    impl Storage for Memory {}

    fn disk() -> Arc<ComponentDescriptor> {
        ComponentDescriptor::builder::<Disk>()
            .provides::<dyn Storage>(|d| d)
            .provides::<dyn Index>(|d| d)
            .constructor(Signature::new(), |_| Ok(Disk))
            .build()
    }

    fn memory() -> Arc<ComponentDescriptor> {
        ComponentDescriptor::builder::<Memory>()
            .provides::<dyn Storage>(|m| m)
            .constructor(Signature::new(), |_| Ok(Memory))
            .build()
    }

    #[test]
    fn find_by_each_interface() {
        let repository = Repository::builder().register(disk()).register(memory()).build();

        let storages = repository.find_descriptors(&DependencyKey::of::<dyn Storage>());
        assert_eq!(storages.len(), 2);
        assert_eq!(storages[0].name(), "Disk");
        assert_eq!(storages[1].name(), "Memory");

        let indexes = repository.find_descriptors(&DependencyKey::of::<dyn Index>());
        assert_eq!(indexes.len(), 1);
    }

    #[test]
    fn unknown_interface_is_empty() {
        let repository = Repository::builder().register(memory()).build();
        assert!(repository.find_descriptors(&DependencyKey::of::<dyn Index>()).is_empty());
        assert!(!repository.is_component_interface(&DependencyKey::of::<dyn Index>()));
    }

    #[test]
    fn declared_interface_without_implementers() {
        let repository = Repository::builder().interface::<dyn Index>().build();
        assert!(repository.is_component_interface(&DependencyKey::of::<dyn Index>()));
        assert!(repository.find_descriptors(&DependencyKey::of::<dyn Index>()).is_empty());
        assert!(repository.is_empty());
    }

    #[test]
    fn interface_names_cover_registrations() {
        let repository = Repository::builder().register(disk()).build();
        let names = repository.interface_names();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.ends_with("Storage")));
    }
}
