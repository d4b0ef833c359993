//! Lifecycle strategies: who owns a built object and when it dies.
//!
//! Every component instance delegates object creation to one strategy:
//!
//! | Scope       | Strategy           | Shared through                           |
//! |-------------|--------------------|------------------------------------------|
//! | `Simple`    | [`SimpleLifecycle`]| nothing; owned by one container          |
//! | `Shared`    | [`CountedLifecycle`]| [`LifetimeRegistry`], keyed by descriptor|
//! | `Singleton` | [`CountedLifecycle`]| [`LifetimeRegistry`], keyed by type      |
//!
//! Cross-container objects are reference counted by container: the entry is
//! created by the first container that builds it and removed, then disposed,
//! when the last referencing container releases it.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::container::ContainerId;
use crate::descriptor::{ComponentDescriptor, DescriptorId, Object};
use crate::error::{CircularDependencyError, CompositionError, Result};
use crate::scope::Scope;

/// A component that holds resources needing explicit release.
///
/// Opt in per descriptor with
/// [`DescriptorBuilder::disposable`](crate::descriptor::DescriptorBuilder::disposable).
/// `dispose` is called exactly once, when the owning container (Simple) or
/// the last referencing container (Shared/Singleton) releases the object.
pub trait Disposable: Send + Sync {
    fn dispose(&self);
}

/// Contract shared by the three lifecycle strategies.
pub(crate) trait Lifecycle: Send + Sync {
    /// Returns the object, running `build` if this strategy has none yet.
    fn create(&self, container: ContainerId, build: &dyn Fn() -> Result<Object>) -> Result<Object>;

    /// Drops `container`'s claim on the object.
    ///
    /// Returns `true` if the object is now unreferenced (and disposed).
    fn release(&self, container: ContainerId) -> Result<bool>;

    /// The object, once built and until released. `None` while building.
    fn current_object(&self) -> Option<Object>;
}

/// Picks the strategy for a descriptor's scope.
pub(crate) fn lifecycle_for(
    descriptor: &Arc<ComponentDescriptor>,
    registry: &Arc<LifetimeRegistry>,
) -> Box<dyn Lifecycle> {
    match descriptor.scope() {
        Scope::Simple => Box::new(SimpleLifecycle::new(Arc::clone(descriptor))),
        Scope::Shared | Scope::Singleton => Box::new(CountedLifecycle::new(
            Arc::clone(descriptor),
            Arc::clone(registry),
        )),
    }
}

fn not_referenced(descriptor: &ComponentDescriptor, container: ContainerId) -> CompositionError {
    CompositionError::NotReferenced {
        component: descriptor.name().to_string(),
        container: container.get(),
    }
}

// ═══════════════════════════════════════════
// Simple
// ═══════════════════════════════════════════

enum SimpleState {
    Unbuilt,
    Building,
    Built(Object),
    Disposed,
}

/// Object owned by exactly one container.
///
/// `Unbuilt → Building → Built → Disposed`; a failed build returns to
/// `Unbuilt`.
pub(crate) struct SimpleLifecycle {
    descriptor: Arc<ComponentDescriptor>,
    state: Mutex<SimpleState>,
}

impl SimpleLifecycle {
    pub fn new(descriptor: Arc<ComponentDescriptor>) -> Self {
        Self {
            descriptor,
            state: Mutex::new(SimpleState::Unbuilt),
        }
    }
}

impl Lifecycle for SimpleLifecycle {
    fn create(&self, _container: ContainerId, build: &dyn Fn() -> Result<Object>) -> Result<Object> {
        let mut state = self.state.lock();
        match &*state {
            SimpleState::Built(object) => return Ok(Arc::clone(object)),
            SimpleState::Building => {
                // The container's resolve stack catches re-entry first.
                let name = self.descriptor.name().to_string();
                return Err(CompositionError::CircularDependency(CircularDependencyError {
                    chain: vec![name.clone(), name],
                }));
            }
            SimpleState::Disposed => return Err(CompositionError::AlreadyDisposed),
            SimpleState::Unbuilt => {}
        }
        *state = SimpleState::Building;
        drop(state);

        match build() {
            Ok(object) => {
                *self.state.lock() = SimpleState::Built(Arc::clone(&object));
                Ok(object)
            }
            Err(err) => {
                *self.state.lock() = SimpleState::Unbuilt;
                Err(err)
            }
        }
    }

    fn release(&self, container: ContainerId) -> Result<bool> {
        let previous = std::mem::replace(&mut *self.state.lock(), SimpleState::Disposed);
        match previous {
            SimpleState::Built(object) => {
                debug!(component = self.descriptor.name(), "Disposing simple component");
                self.descriptor.dispose(&object);
                Ok(true)
            }
            SimpleState::Unbuilt | SimpleState::Building => Ok(true),
            SimpleState::Disposed => Err(not_referenced(&self.descriptor, container)),
        }
    }

    fn current_object(&self) -> Option<Object> {
        match &*self.state.lock() {
            SimpleState::Built(object) => Some(Arc::clone(object)),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════
// Shared / Singleton
// ═══════════════════════════════════════════

/// Where a cross-container object lives in the [`LifetimeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegistrySlot {
    Shared(DescriptorId),
    Singleton(TypeId),
}

impl RegistrySlot {
    pub fn for_descriptor(descriptor: &ComponentDescriptor) -> Option<Self> {
        match descriptor.scope() {
            Scope::Simple => None,
            Scope::Shared => Some(RegistrySlot::Shared(descriptor.id())),
            Scope::Singleton => Some(RegistrySlot::Singleton(descriptor.implementation_type())),
        }
    }
}

enum HeldState {
    Idle,
    Holding(Object),
    Released,
}

/// One container's claim on a Shared or Singleton object.
///
/// The object itself lives in the [`LifetimeRegistry`]; this record only
/// remembers whether its container currently references it.
pub(crate) struct CountedLifecycle {
    descriptor: Arc<ComponentDescriptor>,
    registry: Arc<LifetimeRegistry>,
    slot: RegistrySlot,
    held: Mutex<HeldState>,
}

impl CountedLifecycle {
    pub fn new(descriptor: Arc<ComponentDescriptor>, registry: Arc<LifetimeRegistry>) -> Self {
        let slot = RegistrySlot::for_descriptor(&descriptor)
            .unwrap_or(RegistrySlot::Shared(descriptor.id()));
        Self {
            descriptor,
            registry,
            slot,
            held: Mutex::new(HeldState::Idle),
        }
    }
}

impl Lifecycle for CountedLifecycle {
    fn create(&self, container: ContainerId, build: &dyn Fn() -> Result<Object>) -> Result<Object> {
        match &*self.held.lock() {
            HeldState::Holding(object) => return Ok(Arc::clone(object)),
            HeldState::Released => return Err(CompositionError::AlreadyDisposed),
            HeldState::Idle => {}
        }

        let object = self.registry.acquire(self.slot, container, &self.descriptor, build)?;
        *self.held.lock() = HeldState::Holding(Arc::clone(&object));
        Ok(object)
    }

    fn release(&self, container: ContainerId) -> Result<bool> {
        let previous = std::mem::replace(&mut *self.held.lock(), HeldState::Released);
        match previous {
            HeldState::Holding(_) => self.registry.release(self.slot, container, &self.descriptor),
            HeldState::Idle => Ok(false),
            HeldState::Released => Err(not_referenced(&self.descriptor, container)),
        }
    }

    fn current_object(&self) -> Option<Object> {
        match &*self.held.lock() {
            HeldState::Holding(object) => Some(Arc::clone(object)),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════
// LifetimeRegistry
// ═══════════════════════════════════════════

/// A cross-container object and the containers referencing it.
///
/// A container may hold several claims on one Singleton (one per descriptor
/// of the same implementation type), so claims are counted per container.
struct SharedEntry {
    object: Object,
    /// Runs disposal on last release: the first claimant with a disposer.
    disposer: Arc<ComponentDescriptor>,
    referents: HashMap<ContainerId, usize>,
}

impl SharedEntry {
    fn claim(&mut self, container: ContainerId, descriptor: &Arc<ComponentDescriptor>) {
        *self.referents.entry(container).or_default() += 1;
        if !self.disposer.is_disposable() && descriptor.is_disposable() {
            self.disposer = Arc::clone(descriptor);
        }
    }

    /// Returns `false` if `container` held no claim.
    fn unclaim(&mut self, container: ContainerId) -> bool {
        let Some(claims) = self.referents.get_mut(&container) else {
            return false;
        };
        *claims -= 1;
        if *claims == 0 {
            self.referents.remove(&container);
        }
        true
    }
}

static GLOBAL_REGISTRY: Lazy<Arc<LifetimeRegistry>> = Lazy::new(|| Arc::new(LifetimeRegistry::new()));

/// Process-root tables of Shared and Singleton objects.
///
/// Containers created without an explicit registry use
/// [`LifetimeRegistry::global`]. Tests and embedders that need isolated
/// "processes" create their own and pass it to
/// [`ContainerBuilder::registry`](crate::container::ContainerBuilder::registry).
///
/// Each table operation holds the entry's lock only for the lookup or
/// mutation itself, never while a component is being constructed.
#[derive(Default)]
pub struct LifetimeRegistry {
    shared: DashMap<DescriptorId, SharedEntry>,
    singletons: DashMap<TypeId, SharedEntry>,
}

impl LifetimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default registry.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Number of live Shared objects.
    pub fn shared_len(&self) -> usize {
        self.shared.len()
    }

    /// Number of live Singleton objects.
    pub fn singleton_len(&self) -> usize {
        self.singletons.len()
    }

    /// Returns `true` if the object `descriptor` would share is already built.
    pub(crate) fn is_live(&self, descriptor: &ComponentDescriptor) -> bool {
        match RegistrySlot::for_descriptor(descriptor) {
            Some(RegistrySlot::Shared(id)) => self.shared.contains_key(&id),
            Some(RegistrySlot::Singleton(type_id)) => self.singletons.contains_key(&type_id),
            None => false,
        }
    }

    pub(crate) fn acquire(
        &self,
        slot: RegistrySlot,
        container: ContainerId,
        descriptor: &Arc<ComponentDescriptor>,
        build: &dyn Fn() -> Result<Object>,
    ) -> Result<Object> {
        match slot {
            RegistrySlot::Shared(id) => acquire_in(&self.shared, id, container, descriptor, build),
            RegistrySlot::Singleton(type_id) => {
                acquire_in(&self.singletons, type_id, container, descriptor, build)
            }
        }
    }

    pub(crate) fn release(
        &self,
        slot: RegistrySlot,
        container: ContainerId,
        descriptor: &ComponentDescriptor,
    ) -> Result<bool> {
        match slot {
            RegistrySlot::Shared(id) => release_in(&self.shared, id, container, descriptor),
            RegistrySlot::Singleton(type_id) => {
                release_in(&self.singletons, type_id, container, descriptor)
            }
        }
    }
}

impl fmt::Debug for LifetimeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeRegistry")
            .field("shared", &self.shared.len())
            .field("singletons", &self.singletons.len())
            .finish()
    }
}

fn acquire_in<K: Eq + Hash + Copy>(
    table: &DashMap<K, SharedEntry>,
    key: K,
    container: ContainerId,
    descriptor: &Arc<ComponentDescriptor>,
    build: &dyn Fn() -> Result<Object>,
) -> Result<Object> {
    if let Some(mut entry) = table.get_mut(&key) {
        entry.claim(container, descriptor);
        trace!(
            component = descriptor.name(),
            referents = entry.referents.len(),
            "Joined existing cross-container component"
        );
        return Ok(Arc::clone(&entry.object));
    }

    // No lock is held while the object and its dependencies are built.
    let object = build()?;

    match table.entry(key) {
        Entry::Occupied(mut occupied) => {
            occupied.get_mut().claim(container, descriptor);
            let winner = Arc::clone(&occupied.get().object);
            drop(occupied);
            warn!(
                component = descriptor.name(),
                "Concurrent build lost the race; disposing surplus object"
            );
            descriptor.dispose(&object);
            Ok(winner)
        }
        Entry::Vacant(vacant) => {
            debug!(
                component = descriptor.name(),
                scope = %descriptor.scope(),
                container = %container,
                "Published cross-container component"
            );
            vacant.insert(SharedEntry {
                object: Arc::clone(&object),
                disposer: Arc::clone(descriptor),
                referents: HashMap::from([(container, 1)]),
            });
            Ok(object)
        }
    }
}

fn release_in<K: Eq + Hash + Copy>(
    table: &DashMap<K, SharedEntry>,
    key: K,
    container: ContainerId,
    descriptor: &ComponentDescriptor,
) -> Result<bool> {
    let Entry::Occupied(mut occupied) = table.entry(key) else {
        return Err(not_referenced(descriptor, container));
    };

    if !occupied.get_mut().unclaim(container) {
        return Err(not_referenced(descriptor, container));
    }

    if !occupied.get().referents.is_empty() {
        trace!(
            component = descriptor.name(),
            remaining = occupied.get().referents.len(),
            "Released cross-container component"
        );
        return Ok(false);
    }

    let (_, entry) = occupied.remove_entry();
    debug!(component = entry.disposer.name(), "Disposing cross-container component");
    entry.disposer.dispose(&entry.object);
    Ok(true)
}
