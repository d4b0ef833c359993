//! # The Container — heart of Compono
//!
//! The resolution engine: it looks up candidates for an interface, builds
//! component instances through their lifecycle strategies, guards against
//! construction cycles and releases everything it owns on disposal.
//!
//! # Architecture
//! ```text
//! ContainerBuilder ──build()──> Container ──owns──> ContainerCore
//!                                                     │
//!                      ┌──────────────────────────────┼───────────────────────┐
//!                      ▼                              ▼                       ▼
//!              ExternalInstance             ComponentInstance ──> Lifecycle ──> LifetimeRegistry
//!                                           (one per descriptor)               (Shared/Singleton)
//! ```
//!
//! # Examples
//! ```rust
//! use compono_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, msg: &str);
//! }
//!
//! struct ConsoleLogger;
//! impl Logger for ConsoleLogger {
//!     fn log(&self, msg: &str) { println!("{msg}"); }
//! }
//!
//! struct UserService {
//!     logger: Arc<dyn Logger>,
//! }
//!
//! let repository = Repository::builder()
//!     .register(
//!         ComponentDescriptor::builder::<ConsoleLogger>()
//!             .scope(Scope::Shared)
//!             .provides::<dyn Logger>(|l| l)
//!             .constructor(Signature::new(), |_| Ok(ConsoleLogger))
//!             .build(),
//!     )
//!     .register(
//!         ComponentDescriptor::builder::<UserService>()
//!             .provides_self()
//!             .constructor(Signature::new().component::<dyn Logger>(), |args| {
//!                 Ok(UserService { logger: args.component::<dyn Logger>()? })
//!             })
//!             .build(),
//!     )
//!     .build();
//!
//! let container = Container::builder()
//!     .repository(repository)
//!     .registry(Arc::new(LifetimeRegistry::new()))
//!     .build();
//!
//! let service: Arc<UserService> = container.resolve_one().expect("Failed to resolve");
//! service.logger.log("ready");
//! container.dispose().expect("Failed to dispose");
//! ```

use std::any::type_name;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use compono_support::rendering::{render_chain, shorten_type_name, suggest_similar};
use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, info, instrument, trace, warn};

use crate::descriptor::{ComponentDescriptor, DescriptorId, Object, View, unwrap_view};
use crate::error::{
    AmbiguousError, CircularDependencyError, CompositionError, NotFoundError, Result,
};
use crate::external::ExternalInstance;
use crate::instance::ComponentInstance;
use crate::key::DependencyKey;
use crate::lifecycle::LifetimeRegistry;
use crate::plan::{ConstructionPlan, Planner};
use crate::repository::{ComponentRepository, Repository};

const MAX_SUGGESTIONS: usize = 3;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a container, used as the referent in lifetime tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(u64);

impl ContainerId {
    pub(crate) fn next() -> Self {
        ContainerId(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ═══════════════════════════════════════════
// ContainerBuilder
// ═══════════════════════════════════════════

/// Builds a [`Container`].
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .repository(repository)
///     .external(ExternalInstance::of(Arc::new(settings)).provides::<dyn Settings>(|s| s))
///     .build();
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    repository: Option<Arc<dyn ComponentRepository>>,
    externals: Vec<ExternalInstance>,
    registry: Option<Arc<LifetimeRegistry>>,
}

impl ContainerBuilder {
    /// The repository to resolve descriptors from. Defaults to an empty one.
    pub fn repository(mut self, repository: Arc<dyn ComponentRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Adds a pre-built object. Externals are never disposed by the container.
    pub fn external(mut self, instance: impl Into<ExternalInstance>) -> Self {
        self.externals.push(instance.into());
        self
    }

    /// The table of Shared/Singleton objects. Defaults to the process-wide
    /// [`LifetimeRegistry::global`]; pass a fresh registry to keep this
    /// container's objects apart from the rest of the process.
    pub fn registry(mut self, registry: Arc<LifetimeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> Container {
        let repository = self
            .repository
            .unwrap_or_else(|| Repository::empty() as Arc<dyn ComponentRepository>);
        let registry = self.registry.unwrap_or_else(LifetimeRegistry::global);
        Container::from_parts(repository, self.externals, registry)
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

/// Owner of a component graph.
///
/// Resolution calls on one container are serialized; different containers
/// resolve in parallel and may share Shared/Singleton objects. Dropping an
/// undisposed container disposes it.
pub struct Container {
    core: Arc<ContainerCore>,
}

impl Container {
    /// Creates a container over `repository` with the given external
    /// instances.
    ///
    /// Shared and Singleton objects live in [`LifetimeRegistry::global`],
    /// so every container made this way shares them with every other one in
    /// the process. Use [`Container::builder`] with
    /// [`ContainerBuilder::registry`] for an isolated registry.
    pub fn new(
        repository: Arc<dyn ComponentRepository>,
        external_instances: Vec<ExternalInstance>,
    ) -> Self {
        Self::from_parts(repository, external_instances, LifetimeRegistry::global())
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    fn from_parts(
        repository: Arc<dyn ComponentRepository>,
        externals: Vec<ExternalInstance>,
        registry: Arc<LifetimeRegistry>,
    ) -> Self {
        let id = ContainerId::next();
        debug!(container = %id, externals = externals.len(), "Creating container");
        let core = Arc::new_cyclic(|this| ContainerCore {
            id,
            repository,
            externals,
            registry,
            instances: Mutex::new(InstanceTable::default()),
            resolution: ReentrantMutex::new(RefCell::new(Vec::new())),
            this: this.clone(),
        });
        Self { core }
    }

    pub fn id(&self) -> ContainerId {
        self.core.id
    }

    /// Resolves the unique component providing `I`.
    ///
    /// # Errors
    /// - [`CompositionError::NotFound`] — nothing provides `I`
    /// - [`CompositionError::Ambiguous`] — more than one candidate
    /// - any construction error of the component or its dependencies
    #[instrument(skip_all, name = "resolve_one", fields(container = %self.core.id, interface = type_name::<I>()))]
    pub fn resolve_one<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        self.core.resolve_one::<I>()
    }

    /// Like [`resolve_one`](Self::resolve_one), but `Ok(None)` when nothing
    /// provides `I`. Ambiguity is still an error.
    #[instrument(skip_all, name = "try_resolve_one", fields(container = %self.core.id, interface = type_name::<I>()))]
    pub fn try_resolve_one<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<I>>> {
        self.core.try_resolve_one::<I>()
    }

    /// Resolves every component providing `I`: external instances first,
    /// then repository descriptors in registration order.
    #[instrument(skip_all, name = "resolve_all", fields(container = %self.core.id, interface = type_name::<I>()))]
    pub fn resolve_all<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<I>>> {
        self.core.resolve_all::<I>()
    }

    /// Returns `true` if at least one external instance or descriptor
    /// provides `I`. Never constructs anything.
    pub fn can_resolve<I: ?Sized + 'static>(&self) -> bool {
        self.core.can_resolve_key(&DependencyKey::of::<I>())
    }

    pub fn can_resolve_key(&self, interface: &DependencyKey) -> bool {
        self.core.can_resolve_key(interface)
    }

    /// [`resolve_one`](Self::resolve_one) reporting `(total, current, name)`
    /// before each component construction.
    #[instrument(skip_all, name = "resolve_one_with_progress", fields(container = %self.core.id, interface = type_name::<I>()))]
    pub fn resolve_one_with_progress<I: ?Sized + Send + Sync + 'static>(
        &self,
        mut progress: impl FnMut(u32, u32, &str),
    ) -> Result<Arc<I>> {
        let _serial = self.core.resolution.lock();
        let plan = self.plan_one::<I>()?;
        self.core.execute(&plan, &mut progress)?;
        self.core.resolve_one::<I>()
    }

    /// [`try_resolve_one`](Self::try_resolve_one) with progress reporting.
    #[instrument(skip_all, name = "try_resolve_one_with_progress", fields(container = %self.core.id, interface = type_name::<I>()))]
    pub fn try_resolve_one_with_progress<I: ?Sized + Send + Sync + 'static>(
        &self,
        progress: impl FnMut(u32, u32, &str),
    ) -> Result<Option<Arc<I>>> {
        let _serial = self.core.resolution.lock();
        if !self.can_resolve::<I>() {
            self.core.ensure_live()?;
            return Ok(None);
        }
        self.resolve_one_with_progress::<I>(progress).map(Some)
    }

    /// [`resolve_all`](Self::resolve_all) with progress reporting.
    #[instrument(skip_all, name = "resolve_all_with_progress", fields(container = %self.core.id, interface = type_name::<I>()))]
    pub fn resolve_all_with_progress<I: ?Sized + Send + Sync + 'static>(
        &self,
        mut progress: impl FnMut(u32, u32, &str),
    ) -> Result<Vec<Arc<I>>> {
        let _serial = self.core.resolution.lock();
        let plan = self.plan_all::<I>()?;
        self.core.execute(&plan, &mut progress)?;
        self.core.resolve_all::<I>()
    }

    /// Computes what `resolve_one::<I>()` would construct, without
    /// constructing anything.
    pub fn plan_one<I: ?Sized + 'static>(&self) -> Result<ConstructionPlan> {
        self.core.ensure_live()?;
        let _serial = self.core.resolution.lock();
        let mut planner = Planner::new(&self.core);
        planner.plan_one(&DependencyKey::of::<I>())?;
        Ok(planner.finish())
    }

    /// Computes what `resolve_all::<I>()` would construct.
    pub fn plan_all<I: ?Sized + 'static>(&self) -> Result<ConstructionPlan> {
        self.core.ensure_live()?;
        let _serial = self.core.resolution.lock();
        let mut planner = Planner::new(&self.core);
        planner.plan_all(&DependencyKey::of::<I>())?;
        Ok(planner.finish())
    }

    /// Releases every component instance this container created.
    ///
    /// Simple objects are disposed; Shared and Singleton objects are disposed
    /// only if this container was their last referent. External instances are
    /// left alone.
    ///
    /// # Errors
    /// [`CompositionError::AlreadyDisposed`] on a second call.
    #[instrument(skip_all, name = "dispose", fields(container = %self.core.id))]
    pub fn dispose(&self) -> Result<()> {
        self.core.dispose()
    }

    pub fn is_disposed(&self) -> bool {
        self.core.instances.lock().disposed
    }

    /// Number of components this container has materialized.
    pub fn instance_count(&self) -> usize {
        self.core.instances.lock().order.len()
    }

    /// A weak handle that resolves through this container.
    pub fn handle(&self) -> ContainerHandle {
        self.core.handle()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.is_disposed() {
            return;
        }
        if let Err(err) = self.core.dispose() {
            warn!(container = %self.core.id, error = %err, "Disposal on drop failed");
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.core.instances.lock();
        f.debug_struct("Container")
            .field("id", &self.core.id)
            .field("externals", &self.core.externals.len())
            .field("instances", &table.order.len())
            .field("disposed", &table.disposed)
            .finish()
    }
}

// ═══════════════════════════════════════════
// ContainerHandle
// ═══════════════════════════════════════════

/// A weak reference to a container, handed to constructors that declare a
/// container parameter.
///
/// Holding a handle never keeps the container alive; once the container is
/// gone every call fails with [`CompositionError::AlreadyDisposed`].
#[derive(Clone)]
pub struct ContainerHandle {
    core: Weak<ContainerCore>,
}

impl ContainerHandle {
    fn upgrade(&self) -> Result<Arc<ContainerCore>> {
        self.core.upgrade().ok_or(CompositionError::AlreadyDisposed)
    }

    pub fn id(&self) -> Result<ContainerId> {
        Ok(self.upgrade()?.id)
    }

    pub fn resolve_one<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        self.upgrade()?.resolve_one::<I>()
    }

    pub fn try_resolve_one<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<I>>> {
        self.upgrade()?.try_resolve_one::<I>()
    }

    pub fn resolve_all<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<I>>> {
        self.upgrade()?.resolve_all::<I>()
    }

    pub fn can_resolve<I: ?Sized + 'static>(&self) -> bool {
        self.core
            .upgrade()
            .is_some_and(|core| core.can_resolve_key(&DependencyKey::of::<I>()))
    }
}

impl fmt::Debug for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerHandle")
            .field("alive", &(self.core.strong_count() > 0))
            .finish()
    }
}

// ═══════════════════════════════════════════
// ContainerCore (resolution engine)
// ═══════════════════════════════════════════

#[derive(Default)]
struct InstanceTable {
    by_descriptor: HashMap<DescriptorId, Arc<ComponentInstance>>,
    /// Materialized instances in the order their objects were built, so
    /// dependencies precede dependents. Disposal walks it backwards.
    order: Vec<Arc<ComponentInstance>>,
    built: HashSet<DescriptorId>,
    disposed: bool,
}

pub(crate) struct ContainerCore {
    id: ContainerId,
    repository: Arc<dyn ComponentRepository>,
    externals: Vec<ExternalInstance>,
    registry: Arc<LifetimeRegistry>,
    instances: Mutex<InstanceTable>,
    /// Serializes resolution per container and holds the stack of
    /// descriptors under construction.
    resolution: ReentrantMutex<RefCell<Vec<Arc<ComponentDescriptor>>>>,
    this: Weak<ContainerCore>,
}

impl ContainerCore {
    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn repository(&self) -> Arc<dyn ComponentRepository> {
        Arc::clone(&self.repository)
    }

    pub fn handle(&self) -> ContainerHandle {
        ContainerHandle {
            core: self.this.clone(),
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.instances.lock().disposed {
            return Err(CompositionError::AlreadyDisposed);
        }
        Ok(())
    }

    // ── Queries without side effects ──

    pub fn can_resolve_key(&self, interface: &DependencyKey) -> bool {
        self.externals.iter().any(|external| external.provides(interface))
            || !self.repository.find_descriptors(interface).is_empty()
    }

    pub fn is_component_interface(&self, interface: &DependencyKey) -> bool {
        self.repository.is_component_interface(interface)
    }

    pub fn external_names(&self, interface: &DependencyKey) -> Vec<String> {
        self.externals
            .iter()
            .filter(|external| external.provides(interface))
            .map(|external| external.name().to_string())
            .collect()
    }

    /// Returns `true` if resolving `descriptor` here would not construct.
    pub fn is_materialized(&self, descriptor: &ComponentDescriptor) -> bool {
        if self.registry.is_live(descriptor) {
            return true;
        }
        let instance = self.instances.lock().by_descriptor.get(&descriptor.id()).cloned();
        instance.is_some_and(|instance| instance.current_object().is_some())
    }

    pub fn not_found(&self, interface: &DependencyKey) -> CompositionError {
        let known = self.repository.interface_names();
        CompositionError::NotFound(NotFoundError {
            requested: *interface,
            required_by: None,
            suggestions: suggest_similar(interface.type_name(), &known, MAX_SUGGESTIONS),
        })
    }

    pub fn ambiguous(
        &self,
        interface: &DependencyKey,
        mut candidates: Vec<String>,
        descriptors: &[Arc<ComponentDescriptor>],
    ) -> CompositionError {
        candidates.extend(descriptors.iter().map(|d| d.name().to_string()));
        warn!(interface = %interface, candidates = ?candidates, "Ambiguous resolution");
        CompositionError::Ambiguous(AmbiguousError {
            requested: *interface,
            candidates,
        })
    }

    // ── Typed resolution ──

    fn resolve_one<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<I>> {
        typed::<I>(self.resolve_one_view(&DependencyKey::of::<I>())?)
    }

    fn try_resolve_one<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Option<Arc<I>>> {
        self.try_resolve_one_view(&DependencyKey::of::<I>())?
            .map(typed::<I>)
            .transpose()
    }

    fn resolve_all<I: ?Sized + Send + Sync + 'static>(&self) -> Result<Vec<Arc<I>>> {
        self.resolve_all_views(&DependencyKey::of::<I>())?
            .into_iter()
            .map(typed::<I>)
            .collect()
    }

    // ── Erased resolution ──

    pub fn resolve_one_view(&self, interface: &DependencyKey) -> Result<View> {
        self.try_resolve_one_view(interface)?
            .ok_or_else(|| self.not_found(interface))
    }

    fn try_resolve_one_view(&self, interface: &DependencyKey) -> Result<Option<View>> {
        self.ensure_live()?;
        let _serial = self.resolution.lock();
        trace!(interface = %interface, "Resolving one");

        let externals: Vec<&ExternalInstance> = self
            .externals
            .iter()
            .filter(|external| external.provides(interface))
            .collect();
        let descriptors = self.repository.find_descriptors(interface);

        match (externals.as_slice(), descriptors.as_slice()) {
            ([], []) => Ok(None),
            ([external], []) => external
                .view(interface)
                .map(Some)
                .ok_or_else(|| external_mismatch(external, interface)),
            ([], [descriptor]) => self.materialize(descriptor, interface).map(Some),
            _ => {
                let names = externals.iter().map(|e| e.name().to_string()).collect();
                Err(self.ambiguous(interface, names, &descriptors))
            }
        }
    }

    pub fn resolve_all_views(&self, interface: &DependencyKey) -> Result<Vec<View>> {
        self.ensure_live()?;
        let _serial = self.resolution.lock();
        trace!(interface = %interface, "Resolving all");

        let mut views = Vec::new();
        for external in self.externals.iter().filter(|e| e.provides(interface)) {
            views.push(
                external
                    .view(interface)
                    .ok_or_else(|| external_mismatch(external, interface))?,
            );
        }
        for descriptor in self.repository.find_descriptors(interface) {
            views.push(self.materialize(&descriptor, interface)?);
        }
        Ok(views)
    }

    fn materialize(&self, descriptor: &Arc<ComponentDescriptor>, interface: &DependencyKey) -> Result<View> {
        let instance = self.instance_for(descriptor)?;
        let object = self.build(&instance)?;
        descriptor
            .view(&object, interface)
            .ok_or_else(|| CompositionError::InterfaceMismatch {
                component: descriptor.name().to_string(),
                interface: *interface,
            })
    }

    /// Runs `instance`'s construction inside a resolve-stack frame.
    fn build(&self, instance: &Arc<ComponentInstance>) -> Result<Object> {
        let resolution = self.resolution.lock();
        let object = {
            let _frame = ResolveFrame::enter(&resolution, instance.descriptor())?;
            instance.create_instance(self)?
        };

        let first_here = {
            let mut table = self.instances.lock();
            let first_here = table.built.insert(instance.descriptor().id());
            if first_here {
                table.order.push(Arc::clone(instance));
            }
            first_here
        };
        // Wire the object this container actually holds, which for a
        // cross-container scope may be another container's build.
        if first_here {
            self.inject_back_references(instance.descriptor(), &object);
        }
        Ok(object)
    }

    fn instance_for(&self, descriptor: &Arc<ComponentDescriptor>) -> Result<Arc<ComponentInstance>> {
        let mut table = self.instances.lock();
        if table.disposed {
            return Err(CompositionError::AlreadyDisposed);
        }
        if let Some(instance) = table.by_descriptor.get(&descriptor.id()) {
            return Ok(Arc::clone(instance));
        }

        let instance = Arc::new(ComponentInstance::new(Arc::clone(descriptor), &self.registry));
        table.by_descriptor.insert(descriptor.id(), Arc::clone(&instance));
        trace!(container = %self.id, component = descriptor.name(), "Created instance record");
        Ok(instance)
    }

    // ── Plans ──

    fn execute(&self, plan: &ConstructionPlan, progress: &mut dyn FnMut(u32, u32, &str)) -> Result<()> {
        let total = u32::try_from(plan.len()).unwrap_or(u32::MAX);
        for (index, step) in plan.steps().iter().enumerate() {
            let current = u32::try_from(index).unwrap_or(u32::MAX);
            progress(total, current, step.name());
            let instance = self.instance_for(step.descriptor())?;
            self.build(&instance)?;
        }
        Ok(())
    }

    // ── Late back-reference pass ──

    /// Fills back-reference slots between a freshly built object and the
    /// objects already materialized in this container, in both directions.
    fn inject_back_references(&self, descriptor: &Arc<ComponentDescriptor>, object: &Object) {
        let materialized: Vec<(Arc<ComponentDescriptor>, Object)> = {
            let table = self.instances.lock();
            table.order.clone()
        }
        .into_iter()
        .filter(|instance| instance.descriptor().id() != descriptor.id())
        .filter_map(|instance| {
            let current = instance.current_object()?;
            (!Arc::ptr_eq(&current, object)).then(|| (Arc::clone(instance.descriptor()), current))
        })
        .collect();

        for slot in descriptor.back_references() {
            let source = self
                .externals
                .iter()
                .find_map(|external| external.view(&slot.interface))
                .or_else(|| {
                    materialized
                        .iter()
                        .find_map(|(owner, current)| owner.view(current, &slot.interface))
                });
            if let Some(source) = source
                && slot.assign(object, source)
            {
                trace!(component = descriptor.name(), slot = %slot.interface, "Back reference filled");
            }
        }

        for (owner, current) in &materialized {
            for slot in owner.back_references() {
                if let Some(view) = descriptor.view(object, &slot.interface)
                    && slot.assign(current, view)
                {
                    trace!(
                        component = owner.name(),
                        slot = %slot.interface,
                        source = descriptor.name(),
                        "Back reference filled"
                    );
                }
            }
        }
    }

    // ── Disposal ──

    fn dispose(&self) -> Result<()> {
        let _serial = self.resolution.lock();
        let instances = {
            let mut table = self.instances.lock();
            if table.disposed {
                return Err(CompositionError::AlreadyDisposed);
            }
            table.disposed = true;
            table.by_descriptor.clear();
            table.built.clear();
            std::mem::take(&mut table.order)
        };

        info!(container = %self.id, instances = instances.len(), "Disposing container");

        let mut first_error = None;
        for instance in instances.iter().rev() {
            if let Err(err) = instance.release(self.id) {
                warn!(
                    container = %self.id,
                    component = instance.descriptor().name(),
                    error = %err,
                    "Release failed"
                );
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn typed<I: ?Sized + Send + Sync + 'static>(view: View) -> Result<Arc<I>> {
    unwrap_view::<I>(view).ok_or_else(|| CompositionError::InterfaceMismatch {
        component: shorten_type_name(type_name::<I>()),
        interface: DependencyKey::of::<I>(),
    })
}

fn external_mismatch(external: &ExternalInstance, interface: &DependencyKey) -> CompositionError {
    CompositionError::InterfaceMismatch {
        component: external.name().to_string(),
        interface: *interface,
    }
}

// ═══════════════════════════════════════════
// Recursion guard
// ═══════════════════════════════════════════

/// One descriptor on the resolve stack; popped when dropped, on every path.
struct ResolveFrame<'a> {
    stack: &'a RefCell<Vec<Arc<ComponentDescriptor>>>,
}

impl<'a> ResolveFrame<'a> {
    fn enter(
        stack: &'a RefCell<Vec<Arc<ComponentDescriptor>>>,
        descriptor: &Arc<ComponentDescriptor>,
    ) -> Result<Self> {
        let mut frames = stack.borrow_mut();

        if let Some(start) = frames.iter().position(|frame| frame.id() == descriptor.id()) {
            let mut chain: Vec<String> = frames[start..]
                .iter()
                .map(|frame| frame.name().to_string())
                .collect();
            chain.push(descriptor.name().to_string());

            warn!(cycle = %render_chain(&chain), "Circular dependency detected!");
            return Err(CompositionError::CircularDependency(CircularDependencyError { chain }));
        }

        frames.push(Arc::clone(descriptor));
        Ok(Self { stack })
    }
}

impl Drop for ResolveFrame<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, ContainerHandle, ContainerId};
    pub use crate::descriptor::{Arguments, ComponentDescriptor, Signature};
    pub use crate::error::{CompositionError, Result};
    pub use crate::external::ExternalInstance;
    pub use crate::key::DependencyKey;
    pub use crate::lifecycle::{Disposable, LifetimeRegistry};
    pub use crate::plan::ConstructionPlan;
    pub use crate::repository::{ComponentRepository, Repository};
    pub use crate::scope::Scope;
}
