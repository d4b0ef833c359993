//! Component descriptors: the registration records the container consumes.
//!
//! A [`ComponentDescriptor`] maps one implementation type to the interfaces
//! it provides, declares its [`Scope`], the constructors the container may
//! choose from, an optional configuration value and an optional private
//! repository. Descriptors are immutable once built and compared by
//! identity ([`DescriptorId`]).
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use compono_container::prelude::*;
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
//! let descriptor = ComponentDescriptor::builder::<ConsoleLogger>()
//!     .scope(Scope::Shared)
//!     .provides::<dyn Logger>(|logger| logger)
//!     .constructor(Signature::new(), |_| Ok(ConsoleLogger))
//!     .build();
//!
//! assert_eq!(descriptor.name(), "ConsoleLogger");
//! assert!(descriptor.provides(&DependencyKey::of::<dyn Logger>()));
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use compono_support::rendering::shorten_type_name;

use crate::container::ContainerHandle;
use crate::error::{CompositionError, Result};
use crate::key::DependencyKey;
use crate::lifecycle::Disposable;
use crate::repository::ComponentRepository;
use crate::scope::Scope;

/// A type-erased component object: an `Arc<T>` of the implementation type.
pub type Object = Arc<dyn Any + Send + Sync>;

/// A type-erased interface view: a boxed `Arc<I>`.
pub(crate) type View = Box<dyn Any + Send + Sync>;

type ViewFn = Arc<dyn Fn(&Object) -> Option<View> + Send + Sync>;
type BuildFn = Arc<dyn Fn(&mut Arguments) -> Result<Object> + Send + Sync>;
type AssignFn = Arc<dyn Fn(&Object, View) -> bool + Send + Sync>;
type DisposeFn = Arc<dyn Fn(&Object) + Send + Sync>;

static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a built descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(u64);

impl DescriptorId {
    fn next() -> Self {
        DescriptorId(NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for DescriptorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How an object of type `T` is viewed as interface `I`.
#[derive(Clone)]
pub(crate) struct InterfaceBinding {
    pub key: DependencyKey,
    view: ViewFn,
}

impl InterfaceBinding {
    pub fn new<T, I>(cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static) -> Self
    where
        T: Send + Sync + 'static,
        I: ?Sized + Send + Sync + 'static,
    {
        Self {
            key: DependencyKey::of::<I>(),
            view: Arc::new(move |object: &Object| {
                let concrete = Arc::clone(object).downcast::<T>().ok()?;
                Some(Box::new(cast(concrete)) as View)
            }),
        }
    }

    pub fn view(&self, object: &Object) -> Option<View> {
        (self.view)(object)
    }
}

/// Turns an erased view back into `Arc<I>`.
pub(crate) fn unwrap_view<I: ?Sized + Send + Sync + 'static>(view: View) -> Option<Arc<I>> {
    view.downcast::<Arc<I>>().ok().map(|boxed| *boxed)
}

// ═══════════════════════════════════════════
// Constructor signatures
// ═══════════════════════════════════════════

/// One constructor parameter, classified by how the container supplies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    /// A single component interface, resolved with `resolve_one`.
    Component(DependencyKey),
    /// Every component providing an interface, resolved with `resolve_all`.
    Components(DependencyKey),
    /// The descriptor's private repository, or the container's one.
    Repository,
    /// A weak handle to the resolving container.
    Container,
    /// The descriptor's configuration value of the given type.
    Config(DependencyKey),
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Component(key) => write!(f, "{key}"),
            Parameter::Components(key) => write!(f, "[{key}]"),
            Parameter::Repository => write!(f, "Repository"),
            Parameter::Container => write!(f, "Container"),
            Parameter::Config(key) => write!(f, "Config<{key}>"),
        }
    }
}

/// The parameter list of a constructor.
///
/// ```
/// use compono_container::descriptor::Signature;
///
/// trait Logger {}
/// trait Plugin {}
/// struct Settings;
///
/// let signature = Signature::new()
///     .component::<dyn Logger>()
///     .components::<dyn Plugin>()
///     .config::<Settings>();
/// assert_eq!(signature.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Signature {
    parameters: Vec<Parameter>,
}

impl Signature {
    /// An empty signature: a constructor without parameters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn component<I: ?Sized + 'static>(mut self) -> Self {
        self.parameters.push(Parameter::Component(DependencyKey::of::<I>()));
        self
    }

    pub fn components<I: ?Sized + 'static>(mut self) -> Self {
        self.parameters.push(Parameter::Components(DependencyKey::of::<I>()));
        self
    }

    pub fn repository(mut self) -> Self {
        self.parameters.push(Parameter::Repository);
        self
    }

    pub fn container(mut self) -> Self {
        self.parameters.push(Parameter::Container);
        self
    }

    pub fn config<C: 'static>(mut self) -> Self {
        self.parameters.push(Parameter::Config(DependencyKey::of::<C>()));
        self
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// A declared constructor: a [`Signature`] plus the closure that builds the
/// object from resolved [`Arguments`].
#[derive(Clone)]
pub struct Constructor {
    signature: Signature,
    build: BuildFn,
}

impl Constructor {
    pub fn parameters(&self) -> &[Parameter] {
        self.signature.parameters()
    }

    pub(crate) fn invoke(&self, arguments: &mut Arguments) -> Result<Object> {
        (self.build)(arguments)
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor")
            .field("parameters", &self.signature.parameters)
            .finish()
    }
}

/// A resolved argument, matching one [`Parameter`].
pub(crate) enum Argument {
    Component(View),
    Components(Vec<View>),
    Repository(Arc<dyn ComponentRepository>),
    Container(ContainerHandle),
    Config(Object),
}

/// Resolved constructor arguments.
///
/// Arguments are taken by kind and type, not by position: each call consumes
/// the first not-yet-taken argument declared with a matching parameter, so a
/// signature may list the same interface twice.
pub struct Arguments {
    component: String,
    slots: Vec<(Parameter, Option<Argument>)>,
}

impl Arguments {
    pub(crate) fn new(component: impl Into<String>, slots: Vec<(Parameter, Argument)>) -> Self {
        Self {
            component: component.into(),
            slots: slots.into_iter().map(|(p, a)| (p, Some(a))).collect(),
        }
    }

    /// Takes the single component resolved for interface `I`.
    pub fn component<I: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<I>> {
        let wanted = Parameter::Component(DependencyKey::of::<I>());
        match self.take(wanted)? {
            Argument::Component(view) => unwrap_view::<I>(view).ok_or_else(|| self.mismatch(wanted)),
            _ => Err(self.mismatch(wanted)),
        }
    }

    /// Takes every component resolved for interface `I`.
    pub fn components<I: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Vec<Arc<I>>> {
        let wanted = Parameter::Components(DependencyKey::of::<I>());
        match self.take(wanted)? {
            Argument::Components(views) => views
                .into_iter()
                .map(|view| unwrap_view::<I>(view).ok_or_else(|| self.mismatch(wanted)))
                .collect(),
            _ => Err(self.mismatch(wanted)),
        }
    }

    pub fn repository(&mut self) -> Result<Arc<dyn ComponentRepository>> {
        match self.take(Parameter::Repository)? {
            Argument::Repository(repository) => Ok(repository),
            _ => Err(self.mismatch(Parameter::Repository)),
        }
    }

    pub fn container(&mut self) -> Result<ContainerHandle> {
        match self.take(Parameter::Container)? {
            Argument::Container(handle) => Ok(handle),
            _ => Err(self.mismatch(Parameter::Container)),
        }
    }

    /// Takes the descriptor's configuration value as `C`.
    pub fn config<C: Send + Sync + 'static>(&mut self) -> Result<Arc<C>> {
        let wanted = Parameter::Config(DependencyKey::of::<C>());
        match self.take(wanted)? {
            Argument::Config(value) => value.downcast::<C>().map_err(|_| self.mismatch(wanted)),
            _ => Err(self.mismatch(wanted)),
        }
    }

    fn take(&mut self, wanted: Parameter) -> Result<Argument> {
        self.slots
            .iter_mut()
            .filter(|(parameter, _)| *parameter == wanted)
            .find_map(|(_, argument)| argument.take())
            .ok_or_else(|| CompositionError::ArgumentNotDeclared {
                component: self.component.clone(),
                parameter: wanted.to_string(),
            })
    }

    fn mismatch(&self, parameter: Parameter) -> CompositionError {
        let interface = match parameter {
            Parameter::Component(key) | Parameter::Components(key) | Parameter::Config(key) => key,
            Parameter::Repository => DependencyKey::of::<dyn ComponentRepository>(),
            Parameter::Container => DependencyKey::of::<ContainerHandle>(),
        };
        CompositionError::InterfaceMismatch {
            component: self.component.clone(),
            interface,
        }
    }
}

// ═══════════════════════════════════════════
// Descriptor
// ═══════════════════════════════════════════

/// A configuration value attached to a descriptor.
#[derive(Clone)]
pub(crate) struct ConfigValue {
    pub key: DependencyKey,
    pub value: Object,
}

/// An opt-in back-reference slot, filled after construction.
#[derive(Clone)]
pub(crate) struct BackReference {
    pub interface: DependencyKey,
    assign: AssignFn,
}

impl BackReference {
    /// Hands `source` (a view of the slot's interface) to `target`.
    ///
    /// Returns `false` if either side has an unexpected type.
    pub fn assign(&self, target: &Object, source: View) -> bool {
        (self.assign)(target, source)
    }
}

/// Immutable registration record for one implementation type.
pub struct ComponentDescriptor {
    id: DescriptorId,
    name: String,
    implementation: DependencyKey,
    scope: Scope,
    interfaces: Vec<InterfaceBinding>,
    constructors: Vec<Constructor>,
    config: Option<ConfigValue>,
    private_repository: Option<Arc<dyn ComponentRepository>>,
    disposer: Option<DisposeFn>,
    back_references: Vec<BackReference>,
}

impl ComponentDescriptor {
    /// Starts describing implementation type `T`.
    pub fn builder<T: Send + Sync + 'static>() -> DescriptorBuilder<T> {
        DescriptorBuilder::new()
    }

    pub fn id(&self) -> DescriptorId {
        self.id
    }

    /// Short implementation type name, used in every diagnostic.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn implementation(&self) -> DependencyKey {
        self.implementation
    }

    pub(crate) fn implementation_type(&self) -> TypeId {
        self.implementation.type_id()
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Interfaces this descriptor provides, in registration order.
    pub fn interfaces(&self) -> impl Iterator<Item = DependencyKey> + '_ {
        self.interfaces.iter().map(|binding| binding.key)
    }

    pub fn provides(&self, interface: &DependencyKey) -> bool {
        self.interfaces.iter().any(|binding| binding.key == *interface)
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    /// Type of the configuration value, if one was attached.
    pub fn config_type(&self) -> Option<DependencyKey> {
        self.config.as_ref().map(|config| config.key)
    }

    pub(crate) fn config(&self) -> Option<&ConfigValue> {
        self.config.as_ref()
    }

    pub fn private_repository(&self) -> Option<&Arc<dyn ComponentRepository>> {
        self.private_repository.as_ref()
    }

    pub fn is_disposable(&self) -> bool {
        self.disposer.is_some()
    }

    pub(crate) fn back_references(&self) -> &[BackReference] {
        &self.back_references
    }

    /// Views a built object as `interface`.
    pub(crate) fn view(&self, object: &Object, interface: &DependencyKey) -> Option<View> {
        self.interfaces
            .iter()
            .find(|binding| binding.key == *interface)
            .and_then(|binding| binding.view(object))
    }

    /// Runs the disposal hook, if the descriptor declared one.
    pub(crate) fn dispose(&self, object: &Object) {
        if let Some(disposer) = &self.disposer {
            disposer(object);
        }
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("interfaces", &self.interfaces().collect::<Vec<_>>())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

/// Builds a [`ComponentDescriptor`] for implementation type `T`.
pub struct DescriptorBuilder<T> {
    scope: Scope,
    interfaces: Vec<InterfaceBinding>,
    constructors: Vec<Constructor>,
    config: Option<ConfigValue>,
    private_repository: Option<Arc<dyn ComponentRepository>>,
    disposer: Option<DisposeFn>,
    back_references: Vec<BackReference>,
    _implementation: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DescriptorBuilder<T> {
    fn new() -> Self {
        Self {
            scope: Scope::default(),
            interfaces: Vec::new(),
            constructors: Vec::new(),
            config: None,
            private_repository: None,
            disposer: None,
            back_references: Vec::new(),
            _implementation: PhantomData,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Declares that `T` provides interface `I`.
    ///
    /// `cast` is the unsizing coercion, usually just `|t| t`.
    pub fn provides<I: ?Sized + Send + Sync + 'static>(
        mut self,
        cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    ) -> Self {
        self.interfaces.push(InterfaceBinding::new::<T, I>(cast));
        self
    }

    /// Declares that `T` can be resolved as itself.
    pub fn provides_self(self) -> Self {
        self.provides::<T>(|this| this)
    }

    /// Adds a constructor. The container picks the feasible constructor with
    /// the most parameters.
    pub fn constructor(
        mut self,
        signature: Signature,
        build: impl Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        self.constructors.push(Constructor {
            signature,
            build: Arc::new(move |arguments: &mut Arguments| {
                Ok(Arc::new(build(arguments)?) as Object)
            }),
        });
        self
    }

    /// Attaches the configuration value handed to `config` parameters.
    pub fn config<C: Send + Sync + 'static>(mut self, value: C) -> Self {
        self.config = Some(ConfigValue {
            key: DependencyKey::of::<C>(),
            value: Arc::new(value),
        });
        self
    }

    /// Gives constructors a repository other than the container's.
    pub fn private_repository(mut self, repository: Arc<dyn ComponentRepository>) -> Self {
        self.private_repository = Some(repository);
        self
    }

    /// Calls [`Disposable::dispose`] when the object is released for good.
    pub fn disposable(mut self) -> Self
    where
        T: Disposable,
    {
        self.disposer = Some(Arc::new(|object: &Object| {
            if let Some(component) = (**object).downcast_ref::<T>() {
                component.dispose();
            }
        }));
        self
    }

    /// Declares a back-reference slot of interface `I`.
    ///
    /// After construction, `assign` receives a materialized component of the
    /// same container that provides `I`; whichever side is built second fills
    /// the slot. This is the only way two components can refer to each other.
    /// Store the reference weakly to avoid a reference cycle.
    pub fn back_reference<I: ?Sized + Send + Sync + 'static>(
        mut self,
        assign: impl Fn(&T, Arc<I>) + Send + Sync + 'static,
    ) -> Self {
        self.back_references.push(BackReference {
            interface: DependencyKey::of::<I>(),
            assign: Arc::new(move |target: &Object, source: View| {
                let Some(target) = (**target).downcast_ref::<T>() else {
                    return false;
                };
                match unwrap_view::<I>(source) {
                    Some(source) => {
                        assign(target, source);
                        true
                    }
                    None => false,
                }
            }),
        });
        self
    }

    pub fn build(self) -> Arc<ComponentDescriptor> {
        Arc::new(ComponentDescriptor {
            id: DescriptorId::next(),
            name: shorten_type_name(type_name::<T>()),
            implementation: DependencyKey::of::<T>(),
            scope: self.scope,
            interfaces: self.interfaces,
            constructors: self.constructors,
            config: self.config,
            private_repository: self.private_repository,
            disposer: self.disposer,
            back_references: self.back_references,
        })
    }
}
