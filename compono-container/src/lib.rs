//! Core container implementation for Compono.
//!
//! Components are described by [`ComponentDescriptor`]s collected in a
//! [`ComponentRepository`]; a [`Container`] resolves them by interface,
//! builds them through their lifecycle and releases them on disposal.

pub mod container;
pub mod descriptor;
pub mod error;
pub mod external;
mod instance;
pub mod key;
pub mod lifecycle;
pub mod plan;
pub mod repository;
pub mod scope;

pub use container::{Container, ContainerBuilder, ContainerHandle, ContainerId, prelude};
pub use descriptor::{Arguments, ComponentDescriptor, DescriptorId, Parameter, Signature};
pub use error::{CompositionError, Result};
pub use external::ExternalInstance;
pub use key::DependencyKey;
pub use lifecycle::{Disposable, LifetimeRegistry};
pub use plan::ConstructionPlan;
pub use repository::{ComponentRepository, Repository};
pub use scope::Scope;
