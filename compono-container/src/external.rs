//! External instances: pre-built objects handed to a container.
//!
//! An external instance satisfies component interfaces without any
//! descriptor. It is consulted before the repository, and the container
//! never owns or disposes it.

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use compono_support::rendering::shorten_type_name;

use crate::descriptor::{InterfaceBinding, Object, View};
use crate::key::DependencyKey;

/// A caller-supplied object and the interfaces it may be resolved as.
///
/// ```
/// use std::sync::Arc;
/// use compono_container::external::ExternalInstance;
///
/// trait Clock: Send + Sync {}
/// struct SystemClock;
/// impl Clock for SystemClock {}
///
/// let clock = ExternalInstance::of(Arc::new(SystemClock))
///     .provides::<dyn Clock>(|c| c)
///     .build();
/// assert_eq!(clock.name(), "SystemClock");
/// ```
pub struct ExternalInstance {
    name: String,
    object: Object,
    interfaces: Vec<InterfaceBinding>,
}

impl ExternalInstance {
    pub fn of<T: Send + Sync + 'static>(value: Arc<T>) -> ExternalBuilder<T> {
        ExternalBuilder {
            value,
            interfaces: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provides(&self, interface: &DependencyKey) -> bool {
        self.interfaces.iter().any(|binding| binding.key == *interface)
    }

    pub(crate) fn view(&self, interface: &DependencyKey) -> Option<View> {
        self.interfaces
            .iter()
            .find(|binding| binding.key == *interface)
            .and_then(|binding| binding.view(&self.object))
    }
}

impl fmt::Debug for ExternalInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalInstance")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces.iter().map(|b| b.key).collect::<Vec<_>>())
            .finish()
    }
}

/// Declares the interfaces of an [`ExternalInstance`].
pub struct ExternalBuilder<T> {
    value: Arc<T>,
    interfaces: Vec<InterfaceBinding>,
}

impl<T: Send + Sync + 'static> ExternalBuilder<T> {
    pub fn provides<I: ?Sized + Send + Sync + 'static>(
        mut self,
        cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    ) -> Self {
        self.interfaces.push(InterfaceBinding::new::<T, I>(cast));
        self
    }

    pub fn build(self) -> ExternalInstance {
        ExternalInstance {
            name: shorten_type_name(type_name::<T>()),
            object: self.value,
            interfaces: self.interfaces,
        }
    }
}

impl<T: Send + Sync + 'static> From<ExternalBuilder<T>> for ExternalInstance {
    fn from(builder: ExternalBuilder<T>) -> Self {
        builder.build()
    }
}
