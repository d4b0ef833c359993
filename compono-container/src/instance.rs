//! Component instances: constructor selection and object construction.
//!
//! A [`ComponentInstance`] is the per-(container, descriptor) record. It
//! chooses the optimal constructor, resolves its arguments through the
//! container and hands the actual build to its lifecycle strategy.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::container::{ContainerCore, ContainerId};
use crate::descriptor::{Argument, Arguments, ComponentDescriptor, Constructor, Object, Parameter};
use crate::error::{
    CompositionError, ConstructorDiagnostic, NoViableConstructorError, ParameterFailure, Result,
};
use crate::lifecycle::{Lifecycle, LifetimeRegistry, lifecycle_for};

/// Per-container record driving one descriptor's object.
pub(crate) struct ComponentInstance {
    descriptor: Arc<ComponentDescriptor>,
    lifecycle: Box<dyn Lifecycle>,
}

impl ComponentInstance {
    pub fn new(descriptor: Arc<ComponentDescriptor>, registry: &Arc<LifetimeRegistry>) -> Self {
        let lifecycle = lifecycle_for(&descriptor, registry);
        Self { descriptor, lifecycle }
    }

    pub fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    pub fn current_object(&self) -> Option<Object> {
        self.lifecycle.current_object()
    }

    /// Returns the object, constructing it through the lifecycle on first use.
    ///
    /// For Shared and Singleton scopes the result may be an object another
    /// container published first, not the one built here.
    pub fn create_instance(&self, container: &ContainerCore) -> Result<Object> {
        self.lifecycle.create(container.id(), &|| self.construct(container))
    }

    pub fn release(&self, container: ContainerId) -> Result<bool> {
        self.lifecycle.release(container)
    }

    fn construct(&self, container: &ContainerCore) -> Result<Object> {
        let constructor = select_constructor(&self.descriptor, container)?;
        let mut arguments = self.build_arguments(constructor, container)?;

        debug!(
            component = self.descriptor.name(),
            scope = %self.descriptor.scope(),
            parameters = constructor.parameters().len(),
            "Constructing component"
        );
        constructor.invoke(&mut arguments)
    }

    fn build_arguments(&self, constructor: &Constructor, container: &ContainerCore) -> Result<Arguments> {
        let mut slots = Vec::with_capacity(constructor.parameters().len());

        for &parameter in constructor.parameters() {
            let argument = match parameter {
                Parameter::Component(key) => {
                    let view = container
                        .resolve_one_view(&key)
                        .map_err(|err| self.required_by(err))?;
                    Argument::Component(view)
                }
                Parameter::Components(key) => {
                    Argument::Components(container.resolve_all_views(&key)?)
                }
                Parameter::Repository => Argument::Repository(
                    self.descriptor
                        .private_repository()
                        .cloned()
                        .unwrap_or_else(|| container.repository()),
                ),
                Parameter::Container => Argument::Container(container.handle()),
                Parameter::Config(key) => {
                    let config = self
                        .descriptor
                        .config()
                        .filter(|config| config.key == key)
                        .ok_or_else(|| CompositionError::InterfaceMismatch {
                            component: self.descriptor.name().to_string(),
                            interface: key,
                        })?;
                    Argument::Config(Arc::clone(&config.value))
                }
            };
            slots.push((parameter, argument));
        }

        Ok(Arguments::new(self.descriptor.name(), slots))
    }

    fn required_by(&self, err: CompositionError) -> CompositionError {
        match err {
            CompositionError::NotFound(mut not_found) if not_found.required_by.is_none() => {
                not_found.required_by = Some(self.descriptor.name().to_string());
                CompositionError::NotFound(not_found)
            }
            other => other,
        }
    }
}

/// Picks the feasible constructor with the most parameters.
///
/// Feasibility is decided without side effects: only `can_resolve` is asked
/// of the container. Ties go to the constructor declared first.
pub(crate) fn select_constructor<'d>(
    descriptor: &'d ComponentDescriptor,
    container: &ContainerCore,
) -> Result<&'d Constructor> {
    let mut best: Option<&Constructor> = None;
    let mut diagnostics = Vec::new();

    for (index, constructor) in descriptor.constructors().iter().enumerate() {
        let failures = parameter_failures(descriptor, constructor, container);

        if failures.is_empty() {
            if best.is_none_or(|b| constructor.parameters().len() > b.parameters().len()) {
                best = Some(constructor);
            }
        } else {
            diagnostics.push(ConstructorDiagnostic {
                index,
                parameters: constructor.parameters().iter().map(|p| p.to_string()).collect(),
                failures,
            });
        }
    }

    match best {
        Some(constructor) => {
            trace!(
                component = descriptor.name(),
                parameters = constructor.parameters().len(),
                "Selected constructor"
            );
            Ok(constructor)
        }
        None => Err(CompositionError::NoViableConstructor(NoViableConstructorError {
            component: descriptor.name().to_string(),
            diagnostics,
        })),
    }
}

fn parameter_failures(
    descriptor: &ComponentDescriptor,
    constructor: &Constructor,
    container: &ContainerCore,
) -> Vec<ParameterFailure> {
    constructor
        .parameters()
        .iter()
        .enumerate()
        .filter_map(|(position, parameter)| {
            let reason = match parameter {
                Parameter::Component(key) if !container.can_resolve_key(key) => {
                    if container.is_component_interface(key) {
                        "no component or external instance provides it".to_string()
                    } else {
                        "not a registered component interface".to_string()
                    }
                }
                Parameter::Config(key) => match descriptor.config_type() {
                    None => "descriptor has no configuration value".to_string(),
                    Some(actual) if actual != *key => {
                        format!("configuration value is {actual}, not {key}")
                    }
                    Some(_) => return None,
                },
                _ => return None,
            };
            Some(ParameterFailure {
                position,
                parameter: parameter.to_string(),
                reason,
            })
        })
        .collect()
}
