//! Construction plans: what a resolution is going to build.
//!
//! A [`ConstructionPlan`] is computed by walking the dependency graph the
//! same way resolution would, but without constructing anything. Its steps
//! are ordered dependencies-first, so executing them one by one builds every
//! component only after everything it needs already exists.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::container::ContainerCore;
use crate::descriptor::{ComponentDescriptor, Constructor, DescriptorId, Parameter};
use crate::error::{CircularDependencyError, CompositionError, Result};
use crate::instance::select_constructor;
use crate::key::DependencyKey;
use crate::scope::Scope;

/// One component construction.
#[derive(Debug, Clone)]
pub struct PlanStep {
    descriptor: Arc<ComponentDescriptor>,
}

impl PlanStep {
    pub fn descriptor(&self) -> &Arc<ComponentDescriptor> {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }
}

/// The ordered constructions a single resolution call performs.
#[derive(Debug, Clone, Default)]
pub struct ConstructionPlan {
    steps: Vec<PlanStep>,
}

impl ConstructionPlan {
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Number of components the resolution will construct.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(PlanStep::name).collect()
    }
}

/// Walks the graph below one interface and records pending constructions.
pub(crate) struct Planner<'c> {
    container: &'c ContainerCore,
    visiting: Vec<Arc<ComponentDescriptor>>,
    planned: HashSet<DescriptorId>,
    planned_singletons: HashSet<TypeId>,
    steps: Vec<PlanStep>,
}

impl<'c> Planner<'c> {
    pub fn new(container: &'c ContainerCore) -> Self {
        Self {
            container,
            visiting: Vec::new(),
            planned: HashSet::new(),
            planned_singletons: HashSet::new(),
            steps: Vec::new(),
        }
    }

    /// Plans a single-result resolution; cardinality errors surface here.
    pub fn plan_one(&mut self, interface: &DependencyKey) -> Result<()> {
        let externals = self.container.external_names(interface);
        let descriptors = self.container.repository().find_descriptors(interface);

        match externals.len() + descriptors.len() {
            0 => Err(self.container.not_found(interface)),
            1 => match descriptors.first() {
                Some(descriptor) => self.visit(descriptor),
                None => Ok(()),
            },
            _ => Err(self.container.ambiguous(interface, externals, &descriptors)),
        }
    }

    pub fn plan_all(&mut self, interface: &DependencyKey) -> Result<()> {
        for descriptor in self.container.repository().find_descriptors(interface) {
            self.visit(&descriptor)?;
        }
        Ok(())
    }

    pub fn finish(self) -> ConstructionPlan {
        debug!(
            steps = self.steps.len(),
            "Construction plan ready"
        );
        ConstructionPlan { steps: self.steps }
    }

    fn visit(&mut self, descriptor: &Arc<ComponentDescriptor>) -> Result<()> {
        if self.planned.contains(&descriptor.id())
            || (descriptor.scope() == Scope::Singleton
                && self.planned_singletons.contains(&descriptor.implementation_type()))
            || self.container.is_materialized(descriptor)
        {
            return Ok(());
        }

        if let Some(start) = self.visiting.iter().position(|d| d.id() == descriptor.id()) {
            let mut chain: Vec<String> = self.visiting[start..]
                .iter()
                .map(|d| d.name().to_string())
                .collect();
            chain.push(descriptor.name().to_string());
            return Err(CompositionError::CircularDependency(CircularDependencyError { chain }));
        }

        let constructor = select_constructor(descriptor, self.container)?;

        self.visiting.push(Arc::clone(descriptor));
        let planned = self.visit_parameters(constructor);
        self.visiting.pop();
        planned?;

        self.planned.insert(descriptor.id());
        if descriptor.scope() == Scope::Singleton {
            self.planned_singletons.insert(descriptor.implementation_type());
        }
        self.steps.push(PlanStep {
            descriptor: Arc::clone(descriptor),
        });
        Ok(())
    }

    fn visit_parameters(&mut self, constructor: &Constructor) -> Result<()> {
        for parameter in constructor.parameters() {
            match parameter {
                Parameter::Component(key) => self.plan_one(key)?,
                Parameter::Components(key) => self.plan_all(key)?,
                Parameter::Repository | Parameter::Container | Parameter::Config(_) => {}
            }
        }
        Ok(())
    }
}
