//! Error types for Compono container operations.
//!
//! Every resolution failure carries enough context to find the faulty
//! registration without a debugger: the requested interface, every
//! candidate, the construction chain, or per-constructor diagnostics.

use std::fmt;

use compono_support::rendering::{render_bullets, render_chain, render_signature};

use crate::key::DependencyKey;

/// Main error type for all Compono operations.
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    /// No external instance and no descriptor provides the interface.
    #[error("{}", .0)]
    NotFound(NotFoundError),

    /// More than one candidate for a single-result resolution.
    #[error("{}", .0)]
    Ambiguous(AmbiguousError),

    /// None of the component's constructors can be satisfied.
    #[error("{}", .0)]
    NoViableConstructor(NoViableConstructorError),

    /// A component was requested again while it was being constructed.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A built object cannot be viewed as the interface it was resolved for.
    ///
    /// Points at a broken descriptor registration.
    #[error("Component {component} cannot be viewed as {interface}")]
    InterfaceMismatch {
        component: String,
        interface: DependencyKey,
    },

    /// The container has been disposed.
    #[error("Container is already disposed")]
    AlreadyDisposed,

    /// A container released an object it never referenced.
    #[error("Container #{container} does not reference component {component}")]
    NotReferenced { component: String, container: u64 },

    /// A constructor asked for an argument its signature never declared.
    #[error("Constructor of {component} has no {parameter} parameter left to take")]
    ArgumentNotDeclared { component: String, parameter: String },

    /// A constructor returned an error.
    #[error("Failed to construct {component}: {source}")]
    ConstructionFailed {
        component: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CompositionError {
    /// Wraps an arbitrary error raised while building `component`.
    pub fn construction_failed(
        component: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        CompositionError::ConstructionFailed {
            component: component.into(),
            source: source.into(),
        }
    }

    /// Returns `true` for errors a caller can reasonably handle at runtime.
    ///
    /// `InterfaceMismatch`, `NotReferenced` and `ArgumentNotDeclared` point at
    /// defects in registration code and are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            CompositionError::InterfaceMismatch { .. }
                | CompositionError::NotReferenced { .. }
                | CompositionError::ArgumentNotDeclared { .. }
        )
    }
}

/// Error when nothing provides a requested interface.
#[derive(Debug)]
pub struct NotFoundError {
    /// The interface that was requested
    pub requested: DependencyKey,
    /// The component whose constructor needed it (if any)
    pub required_by: Option<String>,
    /// Similar interfaces that ARE registered
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No component provides {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:{}", render_bullets(&self.suggestions, 4))?;
        }

        write!(
            f,
            "\n  Hint: register a descriptor that provides {} or pass an external instance",
            self.requested
        )
    }
}

/// Error when a single-result resolution finds several candidates.
#[derive(Debug)]
pub struct AmbiguousError {
    pub requested: DependencyKey,
    /// Implementation names of every candidate, external instances first.
    pub candidates: Vec<String>,
}

impl fmt::Display for AmbiguousError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} components provide {}:{}",
            self.candidates.len(),
            self.requested,
            render_bullets(&self.candidates, 4),
        )?;
        write!(f, "\n  Hint: use resolve_all() or remove all but one registration")
    }
}

/// Why one parameter of a constructor cannot be supplied.
#[derive(Debug, Clone)]
pub struct ParameterFailure {
    /// Zero-based parameter position
    pub position: usize,
    /// Rendered parameter type
    pub parameter: String,
    pub reason: String,
}

/// Feasibility report for one constructor.
#[derive(Debug, Clone)]
pub struct ConstructorDiagnostic {
    /// Zero-based declaration index
    pub index: usize,
    /// Rendered parameter types
    pub parameters: Vec<String>,
    pub failures: Vec<ParameterFailure>,
}

impl fmt::Display for ConstructorDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constructor #{} {}", self.index, render_signature(&self.parameters))?;
        for failure in &self.failures {
            write!(
                f,
                "\n      - parameter {} ({}): {}",
                failure.position, failure.parameter, failure.reason
            )?;
        }
        Ok(())
    }
}

/// Error when a component has no satisfiable constructor.
#[derive(Debug)]
pub struct NoViableConstructorError {
    pub component: String,
    /// One entry per declared constructor
    pub diagnostics: Vec<ConstructorDiagnostic>,
}

impl fmt::Display for NoViableConstructorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "No viable constructor for {}", self.component)?;

        if self.diagnostics.is_empty() {
            return write!(
                f,
                "\n  Hint: the descriptor declares no constructor; add one with .constructor()"
            );
        }

        for diagnostic in &self.diagnostics {
            write!(f, "\n  {diagnostic}")?;
        }
        Ok(())
    }
}

/// Error when a component is re-entered during its own construction.
///
/// Shows the full chain so you can see WHERE the cycle closes.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Component names, first and last being the same component.
    /// Example: ["A", "B", "A"]
    pub chain: Vec<String>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: break the cycle with a back reference (.back_reference()) on one side"
        )
    }
}

/// Convenient Result type for Compono operations.
pub type Result<T> = std::result::Result<T, CompositionError>;
