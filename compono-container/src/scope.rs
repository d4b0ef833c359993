//! Component lifetime scopes.
//!
//! A descriptor's scope decides who owns the object it builds:
//! - [`Scope::Simple`] — one object per container
//! - [`Scope::Shared`] — one object per descriptor, shared by every container
//!   that resolves it
//! - [`Scope::Singleton`] — one object per implementation type, shared by
//!   every descriptor and container that maps to that type
//!
//! # Ordering
//! Scopes are ordered by reach: `Singleton > Shared > Simple`.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Defines how far the object built for a descriptor is shared.
///
/// # Examples
/// ```
/// use compono_container::scope::Scope;
///
/// assert!(Scope::Singleton > Scope::Shared);
/// assert!(Scope::Shared > Scope::Simple);
/// assert!(!Scope::Simple.is_cross_container());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Lives exactly as long as the container that built it.
    ///
    /// Disposed as soon as its container is disposed.
    #[default]
    Simple,

    /// Shared across containers resolving the same descriptor.
    ///
    /// Reference counted by container; disposed when the last
    /// referencing container releases it.
    Shared,

    /// Shared across the whole lifetime registry, keyed by the concrete
    /// implementation type rather than the descriptor.
    Singleton,
}

impl Scope {
    /// Returns `true` if objects of this scope outlive a single container.
    #[inline]
    pub fn is_cross_container(&self) -> bool {
        matches!(self, Scope::Shared | Scope::Singleton)
    }

    #[inline]
    fn reach(&self) -> u8 {
        match self {
            Scope::Singleton => 2,
            Scope::Shared => 1,
            Scope::Simple => 0,
        }
    }
}

impl PartialOrd for Scope {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scope {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.reach().cmp(&other.reach())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Simple => write!(f, "Simple"),
            Scope::Shared => write!(f, "Shared"),
            Scope::Singleton => write!(f, "Singleton"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_ordering() {
        assert!(Scope::Singleton > Scope::Shared);
        assert!(Scope::Shared > Scope::Simple);
        assert!(Scope::Singleton > Scope::Simple);
    }

    #[test]
    fn cross_container_scopes() {
        assert!(Scope::Shared.is_cross_container());
        assert!(Scope::Singleton.is_cross_container());
        assert!(!Scope::Simple.is_cross_container());
    }

    #[test]
    fn default_is_simple() {
        assert_eq!(Scope::default(), Scope::Simple);
    }

    #[test]
    fn scope_display() {
        assert_eq!(format!("{}", Scope::Simple), "Simple");
        assert_eq!(format!("{}", Scope::Shared), "Shared");
        assert_eq!(format!("{}", Scope::Singleton), "Singleton");
    }

    #[test]
    fn scope_from_settings() {
        let scope: Scope = serde_json::from_str("\"shared\"").unwrap();
        assert_eq!(scope, Scope::Shared);
        assert_eq!(serde_json::to_string(&Scope::Singleton).unwrap(), "\"singleton\"");
    }
}
