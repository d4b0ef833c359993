//! Interface and implementation identification keys.
//!
//! [`DependencyKey`] identifies a type inside the container: either a
//! component interface (usually a `dyn Trait`) or a concrete implementation
//! type. It pairs the [`TypeId`] with the type name for diagnostics.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use compono_support::rendering::shorten_type_name;

/// Uniquely identifies a type known to the container.
///
/// # Examples
/// ```
/// use compono_container::key::DependencyKey;
///
/// trait Logger {}
///
/// let key = DependencyKey::of::<dyn Logger>();
/// assert!(key.type_name().ends_with("Logger"));
/// assert_eq!(key.short_name(), "dyn Logger");
/// ```
#[derive(Clone, Copy)]
pub struct DependencyKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl DependencyKey {
    /// Creates a key for type `T`. Unsized types such as `dyn Trait` are
    /// accepted, which is how component interfaces are keyed.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Returns the [`TypeId`] of the keyed type.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name with module paths stripped.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }
}

impl PartialEq for DependencyKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DependencyKey({})", self.type_name)
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}
