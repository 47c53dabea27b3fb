//! # Type Identity
//!
//! `TypeKey` identifies a dependency shape during activation. `Instance` is a
//! resolved, type-erased value for one of those shapes.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of a type used as a resolution key.
///
/// Equality and hashing use the `TypeId` only; the name is carried for
/// error messages.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying `TypeId`.
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name with module paths stripped, including inside generics.
    ///
    /// `alloc::sync::Arc<app::plc::PlcLink>` becomes `Arc<PlcLink>`.
    #[must_use]
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }

    /// Whether this key identifies `T`.
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

/// Strip module paths from every segment of a type name.
#[must_use]
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();

    for ch in full.chars() {
        match ch {
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' => {
                out.push_str(last_path_segment(&segment));
                segment.clear();
                out.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    out.push_str(last_path_segment(&segment));
    out
}

fn last_path_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// A resolved dependency value.
///
/// Wraps the parameter value itself (for example `Arc<PlcLink>` or
/// `Arc<dyn Publisher>`), so a constructor downcasts to exactly the type it
/// declared.
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Instance {
    /// Erase `value`.
    pub fn new<P: Any + Send + Sync>(value: P) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<P>(),
        }
    }

    /// Clone the wrapped value out if it is a `P`.
    #[must_use]
    pub fn downcast<P: Any + Clone>(&self) -> Option<P> {
        self.value.downcast_ref::<P>().cloned()
    }

    /// Whether the wrapped value is a `P`.
    #[must_use]
    pub fn is<P: Any>(&self) -> bool {
        self.value.is::<P>()
    }

    /// Name of the wrapped type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", short_type_name(self.type_name))
    }
}
