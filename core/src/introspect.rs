//! The introspection capability consumed by schema resolution.
//!
//! The engine never inspects concrete type metadata itself. An
//! [`Introspector`] maps a nominal [`TypeName`] to its classification,
//! properties and inheritance edges; anything able to answer these queries
//! (a reflection layer, a parsed IDL, a declarative model) can feed the
//! resolver.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Nominal identity of an input type.
///
/// Two schemas over the same `TypeName` are the same schema. Names are
/// typically fully qualified (`billing.Invoice`); the last `.` or `::`
/// separated segment is the [simple name](TypeName::simple_name).
///
/// # Examples
///
/// ```
/// use structural_type_core::TypeName;
///
/// let ty = TypeName::new("billing.v2.Invoice");
/// assert_eq!(ty.simple_name(), "Invoice");
/// assert_eq!(ty.namespace(), Some("billing.v2"));
/// assert_eq!(TypeName::new("core::Money").simple_name(), "Money");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Creates a type name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the full name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the last path segment.
    pub fn simple_name(&self) -> &str {
        match self.split() {
            Some((_, simple)) => simple,
            None => &self.0,
        }
    }

    /// Returns everything before the last path segment, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.split().map(|(namespace, _)| namespace)
    }

    fn split(&self) -> Option<(&str, &str)> {
        let dot = self.0.rfind('.').map(|at| (at, 1));
        let path = self.0.rfind("::").map(|at| (at, 2));
        let (at, width) = match (dot, path) {
            (Some(d), Some(p)) => d.max(p),
            (Some(d), None) => d,
            (None, Some(p)) => p,
            (None, None) => return None,
        };
        Some((&self.0[..at], &self.0[at + width..]))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Declared container shape of a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredType {
    /// A single value of the given type.
    Value(TypeName),
    /// A homogeneous list; the element type is reported by
    /// [`Introspector::element_types`].
    List,
    /// Any other multi-valued container (set, map, ...), named by kind.
    Container(String),
}

/// Queries the schema resolver issues against an input type system.
///
/// `Property` is whatever handle the backend uses for a declared property;
/// the resolver only passes it back into the property queries.
pub trait Introspector {
    /// Backend handle for one declared property.
    type Property;

    /// Returns `true` if `ty` is a structured type with properties.
    fn is_branch(&self, ty: &TypeName) -> bool;

    /// Returns `true` if `ty` is a primitive that can never be absent.
    fn is_primitive(&self, ty: &TypeName) -> bool;

    /// Returns the constants of `ty` in declaration order if it is an
    /// enumeration, `None` otherwise.
    fn enum_constants(&self, ty: &TypeName) -> Option<Vec<String>>;

    /// Returns the properties of a branch type in declaration order.
    fn properties(&self, ty: &TypeName) -> Vec<Self::Property>;

    /// Returns the declared name of a property.
    fn name(&self, property: &Self::Property) -> String;

    /// Returns the declared container shape of a property.
    fn declared_type(&self, property: &Self::Property) -> DeclaredType;

    /// Returns the generic type arguments of a list-typed property.
    fn element_types(&self, property: &Self::Property) -> Vec<TypeName>;

    /// Returns `true` if the property must always be present.
    fn is_required(&self, property: &Self::Property) -> bool;

    /// Returns the branch supertype of `ty`, if any.
    fn super_type(&self, ty: &TypeName) -> Option<TypeName>;

    /// Returns the known branch subtypes of `ty`.
    fn sub_types(&self, ty: &TypeName) -> Vec<TypeName>;
}
