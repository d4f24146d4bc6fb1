//! Cardinality lattice for structural properties.
//!
//! A property holds exactly one value ([`Cardinality::Single`]), at most one
//! value ([`Cardinality::Optional`]) or an ordered sequence of values
//! ([`Cardinality::List`]). Merging two cardinalities yields the least
//! cardinality able to hold values of both:
//!
//! | ⊔          | Single   | Optional | List |
//! |------------|----------|----------|------|
//! | `Single`   | Single   | Optional | List |
//! | `Optional` | Optional | Optional | List |
//! | `List`     | List     | List     | List |
//!
//! # Examples
//!
//! ```
//! use structural_type_core::Cardinality;
//!
//! assert_eq!(Cardinality::Single.merge(Cardinality::Optional), Cardinality::Optional);
//! assert_eq!(Cardinality::Optional.merge(Cardinality::List), Cardinality::List);
//! ```

use serde::{Deserialize, Serialize};

/// How many values a property may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// Exactly one value.
    Single,
    /// Zero or one value.
    Optional,
    /// Zero or more values in order.
    List,
}

impl Cardinality {
    /// Joins two cardinalities.
    ///
    /// The operation is commutative, associative and idempotent; `List`
    /// absorbs every other cardinality.
    pub fn merge(self, other: Cardinality) -> Cardinality {
        match (self, other) {
            (Cardinality::List, _) | (_, Cardinality::List) => Cardinality::List,
            (Cardinality::Optional, _) | (_, Cardinality::Optional) => Cardinality::Optional,
            (Cardinality::Single, Cardinality::Single) => Cardinality::Single,
        }
    }

    /// Describes the storage shape used to present a value of type `ty` with
    /// this cardinality.
    ///
    /// The merge engine never consults this; it exists for emission
    /// backends deciding between a plain value, an optional wrapper and an
    /// ordered sequence.
    ///
    /// # Examples
    ///
    /// ```
    /// use structural_type_core::{Cardinality, Storage};
    ///
    /// assert_eq!(Cardinality::List.widen("String"), Storage::Sequence("String"));
    /// assert_eq!(Cardinality::Optional.widen(42).into_inner(), 42);
    /// ```
    pub fn widen<T>(self, ty: T) -> Storage<T> {
        match self {
            Cardinality::Single => Storage::Plain(ty),
            Cardinality::Optional => Storage::Optional(ty),
            Cardinality::List => Storage::Sequence(ty),
        }
    }

    /// Returns `true` for [`Cardinality::List`].
    pub fn is_list(self) -> bool {
        self == Cardinality::List
    }
}

/// Container shape a property's value is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Storage<T> {
    /// The value itself.
    Plain(T),
    /// An optional wrapper around the value.
    Optional(T),
    /// An ordered sequence of values.
    Sequence(T),
}

impl<T> Storage<T> {
    /// Returns the wrapped element type.
    pub fn into_inner(self) -> T {
        match self {
            Storage::Plain(ty) | Storage::Optional(ty) | Storage::Sequence(ty) => ty,
        }
    }

    /// Returns the wrapped element type by reference.
    pub fn inner(&self) -> &T {
        match self {
            Storage::Plain(ty) | Storage::Optional(ty) | Storage::Sequence(ty) => ty,
        }
    }
}
