//! Accessor kinds and their names for compound properties.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{Cardinality, CompoundSort, EXPANSION, TypeName};

/// An externally visible operation generated for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyGeneration {
    /// Reads the value.
    Getter,
    /// Reads the value together with the structure owning it.
    Owner,
    /// Reads an optional value, failing when absent.
    Assume,
    /// Replaces the value.
    Setter,
    /// Replaces the value if the current projection accepts it.
    Trial,
    /// Removes the value.
    Clear,
    /// Replaces the value and returns the structure.
    Fluent,
    /// Merges a nested structure into the current value.
    Merge,
    /// Creates a nested structure in place.
    Factory,
}

impl PropertyGeneration {
    /// Every accessor kind in declaration order.
    pub const ALL: [PropertyGeneration; 9] = [
        PropertyGeneration::Getter,
        PropertyGeneration::Owner,
        PropertyGeneration::Assume,
        PropertyGeneration::Setter,
        PropertyGeneration::Trial,
        PropertyGeneration::Clear,
        PropertyGeneration::Fluent,
        PropertyGeneration::Merge,
        PropertyGeneration::Factory,
    ];

    /// Returns the set of every accessor kind.
    pub fn all() -> BTreeSet<PropertyGeneration> {
        Self::ALL.into_iter().collect()
    }

    /// Decides whether this accessor exists for a property.
    ///
    /// `enabled` is the configured set of kinds, `child` the sort of the
    /// property's compound value.
    pub fn applies(
        self,
        enabled: &BTreeSet<PropertyGeneration>,
        property: &str,
        cardinality: Cardinality,
        child: CompoundSort,
    ) -> bool {
        use PropertyGeneration::*;

        let expansion = property == EXPANSION;
        let any = |kinds: &[PropertyGeneration]| kinds.iter().any(|kind| enabled.contains(kind));
        match self {
            Getter | Owner => enabled.contains(&self),
            Assume => enabled.contains(&self) && cardinality == Cardinality::Optional,
            Setter if expansion => false,
            Setter if child.is_leaf() => any(&[Setter, Trial, Clear, Fluent]),
            Setter => any(&[Setter, Trial, Fluent, Merge, Clear, Factory]),
            Merge | Factory => !expansion && !child.is_leaf() && enabled.contains(&self),
            Trial | Clear | Fluent => !expansion && enabled.contains(&self),
        }
    }
}

/// What a property's accessor operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyTarget<'t> {
    /// A typed leaf presented as its reconciled type.
    Type(&'t TypeName),
    /// A named structure (branch or enumeration).
    Structure(&'t str),
}

/// Names the accessors of compound properties.
pub trait PropertyStrategy {
    /// Returns the accessor name of `generation` for `property` of
    /// `structure`.
    fn accessor(
        &self,
        structure: &str,
        property: &str,
        target: PropertyTarget<'_>,
        cardinality: Cardinality,
        generation: PropertyGeneration,
    ) -> String;
}

/// Bean-style accessor names: a verb prefix followed by the capitalized
/// property name. The expansion property contributes no suffix.
///
/// # Examples
///
/// ```
/// use structural_type_core::{BeanPropertyStrategy, Cardinality, PropertyGeneration, PropertyStrategy, PropertyTarget, TypeName};
///
/// let string = TypeName::new("String");
/// let target = PropertyTarget::Type(&string);
/// let strategy = BeanPropertyStrategy;
/// assert_eq!(
///     strategy.accessor("Person", "name", target, Cardinality::Single, PropertyGeneration::Setter),
///     "setName"
/// );
/// assert_eq!(
///     strategy.accessor("Person", "", target, Cardinality::Optional, PropertyGeneration::Getter),
///     "get"
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct BeanPropertyStrategy;

impl BeanPropertyStrategy {
    fn prefix(generation: PropertyGeneration) -> &'static str {
        match generation {
            PropertyGeneration::Getter => "get",
            PropertyGeneration::Owner => "owner",
            PropertyGeneration::Assume => "assume",
            PropertyGeneration::Setter => "set",
            PropertyGeneration::Trial => "trySet",
            PropertyGeneration::Clear => "clear",
            PropertyGeneration::Fluent => "with",
            PropertyGeneration::Merge => "merge",
            PropertyGeneration::Factory => "create",
        }
    }
}

impl PropertyStrategy for BeanPropertyStrategy {
    fn accessor(
        &self,
        _structure: &str,
        property: &str,
        _target: PropertyTarget<'_>,
        _cardinality: Cardinality,
        generation: PropertyGeneration,
    ) -> String {
        let mut chars = property.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        format!("{}{capitalized}", Self::prefix(generation))
    }
}
