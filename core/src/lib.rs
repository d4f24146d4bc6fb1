//! Schema resolution and merge engine for compound structural types.
//!
//! This crate fuses several independently defined, possibly recursive type
//! descriptions into one merged schema:
//!
//! - [`SchemaResolver`] builds a [`SingularGraph`] per run from any
//!   [`Introspector`], cycle-safe and memoized by type.
//! - [`Cardinality`] is the single/optional/list lattice used to combine
//!   property multiplicities.
//! - [`Pipeline`] chains [`Normalizer`] stages that rewrite the schemas
//!   occupying one position before they are merged.
//! - [`CompoundMerger`] folds singular schemas into a [`CompoundGraph`],
//!   memoized by contributor set.
//! - [`NameResolver`] assigns structure, template, projection and accessor
//!   names, honoring [`Predefinition`]s.
//!
//! [`Generator`] wires the stages together with default collaborators.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use structural_type_core::*;
//!
//! // type name -> [(property, element type, required)]
//! struct Model(HashMap<&'static str, Vec<(&'static str, &'static str, bool)>>);
//!
//! impl Introspector for Model {
//!     type Property = (&'static str, &'static str, bool);
//!
//!     fn is_branch(&self, ty: &TypeName) -> bool {
//!         self.0.contains_key(ty.as_str())
//!     }
//!     fn is_primitive(&self, _: &TypeName) -> bool {
//!         false
//!     }
//!     fn enum_constants(&self, _: &TypeName) -> Option<Vec<String>> {
//!         None
//!     }
//!     fn properties(&self, ty: &TypeName) -> Vec<Self::Property> {
//!         self.0.get(ty.as_str()).cloned().unwrap_or_default()
//!     }
//!     fn name(&self, property: &Self::Property) -> String {
//!         property.0.to_string()
//!     }
//!     fn declared_type(&self, property: &Self::Property) -> DeclaredType {
//!         DeclaredType::Value(TypeName::new(property.1))
//!     }
//!     fn element_types(&self, _: &Self::Property) -> Vec<TypeName> {
//!         Vec::new()
//!     }
//!     fn is_required(&self, property: &Self::Property) -> bool {
//!         property.2
//!     }
//!     fn super_type(&self, _: &TypeName) -> Option<TypeName> {
//!         None
//!     }
//!     fn sub_types(&self, _: &TypeName) -> Vec<TypeName> {
//!         Vec::new()
//!     }
//! }
//!
//! let model = Model(HashMap::from([
//!     ("crm.Customer", vec![("name", "String", true), ("email", "String", true)]),
//!     ("shop.Customer", vec![("name", "String", true)]),
//! ]));
//! let roots = [TypeName::new("crm.Customer"), TypeName::new("shop.Customer")];
//! let generation = Generator::new().generate(&model, &roots).unwrap();
//!
//! let customer = generation.root;
//! assert_eq!(generation.naming.structure(customer), Some("Customer"));
//! let email = generation.compound.property(customer, "email").unwrap();
//! assert_eq!(email.cardinality, Cardinality::Optional);
//! assert_eq!(
//!     generation.naming.accessor(customer, "email", PropertyGeneration::Getter),
//!     Some("getEmail")
//! );
//! ```

mod cardinality;
mod compound;
mod config;
mod error;
mod identity;
mod introspect;
mod naming;
mod normalize;
mod property;
mod singular;

#[cfg(test)]
mod testing;

pub use cardinality::{Cardinality, Storage};
pub use compound::{
    CommonTypeReconciler, CompoundGraph, CompoundId, CompoundMerger, CompoundNode,
    CompoundProperty, CompoundSort, EXPANSION, EnumConstants, TypeReconciler, merge_singulars,
};
pub use config::{Generation, Generator, GeneratorOptions};
pub use error::{Result, StructuralError};
pub use identity::{AccessorTable, Implementation, NameResolver, Naming, Predefinition};
pub use introspect::{DeclaredType, Introspector, TypeName};
pub use naming::{DecoratingNamingStrategy, NamingStrategy, Reserved, SimpleNamingStrategy};
pub use normalize::{
    DefaultNormalizer, EnumNamer, EnumeratingNormalizer, IntersectingNormalizer, KeyNormalizer,
    KeyResolver, Normalizer, Pipeline, SiblingPolicy,
};
pub use property::{BeanPropertyStrategy, PropertyGeneration, PropertyStrategy, PropertyTarget};
pub use singular::{
    AliasResolver, LeafKind, PropertyFilter, SchemaResolver, SingularBranch, SingularGraph,
    SingularId, SingularLeaf, SingularNode, SingularProperty,
};
