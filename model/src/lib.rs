//! Declarative type models and generation config files for structural-type.
//!
//! This crate supplies the inputs of a generation run from files:
//!
//! - [`TypeModel`] is a YAML/JSON description of branch, scalar, primitive
//!   and enumeration types that implements
//!   [`Introspector`](structural_type_core::Introspector).
//! - [`validate_model`] reports structural problems of a model; loading
//!   rejects models it finds problems in.
//! - [`GenerationConfig`] names the roots of a run and every generator
//!   setting, and builds the configured
//!   [`Generator`](structural_type_core::Generator).
//!
//! # Quick start
//!
//! ```
//! use structural_type_core::{Cardinality, TypeName};
//! use structural_type_model::{GenerationConfig, TypeModel};
//!
//! let model = TypeModel::from_yaml_str(r#"
//! types:
//!   - name: v1.Point
//!     properties:
//!       - { name: x, type: int, required: true }
//!   - name: v2.Point
//!     properties:
//!       - { name: x, type: int, required: true }
//!       - { name: label, type: String }
//!   - name: int
//!     kind: primitive
//! "#).unwrap();
//!
//! let config = GenerationConfig::new("1.0", vec![
//!     TypeName::new("v1.Point"),
//!     TypeName::new("v2.Point"),
//! ]);
//! let generation = config.generate(&model).unwrap();
//! assert_eq!(generation.naming.structure(generation.root), Some("Point"));
//! let label = generation.compound.property(generation.root, "label").unwrap();
//! assert_eq!(label.cardinality, Cardinality::Optional);
//! ```

mod config;
mod error;
mod model;
mod validate;

pub use config::{ANY_TYPE, GenerationConfig};
pub use error::{ModelError, Result};
pub use model::{Container, PropertyDef, TypeDef, TypeKind, TypeModel};
pub use validate::{ValidationError, validate_model};
