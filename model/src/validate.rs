//! Type model validation.
//!
//! Catches structural problems such as duplicate type names, dangling
//! inheritance edges and empty enumerations before a model reaches the
//! generator.
//!
//! # Examples
//!
//! ```
//! use structural_type_model::*;
//!
//! let model = TypeModel::new(vec![TypeDef::branch("Circle").extending("Shape")]);
//! let errors = validate_model(&model);
//! assert_eq!(errors, vec![ValidationError::UnknownSuperType {
//!     ty: "Circle".into(),
//!     super_type: "Shape".into(),
//! }]);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{Container, TypeKind, TypeModel};

/// Type model validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A type name is empty or whitespace-only.
    #[error("type name cannot be empty")]
    EmptyTypeName,
    /// Two definitions share a type name.
    #[error("duplicate type: {0}")]
    DuplicateType(String),
    /// A branch extends a type that is not a declared branch.
    #[error("{ty} extends unknown branch {super_type}")]
    UnknownSuperType {
        /// The extending type.
        ty: String,
        /// The missing super type.
        super_type: String,
    },
    /// A branch lists a sub type that is not a declared branch.
    #[error("{ty} lists unknown sub type {sub_type}")]
    UnknownSubType {
        /// The declaring type.
        ty: String,
        /// The missing sub type.
        sub_type: String,
    },
    /// A type names itself as its super type.
    #[error("{0} extends itself")]
    SelfSupertype(String),
    /// An enumeration declares no constants.
    #[error("enumeration {0} declares no constants")]
    EmptyEnumeration(String),
    /// A value property has no type.
    #[error("property {ty}#{property} declares no type")]
    MissingPropertyType {
        /// Declaring type.
        ty: String,
        /// Property name.
        property: String,
    },
}

/// Validates a type model.
///
/// Checks for empty and duplicate type names, inheritance edges to
/// undeclared branches, self inheritance, empty enumerations, and value
/// properties without a type. Container shapes are left to the generator,
/// which reports them with the offending property.
pub fn validate_model(model: &TypeModel) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let is_branch = |name: &str| {
        model
            .get(name)
            .is_some_and(|def| def.kind == TypeKind::Branch)
    };

    let mut seen: HashSet<&str> = HashSet::new();
    for def in model.types() {
        let name = def.name.as_str();
        if name.trim().is_empty() {
            errors.push(ValidationError::EmptyTypeName);
            continue;
        }
        if !seen.insert(name) {
            errors.push(ValidationError::DuplicateType(name.to_string()));
            continue;
        }

        if let Some(super_type) = &def.extends {
            if super_type == &def.name {
                errors.push(ValidationError::SelfSupertype(name.to_string()));
            } else if !is_branch(super_type.as_str()) {
                errors.push(ValidationError::UnknownSuperType {
                    ty: name.to_string(),
                    super_type: super_type.to_string(),
                });
            }
        }
        for sub_type in &def.subtypes {
            if !is_branch(sub_type.as_str()) {
                errors.push(ValidationError::UnknownSubType {
                    ty: name.to_string(),
                    sub_type: sub_type.to_string(),
                });
            }
        }

        if def.kind == TypeKind::Enumeration && def.constants.is_empty() {
            errors.push(ValidationError::EmptyEnumeration(name.to_string()));
        }
        for property in &def.properties {
            if property.container == Container::Value && property.ty.is_none() {
                errors.push(ValidationError::MissingPropertyType {
                    ty: name.to_string(),
                    property: property.name.clone(),
                });
            }
        }
    }

    errors
}
