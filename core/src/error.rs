//! Error types for schema resolution, merging and naming.
//!
//! Every failure is fatal for the current generation run: the engine never
//! produces a partially resolved graph.

use thiserror::Error;

use crate::TypeName;

/// Errors raised while building or naming structural schemas.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// A list-typed property does not declare exactly one element type.
    #[error("malformed property {ty}#{property}: {reason}")]
    MalformedProperty {
        /// Declaring type.
        ty: TypeName,
        /// Introspected property name.
        property: String,
        /// What is wrong with the declaration.
        reason: String,
    },

    /// A property uses a multi-valued container other than a list.
    #[error("only list containers are supported, {ty}#{property} is declared as {container}")]
    UnsupportedContainer {
        /// Declaring type.
        ty: TypeName,
        /// Introspected property name.
        property: String,
        /// The offending container kind.
        container: String,
    },

    /// Two constants of the same enumeration unify to the same name.
    #[error("duplicate name {name} for constants {first} and {second} of {ty}")]
    EnumCollision {
        /// The enumeration type.
        ty: TypeName,
        /// The unified name both constants map to.
        name: String,
        /// The constant that claimed the name first.
        first: String,
        /// The constant that collided.
        second: String,
    },

    /// Two unrelated branch schemas cannot be merged unambiguously.
    #[error("ambiguous merge of unrelated {left} and {right}: {detail}")]
    AmbiguousMerge {
        /// First branch type.
        left: TypeName,
        /// Second branch type.
        right: TypeName,
        /// Description of the conflict.
        detail: String,
    },

    /// A computed name was already reserved.
    #[error("name already in use: {0}")]
    NameCollision(String),

    /// A predefinition does not match the structure it pins.
    #[error("predefined structure {structure} mismatch: {reason}")]
    PredefinitionMismatch {
        /// The predefined structure name.
        structure: String,
        /// What the predefinition lacks or declares in excess.
        reason: String,
    },

    /// A compound position has no contributing schema.
    #[error("no contributing schema: {0}")]
    EmptyPosition(String),
}

/// Convenience alias for results with [`StructuralError`].
pub type Result<T> = std::result::Result<T, StructuralError>;
