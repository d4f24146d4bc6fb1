//! Declarative type models.
//!
//! A [`TypeModel`] lists named [`TypeDef`]s and is the [`Introspector`]
//! consumed by the generator. Types that are referenced but never declared
//! are treated as opaque scalars.
//!
//! # Example YAML
//!
//! ```yaml
//! types:
//!   - name: crm.Customer
//!     kind: branch
//!     properties:
//!       - { name: id, type: String, required: true }
//!       - { name: tags, container: list, arguments: [String] }
//!       - { name: tier, type: crm.Tier }
//!   - name: crm.Tier
//!     kind: enumeration
//!     constants: [GOLD, SILVER]
//! ```

use std::collections::HashMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use structural_type_core::{DeclaredType, Introspector, TypeName};
use tracing::{debug, info};

use crate::error::{ModelError, Result};
use crate::validate_model;

/// How a declared type is treated by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// A structured type with properties.
    #[default]
    Branch,
    /// An opaque value type.
    Scalar,
    /// A value type that is never absent.
    Primitive,
    /// A closed set of constants.
    Enumeration,
}

/// Container a property value is held in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    /// A single value of `type`.
    #[default]
    Value,
    /// An ordered sequence of the single type argument.
    List,
    /// An unordered collection; not supported by the generator.
    Set,
    /// A keyed collection; not supported by the generator.
    Map,
}

impl Container {
    fn as_str(self) -> &'static str {
        match self {
            Container::Value => "value",
            Container::List => "list",
            Container::Set => "set",
            Container::Map => "map",
        }
    }
}

/// A property of a branch type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property name.
    pub name: String,
    /// Value type; unused for containers other than [`Container::Value`].
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeName>,
    /// Container kind.
    #[serde(default, skip_serializing_if = "is_value")]
    pub container: Container,
    /// Type arguments of the container.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<TypeName>,
    /// Whether the value is always present.
    #[serde(default)]
    pub required: bool,
}

fn is_value(container: &Container) -> bool {
    *container == Container::Value
}

impl PropertyDef {
    /// A required value property.
    pub fn required(name: impl Into<String>, ty: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty.into()),
            container: Container::Value,
            arguments: Vec::new(),
            required: true,
        }
    }

    /// An optional value property.
    pub fn optional(name: impl Into<String>, ty: impl Into<TypeName>) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// A list of `element`.
    pub fn list(name: impl Into<String>, element: impl Into<TypeName>) -> Self {
        Self::container(name, Container::List, [element.into()])
    }

    /// A property held in `container` with the given type arguments.
    pub fn container(
        name: impl Into<String>,
        container: Container,
        arguments: impl IntoIterator<Item = TypeName>,
    ) -> Self {
        Self {
            name: name.into(),
            ty: None,
            container,
            arguments: arguments.into_iter().collect(),
            required: false,
        }
    }
}

/// A named type of the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    /// Fully qualified type name.
    pub name: TypeName,
    /// Type kind.
    #[serde(default)]
    pub kind: TypeKind,
    /// Declared super type of a branch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<TypeName>,
    /// Declared sub types of a branch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtypes: Vec<TypeName>,
    /// Properties of a branch, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<PropertyDef>,
    /// Constants of an enumeration, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constants: Vec<String>,
}

impl TypeDef {
    fn new(name: impl Into<TypeName>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            extends: None,
            subtypes: Vec::new(),
            properties: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// A branch without properties.
    pub fn branch(name: impl Into<TypeName>) -> Self {
        Self::new(name, TypeKind::Branch)
    }

    /// An opaque scalar type.
    pub fn scalar(name: impl Into<TypeName>) -> Self {
        Self::new(name, TypeKind::Scalar)
    }

    /// A primitive type.
    pub fn primitive(name: impl Into<TypeName>) -> Self {
        Self::new(name, TypeKind::Primitive)
    }

    /// An enumeration of `constants`.
    pub fn enumeration<C: Into<String>>(
        name: impl Into<TypeName>,
        constants: impl IntoIterator<Item = C>,
    ) -> Self {
        Self {
            constants: constants.into_iter().map(Into::into).collect(),
            ..Self::new(name, TypeKind::Enumeration)
        }
    }

    /// Appends a property.
    pub fn with_property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    /// Sets the super type.
    pub fn extending(mut self, super_type: impl Into<TypeName>) -> Self {
        self.extends = Some(super_type.into());
        self
    }

    /// Appends a sub type.
    pub fn with_subtype(mut self, sub_type: impl Into<TypeName>) -> Self {
        self.subtypes.push(sub_type.into());
        self
    }
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    #[serde(default)]
    types: Vec<TypeDef>,
}

/// A set of type definitions with lookup by name.
///
/// # Examples
///
/// ```
/// use structural_type_core::{Introspector, TypeName};
/// use structural_type_model::{PropertyDef, TypeDef, TypeModel};
///
/// let model = TypeModel::new(vec![
///     TypeDef::branch("Person").with_property(PropertyDef::required("name", "String")),
/// ]);
/// assert!(model.is_branch(&TypeName::new("Person")));
/// assert!(!model.is_branch(&TypeName::new("String")));
/// assert_eq!(model.properties(&TypeName::new("Person")).len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ModelFile", into = "ModelFile")]
pub struct TypeModel {
    types: Vec<TypeDef>,
    index: HashMap<TypeName, usize>,
}

impl From<ModelFile> for TypeModel {
    fn from(file: ModelFile) -> Self {
        Self::new(file.types)
    }
}

impl From<TypeModel> for ModelFile {
    fn from(model: TypeModel) -> Self {
        Self { types: model.types }
    }
}

impl TypeModel {
    /// Creates a model; on duplicate names the first definition is looked up.
    pub fn new(types: Vec<TypeDef>) -> Self {
        let mut index = HashMap::new();
        for (position, ty) in types.iter().enumerate() {
            index.entry(ty.name.clone()).or_insert(position);
        }
        Self { types, index }
    }

    /// Parses and validates a YAML model.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::YamlError`] if parsing fails, or
    /// [`ModelError::InvalidModel`] if validation finds problems.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let model: TypeModel = serde_yaml::from_str(yaml)?;
        model.validated()
    }

    /// Parses and validates a JSON model.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::JsonError`] if parsing fails, or
    /// [`ModelError::InvalidModel`] if validation finds problems.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let model: TypeModel = serde_json::from_str(json)?;
        model.validated()
    }

    /// Loads and validates a model file. `.json` files are read as JSON,
    /// everything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IoError`] if the file cannot be read, a parse
    /// error, or [`ModelError::InvalidModel`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let model = Self::read(path)?;
        info!(path = %path.display(), types = model.len(), "Loaded type model");
        model.validated()
    }

    /// Loads every `*.json`, `*.yaml` and `*.yml` file of a directory into
    /// one model and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IoError`] if the directory or a file cannot be
    /// read, a parse error, or [`ModelError::InvalidModel`] (for example
    /// when two files declare the same type).
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            let extension = file_path.extension().and_then(|e| e.to_str());
            if matches!(extension, Some("json" | "yaml" | "yml")) {
                files.push(file_path);
            }
        }
        files.sort();

        let mut types = Vec::new();
        for file in &files {
            debug!(path = %file.display(), "Reading type model file");
            types.extend(Self::read(file)?.types);
        }
        let model = Self::new(types);
        info!(path = %path.display(), files = files.len(), types = model.len(), "Loaded type model directory");
        model.validated()
    }

    /// Saves the model as YAML, or JSON for `.json` paths.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IoError`] if the file cannot be written, or a
    /// serialization error.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let writer = BufWriter::new(std::fs::File::create(path)?);
        if is_json(path) {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_yaml::to_writer(writer, self)?;
        }
        Ok(())
    }

    /// Returns the definition of `name`.
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.index.get(name).map(|position| &self.types[*position])
    }

    /// Returns `true` if `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All definitions in declaration order.
    pub fn types(&self) -> &[TypeDef] {
        &self.types
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(std::fs::File::open(path)?);
        let model = if is_json(path) {
            serde_json::from_reader(reader)?
        } else {
            serde_yaml::from_reader(reader)?
        };
        Ok(model)
    }

    fn validated(self) -> Result<Self> {
        let errors = validate_model(&self);
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ModelError::InvalidModel(errors))
        }
    }

    fn kind(&self, ty: &TypeName) -> Option<TypeKind> {
        self.get(ty.as_str()).map(|def| def.kind)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

impl Introspector for TypeModel {
    type Property = PropertyDef;

    fn is_branch(&self, ty: &TypeName) -> bool {
        self.kind(ty) == Some(TypeKind::Branch)
    }

    fn is_primitive(&self, ty: &TypeName) -> bool {
        self.kind(ty) == Some(TypeKind::Primitive)
    }

    fn enum_constants(&self, ty: &TypeName) -> Option<Vec<String>> {
        self.get(ty.as_str())
            .filter(|def| def.kind == TypeKind::Enumeration)
            .map(|def| def.constants.clone())
    }

    fn properties(&self, ty: &TypeName) -> Vec<PropertyDef> {
        self.get(ty.as_str())
            .filter(|def| def.kind == TypeKind::Branch)
            .map(|def| def.properties.clone())
            .unwrap_or_default()
    }

    fn name(&self, property: &PropertyDef) -> String {
        property.name.clone()
    }

    fn declared_type(&self, property: &PropertyDef) -> DeclaredType {
        match property.container {
            Container::Value => DeclaredType::Value(
                property
                    .ty
                    .clone()
                    .unwrap_or_else(|| TypeName::new("Object")),
            ),
            Container::List => DeclaredType::List,
            other => DeclaredType::Container(other.as_str().to_string()),
        }
    }

    fn element_types(&self, property: &PropertyDef) -> Vec<TypeName> {
        property.arguments.clone()
    }

    fn is_required(&self, property: &PropertyDef) -> bool {
        property.required
    }

    fn super_type(&self, ty: &TypeName) -> Option<TypeName> {
        self.get(ty.as_str()).and_then(|def| def.extends.clone())
    }

    fn sub_types(&self, ty: &TypeName) -> Vec<TypeName> {
        self.get(ty.as_str())
            .map(|def| def.subtypes.clone())
            .unwrap_or_default()
    }
}
