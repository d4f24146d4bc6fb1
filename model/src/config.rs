//! Generation config files.
//!
//! Defines the YAML-serializable configuration naming the root types of a
//! run and every setting of the generator.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! roots:
//!   - v1.Invoice
//!   - v2.Invoice
//! namespace: billing
//! options:
//!   normalize_enumerations: true
//!   sibling_policy: reject
//!   properties: [getter, setter, assume]
//! predefinitions:
//!   billing.Money:
//!     template: shared.MoneyTemplate
//!     projections:
//!       v1.Money: shared.MoneyV1
//! exclude:
//!   - "v1.Invoice#internalNote"
//!   - "*#etag"
//! aliases:
//!   "v2.Invoice#state": status
//!   "v1.Status#open": OPEN
//! replacements:
//!   'billing\.(\w+)Type': billing.$1
//! deduplicate: true
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use structural_type_core::{
    DecoratingNamingStrategy, Generation, Generator, GeneratorOptions, NamingStrategy,
    Predefinition, SimpleNamingStrategy, TypeName,
};
use tracing::{info, warn};

use crate::error::{ModelError, Result};
use crate::TypeModel;

/// Wildcard type of a `Type#property` reference.
pub const ANY_TYPE: &str = "*";

fn default_deduplicate() -> bool {
    true
}

/// Top-level generation configuration.
///
/// # Examples
///
/// ```no_run
/// use structural_type_model::{GenerationConfig, TypeModel};
///
/// let config = GenerationConfig::load("structural-type.yml").unwrap();
/// let model = TypeModel::from_dir("models/").unwrap();
/// let generation = config.generate(&model).unwrap();
/// println!("{} structures", generation.naming.len());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Configuration format version (e.g., `"1.0"`).
    pub version: String,
    /// Types merged into the root structure.
    pub roots: Vec<TypeName>,
    /// Namespace of generated names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Normalization and naming switches.
    #[serde(default)]
    pub options: GeneratorOptions,
    /// Structures defined elsewhere, by structure name.
    #[serde(default)]
    pub predefinitions: BTreeMap<String, Predefinition>,
    /// `Type#property` entries to leave out; `*` matches any type.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// `Type#property` (or `Enum#CONSTANT`) entries to rename.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    /// Full-match regex rewrites of generated names, applied in order.
    #[serde(default)]
    pub replacements: IndexMap<String, String>,
    /// Append numeric suffixes instead of failing on name collisions.
    #[serde(default = "default_deduplicate")]
    pub deduplicate: bool,
}

impl GenerationConfig {
    /// Creates a config merging `roots` with default settings.
    pub fn new(version: impl Into<String>, roots: Vec<TypeName>) -> Self {
        Self {
            version: version.into(),
            roots,
            namespace: None,
            options: GeneratorOptions::default(),
            predefinitions: BTreeMap::new(),
            exclude: Vec::new(),
            aliases: BTreeMap::new(),
            replacements: IndexMap::new(),
            deduplicate: true,
        }
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IoError`] if the file cannot be read, or
    /// [`ModelError::YamlError`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::IoError`] if the file cannot be written, or
    /// [`ModelError::YamlError`] if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns `true` if `property` of `ty` is excluded.
    ///
    /// # Examples
    ///
    /// ```
    /// # use structural_type_core::TypeName;
    /// # use structural_type_model::GenerationConfig;
    /// let mut config = GenerationConfig::new("1.0", vec![TypeName::new("Order")]);
    /// config.exclude = vec!["Order#secret".into(), "*#etag".into()];
    /// assert!(config.is_excluded("Order", "secret"));
    /// assert!(config.is_excluded("Customer", "etag"));
    /// assert!(!config.is_excluded("Customer", "secret"));
    /// ```
    pub fn is_excluded(&self, ty: &str, property: &str) -> bool {
        self.exclude
            .iter()
            .filter_map(|entry| split_reference(entry))
            .any(|(owner, name)| name == property && (owner == ANY_TYPE || owner == ty))
    }

    /// Returns the alias configured for `property` of `ty`. An exact entry
    /// wins over a wildcard one.
    pub fn alias(&self, ty: &str, property: &str) -> Option<&str> {
        self.aliases
            .get(&format!("{ty}#{property}"))
            .or_else(|| self.aliases.get(&format!("{ANY_TYPE}#{property}")))
            .map(String::as_str)
    }

    /// Builds a generator with every setting of the file.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidReference`] for an `exclude` or `aliases`
    /// entry without `#`, and [`ModelError::PatternError`] for a replacement
    /// pattern that does not compile.
    pub fn generator(&self) -> Result<Generator> {
        let mut exclusions: Vec<(String, String)> = Vec::with_capacity(self.exclude.len());
        for entry in &self.exclude {
            let (owner, name) = parse_reference(entry)?;
            exclusions.push((owner.to_string(), name.to_string()));
        }
        let mut aliases: HashMap<(String, String), String> = HashMap::new();
        for (entry, alias) in &self.aliases {
            let (owner, name) = parse_reference(entry)?;
            aliases.insert((owner.to_string(), name.to_string()), alias.clone());
        }

        let mut naming: Box<dyn NamingStrategy> = Box::new(SimpleNamingStrategy::new(
            self.namespace.clone().unwrap_or_default(),
        ));
        if !self.replacements.is_empty() {
            naming = Box::new(DecoratingNamingStrategy::with_replacements(
                naming,
                self.replacements.iter(),
            )?);
        }
        if self.deduplicate {
            naming = Box::new(DecoratingNamingStrategy::with_duplication_resolution(naming));
        }

        let mut generator = Generator::new()
            .with_options(self.options.clone())
            .with_naming(naming)
            .with_predefinitions(self.predefinitions.clone());
        if !exclusions.is_empty() {
            generator = generator.with_filter(move |ty, property| {
                !exclusions.iter().any(|(owner, name)| {
                    name == property && (owner == ANY_TYPE || owner == ty.as_str())
                })
            });
        }
        if !aliases.is_empty() {
            generator = generator.with_alias(move |ty, property| {
                let exact = (ty.to_string(), property.to_string());
                let wildcard = (ANY_TYPE.to_string(), property.to_string());
                aliases.get(&exact).or_else(|| aliases.get(&wildcard)).cloned()
            });
        }
        Ok(generator)
    }

    /// Runs the configured generation over `model`.
    ///
    /// # Errors
    ///
    /// Returns any error of [`generator`](Self::generator) and wraps
    /// failures of the run in [`ModelError::Structural`].
    pub fn generate(&self, model: &TypeModel) -> Result<Generation> {
        for root in &self.roots {
            if !model.contains(root.as_str()) {
                warn!(root = %root, "Root type is not declared in the model");
            }
        }
        let generation = self.generator()?.generate(model, &self.roots)?;
        info!(
            version = %self.version,
            roots = self.roots.len(),
            structures = generation.naming.len(),
            "Configured generation finished"
        );
        Ok(generation)
    }
}

fn split_reference(entry: &str) -> Option<(&str, &str)> {
    entry
        .split_once('#')
        .filter(|(owner, name)| !owner.is_empty() && !name.is_empty())
}

fn parse_reference(entry: &str) -> Result<(&str, &str)> {
    split_reference(entry).ok_or_else(|| ModelError::InvalidReference(entry.to_string()))
}
