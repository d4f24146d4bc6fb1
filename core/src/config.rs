//! Generator configuration and the end-to-end generation run.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    BeanPropertyStrategy, CommonTypeReconciler, CompoundGraph, CompoundId,
    DecoratingNamingStrategy, EnumNamer, EnumeratingNormalizer, Implementation,
    IntersectingNormalizer, Introspector, KeyNormalizer, NameResolver, Naming, NamingStrategy,
    Pipeline, Predefinition, PropertyGeneration, PropertyStrategy, Result, SchemaResolver,
    SiblingPolicy, SimpleNamingStrategy, SingularGraph, SingularId, StructuralError, TypeName,
    TypeReconciler, merge_singulars,
};

type FilterFn = dyn Fn(&TypeName, &str) -> bool;
type AliasFn = dyn Fn(&TypeName, &str) -> Option<String>;
type EnumNameFn = dyn Fn(&TypeName, &str) -> String;
type KeyFn = dyn Fn(&TypeName) -> Option<String>;

/// Switches controlling normalization and what gets named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Collapse supertypes into subtypes contributing to the same position.
    pub normalize_intersections: bool,
    /// Collapse enumerations with the same unified constants.
    pub normalize_enumerations: bool,
    /// Treatment of unrelated branches with coinciding shapes.
    pub sibling_policy: SiblingPolicy,
    /// Accessor kinds generated per property.
    pub properties: BTreeSet<PropertyGeneration>,
    /// Derived artifacts named per branch.
    pub implementations: BTreeSet<Implementation>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            normalize_intersections: true,
            normalize_enumerations: false,
            sibling_policy: SiblingPolicy::default(),
            properties: PropertyGeneration::all(),
            implementations: Implementation::all(),
        }
    }
}

/// Result of one generation run.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Singular schemas of every reachable type.
    pub singulars: SingularGraph,
    /// Distinct root schemas in input order.
    pub roots: Vec<SingularId>,
    /// The merged graph.
    pub compound: CompoundGraph,
    /// Compound node of the root position.
    pub root: CompoundId,
    /// Names and accessor tables.
    pub naming: Naming,
}

/// Resolves, merges and names a set of root types.
///
/// Every collaborator has a default: deduplicating simple names, bean-style
/// accessors, and a leaf reconciler falling back to `Object`.
///
/// # Examples
///
/// ```
/// use structural_type_core::{Generator, GeneratorOptions, Implementation, TypeName};
/// # use structural_type_core::{DeclaredType, Introspector};
/// # struct Scalars;
/// # impl Introspector for Scalars {
/// #     type Property = ();
/// #     fn is_branch(&self, _: &TypeName) -> bool { false }
/// #     fn is_primitive(&self, _: &TypeName) -> bool { false }
/// #     fn enum_constants(&self, ty: &TypeName) -> Option<Vec<String>> {
/// #         Some(vec![format!("{}_ONLY", ty.simple_name().to_uppercase())])
/// #     }
/// #     fn properties(&self, _: &TypeName) -> Vec<()> { Vec::new() }
/// #     fn name(&self, _: &()) -> String { String::new() }
/// #     fn declared_type(&self, _: &()) -> DeclaredType { DeclaredType::List }
/// #     fn element_types(&self, _: &()) -> Vec<TypeName> { Vec::new() }
/// #     fn is_required(&self, _: &()) -> bool { false }
/// #     fn super_type(&self, _: &TypeName) -> Option<TypeName> { None }
/// #     fn sub_types(&self, _: &TypeName) -> Vec<TypeName> { Vec::new() }
/// # }
///
/// let generator = Generator::new()
///     .with_options(GeneratorOptions {
///         implementations: [Implementation::Template].into(),
///         ..GeneratorOptions::default()
///     })
///     .with_enum_namer(|_, constant| constant.to_lowercase());
/// let generation = generator
///     .generate(&Scalars, &[TypeName::new("a.Mode"), TypeName::new("b.Mode")])
///     .unwrap();
/// assert_eq!(generation.naming.structure(generation.root), Some("Mode"));
/// let constants = generation.compound.constants(generation.root).unwrap();
/// assert_eq!(constants.keys().collect::<Vec<_>>(), vec!["mode_only"]);
/// ```
pub struct Generator {
    options: GeneratorOptions,
    naming: Box<dyn NamingStrategy>,
    properties: Box<dyn PropertyStrategy>,
    reconciler: Box<dyn TypeReconciler>,
    enum_namer: Option<Box<EnumNameFn>>,
    filters: Vec<Box<FilterFn>>,
    alias: Option<Box<AliasFn>>,
    keys: Vec<Box<KeyFn>>,
    predefinitions: BTreeMap<String, Predefinition>,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Creates a generator with default options and collaborators.
    pub fn new() -> Self {
        Self {
            options: GeneratorOptions::default(),
            naming: Box::new(DecoratingNamingStrategy::with_duplication_resolution(
                SimpleNamingStrategy::default(),
            )),
            properties: Box::new(BeanPropertyStrategy),
            reconciler: Box::new(CommonTypeReconciler::default()),
            enum_namer: None,
            filters: Vec::new(),
            alias: None,
            keys: Vec::new(),
            predefinitions: BTreeMap::new(),
        }
    }

    /// Current options.
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Current predefinitions.
    pub fn predefinitions(&self) -> &BTreeMap<String, Predefinition> {
        &self.predefinitions
    }

    /// Replaces the options.
    pub fn with_options(mut self, options: GeneratorOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the naming strategy.
    pub fn with_naming(mut self, naming: impl NamingStrategy + 'static) -> Self {
        self.naming = Box::new(naming);
        self
    }

    /// Replaces the strategy naming accessors.
    pub fn with_property_strategy(mut self, properties: impl PropertyStrategy + 'static) -> Self {
        self.properties = Box::new(properties);
        self
    }

    /// Replaces the reconciler picking the type of merged leaves.
    pub fn with_reconciler(mut self, reconciler: impl TypeReconciler + 'static) -> Self {
        self.reconciler = Box::new(reconciler);
        self
    }

    /// Replaces the default enum namer, which asks the alias resolver and
    /// otherwise keeps the constant.
    pub fn with_enum_namer(
        mut self,
        namer: impl Fn(&TypeName, &str) -> String + 'static,
    ) -> Self {
        self.enum_namer = Some(Box::new(namer));
        self
    }

    /// Adds a property filter. A property is kept only if every filter
    /// accepts it.
    pub fn with_filter(mut self, filter: impl Fn(&TypeName, &str) -> bool + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Sets the resolver renaming properties and enum constants.
    pub fn with_alias(
        mut self,
        alias: impl Fn(&TypeName, &str) -> Option<String> + 'static,
    ) -> Self {
        self.alias = Some(Box::new(alias));
        self
    }

    /// Adds a key-based normalization stage, run after the built-in ones.
    pub fn with_key(mut self, key: impl Fn(&TypeName) -> Option<String> + 'static) -> Self {
        self.keys.push(Box::new(key));
        self
    }

    /// Pins the structure named `structure` to existing names.
    pub fn with_predefinition(mut self, structure: impl Into<String>, predefinition: Predefinition) -> Self {
        self.predefinitions.insert(structure.into(), predefinition);
        self
    }

    /// Adds every predefinition of `predefinitions`.
    pub fn with_predefinitions(
        mut self,
        predefinitions: impl IntoIterator<Item = (String, Predefinition)>,
    ) -> Self {
        self.predefinitions.extend(predefinitions);
        self
    }

    /// Runs resolution, merge and naming for `roots`.
    ///
    /// Every call uses fresh memo tables.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::EmptyPosition`] without roots and any
    /// error of the resolution, merge or naming stage.
    pub fn generate<I: Introspector>(&self, introspector: &I, roots: &[TypeName]) -> Result<Generation> {
        if roots.is_empty() {
            return Err(StructuralError::EmptyPosition("no root types given".into()));
        }

        let filter = |ty: &TypeName, name: &str| self.filters.iter().all(|keep| keep(ty, name));
        let mut resolver = SchemaResolver::new(introspector).with_filter(&filter);
        if let Some(alias) = &self.alias {
            resolver = resolver.with_alias(&**alias);
        }
        let ids = resolver.resolve_all(roots)?;
        let singulars = resolver.finish();

        let default_namer = |ty: &TypeName, constant: &str| {
            self.alias
                .as_ref()
                .and_then(|alias| alias(ty, constant))
                .unwrap_or_else(|| constant.to_string())
        };
        let enum_namer: &EnumNamer<'_> = match &self.enum_namer {
            Some(namer) => &**namer,
            None => &default_namer,
        };

        let options = &self.options;
        let mut pipeline = Pipeline::new();
        if options.normalize_intersections {
            pipeline = pipeline.then(IntersectingNormalizer::new(options.sibling_policy));
        }
        if options.normalize_enumerations {
            pipeline = pipeline.then(EnumeratingNormalizer::new(enum_namer));
        }
        for key in &self.keys {
            pipeline = pipeline.then(KeyNormalizer::new(&**key));
        }

        let (compound, root) =
            merge_singulars(&singulars, &*self.reconciler, enum_namer, &pipeline, &ids)?;
        let naming = NameResolver::new(&singulars, &compound, &*self.naming, &*self.properties)
            .with_predefinitions(&self.predefinitions)
            .with_implementations(options.implementations.clone())
            .with_generations(options.properties.clone())
            .resolve(root)?;

        info!(
            roots = ids.len(),
            singulars = singulars.len(),
            compounds = compound.len(),
            structures = naming.len(),
            "Generated compound schema"
        );
        Ok(Generation {
            singulars,
            roots: ids,
            compound,
            root,
            naming,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Decl, FakeIntrospector};
    use crate::{Cardinality, EXPANSION};

    fn model() -> FakeIntrospector {
        FakeIntrospector::new()
            .branch(
                "v1.Order",
                vec![
                    Decl::required("id", "String"),
                    Decl::optional("status", "v1.Status"),
                    Decl::optional("internal", "String"),
                ],
            )
            .branch(
                "v2.Order",
                vec![
                    Decl::required("id", "String"),
                    Decl::required("state", "v2.Status"),
                ],
            )
            .enumeration("v1.Status", &["open", "closed"])
            .enumeration("v2.Status", &["OPEN", "CLOSED", "VOID"])
    }

    fn roots() -> Vec<TypeName> {
        vec![TypeName::new("v1.Order"), TypeName::new("v2.Order")]
    }

    #[test]
    fn test_defaults() {
        let options = GeneratorOptions::default();
        assert!(options.normalize_intersections);
        assert!(!options.normalize_enumerations);
        assert_eq!(options.sibling_policy, SiblingPolicy::Merge);
        assert_eq!(options.properties.len(), PropertyGeneration::ALL.len());
        assert_eq!(options.implementations, Implementation::all());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: GeneratorOptions =
            serde_json::from_str(r#"{"normalize_enumerations": true, "properties": ["getter"]}"#)
                .unwrap();
        assert!(options.normalize_intersections);
        assert!(options.normalize_enumerations);
        assert_eq!(options.properties, BTreeSet::from([PropertyGeneration::Getter]));
    }

    #[test]
    fn test_generate_without_roots_fails() {
        let err = Generator::new().generate(&model(), &[]).unwrap_err();
        assert!(matches!(err, StructuralError::EmptyPosition(_)));
    }

    #[test]
    fn test_generate_end_to_end() {
        let generation = Generator::new().generate(&model(), &roots()).unwrap();
        let root = generation.root;
        assert_eq!(generation.roots.len(), 2);
        assert_eq!(generation.naming.structure(root), Some("Order"));
        assert_eq!(
            generation.compound.property(root, "id").unwrap().cardinality,
            Cardinality::Single
        );
        assert_eq!(
            generation.naming.accessor(root, "state", PropertyGeneration::Assume),
            Some("assumeState")
        );
        assert!(generation.compound.property(root, EXPANSION).is_none());
    }

    #[test]
    fn test_filters_compose() {
        let generation = Generator::new()
            .with_filter(|_, name| name != "internal")
            .with_filter(|ty, name| !(ty.as_str() == "v2.Order" && name == "state"))
            .generate(&model(), &roots())
            .unwrap();
        let names: Vec<&String> = generation
            .compound
            .properties(generation.root)
            .unwrap()
            .keys()
            .collect();
        assert_eq!(names, vec!["id", "status"]);
    }

    #[test]
    fn test_alias_renames_properties_and_constants() {
        let generation = Generator::new()
            .with_alias(|ty, name| match (ty.as_str(), name) {
                ("v2.Order", "state") => Some("status".into()),
                ("v1.Status", constant) => Some(constant.to_uppercase()),
                _ => None,
            })
            .generate(&model(), &roots())
            .unwrap();
        let status = generation
            .compound
            .property(generation.root, "status")
            .unwrap();
        assert_eq!(status.cardinality, Cardinality::Optional);
        let constants = generation.compound.constants(status.schema).unwrap();
        let names: Vec<&String> = constants.keys().collect();
        assert_eq!(names, vec!["OPEN", "CLOSED", "VOID"]);
        assert_eq!(constants["OPEN"].len(), 2);
    }

    #[test]
    fn test_predefinition_mismatch_surfaces() {
        let err = Generator::new()
            .with_predefinition("Order", Predefinition::new())
            .generate(&model(), &roots())
            .unwrap_err();
        assert!(matches!(err, StructuralError::PredefinitionMismatch { .. }));
    }

    #[test]
    fn test_key_normalizer_collapses_positions() {
        let model = FakeIntrospector::new()
            .branch("a.Box", vec![Decl::optional("item", "a.Thing")])
            .branch("b.Box", vec![Decl::optional("item", "b.Thing")])
            .branch("a.Thing", vec![Decl::required("x", "String")])
            .branch("b.Thing", vec![Decl::required("y", "String")]);
        let roots = [TypeName::new("a.Box"), TypeName::new("b.Box")];
        let generation = Generator::new()
            .with_key(|ty| (ty.simple_name() == "Thing").then(|| "thing".to_string()))
            .generate(&model, &roots)
            .unwrap();
        let item = generation.compound.property(generation.root, "item").unwrap();
        assert_eq!(generation.compound.singulars(item.schema).len(), 1);
    }
}
