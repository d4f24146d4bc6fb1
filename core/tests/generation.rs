//! Integration tests for the structural-type-core crate.

use std::collections::{BTreeSet, HashMap};

use structural_type_core::{
    Cardinality, CompoundSort, DeclaredType, EXPANSION, Generator, GeneratorOptions,
    Implementation, Introspector, Predefinition, PropertyGeneration, SiblingPolicy,
    SimpleNamingStrategy, StructuralError, TypeName,
};

#[derive(Clone)]
struct Field {
    name: &'static str,
    declared: DeclaredType,
    elements: Vec<TypeName>,
    required: bool,
}

fn value(name: &'static str, ty: &str, required: bool) -> Field {
    Field {
        name,
        declared: DeclaredType::Value(TypeName::new(ty)),
        elements: Vec::new(),
        required,
    }
}

fn list(name: &'static str, element: &str) -> Field {
    Field {
        name,
        declared: DeclaredType::List,
        elements: vec![TypeName::new(element)],
        required: false,
    }
}

#[derive(Default)]
struct Catalog {
    branches: HashMap<TypeName, Vec<Field>>,
    enums: HashMap<TypeName, Vec<String>>,
    supers: HashMap<TypeName, TypeName>,
    subs: HashMap<TypeName, Vec<TypeName>>,
}

impl Catalog {
    fn branch(mut self, name: &str, fields: Vec<Field>) -> Self {
        self.branches.insert(TypeName::new(name), fields);
        self
    }

    fn enumeration(mut self, name: &str, constants: &[&str]) -> Self {
        self.enums.insert(
            TypeName::new(name),
            constants.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    fn extends(mut self, sub: &str, sup: &str) -> Self {
        self.supers.insert(TypeName::new(sub), TypeName::new(sup));
        self.subs
            .entry(TypeName::new(sup))
            .or_default()
            .push(TypeName::new(sub));
        self
    }
}

impl Introspector for Catalog {
    type Property = Field;

    fn is_branch(&self, ty: &TypeName) -> bool {
        self.branches.contains_key(ty)
    }

    fn is_primitive(&self, ty: &TypeName) -> bool {
        matches!(ty.as_str(), "int" | "long" | "boolean")
    }

    fn enum_constants(&self, ty: &TypeName) -> Option<Vec<String>> {
        self.enums.get(ty).cloned()
    }

    fn properties(&self, ty: &TypeName) -> Vec<Field> {
        self.branches.get(ty).cloned().unwrap_or_default()
    }

    fn name(&self, property: &Field) -> String {
        property.name.to_string()
    }

    fn declared_type(&self, property: &Field) -> DeclaredType {
        property.declared.clone()
    }

    fn element_types(&self, property: &Field) -> Vec<TypeName> {
        property.elements.clone()
    }

    fn is_required(&self, property: &Field) -> bool {
        property.required
    }

    fn super_type(&self, ty: &TypeName) -> Option<TypeName> {
        self.supers.get(ty).cloned()
    }

    fn sub_types(&self, ty: &TypeName) -> Vec<TypeName> {
        self.subs.get(ty).cloned().unwrap_or_default()
    }
}

fn roots(names: &[&str]) -> Vec<TypeName> {
    names.iter().map(|n| TypeName::new(*n)).collect()
}

fn invoices() -> Catalog {
    Catalog::default()
        .branch(
            "v1.Invoice",
            vec![
                value("number", "String", true),
                value("total", "long", false),
                list("lines", "v1.Line"),
                value("currency", "v1.Currency", false),
            ],
        )
        .branch(
            "v2.Invoice",
            vec![
                value("number", "String", true),
                value("total", "java.math.BigDecimal", true),
                value("lines", "v2.Line", false),
                value("customer", "String", false),
            ],
        )
        .branch(
            "v1.Line",
            vec![value("sku", "String", true), value("next", "v1.Line", false)],
        )
        .branch(
            "v2.Line",
            vec![value("sku", "String", true), value("next", "v2.Line", false)],
        )
        .enumeration("v1.Currency", &["EUR", "USD"])
}

#[test]
fn test_versions_merge_into_one_structure() {
    let generation = Generator::new()
        .generate(&invoices(), &roots(&["v1.Invoice", "v2.Invoice"]))
        .unwrap();
    let compound = &generation.compound;
    let root = generation.root;

    let names: Vec<&String> = compound.properties(root).unwrap().keys().collect();
    assert_eq!(names, vec!["number", "total", "lines", "currency", "customer"]);

    let cardinality = |name: &str| compound.property(root, name).unwrap().cardinality;
    assert_eq!(cardinality("number"), Cardinality::Single);
    assert_eq!(cardinality("total"), Cardinality::Single);
    assert_eq!(cardinality("lines"), Cardinality::List);
    assert_eq!(cardinality("currency"), Cardinality::Optional);
    assert_eq!(cardinality("customer"), Cardinality::Optional);

    let total = compound.property(root, "total").unwrap().schema;
    assert_eq!(compound.leaf_type(total).map(TypeName::as_str), Some("Object"));
    let currency = compound.property(root, "currency").unwrap().schema;
    assert_eq!(compound.sort(currency), CompoundSort::EnumeratedLeaf);
}

#[test]
fn test_recursive_lines_close_with_one_placeholder() {
    let generation = Generator::new()
        .generate(&invoices(), &roots(&["v1.Invoice", "v2.Invoice"]))
        .unwrap();
    let compound = &generation.compound;
    let lines = compound.property(generation.root, "lines").unwrap().schema;
    let next = compound.property(lines, "next").unwrap();

    assert_eq!(compound.resolve(next.schema), compound.resolve(lines));
    assert_eq!(compound.placeholder_count(), 1);
    assert_eq!(generation.singulars.placeholder_count(), 2);
}

#[test]
fn test_permuted_roots_produce_same_shape() {
    let forward = Generator::new()
        .generate(&invoices(), &roots(&["v1.Invoice", "v2.Invoice"]))
        .unwrap();
    let backward = Generator::new()
        .generate(&invoices(), &roots(&["v2.Invoice", "v1.Invoice"]))
        .unwrap();

    let shape = |g: &structural_type_core::Generation| {
        let mut shape: Vec<(String, Cardinality)> = g
            .compound
            .properties(g.root)
            .unwrap()
            .iter()
            .map(|(name, property)| (name.clone(), property.cardinality))
            .collect();
        shape.sort();
        shape
    };
    assert_eq!(shape(&forward), shape(&backward));
}

#[test]
fn test_accessors_follow_enabled_kinds() {
    let options = GeneratorOptions {
        properties: BTreeSet::from([
            PropertyGeneration::Getter,
            PropertyGeneration::Assume,
            PropertyGeneration::Merge,
        ]),
        ..GeneratorOptions::default()
    };
    let generation = Generator::new()
        .with_options(options)
        .generate(&invoices(), &roots(&["v1.Invoice", "v2.Invoice"]))
        .unwrap();
    let naming = &generation.naming;
    let root = generation.root;

    let table = naming.accessors(root).unwrap();
    let kinds: Vec<PropertyGeneration> = table["lines"].keys().copied().collect();
    assert_eq!(
        kinds,
        vec![
            PropertyGeneration::Getter,
            PropertyGeneration::Setter,
            PropertyGeneration::Merge
        ]
    );
    assert_eq!(
        naming.accessor(root, "customer", PropertyGeneration::Assume),
        Some("assumeCustomer")
    );
    assert_eq!(naming.accessor(root, "number", PropertyGeneration::Assume), None);
}

#[test]
fn test_leaf_root_becomes_expansion() {
    let catalog = Catalog::default()
        .branch(
            "Labelled",
            vec![value("name", "String", true), value("tag", "Tag", false)],
        )
        .enumeration("Tag", &["RED", "GREEN"]);
    let generation = Generator::new()
        .generate(&catalog, &roots(&["Labelled", "String"]))
        .unwrap();
    let root = generation.root;
    let compound = &generation.compound;

    let expansion = compound.property(root, EXPANSION).unwrap();
    assert_eq!(expansion.cardinality, Cardinality::Optional);
    assert_eq!(
        compound.property(root, "name").unwrap().cardinality,
        Cardinality::Optional
    );
    assert_eq!(
        compound.property(root, "tag").unwrap().cardinality,
        Cardinality::Optional
    );

    let string = generation.singulars.lookup("String").unwrap();
    assert_eq!(
        generation.naming.projection(root, string),
        Some("LabelledOfString")
    );
    assert_eq!(
        generation.naming.accessor(root, EXPANSION, PropertyGeneration::Getter),
        Some("get")
    );
    assert_eq!(
        generation.naming.accessor(root, EXPANSION, PropertyGeneration::Setter),
        None
    );
}

#[test]
fn test_subtype_absorbs_supertype() {
    let catalog = Catalog::default()
        .branch("Shape", vec![value("id", "String", false)])
        .branch(
            "Circle",
            vec![value("id", "String", true), value("radius", "int", true)],
        )
        .extends("Circle", "Shape");
    let generation = Generator::new()
        .generate(&catalog, &roots(&["Shape", "Circle"]))
        .unwrap();
    let root = generation.root;

    assert_eq!(generation.compound.singulars(root).len(), 1);
    assert_eq!(generation.naming.structure(root), Some("Circle"));
    assert_eq!(
        generation.compound.property(root, "radius").unwrap().cardinality,
        Cardinality::Single
    );

    let shape = generation.singulars.lookup("Shape").unwrap();
    let circle = generation.singulars.lookup("Circle").unwrap();
    let ids = generation.singulars.lineage_properties(shape, "id");
    assert_eq!(ids.len(), 2);
    assert!(generation.singulars.is_subtype_of(circle, shape));
}

#[test]
fn test_self_referencing_subtype_is_one_structure() {
    let catalog = Catalog::default()
        .branch("Shape", vec![value("id", "String", false)])
        .branch(
            "Circle",
            vec![value("id", "String", true), value("parent", "Circle", false)],
        )
        .extends("Circle", "Shape");
    let generation = Generator::new()
        .with_naming(SimpleNamingStrategy::default())
        .generate(&catalog, &roots(&["Shape", "Circle"]))
        .unwrap();
    let compound = &generation.compound;
    let root = generation.root;

    let parent = compound.property(root, "parent").unwrap().schema;
    assert_eq!(compound.resolve(parent), root);
    assert_eq!(generation.naming.structure(root), Some("Circle"));
    assert_eq!(
        generation.naming.structure(compound.resolve(parent)),
        Some("Circle")
    );
    assert!(!generation.naming.reserved().contains("Circle0"));
    assert_eq!(compound.placeholder_count(), 1);
}

#[test]
fn test_without_intersections_supertype_widens() {
    let catalog = Catalog::default()
        .branch("Shape", vec![value("id", "String", false)])
        .branch(
            "Circle",
            vec![value("id", "String", true), value("radius", "int", true)],
        )
        .extends("Circle", "Shape");
    let options = GeneratorOptions {
        normalize_intersections: false,
        ..GeneratorOptions::default()
    };
    let generation = Generator::new()
        .with_options(options)
        .generate(&catalog, &roots(&["Shape", "Circle"]))
        .unwrap();

    assert_eq!(generation.compound.singulars(generation.root).len(), 2);
    assert_eq!(
        generation
            .compound
            .property(generation.root, "radius")
            .unwrap()
            .cardinality,
        Cardinality::Optional
    );
}

#[test]
fn test_reject_policy_flags_lookalike_siblings() {
    let catalog = Catalog::default()
        .branch("billing.Address", vec![value("street", "String", true)])
        .branch("shipping.Address", vec![value("street", "String", true)]);
    let roots = roots(&["billing.Address", "shipping.Address"]);

    let merged = Generator::new().generate(&catalog, &roots);
    assert!(merged.is_ok());

    let options = GeneratorOptions {
        sibling_policy: SiblingPolicy::Reject,
        ..GeneratorOptions::default()
    };
    let err = Generator::new()
        .with_options(options)
        .generate(&catalog, &roots)
        .err()
        .unwrap();
    assert!(matches!(err, StructuralError::AmbiguousMerge { .. }));
}

#[test]
fn test_enum_normalization_unifies_by_namer() {
    let catalog = Catalog::default()
        .branch("a.Light", vec![value("color", "a.Color", true)])
        .branch("b.Light", vec![value("color", "b.Color", true)])
        .enumeration("a.Color", &["red", "green"])
        .enumeration("b.Color", &["RED", "GREEN"]);
    let options = GeneratorOptions {
        normalize_enumerations: true,
        ..GeneratorOptions::default()
    };
    let generation = Generator::new()
        .with_options(options)
        .with_enum_namer(|_, constant| constant.to_uppercase())
        .generate(&catalog, &roots(&["a.Light", "b.Light"]))
        .unwrap();
    let color = generation
        .compound
        .property(generation.root, "color")
        .unwrap()
        .schema;
    assert_eq!(generation.compound.singulars(color).len(), 1);
    let constants = generation.compound.constants(color).unwrap();
    assert_eq!(constants.keys().collect::<Vec<_>>(), vec!["RED", "GREEN"]);
}

#[test]
fn test_predefined_root_requires_template() {
    let err = Generator::new()
        .with_predefinition("Invoice", Predefinition::new())
        .generate(&invoices(), &roots(&["v1.Invoice"]))
        .err()
        .unwrap();
    assert_eq!(
        err,
        StructuralError::PredefinitionMismatch {
            structure: "Invoice".into(),
            reason: "does not declare a template".into(),
        }
    );
}

#[test]
fn test_predefined_root_without_templates() {
    let options = GeneratorOptions {
        implementations: BTreeSet::from([Implementation::Projection]),
        ..GeneratorOptions::default()
    };
    let generation = Generator::new()
        .with_options(options)
        .with_predefinition(
            "Invoice",
            Predefinition::new().with_projection("v1.Invoice", "legacy.Invoice"),
        )
        .with_predefinition("Unused", Predefinition::new())
        .generate(&invoices(), &roots(&["v1.Invoice"]))
        .unwrap();
    let root = generation.root;
    let invoice = generation.singulars.lookup("v1.Invoice").unwrap();

    assert!(generation.naming.is_predefined(root));
    assert_eq!(
        generation.naming.projection(root, invoice),
        Some("legacy.Invoice")
    );
    assert!(generation.naming.accessors(root).is_none());
    assert!(!generation.naming.reserved().contains("Invoice"));
}

#[test]
fn test_malformed_list_aborts_run() {
    let catalog = Catalog::default().branch(
        "Bag",
        vec![Field {
            name: "items",
            declared: DeclaredType::List,
            elements: Vec::new(),
            required: false,
        }],
    );
    let err = Generator::new()
        .generate(&catalog, &roots(&["Bag"]))
        .err()
        .unwrap();
    assert!(matches!(err, StructuralError::MalformedProperty { .. }));
}

#[test]
fn test_map_container_is_unsupported() {
    let catalog = Catalog::default().branch(
        "Index",
        vec![Field {
            name: "entries",
            declared: DeclaredType::Container("map".into()),
            elements: vec![TypeName::new("String"), TypeName::new("String")],
            required: false,
        }],
    );
    let err = Generator::new()
        .generate(&catalog, &roots(&["Index"]))
        .err()
        .unwrap();
    assert_eq!(
        err.to_string(),
        "only list containers are supported, Index#entries is declared as map"
    );
}
