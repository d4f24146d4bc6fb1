//! Two-pass identity assignment over a finished compound graph.
//!
//! Pass 1 walks every distinct node once in preorder and reserves its
//! structure name, plus template and projection names for branches. Pass 2
//! builds the accessor table of every branch that was not predefined.
//!
//! A [`Predefinition`] pins a computed structure name to something defined
//! elsewhere. Predefined names are not reserved, and the predefinition must
//! supply every derived name the run would otherwise compute. Only branches
//! can be predefined.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    CompoundGraph, CompoundId, CompoundNode, NamingStrategy, PropertyGeneration,
    PropertyStrategy, PropertyTarget, Result, SingularGraph, SingularId, StructuralError,
    TypeName,
};

/// Derived artifacts generated for each branch structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Implementation {
    /// A mutable template holding the union of all properties.
    Template,
    /// One view per contributing type.
    Projection,
}

impl Implementation {
    /// Returns the set of every implementation kind.
    pub fn all() -> BTreeSet<Implementation> {
        BTreeSet::from([Implementation::Template, Implementation::Projection])
    }
}

/// Names of a structure that already exists outside the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Predefinition {
    /// Existing template name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Existing projection name per contributing type.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub projections: BTreeMap<TypeName, String>,
}

impl Predefinition {
    /// Creates an empty predefinition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the template name.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Adds the projection name of `ty`.
    pub fn with_projection(mut self, ty: impl Into<TypeName>, name: impl Into<String>) -> Self {
        self.projections.insert(ty.into(), name.into());
        self
    }
}

/// Accessor names of one branch: property → accessor kind → name.
pub type AccessorTable = IndexMap<String, BTreeMap<PropertyGeneration, String>>;

/// Identifiers assigned to a compound graph.
#[derive(Debug, Clone, Default)]
pub struct Naming {
    structures: HashMap<CompoundId, String>,
    templates: HashMap<CompoundId, String>,
    projections: HashMap<CompoundId, IndexMap<SingularId, String>>,
    accessors: HashMap<CompoundId, AccessorTable>,
    predefined: HashSet<CompoundId>,
    reserved: BTreeSet<String>,
    order: Vec<CompoundId>,
}

impl Naming {
    /// Structure name of a named node.
    pub fn structure(&self, id: CompoundId) -> Option<&str> {
        self.structures.get(&id).map(String::as_str)
    }

    /// Template name of a branch.
    pub fn template(&self, id: CompoundId) -> Option<&str> {
        self.templates.get(&id).map(String::as_str)
    }

    /// Projection names of a branch, keyed by contributing schema.
    pub fn projections(&self, id: CompoundId) -> Option<&IndexMap<SingularId, String>> {
        self.projections.get(&id)
    }

    /// Projection name of one contributor of a branch.
    pub fn projection(&self, id: CompoundId, singular: SingularId) -> Option<&str> {
        self.projections
            .get(&id)
            .and_then(|projections| projections.get(&singular))
            .map(String::as_str)
    }

    /// Accessor table of a generated branch.
    pub fn accessors(&self, id: CompoundId) -> Option<&AccessorTable> {
        self.accessors.get(&id)
    }

    /// Name of one accessor of a property.
    pub fn accessor(
        &self,
        id: CompoundId,
        property: &str,
        generation: PropertyGeneration,
    ) -> Option<&str> {
        self.accessors
            .get(&id)
            .and_then(|table| table.get(property))
            .and_then(|kinds| kinds.get(&generation))
            .map(String::as_str)
    }

    /// Returns `true` for structures pinned by a predefinition; emission
    /// skips them.
    pub fn is_predefined(&self, id: CompoundId) -> bool {
        self.predefined.contains(&id)
    }

    /// Every name reserved by the run.
    pub fn reserved(&self) -> &BTreeSet<String> {
        &self.reserved
    }

    /// Named nodes in visiting order.
    pub fn named(&self) -> impl Iterator<Item = (CompoundId, &str)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.structure(*id).map(|name| (*id, name)))
    }

    /// Number of named structures.
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    /// Returns `true` if no structure was named.
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }
}

/// Assigns names and accessor tables to a compound graph.
pub struct NameResolver<'a> {
    singular: &'a SingularGraph,
    compound: &'a CompoundGraph,
    naming: &'a dyn NamingStrategy,
    properties: &'a dyn PropertyStrategy,
    predefinitions: Option<&'a BTreeMap<String, Predefinition>>,
    implementations: BTreeSet<Implementation>,
    generations: BTreeSet<PropertyGeneration>,
}

impl<'a> NameResolver<'a> {
    /// Creates a resolver generating every implementation and accessor kind.
    pub fn new(
        singular: &'a SingularGraph,
        compound: &'a CompoundGraph,
        naming: &'a dyn NamingStrategy,
        properties: &'a dyn PropertyStrategy,
    ) -> Self {
        Self {
            singular,
            compound,
            naming,
            properties,
            predefinitions: None,
            implementations: Implementation::all(),
            generations: PropertyGeneration::all(),
        }
    }

    /// Pins structure names to existing definitions.
    pub fn with_predefinitions(mut self, predefinitions: &'a BTreeMap<String, Predefinition>) -> Self {
        self.predefinitions = Some(predefinitions);
        self
    }

    /// Restricts the derived names reserved for branches.
    pub fn with_implementations(mut self, implementations: BTreeSet<Implementation>) -> Self {
        self.implementations = implementations;
        self
    }

    /// Restricts the accessor kinds generated in Pass 2.
    pub fn with_generations(mut self, generations: BTreeSet<PropertyGeneration>) -> Self {
        self.generations = generations;
        self
    }

    /// Names everything reachable from `root`.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::NameCollision`] when a computed name is
    /// already reserved or pinned by a predefinition, and
    /// [`StructuralError::PredefinitionMismatch`] when a predefinition does
    /// not fit the structure it pins.
    pub fn resolve(&self, root: CompoundId) -> Result<Naming> {
        let mut naming = Naming::default();
        let mut applied = BTreeSet::new();
        let mut visited = HashSet::new();
        let mut stack = vec![self.compound.resolve(root)];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            naming.order.push(id);
            match self.compound.node(id) {
                CompoundNode::EnumeratedLeaf { singulars, .. } => {
                    self.name_enumeration(&mut naming, &applied, id, singulars)?;
                }
                CompoundNode::Branch {
                    properties,
                    singulars,
                } => {
                    self.name_branch(&mut naming, &mut applied, id, singulars)?;
                    stack.extend(
                        properties
                            .values()
                            .rev()
                            .map(|property| self.compound.resolve(property.schema)),
                    );
                }
                CompoundNode::TypedLeaf { .. } | CompoundNode::Recursive(_) => {}
            }
        }

        let mut accessors = HashMap::new();
        for id in &naming.order {
            if naming.is_predefined(*id) {
                continue;
            }
            if let Some(table) = self.accessor_table(&naming, *id) {
                accessors.insert(*id, table);
            }
        }
        naming.accessors = accessors;
        Ok(naming)
    }

    fn predefinition(&self, name: &str) -> Option<&'a Predefinition> {
        self.predefinitions.and_then(|predefinitions| predefinitions.get(name))
    }

    fn structure_name(
        &self,
        naming: &Naming,
        applied: &BTreeSet<String>,
        singulars: &[SingularId],
        enumeration: bool,
    ) -> String {
        let types: BTreeSet<TypeName> = singulars
            .iter()
            .filter(|id| enumeration || !self.singular.is_leaf(**id))
            .map(|id| self.singular.type_of(*id).clone())
            .collect();
        let reserved = |name: &str| naming.reserved.contains(name) || applied.contains(name);
        self.naming.structure(&types, enumeration, &reserved)
    }

    fn claim(&self, naming: &mut Naming, name: String) -> Result<String> {
        if naming.reserved.contains(&name) || self.predefinition(&name).is_some() {
            return Err(StructuralError::NameCollision(name));
        }
        naming.reserved.insert(name.clone());
        Ok(name)
    }

    fn name_enumeration(
        &self,
        naming: &mut Naming,
        applied: &BTreeSet<String>,
        id: CompoundId,
        singulars: &[SingularId],
    ) -> Result<()> {
        let name = self.structure_name(naming, applied, singulars, true);
        if self.predefinition(&name).is_some() {
            return Err(StructuralError::PredefinitionMismatch {
                structure: name,
                reason: "an enumeration is a leaf position and cannot be predefined".into(),
            });
        }
        let name = self.claim(naming, name)?;
        debug!(structure = %name, "Reserved enumeration");
        naming.structures.insert(id, name);
        Ok(())
    }

    fn name_branch(
        &self,
        naming: &mut Naming,
        applied: &mut BTreeSet<String>,
        id: CompoundId,
        singulars: &[SingularId],
    ) -> Result<()> {
        let name = self.structure_name(naming, applied, singulars, false);
        let template = self.implementations.contains(&Implementation::Template);
        let projection = self.implementations.contains(&Implementation::Projection);

        if let Some(predefinition) = self.predefinition(&name) {
            let mismatch = |reason: String| StructuralError::PredefinitionMismatch {
                structure: name.clone(),
                reason,
            };
            if template {
                let Some(existing) = &predefinition.template else {
                    return Err(mismatch("does not declare a template".into()));
                };
                naming.templates.insert(id, existing.clone());
            }
            let contributors: BTreeSet<&TypeName> =
                singulars.iter().map(|s| self.singular.type_of(*s)).collect();
            if let Some(ty) = predefinition
                .projections
                .keys()
                .find(|ty| !contributors.contains(ty))
            {
                return Err(mismatch(format!("{ty} does not contribute to the structure")));
            }
            if projection {
                let mut projections = IndexMap::new();
                for singular in singulars {
                    let ty = self.singular.type_of(*singular);
                    let Some(existing) = predefinition.projections.get(ty) else {
                        let kind = if self.singular.is_leaf(*singular) {
                            "expansion"
                        } else {
                            "projection"
                        };
                        return Err(mismatch(format!("does not declare the {kind} of {ty}")));
                    };
                    projections.insert(*singular, existing.clone());
                }
                naming.projections.insert(id, projections);
            }
            debug!(structure = %name, "Applying predefined structure");
            applied.insert(name.clone());
            naming.predefined.insert(id);
            naming.structures.insert(id, name);
            return Ok(());
        }

        let name = self.claim(naming, name)?;
        debug!(structure = %name, contributors = singulars.len(), "Reserved structure");
        if template {
            let reserved = |candidate: &str| {
                naming.reserved.contains(candidate) || self.predefinition(candidate).is_some()
            };
            let derived = self.naming.template(&name, &reserved);
            let derived = self.claim(naming, derived)?;
            naming.templates.insert(id, derived);
        }
        if projection {
            let mut projections = IndexMap::new();
            for singular in singulars {
                let reserved = |candidate: &str| {
                    naming.reserved.contains(candidate) || self.predefinition(candidate).is_some()
                };
                let derived = self.naming.projection(
                    &name,
                    self.singular.type_of(*singular),
                    self.singular.is_leaf(*singular),
                    &reserved,
                );
                let derived = self.claim(naming, derived)?;
                projections.insert(*singular, derived);
            }
            naming.projections.insert(id, projections);
        }
        naming.structures.insert(id, name);
        Ok(())
    }

    fn accessor_table(&self, naming: &Naming, id: CompoundId) -> Option<AccessorTable> {
        let structure = naming.structure(id)?;
        let properties = self.compound.properties(id)?;
        let mut table = AccessorTable::new();
        for (name, property) in properties {
            let child = self.compound.resolve(property.schema);
            let sort = self.compound.sort(child);
            let target = match self.compound.leaf_type(child) {
                Some(ty) => PropertyTarget::Type(ty),
                None => PropertyTarget::Structure(naming.structure(child).unwrap_or_default()),
            };
            let kinds: BTreeMap<PropertyGeneration, String> = PropertyGeneration::ALL
                .into_iter()
                .filter(|generation| {
                    generation.applies(&self.generations, name, property.cardinality, sort)
                })
                .map(|generation| {
                    let accessor = self.properties.accessor(
                        structure,
                        name,
                        target,
                        property.cardinality,
                        generation,
                    );
                    (generation, accessor)
                })
                .collect();
            table.insert(name.clone(), kinds);
        }
        Some(table)
    }
}
