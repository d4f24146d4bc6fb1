//! Compound schemas: positions fused across several singular schemas.
//!
//! [`CompoundMerger`] folds a list of contributing singular schemas into one
//! [`CompoundNode`]. Leaves become a [`CompoundNode::TypedLeaf`] (type picked
//! by a [`TypeReconciler`]) or, when every contributor is an enumeration, a
//! [`CompoundNode::EnumeratedLeaf`] of unified constants. Anything else
//! becomes a [`CompoundNode::Branch`] whose properties are merged
//! recursively. Leaf contributors of a branch position are kept under the
//! [`EXPANSION`] key.
//!
//! Nodes are memoized on the set of contributing schemas, both as given and
//! as left by normalization: positions drawing from either set share a node,
//! and a set met again while its own merge is still running yields the one
//! [`CompoundNode::Recursive`] placeholder kept for that set.

use std::collections::{BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::{
    Cardinality, EnumNamer, Pipeline, Result, SingularGraph, SingularId, StructuralError,
    TypeName,
};

/// Property key holding the leaf alternative of a branch position.
pub const EXPANSION: &str = "";

/// Unified constant name → (contributing enumeration → original constant).
pub type EnumConstants = IndexMap<String, IndexMap<TypeName, String>>;

/// Index of a node in a [`CompoundGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompoundId(usize);

impl CompoundId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named, cardinality-tagged child of a compound branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompoundProperty {
    /// Compound schema of the property value.
    pub schema: CompoundId,
    /// Cardinality merged over every contributor.
    pub cardinality: Cardinality,
}

/// Sort of a compound node, placeholders resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompoundSort {
    /// Non-enumeration leaves.
    TypedLeaf,
    /// Enumeration leaves.
    EnumeratedLeaf,
    /// Structured position.
    Branch,
}

impl CompoundSort {
    /// Returns `true` for both leaf sorts.
    pub fn is_leaf(self) -> bool {
        self != CompoundSort::Branch
    }
}

/// A node of the compound arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompoundNode {
    /// Leaves of non-enumeration types.
    TypedLeaf {
        /// Reconciled common type.
        ty: TypeName,
        /// Contributing schemas after normalization.
        singulars: Vec<SingularId>,
    },
    /// Leaves of enumeration types.
    EnumeratedLeaf {
        /// Unified constants in first-seen order.
        constants: EnumConstants,
        /// Contributing schemas after normalization.
        singulars: Vec<SingularId>,
    },
    /// A structured position.
    Branch {
        /// Properties in first-seen order.
        properties: IndexMap<String, CompoundProperty>,
        /// Contributing schemas after normalization.
        singulars: Vec<SingularId>,
    },
    /// Forward reference to a contributor set that was being merged.
    Recursive(BTreeSet<SingularId>),
}

/// Picks the type a merged leaf position is presented as.
pub trait TypeReconciler {
    /// Returns the common type of `types`.
    fn reconcile(&self, types: &BTreeSet<TypeName>) -> TypeName;
}

impl<F> TypeReconciler for F
where
    F: Fn(&BTreeSet<TypeName>) -> TypeName,
{
    fn reconcile(&self, types: &BTreeSet<TypeName>) -> TypeName {
        self(types)
    }
}

/// Uses the sole contributing type, or `fallback` when types differ.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use structural_type_core::{CommonTypeReconciler, TypeName, TypeReconciler};
///
/// let reconciler = CommonTypeReconciler::new("Object");
/// let one = BTreeSet::from([TypeName::new("String")]);
/// let two = BTreeSet::from([TypeName::new("String"), TypeName::new("Integer")]);
/// assert_eq!(reconciler.reconcile(&one).as_str(), "String");
/// assert_eq!(reconciler.reconcile(&two).as_str(), "Object");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonTypeReconciler {
    fallback: TypeName,
}

impl CommonTypeReconciler {
    /// Creates a reconciler falling back to `fallback`.
    pub fn new(fallback: impl Into<TypeName>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }
}

impl Default for CommonTypeReconciler {
    fn default() -> Self {
        Self::new("Object")
    }
}

impl TypeReconciler for CommonTypeReconciler {
    fn reconcile(&self, types: &BTreeSet<TypeName>) -> TypeName {
        match types.iter().next() {
            Some(only) if types.len() == 1 => only.clone(),
            _ => self.fallback.clone(),
        }
    }
}

/// Arena of compound schemas produced by one merge run.
#[derive(Debug, Clone, Default)]
pub struct CompoundGraph {
    nodes: Vec<CompoundNode>,
    index: HashMap<BTreeSet<SingularId>, CompoundId>,
}

impl CompoundGraph {
    /// Follows a recursive placeholder to the node it stands for.
    pub fn resolve(&self, id: CompoundId) -> CompoundId {
        match &self.nodes[id.0] {
            CompoundNode::Recursive(key) => self.index.get(key).copied().unwrap_or(id),
            _ => id,
        }
    }

    /// Returns the node behind `id`, following placeholders.
    pub fn node(&self, id: CompoundId) -> &CompoundNode {
        &self.nodes[self.resolve(id).0]
    }

    /// Returns the node merged from exactly this contributor set.
    pub fn lookup(&self, singulars: &BTreeSet<SingularId>) -> Option<CompoundId> {
        self.index.get(singulars).copied()
    }

    /// Returns the sort of a node.
    pub fn sort(&self, id: CompoundId) -> CompoundSort {
        match self.node(id) {
            CompoundNode::TypedLeaf { .. } => CompoundSort::TypedLeaf,
            CompoundNode::EnumeratedLeaf { .. } => CompoundSort::EnumeratedLeaf,
            // Placeholders resolve before the graph is handed out.
            CompoundNode::Branch { .. } | CompoundNode::Recursive(_) => CompoundSort::Branch,
        }
    }

    /// Returns the contributing schemas of a node.
    pub fn singulars(&self, id: CompoundId) -> &[SingularId] {
        match self.node(id) {
            CompoundNode::TypedLeaf { singulars, .. }
            | CompoundNode::EnumeratedLeaf { singulars, .. }
            | CompoundNode::Branch { singulars, .. } => singulars,
            CompoundNode::Recursive(_) => &[],
        }
    }

    /// Returns the properties of a branch node.
    pub fn properties(&self, id: CompoundId) -> Option<&IndexMap<String, CompoundProperty>> {
        match self.node(id) {
            CompoundNode::Branch { properties, .. } => Some(properties),
            _ => None,
        }
    }

    /// Returns the property `name` of a branch node.
    pub fn property(&self, id: CompoundId, name: &str) -> Option<&CompoundProperty> {
        self.properties(id).and_then(|properties| properties.get(name))
    }

    /// Returns the unified constants of an enumerated leaf.
    pub fn constants(&self, id: CompoundId) -> Option<&EnumConstants> {
        match self.node(id) {
            CompoundNode::EnumeratedLeaf { constants, .. } => Some(constants),
            _ => None,
        }
    }

    /// Returns the reconciled type of a typed leaf.
    pub fn leaf_type(&self, id: CompoundId) -> Option<&TypeName> {
        match self.node(id) {
            CompoundNode::TypedLeaf { ty, .. } => Some(ty),
            _ => None,
        }
    }

    /// Number of arena nodes, placeholders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing was merged.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of recursive placeholders in the arena.
    pub fn placeholder_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, CompoundNode::Recursive(_)))
            .count()
    }

    fn push(&mut self, node: CompoundNode) -> CompoundId {
        self.nodes.push(node);
        CompoundId(self.nodes.len() - 1)
    }
}

/// Merges singular schemas into a [`CompoundGraph`].
pub struct CompoundMerger<'a> {
    graph: &'a SingularGraph,
    reconciler: &'a dyn TypeReconciler,
    enum_namer: &'a EnumNamer<'a>,
    pipeline: &'a Pipeline<'a>,
    in_progress: HashMap<BTreeSet<SingularId>, Option<CompoundId>>,
    compound: CompoundGraph,
}

impl<'a> CompoundMerger<'a> {
    /// Creates a merger over a finished singular graph.
    pub fn new(
        graph: &'a SingularGraph,
        reconciler: &'a dyn TypeReconciler,
        enum_namer: &'a EnumNamer<'a>,
        pipeline: &'a Pipeline<'a>,
    ) -> Self {
        Self {
            graph,
            reconciler,
            enum_namer,
            pipeline,
            in_progress: HashMap::new(),
            compound: CompoundGraph::default(),
        }
    }

    /// Merges the schemas occupying one position.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::EmptyPosition`] without contributors,
    /// [`StructuralError::EnumCollision`] when two constants of one
    /// enumeration unify to the same name, and any normalizer failure.
    pub fn merge(&mut self, singulars: &[SingularId]) -> Result<CompoundId> {
        let raw: Vec<SingularId> = singulars.iter().map(|id| self.graph.resolve(*id)).collect();
        let key: BTreeSet<SingularId> = raw.iter().copied().collect();
        if key.is_empty() {
            return Err(StructuralError::EmptyPosition(
                "merge requires at least one schema".into(),
            ));
        }
        if let Some(id) = self.reuse(&key) {
            return Ok(id);
        }

        let group = self.pipeline.apply(self.graph, &raw)?;
        let normalized: BTreeSet<SingularId> = group.iter().copied().collect();
        if normalized != key {
            if let Some(id) = self.reuse(&normalized) {
                if !self.in_progress.contains_key(&normalized) {
                    self.compound.index.insert(key, id);
                }
                return Ok(id);
            }
            self.in_progress.insert(key.clone(), None);
        }

        self.in_progress.insert(normalized.clone(), None);
        let node = self.build(group);
        self.in_progress.remove(&normalized);
        self.in_progress.remove(&key);
        let id = self.compound.push(node?);
        self.compound.index.insert(normalized, id);
        self.compound.index.insert(key, id);
        debug!(id = id.index(), sort = ?self.compound.sort(id), "Merged compound");
        Ok(id)
    }

    /// Returns the node already merged from `key`, or the placeholder
    /// standing for it while its merge is still running.
    fn reuse(&mut self, key: &BTreeSet<SingularId>) -> Option<CompoundId> {
        if let Some(id) = self.compound.index.get(key) {
            debug!(contributors = key.len(), "Reusing merged compound");
            return Some(*id);
        }
        let slot = self.in_progress.get_mut(key)?;
        if let Some(placeholder) = slot {
            return Some(*placeholder);
        }
        debug!(contributors = key.len(), "Recursive reference to compound in progress");
        let placeholder = self.compound.push(CompoundNode::Recursive(key.clone()));
        *slot = Some(placeholder);
        Some(placeholder)
    }

    /// Consumes the merger and returns the finished graph.
    pub fn finish(self) -> CompoundGraph {
        self.compound
    }

    fn build(&mut self, group: Vec<SingularId>) -> Result<CompoundNode> {
        let graph = self.graph;

        if group.iter().all(|id| graph.is_leaf(*id)) {
            if group.iter().all(|id| graph.enum_constants(*id).is_some()) {
                return self.enumerate(group);
            }
            let types: BTreeSet<TypeName> =
                group.iter().map(|id| graph.type_of(*id).clone()).collect();
            return Ok(CompoundNode::TypedLeaf {
                ty: self.reconciler.reconcile(&types),
                singulars: group,
            });
        }

        let leaves: Vec<SingularId> = group
            .iter()
            .copied()
            .filter(|id| graph.is_leaf(*id))
            .collect();
        let mut properties = IndexMap::new();
        if !leaves.is_empty() {
            let expansion = self.merge(&leaves)?;
            properties.insert(
                EXPANSION.to_string(),
                CompoundProperty {
                    schema: expansion,
                    cardinality: Cardinality::Optional,
                },
            );
        }

        let names: IndexSet<&'a str> = group
            .iter()
            .filter_map(|id| graph.branch(*id))
            .flat_map(|branch| branch.properties.keys().map(String::as_str))
            .collect();
        let start = if leaves.is_empty() {
            Cardinality::Single
        } else {
            Cardinality::Optional
        };
        for name in names {
            let children: Vec<SingularId> = group
                .iter()
                .filter_map(|id| graph.property(*id, name))
                .map(|property| property.schema)
                .collect();
            let cardinality = group.iter().fold(start, |cardinality, id| {
                cardinality.merge(
                    graph
                        .property(*id, name)
                        .map_or(Cardinality::Optional, |property| property.cardinality),
                )
            });
            let schema = self.merge(&children)?;
            properties.insert(
                name.to_string(),
                CompoundProperty {
                    schema,
                    cardinality,
                },
            );
        }

        Ok(CompoundNode::Branch {
            properties,
            singulars: group,
        })
    }

    fn enumerate(&self, group: Vec<SingularId>) -> Result<CompoundNode> {
        let graph = self.graph;
        let mut constants = EnumConstants::new();
        for id in &group {
            let ty = graph.type_of(*id);
            let mut claimed: HashMap<String, &str> = HashMap::new();
            for constant in graph.enum_constants(*id).unwrap_or_default() {
                let name = (self.enum_namer)(ty, constant);
                if let Some(first) = claimed.get(&name) {
                    return Err(StructuralError::EnumCollision {
                        ty: ty.clone(),
                        name,
                        first: first.to_string(),
                        second: constant.clone(),
                    });
                }
                claimed.insert(name.clone(), constant);
                constants
                    .entry(name)
                    .or_default()
                    .insert(ty.clone(), constant.clone());
            }
        }
        Ok(CompoundNode::EnumeratedLeaf {
            constants,
            singulars: group,
        })
    }
}

/// Merges `roots` into a fresh compound graph and returns it with the id
/// of the root position.
pub fn merge_singulars(
    graph: &SingularGraph,
    reconciler: &dyn TypeReconciler,
    enum_namer: &EnumNamer<'_>,
    pipeline: &Pipeline<'_>,
    roots: &[SingularId],
) -> Result<(CompoundGraph, CompoundId)> {
    let mut merger = CompoundMerger::new(graph, reconciler, enum_namer, pipeline);
    let root = merger.merge(roots)?;
    Ok((merger.finish(), root))
}
