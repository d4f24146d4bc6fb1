//! Normalization of the schemas contributing to one compound position.
//!
//! Before a group of singular schemas is merged, it runs through a
//! [`Pipeline`] of [`Normalizer`] stages. Each stage receives the raw
//! contributor list of the position as context and returns the rewritten
//! group; later stages see the output of earlier ones. The pipeline always
//! starts with [`DefaultNormalizer`].

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, SingularGraph, SingularId, StructuralError, TypeName};

/// Maps an enum constant of a type to its unified name.
pub type EnumNamer<'a> = dyn Fn(&TypeName, &str) -> String + 'a;

/// Maps a type to a grouping key; types sharing a key are collapsed.
pub type KeyResolver<'a> = dyn Fn(&TypeName) -> Option<String> + 'a;

/// A rewrite of the contributor group at one compound position.
pub trait Normalizer {
    /// Rewrites `group`. `context` is the unnormalized contributor list of
    /// the position in input order; `group` preserves that relative order.
    fn normalize(
        &self,
        graph: &SingularGraph,
        context: &[SingularId],
        group: Vec<SingularId>,
    ) -> Result<Vec<SingularId>>;
}

/// How unrelated sibling branches with coinciding shapes are handled by
/// [`IntersectingNormalizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPolicy {
    /// Merge siblings like any other contributors.
    #[default]
    Merge,
    /// Fail when two unrelated branches share exactly the same property
    /// names, or declare a shared property as a leaf in one and a branch in
    /// the other.
    Reject,
}

/// Removes duplicate schemas, keeping the first occurrence.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNormalizer;

impl Normalizer for DefaultNormalizer {
    fn normalize(
        &self,
        graph: &SingularGraph,
        _context: &[SingularId],
        group: Vec<SingularId>,
    ) -> Result<Vec<SingularId>> {
        let mut distinct: Vec<SingularId> = Vec::with_capacity(group.len());
        for id in group {
            let id = graph.resolve(id);
            if !distinct.contains(&id) {
                distinct.push(id);
            }
        }
        Ok(distinct)
    }
}

/// Drops branch schemas whose subtype is also part of the group.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntersectingNormalizer {
    policy: SiblingPolicy,
}

impl IntersectingNormalizer {
    /// Creates the normalizer with the given sibling policy.
    pub fn new(policy: SiblingPolicy) -> Self {
        Self { policy }
    }

    fn check_siblings(&self, graph: &SingularGraph, group: &[SingularId]) -> Result<()> {
        let branches: Vec<_> = group
            .iter()
            .filter_map(|id| graph.branch(*id).map(|branch| (*id, branch)))
            .collect();
        for (index, (_, left)) in branches.iter().enumerate() {
            for (_, right) in &branches[index + 1..] {
                let left_names: BTreeSet<&String> = left.properties.keys().collect();
                let right_names: BTreeSet<&String> = right.properties.keys().collect();
                if !left_names.is_empty() && left_names == right_names {
                    return Err(StructuralError::AmbiguousMerge {
                        left: left.ty.clone(),
                        right: right.ty.clone(),
                        detail: "siblings declare identical property names".into(),
                    });
                }
                for name in left_names.intersection(&right_names) {
                    let left_leaf = graph.is_leaf(left.properties[*name].schema);
                    let right_leaf = graph.is_leaf(right.properties[*name].schema);
                    if left_leaf != right_leaf {
                        return Err(StructuralError::AmbiguousMerge {
                            left: left.ty.clone(),
                            right: right.ty.clone(),
                            detail: format!("property {name} is a leaf in one and a branch in the other"),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl Normalizer for IntersectingNormalizer {
    fn normalize(
        &self,
        graph: &SingularGraph,
        _context: &[SingularId],
        group: Vec<SingularId>,
    ) -> Result<Vec<SingularId>> {
        let specific: Vec<SingularId> = group
            .iter()
            .copied()
            .filter(|candidate| {
                let subsumed = group
                    .iter()
                    .any(|other| other != candidate && graph.is_subtype_of(*other, *candidate));
                if subsumed {
                    debug!(ty = %graph.type_of(*candidate), "Dropping supertype subsumed by subtype");
                }
                !subsumed
            })
            .collect();
        if self.policy == SiblingPolicy::Reject {
            self.check_siblings(graph, &specific)?;
        }
        Ok(specific)
    }
}

/// Collapses enumerations whose constants unify to the same name set.
pub struct EnumeratingNormalizer<'a> {
    namer: &'a EnumNamer<'a>,
}

impl<'a> EnumeratingNormalizer<'a> {
    /// Creates the normalizer using the run's enum namer.
    pub fn new(namer: &'a EnumNamer<'a>) -> Self {
        Self { namer }
    }
}

impl Normalizer for EnumeratingNormalizer<'_> {
    fn normalize(
        &self,
        graph: &SingularGraph,
        context: &[SingularId],
        group: Vec<SingularId>,
    ) -> Result<Vec<SingularId>> {
        Ok(collapse_by(graph, context, group, |id| {
            let constants = graph.enum_constants(id)?;
            let ty = graph.type_of(id);
            let names: BTreeSet<String> = constants
                .iter()
                .map(|constant| (self.namer)(ty, constant))
                .collect();
            Some(names)
        }))
    }
}

/// Collapses schemas whose types share a caller supplied key.
pub struct KeyNormalizer<'a> {
    key: &'a KeyResolver<'a>,
}

impl<'a> KeyNormalizer<'a> {
    /// Creates the normalizer for one key resolver.
    pub fn new(key: &'a KeyResolver<'a>) -> Self {
        Self { key }
    }
}

impl Normalizer for KeyNormalizer<'_> {
    fn normalize(
        &self,
        graph: &SingularGraph,
        context: &[SingularId],
        group: Vec<SingularId>,
    ) -> Result<Vec<SingularId>> {
        Ok(collapse_by(graph, context, group, |id| {
            (self.key)(graph.type_of(id))
        }))
    }
}

/// Replaces every keyed member by the member of its key class that appears
/// first in `context`, then removes the resulting duplicates. Members
/// without a key pass through.
fn collapse_by<K, F>(
    graph: &SingularGraph,
    context: &[SingularId],
    group: Vec<SingularId>,
    key_of: F,
) -> Vec<SingularId>
where
    K: Hash + Eq,
    F: Fn(SingularId) -> Option<K>,
{
    let rank = |id: SingularId| {
        context
            .iter()
            .position(|c| graph.resolve(*c) == id)
            .unwrap_or(usize::MAX)
    };
    let keys: Vec<Option<K>> = group.iter().map(|id| key_of(*id)).collect();
    let mut representatives: HashMap<&K, SingularId> = HashMap::new();
    for (id, key) in group.iter().zip(&keys) {
        if let Some(key) = key {
            representatives
                .entry(key)
                .and_modify(|current| {
                    if rank(*id) < rank(*current) {
                        *current = *id;
                    }
                })
                .or_insert(*id);
        }
    }

    let mut collapsed: Vec<SingularId> = Vec::with_capacity(group.len());
    for (id, key) in group.iter().zip(&keys) {
        let chosen = key
            .as_ref()
            .and_then(|key| representatives.get(key).copied())
            .unwrap_or(*id);
        if !collapsed.contains(&chosen) {
            collapsed.push(chosen);
        }
    }
    collapsed
}

/// Ordered composition of normalizers, starting with [`DefaultNormalizer`].
pub struct Pipeline<'a> {
    stages: Vec<Box<dyn Normalizer + 'a>>,
}

impl Default for Pipeline<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline that only removes duplicates.
    pub fn new() -> Self {
        Self {
            stages: vec![Box::new(DefaultNormalizer)],
        }
    }

    /// Appends a stage.
    pub fn then(mut self, stage: impl Normalizer + 'a) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages, the default one included.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always `false`: the default stage is never removed.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every stage over the contributors of one position.
    ///
    /// # Errors
    ///
    /// Propagates the first stage failure, and returns
    /// [`StructuralError::EmptyPosition`] if a stage leaves nothing to merge.
    pub fn apply(&self, graph: &SingularGraph, context: &[SingularId]) -> Result<Vec<SingularId>> {
        let mut group = context.to_vec();
        for stage in &self.stages {
            group = stage.normalize(graph, context, group)?;
        }
        if group.is_empty() && !context.is_empty() {
            let types: Vec<String> = context
                .iter()
                .map(|id| graph.type_of(*id).to_string())
                .collect();
            return Err(StructuralError::EmptyPosition(format!(
                "normalization removed every contributor of [{}]",
                types.join(", ")
            )));
        }
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Decl, FakeIntrospector};
    use crate::{SchemaResolver, TypeName};

    fn graph_of(model: &FakeIntrospector, types: &[&str]) -> (SingularGraph, Vec<SingularId>) {
        let mut resolver = SchemaResolver::new(model);
        let ids = types
            .iter()
            .map(|ty| resolver.resolve(&TypeName::new(*ty)).unwrap())
            .collect();
        (resolver.finish(), ids)
    }

    fn names(graph: &SingularGraph, ids: &[SingularId]) -> Vec<String> {
        ids.iter().map(|id| graph.type_of(*id).to_string()).collect()
    }

    fn hierarchy() -> FakeIntrospector {
        FakeIntrospector::new()
            .branch("Party", vec![Decl::optional("id", "String")])
            .branch(
                "Person",
                vec![Decl::optional("id", "String"), Decl::optional("name", "String")],
            )
            .supertype("Person", "Party")
            .branch(
                "Company",
                vec![Decl::optional("id", "String"), Decl::optional("name", "String")],
            )
    }

    #[test]
    fn test_default_removes_duplicates() {
        let model = hierarchy();
        let (graph, ids) = graph_of(&model, &["Person", "Company", "Person"]);
        let out = Pipeline::new().apply(&graph, &ids).unwrap();
        assert_eq!(names(&graph, &out), vec!["Person", "Company"]);
    }

    #[test]
    fn test_intersecting_keeps_subtype() {
        let model = hierarchy();
        let (graph, ids) = graph_of(&model, &["Party", "Person"]);
        let pipeline = Pipeline::new().then(IntersectingNormalizer::default());
        let out = pipeline.apply(&graph, &ids).unwrap();
        assert_eq!(names(&graph, &out), vec!["Person"]);
    }

    #[test]
    fn test_sibling_policy_merge_keeps_both() {
        let model = hierarchy();
        let (graph, ids) = graph_of(&model, &["Person", "Company"]);
        let pipeline = Pipeline::new().then(IntersectingNormalizer::new(SiblingPolicy::Merge));
        assert_eq!(pipeline.apply(&graph, &ids).unwrap().len(), 2);
    }

    #[test]
    fn test_sibling_policy_reject_flags_identical_siblings() {
        let model = hierarchy();
        let (graph, ids) = graph_of(&model, &["Person", "Company"]);
        let pipeline = Pipeline::new().then(IntersectingNormalizer::new(SiblingPolicy::Reject));
        let err = pipeline.apply(&graph, &ids).unwrap_err();
        assert!(matches!(err, StructuralError::AmbiguousMerge { .. }));
    }

    #[test]
    fn test_sibling_policy_reject_flags_shape_conflict() {
        let model = FakeIntrospector::new()
            .branch(
                "Letter",
                vec![Decl::optional("to", "String"), Decl::optional("stamp", "String")],
            )
            .branch("Parcel", vec![Decl::optional("to", "Address")])
            .branch("Address", vec![Decl::optional("street", "String")]);
        let (graph, ids) = graph_of(&model, &["Letter", "Parcel"]);
        let pipeline = Pipeline::new().then(IntersectingNormalizer::new(SiblingPolicy::Reject));
        let err = pipeline.apply(&graph, &ids).unwrap_err();
        assert!(err.to_string().contains("property to"));
    }

    #[test]
    fn test_enumerating_collapses_equivalent_enums() {
        let model = FakeIntrospector::new()
            .enumeration("ColorA", &["RED", "GREEN"])
            .enumeration("ColorB", &["GREEN", "RED"])
            .enumeration("Size", &["S", "M"]);
        let (graph, ids) = graph_of(&model, &["ColorB", "Size", "ColorA"]);
        let namer = |_: &TypeName, constant: &str| constant.to_string();
        let pipeline = Pipeline::new().then(EnumeratingNormalizer::new(&namer));
        let out = pipeline.apply(&graph, &ids).unwrap();
        assert_eq!(names(&graph, &out), vec!["ColorB", "Size"]);
    }

    #[test]
    fn test_key_normalizer_prefers_first_in_context() {
        let model = FakeIntrospector::new()
            .branch("v1.Item", vec![Decl::optional("sku", "String")])
            .branch("v2.Item", vec![Decl::optional("sku", "String")]);
        let (graph, ids) = graph_of(&model, &["v1.Item", "v2.Item"]);
        let key = |ty: &TypeName| Some(ty.simple_name().to_string());
        let pipeline = Pipeline::new().then(KeyNormalizer::new(&key));

        let reversed: Vec<_> = ids.iter().rev().copied().collect();
        let out = pipeline.apply(&graph, &reversed).unwrap();
        assert_eq!(names(&graph, &out), vec!["v2.Item"]);
        let out = pipeline.apply(&graph, &ids).unwrap();
        assert_eq!(names(&graph, &out), vec!["v1.Item"]);
    }

    #[test]
    fn test_pipeline_rejects_emptied_position() {
        struct DropAll;
        impl Normalizer for DropAll {
            fn normalize(
                &self,
                _: &SingularGraph,
                _: &[SingularId],
                _: Vec<SingularId>,
            ) -> Result<Vec<SingularId>> {
                Ok(Vec::new())
            }
        }
        let model = hierarchy();
        let (graph, ids) = graph_of(&model, &["Party"]);
        let err = Pipeline::new().then(DropAll).apply(&graph, &ids).unwrap_err();
        assert!(matches!(err, StructuralError::EmptyPosition(_)));
    }
}
