//! Singular schemas: the property tree of one input type.
//!
//! [`SchemaResolver`] walks an [`Introspector`] depth-first and records every
//! reachable type exactly once in a [`SingularGraph`] arena. A type that is
//! referenced while it is still being resolved (a cycle, directly or through
//! inheritance edges) becomes a [`SingularNode::Recursive`] placeholder that
//! names the type, one per type however often it is met; it is bound to the finished node through the graph's
//! type index once the enclosing branch completes.
//!
//! # Examples
//!
//! ```
//! use structural_type_core::{Cardinality, SchemaResolver, TypeName};
//! # use structural_type_core::{DeclaredType, Introspector};
//! # struct Tree;
//! # impl Introspector for Tree {
//! #     type Property = &'static str;
//! #     fn is_branch(&self, ty: &TypeName) -> bool { ty.as_str() == "Node" }
//! #     fn is_primitive(&self, _: &TypeName) -> bool { false }
//! #     fn enum_constants(&self, _: &TypeName) -> Option<Vec<String>> { None }
//! #     fn properties(&self, _: &TypeName) -> Vec<&'static str> { vec!["label", "parent"] }
//! #     fn name(&self, p: &&'static str) -> String { p.to_string() }
//! #     fn declared_type(&self, p: &&'static str) -> DeclaredType {
//! #         DeclaredType::Value(TypeName::new(if *p == "label" { "String" } else { "Node" }))
//! #     }
//! #     fn element_types(&self, _: &&'static str) -> Vec<TypeName> { Vec::new() }
//! #     fn is_required(&self, p: &&'static str) -> bool { *p == "label" }
//! #     fn super_type(&self, _: &TypeName) -> Option<TypeName> { None }
//! #     fn sub_types(&self, _: &TypeName) -> Vec<TypeName> { Vec::new() }
//! # }
//!
//! let mut resolver = SchemaResolver::new(&Tree);
//! let node = resolver.resolve(&TypeName::new("Node")).unwrap();
//! let graph = resolver.finish();
//!
//! let branch = graph.branch(node).unwrap();
//! assert_eq!(branch.properties["label"].cardinality, Cardinality::Single);
//! // `parent` closes the cycle back onto `Node`.
//! assert_eq!(graph.resolve(branch.properties["parent"].schema), node);
//! assert_eq!(graph.placeholder_count(), 1);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::debug;

use crate::{Cardinality, DeclaredType, Introspector, Result, StructuralError, TypeName};

/// Predicate deciding whether a property of a declaring type is kept.
pub type PropertyFilter<'a> = dyn Fn(&TypeName, &str) -> bool + 'a;

/// Resolver for an alternative key of a property (or enum constant).
pub type AliasResolver<'a> = dyn Fn(&TypeName, &str) -> Option<String> + 'a;

/// Index of a node in a [`SingularGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SingularId(usize);

impl SingularId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Classification of a terminal schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafKind {
    /// A scalar value.
    Scalar {
        /// Primitives can never be absent.
        primitive: bool,
    },
    /// An enumeration with constants in declaration order.
    Enumeration {
        /// Constant names.
        constants: Vec<String>,
    },
}

/// A terminal schema wrapping a scalar or enumeration type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingularLeaf {
    /// Underlying type.
    pub ty: TypeName,
    /// Scalar or enumeration.
    pub kind: LeafKind,
}

/// A named, cardinality-tagged child of a singular branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingularProperty {
    /// Schema of the property value.
    pub schema: SingularId,
    /// How many values the property holds.
    pub cardinality: Cardinality,
    /// Name reported by the introspector, before alias resolution.
    pub original_name: String,
}

/// A structured schema with properties and inheritance edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingularBranch {
    /// Underlying type.
    pub ty: TypeName,
    /// Properties in introspection order.
    pub properties: IndexMap<String, SingularProperty>,
    /// Schema of the reported supertype.
    pub super_schema: Option<SingularId>,
    /// Schemas of the reported subtypes.
    pub sub_schemas: Vec<SingularId>,
}

/// A node of the singular arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SingularNode {
    /// Scalar or enumeration.
    Leaf(SingularLeaf),
    /// Structured type.
    Branch(SingularBranch),
    /// Forward reference to a type that was in progress when referenced.
    Recursive(TypeName),
}

/// Arena of singular schemas produced by one resolution run.
///
/// Schemas are immutable once the resolver finishes; ids are only meaningful
/// for the graph that issued them.
#[derive(Debug, Clone, Default)]
pub struct SingularGraph {
    nodes: Vec<SingularNode>,
    by_type: HashMap<TypeName, SingularId>,
}

impl SingularGraph {
    /// Follows a recursive placeholder to the node it stands for.
    ///
    /// Non-placeholder ids are returned unchanged.
    pub fn resolve(&self, id: SingularId) -> SingularId {
        match &self.nodes[id.0] {
            SingularNode::Recursive(ty) => self.by_type.get(ty).copied().unwrap_or(id),
            _ => id,
        }
    }

    /// Returns the node behind `id`, following placeholders.
    pub fn node(&self, id: SingularId) -> &SingularNode {
        &self.nodes[self.resolve(id).0]
    }

    /// Returns the schema resolved for `ty`, if any.
    pub fn lookup(&self, ty: &str) -> Option<SingularId> {
        self.by_type.get(ty).copied()
    }

    /// Returns the underlying type of a schema.
    pub fn type_of(&self, id: SingularId) -> &TypeName {
        match self.node(id) {
            SingularNode::Leaf(leaf) => &leaf.ty,
            SingularNode::Branch(branch) => &branch.ty,
            SingularNode::Recursive(ty) => ty,
        }
    }

    /// Returns `true` if the schema is terminal.
    pub fn is_leaf(&self, id: SingularId) -> bool {
        matches!(self.node(id), SingularNode::Leaf(_))
    }

    /// Returns the constants of an enumeration leaf.
    pub fn enum_constants(&self, id: SingularId) -> Option<&[String]> {
        match self.node(id) {
            SingularNode::Leaf(SingularLeaf {
                kind: LeafKind::Enumeration { constants },
                ..
            }) => Some(constants),
            _ => None,
        }
    }

    /// Returns the branch behind `id`, if it is one.
    pub fn branch(&self, id: SingularId) -> Option<&SingularBranch> {
        match self.node(id) {
            SingularNode::Branch(branch) => Some(branch),
            _ => None,
        }
    }

    /// Returns the property `name` of a branch.
    pub fn property(&self, id: SingularId, name: &str) -> Option<&SingularProperty> {
        self.branch(id).and_then(|branch| branch.properties.get(name))
    }

    /// Returns `true` if `ancestor` is reachable from `id` over super edges.
    pub fn is_subtype_of(&self, id: SingularId, ancestor: SingularId) -> bool {
        let ancestor = self.resolve(ancestor);
        let mut seen = HashSet::new();
        let mut current = self.branch(id).and_then(|branch| branch.super_schema);
        while let Some(next) = current {
            let next = self.resolve(next);
            if next == ancestor {
                return true;
            }
            if !seen.insert(next) {
                return false;
            }
            current = self.branch(next).and_then(|branch| branch.super_schema);
        }
        false
    }

    /// Collects property `name` from `id` and every schema reachable over
    /// its super and sub edges, breadth-first, visiting each schema once.
    pub fn lineage_properties(&self, id: SingularId, name: &str) -> Vec<&SingularProperty> {
        let start = self.resolve(id);
        let mut queue = VecDeque::from([start]);
        let mut checked = HashSet::from([start]);
        let mut properties = Vec::new();
        while let Some(current) = queue.pop_front() {
            let Some(branch) = self.branch(current) else {
                continue;
            };
            if let Some(property) = branch.properties.get(name) {
                properties.push(property);
            }
            let edges = branch.super_schema.iter().chain(&branch.sub_schemas);
            for edge in edges {
                let edge = self.resolve(*edge);
                if checked.insert(edge) {
                    queue.push_back(edge);
                }
            }
        }
        properties
    }

    /// Number of arena nodes, placeholders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing was resolved.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of recursive placeholders in the arena.
    pub fn placeholder_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, SingularNode::Recursive(_)))
            .count()
    }

    /// Iterates all arena entries, placeholders included.
    pub fn iter(&self) -> impl Iterator<Item = (SingularId, &SingularNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (SingularId(index), node))
    }

    fn push(&mut self, node: SingularNode) -> SingularId {
        self.nodes.push(node);
        SingularId(self.nodes.len() - 1)
    }
}

/// Builds singular schemas from an [`Introspector`].
///
/// One resolver owns one memo; schemas resolved through the same resolver
/// share nodes for shared types.
pub struct SchemaResolver<'a, I: Introspector> {
    introspector: &'a I,
    filter: &'a PropertyFilter<'a>,
    alias: &'a AliasResolver<'a>,
    in_progress: HashMap<TypeName, Option<SingularId>>,
    graph: SingularGraph,
}

fn keep_all(_: &TypeName, _: &str) -> bool {
    true
}

fn no_alias(_: &TypeName, _: &str) -> Option<String> {
    None
}

impl<'a, I: Introspector> SchemaResolver<'a, I> {
    /// Creates a resolver that keeps every property under its own name.
    pub fn new(introspector: &'a I) -> Self {
        Self {
            introspector,
            filter: &keep_all,
            alias: &no_alias,
            in_progress: HashMap::new(),
            graph: SingularGraph::default(),
        }
    }

    /// Suppresses properties for which `filter(declaring type, name)` is false.
    pub fn with_filter(mut self, filter: &'a PropertyFilter<'a>) -> Self {
        self.filter = filter;
        self
    }

    /// Stores properties under `alias(declaring type, name)` when it returns
    /// a name.
    pub fn with_alias(mut self, alias: &'a AliasResolver<'a>) -> Self {
        self.alias = alias;
        self
    }

    /// Resolves each distinct type of `types` in order.
    pub fn resolve_all(&mut self, types: &[TypeName]) -> Result<Vec<SingularId>> {
        let mut roots: Vec<SingularId> = Vec::with_capacity(types.len());
        for ty in types {
            let id = self.resolve(ty)?;
            if !roots.contains(&id) {
                roots.push(id);
            }
        }
        Ok(roots)
    }

    /// Resolves the schema of `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::MalformedProperty`] for a list property
    /// without exactly one element type and
    /// [`StructuralError::UnsupportedContainer`] for any non-list container.
    pub fn resolve(&mut self, ty: &TypeName) -> Result<SingularId> {
        if let Some(id) = self.graph.by_type.get(ty) {
            return Ok(*id);
        }
        if let Some(slot) = self.in_progress.get_mut(ty) {
            if let Some(placeholder) = slot {
                return Ok(*placeholder);
            }
            debug!(ty = %ty, "Recursive reference to type in progress");
            let placeholder = self.graph.push(SingularNode::Recursive(ty.clone()));
            *slot = Some(placeholder);
            return Ok(placeholder);
        }

        let introspector = self.introspector;
        let node = if let Some(constants) = introspector.enum_constants(ty) {
            SingularNode::Leaf(SingularLeaf {
                ty: ty.clone(),
                kind: LeafKind::Enumeration { constants },
            })
        } else if introspector.is_primitive(ty) || !introspector.is_branch(ty) {
            SingularNode::Leaf(SingularLeaf {
                ty: ty.clone(),
                kind: LeafKind::Scalar {
                    primitive: introspector.is_primitive(ty),
                },
            })
        } else {
            self.in_progress.insert(ty.clone(), None);
            let branch = self.resolve_branch(ty);
            self.in_progress.remove(ty);
            SingularNode::Branch(branch?)
        };

        let id = self.graph.push(node);
        self.graph.by_type.insert(ty.clone(), id);
        debug!(ty = %ty, leaf = self.graph.is_leaf(id), "Resolved singular schema");
        Ok(id)
    }

    /// Consumes the resolver and returns the finished graph.
    pub fn finish(self) -> SingularGraph {
        self.graph
    }

    fn resolve_branch(&mut self, ty: &TypeName) -> Result<SingularBranch> {
        let introspector = self.introspector;
        let mut properties = IndexMap::new();
        for property in introspector.properties(ty) {
            let name = introspector.name(&property);
            if !(self.filter)(ty, &name) {
                continue;
            }
            let key = (self.alias)(ty, &name).unwrap_or_else(|| name.clone());
            if properties.contains_key(&key) {
                debug!(ty = %ty, property = %name, "Dropping duplicate property");
                continue;
            }

            let (target, cardinality) = match introspector.declared_type(&property) {
                DeclaredType::List => {
                    let mut arguments = introspector.element_types(&property);
                    if arguments.len() != 1 {
                        return Err(StructuralError::MalformedProperty {
                            ty: ty.clone(),
                            property: name,
                            reason: format!(
                                "expected exactly one list element type, found {}",
                                arguments.len()
                            ),
                        });
                    }
                    (arguments.remove(0), Cardinality::List)
                }
                DeclaredType::Container(container) => {
                    return Err(StructuralError::UnsupportedContainer {
                        ty: ty.clone(),
                        property: name,
                        container,
                    });
                }
                DeclaredType::Value(target) => {
                    let cardinality = if introspector.is_primitive(&target)
                        || introspector.is_required(&property)
                    {
                        Cardinality::Single
                    } else {
                        Cardinality::Optional
                    };
                    (target, cardinality)
                }
            };

            let schema = self.resolve(&target)?;
            properties.insert(
                key,
                SingularProperty {
                    schema,
                    cardinality,
                    original_name: name,
                },
            );
        }

        let super_schema = match introspector.super_type(ty) {
            Some(super_type) => Some(self.resolve(&super_type)?),
            None => None,
        };
        let sub_schemas = introspector
            .sub_types(ty)
            .iter()
            .map(|sub_type| self.resolve(sub_type))
            .collect::<Result<Vec<_>>>()?;

        Ok(SingularBranch {
            ty: ty.clone(),
            properties,
            super_schema,
            sub_schemas,
        })
    }
}
