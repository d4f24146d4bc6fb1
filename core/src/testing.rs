//! In-memory introspector for unit tests.

use std::collections::{HashMap, HashSet};

use crate::{DeclaredType, Introspector, TypeName};

#[derive(Debug, Clone)]
pub(crate) struct Decl {
    name: String,
    declared: DeclaredType,
    arguments: Vec<TypeName>,
    required: bool,
}

impl Decl {
    pub(crate) fn required(name: &str, ty: &str) -> Self {
        Self {
            name: name.into(),
            declared: DeclaredType::Value(TypeName::new(ty)),
            arguments: Vec::new(),
            required: true,
        }
    }

    pub(crate) fn optional(name: &str, ty: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    pub(crate) fn list(name: &str, arguments: &[&str]) -> Self {
        Self {
            name: name.into(),
            declared: DeclaredType::List,
            arguments: arguments.iter().map(|a| TypeName::new(*a)).collect(),
            required: false,
        }
    }

    pub(crate) fn container(name: &str, kind: &str) -> Self {
        Self {
            name: name.into(),
            declared: DeclaredType::Container(kind.into()),
            arguments: Vec::new(),
            required: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeIntrospector {
    branches: HashMap<TypeName, Vec<Decl>>,
    primitives: HashSet<TypeName>,
    enums: HashMap<TypeName, Vec<String>>,
    supers: HashMap<TypeName, TypeName>,
    subs: HashMap<TypeName, Vec<TypeName>>,
}

impl FakeIntrospector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn branch(mut self, name: &str, decls: Vec<Decl>) -> Self {
        self.branches.insert(TypeName::new(name), decls);
        self
    }

    pub(crate) fn primitive(mut self, name: &str) -> Self {
        self.primitives.insert(TypeName::new(name));
        self
    }

    pub(crate) fn enumeration(mut self, name: &str, constants: &[&str]) -> Self {
        self.enums.insert(
            TypeName::new(name),
            constants.iter().map(|c| c.to_string()).collect(),
        );
        self
    }

    pub(crate) fn supertype(mut self, name: &str, super_type: &str) -> Self {
        self.supers
            .insert(TypeName::new(name), TypeName::new(super_type));
        self
    }

    pub(crate) fn subtypes(mut self, name: &str, sub_types: &[&str]) -> Self {
        self.subs.insert(
            TypeName::new(name),
            sub_types.iter().map(|s| TypeName::new(*s)).collect(),
        );
        self
    }
}

impl Introspector for FakeIntrospector {
    type Property = Decl;

    fn is_branch(&self, ty: &TypeName) -> bool {
        self.branches.contains_key(ty)
    }

    fn is_primitive(&self, ty: &TypeName) -> bool {
        self.primitives.contains(ty)
    }

    fn enum_constants(&self, ty: &TypeName) -> Option<Vec<String>> {
        self.enums.get(ty).cloned()
    }

    fn properties(&self, ty: &TypeName) -> Vec<Decl> {
        self.branches.get(ty).cloned().unwrap_or_default()
    }

    fn name(&self, property: &Decl) -> String {
        property.name.clone()
    }

    fn declared_type(&self, property: &Decl) -> DeclaredType {
        property.declared.clone()
    }

    fn element_types(&self, property: &Decl) -> Vec<TypeName> {
        property.arguments.clone()
    }

    fn is_required(&self, property: &Decl) -> bool {
        property.required
    }

    fn super_type(&self, ty: &TypeName) -> Option<TypeName> {
        self.supers.get(ty).cloned()
    }

    fn sub_types(&self, ty: &TypeName) -> Vec<TypeName> {
        self.subs.get(ty).cloned().unwrap_or_default()
    }
}
