//! Naming strategies for structures, templates and projections.
//!
//! A [`NamingStrategy`] proposes names; it receives a `reserved` predicate so
//! it can avoid names that earlier structures already claimed. Strategies
//! compose through [`DecoratingNamingStrategy`].
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeSet;
//! use structural_type_core::{DecoratingNamingStrategy, NamingStrategy, SimpleNamingStrategy, TypeName};
//!
//! let naming = DecoratingNamingStrategy::with_duplication_resolution(
//!     SimpleNamingStrategy::new("generated"),
//! );
//! let types = BTreeSet::from([TypeName::new("v1.Invoice"), TypeName::new("v2.Invoice")]);
//! let taken = |name: &str| name == "generated.Invoice";
//! assert_eq!(naming.structure(&types, false, &taken), "generated.Invoice0");
//! ```

use std::collections::BTreeSet;

use regex::Regex;

use crate::TypeName;

/// Predicate telling whether a name is already reserved.
pub type Reserved<'r> = dyn Fn(&str) -> bool + 'r;

/// Proposes names for the identities of a compound graph.
pub trait NamingStrategy {
    /// Names the structure merged from `types`.
    fn structure(&self, types: &BTreeSet<TypeName>, enumeration: bool, reserved: &Reserved<'_>) -> String;

    /// Names the projection of `structure` onto one contributing type.
    /// `expansion` is set when the contributor is a leaf held by the
    /// expansion property.
    fn projection(
        &self,
        structure: &str,
        ty: &TypeName,
        expansion: bool,
        reserved: &Reserved<'_>,
    ) -> String;

    /// Names the template of `structure`.
    fn template(&self, structure: &str, reserved: &Reserved<'_>) -> String;
}

impl<N: NamingStrategy + ?Sized> NamingStrategy for Box<N> {
    fn structure(&self, types: &BTreeSet<TypeName>, enumeration: bool, reserved: &Reserved<'_>) -> String {
        (**self).structure(types, enumeration, reserved)
    }

    fn projection(
        &self,
        structure: &str,
        ty: &TypeName,
        expansion: bool,
        reserved: &Reserved<'_>,
    ) -> String {
        (**self).projection(structure, ty, expansion, reserved)
    }

    fn template(&self, structure: &str, reserved: &Reserved<'_>) -> String {
        (**self).template(structure, reserved)
    }
}

/// Joins the sorted, distinct simple names of the contributors under an
/// optional namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleNamingStrategy {
    namespace: Option<String>,
}

impl SimpleNamingStrategy {
    /// Places every structure in `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: (!namespace.is_empty()).then_some(namespace),
        }
    }

    fn qualify(&self, simple: &str) -> String {
        match &self.namespace {
            Some(namespace) => format!("{namespace}.{simple}"),
            None => simple.to_string(),
        }
    }
}

impl NamingStrategy for SimpleNamingStrategy {
    fn structure(&self, types: &BTreeSet<TypeName>, enumeration: bool, _reserved: &Reserved<'_>) -> String {
        let simple: BTreeSet<&str> = types.iter().map(TypeName::simple_name).collect();
        let mut joined: String = simple.into_iter().collect();
        if joined.is_empty() {
            joined.push_str(if enumeration { "Enumeration" } else { "Structure" });
        }
        self.qualify(&joined)
    }

    fn projection(
        &self,
        structure: &str,
        ty: &TypeName,
        expansion: bool,
        _reserved: &Reserved<'_>,
    ) -> String {
        let infix = if expansion { "Of" } else { "As" };
        format!("{structure}{infix}{}", ty.simple_name())
    }

    fn template(&self, structure: &str, _reserved: &Reserved<'_>) -> String {
        format!("{structure}Template")
    }
}

type Decorator = dyn Fn(String, &Reserved<'_>) -> String;

/// Rewrites every name produced by a delegate strategy.
pub struct DecoratingNamingStrategy {
    delegate: Box<dyn NamingStrategy>,
    decorator: Box<Decorator>,
}

impl DecoratingNamingStrategy {
    /// Applies `decorator` to every name `delegate` produces.
    pub fn new(
        delegate: impl NamingStrategy + 'static,
        decorator: impl Fn(String, &Reserved<'_>) -> String + 'static,
    ) -> Self {
        Self {
            delegate: Box::new(delegate),
            decorator: Box::new(decorator),
        }
    }

    /// Appends `0`, `1`, ... to a proposed name until it is not reserved.
    pub fn with_duplication_resolution(delegate: impl NamingStrategy + 'static) -> Self {
        Self::new(delegate, |name, reserved| {
            let mut candidate = name.clone();
            let mut index = 0usize;
            while reserved(candidate.as_str()) {
                candidate = format!("{name}{index}");
                index += 1;
            }
            candidate
        })
    }

    /// Rewrites names that fully match one of `replacements`' patterns.
    ///
    /// Patterns apply in order, each to the output of the previous one;
    /// replacements may refer to capture groups (`$1`, `${name}`).
    ///
    /// # Errors
    ///
    /// Returns the regex error of the first pattern that does not compile.
    pub fn with_replacements<P, R>(
        delegate: impl NamingStrategy + 'static,
        replacements: impl IntoIterator<Item = (P, R)>,
    ) -> Result<Self, regex::Error>
    where
        P: AsRef<str>,
        R: Into<String>,
    {
        let rules = replacements
            .into_iter()
            .map(|(pattern, replacement)| {
                Regex::new(&format!("^(?:{})$", pattern.as_ref()))
                    .map(|regex| (regex, replacement.into()))
            })
            .collect::<Result<Vec<(Regex, String)>, _>>()?;
        Ok(Self::new(delegate, move |name, _| {
            rules.iter().fold(name, |name, (regex, replacement)| {
                if regex.is_match(&name) {
                    regex.replace(&name, replacement.as_str()).into_owned()
                } else {
                    name
                }
            })
        }))
    }
}

impl NamingStrategy for DecoratingNamingStrategy {
    fn structure(&self, types: &BTreeSet<TypeName>, enumeration: bool, reserved: &Reserved<'_>) -> String {
        (self.decorator)(self.delegate.structure(types, enumeration, reserved), reserved)
    }

    fn projection(
        &self,
        structure: &str,
        ty: &TypeName,
        expansion: bool,
        reserved: &Reserved<'_>,
    ) -> String {
        (self.decorator)(
            self.delegate.projection(structure, ty, expansion, reserved),
            reserved,
        )
    }

    fn template(&self, structure: &str, reserved: &Reserved<'_>) -> String {
        (self.decorator)(self.delegate.template(structure, reserved), reserved)
    }
}
