//! Union detection and discriminator resolution.
//!
//! A union is a `OneOf2..OneOf4<...>` type expression whose argument count
//! matches its declared arity. Alternatives keep their declared order.
//!
//! Discriminator resolution runs in three tiers:
//!
//! 1. an explicit property override (on the field or the alias) wins outright
//! 2. otherwise, if every alternative is a known record that declares a
//!    `discriminator_value` or exposes the zero-argument marker method, the
//!    default property is used and each alternative contributes a value
//! 3. otherwise no discriminator is emitted
//!
//! Values for tier 2 come from the explicit annotation, then the literal the
//! marker method returns, then (legacy) a `discriminator: value` line in the
//! marker's docs, and finally (legacy, warned) the snake_cased type name.

use crate::case::to_snake_case;
use crate::catalog::{Catalog, TypeDefinition};
use crate::config::GeneratorConfig;
use crate::type_expr::TypeExpr;
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A resolved or unresolved union.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionDescriptor {
    /// 2, 3 or 4
    pub arity: usize,
    /// Alternatives in declared order
    pub alternatives: Vec<TypeExpr>,
    pub discriminator: Option<Discriminator>,
    /// Whether the discriminator property came from an explicit override
    pub explicit: bool,
}

/// A discriminator property and its value mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discriminator {
    pub property_name: String,
    /// Discriminator value to schema reference
    pub mapping: BTreeMap<String, String>,
}

impl UnionDescriptor {
    /// Detects a union type expression.
    ///
    /// `prefix` is the choice-construct name without its arity (`OneOf`).
    /// `OneOf2<A, B, C>` is not a union: the arity must match the arguments.
    pub fn detect(expr: &TypeExpr, prefix: &str) -> Option<Self> {
        let TypeExpr::Parametric { base, args } = expr.unwrap_transparent() else {
            return None;
        };
        let arity: usize = base.strip_prefix(prefix)?.parse().ok()?;
        if !(2..=4).contains(&arity) || args.len() != arity {
            return None;
        }

        Some(Self {
            arity,
            alternatives: args.clone(),
            discriminator: None,
            explicit: false,
        })
    }

    /// Detects a union from type expression text such as
    /// `OneOf3<Card, Vec<Bank>, Option<Cash>>`.
    pub fn detect_str(text: &str, prefix: &str) -> Option<Self> {
        Self::detect(&TypeExpr::parse(text)?, prefix)
    }
}

/// The named type behind an alternative, looking through `Option` and
/// smart pointers. Sequence alternatives have no single name.
pub fn alternative_name(expr: &TypeExpr) -> Option<&str> {
    expr.unwrap_optional().0.named()
}

/// Resolves discriminators and checks alternatives against the catalog.
pub struct UnionEngine<'a> {
    catalog: &'a Catalog,
    marker: &'a str,
    default_property: &'a str,
}

impl<'a> UnionEngine<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a GeneratorConfig) -> Self {
        Self {
            catalog,
            marker: &config.marker_method,
            default_property: &config.discriminator_property,
        }
    }

    /// Returns a copy of `union` with its discriminator resolved.
    ///
    /// `explicit_property` is the field- or alias-level override, if any.
    pub fn resolve(&self, union: &UnionDescriptor, explicit_property: Option<&str>) -> UnionDescriptor {
        let mut resolved = union.clone();
        let records: Vec<Option<TypeDefinition>> = union
            .alternatives
            .iter()
            .map(|alt| {
                alternative_name(alt)
                    .and_then(|name| self.catalog.type_def(name))
                    .filter(TypeDefinition::is_record)
            })
            .collect();

        if let Some(property) = explicit_property.filter(|p| !p.is_empty()) {
            debug!("Using explicit discriminator property {}", property);
            let mapping = records
                .iter()
                .flatten()
                .filter_map(|def| self.declared_value(def).map(|v| (v, schema_ref(&def.name))))
                .collect();
            resolved.discriminator = Some(Discriminator {
                property_name: property.to_string(),
                mapping,
            });
            resolved.explicit = true;
            return resolved;
        }

        let all_marked = records
            .iter()
            .all(|def| def.as_ref().is_some_and(|def| self.is_marked(def)));
        if !all_marked {
            resolved.discriminator = None;
            resolved.explicit = false;
            return resolved;
        }

        let mapping = records
            .iter()
            .flatten()
            .map(|def| (self.discriminator_value(def), schema_ref(&def.name)))
            .collect();
        resolved.discriminator = Some(Discriminator {
            property_name: self.default_property.to_string(),
            mapping,
        });
        resolved.explicit = false;
        resolved
    }

    /// Advisory warnings for alternatives whose wire fields are a strict
    /// subset of another alternative's.
    pub fn subset_warnings(&self, alias: &str, union: &UnionDescriptor) -> Vec<String> {
        let field_sets: Vec<(String, BTreeSet<String>)> = union
            .alternatives
            .iter()
            .filter_map(alternative_name)
            .filter_map(|name| {
                let def = self.catalog.type_def(name).filter(TypeDefinition::is_record)?;
                Some((name.to_string(), self.wire_fields(&def, &mut HashSet::new())))
            })
            .collect();

        let mut warnings = Vec::new();
        for (i, (a_name, a_fields)) in field_sets.iter().enumerate() {
            for (j, (b_name, b_fields)) in field_sets.iter().enumerate() {
                if i == j || a_fields.len() >= b_fields.len() || !a_fields.is_subset(b_fields) {
                    continue;
                }
                let message = format!(
                    "union {}: every wire field of {} also appears in {}; add a discriminator or list {} before {}",
                    alias, a_name, b_name, b_name, a_name
                );
                warn!("{}", message);
                warnings.push(message);
            }
        }
        warnings
    }

    /// Wire field names of a record, including flattened types.
    fn wire_fields(&self, def: &TypeDefinition, visited: &mut HashSet<String>) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        if !visited.insert(def.name.clone()) {
            return fields;
        }
        for field in &def.fields {
            if field.is_wire() {
                fields.insert(field.wire_name.clone());
            }
        }
        for embedded in &def.embedded {
            if let Some(inner) = embedded.named().and_then(|n| self.catalog.type_def(n)) {
                fields.extend(self.wire_fields(&inner, visited));
            }
        }
        fields
    }

    fn is_marked(&self, def: &TypeDefinition) -> bool {
        def.discriminator_value.is_some() || self.marker_operation(def).is_some()
    }

    fn marker_operation<'d>(&self, def: &'d TypeDefinition) -> Option<&'d crate::catalog::DeclaredOperation> {
        def.operation(self.marker).filter(|op| op.arg_count == 0)
    }

    /// The explicit annotation or the marker's literal, without fallbacks.
    fn declared_value(&self, def: &TypeDefinition) -> Option<String> {
        def.discriminator_value.clone().or_else(|| {
            self.marker_operation(def)
                .and_then(|op| op.returned_literal.clone())
        })
    }

    fn discriminator_value(&self, def: &TypeDefinition) -> String {
        if let Some(value) = self.declared_value(def) {
            return value;
        }

        let docs = self
            .marker_operation(def)
            .and_then(|op| op.doc.as_deref())
            .into_iter()
            .chain(def.doc.as_deref());
        for doc in docs {
            if let Some(value) = scan_doc_value(doc) {
                debug!("Discriminator value for {} taken from docs: {}", def.name, value);
                return value;
            }
        }

        let fallback = to_snake_case(&def.name);
        warn!(
            "No discriminator value declared for {}; falling back to {:?}. Add #[api(discriminator_value = \"...\")] to make it explicit",
            def.name, fallback
        );
        fallback
    }
}

/// Legacy lookup of `discriminator: value` in doc text.
fn scan_doc_value(doc: &str) -> Option<String> {
    doc.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if !key.trim().eq_ignore_ascii_case("discriminator") {
            return None;
        }
        let value = value
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.');
        (!value.is_empty()).then(|| value.to_string())
    })
}

pub fn schema_ref(name: &str) -> String {
    format!("#/components/schemas/{}", name)
}
