use crate::catalog::{AliasKind, Catalog, FieldDescriptor, ParamLocation, TypeDefinition};
use crate::config::GeneratorConfig;
use crate::constraints::{ConstraintMapper, WireType};
use crate::schema::{DiscriminatorObject, Schema};
use crate::type_expr::{PrimitiveType, TypeExpr};
use crate::union::{UnionDescriptor, UnionEngine};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Schema generator - converts catalog types to OpenAPI schemas
///
/// Generated component schemas are memoized in a registry keyed by type
/// name. A slot is marked in progress before a type's fields are visited, so
/// a type that refers back to itself (directly or through other types) gets a
/// plain `$ref` instead of being generated again.
pub struct SchemaGenerator<'a> {
    catalog: &'a Catalog,
    mapper: ConstraintMapper,
    unions: UnionEngine<'a>,
    union_prefix: &'a str,
    subset_warnings: bool,
    registry: BTreeMap<String, Slot>,
    diagnostics: Vec<String>,
    /// Unions already checked for subset alternatives
    checked_unions: HashSet<String>,
}

#[derive(Debug, Clone)]
enum Slot {
    InProgress,
    Ready(Schema),
}

impl<'a> SchemaGenerator<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a GeneratorConfig) -> Self {
        debug!("Initializing SchemaGenerator");
        Self {
            catalog,
            mapper: ConstraintMapper::new(config.custom_directives.clone()),
            unions: UnionEngine::new(catalog, config),
            union_prefix: &config.union_prefix,
            subset_warnings: config.subset_warnings,
            registry: BTreeMap::new(),
            diagnostics: Vec::new(),
            checked_unions: HashSet::new(),
        }
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// The schema for a type expression.
    ///
    /// Catalog types are referenced by `$ref` and generated on demand;
    /// primitives, sequences and maps are inlined. Unknown named types
    /// become a bare `object`.
    pub fn schema_for(&mut self, expr: &TypeExpr) -> Schema {
        let expr = expr.unwrap_transparent();

        if let Some(union) = UnionDescriptor::detect(expr, self.union_prefix) {
            let resolved = self.unions.resolve(&union, None);
            self.check_subsets(&expr.to_string(), &resolved);
            return self.union_schema(&resolved);
        }

        match expr {
            TypeExpr::Optional(inner) => Schema {
                nullable: true,
                ..self.schema_for(inner)
            },
            TypeExpr::Sequence(inner) => Schema::array(self.schema_for(inner)),
            TypeExpr::Map { value, .. } => Schema {
                additional_properties: Some(Box::new(self.schema_for(value))),
                ..Schema::typed("object")
            },
            TypeExpr::Named(name) if expr.is_unit() => {
                debug!("Unit type {}, using object placeholder", name);
                Schema::typed("object")
            }
            TypeExpr::Named(name) | TypeExpr::Parametric { base: name, .. } => {
                if let Some(primitive) = expr.primitive() {
                    return primitive_schema(primitive);
                }
                if self.catalog.contains_type(name) {
                    self.generate(name);
                    return Schema::reference(name);
                }
                debug!("Unknown type: {}, using object placeholder", name);
                Schema::typed("object")
            }
        }
    }

    /// Generates the component schema for a catalog type, at most once.
    ///
    /// Returns `None` for names outside the catalog and for types whose
    /// generation is still in progress.
    pub fn generate(&mut self, name: &str) -> Option<Schema> {
        match self.registry.get(name) {
            Some(Slot::Ready(schema)) => return Some(schema.clone()),
            Some(Slot::InProgress) => {
                debug!("Schema for {} is in progress, emitting a reference", name);
                return None;
            }
            None => {}
        }

        let def = self.catalog.type_def(name)?;
        debug!("Generating schema for type: {}", name);
        self.registry.insert(name.to_string(), Slot::InProgress);

        let schema = match def.alias_kind {
            AliasKind::None => self.record_schema(&def),
            AliasKind::Simple => self.simple_alias_schema(&def),
            AliasKind::Union => self.union_alias_schema(&def),
        };

        self.registry
            .insert(name.to_string(), Slot::Ready(schema.clone()));
        Some(schema)
    }

    /// All completed component schemas.
    pub fn schemas(&self) -> BTreeMap<String, Schema> {
        self.registry
            .iter()
            .filter_map(|(name, slot)| match slot {
                Slot::Ready(schema) => Some((name.clone(), schema.clone())),
                Slot::InProgress => None,
            })
            .collect()
    }

    /// Advisory warnings collected while generating.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics)
    }

    fn record_schema(&mut self, def: &TypeDefinition) -> Schema {
        if is_alternatives_holder(def) {
            debug!("{} is an alternatives holder", def.name);
            let one_of = def
                .fields
                .iter()
                .map(|field| self.schema_for(field.ty.unwrap_optional().0))
                .collect();
            return Schema {
                description: def.doc.clone(),
                one_of: Some(one_of),
                ..Schema::default()
            };
        }

        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        let mut visited = HashSet::from([def.name.clone()]);
        self.collect_fields(def, &BTreeSet::new(), &mut properties, &mut required, &mut visited);

        Schema {
            description: def.doc.clone(),
            properties: Some(properties),
            required: if required.is_empty() {
                None
            } else {
                Some(required)
            },
            ..Schema::typed("object")
        }
    }

    /// The request body of one operation.
    ///
    /// `claimed` holds wire names of body fields a path placeholder took
    /// over. When there are none this is the request's component reference;
    /// otherwise the record is inlined without those fields.
    pub fn request_body_schema(&mut self, request: &TypeExpr, claimed: &BTreeSet<String>) -> Schema {
        let def = request
            .named()
            .and_then(|name| self.catalog.type_def(name))
            .filter(TypeDefinition::is_record);
        let Some(def) = def.filter(|_| !claimed.is_empty()) else {
            return self.schema_for(request);
        };
        debug!("Inlining {} without path fields {:?}", def.name, claimed);

        let mut properties = BTreeMap::new();
        let mut required = Vec::new();
        let mut visited = HashSet::from([def.name.clone()]);
        self.collect_fields(&def, claimed, &mut properties, &mut required, &mut visited);

        Schema {
            description: def.doc.clone(),
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
            ..Schema::typed("object")
        }
    }

    /// Body fields of `def` and of the types it embeds, minus `excluded`.
    fn collect_fields(
        &mut self,
        def: &TypeDefinition,
        excluded: &BTreeSet<String>,
        properties: &mut BTreeMap<String, Schema>,
        required: &mut Vec<String>,
        visited: &mut HashSet<String>,
    ) {
        for field in &def.fields {
            if !field.is_wire()
                || field.location != ParamLocation::Body
                || excluded.contains(&field.wire_name)
            {
                continue;
            }
            let schema = self.field_schema(field);
            if field.is_required() && !required.contains(&field.wire_name) {
                required.push(field.wire_name.clone());
            }
            properties.insert(field.wire_name.clone(), schema);
        }

        for embedded in &def.embedded {
            let Some(name) = embedded.named() else {
                continue;
            };
            if !visited.insert(name.to_string()) {
                continue;
            }
            match self.catalog.type_def(name).filter(TypeDefinition::is_record) {
                Some(inner) => self.collect_fields(&inner, excluded, properties, required, visited),
                None => debug!("Embedded type {} of {} is not a known record", name, def.name),
            }
        }
    }

    /// The schema of one field, with its directive applied.
    ///
    /// Directive errors are appended to the description as a warning so the
    /// rest of the type is still generated.
    pub fn field_schema(&mut self, field: &FieldDescriptor) -> Schema {
        let mut schema = match field.discriminator.as_deref() {
            Some(property) => match self.union_of(&field.ty) {
                Some(union) => {
                    let resolved = self.unions.resolve(&union, Some(property));
                    self.check_subsets(&field.ty.unwrap_optional().0.to_string(), &resolved);
                    Schema {
                        nullable: field.optional,
                        ..self.union_schema(&resolved)
                    }
                }
                None => {
                    warn!(
                        "Field {} names discriminator {} but is not a union",
                        field.name, property
                    );
                    self.schema_for(&field.ty)
                }
            },
            None => self.schema_for(&field.ty),
        };

        if let Some(doc) = &field.doc {
            schema.append_description(doc);
        }
        schema.deprecated |= field.deprecated;

        if !field.validate.is_empty() {
            if let Err(err) = self
                .mapper
                .apply(&field.validate, &mut schema, self.wire_type(&field.ty))
            {
                warn!("Field {}: {}", field.name, err);
                schema.append_description(&format!("WARNING: {}", err));
            }
        }
        schema
    }

    /// The union behind a field type: inline `OneOfN<..>` or a union alias.
    fn union_of(&self, ty: &TypeExpr) -> Option<UnionDescriptor> {
        let (inner, _) = ty.unwrap_optional();
        if let Some(union) = UnionDescriptor::detect(inner, self.union_prefix) {
            return Some(union);
        }
        self.catalog.type_def(inner.named()?)?.union
    }

    fn simple_alias_schema(&mut self, def: &TypeDefinition) -> Schema {
        let mut schema = match &def.aliased {
            Some(aliased) => self.schema_for(aliased),
            None => Schema::typed("object"),
        };
        if !def.enum_values.is_empty() {
            schema.enum_values = Some(def.enum_values.clone());
        }
        if let Some(doc) = &def.doc {
            schema.append_description(doc);
        }
        schema
    }

    fn union_alias_schema(&mut self, def: &TypeDefinition) -> Schema {
        let Some(union) = &def.union else {
            return Schema::typed("object");
        };
        let resolved = self.unions.resolve(union, def.discriminator_property.as_deref());
        self.check_subsets(&def.name, &resolved);
        Schema {
            description: def.doc.clone(),
            ..self.union_schema(&resolved)
        }
    }

    /// Subset warnings for a union, once per union.
    fn check_subsets(&mut self, label: &str, union: &UnionDescriptor) {
        if self.subset_warnings && self.checked_unions.insert(label.to_string()) {
            self.diagnostics
                .extend(self.unions.subset_warnings(label, union));
        }
    }

    /// The wire type of a field, following simple aliases (including the
    /// string aliases fieldless enums become) to the type they name.
    fn wire_type(&self, ty: &TypeExpr) -> WireType {
        let mut current = ty.unwrap_optional().0.clone();
        let mut seen = HashSet::new();
        loop {
            let aliased = match current.named() {
                Some(name) if current.primitive().is_none() && seen.insert(name.to_string()) => self
                    .catalog
                    .type_def(name)
                    .filter(|def| def.alias_kind == AliasKind::Simple)
                    .and_then(|def| def.aliased),
                _ => None,
            };
            match aliased {
                Some(next) => current = next.unwrap_optional().0.clone(),
                None => return WireType::of(&current),
            }
        }
    }

    fn union_schema(&mut self, union: &UnionDescriptor) -> Schema {
        let one_of = union
            .alternatives
            .iter()
            .map(|alt| self.schema_for(alt))
            .collect();
        Schema {
            one_of: Some(one_of),
            discriminator: union.discriminator.as_ref().map(|d| DiscriminatorObject {
                property_name: d.property_name.clone(),
                mapping: d.mapping.clone(),
            }),
            ..Schema::default()
        }
    }
}

/// Every field optional and off the wire: an untagged set of alternatives.
fn is_alternatives_holder(def: &TypeDefinition) -> bool {
    !def.fields.is_empty() && def.fields.iter().all(|f| f.optional && !f.is_wire())
}

fn primitive_schema(primitive: PrimitiveType) -> Schema {
    Schema {
        schema_type: primitive.schema_type().map(str::to_string),
        format: primitive.format().map(str::to_string),
        ..Schema::default()
    }
}
