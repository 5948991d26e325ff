use crate::type_expr::TypeExpr;
use crate::union::UnionDescriptor;
use log::{debug, warn};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

/// Catalog of extracted type definitions and handler descriptors.
///
/// The catalog is an explicitly owned object: each pipeline creates its own
/// and hands it to the schema generator, so independent pipelines can run side
/// by side in one process. Both tables sit behind a reader-writer lock.
/// Registration takes the write lock; lookups during schema generation share
/// the read lock.
#[derive(Debug, Default)]
pub struct Catalog {
    types: RwLock<HashMap<String, TypeDefinition>>,
    handlers: RwLock<HashMap<String, HandlerDescriptor>>,
}

/// Where a definition was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub line: usize,
}

/// How a type definition aliases another type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasKind {
    /// A record (struct with named fields)
    None,
    /// `type UserId = String;`, or a fieldless enum
    Simple,
    /// `type Payment = OneOf2<Card, BankTransfer>;`
    Union,
}

/// The request location a field is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Body,
}

impl ParamLocation {
    /// Parses an `in = "..."` annotation value.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "path" => Some(ParamLocation::Path),
            "query" => Some(ParamLocation::Query),
            "header" => Some(ParamLocation::Header),
            "body" | "json" => Some(ParamLocation::Body),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Body => "body",
        }
    }
}

/// A single field of a record type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field identifier in source
    pub name: String,
    /// Declared type
    pub ty: TypeExpr,
    /// Name on the wire; empty means the field is not part of the wire body
    pub wire_name: String,
    /// Validation directive, e.g. `required,email,max=255`
    pub validate: String,
    /// Request location (defaults to body)
    pub location: ParamLocation,
    /// Whether `location` came from an explicit `in = ".."` annotation
    pub explicit_location: bool,
    /// Doc comment text
    pub doc: Option<String>,
    /// Whether the declared type is `Option<T>`
    pub optional: bool,
    /// Whether the field is `#[serde(flatten)]`ed into its parent
    pub embedded: bool,
    /// Explicit union discriminator property (`#[api(discriminator = "kind")]`)
    pub discriminator: Option<String>,
    /// `#[deprecated]`
    pub deprecated: bool,
}

impl FieldDescriptor {
    /// A plain body field whose wire name equals its identifier.
    pub fn new(name: &str, ty: TypeExpr) -> Self {
        let optional = matches!(ty.unwrap_transparent(), TypeExpr::Optional(_));
        Self {
            name: name.to_string(),
            ty,
            wire_name: name.to_string(),
            validate: String::new(),
            location: ParamLocation::Body,
            explicit_location: false,
            doc: None,
            optional,
            embedded: false,
            discriminator: None,
            deprecated: false,
        }
    }

    /// Whether the field is part of the wire representation.
    pub fn is_wire(&self) -> bool {
        !self.wire_name.is_empty()
    }

    /// Required iff the directive says `required` and does not say `omitempty`.
    pub fn is_required(&self) -> bool {
        crate::constraints::is_required(&self.validate)
    }
}

/// A method declared in an impl block for a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredOperation {
    pub name: String,
    pub doc: Option<String>,
    /// Number of arguments, not counting `self`
    pub arg_count: usize,
    /// The string literal returned when the body is exactly one literal
    pub returned_literal: Option<String>,
}

/// A type definition: either a record or an alias.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    pub name: String,
    pub namespace: String,
    pub doc: Option<String>,
    pub fields: Vec<FieldDescriptor>,
    /// Types flattened into this record
    pub embedded: Vec<TypeExpr>,
    pub alias_kind: AliasKind,
    pub aliased: Option<TypeExpr>,
    pub union: Option<UnionDescriptor>,
    /// Literal values for constant-backed aliases and fieldless enums
    pub enum_values: Vec<serde_json::Value>,
    /// Explicit discriminator value declared on the type
    pub discriminator_value: Option<String>,
    /// Discriminator property override declared on a union alias
    pub discriminator_property: Option<String>,
    pub operations: Vec<DeclaredOperation>,
    pub location: SourceLocation,
}

impl TypeDefinition {
    /// An empty record definition.
    pub fn record(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            doc: None,
            fields: Vec::new(),
            embedded: Vec::new(),
            alias_kind: AliasKind::None,
            aliased: None,
            union: None,
            enum_values: Vec::new(),
            discriminator_value: None,
            discriminator_property: None,
            operations: Vec::new(),
            location: SourceLocation::default(),
        }
    }

    /// An alias definition of the given kind.
    pub fn alias(name: &str, namespace: &str, kind: AliasKind, aliased: TypeExpr) -> Self {
        Self {
            alias_kind: kind,
            aliased: Some(aliased),
            ..Self::record(name, namespace)
        }
    }

    pub fn is_record(&self) -> bool {
        self.alias_kind == AliasKind::None
    }

    /// Finds a declared operation by name.
    pub fn operation(&self, name: &str) -> Option<&DeclaredOperation> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// A handler function following the `(ctx, request) -> Result<response, error>` convention.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerDescriptor {
    pub name: String,
    pub namespace: String,
    pub doc: Option<String>,
    pub request: TypeExpr,
    /// `None` when the handler returns `Result<(), E>`
    pub response: Option<TypeExpr>,
    pub location: SourceLocation,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type definition. The first registration of a name wins.
    pub fn register_type(&self, def: TypeDefinition) -> bool {
        let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = types.get(&def.name) {
            warn!(
                "Duplicate type {} in {} (keeping the one from {})",
                def.name,
                def.location.file.display(),
                existing.location.file.display()
            );
            return false;
        }
        debug!("Registered type {}", def.name);
        types.insert(def.name.clone(), def);
        true
    }

    /// Registers a handler descriptor. The first registration of a name wins.
    pub fn register_handler(&self, handler: HandlerDescriptor) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&handler.name) {
            warn!("Duplicate handler {} ignored", handler.name);
            return false;
        }
        debug!("Registered handler {}", handler.name);
        handlers.insert(handler.name.clone(), handler);
        true
    }

    /// Looks up a type definition by name.
    pub fn type_def(&self, name: &str) -> Option<TypeDefinition> {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Looks up a handler by name.
    pub fn handler(&self, name: &str) -> Option<HandlerDescriptor> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// All union aliases, sorted by name.
    pub fn union_aliases(&self) -> Vec<TypeDefinition> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        let mut aliases: Vec<TypeDefinition> = types
            .values()
            .filter(|t| t.alias_kind == AliasKind::Union)
            .cloned()
            .collect();
        aliases.sort_by(|a, b| a.name.cmp(&b.name));
        aliases
    }

    pub fn type_count(&self) -> usize {
        self.types.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
