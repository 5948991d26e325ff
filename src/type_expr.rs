//! Type expression model.
//!
//! Every type that flows through the pipeline (field types, handler request
//! and response types, aliased types, union alternatives) is parsed once into
//! a [`TypeExpr`]. Schema generation, constraint mapping and union detection
//! all match on this closed set instead of re-inspecting `syn` nodes or raw
//! strings.

use std::fmt;

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    /// A plain named type such as `String`, `u32` or `User`
    Named(String),
    /// `Option<T>`: a nullable slot
    Optional(Box<TypeExpr>),
    /// `Vec<T>`, `[T]`, `[T; N]` and the set collections
    Sequence(Box<TypeExpr>),
    /// `HashMap<K, V>`, `BTreeMap<K, V>`
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
    },
    /// Any other generic type, e.g. `OneOf2<A, B>`, `Box<T>` or `Page<T>`
    Parametric { base: String, args: Vec<TypeExpr> },
}

/// Primitive types with a direct schema representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    String,
    Int32,
    Int64,
    Float,
    Double,
    Bool,
    Uuid,
    DateTime,
    Date,
    Decimal,
    /// `serde_json::Value` and friends: any JSON value
    Any,
}

impl PrimitiveType {
    /// The schema `type` keyword, `None` for [`PrimitiveType::Any`]
    pub fn schema_type(&self) -> Option<&'static str> {
        match self {
            PrimitiveType::String
            | PrimitiveType::Uuid
            | PrimitiveType::DateTime
            | PrimitiveType::Date
            | PrimitiveType::Decimal => Some("string"),
            PrimitiveType::Int32 | PrimitiveType::Int64 => Some("integer"),
            PrimitiveType::Float | PrimitiveType::Double => Some("number"),
            PrimitiveType::Bool => Some("boolean"),
            PrimitiveType::Any => None,
        }
    }

    /// The schema `format` keyword, if any
    pub fn format(&self) -> Option<&'static str> {
        match self {
            PrimitiveType::Int32 => Some("int32"),
            PrimitiveType::Int64 => Some("int64"),
            PrimitiveType::Float => Some("float"),
            PrimitiveType::Double => Some("double"),
            PrimitiveType::Uuid => Some("uuid"),
            PrimitiveType::DateTime => Some("date-time"),
            PrimitiveType::Date => Some("date"),
            PrimitiveType::Decimal => Some("decimal"),
            _ => None,
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" | "str" | "char" => Some(PrimitiveType::String),
            "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => Some(PrimitiveType::Int32),
            "i64" | "i128" | "isize" | "u64" | "u128" | "usize" => Some(PrimitiveType::Int64),
            "f32" => Some(PrimitiveType::Float),
            "f64" => Some(PrimitiveType::Double),
            "bool" => Some(PrimitiveType::Bool),
            "Uuid" => Some(PrimitiveType::Uuid),
            "DateTime" | "NaiveDateTime" | "OffsetDateTime" | "PrimitiveDateTime" | "SystemTime" => {
                Some(PrimitiveType::DateTime)
            }
            "NaiveDate" | "Date" => Some(PrimitiveType::Date),
            "Decimal" | "BigDecimal" => Some(PrimitiveType::Decimal),
            "Value" | "JsonValue" => Some(PrimitiveType::Any),
            _ => None,
        }
    }
}

/// Wrappers that are transparent on the wire.
const TRANSPARENT_WRAPPERS: &[&str] = &["Box", "Arc", "Rc", "Cow", "Json", "RefCell", "Cell"];

impl TypeExpr {
    /// Builds a type expression from a `syn` type.
    pub fn from_syn(ty: &syn::Type) -> TypeExpr {
        match ty {
            syn::Type::Path(type_path) => Self::from_path(&type_path.path),
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Slice(slice) => TypeExpr::Sequence(Box::new(Self::from_syn(&slice.elem))),
            syn::Type::Array(array) => TypeExpr::Sequence(Box::new(Self::from_syn(&array.elem))),
            syn::Type::Paren(paren) => Self::from_syn(&paren.elem),
            syn::Type::Group(group) => Self::from_syn(&group.elem),
            syn::Type::Tuple(tuple) if tuple.elems.is_empty() => TypeExpr::Named("()".to_string()),
            syn::Type::Tuple(tuple) => TypeExpr::Parametric {
                base: "Tuple".to_string(),
                args: tuple.elems.iter().map(Self::from_syn).collect(),
            },
            _ => TypeExpr::Named("unknown".to_string()),
        }
    }

    fn from_path(path: &syn::Path) -> TypeExpr {
        let Some(segment) = path.segments.last() else {
            return TypeExpr::Named("unknown".to_string());
        };

        let base = segment.ident.to_string();
        let args: Vec<TypeExpr> = match &segment.arguments {
            syn::PathArguments::AngleBracketed(angle) => angle
                .args
                .iter()
                .filter_map(|arg| match arg {
                    syn::GenericArgument::Type(ty) => Some(Self::from_syn(ty)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Self::classify(base, args)
    }

    /// Parses a type expression from source text, e.g. `OneOf2<Card, Box<Bank>>`.
    ///
    /// Generic arguments are split on top-level commas only, so nested
    /// arguments such as `HashMap<String, Vec<u8>>` stay intact. Returns `None`
    /// for text that is not a type expression.
    pub fn parse(text: &str) -> Option<TypeExpr> {
        let mut text = text.trim();

        if let Some(rest) = text.strip_prefix('&') {
            text = rest.trim_start();
            if text.starts_with('\'') {
                let end = text.find(char::is_whitespace)?;
                text = text[end..].trim_start();
            }
            if let Some(rest) = text.strip_prefix("mut ") {
                text = rest.trim_start();
            }
        }

        if text.is_empty() {
            return None;
        }

        if text == "()" {
            return Some(TypeExpr::Named("()".to_string()));
        }

        if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            let element = split_top_level(inner, ';').into_iter().next()?;
            return Some(TypeExpr::Sequence(Box::new(Self::parse(element)?)));
        }

        match find_top_level(text, '<') {
            Some(open) => {
                let inner = text[open + 1..].strip_suffix('>')?;
                let base = last_segment(&text[..open])?;
                let args = split_top_level(inner, ',')
                    .into_iter()
                    .filter(|arg| !arg.trim_start().starts_with('\''))
                    .map(Self::parse)
                    .collect::<Option<Vec<_>>>()?;
                Some(Self::classify(base, args))
            }
            None => Some(TypeExpr::Named(last_segment(text)?)),
        }
    }

    fn classify(base: String, mut args: Vec<TypeExpr>) -> TypeExpr {
        match (base.as_str(), args.len()) {
            ("Option", 1) => TypeExpr::Optional(Box::new(args.remove(0))),
            ("Vec" | "VecDeque" | "LinkedList" | "HashSet" | "BTreeSet" | "IndexSet", 1) => {
                TypeExpr::Sequence(Box::new(args.remove(0)))
            }
            ("HashMap" | "BTreeMap" | "IndexMap", 2) => {
                let value = args.remove(1);
                let key = args.remove(0);
                TypeExpr::Map {
                    key: Box::new(key),
                    value: Box::new(value),
                }
            }
            (_, 0) => TypeExpr::Named(base),
            _ => TypeExpr::Parametric { base, args },
        }
    }

    /// Strips wire-transparent wrappers (`Box`, `Arc`, `Json`, ...).
    pub fn unwrap_transparent(&self) -> &TypeExpr {
        match self {
            TypeExpr::Parametric { base, args }
                if args.len() == 1 && TRANSPARENT_WRAPPERS.contains(&base.as_str()) =>
            {
                args[0].unwrap_transparent()
            }
            other => other,
        }
    }

    /// Strips transparent wrappers and one level of `Option`, reporting
    /// whether the slot was optional.
    pub fn unwrap_optional(&self) -> (&TypeExpr, bool) {
        match self.unwrap_transparent() {
            TypeExpr::Optional(inner) => (inner.unwrap_transparent(), true),
            other => (other, false),
        }
    }

    /// The primitive this expression denotes, if it is one.
    pub fn primitive(&self) -> Option<PrimitiveType> {
        match self.unwrap_transparent() {
            TypeExpr::Named(name) => PrimitiveType::from_name(name),
            // chrono's `DateTime<Utc>`
            TypeExpr::Parametric { base, .. } => PrimitiveType::from_name(base),
            _ => None,
        }
    }

    /// The name of a named (non-generic) type after unwrapping transparent wrappers.
    pub fn named(&self) -> Option<&str> {
        match self.unwrap_transparent() {
            TypeExpr::Named(name) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Whether this is the unit type `()`.
    pub fn is_unit(&self) -> bool {
        matches!(self, TypeExpr::Named(name) if name == "()")
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Named(name) => write!(f, "{}", name),
            TypeExpr::Optional(inner) => write!(f, "Option<{}>", inner),
            TypeExpr::Sequence(inner) => write!(f, "Vec<{}>", inner),
            TypeExpr::Map { key, value } => write!(f, "HashMap<{}, {}>", key, value),
            TypeExpr::Parametric { base, args } => {
                write!(f, "{}<", base)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
        }
    }
}

/// Splits `text` on `sep` wherever the bracket depth (`<>`, `[]`, `()`) is zero.
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        match ch {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(text[start..idx].trim());
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() || !parts.is_empty() {
        parts.push(tail);
    }
    parts
}

fn find_top_level(text: &str, target: char) -> Option<usize> {
    let mut depth = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            c if c == target && depth == 0 => return Some(idx),
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn last_segment(path: &str) -> Option<String> {
    let segment = path.rsplit("::").next()?.trim();
    let valid = !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_');
    valid.then(|| segment.to_string())
}
