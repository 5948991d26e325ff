//! Validation directive interpreter.
//!
//! A directive is a small constraint language attached to a field, e.g.
//! `required,email,max=255` or `omitempty,min=1,dive,uuid`. Tokens are
//! separated by top-level commas (commas inside parentheses do not split) and
//! are either a bare `name` or `name=value`. A `|` at depth zero splits the
//! directive into alternative groups; each group is mapped into its own
//! sub-schema and the groups are combined as `anyOf`.
//!
//! Whether a field is required is decided separately by [`is_required`].

use crate::schema::Schema;
use crate::type_expr::{PrimitiveType, TypeExpr};
use log::debug;
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use thiserror::Error;

pub const ALPHA_PATTERN: &str = "^[a-zA-Z]+$";
pub const ALPHANUM_PATTERN: &str = "^[a-zA-Z0-9]+$";
pub const ALPHA_UNICODE_PATTERN: &str = r"^[\p{L}]+$";
pub const ALPHANUM_UNICODE_PATTERN: &str = r"^[\p{L}\p{N}]+$";
pub const NUMERIC_PATTERN: &str = r"^[-+]?[0-9]+(?:\.[0-9]+)?$";
pub const NUMBER_PATTERN: &str = "^[0-9]+$";
pub const HEXADECIMAL_PATTERN: &str = "^(0[xX])?[0-9a-fA-F]+$";
pub const HEXCOLOR_PATTERN: &str = "^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{4}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$";
pub const RGB_PATTERN: &str = r"^rgb\(\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*\)$";
pub const RGBA_PATTERN: &str =
    r"^rgba\(\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*,\s*\d{1,3}%?\s*,\s*(?:0|1|0?\.\d+)\s*\)$";
pub const HSL_PATTERN: &str = r"^hsl\(\s*\d{1,3}\s*,\s*\d{1,3}%\s*,\s*\d{1,3}%\s*\)$";
pub const HSLA_PATTERN: &str =
    r"^hsla\(\s*\d{1,3}\s*,\s*\d{1,3}%\s*,\s*\d{1,3}%\s*,\s*(?:0|1|0?\.\d+)\s*\)$";
pub const MAC_PATTERN: &str = "^(?:[0-9A-Fa-f]{2}[:-]){5}[0-9A-Fa-f]{2}$";
pub const E164_PATTERN: &str = r"^\+[1-9]?[0-9]{7,14}$";
pub const LOWERCASE_PATTERN: &str = "^[^A-Z]*$";
pub const UPPERCASE_PATTERN: &str = "^[^a-z]*$";
pub const ASCII_PATTERN: &str = r"^[\x00-\x7F]*$";
pub const JWT_PATTERN: &str = r"^[A-Za-z0-9-_]+\.[A-Za-z0-9-_]+\.[A-Za-z0-9-_]*$";

/// Tokens that only affect presence.
const PRESENCE_TOKENS: &[&str] = &["required", "omitempty", "omitnil", "isdefault"];

/// Cross-field and conditional tokens, rendered as text.
const RELATIONAL_TOKENS: &[(&str, &str)] = &[
    ("eqfield", "must equal field"),
    ("nefield", "must not equal field"),
    ("gtfield", "must be greater than field"),
    ("gtefield", "must be greater than or equal to field"),
    ("ltfield", "must be less than field"),
    ("ltefield", "must be less than or equal to field"),
    ("eqcsfield", "must equal field"),
    ("necsfield", "must not equal field"),
    ("fieldcontains", "must contain the value of field"),
    ("fieldexcludes", "must not contain the value of field"),
    ("required_if", "required if"),
    ("required_unless", "required unless"),
    ("required_with", "required when present:"),
    ("required_with_all", "required when all present:"),
    ("required_without", "required when absent:"),
    ("required_without_all", "required when all absent:"),
    ("excluded_if", "excluded if"),
    ("excluded_unless", "excluded unless"),
    ("excluded_with", "excluded when present:"),
    ("excluded_without", "excluded when absent:"),
];

/// The JSON shape of the value a directive constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl WireType {
    /// The wire type of a type expression, looking through `Option` and
    /// smart pointers. Named types outside the primitive set are objects.
    pub fn of(expr: &TypeExpr) -> Self {
        let (inner, _) = expr.unwrap_optional();
        match inner {
            TypeExpr::Sequence(_) => WireType::Array,
            TypeExpr::Map { .. } => WireType::Object,
            other => match other.primitive() {
                Some(PrimitiveType::Int32 | PrimitiveType::Int64) => WireType::Integer,
                Some(PrimitiveType::Float | PrimitiveType::Double) => WireType::Number,
                Some(PrimitiveType::Bool) => WireType::Boolean,
                Some(PrimitiveType::Any) | None => WireType::Object,
                Some(_) => WireType::String,
            },
        }
    }

    /// The wire type a generated schema describes (by its `type` keyword).
    pub fn from_schema(schema: &Schema) -> Self {
        match schema.schema_type.as_deref() {
            Some("string") => WireType::String,
            Some("integer") => WireType::Integer,
            Some("number") => WireType::Number,
            Some("boolean") => WireType::Boolean,
            Some("array") => WireType::Array,
            _ => WireType::Object,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, WireType::Integer | WireType::Number)
    }
}

/// Issues found while applying one directive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid validation directive: {}", .issues.join("; "))]
pub struct DirectiveError {
    pub issues: Vec<String>,
}

/// Interprets validation directives into schema constraints.
#[derive(Debug, Clone, Default)]
pub struct ConstraintMapper {
    custom: BTreeMap<String, String>,
}

impl ConstraintMapper {
    /// A mapper that also understands caller-registered directives, rendered
    /// as their description.
    pub fn new(custom: BTreeMap<String, String>) -> Self {
        Self { custom }
    }

    pub fn register(&mut self, name: &str, description: &str) {
        self.custom.insert(name.to_string(), description.to_string());
    }

    /// Applies `directive` to `schema` in place.
    ///
    /// Every token is processed even when some fail; the failures are
    /// returned together.
    pub fn apply(
        &self,
        directive: &str,
        schema: &mut Schema,
        wire: WireType,
    ) -> Result<(), DirectiveError> {
        let mut issues = Vec::new();
        let groups = split_depth_zero(directive, '|');

        if groups.len() > 1 {
            let mut alternatives = Vec::with_capacity(groups.len());
            for group in groups {
                let mut sub = Schema::default();
                self.apply_tokens(&tokens(group), &mut sub, wire, &mut issues);
                alternatives.push(sub);
            }
            schema.any_of = Some(alternatives);
        } else {
            self.apply_tokens(&tokens(directive), schema, wire, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(DirectiveError { issues })
        }
    }

    fn apply_tokens(
        &self,
        tokens: &[Token<'_>],
        schema: &mut Schema,
        wire: WireType,
        issues: &mut Vec<String>,
    ) {
        for (idx, token) in tokens.iter().enumerate() {
            if token.name == "dive" {
                let target = match wire {
                    WireType::Object => &mut schema.additional_properties,
                    _ => &mut schema.items,
                };
                let target = target.get_or_insert_with(Box::default);
                let item_wire = WireType::from_schema(target);
                self.apply_tokens(&tokens[idx + 1..], target, item_wire, issues);
                return;
            }
            if let Err(issue) = self.apply_token(token, schema, wire) {
                issues.push(issue);
            }
        }
    }

    fn apply_token(&self, token: &Token<'_>, schema: &mut Schema, wire: WireType) -> Result<(), String> {
        let name = token.name;
        match name {
            "" => {}
            n if PRESENCE_TOKENS.contains(&n) => {}

            "email" => set_format(schema, "email"),
            "url" | "uri" | "http_url" => set_format(schema, "uri"),
            "uuid" | "uuid3" | "uuid4" | "uuid5" => set_format(schema, "uuid"),
            "datetime" => match token.value {
                Some("2006-01-02") => set_format(schema, "date"),
                _ => set_format(schema, "date-time"),
            },
            "ip" | "ip_addr" => set_format(schema, "ip"),
            "ipv4" | "ip4_addr" => set_format(schema, "ipv4"),
            "ipv6" | "ip6_addr" => set_format(schema, "ipv6"),
            "hostname" | "hostname_rfc1123" | "fqdn" => set_format(schema, "hostname"),
            "base64" | "base64url" => set_format(schema, "byte"),
            "cidr" => set_format(schema, "cidr"),
            "cidrv4" => set_format(schema, "cidrv4"),
            "cidrv6" => set_format(schema, "cidrv6"),

            "alpha" => add_pattern(schema, ALPHA_PATTERN),
            "alphanum" => add_pattern(schema, ALPHANUM_PATTERN),
            "alphaunicode" => add_pattern(schema, ALPHA_UNICODE_PATTERN),
            "alphanumunicode" => add_pattern(schema, ALPHANUM_UNICODE_PATTERN),
            "numeric" => add_pattern(schema, NUMERIC_PATTERN),
            "number" => add_pattern(schema, NUMBER_PATTERN),
            "hexadecimal" => add_pattern(schema, HEXADECIMAL_PATTERN),
            "hexcolor" => add_pattern(schema, HEXCOLOR_PATTERN),
            "rgb" => add_pattern(schema, RGB_PATTERN),
            "rgba" => add_pattern(schema, RGBA_PATTERN),
            "hsl" => add_pattern(schema, HSL_PATTERN),
            "hsla" => add_pattern(schema, HSLA_PATTERN),
            "mac" => add_pattern(schema, MAC_PATTERN),
            "e164" => add_pattern(schema, E164_PATTERN),
            "lowercase" => add_pattern(schema, LOWERCASE_PATTERN),
            "uppercase" => add_pattern(schema, UPPERCASE_PATTERN),
            "ascii" | "printascii" => add_pattern(schema, ASCII_PATTERN),
            "jwt" => add_pattern(schema, JWT_PATTERN),

            "min" | "gte" => apply_lower(schema, wire, token.require_value()?, false)?,
            "max" | "lte" => apply_upper(schema, wire, token.require_value()?, false)?,
            "gt" => apply_lower(schema, wire, token.require_value()?, true)?,
            "lt" => apply_upper(schema, wire, token.require_value()?, true)?,
            "len" => {
                let value = token.require_value()?;
                apply_lower(schema, wire, value, false)?;
                apply_upper(schema, wire, value, false)?;
            }

            "oneof" => {
                let values = split_oneof(token.require_value()?)
                    .into_iter()
                    .map(|v| enum_value(v, wire))
                    .collect::<Result<Vec<_>, _>>()?;
                schema.enum_values = Some(values);
            }
            "eq" => schema.enum_values = Some(vec![enum_value(token.require_value()?, wire)?]),
            "ne" => schema.append_description(&format!("must not equal {}", token.require_value()?)),

            "contains" => add_pattern(schema, &regex_escape(token.require_value()?)),
            "excludes" => add_pattern(schema, &format!("^(?!.*{}).*$", regex_escape(token.require_value()?))),
            "startswith" => add_pattern(schema, &format!("^{}", regex_escape(token.require_value()?))),
            "endswith" => add_pattern(schema, &format!("{}$", regex_escape(token.require_value()?))),

            "latitude" => set_range(schema, -90, 90),
            "longitude" => set_range(schema, -180, 180),
            "unique" => match wire {
                WireType::Array => schema.unique_items = true,
                _ => schema.append_description("values must be unique"),
            },
            "boolean" => match wire {
                WireType::String => schema.append_description("must be a boolean value (true or false)"),
                _ => schema.schema_type = Some("boolean".to_string()),
            },

            n => {
                if let Some((_, phrase)) = RELATIONAL_TOKENS.iter().find(|(t, _)| *t == n) {
                    match token.value {
                        Some(value) => schema.append_description(&format!("{} {}", phrase, value)),
                        None => return Err(format!("`{}` requires a value", n)),
                    }
                } else if let Some(description) = self.custom.get(n) {
                    schema.append_description(description);
                } else {
                    debug!("Ignoring unknown validation token {}", n);
                }
            }
        }
        Ok(())
    }
}

/// Required iff the directive has `required` and not `omitempty`.
pub fn is_required(directive: &str) -> bool {
    let names: Vec<&str> = split_depth_zero(directive, '|')
        .into_iter()
        .flat_map(tokens)
        .map(|t| t.name)
        .collect();
    names.contains(&"required") && !names.contains(&"omitempty")
}

/// Escapes regex metacharacters so `value` matches literally.
///
/// Only syntax characters are escaped; ECMA-262 unicode mode rejects
/// identity escapes such as `\-`.
pub fn regex_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if r"\.+*?()|[]{}^$".contains(ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

impl<'a> Token<'a> {
    fn require_value(&self) -> Result<&'a str, String> {
        self.value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| format!("`{}` requires a value", self.name))
    }
}

fn tokens(group: &str) -> Vec<Token<'_>> {
    split_depth_zero(group, ',')
        .into_iter()
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((name, value)) => Token {
                name: name.trim(),
                value: Some(value.trim()),
            },
            None => Token {
                name: t,
                value: None,
            },
        })
        .collect()
}

/// Splits on `sep` outside parentheses.
fn split_depth_zero(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(text[start..idx].trim());
                start = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(text[start..].trim());
    parts
}

/// `oneof=red green 'light blue'`
fn split_oneof(value: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut rest = value.trim();
    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('\'') {
            let end = quoted.find('\'').unwrap_or(quoted.len());
            values.push(&quoted[..end]);
            rest = quoted.get(end + 1..).unwrap_or("").trim_start();
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            values.push(&rest[..end]);
            rest = rest[end..].trim_start();
        }
    }
    values
}

fn enum_value(value: &str, wire: WireType) -> Result<Value, String> {
    if wire.is_numeric() {
        parse_number(value).map(Value::Number)
    } else {
        Ok(Value::String(value.to_string()))
    }
}

fn parse_number(value: &str) -> Result<Number, String> {
    if let Ok(int) = value.parse::<i64>() {
        return Ok(Number::from(int));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(|| format!("`{}` is not a number", value))
}

fn parse_length(value: &str) -> Result<u64, String> {
    value
        .parse::<u64>()
        .map_err(|_| format!("`{}` is not a non-negative integer length", value))
}

fn apply_lower(schema: &mut Schema, wire: WireType, value: &str, exclusive: bool) -> Result<(), String> {
    match wire {
        WireType::String => {
            let length = parse_length(value)?;
            schema.min_length = Some(if exclusive { length + 1 } else { length });
        }
        WireType::Array => {
            let length = parse_length(value)?;
            schema.min_items = Some(if exclusive { length + 1 } else { length });
        }
        _ => {
            schema.minimum = Some(parse_number(value)?);
            schema.exclusive_minimum = exclusive;
        }
    }
    Ok(())
}

fn apply_upper(schema: &mut Schema, wire: WireType, value: &str, exclusive: bool) -> Result<(), String> {
    match wire {
        WireType::String => {
            let length = parse_length(value)?;
            schema.max_length = Some(if exclusive { length.saturating_sub(1) } else { length });
        }
        WireType::Array => {
            let length = parse_length(value)?;
            schema.max_items = Some(if exclusive { length.saturating_sub(1) } else { length });
        }
        _ => {
            schema.maximum = Some(parse_number(value)?);
            schema.exclusive_maximum = exclusive;
        }
    }
    Ok(())
}

fn set_range(schema: &mut Schema, min: i64, max: i64) {
    schema.minimum = Some(Number::from(min));
    schema.maximum = Some(Number::from(max));
}

fn set_format(schema: &mut Schema, format: &str) {
    schema.format = Some(format.to_string());
}

/// Sets the pattern; a second pattern is added under `allOf`.
fn add_pattern(schema: &mut Schema, pattern: &str) {
    if schema.pattern.is_none() {
        schema.pattern = Some(pattern.to_string());
        return;
    }
    schema.all_of.get_or_insert_with(Vec::new).push(Schema {
        pattern: Some(pattern.to_string()),
        ..Schema::default()
    });
}
