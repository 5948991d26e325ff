//! The schema node shared by the constraint mapper, the schema generator and
//! the document builder.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// OpenAPI schema object.
///
/// Boolean flags are serialized only when true.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Reference to a component schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_minimum: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive_maximum: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique_items: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub write_only: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<DiscriminatorObject>,
}

/// `discriminator: {propertyName, mapping}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscriminatorObject {
    pub property_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mapping: BTreeMap<String, String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Schema {
    /// `{"$ref": "#/components/schemas/<name>"}`
    pub fn reference(name: &str) -> Self {
        Self {
            reference: Some(crate::union::schema_ref(name)),
            ..Self::default()
        }
    }

    /// A schema with only `type` set.
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(schema_type.to_string()),
            ..Self::default()
        }
    }

    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array")
        }
    }

    /// Appends a line to the description.
    pub fn append_description(&mut self, text: &str) {
        match &mut self.description {
            Some(existing) if !existing.is_empty() => {
                existing.push('\n');
                existing.push_str(text);
            }
            _ => self.description = Some(text.to_string()),
        }
    }

    /// The generic `{error: string}` error body.
    pub fn error_object() -> Self {
        Self {
            properties: Some(BTreeMap::from([(
                "error".to_string(),
                Schema::typed("string"),
            )])),
            ..Self::typed("object")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_false_flags_are_omitted() {
        let schema = Schema {
            nullable: true,
            unique_items: false,
            ..Schema::typed("string")
        };
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value, json!({"type": "string", "nullable": true}));
    }

    #[test]
    fn test_key_names() {
        let schema = Schema {
            min_length: Some(3),
            max_items: Some(2),
            enum_values: Some(vec![json!("a")]),
            additional_properties: Some(Box::new(Schema::typed("integer"))),
            exclusive_minimum: true,
            discriminator: Some(DiscriminatorObject {
                property_name: "type".to_string(),
                mapping: BTreeMap::new(),
            }),
            ..Schema::reference("User")
        };
        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            value,
            json!({
                "$ref": "#/components/schemas/User",
                "minLength": 3,
                "maxItems": 2,
                "enum": ["a"],
                "additionalProperties": {"type": "integer"},
                "exclusiveMinimum": true,
                "discriminator": {"propertyName": "type"}
            })
        );
    }

    #[test]
    fn test_append_description() {
        let mut schema = Schema::default();
        schema.append_description("first");
        schema.append_description("second");
        assert_eq!(schema.description.as_deref(), Some("first\nsecond"));
    }
}
