//! Attribute parsing for `#[api(...)]`, `#[serde(...)]` and doc comments.

use crate::catalog::ParamLocation;
use log::debug;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Expr, Lit};

/// Annotations attached to a single struct field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldAnnotations {
    /// `#[api(json = "..")]` or `#[api(rename = "..")]`
    pub wire_name: Option<String>,
    /// `#[serde(rename = "..")]`
    pub serde_rename: Option<String>,
    pub validate: Option<String>,
    pub location: Option<ParamLocation>,
    pub discriminator: Option<String>,
    pub description: Option<String>,
    /// `#[api(skip)]`, `#[serde(skip)]` or `#[serde(skip_serializing)]`
    pub skip: bool,
    pub flatten: bool,
    pub deprecated: bool,
}

/// Annotations attached to a struct, enum or type alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerAnnotations {
    pub rename_all: Option<String>,
    pub discriminator_value: Option<String>,
    pub discriminator: Option<String>,
    pub description: Option<String>,
}

impl FieldAnnotations {
    /// Collects field annotations from `#[<attr_name>(..)]`, `#[serde(..)]`
    /// and `#[deprecated]`.
    pub fn parse(attrs: &[Attribute], attr_name: &str) -> Self {
        let mut result = Self::default();

        for attr in attrs {
            if attr.path().is_ident("deprecated") {
                result.deprecated = true;
            } else if attr.path().is_ident(attr_name) {
                let parsed = attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("json") || meta.path.is_ident("rename") {
                        result.wire_name = string_value(&meta)?;
                    } else if meta.path.is_ident("validate") {
                        result.validate = string_value(&meta)?;
                    } else if meta.path.is_ident("in") || meta.path.is_ident("location") {
                        let value = string_value(&meta)?;
                        result.location = value.as_deref().and_then(ParamLocation::parse);
                        if result.location.is_none() {
                            debug!("Ignoring unknown parameter location {:?}", value);
                        }
                    } else if meta.path.is_ident("discriminator") {
                        result.discriminator = string_value(&meta)?;
                    } else if meta.path.is_ident("description") {
                        result.description = string_value(&meta)?;
                    } else if meta.path.is_ident("skip") {
                        result.skip = true;
                    } else {
                        skip_value(&meta)?;
                    }
                    Ok(())
                });
                if let Err(e) = parsed {
                    debug!("Malformed #[{}] attribute: {}", attr_name, e);
                }
            } else if attr.path().is_ident("serde") {
                let parsed = attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        result.serde_rename = rename_value(&meta)?;
                    } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_serializing") {
                        result.skip = true;
                    } else if meta.path.is_ident("flatten") {
                        result.flatten = true;
                    } else {
                        skip_value(&meta)?;
                    }
                    Ok(())
                });
                if let Err(e) = parsed {
                    debug!("Malformed #[serde] attribute: {}", e);
                }
            }
        }

        result
    }
}

impl ContainerAnnotations {
    pub fn parse(attrs: &[Attribute], attr_name: &str) -> Self {
        let mut result = Self::default();

        for attr in attrs {
            if attr.path().is_ident(attr_name) {
                let parsed = attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("discriminator_value") {
                        result.discriminator_value = string_value(&meta)?;
                    } else if meta.path.is_ident("discriminator") {
                        result.discriminator = string_value(&meta)?;
                    } else if meta.path.is_ident("description") {
                        result.description = string_value(&meta)?;
                    } else if meta.path.is_ident("rename_all") {
                        result.rename_all = string_value(&meta)?;
                    } else {
                        skip_value(&meta)?;
                    }
                    Ok(())
                });
                if let Err(e) = parsed {
                    debug!("Malformed #[{}] attribute: {}", attr_name, e);
                }
            } else if attr.path().is_ident("serde") {
                let parsed = attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename_all") && result.rename_all.is_none() {
                        result.rename_all = rename_value(&meta)?;
                    } else {
                        skip_value(&meta)?;
                    }
                    Ok(())
                });
                if let Err(e) = parsed {
                    debug!("Malformed #[serde] attribute: {}", e);
                }
            }
        }

        result
    }
}

/// Joins `///` doc comment lines into one text block.
pub fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(expr_lit) => match &expr_lit.lit {
                    Lit::Str(s) => Some(s.value().trim().to_string()),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        })
        .collect();

    let text = lines.join("\n").trim().to_string();
    (!text.is_empty()).then_some(text)
}

/// Reads `key = "value"`; a bare `key` yields `None`.
fn string_value(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if !meta.input.peek(syn::Token![=]) {
        return Ok(None);
    }
    match meta.value()?.parse::<Lit>()? {
        Lit::Str(s) => Ok(Some(s.value())),
        Lit::Int(i) => Ok(Some(i.base10_digits().to_string())),
        Lit::Bool(b) => Ok(Some(b.value.to_string())),
        other => Err(syn::Error::new(other.span(), "expected a literal value")),
    }
}

/// Reads serde's `rename = ".."` or `rename(serialize = "..")`.
fn rename_value(meta: &ParseNestedMeta) -> syn::Result<Option<String>> {
    if meta.input.peek(syn::Token![=]) {
        return string_value(meta);
    }
    let mut serialized = None;
    meta.parse_nested_meta(|inner| {
        if inner.path.is_ident("serialize") {
            serialized = string_value(&inner)?;
        } else {
            skip_value(&inner)?;
        }
        Ok(())
    })?;
    Ok(serialized)
}

/// Consumes the value of a key this crate does not interpret.
fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let content;
        syn::parenthesized!(content in meta.input);
        content.parse::<proc_macro2::TokenStream>()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn field_attrs(field: syn::Field) -> FieldAnnotations {
        FieldAnnotations::parse(&field.attrs, "api")
    }

    #[test]
    fn test_api_attribute_keys() {
        let item: syn::ItemStruct = parse_quote! {
            struct GetUser {
                #[api(json = "user_id", validate = "required,uuid", in = "path", description = "The user")]
                pub id: String,
            }
        };
        let attrs = field_attrs(item.fields.into_iter().next().unwrap());

        assert_eq!(attrs.wire_name.as_deref(), Some("user_id"));
        assert_eq!(attrs.validate.as_deref(), Some("required,uuid"));
        assert_eq!(attrs.location, Some(ParamLocation::Path));
        assert_eq!(attrs.description.as_deref(), Some("The user"));
        assert!(!attrs.skip);
    }

    #[test]
    fn test_serde_keys_survive_unknown_entries() {
        let item: syn::ItemStruct = parse_quote! {
            struct S {
                #[serde(default, skip_serializing_if = "Option::is_none", rename = "nick")]
                nickname: Option<String>,
                #[serde(with = "ts", flatten)]
                meta: Meta,
                #[serde(skip)]
                #[deprecated]
                cache: u32,
            }
        };
        let fields: Vec<FieldAnnotations> = item
            .fields
            .iter()
            .map(|f| FieldAnnotations::parse(&f.attrs, "api"))
            .collect();

        assert_eq!(fields[0].serde_rename.as_deref(), Some("nick"));
        assert!(fields[1].flatten);
        assert!(fields[2].skip);
        assert!(fields[2].deprecated);
    }

    #[test]
    fn test_container_annotations() {
        let item: syn::ItemStruct = parse_quote! {
            /// A card payment.
            ///
            /// Charged immediately.
            #[derive(Serialize)]
            #[serde(rename_all = "camelCase")]
            #[api(discriminator_value = "card")]
            struct Card { number: String }
        };
        let attrs = ContainerAnnotations::parse(&item.attrs, "api");

        assert_eq!(attrs.rename_all.as_deref(), Some("camelCase"));
        assert_eq!(attrs.discriminator_value.as_deref(), Some("card"));
        assert_eq!(
            doc_text(&item.attrs).as_deref(),
            Some("A card payment.\n\nCharged immediately.")
        );
    }

    #[test]
    fn test_custom_attribute_name() {
        let item: syn::ItemStruct = parse_quote! {
            struct S {
                #[openapi(validate = "min=1")]
                #[api(validate = "ignored")]
                a: u32,
            }
        };
        let field = item.fields.iter().next().unwrap();
        let attrs = FieldAnnotations::parse(&field.attrs, "openapi");
        assert_eq!(attrs.validate.as_deref(), Some("min=1"));
    }
}
