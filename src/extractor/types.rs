use super::attributes::{doc_text, ContainerAnnotations, FieldAnnotations};
use super::ItemContext;
use crate::case::apply_rename_rule;
use crate::catalog::{AliasKind, DeclaredOperation, FieldDescriptor, TypeDefinition};
use crate::type_expr::TypeExpr;
use crate::union::UnionDescriptor;
use log::debug;
use syn::{Expr, Lit, Stmt};

/// Builds a record definition from a struct.
///
/// Single-field tuple structs (`struct UserId(String);`) become simple aliases
/// of their inner type.
pub fn from_struct(item: &syn::ItemStruct, ctx: &ItemContext) -> TypeDefinition {
    let name = item.ident.to_string();
    let container = ContainerAnnotations::parse(&item.attrs, ctx.attr_name);

    let mut def = match &item.fields {
        syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => TypeDefinition::alias(
            &name,
            &ctx.namespace,
            AliasKind::Simple,
            TypeExpr::from_syn(&unnamed.unnamed[0].ty),
        ),
        syn::Fields::Named(named) => {
            let mut def = TypeDefinition::record(&name, &ctx.namespace);
            for field in &named.named {
                let descriptor = field_descriptor(field, &container, ctx.attr_name);
                if descriptor.embedded {
                    def.embedded.push(descriptor.ty.unwrap_optional().0.clone());
                }
                def.fields.push(descriptor);
            }
            def
        }
        _ => TypeDefinition::record(&name, &ctx.namespace),
    };

    debug!("Extracted type {} with {} fields", name, def.fields.len());
    apply_container(&mut def, item.ident.span(), &item.attrs, container, ctx);
    def
}

/// Builds a simple alias of `String` from a fieldless enum.
///
/// Enums carrying data are not part of the closed type set and yield `None`.
pub fn from_enum(item: &syn::ItemEnum, ctx: &ItemContext) -> Option<TypeDefinition> {
    let name = item.ident.to_string();
    if item
        .variants
        .iter()
        .any(|v| !matches!(v.fields, syn::Fields::Unit))
    {
        debug!("Skipping enum {} with data-carrying variants", name);
        return None;
    }

    let container = ContainerAnnotations::parse(&item.attrs, ctx.attr_name);
    let mut def = TypeDefinition::alias(
        &name,
        &ctx.namespace,
        AliasKind::Simple,
        TypeExpr::Named("String".to_string()),
    );

    for variant in &item.variants {
        let annotations = FieldAnnotations::parse(&variant.attrs, ctx.attr_name);
        if annotations.skip {
            continue;
        }
        let ident = variant.ident.to_string();
        let wire = annotations
            .wire_name
            .or(annotations.serde_rename)
            .unwrap_or_else(|| match &container.rename_all {
                Some(rule) => apply_rename_rule(rule, &ident),
                None => ident,
            });
        def.enum_values.push(serde_json::Value::String(wire));
    }

    apply_container(&mut def, item.ident.span(), &item.attrs, container, ctx);
    Some(def)
}

/// Builds an alias definition from `type X = ...;`, classifying it as a union
/// when the aliased expression is a choice construct.
pub fn from_type_alias(item: &syn::ItemType, ctx: &ItemContext) -> TypeDefinition {
    let name = item.ident.to_string();
    let aliased = TypeExpr::from_syn(&item.ty);
    let container = ContainerAnnotations::parse(&item.attrs, ctx.attr_name);

    let mut def = match UnionDescriptor::detect(&aliased, ctx.union_prefix) {
        Some(union) => {
            debug!("Alias {} is a {}-way union", name, union.arity);
            let mut def = TypeDefinition::alias(&name, &ctx.namespace, AliasKind::Union, aliased);
            def.union = Some(union);
            def
        }
        None => TypeDefinition::alias(&name, &ctx.namespace, AliasKind::Simple, aliased),
    };

    def.discriminator_property = container.discriminator.clone();
    apply_container(&mut def, item.ident.span(), &item.attrs, container, ctx);
    def
}

/// Collects the methods of an impl block, keyed by the implementing type.
pub fn operations_from_impl(item: &syn::ItemImpl) -> Option<(String, Vec<DeclaredOperation>)> {
    let syn::Type::Path(self_ty) = &*item.self_ty else {
        return None;
    };
    let type_name = self_ty.path.segments.last()?.ident.to_string();

    let operations = item
        .items
        .iter()
        .filter_map(|impl_item| match impl_item {
            syn::ImplItem::Fn(method) => Some(DeclaredOperation {
                name: method.sig.ident.to_string(),
                doc: doc_text(&method.attrs),
                arg_count: method
                    .sig
                    .inputs
                    .iter()
                    .filter(|arg| matches!(arg, syn::FnArg::Typed(_)))
                    .count(),
                returned_literal: returned_literal(&method.block),
            }),
            _ => None,
        })
        .collect();

    Some((type_name, operations))
}

/// Reads `const X: Alias = "value";` as an enum value for `Alias`.
pub fn const_value(item: &syn::ItemConst) -> Option<(String, serde_json::Value)> {
    let TypeExpr::Named(type_name) = TypeExpr::from_syn(&item.ty) else {
        return None;
    };
    let value = match literal(&item.expr)? {
        Lit::Str(s) => serde_json::Value::String(s.value()),
        Lit::Int(i) => serde_json::Value::from(i.base10_parse::<i64>().ok()?),
        _ => return None,
    };
    Some((type_name, value))
}

fn field_descriptor(
    field: &syn::Field,
    container: &ContainerAnnotations,
    attr_name: &str,
) -> FieldDescriptor {
    let ident = field
        .ident
        .as_ref()
        .map(|i| i.to_string().trim_start_matches("r#").to_string())
        .unwrap_or_default();
    let annotations = FieldAnnotations::parse(&field.attrs, attr_name);
    let mut descriptor = FieldDescriptor::new(&ident, TypeExpr::from_syn(&field.ty));

    descriptor.wire_name = if annotations.skip || annotations.flatten {
        String::new()
    } else if let Some(wire) = annotations.wire_name.or(annotations.serde_rename) {
        wire
    } else if let Some(rule) = &container.rename_all {
        apply_rename_rule(rule, &ident)
    } else {
        ident
    };
    descriptor.validate = annotations.validate.unwrap_or_default();
    if let Some(location) = annotations.location {
        descriptor.location = location;
        descriptor.explicit_location = true;
    }
    descriptor.doc = annotations.description.or_else(|| doc_text(&field.attrs));
    descriptor.embedded = annotations.flatten;
    descriptor.discriminator = annotations.discriminator;
    descriptor.deprecated = annotations.deprecated;
    descriptor
}

fn apply_container(
    def: &mut TypeDefinition,
    span: proc_macro2::Span,
    attrs: &[syn::Attribute],
    container: ContainerAnnotations,
    ctx: &ItemContext,
) {
    def.doc = container.description.or_else(|| doc_text(attrs));
    def.discriminator_value = container.discriminator_value;
    def.location = ctx.location(span);
}

/// The string literal a method body consists of, if it is exactly one
/// (`"card"` or `return "card";`).
fn returned_literal(block: &syn::Block) -> Option<String> {
    let [stmt] = block.stmts.as_slice() else {
        return None;
    };
    let expr = match stmt {
        Stmt::Expr(Expr::Return(ret), _) => ret.expr.as_deref()?,
        Stmt::Expr(expr, _) => expr,
        _ => return None,
    };
    match literal(expr)? {
        Lit::Str(s) => Some(s.value()),
        _ => None,
    }
}

fn literal(expr: &Expr) -> Option<&Lit> {
    match expr {
        Expr::Lit(expr_lit) => Some(&expr_lit.lit),
        Expr::Paren(paren) => literal(&paren.expr),
        Expr::Group(group) => literal(&group.expr),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ParamLocation;
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use syn::parse_quote;

    fn ctx() -> ItemContext<'static> {
        ItemContext {
            file: Path::new("models.rs"),
            namespace: "models".to_string(),
            attr_name: "api",
            union_prefix: "OneOf",
        }
    }

    #[test]
    fn test_struct_fields_and_wire_names() {
        let item: syn::ItemStruct = parse_quote! {
            /// A registered user.
            #[serde(rename_all = "camelCase")]
            pub struct User {
                #[api(validate = "required,email,max=255")]
                pub email: String,
                pub created_at: String,
                #[serde(rename = "nick")]
                pub nickname: Option<String>,
                #[api(in = "header", json = "X-Request-Id")]
                pub request_id: String,
                #[serde(skip)]
                pub cache: u64,
                #[serde(flatten)]
                pub audit: Audit,
            }
        };
        let def = from_struct(&item, &ctx());

        assert!(def.is_record());
        assert_eq!(def.doc.as_deref(), Some("A registered user."));
        assert_eq!(def.namespace, "models");
        let wire: Vec<&str> = def.fields.iter().map(|f| f.wire_name.as_str()).collect();
        assert_eq!(wire, vec!["email", "createdAt", "nick", "X-Request-Id", "", ""]);
        assert_eq!(def.fields[0].validate, "required,email,max=255");
        assert!(def.fields[2].optional);
        assert_eq!(def.fields[3].location, ParamLocation::Header);
        assert!(def.fields[3].explicit_location);
        assert!(def.fields[5].embedded);
        assert_eq!(def.embedded, vec![TypeExpr::Named("Audit".to_string())]);
        assert!(def.location.line > 0);
    }

    #[test]
    fn test_newtype_struct_is_simple_alias() {
        let item: syn::ItemStruct = parse_quote! { pub struct UserId(pub uuid::Uuid); };
        let def = from_struct(&item, &ctx());
        assert_eq!(def.alias_kind, AliasKind::Simple);
        assert_eq!(def.aliased, Some(TypeExpr::Named("Uuid".to_string())));
    }

    #[test]
    fn test_fieldless_enum_values() {
        let item: syn::ItemEnum = parse_quote! {
            #[serde(rename_all = "snake_case")]
            pub enum Status {
                InProgress,
                #[serde(rename = "done")]
                Completed,
            }
        };
        let def = from_enum(&item, &ctx()).unwrap();
        assert_eq!(def.alias_kind, AliasKind::Simple);
        assert_eq!(
            def.enum_values,
            vec![
                serde_json::json!("in_progress"),
                serde_json::json!("done")
            ]
        );

        let data: syn::ItemEnum = parse_quote! { enum Shape { Circle(f64) } };
        assert!(from_enum(&data, &ctx()).is_none());
    }

    #[test]
    fn test_type_alias_classification() {
        let union: syn::ItemType = parse_quote! {
            #[api(discriminator = "kind")]
            pub type Payment = OneOf2<Card, BankTransfer>;
        };
        let def = from_type_alias(&union, &ctx());
        assert_eq!(def.alias_kind, AliasKind::Union);
        assert_eq!(def.union.as_ref().unwrap().arity, 2);
        assert_eq!(def.discriminator_property.as_deref(), Some("kind"));

        let simple: syn::ItemType = parse_quote! { pub type Currency = String; };
        assert_eq!(from_type_alias(&simple, &ctx()).alias_kind, AliasKind::Simple);

        let too_wide: syn::ItemType = parse_quote! { pub type X = OneOf2<A, B, C>; };
        assert_eq!(from_type_alias(&too_wide, &ctx()).alias_kind, AliasKind::Simple);
    }

    #[test]
    fn test_impl_operations() {
        let item: syn::ItemImpl = parse_quote! {
            impl Card {
                /// discriminator: card
                pub fn discriminator(&self) -> &'static str { "card" }
                pub fn charge(&self, amount: u64) -> bool { amount > 0 }
                fn kind() -> &'static str { return "k"; }
            }
        };
        let (name, ops) = operations_from_impl(&item).unwrap();
        assert_eq!(name, "Card");
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].returned_literal.as_deref(), Some("card"));
        assert_eq!(ops[0].doc.as_deref(), Some("discriminator: card"));
        assert_eq!(ops[0].arg_count, 0);
        assert_eq!(ops[1].arg_count, 1);
        assert_eq!(ops[1].returned_literal, None);
        assert_eq!(ops[2].returned_literal.as_deref(), Some("k"));
    }

    #[test]
    fn test_const_values() {
        let item: syn::ItemConst = parse_quote! { pub const ACTIVE: Status = "active"; };
        assert_eq!(
            const_value(&item),
            Some(("Status".to_string(), serde_json::json!("active")))
        );

        let int: syn::ItemConst = parse_quote! { const LOW: Priority = 1; };
        assert_eq!(
            const_value(&int),
            Some(("Priority".to_string(), serde_json::json!(1)))
        );

        let call: syn::ItemConst = parse_quote! { const D: Duration = Duration::from_secs(1); };
        assert_eq!(const_value(&call), None);
    }
}
