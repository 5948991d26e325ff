use super::attributes::doc_text;
use super::ItemContext;
use crate::catalog::HandlerDescriptor;
use crate::type_expr::TypeExpr;
use log::debug;
use syn::{FnArg, ReturnType, Type};

/// Recognizes a handler function.
///
/// A handler is a `pub` free function (sync or async) taking exactly a
/// context-like first parameter and the request as its second, and returning
/// `Result<Response, E>`. `Result<(), E>` means the handler has no response
/// body. Anything else is not a handler and yields `None`.
pub fn from_fn(item: &syn::ItemFn, ctx: &ItemContext) -> Option<HandlerDescriptor> {
    if !matches!(item.vis, syn::Visibility::Public(_)) {
        return None;
    }

    let sig = &item.sig;
    let params: Vec<&Type> = sig
        .inputs
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(pat) => Some(&*pat.ty),
            FnArg::Receiver(_) => None,
        })
        .collect();

    let [context, request] = params.as_slice() else {
        return None;
    };
    if !is_context_like(context) {
        return None;
    }

    let response = match &sig.output {
        ReturnType::Type(_, ty) => result_payload(ty)?,
        ReturnType::Default => return None,
    };

    let name = sig.ident.to_string();
    debug!("Found handler {}", name);

    Some(HandlerDescriptor {
        name,
        namespace: ctx.namespace.clone(),
        doc: doc_text(&item.attrs),
        request: TypeExpr::from_syn(request).unwrap_transparent().clone(),
        response: (!response.is_unit()).then_some(response),
        location: ctx.location(sig.ident.span()),
    })
}

/// `Ctx`, `RequestContext`, `&mut Context` and so on.
fn is_context_like(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) => is_context_like(&reference.elem),
        Type::Path(path) => path.path.segments.last().is_some_and(|segment| {
            let ident = segment.ident.to_string();
            ident == "Ctx" || ident.ends_with("Context")
        }),
        _ => false,
    }
}

/// The success payload of a `Result`-like return type, with `Json<_>` removed.
fn result_payload(ty: &Type) -> Option<TypeExpr> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if !segment.ident.to_string().ends_with("Result") {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let payload = args.args.iter().find_map(|arg| match arg {
        syn::GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })?;
    Some(TypeExpr::from_syn(payload).unwrap_transparent().clone())
}
