use super::{HttpMethod, MatchContext, RouteRecord, RouteStrategy, list_elements, method_expr, string_literal};
use syn::{Expr, ExprMethodCall};

const REGISTRATIONS: &[&str] = &["handle", "handle_func", "route"];

/// `router.handle("/users/<id>", get_user).method(Method::GET)` and
/// `.methods(["GET", "PUT"])`, one record per listed method.
pub struct MethodQualifierStrategy;

impl RouteStrategy for MethodQualifierStrategy {
    fn name(&self) -> &'static str {
        "method-qualifier"
    }

    fn can_handle(&self, call: &ExprMethodCall, _ctx: &MatchContext) -> bool {
        (call.method == "method" || call.method == "methods") && registration(&call.receiver).is_some()
    }

    fn extract(&self, call: &ExprMethodCall, ctx: &MatchContext) -> Vec<RouteRecord> {
        let Some((path, handler_expr)) = registration(&call.receiver) else {
            return Vec::new();
        };
        let Some(handler) = ctx.handler(handler_expr) else {
            return Vec::new();
        };

        let mut methods: Vec<HttpMethod> = Vec::new();
        for method in call.args.iter().flat_map(list_elements).filter_map(|e| method_expr(&e)) {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }

        methods
            .into_iter()
            .map(|method| ctx.record(Some(method), &path, handler.clone(), call))
            .collect()
    }

    fn consumes_receiver(&self) -> bool {
        true
    }
}

/// `.handle("/path", h)` -> ("/path", h)
fn registration(expr: &Expr) -> Option<(String, &Expr)> {
    let Expr::MethodCall(call) = expr else {
        return None;
    };
    if !REGISTRATIONS.iter().any(|name| call.method == name) || call.args.len() != 2 {
        return None;
    }
    Some((string_literal(&call.args[0])?, &call.args[1]))
}
