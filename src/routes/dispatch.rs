use super::{HttpMethod, MatchContext, RouteRecord, RouteStrategy, string_literal};
use syn::ExprMethodCall;

const REGISTRATIONS: &[&str] = &["handle", "handle_func", "add"];

/// `router.handle("GET /users/{id}", get_user)`; without a method prefix the
/// record has no method and the builder infers one.
pub struct DispatchStrategy;

impl RouteStrategy for DispatchStrategy {
    fn name(&self) -> &'static str {
        "dispatch"
    }

    fn can_handle(&self, call: &ExprMethodCall, _ctx: &MatchContext) -> bool {
        REGISTRATIONS.iter().any(|name| call.method == name)
            && call.args.len() == 2
            && string_literal(&call.args[0]).is_some()
    }

    fn extract(&self, call: &ExprMethodCall, ctx: &MatchContext) -> Vec<RouteRecord> {
        let (Some(pattern), Some(handler)) = (string_literal(&call.args[0]), ctx.handler(&call.args[1]))
        else {
            return Vec::new();
        };
        let (method, path) = split_pattern(&pattern);
        vec![ctx.record(method, path, handler, call)]
    }
}

/// `"GET /users"` -> (GET, "/users"); `"/users"` -> (None, "/users")
fn split_pattern(pattern: &str) -> (Option<HttpMethod>, &str) {
    let pattern = pattern.trim();
    if let Some((prefix, rest)) = pattern.split_once(char::is_whitespace) {
        if let Some(method) = HttpMethod::parse(prefix) {
            return (Some(method), rest.trim_start());
        }
    }
    (None, pattern)
}
