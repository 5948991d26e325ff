use super::{HttpMethod, MatchContext, RouteRecord, RouteStrategy, string_literal};
use syn::{Expr, ExprMethodCall};

/// `app.at("/users/:id").get(get_user).put(update_user)`
///
/// Each verb in the chain is matched on its own call; nested resources
/// (`app.at("/users").at(":id")`) are joined.
pub struct ResourceVerbStrategy;

impl RouteStrategy for ResourceVerbStrategy {
    fn name(&self) -> &'static str {
        "resource-verb"
    }

    fn can_handle(&self, call: &ExprMethodCall, _ctx: &MatchContext) -> bool {
        call.args.len() == 1
            && HttpMethod::parse(&call.method.to_string()).is_some()
            && resource_path(&call.receiver).is_some()
    }

    fn extract(&self, call: &ExprMethodCall, ctx: &MatchContext) -> Vec<RouteRecord> {
        let method = HttpMethod::parse(&call.method.to_string());
        let (Some(path), Some(handler)) = (resource_path(&call.receiver), ctx.handler(&call.args[0]))
        else {
            return Vec::new();
        };
        vec![ctx.record(method, &path, handler, call)]
    }
}

/// The path of the `.at(..)` call a verb chain hangs off.
fn resource_path(expr: &Expr) -> Option<String> {
    let Expr::MethodCall(call) = expr else {
        return None;
    };
    if call.method == "at" && call.args.len() == 1 {
        let segment = string_literal(&call.args[0])?;
        return Some(match resource_path(&call.receiver) {
            Some(prefix) => join(&prefix, &segment),
            None => segment,
        });
    }
    if call.args.len() == 1 && HttpMethod::parse(&call.method.to_string()).is_some() {
        return resource_path(&call.receiver);
    }
    None
}

fn join(prefix: &str, segment: &str) -> String {
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        segment.trim_start_matches('/')
    )
}
