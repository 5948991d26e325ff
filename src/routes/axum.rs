use super::{HttpMethod, MatchContext, RouteRecord, RouteStrategy, callee_name, string_literal};
use syn::{Expr, ExprMethodCall};

/// `.route("/users/:id", get(get_user).delete(delete_user))`
pub struct MethodRouterStrategy;

impl RouteStrategy for MethodRouterStrategy {
    fn name(&self) -> &'static str {
        "method-router"
    }

    fn can_handle(&self, call: &ExprMethodCall, _ctx: &MatchContext) -> bool {
        call.method == "route"
            && call.args.len() == 2
            && string_literal(&call.args[0]).is_some()
            && !verb_chain(&call.args[1]).is_empty()
    }

    fn extract(&self, call: &ExprMethodCall, ctx: &MatchContext) -> Vec<RouteRecord> {
        let Some(path) = string_literal(&call.args[0]) else {
            return Vec::new();
        };
        verb_chain(&call.args[1])
            .into_iter()
            .filter_map(|(method, handler)| {
                let handler = ctx.handler(handler)?;
                Some(ctx.record(Some(method), &path, handler, call))
            })
            .collect()
    }
}

/// Method/handler pairs of `get(h).post(h2)`, in declaration order. Methods
/// that are not verbs (`.layer(..)`) are skipped.
pub(crate) fn verb_chain(expr: &Expr) -> Vec<(HttpMethod, &Expr)> {
    let mut pairs = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::MethodCall(method_call) => {
                if let (Some(method), 1) = (
                    HttpMethod::parse(&method_call.method.to_string()),
                    method_call.args.len(),
                ) {
                    pairs.push((method, &method_call.args[0]));
                }
                current = &method_call.receiver;
            }
            Expr::Call(call) => {
                let method = callee_name(call).and_then(|name| HttpMethod::parse(&name));
                if let (Some(method), 1) = (method, call.args.len()) {
                    pairs.push((method, &call.args[0]));
                }
                break;
            }
            _ => break,
        }
    }
    pairs.reverse();
    pairs
}

#[cfg(test)]
mod tests {
    use crate::parser::ParsedFile;
    use crate::routes::{HttpMethod, RouteMatcher};

    fn routes(source: &str) -> Vec<crate::routes::RouteRecord> {
        let file = ParsedFile::from_source("app.rs", "", source).unwrap();
        RouteMatcher::default().match_file(&file)
    }

    #[test]
    fn test_chained_method_router() {
        let routes = routes(
            r#"
            pub fn app() -> Router {
                Router::new()
                    .route("/users", get(list_users).post(create_user))
                    .route("/users/:id", get(get_user).delete(handlers::delete_user))
            }
            "#,
        );

        let summary: Vec<_> = routes
            .iter()
            .map(|r| (r.method, r.path.as_str(), r.handler.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Some(HttpMethod::Get), "/users/{id}", "get_user"),
                (Some(HttpMethod::Delete), "/users/{id}", "delete_user"),
                (Some(HttpMethod::Get), "/users", "list_users"),
                (Some(HttpMethod::Post), "/users", "create_user"),
            ]
        );
    }

    #[test]
    fn test_build_handler_and_wildcard() {
        let routes = routes(
            r#"
            fn app() {
                Router::new().route(
                    "/files/*path",
                    get(build_handler(download, with_tags(["files"]))).layer(auth_layer()),
                );
            }
            "#,
        );

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/files/{path}");
        assert_eq!(routes[0].handler, "download");
        assert_eq!(routes[0].tags, vec!["files"]);
        assert_eq!(routes[0].location.line, 3);
    }
}
