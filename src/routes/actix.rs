use super::{HttpMethod, MatchContext, RouteRecord, RouteStrategy, callee_name, string_literal};
use syn::{Expr, ExprMethodCall};

/// `.route("/users/{id}", web::get().to(get_user))` and
/// `web::resource("/users/{id}").route(web::put().to(update_user))`.
///
/// Paths registered on a `web::scope("/api")` chain carry the scope prefix.
pub struct RouteToStrategy;

impl RouteStrategy for RouteToStrategy {
    fn name(&self) -> &'static str {
        "route-to"
    }

    fn can_handle(&self, call: &ExprMethodCall, _ctx: &MatchContext) -> bool {
        if call.method != "route" {
            return false;
        }
        match call.args.len() {
            2 => string_literal(&call.args[0]).is_some() && method_to(&call.args[1]).is_some(),
            1 => method_to(&call.args[0]).is_some() && anchor(&call.receiver, "resource").is_some(),
            _ => false,
        }
    }

    fn extract(&self, call: &ExprMethodCall, ctx: &MatchContext) -> Vec<RouteRecord> {
        let (path, target) = if call.args.len() == 2 {
            let Some(path) = string_literal(&call.args[0]) else {
                return Vec::new();
            };
            let path = match anchor(&call.receiver, "scope") {
                Some(scope) => format!("{}/{}", scope.trim_end_matches('/'), path.trim_start_matches('/')),
                None => path,
            };
            (path, &call.args[1])
        } else {
            let Some(path) = anchor(&call.receiver, "resource") else {
                return Vec::new();
            };
            (path, &call.args[0])
        };

        let Some((method, handler)) = method_to(target) else {
            return Vec::new();
        };
        match ctx.handler(handler) {
            Some(handler) => vec![ctx.record(Some(method), &path, handler, call)],
            None => Vec::new(),
        }
    }
}

/// `web::get().to(h)` -> (GET, h)
fn method_to(expr: &Expr) -> Option<(HttpMethod, &Expr)> {
    let Expr::MethodCall(to) = expr else {
        return None;
    };
    if to.method != "to" || to.args.len() != 1 {
        return None;
    }
    let Expr::Call(verb) = &*to.receiver else {
        return None;
    };
    if !verb.args.is_empty() {
        return None;
    }
    let method = HttpMethod::parse(&callee_name(verb)?)?;
    Some((method, &to.args[0]))
}

/// Walks a receiver chain down to a `web::<function>("/path")` call.
fn anchor(expr: &Expr, function: &str) -> Option<String> {
    match expr {
        Expr::MethodCall(call) => anchor(&call.receiver, function),
        Expr::Call(call) if callee_name(call).as_deref() == Some(function) => {
            call.args.first().and_then(string_literal)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ParsedFile;
    use crate::routes::{HttpMethod, RouteMatcher};

    fn summary(source: &str) -> Vec<(Option<HttpMethod>, String, String)> {
        let file = ParsedFile::from_source("main.rs", "", source).unwrap();
        let mut routes: Vec<_> = RouteMatcher::default()
            .match_file(&file)
            .into_iter()
            .map(|r| (r.method, r.path, r.handler))
            .collect();
        routes.sort();
        routes
    }

    #[test]
    fn test_route_to_shapes() {
        let routes = summary(
            r#"
            pub fn config(cfg: &mut web::ServiceConfig) {
                cfg.route("/users", web::post().to(create_user))
                    .service(
                        web::resource("/users/{id}")
                            .route(web::get().to(get_user))
                            .route(web::delete().to(delete_user)),
                    );
            }
            "#,
        );

        assert_eq!(
            routes,
            vec![
                (Some(HttpMethod::Get), "/users/{id}".to_string(), "get_user".to_string()),
                (Some(HttpMethod::Post), "/users".to_string(), "create_user".to_string()),
                (Some(HttpMethod::Delete), "/users/{id}".to_string(), "delete_user".to_string()),
            ]
        );
    }

    #[test]
    fn test_scope_prefix_and_regex_placeholder() {
        let routes = summary(
            r#"
            fn app() -> App {
                App::new().service(
                    web::scope("/api").route("/items/{id:\\d+}", web::get().to(get_item)),
                )
            }
            "#,
        );

        assert_eq!(
            routes,
            vec![(Some(HttpMethod::Get), "/api/items/{id}".to_string(), "get_item".to_string())]
        );
    }
}
