use super::{HttpMethod, MatchContext, RouteRecord, RouteStrategy, string_literal};
use syn::ExprMethodCall;

/// `router.get("/users/:id", get_user)`
pub struct VerbCallStrategy;

impl RouteStrategy for VerbCallStrategy {
    fn name(&self) -> &'static str {
        "verb-call"
    }

    fn can_handle(&self, call: &ExprMethodCall, _ctx: &MatchContext) -> bool {
        call.args.len() == 2
            && HttpMethod::parse(&call.method.to_string()).is_some()
            && string_literal(&call.args[0]).is_some()
    }

    fn extract(&self, call: &ExprMethodCall, ctx: &MatchContext) -> Vec<RouteRecord> {
        let method = HttpMethod::parse(&call.method.to_string());
        let (Some(path), Some(handler)) = (string_literal(&call.args[0]), ctx.handler(&call.args[1]))
        else {
            return Vec::new();
        };
        vec![ctx.record(method, &path, handler, call)]
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ParsedFile;
    use crate::routes::{HttpMethod, RouteMatcher, SecurityRequirement};

    #[test]
    fn test_verb_calls() {
        let file = ParsedFile::from_source(
            "routes.rs",
            "",
            r#"
            pub fn register(router: &mut Router) {
                router.get("/orders/:order_id", get_order);
                router.post("/orders", build_handler(create_order, with_basic_auth()));
                router.get("/health", || async { "ok" });
            }
            "#,
        )
        .unwrap();

        let routes = RouteMatcher::default().match_file(&file);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].method, Some(HttpMethod::Get));
        assert_eq!(routes[0].path, "/orders/{order_id}");
        assert_eq!(routes[1].handler, "create_order");
        assert_eq!(routes[1].security, vec![SecurityRequirement::Basic]);
    }
}
