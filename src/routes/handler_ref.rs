use super::{SecurityRequirement, callee_name, list_elements, string_literal};
use syn::Expr;

/// A handler reference in a route registration, with the tags and security
/// requirements attached by a build-handler wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerRef {
    pub name: String,
    pub tags: Vec<String>,
    pub security: Vec<SecurityRequirement>,
}

impl HandlerRef {
    /// Resolves `get_user`, `handlers::get_user`,
    /// `build_handler(get_user, with_tags(["users"]), with_bearer_auth())` and
    /// `build_handler(get_user).with_tags(["users"])`.
    pub fn resolve(expr: &Expr, build_handlers: &[String]) -> Option<Self> {
        match expr {
            Expr::Path(path) => path.path.segments.last().map(|segment| HandlerRef {
                name: segment.ident.to_string(),
                ..HandlerRef::default()
            }),
            Expr::Reference(reference) => Self::resolve(&reference.expr, build_handlers),
            Expr::Paren(paren) => Self::resolve(&paren.expr, build_handlers),
            Expr::Call(call) => {
                let callee = callee_name(call)?;
                if !build_handlers.iter().any(|b| *b == callee) {
                    return None;
                }
                let mut args = call.args.iter();
                let mut handler = Self::resolve(args.next()?, build_handlers)?;
                for option in args {
                    if let Expr::Call(option_call) = option {
                        if let Some(option_name) = callee_name(option_call) {
                            let option_args: Vec<Expr> = option_call.args.iter().cloned().collect();
                            handler.apply_option(&option_name, &option_args);
                        }
                    }
                }
                Some(handler)
            }
            Expr::MethodCall(call) => {
                if !matches!(&*call.receiver, Expr::Call(_) | Expr::MethodCall(_)) {
                    return None;
                }
                let mut handler = Self::resolve(&call.receiver, build_handlers)?;
                let option_args: Vec<Expr> = call.args.iter().cloned().collect();
                handler.apply_option(&call.method.to_string(), &option_args);
                Some(handler)
            }
            _ => None,
        }
    }

    fn apply_option(&mut self, option: &str, args: &[Expr]) {
        match option {
            "with_tags" | "tags" => {
                for tag in strings(args) {
                    if !self.tags.contains(&tag) {
                        self.tags.push(tag);
                    }
                }
            }
            "with_basic_auth" => self.add_security(SecurityRequirement::Basic),
            "with_bearer" | "with_bearer_auth" => self.add_security(SecurityRequirement::Bearer {
                scopes: strings(args),
            }),
            "with_api_key" => {
                let header = args
                    .first()
                    .and_then(string_literal)
                    .unwrap_or_else(|| "X-API-Key".to_string());
                self.add_security(SecurityRequirement::ApiKey { header });
            }
            _ => {}
        }
    }

    fn add_security(&mut self, requirement: SecurityRequirement) {
        if !self.security.contains(&requirement) {
            self.security.push(requirement);
        }
    }
}

/// String literals from either a single list argument or variadic arguments.
fn strings(args: &[Expr]) -> Vec<String> {
    args.iter()
        .flat_map(list_elements)
        .filter_map(|e| string_literal(&e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn builders() -> Vec<String> {
        vec!["build_handler".to_string()]
    }

    #[test]
    fn test_plain_and_qualified_paths() {
        let expr: Expr = parse_quote!(handlers::users::get_user);
        assert_eq!(HandlerRef::resolve(&expr, &builders()).unwrap().name, "get_user");
    }

    #[test]
    fn test_build_handler_arguments() {
        let expr: Expr = parse_quote!(build_handler(
            create_user,
            with_tags(["users", "admin"]),
            with_bearer_auth(vec!["users:write"]),
            with_api_key("X-Tenant")
        ));
        let handler = HandlerRef::resolve(&expr, &builders()).unwrap();
        assert_eq!(handler.name, "create_user");
        assert_eq!(handler.tags, vec!["users", "admin"]);
        assert_eq!(
            handler.security,
            vec![
                SecurityRequirement::Bearer {
                    scopes: vec!["users:write".to_string()]
                },
                SecurityRequirement::ApiKey {
                    header: "X-Tenant".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_build_handler_method_chain() {
        let expr: Expr = parse_quote!(build_handler(list_users).tags("users", "public").with_basic_auth());
        let handler = HandlerRef::resolve(&expr, &builders()).unwrap();
        assert_eq!(handler.name, "list_users");
        assert_eq!(handler.tags, vec!["users", "public"]);
        assert_eq!(handler.security, vec![SecurityRequirement::Basic]);
    }

    #[test]
    fn test_unknown_wrappers_and_closures() {
        let expr: Expr = parse_quote!(wrap(get_user));
        assert!(HandlerRef::resolve(&expr, &builders()).is_none());
        let expr: Expr = parse_quote!(|| async { "ok" });
        assert!(HandlerRef::resolve(&expr, &builders()).is_none());
    }
}
