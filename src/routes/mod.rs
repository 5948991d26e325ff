//! Route registration matching.
//!
//! Route call sites are recognized by an ordered registry of strategies, one
//! per call shape:
//!
//! | Strategy | Shape |
//! |----------|-------|
//! | [`axum::MethodRouterStrategy`] | `.route("/users/:id", get(h).post(h2))` |
//! | [`verb::VerbCallStrategy`] | `router.get("/users/:id", h)` |
//! | [`tide::ResourceVerbStrategy`] | `app.at("/users/:id").get(h)` |
//! | [`actix::RouteToStrategy`] | `.route("/users/{id}", web::get().to(h))` |
//! | [`qualifier::MethodQualifierStrategy`] | `router.handle("/users/<id>", h).method(Method::GET)` |
//! | [`dispatch::DispatchStrategy`] | `router.handle("GET /users/{id}", h)` |
//!
//! Every method call in a file is offered to the strategies in order; the
//! first one that accepts it extracts the routes. Placeholders are normalized
//! to `{name}` and handler references wrapped by a build-handler call are
//! unwrapped, harvesting tags and security requirements.
//!
//! # Example
//!
//! ```
//! use apicontract::parser::ParsedFile;
//! use apicontract::routes::RouteMatcher;
//!
//! let file = ParsedFile::from_source(
//!     "main.rs",
//!     "",
//!     r#"fn app() { Router::new().route("/users/:id", get(get_user)); }"#,
//! )
//! .unwrap();
//! let routes = RouteMatcher::default().match_file(&file);
//! assert_eq!(routes[0].path, "/users/{id}");
//! ```

pub mod actix;
pub mod axum;
pub mod dispatch;
mod handler_ref;
pub mod qualifier;
pub mod tide;
pub mod verb;

pub use handler_ref::HandlerRef;

use crate::catalog::SourceLocation;
use crate::config::GeneratorConfig;
use crate::parser::ParsedFile;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use syn::visit::Visit;
use syn::{Expr, ExprMethodCall, Lit};

/// HTTP methods recognized in route registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Parses a method name case-insensitively (`get`, `GET`, `Method::GET`).
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.rsplit("::").next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "delete" => Some(HttpMethod::Delete),
            "patch" => Some(HttpMethod::Patch),
            "options" => Some(HttpMethod::Options),
            "head" => Some(HttpMethod::Head),
            _ => None,
        }
    }

    /// Infers a method from a handler name prefix; POST when nothing matches.
    pub fn infer(handler_name: &str) -> Self {
        let name = handler_name.to_ascii_lowercase();
        let prefixes: &[(&[&str], HttpMethod)] = &[
            (&["get", "list", "fetch"], HttpMethod::Get),
            (&["create", "post", "add"], HttpMethod::Post),
            (&["update", "put", "edit"], HttpMethod::Put),
            (&["patch", "modify"], HttpMethod::Patch),
            (&["delete", "remove"], HttpMethod::Delete),
        ];
        prefixes
            .iter()
            .find(|(words, _)| words.iter().any(|w| name.starts_with(w)))
            .map(|(_, method)| *method)
            .unwrap_or(HttpMethod::Post)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }

    /// Whether requests with this method carry a JSON body.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A security requirement harvested from a build-handler call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SecurityRequirement {
    Basic,
    Bearer { scopes: Vec<String> },
    ApiKey { header: String },
}

impl SecurityRequirement {
    /// The security scheme name used in the document.
    pub fn scheme_name(&self) -> &'static str {
        match self {
            SecurityRequirement::Basic => "basicAuth",
            SecurityRequirement::Bearer { .. } => "bearerAuth",
            SecurityRequirement::ApiKey { .. } => "apiKeyAuth",
        }
    }

    pub fn scopes(&self) -> Vec<String> {
        match self {
            SecurityRequirement::Bearer { scopes } => scopes.clone(),
            _ => Vec::new(),
        }
    }
}

/// A normalized route registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRecord {
    /// `None` for dispatch registrations without a method prefix
    pub method: Option<HttpMethod>,
    /// Path template with `{name}` placeholders
    pub path: String,
    pub handler: String,
    pub tags: Vec<String>,
    pub security: Vec<SecurityRequirement>,
    pub location: SourceLocation,
}

/// One recognized call shape.
pub trait RouteStrategy {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Whether this strategy recognizes the call.
    fn can_handle(&self, call: &ExprMethodCall, ctx: &MatchContext) -> bool;

    /// Extracts the routes registered by the call.
    fn extract(&self, call: &ExprMethodCall, ctx: &MatchContext) -> Vec<RouteRecord>;

    /// Whether the call's receiver is part of the matched shape and must not
    /// be offered to the strategies again.
    fn consumes_receiver(&self) -> bool {
        false
    }
}

/// Shared state handed to strategies.
pub struct MatchContext<'a> {
    pub file: &'a Path,
    pub build_handlers: &'a [String],
}

impl MatchContext<'_> {
    /// Resolves a handler argument, unwrapping build-handler calls.
    pub fn handler(&self, expr: &Expr) -> Option<HandlerRef> {
        HandlerRef::resolve(expr, self.build_handlers)
    }

    pub fn record(
        &self,
        method: Option<HttpMethod>,
        path: &str,
        handler: HandlerRef,
        call: &ExprMethodCall,
    ) -> RouteRecord {
        RouteRecord {
            method,
            path: normalize_path(path),
            handler: handler.name,
            tags: handler.tags,
            security: handler.security,
            location: SourceLocation {
                file: self.file.to_path_buf(),
                line: call.method.span().start().line,
            },
        }
    }
}

/// Ordered registry of route strategies.
pub struct RouteMatcher {
    strategies: Vec<Box<dyn RouteStrategy>>,
    build_handlers: Vec<String>,
}

impl Default for RouteMatcher {
    fn default() -> Self {
        Self::new(&GeneratorConfig::default())
    }
}

impl RouteMatcher {
    /// A matcher with the six built-in strategies.
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            strategies: vec![
                Box::new(axum::MethodRouterStrategy),
                Box::new(verb::VerbCallStrategy),
                Box::new(tide::ResourceVerbStrategy),
                Box::new(actix::RouteToStrategy),
                Box::new(qualifier::MethodQualifierStrategy),
                Box::new(dispatch::DispatchStrategy),
            ],
            build_handlers: config.build_handlers.clone(),
        }
    }

    /// Appends a strategy after the built-in ones.
    pub fn register(&mut self, strategy: Box<dyn RouteStrategy>) {
        self.strategies.push(strategy);
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn match_file(&self, file: &ParsedFile) -> Vec<RouteRecord> {
        let mut visitor = CallVisitor {
            matcher: self,
            ctx: MatchContext {
                file: &file.path,
                build_handlers: &self.build_handlers,
            },
            routes: Vec::new(),
        };
        visitor.visit_file(&file.syntax_tree);
        debug!(
            "Matched {} routes in {}",
            visitor.routes.len(),
            file.path.display()
        );
        visitor.routes
    }

    pub fn match_files(&self, files: &[ParsedFile]) -> Vec<RouteRecord> {
        files.iter().flat_map(|file| self.match_file(file)).collect()
    }
}

struct CallVisitor<'a> {
    matcher: &'a RouteMatcher,
    ctx: MatchContext<'a>,
    routes: Vec<RouteRecord>,
}

impl<'ast> Visit<'ast> for CallVisitor<'_> {
    fn visit_expr_method_call(&mut self, node: &'ast ExprMethodCall) {
        let matcher = self.matcher;
        let strategy = matcher
            .strategies
            .iter()
            .find(|s| s.can_handle(node, &self.ctx));

        let Some(strategy) = strategy else {
            syn::visit::visit_expr_method_call(self, node);
            return;
        };

        let routes = strategy.extract(node, &self.ctx);
        debug!("{} matched {} route(s)", strategy.name(), routes.len());
        self.routes.extend(routes);

        if strategy.consumes_receiver() {
            if let Expr::MethodCall(inner) = &*node.receiver {
                self.visit_expr(&inner.receiver);
                for arg in &inner.args {
                    self.visit_expr(arg);
                }
            } else {
                self.visit_expr(&node.receiver);
            }
            for arg in &node.args {
                self.visit_expr(arg);
            }
        } else {
            syn::visit::visit_expr_method_call(self, node);
        }
    }
}

/// Normalizes placeholder syntax to `{name}`.
///
/// `:id`, `*rest`, `<id>`, `{id}`, `{*rest}` and `{id:[0-9]+}` all become
/// `{id}`/`{rest}`. A leading `/` is added when missing.
pub fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        out.push('/');
    }

    let chars: Vec<char> = path.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let at_segment_start = i == 0 || chars[i - 1] == '/';
        match chars[i] {
            '{' => {
                let mut depth = 0;
                let mut j = i;
                while j < chars.len() {
                    match chars[j] {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    j += 1;
                }
                let inner: String = chars[i + 1..j.min(chars.len())].iter().collect();
                push_placeholder(&mut out, &inner);
                i = j + 1;
            }
            '<' => {
                let end = chars[i..]
                    .iter()
                    .position(|&c| c == '>')
                    .map_or(chars.len(), |p| i + p);
                let inner: String = chars[i + 1..end].iter().collect();
                push_placeholder(&mut out, &inner);
                i = end + 1;
            }
            ':' | '*' if at_segment_start => {
                let end = chars[i..]
                    .iter()
                    .position(|&c| c == '/')
                    .map_or(chars.len(), |p| i + p);
                let inner: String = chars[i + 1..end].iter().collect();
                push_placeholder(&mut out, &inner);
                i = end;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    if out.is_empty() {
        out.push('/');
    }
    out
}

fn push_placeholder(out: &mut String, inner: &str) {
    let name = inner.trim_start_matches('*');
    let name = name.split(':').next().unwrap_or(name);
    let name = name.trim_end_matches("..").trim();
    out.push('{');
    out.push_str(name);
    out.push('}');
}

/// Placeholder names of a normalized template, in order.
pub fn path_params(template: &str) -> Vec<String> {
    template
        .split('/')
        .filter_map(|segment| {
            let start = segment.find('{')?;
            let end = segment[start..].find('}')? + start;
            Some(segment[start + 1..end].to_string())
        })
        .collect()
}

/// The value of a string literal expression.
pub(crate) fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(expr_lit) => match &expr_lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        Expr::Reference(reference) => string_literal(&reference.expr),
        Expr::Paren(paren) => string_literal(&paren.expr),
        Expr::Group(group) => string_literal(&group.expr),
        _ => None,
    }
}

/// The last path segment of a function call's callee (`web::get()` -> `get`).
pub(crate) fn callee_name(call: &syn::ExprCall) -> Option<String> {
    match &*call.func {
        Expr::Path(path) => path.path.segments.last().map(|s| s.ident.to_string()),
        _ => None,
    }
}

/// Elements of `[a, b]`, `&[a, b]`, `vec![a, b]`; any other expression is a
/// single element.
pub(crate) fn list_elements(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Array(array) => array.elems.iter().cloned().collect(),
        Expr::Reference(reference) => list_elements(&reference.expr),
        Expr::Macro(mac) => mac
            .mac
            .parse_body_with(
                syn::punctuated::Punctuated::<Expr, syn::Token![,]>::parse_terminated,
            )
            .map(|elems| elems.into_iter().collect())
            .unwrap_or_default(),
        other => vec![other.clone()],
    }
}

/// A method named by a string literal (`"GET"`) or a path (`Method::GET`).
pub(crate) fn method_expr(expr: &Expr) -> Option<HttpMethod> {
    if let Some(literal) = string_literal(expr) {
        return HttpMethod::parse(&literal);
    }
    match expr {
        Expr::Path(path) => HttpMethod::parse(&path.path.segments.last()?.ident.to_string()),
        _ => None,
    }
}
