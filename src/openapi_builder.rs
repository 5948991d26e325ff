use crate::catalog::{FieldDescriptor, HandlerDescriptor, ParamLocation, TypeDefinition};
use crate::config::{GeneratorConfig, InfoConfig, ParameterStyle};
use crate::routes::{path_params, HttpMethod, RouteRecord, SecurityRequirement};
use crate::schema::Schema;
use crate::schema_generator::SchemaGenerator;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashSet};

const JSON: &str = "application/json";

/// OpenAPI document builder
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    parameter_style: ParameterStyle,
    /// Paths collection (URL path -> PathItem)
    paths: BTreeMap<String, PathItem>,
    /// Scheme definitions for every requirement seen, by scheme name
    schemes: BTreeMap<String, SecurityScheme>,
    diagnostics: Vec<String>,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Handler documentation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// The handler name
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Parameters (path, query, header)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses by status code
    pub responses: BTreeMap<String, Response>,
    /// One entry per requirement: scheme name -> scopes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Parameter location (path, query, header)
    #[serde(rename = "in")]
    pub location: String,
    pub required: bool,
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    /// Content types and their schemas
    pub content: BTreeMap<String, MediaType>,
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    pub schema: Schema,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<BTreeMap<String, MediaType>>,
}

/// OpenAPI Security Scheme object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type")]
    pub scheme_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,
    /// Header name for API keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
}

/// OpenAPI Components object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schemas: Option<BTreeMap<String, Schema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_schemes: Option<BTreeMap<String, SecurityScheme>>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    pub info: Info,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

impl OpenApiBuilder {
    pub fn new(config: &GeneratorConfig) -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info::from(&config.info),
            parameter_style: config.parameter_style,
            paths: BTreeMap::new(),
            schemes: BTreeMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            version,
            description,
        };
        self
    }

    /// Adds the operation for one route.
    ///
    /// Returns `false` when the route's handler is not in the catalog; the
    /// route is skipped and a warning recorded.
    pub fn add_route(&mut self, route: &RouteRecord, schema_gen: &mut SchemaGenerator) -> bool {
        let Some(handler) = schema_gen.catalog().handler(&route.handler) else {
            let message = format!(
                "Unknown handler {} for route {} ({}:{}), skipping",
                route.handler,
                route.path,
                route.location.file.display(),
                route.location.line
            );
            warn!("{}", message);
            self.diagnostics.push(message);
            return false;
        };

        let method = route.method.unwrap_or_else(|| {
            let inferred = HttpMethod::infer(&handler.name);
            debug!("Inferred {} for handler {}", inferred, handler.name);
            inferred
        });
        debug!("Adding route: {} {}", method, route.path);

        let request_fields = self.request_fields(&handler, schema_gen);
        let parameters = self.parameters(method, &route.path, &request_fields, schema_gen);

        // Body fields bound by a placeholder move to the path.
        let claimed: BTreeSet<String> = path_params(&route.path)
            .iter()
            .filter_map(|name| placeholder_field(&request_fields, name))
            .filter(|field| field.location == ParamLocation::Body && field.is_wire())
            .map(|field| field.wire_name.clone())
            .collect();

        let request_body = if method.has_body() && !handler.request.is_unit() {
            Some(RequestBody {
                description: Some("Request body".to_string()),
                required: true,
                content: json_content(schema_gen.request_body_schema(&handler.request, &claimed)),
            })
        } else {
            None
        };

        let success = match &handler.response {
            Some(response) => schema_gen.schema_for(response),
            None => Schema::typed("object"),
        };
        let responses = BTreeMap::from([
            ("200".to_string(), response("Successful response", success)),
            ("400".to_string(), response("Bad request", Schema::error_object())),
            ("500".to_string(), response("Internal server error", Schema::error_object())),
        ]);

        for requirement in &route.security {
            match self.schemes.entry(requirement.scheme_name().to_string()) {
                Entry::Vacant(slot) => {
                    slot.insert(security_scheme(requirement));
                }
                Entry::Occupied(existing) => {
                    let SecurityRequirement::ApiKey { header } = requirement else {
                        continue;
                    };
                    let documented = existing.get().name.clone().unwrap_or_default();
                    if documented != *header {
                        let message = format!(
                            "API key header {} for {} {} differs from {}; only {} is documented",
                            header, method, route.path, documented, documented
                        );
                        warn!("{}", message);
                        self.diagnostics.push(message);
                    }
                }
            }
        }

        let operation = Operation {
            summary: Some(format!("{} {}", method, route.path)),
            description: handler.doc.clone(),
            operation_id: handler.name.clone(),
            tags: route.tags.clone(),
            parameters,
            request_body,
            responses,
            security: route
                .security
                .iter()
                .map(|r| BTreeMap::from([(r.scheme_name().to_string(), r.scopes())]))
                .collect(),
        };

        let slot = self.paths.entry(route.path.clone()).or_default().slot(method);
        if let Some(existing) = slot {
            warn!(
                "Duplicate operation {} {}: {} replaces {}",
                method, route.path, operation.operation_id, existing.operation_id
            );
        }
        *slot = Some(operation);
        true
    }

    /// Fields of the request record, including embedded records.
    fn request_fields(&self, handler: &HandlerDescriptor, schema_gen: &SchemaGenerator) -> Vec<FieldDescriptor> {
        let catalog = schema_gen.catalog();
        let mut fields = Vec::new();
        let mut pending: Vec<String> = handler.request.named().map(str::to_string).into_iter().collect();
        let mut visited = HashSet::new();

        while let Some(name) = pending.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(def) = catalog.type_def(&name).filter(TypeDefinition::is_record) else {
                continue;
            };
            pending.extend(def.embedded.iter().filter_map(|e| e.named().map(str::to_string)));
            fields.extend(def.fields);
        }
        fields
    }

    fn parameters(
        &self,
        method: HttpMethod,
        path: &str,
        fields: &[FieldDescriptor],
        schema_gen: &mut SchemaGenerator,
    ) -> Vec<Parameter> {
        let placeholders = path_params(path);
        let mut parameters = Vec::new();

        for name in &placeholders {
            let field = placeholder_field(fields, name);
            let (schema, description) = match field {
                Some(field) => (schema_gen.field_schema(field), field.doc.clone()),
                None => (Schema::typed("string"), None),
            };
            parameters.push(Parameter {
                name: name.clone(),
                location: ParamLocation::Path.as_str().to_string(),
                required: true,
                schema,
                description,
            });
        }

        let implicit_query = self.parameter_style == ParameterStyle::Implicit
            && matches!(method, HttpMethod::Get | HttpMethod::Delete);
        let mut seen: BTreeSet<(String, ParamLocation)> = BTreeSet::new();

        for field in fields {
            let location = match field.location {
                ParamLocation::Query | ParamLocation::Header if field.explicit_location => field.location,
                ParamLocation::Body if implicit_query && !field.explicit_location && field.is_wire() => {
                    ParamLocation::Query
                }
                _ => continue,
            };
            let name = param_name(field);
            if placeholders.contains(&name) || !seen.insert((name.clone(), location)) {
                continue;
            }
            parameters.push(Parameter {
                name,
                location: location.as_str().to_string(),
                required: field.is_required(),
                schema: schema_gen.field_schema(field),
                description: field.doc.clone(),
            });
        }
        parameters
    }

    /// Build the final OpenAPI document
    ///
    /// The tag catalog and the security scheme definitions are collected from
    /// the operations that made it into the document.
    pub fn build(self, schema_gen: &SchemaGenerator) -> OpenApiDocument {
        debug!("Building final OpenAPI document");

        let mut tags = BTreeSet::new();
        let mut scheme_names = BTreeSet::new();
        for operation in self.paths.values().flat_map(PathItem::operations) {
            tags.extend(operation.tags.iter().cloned());
            for requirement in &operation.security {
                scheme_names.extend(requirement.keys().cloned());
            }
        }

        let security_schemes: BTreeMap<String, SecurityScheme> = self
            .schemes
            .into_iter()
            .filter(|(name, _)| scheme_names.contains(name))
            .collect();
        let schemas = schema_gen.schemas();

        let components = if schemas.is_empty() && security_schemes.is_empty() {
            None
        } else {
            Some(Components {
                schemas: (!schemas.is_empty()).then_some(schemas),
                security_schemes: (!security_schemes.is_empty()).then_some(security_schemes),
            })
        };

        OpenApiDocument {
            openapi: "3.1.0".to_string(),
            info: self.info,
            paths: self.paths,
            components,
            tags: tags.into_iter().map(|name| Tag { name }).collect(),
        }
    }

    /// Skipped routes and conflicting API key headers, as warnings.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }
}

impl PathItem {
    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }

    /// The operations present, in method order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        [
            &self.get,
            &self.post,
            &self.put,
            &self.delete,
            &self.patch,
            &self.options,
            &self.head,
        ]
        .into_iter()
        .flatten()
    }
}

impl From<&InfoConfig> for Info {
    fn from(info: &InfoConfig) -> Self {
        Self {
            title: info.title.clone(),
            version: info.version.clone(),
            description: info.description.clone(),
        }
    }
}

/// The request field a path placeholder binds to.
fn placeholder_field<'f>(fields: &'f [FieldDescriptor], name: &str) -> Option<&'f FieldDescriptor> {
    fields.iter().find(|f| param_name(f) == name || f.name == name)
}

fn param_name(field: &FieldDescriptor) -> String {
    if field.wire_name.is_empty() {
        field.name.clone()
    } else {
        field.wire_name.clone()
    }
}

fn json_content(schema: Schema) -> BTreeMap<String, MediaType> {
    BTreeMap::from([(JSON.to_string(), MediaType { schema })])
}

fn response(description: &str, schema: Schema) -> Response {
    Response {
        description: description.to_string(),
        content: Some(json_content(schema)),
    }
}

fn security_scheme(requirement: &SecurityRequirement) -> SecurityScheme {
    match requirement {
        SecurityRequirement::Basic => SecurityScheme {
            scheme_type: "http".to_string(),
            scheme: Some("basic".to_string()),
            bearer_format: None,
            name: None,
            location: None,
        },
        SecurityRequirement::Bearer { .. } => SecurityScheme {
            scheme_type: "http".to_string(),
            scheme: Some("bearer".to_string()),
            bearer_format: Some("JWT".to_string()),
            name: None,
            location: None,
        },
        SecurityRequirement::ApiKey { header } => SecurityScheme {
            scheme_type: "apiKey".to_string(),
            scheme: None,
            bearer_format: None,
            name: Some(header.clone()),
            location: Some("header".to_string()),
        },
    }
}
