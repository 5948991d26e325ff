// Integration tests for end-to-end OpenAPI document generation
use apicontract::config::{GeneratorConfig, ParameterStyle};
use apicontract::openapi_builder::OpenApiDocument;
use apicontract::pipeline::{Pipeline, PipelineOutput};
use apicontract::serializer::{serialize_json, serialize_yaml};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper function to create a temporary project with the given files
fn create_test_project(files: Vec<(&str, &str)>) -> TempDir {
    let temp_dir = TempDir::new().unwrap();

    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&file_path, content).unwrap();
    }

    temp_dir
}

fn accounts_project() -> TempDir {
    create_test_project(vec![
        ("src/models.rs", include_str!("fixtures/accounts_models.rs")),
        ("src/handlers.rs", include_str!("fixtures/accounts_handlers.rs")),
        ("src/routes.rs", include_str!("fixtures/accounts_routes.rs")),
    ])
}

fn run(project: &TempDir, config: GeneratorConfig) -> PipelineOutput {
    Pipeline::new(config)
        .run(&[project.path().join("src")], &[])
        .unwrap()
}

fn to_value(document: &OpenApiDocument) -> Value {
    serde_json::from_str(&serialize_json(document).unwrap()).unwrap()
}

#[test]
fn test_accounts_service_end_to_end() {
    let project = accounts_project();
    let output = run(&project, GeneratorConfig::default());
    let doc = to_value(&output.document);

    assert_eq!(doc["openapi"], "3.1.0");
    assert_eq!(output.stats.files, 3);
    assert_eq!(output.stats.routes, 6);
    assert_eq!(output.stats.operations, 5);

    let paths: Vec<_> = output.document.paths.keys().cloned().collect();
    assert_eq!(paths, vec!["/users", "/users/{id}"]);

    let listing = &doc["paths"]["/users"]["get"];
    assert_eq!(listing["operationId"], "list_users");
    assert_eq!(listing["description"], "List users of a tenant");
    assert_eq!(
        listing["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"type": "array", "items": {"$ref": "#/components/schemas/User"}})
    );

    let creation = &doc["paths"]["/users"]["post"];
    assert_eq!(creation["tags"], json!(["users"]));
    assert_eq!(creation["security"], json!([{"bearerAuth": ["users:write"]}]));
    assert_eq!(creation["requestBody"]["required"], true);
    assert_eq!(
        creation["requestBody"]["content"]["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/CreateUserRequest"})
    );

    let fetch = &doc["paths"]["/users/{id}"]["get"];
    assert_eq!(fetch["description"], "Fetch a single user");
    assert_eq!(
        fetch["parameters"],
        json!([{"name": "id", "in": "path", "required": true, "schema": {"type": "string", "format": "uuid"}}])
    );

    let deletion = &doc["paths"]["/users/{id}"]["delete"];
    assert_eq!(deletion["security"], json!([{"basicAuth": []}]));
    assert_eq!(deletion["responses"]["200"]["content"]["application/json"]["schema"], json!({"type": "object"}));

    assert_eq!(doc["tags"], json!([{"name": "admin"}, {"name": "users"}]));
    assert_eq!(
        doc["components"]["securitySchemes"],
        json!({
            "basicAuth": {"type": "http", "scheme": "basic"},
            "bearerAuth": {"type": "http", "scheme": "bearer", "bearerFormat": "JWT"}
        })
    );
}

#[test]
fn test_user_schema_constraints() {
    let project = accounts_project();
    let doc = to_value(&run(&project, GeneratorConfig::default()).document);
    let user = &doc["components"]["schemas"]["User"];

    assert_eq!(user["description"], "A registered user");
    assert_eq!(user["required"], json!(["email", "username", "created_at"]));
    assert_eq!(user["properties"]["email"]["format"], "email");
    assert_eq!(user["properties"]["email"]["maxLength"], 255);
    assert_eq!(user["properties"]["username"]["pattern"], "^[a-zA-Z0-9]+$");
    assert_eq!(user["properties"]["username"]["minLength"], 3);
    assert_eq!(user["properties"]["age"]["minimum"], 0);
    assert_eq!(user["properties"]["age"]["maximum"], 150);
    assert_eq!(user["properties"]["age"]["nullable"], true);

    // flattened audit fields, skipped hash
    assert_eq!(user["properties"]["created_at"]["format"], "date-time");
    assert_eq!(user["properties"]["created_at"]["description"], "When the record was created");
    assert_eq!(user["properties"]["legacy_id"]["deprecated"], true);
    assert!(user["properties"].get("password_hash").is_none());
    assert!(user["properties"].get("audit").is_none());

    assert_eq!(user["properties"]["status"], json!({"$ref": "#/components/schemas/Status"}));
    assert_eq!(
        doc["components"]["schemas"]["Status"],
        json!({"type": "string", "enum": ["active", "suspended", "closed"]})
    );
}

#[test]
fn test_path_fields_stay_out_of_the_body() {
    let project = accounts_project();
    let doc = to_value(&run(&project, GeneratorConfig::default()).document);

    let update = &doc["paths"]["/users/{id}"]["put"];
    assert_eq!(update["operationId"], "update_user");
    assert_eq!(update["parameters"][0]["name"], "id");
    assert_eq!(update["parameters"].as_array().unwrap().len(), 1);

    let body = &doc["components"]["schemas"]["UpdateUserRequest"];
    let properties: Vec<_> = body["properties"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(properties, vec!["nickname", "username"]);
    assert!(body.get("required").is_none());
}

#[test]
fn test_invalid_directive_degrades_to_warning() {
    let project = accounts_project();
    let doc = to_value(&run(&project, GeneratorConfig::default()).document);

    let nickname = &doc["components"]["schemas"]["UpdateUserRequest"]["properties"]["nickname"];
    let description = nickname["description"].as_str().unwrap();
    assert!(description.starts_with("WARNING: "));
    assert!(description.contains("max"));
    assert_eq!(nickname["type"], "string");
}

#[test]
fn test_unknown_handler_is_reported() {
    let project = accounts_project();
    let output = run(&project, GeneratorConfig::default());

    assert!(!output.document.paths.contains_key("/legacy"));
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.contains("legacy_handler") && d.contains("/legacy")));
}

#[test]
fn test_parameter_styles() {
    let project = accounts_project();

    let implicit = to_value(&run(&project, GeneratorConfig::default()).document);
    let names: Vec<_> = implicit["paths"]["/users"]["get"]["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| (p["name"].as_str().unwrap().to_string(), p["in"].as_str().unwrap().to_string()))
        .collect();
    assert_eq!(
        names,
        vec![
            ("limit".to_string(), "query".to_string()),
            ("cursor".to_string(), "query".to_string()),
            ("X-Tenant-Id".to_string(), "header".to_string()),
        ]
    );
    let limit = &implicit["paths"]["/users"]["get"]["parameters"][0];
    assert_eq!(limit["required"], false);
    assert_eq!(limit["schema"]["maximum"], 100);

    let config = GeneratorConfig {
        parameter_style: ParameterStyle::Explicit,
        ..GeneratorConfig::default()
    };
    let explicit = to_value(&run(&project, config).document);
    assert_eq!(
        explicit["paths"]["/users"]["get"]["parameters"],
        json!([{
            "name": "X-Tenant-Id",
            "in": "header",
            "required": true,
            "schema": {"type": "string", "format": "uuid"}
        }])
    );
}

#[test]
fn test_payments_unions_and_actix_routes() {
    let project = create_test_project(vec![("src/payments.rs", include_str!("fixtures/payments.rs"))]);
    let output = run(&project, GeneratorConfig::default());
    let doc = to_value(&output.document);

    let charge = &doc["paths"]["/charges"]["post"];
    assert_eq!(charge["operationId"], "create_charge");
    assert_eq!(
        charge["responses"]["200"]["content"]["application/json"]["schema"],
        json!({"$ref": "#/components/schemas/Charge"})
    );

    let schemas = &doc["components"]["schemas"];
    assert_eq!(
        schemas["PaymentMethod"],
        json!({
            "description": "How a charge is paid",
            "oneOf": [
                {"$ref": "#/components/schemas/Card"},
                {"$ref": "#/components/schemas/BankTransfer"}
            ],
            "discriminator": {
                "propertyName": "type",
                "mapping": {
                    "bank": "#/components/schemas/BankTransfer",
                    "card": "#/components/schemas/Card"
                }
            }
        })
    );

    let request = &schemas["ChargeRequest"];
    assert_eq!(request["required"], json!(["amount", "currency"]));
    assert_eq!(request["properties"]["amount"]["minimum"], 0);
    assert_eq!(request["properties"]["amount"]["exclusiveMinimum"], true);
    assert_eq!(request["properties"]["currency"]["enum"], json!(["usd", "eur", "gbp"]));
    assert_eq!(request["properties"]["method"], json!({"$ref": "#/components/schemas/PaymentMethod"}));
    assert_eq!(request["properties"]["metadata"]["additionalProperties"], json!({"type": "string"}));

    let refund = &request["properties"]["refund_to"];
    assert_eq!(refund["discriminator"]["propertyName"], "kind");
    assert_eq!(refund["oneOf"].as_array().unwrap().len(), 2);

    let card = &schemas["Card"]["properties"]["number"];
    assert_eq!(card["minLength"], 16);
    assert_eq!(card["maxLength"], 16);
    assert!(card["pattern"].is_string());
}

#[test]
fn test_accessor_companions_written() {
    let project = create_test_project(vec![("src/payments.rs", include_str!("fixtures/payments.rs"))]);
    let config = GeneratorConfig {
        accessors: true,
        ..GeneratorConfig::default()
    };
    let output = run(&project, config);

    let companion = project.path().join("src").join("payments_payment_method_accessors.rs");
    assert_eq!(output.accessors.len(), 1);
    assert_eq!(output.accessors[0].path, companion);

    let code = fs::read_to_string(&companion).unwrap();
    assert!(code.contains("pub trait PaymentMethodAccessors {"));
    assert!(code.contains("fn bank_transfer(&self) -> Option<&BankTransfer>"));
    assert!(code.contains("pub fn payment_method_from_card(value: Card) -> PaymentMethod {"));
}

#[test]
fn test_output_is_deterministic() {
    let project = accounts_project();
    let first = run(&project, GeneratorConfig::default());
    let second = run(&project, GeneratorConfig::default());

    assert_eq!(
        serialize_yaml(&first.document).unwrap(),
        serialize_yaml(&second.document).unwrap()
    );
    assert_eq!(
        serialize_json(&first.document).unwrap(),
        serialize_json(&second.document).unwrap()
    );
}

#[test]
fn test_config_file_drives_generation() {
    let project = accounts_project();
    let config_path = project.path().join("apicontract.yaml");
    fs::write(
        &config_path,
        "info:\n  title: Accounts\n  version: 2.1.0\n  description: User accounts\nparameter_style: explicit\n",
    )
    .unwrap();

    let config = GeneratorConfig::from_file(&config_path).unwrap();
    let doc = to_value(&run(&project, config).document);

    assert_eq!(doc["info"], json!({"title": "Accounts", "version": "2.1.0", "description": "User accounts"}));
    assert_eq!(doc["paths"]["/users"]["get"]["parameters"].as_array().unwrap().len(), 1);
}

#[test]
fn test_empty_project() {
    let project = create_test_project(vec![("src/lib.rs", "pub fn nothing() {}")]);
    let output = run(&project, GeneratorConfig::default());

    assert!(output.document.paths.is_empty());
    assert!(output.document.components.is_none());
    let yaml = serialize_yaml(&output.document).unwrap();
    assert!(yaml.contains("openapi: 3.1.0"));
}

#[test]
fn test_unparsable_file_is_fatal() {
    let project = create_test_project(vec![("src/broken.rs", "pub struct {")]);
    let result = Pipeline::default().run(&[PathBuf::from(project.path()).join("src")], &[]);
    assert!(result.is_err());
}
