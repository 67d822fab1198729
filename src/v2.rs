//! Down-conversion of OpenAPI 3.0 documents to Swagger 2.0.
//!
//! The conversion works on the JSON form of the document. Constructs that have no
//! Swagger 2.0 equivalent (cookie parameters, `trace` operations, `oneOf`/`anyOf`,
//! OpenID Connect security schemes, callbacks, links) are dropped, along with the
//! references and security requirements that point at them.

use openapiv3::OpenAPI;
use std::collections::BTreeSet;

use serde_json::{Map, Value, json};

/// Operations Swagger 2.0 can describe. `trace` has no counterpart.
const HTTP_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];
const FORM_MEDIA_TYPES: [&str; 2] = ["application/x-www-form-urlencoded", "multipart/form-data"];
const JSON_MEDIA_TYPE: &str = "application/json";

static NULL: Value = Value::Null;

/// Schema keywords carried over onto non-body parameters and headers.
const SIMPLE_SCHEMA_KEYS: [&str; 16] = [
    "type",
    "format",
    "items",
    "enum",
    "default",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "minLength",
    "maxLength",
    "pattern",
    "minItems",
    "maxItems",
    "uniqueItems",
    "multipleOf",
];

const REF_PREFIXES: [(&str, &str); 3] = [
    ("#/components/schemas/", "#/definitions/"),
    ("#/components/parameters/", "#/parameters/"),
    ("#/components/responses/", "#/responses/"),
];

pub fn to_swagger2(document: &OpenAPI) -> crate::Result<Value> {
    let v3 = serde_json::to_value(document)
        .map_err(|e| crate::Error::Serialization(e.to_string()))?;
    let empty = Map::new();
    let components = v3
        .get("components")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let mut converter = Converter {
        components,
        schemas: section(components, "schemas").unwrap_or(&empty),
        parameter_names: None,
        security_names: BTreeSet::new(),
    };

    let parameters = section(components, "parameters")
        .map(|parameters| map_values(parameters, |p| converter.parameter(p)));
    let security_definitions = section(components, "securitySchemes")
        .map(|schemes| map_values(schemes, convert_security_scheme));
    converter.parameter_names = Some(keys(parameters.as_ref()));
    converter.security_names = keys(security_definitions.as_ref());

    let mut out = Map::new();
    out.insert("swagger".to_string(), Value::from("2.0"));
    copy_key(&v3, &mut out, "info");

    if let Some(servers) = v3.get("servers").and_then(Value::as_array) {
        write_servers(servers, &mut out);
    }

    let mut paths = Map::new();
    if let Some(v3_paths) = v3.get("paths").and_then(Value::as_object) {
        for (path, item) in v3_paths {
            if is_extension(path) {
                paths.insert(path.clone(), item.clone());
            } else {
                paths.insert(path.clone(), converter.path_item(item));
            }
        }
    }
    out.insert("paths".to_string(), Value::Object(paths));

    if let Some(schemas) = section(components, "schemas") {
        out.insert(
            "definitions".to_string(),
            map_values(schemas, |s| Some(convert_schema(s))),
        );
    }
    if let Some(parameters) = parameters {
        out.insert("parameters".to_string(), parameters);
    }
    if let Some(responses) = section(components, "responses") {
        out.insert(
            "responses".to_string(),
            map_values(responses, |r| Some(converter.response(r).0)),
        );
    }
    if let Some(definitions) = security_definitions {
        if definitions.as_object().is_some_and(|d| !d.is_empty()) {
            out.insert("securityDefinitions".to_string(), definitions);
        }
    }

    converter.copy_security(&v3, &mut out);
    for key in ["tags", "externalDocs"] {
        copy_key(&v3, &mut out, key);
    }
    copy_extensions(&v3, &mut out);

    Ok(rewrite_refs(Value::Object(out)))
}

struct Converter<'a> {
    components: &'a Map<String, Value>,
    schemas: &'a Map<String, Value>,
    /// Component parameters that survived conversion. `None` while they are converted.
    parameter_names: Option<BTreeSet<String>>,
    /// Security schemes that survived conversion.
    security_names: BTreeSet<String>,
}

impl Converter<'_> {
    fn path_item(&self, item: &Value) -> Value {
        let Some(item) = item.as_object() else {
            return item.clone();
        };
        if let Some(reference) = item.get("$ref") {
            return json!({ "$ref": reference });
        }

        let mut out = Map::new();
        for (key, value) in item {
            if HTTP_METHODS.contains(&key.as_str()) {
                out.insert(key.clone(), self.operation(value));
            } else if key == "parameters" {
                out.insert(key.clone(), self.parameters(value));
            } else if is_extension(key) {
                out.insert(key.clone(), value.clone());
            }
        }
        Value::Object(out)
    }

    fn operation(&self, operation: &Value) -> Value {
        let mut out = Map::new();
        for key in [
            "tags",
            "summary",
            "description",
            "externalDocs",
            "operationId",
        ] {
            copy_key(operation, &mut out, key);
        }

        let mut parameters = match self.parameters(operation.get("parameters").unwrap_or(&NULL)) {
            Value::Array(parameters) => parameters,
            _ => Vec::new(),
        };

        let mut consumes = Vec::new();
        if let Some(body) = operation.get("requestBody").map(|b| self.resolve_request_body(b)) {
            let content = body.get("content").and_then(Value::as_object);
            consumes.extend(content.into_iter().flat_map(|c| c.keys().cloned()));

            let form = content.and_then(|c| {
                FORM_MEDIA_TYPES
                    .iter()
                    .find_map(|media_type| c.get(*media_type))
            });
            match form {
                Some(media_type) => parameters.extend(self.form_parameters(media_type)),
                None => parameters.extend(body_parameter(body)),
            }
        }
        if !parameters.is_empty() {
            out.insert("parameters".to_string(), Value::Array(parameters));
        }

        let mut produces: Vec<String> = Vec::new();
        let mut responses = Map::new();
        if let Some(v3_responses) = operation.get("responses").and_then(Value::as_object) {
            for (code, response) in v3_responses {
                if is_extension(code) {
                    responses.insert(code.clone(), response.clone());
                    continue;
                }
                let (converted, media_types) = self.response(response);
                for media_type in media_types {
                    if !produces.contains(&media_type) {
                        produces.push(media_type);
                    }
                }
                responses.insert(code.clone(), converted);
            }
        }

        if !consumes.is_empty() {
            out.insert("consumes".to_string(), json!(consumes));
        }
        if !produces.is_empty() {
            out.insert("produces".to_string(), json!(produces));
        }
        out.insert("responses".to_string(), Value::Object(responses));

        if operation.get("deprecated") == Some(&Value::Bool(true)) {
            out.insert("deprecated".to_string(), Value::Bool(true));
        }
        self.copy_security(operation, &mut out);
        copy_extensions(operation, &mut out);
        Value::Object(out)
    }

    fn parameters(&self, parameters: &Value) -> Value {
        let converted = parameters
            .as_array()
            .map(|ps| ps.iter().filter_map(|p| self.parameter(p)).collect())
            .unwrap_or_default();
        Value::Array(converted)
    }

    fn parameter(&self, parameter: &Value) -> Option<Value> {
        if let Some(reference) = parameter.get("$ref") {
            let dangling = reference
                .as_str()
                .and_then(|r| r.strip_prefix("#/components/parameters/"))
                .zip(self.parameter_names.as_ref())
                .is_some_and(|(name, kept)| !kept.contains(name));
            return (!dangling).then(|| json!({ "$ref": reference }));
        }

        let location = parameter.get("in").and_then(Value::as_str)?;
        if !matches!(location, "query" | "header" | "path") {
            return None;
        }

        let mut out = Map::new();
        for key in ["name", "in", "description"] {
            copy_key(parameter, &mut out, key);
        }
        if location == "path" || parameter.get("required") == Some(&Value::Bool(true)) {
            out.insert("required".to_string(), Value::Bool(true));
        }
        if parameter.get("allowEmptyValue") == Some(&Value::Bool(true)) {
            out.insert("allowEmptyValue".to_string(), Value::Bool(true));
        }

        let schema = parameter
            .get("schema")
            .map(|s| self.resolve_schema(s))
            .unwrap_or(&NULL);
        flatten_schema(schema, &mut out);
        if !out.contains_key("type") {
            out.insert("type".to_string(), Value::from("string"));
        }
        if out.get("type").and_then(Value::as_str) == Some("array") {
            out.insert(
                "collectionFormat".to_string(),
                Value::from(collection_format(parameter)),
            );
        }

        copy_extensions(parameter, &mut out);
        Some(Value::Object(out))
    }

    fn form_parameters(&self, media_type: &Value) -> Vec<Value> {
        let schema = media_type
            .get("schema")
            .map(|s| self.resolve_schema(s))
            .unwrap_or(&NULL);
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
            return Vec::new();
        };

        properties
            .iter()
            .map(|(name, property)| {
                let property = self.resolve_schema(property);
                let mut out = Map::new();
                out.insert("name".to_string(), Value::from(name.as_str()));
                out.insert("in".to_string(), Value::from("formData"));
                copy_key(property, &mut out, "description");
                if required.contains(&name.as_str()) {
                    out.insert("required".to_string(), Value::Bool(true));
                }
                if property.get("format").and_then(Value::as_str) == Some("binary") {
                    out.insert("type".to_string(), Value::from("file"));
                } else {
                    flatten_schema(property, &mut out);
                }
                Value::Object(out)
            })
            .collect()
    }

    /// Returns the converted response and the media types it declares.
    fn response(&self, response: &Value) -> (Value, Vec<String>) {
        if let Some(reference) = response.get("$ref") {
            return (json!({ "$ref": reference }), Vec::new());
        }

        let mut out = Map::new();
        out.insert(
            "description".to_string(),
            response.get("description").cloned().unwrap_or_else(|| Value::from("")),
        );

        let content = response.get("content").and_then(Value::as_object);
        let media_types: Vec<String> = content
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default();
        if let Some(schema) = content
            .and_then(preferred_media_type)
            .and_then(|m| m.get("schema"))
        {
            out.insert("schema".to_string(), convert_schema(schema));
        }

        if let Some(headers) = response.get("headers").and_then(Value::as_object) {
            let mut converted = Map::new();
            for (name, header) in headers {
                let mut h = Map::new();
                copy_key(header, &mut h, "description");
                let schema = header
                    .get("schema")
                    .map(|s| self.resolve_schema(s))
                    .unwrap_or(&NULL);
                flatten_schema(schema, &mut h);
                if !h.contains_key("type") {
                    h.insert("type".to_string(), Value::from("string"));
                }
                converted.insert(name.clone(), Value::Object(h));
            }
            if !converted.is_empty() {
                out.insert("headers".to_string(), Value::Object(converted));
            }
        }

        copy_extensions(response, &mut out);
        (Value::Object(out), media_types)
    }

    /// Copies `security`, dropping requirements on schemes that were not converted.
    /// A list left empty by the filter is omitted rather than written as "no security".
    fn copy_security(&self, from: &Value, out: &mut Map<String, Value>) {
        let Some(requirements) = from.get("security").and_then(Value::as_array) else {
            return;
        };
        let kept: Vec<Value> = requirements
            .iter()
            .filter(|requirement| {
                requirement
                    .as_object()
                    .is_some_and(|r| r.keys().all(|name| self.security_names.contains(name)))
            })
            .cloned()
            .collect();
        if requirements.is_empty() || !kept.is_empty() {
            out.insert("security".to_string(), Value::Array(kept));
        }
    }

    fn resolve_request_body<'v>(&'v self, body: &'v Value) -> &'v Value {
        body.get("$ref")
            .and_then(Value::as_str)
            .and_then(|r| r.strip_prefix("#/components/requestBodies/"))
            .and_then(|name| section(self.components, "requestBodies")?.get(name))
            .unwrap_or(body)
    }

    fn resolve_schema<'v>(&'v self, schema: &'v Value) -> &'v Value {
        schema
            .get("$ref")
            .and_then(Value::as_str)
            .and_then(|r| r.strip_prefix("#/components/schemas/"))
            .and_then(|name| self.schemas.get(name))
            .unwrap_or(schema)
    }
}

fn body_parameter(body: &Value) -> Option<Value> {
    let content = body.get("content").and_then(Value::as_object)?;
    let schema = preferred_media_type(content)?.get("schema")?;

    let mut out = Map::new();
    out.insert(
        "name".to_string(),
        body.get("x-bodyName").cloned().unwrap_or_else(|| Value::from("body")),
    );
    out.insert("in".to_string(), Value::from("body"));
    copy_key(body, &mut out, "description");
    if body.get("required") == Some(&Value::Bool(true)) {
        out.insert("required".to_string(), Value::Bool(true));
    }
    out.insert("schema".to_string(), convert_schema(schema));
    Some(Value::Object(out))
}

fn preferred_media_type(content: &Map<String, Value>) -> Option<&Value> {
    content
        .get(JSON_MEDIA_TYPE)
        .or_else(|| content.values().next())
}

fn collection_format(parameter: &Value) -> &'static str {
    let explode = parameter.get("explode").and_then(Value::as_bool);
    match parameter.get("style").and_then(Value::as_str) {
        Some("spaceDelimited") => "ssv",
        Some("pipeDelimited") => "pipes",
        Some("form") | None if parameter.get("in").and_then(Value::as_str) == Some("query") => {
            if explode.unwrap_or(true) { "multi" } else { "csv" }
        }
        _ => "csv",
    }
}

/// Converts a schema object, recursing into nested schemas.
fn convert_schema(schema: &Value) -> Value {
    let Some(object) = schema.as_object() else {
        return schema.clone();
    };
    if let Some(reference) = object.get("$ref") {
        return json!({ "$ref": reference });
    }

    let mut out = Map::new();
    for (key, value) in object {
        match key.as_str() {
            "nullable" => {
                if value == true {
                    out.insert("x-nullable".to_string(), Value::Bool(true));
                }
            }
            "oneOf" | "anyOf" | "not" | "writeOnly" | "deprecated" => {}
            "discriminator" => {
                if let Some(name) = value.get("propertyName") {
                    out.insert(key.clone(), name.clone());
                }
            }
            "properties" => {
                let properties = value.as_object().map(|p| {
                    p.iter()
                        .map(|(name, s)| (name.clone(), convert_schema(s)))
                        .collect::<Map<_, _>>()
                });
                out.insert(key.clone(), properties.map(Value::Object).unwrap_or_default());
            }
            "allOf" => {
                let all = value
                    .as_array()
                    .map(|a| a.iter().map(convert_schema).collect())
                    .unwrap_or_default();
                out.insert(key.clone(), Value::Array(all));
            }
            "items" | "additionalProperties" => {
                out.insert(key.clone(), convert_schema(value));
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(out)
}

fn flatten_schema(schema: &Value, out: &mut Map<String, Value>) {
    for key in SIMPLE_SCHEMA_KEYS {
        if let Some(value) = schema.get(key) {
            let value = if key == "items" {
                convert_schema(value)
            } else {
                value.clone()
            };
            out.insert(key.to_string(), value);
        }
    }
}

fn convert_security_scheme(scheme: &Value) -> Option<Value> {
    let mut out = match scheme.get("type")?.as_str()? {
        "apiKey" => json!({
            "type": "apiKey",
            "name": scheme.get("name")?,
            "in": scheme.get("in")?,
        }),
        "http" => match scheme.get("scheme")?.as_str()?.to_ascii_lowercase().as_str() {
            "basic" => json!({ "type": "basic" }),
            "bearer" => json!({ "type": "apiKey", "name": "Authorization", "in": "header" }),
            _ => return None,
        },
        "oauth2" => {
            let flows = scheme.get("flows")?;
            let (flow, settings) = [
                ("implicit", "implicit"),
                ("password", "password"),
                ("clientCredentials", "application"),
                ("authorizationCode", "accessCode"),
            ]
            .into_iter()
            .find_map(|(v3, v2)| flows.get(v3).map(|settings| (v2, settings)))?;

            let mut oauth = json!({ "type": "oauth2", "flow": flow });
            for key in ["authorizationUrl", "tokenUrl", "scopes"] {
                if let Some(value) = settings.get(key) {
                    oauth[key] = value.clone();
                }
            }
            oauth
        }
        _ => return None,
    };

    if let Some(description) = scheme.get("description") {
        out["description"] = description.clone();
    }
    Some(out)
}

fn write_servers(servers: &[Value], out: &mut Map<String, Value>) {
    let urls: Vec<String> = servers.iter().filter_map(server_url).collect();
    let Some(first) = urls.first() else {
        return;
    };

    match url::Url::parse(first) {
        Ok(parsed) => {
            let host = authority(&parsed);
            if !host.is_empty() {
                out.insert("host".to_string(), Value::from(host.as_str()));
            }
            let path = parsed.path().trim_end_matches('/');
            if !path.is_empty() {
                out.insert("basePath".to_string(), Value::from(path));
            }

            let mut schemes: Vec<String> = Vec::new();
            for url in urls.iter().filter_map(|u| url::Url::parse(u).ok()) {
                if authority(&url) == host && !schemes.contains(&url.scheme().to_string()) {
                    schemes.push(url.scheme().to_string());
                }
            }
            out.insert("schemes".to_string(), json!(schemes));
        }
        Err(_) => {
            let path = first.trim_end_matches('/');
            if !path.is_empty() {
                out.insert("basePath".to_string(), Value::from(path));
            }
        }
    }
}

fn authority(url: &url::Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        _ => String::new(),
    }
}

/// Server URL with its variables replaced by their defaults.
fn server_url(server: &Value) -> Option<String> {
    let mut url = server.get("url")?.as_str()?.to_string();
    if let Some(variables) = server.get("variables").and_then(Value::as_object) {
        for (name, variable) in variables {
            if let Some(default) = variable.get("default").and_then(Value::as_str) {
                url = url.replace(&format!("{{{}}}", name), default);
            }
        }
    }
    Some(url)
}

fn rewrite_refs(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| match value {
                    Value::String(reference) if key == "$ref" => {
                        (key, Value::String(rewrite_ref(reference)))
                    }
                    other => (key, rewrite_refs(other)),
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(rewrite_refs).collect()),
        other => other,
    }
}

fn rewrite_ref(reference: String) -> String {
    REF_PREFIXES
        .iter()
        .find_map(|(v3, v2)| reference.strip_prefix(v3).map(|name| format!("{}{}", v2, name)))
        .unwrap_or(reference)
}

fn section<'a>(components: &'a Map<String, Value>, name: &str) -> Option<&'a Map<String, Value>> {
    components.get(name).and_then(Value::as_object)
}

fn keys(section: Option<&Value>) -> BTreeSet<String> {
    section
        .and_then(Value::as_object)
        .map(|s| s.keys().cloned().collect())
        .unwrap_or_default()
}

fn map_values(values: &Map<String, Value>, convert: impl Fn(&Value) -> Option<Value>) -> Value {
    Value::Object(
        values
            .iter()
            .filter_map(|(name, value)| convert(value).map(|v| (name.clone(), v)))
            .collect(),
    )
}

fn copy_key(from: &Value, to: &mut Map<String, Value>, key: &str) {
    if let Some(value) = from.get(key) {
        to.insert(key.to_string(), value.clone());
    }
}

fn copy_extensions(from: &Value, to: &mut Map<String, Value>) {
    if let Some(object) = from.as_object() {
        for (key, value) in object.iter().filter(|(k, _)| is_extension(k)) {
            to.insert(key.clone(), value.clone());
        }
    }
}

fn is_extension(key: &str) -> bool {
    key.starts_with("x-")
}
