//! Sample applications registered with the `swagger` binary.
//!
//! `petstore` exports a `SwaggerHostFactory`. `inventory` only has a startup, so it is
//! documented through the default web host, which reads `appsettings.json` from the
//! module's directory.

use std::sync::Arc;

use openapiv3::OpenAPI;
use serde_json::json;

use crate::hosting::{Host, HostingEnvironment};
use crate::module::{ExportedType, Factory, ModuleDefinition, ModuleRegistry};
use crate::provider::{ApiVersionDescriptionProvider, DocumentSet, SwaggerProvider};
use crate::resolver::{HOST_FACTORY_METHOD, HOST_FACTORY_TYPE};
use crate::services::ServiceCollection;

/// Overrides the petstore document title.
pub const TITLE_VARIABLE: &str = "PETSTORE_TITLE";

pub fn registry() -> crate::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    registry.register(petstore_module())?.register(inventory_module())?;
    Ok(registry)
}

pub fn petstore_module() -> ModuleDefinition {
    ModuleDefinition::new("petstore").export(
        ExportedType::new(format!("petstore::{}", HOST_FACTORY_TYPE))
            .with_method(HOST_FACTORY_METHOD, Factory::Host(create_host)),
    )
}

pub fn inventory_module() -> ModuleDefinition {
    ModuleDefinition::new("inventory").with_startup(inventory_startup)
}

fn create_host() -> anyhow::Result<Host> {
    let title = std::env::var(TITLE_VARIABLE).unwrap_or_else(|_| "Petstore".to_string());
    let documents = Arc::new(
        DocumentSet::new()
            .with_document("v1", petstore_v1(&title)?)
            .with_document("v2", petstore_v2(&title)?),
    );

    Host::builder()
        .configure_services(move |services| {
            add_documents(services, documents);
            Ok(())
        })
        .build()
}

fn inventory_startup(
    environment: &HostingEnvironment,
    services: &mut ServiceCollection,
) -> anyhow::Result<()> {
    let title = environment
        .setting("Title")
        .and_then(|t| t.as_str())
        .unwrap_or("Inventory");

    let document: OpenAPI = serde_json::from_value(json!({
        "openapi": "3.0.1",
        "info": { "title": title, "version": "v1" },
        "paths": {
            "/items": {
                "get": {
                    "operationId": "listItems",
                    "responses": { "200": { "description": "OK" } }
                }
            }
        }
    }))?;
    add_documents(services, Arc::new(DocumentSet::new().with_document("v1", document)));
    Ok(())
}

fn add_documents(services: &mut ServiceCollection, documents: Arc<DocumentSet>) {
    services
        .add::<dyn SwaggerProvider>(documents.clone())
        .add::<dyn ApiVersionDescriptionProvider>(documents);
}

fn petstore_v1(title: &str) -> anyhow::Result<OpenAPI> {
    Ok(serde_json::from_value(json!({
        "openapi": "3.0.1",
        "info": { "title": title, "version": "v1" },
        "servers": [{ "url": "https://petstore.example.com/api" }],
        "paths": {
            "/pets": {
                "get": {
                    "tags": ["pets"],
                    "operationId": "listPets",
                    "parameters": [
                        { "name": "limit", "in": "query", "schema": { "type": "integer", "format": "int32" } }
                    ],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "application/json": {
                                    "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
                                }
                            }
                        }
                    }
                },
                "post": {
                    "tags": ["pets"],
                    "operationId": "createPet",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
                        }
                    },
                    "responses": { "201": { "description": "Created" } }
                }
            },
            "/pets/{id}": {
                "get": {
                    "tags": ["pets"],
                    "operationId": "getPet",
                    "parameters": [
                        { "name": "id", "in": "path", "required": true, "schema": { "type": "integer", "format": "int64" } }
                    ],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": {
                                "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } }
                            }
                        },
                        "404": { "description": "Not Found" }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Pet": {
                    "type": "object",
                    "required": ["name"],
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "name": { "type": "string" },
                        "tag": { "type": "string", "nullable": true }
                    }
                }
            }
        }
    }))?)
}

fn petstore_v2(title: &str) -> anyhow::Result<OpenAPI> {
    let mut document = petstore_v1(title)?;
    document.info.version = "v2".to_string();

    let v2_paths: OpenAPI = serde_json::from_value(json!({
        "openapi": "3.0.1",
        "info": { "title": title, "version": "v2" },
        "paths": {
            "/pets/{id}/owner": {
                "get": {
                    "tags": ["owners"],
                    "operationId": "getPetOwner",
                    "parameters": [
                        { "name": "id", "in": "path", "required": true, "schema": { "type": "integer", "format": "int64" } }
                    ],
                    "responses": { "200": { "description": "OK" } },
                    "security": [{ "api_key": [] }]
                }
            }
        },
        "components": {
            "securitySchemes": {
                "api_key": { "type": "apiKey", "name": "X-Api-Key", "in": "header" }
            }
        }
    }))?;

    document.paths.paths.extend(v2_paths.paths.paths);
    if let (Some(components), Some(extra)) = (document.components.as_mut(), v2_paths.components) {
        components.security_schemes.extend(extra.security_schemes);
    }
    Ok(document)
}
