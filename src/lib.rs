//! Exports OpenAPI documents from an application's service graph.
//!
//! `swagger tofile <config>` validates the configuration, then re-executes the
//! running binary as `swagger _tofile <config>` under the target module's runtime
//! manifests. The child resolves the module from a [`module::ModuleRegistry`],
//! builds its service graph and writes the documents as JSON and/or YAML.

pub mod cli;
pub mod error;
pub mod export;
pub mod hosting;
pub mod manifest;
pub mod module;
pub mod petstore;
pub mod process;
pub mod program;
pub mod provider;
pub mod resolver;
pub mod services;
pub mod settings;
pub mod v2;
pub mod validation;
pub mod writer;

pub use error::{Error, Result};
