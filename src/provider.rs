use openapiv3::{OpenAPI, Server};

/// Produces the OpenAPI document registered under a name.
pub trait SwaggerProvider {
    /// `host` and `base_path` override the document's servers when given.
    fn get_swagger(
        &self,
        document_name: &str,
        host: Option<&str>,
        base_path: Option<&str>,
    ) -> crate::Result<OpenAPI>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiVersionDescription {
    pub group_name: String,
    pub deprecated: bool,
}

/// Enumerates the document versions a target application exposes.
pub trait ApiVersionDescriptionProvider {
    fn api_version_descriptions(&self) -> Vec<ApiVersionDescription>;
}

struct Entry {
    name: String,
    document: OpenAPI,
    deprecated: bool,
}

/// Ordered set of named documents, usable as both providers.
#[derive(Default)]
pub struct DocumentSet {
    entries: Vec<Entry>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, name: impl Into<String>, document: OpenAPI) -> Self {
        self.insert(name.into(), document, false)
    }

    pub fn with_deprecated_document(self, name: impl Into<String>, document: OpenAPI) -> Self {
        self.insert(name.into(), document, true)
    }

    fn insert(mut self, name: String, document: OpenAPI, deprecated: bool) -> Self {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.document = document;
                entry.deprecated = deprecated;
            }
            None => self.entries.push(Entry {
                name,
                document,
                deprecated,
            }),
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

impl SwaggerProvider for DocumentSet {
    fn get_swagger(
        &self,
        document_name: &str,
        host: Option<&str>,
        base_path: Option<&str>,
    ) -> crate::Result<OpenAPI> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == document_name)
            .ok_or_else(|| {
                crate::Error::UnknownDocument(format!(
                    "{}. Known Swagger documents: {}",
                    document_name,
                    self.names().collect::<Vec<_>>().join(",")
                ))
            })?;

        let mut document = entry.document.clone();
        if host.is_some() || base_path.is_some() {
            document.servers = vec![Server {
                url: format!("{}{}", host.unwrap_or_default(), base_path.unwrap_or_default()),
                ..Default::default()
            }];
        }
        Ok(document)
    }
}

impl ApiVersionDescriptionProvider for DocumentSet {
    fn api_version_descriptions(&self) -> Vec<ApiVersionDescription> {
        self.entries
            .iter()
            .map(|e| ApiVersionDescription {
                group_name: e.name.clone(),
                deprecated: e.deprecated,
            })
            .collect()
    }
}
