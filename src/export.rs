use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use openapiv3::OpenAPI;

use crate::provider::{ApiVersionDescriptionProvider, SwaggerProvider};
use crate::services::ServiceProvider;
use crate::settings::ConfigurationSettings;
use crate::writer::{OutputFormat, SpecVersion, write_document};

/// Writes every requested document, to files when an output directory is configured
/// and to stdout otherwise. Returns the process exit code.
pub fn export(services: &ServiceProvider, settings: &ConfigurationSettings) -> crate::Result<i32> {
    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    export_to(services, settings, &mut stdout)
}

/// Same as [`export`], with `stdout` standing in for the process's standard output.
pub fn export_to<W: Write>(
    services: &ServiceProvider,
    settings: &ConfigurationSettings,
    stdout: &mut W,
) -> crate::Result<i32> {
    let document_names = document_names(services, settings)?;
    let version = SpecVersion::from_flag(settings.serialize_as_v2);
    let formats = output_formats(settings);
    if formats.is_empty() {
        log::warn!("Neither OutputJson nor OutputYaml is set, no documents will be written");
    }

    for document_name in &document_names {
        let provider = services.get_required::<dyn SwaggerProvider>()?;
        let document =
            provider.get_swagger(document_name, settings.host(), settings.base_path())?;

        let output = settings.output();
        if let Some(dir) = output {
            if !dir.is_dir() {
                return Err(crate::Error::Configuration(format!(
                    "{} does not exist",
                    dir.display()
                )));
            }
            log::info!("Path: {}", dir.display());
        }

        for &format in &formats {
            match output {
                Some(dir) => {
                    let path = file_name(dir, document_name, format);
                    write_file(&document, format, version, &path)?;
                    log::info!("Swagger {} successfully written to {}", format, path.display());
                }
                None => {
                    write_document(&document, format, version, stdout)?;
                    stdout.flush()?;
                }
            }
        }
    }

    Ok(0)
}

/// `{dir}/{document_name}.{json|yaml}`
pub fn file_name(dir: &Path, document_name: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{}.{}", document_name, format.suffix()))
}

fn document_names(
    services: &ServiceProvider,
    settings: &ConfigurationSettings,
) -> crate::Result<Vec<String>> {
    if let Some(name) = settings.swagger_doc() {
        log::info!("Version defined: {}", name);
        return Ok(vec![name.to_string()]);
    }

    log::info!("Version not defined, extracting from the version description provider");
    let provider = services.get_required::<dyn ApiVersionDescriptionProvider>()?;
    Ok(provider
        .api_version_descriptions()
        .into_iter()
        .map(|d| d.group_name)
        .collect())
}

fn output_formats(settings: &ConfigurationSettings) -> Vec<OutputFormat> {
    let mut formats = Vec::with_capacity(2);
    if settings.output_json {
        formats.push(OutputFormat::Json);
    }
    if settings.output_yaml {
        formats.push(OutputFormat::Yaml);
    }
    formats
}

fn write_file(
    document: &OpenAPI,
    format: OutputFormat,
    version: SpecVersion,
    path: &Path,
) -> crate::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_document(document, format, version, &mut writer)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ApiVersionDescription, DocumentSet};
    use crate::services::ServiceCollection;
    use std::cell::{Cell, RefCell};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn document(title: &str) -> OpenAPI {
        serde_json::from_value(serde_json::json!({
            "openapi": "3.0.1",
            "info": { "title": title, "version": "1.0" },
            "paths": {}
        }))
        .unwrap()
    }

    /// Records every document request and every version enumeration.
    struct Recorder {
        versions: Vec<&'static str>,
        fail_on: Option<&'static str>,
        requested: RefCell<Vec<String>>,
        enumerated: Cell<usize>,
    }

    impl Recorder {
        fn new(versions: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                versions,
                fail_on: None,
                requested: RefCell::new(Vec::new()),
                enumerated: Cell::new(0),
            })
        }

        fn failing_on(versions: Vec<&'static str>, fail_on: &'static str) -> Arc<Self> {
            Arc::new(Self {
                versions,
                fail_on: Some(fail_on),
                requested: RefCell::new(Vec::new()),
                enumerated: Cell::new(0),
            })
        }
    }

    impl SwaggerProvider for Recorder {
        fn get_swagger(
            &self,
            document_name: &str,
            _host: Option<&str>,
            _base_path: Option<&str>,
        ) -> crate::Result<OpenAPI> {
            self.requested.borrow_mut().push(document_name.to_string());
            if self.fail_on == Some(document_name) {
                return Err(crate::Error::UnknownDocument(document_name.to_string()));
            }
            Ok(document(document_name))
        }
    }

    impl ApiVersionDescriptionProvider for Recorder {
        fn api_version_descriptions(&self) -> Vec<ApiVersionDescription> {
            self.enumerated.set(self.enumerated.get() + 1);
            self.versions
                .iter()
                .map(|v| ApiVersionDescription {
                    group_name: v.to_string(),
                    deprecated: false,
                })
                .collect()
        }
    }

    fn services_for(recorder: &Arc<Recorder>) -> ServiceProvider {
        let mut services = ServiceCollection::new();
        services
            .add::<dyn SwaggerProvider>(recorder.clone())
            .add::<dyn ApiVersionDescriptionProvider>(recorder.clone());
        services.build()
    }

    #[test]
    fn test_named_document_skips_version_enumeration() {
        let recorder = Recorder::new(vec!["v1", "v2"]);
        let settings = ConfigurationSettings {
            swagger_doc: Some("v1".to_string()),
            output_json: true,
            ..Default::default()
        };

        let mut stdout = Vec::new();
        let code = export_to(&services_for(&recorder), &settings, &mut stdout).unwrap();

        assert_eq!(code, 0);
        assert_eq!(*recorder.requested.borrow(), vec!["v1"]);
        assert_eq!(recorder.enumerated.get(), 0);
    }

    #[test]
    fn test_all_versions_requested_in_order() {
        let recorder = Recorder::new(vec!["v1", "v2"]);
        let settings = ConfigurationSettings {
            output_json: true,
            ..Default::default()
        };

        let mut stdout = Vec::new();
        export_to(&services_for(&recorder), &settings, &mut stdout).unwrap();

        assert_eq!(*recorder.requested.borrow(), vec!["v1", "v2"]);
        assert_eq!(recorder.enumerated.get(), 1);

        let text = String::from_utf8(stdout).unwrap();
        let first = text.find("\"title\": \"v1\"").unwrap();
        let second = text.find("\"title\": \"v2\"").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_json_and_yaml_files_for_one_document() {
        let dir = TempDir::new().unwrap();
        let services = {
            let mut services = ServiceCollection::new();
            services.add::<dyn SwaggerProvider>(Arc::new(
                DocumentSet::new().with_document("v1", document("Petstore")),
            ));
            services.build()
        };
        let settings = ConfigurationSettings {
            swagger_doc: Some("v1".to_string()),
            output: Some(dir.path().to_string_lossy().to_string()),
            output_json: true,
            output_yaml: true,
            ..Default::default()
        };

        let mut stdout = Vec::new();
        export_to(&services, &settings, &mut stdout).unwrap();
        assert!(stdout.is_empty());

        let mut files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        files.sort();
        assert_eq!(files, vec!["v1.json", "v1.yaml"]);

        let json: OpenAPI =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("v1.json")).unwrap())
                .unwrap();
        let yaml: OpenAPI =
            serde_yaml::from_str(&std::fs::read_to_string(dir.path().join("v1.yaml")).unwrap())
                .unwrap();
        assert_eq!(json, yaml);
        assert_eq!(json.info.title, "Petstore");
    }

    #[test]
    fn test_v2_files_when_requested() {
        let dir = TempDir::new().unwrap();
        let recorder = Recorder::new(vec!["v1"]);
        let settings = ConfigurationSettings {
            output: Some(dir.path().to_string_lossy().to_string()),
            serialize_as_v2: true,
            output_json: true,
            ..Default::default()
        };

        export_to(&services_for(&recorder), &settings, &mut Vec::new()).unwrap();

        let v2: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("v1.json")).unwrap())
                .unwrap();
        assert_eq!(v2["swagger"], "2.0");
    }

    #[test]
    fn test_first_failure_aborts_remaining_versions() {
        let dir = TempDir::new().unwrap();
        let recorder = Recorder::failing_on(vec!["v1", "v2", "v3"], "v2");
        let settings = ConfigurationSettings {
            output: Some(dir.path().to_string_lossy().to_string()),
            output_json: true,
            ..Default::default()
        };

        let err = export_to(&services_for(&recorder), &settings, &mut Vec::new()).unwrap_err();

        assert!(matches!(err, crate::Error::UnknownDocument(_)));
        assert_eq!(*recorder.requested.borrow(), vec!["v1", "v2"]);
        assert!(dir.path().join("v1.json").exists());
        assert!(!dir.path().join("v3.json").exists());
    }

    #[test]
    fn test_missing_version_provider_is_resolution_error() {
        let services = {
            let mut services = ServiceCollection::new();
            services.add::<dyn SwaggerProvider>(Arc::new(DocumentSet::new()));
            services.build()
        };
        let settings = ConfigurationSettings {
            output_json: true,
            ..Default::default()
        };

        let err = export_to(&services, &settings, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, crate::Error::Resolution(_)));
    }

    #[test]
    fn test_vanished_output_directory() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("gone");
        let recorder = Recorder::new(vec!["v1"]);
        let settings = ConfigurationSettings {
            output: Some(output.to_string_lossy().to_string()),
            output_yaml: true,
            ..Default::default()
        };

        let err = export_to(&services_for(&recorder), &settings, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, crate::Error::Configuration(_)));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            file_name(Path::new("/out"), "v1", OutputFormat::Yaml),
            PathBuf::from("/out/v1.yaml")
        );
    }
}
