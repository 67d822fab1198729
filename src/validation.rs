use std::fmt;

use crate::settings::ConfigurationSettings;

/// A single failed rule, keyed by the configuration property it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub property: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(property: &'static str, message: impl Into<String>) -> Self {
        Self {
            property,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.message)
    }
}

/// Preconditions checked before any process is spawned.
///
/// Every property is checked independently so the user sees all problems at once.
#[derive(Debug, Default)]
pub struct ConfigurationSettingsValidator;

impl ConfigurationSettingsValidator {
    pub fn validate(&self, settings: &ConfigurationSettings) -> Vec<Violation> {
        let mut violations = Vec::new();

        if settings.assembly.trim().is_empty() {
            violations.push(Violation::new("Assembly", "Assembly is required"));
        } else if !settings.assembly_path().is_file() {
            violations.push(Violation::new("Assembly", "Assembly file must exist"));
        }

        if let Some(output) = settings.output() {
            if !output.is_dir() {
                violations.push(Violation::new("Output", "Output folder must exist"));
            }
        }

        if let Some(host) = settings.host() {
            if !is_absolute_uri(host) {
                violations.push(Violation::new("Host", "Host must be a valid URI"));
            }
        }

        violations
    }

    pub fn validate_and_throw(&self, settings: &ConfigurationSettings) -> crate::Result<()> {
        let violations = self.validate(settings);
        if violations.is_empty() {
            return Ok(());
        }

        for violation in &violations {
            log::error!("{}", violation);
        }
        Err(crate::Error::Validation(violations))
    }
}

fn is_absolute_uri(value: &str) -> bool {
    url::Url::parse(value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        let assembly = dir.path().join("app.dll");
        std::fs::write(&assembly, b"").unwrap();
        let assembly = assembly.to_string_lossy().to_string();
        (dir, assembly)
    }

    #[test]
    fn test_valid_settings_have_no_violations() {
        let (dir, assembly) = fixture();

        let minimal = ConfigurationSettings {
            assembly: assembly.clone(),
            ..Default::default()
        };
        assert!(ConfigurationSettingsValidator.validate(&minimal).is_empty());

        let full = ConfigurationSettings {
            assembly,
            output: Some(dir.path().to_string_lossy().to_string()),
            host: Some("http://localhost:5000".to_string()),
            base_path: Some("/api".to_string()),
            ..Default::default()
        };
        assert!(ConfigurationSettingsValidator.validate(&full).is_empty());
        assert!(ConfigurationSettingsValidator.validate_and_throw(&full).is_ok());
    }

    #[test]
    fn test_missing_assembly_is_single_violation() {
        let settings = ConfigurationSettings {
            assembly: "/nowhere/app.dll".to_string(),
            ..Default::default()
        };
        let violations = ConfigurationSettingsValidator.validate(&settings);
        assert_eq!(
            violations,
            vec![Violation::new("Assembly", "Assembly file must exist")]
        );
    }

    #[test]
    fn test_empty_assembly_is_required() {
        let settings = ConfigurationSettings::default();
        let violations = ConfigurationSettingsValidator.validate(&settings);
        assert_eq!(violations, vec![Violation::new("Assembly", "Assembly is required")]);
    }

    #[test]
    fn test_assembly_pointing_at_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let settings = ConfigurationSettings {
            assembly: dir.path().to_string_lossy().to_string(),
            ..Default::default()
        };
        let violations = ConfigurationSettingsValidator.validate(&settings);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].property, "Assembly");
    }

    #[test]
    fn test_all_violations_are_collected() {
        let settings = ConfigurationSettings {
            assembly: "/nowhere/app.dll".to_string(),
            output: Some("/nowhere/out".to_string()),
            host: Some("not a uri".to_string()),
            ..Default::default()
        };
        let violations = ConfigurationSettingsValidator.validate(&settings);
        let properties: Vec<_> = violations.iter().map(|v| v.property).collect();
        assert_eq!(properties, vec!["Assembly", "Output", "Host"]);
    }

    #[test]
    fn test_output_must_be_directory() {
        let (_dir, assembly) = fixture();
        let settings = ConfigurationSettings {
            output: Some(assembly.clone()),
            assembly,
            ..Default::default()
        };
        let violations = ConfigurationSettingsValidator.validate(&settings);
        assert_eq!(
            violations,
            vec![Violation::new("Output", "Output folder must exist")]
        );
    }

    #[test]
    fn test_relative_host_is_rejected() {
        let (_dir, assembly) = fixture();
        let settings = ConfigurationSettings {
            assembly,
            host: Some("localhost/api".to_string()),
            ..Default::default()
        };
        let err = ConfigurationSettingsValidator
            .validate_and_throw(&settings)
            .unwrap_err();
        match err {
            crate::Error::Validation(violations) => {
                assert_eq!(violations, vec![Violation::new("Host", "Host must be a valid URI")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
