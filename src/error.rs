use crate::validation::Violation;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation failed: {}", format_violations(.0))]
    Validation(Vec<Violation>),
    #[error("Multiple {0} classes detected")]
    AmbiguousFactory(String),
    #[error(
        "{factory} class detected but does not contain a public static method called {method} with return type {return_type}"
    )]
    FactorySignature {
        factory: String,
        method: String,
        return_type: &'static str,
    },
    #[error("Resolution error: {0}")]
    Resolution(String),
    #[error("Unknown Swagger document - {0}")]
    UnknownDocument(String),
    #[error("Child process error: {0}")]
    ChildProcess(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error(transparent)]
    Target(#[from] anyhow::Error),
}

impl Error {
    /// Process exit code reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration(_) | Error::Validation(_) | Error::Parse(_) => 2,
            Error::AmbiguousFactory(_) | Error::FactorySignature { .. } => 3,
            Error::ChildProcess(_) => 4,
            Error::Io(_) | Error::Serialization(_) => 5,
            Error::Resolution(_) | Error::UnknownDocument(_) | Error::Target(_) => 1,
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
