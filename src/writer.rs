use std::fmt;
use std::io::Write;

use openapiv3::OpenAPI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn suffix(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecVersion {
    /// Swagger 2.0
    V2,
    /// OpenAPI 3.0
    V3,
}

impl SpecVersion {
    pub fn from_flag(serialize_as_v2: bool) -> Self {
        if serialize_as_v2 {
            SpecVersion::V2
        } else {
            SpecVersion::V3
        }
    }
}

/// Serializes `document` into `out`. Nothing is flushed here, the caller owns the sink.
pub fn write_document<W: Write>(
    document: &OpenAPI,
    format: OutputFormat,
    version: SpecVersion,
    out: &mut W,
) -> crate::Result<()> {
    match version {
        SpecVersion::V3 => write_value(document, format, out),
        SpecVersion::V2 => write_value(&crate::v2::to_swagger2(document)?, format, out),
    }
}

fn write_value<T: serde::Serialize, W: Write>(
    value: &T,
    format: OutputFormat,
    out: &mut W,
) -> crate::Result<()> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, value)
                .map_err(|e| crate::Error::Serialization(e.to_string()))?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => {
            serde_yaml::to_writer(&mut *out, value)
                .map_err(|e| crate::Error::Serialization(e.to_string()))?;
        }
    }
    Ok(())
}
