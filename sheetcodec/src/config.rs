//! Configuration for reading and writing packages

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::model::column_index;

/// Main codec configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodecConfig {
    #[serde(default)]
    pub import: ImportOptions,
    #[serde(default)]
    pub export: ExportOptions,
}

impl CodecConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: CodecConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.import.validate()?;
        Ok(config)
    }
}

/// Type a column can be forced to after reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Number,
    BigDecimal,
    Double,
    Date,
    Time,
    Bool,
    String,
}

/// Workbook-wide coercion applied after column types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    NumbersAsDouble,
    NumbersAsDecimal,
    NumbersAsInteger,
    AllAsString,
}

/// Post-processing of resolved cell values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportOptions {
    /// 1-based first row the options apply to
    #[serde(default = "default_start_row")]
    pub start_row: u32,
    /// Column letter to forced type
    #[serde(default)]
    pub column_types: BTreeMap<String, TargetType>,
    #[serde(default)]
    pub enforce: Option<Enforcement>,
    #[serde(default)]
    pub dates_as_numbers: bool,
    #[serde(default)]
    pub empty_as_string: bool,
}

fn default_start_row() -> u32 {
    1
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            start_row: default_start_row(),
            column_types: BTreeMap::new(),
            enforce: None,
            dates_as_numbers: false,
            empty_as_string: false,
        }
    }
}

impl ImportOptions {
    /// True when reading needs no post-processing at all
    pub fn is_passthrough(&self) -> bool {
        self.column_types.is_empty()
            && self.enforce.is_none()
            && !self.dates_as_numbers
            && !self.empty_as_string
    }

    pub fn with_column_type(mut self, column: &str, target: TargetType) -> Self {
        self.column_types.insert(column.to_ascii_uppercase(), target);
        self
    }

    /// Target type for a 0-based column
    pub fn column_type(&self, col: u32) -> Option<TargetType> {
        self.column_types
            .iter()
            .find(|(letters, _)| column_index(letters) == Some(col))
            .map(|(_, target)| *target)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_row == 0 {
            anyhow::bail!("Configuration error: start_row is 1-based and cannot be 0");
        }
        for letters in self.column_types.keys() {
            if column_index(letters).is_none() {
                anyhow::bail!(
                    "Configuration error: '{}' in column_types is not a column",
                    letters
                );
            }
        }
        Ok(())
    }
}

/// Settings that shape a written package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Application name written to `docProps/app.xml`
    #[serde(default = "default_application")]
    pub application: String,
    /// DEFLATE level, library default when unset
    #[serde(default)]
    pub compression_level: Option<i64>,
}

fn default_application() -> String {
    format!("sheetcodec {}", env!("CARGO_PKG_VERSION"))
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            application: default_application(),
            compression_level: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: CodecConfig = toml::from_str(
            r#"
[import]
start_row = 2
enforce = "numbers_as_double"
dates_as_numbers = true

[import.column_types]
A = "string"
C = "big_decimal"

[export]
application = "Reports"
compression_level = 9
"#,
        )
        .unwrap();
        assert_eq!(config.import.start_row, 2);
        assert_eq!(config.import.enforce, Some(Enforcement::NumbersAsDouble));
        assert!(config.import.dates_as_numbers);
        assert!(!config.import.empty_as_string);
        assert_eq!(config.import.column_type(0), Some(TargetType::String));
        assert_eq!(config.import.column_type(2), Some(TargetType::BigDecimal));
        assert_eq!(config.import.column_type(1), None);
        assert_eq!(config.export.application, "Reports");
        assert_eq!(config.export.compression_level, Some(9));
    }

    #[test]
    fn test_defaults() {
        let config: CodecConfig = toml::from_str("").unwrap();
        assert_eq!(config.import, ImportOptions::default());
        assert!(config.import.is_passthrough());
        assert!(config.export.application.starts_with("sheetcodec"));
    }

    #[test]
    fn test_validation() {
        let mut options = ImportOptions::default();
        assert!(options.validate().is_ok());
        options.start_row = 0;
        assert!(options.validate().is_err());

        let options = ImportOptions::default().with_column_type("a1", TargetType::Bool);
        assert!(options.validate().is_err());
        let options = ImportOptions::default().with_column_type("ab", TargetType::Bool);
        assert!(options.validate().is_ok());
        assert_eq!(options.column_type(27), Some(TargetType::Bool));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codec.toml");
        fs::write(&path, "[import]\nempty_as_string = true\n").unwrap();
        let config = CodecConfig::from_file(&path).unwrap();
        assert!(config.import.empty_as_string);
        assert!(CodecConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
