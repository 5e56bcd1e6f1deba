//! Layered config files as a lookup source
//!
//! Layers are merged in order, later layers winning:
//! 1. TOML files, in the order given
//! 2. CLI `key=value` assignments
//!
//! Each contributing layer is recorded with its origin, and files with the
//! SHA-256 digest of their raw bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use dynopts_core::{AccessorInfo, Lookup, ResolveError, Value};

use super::decode::decode;
use super::merge::{get_path, merge_layers, set_path};

/// Origin of a config layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    File,
    Cli,
}

/// A contributing config layer with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this layer
    pub origin: ConfigOrigin,

    /// File path (None for cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged config layers answering option lookups by accessor name.
#[derive(Debug, Clone)]
pub struct LayeredLookup {
    /// Table the accessor names are looked up in (dot-separated)
    section: Option<String>,

    /// Merged configuration
    config: JsonValue,

    /// Each layer's raw value, parallel to `sources`
    layers: Vec<JsonValue>,

    /// Contributing sources in precedence order
    sources: Vec<ConfigSource>,
}

impl LayeredLookup {
    /// Load `files` in order, then apply `assignments` (`key=value`).
    pub fn build<P: AsRef<Path>>(files: &[P], assignments: &[String]) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        for path in files {
            let path = path.as_ref();
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        if !assignments.is_empty() {
            layers.push(parse_assignments(assignments)?);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        Ok(Self::from_layers(layers, sources))
    }

    /// Build from already-parsed layers.
    pub fn from_layers(layers: Vec<JsonValue>, sources: Vec<ConfigSource>) -> Self {
        let config = merge_layers(layers.iter().cloned());
        tracing::debug!(target: "dynopts::config", layers = layers.len(), "Config layers merged");
        Self {
            section: None,
            config,
            layers,
            sources,
        }
    }

    /// Look options up inside `section` instead of at the top level.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    fn key(&self, name: &str) -> String {
        match &self.section {
            Some(section) => format!("{}.{}", section, name),
            None => name.to_string(),
        }
    }

    /// Raw merged value for an option name.
    pub fn raw(&self, name: &str) -> Option<&JsonValue> {
        get_path(&self.config, &self.key(name)).filter(|v| !v.is_null())
    }

    /// Highest-precedence layer that sets `name`.
    pub fn origin_of(&self, name: &str) -> Option<&ConfigSource> {
        let key = self.key(name);
        self.layers
            .iter()
            .zip(&self.sources)
            .rev()
            .find(|(layer, _)| get_path(layer, &key).is_some())
            .map(|(_, source)| source)
    }

    pub fn config(&self) -> &JsonValue {
        &self.config
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }
}

impl Lookup for LayeredLookup {
    fn lookup(&self, accessor: &AccessorInfo) -> Result<Option<Value>, ResolveError> {
        match self.raw(accessor.name()) {
            Some(raw) => decode(accessor, raw),
            None => Ok(None),
        }
    }
}

/// Load and parse a TOML file, returning the value and digest
fn load_toml_file(path: &Path) -> Result<(JsonValue, String), ConfigError> {
    let bytes = fs::read(path)
        .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|e| {
        ConfigError::ParseError(format!("{}: invalid UTF-8: {}", path.display(), e))
    })?;

    let toml_value: toml::Value = toml::from_str(&contents).map_err(|e| {
        ConfigError::ParseError(format!("{}: TOML parse error: {}", path.display(), e))
    })?;

    Ok((toml_to_json(toml_value), digest))
}

/// Turn `key=value` assignments into one layer. Values are read as TOML
/// values; anything that does not parse is taken as a plain string.
fn parse_assignments(assignments: &[String]) -> Result<JsonValue, ConfigError> {
    let mut layer = JsonValue::Object(serde_json::Map::new());
    for assignment in assignments {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidAssignment(assignment.clone()))?;
        let key = key.trim();
        if key.is_empty() || key.split('.').any(str::is_empty) || raw.contains(['\n', '\r']) {
            return Err(ConfigError::InvalidAssignment(assignment.clone()));
        }
        set_path(&mut layer, key, parse_scalar(raw.trim()));
    }
    Ok(layer)
}

fn parse_scalar(raw: &str) -> JsonValue {
    match toml::from_str::<toml::Table>(&format!("value = {}", raw)) {
        Ok(mut table) if table.len() == 1 => match table.remove("value") {
            Some(value) => toml_to_json(value),
            None => JsonValue::String(raw.to_string()),
        },
        _ => JsonValue::String(raw.to_string()),
    }
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> JsonValue {
    match toml {
        toml::Value::String(s) => JsonValue::String(s),
        toml::Value::Integer(i) => JsonValue::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        toml::Value::Boolean(b) => JsonValue::Bool(b),
        toml::Value::Datetime(dt) => JsonValue::String(dt.to_string()),
        toml::Value::Array(arr) => JsonValue::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, JsonValue> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            JsonValue::Object(map)
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid assignment `{0}`: expected KEY=VALUE")]
    InvalidAssignment(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynopts_core::Contract;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct Probe;

    fn probe() -> Contract<Probe> {
        Contract::builder("Probe")
            .required::<u32>("line_width")
            .required::<String>("output_format")
            .required::<bool>("wrap")
            .build()
    }

    fn write_toml(lines: &[&str]) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(temp, "{}", line).unwrap();
        }
        temp
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("120"), json!(120));
        assert_eq!(parse_scalar("true"), json!(true));
        assert_eq!(parse_scalar("\"quoted\""), json!("quoted"));
        assert_eq!(parse_scalar("[\"a\", \"b\"]"), json!(["a", "b"]));
        assert_eq!(parse_scalar("xml"), json!("xml"));
    }

    #[test]
    fn test_assignments() {
        let layer = parse_assignments(&["line_width=60".to_string(), "output.format = xml".to_string()]).unwrap();
        assert_eq!(layer, json!({"line_width": 60, "output": {"format": "xml"}}));

        assert!(matches!(
            parse_assignments(&["line_width".to_string()]),
            Err(ConfigError::InvalidAssignment(_))
        ));
        assert!(matches!(
            parse_assignments(&["output..format=xml".to_string()]),
            Err(ConfigError::InvalidAssignment(_))
        ));
    }

    #[test]
    fn test_assignment_value_cannot_span_lines() {
        for assignment in ["line_width=1\nsecret = 2", "line_width=1\r\nsecret = 2"] {
            assert!(matches!(
                parse_assignments(&[assignment.to_string()]),
                Err(ConfigError::InvalidAssignment(_))
            ));
        }
        assert_eq!(parse_scalar("1\nsecret = 2"), json!("1\nsecret = 2"));
    }

    #[test]
    fn test_file_then_cli_precedence() {
        let file = write_toml(&["line_width = 100", "output_format = \"iso14977\""]);
        let lookup = LayeredLookup::build(&[file.path()], &["line_width=60".to_string()]).unwrap();

        let contract = probe();
        let width = lookup
            .lookup(contract.accessor("line_width").unwrap().info())
            .unwrap()
            .unwrap();
        assert_eq!(width.downcast_ref::<u32>(), Some(&60));
        assert_eq!(lookup.origin_of("line_width").unwrap().origin, ConfigOrigin::Cli);

        let format = lookup
            .lookup(contract.accessor("output_format").unwrap().info())
            .unwrap()
            .unwrap();
        assert_eq!(format.downcast_ref::<String>().unwrap(), "iso14977");
        assert_eq!(lookup.origin_of("output_format").unwrap().origin, ConfigOrigin::File);

        assert!(lookup
            .lookup(contract.accessor("wrap").unwrap().info())
            .unwrap()
            .is_none());
        assert!(lookup.origin_of("wrap").is_none());
    }

    #[test]
    fn test_merged_config() {
        let file = write_toml(&["line_width = 100", "[output]", "format = \"xml\""]);
        let lookup = LayeredLookup::build(&[file.path()], &["output.indent=2".to_string()]).unwrap();
        assert_eq!(
            lookup.config(),
            &json!({"line_width": 100, "output": {"format": "xml", "indent": 2}})
        );
    }

    #[test]
    fn test_file_digest_recorded() {
        let file = write_toml(&["wrap = false"]);
        let lookup = LayeredLookup::build(&[file.path()], &[]).unwrap();

        assert_eq!(lookup.sources().len(), 1);
        let digest = lookup.sources()[0].digest.as_deref().unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_section() {
        let file = write_toml(&["[output]", "line_width = 72"]);
        let lookup = LayeredLookup::build(&[file.path()], &[])
            .unwrap()
            .with_section("output");

        let contract = probe();
        let width = lookup
            .lookup(contract.accessor("line_width").unwrap().info())
            .unwrap()
            .unwrap();
        assert_eq!(width.downcast_ref::<u32>(), Some(&72));
        assert_eq!(lookup.raw("line_width"), Some(&json!(72)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = LayeredLookup::build(&["/nonexistent/dynopts.toml"], &[]);
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let file = write_toml(&["line_width = = 3"]);
        let result = LayeredLookup::build(&[file.path()], &[]);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_wrong_shape_fails_on_lookup() {
        let lookup = LayeredLookup::build::<&Path>(&[], &["line_width=wide".to_string()]).unwrap();
        let contract = probe();
        let err = lookup
            .lookup(contract.accessor("line_width").unwrap().info())
            .unwrap_err();
        assert!(matches!(err, ResolveError::Decode { .. }));
    }
}
