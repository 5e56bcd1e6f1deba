//! Explain reports: every option of an instance with its value and the
//! tier that produced it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use dynopts_core::{Options, Tier};

use crate::config::{ConfigOrigin, ConfigSource, LayeredLookup};

/// Schema version for explain reports
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "dynopts/explain@1";

/// Option names containing any of these are redacted
const SECRET_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "credential",
];

/// Resolution outcome of one option
#[derive(Debug, Clone, Serialize)]
pub struct ExplainedOption {
    pub name: String,

    /// Declared Rust type
    pub type_name: String,

    /// Tier that produced the value (None if resolution failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,

    /// Config layer the value came from, for lookup-tier values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<ConfigOrigin>,

    /// Debug rendering of the value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Resolution error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fully resolved view of an options instance
#[derive(Debug, Clone, Serialize)]
pub struct ExplainReport {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this report was produced
    pub created_at: DateTime<Utc>,

    /// Contract name
    pub contract: String,

    /// Options in declaration order
    pub options: Vec<ExplainedOption>,

    /// Config layers consulted, in precedence order
    pub sources: Vec<ConfigSource>,

    /// Names of options whose values were redacted
    pub redactions: Vec<String>,
}

impl ExplainReport {
    /// Resolve every option of `options` and record the outcome. A failing
    /// option is recorded with its error and does not stop the others.
    pub fn build<C: 'static>(options: &Options<C>, config: Option<&LayeredLookup>) -> Self {
        let mut entries = Vec::new();
        let mut redactions = Vec::new();

        for accessor in options.contract().accessors() {
            let info = accessor.info();
            let name = info.name();
            let mut entry = ExplainedOption {
                name: name.to_string(),
                type_name: info.type_name().to_string(),
                tier: None,
                origin: None,
                value: None,
                error: None,
            };

            match options.get_value(name) {
                Ok(value) => {
                    let tier = options.tier_of(name);
                    if tier == Some(Tier::Lookup) {
                        entry.origin = config
                            .and_then(|c| c.origin_of(name))
                            .map(|s| s.origin.clone());
                    }
                    entry.tier = tier;
                    if is_secret(name) {
                        entry.value = Some("[REDACTED]".to_string());
                        redactions.push(name.to_string());
                    } else {
                        entry.value = Some(info.describe(&value));
                    }
                }
                Err(e) => entry.error = Some(e.to_string()),
            }

            entries.push(entry);
        }

        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            contract: options.contract().name().to_string(),
            options: entries,
            sources: config.map(|c| c.sources().to_vec()).unwrap_or_default(),
            redactions,
        }
    }

    /// Whether every option resolved.
    pub fn is_complete(&self) -> bool {
        self.options.iter().all(|o| o.error.is_none())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExplainedOption> {
        self.options.iter().filter(|o| o.error.is_some())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }

    /// Human-readable rendering.
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.contract);

        let width = self.options.iter().map(|o| o.name.len()).max().unwrap_or(0);
        for option in &self.options {
            match (&option.value, &option.error) {
                (Some(value), _) => {
                    let mut provenance = option
                        .tier
                        .map(|t| t.to_string())
                        .unwrap_or_default();
                    if let Some(origin) = &option.origin {
                        let origin = match origin {
                            ConfigOrigin::File => "file",
                            ConfigOrigin::Cli => "cli",
                        };
                        let _ = write!(provenance, ", {}", origin);
                    }
                    let _ = writeln!(
                        out,
                        "  {:width$}  {}  ({})",
                        option.name,
                        value,
                        provenance,
                        width = width
                    );
                }
                (None, Some(error)) => {
                    let _ = writeln!(out, "  {:width$}  error: {}", option.name, error, width = width);
                }
                (None, None) => {}
            }
        }

        if !self.sources.is_empty() {
            let _ = writeln!(out, "sources:");
            for source in &self.sources {
                match &source.path {
                    Some(path) => {
                        let digest = source.digest.as_deref().unwrap_or("");
                        let _ = writeln!(out, "  file {} ({})", path, short_digest(digest));
                    }
                    None => {
                        let _ = writeln!(out, "  cli");
                    }
                }
            }
        }

        out
    }
}

fn is_secret(name: &str) -> bool {
    let name = name.to_lowercase();
    SECRET_KEYS.iter().any(|s| name.contains(s))
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
