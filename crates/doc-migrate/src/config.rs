//! Configuration types for doc-migrate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::connectors::common::validate_url;
use crate::error::{Error, Result};

/// Main migration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Source and destination credentials.
    pub credentials: Credentials,
    /// Ordered table → collection mappings. Order is processing order.
    #[serde(default)]
    pub mappings: Vec<CollectionMapping>,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// Credentials for both REST APIs.
///
/// Immutable for the duration of a run.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Source project URL (e.g. `https://xyz.supabase.co`).
    #[serde(default)]
    pub source_base_url: String,
    /// Source service role key or anon key.
    #[serde(default)]
    pub source_api_key: String,
    /// Destination API endpoint (e.g. `https://cloud.appwrite.io/v1`).
    #[serde(default)]
    pub dest_endpoint: String,
    /// Destination project ID.
    #[serde(default)]
    pub dest_project_id: String,
    /// Destination API key.
    #[serde(default)]
    pub dest_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("source_base_url", &self.source_base_url)
            .field("source_api_key", &redact(&self.source_api_key))
            .field("dest_endpoint", &self.dest_endpoint)
            .field("dest_project_id", &self.dest_project_id)
            .field("dest_api_key", &redact(&self.dest_api_key))
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

impl Credentials {
    /// Returns `(name, value)` pairs for every credential field.
    fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("source_base_url", &self.source_base_url),
            ("source_api_key", &self.source_api_key),
            ("dest_endpoint", &self.dest_endpoint),
            ("dest_project_id", &self.dest_project_id),
            ("dest_api_key", &self.dest_api_key),
        ]
    }
}

/// One source table → destination collection pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMapping {
    /// Source table name.
    #[serde(default)]
    pub source_table: String,
    /// Destination database ID.
    #[serde(default)]
    pub dest_database_id: String,
    /// Destination collection ID.
    #[serde(default)]
    pub dest_collection_id: String,
}

impl CollectionMapping {
    /// Creates a mapping.
    pub fn new(
        source_table: impl Into<String>,
        dest_database_id: impl Into<String>,
        dest_collection_id: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            dest_database_id: dest_database_id.into(),
            dest_collection_id: dest_collection_id.into(),
        }
    }

    fn fields(&self) -> [(&'static str, &str); 3] {
        [
            ("source_table", &self.source_table),
            ("dest_database_id", &self.dest_database_id),
            ("dest_collection_id", &self.dest_collection_id),
        ]
    }
}

/// Migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Run the schema analyzer for each mapping before copying its records.
    #[serde(default)]
    pub create_schema: bool,
    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            create_schema: false,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl MigrationConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration. This is the entry guard of a run and makes
    /// no network calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if any credential or mapping field is
    /// empty, or if either base URL is not an http(s) URL.
    pub fn validate(&self) -> Result<()> {
        if self
            .credentials
            .fields()
            .iter()
            .any(|(_, value)| value.trim().is_empty())
        {
            let missing: Vec<&str> = self
                .credentials
                .fields()
                .iter()
                .filter(|(_, value)| value.trim().is_empty())
                .map(|(name, _)| *name)
                .collect();
            return Err(Error::Validation(format!(
                "All credentials are required (missing: {})",
                missing.join(", ")
            )));
        }

        for (index, mapping) in self.mappings.iter().enumerate() {
            if let Some((name, _)) = mapping
                .fields()
                .iter()
                .find(|(_, value)| value.trim().is_empty())
            {
                return Err(Error::Validation(format!(
                    "All collection fields are required (mapping {index}: missing {name})"
                )));
            }
        }

        for url in [
            &self.credentials.source_base_url,
            &self.credentials.dest_endpoint,
        ] {
            validate_url(url).map_err(|e| match e {
                Error::Config(message) => Error::Validation(message),
                other => other,
            })?;
        }

        Ok(())
    }
}
