//! Supabase (PostgREST) table reader.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::connectors::common::{create_http_client, join_url, status_text};
use crate::connectors::{SourceReader, SourceRecord};
use crate::error::{Error, Result};

/// Reads whole tables through the PostgREST `/rest/v1` API.
pub struct SupabaseSource {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SupabaseSource {
    /// Creates a new reader with a configured HTTP client.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            client: create_http_client(timeout),
        }
    }

    /// Builds the list URL for a table.
    fn build_table_url(&self, table: &str) -> String {
        join_url(&self.base_url, &format!("rest/v1/{}", table))
    }

    fn fetch_error(table: &str, message: impl Into<String>) -> Error {
        Error::SourceFetch {
            table: table.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl SourceReader for SupabaseSource {
    fn source_type(&self) -> &'static str {
        "supabase"
    }

    async fn fetch_all(&self, table: &str) -> Result<Vec<SourceRecord>> {
        let url = self.build_table_url(table);
        debug!("Fetching source table {} from {}", table, url);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| Self::fetch_error(table, format!("Supabase request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::fetch_error(
                table,
                format!("Supabase API error: {}", status_text(status)),
            ));
        }

        let records: Vec<SourceRecord> = response.json().await.map_err(|e| {
            Self::fetch_error(table, format!("Failed to parse Supabase response: {}", e))
        })?;

        debug!("Fetched {} records from {}", records.len(), table);
        Ok(records)
    }
}

#[cfg(test)]
#[path = "supabase_tests.rs"]
mod tests;
