//! Appwrite databases API: collection schema, attributes and documents.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::connectors::common::{create_http_client, error_message, join_url};
use crate::connectors::DestinationStore;
use crate::error::{Error, Result};
use crate::schema::{AttributeRequest, AttributeType, DestinationAttribute};
use crate::transform::TransformedDocument;

/// Collection response; only the attribute list is used.
#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    attributes: Vec<DestinationAttribute>,
}

/// Created document response.
#[derive(Debug, Deserialize)]
struct DocumentResponse {
    #[serde(rename = "$id")]
    id: Option<String>,
}

/// Appwrite destination connector.
pub struct AppwriteStore {
    endpoint: String,
    project_id: String,
    api_key: String,
    client: Client,
}

impl AppwriteStore {
    /// Creates a new destination connector with a configured HTTP client.
    pub fn new(endpoint: &str, project_id: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            project_id: project_id.to_string(),
            api_key: api_key.to_string(),
            client: create_http_client(timeout),
        }
    }

    /// Builds the URL of a collection, or of a sub-resource when `suffix` is set.
    fn build_collection_url(&self, database_id: &str, collection_id: &str, suffix: &str) -> String {
        let base = join_url(
            &self.endpoint,
            &format!("databases/{}/collections/{}", database_id, collection_id),
        );
        if suffix.is_empty() {
            base
        } else {
            join_url(&base, suffix)
        }
    }

    /// Applies the project and key headers.
    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
    }

    /// Returns the API error message of a failed response.
    async fn failure_message(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error_message(status, &body)
    }
}

#[async_trait]
impl DestinationStore for AppwriteStore {
    fn destination_type(&self) -> &'static str {
        "appwrite"
    }

    async fn get_collection_attributes(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Vec<DestinationAttribute>> {
        let url = self.build_collection_url(database_id, collection_id, "");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::SchemaFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::SchemaFetch(Self::failure_message(response).await));
        }

        let collection: CollectionResponse = response
            .json()
            .await
            .map_err(|e| Error::SchemaFetch(format!("Failed to parse collection: {}", e)))?;

        Ok(collection.attributes)
    }

    async fn create_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        attr_type: &AttributeType,
        request: &AttributeRequest,
    ) -> Result<()> {
        let url = self.build_collection_url(
            database_id,
            collection_id,
            &format!("attributes/{}", attr_type.as_str()),
        );
        debug!("Creating {} attribute {} at {}", attr_type, request.key, url);

        let failed = |message: String| Error::AttributeCreate {
            key: request.key.clone(),
            message,
        };

        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(Self::failure_message(response).await));
        }

        Ok(())
    }

    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document: &TransformedDocument,
    ) -> Result<String> {
        let url = self.build_collection_url(database_id, collection_id, "documents");

        let response = self
            .authorize(self.client.post(&url))
            .json(document)
            .send()
            .await
            .map_err(|e| Error::DocumentWrite(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::DocumentWrite(Self::failure_message(response).await));
        }

        // A 2xx without a parseable `$id` still means the document exists
        let created = response
            .json::<DocumentResponse>()
            .await
            .ok()
            .and_then(|d| d.id);

        Ok(created.unwrap_or_else(|| document.document_id.clone()))
    }
}

#[cfg(test)]
#[path = "appwrite_tests.rs"]
mod tests;
