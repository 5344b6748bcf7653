//! REST connectors for the source table API and the destination document API.

pub mod appwrite;
pub mod common;
pub mod supabase;

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{Credentials, MigrationOptions};
use crate::error::Result;
use crate::schema::{AttributeRequest, AttributeType, DestinationAttribute};
use crate::transform::{transform, TransformedDocument};

/// One source row: field name → JSON value.
pub type SourceRecord = serde_json::Map<String, serde_json::Value>;

/// Read side: lists the rows of a source table.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Get the source type name.
    fn source_type(&self) -> &'static str;

    /// Fetch the records of `table` with a single list request.
    ///
    /// Does not paginate: the first page is treated as the whole table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SourceFetch`] on any non-success response.
    async fn fetch_all(&self, table: &str) -> Result<Vec<SourceRecord>>;
}

/// Write side: schema and document operations on one destination project.
#[async_trait]
pub trait DestinationStore: Send + Sync {
    /// Get the destination type name.
    fn destination_type(&self) -> &'static str;

    /// Fetch the live attribute list of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SchemaFetch`] on any non-success response.
    async fn get_collection_attributes(
        &self,
        database_id: &str,
        collection_id: &str,
    ) -> Result<Vec<DestinationAttribute>>;

    /// Create one attribute using the route selected by `attr_type`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AttributeCreate`] on any non-success response.
    async fn create_attribute(
        &self,
        database_id: &str,
        collection_id: &str,
        attr_type: &AttributeType,
        request: &AttributeRequest,
    ) -> Result<()>;

    /// Create one document, returning its ID.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DocumentWrite`] on any non-success response.
    async fn create_document(
        &self,
        database_id: &str,
        collection_id: &str,
        document: &TransformedDocument,
    ) -> Result<String>;

    /// Write one source record: fetch the live schema, transform the record
    /// against it, then create the document.
    ///
    /// The schema is read again for every record so a write always sees the
    /// latest attribute set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SchemaFetch`] or [`crate::Error::DocumentWrite`].
    async fn write_one(
        &self,
        database_id: &str,
        collection_id: &str,
        record: &SourceRecord,
    ) -> Result<String> {
        let attributes = self
            .get_collection_attributes(database_id, collection_id)
            .await?;
        let document = transform(record, &attributes);
        self.create_document(database_id, collection_id, &document)
            .await
    }
}

/// Create the source connector for a set of credentials.
pub fn create_source(credentials: &Credentials, options: &MigrationOptions) -> Box<dyn SourceReader> {
    Box::new(supabase::SupabaseSource::new(
        &credentials.source_base_url,
        &credentials.source_api_key,
        Duration::from_secs(options.request_timeout_secs),
    ))
}

/// Create the destination connector for a set of credentials.
pub fn create_destination(
    credentials: &Credentials,
    options: &MigrationOptions,
) -> Box<dyn DestinationStore> {
    Box::new(appwrite::AppwriteStore::new(
        &credentials.dest_endpoint,
        &credentials.dest_project_id,
        &credentials.dest_api_key,
        Duration::from_secs(options.request_timeout_secs),
    ))
}
