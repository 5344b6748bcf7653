//! Sampled schema inference and best-effort attribute creation.

use tracing::debug;

use crate::config::CollectionMapping;
use crate::connectors::{DestinationStore, SourceReader};
use crate::error::Result;
use crate::events::EventLog;
use crate::schema::{infer_fields, is_system_field, InferredField};

/// Infers a destination schema from one source record and creates it.
pub struct SchemaAnalyzer<'a> {
    source: &'a dyn SourceReader,
    destination: &'a dyn DestinationStore,
}

impl<'a> SchemaAnalyzer<'a> {
    /// Creates an analyzer over a source and a destination.
    pub fn new(source: &'a dyn SourceReader, destination: &'a dyn DestinationStore) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// Infers the field list of `table` from its first record.
    ///
    /// An empty table yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SourceFetch`] if the table cannot be read.
    pub async fn analyze(&self, table: &str) -> Result<Vec<InferredField>> {
        let records = self.source.fetch_all(table).await?;
        Ok(records.first().map(infer_fields).unwrap_or_default())
    }

    /// Infers the schema of the mapping's source table and creates one
    /// destination attribute per non-system field.
    ///
    /// Attribute failures are logged and skipped, so the collection may end
    /// up with only some attributes. The full inferred list is returned
    /// regardless.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::SourceFetch`] if the source table cannot be read.
    pub async fn analyze_and_create_schema(
        &self,
        mapping: &CollectionMapping,
        log: &mut EventLog,
    ) -> Result<Vec<InferredField>> {
        log.info(format!("Analyzing schema of {}", mapping.source_table));

        let fields = self.analyze(&mapping.source_table).await?;
        if fields.is_empty() {
            log.info(format!(
                "No records in {}, nothing to infer",
                mapping.source_table
            ));
            return Ok(fields);
        }

        let mut created = 0usize;
        let mut failed = 0usize;
        for field in fields.iter().filter(|f| !is_system_field(&f.name)) {
            let request = field.to_attribute_request();
            debug!("Attribute request for {}: {:?}", field.name, request);

            match self
                .destination
                .create_attribute(
                    &mapping.dest_database_id,
                    &mapping.dest_collection_id,
                    &field.field_type,
                    &request,
                )
                .await
            {
                Ok(()) => {
                    created += 1;
                    log.success(format!(
                        "Created attribute {} ({})",
                        field.name, field.field_type
                    ));
                }
                Err(e) => {
                    failed += 1;
                    log.error(format!("Failed to create attribute {}: {}", field.name, e));
                }
            }
        }

        log.info(format!(
            "Schema for {}: {} fields inferred, {} attributes created, {} failed",
            mapping.dest_collection_id,
            fields.len(),
            created,
            failed
        ));

        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::SourceRecord;
    use crate::error::Error;
    use crate::events::LogKind;
    use crate::schema::{AttributeRequest, AttributeType, DestinationAttribute};
    use crate::transform::TransformedDocument;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct StaticSource(Vec<SourceRecord>);

    #[async_trait]
    impl SourceReader for StaticSource {
        fn source_type(&self) -> &'static str {
            "static"
        }

        async fn fetch_all(&self, _table: &str) -> Result<Vec<SourceRecord>> {
            Ok(self.0.clone())
        }
    }

    /// Records attribute requests and rejects the keys in `reject`.
    #[derive(Default)]
    struct RecordingDestination {
        reject: Vec<&'static str>,
        created: Mutex<Vec<(String, AttributeRequest)>>,
    }

    #[async_trait]
    impl DestinationStore for RecordingDestination {
        fn destination_type(&self) -> &'static str {
            "recording"
        }

        async fn get_collection_attributes(
            &self,
            _database_id: &str,
            _collection_id: &str,
        ) -> Result<Vec<DestinationAttribute>> {
            Ok(Vec::new())
        }

        async fn create_attribute(
            &self,
            _database_id: &str,
            _collection_id: &str,
            attr_type: &AttributeType,
            request: &AttributeRequest,
        ) -> Result<()> {
            if self.reject.contains(&request.key.as_str()) {
                return Err(Error::AttributeCreate {
                    key: request.key.clone(),
                    message: "Invalid attribute".to_string(),
                });
            }
            self.created
                .lock()
                .unwrap()
                .push((attr_type.to_string(), request.clone()));
            Ok(())
        }

        async fn create_document(
            &self,
            _database_id: &str,
            _collection_id: &str,
            document: &TransformedDocument,
        ) -> Result<String> {
            Ok(document.document_id.clone())
        }
    }

    fn mapping() -> CollectionMapping {
        CollectionMapping::new("posts", "main", "posts")
    }

    fn sample() -> Vec<SourceRecord> {
        vec![json!({
            "id": 1,
            "a": "text",
            "b": 2.5,
            "c": true,
            "created_at": "2024-01-01"
        })
        .as_object()
        .cloned()
        .unwrap()]
    }

    #[tokio::test]
    async fn test_analyze_creates_non_system_attributes() {
        // Arrange
        let source = StaticSource(sample());
        let destination = RecordingDestination::default();
        let analyzer = SchemaAnalyzer::new(&source, &destination);
        let mut log = EventLog::new();

        // Act
        let fields = analyzer
            .analyze_and_create_schema(&mapping(), &mut log)
            .await
            .unwrap();

        // Assert
        assert_eq!(fields.len(), 5);
        let created = destination.created.lock().unwrap();
        let keys: Vec<&str> = created.iter().map(|(_, r)| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(created[0].0, "string");
        assert_eq!(created[0].1.size, Some(255));
        assert_eq!(created[1].0, "double");
        assert_eq!(created[2].0, "boolean");
        assert_eq!(log.count(LogKind::Success), 3);
    }

    #[tokio::test]
    async fn test_analyze_is_best_effort() {
        let source = StaticSource(sample());
        let destination = RecordingDestination {
            reject: vec!["b"],
            ..Default::default()
        };
        let analyzer = SchemaAnalyzer::new(&source, &destination);
        let mut log = EventLog::new();

        let fields = analyzer
            .analyze_and_create_schema(&mapping(), &mut log)
            .await
            .unwrap();

        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "a", "b", "c", "created_at"]);
        let created = destination.created.lock().unwrap();
        let keys: Vec<&str> = created.iter().map(|(_, r)| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "c"]);
        assert_eq!(log.count(LogKind::Error), 1);
        assert!(log
            .entries()
            .iter()
            .any(|e| e.message.starts_with("Failed to create attribute b")));
    }

    #[tokio::test]
    async fn test_analyze_empty_table() {
        let source = StaticSource(Vec::new());
        let destination = RecordingDestination::default();
        let analyzer = SchemaAnalyzer::new(&source, &destination);
        let mut log = EventLog::new();

        let fields = analyzer
            .analyze_and_create_schema(&mapping(), &mut log)
            .await
            .unwrap();

        assert!(fields.is_empty());
        assert!(destination.created.lock().unwrap().is_empty());
    }
}
