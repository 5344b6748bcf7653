// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # Document Migration Engine
//!
//! `doc-migrate` is a CLI tool and library that copies rows from Supabase
//! tables (`PostgREST` API) into Appwrite collections (Databases REST API).
//!
//! ## How a run works
//!
//! | Step | Component | Notes |
//! |------|-----------|-------|
//! | Validate | [`MigrationConfig::validate`] | No network call on failure |
//! | Infer schema | [`SchemaAnalyzer`] | Optional, `options.create_schema` |
//! | Fetch | [`SourceReader`] | Whole table, one request |
//! | Transform | [`transform()`] | Against the live destination attributes |
//! | Write | [`DestinationStore`] | One document per record |
//!
//! Mappings and records are processed strictly one at a time. A failed record
//! is logged and skipped; a failed table fetch skips that mapping only.
//!
//! ## Quick Start
//!
//! ```bash
//! doc-migrate init --output migration.yaml
//! doc-migrate validate --config migration.yaml
//! doc-migrate run --config migration.yaml
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! credentials:
//!   source_base_url: https://xyz.supabase.co
//!   source_api_key: your-service-role-key  # or SOURCE_API_KEY
//!   dest_endpoint: https://cloud.appwrite.io/v1
//!   dest_project_id: my-project
//!   dest_api_key: your-api-key  # or DEST_API_KEY
//!
//! mappings:
//!   - source_table: users
//!     dest_database_id: main
//!     dest_collection_id: users
//!
//! options:
//!   create_schema: false
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod connectors;
pub mod error;
pub mod events;
pub mod pipeline;
pub mod schema;
pub mod transform;

pub use config::{CollectionMapping, Credentials, MigrationConfig, MigrationOptions};
pub use connectors::{DestinationStore, SourceReader, SourceRecord};
pub use error::{Error, Result};
pub use events::{EventLog, LogEntry, LogKind, MigrationEvent, Progress, RunStatus};
pub use pipeline::{CollectionStats, MigrationStats, Pipeline, RunReport};
pub use schema::{map_type, AttributeType, DestinationAttribute, InferredField, SchemaAnalyzer};
pub use transform::{transform, TransformedDocument};

pub use tokio_util::sync::CancellationToken;
