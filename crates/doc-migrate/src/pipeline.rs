//! Migration pipeline orchestration.
//!
//! Mappings are processed in order, one at a time, and the records of a
//! mapping one at a time. Cancellation is cooperative: the token is checked
//! at the top of each mapping and of each record. A request in flight always
//! completes; the cancel request itself is logged as soon as it arrives.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::{CollectionMapping, MigrationConfig};
use crate::connectors::{create_destination, create_source, DestinationStore, SourceReader};
use crate::error::Result;
use crate::events::{
    EventLog, LogEntry, MigrationEvent, Progress, RunStatus, EVENT_CHANNEL_CAPACITY,
};
use crate::schema::{InferredField, SchemaAnalyzer};

/// Per-mapping record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    /// Source table.
    pub collection: String,
    /// Records fetched.
    pub total: u64,
    /// Records written.
    pub migrated: u64,
    /// Records that failed.
    pub failed: u64,
}

/// Migration statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationStats {
    /// Run start time.
    pub start_time: Option<DateTime<Utc>>,
    /// Run end time.
    pub end_time: Option<DateTime<Utc>>,
    /// Number of configured mappings.
    pub total_collections: usize,
    /// Mappings whose source fetch failed.
    pub failed_collections: usize,
    /// Counts for each mapping whose records were fetched, in mapping order.
    pub collections: Vec<CollectionStats>,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl MigrationStats {
    /// Total records written across all mappings.
    #[must_use]
    pub fn migrated(&self) -> u64 {
        self.collections.iter().map(|c| c.migrated).sum()
    }

    /// Total records that failed across all mappings.
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.collections.iter().map(|c| c.failed).sum()
    }

    /// Calculate throughput (records per second).
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.migrated() as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Final status: `Completed`, or `Idle` when canceled.
    pub status: RunStatus,
    /// Progress of the last mapping processed.
    pub progress: Progress,
    /// Every log entry of the run, in order.
    pub logs: Vec<LogEntry>,
    /// Run statistics.
    pub stats: MigrationStats,
}

/// State owned by a single run: status, log, progress, stats and the
/// cancellation token. Created fresh for every run.
struct RunContext {
    status: RunStatus,
    log: EventLog,
    progress: Progress,
    stats: MigrationStats,
    cancel: CancellationToken,
    cancel_announced: bool,
    started: std::time::Instant,
}

impl RunContext {
    fn new(sender: broadcast::Sender<MigrationEvent>, cancel: CancellationToken) -> Self {
        Self {
            status: RunStatus::Idle,
            log: EventLog::with_sender(sender),
            progress: Progress::default(),
            stats: MigrationStats::default(),
            cancel,
            cancel_announced: false,
            started: std::time::Instant::now(),
        }
    }

    fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        self.log.emit(MigrationEvent::Status(status));
    }

    /// True once cancellation was requested. The request is logged the first
    /// time it is seen.
    fn cancel_requested(&mut self) -> bool {
        if self.cancel.is_cancelled() {
            self.announce_cancel();
            true
        } else {
            false
        }
    }

    fn announce_cancel(&mut self) {
        if !self.cancel_announced {
            self.cancel_announced = true;
            self.log
                .info("Canceling migration... Will complete current record.");
        }
    }

    /// Drives `work` to completion. A cancel request arriving meanwhile is
    /// logged at once; the work itself is never interrupted.
    async fn finish_in_flight<T>(&mut self, work: impl Future<Output = T>) -> T {
        let cancel = self.cancel.clone();
        tokio::pin!(work);
        loop {
            tokio::select! {
                biased;
                output = &mut work => return output,
                _ = cancel.cancelled(), if !self.cancel_announced => self.announce_cancel(),
            }
        }
    }

    /// Resets progress for a mapping and opens its stats entry.
    fn start_collection(&mut self, collection: &str, total: usize) {
        self.progress = Progress {
            current: 0,
            total,
            collection: collection.to_string(),
        };
        self.stats.collections.push(CollectionStats {
            collection: collection.to_string(),
            total: total as u64,
            ..Default::default()
        });
        self.log.emit(MigrationEvent::Progress(self.progress.clone()));
    }

    fn record_migrated(&mut self, position: usize) {
        self.progress.current = position;
        if let Some(stats) = self.stats.collections.last_mut() {
            stats.migrated += 1;
        }
        self.log.emit(MigrationEvent::Progress(self.progress.clone()));
    }

    fn record_failed(&mut self) {
        if let Some(stats) = self.stats.collections.last_mut() {
            stats.failed += 1;
        }
    }

    fn finish(mut self) -> RunReport {
        self.stats.end_time = Some(Utc::now());
        self.stats.duration_secs = self.started.elapsed().as_secs_f64();
        RunReport {
            status: self.status,
            progress: self.progress,
            logs: self.log.into_entries(),
            stats: self.stats,
        }
    }
}

/// Migration pipeline.
pub struct Pipeline {
    config: MigrationConfig,
    source: Box<dyn SourceReader>,
    destination: Box<dyn DestinationStore>,
    events: broadcast::Sender<MigrationEvent>,
    status: RunStatus,
}

impl Pipeline {
    /// Create a new migration pipeline over the REST connectors named by the
    /// configuration's credentials.
    #[must_use]
    pub fn new(config: MigrationConfig) -> Self {
        let source = create_source(&config.credentials, &config.options);
        let destination = create_destination(&config.credentials, &config.options);
        Self::with_connectors(config, source, destination)
    }

    /// Create a pipeline over explicit connectors.
    #[must_use]
    pub fn with_connectors(
        config: MigrationConfig,
        source: Box<dyn SourceReader>,
        destination: Box<dyn DestinationStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            source,
            destination,
            events,
            status: RunStatus::Idle,
        }
    }

    /// Subscribe to the live event stream of subsequent runs.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MigrationEvent> {
        self.events.subscribe()
    }

    /// Status of the last run.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// The pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Run the schema analyzer for one mapping, logging into `log`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source table cannot be read.
    pub async fn analyze_schema(
        &self,
        mapping: &CollectionMapping,
        log: &mut EventLog,
    ) -> Result<Vec<InferredField>> {
        SchemaAnalyzer::new(self.source.as_ref(), self.destination.as_ref())
            .analyze_and_create_schema(mapping, log)
            .await
    }

    /// Run the migration.
    ///
    /// Every run starts with an empty log and zeroed progress. Record and
    /// mapping failures are logged and never abort the run; the run ends
    /// `Completed`, or `Idle` if `cancel` was triggered.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Validation`] if a credential or mapping field is
    /// empty. No network call is made in that case and the pipeline status
    /// becomes [`RunStatus::Error`].
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<RunReport> {
        let mut ctx = RunContext::new(self.events.clone(), cancel);
        ctx.stats.start_time = Some(Utc::now());
        ctx.stats.total_collections = self.config.mappings.len();
        ctx.set_status(RunStatus::Migrating);
        self.status = RunStatus::Migrating;

        if let Err(e) = self.config.validate() {
            error!("Migration rejected: {}", e);
            ctx.log.error(format!("Migration process failed: {}", e));
            ctx.set_status(RunStatus::Error);
            self.status = RunStatus::Error;
            return Err(e);
        }

        info!(
            "Starting migration of {} collection(s)",
            self.config.mappings.len()
        );

        let status = self.migrate_all(&mut ctx).await;
        ctx.set_status(status);
        self.status = status;

        let report = ctx.finish();
        info!(
            "Migration {:?}: {} migrated, {} failed in {:.2}s ({:.0} records/sec)",
            report.status,
            report.stats.migrated(),
            report.stats.failed(),
            report.stats.duration_secs,
            report.stats.throughput()
        );

        Ok(report)
    }

    async fn migrate_all(&self, ctx: &mut RunContext) -> RunStatus {
        for mapping in &self.config.mappings {
            if ctx.cancel_requested() {
                ctx.log.info("Migration canceled.");
                return RunStatus::Idle;
            }

            if self.config.options.create_schema {
                if let Err(e) = self.analyze_schema(mapping, &mut ctx.log).await {
                    ctx.log.error(format!(
                        "Schema analysis failed for {}: {}",
                        mapping.source_table, e
                    ));
                }
            }

            if let Err(e) = self.migrate_mapping(mapping, ctx).await {
                ctx.stats.failed_collections += 1;
                ctx.log.error(format!(
                    "Migration failed for {}: {}",
                    mapping.source_table, e
                ));
            }
        }

        // A cancel during the final mapping still ends the run as canceled
        if ctx.cancel_requested() {
            ctx.log.info("Migration canceled.");
            return RunStatus::Idle;
        }

        RunStatus::Completed
    }

    /// Copies every record of one mapping. Only the source fetch can fail;
    /// record failures are logged and counted.
    async fn migrate_mapping(&self, mapping: &CollectionMapping, ctx: &mut RunContext) -> Result<()> {
        let records = ctx
            .finish_in_flight(self.source.fetch_all(&mapping.source_table))
            .await?;
        let total = records.len();

        ctx.start_collection(&mapping.source_table, total);
        ctx.log.info(format!(
            "Found {} records in {}",
            total, mapping.source_table
        ));

        for (index, record) in records.iter().enumerate() {
            if ctx.cancel_requested() {
                debug!("Cancellation observed before record {}/{}", index + 1, total);
                break;
            }

            let position = index + 1;
            let written = ctx
                .finish_in_flight(self.destination.write_one(
                    &mapping.dest_database_id,
                    &mapping.dest_collection_id,
                    record,
                ))
                .await;
            match written {
                Ok(document_id) => {
                    debug!("Record {}/{} written as {}", position, total, document_id);
                    ctx.record_migrated(position);
                    ctx.log
                        .success(format!("✓ Migrated record {}/{}", position, total));
                }
                Err(e) => {
                    ctx.record_failed();
                    ctx.log.error(format!(
                        "✗ Failed to migrate record {}/{}: {}",
                        position, total, e
                    ));
                }
            }
        }

        ctx.log.success(format!(
            "Completed migration for {}",
            mapping.source_table
        ));
        Ok(())
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
