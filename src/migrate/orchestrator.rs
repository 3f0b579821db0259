//! Single-pass run orchestration: connect, enumerate, transfer, report.
//!
//! The orchestrator drives exactly one full pass per invocation — no
//! loop, no retry, no scheduling. Per-unit failures are folded into the
//! run stats and never abort the run; only connection failure or a fatal
//! enumeration error can.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::progress::{ProgressTracker, RunStats};
use super::source;
use super::transcode;
use super::unit::SourceUnit;
use super::writer::TargetWriter;
use super::{MigrateError, MongoSourceConfig, RedisSourceConfig, Result, RunOptions, TargetConfig};
use crate::client::KvClient;
use crate::mongo::DocumentSource;

/// Lifecycle phase of a migration run.
///
/// `Failed` is reachable only before and during enumeration; once the
/// transfer loop starts, unit failures are recorded and the run proceeds
/// to `Reporting` regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Idle,
    Connecting,
    Enumerating,
    Transferring,
    Reporting,
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Idle => write!(f, "idle"),
            RunPhase::Connecting => write!(f, "connecting"),
            RunPhase::Enumerating => write!(f, "enumerating"),
            RunPhase::Transferring => write!(f, "transferring"),
            RunPhase::Reporting => write!(f, "reporting"),
            RunPhase::Done => write!(f, "done"),
            RunPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Per-collection accounting, document mode only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    /// Source collection name.
    pub name: String,
    /// Documents found in the collection.
    pub documents: u64,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Unit-level accounting.
    pub stats: RunStats,
    /// How many units the enumerator listed. Distinguishes "0 migrated
    /// because 0 found" from "0 migrated because all failed".
    pub total_listed: u64,
    /// Collections visited, in source order. Empty in key-value mode.
    pub collections: Vec<CollectionSummary>,
}

/// One migration run. Construct, invoke one of the `run_*` methods once,
/// and read the outcome.
pub struct MigrationRun {
    phase: RunPhase,
    options: RunOptions,
}

impl MigrationRun {
    pub fn new(options: RunOptions) -> Self {
        Self {
            phase: RunPhase::Idle,
            options,
        }
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn enter(&mut self, phase: RunPhase) {
        info!(from = %self.phase, to = %phase, "run phase change");
        self.phase = phase;
    }

    /// Migrate every key of a Redis-protocol source into the target.
    pub async fn run_redis(
        &mut self,
        source: &RedisSourceConfig,
        target: &TargetConfig,
    ) -> Result<RunOutcome> {
        match self.drive_redis(source, target).await {
            Ok(outcome) => {
                self.enter(RunPhase::Done);
                Ok(outcome)
            }
            Err(e) => {
                error!(%e, "migration run failed");
                self.enter(RunPhase::Failed);
                Err(e)
            }
        }
    }

    /// Migrate every collection of a MongoDB database into the target.
    pub async fn run_mongo(
        &mut self,
        source: &MongoSourceConfig,
        target: &TargetConfig,
    ) -> Result<RunOutcome> {
        match self.drive_mongo(source, target).await {
            Ok(outcome) => {
                self.enter(RunPhase::Done);
                Ok(outcome)
            }
            Err(e) => {
                error!(%e, "migration run failed");
                self.enter(RunPhase::Failed);
                Err(e)
            }
        }
    }

    async fn drive_redis(
        &mut self,
        source: &RedisSourceConfig,
        target: &TargetConfig,
    ) -> Result<RunOutcome> {
        self.enter(RunPhase::Connecting);
        let mut src = KvClient::connect(&source.host, source.port)
            .await
            .map_err(|e| {
                MigrateError::Connection(format!(
                    "source {}:{}: {}",
                    source.host, source.port, e
                ))
            })?;
        src.ping()
            .await
            .map_err(|e| MigrateError::Connection(format!("source ping: {}", e)))?;
        info!(host = %source.host, port = source.port, "connected to source");

        let mut writer = TargetWriter::connect(target).await?;
        info!(host = %target.host, port = target.port, "connected to target");

        self.enter(RunPhase::Enumerating);
        let keys = source::list_keys(&mut src, &source.pattern).await?;
        info!(total = keys.len(), pattern = %source.pattern, "listed source keys");

        self.enter(RunPhase::Transferring);
        let mut tracker = ProgressTracker::new(keys.len() as u64, self.options.progress.take());
        for key in &keys {
            let unit = match source::fetch_kv_unit(&mut src, key).await {
                Ok(Some(unit)) => unit,
                // Empty collection value: skipped before it counts as
                // attempted.
                Ok(None) => continue,
                Err(err) => {
                    tracker.on_attempt();
                    tracker.on_failure(&err.unit, err.message);
                    continue;
                }
            };

            tracker.on_attempt();
            let ops = transcode::plan(&unit);
            match writer.apply(&unit.target_key(), &ops).await {
                Ok(()) => {
                    tracker.on_success();
                    if let SourceUnit::Kv { value, .. } = &unit {
                        tracker.note_shape(value.shape());
                    }
                }
                Err(err) => tracker.on_failure(&err.unit, err.message),
            }
        }

        self.enter(RunPhase::Reporting);
        let stats = tracker.finish();
        info!(
            succeeded = stats.succeeded,
            attempted = stats.attempted,
            failed = stats.errors.len(),
            "transfer finished"
        );

        Ok(RunOutcome {
            stats,
            total_listed: keys.len() as u64,
            collections: Vec::new(),
        })
    }

    async fn drive_mongo(
        &mut self,
        source: &MongoSourceConfig,
        target: &TargetConfig,
    ) -> Result<RunOutcome> {
        self.enter(RunPhase::Connecting);
        let src = DocumentSource::connect(&source.uri, &source.database)
            .await
            .map_err(|e| MigrateError::Connection(format!("source {}: {}", source.uri, e)))?;
        src.ping()
            .await
            .map_err(|e| MigrateError::Connection(format!("source ping: {}", e)))?;
        info!(database = %source.database, "connected to source");

        let mut writer = TargetWriter::connect(target).await?;
        info!(host = %target.host, port = target.port, "connected to target");

        self.enter(RunPhase::Enumerating);
        let names = src
            .collection_names()
            .await
            .map_err(|e| MigrateError::Enumeration(e.to_string()))?;
        info!(collections = names.len(), "listed collections");

        let mut batches = Vec::with_capacity(names.len());
        let mut total = 0u64;
        for name in &names {
            let units = source::fetch_document_units(&src, name).await?;
            total += units.len() as u64;
            batches.push((name.clone(), units));
        }

        self.enter(RunPhase::Transferring);
        let mut tracker = ProgressTracker::new(total, self.options.progress.take());
        let mut collections = Vec::with_capacity(batches.len());
        for (name, units) in &batches {
            info!(collection = %name, documents = units.len(), "migrating collection");

            let mut synthesized = Vec::with_capacity(units.len());
            for unit in units {
                // Every document counts as attempted, including ones with
                // no fields left after `_id` exclusion; those yield no
                // hash write but still join the collection index.
                tracker.on_attempt();
                synthesized.push(unit.target_key());
                let ops = transcode::plan(unit);
                match writer.apply(&unit.target_key(), &ops).await {
                    Ok(()) => tracker.on_success(),
                    Err(err) => tracker.on_failure(&err.unit, err.message),
                }
            }

            // Rebuild the collection's index wholesale. A failure here is
            // recorded against the index key; it is not a unit and does
            // not affect attempted/succeeded.
            let index_key = format!("_index:{}", name);
            let ops = transcode::index_ops(name, &synthesized);
            if let Err(err) = writer.apply(&index_key, &ops).await {
                tracker.on_failure(&err.unit, err.message);
            }

            collections.push(CollectionSummary {
                name: name.clone(),
                documents: units.len() as u64,
            });
        }

        self.enter(RunPhase::Reporting);
        let stats = tracker.finish();
        info!(
            succeeded = stats.succeeded,
            attempted = stats.attempted,
            failed = stats.errors.len(),
            "transfer finished"
        );

        Ok(RunOutcome {
            stats,
            total_listed: total,
            collections,
        })
    }
}
