//! Bulk migration engine
//!
//! Copies every record from a Redis-protocol or MongoDB source into a
//! Redis-protocol target, re-encoding each record into a semantically
//! equivalent target representation.
//!
//! # Example
//!
//! ```ignore
//! use ferrite_load::migrate::{MigrationRun, RedisSourceConfig, RunOptions, TargetConfig};
//!
//! let mut run = MigrationRun::new(RunOptions::default());
//! let outcome = run
//!     .run_redis(&RedisSourceConfig::default(), &TargetConfig::default())
//!     .await?;
//! println!("{}/{} migrated", outcome.stats.succeeded, outcome.stats.attempted);
//! ```

pub mod orchestrator;
pub mod progress;
pub mod source;
pub mod transcode;
pub mod unit;
pub mod writer;

pub use orchestrator::{CollectionSummary, MigrationRun, RunOutcome, RunPhase};
pub use progress::{ProgressFn, ProgressTracker, RunStats, UnitError, PROGRESS_EVERY};
pub use transcode::{index_ops, plan, WriteOp};
pub use unit::{Shape, SourceUnit, Value};
pub use writer::TargetWriter;

use serde::{Deserialize, Serialize};

/// Fatal migration error. Anything that happens after the transfer loop
/// starts is a recoverable per-unit failure instead, recorded in
/// [`RunStats`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum MigrateError {
    /// Source or target unreachable, or auth rejected.
    #[error("connection error: {0}")]
    Connection(String),

    /// Listing keys or collections failed.
    #[error("enumeration error: {0}")]
    Enumeration(String),
}

/// Migration result type
pub type Result<T> = std::result::Result<T, MigrateError>;

/// Redis-protocol source parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSourceConfig {
    /// Source host.
    pub host: String,
    /// Source port.
    pub port: u16,
    /// Key pattern to enumerate.
    pub pattern: String,
}

impl Default for RedisSourceConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            pattern: "*".to_string(),
        }
    }
}

/// MongoDB source parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSourceConfig {
    /// Connection URI.
    pub uri: String,
    /// Database to migrate.
    pub database: String,
}

impl Default for MongoSourceConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "test".to_string(),
        }
    }
}

/// Target store parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target host.
    pub host: String,
    /// Target port.
    pub port: u16,
    /// Optional `AUTH` password.
    pub password: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            password: None,
        }
    }
}

/// Options shared by both migration modes.
#[derive(Default)]
pub struct RunOptions {
    /// Invoked every [`PROGRESS_EVERY`] attempted units with
    /// `(attempted, total, percentage)`.
    pub progress: Option<ProgressFn>,
}

impl std::fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOptions")
            .field("progress", &self.progress.as_ref().map(|_| "<callback>"))
            .finish()
    }
}
