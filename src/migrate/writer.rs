//! Applies transcoded write plans to the target store.

use std::io;

use tracing::debug;

use super::progress::UnitError;
use super::transcode::WriteOp;
use super::{MigrateError, Result, TargetConfig};
use crate::client::KvClient;

/// Writer holding the target connection for the duration of a run.
///
/// Ops are applied strictly in plan order and are never batched across
/// units: one unit's plan is flushed before the next unit is considered.
pub struct TargetWriter {
    conn: KvClient,
}

impl TargetWriter {
    /// Connect to the target, authenticate if a password is configured,
    /// and verify reachability with `PING`.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let mut conn = KvClient::connect(&config.host, config.port)
            .await
            .map_err(|e| {
                MigrateError::Connection(format!(
                    "target {}:{}: {}",
                    config.host, config.port, e
                ))
            })?;

        if let Some(password) = &config.password {
            conn.auth(password)
                .await
                .map_err(|e| MigrateError::Connection(format!("target auth: {}", e)))?;
        }

        conn.ping()
            .await
            .map_err(|e| MigrateError::Connection(format!("target ping: {}", e)))?;

        Ok(Self { conn })
    }

    /// Apply one unit's ops in plan order.
    ///
    /// The first failing op aborts this unit's remaining ops and surfaces
    /// a [`UnitError`]; ops already applied stay applied. The run itself
    /// is never aborted from here.
    pub async fn apply(&mut self, unit: &str, ops: &[WriteOp]) -> std::result::Result<(), UnitError> {
        for op in ops {
            debug!(unit, op = ?op_name(op), "applying write op");
            self.apply_op(op).await.map_err(|e| UnitError {
                unit: unit.to_string(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn apply_op(&mut self, op: &WriteOp) -> io::Result<()> {
        match op {
            WriteOp::SetString { key, value } => self.conn.set(key, value).await,
            WriteOp::DeleteKey { key } => self.conn.del(key).await,
            WriteOp::AppendList { key, values } => self.conn.rpush(key, values).await,
            WriteOp::PopulateHash { key, fields } => self.conn.hset(key, fields).await,
            WriteOp::AddSetMembers { key, members } => self.conn.sadd(key, members).await,
            WriteOp::AddSortedSetMembers { key, members } => self.conn.zadd(key, members).await,
            WriteOp::SetExpiry { key, seconds } => self.conn.expire(key, *seconds).await,
        }
    }
}

fn op_name(op: &WriteOp) -> &'static str {
    match op {
        WriteOp::SetString { .. } => "set",
        WriteOp::DeleteKey { .. } => "del",
        WriteOp::AppendList { .. } => "rpush",
        WriteOp::PopulateHash { .. } => "hset",
        WriteOp::AddSetMembers { .. } => "sadd",
        WriteOp::AddSortedSetMembers { .. } => "zadd",
        WriteOp::SetExpiry { .. } => "expire",
    }
}
