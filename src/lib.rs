//! # ferrite-load
//!
//! Bulk-load data from Redis or MongoDB into a Ferrite (or any
//! Redis-protocol-compatible) store.
//!
//! One connection per side, one operation in flight, one pass over the
//! source: enumerate, transcode each record into an equivalent target
//! representation, write, report. Per-record failures are collected and
//! reported; they never abort the run.
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | RESP protocol client for source and target stores |
//! | [`mongo`] | MongoDB source client and BSON field rendering |
//! | [`migrate`] | Transcoding engine, writer, progress, orchestration |

pub mod client;
pub mod migrate;
pub mod mongo;

pub use migrate::{MigrationRun, RunOptions, RunOutcome};
