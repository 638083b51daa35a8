//! # migration-engine
//!
//! A queue-driven process execution engine that runs agent-assisted
//! container migrations through a fixed four-phase pipeline.
//!
//! ## Modules
//!
//! - `app` - CLI-facing application wiring: config, logging, runtime init
//! - `cli` - Argument parsing and command routing
//! - `config` - Environment-driven settings, remote overrides, credentials
//! - `dispatcher` - Queue polling loop and per-message worker dispatch
//! - `error` - The unified error type, error codes, and category taxonomy
//! - `executor` - Bounded-concurrency parallel task execution with retry
//! - `external` - Traits for blob storage and the model service
//! - `groupchat` - The bounded multi-agent conversation runtime
//! - `model` - Shared data types: process state, phases, termination, tasks
//! - `phases` - The four concrete phase steps (analysis, design, yaml, docs)
//! - `process` - The state machine that sequences phase steps
//! - `telemetry` - Per-process status and agent-activity projection

pub mod app;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod external;
pub mod groupchat;
pub mod model;
pub mod phases;
pub mod process;
pub mod telemetry;
