//! daytask - Daily Note Task Reconciliation Library
//!
//! This library provides the core of the daytask CLI: keeping the open tasks
//! of daily journal notes and one canonical to-do list in agreement across
//! repeated, crash-prone runs.
//!
//! # Core Concepts
//!
//! - **Daily Notes**: dated markdown files whose task section feeds the list
//! - **Canonical List**: a markdown to-do list regenerated from the state store
//! - **State Store**: durable record of every synced task, keyed by stable id
//! - **Migration**: one-time fold of a pre-existing list into a new store
//! - **Archive**: monthly documents collecting completed tasks
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `lock`: Advisory file locking
//! - `atomic`: Atomic replace, backups and write preflight checks
//! - `markdown`: Checklist line parsing and formatting
//! - `state`: The state store
//! - `storage`: File layout of diary, list, state and archives
//! - `todo_list`: Canonical list regeneration
//! - `sync`: Daily note to list reconciliation
//! - `archive`: Archiving of completed tasks

pub mod archive;
pub mod atomic;
pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod markdown;
pub mod output;
pub mod state;
pub mod storage;
pub mod sync;
pub mod todo_list;

pub use error::{Error, Result};
