//! Command-line interface for daytask
//!
//! This module defines the CLI structure using clap derive macros.
//! Each subcommand is implemented in its own submodule.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::sync::SyncMode;

mod archive;
mod status;
mod sync;

/// daytask - reconcile daily journal tasks into one to-do list
///
/// Pulls open items from the task section of today's daily note into a
/// canonical to-do list, and archives completed items month by month.
#[derive(Parser, Debug)]
#[command(name = "daytask")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "DAYTASK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root of the daily note tree
    #[arg(long, global = true, env = "DAYTASK_DIARY")]
    pub diary: Option<PathBuf>,

    /// Canonical to-do list file
    #[arg(long, global = true, env = "DAYTASK_TODO")]
    pub todo: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull new open tasks from a daily note into the to-do list
    Sync {
        /// Daily note date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Report tasks edited differently in the note and the list instead of syncing
        #[arg(long)]
        bidirectional: bool,

        /// Daily-note section holding tasks
        #[arg(long)]
        section: Option<String>,
    },

    /// Sync every daily note in the diary, oldest first
    Backfill,

    /// Move completed tasks into this month's archive document
    Archive {
        /// Archive date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show task counts and file locations
    Status,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let config = self.resolve_config();
        let output = OutputOptions {
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Sync {
                date,
                bidirectional,
                section,
            } => {
                let mut options = config.sync_options();
                if bidirectional {
                    options.mode = SyncMode::Bidirectional;
                }
                if let Some(section) = section {
                    options.task_section = section;
                }
                sync::run_sync(sync::SyncCommand {
                    storage: config.storage(),
                    options,
                    date,
                    output,
                })
            }
            Commands::Backfill => sync::run_backfill(config.storage(), config.sync_options(), output),
            Commands::Archive { date } => archive::run(archive::ArchiveCommand {
                storage: config.storage(),
                options: config.archive_options(),
                date,
                output,
            }),
            Commands::Status => status::run(config.storage(), output),
        }
    }

    /// Config file values with command-line overrides applied
    fn resolve_config(&self) -> Config {
        let mut config = match self.config.clone().or_else(Config::default_path) {
            Some(path) => Config::load_or_default(&path),
            None => Config::default(),
        };
        if let Some(diary) = &self.diary {
            config.diary_root = diary.clone();
        }
        if let Some(todo) = &self.todo {
            config.todo_file = todo.clone();
        }
        config
    }
}
