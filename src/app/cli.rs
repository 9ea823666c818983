//! Command line arguments
//!
//! Global flags override the LOGGING section of the configuration file. With
//! no subcommand the full stocktake (`run`) is performed.

use crate::core::logging::LogFormat;
use clap::builder::PossibleValuesParser;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use strum::VariantNames;

#[derive(Parser, Debug, Clone)]
#[command(name = "stac-stocktake")]
#[command(about = "Reconcile STAC asset records against the FBI file index")]
#[command(version)]
pub struct Cli {
    /// Configuration file (falls back to $STAC_STOCKTAKE_CONFIGURATION_FILE, then ./.stac_stocktake.yml)
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        global = true,
        value_parser = ["trace", "debug", "info", "warn", "warning", "error", "critical", "off"],
        ignore_case = true
    )]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(
        long = "log-format",
        value_name = "FORMAT",
        global = true,
        value_parser = PossibleValuesParser::new(LogFormat::VARIANTS.iter().copied())
    )]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(long = "log-file", value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colored log output
    #[arg(long = "no-color", action = ArgAction::SetTrue, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stocktake every slice from START_SLICE to END_SLICE
    Run {
        /// Ignore checkpoints and start every slice from scratch
        #[arg(long = "restart")]
        restart: bool,
    },

    /// Stocktake a single slice
    Batch {
        /// Slice id
        #[arg(short = 's', long = "slice", value_name = "SLICE")]
        slice: u32,

        /// Point in time opened by another process; it is left open
        #[arg(short = 'p', long = "pit", value_name = "PIT_ID")]
        pit: Option<String>,

        /// Ignore the slice checkpoint
        #[arg(long = "restart")]
        restart: bool,
    },

    /// Reconcile one spooled chunk again
    Chunk {
        #[arg(short = 's', long = "slice", value_name = "SLICE")]
        slice: u32,

        #[arg(short = 'c', long = "chunk", value_name = "CHUNK")]
        chunk: usize,
    },

    /// Generate assets for the given URIs
    Generate {
        #[arg(value_name = "URI", required = true)]
        uris: Vec<String>,
    },

    /// Print the effective configuration with secrets masked
    Config,
}

impl Cli {
    /// The subcommand, `run` when none was given
    pub fn selected_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Run { restart: false })
    }

    /// Log file override; `none` disables file logging
    pub fn log_file_override(&self) -> Option<Option<PathBuf>> {
        self.log_file.as_ref().map(|path| {
            if path.as_os_str().eq_ignore_ascii_case("none") {
                None
            } else {
                Some(path.clone())
            }
        })
    }
}
