//! Process entry: arguments, configuration, logging, then the command

use super::cli::{Cli, Command};
use super::services::Services;
use crate::config::{discover_config_path, ConfigError, Settings};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::{init_logging, parse_format};
use crate::core::shutdown::{ShutdownCoordinator, INTERRUPTED_EXIT_CODE};
use crate::core::version;
use crate::stocktake::{Stocktake, StocktakeError, StocktakeResult};
use clap::Parser;
use std::sync::Arc;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;

/// Parse the command line and run; returns the process exit code
pub fn startup() -> i32 {
    let cli = Cli::parse();

    let settings = match load_settings(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            // Logging is configured from the settings, so report directly
            eprintln!("FATAL: {e}");
            return EXIT_CONFIG;
        }
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    let format = parse_format(cli.log_format.as_deref().or(settings.logging.format.as_deref()));
    let log_file = cli
        .log_file_override()
        .unwrap_or_else(|| settings.logging.file.clone());
    let color = !cli.no_color && std::env::var_os("NO_COLOR").is_none();
    let _logger = match init_logging(&level, format, log_file.as_deref(), color) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialise logging: {e}");
            return EXIT_FAILURE;
        }
    };

    log::info!("stac-stocktake {} starting", version::describe());

    let command = cli.selected_command();
    if command == Command::Config {
        return match settings.redacted().to_yaml() {
            Ok(yaml) => {
                print!("{yaml}");
                EXIT_SUCCESS
            }
            Err(e) => {
                log_error_with_context(&e, "Printing configuration");
                EXIT_FAILURE
            }
        };
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("FATAL: failed to start async runtime: {}", e);
            return EXIT_FAILURE;
        }
    };

    let result = runtime.block_on(execute(Arc::new(settings), command));
    match result {
        Ok(()) => EXIT_SUCCESS,
        Err(StocktakeError::Interrupted) => {
            log::warn!("Stocktake interrupted; checkpoints are saved, rerun to resume");
            INTERRUPTED_EXIT_CODE
        }
        Err(StocktakeError::Config(e)) => {
            log_error_with_context(&e, "Loading configuration");
            EXIT_CONFIG
        }
        Err(e) => {
            log_error_with_context(&e, "Stocktake");
            EXIT_FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, ConfigError> {
    let path = discover_config_path(cli.config.as_deref())?;
    Settings::load(&path)
}

async fn execute(settings: Arc<Settings>, command: Command) -> StocktakeResult<()> {
    let shutdown = ShutdownCoordinator::new();
    shutdown.install_signal_handlers();

    let services = Services::connect(&settings).await?;
    let mut builder = Stocktake::builder(settings.clone(), services.search.clone()).shutdown(shutdown);
    if let Some(publisher) = &services.publisher {
        builder = builder.publisher(publisher.clone());
    }

    let result = match builder.build() {
        Ok(stocktake) => dispatch(&stocktake, command).await,
        Err(e) => Err(e),
    };
    services.shutdown().await;
    result
}

async fn dispatch(stocktake: &Stocktake, command: Command) -> StocktakeResult<()> {
    match command {
        Command::Run { restart } => {
            let report = stocktake.run(restart).await?;
            for slice in &report.slices {
                log::info!(
                    "slice {}: {}{}",
                    slice.slice_id,
                    slice.counts,
                    if slice.skipped { " (already complete)" } else { "" }
                );
            }
        }
        Command::Batch {
            slice,
            pit,
            restart,
        } => {
            stocktake.run_batch(slice, pit, restart).await?;
        }
        Command::Chunk { slice, chunk } => {
            let counts = stocktake.run_chunk(slice, chunk).await?;
            log::info!("slice {} chunk {}: {}", slice, chunk, counts);
        }
        Command::Generate { uris } => {
            let batch = stocktake.generate(&uris).await?;
            for uri in &batch.unmatched {
                println!("unmatched\t{uri}");
            }
        }
        Command::Config => {}
    }
    Ok(())
}
