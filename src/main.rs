//! Kosei CLI entry point.

use anyhow::Result;
use clap::Parser;
use kosei::cli::{commands, Cli, Commands};
use kosei::config::Settings;
use kosei::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a .env file next to the input directory.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::load_from(cli.config.as_ref())?;

    // Held until exit so buffered file logs are flushed.
    let _log_guard = logging::init_tracing(
        cli.verbose,
        settings.log_file().as_deref(),
        &settings.general.log_level,
    );

    // Execute command
    match cli.command {
        Commands::Run {
            input_dir,
            output_dir,
            skip_audio,
            skip_documents,
            reference,
        } => {
            commands::run_pipeline(
                input_dir,
                output_dir,
                skip_audio,
                skip_documents,
                reference,
                settings,
            )
            .await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, cli.config.as_ref())?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, cli.config.as_ref())?;
        }
    }

    Ok(())
}
