//! Run command - extract the input files and draft the outline.

use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, RunRequest};
use crate::report::RecordStatus;
use crate::source::Capabilities;
use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

/// Run the pipeline once.
pub async fn run_pipeline(
    input_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    skip_audio: bool,
    skip_documents: bool,
    reference: Option<PathBuf>,
    settings: Settings,
) -> Result<()> {
    let request = RunRequest {
        input_dir: input_dir.unwrap_or_else(|| settings.input_dir()),
        output_dir: output_dir.unwrap_or_else(|| settings.output_dir()),
        capabilities: Capabilities::from_skip_flags(skip_documents, skip_audio),
        reference,
    };

    let credentials = preflight::check_run(request.capabilities, &request.input_dir)?;
    debug!("Credentials: {:?}", credentials);

    Output::header("Kosei");
    Output::kv("Input", &request.input_dir.display().to_string());
    Output::kv("Output", &request.output_dir.display().to_string());
    Output::kv("Model", &settings.generation_model());
    if !request.capabilities.documents {
        Output::kv("Documents", "skipped");
    }
    if !request.capabilities.audio {
        Output::kv("Audio", "skipped");
    }
    println!();

    let show_progress = console::Term::stderr().is_term();
    let orchestrator = Orchestrator::new(settings, &credentials)?.with_progress(show_progress);

    let cancel = orchestrator.cancellation_token();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            Output::warning("Interrupted, stopping the run...");
            cancel.cancel();
        }
    });

    let result = orchestrator.run(&request).await;
    signal.abort();

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            Output::error(&e.to_string());
            let summary_path = request
                .output_dir
                .join(&orchestrator.settings().output.summary_file);
            if summary_path.is_file() {
                Output::info(&format!("Summary written to {}", summary_path.display()));
            }
            return Err(e.into());
        }
    };

    Output::header("Files");
    for record in report.summary.records() {
        Output::file_record(record);
    }
    println!();

    let failed = report.summary.count(RecordStatus::Failed);
    if failed > 0 {
        Output::warning(&format!("{} file(s) could not be extracted", failed));
    }

    Output::success(&format!(
        "Outline with {} section(s) written to {}",
        report.outline.len(),
        report.outline_path.display()
    ));
    Output::info(&format!("Summary written to {}", report.summary_path.display()));

    Ok(())
}
