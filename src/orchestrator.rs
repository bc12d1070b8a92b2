//! Pipeline orchestrator for Kosei.
//!
//! Coordinates a run from input scanning to the written artifacts:
//!
//! `Scanning → Extracting → Assembling → Generating → Writing → Done`
//!
//! Any fatal error moves the run to `Errored`. Per-file extraction failures
//! never do; they are recorded in the processing summary and the run goes on
//! with the remaining files.

use crate::config::{Credentials, Prompts, Settings};
use crate::corpus::{Corpus, ExtractedUnit, RenderLimits};
use crate::document::{AzureLayoutAnalyzer, LayoutAnalyzer};
use crate::error::{KoseiError, Result};
use crate::outline::{GeneratedOutline, OpenAiGenerator, Outline, StructureGenerator, TextGenerator};
use crate::report::{FileRecord, ProcessingSummary, ReportWriter};
use crate::retry::RetryPolicy;
use crate::source::{scan_input_dir, Capabilities, ScanResult, SourceFile, SourceKind};
use crate::transcription::{DeepgramTranscriber, Transcriber};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Stage of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Scanning,
    Extracting,
    Assembling,
    Generating,
    Writing,
    Done,
    Errored,
}

impl RunState {
    /// Whether the run may move from `self` to `next`.
    pub fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Done, _) | (Errored, _) => false,
            (_, Errored) => true,
            (Scanning, Extracting)
            | (Extracting, Assembling)
            | (Assembling, Generating)
            | (Generating, Writing)
            | (Writing, Done) => true,
            _ => false,
        }
    }
}

/// Records the states a run passes through.
#[derive(Debug)]
struct RunTracker {
    states: Vec<RunState>,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            states: vec![RunState::Scanning],
        }
    }

    fn current(&self) -> RunState {
        *self.states.last().unwrap_or(&RunState::Scanning)
    }

    fn advance(&mut self, next: RunState) {
        let current = self.current();
        debug_assert!(current.can_advance_to(next), "{:?} -> {:?}", current, next);
        if current.can_advance_to(next) {
            debug!("Run state {:?} -> {:?}", current, next);
            self.states.push(next);
        } else {
            warn!("Ignoring invalid run state change {:?} -> {:?}", current, next);
        }
    }

    fn fail(&mut self, error: &KoseiError) {
        if self.current().can_advance_to(RunState::Errored) {
            debug!("Run state {:?} -> Errored: {}", self.current(), error);
            self.states.push(RunState::Errored);
        }
    }
}

/// What to process and where to write the results.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub capabilities: Capabilities,
    /// Reference template given explicitly; it must exist.
    pub reference: Option<PathBuf>,
}

impl RunRequest {
    /// Request using the configured directories and every capability.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            input_dir: settings.input_dir(),
            output_dir: settings.output_dir(),
            capabilities: Capabilities::all(),
            reference: None,
        }
    }
}

/// Result of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub outline: Outline,
    pub raw_response: String,
    pub summary: ProcessingSummary,
    pub outline_path: PathBuf,
    pub summary_path: PathBuf,
    /// States the run went through, in order.
    pub states: Vec<RunState>,
}

/// The main orchestrator for the Kosei pipeline.
pub struct Orchestrator {
    settings: Settings,
    analyzer: Option<Arc<dyn LayoutAnalyzer>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    generator: StructureGenerator,
    cancel: CancellationToken,
    show_progress: bool,
}

impl Orchestrator {
    /// Create an orchestrator talking to the configured services.
    ///
    /// Extraction clients are only built for the services `credentials`
    /// carries keys for.
    pub fn new(settings: Settings, credentials: &Credentials) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let retry = RetryPolicy::from_settings(&settings.retry);

        let analyzer = match &credentials.document {
            Some(document) => {
                let analyzer =
                    AzureLayoutAnalyzer::new(&settings.document, document, retry.clone())?;
                Some(Arc::new(analyzer) as Arc<dyn LayoutAnalyzer>)
            }
            None => None,
        };

        let transcriber = match &credentials.transcription_key {
            Some(key) => {
                let transcriber =
                    DeepgramTranscriber::new(&settings.transcription, key, retry.clone())?;
                Some(Arc::new(transcriber) as Arc<dyn Transcriber>)
            }
            None => None,
        };

        let model = settings.generation_model();
        info!("Using generation model {}", model);
        let generator =
            OpenAiGenerator::new(&settings.generation, &model, &credentials.generation_key)?;

        Ok(Self::with_components(
            settings,
            analyzer,
            transcriber,
            Arc::new(generator),
            prompts,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        analyzer: Option<Arc<dyn LayoutAnalyzer>>,
        transcriber: Option<Arc<dyn Transcriber>>,
        generator: Arc<dyn TextGenerator>,
        prompts: Prompts,
    ) -> Self {
        let generator = StructureGenerator::new(
            generator,
            prompts,
            RetryPolicy::from_settings(&settings.retry),
        )
        .with_limits(RenderLimits::from(&settings.corpus))
        .with_language(settings.generation.language.clone());

        Self {
            settings,
            analyzer,
            transcriber,
            generator,
            cancel: CancellationToken::new(),
            show_progress: false,
        }
    }

    /// Show a progress bar on stderr during extraction.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Token that cancels the run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the whole pipeline.
    ///
    /// Once scanning has succeeded, the processing summary is written even
    /// when a later stage fails. The outline file is only written by a run
    /// that reaches the writing stage.
    #[instrument(skip(self, request), fields(input = %request.input_dir.display()))]
    pub async fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let mut tracker = RunTracker::new();

        let prepared = self.prepare(request);
        let (mut scan, reference) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                tracker.fail(&e);
                return Err(e);
            }
        };

        let writer = ReportWriter::new(&request.output_dir, &self.settings.output);
        let mut summary = ProcessingSummary::new();
        for skipped in &scan.skipped {
            summary.record(FileRecord::skipped(skipped));
        }

        let generated = self
            .process(&mut scan.files, reference, &mut tracker, &mut summary)
            .await;

        let result = match generated {
            Ok(generated) => self.write(&writer, generated, &mut tracker, &mut summary),
            Err(e) => Err(e),
        };

        match result {
            Ok((outline, raw_response, outline_path, summary_path)) => {
                tracker.advance(RunState::Done);
                info!(
                    "Run finished: {} sections, {} file(s) failed",
                    outline.len(),
                    summary.failures().count()
                );
                Ok(RunReport {
                    outline,
                    raw_response,
                    summary,
                    outline_path,
                    summary_path,
                    states: tracker.states,
                })
            }
            Err(e) => {
                tracker.fail(&e);
                summary.set_fatal(&e);
                if let Err(write_err) = writer.write_summary(&summary) {
                    warn!("Could not write processing summary: {}", write_err);
                }
                Err(e)
            }
        }
    }

    /// Validate the request, load the reference template and scan the input.
    fn prepare(&self, request: &RunRequest) -> Result<(ScanResult, Option<String>)> {
        if request.capabilities.is_empty() {
            return Err(KoseiError::Config(
                "both document and audio processing are disabled".to_string(),
            ));
        }
        if request.capabilities.documents && self.analyzer.is_none() {
            return Err(KoseiError::Config(
                "document processing is enabled but no layout analyzer is configured".to_string(),
            ));
        }
        if request.capabilities.audio && self.transcriber.is_none() {
            return Err(KoseiError::Config(
                "audio processing is enabled but no transcriber is configured".to_string(),
            ));
        }

        let reference = self.load_reference(request)?;
        let scan = scan_input_dir(
            &request.input_dir,
            request.capabilities,
            &self.settings.display_names,
        )?;
        Ok((scan, reference))
    }

    fn load_reference(&self, request: &RunRequest) -> Result<Option<String>> {
        if let Some(path) = &request.reference {
            let template = std::fs::read_to_string(path).map_err(|e| {
                KoseiError::Config(format!(
                    "Cannot read reference template {}: {}",
                    path.display(),
                    e
                ))
            })?;
            return Ok(Some(template));
        }

        match self.settings.reference_template() {
            Some(path) if path.is_file() => {
                debug!("Using reference template {}", path.display());
                Ok(Some(std::fs::read_to_string(&path)?))
            }
            Some(path) => {
                debug!("No reference template at {}; using the built-in format", path.display());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn process(
        &self,
        files: &mut [SourceFile],
        reference: Option<String>,
        tracker: &mut RunTracker,
        summary: &mut ProcessingSummary,
    ) -> Result<GeneratedOutline> {
        tracker.advance(RunState::Extracting);
        let units = self.extract_all(files, summary).await;
        self.check_cancelled()?;

        tracker.advance(RunState::Assembling);
        let corpus = Corpus::assemble(units, reference)?;
        info!("Assembled corpus from {} source(s)", corpus.len());
        self.check_cancelled()?;

        tracker.advance(RunState::Generating);
        let generated = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(KoseiError::Cancelled),
            generated = self.generator.generate(&corpus) => generated,
        }?;
        self.check_cancelled()?;

        Ok(generated)
    }

    fn write(
        &self,
        writer: &ReportWriter,
        generated: GeneratedOutline,
        tracker: &mut RunTracker,
        summary: &mut ProcessingSummary,
    ) -> Result<(Outline, String, PathBuf, PathBuf)> {
        tracker.advance(RunState::Writing);
        let outline_path = writer.write_outline(&generated.outline)?;
        summary.set_outline(writer.outline_file_name(), generated.outline.len());
        let summary_path = writer.write_summary(summary)?;
        Ok((generated.outline, generated.raw, outline_path, summary_path))
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(KoseiError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Extract every file concurrently and record each outcome.
    ///
    /// Returns the successful units in discovery order.
    async fn extract_all(
        &self,
        files: &mut [SourceFile],
        summary: &mut ProcessingSummary,
    ) -> Vec<ExtractedUnit> {
        let progress = self.progress_bar(files.len());
        let limit = self.settings.pipeline.max_concurrent.max(1);
        info!("Extracting {} file(s), {} at a time", files.len(), limit);

        let mut settled: Vec<(usize, Result<ExtractedUnit>, Duration)> =
            stream::iter(files.iter())
                .map(|file| async move {
                    let started = Instant::now();
                    let result = tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => Err(KoseiError::Cancelled),
                        result = self.extract_one(file) => result,
                    };
                    (file.id, result, started.elapsed())
                })
                .buffer_unordered(limit)
                .inspect(|_| progress.inc(1))
                .collect()
                .await;
        progress.finish_and_clear();

        settled.sort_by_key(|(id, _, _)| *id);

        let mut units = Vec::with_capacity(settled.len());
        for (id, result, elapsed) in settled {
            let Some(file) = files.iter_mut().find(|f| f.id == id) else {
                continue;
            };
            match result {
                Ok(unit) => {
                    file.mark_processed();
                    summary.record(FileRecord::processed(&unit, elapsed));
                    units.push(unit);
                }
                Err(KoseiError::Cancelled) => debug!("{} cancelled", file.display_name),
                Err(e) => {
                    warn!("{}", e);
                    file.mark_failed();
                    summary.record(FileRecord::failed(file, &e, elapsed));
                }
            }
        }
        units
    }

    async fn extract_one(&self, file: &SourceFile) -> Result<ExtractedUnit> {
        match file.kind {
            SourceKind::Audio => match &self.transcriber {
                Some(transcriber) => transcriber.transcribe(file).await,
                None => Err(KoseiError::Config("no transcriber configured".to_string())),
            },
            SourceKind::Document | SourceKind::Presentation => match &self.analyzer {
                Some(analyzer) => analyzer.analyze(file).await,
                None => Err(KoseiError::Config("no layout analyzer configured".to_string())),
            },
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Extracting [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    }
}
