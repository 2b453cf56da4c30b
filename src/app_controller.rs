use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};

use crate::app_config::Config;
use crate::bookwash::review::{self, Selection};
use crate::bookwash::{Axis, BookMetadata, ChangeStatus, Document, DocumentStats, Level, Targets, TextView};
use crate::container::{ContainerCodec, PlainTextCodec};
use crate::file_utils::FileManager;
use crate::pipeline::{BookwashPipeline, Checkpoint, PipelineMode, PipelineProgress, PipelineResult};
use crate::service::{ContentClient, ContentService};

// @module: Application controller for bookwash processing

/// Outcome of a command over one or more files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Files handled successfully
    pub succeeded: usize,
    /// Files that failed with an unrecoverable error
    pub failed: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Per-axis targets given on the command line
    target_overrides: Vec<(Axis, Level)>,
    // @field: Classify chapters that already have a rating
    rerate: bool,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            target_overrides: Vec::new(),
            rerate: false,
        }
    }

    /// Targets that win over both the document settings and the config
    pub fn with_target_overrides(mut self, overrides: Vec<(Axis, Level)>) -> Self {
        self.target_overrides = overrides;
        self
    }

    pub fn with_rerate(mut self, rerate: bool) -> Self {
        self.rerate = rerate;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Targets for `doc`: command line, then document settings, then config
    pub fn resolve_targets(&self, doc: &Document) -> Targets {
        let mut targets = doc.targets_or(self.config.cleaning.targets());
        for (axis, level) in &self.target_overrides {
            targets.set(*axis, *level);
        }
        targets
    }

    /// Run the pipeline on a file or every bookwash file below a directory
    pub async fn run_pipeline(&self, input: &Path, mode: PipelineMode) -> Result<BatchSummary> {
        let mut client = ContentClient::from_config(&self.config);
        info!(
            "Using {} - {}",
            self.config.ai.provider.display_name(),
            self.config.ai.get_model()
        );
        self.run_pipeline_with(&mut client, input, mode).await
    }

    /// Same as `run_pipeline` with an explicit service, shared by all files
    pub async fn run_pipeline_with(
        &self,
        service: &mut dyn ContentService,
        input: &Path,
        mode: PipelineMode,
    ) -> Result<BatchSummary> {
        let files = FileManager::collect_documents(input)?;
        if files.is_empty() {
            return Err(anyhow!("No bookwash files found in: {:?}", input));
        }

        let start_time = std::time::Instant::now();
        let multi_progress = MultiProgress::new();
        let mut summary = BatchSummary::default();

        for file in &files {
            match self.process_document(service, file, mode, &multi_progress).await {
                Ok(result) => {
                    info!("{}: {}", file.display(), result.summary());
                    summary.succeeded += 1;
                }
                Err(e) => {
                    error!("Error processing file {}: {:#}", file.display(), e);
                    summary.failed.push(file.clone());
                }
            }
        }

        if files.len() > 1 {
            info!(
                "Batch completed in {}: {} processed, {} errors",
                Self::format_duration(start_time.elapsed()),
                summary.succeeded,
                summary.failed.len()
            );
        }
        Ok(summary)
    }

    /// Load, process and save one document, saving after every changed chapter
    async fn process_document(
        &self,
        service: &mut dyn ContentService,
        path: &Path,
        mode: PipelineMode,
        multi_progress: &MultiProgress,
    ) -> Result<PipelineResult> {
        let mut doc = FileManager::load_document(path)?;

        let mut pipeline_config = self.config.cleaning.pipeline_config();
        pipeline_config.targets = self.resolve_targets(&doc);
        pipeline_config.rerate = self.rerate;
        info!("{}: targets {}", path.display(), describe_targets(&pipeline_config.targets));

        let progress_bar = multi_progress.add(ProgressBar::new(doc.chapters.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chapters {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        let bar = progress_bar.clone();
        let progress_callback: Box<dyn Fn(PipelineProgress) + Send> = Box::new(move |progress| {
            bar.set_length(progress.total_chapters as u64);
            bar.set_position(progress.chapters_processed as u64);
            bar.set_message(progress.status);
        });

        let mut save = |doc: &Document| FileManager::save_document(path, doc);
        let checkpoint: Checkpoint<'_> = &mut save;
        let mut pipeline = BookwashPipeline::new(service, pipeline_config);
        let result = pipeline
            .run_with(&mut doc, mode, Some(progress_callback), Some(checkpoint))
            .await?;

        FileManager::save_document(path, &doc)?;
        progress_bar.finish_with_message(result.summary());
        Ok(result)
    }

    /// Set the status of change blocks in a file or directory
    pub fn review(&self, input: &Path, selection: &Selection, status: ChangeStatus) -> Result<BatchSummary> {
        self.for_each_document(input, |path| {
            let mut doc = FileManager::load_document(path)?;
            let outcome = review::apply(&mut doc, selection, status);
            if outcome.updated > 0 {
                FileManager::save_document(path, &doc)?;
            }
            info!("{}: marked {} change(s) as {}", path.display(), outcome.updated, status);
            if !outcome.unknown.is_empty() {
                warn!("{}: no change blocks with ids {}", path.display(), review::describe_ids(&outcome.unknown));
            }
            Ok(())
        })
    }

    /// Write the chosen view of each document as plain text
    pub fn export(&self, input: &Path, output_dir: Option<&Path>, view: TextView) -> Result<BatchSummary> {
        let suffix = match view {
            TextView::Original => "original",
            TextView::Cleaned => "cleaned",
            TextView::Proposed => "proposed",
        };

        self.for_each_document(input, |path| {
            let doc = FileManager::load_document(path)?;
            let dir = match output_dir {
                Some(dir) => dir.to_path_buf(),
                None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
            };
            let output_path = FileManager::generate_output_path(path, dir, suffix, "txt");

            let codec = PlainTextCodec;
            let bytes = codec.pack(&doc.to_container_chapters(view))?;
            FileManager::write_atomic(&output_path, &bytes)?;
            info!("Exported {} ({}) to {}", path.display(), codec.name(), output_path.display());
            Ok(())
        })
    }

    /// Create a bookwash document from a plain text file with `# ` chapter headings
    pub fn import(&self, input: &Path, output: Option<&Path>, force_overwrite: bool) -> Result<PathBuf> {
        let output_path = match output {
            Some(path) => path.to_path_buf(),
            None => input.with_extension(crate::bookwash::FILE_EXTENSION),
        };
        if output_path.exists() && !force_overwrite {
            return Err(anyhow!(
                "Output file already exists: {:?} (use --force to overwrite)",
                output_path
            ));
        }

        let bytes = std::fs::read(input).with_context(|| format!("Failed to read file: {:?}", input))?;
        let codec = PlainTextCodec;
        let chapters = codec.unpack(&bytes)?;

        let metadata = BookMetadata {
            title: input.file_stem().map(|stem| stem.to_string_lossy().to_string()),
            ..BookMetadata::default()
        };
        let source = input.file_name().map(|name| name.to_string_lossy().to_string());
        let doc = Document::from_container_chapters(metadata, source, chapters);

        FileManager::save_document(&output_path, &doc)?;
        info!("Imported {} chapter(s) into {}", doc.chapters.len(), output_path.display());
        Ok(output_path)
    }

    /// Summaries of every document
    pub fn stats(&self, input: &Path) -> Result<Vec<(PathBuf, DocumentStats)>> {
        let mut all = Vec::new();
        for path in FileManager::collect_documents(input)? {
            let doc = FileManager::load_document(&path)?;
            let stats = doc.stats();
            info!("{}: {}", path.display(), stats);
            all.push((path, stats));
        }
        Ok(all)
    }

    /// Test the connection to the configured provider
    pub async fn check(&self) -> Result<()> {
        let client = ContentClient::from_config(&self.config);
        client
            .test_connection()
            .await
            .with_context(|| format!("Failed to connect to {}", self.config.ai.provider.display_name()))?;
        info!(
            "Connection to {} ({}) is working",
            self.config.ai.provider.display_name(),
            self.config.ai.get_model()
        );
        Ok(())
    }

    fn for_each_document(&self, input: &Path, mut action: impl FnMut(&Path) -> Result<()>) -> Result<BatchSummary> {
        let mut summary = BatchSummary::default();
        for path in FileManager::collect_documents(input)? {
            match action(&path) {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", path.display(), e);
                    summary.failed.push(path);
                }
            }
        }
        Ok(summary)
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

fn describe_targets(targets: &Targets) -> String {
    Axis::ALL
        .iter()
        .map(|axis| format!("{}<={}", axis.key(), targets.get(*axis)))
        .collect::<Vec<_>>()
        .join(" ")
}
