/*!
 * Pipeline orchestrator for rating and cleaning a document.
 *
 * Chapters are handled one at a time, in document order, by a single owner of
 * the document:
 * 1. Rating pass: classify unrated chapters and set their cleaning flag
 * 2. Cleaning pass: revise flagged chapters, verify, align and store changes
 *
 * A failed service call only degrades the chapter it belongs to. The optional
 * checkpoint callback sees the document after every chapter that changed.
 */

use anyhow::Result;
use log::info;
use std::fmt;
use std::time::{Duration, Instant};

use super::cleaning_pass::clean_chapter;
use super::escalation::EscalationPolicy;
use super::rating_pass::rate_chapter;
use crate::alignment::{Aligner, AlignmentConfig};
use crate::bookwash::{Chapter, Document, Rating, Targets};
use crate::service::{Aggression, ContentService};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum level per axis
    pub targets: Targets,

    /// Maximum revise/verify rounds per chapter
    pub max_iterations: u32,

    /// Re-classify each revision
    pub verify: bool,

    /// Classify chapters that already carry a rating
    pub rerate: bool,

    /// Aggression schedule
    pub escalation: EscalationPolicy,

    /// Paragraph alignment tuning
    pub alignment: AlignmentConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            targets: Targets::default(),
            max_iterations: 3,
            verify: true,
            rerate: false,
            escalation: EscalationPolicy::default(),
            alignment: AlignmentConfig::default(),
        }
    }
}

/// Which passes to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineMode {
    /// Rating pass only
    Rate,
    /// Cleaning pass only
    Clean,
    /// Rating pass, then cleaning pass
    Process,
}

/// Phases of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Rating,
    Cleaning,
}

/// Progress information for callbacks.
#[derive(Debug, Clone)]
pub struct PipelineProgress {
    /// Current phase
    pub phase: PipelinePhase,

    /// Chapters handled so far in this phase
    pub chapters_processed: usize,

    /// Chapters this phase will look at
    pub total_chapters: usize,

    /// Current status message
    pub status: String,
}

/// Per-chapter lifecycle.
///
/// `Unrated -> Rated -> NeedsRevision | Clean`, then for flagged chapters
/// `Revising -> Verifying -> ... -> Converged | Exhausted`. Without
/// verification a single revision ends in `Unverified`. `Failed` marks a
/// chapter whose service call gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterState {
    Unrated,
    Rated,
    NeedsRevision,
    Clean,
    Revising { iteration: u32 },
    Verifying { iteration: u32 },
    Converged,
    Exhausted,
    Unverified,
    Failed,
}

impl ChapterState {
    /// Where a chapter stands before a run, judged from its stored fields
    pub fn of(chapter: &Chapter) -> Self {
        match (chapter.rating, chapter.needs_cleaning) {
            (None, _) => Self::Unrated,
            (Some(_), None) => Self::Rated,
            (Some(_), Some(true)) => Self::NeedsRevision,
            (Some(_), Some(false)) => Self::Clean,
        }
    }

    /// Short name, without iteration numbers
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unrated => "unrated",
            Self::Rated => "rated",
            Self::NeedsRevision => "needs revision",
            Self::Clean => "clean",
            Self::Revising { .. } => "revising",
            Self::Verifying { .. } => "verifying",
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
            Self::Unverified => "unverified",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ChapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revising { iteration } | Self::Verifying { iteration } => {
                write!(f, "{} (iteration {})", self.name(), iteration)
            }
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// What happened to one chapter
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutcome {
    pub number: u32,
    pub title: String,
    pub state: ChapterState,
    /// Revisions requested
    pub iterations: u32,
    /// Aggression of each revision, in order
    pub aggression: Vec<Aggression>,
    pub rating: Option<Rating>,
    /// Change blocks in the chapter afterwards
    pub changes: usize,
    pub error: Option<String>,
}

impl ChapterOutcome {
    pub fn new(chapter: &Chapter, state: ChapterState) -> Self {
        Self {
            number: chapter.number,
            title: chapter.display_title(),
            state,
            iterations: 0,
            aggression: Vec::new(),
            rating: chapter.rating,
            changes: chapter.changes().count(),
            error: None,
        }
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    /// Latest outcome per chapter that was touched, in document order
    pub outcomes: Vec<ChapterOutcome>,

    /// Total duration of the run
    pub duration: Duration,
}

impl PipelineResult {
    pub fn count(&self, state: ChapterState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    pub fn failed(&self) -> usize {
        self.count(ChapterState::Failed)
    }

    pub fn outcome(&self, number: u32) -> Option<&ChapterOutcome> {
        self.outcomes.iter().find(|o| o.number == number)
    }

    /// Record an outcome, replacing an earlier one for the same chapter
    fn record(&mut self, outcome: ChapterOutcome) {
        match self.outcomes.iter_mut().find(|o| o.number == outcome.number) {
            Some(existing) => *existing = outcome,
            None => self.outcomes.push(outcome),
        }
    }

    /// One line summary, e.g. `3 chapter(s): 1 converged, 2 clean`
    pub fn summary(&self) -> String {
        let states = [
            ChapterState::Converged,
            ChapterState::Exhausted,
            ChapterState::Unverified,
            ChapterState::NeedsRevision,
            ChapterState::Clean,
            ChapterState::Failed,
        ];
        let parts: Vec<String> = states
            .iter()
            .filter_map(|state| {
                let count = self.count(*state);
                (count > 0).then(|| format!("{} {}", count, state.name()))
            })
            .collect();

        if parts.is_empty() {
            return "no chapters needed work".to_string();
        }
        let changes: usize = self.outcomes.iter().map(|o| o.changes).sum();
        format!(
            "{} chapter(s): {}; {} change block(s) in {:.1}s",
            self.outcomes.len(),
            parts.join(", "),
            changes,
            self.duration.as_secs_f64()
        )
    }
}

/// Callback invoked with the document after each changed chapter
pub type Checkpoint<'c> = &'c mut dyn FnMut(&Document) -> Result<()>;

/// Main orchestrator for the rating and cleaning passes.
pub struct BookwashPipeline<'a> {
    service: &'a mut dyn ContentService,
    config: PipelineConfig,
    aligner: Aligner,
}

impl<'a> BookwashPipeline<'a> {
    pub fn new(service: &'a mut dyn ContentService, config: PipelineConfig) -> Self {
        Self {
            aligner: Aligner::new(config.alignment),
            service,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the passes selected by `mode` without callbacks
    pub async fn run(&mut self, doc: &mut Document, mode: PipelineMode) -> Result<PipelineResult> {
        self.run_with(doc, mode, None, None).await
    }

    /// Run the passes selected by `mode`.
    ///
    /// Only a failing checkpoint aborts the run; service failures are recorded
    /// in the outcomes.
    pub async fn run_with(
        &mut self,
        doc: &mut Document,
        mode: PipelineMode,
        progress_callback: Option<Box<dyn Fn(PipelineProgress) + Send>>,
        mut checkpoint: Option<Checkpoint<'_>>,
    ) -> Result<PipelineResult> {
        let start_time = Instant::now();
        let mut result = PipelineResult::default();
        doc.set_targets(&self.config.targets);

        if matches!(mode, PipelineMode::Rate | PipelineMode::Process) {
            let total = doc.chapters.len();
            for index in 0..total {
                report(&progress_callback, PipelinePhase::Rating, index, total, &doc.chapters[index]);

                let outcome =
                    rate_chapter(&mut *self.service, &mut doc.chapters[index], &self.config.targets, self.config.rerate).await;
                if let Some(outcome) = outcome {
                    result.record(outcome);
                    if let Some(save) = checkpoint.as_deref_mut() {
                        save(&*doc)?;
                    }
                }
            }
            finish(&progress_callback, PipelinePhase::Rating, total);
        }

        if matches!(mode, PipelineMode::Clean | PipelineMode::Process) {
            let flagged: Vec<usize> = doc
                .chapters
                .iter()
                .enumerate()
                .filter(|(_, chapter)| chapter.needs_cleaning == Some(true))
                .map(|(index, _)| index)
                .collect();
            let mut next_id = doc.next_change_id();

            for (done, index) in flagged.iter().copied().enumerate() {
                report(&progress_callback, PipelinePhase::Cleaning, done, flagged.len(), &doc.chapters[index]);

                let outcome = clean_chapter(
                    &mut *self.service,
                    &mut doc.chapters[index],
                    &self.config,
                    &self.aligner,
                    &mut next_id,
                )
                .await;
                if let Some(outcome) = outcome {
                    result.record(outcome);
                    if let Some(save) = checkpoint.as_deref_mut() {
                        save(&*doc)?;
                    }
                }
            }
            finish(&progress_callback, PipelinePhase::Cleaning, flagged.len());
        }

        result.outcomes.sort_by_key(|o| {
            doc.chapters
                .iter()
                .position(|chapter| chapter.number == o.number)
                .unwrap_or(usize::MAX)
        });
        result.duration = start_time.elapsed();
        info!("Pipeline finished: {}", result.summary());
        Ok(result)
    }
}

fn report(
    callback: &Option<Box<dyn Fn(PipelineProgress) + Send>>,
    phase: PipelinePhase,
    processed: usize,
    total: usize,
    chapter: &Chapter,
) {
    if let Some(callback) = callback {
        let verb = match phase {
            PipelinePhase::Rating => "Rating",
            PipelinePhase::Cleaning => "Cleaning",
        };
        callback(PipelineProgress {
            phase,
            chapters_processed: processed,
            total_chapters: total,
            status: format!("{} {}", verb, chapter.display_title()),
        });
    }
}

fn finish(callback: &Option<Box<dyn Fn(PipelineProgress) + Send>>, phase: PipelinePhase, total: usize) {
    if let Some(callback) = callback {
        callback(PipelineProgress {
            phase,
            chapters_processed: total,
            total_chapters: total,
            status: format!("{:?} phase complete", phase),
        });
    }
}
