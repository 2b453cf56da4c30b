use log::{debug, error, info, warn};

use super::orchestrator::{ChapterOutcome, ChapterState, PipelineConfig};
use super::rating_pass::fail_chapter;
use crate::alignment::{to_content_units, Aligner};
use crate::bookwash::{split_paragraphs, Chapter, Rating};
use crate::service::{Aggression, ContentService};

/// Revise one flagged chapter until it fits the targets or the iteration
/// budget runs out, then replace its content with the aligned change blocks.
///
/// Returns `None` for chapters that are not flagged for cleaning.
pub(crate) async fn clean_chapter(
    service: &mut dyn ContentService,
    chapter: &mut Chapter,
    config: &PipelineConfig,
    aligner: &Aligner,
    next_id: &mut u64,
) -> Option<ChapterOutcome> {
    if chapter.needs_cleaning != Some(true) {
        return None;
    }
    let targets = &config.targets;
    let original = chapter.original_text();

    let mut rating = match chapter.rating {
        Some(rating) => rating,
        None => match service.classify(&original).await {
            Ok(rating) => {
                chapter.rating = Some(rating);
                rating
            }
            Err(e) => {
                error!("Chapter {}: {}", chapter.number, e);
                return Some(fail_chapter(chapter, e.to_string()));
            }
        },
    };
    if !rating.exceeds(targets) {
        chapter.needs_cleaning = Some(false);
        debug!("Chapter {} already within targets ({})", chapter.number, rating);
        return Some(ChapterOutcome::new(chapter, ChapterState::Clean));
    }

    let max_iterations = if config.verify { config.max_iterations.max(1) } else { 1 };
    let mut draft = original;
    let mut aggression_used: Vec<Aggression> = Vec::new();
    let mut state = ChapterState::Unverified;

    for iteration in 1..=max_iterations {
        let aggression = if config.verify {
            config.escalation.aggression_for(iteration, targets)
        } else {
            Aggression::Light
        };
        debug!(
            "Chapter {}: {:?} at aggression {}",
            chapter.number,
            ChapterState::Revising { iteration },
            aggression
        );

        // First pass works on the original, later passes refine the latest draft
        draft = match service.revise(&draft, targets, aggression).await {
            Ok(revised) => revised,
            Err(e) => {
                error!("Chapter {}: {}", chapter.number, e);
                return Some(failed_after(chapter, e.to_string(), iteration, aggression_used));
            }
        };
        aggression_used.push(aggression);

        if !config.verify {
            break;
        }

        debug!("Chapter {}: {:?}", chapter.number, ChapterState::Verifying { iteration });
        rating = match service.classify(&draft).await {
            Ok(rating) => rating,
            Err(e) => {
                error!("Chapter {}: {}", chapter.number, e);
                return Some(failed_after(chapter, e.to_string(), iteration, aggression_used));
            }
        };

        if !rating.exceeds(targets) {
            state = ChapterState::Converged;
            break;
        }
        if iteration == max_iterations {
            warn!(
                "Chapter {} still rated {} after {} iterations, keeping the last revision",
                chapter.number, rating, iteration
            );
            state = ChapterState::Exhausted;
        }
    }

    let alignment = aligner.align(&chapter.original_paragraphs(), &split_paragraphs(&draft));
    let (units, next) = to_content_units(alignment, *next_id);
    *next_id = next;
    chapter.units = units;
    chapter.rating = Some(rating);
    chapter.needs_cleaning = Some(false);

    let mut outcome = ChapterOutcome::new(chapter, state);
    outcome.iterations = aggression_used.len() as u32;
    outcome.aggression = aggression_used;
    info!(
        "Chapter {} {}: {} change(s), rating {}",
        chapter.number,
        state,
        outcome.changes,
        rating
    );
    Some(outcome)
}

fn failed_after(chapter: &mut Chapter, message: String, iteration: u32, aggression: Vec<Aggression>) -> ChapterOutcome {
    let mut outcome = fail_chapter(chapter, message);
    outcome.iterations = iteration;
    outcome.aggression = aggression;
    outcome
}
