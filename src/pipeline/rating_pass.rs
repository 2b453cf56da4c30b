use log::{debug, error, info};

use super::orchestrator::{ChapterOutcome, ChapterState};
use crate::bookwash::{Chapter, Rating, Targets};
use crate::service::ContentService;

/// Rate one chapter and decide whether it needs cleaning.
///
/// Chapters that already carry a rating are only re-classified with `rerate`;
/// if their flag is unknown it is computed from the stored rating. Returns
/// `None` when there was nothing to do.
pub(crate) async fn rate_chapter(
    service: &mut dyn ContentService,
    chapter: &mut Chapter,
    targets: &Targets,
    rerate: bool,
) -> Option<ChapterOutcome> {
    let state = if rerate { ChapterState::Unrated } else { ChapterState::of(chapter) };
    match (state, chapter.rating) {
        (ChapterState::Unrated, _) => {}
        (ChapterState::Rated, Some(rating)) => {
            let needs_cleaning = rating.exceeds(targets);
            chapter.needs_cleaning = Some(needs_cleaning);
            debug!("Chapter {}: flag computed from stored rating {}", chapter.number, rating);
            return Some(ChapterOutcome::new(chapter, verdict(needs_cleaning)));
        }
        _ => return None,
    }

    let text = chapter.original_text();
    if text.trim().is_empty() {
        chapter.rating = Some(Rating::default());
        chapter.needs_cleaning = Some(false);
        debug!("Chapter {} has no text, rated {}", chapter.number, Rating::default());
        return Some(ChapterOutcome::new(chapter, ChapterState::Clean));
    }

    match service.classify(&text).await {
        Ok(rating) => {
            let needs_cleaning = rating.exceeds(targets);
            chapter.rating = Some(rating);
            chapter.needs_cleaning = Some(needs_cleaning);
            info!(
                "Chapter {} rated {}{}",
                chapter.number,
                rating,
                if needs_cleaning { " (needs cleaning)" } else { "" }
            );
            Some(ChapterOutcome::new(chapter, verdict(needs_cleaning)))
        }
        Err(e) => {
            error!("Chapter {}: {}", chapter.number, e);
            Some(fail_chapter(chapter, e.to_string()))
        }
    }
}

fn verdict(needs_cleaning: bool) -> ChapterState {
    if needs_cleaning {
        ChapterState::NeedsRevision
    } else {
        ChapterState::Clean
    }
}

/// Put a chapter whose service call failed into the degraded state:
/// most permissive rating, no further cleaning
pub(crate) fn fail_chapter(chapter: &mut Chapter, message: String) -> ChapterOutcome {
    chapter.rating = Some(Rating::default());
    chapter.needs_cleaning = Some(false);
    let mut outcome = ChapterOutcome::new(chapter, ChapterState::Failed);
    outcome.error = Some(message);
    outcome
}
