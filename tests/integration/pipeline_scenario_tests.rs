/*!
 * Orchestrator scenarios driven by a scripted content service
 */

use bookwash::bookwash::{Chapter, ChangeStatus, ContentUnit, Document, Level, Rating, Targets, TextView};
use bookwash::pipeline::{BookwashPipeline, ChapterState, PipelineConfig, PipelineMode};
use bookwash::service::{Aggression, ScriptedService};

use crate::common::{self, rating};

fn flagged_document(chapter: Chapter) -> Document {
    let mut doc = Document::new();
    doc.chapters.push(chapter);
    doc
}

/// Chapter rated R for language with a PG language target: the rate pass flags
/// it, the first revision is light and a still-R verification escalates.
#[tokio::test]
async fn test_process_languageR_withPgTarget_shouldEscalateAggression() {
    common::init_test_logging();
    let mut doc = flagged_document(
        Chapter::new(1)
            .with_paragraph("Quiet start.")
            .with_paragraph("Damn you, he said."),
    );
    let mut service = ScriptedService::new()
        .with_ratings([
            rating(Level::R, Level::G, Level::G),
            rating(Level::R, Level::G, Level::G),
            rating(Level::PG, Level::G, Level::G),
        ])
        .with_revisions(["Quiet start.\n\nDarn you, he said.", "Quiet start.\n\nCurse you, he said."]);
    let config = PipelineConfig {
        targets: Targets::new(Level::PG, Level::PG, Level::PG13),
        ..PipelineConfig::default()
    };

    let result = {
        let mut pipeline = BookwashPipeline::new(&mut service, config);
        pipeline.run(&mut doc, PipelineMode::Process).await.unwrap()
    };

    assert_eq!(service.aggression_levels(), vec![Aggression::Light, Aggression::Moderate]);
    assert_eq!(service.classify_count(), 3);

    let outcome = result.outcome(1).unwrap();
    assert_eq!(outcome.state, ChapterState::Converged);
    assert_eq!(outcome.iterations, 2);

    let chapter = &doc.chapters[0];
    assert_eq!(chapter.needs_cleaning, Some(false));
    assert_eq!(chapter.rating, Some(rating(Level::PG, Level::G, Level::G)));
    assert_eq!(chapter.text(TextView::Proposed), "Quiet start.\n\nCurse you, he said.");
    assert_eq!(chapter.text(TextView::Original), "Quiet start.\n\nDamn you, he said.");
}

/// Same rating with a lenient target set only escalates once the loop is on
/// its third round.
#[tokio::test]
async fn test_clean_withLenientTargets_shouldStayLightOnSecondIteration() {
    let mut chapter = Chapter::new(1).with_paragraph("Blood everywhere.");
    chapter.rating = Some(rating(Level::G, Level::G, Level::X));
    chapter.needs_cleaning = Some(true);
    let mut doc = flagged_document(chapter);

    let stubborn = rating(Level::G, Level::G, Level::X);
    let mut service = ScriptedService::new().with_fallback_rating(stubborn);
    let config = PipelineConfig {
        targets: Targets::new(Level::R, Level::R, Level::R),
        ..PipelineConfig::default()
    };

    BookwashPipeline::new(&mut service, config)
        .run(&mut doc, PipelineMode::Clean)
        .await
        .unwrap();

    assert_eq!(
        service.aggression_levels(),
        vec![Aggression::Light, Aggression::Light, Aggression::Moderate]
    );
}

/// A reviser that never gets below target stops at the iteration budget.
#[tokio::test]
async fn test_clean_neverConverging_shouldExhaustWithinBudget() {
    common::init_test_logging();
    let mut chapter = Chapter::new(1).with_paragraph("Filthy words.");
    chapter.rating = Some(rating(Level::X, Level::G, Level::G));
    chapter.needs_cleaning = Some(true);
    let mut doc = flagged_document(chapter);

    let last = rating(Level::R, Level::G, Level::G);
    let mut service = ScriptedService::new()
        .with_ratings([rating(Level::X, Level::G, Level::G), rating(Level::R, Level::G, Level::G), last])
        .with_revisions(["Dirty words.", "Rude words.", "Coarse words."]);
    let config = PipelineConfig {
        max_iterations: 3,
        ..PipelineConfig::default()
    };

    let result = BookwashPipeline::new(&mut service, config)
        .run(&mut doc, PipelineMode::Clean)
        .await
        .unwrap();

    let outcome = result.outcome(1).unwrap();
    assert_eq!(outcome.state, ChapterState::Exhausted);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(service.revised_inputs().len(), 3);

    let chapter = &doc.chapters[0];
    assert_eq!(chapter.rating, Some(last));
    assert_eq!(chapter.needs_cleaning, Some(false));
    assert_eq!(chapter.text(TextView::Proposed), "Coarse words.");
}

/// A revision with fewer paragraphs is aligned by similarity: the dropped
/// heading becomes a removal, the rest pair up.
#[tokio::test]
async fn test_clean_withMergedParagraphs_shouldAlignBySimilarity() {
    let mut chapter = Chapter::new(1)
        .with_paragraph("Title")
        .with_paragraph("Para A")
        .with_paragraph("Para B");
    chapter.rating = Some(rating(Level::R, Level::G, Level::G));
    chapter.needs_cleaning = Some(true);
    let mut doc = flagged_document(chapter);

    let mut service = ScriptedService::new()
        .with_revisions(["Para A revised\n\nPara B"])
        .with_ratings([Rating::default()]);

    BookwashPipeline::new(&mut service, PipelineConfig::default())
        .run(&mut doc, PipelineMode::Clean)
        .await
        .unwrap();

    let units = &doc.chapters[0].units;
    assert_eq!(units.len(), 3);
    match &units[0] {
        ContentUnit::Change(block) => {
            assert_eq!(block.original, "Title");
            assert!(block.is_removal());
        }
        other => panic!("expected a removal, got {:?}", other),
    }
    match &units[1] {
        ContentUnit::Change(block) => {
            assert_eq!(block.original, "Para A");
            assert_eq!(block.cleaned, "Para A revised");
        }
        other => panic!("expected a change, got {:?}", other),
    }
    assert_eq!(units[2], ContentUnit::Paragraph("Para B".to_string()));
}

#[tokio::test]
async fn test_rate_serviceFailure_shouldDegradeOnlyThatChapter() {
    let mut doc = common::sample_document();
    let mut service = ScriptedService::new()
        .fail_next_classify()
        .with_ratings([rating(Level::R, Level::G, Level::G)]);

    let result = BookwashPipeline::new(&mut service, PipelineConfig::default())
        .run(&mut doc, PipelineMode::Rate)
        .await
        .unwrap();

    assert_eq!(result.failed(), 1);
    assert!(result.outcome(1).unwrap().error.is_some());
    assert_eq!(doc.chapters[0].rating, Some(Rating::default()));
    assert_eq!(doc.chapters[0].needs_cleaning, Some(false));
    assert_eq!(doc.chapters[1].needs_cleaning, Some(true));
    assert_eq!(result.count(ChapterState::NeedsRevision), 1);
}

#[tokio::test]
async fn test_clean_reviserFailure_shouldKeepOriginalUnits() {
    let mut doc = common::sample_document();
    doc.chapters[1].rating = Some(rating(Level::R, Level::G, Level::G));
    doc.chapters[1].needs_cleaning = Some(true);
    let before = doc.chapters[1].units.clone();
    let mut service = ScriptedService::new().fail_next_revise();

    let result = BookwashPipeline::new(&mut service, PipelineConfig::default())
        .run(&mut doc, PipelineMode::Clean)
        .await
        .unwrap();

    assert_eq!(result.outcome(2).unwrap().state, ChapterState::Failed);
    assert_eq!(doc.chapters[1].units, before);
    assert_eq!(doc.chapters[1].needs_cleaning, Some(false));
}

#[tokio::test]
async fn test_clean_withoutVerify_shouldReviseOnceAndKeepRating() {
    let mut doc = common::sample_document();
    let stored = rating(Level::R, Level::G, Level::G);
    doc.chapters[1].rating = Some(stored);
    doc.chapters[1].needs_cleaning = Some(true);
    let mut service = ScriptedService::new().with_revisions([
        "He walked into the tavern.\n\n\"Curses,\" he shouted at the barkeep.\n\nThe room went quiet.",
    ]);
    let config = PipelineConfig {
        verify: false,
        ..PipelineConfig::default()
    };

    let result = BookwashPipeline::new(&mut service, config)
        .run(&mut doc, PipelineMode::Clean)
        .await
        .unwrap();

    assert_eq!(result.outcome(2).unwrap().state, ChapterState::Unverified);
    assert_eq!(service.classify_count(), 0);
    assert_eq!(service.aggression_levels(), vec![Aggression::Light]);
    assert_eq!(doc.chapters[1].rating, Some(stored));
    assert_eq!(doc.chapters[1].changes().count(), 1);
}

#[tokio::test]
async fn test_process_secondRun_shouldBeNoOpAndKeepChangeIds() {
    let mut doc = common::sample_document();
    let mut service = ScriptedService::new()
        .with_ratings([
            rating(Level::G, Level::G, Level::G),
            rating(Level::R, Level::G, Level::G),
            rating(Level::G, Level::G, Level::G),
        ])
        .with_revisions(["He walked into the tavern.\n\n\"Blast,\" he shouted at the barkeep.\n\nThe room went quiet."]);

    BookwashPipeline::new(&mut service, PipelineConfig::default())
        .run(&mut doc, PipelineMode::Process)
        .await
        .unwrap();
    doc.set_all_change_status(ChangeStatus::Accepted);
    let after_first = doc.clone();
    let calls = service.calls().len();

    let result = BookwashPipeline::new(&mut service, PipelineConfig::default())
        .run(&mut doc, PipelineMode::Process)
        .await
        .unwrap();

    assert!(result.outcomes.is_empty());
    assert_eq!(result.summary(), "no chapters needed work");
    assert_eq!(service.calls().len(), calls);
    assert_eq!(doc.chapters, after_first.chapters);
}

#[tokio::test]
async fn test_run_shouldStoreTargetsInDocumentSettings() {
    let mut doc = Document::new();
    let mut service = ScriptedService::new();
    let config = PipelineConfig {
        targets: Targets::new(Level::G, Level::PG13, Level::R),
        ..PipelineConfig::default()
    };

    BookwashPipeline::new(&mut service, config)
        .run(&mut doc, PipelineMode::Rate)
        .await
        .unwrap();

    assert_eq!(
        doc.targets_or(Targets::default()),
        Targets::new(Level::G, Level::PG13, Level::R)
    );
}
