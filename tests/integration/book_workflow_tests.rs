/*!
 * End-to-end workflows over files: import, process, review and export
 */

use std::fs;

use bookwash::app_config::Config;
use bookwash::app_controller::Controller;
use bookwash::bookwash::{Axis, ChangeStatus, Level, Selection, TextView};
use bookwash::file_utils::FileManager;
use bookwash::pipeline::PipelineMode;
use bookwash::service::ScriptedService;

use crate::common::{self, rating};

const PLAIN_BOOK: &str = "# Arrival

The coach stopped at the inn.

A tired traveller climbed down.

# The Brawl

Somebody threw the first punch.

\"You bastard,\" the traveller spat.

Chairs flew across the room.
";

#[tokio::test]
async fn test_importProcessReviewExport_shouldProduceCleanedText() {
    let temp_dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(temp_dir.path(), "inn.txt", PLAIN_BOOK).unwrap();
    let controller = Controller::with_config(Config::default());

    let book = controller.import(&input, None, false).unwrap();

    let mut service = ScriptedService::new()
        .with_ratings([
            rating(Level::G, Level::G, Level::PG),
            rating(Level::R, Level::G, Level::PG13),
            rating(Level::PG, Level::G, Level::PG13),
        ])
        .with_revisions([
            "Somebody threw the first punch.\n\n\"You scoundrel,\" the traveller spat.\n\nChairs flew across the room.",
        ]);
    let summary = controller
        .run_pipeline_with(&mut service, &book, PipelineMode::Process)
        .await
        .unwrap();
    assert_eq!(summary.succeeded, 1);
    assert!(!summary.has_failures());

    let processed = FileManager::load_document(&book).unwrap();
    assert!(processed.modified.is_some());
    assert_eq!(processed.stats().rated, 2);
    assert_eq!(processed.stats().needs_cleaning, 0);
    let block = processed.changes().next().unwrap();
    assert_eq!(block.id, 1);
    assert_eq!(block.status, ChangeStatus::Pending);

    controller
        .review(&book, &Selection::All, ChangeStatus::Accepted)
        .unwrap();
    controller.export(&book, None, TextView::Cleaned).unwrap();

    let exported = fs::read_to_string(temp_dir.path().join("inn.cleaned.txt")).unwrap();
    assert!(exported.starts_with("# Arrival\n\nThe coach stopped at the inn."));
    assert!(exported.contains("# The Brawl"));
    assert!(exported.contains("You scoundrel"));
    assert!(!exported.contains("bastard"));
}

#[tokio::test]
async fn test_runPipeline_withTargetOverride_shouldRecordTargetsInFile() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_document(temp_dir.path(), "book.bookwash", &common::sample_document()).unwrap();
    let controller =
        Controller::with_config(Config::default()).with_target_overrides(vec![(Axis::Violence, Level::G)]);

    let mut service = ScriptedService::new().with_fallback_rating(rating(Level::G, Level::G, Level::PG));
    controller
        .run_pipeline_with(&mut service, &path, PipelineMode::Rate)
        .await
        .unwrap();

    let doc = FileManager::load_document(&path).unwrap();
    let targets = doc.targets_or(Config::default().cleaning.targets());
    assert_eq!(targets.violence, Level::G);
    assert_eq!(targets.language, Level::PG);
    assert!(doc.chapters.iter().all(|c| c.needs_cleaning == Some(true)));
}

#[tokio::test]
async fn test_runPipeline_withRerate_shouldClassifyRatedChaptersAgain() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut doc = common::sample_document();
    for chapter in &mut doc.chapters {
        chapter.rating = Some(rating(Level::X, Level::X, Level::X));
        chapter.needs_cleaning = Some(false);
    }
    let path = common::create_test_document(temp_dir.path(), "book.bookwash", &doc).unwrap();

    let mut service = ScriptedService::new();
    Controller::with_config(Config::default())
        .run_pipeline_with(&mut service, &path, PipelineMode::Rate)
        .await
        .unwrap();
    assert_eq!(service.classify_count(), 0);

    Controller::with_config(Config::default())
        .with_rerate(true)
        .run_pipeline_with(&mut service, &path, PipelineMode::Rate)
        .await
        .unwrap();
    assert_eq!(service.classify_count(), 2);

    let reloaded = FileManager::load_document(&path).unwrap();
    assert!(reloaded.chapters.iter().all(|c| c.rating == Some(rating(Level::G, Level::G, Level::G))));
}

#[tokio::test]
async fn test_runPipeline_overDirectory_shouldContinuePastBrokenFile() {
    let temp_dir = common::create_temp_dir().unwrap();
    let good = common::create_test_document(temp_dir.path(), "a.bookwash", &common::sample_document()).unwrap();
    let broken = common::create_test_file(
        temp_dir.path(),
        "b.bookwash",
        "#BOOKWASH 1.0\n\n#CHAPTER: 1\n\n#ORIGINAL\nstray\n",
    )
    .unwrap();
    let broken_before = fs::read_to_string(&broken).unwrap();

    let mut service = ScriptedService::new();
    let summary = Controller::with_config(Config::default())
        .run_pipeline_with(&mut service, temp_dir.path(), PipelineMode::Rate)
        .await
        .unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, vec![broken.clone()]);
    assert_eq!(summary.total(), 2);
    assert_eq!(fs::read_to_string(&broken).unwrap(), broken_before);
    assert_eq!(FileManager::load_document(&good).unwrap().stats().rated, 2);
}

#[test]
fn test_runPipeline_withEmptyDirectory_shouldFail() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut service = ScriptedService::new();

    let result = tokio_test::block_on(async {
        Controller::with_config(Config::default())
            .run_pipeline_with(&mut service, temp_dir.path(), PipelineMode::Process)
            .await
    });

    assert!(result.is_err());
}
