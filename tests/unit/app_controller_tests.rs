/*!
 * Tests for the application controller commands that work on files only
 */

use std::fs;

use bookwash::app_config::Config;
use bookwash::app_controller::Controller;
use bookwash::bookwash::{Axis, ChangeBlock, ChangeStatus, ContentUnit, Document, Level, Selection, SettingValue, TextView};
use bookwash::file_utils::FileManager;

use crate::common;

fn document_with_changes() -> Document {
    let mut doc = common::sample_document();
    let chapter = &mut doc.chapters[1];
    chapter.units[1] = ContentUnit::Change(ChangeBlock::new(
        1,
        "Profanity softened",
        "\"Damn it all,\" he shouted at the barkeep.",
        "\"Blast it all,\" he shouted at the barkeep.",
    ));
    chapter.units.push(ContentUnit::Change(ChangeBlock::new(2, "Paragraph removed", "Nobody moved.", "")));
    doc
}

#[test]
fn test_resolveTargets_shouldPreferOverridesThenDocumentThenConfig() {
    let mut config = Config::default();
    config.cleaning.target_sexual = Level::G;

    let mut doc = Document::new();
    doc.settings.insert("target_language".to_string(), SettingValue::Int(4));
    doc.settings.insert("target_violence".to_string(), SettingValue::Str("R".to_string()));

    let controller = Controller::with_config(config).with_target_overrides(vec![(Axis::Violence, Level::G)]);
    let targets = controller.resolve_targets(&doc);

    assert_eq!(targets.language, Level::R);
    assert_eq!(targets.sexual, Level::G);
    assert_eq!(targets.violence, Level::G);
}

#[test]
fn test_review_withIdList_shouldUpdateAndSaveFile() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_document(temp_dir.path(), "book.bookwash", &document_with_changes()).unwrap();
    let controller = Controller::with_config(Config::default());

    let selection: Selection = "2,7".parse().unwrap();
    let summary = controller.review(&path, &selection, ChangeStatus::Accepted).unwrap();

    assert_eq!(summary.succeeded, 1);
    assert!(!summary.has_failures());

    let saved = FileManager::load_document(&path).unwrap();
    let statuses: Vec<(u64, ChangeStatus)> = saved.changes().map(|c| (c.id, c.status)).collect();
    assert_eq!(statuses, vec![(1, ChangeStatus::Pending), (2, ChangeStatus::Accepted)]);
}

#[test]
fn test_review_withMalformedFile_shouldReportFailureAndContinue() {
    let temp_dir = common::create_temp_dir().unwrap();
    common::create_test_document(temp_dir.path(), "a.bookwash", &document_with_changes()).unwrap();
    common::create_test_file(temp_dir.path(), "b.bookwash", "#BOOKWASH 1.0\n\n#CHAPTER: 1\n\n#CHANGE: x\n#END\n").unwrap();
    let controller = Controller::with_config(Config::default());

    let summary = controller.review(temp_dir.path(), &Selection::All, ChangeStatus::Rejected).unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].ends_with("b.bookwash"));

    let saved = FileManager::load_document(temp_dir.path().join("a.bookwash")).unwrap();
    assert!(saved.changes().all(|c| c.status == ChangeStatus::Rejected));
}

#[test]
fn test_export_shouldWriteRequestedView() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut doc = document_with_changes();
    doc.set_all_change_status(ChangeStatus::Accepted);
    let path = common::create_test_document(temp_dir.path(), "book.bookwash", &doc).unwrap();
    let out_dir = temp_dir.path().join("out");
    let controller = Controller::with_config(Config::default());

    controller.export(&path, Some(&out_dir), TextView::Cleaned).unwrap();
    controller.export(&path, Some(&out_dir), TextView::Original).unwrap();

    let cleaned = fs::read_to_string(out_dir.join("book.cleaned.txt")).unwrap();
    assert!(cleaned.starts_with("# Morning\n\nThe sun rose over the valley."));
    assert!(cleaned.contains("Blast it all"));
    assert!(!cleaned.contains("Damn"));
    assert!(!cleaned.contains("Nobody moved."));

    let original = fs::read_to_string(out_dir.join("book.original.txt")).unwrap();
    assert!(original.contains("Damn it all"));
    assert!(original.contains("Nobody moved."));
}

#[test]
fn test_import_shouldCreateDocumentAndRefuseOverwrite() {
    let temp_dir = common::create_temp_dir().unwrap();
    let text = "# One\n\nFirst paragraph.\n\nSecond\nparagraph.\n\n# Two\n\nThird.\n";
    let input = common::create_test_file(temp_dir.path(), "novel.txt", text).unwrap();
    let controller = Controller::with_config(Config::default());

    let output = controller.import(&input, None, false).unwrap();

    assert!(output.ends_with("novel.bookwash"));
    let doc = FileManager::load_document(&output).unwrap();
    assert_eq!(doc.metadata.title.as_deref(), Some("novel"));
    assert_eq!(doc.source.as_deref(), Some("novel.txt"));
    assert_eq!(doc.chapters.len(), 2);
    assert_eq!(doc.chapters[0].title.as_deref(), Some("One"));
    assert_eq!(doc.chapters[0].original_paragraphs(), vec!["First paragraph.", "Second\nparagraph."]);
    assert!(doc.chapters.iter().all(|c| c.rating.is_none()));

    assert!(controller.import(&input, None, false).is_err());
    assert!(controller.import(&input, None, true).is_ok());
}

#[test]
fn test_stats_shouldSummarizeEachDocument() {
    let temp_dir = common::create_temp_dir().unwrap();
    common::create_test_document(temp_dir.path(), "book.bookwash", &document_with_changes()).unwrap();
    let controller = Controller::with_config(Config::default());

    let stats = controller.stats(temp_dir.path()).unwrap();

    assert_eq!(stats.len(), 1);
    let (_, book) = &stats[0];
    assert_eq!(book.chapters, 2);
    assert_eq!(book.rated, 0);
    assert_eq!(book.changes.pending, 2);
}
