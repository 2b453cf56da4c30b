/*!
 * Tests for the bookwash format as a whole: parsing hand-written files,
 * writer stability and rating comparisons
 */

use bookwash::bookwash::writer::write_with_timestamp;
use bookwash::bookwash::{ChangeStatus, ContentUnit, Document, Level, Rating, SettingValue, Targets, TextView};
use bookwash::errors::FormatError;

use crate::common::{self, HANDWRITTEN_BOOK};

#[test]
fn test_parse_handwrittenBook_shouldReadEveryField() {
    let doc = Document::parse(HANDWRITTEN_BOOK).unwrap();

    assert_eq!(doc.version, "1.0");
    assert_eq!(doc.source.as_deref(), Some("handwritten.epub"));
    assert_eq!(doc.metadata.title.as_deref(), Some("Hand Made"));
    assert_eq!(doc.header_extra, vec!["#X_CUSTOM: keep me".to_string()]);
    assert_eq!(doc.settings.get("target_language"), Some(&SettingValue::Str("PG".to_string())));
    assert_eq!(doc.settings.get("target_violence"), Some(&SettingValue::Int(3)));

    let chapter = &doc.chapters[0];
    assert_eq!(chapter.title.as_deref(), Some("First"));
    assert_eq!(chapter.rating, Some(Rating::new(Level::R, Level::G, Level::PG)));
    assert_eq!(chapter.needs_cleaning, Some(true));
    assert_eq!(chapter.units.len(), 3);
    assert_eq!(chapter.units[0], ContentUnit::Paragraph("#CHAPTER: 9 is not a chapter".to_string()));

    let block = chapter.changes().next().unwrap();
    assert_eq!(block.id, 4);
    assert_eq!(block.status, ChangeStatus::Accepted);
    assert_eq!(block.reason, "Profanity softened");
    assert_eq!(chapter.text(TextView::Cleaned), "#CHAPTER: 9 is not a chapter\n\nWhat the heck.\n\nLast line.");
}

#[test]
fn test_targetsOr_withDocumentSettings_shouldOverrideDefaults() {
    let doc = Document::parse(HANDWRITTEN_BOOK).unwrap();
    let targets = doc.targets_or(Targets::new(Level::G, Level::G, Level::G));

    assert_eq!(targets, Targets::new(Level::PG, Level::G, Level::PG13));
}

#[test]
fn test_writeThenParse_shouldPreserveDocumentExceptTimestamp() {
    let mut doc = Document::parse(HANDWRITTEN_BOOK).unwrap();
    doc.chapters.extend(common::sample_document().chapters.into_iter().map(|mut chapter| {
        chapter.number += 1;
        chapter
    }));

    let text = write_with_timestamp(&doc, "2026-01-01T00:00:00Z");
    let reparsed = Document::parse(&text).unwrap();

    assert_eq!(reparsed.modified.as_deref(), Some("2026-01-01T00:00:00Z"));
    let mut expected = doc.clone();
    expected.modified = reparsed.modified.clone();
    assert_eq!(reparsed, expected);

    // Writing is stable once the timestamp is fixed
    assert_eq!(write_with_timestamp(&reparsed, "2026-01-01T00:00:00Z"), text);
}

#[test]
fn test_parse_withCrlfLineEndings_shouldMatchUnixParse() {
    let crlf = HANDWRITTEN_BOOK.replace('\n', "\r\n");
    assert_eq!(Document::parse(&crlf).unwrap(), Document::parse(HANDWRITTEN_BOOK).unwrap());
}

#[test]
fn test_parse_withUnterminatedChange_shouldReportBlockLine() {
    let text = "#BOOKWASH 1.0\n\n#CHAPTER: 1\n\n#CHANGE: 1\n#ORIGINAL\ntext\n#CLEANED\nother\n";
    match Document::parse(text) {
        Err(FormatError::MalformedBlock { line, .. }) => assert!(line >= 5),
        other => panic!("expected MalformedBlock, got {:?}", other),
    }
}

#[test]
fn test_parse_withDuplicateChapterNumber_shouldFail() {
    let text = "#BOOKWASH 1.0\n\n#CHAPTER: 1\n\nOne.\n\n#CHAPTER: 1\n\nAgain.\n";
    assert!(matches!(Document::parse(text), Err(FormatError::MalformedDocument { .. })));
}

#[test]
fn test_exceeds_shouldBeMonotonicInEachTarget() {
    let rating = Rating::new(Level::PG13, Level::PG, Level::R);
    let mut targets = Targets::new(Level::PG, Level::PG, Level::PG);
    assert!(rating.exceeds(&targets));

    // Raising only the violence target still leaves language over
    targets.violence = Level::R;
    assert!(rating.exceeds(&targets));
    assert_eq!(rating.exceeded_axes(&targets).len(), 1);

    targets.language = Level::PG13;
    assert!(!rating.exceeds(&targets));

    targets = Targets::new(Level::X, Level::X, Level::X);
    assert!(!rating.exceeds(&targets));
}
