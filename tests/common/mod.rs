/*!
 * Common test utilities for the bookwash test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use bookwash::bookwash::{Chapter, Document, Level, Rating};

/// Routes `log` output through the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Rating shorthand used throughout the tests
pub fn rating(language: Level, sexual: Level, violence: Level) -> Rating {
    Rating::new(language, sexual, violence)
}

/// A two-chapter document: a clean opening and a chapter with profanity
pub fn sample_document() -> Document {
    let mut doc = Document::new();
    doc.source = Some("sample.txt".to_string());
    doc.metadata.title = Some("The Sample".to_string());
    doc.metadata.author = Some("A. Writer".to_string());
    doc.chapters.push(
        Chapter::new(1)
            .with_title("Morning")
            .with_paragraph("The sun rose over the valley.")
            .with_paragraph("Birds sang in the old oak."),
    );
    doc.chapters.push(
        Chapter::new(2)
            .with_title("Trouble")
            .with_paragraph("He walked into the tavern.")
            .with_paragraph("\"Damn it all,\" he shouted at the barkeep.")
            .with_paragraph("The room went quiet."),
    );
    doc
}

/// Writes `doc` into `dir` and returns its path
pub fn create_test_document(dir: &Path, filename: &str, doc: &Document) -> Result<PathBuf> {
    create_test_file(dir, filename, &doc.to_text())
}

/// A small bookwash file written by hand, exercising escaping and passthrough
pub const HANDWRITTEN_BOOK: &str = "#BOOKWASH 1.0
#SOURCE: handwritten.epub
#SETTINGS: target_language=PG target_violence=3
#TITLE: Hand Made
#X_CUSTOM: keep me

#CHAPTER: 1
#TITLE: First
#RATING: language=R sexual=G violence=PG
#NEEDS_CLEANING: true

\\#CHAPTER: 9 is not a chapter

#CHANGE: 4
#STATUS: accepted
#REASON: Profanity softened
#ORIGINAL
What the hell.
#CLEANED
What the heck.
#END

Last line.
";
