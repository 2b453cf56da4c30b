/*!
 * The bookwash text format.
 *
 * A line-oriented markup holding book metadata, chapters, content ratings and
 * reviewable change blocks. This module owns the one parser and the one writer
 * used by every other part of the crate.
 *
 * - `lexer`: classifies lines into typed events and handles escaping
 * - `rating`: rating levels, axes and target thresholds
 * - `change`: change-block encoding and decoding
 * - `model`: the in-memory document tree and its text views
 * - `parser` / `writer`: full document conversion
 * - `review`: status updates on change blocks
 */

pub mod change;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod rating;
pub mod review;
pub mod writer;

pub use change::{ChangeBlock, ChangeStatus};
pub use model::{
    split_paragraphs, BookMetadata, Chapter, ChangeCounts, ContentUnit, Document, DocumentStats, SettingValue, TextView,
};
pub use rating::{Axis, Level, Rating, Targets};
pub use review::{ReviewOutcome, Selection};

/// File extension of bookwash documents
pub const FILE_EXTENSION: &str = "bookwash";
