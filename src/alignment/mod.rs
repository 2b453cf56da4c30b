/*!
 * Paragraph alignment.
 *
 * Reconciles a chapter's original paragraphs with a rewritten version and
 * turns the result into paragraphs and change blocks.
 */

pub mod aligner;
pub mod reasons;
pub mod similarity;

pub use aligner::{to_content_units, Aligner, Alignment, AlignmentConfig};
pub use similarity::ParagraphMatcher;
