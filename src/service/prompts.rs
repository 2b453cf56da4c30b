/*!
 * Prompt templates for the classifier and the rewriter.
 *
 * The classifier is asked for exactly three labelled lines so the response
 * parser can stay line based. The rewriter prompt carries the per-axis targets
 * and one block of instructions per aggression level.
 */

use crate::bookwash::Targets;

use super::Aggression;

/// System prompt for rating a chapter
pub const CLASSIFIER_SYSTEM: &str = r#"You are a content rating assistant for books.

## Your Role
- Rate the text on three independent axes: language, sexual content and violence
- Use the scale G, PG, PG-13, R, X (G is the mildest, X the most explicit)
- Rate what the text contains, not what it implies might happen off the page

## Output Requirements
- Answer with exactly three lines and nothing else:
language: <LEVEL>
sexual: <LEVEL>
violence: <LEVEL>"#;

/// System prompt for rewriting a chapter
pub const REVISER_SYSTEM: &str = r#"You are a careful book editor who adapts text for a stricter content rating.

## Your Role
- Change only what is needed to bring the text within the requested limits
- Keep the plot, the characters, the voice and the tone of the author
- Keep every paragraph that does not need changes exactly as it is

## Output Requirements
- Return ONLY the revised text, with paragraphs separated by a blank line
- Keep the paragraphs in their original order
- Do not add notes, headings, explanations or markdown"#;

/// Instructions added to the rewriter prompt for each aggression level
pub fn aggression_instructions(aggression: Aggression) -> &'static str {
    match aggression {
        Aggression::Light => {
            "Replace offending words and phrases with milder ones. Do not rewrite whole sentences unless a replacement is impossible."
        }
        Aggression::Moderate => {
            "Replace offending words and rewrite offending sentences. Summarise explicit passages in a sentence or two that keeps what matters for the story."
        }
        Aggression::Heavy => {
            "Remove offending passages entirely, or replace them with a short neutral summary. The result must stay within the limits even if whole paragraphs are lost."
        }
    }
}

/// User prompt for rating `text`
pub fn classification_prompt(text: &str) -> String {
    format!(
        "Rate the following text.\n\n<text>\n{}\n</text>\n\nAnswer with the three lines language, sexual and violence.",
        text
    )
}

/// User prompt for rewriting `text` towards `targets`
pub fn revision_prompt(text: &str, targets: &Targets, aggression: Aggression) -> String {
    format!(
        "Revise the following text so that it stays within these limits:\n{}\n\nIntensity {} of 3: {}\n\n<text>\n{}\n</text>",
        targets.describe(),
        aggression,
        aggression_instructions(aggression),
        text
    )
}
