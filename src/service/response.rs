/*!
 * Parsing and cleanup of model output.
 */

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::bookwash::{Axis, Level, Rating};
use crate::errors::ProviderError;

/// Appended to classifier input that was cut to the character budget
pub const TRUNCATION_MARKER: &str = "[... text truncated ...]";

// Axis label at the start of a line, after optional list or emphasis markup
static AXIS_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[\s\-\*#>]*(language|profanity|sexual(?:\s+content)?|violence)\b").unwrap());

// Longest symbols first so that "PG-13" is never read as "PG"
static LEVEL_SYMBOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(PG-13|PG13|NC-17|PG|G|R|X|[1-5])\b").unwrap());

static PREAMBLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(here is|here's|sure|certainly|okay|ok|below is|the revised|revised text)[^\n]*:\s*$").unwrap()
});

/// Parse a classifier response into a rating.
///
/// Every line naming an axis contributes the first level symbol after the
/// label. Axes that never appear stay at `G`. A response that names no axis at
/// all is a parse error, so the client can retry it.
pub fn parse_classification(response: &str) -> Result<Rating, ProviderError> {
    let mut rating = Rating::default();
    let mut recognized = 0;

    for line in response.lines() {
        let Some(label) = AXIS_LABEL.captures(line) else {
            continue;
        };
        let (Some(whole), Some(name)) = (label.get(0), label.get(1)) else {
            continue;
        };
        let Ok(axis) = name.as_str().parse::<Axis>() else {
            continue;
        };

        let rest = &line[whole.end()..];
        let level = LEVEL_SYMBOL
            .find(rest)
            .and_then(|symbol| symbol.as_str().parse::<Level>().ok());

        match level {
            Some(level) => {
                rating.set(axis, level);
                recognized += 1;
            }
            None => debug!("No level found for {} in classifier line: {}", axis.key(), line.trim()),
        }
    }

    if recognized == 0 {
        return Err(ProviderError::ParseError(format!(
            "classifier response has no rating lines: {}",
            response.chars().take(200).collect::<String>()
        )));
    }
    if recognized < Axis::ALL.len() {
        warn!("Classifier rated only {} of 3 axes, defaulting the rest to G", recognized);
    }

    Ok(rating)
}

/// Strip code fences, echoed `<text>` tags and chatty preambles from a revision.
///
/// An empty result is a parse error, so the client retries it.
pub fn clean_revision(response: &str) -> Result<String, ProviderError> {
    let normalized = response.replace("\r\n", "\n");
    let mut text = normalized.trim();

    if text.starts_with("```") {
        text = match text.split_once('\n') {
            Some((_, body)) => body,
            None => "",
        };
        text = text.trim_end();
        text = text.strip_suffix("```").unwrap_or(text).trim();
    }

    if let Some((first, rest)) = text.split_once('\n') {
        if PREAMBLE.is_match(first.trim()) {
            debug!("Dropping revision preamble: {}", first.trim());
            text = rest.trim();
        }
    }

    text = text.strip_prefix("<text>").unwrap_or(text);
    text = text.strip_suffix("</text>").unwrap_or(text);
    let text = text.trim();

    if text.is_empty() {
        return Err(ProviderError::ParseError("rewriter returned an empty revision".to_string()));
    }
    Ok(text.to_string())
}

/// Cut `text` to `budget` characters and append the truncation marker
pub fn truncate_for_classification(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }

    let cut: String = text.chars().take(budget).collect();
    format!("{}\n\n{}", cut.trim_end(), TRUNCATION_MARKER)
}
