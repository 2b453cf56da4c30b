/*!
 * Heuristic reason labels for change blocks.
 *
 * Three keyword tiers are checked in order. The first tier with a word that
 * appears in the original but no longer in the revision names the change.
 * The labels are for reviewers only and never drive control flow.
 */

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

pub const REASON_STRONG_PROFANITY: &str = "Strong profanity removed";
pub const REASON_MILD_PROFANITY: &str = "Profanity softened";
pub const REASON_MATURE_CONTENT: &str = "Sexual or violent content toned down";
pub const REASON_ADJUSTED: &str = "Content adjusted";
pub const REASON_REMOVED: &str = "Paragraph removed";

static STRONG_PROFANITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(fuck\w*|motherfuck\w*|shit\w*|bullshit|cunt\w*|cock\w*|dick\w*|prick|twat|wank\w*)\b").unwrap()
});

static MILD_PROFANITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(damn\w*|goddamn\w*|hell|bitch\w*|bastard\w*|ass|asshole\w*|crap\w*|piss\w*|bloody)\b").unwrap()
});

static MATURE_THEMES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(naked|nude|breasts?|nipples?|thrust\w*|moan\w*|aroused|orgasm\w*|erection|sex|sexual\w*|lust\w*|blood\w*|gore|corpses?|stab\w*|slaughter\w*|mutilat\w*|tortur\w*|dismember\w*|entrails|decapitat\w*)\b",
    )
    .unwrap()
});

/// Label a change from `original` to `cleaned` (empty when removed)
pub fn infer_reason(original: &str, cleaned: &str) -> &'static str {
    let tiers: [(&Regex, &'static str); 3] = [
        (&STRONG_PROFANITY, REASON_STRONG_PROFANITY),
        (&MILD_PROFANITY, REASON_MILD_PROFANITY),
        (&MATURE_THEMES, REASON_MATURE_CONTENT),
    ];

    for (pattern, label) in tiers {
        let before = matched_words(pattern, original);
        if before.is_empty() {
            continue;
        }
        let after = matched_words(pattern, cleaned);
        if before.difference(&after).next().is_some() {
            return label;
        }
    }

    if cleaned.trim().is_empty() {
        REASON_REMOVED
    } else {
        REASON_ADJUSTED
    }
}

fn matched_words(pattern: &Regex, text: &str) -> HashSet<String> {
    pattern
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
