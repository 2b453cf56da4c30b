/*!
 * Paragraph alignment between an original chapter and its revision.
 *
 * Equal paragraph counts are paired by index. Otherwise originals and revised
 * paragraphs are paired greedily by similarity, most similar pair first, as
 * long as the score reaches the acceptance threshold. This is a heuristic and
 * not a minimum-edit alignment.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::reasons;
use super::similarity::{ParagraphMatcher, DEFAULT_CHAR_LEVEL_LIMIT};
use crate::bookwash::{ChangeBlock, ContentUnit};

/// One entry of an alignment, in original reading order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alignment {
    Kept(String),
    Changed { original: String, cleaned: String },
    Removed(String),
}

impl Alignment {
    pub fn is_kept(&self) -> bool {
        matches!(self, Self::Kept(_))
    }
}

/// Tuning for the unequal-length fallback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Minimum similarity for a pairing to be accepted
    pub similarity_threshold: f32,
    /// Originals shorter than this (in characters) get the substring boost
    pub short_paragraph_len: usize,
    /// Paragraph length up to which character-level distance is used
    pub char_level_limit: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            short_paragraph_len: 100,
            char_level_limit: DEFAULT_CHAR_LEVEL_LIMIT,
        }
    }
}

/// Paragraph aligner
#[derive(Debug, Clone)]
pub struct Aligner {
    config: AlignmentConfig,
    matcher: ParagraphMatcher,
}

impl Default for Aligner {
    fn default() -> Self {
        Self::new(AlignmentConfig::default())
    }
}

impl Aligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self {
            matcher: ParagraphMatcher::new(config.char_level_limit),
            config,
        }
    }

    /// Align `originals` with `revised`
    pub fn align(&self, originals: &[String], revised: &[String]) -> Vec<Alignment> {
        if originals.len() == revised.len() {
            return originals
                .iter()
                .zip(revised)
                .map(|(original, cleaned)| pair(original, cleaned))
                .collect();
        }

        debug!(
            "Paragraph count changed ({} -> {}), using similarity matching",
            originals.len(),
            revised.len()
        );

        let assignment = self.greedy_assignment(originals, revised);

        // Revised indices that make up the cleaned text of each original
        let mut pieces: Vec<Vec<usize>> = assignment
            .iter()
            .map(|matched| matched.map(|j| vec![j]).unwrap_or_default())
            .collect();

        for j in 0..revised.len() {
            if assignment.contains(&Some(j)) {
                continue;
            }
            match anchor_for(&assignment, j).or_else(|| first_original(originals)) {
                Some(i) => pieces[i].push(j),
                None => warn!("Dropping revised paragraph {} with no original to attach to", j),
            }
        }

        originals
            .iter()
            .zip(pieces)
            .map(|(original, mut indices)| {
                if indices.is_empty() {
                    return Alignment::Removed(original.clone());
                }
                indices.sort_unstable();
                let cleaned = indices
                    .iter()
                    .map(|j| revised[*j].as_str())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                pair(original, &cleaned)
            })
            .collect()
    }

    /// Similarity of an original/revised pair including the short-paragraph boost
    pub fn score(&self, original: &str, revised: &str) -> f32 {
        let mut score = self.matcher.similarity(original, revised);

        let needle = original.trim().to_lowercase();
        if !needle.is_empty()
            && needle.chars().count() < self.config.short_paragraph_len
            && revised.to_lowercase().contains(&needle)
        {
            score = score.max(self.config.similarity_threshold);
        }
        score
    }

    /// For each original, the index of its matched revised paragraph.
    ///
    /// Candidate pairs at or above the threshold are taken best first; equal
    /// scores go to the lower original index, then the lower revised index.
    fn greedy_assignment(&self, originals: &[String], revised: &[String]) -> Vec<Option<usize>> {
        let mut candidates: Vec<(usize, usize, f32)> = Vec::new();
        for (i, original) in originals.iter().enumerate() {
            for (j, candidate) in revised.iter().enumerate() {
                let score = self.score(original, candidate);
                if score >= self.config.similarity_threshold {
                    candidates.push((i, j, score));
                }
            }
        }
        candidates.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)).then(a.1.cmp(&b.1)));

        let mut assignment = vec![None; originals.len()];
        let mut taken = vec![false; revised.len()];
        for (i, j, _) in candidates {
            if assignment[i].is_none() && !taken[j] {
                assignment[i] = Some(j);
                taken[j] = true;
            }
        }
        assignment
    }
}

fn pair(original: &str, cleaned: &str) -> Alignment {
    if original.trim() == cleaned.trim() {
        Alignment::Kept(original.to_string())
    } else if cleaned.trim().is_empty() {
        Alignment::Removed(original.to_string())
    } else {
        Alignment::Changed {
            original: original.to_string(),
            cleaned: cleaned.to_string(),
        }
    }
}

/// Original paired with the nearest preceding revised paragraph, or the following one
fn anchor_for(assignment: &[Option<usize>], revised_index: usize) -> Option<usize> {
    let paired = || assignment.iter().enumerate().filter_map(|(i, m)| m.map(|j| (i, j)));

    paired()
        .filter(|(_, j)| *j < revised_index)
        .max_by_key(|(_, j)| *j)
        .or_else(|| paired().filter(|(_, j)| *j > revised_index).min_by_key(|(_, j)| *j))
        .map(|(i, _)| i)
}

fn first_original(originals: &[String]) -> Option<usize> {
    (!originals.is_empty()).then_some(0)
}

/// Materialize an alignment as content units, numbering change blocks from `next_id`.
///
/// Returns the units and the next unused id.
pub fn to_content_units(alignment: Vec<Alignment>, mut next_id: u64) -> (Vec<ContentUnit>, u64) {
    let units = alignment
        .into_iter()
        .map(|entry| match entry {
            Alignment::Kept(text) => ContentUnit::Paragraph(text),
            Alignment::Changed { original, cleaned } => {
                let reason = reasons::infer_reason(&original, &cleaned);
                let block = ChangeBlock::new(next_id, reason, original, cleaned);
                next_id += 1;
                ContentUnit::Change(block)
            }
            Alignment::Removed(original) => {
                let reason = reasons::infer_reason(&original, "");
                let block = ChangeBlock::new(next_id, reason, original, "");
                next_id += 1;
                ContentUnit::Change(block)
            }
        })
        .collect();
    (units, next_id)
}
