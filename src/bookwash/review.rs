/*!
 * Review actions: accept, reject or reset change blocks by id.
 */

use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};

use super::change::ChangeStatus;
use super::model::Document;

/// Which change blocks a review action applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    /// Sorted, non-overlapping, non-adjacent inclusive id ranges
    Ranges(Vec<RangeInclusive<u64>>),
}

impl Selection {
    /// Whether change `id` is selected
    pub fn contains(&self, id: u64) -> bool {
        match self {
            Self::All => true,
            Self::Ranges(ranges) => {
                let index = ranges.partition_point(|range| *range.end() < id);
                ranges.get(index).is_some_and(|range| range.contains(&id))
            }
        }
    }
}

impl FromStr for Selection {
    type Err = anyhow::Error;

    /// Parses `all` or a comma separated list of ids and ranges such as `1,3,5-8`
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }

        let mut ranges = Vec::new();
        for part in trimmed.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part.split_once('-') {
                Some((start, end)) => {
                    let start: u64 = start.trim().parse().with_context(|| format!("Invalid range start in '{}'", part))?;
                    let end: u64 = end.trim().parse().with_context(|| format!("Invalid range end in '{}'", part))?;
                    if start > end {
                        return Err(anyhow!("Range '{}' is reversed", part));
                    }
                    ranges.push(start..=end);
                }
                None => {
                    let id: u64 = part.parse().with_context(|| format!("Invalid change id '{}'", part))?;
                    ranges.push(id..=id);
                }
            }
        }

        if ranges.is_empty() {
            return Err(anyhow!("No change ids given"));
        }
        Ok(Self::Ranges(merge_ranges(ranges)))
    }
}

fn merge_ranges(mut ranges: Vec<RangeInclusive<u64>>) -> Vec<RangeInclusive<u64>> {
    ranges.sort_by_key(|range| *range.start());

    let mut merged: Vec<RangeInclusive<u64>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if *range.start() <= last.end().saturating_add(1) => {
                let end = (*last.end()).max(*range.end());
                *last = *last.start()..=end;
            }
            _ => merged.push(range),
        }
    }
    merged
}

/// Result of applying a review action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub updated: usize,
    /// Selected ids with no change block, as inclusive ranges
    pub unknown: Vec<RangeInclusive<u64>>,
}

/// Set `status` on every selected change block.
///
/// Ids that do not exist in the document are reported back, not treated as errors.
pub fn apply(doc: &mut Document, selection: &Selection, status: ChangeStatus) -> ReviewOutcome {
    let outcome = match selection {
        Selection::All => ReviewOutcome {
            updated: doc.set_all_change_status(status),
            unknown: Vec::new(),
        },
        Selection::Ranges(ranges) => {
            let mut outcome = ReviewOutcome::default();
            let mut found = BTreeSet::new();
            for block in doc.chapters.iter_mut().flat_map(|chapter| chapter.changes_mut()) {
                if selection.contains(block.id) {
                    block.status = status;
                    outcome.updated += 1;
                    found.insert(block.id);
                }
            }
            for range in ranges {
                push_missing(range, &found, &mut outcome.unknown);
            }
            outcome
        }
    };

    if !outcome.unknown.is_empty() {
        warn!("Unknown change ids: {}", describe_ids(&outcome.unknown));
    }
    debug!("Marked {} change(s) as {}", outcome.updated, status);
    outcome
}

/// Gaps of `range` not covered by `found`
fn push_missing(range: &RangeInclusive<u64>, found: &BTreeSet<u64>, out: &mut Vec<RangeInclusive<u64>>) {
    let mut next = *range.start();
    for &id in found.range(range.clone()) {
        if id > next {
            out.push(next..=id - 1);
        }
        match id.checked_add(1) {
            Some(after) => next = after,
            None => return,
        }
    }
    if next <= *range.end() {
        out.push(next..=*range.end());
    }
}

/// Render id ranges the way they are typed, e.g. `4, 9-12`
pub fn describe_ids(ranges: &[RangeInclusive<u64>]) -> String {
    ranges
        .iter()
        .map(|range| {
            if range.start() == range.end() {
                range.start().to_string()
            } else {
                format!("{}-{}", range.start(), range.end())
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookwash::change::ChangeBlock;
    use crate::bookwash::model::{Chapter, ContentUnit};

    fn document_with_changes(ids: &[u64]) -> Document {
        let mut chapter = Chapter::new(1);
        for id in ids {
            chapter.units.push(ContentUnit::Change(ChangeBlock::new(*id, "r", "a", "b")));
        }
        let mut doc = Document::new();
        doc.chapters.push(chapter);
        doc
    }

    #[test]
    fn test_selection_parse_shouldMergeRanges() {
        let selection: Selection = "1, 3,5-7,6-9,10".parse().unwrap();
        assert_eq!(selection, Selection::Ranges(vec![1..=1, 3..=3, 5..=10]));
        assert!(selection.contains(8));
        assert!(!selection.contains(2));
        assert!(!selection.contains(11));
        assert_eq!("ALL".parse::<Selection>().unwrap(), Selection::All);
    }

    #[test]
    fn test_selection_hugeRange_shouldStayCompact() {
        let selection: Selection = "1-99999999999,18446744073709551615".parse().unwrap();
        assert_eq!(
            selection,
            Selection::Ranges(vec![1..=99_999_999_999, u64::MAX..=u64::MAX])
        );
        assert!(selection.contains(99_999_999_999));
        assert!(selection.contains(u64::MAX));
    }

    #[test]
    fn test_apply_hugeRange_shouldUpdateBlocksAndReportGaps() {
        let mut doc = document_with_changes(&[2, 5]);
        let outcome = apply(&mut doc, &"1-99999999999".parse().unwrap(), ChangeStatus::Rejected);

        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.unknown, vec![1..=1, 3..=4, 6..=99_999_999_999]);
        assert_eq!(describe_ids(&outcome.unknown), "1, 3-4, 6-99999999999");
        assert_eq!(doc.change_counts().rejected, 2);
    }

    #[test]
    fn test_selection_parse_shouldRejectGarbage() {
        assert!("".parse::<Selection>().is_err());
        assert!("4-2".parse::<Selection>().is_err());
        assert!("x".parse::<Selection>().is_err());
    }

    #[test]
    fn test_apply_shouldReportUnknownIds() {
        let mut doc = document_with_changes(&[1, 2, 3]);
        let outcome = apply(&mut doc, &"2-4".parse().unwrap(), ChangeStatus::Accepted);

        assert_eq!(outcome.updated, 2);
        assert_eq!(outcome.unknown, vec![4..=4]);
        assert_eq!(doc.change_counts().accepted, 2);
    }

    #[test]
    fn test_apply_all_shouldTouchEveryBlock() {
        let mut doc = document_with_changes(&[1, 2]);
        let outcome = apply(&mut doc, &Selection::All, ChangeStatus::Rejected);

        assert_eq!(outcome.updated, 2);
        assert_eq!(doc.change_counts().rejected, 2);
    }
}
