/*!
 * In-memory model of a bookwash document.
 *
 * Documents are created by parsing, mutated in place by the pipeline and by
 * review actions, and serialized back with the writer. They carry no identity
 * beyond their text form.
 */

use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use super::change::{ChangeBlock, ChangeStatus};
use super::rating::{Axis, Level, Rating, Targets};

/// Format version written by this crate
pub const FORMAT_VERSION: &str = "1.0";

/// Split plain text into trimmed paragraphs on blank lines
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs
}

/// Value of one `#SETTINGS:` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Int(i64),
    Str(String),
}

impl SettingValue {
    /// Integers when the text parses as one, strings otherwise
    pub fn parse(raw: &str) -> Self {
        raw.parse::<i64>()
            .map(Self::Int)
            .unwrap_or_else(|_| Self::Str(raw.to_string()))
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::Str(value) => write!(f, "{}", value),
        }
    }
}

/// Free-form book metadata from the header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub published: Option<String>,
    pub language: Option<String>,
    pub identifier: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// One unit of chapter content, in reading order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentUnit {
    Paragraph(String),
    Change(ChangeBlock),
}

impl ContentUnit {
    /// Text as it was before any rewriting
    pub fn original_text(&self) -> &str {
        match self {
            Self::Paragraph(text) => text,
            Self::Change(block) => &block.original,
        }
    }
}

/// Which text a change block contributes when rendering a chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextView {
    /// Original text everywhere
    Original,
    /// Accepted changes applied, everything else original
    Cleaned,
    /// Accepted and pending changes applied, rejected ones original
    Proposed,
}

impl TextView {
    fn render<'a>(self, block: &'a ChangeBlock) -> &'a str {
        let use_cleaned = match self {
            Self::Original => false,
            Self::Cleaned => block.status == ChangeStatus::Accepted,
            Self::Proposed => block.status != ChangeStatus::Rejected,
        };
        if use_cleaned { &block.cleaned } else { &block.original }
    }
}

/// A single chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// 1-based ordinal, unique within the document
    pub number: u32,
    pub title: Option<String>,
    pub rating: Option<Rating>,
    /// Tri-state: `None` means not yet decided
    pub needs_cleaning: Option<bool>,
    /// Unknown chapter markers, kept verbatim
    pub extra: Vec<String>,
    pub units: Vec<ContentUnit>,
}

impl Chapter {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            title: None,
            rating: None,
            needs_cleaning: None,
            extra: Vec::new(),
            units: Vec::new(),
        }
    }

    /// Builder-style title setter
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Builder-style paragraph append
    pub fn with_paragraph(mut self, text: impl Into<String>) -> Self {
        self.units.push(ContentUnit::Paragraph(text.into()));
        self
    }

    /// Original paragraphs in reading order
    pub fn original_paragraphs(&self) -> Vec<String> {
        self.units
            .iter()
            .map(|unit| unit.original_text())
            .filter(|text| !text.trim().is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Original text of the whole chapter, paragraphs separated by blank lines
    pub fn original_text(&self) -> String {
        self.original_paragraphs().join("\n\n")
    }

    /// Render the chapter under the given view
    pub fn text(&self, view: TextView) -> String {
        self.units
            .iter()
            .map(|unit| match unit {
                ContentUnit::Paragraph(text) => text.as_str(),
                ContentUnit::Change(block) => view.render(block),
            })
            .filter(|text| !text.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn changes(&self) -> impl Iterator<Item = &ChangeBlock> {
        self.units.iter().filter_map(|unit| match unit {
            ContentUnit::Change(block) => Some(block),
            ContentUnit::Paragraph(_) => None,
        })
    }

    pub fn changes_mut(&mut self) -> impl Iterator<Item = &mut ChangeBlock> {
        self.units.iter_mut().filter_map(|unit| match unit {
            ContentUnit::Change(block) => Some(block),
            ContentUnit::Paragraph(_) => None,
        })
    }

    pub fn display_title(&self) -> String {
        match &self.title {
            Some(title) => format!("Chapter {} ({})", self.number, title),
            None => format!("Chapter {}", self.number),
        }
    }
}

/// Counts of change blocks per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl ChangeCounts {
    pub fn total(&self) -> usize {
        self.pending + self.accepted + self.rejected
    }
}

/// Per-document summary used by the `stats` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentStats {
    pub chapters: usize,
    pub rated: usize,
    pub needs_cleaning: usize,
    pub changes: ChangeCounts,
}

impl fmt::Display for DocumentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chapter(s), {} rated, {} need cleaning, {} change(s): {} pending, {} accepted, {} rejected",
            self.chapters,
            self.rated,
            self.needs_cleaning,
            self.changes.total(),
            self.changes.pending,
            self.changes.accepted,
            self.changes.rejected
        )
    }
}

/// A complete bookwash document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    pub source: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub settings: BTreeMap<String, SettingValue>,
    pub assets: Option<String>,
    pub metadata: BookMetadata,
    /// Unrecognized header lines, kept verbatim
    pub header_extra: Vec<String>,
    pub chapters: Vec<Chapter>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            source: None,
            created: None,
            modified: None,
            settings: BTreeMap::new(),
            assets: None,
            metadata: BookMetadata::default(),
            header_extra: Vec::new(),
            chapters: Vec::new(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target thresholds from settings, falling back to `defaults` per axis
    pub fn targets_or(&self, defaults: Targets) -> Targets {
        let mut targets = defaults;
        for axis in Axis::ALL {
            let Some(value) = self.settings.get(axis.target_key()) else {
                continue;
            };
            let level = match value {
                SettingValue::Int(number) => Level::from_value(*number),
                SettingValue::Str(text) => text.parse::<Level>().ok(),
            };
            match level {
                Some(level) => targets.set(axis, level),
                None => warn!("Ignoring invalid target {}={}", axis.target_key(), value),
            }
        }
        targets
    }

    /// Store target thresholds in settings
    pub fn set_targets(&mut self, targets: &Targets) {
        for axis in Axis::ALL {
            self.settings.insert(
                axis.target_key().to_string(),
                SettingValue::Int(targets.get(axis).value() as i64),
            );
        }
    }

    pub fn chapter(&self, number: u32) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.number == number)
    }

    pub fn chapter_mut(&mut self, number: u32) -> Option<&mut Chapter> {
        self.chapters.iter_mut().find(|c| c.number == number)
    }

    pub fn changes(&self) -> impl Iterator<Item = &ChangeBlock> {
        self.chapters.iter().flat_map(|chapter| chapter.changes())
    }

    /// Next unused change id, one above the highest in the document
    pub fn next_change_id(&self) -> u64 {
        self.changes().map(|block| block.id).max().unwrap_or(0) + 1
    }

    pub fn change_counts(&self) -> ChangeCounts {
        let mut counts = ChangeCounts::default();
        for block in self.changes() {
            match block.status {
                ChangeStatus::Pending => counts.pending += 1,
                ChangeStatus::Accepted => counts.accepted += 1,
                ChangeStatus::Rejected => counts.rejected += 1,
            }
        }
        counts
    }

    pub fn stats(&self) -> DocumentStats {
        DocumentStats {
            chapters: self.chapters.len(),
            rated: self.chapters.iter().filter(|c| c.rating.is_some()).count(),
            needs_cleaning: self.chapters.iter().filter(|c| c.needs_cleaning == Some(true)).count(),
            changes: self.change_counts(),
        }
    }

    /// Set the status of one change block; returns false if the id is unknown
    pub fn set_change_status(&mut self, id: u64, status: ChangeStatus) -> bool {
        for chapter in &mut self.chapters {
            if let Some(block) = chapter.changes_mut().find(|block| block.id == id) {
                block.status = status;
                return true;
            }
        }
        false
    }

    /// Set the status of every change block; returns how many were touched
    pub fn set_all_change_status(&mut self, status: ChangeStatus) -> usize {
        let mut count = 0;
        for chapter in &mut self.chapters {
            for block in chapter.changes_mut() {
                block.status = status;
                count += 1;
            }
        }
        count
    }
}
