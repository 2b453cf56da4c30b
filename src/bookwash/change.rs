/*!
 * Change blocks: one proposed paragraph-level edit with its review status.
 *
 * Wire layout, always in this order:
 *
 * ```text
 * #CHANGE: 12
 * #STATUS: pending
 * #REASON: Strong profanity removed
 * #ORIGINAL
 * ...original lines...
 * #CLEANED
 * ...cleaned lines...
 * #END
 * ```
 */

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use super::lexer::{self, Line, LineEvent, MarkerKind};
use crate::errors::FormatError;

/// Review status of a change block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl ChangeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ChangeStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" | "accept" => Ok(Self::Accepted),
            "rejected" | "reject" => Ok(Self::Rejected),
            _ => Err(anyhow!("Invalid change status: {}", s)),
        }
    }
}

/// One proposed edit.
///
/// `original` is never rewritten once the block exists; only `status` changes
/// during review. An empty `cleaned` text means the paragraph is removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBlock {
    pub id: u64,
    pub status: ChangeStatus,
    pub reason: String,
    pub original: String,
    pub cleaned: String,
}

impl ChangeBlock {
    /// Create a pending change
    pub fn new(id: u64, reason: impl Into<String>, original: impl Into<String>, cleaned: impl Into<String>) -> Self {
        Self {
            id,
            status: ChangeStatus::Pending,
            reason: reason.into(),
            original: original.into(),
            cleaned: cleaned.into(),
        }
    }

    /// Whether the change deletes the paragraph entirely
    pub fn is_removal(&self) -> bool {
        self.cleaned.trim().is_empty()
    }

    /// Serialize into marker and content lines
    pub fn encode(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(8);
        lines.push(format!("#CHANGE: {}", self.id));
        lines.push(format!("#STATUS: {}", self.status));
        // Reasons are single-line by construction of the format
        lines.push(format!("#REASON: {}", single_line(&self.reason)));
        lines.push("#ORIGINAL".to_string());
        push_text_lines(&mut lines, &self.original);
        lines.push("#CLEANED".to_string());
        push_text_lines(&mut lines, &self.cleaned);
        lines.push("#END".to_string());
        lines
    }

    /// Decode a block starting at `lines[cursor]`, which must be a `#CHANGE` marker.
    ///
    /// Returns the block and the index of the first line after `#END`.
    pub fn decode(lines: &[Line<'_>], cursor: usize) -> Result<(Self, usize), FormatError> {
        let open = lines
            .get(cursor)
            .ok_or_else(|| FormatError::block(cursor + 1, "expected #CHANGE, found end of input"))?;

        let id = match &open.event {
            LineEvent::Marker { kind: MarkerKind::Change, value, .. } => value
                .trim()
                .parse::<u64>()
                .map_err(|_| FormatError::block(open.number, format!("invalid change id '{}'", value)))?,
            _ => return Err(FormatError::block(open.number, "expected #CHANGE marker")),
        };

        let mut status = ChangeStatus::Pending;
        let mut reason = String::new();
        let mut section = Section::Meta;
        let mut original: Vec<String> = Vec::new();
        let mut cleaned: Vec<String> = Vec::new();

        let mut index = cursor + 1;
        while let Some(line) = lines.get(index) {
            index += 1;
            match &line.event {
                LineEvent::Marker { kind: MarkerKind::End, .. } => {
                    if section != Section::Cleaned {
                        return Err(FormatError::block(
                            line.number,
                            format!("change {} closed without a #CLEANED section", id),
                        ));
                    }
                    let block = Self {
                        id,
                        status,
                        reason,
                        original: original.join("\n"),
                        cleaned: cleaned.join("\n"),
                    };
                    return Ok((block, index));
                }
                LineEvent::Marker { kind: MarkerKind::Original, .. } => {
                    if section != Section::Meta {
                        return Err(FormatError::block(line.number, "unexpected #ORIGINAL"));
                    }
                    section = Section::Original;
                }
                LineEvent::Marker { kind: MarkerKind::Cleaned, .. } => {
                    if section != Section::Original {
                        return Err(FormatError::block(line.number, "#CLEANED must follow #ORIGINAL"));
                    }
                    section = Section::Cleaned;
                }
                LineEvent::Marker { kind: MarkerKind::Status, value, .. } if section == Section::Meta => {
                    status = value
                        .parse()
                        .map_err(|_| FormatError::block(line.number, format!("invalid status '{}'", value)))?;
                }
                LineEvent::Marker { kind: MarkerKind::Reason, value, .. } if section == Section::Meta => {
                    reason = value.to_string();
                }
                LineEvent::Marker { kind: MarkerKind::Change, .. } => {
                    return Err(FormatError::block(
                        line.number,
                        format!("change {} is missing #END before the next #CHANGE", id),
                    ));
                }
                LineEvent::Marker { kind: MarkerKind::Chapter, .. } => {
                    return Err(FormatError::block(
                        line.number,
                        format!("change {} is missing #END before the next #CHAPTER", id),
                    ));
                }
                LineEvent::Marker { raw, .. } => match section {
                    Section::Meta => warn!("Ignoring unknown marker in change {}: {}", id, raw),
                    // Unescaped marker-like lines inside a section are kept as text
                    Section::Original => original.push(raw.to_string()),
                    Section::Cleaned => cleaned.push(raw.to_string()),
                },
                LineEvent::Blank => match section {
                    Section::Meta => {}
                    Section::Original => original.push(String::new()),
                    Section::Cleaned => cleaned.push(String::new()),
                },
                LineEvent::Text(text) => match section {
                    Section::Meta => {
                        return Err(FormatError::block(
                            line.number,
                            format!("content before #ORIGINAL in change {}", id),
                        ));
                    }
                    Section::Original => original.push(text.to_string()),
                    Section::Cleaned => cleaned.push(text.to_string()),
                },
            }
        }

        Err(FormatError::block(
            open.number,
            format!("change {} has no closing #END", id),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Meta,
    Original,
    Cleaned,
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_text_lines(lines: &mut Vec<String>, text: &str) {
    if text.is_empty() {
        return;
    }
    for line in text.split('\n') {
        lines.push(lexer::escape_line(line).into_owned());
    }
}
