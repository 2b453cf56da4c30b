/*!
 * Line classifier for the bookwash format.
 *
 * Every physical line becomes one `LineEvent`: a structural marker, a blank
 * line or a content line. Content lines are unescaped here, so the parser
 * never sees escape characters and never has to slice marker text itself.
 */

use std::borrow::Cow;

/// Prefix of every structural line
pub const MARKER_PREFIX: char = '#';

/// Prefix added to content lines that would otherwise be read as structure
pub const ESCAPE_CHAR: char = '\\';

/// Known structural markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Bookwash,
    Source,
    Created,
    Modified,
    Settings,
    Assets,
    Author,
    Publisher,
    Published,
    Language,
    Identifier,
    Description,
    Image,
    Chapter,
    Title,
    Rating,
    NeedsCleaning,
    Change,
    Status,
    Reason,
    Original,
    Cleaned,
    End,
    /// Well-formed marker with a name this version does not know
    Unknown,
}

impl MarkerKind {
    fn from_name(name: &str) -> Self {
        match name {
            "BOOKWASH" => Self::Bookwash,
            "SOURCE" => Self::Source,
            "CREATED" => Self::Created,
            "MODIFIED" => Self::Modified,
            "SETTINGS" => Self::Settings,
            "ASSETS" => Self::Assets,
            "AUTHOR" => Self::Author,
            "PUBLISHER" => Self::Publisher,
            "PUBLISHED" => Self::Published,
            "LANGUAGE" => Self::Language,
            "IDENTIFIER" => Self::Identifier,
            "DESCRIPTION" => Self::Description,
            "IMAGE" => Self::Image,
            "CHAPTER" => Self::Chapter,
            "TITLE" => Self::Title,
            "RATING" => Self::Rating,
            "NEEDS_CLEANING" => Self::NeedsCleaning,
            "CHANGE" => Self::Change,
            "STATUS" => Self::Status,
            "REASON" => Self::Reason,
            "ORIGINAL" => Self::Original,
            "CLEANED" => Self::Cleaned,
            "END" => Self::End,
            _ => Self::Unknown,
        }
    }

    /// Markers that only have meaning inside a change block
    pub fn is_block_marker(self) -> bool {
        matches!(
            self,
            Self::Status | Self::Reason | Self::Original | Self::Cleaned | Self::End
        )
    }
}

/// One classified line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent<'a> {
    /// Structural line such as `#CHAPTER: 3` or `#END`
    Marker {
        kind: MarkerKind,
        name: &'a str,
        value: &'a str,
        raw: &'a str,
    },
    /// Empty or whitespace-only line
    Blank,
    /// Content, already unescaped
    Text(Cow<'a, str>),
}

/// A classified line with its 1-based line number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    /// The line as written, minus its terminator
    pub raw: &'a str,
    pub event: LineEvent<'a>,
}

/// Classify a single line (without its line terminator)
pub fn classify(line: &str) -> LineEvent<'_> {
    if line.trim().is_empty() {
        return LineEvent::Blank;
    }
    if let Some(rest) = line.strip_prefix(ESCAPE_CHAR) {
        return LineEvent::Text(Cow::Borrowed(rest));
    }
    if let Some((name, value)) = split_marker(line) {
        return LineEvent::Marker {
            kind: MarkerKind::from_name(name),
            name,
            value,
            raw: line,
        };
    }
    LineEvent::Text(Cow::Borrowed(line))
}

/// Split `#NAME`, `#NAME: value` or `#NAME value` into name and value
fn split_marker(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix(MARKER_PREFIX)?;
    let name_len = body
        .char_indices()
        .find(|(i, c)| {
            let valid = if *i == 0 {
                c.is_ascii_uppercase()
            } else {
                c.is_ascii_uppercase() || c.is_ascii_digit() || *c == '_'
            };
            !valid
        })
        .map(|(i, _)| i)
        .unwrap_or(body.len());

    if name_len == 0 {
        return None;
    }

    let (name, rest) = body.split_at(name_len);
    if rest.is_empty() {
        return Some((name, ""));
    }
    if let Some(value) = rest.strip_prefix(':') {
        return Some((name, value.strip_prefix(' ').unwrap_or(value).trim_end()));
    }
    if let Some(value) = rest.strip_prefix(' ') {
        return Some((name, value.trim_end()));
    }
    None
}

/// Classify every line of a document
pub fn tokenize(content: &str) -> Vec<Line<'_>> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .enumerate()
        .map(|(i, line)| Line {
            number: i + 1,
            raw: line,
            event: classify(line),
        })
        .collect()
}

/// Escape a content line so it is never read back as structure.
///
/// Empty and whitespace-only lines are escaped as well. A bare blank line
/// separates paragraphs, so an empty line inside a paragraph is written as a
/// lone escape character.
pub fn escape_line(line: &str) -> Cow<'_, str> {
    let blank = line.trim().is_empty();
    if line.starts_with(MARKER_PREFIX) || line.starts_with(ESCAPE_CHAR) || blank {
        Cow::Owned(format!("{}{}", ESCAPE_CHAR, line))
    } else {
        Cow::Borrowed(line)
    }
}
