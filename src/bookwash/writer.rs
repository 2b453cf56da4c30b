/*!
 * Bookwash document writer.
 *
 * Output layout:
 *
 * ```text
 * #BOOKWASH 1.0
 * ...header fields, then header passthrough lines...
 *
 * #CHAPTER: 1
 * ...chapter fields, then chapter passthrough lines...
 *
 * paragraph or change block
 *
 * paragraph or change block
 * ```
 *
 * Writing is deterministic apart from the `#MODIFIED` stamp, so parsing the
 * output and writing it again gives the same text.
 */

use chrono::{SecondsFormat, Utc};
use log::warn;

use super::lexer;
use super::model::{Chapter, ContentUnit, Document, SettingValue};

/// Serialize a document, stamping `#MODIFIED` with the current time
pub fn write(doc: &Document) -> String {
    write_with_timestamp(doc, &current_timestamp())
}

/// Serialize a document with an explicit `#MODIFIED` value
pub fn write_with_timestamp(doc: &Document, modified: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    write_header(doc, modified, &mut lines);
    for chapter in &doc.chapters {
        lines.push(String::new());
        write_chapter(chapter, &mut lines);
    }

    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// RFC 3339 timestamp used for `#CREATED` and `#MODIFIED`
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl Document {
    /// Serialize this document to its text form
    pub fn to_text(&self) -> String {
        write(self)
    }
}

fn write_header(doc: &Document, modified: &str, lines: &mut Vec<String>) {
    lines.push(format!("#BOOKWASH {}", doc.version));
    push_field(lines, "SOURCE", doc.source.as_deref());
    push_field(lines, "CREATED", doc.created.as_deref());
    push_field(lines, "MODIFIED", Some(modified));

    if !doc.settings.is_empty() {
        let pairs = doc
            .settings
            .iter()
            .map(|(key, value)| format!("{}={}", key, setting_token(key, value)))
            .collect::<Vec<_>>();
        lines.push(format!("#SETTINGS: {}", pairs.join(" ")));
    }

    push_field(lines, "ASSETS", doc.assets.as_deref());

    let meta = &doc.metadata;
    push_field(lines, "TITLE", meta.title.as_deref());
    push_field(lines, "AUTHOR", meta.author.as_deref());
    push_field(lines, "PUBLISHER", meta.publisher.as_deref());
    push_field(lines, "PUBLISHED", meta.published.as_deref());
    push_field(lines, "LANGUAGE", meta.language.as_deref());
    push_field(lines, "IDENTIFIER", meta.identifier.as_deref());
    push_field(lines, "DESCRIPTION", meta.description.as_deref());
    push_field(lines, "IMAGE", meta.image.as_deref());

    lines.extend(doc.header_extra.iter().cloned());
}

fn write_chapter(chapter: &Chapter, lines: &mut Vec<String>) {
    lines.push(format!("#CHAPTER: {}", chapter.number));
    push_field(lines, "TITLE", chapter.title.as_deref());
    if let Some(rating) = &chapter.rating {
        lines.push(format!("#RATING: {}", rating.to_line()));
    }
    if let Some(flag) = chapter.needs_cleaning {
        lines.push(format!("#NEEDS_CLEANING: {}", flag));
    }
    lines.extend(chapter.extra.iter().cloned());

    for unit in &chapter.units {
        match unit {
            ContentUnit::Paragraph(text) => {
                lines.push(String::new());
                lines.extend(text.split('\n').map(|line| lexer::escape_line(line).into_owned()));
            }
            ContentUnit::Change(block) => {
                lines.push(String::new());
                lines.extend(block.encode());
            }
        }
    }
}

/// Header and chapter fields are single-line by construction
fn push_field(lines: &mut Vec<String>, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        let flattened = value.split_whitespace().collect::<Vec<_>>().join(" ");
        lines.push(format!("#{}: {}", name, flattened).trim_end().to_string());
    }
}

fn setting_token(key: &str, value: &SettingValue) -> String {
    let text = value.to_string();
    if text.split_whitespace().count() > 1 {
        warn!("Setting {} contains whitespace; joining with underscores", key);
        return text.split_whitespace().collect::<Vec<_>>().join("_");
    }
    text
}
