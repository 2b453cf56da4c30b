/*!
 * Bookwash document parser.
 *
 * A small builder over the typed line stream from the lexer. The header is
 * read until the first `#CHAPTER` marker; after that every line belongs to a
 * chapter, and `#CHANGE` markers hand control to the change-block decoder.
 */

use log::{debug, warn};

use super::change::ChangeBlock;
use super::lexer::{self, Line, LineEvent, MarkerKind};
use super::model::{Chapter, ContentUnit, Document, SettingValue};
use super::rating::Rating;
use crate::errors::FormatError;

/// Parse a complete document
pub fn parse(content: &str) -> Result<Document, FormatError> {
    let lines = lexer::tokenize(content);
    let mut builder = DocumentBuilder::default();

    let mut index = 0;
    while let Some(line) = lines.get(index) {
        if let LineEvent::Marker { kind: MarkerKind::Change, .. } = line.event {
            if builder.chapter.is_none() {
                return Err(FormatError::document(line.number, "change block before the first #CHAPTER"));
            }
            builder.flush_paragraph();
            let (block, next) = ChangeBlock::decode(&lines, index)?;
            builder.push_unit(ContentUnit::Change(block));
            index = next;
            continue;
        }

        builder.feed(line)?;
        index += 1;
    }

    builder.finish()
}

impl Document {
    /// Parse a document from its text form
    pub fn parse(content: &str) -> Result<Self, FormatError> {
        parse(content)
    }
}

#[derive(Default)]
struct DocumentBuilder {
    document: Document,
    chapter: Option<Chapter>,
    paragraph: Vec<String>,
}

impl DocumentBuilder {
    fn feed(&mut self, line: &Line<'_>) -> Result<(), FormatError> {
        if self.chapter.is_none() {
            return self.feed_header(line);
        }
        self.feed_chapter(line)
    }

    fn feed_header(&mut self, line: &Line<'_>) -> Result<(), FormatError> {
        let (kind, value) = match &line.event {
            LineEvent::Blank => return Ok(()),
            LineEvent::Text(_) => {
                self.document.header_extra.push(line.raw.to_string());
                return Ok(());
            }
            LineEvent::Marker { kind, value, .. } => (*kind, value.to_string()),
        };

        let doc = &mut self.document;
        match kind {
            MarkerKind::Bookwash => doc.version = value,
            MarkerKind::Source => doc.source = Some(value),
            MarkerKind::Created => doc.created = Some(value),
            MarkerKind::Modified => doc.modified = Some(value),
            MarkerKind::Settings => parse_settings(&value, doc),
            MarkerKind::Assets => doc.assets = Some(value),
            MarkerKind::Title => doc.metadata.title = Some(value),
            MarkerKind::Author => doc.metadata.author = Some(value),
            MarkerKind::Publisher => doc.metadata.publisher = Some(value),
            MarkerKind::Published => doc.metadata.published = Some(value),
            MarkerKind::Language => doc.metadata.language = Some(value),
            MarkerKind::Identifier => doc.metadata.identifier = Some(value),
            MarkerKind::Description => doc.metadata.description = Some(value),
            MarkerKind::Image => doc.metadata.image = Some(value),
            MarkerKind::Chapter => self.open_chapter(line.number, &value)?,
            _ => doc.header_extra.push(line.raw.to_string()),
        }
        Ok(())
    }

    fn feed_chapter(&mut self, line: &Line<'_>) -> Result<(), FormatError> {
        match &line.event {
            LineEvent::Blank => self.flush_paragraph(),
            LineEvent::Text(text) => self.paragraph.push(text.to_string()),
            LineEvent::Marker { kind: MarkerKind::Chapter, value, .. } => {
                self.close_chapter();
                self.open_chapter(line.number, value)?;
            }
            LineEvent::Marker { kind, name, .. } if kind.is_block_marker() => {
                return Err(FormatError::block(line.number, format!("#{} outside a change block", name)));
            }
            LineEvent::Marker { kind, value, raw, .. } => {
                self.flush_paragraph();
                let Some(chapter) = self.chapter.as_mut() else {
                    return Ok(());
                };
                match kind {
                    MarkerKind::Title => chapter.title = Some(value.to_string()),
                    MarkerKind::Rating => {
                        chapter.rating = Rating::parse_line(value);
                        if chapter.rating.is_none() {
                            warn!("Chapter {}: unusable rating '{}', leaving unrated", chapter.number, value);
                        }
                    }
                    MarkerKind::NeedsCleaning => {
                        chapter.needs_cleaning = parse_flag(value);
                        if chapter.needs_cleaning.is_none() {
                            warn!("Chapter {}: invalid cleaning flag '{}'", chapter.number, value);
                        }
                    }
                    _ => chapter.extra.push(raw.to_string()),
                }
            }
        }
        Ok(())
    }

    fn open_chapter(&mut self, line_number: usize, value: &str) -> Result<(), FormatError> {
        let number = value.trim().parse::<u32>().map_err(|_| {
            FormatError::document(line_number, format!("chapter number '{}' is not an integer", value))
        })?;
        if self.document.chapter(number).is_some() {
            return Err(FormatError::document(line_number, format!("duplicate chapter number {}", number)));
        }
        self.chapter = Some(Chapter::new(number));
        Ok(())
    }

    fn close_chapter(&mut self) {
        self.flush_paragraph();
        if let Some(chapter) = self.chapter.take() {
            debug!("Parsed chapter {} with {} units", chapter.number, chapter.units.len());
            self.document.chapters.push(chapter);
        }
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.paragraph).join("\n");
        self.push_unit(ContentUnit::Paragraph(text));
    }

    fn push_unit(&mut self, unit: ContentUnit) {
        if let Some(chapter) = self.chapter.as_mut() {
            chapter.units.push(unit);
        }
    }

    fn finish(mut self) -> Result<Document, FormatError> {
        self.close_chapter();
        Ok(self.document)
    }
}

fn parse_settings(value: &str, doc: &mut Document) {
    for pair in value.split_whitespace() {
        match pair.split_once('=') {
            Some((key, raw)) if !key.is_empty() => {
                doc.settings.insert(key.to_string(), SettingValue::parse(raw));
            }
            _ => warn!("Ignoring setting without key=value form: {}", pair),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" => Some(true),
        "false" | "no" => Some(false),
        _ => None,
    }
}
