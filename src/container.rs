/*!
 * Bridge between bookwash documents and packaged book formats.
 *
 * A container codec only deals in chapters of plain text. Converting those to
 * and from a `Document` happens here, so every codec shares one paragraph
 * splitting rule and one document layout.
 */

use anyhow::{Context, Result};
use bytes::Bytes;

use crate::bookwash::writer::current_timestamp;
use crate::bookwash::{split_paragraphs, BookMetadata, Chapter, Document, TextView};

/// One chapter as a container sees it
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerChapter {
    pub title: Option<String>,
    /// Plain text, paragraphs separated by blank lines
    pub text: String,
}

/// Reads and writes a distributable book format
pub trait ContainerCodec {
    /// Short format name for logs
    fn name(&self) -> &str;

    fn unpack(&self, bytes: &[u8]) -> Result<Vec<ContainerChapter>>;

    fn pack(&self, chapters: &[ContainerChapter]) -> Result<Bytes>;
}

impl Document {
    /// Build a fresh document from unpacked chapters, numbered from 1
    pub fn from_container_chapters(metadata: BookMetadata, source: Option<String>, chapters: Vec<ContainerChapter>) -> Self {
        let mut doc = Document::new();
        doc.source = source;
        doc.created = Some(current_timestamp());
        doc.metadata = metadata;

        for (index, container_chapter) in chapters.into_iter().enumerate() {
            let mut chapter = Chapter::new(index as u32 + 1);
            chapter.title = container_chapter.title.filter(|title| !title.trim().is_empty());
            for paragraph in split_paragraphs(&container_chapter.text) {
                chapter = chapter.with_paragraph(paragraph);
            }
            doc.chapters.push(chapter);
        }
        doc
    }

    /// Render every chapter under `view` for packing
    pub fn to_container_chapters(&self, view: TextView) -> Vec<ContainerChapter> {
        self.chapters
            .iter()
            .map(|chapter| ContainerChapter {
                title: chapter.title.clone(),
                text: chapter.text(view),
            })
            .collect()
    }
}

/// Plain UTF-8 text with `# ` headings opening each chapter.
///
/// Used by `export` and `import`. Text before the first heading becomes an
/// untitled chapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextCodec;

const HEADING_PREFIX: &str = "# ";

impl ContainerCodec for PlainTextCodec {
    fn name(&self) -> &str {
        "plain text"
    }

    fn unpack(&self, bytes: &[u8]) -> Result<Vec<ContainerChapter>> {
        let text = std::str::from_utf8(bytes).context("Plain text input is not valid UTF-8")?;
        let mut chapters: Vec<ContainerChapter> = Vec::new();
        let mut current: Option<ContainerChapter> = None;
        let mut lines: Vec<&str> = Vec::new();

        for line in text.lines() {
            if let Some(title) = line.strip_prefix(HEADING_PREFIX) {
                if let Some(mut chapter) = current.take() {
                    chapter.text = lines.join("\n").trim().to_string();
                    chapters.push(chapter);
                } else if !lines.join("").trim().is_empty() {
                    chapters.push(ContainerChapter {
                        title: None,
                        text: lines.join("\n").trim().to_string(),
                    });
                }
                lines.clear();
                current = Some(ContainerChapter {
                    title: Some(title.trim().to_string()),
                    text: String::new(),
                });
            } else {
                lines.push(line);
            }
        }

        let rest = lines.join("\n").trim().to_string();
        match current {
            Some(mut chapter) => {
                chapter.text = rest;
                chapters.push(chapter);
            }
            None if !rest.is_empty() => chapters.push(ContainerChapter { title: None, text: rest }),
            None => {}
        }

        Ok(chapters)
    }

    fn pack(&self, chapters: &[ContainerChapter]) -> Result<Bytes> {
        let mut output = String::new();
        for (index, chapter) in chapters.iter().enumerate() {
            let heading = match &chapter.title {
                Some(title) => title.clone(),
                None => format!("Chapter {}", index + 1),
            };
            output.push_str(HEADING_PREFIX);
            output.push_str(&heading);
            output.push_str("\n\n");
            if !chapter.text.is_empty() {
                output.push_str(&chapter.text);
                output.push_str("\n\n");
            }
        }

        let trimmed = output.trim_end().to_string();
        Ok(Bytes::from(if trimmed.is_empty() { trimmed } else { trimmed + "\n" }))
    }
}
