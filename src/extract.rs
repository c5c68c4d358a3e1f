//! Text extraction from uploaded file formats.
//!
//! Turns a stored file's raw bytes plus its declared extension into one logical
//! text document. Three formats are supported: PDF (per-page text joined with
//! newlines), DOCX (per-paragraph text joined with newlines), and plain UTF-8
//! text. Anything else is rejected up front so the document is dropped rather
//! than retried.

use quick_xml::Reader;
use quick_xml::events::Event;
use std::io::Read;
use thiserror::Error;

/// Errors raised while extracting text from a file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The declared extension is not one of the supported set.
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    /// Plain-text bytes were not valid UTF-8.
    #[error("file is not valid UTF-8: {0}")]
    Decoding(#[from] std::string::FromUtf8Error),
    /// The PDF could not be loaded.
    #[error("failed to read PDF: {0}")]
    Pdf(#[from] lopdf::Error),
    /// The DOCX container was not a readable ZIP archive.
    #[error("failed to open DOCX archive: {0}")]
    DocxArchive(#[from] zip::result::ZipError),
    /// The DOCX document body could not be read from the archive.
    #[error("failed to read DOCX contents: {0}")]
    DocxRead(#[from] std::io::Error),
    /// The DOCX document XML was malformed.
    #[error("failed to parse DOCX document XML: {0}")]
    DocxXml(#[from] quick_xml::Error),
}

/// Supported upload formats, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Docx,
    Text,
}

impl FileKind {
    fn from_extension(extension: &str) -> Result<Self, ExtractError> {
        match extension.to_lowercase().as_str() {
            ".pdf" => Ok(Self::Pdf),
            ".docx" => Ok(Self::Docx),
            ".txt" => Ok(Self::Text),
            other => Err(ExtractError::UnsupportedFileType(other.to_string())),
        }
    }
}

/// Extract a single logical text document from `bytes`.
///
/// `extension` is the declared file extension including the leading dot
/// (case-insensitive). Empty input yields an empty string for any supported
/// extension.
pub fn extract(bytes: &[u8], extension: &str) -> Result<String, ExtractError> {
    let kind = FileKind::from_extension(extension)?;
    if bytes.is_empty() {
        return Ok(String::new());
    }
    match kind {
        FileKind::Pdf => extract_pdf(bytes),
        FileKind::Docx => extract_docx(bytes),
        FileKind::Text => Ok(String::from_utf8(bytes.to_vec())?),
    }
}

/// Per-page text in page order, joined with newlines. A page that fails to
/// yield text contributes an empty string instead of aborting the document.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let document = lopdf::Document::load_mem(bytes)?;
    let mut pages = Vec::new();

    for (&number, _) in &document.get_pages() {
        match document.extract_text(&[number]) {
            Ok(text) => pages.push(text),
            Err(error) => {
                tracing::warn!(page = number, error = %error, "PDF page yielded no text");
                pages.push(String::new());
            }
        }
    }

    Ok(pages.join("\n"))
}

/// Per-paragraph text in document order, joined with newlines.
///
/// A DOCX file is a ZIP archive whose body lives in `word/document.xml`;
/// paragraphs are `<w:p>` elements and their text runs are `<w:t>` elements.
fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")?
        .read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) if element.local_name().as_ref() == b"t" => {
                in_text_run = true;
            }
            Event::Text(element) if in_text_run => {
                if let Ok(text) = element.unescape() {
                    current.push_str(&text);
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"t" => in_text_run = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            // Self-closing <w:p/> is a blank paragraph; it still separates its
            // neighbors with a newline.
            Event::Empty(element) if element.local_name().as_ref() == b"p" => {
                paragraphs.push(String::new());
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs.join("\n"))
}
