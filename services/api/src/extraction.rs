//! services/api/src/extraction.rs
//!
//! Converts one uploaded file into plain text, chosen by its declared media
//! type (or, when the client sent none, by its file extension).

use std::io::Cursor;

use docx_rust::document::{
    BodyContent, Paragraph, ParagraphContent, Run, RunContent, TableCellContent, TableRowContent,
};
use docx_rust::DocxFile;
use snapstudy_core::domain::{ExtractedText, UploadedFile};
use snapstudy_core::ports::{PortError, PortResult};
use tracing::{info, warn};

pub const TEXT_PLAIN: &str = "text/plain";
pub const PDF: &str = "application/pdf";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const JPEG: &str = "image/jpeg";
pub const PNG: &str = "image/png";

/// Every media type the extractor accepts, in the order reported to clients.
pub const SUPPORTED_MEDIA_TYPES: [&str; 5] = [TEXT_PLAIN, PDF, DOCX, JPEG, PNG];

const POWERPOINT_MEDIA_TYPES: [&str; 2] = [
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
    Image,
}

impl DocumentKind {
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            TEXT_PLAIN => Some(Self::PlainText),
            PDF => Some(Self::Pdf),
            DOCX => Some(Self::Docx),
            JPEG | PNG => Some(Self::Image),
            _ => None,
        }
    }

    fn from_extension(file_name: &str) -> Option<Self> {
        let (_, extension) = file_name.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "txt" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "jpg" | "jpeg" | "png" => Some(Self::Image),
            _ => None,
        }
    }
}

/// A short explanation for media types that are recognised but refused.
pub fn unsupported_note(media_type: &str) -> Option<&'static str> {
    POWERPOINT_MEDIA_TYPES
        .contains(&media_type)
        .then_some("PowerPoint files are not currently supported.")
}

/// The media type without parameters, lowercased: `Text/Plain; charset=utf-8` → `text/plain`.
fn essence(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn unsupported(media_type: String) -> PortError {
    PortError::UnsupportedMediaType {
        media_type,
        supported: SUPPORTED_MEDIA_TYPES.iter().map(|s| s.to_string()).collect(),
    }
}

pub fn resolve_kind(file: &UploadedFile) -> PortResult<DocumentKind> {
    let declared = file
        .media_type
        .as_deref()
        .map(essence)
        .filter(|m| !m.is_empty() && m != OCTET_STREAM);

    match declared {
        Some(media_type) => {
            DocumentKind::from_media_type(&media_type).ok_or_else(|| unsupported(media_type))
        }
        None => DocumentKind::from_extension(&file.file_name)
            .ok_or_else(|| unsupported(OCTET_STREAM.to_string())),
    }
}

//=========================================================================================
// Extraction
//=========================================================================================

/// Extracts the text of `file` synchronously.
///
/// Whitespace-only output is an `ExtractionFailed`; a library failure to read
/// the document at all is `Unexpected`.
pub fn extract_text(file: &UploadedFile) -> PortResult<ExtractedText> {
    let kind = resolve_kind(file)?;
    info!(
        "Extracting text from '{}' ({:?}, {} bytes).",
        file.file_name,
        kind,
        file.bytes.len()
    );

    let text = match kind {
        DocumentKind::PlainText => String::from_utf8_lossy(&file.bytes)
            .trim_start_matches('\u{feff}')
            .to_string(),
        DocumentKind::Pdf => pdf_extract::extract_text_from_mem(&file.bytes)
            .map_err(|e| PortError::Unexpected(format!("Failed to read PDF: {}", e)))?,
        DocumentKind::Docx => docx_text(&file.bytes)?,
        // TODO: run OCR over images once an OCR engine is wired in.
        DocumentKind::Image => image_placeholder(&file.file_name),
    };

    if text.trim().is_empty() {
        warn!("No text could be extracted from '{}'.", file.file_name);
        return Err(PortError::ExtractionFailed(file.file_name.clone()));
    }

    Ok(ExtractedText::from_file(text, &file.file_name))
}

/// Runs `extract_text` on the blocking pool; PDF parsing is CPU-bound.
pub async fn extract(file: UploadedFile) -> PortResult<ExtractedText> {
    tokio::task::spawn_blocking(move || extract_text(&file))
        .await
        .map_err(|e| PortError::Unexpected(format!("Extraction task failed: {}", e)))?
}

pub fn image_placeholder(file_name: &str) -> String {
    format!(
        "Image file: {}. This is a placeholder for image content.",
        file_name
    )
}

fn docx_text(bytes: &[u8]) -> PortResult<String> {
    let file = DocxFile::from_reader(Cursor::new(bytes))
        .map_err(|e| PortError::Unexpected(format!("Failed to open DOCX: {}", e)))?;
    let docx = file
        .parse()
        .map_err(|e| PortError::Unexpected(format!("Failed to parse DOCX content: {}", e)))?;

    let mut lines = Vec::new();
    for content in &docx.document.body.content {
        collect_body_text(content, &mut lines);
    }
    Ok(lines.join("\n"))
}

fn collect_body_text(content: &BodyContent, lines: &mut Vec<String>) {
    match content {
        BodyContent::Paragraph(para) => lines.push(paragraph_text(para)),
        BodyContent::Table(table) => {
            for row in &table.rows {
                for cell_content in &row.cells {
                    if let TableRowContent::TableCell(cell) = cell_content {
                        for tc in &cell.content {
                            let TableCellContent::Paragraph(para) = tc;
                            lines.push(paragraph_text(para));
                        }
                    }
                }
            }
        }
        BodyContent::Sdt(sdt) => {
            if let Some(ref sdt_content) = sdt.content {
                for item in &sdt_content.content {
                    collect_body_text(item, lines);
                }
            }
        }
        _ => {}
    }
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    for pc in &para.content {
        match pc {
            ParagraphContent::Run(run) => push_run_text(run, &mut text),
            ParagraphContent::Link(link) => {
                if let Some(run) = &link.content {
                    push_run_text(run, &mut text);
                }
            }
            _ => {}
        }
    }
    text
}

fn push_run_text(run: &Run, text: &mut String) {
    for rc in &run.content {
        match rc {
            RunContent::Text(t) => text.push_str(&t.text),
            RunContent::Break(_) => text.push('\n'),
            RunContent::Tab(_) => text.push('\t'),
            _ => {}
        }
    }
}
