//! Text extraction from uploaded documents
//!
//! Supports plain text, PDF (lopdf) and Word documents (docx-rs). Extraction
//! is best-effort: a page that fails to decode yields a placeholder line
//! instead of failing the whole document. Extraction never touches
//! conversation state.

use cogni_core::{Error, Result};
use lopdf::Document as PdfDocument;
use mime_guess::mime;
use tracing::{debug, warn};

/// An uploaded file: name plus raw bytes.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    pub file_name: String,
    pub data: Vec<u8>,
}

impl DocumentFile {
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }
}

/// Extract plain text from a document, dispatching on the file kind.
///
/// Unsupported kinds fail with `Error::UnsupportedFileType` and never return
/// partial text.
pub fn extract_text(file: &DocumentFile) -> Result<String> {
    let mime = mime_guess::from_path(&file.file_name).first_or_octet_stream();
    debug!(file_name = %file.file_name, mime = %mime, "extracting text");

    if mime.type_() == mime::TEXT {
        return Ok(extract_plain(&file.data));
    }

    match (mime.type_(), mime.subtype().as_str()) {
        (mime::APPLICATION, "pdf") => extract_pdf(&file.data),
        (mime::APPLICATION, "vnd.openxmlformats-officedocument.wordprocessingml.document") => {
            extract_docx(&file.data)
        }
        _ => Err(Error::UnsupportedFileType(mime.to_string())),
    }
}

fn extract_plain(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// Walk every page in order, concatenating per-page text with newline
/// separators. A page-level decode failure becomes a placeholder line.
fn extract_pdf(data: &[u8]) -> Result<String> {
    let document = PdfDocument::load_mem(data)
        .map_err(|e| Error::Ingestion(format!("failed to parse PDF: {e}")))?;

    let pages = document.get_pages();
    let mut content = String::new();

    for (page_number, _) in pages.iter() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => content.push_str(&text),
            Err(e) => {
                warn!(page = *page_number, %e, "failed to extract page text");
                content.push_str(&format!("[unreadable page {page_number}]"));
            }
        }
        content.push('\n');
    }

    Ok(content)
}

/// Collect run text paragraph by paragraph, one line per paragraph.
fn extract_docx(data: &[u8]) -> Result<String> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let docx = docx_rs::read_docx(data)
        .map_err(|e| Error::Ingestion(format!("failed to parse DOCX: {e}")))?;

    let mut content = String::new();

    for child in docx.document.children {
        let DocumentChild::Paragraph(paragraph) = child else {
            continue;
        };

        let mut line = String::new();
        for paragraph_child in paragraph.children {
            let ParagraphChild::Run(run) = paragraph_child else {
                continue;
            };
            for run_child in run.children {
                if let RunChild::Text(text) = run_child {
                    line.push_str(&text.text);
                }
            }
        }

        if !line.is_empty() {
            content.push_str(&line);
            content.push('\n');
        }
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_extracted() {
        let file = DocumentFile::new("notes.txt", b"Recursion is a function calling itself.".to_vec());
        let text = extract_text(&file).unwrap();
        assert_eq!(text, "Recursion is a function calling itself.");
    }

    #[test]
    fn test_markdown_treated_as_text() {
        let file = DocumentFile::new("notes.md", b"# Heading\nBody".to_vec());
        let text = extract_text(&file).unwrap();
        assert!(text.contains("Heading"));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let file = DocumentFile::new("image.png", vec![0x89, 0x50, 0x4e, 0x47]);
        let err = extract_text(&file).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_corrupt_pdf_is_ingestion_error() {
        let file = DocumentFile::new("broken.pdf", b"not really a pdf".to_vec());
        let err = extract_text(&file).unwrap_err();
        assert!(matches!(err, Error::Ingestion(_)));
    }

    #[test]
    fn test_lossy_decode_of_non_utf8_text() {
        let file = DocumentFile::new("weird.txt", vec![b'h', b'i', 0xff]);
        let text = extract_text(&file).unwrap();
        assert!(text.starts_with("hi"));
    }
}
