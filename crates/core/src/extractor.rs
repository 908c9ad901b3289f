use crate::chunking::char_len;
use crate::error::ExtractionError;
use crate::models::{DocumentFormat, ExtractedDocument, ExtractionWarning};
use lopdf::{Dictionary, Document, Object};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Pages past this limit are not read; a warning is returned instead.
pub const MAX_PDF_PAGES: usize = 200;

/// Titles taken from document text must be shorter than this many characters.
pub const MAX_TITLE_CHARS: usize = 100;

pub fn extract_document(path: &Path) -> Result<ExtractedDocument, ExtractionError> {
    let metadata = fs::metadata(path).map_err(|error| ExtractionError::from_io(path, error))?;

    if !metadata.is_file() {
        return Err(ExtractionError::NotAFile(path.to_path_buf()));
    }

    let format = detect_format(path)?;

    if metadata.len() == 0 {
        return Err(ExtractionError::EmptyContent(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|error| ExtractionError::from_io(path, error))?;
    let stem = file_stem(path);

    let extracted = match format {
        DocumentFormat::Pdf => extract_pdf(&bytes, stem)?,
        DocumentFormat::Docx => extract_docx(&bytes, stem)?,
        DocumentFormat::Text => extract_plain_text(path, bytes, stem)?,
    };

    if extracted.text.trim().is_empty() {
        return Err(ExtractionError::EmptyContent(path.to_path_buf()));
    }

    for warning in &extracted.warnings {
        warn!(path = %path.display(), %warning, "extraction warning");
    }
    info!(
        path = %path.display(),
        format = ?extracted.format,
        characters = char_len(&extracted.text),
        title = %extracted.title,
        "text extracted"
    );

    Ok(extracted)
}

pub fn detect_format(path: &Path) -> Result<DocumentFormat, ExtractionError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();

    DocumentFormat::from_extension(extension).ok_or_else(|| ExtractionError::UnsupportedFormat {
        extension: extension.to_string(),
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Returns `candidate` trimmed when it is non-empty and short enough to be a title.
fn short_title(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() || char_len(trimmed) >= MAX_TITLE_CHARS {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn extract_pdf(bytes: &[u8], stem: String) -> Result<ExtractedDocument, ExtractionError> {
    let document =
        Document::load_mem(bytes).map_err(|error| ExtractionError::Pdf(error.to_string()))?;

    let title = pdf_metadata_title(&document).unwrap_or(stem);

    let pages = document.get_pages();
    let total_pages = pages.len();
    let processed = total_pages.min(MAX_PDF_PAGES);

    let mut warnings = Vec::new();
    if total_pages > MAX_PDF_PAGES {
        warnings.push(ExtractionWarning::PageLimitReached {
            total_pages,
            processed_pages: processed,
        });
    }

    let text = collect_page_text(
        pages.keys().copied().take(processed),
        |page_number| document.extract_text(&[page_number]),
        &mut warnings,
    );

    Ok(ExtractedDocument {
        text,
        title,
        format: DocumentFormat::Pdf,
        warnings,
    })
}

/// Joins the text of each page in order. A page that fails is recorded as a
/// warning and the remaining pages are still read.
fn collect_page_text<E, F>(
    page_numbers: impl IntoIterator<Item = u32>,
    mut extract_page: F,
    warnings: &mut Vec<ExtractionWarning>,
) -> String
where
    E: fmt::Display,
    F: FnMut(u32) -> Result<String, E>,
{
    let mut text = String::new();
    for page in page_numbers {
        match extract_page(page) {
            Ok(page_text) if !page_text.is_empty() => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Ok(_) => {}
            Err(error) => warnings.push(ExtractionWarning::PageFailed {
                page,
                reason: error.to_string(),
            }),
        }
    }
    text
}

/// `Title` entry of the trailer's Info dictionary, if present and non-blank.
pub fn pdf_metadata_title(document: &Document) -> Option<String> {
    let info = match document.trailer.get(b"Info").ok()? {
        Object::Reference(id) => document.get_dictionary(*id).ok()?,
        Object::Dictionary(dictionary) => dictionary,
        _ => return None,
    };

    let title = info_string(document, info, b"Title")?;
    let trimmed = title.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn info_string(document: &Document, info: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match info.get(key).ok()? {
        Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };

    match value {
        Object::String(bytes, _) => Some(decode_pdf_text_string(bytes)),
        _ => None,
    }
}

/// Decodes a PDF text string: UTF-16BE when it carries a byte order mark,
/// otherwise PDFDocEncoding, which agrees with Latin-1 for printable text.
pub fn decode_pdf_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE_u8, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Some(utf8) = bytes.strip_prefix(&[0xEF_u8, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(utf8).to_string();
    }

    bytes.iter().map(|byte| char::from(*byte)).collect()
}

fn extract_docx(bytes: &[u8], stem: String) -> Result<ExtractedDocument, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|error| ExtractionError::Docx(error.to_string()))?;

    let mut paragraphs = Vec::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        match child {
                            docx_rs::RunChild::Text(text) => line.push_str(&text.text),
                            docx_rs::RunChild::Tab(_) => line.push('\t'),
                            _ => {}
                        }
                    }
                }
            }
            paragraphs.push(line);
        }
    }

    let title = paragraphs
        .iter()
        .find(|paragraph| !paragraph.trim().is_empty())
        .and_then(|paragraph| short_title(paragraph))
        .unwrap_or(stem);

    let mut text = String::new();
    for paragraph in paragraphs.iter().filter(|p| !p.trim().is_empty()) {
        text.push_str(paragraph);
        text.push('\n');
    }

    Ok(ExtractedDocument {
        text,
        title,
        format: DocumentFormat::Docx,
        warnings: Vec::new(),
    })
}

fn extract_plain_text(
    path: &Path,
    bytes: Vec<u8>,
    stem: String,
) -> Result<ExtractedDocument, ExtractionError> {
    let text = String::from_utf8(bytes).map_err(|error| ExtractionError::Decode {
        path: path.to_path_buf(),
        details: error.to_string(),
    })?;

    let title = text
        .split('\n')
        .next()
        .and_then(short_title)
        .unwrap_or(stem);

    Ok(ExtractedDocument {
        text,
        title,
        format: DocumentFormat::Text,
        warnings: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_docx, write_pdf};
    use std::io;
    use tempfile::tempdir;

    #[test]
    fn unsupported_extension_is_rejected_without_text() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("proposal.rtf");
        fs::write(&path, b"{\\rtf1 Some RFP}")?;

        let result = extract_document(&path);

        assert!(matches!(
            result,
            Err(ExtractionError::UnsupportedFormat { ref extension }) if extension == "rtf"
        ));
        Ok(())
    }

    #[test]
    fn extension_matching_is_case_insensitive() {
        assert_eq!(detect_format(Path::new("a.PDF")).ok(), Some(DocumentFormat::Pdf));
        assert_eq!(detect_format(Path::new("a.Docx")).ok(), Some(DocumentFormat::Docx));
        assert_eq!(detect_format(Path::new("a.TXT")).ok(), Some(DocumentFormat::Text));
        assert!(detect_format(Path::new("no_extension")).is_err());
    }

    #[test]
    fn missing_file_is_not_found() {
        let result = extract_document(Path::new("/definitely/missing/rfp.pdf"));
        assert!(matches!(result, Err(ExtractionError::NotFound(_))));
    }

    #[test]
    fn directory_is_not_a_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let nested = dir.path().join("folder.txt");
        fs::create_dir(&nested)?;

        assert!(matches!(
            extract_document(&nested),
            Err(ExtractionError::NotAFile(_))
        ));
        Ok(())
    }

    #[test]
    fn text_title_comes_from_first_line() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("smart_city.txt");
        fs::write(&path, "  스마트시티 통합 플랫폼 구축 사업  \n본문 내용입니다.\n")?;

        let extracted = extract_document(&path)?;

        assert_eq!(extracted.title, "스마트시티 통합 플랫폼 구축 사업");
        assert_eq!(extracted.format, DocumentFormat::Text);
        assert!(extracted.text.contains("본문 내용입니다."));
        Ok(())
    }

    #[test]
    fn text_title_falls_back_to_file_stem() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("portal_rfp.txt");
        let long_line = "a".repeat(MAX_TITLE_CHARS);
        fs::write(&path, format!("{long_line}\nsecond line"))?;

        assert_eq!(extract_document(&path)?.title, "portal_rfp");

        let blank_first = dir.path().join("blank_first.txt");
        fs::write(&blank_first, "\nbody text")?;
        assert_eq!(extract_document(&blank_first)?.title, "blank_first");
        Ok(())
    }

    #[test]
    fn empty_and_whitespace_files_are_empty_content() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let empty = dir.path().join("empty.txt");
        fs::write(&empty, b"")?;
        let blank = dir.path().join("blank.txt");
        fs::write(&blank, b" \n\t\n")?;

        assert!(matches!(
            extract_document(&empty),
            Err(ExtractionError::EmptyContent(_))
        ));
        assert!(matches!(
            extract_document(&blank),
            Err(ExtractionError::EmptyContent(_))
        ));
        Ok(())
    }

    #[test]
    fn invalid_utf8_is_a_decode_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("latin.txt");
        fs::write(&path, [0x52, 0x46, 0x50, 0xFF, 0xFE, 0x0A])?;

        assert!(matches!(
            extract_document(&path),
            Err(ExtractionError::Decode { .. })
        ));
        Ok(())
    }

    #[test]
    fn docx_title_is_first_non_empty_paragraph() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("hospital.docx");
        write_docx(&path, &["", "병원 정보시스템 고도화 제안요청서", "1. 사업 개요"]);

        let extracted = extract_document(&path)?;

        assert_eq!(extracted.title, "병원 정보시스템 고도화 제안요청서");
        assert_eq!(extracted.format, DocumentFormat::Docx);
        assert_eq!(
            extracted.text,
            "병원 정보시스템 고도화 제안요청서\n1. 사업 개요\n"
        );
        Ok(())
    }

    #[test]
    fn docx_with_long_first_paragraph_uses_file_stem() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("long_intro.docx");
        let intro = "요구사항 ".repeat(40);
        write_docx(&path, &[intro.as_str(), "본문"]);

        assert_eq!(extract_document(&path)?.title, "long_intro");
        Ok(())
    }

    #[test]
    fn corrupt_docx_is_a_docx_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.docx");
        fs::write(&path, b"not a zip archive")?;

        assert!(matches!(
            extract_document(&path),
            Err(ExtractionError::Docx(_))
        ));
        Ok(())
    }

    #[test]
    fn pdf_title_comes_from_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("scan_0001.pdf");
        write_pdf(&path, Some("  Metro Rail Signalling RFP "), 2);

        let extracted = extract_document(&path)?;

        assert_eq!(extracted.title, "Metro Rail Signalling RFP");
        assert_eq!(extracted.format, DocumentFormat::Pdf);
        assert!(extracted.text.contains("Hello RFP page 1"));
        assert!(extracted.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn pdf_without_metadata_uses_file_stem() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("water_utility.pdf");
        write_pdf(&path, None, 1);

        let document = Document::load(&path).expect("load pdf");
        assert_eq!(pdf_metadata_title(&document), None);
        assert_eq!(extract_document(&path)?.title, "water_utility");
        Ok(())
    }

    #[test]
    fn pdf_page_cap_is_reported_as_warning() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("huge.pdf");
        write_pdf(&path, None, MAX_PDF_PAGES + 3);

        let extracted = extract_document(&path)?;

        assert!(extracted.warnings.contains(&ExtractionWarning::PageLimitReached {
            total_pages: MAX_PDF_PAGES + 3,
            processed_pages: MAX_PDF_PAGES,
        }));
        assert!(extracted.text.contains(&format!("page {MAX_PDF_PAGES}")));
        assert!(!extracted.text.contains(&format!("page {}", MAX_PDF_PAGES + 1)));
        Ok(())
    }

    #[test]
    fn corrupt_pdf_yields_no_text() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"%PDF-1.4\n%broken")?;

        assert!(matches!(
            extract_document(&path),
            Err(ExtractionError::Pdf(_)) | Err(ExtractionError::EmptyContent(_))
        ));
        Ok(())
    }

    #[test]
    fn pdf_text_strings_decode_utf16_and_latin1() {
        let utf16 = [0xFE, 0xFF, 0xC8, 0x1C, 0xC5, 0x48];
        assert_eq!(decode_pdf_text_string(&utf16), "제안");
        assert_eq!(decode_pdf_text_string(b"Caf\xe9"), "Café");
    }

    #[test]
    fn failed_page_becomes_a_warning_and_other_pages_are_kept() {
        let mut warnings = Vec::new();

        let text = collect_page_text(
            [1, 2, 3],
            |page| match page {
                2 => Err("content stream 9 0 R is missing"),
                _ => Ok(format!("page {page} body")),
            },
            &mut warnings,
        );

        assert_eq!(text, "page 1 body\npage 3 body\n");
        assert_eq!(
            warnings,
            vec![ExtractionWarning::PageFailed {
                page: 2,
                reason: "content stream 9 0 R is missing".to_string(),
            }]
        );
    }

    #[test]
    fn permission_denied_keeps_its_own_kind() {
        let path = Path::new("/srv/rfp/locked.pdf");

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);

        let error = ExtractionError::from_io(path, denied);

        assert!(matches!(error, ExtractionError::PermissionDenied(ref denied) if denied == path));
        assert!(matches!(
            ExtractionError::from_io(path, io::Error::from(io::ErrorKind::NotFound)),
            ExtractionError::NotFound(_)
        ));
        assert!(matches!(
            ExtractionError::from_io(path, io::Error::from(io::ErrorKind::Interrupted)),
            ExtractionError::Io(_)
        ));
    }
}
