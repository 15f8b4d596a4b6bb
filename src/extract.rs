//! Text extraction for recognized content files.
//!
//! Markdown and MDX are taken verbatim (front-matter included unless the
//! caller asks for it to be stripped). PDFs are extracted page by page and
//! concatenated in page order; a page with no extractable text contributes
//! nothing rather than failing the file.

use std::path::Path;

use crate::error::ExtractionError;
use crate::models::ContentKind;

/// Extract plain text from the file at `path`.
pub fn extract_file(
    path: &Path,
    kind: ContentKind,
    strip_front_matter: bool,
) -> Result<String, ExtractionError> {
    let io_err = |source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    };

    match kind {
        ContentKind::Markdown => {
            let text = std::fs::read_to_string(path).map_err(io_err)?;
            if strip_front_matter {
                Ok(remove_front_matter(&text).to_string())
            } else {
                Ok(text)
            }
        }
        ContentKind::Pdf => {
            let bytes = std::fs::read(path).map_err(io_err)?;
            extract_pdf(&bytes)
        }
    }
}

/// Concatenate per-page PDF text.
#[cfg(feature = "pdf")]
pub fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract panics on some malformed inputs; treat that like any other parse failure.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractionError::Pdf("parser panicked on malformed input".to_string()))?
        .map_err(|e| ExtractionError::Pdf(e.to_string()))?;
    Ok(pages.concat())
}

#[cfg(not(feature = "pdf"))]
pub fn extract_pdf(_bytes: &[u8]) -> Result<String, ExtractionError> {
    Err(ExtractionError::Unsupported(
        "PDF extraction requires the `pdf` feature".to_string(),
    ))
}

/// Drop a leading `---`-delimited YAML front-matter block, if present.
pub fn remove_front_matter(text: &str) -> &str {
    let body = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = match body
        .strip_prefix("---\n")
        .or_else(|| body.strip_prefix("---\r\n"))
    {
        Some(rest) => rest,
        None => return text,
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        if line.trim_end() == "---" {
            return &rest[offset..];
        }
    }
    text
}
