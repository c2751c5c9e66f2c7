use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::Write;
use tempfile::NamedTempFile;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::Document;

/// Turns uploaded PDF bytes into a normalized, page-aware [`Document`].
pub struct DocumentLoader {
    re_spaces: Regex,
    re_blank_lines: Regex,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self {
            re_spaces: Regex::new(r"[ \t]+").unwrap(),
            re_blank_lines: Regex::new(r"\n{3,}").unwrap(),
        }
    }

    /// Writes the bytes to a scoped temp file, extracts one text block per
    /// page and normalizes whitespace. The temp file exists only for the
    /// duration of this call and is removed on success and error alike.
    pub fn load(&self, filename: &str, bytes: &[u8]) -> Result<Document> {
        let mut tmp = NamedTempFile::new()?;
        tmp.write_all(bytes)?;

        let raw_pages = pdf_extract::extract_text_by_pages(tmp.path())
            .map_err(|e| Error::Load(format!("failed to read {}: {}", filename, e)))?;
        drop(tmp);

        let pages: Vec<String> = raw_pages.iter().map(|p| self.clean_text(p)).collect();
        if pages.iter().all(|p| p.is_empty()) {
            return Err(Error::Load(format!("no extractable text in {}", filename)));
        }

        let mut text = String::new();
        let mut page_offsets = Vec::with_capacity(pages.len());
        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                text.push_str("\n\n");
            }
            page_offsets.push(text.len());
            text.push_str(page);
        }

        let fingerprint = hex::encode(Sha256::digest(bytes));

        log::info!(
            "loaded {} ({} pages, {} chars)",
            filename,
            pages.len(),
            text.chars().count()
        );

        Ok(Document {
            id: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            pages,
            text,
            page_offsets,
            fingerprint,
        })
    }

    fn clean_text(&self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n");
        let collapsed = self.re_spaces.replace_all(&unified, " ");
        let collapsed = self.re_blank_lines.replace_all(&collapsed, "\n\n");
        collapsed.trim().to_string()
    }
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_bytes_fail_with_load_error() {
        let loader = DocumentLoader::new();
        let err = loader.load("broken.pdf", b"this is not a pdf").unwrap_err();
        assert_eq!(err.kind(), "load");
        assert!(err.to_string().contains("broken.pdf"));
    }

    #[test]
    fn clean_text_collapses_whitespace_runs() {
        let loader = DocumentLoader::new();
        let cleaned = loader.clean_text("a  \t b\r\nnext\n\n\n\nparagraph  ");
        assert_eq!(cleaned, "a b\nnext\n\nparagraph");
    }
}
