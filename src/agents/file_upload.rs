// File upload agent: turns an uploaded PDF into a stored Document

use lopdf::Document as PdfDocument;
use tracing::{debug, error, info, warn};

use crate::db::Repository;
use crate::models::Document;
use crate::storage::FileStorage;
use crate::types::{AppError, AppResult};

/// Longest title the `documents.title` column holds, in characters.
pub const MAX_TITLE_CHARS: usize = 255;

pub struct FileUploadAgent;

impl FileUploadAgent {
    /// Reduce a client-supplied filename to its last path component and fit
    /// it into the title column, keeping the extension. Names that are empty
    /// or only dots after cleaning are unusable.
    pub fn clean_filename(raw: &str) -> Option<String> {
        let name: String = raw
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(raw)
            .chars()
            .filter(|c| !c.is_control())
            .collect();

        if matches!(name.as_str(), "" | "." | "..") {
            return None;
        }
        if name.chars().count() <= MAX_TITLE_CHARS {
            return Some(name);
        }

        // A leading dot starts a hidden name, not an extension
        let (stem, ext) = match name.rfind('.') {
            Some(idx) if idx > 0 => name.split_at(idx),
            _ => (name.as_str(), ""),
        };
        let ext: String = ext.chars().take(MAX_TITLE_CHARS).collect();
        let mut title: String = stem.chars().take(MAX_TITLE_CHARS - ext.chars().count()).collect();
        title.push_str(&ext);
        Some(title)
    }

    /// Uploads are accepted on filename alone; content is not sniffed.
    pub fn is_pdf(filename: &str) -> bool {
        filename.ends_with(".pdf")
    }

    /// Extract the text of every page, in page order. A page whose text
    /// cannot be read contributes an empty string; a file that cannot be
    /// loaded at all is an error.
    pub fn extract_pages(data: &[u8]) -> AppResult<Vec<String>> {
        let pdf = PdfDocument::load_mem(data).map_err(|e| AppError::Ingestion(e.to_string()))?;

        let pages = pdf
            .get_pages()
            .into_keys()
            .map(|page_number| match pdf.extract_text(&[page_number]) {
                Ok(text) => text,
                Err(e) => {
                    debug!(page = page_number, error = %e, "No extractable text on page");
                    String::new()
                }
            })
            .collect();

        Ok(pages)
    }

    /// Join page texts, each preceded by its `--- page N ---` marker.
    pub fn compose_text(pages: &[String]) -> String {
        pages
            .iter()
            .enumerate()
            .map(|(i, text)| format!("--- page {} ---\n{}\n", i + 1, text))
            .collect()
    }

    /// Parse, store and record an upload. Nothing is persisted unless the
    /// whole file parses.
    pub async fn process_file(
        repo: &dyn Repository,
        files: &FileStorage,
        filename: &str,
        content: Vec<u8>,
    ) -> AppResult<Document> {
        let title = Self::clean_filename(filename)
            .ok_or_else(|| AppError::InvalidRequest(format!("Invalid file name: {:?}", filename)))?;
        info!(title = %title, bytes = content.len(), "Processing upload");

        // lopdf parsing is CPU-bound
        let (content, pages) = tokio::task::spawn_blocking(move || {
            let pages = Self::extract_pages(&content);
            (content, pages)
        })
        .await
        .map_err(|e| AppError::Internal(format!("PDF extraction task failed: {}", e)))?;

        let pages = pages.inspect_err(|e| warn!(title = %title, error = %e, "Failed to parse PDF"))?;

        let page_count = i32::try_from(pages.len())
            .map_err(|_| AppError::Ingestion(format!("too many pages: {}", pages.len())))?;
        let text_content = Self::compose_text(&pages);

        let file = files.save_pdf(&content).await?;
        let document = Document::new(title, file, page_count, text_content);

        if let Err(e) = repo.insert_document(&document).await {
            error!(error = %e, "Failed to record document, removing stored file");
            if let Err(cleanup) = files.delete(&document.file).await {
                warn!(error = %cleanup, file = %document.file, "Could not remove orphaned upload");
            }
            return Err(e);
        }

        info!(
            document_id = %document.id,
            page_count,
            text_len = document.text_content.len(),
            "Document ingested"
        );

        Ok(document)
    }
}
