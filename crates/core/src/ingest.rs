use crate::extractor::{document_from_pages, PdfExtractor};
use crate::{Document, IngestError};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collects PDF files under `root`, recursing into folders. A path that is
/// itself a PDF file is returned as-is.
pub fn discover_pdf_files(root: &Path) -> Vec<PathBuf> {
    let mut files = WalkDir::new(root)
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, IngestError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub checksum: String,
    pub page_count: usize,
    pub unreadable_pages: Vec<u32>,
    pub document: Document,
}

#[derive(Debug, Clone)]
pub struct SkippedPdf {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct IngestionReport {
    pub documents: Vec<LoadedDocument>,
    pub skipped_files: Vec<SkippedPdf>,
}

/// Extracts one PDF into a [`Document`] whose source id is the file name.
pub fn load_document<E: PdfExtractor>(
    path: &Path,
    extractor: &E,
) -> Result<LoadedDocument, IngestError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IngestError::MissingFileName(path.display().to_string()))?;
    let checksum = digest_file(path)?;
    let extracted = extractor.extract_pages(path)?;

    Ok(LoadedDocument {
        path: path.to_path_buf(),
        checksum,
        page_count: extracted.pages.len(),
        unreadable_pages: extracted.unreadable_pages,
        document: document_from_pages(name, &extracted.pages),
    })
}

/// Loads every PDF found under `roots`, recording unreadable files instead of
/// failing on them. Fails only when no PDF is found at all.
pub fn load_documents_best_effort<E: PdfExtractor>(
    roots: &[PathBuf],
    extractor: &E,
) -> Result<IngestionReport, IngestError> {
    let files = roots
        .iter()
        .flat_map(|root| discover_pdf_files(root))
        .collect::<Vec<_>>();

    if files.is_empty() {
        let listed = roots
            .iter()
            .map(|root| root.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(IngestError::InvalidArgument(format!(
            "no pdf files found in {listed}"
        )));
    }

    let mut report = IngestionReport::default();
    for path in files {
        match load_document(&path, extractor) {
            Ok(loaded) => report.documents.push(loaded),
            Err(error) => report.skipped_files.push(SkippedPdf {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(report)
}
