use crate::markdown_file::{PageSettings, ParsedImage, compose_markdown_file, parse_markdown_file};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;
use walkdir::WalkDir;

const UNTITLED: &str = "Untitled Document";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read '{name}': {source}")]
    Read { name: String, source: io::Error },
    #[error("failed to save '{name}': {source}")]
    Write { name: String, source: io::Error },
    #[error("failed to read directory '{}': {source}", path.display())]
    List { path: PathBuf, source: walkdir::Error },
    #[error("failed to encode page settings: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub path: PathBuf,
    pub content: String,
    pub page_settings: Option<PageSettings>,
    pub images: Vec<ParsedImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// A fresh, empty document that has not been saved anywhere yet
    pub fn untitled() -> Self {
        let now = Utc::now();
        Document {
            id: Uuid::new_v4(),
            title: UNTITLED.to_string(),
            path: PathBuf::new(),
            content: String::new(),
            page_settings: None,
            images: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

pub struct DocumentStore {
    base_path: PathBuf,
}

impl DocumentStore {
    pub fn new(base_path: PathBuf) -> Self {
        DocumentStore { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Load a document by name (with or without .md extension).
    /// A missing file gives an empty document that is created on first save.
    pub fn load(&self, name: &str) -> Result<Document, DocumentError> {
        let mut path = self.base_path.join(name);
        if path.extension().is_none() {
            path.set_extension("md");
        }

        let mut doc = Document::untitled();
        doc.title = name.trim_end_matches(".md").to_string();
        doc.path = path;

        if !doc.path.exists() {
            return Ok(doc);
        }

        let text = fs::read_to_string(&doc.path).map_err(|source| DocumentError::Read {
            name: name.to_string(),
            source,
        })?;
        let parsed = parse_markdown_file(&text);
        doc.content = parsed.content;
        doc.page_settings = parsed.page_settings;
        doc.images = parsed.images;

        if let Ok(modified) = fs::metadata(&doc.path).and_then(|m| m.modified()) {
            doc.updated_at = modified.into();
        }

        Ok(doc)
    }

    /// Write the document in the saved file format, creating parent directories
    pub fn save(&self, doc: &mut Document) -> Result<(), DocumentError> {
        let body = compose_markdown_file(&doc.content, doc.page_settings.as_ref(), &doc.images)?;

        if let Some(parent) = doc.path.parent() {
            fs::create_dir_all(parent).map_err(|source| DocumentError::Write {
                name: doc.title.clone(),
                source,
            })?;
        }

        fs::write(&doc.path, body).map_err(|source| DocumentError::Write {
            name: doc.title.clone(),
            source,
        })?;
        doc.updated_at = Utc::now();
        Ok(())
    }

    /// Recursively list all markdown files below the base directory.
    /// Returns relative paths without extension (e.g. "notes/persian").
    pub fn list_all_documents(&self) -> Result<Vec<String>, DocumentError> {
        let mut docs = Vec::new();

        for entry in WalkDir::new(&self.base_path).min_depth(1) {
            let entry = entry.map_err(|source| DocumentError::List {
                path: self.base_path.clone(),
                source,
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }

            if let Ok(relative) = path.strip_prefix(&self.base_path) {
                let name = relative.with_extension("");
                let parts: Vec<_> = name.components().map(|c| c.as_os_str().to_string_lossy()).collect();
                docs.push(parts.join("/"));
            }
        }

        docs.sort();
        Ok(docs)
    }
}
