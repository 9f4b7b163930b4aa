//! Staging area for locally-picked files awaiting upload.
//!
//! Picks accumulate from the camera, gallery, or document picker; there
//! is no dedup by content, only explicit user removal. The whole staged
//! set is bound to a single comment submission and cleared only when that
//! submission succeeds.

use std::path::PathBuf;

/// A locally-picked file awaiting upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    /// Path of the picked file on the device
    pub local_path: PathBuf,
    /// Name shown in the composer and sent as the multipart filename
    pub display_name: String,
    pub mime_type: String,
    pub size_bytes: Option<u64>,
}

impl PendingFile {
    pub fn new(local_path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        let local_path = local_path.into();
        let display_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        Self {
            local_path,
            display_name,
            mime_type: mime_type.into(),
            size_bytes: None,
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// Files staged for the next submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingAttachmentSet {
    files: Vec<PendingFile>,
}

impl PendingAttachmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: PendingFile) {
        self.files.push(file);
    }

    /// Remove one staged file by position. Out-of-range indices are a
    /// no-op so a stale UI row cannot panic the composer.
    pub fn remove(&mut self, index: usize) -> Option<PendingFile> {
        if index < self.files.len() {
            Some(self.files.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[PendingFile] {
        &self.files
    }

    /// Snapshot of the staged set, bound to one outgoing submission.
    pub fn staged(&self) -> Vec<PendingFile> {
        self.files.clone()
    }
}
