//! Comment composition for one entity's thread: draft text, staged
//! attachments, and the optimistic placeholder lifecycle.
//!
//! Submission binds the entire staged set to a single multipart request.
//! The placeholder renders attachments from their local paths so the
//! user sees their own files immediately; the server's record (ids,
//! timestamps, hosted URLs) replaces it on acknowledgment. A failed
//! submission removes the placeholder entirely and restores the draft
//! for retry; nothing is silently dropped.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::warn;

use crate::attachments::{PendingAttachmentSet, PendingFile};
use crate::error::ApiResult;
use crate::events::{CoreEvent, EventSink, Notice};
use crate::models::{HasId, OptimisticEntry};

/// Remote collaborator that accepts comment submissions for an entity.
#[async_trait]
pub trait CommentBackend: Send + Sync {
    /// Server-side comment representation; also used to render the
    /// optimistic placeholder.
    type Record: Clone + HasId + Send;

    /// Build the locally-rendered placeholder for an unacknowledged
    /// submission. Attachments render from their local paths.
    fn draft(&self, entity_id: &str, text: &str, files: &[PendingFile]) -> Self::Record;

    /// Submit text and all staged files as one multipart request.
    async fn submit(
        &self,
        entity_id: &str,
        text: &str,
        files: &[PendingFile],
    ) -> ApiResult<Self::Record>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    /// Empty draft: no text and no staged files
    NothingToSend,
    /// A submission for this thread is still in flight
    AlreadyPending,
}

pub struct CommentComposer<B: CommentBackend> {
    backend: B,
    entity_id: String,
    draft_text: Mutex<String>,
    attachments: Mutex<PendingAttachmentSet>,
    entries: Mutex<Vec<OptimisticEntry<B::Record>>>,
    submit_in_flight: AtomicBool,
    events: EventSink,
}

struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<B: CommentBackend> CommentComposer<B> {
    pub fn new(entity_id: impl Into<String>, backend: B, events: EventSink) -> Self {
        Self {
            backend,
            entity_id: entity_id.into(),
            draft_text: Mutex::new(String::new()),
            attachments: Mutex::new(PendingAttachmentSet::new()),
            entries: Mutex::new(Vec::new()),
            submit_in_flight: AtomicBool::new(false),
            events,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.draft_text.lock() = text.into();
    }

    pub fn text(&self) -> String {
        self.draft_text.lock().clone()
    }

    pub fn attach(&self, file: PendingFile) {
        self.attachments.lock().push(file);
    }

    pub fn remove_attachment(&self, index: usize) -> Option<PendingFile> {
        self.attachments.lock().remove(index)
    }

    pub fn attachments(&self) -> Vec<PendingFile> {
        self.attachments.lock().staged()
    }

    /// Thread entries, cloned for the caller's render pass.
    pub fn entries(&self) -> Vec<OptimisticEntry<B::Record>> {
        self.entries.lock().clone()
    }

    /// The underlying records, for timeline projection.
    pub fn records(&self) -> Vec<B::Record> {
        self.entries.lock().iter().map(|e| e.value.clone()).collect()
    }

    /// Replace the thread with a server-fetched baseline. Used on thread
    /// open and pull-to-refresh; each thread context owns its state, so
    /// switching threads never shares or contaminates entries.
    pub fn seed(&self, records: Vec<B::Record>) {
        let entries = records
            .into_iter()
            .map(|record| {
                let server_id = record.id().to_string();
                OptimisticEntry::acknowledged(record, server_id)
            })
            .collect();
        *self.entries.lock() = entries;
        self.emit_thread_changed();
    }

    /// Merge one server-fetched record (e.g. from pagination of older
    /// comments), skipping ids already present.
    pub fn absorb_remote(&self, record: B::Record) {
        let mut entries = self.entries.lock();
        let known = entries
            .iter()
            .any(|e| e.server_id.as_deref() == Some(record.id()));
        if known {
            return;
        }
        let server_id = record.id().to_string();
        entries.push(OptimisticEntry::acknowledged(record, server_id));
        drop(entries);
        self.emit_thread_changed();
    }

    /// Submit the current draft (text plus the whole staged set) as one
    /// request. The placeholder appears and the input clears before this
    /// future first suspends; reconciliation or rollback follows the
    /// server's answer.
    pub async fn submit(&self) -> ApiResult<SubmitOutcome> {
        let text = self.draft_text.lock().clone();
        let files = self.attachments.lock().staged();
        if text.trim().is_empty() && files.is_empty() {
            return Ok(SubmitOutcome::NothingToSend);
        }

        if self.submit_in_flight.swap(true, Ordering::SeqCst) {
            return Ok(SubmitOutcome::AlreadyPending);
        }
        let _guard = FlagGuard(&self.submit_in_flight);

        let placeholder = self.backend.draft(&self.entity_id, &text, &files);
        let local_id = {
            let entry = OptimisticEntry::pending(placeholder);
            let local_id = entry.local_id.clone();
            self.entries.lock().push(entry);
            local_id
        };
        self.draft_text.lock().clear();
        self.emit_thread_changed();

        match self.backend.submit(&self.entity_id, &text, &files).await {
            Ok(record) => {
                {
                    let mut entries = self.entries.lock();
                    if let Some(entry) = entries.iter_mut().find(|e| e.local_id == local_id) {
                        let server_id = record.id().to_string();
                        entry.confirm(record, server_id);
                    }
                }
                // The staged set was bound to this submission; only now
                // is it consumed
                self.attachments.lock().clear();
                self.emit_thread_changed();
                Ok(SubmitOutcome::Submitted)
            }
            Err(err) => {
                warn!(entity_id = %self.entity_id, error = %err, "comment submission failed");
                // Remove the placeholder entirely; restore the draft as
                // it was submitted. The staged files were never cleared.
                self.entries.lock().retain(|e| e.local_id != local_id);
                *self.draft_text.lock() = text;
                self.emit_thread_changed();
                self.events.emit(CoreEvent::Notice(Notice::error(format!(
                    "Could not send comment: {err}"
                ))));
                Err(err)
            }
        }
    }

    fn emit_thread_changed(&self) {
        self.events.emit(CoreEvent::ThreadChanged {
            entity_id: self.entity_id.clone(),
        });
    }
}
