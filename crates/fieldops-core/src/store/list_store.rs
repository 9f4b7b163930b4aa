//! Paginated collection store backed by a remote source of truth.
//!
//! Holds one collection at a time for a given entity type and
//! filter/search context: initial load replaces wholesale, "load more"
//! appends the next page, and any fetch failure leaves visible state
//! untouched.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::ApiResult;
use crate::events::{CoreEvent, EventSink};
use crate::models::{HasId, PageCursor};

/// One fetched page as returned by the remote collaborator.
///
/// Search/filter contexts that disable pagination return no cursor.
#[derive(Debug)]
pub struct FetchedPage<T> {
    pub items: Vec<T>,
    pub cursor: Option<PageCursor>,
}

/// Remote collaborator that serves pages of a collection.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    type Item: HasId + Clone + Send;
    type Context: Send + Sync;

    async fn fetch_page(
        &self,
        context: &Self::Context,
        page: u32,
    ) -> ApiResult<FetchedPage<Self::Item>>;
}

/// How the most recent successful fetch was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    Replace,
    Append,
}

#[derive(Debug, Clone)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub cursor: Option<PageCursor>,
    pub mode: LoadMode,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            mode: LoadMode::Replace,
        }
    }
}

/// Outcome of a `load_more` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// The next page was fetched; this many new items were appended
    Appended(usize),
    /// No cursor, or the cursor reports no further page
    AtEnd,
    /// An append for this store is already in flight
    InFlight,
}

pub struct RemoteListStore<F: PageFetcher> {
    name: String,
    fetcher: F,
    state: Mutex<ListState<F::Item>>,
    append_in_flight: AtomicBool,
    events: EventSink,
}

/// Clears the in-flight flag on every exit path, including errors.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<F: PageFetcher> RemoteListStore<F> {
    pub fn new(name: impl Into<String>, fetcher: F, events: EventSink) -> Self {
        Self {
            name: name.into(),
            fetcher,
            state: Mutex::new(ListState::default()),
            append_in_flight: AtomicBool::new(false),
            events,
        }
    }

    /// Current items, cloned for the caller's render pass.
    pub fn items(&self) -> Vec<F::Item> {
        self.state.lock().items.clone()
    }

    pub fn cursor(&self) -> Option<PageCursor> {
        self.state.lock().cursor.clone()
    }

    pub fn snapshot(&self) -> ListState<F::Item> {
        self.state.lock().clone()
    }

    /// Fetch the first page for `context` and replace the collection
    /// wholesale, including dropping items beyond what the fresh page
    /// returns. Used for initial load, pull-to-refresh, and switching to
    /// a search/filter context.
    ///
    /// Concurrent `load` calls are not coalesced here; the caller gates
    /// redundant invocations (e.g. ignores a second refresh gesture
    /// while one is pending).
    pub async fn load(&self, context: &F::Context) -> ApiResult<usize> {
        let page = self.fetcher.fetch_page(context, 1).await?;
        let count = page.items.len();
        {
            let mut state = self.state.lock();
            state.items = page.items;
            state.cursor = page.cursor;
            state.mode = LoadMode::Replace;
        }
        self.events.emit(CoreEvent::ListChanged {
            list: self.name.clone(),
        });
        Ok(count)
    }

    /// Fetch the page after the current cursor and append its items.
    ///
    /// Returns immediately without fetching when there is no next page
    /// (including search contexts, which carry no cursor) or when an
    /// append is already in flight. On failure the visible collection is
    /// left exactly as it was.
    pub async fn load_more(&self, context: &F::Context) -> ApiResult<LoadMore> {
        let next_page = {
            let state = self.state.lock();
            match &state.cursor {
                Some(cursor) if cursor.has_next => cursor.current_page + 1,
                _ => return Ok(LoadMore::AtEnd),
            }
        };

        if self.append_in_flight.swap(true, Ordering::SeqCst) {
            debug!(list = %self.name, "append already in flight, skipping");
            return Ok(LoadMore::InFlight);
        }
        let _guard = InFlightGuard(&self.append_in_flight);

        let page = self.fetcher.fetch_page(context, next_page).await?;

        let added = {
            let mut state = self.state.lock();
            // Server pages can overlap when rows were inserted between
            // fetches; keep item identity unique without re-sorting.
            let existing: HashSet<String> =
                state.items.iter().map(|i| i.id().to_string()).collect();
            let before = state.items.len();
            state
                .items
                .extend(page.items.into_iter().filter(|i| !existing.contains(i.id())));
            state.cursor = page.cursor;
            state.mode = LoadMode::Append;
            state.items.len() - before
        };

        self.events.emit(CoreEvent::ListChanged {
            list: self.name.clone(),
        });
        Ok(LoadMore::Appended(added))
    }
}
