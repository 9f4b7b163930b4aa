//! Debounced search-as-you-type with stale-result protection.
//!
//! Keystrokes reset a settle timer; only when input holds still for the
//! settle period is a remote lookup issued. Each issued request carries a
//! monotonically increasing generation number, and a response is applied
//! only while its generation is still the latest, so a slow early
//! response can never clobber a fast later one. In-flight requests are
//! never aborted at the transport level; their results are discarded by
//! the generation check.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ApiResult;
use crate::events::{CoreEvent, EventSink, Notice};

/// Remote collaborator that serves candidate lookups. No pagination.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    type Hit: Clone + Send;

    async fn search(&self, query: &str) -> ApiResult<Vec<Self::Hit>>;
}

/// The currently displayed result set.
#[derive(Debug, Clone)]
pub struct SearchResultSet<H> {
    pub query: String,
    pub hits: Vec<H>,
    /// Generation of the request that produced these hits; 0 when empty
    pub generation: u64,
}

impl<H> Default for SearchResultSet<H> {
    fn default() -> Self {
        Self {
            query: String::new(),
            hits: Vec::new(),
            generation: 0,
        }
    }
}

pub struct DebouncedQuery<B: SearchBackend> {
    inner: Arc<Inner<B>>,
}

struct Inner<B: SearchBackend> {
    backend: B,
    settle: Duration,
    min_chars: usize,
    /// Highest generation issued so far. Clearing also bumps this, so a
    /// cleared generation can never be caught up to by a late response.
    generation: AtomicU64,
    results: Mutex<SearchResultSet<B::Hit>>,
    pending: Mutex<Option<JoinHandle<()>>>,
    events: EventSink,
}

impl<B: SearchBackend + 'static> DebouncedQuery<B> {
    pub fn new(backend: B, settle: Duration, min_chars: usize, events: EventSink) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                settle,
                min_chars,
                generation: AtomicU64::new(0),
                results: Mutex::new(SearchResultSet::default()),
                pending: Mutex::new(None),
                events,
            }),
        }
    }

    /// Current result set, cloned for the caller's render pass.
    pub fn results(&self) -> SearchResultSet<B::Hit> {
        self.inner.results.lock().clone()
    }

    /// Feed the current input text. Every call resets the settle timer;
    /// input below the minimum length clears the visible results
    /// synchronously and issues no request.
    pub fn input(&self, text: &str) {
        // A newer keystroke always cancels the previous settle timer
        if let Some(timer) = self.inner.pending.lock().take() {
            timer.abort();
        }

        let query = text.trim().to_string();
        if query.chars().count() < self.inner.min_chars {
            self.reset_results();
            return;
        }

        let inner = Arc::clone(&self.inner);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.settle).await;

            // Stamped at issue time, after the input has settled
            let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            match inner.backend.search(&query).await {
                Ok(hits) => {
                    if inner.generation.load(Ordering::SeqCst) != generation {
                        debug!(%query, generation, "discarding superseded search response");
                        return;
                    }
                    *inner.results.lock() = SearchResultSet {
                        query: query.clone(),
                        hits,
                        generation,
                    };
                    inner.events.emit(CoreEvent::SearchChanged { query });
                }
                Err(err) => {
                    // A superseded failure is as silent as a superseded success
                    if inner.generation.load(Ordering::SeqCst) == generation {
                        inner
                            .events
                            .emit(CoreEvent::Notice(Notice::error(format!(
                                "Search failed: {err}"
                            ))));
                    }
                }
            }
        });
        *self.inner.pending.lock() = Some(timer);
    }

    /// Clear the input: results empty out synchronously and any pending
    /// timer or in-flight generation is invalidated.
    pub fn clear(&self) {
        if let Some(timer) = self.inner.pending.lock().take() {
            timer.abort();
        }
        self.reset_results();
    }

    fn reset_results(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        *self.inner.results.lock() = SearchResultSet::default();
        self.inner.events.emit(CoreEvent::SearchChanged {
            query: String::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Candidate {
        id: String,
        name: String,
    }

    /// Answers each query with one candidate, after the delay scripted
    /// for it.
    struct ScriptedSearch {
        delays: HashMap<String, u64>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSearch {
        fn new(delays: &[(&str, u64)]) -> Self {
            Self {
                delays: delays
                    .iter()
                    .map(|(q, ms)| (q.to_string(), *ms))
                    .collect(),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl SearchBackend for ScriptedSearch {
        type Hit = Candidate;

        async fn search(&self, query: &str) -> ApiResult<Vec<Candidate>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(ms) = self.delays.get(query) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            Ok(vec![Candidate {
                id: format!("c-{query}"),
                name: query.to_string(),
            }])
        }
    }

    fn query_with(
        backend: ScriptedSearch,
        settle_ms: u64,
    ) -> (DebouncedQuery<ScriptedSearch>, Arc<AtomicUsize>) {
        let calls = Arc::clone(&backend.calls);
        let query = DebouncedQuery::new(
            backend,
            Duration::from_millis(settle_ms),
            2,
            EventSink::disconnected(),
        );
        (query, calls)
    }

    #[tokio::test]
    async fn test_rapid_keystrokes_collapse_to_one_request() {
        let (query, calls) = query_with(ScriptedSearch::new(&[]), 40);

        query.input("fl");
        query.input("fle");
        query.input("fleet ma");
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1, "only the settled input fires");
        let results = query.results();
        assert_eq!(results.query, "fleet ma");
        assert_eq!(results.hits.len(), 1);
    }

    #[tokio::test]
    async fn test_short_input_clears_without_request() {
        let (query, calls) = query_with(ScriptedSearch::new(&[]), 20);

        query.input("ana");
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(query.results().hits.len(), 1);

        // Backspacing below the threshold clears synchronously
        query.input("a");
        assert!(query.results().hits.is_empty());
        assert_eq!(query.results().query, "");

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no request for short input");
    }

    #[tokio::test]
    async fn test_later_generation_wins_even_when_it_arrives_first() {
        let (query, calls) = query_with(ScriptedSearch::new(&[("anders", 120), ("bo", 0)]), 10);

        query.input("anders");
        // Let the settle timer fire so the slow request is actually in flight
        tokio::time::sleep(Duration::from_millis(40)).await;

        query.input("bo");
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(query.results().query, "bo", "fast later response displays");

        // The slow early response lands now; it must change nothing
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(query.results().query, "bo");
        assert_eq!(query.results().hits[0].id, "c-bo");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cleared_input_is_never_caught_up_to() {
        let (query, _calls) = query_with(ScriptedSearch::new(&[("anders", 80)]), 10);

        query.input("anders");
        tokio::time::sleep(Duration::from_millis(40)).await;
        query.clear();
        assert!(query.results().hits.is_empty());

        // The in-flight response arrives after the clear and is dropped
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(query.results().hits.is_empty());
        assert_eq!(query.results().generation, 0);
    }

    #[tokio::test]
    async fn test_timer_cancelled_before_firing_issues_nothing() {
        let (query, calls) = query_with(ScriptedSearch::new(&[]), 60);

        query.input("anders");
        tokio::time::sleep(Duration::from_millis(10)).await;
        query.clear();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
