//! Debounced query dispatcher for search-as-you-type.
//!
//! Converts keystroke-driven query changes into a bounded rate of engine
//! reads and guarantees that the visible result set always belongs to the
//! most recently issued query. Two guards enforce freshness:
//!
//! - every query change cancels the previous dispatch's token, whether it
//!   is still waiting out the debounce or already in flight, and
//! - each dispatch carries a sequence number that must still be the latest
//!   when its response arrives.
//!
//! Debounce timing alone would leave a window where an older, slower
//! response lands after a newer one; the token + sequence pair closes it.
//!
//! The engine sits behind [`SearchBackend`] so the dispatcher can be
//! driven against a scripted backend in tests.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{
    error::AppError,
    models::Language,
    search::{MAX_RESULTS, SearchHit},
};

/// Quiet period a query must survive before a read is issued.
pub const DEBOUNCE: Duration = Duration::from_millis(300);

/// Queries shorter than this never touch the engine.
pub const MIN_QUERY_CHARS: usize = 2;

#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    async fn search(
        &self,
        query: &str,
        language: Language,
        limit: usize,
    ) -> Result<Vec<SearchHit>, AppError>;
}

/// Shortcuts shown for an empty query, and offered again as recovery when a
/// query matches nothing.
pub fn popular_searches(language: Language) -> &'static [&'static str] {
    match language {
        Language::En => &[
            "Teide",
            "Whale watching",
            "Masca valley",
            "Stargazing",
            "Snorkeling",
        ],
        Language::Es => &[
            "Teide",
            "Avistamiento de cetáceos",
            "Barranco de Masca",
            "Observación de estrellas",
            "Esnórquel",
        ],
        Language::Ru => &[
            "Тейде",
            "Наблюдение за китами",
            "Ущелье Маска",
            "Звёздное небо",
            "Снорклинг",
        ],
    }
}

#[derive(Clone, Debug, Default)]
pub struct SearchState {
    pub query: String,
    /// Sequence number of the most recently issued dispatch.
    pub seq: u64,
    pub results: Vec<SearchHit>,
    pub open: bool,
}

struct Inner {
    state: Mutex<SearchState>,
    latest_seq: AtomicU64,
    pending: Mutex<Option<CancellationToken>>,
}

pub struct SearchDispatcher<B: SearchBackend> {
    backend: Arc<B>,
    language: Language,
    debounce: Duration,
    inner: Arc<Inner>,
}

impl<B: SearchBackend> SearchDispatcher<B> {
    pub fn new(backend: Arc<B>, language: Language) -> Self {
        Self {
            backend,
            language,
            debounce: DEBOUNCE,
            inner: Arc::new(Inner {
                state: Mutex::new(SearchState::default()),
                latest_seq: AtomicU64::new(0),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Feed the current input value. Restarts the debounce; short queries
    /// clear the panel without issuing a read.
    pub fn update_query(&self, input: &str) {
        self.cancel_pending();

        let query = input.trim().to_string();

        {
            let mut state = self.inner.state.lock();
            state.query = input.to_string();

            if query.chars().count() < MIN_QUERY_CHARS {
                state.results.clear();
                state.open = false;
                return;
            }
        }

        let seq = self.inner.latest_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.state.lock().seq = seq;

        let token = CancellationToken::new();
        *self.inner.pending.lock() = Some(token.clone());

        let backend = self.backend.clone();
        let inner = self.inner.clone();
        let language = self.language;
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = sleep(debounce) => {}
            }

            let outcome = backend.search(&query, language, MAX_RESULTS).await;

            // A newer keystroke may have arrived while the read was in
            // flight. Its results, not these, must win.
            if token.is_cancelled() || inner.latest_seq.load(Ordering::SeqCst) != seq {
                return;
            }

            let mut state = inner.state.lock();
            match outcome {
                Ok(hits) => {
                    state.results = hits;
                    state.open = true;
                }
                Err(err) => {
                    warn!("search failed: {err}");
                    state.results.clear();
                    state.open = false;
                }
            }
        });
    }

    /// Focusing an empty input reveals the popular-searches list without a
    /// store read.
    pub fn focus(&self) {
        let mut state = self.inner.state.lock();
        if state.query.trim().is_empty() {
            state.open = true;
        }
    }

    /// Accept a suggestion: the visible query becomes the hit's localized
    /// name and the panel closes.
    pub fn select(&self, hit: &SearchHit) {
        self.cancel_pending();

        let mut state = self.inner.state.lock();
        state.query = hit.name.clone();
        state.results.clear();
        state.open = false;
    }

    /// Dismiss the panel, dropping any pending dispatch.
    pub fn close(&self) {
        self.cancel_pending();
        self.inner.state.lock().open = false;
    }

    pub fn popular(&self) -> &'static [&'static str] {
        popular_searches(self.language)
    }

    pub fn state(&self) -> SearchState {
        self.inner.state.lock().clone()
    }

    fn cancel_pending(&self) {
        if let Some(token) = self.inner.pending.lock().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, HashSet},
        sync::atomic::AtomicUsize,
    };

    use tokio::{task::yield_now, time::advance};

    use super::*;

    #[derive(Default)]
    struct MockBackend {
        calls: AtomicUsize,
        queries: Mutex<Vec<String>>,
        hits: Mutex<HashMap<String, Vec<SearchHit>>>,
        delays: Mutex<HashMap<String, Duration>>,
        failures: Mutex<HashSet<String>>,
    }

    impl MockBackend {
        fn with_hits(query: &str, hits: Vec<SearchHit>) -> Arc<Self> {
            let backend = Self::default();
            backend.hits.lock().insert(query.to_string(), hits);
            Arc::new(backend)
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SearchBackend for MockBackend {
        async fn search(
            &self,
            query: &str,
            _language: Language,
            limit: usize,
        ) -> Result<Vec<SearchHit>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().push(query.to_string());

            let delay = self.delays.lock().get(query).copied();
            if let Some(delay) = delay {
                sleep(delay).await;
            }

            if self.failures.lock().contains(query) {
                return Err(backend_error());
            }

            let hits = self.hits.lock().get(query).cloned().unwrap_or_default();
            Ok(hits.into_iter().take(limit).collect())
        }
    }

    fn backend_error() -> AppError {
        serde_json::from_str::<u32>("boom").unwrap_err().into()
    }

    fn hit(id: u32, name: &str) -> SearchHit {
        SearchHit {
            id,
            name: name.to_string(),
            short_description: String::new(),
            duration: "4h".to_string(),
            price: 40.0,
            rating: 4.8,
        }
    }

    /// Drain ready tasks without letting the paused clock auto-advance.
    async fn settle() {
        for _ in 0..20 {
            yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_query_issues_nothing() {
        let backend = Arc::new(MockBackend::default());
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("T");
        settle().await;
        advance(Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(backend.calls(), 0);
        let state = dispatcher.state();
        assert!(!state.open);
        assert!(state.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_whitespace_padding_does_not_qualify() {
        let backend = Arc::new(MockBackend::default());
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("  я  ");
        settle().await;
        advance(Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(backend.calls(), 0);
        assert!(!dispatcher.state().open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_call_per_quiet_period() {
        let backend = Arc::new(MockBackend::default());
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("Te");
        settle().await;
        advance(Duration::from_millis(100)).await;

        dispatcher.update_query("Tei");
        settle().await;
        advance(Duration::from_millis(100)).await;

        dispatcher.update_query("Teid");
        settle().await;
        advance(Duration::from_millis(310)).await;
        settle().await;

        assert_eq!(backend.calls(), 1);
        assert_eq!(*backend.queries.lock(), ["Teid"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_matching_record_is_returned() {
        let backend = MockBackend::with_hits("Teide", vec![hit(1, "Teide Hiking Tour")]);
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("Teide");
        settle().await;
        advance(Duration::from_millis(310)).await;
        settle().await;

        let state = dispatcher.state();
        assert!(state.open);
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].name, "Teide Hiking Tour");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_result_set_still_opens_panel() {
        let backend = Arc::new(MockBackend::default());
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("zzzz");
        settle().await;
        advance(Duration::from_millis(310)).await;
        settle().await;

        let state = dispatcher.state();
        assert_eq!(backend.calls(), 1);
        assert!(state.open);
        assert!(state.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_replaces_query_and_closes() {
        let selected = hit(3, "Masca Gorge Hike");
        let backend = MockBackend::with_hits("Masca", vec![selected.clone()]);
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("Masca");
        settle().await;
        advance(Duration::from_millis(310)).await;
        settle().await;

        dispatcher.select(&selected);

        let state = dispatcher.state();
        assert_eq!(state.query, "Masca Gorge Hike");
        assert!(!state.open);
        assert!(state.results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_cancels_pending_dispatch() {
        let backend = Arc::new(MockBackend::default());
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("Teide");
        settle().await;
        dispatcher.select(&hit(1, "Teide Hiking Tour"));
        advance(Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_with_empty_query_opens_popular_list() {
        let backend = Arc::new(MockBackend::default());
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::Es);

        dispatcher.focus();
        settle().await;

        let state = dispatcher.state();
        assert!(state.open);
        assert!(state.results.is_empty());
        assert_eq!(backend.calls(), 0);
        assert_eq!(dispatcher.popular(), popular_searches(Language::Es));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failure_is_quiet() {
        let backend = Arc::new(MockBackend::default());
        backend.failures.lock().insert("Teide".to_string());
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("Teide");
        settle().await;
        advance(Duration::from_millis(310)).await;
        settle().await;

        let state = dispatcher.state();
        assert_eq!(backend.calls(), 1);
        assert!(state.results.is_empty());
        assert!(!state.open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_discarded() {
        let backend = Arc::new(MockBackend::default());
        backend
            .hits
            .lock()
            .insert("alpha".to_string(), vec![hit(1, "Alpha Tour")]);
        backend
            .hits
            .lock()
            .insert("beta".to_string(), vec![hit(2, "Beta Tour")]);
        // The older query's read outlives the newer query's entire round
        // trip.
        backend
            .delays
            .lock()
            .insert("alpha".to_string(), Duration::from_millis(500));
        backend
            .delays
            .lock()
            .insert("beta".to_string(), Duration::from_millis(10));

        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("alpha");
        settle().await;
        advance(Duration::from_millis(310)).await;
        settle().await;

        dispatcher.update_query("beta");
        settle().await;
        advance(Duration::from_millis(310)).await;
        settle().await;
        advance(Duration::from_millis(20)).await;
        settle().await;

        let state = dispatcher.state();
        assert_eq!(backend.calls(), 2);
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].name, "Beta Tour");

        // Let alpha's read finally resolve; it must not overwrite.
        advance(Duration::from_millis(500)).await;
        settle().await;

        let state = dispatcher.state();
        assert_eq!(state.results[0].name, "Beta Tour");
        assert!(state.open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_query_clears_results() {
        let backend = MockBackend::with_hits("Teide", vec![hit(1, "Teide Hiking Tour")]);
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("Teide");
        settle().await;
        advance(Duration::from_millis(310)).await;
        settle().await;
        assert!(dispatcher.state().open);

        dispatcher.update_query("T");
        let state = dispatcher.state();
        assert!(!state.open);
        assert!(state.results.is_empty());

        advance(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_dismisses_panel_and_drops_dispatch() {
        let backend = MockBackend::with_hits("Teide", vec![hit(1, "Teide Hiking Tour")]);
        let dispatcher = SearchDispatcher::new(backend.clone(), Language::En);

        dispatcher.update_query("Teide");
        settle().await;
        dispatcher.close();
        advance(Duration::from_secs(1)).await;
        settle().await;

        assert_eq!(backend.calls(), 0);
        assert!(!dispatcher.state().open);
    }

    #[test]
    fn test_popular_lists_cover_all_languages() {
        for language in crate::models::LANGUAGES {
            assert_eq!(popular_searches(language).len(), 5);
        }
    }
}
