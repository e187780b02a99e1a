//! "Load more" state of one listing view.
//!
//! The view is seeded from the pre-rendered first page. Each load GETs the
//! opaque next-page URL, appends the normalized results and replaces the
//! cursor. Only one load can be in flight; a trigger while loading, or once
//! the cursor is gone, is ignored.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ContentError;
use crate::models::{PostPagination, PostSummary};
use crate::normalize;
use crate::prismic::{fetch_json, SearchResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    IdleWithCursor,
    IdleNoMore,
    Loading,
}

#[derive(Debug, Clone)]
pub enum Event {
    LoadRequested,
    PageLoaded(PostPagination),
    LoadFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
    loading: bool,
    error: Option<String>,
    pages_loaded: usize,
}

impl Pagination {
    pub fn new(seed: PostPagination) -> Self {
        Self {
            posts: seed.results,
            next_page: normalize::cursor(seed.next_page),
            loading: false,
            error: None,
            pages_loaded: 1,
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    pub fn phase(&self) -> Phase {
        match (self.loading, &self.next_page) {
            (true, _) => Phase::Loading,
            (false, Some(_)) => Phase::IdleWithCursor,
            (false, None) => Phase::IdleNoMore,
        }
    }

    /// Whether the load-more control is shown.
    pub fn can_load_more(&self) -> bool {
        self.phase() == Phase::IdleWithCursor
    }

    /// Applies one event. Loaded pages are appended even if no load was
    /// requested; a failed load leaves posts and cursor as they were.
    pub fn apply(mut self, event: Event) -> Self {
        match event {
            Event::LoadRequested => {
                if self.can_load_more() {
                    self.loading = true;
                }
            }
            Event::PageLoaded(page) => {
                self.posts.extend(page.results);
                self.next_page = normalize::cursor(page.next_page);
                self.loading = false;
                self.error = None;
                self.pages_loaded += 1;
            }
            Event::LoadFailed(message) => {
                self.loading = false;
                self.error = Some(message);
            }
        }
        self
    }
}

/// Fetches a listing page from a next-page cursor.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<PostPagination, ContentError>;
}

/// Plain GET against the cursor URL; the cursor carries every parameter.
pub struct HttpPageFetcher {
    http: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ContentError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> Result<PostPagination, ContentError> {
        let page: SearchResponse = fetch_json(&self.http, url, &[]).await?;
        Ok(normalize::listing(page)?)
    }
}

/// Runs one load-more round trip. Returns the state unchanged when no load
/// may start.
pub async fn load_more<F>(state: Pagination, fetcher: &F) -> Pagination
where
    F: PageFetcher + ?Sized,
{
    let state = state.apply(Event::LoadRequested);
    if state.phase() != Phase::Loading {
        return state;
    }
    let Some(url) = state.next_page.clone() else {
        return state;
    };

    debug!(%url, "loading next listing page");
    match fetcher.fetch_page(&url).await {
        Ok(page) => state.apply(Event::PageLoaded(page)),
        Err(e) => {
            warn!(%url, error = %e, "failed to load next listing page");
            state.apply(Event::LoadFailed(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn post(uid: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
            title: format!("Post {uid}"),
            subtitle: "subtitle".to_string(),
            author: "author".to_string(),
        }
    }

    fn page(uids: &[&str], next: Option<&str>) -> PostPagination {
        PostPagination {
            results: uids.iter().map(|uid| post(uid)).collect(),
            next_page: next.map(str::to_string),
        }
    }

    fn uids(state: &Pagination) -> Vec<&str> {
        state.posts().iter().map(|p| p.uid.as_str()).collect()
    }

    /// Serves canned pages by URL and counts requests.
    #[derive(Default)]
    struct CannedPages {
        pages: HashMap<String, PostPagination>,
        calls: AtomicUsize,
    }

    impl CannedPages {
        fn with(mut self, url: &str, page: PostPagination) -> Self {
            self.pages.insert(url.to_string(), page);
            self
        }
    }

    #[async_trait]
    impl PageFetcher for CannedPages {
        async fn fetch_page(&self, url: &str) -> Result<PostPagination, ContentError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages.get(url).cloned().ok_or(ContentError::Status {
                url: url.to_string(),
                status: 500,
            })
        }
    }

    #[test]
    fn seed_without_cursor_has_no_more() {
        let state = Pagination::new(page(&["a"], None));
        assert_eq!(state.phase(), Phase::IdleNoMore);
        assert!(!state.can_load_more());
    }

    #[test]
    fn request_while_loading_is_ignored() {
        let state = Pagination::new(page(&["a"], Some("/api?cursor=2")));
        let loading = state.apply(Event::LoadRequested);
        assert_eq!(loading.phase(), Phase::Loading);

        let again = loading.clone().apply(Event::LoadRequested);
        assert_eq!(again, loading);
    }

    #[test]
    fn request_without_cursor_is_ignored() {
        let state = Pagination::new(page(&["a"], None));
        let after = state.clone().apply(Event::LoadRequested);
        assert_eq!(after, state);
    }

    #[test]
    fn failed_load_keeps_posts_and_cursor() {
        let state = Pagination::new(page(&["a", "b"], Some("/api?cursor=2")))
            .apply(Event::LoadRequested)
            .apply(Event::LoadFailed("timeout".to_string()));
        assert_eq!(uids(&state), ["a", "b"]);
        assert_eq!(state.next_page(), Some("/api?cursor=2"));
        assert_eq!(state.error(), Some("timeout"));
        assert!(state.can_load_more());
    }

    #[test]
    fn duplicates_across_pages_are_kept() {
        let state = Pagination::new(page(&["a"], Some("/2")))
            .apply(Event::LoadRequested)
            .apply(Event::PageLoaded(page(&["a"], None)));
        assert_eq!(uids(&state), ["a", "a"]);
    }

    #[tokio::test]
    async fn load_more_appends_and_hides_control() {
        let fetcher = CannedPages::default().with("/api?cursor=2", page(&["c"], None));
        let state = Pagination::new(page(&["a", "b"], Some("/api?cursor=2")));

        let state = load_more(state, &fetcher).await;
        assert_eq!(uids(&state), ["a", "b", "c"]);
        assert_eq!(state.next_page(), None);
        assert!(!state.can_load_more());
        assert_eq!(state.pages_loaded(), 2);

        let state = load_more(state, &fetcher).await;
        assert_eq!(uids(&state), ["a", "b", "c"]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_fetch_without_cursor() {
        let fetcher = CannedPages::default();
        let state = load_more(Pagination::new(page(&["a"], None)), &fetcher).await;
        assert_eq!(uids(&state), ["a"]);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sequential_loads_concatenate_in_fetch_order() {
        let fetcher = CannedPages::default()
            .with("/2", page(&["c", "d"], Some("/3")))
            .with("/3", page(&["e"], None));
        let mut state = Pagination::new(page(&["a", "b"], Some("/2")));
        while state.can_load_more() {
            state = load_more(state, &fetcher).await;
        }
        assert_eq!(uids(&state), ["a", "b", "c", "d", "e"]);
        assert_eq!(state.pages_loaded(), 3);
    }

    #[tokio::test]
    async fn fetch_error_is_reported_on_the_state() {
        let fetcher = CannedPages::default();
        let state = load_more(Pagination::new(page(&["a"], Some("/gone"))), &fetcher).await;
        assert_eq!(uids(&state), ["a"]);
        assert_eq!(state.next_page(), Some("/gone"));
        assert!(state.error().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn http_fetcher_decodes_raw_search_pages() {
        use axum::{routing::get, Json, Router};
        use serde_json::json;

        let app = Router::new().route(
            "/api/v2/documents/search",
            get(|| async {
                Json(json!({
                    "page": 2,
                    "next_page": null,
                    "results": [{
                        "id": "X", "uid": "c", "type": "publication",
                        "first_publication_date": "2021-03-25T19:25:28+0000",
                        "data": { "title": "C", "subtitle": "s", "author": "a" }
                    }]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let fetcher = HttpPageFetcher::new(Duration::from_secs(5)).unwrap();
        let url = format!("http://{addr}/api/v2/documents/search?ref=r&page=2&pageSize=1");
        let state = Pagination::new(page(&["a", "b"], Some(url.as_str())));
        let state = load_more(state, &fetcher).await;

        assert_eq!(uids(&state), ["a", "b", "c"]);
        assert_eq!(state.next_page(), None);
    }
}
