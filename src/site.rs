//! Pre-rendered site content and incremental regeneration of post pages.
//!
//! [`Site::build`] fetches the listing seed and every post on the first page
//! of paths before the server starts. Afterwards posts are looked up in a
//! shared cache: stale entries are served while they regenerate in the
//! background, and unknown paths get a placeholder while they are generated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::SiteConfig;
use crate::error::ContentError;
use crate::models::{PostDetail, PostPagination};
use crate::normalize;
use crate::prismic::{ContentSource, Predicate, QueryOptions};

enum Entry {
    Generating,
    Ready {
        post: Arc<PostDetail>,
        generated_at: Instant,
        revalidating: bool,
    },
    Missing {
        checked_at: Instant,
    },
    Failed {
        checked_at: Instant,
    },
}

impl Entry {
    /// When a negative entry (missing or failed) was recorded.
    fn negative_since(&self) -> Option<Instant> {
        match self {
            Entry::Missing { checked_at } | Entry::Failed { checked_at } => Some(*checked_at),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Resolving,
    Ready(Arc<PostDetail>),
    NotFound,
    Failed,
}

/// Outcome of [`Site::lookup`]. When `generate` is set the caller must run
/// [`Site::generate`] for the slug; the cache has already recorded that a
/// generation is under way.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub lookup: Lookup,
    pub generate: bool,
}

impl Resolution {
    fn new(lookup: Lookup, generate: bool) -> Self {
        Self { lookup, generate }
    }
}

pub struct Site {
    source: Arc<dyn ContentSource>,
    config: SiteConfig,
    home: PostPagination,
    posts: RwLock<HashMap<String, Entry>>,
}

impl Site {
    pub async fn build(source: Arc<dyn ContentSource>, config: SiteConfig) -> Result<Self, ContentError> {
        let home = fetch_home(source.as_ref(), &config).await?;
        info!(posts = home.results.len(), more = home.next_page.is_some(), "fetched listing seed");

        let paths = static_paths(source.as_ref(), &config).await?;
        info!(paths = paths.len(), "pre-rendering posts");

        let doc_type = config.document_type.as_str();
        let fetcher = source.as_ref();
        let generated: Vec<(String, Result<Option<PostDetail>, ContentError>)> = stream::iter(paths)
            .map(|uid| async move {
                let post = fetch_post(fetcher, doc_type, &uid).await;
                (uid, post)
            })
            .buffer_unordered(config.prerender_concurrency.max(1))
            .collect()
            .await;

        let now = Instant::now();
        let mut posts = HashMap::new();
        for (uid, post) in generated {
            match post? {
                Some(post) => {
                    debug!(%uid, "pre-rendered post");
                    posts.insert(
                        uid,
                        Entry::Ready {
                            post: Arc::new(post),
                            generated_at: now,
                            revalidating: false,
                        },
                    );
                }
                None => warn!(%uid, "listed post vanished before it could be rendered"),
            }
        }

        Ok(Self {
            source,
            config,
            home,
            posts: RwLock::new(posts),
        })
    }

    /// The listing seed every listing view starts from.
    pub fn home(&self) -> &PostPagination {
        &self.home
    }

    pub fn revalidate_after(&self) -> Duration {
        Duration::from_secs(self.config.revalidate_secs)
    }

    pub async fn lookup(&self, slug: &str) -> Resolution {
        let revalidate = self.revalidate_after();
        {
            let posts = self.posts.read().await;
            match posts.get(slug) {
                Some(Entry::Ready {
                    post,
                    generated_at,
                    revalidating,
                }) if *revalidating || generated_at.elapsed() < revalidate => {
                    return Resolution::new(Lookup::Ready(Arc::clone(post)), false);
                }
                Some(Entry::Generating) => return Resolution::new(Lookup::Resolving, false),
                Some(Entry::Missing { checked_at }) if checked_at.elapsed() < revalidate => {
                    return Resolution::new(Lookup::NotFound, false);
                }
                None if !self.config.fallback => return Resolution::new(Lookup::NotFound, false),
                _ => {}
            }
        }

        // Something changes state; re-check under the write lock since another
        // request may have got there first.
        let mut posts = self.posts.write().await;
        match posts.get_mut(slug) {
            Some(Entry::Ready {
                post,
                generated_at,
                revalidating,
            }) => {
                let generate = !*revalidating && generated_at.elapsed() >= revalidate;
                if generate {
                    debug!(slug, "post is stale, revalidating");
                    *revalidating = true;
                }
                Resolution::new(Lookup::Ready(Arc::clone(post)), generate)
            }
            Some(Entry::Generating) => Resolution::new(Lookup::Resolving, false),
            Some(Entry::Missing { checked_at }) if checked_at.elapsed() < revalidate => {
                Resolution::new(Lookup::NotFound, false)
            }
            Some(Entry::Failed { .. }) => {
                posts.remove(slug);
                Resolution::new(Lookup::Failed, false)
            }
            _ if !self.config.fallback => Resolution::new(Lookup::NotFound, false),
            _ => {
                posts.insert(slug.to_string(), Entry::Generating);
                Resolution::new(Lookup::Resolving, true)
            }
        }
    }

    /// Fetches and stores one post. A failed revalidation keeps the stale
    /// copy; a failed first generation is reported once by the next lookup.
    pub async fn generate(&self, slug: &str) {
        let result = fetch_post(self.source.as_ref(), &self.config.document_type, slug).await;
        let mut posts = self.posts.write().await;
        match result {
            Ok(Some(post)) => {
                info!(slug, "generated post");
                posts.insert(
                    slug.to_string(),
                    Entry::Ready {
                        post: Arc::new(post),
                        generated_at: Instant::now(),
                        revalidating: false,
                    },
                );
            }
            Ok(None) => {
                info!(slug, "post not found");
                posts.insert(
                    slug.to_string(),
                    Entry::Missing {
                        checked_at: Instant::now(),
                    },
                );
                self.prune_negative(&mut posts, slug);
            }
            Err(e) => {
                error!(slug, error = %e, "failed to generate post");
                match posts.get_mut(slug) {
                    Some(Entry::Ready { revalidating, .. }) => *revalidating = false,
                    _ => {
                        posts.insert(
                            slug.to_string(),
                            Entry::Failed {
                                checked_at: Instant::now(),
                            },
                        );
                        self.prune_negative(&mut posts, slug);
                    }
                }
            }
        }
    }

    /// Drops expired missing entries, then evicts the oldest negative entries
    /// beyond `missing_capacity`, so made-up slugs cannot grow the cache.
    /// `keep` is the slug just recorded.
    fn prune_negative(&self, posts: &mut HashMap<String, Entry>, keep: &str) {
        let revalidate = self.revalidate_after();
        posts.retain(|slug, entry| {
            slug == keep
                || !matches!(entry, Entry::Missing { checked_at } if checked_at.elapsed() >= revalidate)
        });

        let mut negative: Vec<(Instant, String)> = posts
            .iter()
            .filter(|(slug, _)| slug.as_str() != keep)
            .filter_map(|(slug, entry)| entry.negative_since().map(|at| (at, slug.clone())))
            .collect();
        let capacity = self.config.missing_capacity.saturating_sub(1);
        if negative.len() <= capacity {
            return;
        }
        negative.sort_unstable();
        let excess = negative.len() - capacity;
        for (_, slug) in negative.into_iter().take(excess) {
            posts.remove(&slug);
        }
        debug!(evicted = excess, "pruned negative cache entries");
    }

    pub fn spawn_generate(self: &Arc<Self>, slug: String) {
        let site = Arc::clone(self);
        tokio::spawn(async move { site.generate(&slug).await });
    }
}

async fn fetch_home(source: &dyn ContentSource, config: &SiteConfig) -> Result<PostPagination, ContentError> {
    let options = QueryOptions {
        fetch: normalize::listing_fields(&config.document_type),
        page_size: Some(config.page_size),
    };
    let page = source
        .query(&[Predicate::at("document.type", &config.document_type)], &options)
        .await?;
    Ok(normalize::listing(page)?)
}

/// Slugs to pre-render: the first page of documents of the configured type.
async fn static_paths(source: &dyn ContentSource, config: &SiteConfig) -> Result<Vec<String>, ContentError> {
    let options = QueryOptions {
        page_size: Some(config.paths_page_size),
        ..QueryOptions::default()
    };
    let page = source
        .query(&[Predicate::at("document.type", &config.document_type)], &options)
        .await?;
    Ok(page.results.into_iter().filter_map(|doc| doc.uid).collect())
}

async fn fetch_post(
    source: &dyn ContentSource,
    doc_type: &str,
    uid: &str,
) -> Result<Option<PostDetail>, ContentError> {
    match source.get_by_uid(doc_type, uid).await? {
        Some(doc) => Ok(Some(normalize::detail(&doc)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::prismic::{Document, SearchResponse};

    struct MemorySource {
        docs: Mutex<Vec<Document>>,
        offline: Mutex<bool>,
    }

    impl MemorySource {
        fn with(docs: Vec<Document>) -> Arc<Self> {
            Arc::new(Self {
                docs: Mutex::new(docs),
                offline: Mutex::new(false),
            })
        }

        fn push(&self, doc: Document) {
            self.docs.lock().unwrap().push(doc);
        }

        fn check(&self) -> Result<(), ContentError> {
            if *self.offline.lock().unwrap() {
                Err(ContentError::Status {
                    url: "memory://".into(),
                    status: 503,
                })
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ContentSource for MemorySource {
        async fn query(
            &self,
            _predicates: &[Predicate],
            options: &QueryOptions,
        ) -> Result<SearchResponse, ContentError> {
            self.check()?;
            let docs = self.docs.lock().unwrap();
            let size = options.page_size.unwrap_or(20) as usize;
            Ok(SearchResponse {
                next_page: (docs.len() > size).then(|| "memory://page/2".to_string()),
                results: docs.iter().take(size).cloned().collect(),
                ..SearchResponse::default()
            })
        }

        async fn get_by_uid(&self, _doc_type: &str, uid: &str) -> Result<Option<Document>, ContentError> {
            self.check()?;
            let docs = self.docs.lock().unwrap();
            Ok(docs.iter().find(|d| d.uid.as_deref() == Some(uid)).cloned())
        }
    }

    fn publication(uid: &str) -> Document {
        serde_json::from_value(json!({
            "id": format!("id-{uid}"),
            "uid": uid,
            "type": "publication",
            "first_publication_date": "2021-03-25T19:25:28+0000",
            "data": {
                "title": format!("Post {uid}"),
                "subtitle": "subtitle",
                "author": "Joseph Oliveira",
                "banner": { "url": "https://images.prismic.io/banner.png" },
                "content": [{ "heading": "H1", "body": [{ "type": "paragraph", "text": "texto", "spans": [] }] }]
            }
        }))
        .unwrap()
    }

    fn draft(uid: &str) -> Document {
        serde_json::from_value(json!({
            "id": format!("id-{uid}"), "uid": uid, "type": "publication",
            "data": { "title": "t", "subtitle": "s", "author": "a" }
        }))
        .unwrap()
    }

    fn config() -> SiteConfig {
        SiteConfig {
            page_size: 1,
            paths_page_size: 2,
            ..SiteConfig::default()
        }
    }

    async fn cached(site: &Site) -> usize {
        site.posts.read().await.len()
    }

    #[tokio::test]
    async fn build_fetches_seed_and_prerenders_first_page_of_paths() {
        let source = MemorySource::with(vec![publication("a"), publication("b"), publication("c")]);
        let site = Site::build(source, config()).await.unwrap();

        assert_eq!(site.home().results.len(), 1);
        assert_eq!(site.home().results[0].uid, "a");
        assert_eq!(site.home().next_page.as_deref(), Some("memory://page/2"));

        for uid in ["a", "b"] {
            let resolution = site.lookup(uid).await;
            assert!(matches!(resolution.lookup, Lookup::Ready(ref p) if p.uid == uid));
            assert!(!resolution.generate);
        }
        // Not in the first page of paths.
        assert_eq!(site.lookup("c").await, Resolution::new(Lookup::Resolving, true));
    }

    #[tokio::test]
    async fn build_fails_when_content_is_unreachable() {
        let source = MemorySource::with(vec![publication("a")]);
        *source.offline.lock().unwrap() = true;
        assert!(Site::build(source, config()).await.is_err());
    }

    #[tokio::test]
    async fn unknown_path_resolves_then_becomes_ready() {
        let source = MemorySource::with(vec![publication("a")]);
        let site = Site::build(source.clone(), config()).await.unwrap();
        source.push(publication("novo"));

        assert_eq!(site.lookup("novo").await, Resolution::new(Lookup::Resolving, true));
        // Already generating: no second generation.
        assert_eq!(site.lookup("novo").await, Resolution::new(Lookup::Resolving, false));

        site.generate("novo").await;
        let resolution = site.lookup("novo").await;
        assert!(matches!(resolution.lookup, Lookup::Ready(ref p) if p.title == "Post novo"));
    }

    #[tokio::test]
    async fn missing_document_becomes_not_found() {
        let site = Site::build(MemorySource::with(vec![publication("a")]), config())
            .await
            .unwrap();
        assert!(site.lookup("nada").await.generate);
        site.generate("nada").await;
        assert_eq!(site.lookup("nada").await, Resolution::new(Lookup::NotFound, false));
    }

    #[tokio::test]
    async fn without_fallback_unknown_paths_are_not_found() {
        let config = SiteConfig {
            fallback: false,
            ..config()
        };
        let site = Site::build(MemorySource::with(vec![publication("a")]), config)
            .await
            .unwrap();
        assert_eq!(site.lookup("b").await, Resolution::new(Lookup::NotFound, false));
    }

    #[tokio::test]
    async fn stale_post_is_served_while_revalidating_once() {
        let config = SiteConfig {
            revalidate_secs: 0,
            ..config()
        };
        let source = MemorySource::with(vec![publication("a")]);
        let site = Site::build(source.clone(), config).await.unwrap();

        let first = site.lookup("a").await;
        assert!(matches!(first.lookup, Lookup::Ready(_)));
        assert!(first.generate);
        assert!(!site.lookup("a").await.generate);

        *source.offline.lock().unwrap() = true;
        site.generate("a").await;
        // The stale copy survives a failed revalidation and may retry.
        let again = site.lookup("a").await;
        assert!(matches!(again.lookup, Lookup::Ready(_)));
        assert!(again.generate);
    }

    #[tokio::test]
    async fn failed_generation_is_reported_once_then_retried() {
        let source = MemorySource::with(vec![publication("a")]);
        let site = Site::build(source.clone(), config()).await.unwrap();
        source.push(draft("rascunho"));

        assert!(site.lookup("rascunho").await.generate);
        site.generate("rascunho").await;
        assert_eq!(site.lookup("rascunho").await, Resolution::new(Lookup::Failed, false));
        assert_eq!(site.lookup("rascunho").await, Resolution::new(Lookup::Resolving, true));
    }

    #[tokio::test]
    async fn malformed_prerendered_post_fails_the_build() {
        let source = MemorySource::with(vec![publication("a"), draft("b")]);
        let err = Site::build(source, config()).await.err().unwrap();
        assert!(matches!(err, ContentError::Malformed(_)));
    }

    #[tokio::test]
    async fn made_up_slugs_do_not_grow_the_cache() {
        let config = SiteConfig {
            missing_capacity: 16,
            ..config()
        };
        let site = Site::build(MemorySource::with(vec![publication("a")]), config)
            .await
            .unwrap();

        for i in 0..2_000 {
            let slug = format!("inventado-{i}");
            assert!(site.lookup(&slug).await.generate);
            site.generate(&slug).await;
        }
        assert_eq!(cached(&site).await, 1 + 16);

        // The most recent misses are still remembered, the oldest are not.
        assert_eq!(site.lookup("inventado-1999").await, Resolution::new(Lookup::NotFound, false));
        assert!(site.lookup("inventado-0").await.generate);
        // The pre-rendered post is never evicted.
        assert!(matches!(site.lookup("a").await.lookup, Lookup::Ready(_)));
    }

    #[tokio::test]
    async fn failed_slugs_are_bounded_too() {
        let config = SiteConfig {
            missing_capacity: 4,
            ..config()
        };
        let source = MemorySource::with(vec![publication("a")]);
        let site = Site::build(source.clone(), config).await.unwrap();
        *source.offline.lock().unwrap() = true;

        for i in 0..50 {
            let slug = format!("fora-{i}");
            site.lookup(&slug).await;
            site.generate(&slug).await;
        }
        assert_eq!(cached(&site).await, 1 + 4);
    }

    #[tokio::test]
    async fn fresh_post_is_served_under_a_read_lock() {
        let site = Site::build(MemorySource::with(vec![publication("a")]), config())
            .await
            .unwrap();
        let _reader = site.posts.read().await;

        let resolution = tokio::time::timeout(Duration::from_secs(1), site.lookup("a"))
            .await
            .expect("lookup of a fresh post waited for the write lock");
        assert!(matches!(resolution.lookup, Lookup::Ready(_)));
        assert!(!resolution.generate);
    }
}
