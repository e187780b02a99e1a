//! Client side of the headless content API.

mod client;
mod predicate;
mod types;

use async_trait::async_trait;

pub use client::PrismicClient;
pub(crate) use client::fetch_json;
pub use predicate::Predicate;
pub use types::{Document, SearchResponse};

use crate::error::ContentError;

/// Options for [`ContentSource::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Restrict `data` to these `type.field` paths.
    pub fetch: Vec<String>,
    pub page_size: Option<u32>,
}

/// Where documents come from. Stateless per call.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, ContentError>;

    /// `Ok(None)` when no document of `doc_type` carries `uid`.
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Document>, ContentError>;
}
