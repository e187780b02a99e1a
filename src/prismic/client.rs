use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::ApiInfo;
use super::{ContentSource, Document, Predicate, QueryOptions, SearchResponse};
use crate::config::PrismicConfig;
use crate::error::ContentError;

/// GETs `url` and decodes a JSON body, treating any non-2xx answer as an error.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    params: &[(&str, String)],
) -> Result<T, ContentError> {
    debug!(%url, "GET");
    let mut request = http.get(url);
    if !params.is_empty() {
        request = request.query(params);
    }
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ContentError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.json::<T>().await?)
}

/// Talks to a Prismic repository over its REST API v2.
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl PrismicClient {
    pub fn new(config: &PrismicConfig) -> Result<Self, ContentError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn params(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        if let Some(token) = &self.access_token {
            params.push(("access_token", token.clone()));
        }
        params
    }

    async fn master_ref(&self) -> Result<String, ContentError> {
        let info: ApiInfo = fetch_json(&self.http, &self.endpoint, &self.params(Vec::new())).await?;
        info.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(ContentError::MissingMasterRef)
    }

    async fn search(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, ContentError> {
        let mut params = vec![
            ("ref", self.master_ref().await?),
            ("q", Predicate::query_param(predicates)),
        ];
        if let Some(size) = options.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if !options.fetch.is_empty() {
            params.push(("fetch", options.fetch.join(",")));
        }
        let url = format!("{}/documents/search", self.endpoint);
        fetch_json(&self.http, &url, &self.params(params)).await
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<SearchResponse, ContentError> {
        self.search(predicates, options).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<Option<Document>, ContentError> {
        let predicates = [Predicate::at(&format!("my.{doc_type}.uid"), uid)];
        let options = QueryOptions {
            page_size: Some(1),
            ..QueryOptions::default()
        };
        let response = self.search(&predicates, &options).await?;
        Ok(response.results.into_iter().next())
    }
}
