use serde::Deserialize;
use serde_json::{Map, Value};

/// A document as the content API returns it. `data` stays untyped here; the
/// normalizers decide which fields a page needs.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Document {
    /// Identifier used in error messages: the uid when present, else the id.
    pub fn label(&self) -> &str {
        self.uid.as_deref().unwrap_or(&self.id)
    }
}

/// One page of search results.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results_per_page: u32,
    #[serde(default)]
    pub total_results_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub prev_page: Option<String>,
    pub results: Vec<Document>,
}

/// The repository root (`GET {endpoint}`), of which only the refs matter.
#[derive(Deserialize, Debug)]
pub(crate) struct ApiInfo {
    pub refs: Vec<ApiRef>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ApiRef {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}
