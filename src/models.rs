use crate::rich_text::Block;

/// A post as the listing page shows it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostSummary {
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// One page of listing results plus the cursor to the next one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PostPagination {
    pub results: Vec<PostSummary>,
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub title: String,
    pub banner_url: String,
    pub author: String,
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentSection {
    /// Empty key-text fields come back as null from the API.
    pub heading: Option<String>,
    pub body: Vec<Block>,
}
