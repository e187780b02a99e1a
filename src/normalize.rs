//! Maps raw content API documents onto the shapes the pages render.

use serde::Deserialize;
use serde_json::Value;

use crate::error::NormalizeError;
use crate::models::{ContentSection, PostDetail, PostPagination, PostSummary};
use crate::prismic::{Document, SearchResponse};
use crate::rich_text::Block;

/// Fields the listing needs, for the `fetch` query option.
pub fn listing_fields(doc_type: &str) -> Vec<String> {
    ["title", "subtitle", "author"]
        .iter()
        .map(|field| format!("{doc_type}.{field}"))
        .collect()
}

/// Normalizes a whole search page. Order and length are preserved; the first
/// malformed document fails the page.
pub fn listing(page: SearchResponse) -> Result<PostPagination, NormalizeError> {
    let results = page
        .results
        .iter()
        .map(summary)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PostPagination {
        results,
        next_page: cursor(page.next_page),
    })
}

pub fn summary(doc: &Document) -> Result<PostSummary, NormalizeError> {
    Ok(PostSummary {
        uid: uid(doc)?,
        first_publication_date: doc.first_publication_date.clone(),
        title: text_field(doc, "title")?,
        subtitle: text_field(doc, "subtitle")?,
        author: text_field(doc, "author")?,
    })
}

#[derive(Deserialize)]
struct RawBanner {
    url: Option<String>,
}

/// Sections keep only heading and body; anything else on a raw section is
/// dropped.
#[derive(Deserialize)]
struct RawSection {
    heading: Option<String>,
    #[serde(default)]
    body: Vec<Block>,
}

pub fn detail(doc: &Document) -> Result<PostDetail, NormalizeError> {
    let banner: RawBanner = typed_field(doc, "banner")?;
    let banner_url = banner.url.ok_or_else(|| missing(doc, "banner.url"))?;
    let sections: Vec<RawSection> = typed_field(doc, "content")?;

    Ok(PostDetail {
        uid: uid(doc)?,
        first_publication_date: doc.first_publication_date.clone(),
        title: text_field(doc, "title")?,
        banner_url,
        author: text_field(doc, "author")?,
        content: sections
            .into_iter()
            .map(|s| ContentSection {
                heading: s.heading,
                body: s.body,
            })
            .collect(),
    })
}

/// An empty cursor means the same as no cursor.
pub fn cursor(next_page: Option<String>) -> Option<String> {
    next_page.filter(|url| !url.is_empty())
}

fn missing(doc: &Document, field: &'static str) -> NormalizeError {
    NormalizeError::MissingField {
        document: doc.label().to_string(),
        field,
    }
}

fn uid(doc: &Document) -> Result<String, NormalizeError> {
    doc.uid.clone().ok_or_else(|| missing(doc, "uid"))
}

/// Key text fields come back as `null` when left empty in the editor; only an
/// absent key is missing.
fn text_field(doc: &Document, field: &'static str) -> Result<String, NormalizeError> {
    match doc.data.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) => Ok(String::new()),
        Some(value) => Err(NormalizeError::InvalidField {
            document: doc.label().to_string(),
            field,
            source: serde::de::Error::custom(format!("expected text, found {value}")),
        }),
        None => Err(missing(doc, field)),
    }
}

fn typed_field<T: for<'de> Deserialize<'de>>(
    doc: &Document,
    field: &'static str,
) -> Result<T, NormalizeError> {
    match doc.data.get(field) {
        None | Some(Value::Null) => Err(missing(doc, field)),
        Some(value) => T::deserialize(value).map_err(|source| NormalizeError::InvalidField {
            document: doc.label().to_string(),
            field,
            source,
        }),
    }
}
