//! Structured rich text as the content API stores it, and its conversion to
//! plain text and HTML.
//!
//! Span offsets are counted in UTF-16 code units, the way the API reports
//! them. [`as_html`] escapes all text it emits; embed HTML from the API is
//! passed through untouched.

use serde::Deserialize;
use serde_json::Value;

/// One block of a rich-text field.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawBlock")]
pub enum Block {
    Heading { level: u8, content: TextContent },
    Paragraph(TextContent),
    Preformatted(TextContent),
    ListItem(TextContent),
    OrderedListItem(TextContent),
    Image { url: Option<String>, alt: Option<String> },
    Embed { html: Option<String>, url: Option<String>, kind: Option<String> },
    /// A block type this renderer does not know; kept so text extraction
    /// still sees its text.
    Other { kind: String, content: TextContent },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextContent {
    pub text: String,
    pub spans: Vec<Span>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "RawSpan")]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpanKind {
    Strong,
    Em,
    Label(String),
    Hyperlink(Link),
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    /// Web or media link.
    Url { url: String, target: Option<String> },
    /// Link to another document, resolved to its post route.
    Document { uid: Option<String> },
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    spans: Vec<Span>,
    url: Option<String>,
    alt: Option<String>,
    oembed: Option<RawEmbed>,
}

#[derive(Deserialize)]
struct RawEmbed {
    html: Option<String>,
    embed_url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Deserialize)]
struct RawSpan {
    start: usize,
    end: usize,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<Value>,
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let content = TextContent {
            text: raw.text,
            spans: raw.spans,
        };
        match raw.kind.as_str() {
            "paragraph" => Block::Paragraph(content),
            "preformatted" => Block::Preformatted(content),
            "list-item" => Block::ListItem(content),
            "o-list-item" => Block::OrderedListItem(content),
            "image" => Block::Image {
                url: raw.url,
                alt: raw.alt,
            },
            "embed" => {
                let embed = raw.oembed;
                Block::Embed {
                    html: embed.as_ref().and_then(|e| e.html.clone()),
                    url: embed.as_ref().and_then(|e| e.embed_url.clone()),
                    kind: embed.and_then(|e| e.kind),
                }
            }
            kind => match heading_level(kind) {
                Some(level) => Block::Heading { level, content },
                None => Block::Other {
                    kind: kind.to_string(),
                    content,
                },
            },
        }
    }
}

fn heading_level(kind: &str) -> Option<u8> {
    kind.strip_prefix("heading")
        .and_then(|n| n.parse().ok())
        .filter(|n| (1..=6).contains(n))
}

impl From<RawSpan> for Span {
    fn from(raw: RawSpan) -> Self {
        let data = raw.data.unwrap_or(Value::Null);
        let text = |key: &str| data.get(key).and_then(Value::as_str).map(str::to_string);
        let kind = match raw.kind.as_str() {
            "strong" => SpanKind::Strong,
            "em" => SpanKind::Em,
            "label" => SpanKind::Label(text("label").unwrap_or_default()),
            "hyperlink" => match text("link_type").as_deref() {
                Some("Document") => SpanKind::Hyperlink(Link::Document { uid: text("uid") }),
                _ => SpanKind::Hyperlink(Link::Url {
                    url: text("url").unwrap_or_default(),
                    target: text("target"),
                }),
            },
            other => SpanKind::Other(other.to_string()),
        };
        Span {
            start: raw.start,
            end: raw.end,
            kind,
        }
    }
}

impl Block {
    pub fn text(&self) -> Option<&str> {
        match self {
            Block::Heading { content, .. }
            | Block::Paragraph(content)
            | Block::Preformatted(content)
            | Block::ListItem(content)
            | Block::OrderedListItem(content)
            | Block::Other { content, .. } => Some(&content.text),
            Block::Image { .. } | Block::Embed { .. } => None,
        }
    }
}

/// Plain text of a rich-text field: the text of every text-bearing block,
/// joined by a single space.
pub fn as_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter_map(Block::text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// HTML for a rich-text field. Consecutive list items are grouped into one
/// `<ul>` or `<ol>`.
pub fn as_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut open_list: Option<&str> = None;

    for block in blocks {
        let list = match block {
            Block::ListItem(_) => Some("ul"),
            Block::OrderedListItem(_) => Some("ol"),
            _ => None,
        };
        if open_list != list {
            if let Some(tag) = open_list {
                out.push_str(&format!("</{tag}>"));
            }
            if let Some(tag) = list {
                out.push_str(&format!("<{tag}>"));
            }
            open_list = list;
        }
        write_block(&mut out, block);
    }
    if let Some(tag) = open_list {
        out.push_str(&format!("</{tag}>"));
    }
    out
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading { level, content } => wrap(out, &format!("h{level}"), content),
        Block::Paragraph(content) | Block::Other { content, .. } => wrap(out, "p", content),
        Block::Preformatted(content) => wrap(out, "pre", content),
        Block::ListItem(content) | Block::OrderedListItem(content) => wrap(out, "li", content),
        Block::Image { url, alt } => {
            if let Some(url) = url {
                out.push_str(&format!(
                    "<p class=\"block-img\"><img src=\"{}\" alt=\"{}\" /></p>",
                    htmlescape::encode_minimal(url),
                    htmlescape::encode_minimal(alt.as_deref().unwrap_or_default()),
                ));
            }
        }
        Block::Embed { html, url, kind } => {
            out.push_str(&format!(
                "<div data-oembed=\"{}\" data-oembed-type=\"{}\">{}</div>",
                htmlescape::encode_minimal(url.as_deref().unwrap_or_default()),
                htmlescape::encode_minimal(kind.as_deref().unwrap_or_default()),
                html.as_deref().unwrap_or_default(),
            ));
        }
    }
}

fn wrap(out: &mut String, tag: &str, content: &TextContent) {
    out.push_str(&format!("<{tag}>"));
    write_spans(out, content);
    out.push_str(&format!("</{tag}>"));
}

/// Renders `content.text` with its spans. Spans are nested by containment; a
/// span that overlaps the end of its parent is cut at the parent's end.
fn write_spans(out: &mut String, content: &TextContent) {
    let text = &content.text;
    let offsets = utf16_offsets(text);
    let len = offsets.len() - 1;

    let mut spans: Vec<(usize, usize, &SpanKind)> = content
        .spans
        .iter()
        .map(|s| (s.start.min(len), s.end.min(len), &s.kind))
        .filter(|(start, end, _)| start < end)
        .collect();
    spans.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

    write_range(out, text, &offsets, 0, len, &spans);
}

fn write_range(
    out: &mut String,
    text: &str,
    offsets: &[usize],
    start: usize,
    end: usize,
    spans: &[(usize, usize, &SpanKind)],
) {
    let mut cursor = start;
    let mut i = 0;
    while i < spans.len() {
        let (span_start, span_end, kind) = spans[i];
        let mut j = i + 1;
        while j < spans.len() && spans[j].0 < span_end {
            j += 1;
        }
        let children: Vec<_> = spans[i + 1..j]
            .iter()
            .map(|&(s, e, k)| (s, e.min(span_end), k))
            .filter(|(s, e, _)| s < e)
            .collect();

        write_text(out, &text[offsets[cursor]..offsets[span_start]]);
        let (open, close) = span_tags(kind);
        out.push_str(&open);
        write_range(out, text, offsets, span_start, span_end, &children);
        out.push_str(close);

        cursor = span_end;
        i = j;
    }
    write_text(out, &text[offsets[cursor]..offsets[end]]);
}

fn span_tags(kind: &SpanKind) -> (String, &'static str) {
    match kind {
        SpanKind::Strong => ("<strong>".to_string(), "</strong>"),
        SpanKind::Em => ("<em>".to_string(), "</em>"),
        SpanKind::Label(label) => (
            format!("<span class=\"{}\">", htmlescape::encode_minimal(label)),
            "</span>",
        ),
        SpanKind::Hyperlink(Link::Url { url, target }) => {
            let target = match target {
                Some(t) => format!(
                    " target=\"{}\" rel=\"noopener noreferrer\"",
                    htmlescape::encode_minimal(t)
                ),
                None => String::new(),
            };
            (
                format!("<a href=\"{}\"{}>", htmlescape::encode_minimal(url), target),
                "</a>",
            )
        }
        SpanKind::Hyperlink(Link::Document { uid }) => {
            let href = match uid {
                Some(uid) => format!("/post/{}", htmlescape::encode_minimal(uid)),
                None => "/".to_string(),
            };
            (format!("<a href=\"{href}\">"), "</a>")
        }
        SpanKind::Other(_) => ("<span>".to_string(), "</span>"),
    }
}

fn write_text(out: &mut String, text: &str) {
    let escaped = htmlescape::encode_minimal(text);
    out.push_str(&escaped.replace('\n', "<br />"));
}

/// Byte offset of every UTF-16 position in `text`, plus one past the end.
/// Positions inside a surrogate pair map to the start of their character.
fn utf16_offsets(text: &str) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(text.len() + 1);
    for (byte, ch) in text.char_indices() {
        for _ in 0..ch.len_utf16() {
            offsets.push(byte);
        }
    }
    offsets.push(text.len());
    offsets
}
