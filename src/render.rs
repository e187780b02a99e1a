//! Turns page models into full HTML documents.

use htmlescape::encode_minimal as escape;

use crate::dates;
use crate::models::{PostDetail, PostSummary};
use crate::pagination::Pagination;
use crate::reading_time;
use crate::rich_text;
use crate::templates::Templates;

const SITE_NAME: &str = "spacetraveling.";
const LOADING_REFRESH: &str = r#"<meta http-equiv="refresh" content="2" />"#;

/// What the detail page can show.
#[derive(Debug, Clone, Copy)]
pub enum DetailState<'a> {
    /// Not generated yet: placeholder only, no post data.
    Resolving,
    Ready(&'a PostDetail),
}

/// Substitutes `{{ name }}` placeholders in one pass, so substituted values
/// are never scanned again. Unknown placeholders are left as they are.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start..].find("}}") else {
            break;
        };
        let name = rest[start + 2..start + len].trim();
        out.push_str(&rest[..start]);
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + len + 2]),
        }
        rest = &rest[start + len + 2..];
    }
    out.push_str(rest);
    out
}

fn render_with_layout(templates: &Templates, title: &str, head: &str, content: &str) -> String {
    let title = escape(title);
    fill(
        &templates.layout,
        &[
            ("title", title.as_str()),
            ("head", head),
            ("header", templates.header.as_str()),
            ("content", content),
        ],
    )
}

fn publication_date(date: Option<&str>) -> String {
    date.and_then(dates::format_publication_date)
        .map(|formatted| format!("<time>{formatted}</time>"))
        .unwrap_or_default()
}

fn summary_item(post: &PostSummary) -> String {
    format!(
        "<a href=\"/post/{}\"><h2>{}</h2><p>{}</p><div class=\"info\">{}<span>{}</span></div></a>",
        escape(&post.uid),
        escape(&post.title),
        escape(&post.subtitle),
        publication_date(post.first_publication_date.as_deref()),
        escape(&post.author),
    )
}

pub fn home(templates: &Templates, view: &Pagination) -> String {
    let mut content = String::from("<div class=\"container\"><main class=\"posts\">");
    for post in view.posts() {
        content.push_str(&summary_item(post));
    }
    content.push_str("</main>");

    if view.error().is_some() {
        content.push_str(
            "<p class=\"load-error\" role=\"alert\">Não foi possível carregar mais posts.</p>",
        );
    }
    if view.can_load_more() {
        content.push_str(&format!(
            "<a class=\"load-more\" href=\"/?pages={}\">Carregar mais posts</a>",
            view.pages_loaded() + 1
        ));
    }
    content.push_str("</div>");

    render_with_layout(templates, &format!("Home | {SITE_NAME}"), "", &content)
}

pub fn post(templates: &Templates, state: DetailState<'_>) -> String {
    let post = match state {
        DetailState::Resolving => {
            return render_with_layout(
                templates,
                SITE_NAME,
                LOADING_REFRESH,
                "<div class=\"container\"><div class=\"loading\">Carregando...</div></div>",
            );
        }
        DetailState::Ready(post) => post,
    };

    let mut content = format!(
        "<img class=\"banner\" src=\"{}\" alt=\"banner\" />\
         <div class=\"container\"><main class=\"post-content\"><h1>{}</h1>\
         <div class=\"info\">{}<span>{}</span><span>{} min</span></div>",
        escape(&post.banner_url),
        escape(&post.title),
        publication_date(post.first_publication_date.as_deref()),
        escape(&post.author),
        reading_time::estimate(&post.content),
    );
    for section in &post.content {
        content.push_str("<article>");
        if let Some(heading) = &section.heading {
            content.push_str(&format!("<h2>{}</h2>", escape(heading)));
        }
        // Already escaped by the rich-text renderer.
        content.push_str(&format!(
            "<div class=\"post-body\">{}</div>",
            rich_text::as_html(&section.body)
        ));
        content.push_str("</article>");
    }
    content.push_str("</main></div>");

    render_with_layout(templates, &format!("{} | {SITE_NAME}", post.title), "", &content)
}

pub fn not_found(templates: &Templates, path: &str) -> String {
    let path = escape(path);
    let content = fill(&templates.not_found, &[("path", path.as_str())]);
    render_with_layout(templates, &format!("Página não encontrada | {SITE_NAME}"), "", &content)
}

pub fn error(templates: &Templates) -> String {
    let content = "<div class=\"container\"><main class=\"not-found\"><h1>500</h1>\
                   <p>Não foi possível carregar esta página.</p></main></div>";
    render_with_layout(templates, &format!("Erro | {SITE_NAME}"), "", content)
}
