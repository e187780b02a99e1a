use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    routing::{get, get_service},
    Router,
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::debug;

use crate::pagination::{self, Pagination};
use crate::render::{self, DetailState};
use crate::site::{Lookup, Site};
use crate::state::{AppState, RouterState};

#[derive(Deserialize, Debug, Default)]
pub struct ListingQuery {
    /// Number of listing pages to show, counting the seed page. Anything
    /// unparsable counts as one.
    pages: Option<String>,
}

impl ListingQuery {
    fn pages(&self, max_pages: usize) -> usize {
        self.pages
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, max_pages.max(1))
    }
}

pub fn router(state: RouterState, static_dir: &FsPath) -> Router {
    let static_files = get_service(ServeDir::new(static_dir));

    Router::new()
        .route("/", get(homepage))
        .route("/post/{slug}", get(render_post))
        .nest_service("/static", static_files)
        .fallback(not_found)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

async fn homepage(
    State(state): State<Arc<AppState>>,
    State(site): State<Arc<Site>>,
    Query(query): Query<ListingQuery>,
) -> Html<String> {
    let pages = query.pages(state.max_pages);

    let mut view = Pagination::new(site.home().clone());
    while view.pages_loaded() < pages && view.can_load_more() {
        view = pagination::load_more(view, state.pages.as_ref()).await;
        if view.error().is_some() {
            break;
        }
    }
    debug!(requested = pages, loaded = view.pages_loaded(), posts = view.posts().len(), "rendering listing");

    Html(render::home(&state.templates, &view))
}

async fn render_post(
    Path(slug): Path<String>,
    State(state): State<Arc<AppState>>,
    State(site): State<Arc<Site>>,
) -> Response {
    let resolution = site.lookup(&slug).await;
    if resolution.generate {
        site.spawn_generate(slug.clone());
    }

    match resolution.lookup {
        Lookup::Ready(post) => {
            let cache = format!(
                "s-maxage={}, stale-while-revalidate",
                site.revalidate_after().as_secs()
            );
            let page = render::post(&state.templates, DetailState::Ready(&post));
            ([(header::CACHE_CONTROL, cache)], Html(page)).into_response()
        }
        Lookup::Resolving => {
            let page = render::post(&state.templates, DetailState::Resolving);
            ([(header::CACHE_CONTROL, "no-store")], Html(page)).into_response()
        }
        Lookup::NotFound => {
            let page = render::not_found(&state.templates, &format!("/post/{slug}"));
            (StatusCode::NOT_FOUND, Html(page)).into_response()
        }
        Lookup::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(render::error(&state.templates)),
        )
            .into_response(),
    }
}

async fn not_found(State(state): State<Arc<AppState>>, uri: Uri) -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(render::not_found(&state.templates, uri.path())),
    )
}
