use std::sync::Arc;

use crate::pagination::PageFetcher;
use crate::site::Site;
use crate::templates::Templates;

pub struct AppState {
    pub pages: Arc<dyn PageFetcher>,
    pub templates: Templates,
    /// Upper bound for `?pages=` on the listing.
    pub max_pages: usize,
}

#[derive(Clone)]
pub struct RouterState {
    pub app_state: Arc<AppState>,
    pub site: Arc<Site>,
}

impl axum::extract::FromRef<RouterState> for Arc<AppState> {
    fn from_ref(state: &RouterState) -> Self {
        state.app_state.clone()
    }
}

impl axum::extract::FromRef<RouterState> for Arc<Site> {
    fn from_ref(state: &RouterState) -> Self {
        state.site.clone()
    }
}
