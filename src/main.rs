use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use spacetraveling::{
    config::{Config, DEFAULT_CONFIG_FILE},
    pagination::HttpPageFetcher,
    prismic::PrismicClient,
    routes,
    site::Site,
    state::{AppState, RouterState},
    templates::Templates,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var("SPACETRAVELING_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = Config::load(&config_path).context("failed to load configuration")?;
    info!(endpoint = %config.prismic.endpoint, "using content API");

    let client = PrismicClient::new(&config.prismic).context("failed to create content client")?;
    let pages = HttpPageFetcher::new(Duration::from_secs(config.prismic.timeout_secs))
        .context("failed to create page fetcher")?;
    let templates = Templates::load(config.site.templates_dir.as_deref())
        .await
        .context("failed to load templates")?;

    let site = Site::build(Arc::new(client), config.site.clone())
        .await
        .context("failed to build site from content API")?;

    let state = RouterState {
        app_state: Arc::new(AppState {
            pages: Arc::new(pages),
            templates,
            max_pages: config.site.max_pages,
        }),
        site: Arc::new(site),
    };
    let app = routes::router(state, &config.site.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "listening");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
