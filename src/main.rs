mod archive;
mod caption;
mod config;
mod crop;
mod db;
mod export;
mod fetch;
mod gif;
mod http;
mod model;
mod pdf;
mod sanitize;
mod social;
mod state;

use crate::config::Config;
use crate::db::Database;
use crate::fetch::ImageFetcher;
use crate::state::AppState;
use axum::http::header;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};
use tracing::info;

fn build_app(state: Arc<AppState>) -> Router {
    let max_in_flight = if state.config.max_in_flight_requests == 0 {
        usize::MAX
    } else {
        state.config.max_in_flight_requests
    };
    http::router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false)),
        )
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION]))
        .layer(ConcurrencyLimitLayer::new(max_in_flight))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    info!(
        base_url = %config.base_url,
        db_path = %config.db_path.display(),
        fetch_timeout_seconds = config.fetch_timeout_seconds,
        max_in_flight_requests = config.max_in_flight_requests,
        "startup config summary"
    );
    let db = Database::new(&config).await?;
    let fetcher = ImageFetcher::new(&config)?;
    let state = Arc::new(AppState::new(config, db, fetcher));
    let app = build_app(state.clone());

    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(address = %addr, "export service listening");
    axum::serve(listener, app).await?;
    Ok(())
}
