pub use crate::common::RouteResult;

use axum::{http::Method, routing::get_service, Router};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracking::{client::Client, database::Database};

pub mod api;
pub mod common;
pub mod config;
pub mod hateoas;
pub mod middleware;

use config::WebConfig;

#[derive(Clone)]
pub struct WebState<D: Database> {
    pub tracking_client: Client<D>,
}

/// The complete application: the api, the static front end and the layers
/// shared by both.
pub fn app<D: Database>(state: WebState<D>, config: &WebConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(config.client_url.clone())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(static_content_router(config))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

/// Serves until ctrl-c is received.
pub async fn start_web_server<D: Database>(
    state: WebState<D>,
    config: WebConfig,
) -> std::io::Result<()> {
    let routes = app(state, &config);

    let listener = TcpListener::bind(config.bind_address).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, routes.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("web server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(why) = tokio::signal::ctrl_c().await {
        log::error!("could not listen for ctrl-c: {}", why);
        std::future::pending::<()>().await;
    }
    log::info!("shutting down");
}

fn static_content_router(config: &WebConfig) -> Router {
    Router::new().nest_service(
        "/",
        get_service(
            ServeDir::new(&config.static_dir)
                .not_found_service(ServeFile::new(config.not_found_page())),
        ),
    )
}
