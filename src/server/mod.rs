//! HTTP front end.
//!
//! | Route | Handler |
//! |-------|---------|
//! | `GET /mw?q=` | middleware search page |
//! | `GET /mw/:name` | middleware package page |
//! | anything else | static asset, then markdown page, then 404 |

mod pages;
mod routes;

use axum::extract::{ConnectInfo, Request};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::context::SiteContext;
use crate::error::Error;

/// Builds the application router over a shared context.
pub fn router(ctx: Arc<SiteContext>) -> Router {
    Router::new()
        .route("/mw", get(routes::search))
        .route("/mw/:name", get(routes::package))
        .fallback(pages::fall_through)
        .layer(middleware::from_fn(log_request))
        .with_state(ctx)
}

/// Binds `0.0.0.0:<port>` and serves until Ctrl-C.
pub async fn serve(ctx: Arc<SiteContext>) -> crate::Result<()> {
    let port = ctx.config().port;
    let mode = ctx.config().mode;
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;

    info!("Running on http://localhost:{} in {} mode", port, mode);

    axum::serve(
        listener,
        router(ctx).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Logs one line per request: client address, method, path, status, latency.
async fn log_request(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(request).await;

    info!(
        "{} {} {} {} {}ms",
        ip,
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND.into_response(),
            err => {
                if err.is_upstream_failure() {
                    error!("Upstream failure: {}", err);
                } else {
                    error!("Request failed: {}", err);
                }
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
