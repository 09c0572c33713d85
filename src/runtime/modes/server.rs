//! Server mode
//!
//! Configures and starts the HTTP server with all routes.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    http::{Method, header},
    middleware::Compress,
};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::api::middleware::RequestIdMiddleware;
use crate::api::services::{api_routes, health_routes};
use crate::runtime::lifetime;

/// 只允许 `app.base_url` 同源的跨域请求，并携带 Cookie
fn build_cors_middleware(base_url: &str) -> Cors {
    let allowed = base_url.trim_end_matches('/').to_string();

    Cors::default()
        .allowed_origin_fn(move |origin, _req_head| {
            origin
                .to_str()
                .map(|o| o.trim_end_matches('/') == allowed)
                .unwrap_or(false)
        })
        .allowed_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers(vec![header::HeaderName::from_static("x-request-id")])
        .supports_credentials()
        .max_age(3600)
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup()
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let config = crate::config::get_config();
    let services = startup.services;
    let refresher = startup.refresher;

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let base_url = config.app.base_url.clone();
    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        let services = services.clone();
        App::new()
            .wrap(build_cors_middleware(&base_url))
            .wrap(Compress::default())
            .wrap(RequestIdMiddleware)
            .configure(|cfg| services.register(cfg))
            .service(api_routes())
            .service(health_routes())
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(config.server.client_request_timeout))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .shutdown_timeout(config.server.shutdown_timeout)
    .workers(cpu_count)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?;

    info!("Starting server at http://{}", bind_address);
    let server = server.run();

    tokio::select! {
        res = server => {
            res?;
            lifetime::shutdown::drain(&refresher, config.server.shutdown_timeout).await;
        }
        _ = lifetime::shutdown::listen_for_shutdown(refresher.clone(), config.server.shutdown_timeout) => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}
