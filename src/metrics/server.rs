use actix_web::{get, web, App, HttpResponse, HttpServer};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;

use super::Metrics;

// ============================================================================
// Scrape endpoint for the relay process
// ============================================================================
//
// GET /metrics - Prometheus text exposition of the workflow registry
// GET /health  - liveness with the running build's version
//
// actix-web needs its own System, so callers run this on a dedicated thread.
//
// ============================================================================

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> std::io::Result<()> {
    tracing::info!(port = port, "📊 Serving /metrics and /health");

    let metrics = web::Data::from(metrics);
    HttpServer::new(move || App::new().app_data(metrics.clone()).configure(routes))
        .workers(1)
        .disable_signals()
        .bind(("0.0.0.0", port))?
        .run()
        .await
}

/// Mounts both endpoints; expects `web::Data<Metrics>` in app data.
fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(scrape).service(health);
}

#[get("/metrics")]
async fn scrape(metrics: web::Data<Metrics>) -> HttpResponse {
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metrics.registry().gather()) {
        Ok(body) => HttpResponse::Ok().content_type(encoder.format_type()).body(body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(Health {
        status: "healthy",
        service: "order-fanout",
        version: env!("CARGO_PKG_VERSION"),
    })
}
