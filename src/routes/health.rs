// Health check endpoints
use actix_web::{get, web, HttpResponse, Result};
use deadpool_postgres::Pool;

use crate::time;
use crate::types::HealthResponse;

#[get("/healthz")]
pub async fn healthz() -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        time: time::now(),
        version: option_env!("CARGO_PKG_VERSION").map(|s| s.to_string()),
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Mounted under /api; also pings the database so the dashboard can tell
/// "server up, database down" from "all good".
#[get("/health")]
pub async fn health(pool: web::Data<Pool>) -> Result<HttpResponse> {
    let db_ok = match pool.get().await {
        Ok(client) => client.simple_query("SELECT 1").await.is_ok(),
        Err(_) => false,
    };
    let response = HealthResponse {
        status: if db_ok { "ok" } else { "degraded" }.to_string(),
        time: time::now(),
        version: option_env!("CARGO_PKG_VERSION").map(|s| s.to_string()),
    };
    Ok(HttpResponse::Ok().json(response))
}
