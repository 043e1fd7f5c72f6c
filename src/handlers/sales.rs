// Sales dashboard endpoints backed by the Lightspeed POS API
use actix_web::{get, http::header, web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::lightspeed::{aggregate_daily, SalesClient, TokenManager};
use crate::time::{business_today, range_bounds};

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub range: Option<String>,
}

/// Daily gross/cogs/profit buckets for a preset window.
#[get("/sales")]
pub async fn sales_daily(
    q: web::Query<SalesQuery>,
    sales: web::Data<SalesClient>,
    cfg: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let range = q.into_inner().range.unwrap_or_else(|| "7".to_string());
    let today = business_today(cfg.business_tz_offset_hours);
    let (start, end) = range_bounds(&range, today)
        .ok_or_else(|| ApiError::validation("range must be one of: 7, 14, month"))?;

    let records = sales
        .fetch_sales(start, end, cfg.business_tz_offset_hours)
        .await?;
    let days = aggregate_daily(&records, start, end, cfg.business_tz_offset_hours);

    Ok(HttpResponse::Ok().json(json!({
        "range": range,
        "start": start,
        "end": end,
        "days": days,
    })))
}

/// Kick off the Lightspeed OAuth flow.
#[get("/login")]
pub async fn login(tokens: web::Data<TokenManager>) -> Result<HttpResponse, ApiError> {
    if !tokens.is_configured() {
        return Err(ApiError::UpstreamAuth(
            "Lightspeed client credentials not configured".into(),
        ));
    }
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, tokens.authorize_redirect_url()))
        .finish())
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

/// OAuth redirect target; trades the authorization code for tokens.
#[get("/callback")]
pub async fn callback(
    q: web::Query<CallbackQuery>,
    tokens: web::Data<TokenManager>,
    http: web::Data<reqwest::Client>,
) -> Result<HttpResponse, ApiError> {
    let code = q
        .into_inner()
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::validation("Missing authorization code"))?;
    tokens.exchange_code(&http, &code).await?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .finish())
}
