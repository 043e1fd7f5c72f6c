// src/lightspeed.rs - Lightspeed POS integration
//
// Token state lives on an injectable TokenManager rather than a module
// global, so tests and the OAuth callback can swap tokens without touching
// process state. Redundant concurrent refreshes are tolerated; the last
// writer wins.
use chrono::{DateTime, NaiveDate, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::LightspeedConfig;
use crate::error::ApiError;
use crate::time::{business_day, day_span};

/// Upper bound on continuation-cursor follows per request, so a misbehaving
/// upstream cannot keep the handler looping.
pub const MAX_SALE_PAGES: usize = 50;

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

pub struct TokenManager {
    cfg: LightspeedConfig,
    state: RwLock<TokenState>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
}

impl TokenManager {
    pub fn new(cfg: LightspeedConfig) -> Self {
        let state = TokenState {
            access_token: None,
            refresh_token: cfg.refresh_token.clone(),
        };
        Self {
            cfg,
            state: RwLock::new(state),
        }
    }

    /// A currently-usable bearer token, refreshing if none is cached.
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        if let Some(token) = self.state.read().await.access_token.clone() {
            return Ok(token);
        }
        self.refresh(http).await
    }

    /// Exchange the refresh token for a new access/refresh pair.
    pub async fn refresh(&self, http: &reqwest::Client) -> Result<String, ApiError> {
        let refresh_token = self
            .state
            .read()
            .await
            .refresh_token
            .clone()
            .ok_or_else(|| {
                ApiError::UpstreamAuth("No Lightspeed refresh token configured".into())
            })?;
        if !self.cfg.is_configured() {
            return Err(ApiError::UpstreamAuth(
                "Lightspeed client credentials not configured".into(),
            ));
        }

        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.cfg.client_id.as_str()),
            ("client_secret", self.cfg.client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
        ];
        let res = http.post(&self.cfg.token_url).form(&params).send().await?;
        if res.status() == reqwest::StatusCode::UNAUTHORIZED
            || res.status() == reqwest::StatusCode::BAD_REQUEST
        {
            return Err(ApiError::UpstreamAuth(format!(
                "Lightspeed token refresh rejected ({})",
                res.status()
            )));
        }
        let res = res.error_for_status()?;
        let tokens: TokenResponse = res.json().await?;

        let mut state = self.state.write().await;
        state.access_token = Some(tokens.access_token.clone());
        if let Some(rt) = tokens.refresh_token {
            state.refresh_token = Some(rt);
        }
        tracing::info!("Lightspeed access token refreshed");
        Ok(tokens.access_token)
    }

    /// Exchange an OAuth authorization code from /callback.
    pub async fn exchange_code(&self, http: &reqwest::Client, code: &str) -> Result<(), ApiError> {
        if !self.cfg.is_configured() {
            return Err(ApiError::UpstreamAuth(
                "Lightspeed client credentials not configured".into(),
            ));
        }
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.cfg.client_id.as_str()),
            ("client_secret", self.cfg.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.cfg.redirect_uri.as_str()),
        ];
        let res = http
            .post(&self.cfg.token_url)
            .form(&params)
            .send()
            .await?
            .error_for_status()?;
        let tokens: TokenResponse = res.json().await?;

        let mut state = self.state.write().await;
        state.access_token = Some(tokens.access_token);
        if let Some(rt) = tokens.refresh_token {
            state.refresh_token = Some(rt);
        }
        tracing::info!("Lightspeed authorization code exchanged");
        Ok(())
    }

    /// Drop the cached access token so the next call refreshes.
    pub async fn invalidate(&self) {
        self.state.write().await.access_token = None;
    }

    pub fn is_configured(&self) -> bool {
        self.cfg.is_configured()
    }

    pub fn authorize_redirect_url(&self) -> String {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        format!(
            "{}?response_type=code&client_id={}&scope=employee:all&state={}",
            self.cfg.authorize_url,
            urlencoding::encode(&self.cfg.client_id),
            state
        )
    }
}

/// One sale as the aggregator needs it.
#[derive(Debug, Clone)]
pub struct SaleRecord {
    pub completed_at: DateTime<Utc>,
    pub total: f64,
    pub cost: f64,
}

/// One output bucket per calendar day in the requested window.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DaySales {
    pub date: NaiveDate,
    pub gross: f64,
    pub cogs: f64,
    pub profit: f64,
}

pub struct SalesClient {
    http: reqwest::Client,
    tokens: std::sync::Arc<TokenManager>,
    cfg: LightspeedConfig,
}

impl SalesClient {
    pub fn new(
        http: reqwest::Client,
        tokens: std::sync::Arc<TokenManager>,
        cfg: LightspeedConfig,
    ) -> Self {
        Self { http, tokens, cfg }
    }

    /// All sales completed inside [start, end] business days, following the
    /// upstream continuation cursor until exhausted or MAX_SALE_PAGES.
    pub async fn fetch_sales(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        tz_offset_hours: i32,
    ) -> Result<Vec<SaleRecord>, ApiError> {
        let offset = crate::time::business_offset(tz_offset_hours);
        let window_start = start
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_local_timezone(offset)
            .unwrap();
        let window_end = end
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_local_timezone(offset)
            .unwrap();

        let first_url = format!(
            "{}/API/V3/Account/{}/Sale.json?completed=true&completeTime={}",
            self.cfg.api_base,
            self.cfg.account_id,
            urlencoding::encode(&format!(
                "><,{},{}",
                window_start.to_rfc3339(),
                window_end.to_rfc3339()
            )),
        );

        let mut records = Vec::new();
        let mut next_url = Some(first_url);
        let mut pages = 0usize;

        while let Some(url) = next_url.take() {
            if pages >= MAX_SALE_PAGES {
                crate::logging::log_warning(&format!(
                    "sales pagination cut off after {} pages",
                    MAX_SALE_PAGES
                ));
                break;
            }
            pages += 1;

            let body = self.get_with_auth(&url).await?;
            let (mut page_records, next) = parse_sales_page(&body);
            records.append(&mut page_records);
            next_url = next;
        }

        Ok(records)
    }

    /// GET with bearer auth; on 401, refresh once and retry the request
    /// exactly once.
    async fn get_with_auth(&self, url: &str) -> Result<Value, ApiError> {
        let token = self.tokens.access_token(&self.http).await?;
        let res = self.http.get(url).bearer_auth(&token).send().await?;

        let res = if res.status() == reqwest::StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
            let token = self.tokens.refresh(&self.http).await?;
            let retry = self.http.get(url).bearer_auth(&token).send().await?;
            if retry.status() == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ApiError::UpstreamAuth(
                    "Lightspeed rejected the refreshed token".into(),
                ));
            }
            retry
        } else {
            res
        };

        let res = res.error_for_status()?;
        Ok(res.json().await?)
    }
}

/// Pull the sale records and continuation URL out of one response page.
///
/// The upstream returns `Sale` as an array, a bare object for a single
/// result, or nothing at all; `@attributes.next` is an absolute URL, empty
/// when the cursor is exhausted.
pub fn parse_sales_page(body: &Value) -> (Vec<SaleRecord>, Option<String>) {
    let mut records = Vec::new();

    let sales = match body.get("Sale") {
        Some(Value::Array(arr)) => arr.iter().collect::<Vec<_>>(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    };
    for sale in sales {
        let Some(completed_at) = sale
            .get("completeTime")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
        else {
            continue;
        };
        records.push(SaleRecord {
            completed_at,
            total: money(sale.get("calcTotal")),
            cost: money(sale.get("calcFIFOCost")),
        });
    }

    let next = body
        .get("@attributes")
        .and_then(|a| a.get("next"))
        .and_then(|n| n.as_str())
        .filter(|s| !s.is_empty())
        .filter(|s| url::Url::parse(s).is_ok())
        .map(|s| s.to_string());

    (records, next)
}

/// Monetary fields arrive as strings or numbers; missing means zero.
fn money(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Reduce fetched sales into one bucket per calendar day in [start, end].
/// Days with no sales stay in the output, zero-filled.
pub fn aggregate_daily(
    records: &[SaleRecord],
    start: NaiveDate,
    end: NaiveDate,
    tz_offset_hours: i32,
) -> Vec<DaySales> {
    let mut buckets: Vec<DaySales> = day_span(start, end)
        .into_iter()
        .map(|date| DaySales {
            date,
            gross: 0.0,
            cogs: 0.0,
            profit: 0.0,
        })
        .collect();

    for rec in records {
        let day = business_day(rec.completed_at, tz_offset_hours);
        if let Some(bucket) = buckets.iter_mut().find(|b| b.date == day) {
            bucket.gross += rec.total;
            bucket.cogs += rec.cost;
        }
    }
    for bucket in &mut buckets {
        bucket.profit = bucket.gross - bucket.cogs;
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn rec(ts: &str, total: f64, cost: f64) -> SaleRecord {
        SaleRecord {
            completed_at: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            total,
            cost,
        }
    }

    #[test]
    fn test_parse_sales_page_array_and_cursor() {
        let body = json!({
            "@attributes": {"count": "2", "next": "https://api/next-page"},
            "Sale": [
                {"completeTime": "2025-03-08T15:30:00+00:00", "calcTotal": "120.50", "calcFIFOCost": "80.00"},
                {"completeTime": "2025-03-09T10:00:00+00:00", "calcTotal": 30.0}
            ]
        });
        let (records, next) = parse_sales_page(&body);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].total, 120.50);
        assert_eq!(records[0].cost, 80.0);
        // missing cost defaults to zero
        assert_eq!(records[1].cost, 0.0);
        assert_eq!(next.as_deref(), Some("https://api/next-page"));
    }

    #[test]
    fn test_parse_sales_page_single_object_and_end_of_cursor() {
        let body = json!({
            "@attributes": {"count": "1", "next": ""},
            "Sale": {"completeTime": "2025-03-08T15:30:00+00:00", "calcTotal": "10"}
        });
        let (records, next) = parse_sales_page(&body);
        assert_eq!(records.len(), 1);
        assert!(next.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_cursor() {
        let body = json!({
            "@attributes": {"next": "not a url"},
            "Sale": []
        });
        let (_, next) = parse_sales_page(&body);
        assert!(next.is_none());
    }

    #[test]
    fn test_parse_sales_page_empty() {
        let (records, next) = parse_sales_page(&json!({"@attributes": {"count": "0"}}));
        assert!(records.is_empty());
        assert!(next.is_none());
    }

    #[test]
    fn test_parse_skips_records_without_complete_time() {
        let body = json!({"Sale": [{"calcTotal": "10"}]});
        let (records, _) = parse_sales_page(&body);
        assert!(records.is_empty());
    }

    #[test]
    fn test_aggregate_zero_fills_every_day() {
        let records = vec![rec("2025-03-05T12:00:00Z", 100.0, 60.0)];
        let buckets = aggregate_daily(&records, d("2025-03-04"), d("2025-03-10"), 0);
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[0].date, d("2025-03-04"));
        assert_eq!(buckets[0].gross, 0.0);
        assert_eq!(buckets[1].gross, 100.0);
        assert_eq!(buckets[1].profit, 40.0);
        assert_eq!(buckets[6].date, d("2025-03-10"));
    }

    #[test]
    fn test_aggregate_sums_same_day_sales() {
        let records = vec![
            rec("2025-03-05T12:00:00Z", 100.0, 60.0),
            rec("2025-03-05T18:00:00Z", 50.0, 10.0),
        ];
        let buckets = aggregate_daily(&records, d("2025-03-05"), d("2025-03-05"), 0);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].gross, 150.0);
        assert_eq!(buckets[0].cogs, 70.0);
        assert_eq!(buckets[0].profit, 80.0);
    }

    #[test]
    fn test_aggregate_buckets_in_business_timezone() {
        // 02:00 UTC lands on the previous business day at UTC-5
        let records = vec![rec("2025-03-06T02:00:00Z", 25.0, 5.0)];
        let buckets = aggregate_daily(&records, d("2025-03-05"), d("2025-03-06"), -5);
        assert_eq!(buckets[0].gross, 25.0);
        assert_eq!(buckets[1].gross, 0.0);
    }

    #[tokio::test]
    async fn test_refresh_without_token_fails_as_not_authenticated() {
        let manager = TokenManager::new(LightspeedConfig {
            client_id: "abc".into(),
            client_secret: "def".into(),
            ..Default::default()
        });
        let http = reqwest::Client::new();
        match manager.access_token(&http).await {
            Err(ApiError::UpstreamAuth(_)) => {}
            other => panic!("expected UpstreamAuth, got {:?}", other.map(|_| ())),
        }
    }
}
