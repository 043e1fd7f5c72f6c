// Shared type definitions
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Response wrappers
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ItemsPage<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

/// Derive the 1-based page number and page count from limit/offset math.
pub fn page_numbers(total: i64, limit: i64, offset: i64) -> (i64, i64) {
    let limit = limit.max(1);
    let page = offset / limit + 1;
    let pages = (total + limit - 1) / limit;
    (page, pages)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ImportResponse {
    pub status: String,
    pub imported: u64,
}

// ============================================================================
// Health check response
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

// ============================================================================
// Error response
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_numbers() {
        // 95 rows, 25 per page
        assert_eq!(page_numbers(95, 25, 0), (1, 4));
        assert_eq!(page_numbers(95, 25, 25), (2, 4));
        assert_eq!(page_numbers(95, 25, 75), (4, 4));
        // exact multiple
        assert_eq!(page_numbers(100, 25, 0), (1, 4));
        // empty table
        assert_eq!(page_numbers(0, 25, 0), (1, 0));
    }

    #[test]
    fn test_page_numbers_guards_zero_limit() {
        let (page, pages) = page_numbers(10, 0, 0);
        assert_eq!(page, 1);
        assert_eq!(pages, 10);
    }

    #[test]
    fn test_error_response_shape() {
        let body = serde_json::to_value(ErrorResponse::new("not_found", "Item not found")).unwrap();
        assert_eq!(body["error"]["code"], "not_found");
        assert_eq!(body["error"]["message"], "Item not found");
    }
}
