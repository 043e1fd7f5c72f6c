// src/models/space.rs
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Space {
    pub space_id: i64,
    pub client_id: String,
    pub space_name: String,
    pub image_url: Option<String>,
}

impl Space {
    pub fn from_row(row: &Row) -> Self {
        Self {
            space_id: row.get("space_id"),
            client_id: row.get("client_id"),
            space_name: row.get("space_name"),
            image_url: row.get("image_url"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UpsertSpaceRequest {
    pub client_id: Option<String>,
    pub space_name: Option<String>,
    pub image_url: Option<String>,
}

/// A label joined with the descriptive fields of the item it points at,
/// as the labeler page renders them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpaceLabel {
    pub label_id: i64,
    pub space_id: i64,
    pub item_id: Option<i64>,
    pub x_percent: f64,
    pub y_percent: f64,
    pub label_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_line_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_model: Option<String>,
}

impl SpaceLabel {
    pub fn from_row(row: &Row) -> Self {
        Self {
            label_id: row.get("label_id"),
            space_id: row.get("space_id"),
            item_id: row.get("item_id"),
            x_percent: row.get("x_percent"),
            y_percent: row.get("y_percent"),
            label_text: row.get("label_text"),
            item_line_number: row.try_get("item_line_number").ok().flatten(),
            item_description: row.try_get("item_description").ok().flatten(),
            item_brand: row.try_get("item_brand").ok().flatten(),
            item_model: row.try_get("item_model").ok().flatten(),
        }
    }
}

/// Coordinates arrive as string-or-number from the labeler page; they are
/// coerced before validation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateLabelRequest {
    pub item_id: Option<i64>,
    pub x_percent: serde_json::Value,
    pub y_percent: serde_json::Value,
    pub label_text: Option<String>,
}

pub fn coerce_coord(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_coord_accepts_number_and_string() {
        assert_eq!(coerce_coord(&json!(42.5)), Some(42.5));
        assert_eq!(coerce_coord(&json!("17.25")), Some(17.25));
        assert_eq!(coerce_coord(&json!(" 3 ")), Some(3.0));
        assert_eq!(coerce_coord(&json!(null)), None);
        assert_eq!(coerce_coord(&json!("abc")), None);
    }
}
