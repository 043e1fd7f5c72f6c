// src/models/item.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// One row of the contents inventory. `line_number` is the human-facing
/// identifier used by every route; `id` is the internal surrogate key the
/// edit ledger points at.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InventoryItem {
    pub id: i64,
    pub line_number: i64,
    pub client_id: Option<String>,
    pub room_area: Option<String>,
    pub quantity: Option<f64>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub unit_rcv: Option<f64>,
    pub edited_unit_rcv: Option<f64>,
    pub extended_rcv: Option<f64>,
    pub acv_percent: Option<f64>,
    pub acv: Option<f64>,
    pub source_link: Option<String>,
    pub notes: Option<String>,
    pub status: i16,
    pub last_edit_date: Option<DateTime<Utc>>,
}

/// Column list matching `InventoryItem::from_row`.
pub const ITEM_COLUMNS: &str = "id, line_number, client_id, room_area, quantity, description, \
     brand, model, unit_rcv, edited_unit_rcv, extended_rcv, acv_percent, acv, \
     source_link, notes, status, last_edit_date";

impl InventoryItem {
    pub fn from_row(row: &Row) -> Self {
        Self {
            id: row.get("id"),
            line_number: row.get("line_number"),
            client_id: row.get("client_id"),
            room_area: row.get("room_area"),
            quantity: row.get("quantity"),
            description: row.get("description"),
            brand: row.get("brand"),
            model: row.get("model"),
            unit_rcv: row.get("unit_rcv"),
            edited_unit_rcv: row.get("edited_unit_rcv"),
            extended_rcv: row.get("extended_rcv"),
            acv_percent: row.get("acv_percent"),
            acv: row.get("acv"),
            source_link: row.get("source_link"),
            notes: row.get("notes"),
            status: row.get("status"),
            last_edit_date: row.get("last_edit_date"),
        }
    }
}

/// `extended_rcv` is always derived server-side, never taken from the caller.
pub fn extended_rcv(quantity: Option<f64>, unit_rcv: Option<f64>) -> f64 {
    quantity.unwrap_or(0.0) * unit_rcv.unwrap_or(0.0)
}

pub const STATUS_OPEN: i16 = 1;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CreateItemRequest {
    pub line_number: Option<i64>,
    pub client_id: Option<String>,
    pub room_area: Option<String>,
    pub quantity: Option<f64>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub unit_rcv: Option<f64>,
    pub acv_percent: Option<f64>,
    pub acv: Option<f64>,
    pub source_link: Option<String>,
    pub notes: Option<String>,
    pub status: Option<i16>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InventoryEdit {
    pub edit_id: i64,
    pub item_id: i64,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub edited_by: Option<String>,
    pub edited_at: DateTime<Utc>,
}

impl InventoryEdit {
    pub fn from_row(row: &Row) -> Self {
        Self {
            edit_id: row.get("edit_id"),
            item_id: row.get("item_id"),
            field_name: row.get("field_name"),
            old_value: row.get("old_value"),
            new_value: row.get("new_value"),
            edited_by: row.get("edited_by"),
            edited_at: row.get("edited_at"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecordEditRequest {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub edited_by: Option<String>,
}

/// Columns the edit endpoint may touch, with the SQL type the ledger's text
/// value is cast to. The target column name is never taken from the request
/// verbatim; it must resolve through this list.
pub const EDITABLE_COLUMNS: &[(&str, &str)] = &[
    ("room_area", "TEXT"),
    ("quantity", "DOUBLE PRECISION"),
    ("description", "TEXT"),
    ("brand", "TEXT"),
    ("model", "TEXT"),
    ("unit_rcv", "DOUBLE PRECISION"),
    ("edited_unit_rcv", "DOUBLE PRECISION"),
    ("extended_rcv", "DOUBLE PRECISION"),
    ("acv_percent", "DOUBLE PRECISION"),
    ("acv", "DOUBLE PRECISION"),
    ("source_link", "TEXT"),
    ("notes", "TEXT"),
    ("status", "SMALLINT"),
];

pub fn editable_column(field_name: &str) -> Option<(&'static str, &'static str)> {
    EDITABLE_COLUMNS
        .iter()
        .find(|(name, _)| *name == field_name)
        .copied()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TotalsResponse {
    pub client_id: String,
    pub original_total: f64,
    pub edited_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extended_rcv_derivation() {
        assert_eq!(extended_rcv(Some(3.0), Some(10.0)), 30.0);
        assert_eq!(extended_rcv(None, Some(10.0)), 0.0);
        assert_eq!(extended_rcv(Some(3.0), None), 0.0);
    }

    #[test]
    fn test_editable_column_allow_list() {
        assert_eq!(editable_column("description"), Some(("description", "TEXT")));
        assert_eq!(
            editable_column("unit_rcv"),
            Some(("unit_rcv", "DOUBLE PRECISION"))
        );
        // surrogate/identity columns are not editable
        assert!(editable_column("id").is_none());
        assert!(editable_column("line_number").is_none());
        // injection attempts resolve to nothing
        assert!(editable_column("notes; DROP TABLE inventory_items;--").is_none());
    }
}
