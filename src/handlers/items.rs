// Inventory CRUD endpoints and the edit-history ledger
use actix_web::{delete, get, post, web, HttpResponse};
use deadpool_postgres::Pool;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use tokio_postgres::types::ToSql;

use crate::config::AppConfig;
use crate::db::TableNamespace;
use crate::error::ApiError;
use crate::import;
use crate::models::{
    editable_column, extended_rcv, CreateItemRequest, InventoryEdit, InventoryItem,
    RecordEditRequest, TotalsResponse, ITEM_COLUMNS, STATUS_OPEN,
};
use crate::types::{page_numbers, ImportResponse, ItemsPage};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub search: Option<String>,
    pub status: Option<i16>,
    pub room: Option<String>,
}

/// Filter shared by the list and export endpoints. Owns the parameter
/// values so the numbered placeholders and the bind slice stay in sync.
pub struct ItemFilter {
    search_pat: Option<String>,
    status: Option<i16>,
    room: Option<String>,
}

impl ItemFilter {
    pub fn new(search: Option<String>, status: Option<i16>, room: Option<String>) -> Self {
        Self {
            search_pat: search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .map(|s| format!("%{}%", s)),
            status,
            room: room.filter(|r| !r.trim().is_empty()),
        }
    }

    pub fn where_clause(&self) -> String {
        let mut sql = String::from(" WHERE 1=1");
        let mut n = 0;
        if self.search_pat.is_some() {
            n += 1;
            sql.push_str(&format!(
                " AND (description ILIKE ${n} OR brand ILIKE ${n} OR model ILIKE ${n} \
                 OR room_area ILIKE ${n} OR notes ILIKE ${n})",
                n = n
            ));
        }
        if self.status.is_some() {
            n += 1;
            sql.push_str(&format!(" AND status = ${}", n));
        }
        if self.room.is_some() {
            n += 1;
            sql.push_str(&format!(" AND room_area = ${}", n));
        }
        sql
    }

    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        let mut p: Vec<&(dyn ToSql + Sync)> = Vec::new();
        if let Some(s) = &self.search_pat {
            p.push(s);
        }
        if let Some(s) = &self.status {
            p.push(s);
        }
        if let Some(r) = &self.room {
            p.push(r);
        }
        p
    }
}

#[get("/items")]
pub async fn list_items(
    q: web::Query<ListItemsQuery>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let q = q.into_inner();
    let limit = q.limit.unwrap_or(25).clamp(1, 500);
    let offset = q.offset.unwrap_or(0).max(0);
    let filter = ItemFilter::new(q.search, q.status, q.room);

    let client = pool.get().await?;
    let base_sql = format!("FROM {}{}", ns.table("inventory_items"), filter.where_clause());

    let count_row = client
        .query_one(&format!("SELECT COUNT(*) AS total {}", base_sql), &filter.params())
        .await?;
    let total: i64 = count_row.get("total");

    let mut params = filter.params();
    let data_sql = format!(
        "SELECT {} {} ORDER BY line_number ASC LIMIT ${} OFFSET ${}",
        ITEM_COLUMNS,
        base_sql,
        params.len() + 1,
        params.len() + 2,
    );
    params.push(&limit);
    params.push(&offset);
    let rows = client.query(&data_sql, &params).await?;

    let items: Vec<InventoryItem> = rows.iter().map(InventoryItem::from_row).collect();
    let (page, pages) = page_numbers(total, limit, offset);
    Ok(HttpResponse::Ok().json(ItemsPage {
        items,
        total,
        page,
        pages,
    }))
}

#[get("/items/{line_number}")]
pub async fn get_item(
    path: web::Path<i64>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let line_number = path.into_inner();
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                "SELECT {} FROM {} WHERE line_number = $1",
                ITEM_COLUMNS,
                ns.table("inventory_items")
            ),
            &[&line_number],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    Ok(HttpResponse::Ok().json(InventoryItem::from_row(&row)))
}

#[post("/items")]
pub async fn create_item(
    payload: web::Json<CreateItemRequest>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let status = req.status.unwrap_or(STATUS_OPEN);
    if !validation::status_code(status) {
        return Err(ApiError::validation(format!("Unknown status code: {}", status)));
    }
    if let Some(link) = req.source_link.as_deref().filter(|s| !s.is_empty()) {
        if !validation::url(link) {
            return Err(ApiError::validation("source_link must be an http(s) URL"));
        }
    }

    let client = pool.get().await?;
    let line_number = match req.line_number {
        Some(n) => n,
        None => {
            let row = client
                .query_one(
                    &format!(
                        "SELECT COALESCE(MAX(line_number), 0) + 1 AS next FROM {}",
                        ns.table("inventory_items")
                    ),
                    &[],
                )
                .await?;
            row.get("next")
        }
    };
    // derived server-side, whatever the caller sent
    let ext = extended_rcv(req.quantity, req.unit_rcv);

    let row = client
        .query_one(
            &format!(
                "INSERT INTO {} \
                 (line_number, client_id, room_area, quantity, description, brand, model, \
                  unit_rcv, extended_rcv, acv_percent, acv, source_link, notes, status) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14) \
                 RETURNING {}",
                ns.table("inventory_items"),
                ITEM_COLUMNS
            ),
            &[
                &line_number,
                &req.client_id,
                &req.room_area,
                &req.quantity,
                &req.description,
                &req.brand,
                &req.model,
                &req.unit_rcv,
                &ext,
                &req.acv_percent,
                &req.acv,
                &req.source_link,
                &req.notes,
                &status,
            ],
        )
        .await?;
    Ok(HttpResponse::Ok().json(InventoryItem::from_row(&row)))
}

#[delete("/items/{line_number}")]
pub async fn delete_item(
    path: web::Path<i64>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let line_number = path.into_inner();
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                "DELETE FROM {} WHERE line_number = $1 RETURNING {}",
                ns.table("inventory_items"),
                ITEM_COLUMNS
            ),
            &[&line_number],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    Ok(HttpResponse::Ok().json(InventoryItem::from_row(&row)))
}

/// Append a ledger row and apply the new value to the live column, in one
/// transaction so the ledger can never record an edit that did not land.
#[post("/items/{line_number}/edit")]
pub async fn record_edit(
    path: web::Path<i64>,
    payload: web::Json<RecordEditRequest>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let line_number = path.into_inner();
    let req = payload.into_inner();

    let (column, sql_type) = editable_column(&req.field_name)
        .ok_or_else(|| ApiError::validation(format!("Unknown field: {}", req.field_name)))?;
    check_edit_value(column, sql_type, req.new_value.as_deref())?;

    let mut client = pool.get().await?;
    let tx = client.transaction().await?;

    let row = tx
        .query_opt(
            &format!(
                "SELECT id FROM {} WHERE line_number = $1",
                ns.table("inventory_items")
            ),
            &[&line_number],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    let item_id: i64 = row.get("id");

    tx.execute(
        &format!(
            "INSERT INTO {} (item_id, field_name, old_value, new_value, edited_by) \
             VALUES ($1, $2, $3, $4, $5)",
            ns.table("inventory_edits")
        ),
        &[
            &item_id,
            &column,
            &req.old_value,
            &req.new_value,
            &req.edited_by,
        ],
    )
    .await?;

    // column and sql_type come from the allow-list, never from the request
    let update_sql = if sql_type == "TEXT" {
        format!(
            "UPDATE {} SET {} = $1, last_edit_date = now() WHERE id = $2",
            ns.table("inventory_items"),
            column
        )
    } else {
        format!(
            "UPDATE {} SET {} = CAST(NULLIF($1, '') AS {}), last_edit_date = now() WHERE id = $2",
            ns.table("inventory_items"),
            column,
            sql_type
        )
    };
    // the ledger keeps the value as sent; the cast sees it trimmed
    let update_value = if sql_type == "TEXT" {
        req.new_value.clone()
    } else {
        req.new_value.as_deref().map(str::trim).map(str::to_string)
    };
    tx.execute(&update_sql, &[&update_value, &item_id]).await?;
    tx.commit().await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "item_id": item_id,
        "field_name": column,
    })))
}

#[get("/items/{line_number}/edits")]
pub async fn list_edits(
    path: web::Path<i64>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let line_number = path.into_inner();
    let client = pool.get().await?;
    let item_id = resolve_item_id(&client, &ns, line_number).await?;

    let rows = client
        .query(
            &format!(
                "SELECT edit_id, item_id, field_name, old_value, new_value, edited_by, edited_at \
                 FROM {} WHERE item_id = $1 ORDER BY edited_at DESC, edit_id DESC",
                ns.table("inventory_edits")
            ),
            &[&item_id],
        )
        .await?;
    let edits: Vec<InventoryEdit> = rows.iter().map(InventoryEdit::from_row).collect();
    Ok(HttpResponse::Ok().json(edits))
}

/// The live item plus, per ever-edited field, only the most recent edit.
#[get("/items/{line_number}/compare")]
pub async fn compare_item(
    path: web::Path<i64>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let line_number = path.into_inner();
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                "SELECT {} FROM {} WHERE line_number = $1",
                ITEM_COLUMNS,
                ns.table("inventory_items")
            ),
            &[&line_number],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    let item = InventoryItem::from_row(&row);

    let rows = client
        .query(
            &format!(
                "SELECT DISTINCT ON (field_name) \
                 edit_id, item_id, field_name, old_value, new_value, edited_by, edited_at \
                 FROM {} WHERE item_id = $1 \
                 ORDER BY field_name, edited_at DESC, edit_id DESC",
                ns.table("inventory_edits")
            ),
            &[&item.id],
        )
        .await?;

    let mut edits: HashMap<String, InventoryEdit> = HashMap::new();
    for row in &rows {
        let edit = InventoryEdit::from_row(row);
        edits.insert(edit.field_name.clone(), edit);
    }

    Ok(HttpResponse::Ok().json(json!({ "item": item, "edits": edits })))
}

/// First-match location label for an item's detail view.
#[get("/items/{line_number}/label")]
pub async fn item_label(
    path: web::Path<i64>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let line_number = path.into_inner();
    let client = pool.get().await?;
    let item_id = resolve_item_id(&client, &ns, line_number).await?;

    let row = client
        .query_opt(
            &format!(
                "SELECT l.label_id, l.space_id, l.item_id, l.x_percent, l.y_percent, \
                 l.label_text, s.space_name, s.image_url \
                 FROM {} l JOIN {} s ON s.space_id = l.space_id \
                 WHERE l.item_id = $1 ORDER BY l.label_id ASC LIMIT 1",
                ns.table("space_labels"),
                ns.table("spaces")
            ),
            &[&item_id],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("No label for this item"))?;

    Ok(HttpResponse::Ok().json(json!({
        "label_id": row.get::<_, i64>("label_id"),
        "space_id": row.get::<_, i64>("space_id"),
        "item_id": row.get::<_, Option<i64>>("item_id"),
        "x_percent": row.get::<_, f64>("x_percent"),
        "y_percent": row.get::<_, f64>("y_percent"),
        "label_text": row.get::<_, Option<String>>("label_text"),
        "space_name": row.get::<_, String>("space_name"),
        "image_url": row.get::<_, Option<String>>("image_url"),
    })))
}

/// Running valuation for a client: original RCV and the edited variant.
#[get("/clients/{client_id}/totalrcv")]
pub async fn client_totals(
    path: web::Path<String>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let client_id = path.into_inner();
    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!(
                "SELECT \
                 COALESCE(SUM(quantity * unit_rcv), 0) AS original_total, \
                 COALESCE(SUM(quantity * COALESCE(edited_unit_rcv, unit_rcv)), 0) AS edited_total \
                 FROM {} WHERE client_id = $1",
                ns.table("inventory_items")
            ),
            &[&client_id],
        )
        .await?;
    Ok(HttpResponse::Ok().json(TotalsResponse {
        client_id,
        original_total: row.get("original_total"),
        edited_total: row.get("edited_total"),
    }))
}

/// Truncate-and-reload from the configured server-side CSV.
#[post("/import")]
pub async fn import_csv(
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
    cfg: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let imported = import::import_items(&pool, &ns, &cfg.csv_import_path).await?;
    Ok(HttpResponse::Ok().json(ImportResponse {
        status: "success".into(),
        imported,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub search: Option<String>,
}

#[get("/export/items")]
pub async fn export_items(
    q: web::Query<ExportQuery>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let filter = ItemFilter::new(q.into_inner().search, None, None);
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT {} FROM {}{} ORDER BY line_number ASC",
                ITEM_COLUMNS,
                ns.table("inventory_items"),
                filter.where_clause()
            ),
            &filter.params(),
        )
        .await?;
    let items: Vec<InventoryItem> = rows.iter().map(InventoryItem::from_row).collect();
    let body = import::items_to_csv(&items)?;
    crate::logging::log_table_operation("export", "inventory_items", Some(items.len()), true);
    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            "attachment; filename=\"inventory_items.csv\"",
        ))
        .body(body))
}

/// Reject values the column CAST would choke on, so bad input surfaces as a
/// 400 before the ledger transaction starts. Empty strings become NULL for
/// the numeric columns; `status` is NOT NULL and must stay a known code.
fn check_edit_value(
    column: &str,
    sql_type: &str,
    new_value: Option<&str>,
) -> Result<(), ApiError> {
    let trimmed = new_value.map(str::trim).filter(|v| !v.is_empty());
    match sql_type {
        "DOUBLE PRECISION" => {
            if let Some(v) = trimmed {
                v.parse::<f64>().map_err(|_| {
                    ApiError::validation(format!("{} must be a number, got '{}'", column, v))
                })?;
            }
        }
        "SMALLINT" => {
            let v = trimmed
                .ok_or_else(|| ApiError::validation(format!("{} requires a value", column)))?;
            let code: i16 = v.parse().map_err(|_| {
                ApiError::validation(format!("{} must be a status code, got '{}'", column, v))
            })?;
            if !validation::status_code(code) {
                return Err(ApiError::validation(format!("Unknown status code: {}", code)));
            }
        }
        _ => {}
    }
    Ok(())
}

async fn resolve_item_id(
    client: &deadpool_postgres::Client,
    ns: &TableNamespace,
    line_number: i64,
) -> Result<i64, ApiError> {
    let row = client
        .query_opt(
            &format!(
                "SELECT id FROM {} WHERE line_number = $1",
                ns.table("inventory_items")
            ),
            &[&line_number],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;
    Ok(row.get("id"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_numbers_placeholders_in_order() {
        let f = ItemFilter::new(Some("sofa".into()), Some(1), Some("Living Room".into()));
        let sql = f.where_clause();
        assert!(sql.contains("description ILIKE $1"));
        assert!(sql.contains("status = $2"));
        assert!(sql.contains("room_area = $3"));
        assert_eq!(f.params().len(), 3);
    }

    #[test]
    fn test_filter_skips_blank_search() {
        let f = ItemFilter::new(Some("   ".into()), None, None);
        assert_eq!(f.where_clause(), " WHERE 1=1");
        assert!(f.params().is_empty());
    }

    #[test]
    fn test_filter_status_only() {
        let f = ItemFilter::new(None, Some(50), None);
        assert!(f.where_clause().contains("status = $1"));
        assert_eq!(f.params().len(), 1);
    }

    #[test]
    fn test_edit_value_numeric_must_parse() {
        assert!(check_edit_value("quantity", "DOUBLE PRECISION", Some("3.5")).is_ok());
        assert!(check_edit_value("quantity", "DOUBLE PRECISION", Some(" 42 ")).is_ok());
        assert!(check_edit_value("quantity", "DOUBLE PRECISION", Some("abc")).is_err());
        assert!(check_edit_value("unit_rcv", "DOUBLE PRECISION", Some("$12")).is_err());
    }

    #[test]
    fn test_edit_value_empty_clears_numeric_columns() {
        assert!(check_edit_value("quantity", "DOUBLE PRECISION", Some("")).is_ok());
        assert!(check_edit_value("quantity", "DOUBLE PRECISION", Some("   ")).is_ok());
        assert!(check_edit_value("quantity", "DOUBLE PRECISION", None).is_ok());
    }

    #[test]
    fn test_edit_value_status_stays_known_and_non_null() {
        assert!(check_edit_value("status", "SMALLINT", Some("50")).is_ok());
        assert!(check_edit_value("status", "SMALLINT", Some("")).is_err());
        assert!(check_edit_value("status", "SMALLINT", None).is_err());
        assert!(check_edit_value("status", "SMALLINT", Some("2")).is_err());
        assert!(check_edit_value("status", "SMALLINT", Some("open")).is_err());
    }

    #[test]
    fn test_edit_value_text_unrestricted() {
        assert!(check_edit_value("notes", "TEXT", Some("any text at all")).is_ok());
        assert!(check_edit_value("notes", "TEXT", None).is_ok());
    }
}
