// Spaces (labeled room photos) and the point labels placed on them
use actix_multipart::Multipart;
use actix_web::{delete, get, post, web, HttpResponse};
use deadpool_postgres::Pool;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::TableNamespace;
use crate::error::ApiError;
use crate::models::{coerce_coord, CreateLabelRequest, Space, SpaceLabel, UpsertSpaceRequest};
use crate::validation;

#[derive(Debug, Deserialize)]
pub struct ListSpacesQuery {
    pub client_id: Option<String>,
}

#[get("/spaces")]
pub async fn list_spaces(
    q: web::Query<ListSpacesQuery>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let client = pool.get().await?;
    let rows = match &q.client_id {
        Some(cid) => {
            client
                .query(
                    &format!(
                        "SELECT space_id, client_id, space_name, image_url FROM {} \
                         WHERE client_id = $1 ORDER BY space_name ASC",
                        ns.table("spaces")
                    ),
                    &[cid],
                )
                .await?
        }
        None => {
            client
                .query(
                    &format!(
                        "SELECT space_id, client_id, space_name, image_url FROM {} \
                         ORDER BY client_id ASC, space_name ASC",
                        ns.table("spaces")
                    ),
                    &[],
                )
                .await?
        }
    };
    let spaces: Vec<Space> = rows.iter().map(Space::from_row).collect();
    Ok(HttpResponse::Ok().json(spaces))
}

/// Create-or-update keyed on (client_id, space_name).
#[post("/spaces")]
pub async fn upsert_space(
    payload: web::Json<UpsertSpaceRequest>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let req = payload.into_inner();
    let space_name = req
        .space_name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation("space_name is required"))?;
    if !validation::safe_text(&space_name) {
        return Err(ApiError::validation("space_name contains unsupported characters"));
    }
    let client_id = req.client_id.unwrap_or_default();
    if let Some(url) = req.image_url.as_deref().filter(|u| !u.is_empty()) {
        if !url.starts_with('/') && !validation::url(url) {
            return Err(ApiError::validation("image_url must be an http(s) URL or a local path"));
        }
    }

    let client = pool.get().await?;
    let row = client
        .query_one(
            &format!(
                "INSERT INTO {} (client_id, space_name, image_url) VALUES ($1, $2, $3) \
                 ON CONFLICT (client_id, space_name) \
                 DO UPDATE SET image_url = EXCLUDED.image_url \
                 RETURNING space_id, client_id, space_name, image_url",
                ns.table("spaces")
            ),
            &[&client_id, &space_name, &req.image_url],
        )
        .await?;
    Ok(HttpResponse::Ok().json(Space::from_row(&row)))
}

/// Multipart photo upload for a space. The file lands under the uploads
/// directory with a generated name and the space's image_url is repointed.
#[post("/spaces/{space_id}/upload")]
pub async fn upload_space_image(
    path: web::Path<i64>,
    mut payload: Multipart,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
    cfg: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let space_id = path.into_inner();
    let client = pool.get().await?;
    client
        .query_opt(
            &format!("SELECT space_id FROM {} WHERE space_id = $1", ns.table("spaces")),
            &[&space_id],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Space not found"))?;

    tokio::fs::create_dir_all(&cfg.uploads_dir).await?;

    let mut saved: Option<String> = None;
    while let Some(part) = payload.next().await {
        let mut field = part.map_err(|e| ApiError::validation(format!("Multipart error: {}", e)))?;
        if field.name() != "image" {
            continue;
        }

        let ext = field
            .content_disposition()
            .get_filename()
            .and_then(|f| f.rsplit('.').next())
            .map(|e| e.to_lowercase())
            .filter(|e| e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string());
        let filename = format!("space_{}_{}.{}", space_id, Uuid::new_v4(), ext);
        let dest = std::path::Path::new(&cfg.uploads_dir).join(&filename);

        let mut file = tokio::fs::File::create(&dest).await?;
        let mut written: usize = 0;
        while let Some(chunk) = field.next().await {
            let data =
                chunk.map_err(|e| ApiError::validation(format!("Multipart error: {}", e)))?;
            written += data.len();
            if written > cfg.max_upload_bytes {
                drop(file);
                let _ = tokio::fs::remove_file(&dest).await;
                return Err(ApiError::validation(format!(
                    "Image exceeds the {}MB upload limit",
                    cfg.max_upload_bytes / (1024 * 1024)
                )));
            }
            file.write_all(&data).await?;
        }
        file.flush().await?;
        saved = Some(format!("/uploads/{}", filename));
        break;
    }

    let image_url = saved.ok_or_else(|| ApiError::validation("No image field in upload"))?;
    client
        .execute(
            &format!("UPDATE {} SET image_url = $1 WHERE space_id = $2", ns.table("spaces")),
            &[&image_url, &space_id],
        )
        .await?;
    tracing::info!("📦 Stored space image: {}", image_url);

    Ok(HttpResponse::Ok().json(json!({
        "space_id": space_id,
        "image_url": image_url,
    })))
}

#[get("/spaces/{space_id}/labels")]
pub async fn list_labels(
    path: web::Path<i64>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let space_id = path.into_inner();
    let client = pool.get().await?;
    let rows = client
        .query(
            &format!(
                "SELECT l.label_id, l.space_id, l.item_id, l.x_percent, l.y_percent, \
                 l.label_text, \
                 i.line_number AS item_line_number, i.description AS item_description, \
                 i.brand AS item_brand, i.model AS item_model \
                 FROM {} l LEFT JOIN {} i ON i.id = l.item_id \
                 WHERE l.space_id = $1 ORDER BY l.label_id ASC",
                ns.table("space_labels"),
                ns.table("inventory_items")
            ),
            &[&space_id],
        )
        .await?;
    let labels: Vec<SpaceLabel> = rows.iter().map(SpaceLabel::from_row).collect();
    Ok(HttpResponse::Ok().json(labels))
}

#[post("/spaces/{space_id}/labels")]
pub async fn create_label(
    path: web::Path<i64>,
    payload: web::Json<CreateLabelRequest>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let space_id = path.into_inner();
    let req = payload.into_inner();

    let x = coerce_coord(&req.x_percent)
        .ok_or_else(|| ApiError::validation("x_percent must be a number"))?;
    let y = coerce_coord(&req.y_percent)
        .ok_or_else(|| ApiError::validation("y_percent must be a number"))?;
    if !validation::percent(x) || !validation::percent(y) {
        return Err(ApiError::validation("Coordinates must be between 0 and 100"));
    }

    let client = pool.get().await?;
    client
        .query_opt(
            &format!("SELECT space_id FROM {} WHERE space_id = $1", ns.table("spaces")),
            &[&space_id],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Space not found"))?;

    if let Some(item_id) = req.item_id {
        client
            .query_opt(
                &format!(
                    "SELECT id FROM {} WHERE id = $1",
                    ns.table("inventory_items")
                ),
                &[&item_id],
            )
            .await?
            .ok_or_else(|| ApiError::not_found("Item not found"))?;
    }

    let row = client
        .query_one(
            &format!(
                "INSERT INTO {} (space_id, item_id, x_percent, y_percent, label_text) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING label_id, space_id, item_id, x_percent, y_percent, label_text",
                ns.table("space_labels")
            ),
            &[&space_id, &req.item_id, &x, &y, &req.label_text],
        )
        .await?;
    Ok(HttpResponse::Ok().json(SpaceLabel::from_row(&row)))
}

#[delete("/labels/{label_id}")]
pub async fn delete_label(
    path: web::Path<i64>,
    pool: web::Data<Pool>,
    ns: web::Data<TableNamespace>,
) -> Result<HttpResponse, ApiError> {
    let label_id = path.into_inner();
    let client = pool.get().await?;
    let row = client
        .query_opt(
            &format!(
                "DELETE FROM {} WHERE label_id = $1 RETURNING label_id",
                ns.table("space_labels")
            ),
            &[&label_id],
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Label not found"))?;
    let deleted: i64 = row.get("label_id");
    Ok(HttpResponse::Ok().json(json!({ "status": "success", "label_id": deleted })))
}
