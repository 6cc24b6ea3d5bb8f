/**
 * Highlight Routes
 * Curated video highlights, ordered by the editorial sort key
 */
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{
    self,
    models::{Highlight, NewHighlight},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str =
    "id, title, thumbnail, video_url, category, sort_order, is_active, created_at";

#[derive(Debug, Deserialize)]
pub struct HighlightListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub category: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    8
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightListResponse {
    pub highlights: Vec<Highlight>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a HighlightListQuery) {
    qb.push(" WHERE is_active = true");
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category);
    }
}

/// GET /api/highlights
pub async fn list_highlights(Query(query): Query<HighlightListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM highlights");
    push_filters(&mut count_qb, &query);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting highlights: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM highlights", COLUMNS));
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY sort_order ASC, created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb
        .build_query_as::<Highlight>()
        .fetch_all(pool.as_ref())
        .await
    {
        Ok(highlights) => (
            StatusCode::OK,
            Json(HighlightListResponse {
                highlights,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing highlights: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/highlights/{id}
pub async fn get_highlight(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Highlight>(&format!(
        "SELECT {} FROM highlights WHERE id = $1 AND is_active = true",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(highlight)) => (StatusCode::OK, Json(highlight)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching highlight {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

/// POST /api/highlights
pub async fn create_highlight(Json(payload): Json<NewHighlight>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("title", &payload.title);
    v.require_max_len("title", &payload.title, 200);
    v.require_non_empty("thumbnail", &payload.thumbnail);
    v.require_non_empty("videoUrl", &payload.video_url);
    v.require_non_empty("category", &payload.category);
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Highlight>(&format!(
        r#"
        INSERT INTO highlights (title, thumbnail, video_url, category, sort_order, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.title.trim())
    .bind(&payload.thumbnail)
    .bind(&payload.video_url)
    .bind(&payload.category)
    .bind(payload.sort_order.unwrap_or(0))
    .bind(payload.is_active.unwrap_or(true))
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(highlight) => (StatusCode::CREATED, Json(highlight)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating highlight: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_field_maps_to_sort_order() {
        let payload: NewHighlight = serde_json::from_value(serde_json::json!({
            "title": "Sunrise di Bromo",
            "thumbnail": "/uploads/h.jpg",
            "videoUrl": "https://youtu.be/abc",
            "category": "alam",
            "order": 4
        }))
        .unwrap();
        assert_eq!(payload.sort_order, Some(4));
    }

    #[test]
    fn test_missing_video_url_is_a_violation() {
        let mut v = Violations::new();
        v.require_non_empty("videoUrl", "");
        assert_eq!(v.into_result().unwrap_err().field_count(), 1);
    }
}
