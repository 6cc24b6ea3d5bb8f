/**
 * Attraction Routes
 * Read-only surface: paginated listing and single fetch
 */
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{self, models::Attraction};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};

const COLUMNS: &str = "id, name, location, description, media, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct AttractionListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttractionListResponse {
    pub attractions: Vec<Attraction>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// GET /api/attractions
pub async fn list_attractions(Query(query): Query<AttractionListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let total: i64 = match sqlx::query_scalar("SELECT COUNT(*) FROM attractions")
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting attractions: {}", e);
            return internal_error().into_response();
        }
    };

    match sqlx::query_as::<_, Attraction>(&format!(
        "SELECT {} FROM attractions ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(attractions) => (
            StatusCode::OK,
            Json(AttractionListResponse {
                attractions,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing attractions: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/attractions/{id}
pub async fn get_attraction(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Attraction>(&format!(
        "SELECT {} FROM attractions WHERE id = $1",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(attraction)) => (StatusCode::OK, Json(attraction)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching attraction {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_get_with_malformed_id_is_rejected() {
        let app = Router::new().route("/api/attractions/{id}", get(get_attraction));
        let res = app
            .oneshot(
                Request::get("/api/attractions/not-a-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_without_pool_returns_service_unavailable() {
        let app = Router::new().route("/api/attractions", get(list_attractions));
        let res = app
            .oneshot(Request::get("/api/attractions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
