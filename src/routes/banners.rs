/**
 * Banner Routes
 * Homepage banners, filtered to their activation window
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
    models::{Banner, NewBanner},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str =
    "id, title, image, link, is_active, starts_at, ends_at, sort_order, created_at";

#[derive(Debug, Deserialize)]
pub struct BannerListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BannerListResponse {
    pub banners: Vec<Banner>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// Only banners whose activation window contains "now" are served. An absent
/// bound leaves that side of the window open.
fn push_window_filter(qb: &mut QueryBuilder<'_, Postgres>) {
    qb.push(
        " WHERE is_active = true \
         AND (starts_at IS NULL OR starts_at <= now()) \
         AND (ends_at IS NULL OR ends_at >= now())",
    );
}

/// GET /api/banners
pub async fn list_banners(Query(query): Query<BannerListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM banners");
    push_window_filter(&mut count_qb);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting banners: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM banners", COLUMNS));
    push_window_filter(&mut qb);
    qb.push(" ORDER BY sort_order ASC, created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb.build_query_as::<Banner>().fetch_all(pool.as_ref()).await {
        Ok(banners) => (
            StatusCode::OK,
            Json(BannerListResponse {
                banners,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing banners: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/banners/{id}
pub async fn get_banner(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM banners", COLUMNS));
    push_window_filter(&mut qb);
    qb.push(" AND id = ").push_bind(id);

    match qb
        .build_query_as::<Banner>()
        .fetch_optional(pool.as_ref())
        .await
    {
        Ok(Some(banner)) => (StatusCode::OK, Json(banner)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching banner {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

/// POST /api/banners
pub async fn create_banner(Json(payload): Json<NewBanner>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("title", &payload.title);
    v.require_max_len("title", &payload.title, 200);
    v.require_non_empty("image", &payload.image);
    if let (Some(starts), Some(ends)) = (payload.starts_at, payload.ends_at) {
        if ends < starts {
            v.push("endsAt", "endsAt must not be before startsAt");
        }
    }
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Banner>(&format!(
        r#"
        INSERT INTO banners (title, image, link, is_active, starts_at, ends_at, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.title.trim())
    .bind(&payload.image)
    .bind(&payload.link)
    .bind(payload.is_active.unwrap_or(true))
    .bind(payload.starts_at)
    .bind(payload.ends_at)
    .bind(payload.sort_order.unwrap_or(0))
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(banner) => (StatusCode::CREATED, Json(banner)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating banner: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_inverted_window_is_a_violation() {
        let now = Utc::now();
        let mut v = Violations::new();
        if let (Some(starts), Some(ends)) = (Some(now), Some(now - Duration::hours(1))) {
            if ends < starts {
                v.push("endsAt", "endsAt must not be before startsAt");
            }
        }
        assert_eq!(v.into_result().unwrap_err().field_count(), 1);
    }

    #[test]
    fn test_list_query_defaults() {
        let query: BannerListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 20);
    }
}
