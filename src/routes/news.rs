/**
 * News Routes
 * Published-only temporal feed, sorted by publication time
 */
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{
    self,
    models::{NewNews, News},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str =
    "id, title, link, category, excerpt, image, is_published, published_at, created_at";

#[derive(Debug, Deserialize)]
pub struct NewsListQuery {
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
    6
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsListResponse {
    pub news: Vec<News>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a NewsListQuery) {
    qb.push(" WHERE is_published = true");
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category);
    }
}

/// GET /api/news
pub async fn list_news(Query(query): Query<NewsListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM news");
    push_filters(&mut count_qb, &query);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting news: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM news", COLUMNS));
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY published_at DESC NULLS LAST LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb.build_query_as::<News>().fetch_all(pool.as_ref()).await {
        Ok(news) => (
            StatusCode::OK,
            Json(NewsListResponse {
                news,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing news: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/news/{id}
/// Unpublished items answer the same 404 as missing ones.
pub async fn get_news(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, News>(&format!(
        "SELECT {} FROM news WHERE id = $1 AND is_published = true",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(item)) => (StatusCode::OK, Json(item)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching news {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

/// POST /api/news
pub async fn create_news(Json(payload): Json<NewNews>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("title", &payload.title);
    v.require_max_len("title", &payload.title, 300);
    v.require_non_empty("link", &payload.link);
    v.require_non_empty("category", &payload.category);
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let is_published = payload.is_published.unwrap_or(false);
    // Publishing without an explicit timestamp stamps it now.
    let published_at = payload
        .published_at
        .or_else(|| is_published.then(Utc::now));

    match sqlx::query_as::<_, News>(&format!(
        r#"
        INSERT INTO news (title, link, category, excerpt, image, is_published, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.title.trim())
    .bind(&payload.link)
    .bind(&payload.category)
    .bind(&payload.excerpt)
    .bind(&payload.image)
    .bind(is_published)
    .bind(published_at)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating news: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults() {
        let query: NewsListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 6);
    }

    #[test]
    fn test_create_payload_requires_core_fields() {
        let payload: NewNews = serde_json::from_value(serde_json::json!({
            "title": " ",
            "link": "",
            "category": "wisata"
        }))
        .unwrap();
        let mut v = Violations::new();
        v.require_non_empty("title", &payload.title);
        v.require_non_empty("link", &payload.link);
        v.require_non_empty("category", &payload.category);
        let err = v.into_result().unwrap_err();
        let rendered = format!("{:?}", err);
        assert!(rendered.contains("title"));
        assert!(rendered.contains("link"));
    }
}
