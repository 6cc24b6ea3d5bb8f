/**
 * Souvenir Routes
 * Curated souvenir catalogue
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
    models::{NewSouvenir, Souvenir},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str =
    "id, name, description, images, price, category, is_active, sort_order, created_at";

#[derive(Debug, Deserialize)]
pub struct SouvenirListQuery {
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
    12
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SouvenirListResponse {
    pub souvenirs: Vec<Souvenir>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a SouvenirListQuery) {
    qb.push(" WHERE is_active = true");
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category);
    }
}

/// GET /api/souvenirs
pub async fn list_souvenirs(Query(query): Query<SouvenirListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM souvenirs");
    push_filters(&mut count_qb, &query);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting souvenirs: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM souvenirs", COLUMNS));
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY sort_order ASC, created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb
        .build_query_as::<Souvenir>()
        .fetch_all(pool.as_ref())
        .await
    {
        Ok(souvenirs) => (
            StatusCode::OK,
            Json(SouvenirListResponse {
                souvenirs,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing souvenirs: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/souvenirs/{id}
pub async fn get_souvenir(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Souvenir>(&format!(
        "SELECT {} FROM souvenirs WHERE id = $1 AND is_active = true",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(souvenir)) => (StatusCode::OK, Json(souvenir)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching souvenir {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

/// POST /api/souvenirs
pub async fn create_souvenir(Json(payload): Json<NewSouvenir>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("name", &payload.name);
    v.require_max_len("name", &payload.name, 200);
    v.require_non_empty("description", &payload.description);
    v.require_non_empty("category", &payload.category);
    if payload.price < 0 {
        v.push("price", "price must not be negative");
    }
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Souvenir>(&format!(
        r#"
        INSERT INTO souvenirs (name, description, images, price, category, is_active, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(&payload.images)
    .bind(payload.price)
    .bind(&payload.category)
    .bind(payload.is_active.unwrap_or(true))
    .bind(payload.sort_order.unwrap_or(0))
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(souvenir) => (StatusCode::CREATED, Json(souvenir)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating souvenir: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_price_is_a_violation() {
        let mut v = Violations::new();
        if -500i64 < 0 {
            v.push("price", "price must not be negative");
        }
        assert!(v.into_result().is_err());
    }

    #[test]
    fn test_list_query_defaults() {
        let query: SouvenirListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 12);
    }
}
