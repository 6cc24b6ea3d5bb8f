/**
 * Restaurant Routes
 * Public listing with free-text search, single fetch, and creation
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
    models::{NewRestaurant, Restaurant},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str =
    "id, name, description, location, category, cuisine, images, is_active, created_at";

#[derive(Debug, Deserialize)]
pub struct RestaurantListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub category: Option<String>,
    pub cuisine: Option<String>,
    pub search: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantListResponse {
    pub restaurants: Vec<Restaurant>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// Append the public-visibility filter plus whatever the caller asked for.
/// `search` becomes a case-insensitive substring match over
/// name/description/location, ANDed with the other predicates.
fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a RestaurantListQuery) {
    qb.push(" WHERE is_active = true");
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(cuisine) = &query.cuisine {
        qb.push(" AND cuisine = ").push_bind(cuisine);
    }
    if let Some(search) = &query.search {
        let term = search.trim();
        if !term.is_empty() {
            let pattern = format!("%{}%", term);
            qb.push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR location ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }
}

/// GET /api/restaurants
pub async fn list_restaurants(Query(query): Query<RestaurantListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM restaurants");
    push_filters(&mut count_qb, &query);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting restaurants: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM restaurants", COLUMNS));
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb
        .build_query_as::<Restaurant>()
        .fetch_all(pool.as_ref())
        .await
    {
        Ok(restaurants) => (
            StatusCode::OK,
            Json(RestaurantListResponse {
                restaurants,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing restaurants: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/restaurants/{id}
/// An inactive restaurant answers the same 404 as a missing one.
pub async fn get_restaurant(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Restaurant>(&format!(
        "SELECT {} FROM restaurants WHERE id = $1 AND is_active = true",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(restaurant)) => (StatusCode::OK, Json(restaurant)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching restaurant {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

/// POST /api/restaurants
pub async fn create_restaurant(Json(payload): Json<NewRestaurant>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("name", &payload.name);
    v.require_max_len("name", &payload.name, 200);
    v.require_non_empty("description", &payload.description);
    v.require_non_empty("location", &payload.location);
    v.require_non_empty("category", &payload.category);
    v.require_non_empty("cuisine", &payload.cuisine);
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Restaurant>(&format!(
        r#"
        INSERT INTO restaurants (name, description, location, category, cuisine, images, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(&payload.location)
    .bind(&payload.category)
    .bind(&payload.cuisine)
    .bind(&payload.images)
    .bind(payload.is_active.unwrap_or(true))
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(restaurant) => (StatusCode::CREATED, Json(restaurant)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating restaurant: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn test_list_query_defaults() {
        let query: RestaurantListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 10);
        assert!(query.search.is_none());
    }

    #[tokio::test]
    async fn test_list_without_pool_returns_service_unavailable() {
        let app = Router::new().route("/api/restaurants", get(list_restaurants));
        let res = app
            .oneshot(
                Request::get("/api/restaurants?page=2&limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_create_missing_fields_returns_field_errors() {
        let app = Router::new().route("/api/restaurants", post(create_restaurant));
        let body = serde_json::json!({
            "name": "",
            "description": "d",
            "location": "",
            "category": "cafe",
            "cuisine": "sunda"
        });
        let res = app
            .oneshot(
                Request::post("/api/restaurants")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let fields: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["field"].as_str().unwrap())
            .collect();
        assert_eq!(fields, vec!["name", "location"]);
    }
}
