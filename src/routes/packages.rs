/**
 * Tour Package Routes
 * Packages reference attractions and restaurants by id; responses embed a
 * summary of each referenced entity in place of the raw id list
 */
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::{
    self,
    models::{NewTourPackage, TourPackage},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str = "id, name, description, price, duration_days, attractions, restaurants, \
     activities, is_active, created_at";

#[derive(Debug, Deserialize)]
pub struct PackageListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    6
}

/// Compact view of an attraction embedded in a package response.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttractionSummary {
    pub id: Uuid,
    pub name: String,
    pub location: String,
}

/// Compact view of a restaurant embedded in a package response.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantSummary {
    pub id: Uuid,
    pub name: String,
    pub location: String,
    pub cuisine: String,
}

/// A tour package with its references resolved. Ids that no longer resolve
/// (the referenced row was deleted) are silently dropped from the lists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedPackage {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub duration_days: i32,
    pub attractions: Vec<AttractionSummary>,
    pub restaurants: Vec<RestaurantSummary>,
    pub activities: Vec<String>,
    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageListResponse {
    pub packages: Vec<PopulatedPackage>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// Resolve every referenced attraction and restaurant in one query each,
/// then stitch the summaries back onto the packages in reference order.
async fn populate(
    pool: &PgPool,
    packages: Vec<TourPackage>,
) -> Result<Vec<PopulatedPackage>, sqlx::Error> {
    let attraction_ids: Vec<Uuid> = packages
        .iter()
        .flat_map(|p| p.attractions.iter().copied())
        .collect();
    let restaurant_ids: Vec<Uuid> = packages
        .iter()
        .flat_map(|p| p.restaurants.iter().copied())
        .collect();

    let attractions: HashMap<Uuid, AttractionSummary> = if attraction_ids.is_empty() {
        HashMap::new()
    } else {
        sqlx::query_as::<_, AttractionSummary>(
            "SELECT id, name, location FROM attractions WHERE id = ANY($1)",
        )
        .bind(&attraction_ids)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect()
    };

    let restaurants: HashMap<Uuid, RestaurantSummary> = if restaurant_ids.is_empty() {
        HashMap::new()
    } else {
        sqlx::query_as::<_, RestaurantSummary>(
            "SELECT id, name, location, cuisine FROM restaurants WHERE id = ANY($1)",
        )
        .bind(&restaurant_ids)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|r| (r.id, r))
        .collect()
    };

    Ok(packages
        .into_iter()
        .map(|p| PopulatedPackage {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            duration_days: p.duration_days,
            attractions: p
                .attractions
                .iter()
                .filter_map(|id| attractions.get(id).cloned())
                .collect(),
            restaurants: p
                .restaurants
                .iter()
                .filter_map(|id| restaurants.get(id).cloned())
                .collect(),
            activities: p.activities,
            is_active: p.is_active,
            created_at: p.created_at,
        })
        .collect())
}

/// GET /api/packages
pub async fn list_packages(Query(query): Query<PackageListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let total: i64 = match sqlx::query_scalar(
        "SELECT COUNT(*) FROM tour_packages WHERE is_active = true",
    )
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting tour packages: {}", e);
            return internal_error().into_response();
        }
    };

    let packages = match sqlx::query_as::<_, TourPackage>(&format!(
        "SELECT {} FROM tour_packages WHERE is_active = true \
         ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("Database error listing tour packages: {}", e);
            return internal_error().into_response();
        }
    };

    match populate(pool.as_ref(), packages).await {
        Ok(packages) => (
            StatusCode::OK,
            Json(PackageListResponse {
                packages,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error resolving package references: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/packages/{id}
pub async fn get_package(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let package = match sqlx::query_as::<_, TourPackage>(&format!(
        "SELECT {} FROM tour_packages WHERE id = $1 AND is_active = true",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(p)) => p,
        Ok(None) => return not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching tour package {}: {}", id, e);
            return internal_error().into_response();
        }
    };

    match populate(pool.as_ref(), vec![package]).await {
        Ok(mut populated) => match populated.pop() {
            Some(package) => (StatusCode::OK, Json(package)).into_response(),
            None => not_found().into_response(),
        },
        Err(e) => {
            tracing::error!("Database error resolving package references: {}", e);
            internal_error().into_response()
        }
    }
}

/// POST /api/packages
pub async fn create_package(Json(payload): Json<NewTourPackage>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("name", &payload.name);
    v.require_max_len("name", &payload.name, 200);
    v.require_non_empty("description", &payload.description);
    if payload.price.unwrap_or(0) < 0 {
        v.push("price", "price must not be negative");
    }
    if payload.duration_days.unwrap_or(1) < 1 {
        v.push("durationDays", "durationDays must be at least 1");
    }
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, TourPackage>(&format!(
        r#"
        INSERT INTO tour_packages
            (name, description, price, duration_days, attractions, restaurants, activities, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.name.trim())
    .bind(&payload.description)
    .bind(payload.price.unwrap_or(0))
    .bind(payload.duration_days.unwrap_or(1))
    .bind(&payload.attractions)
    .bind(&payload.restaurants)
    .bind(&payload.activities)
    .bind(payload.is_active.unwrap_or(true))
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(package) => (StatusCode::CREATED, Json(package)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating tour package: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_duration_is_a_violation() {
        let mut v = Violations::new();
        if 0i32 < 1 {
            v.push("durationDays", "durationDays must be at least 1");
        }
        assert_eq!(v.into_result().unwrap_err().field_count(), 1);
    }

    #[test]
    fn test_populated_package_serializes_summaries() {
        let package = PopulatedPackage {
            id: Uuid::new_v4(),
            name: "Paket Bromo 3D2N".into(),
            description: "Jelajah Bromo".into(),
            price: 1_500_000,
            duration_days: 3,
            attractions: vec![AttractionSummary {
                id: Uuid::new_v4(),
                name: "Gunung Bromo".into(),
                location: "Probolinggo".into(),
            }],
            restaurants: vec![],
            activities: vec!["sunrise tour".into()],
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&package).unwrap();
        assert_eq!(json["attractions"][0]["name"], "Gunung Bromo");
        assert_eq!(json["durationDays"], 3);
    }

    #[test]
    fn test_list_query_defaults() {
        let query: PackageListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.limit, 6);
    }
}
