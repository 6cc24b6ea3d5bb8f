/**
 * Event Routes
 * Temporal feed sorted by start date, with category filtering
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
    models::{Event, EventCategory, NewEvent},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str = "id, title, description, start_date, end_date, location, organizer, \
     category, tags, image, max_participants, current_participants, created_at";

#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub category: Option<EventCategory>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    9
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    pub events: Vec<Event>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &EventListQuery) {
    if let Some(category) = query.category {
        qb.push(" WHERE category = ").push_bind(category);
    }
}

/// GET /api/events
pub async fn list_events(Query(query): Query<EventListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM events");
    push_filters(&mut count_qb, &query);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting events: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM events", COLUMNS));
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY start_date ASC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb.build_query_as::<Event>().fetch_all(pool.as_ref()).await {
        Ok(events) => (
            StatusCode::OK,
            Json(EventListResponse {
                events,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing events: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/events/{id}
pub async fn get_event(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Event>(&format!("SELECT {} FROM events WHERE id = $1", COLUMNS))
        .bind(id)
        .fetch_optional(pool.as_ref())
        .await
    {
        Ok(Some(event)) => (StatusCode::OK, Json(event)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching event {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

/// POST /api/events
/// New events start with zero participants. The `current <= max` ceiling is
/// a stored counter only; no handler enforces it.
pub async fn create_event(Json(payload): Json<NewEvent>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("title", &payload.title);
    v.require_max_len("title", &payload.title, 300);
    v.require_non_empty("description", &payload.description);
    v.require_non_empty("location", &payload.location);
    v.require_non_empty("organizer", &payload.organizer);
    if let Some(end) = payload.end_date {
        if end < payload.start_date {
            v.push("endDate", "endDate must not be before startDate");
        }
    }
    if let Some(max) = payload.max_participants {
        if max < 0 {
            v.push("maxParticipants", "maxParticipants must not be negative");
        }
    }
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Event>(&format!(
        r#"
        INSERT INTO events
            (title, description, start_date, end_date, location, organizer,
             category, tags, image, max_participants, current_participants)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(&payload.location)
    .bind(&payload.organizer)
    .bind(payload.category.unwrap_or(EventCategory::Other))
    .bind(&payload.tags)
    .bind(&payload.image)
    .bind(payload.max_participants.unwrap_or(0))
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(event) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating event: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_category_parses_from_query_value() {
        let query: EventListQuery =
            serde_json::from_value(serde_json::json!({ "category": "culinary" })).unwrap();
        assert_eq!(query.category, Some(EventCategory::Culinary));
        assert_eq!(query.limit, 9);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result: Result<EventListQuery, _> =
            serde_json::from_value(serde_json::json!({ "category": "parade" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_end_before_start_is_a_violation() {
        let start = Utc::now();
        let payload = NewEvent {
            title: "Pesta Rakyat".into(),
            description: "d".into(),
            start_date: start,
            end_date: Some(start - Duration::days(1)),
            location: "Alun-alun".into(),
            organizer: "Dinas Pariwisata".into(),
            category: None,
            tags: vec![],
            image: None,
            max_participants: Some(-3),
        };
        let mut v = Violations::new();
        if let Some(end) = payload.end_date {
            if end < payload.start_date {
                v.push("endDate", "endDate must not be before startDate");
            }
        }
        if let Some(max) = payload.max_participants {
            if max < 0 {
                v.push("maxParticipants", "maxParticipants must not be negative");
            }
        }
        assert_eq!(v.into_result().unwrap_err().field_count(), 2);
    }
}
