/**
 * Contact Routes
 * Public contact form submission and the admin-only inbox
 */
use axum::{
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};

use crate::db::{
    self,
    models::{Contact, ContactStatus, NewContact},
};
use crate::routes::{db_unavailable, internal_error, page_window, total_pages};
use crate::routes::auth::require_admin;
use crate::validation::Violations;

const COLUMNS: &str = "id, name, email, subject, message, status, created_at";

#[derive(Debug, Deserialize)]
pub struct ContactListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<ContactStatus>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactListResponse {
    pub contacts: Vec<Contact>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a ContactListQuery) {
    if let Some(status) = query.status {
        qb.push(" WHERE status = ").push_bind(status);
    }
}

/// POST /api/contacts - public, no authentication.
pub async fn create_contact(Json(payload): Json<NewContact>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("name", &payload.name);
    v.require_max_len("name", &payload.name, 100);
    v.require_email("email", &payload.email);
    v.require_non_empty("subject", &payload.subject);
    v.require_max_len("subject", &payload.subject, 200);
    v.require_non_empty("message", &payload.message);
    v.require_max_len("message", &payload.message, 5000);
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Contact>(&format!(
        r#"
        INSERT INTO contacts (name, email, subject, message, status)
        VALUES ($1, $2, $3, $4, 'new')
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.name.trim())
    .bind(payload.email.trim())
    .bind(payload.subject.trim())
    .bind(&payload.message)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(contact) => {
            tracing::info!("Contact message received from {}", contact.email);
            (StatusCode::CREATED, Json(contact)).into_response()
        }
        Err(e) => {
            tracing::error!("Database error creating contact message: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/contacts - admin-only inbox, newest first.
pub async fn list_contacts(
    headers: HeaderMap,
    Query(query): Query<ContactListQuery>,
) -> impl IntoResponse {
    if let Err(rejection) = require_admin(&headers) {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM contacts");
    push_filters(&mut count_qb, &query);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting contact messages: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM contacts", COLUMNS));
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb
        .build_query_as::<Contact>()
        .fetch_all(pool.as_ref())
        .await
    {
        Ok(contacts) => (
            StatusCode::OK,
            Json(ContactListResponse {
                contacts,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing contact messages: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn contact_router() -> Router {
        Router::new().route("/api/contacts", post(create_contact).get(list_contacts))
    }

    #[tokio::test]
    async fn test_submission_with_bad_email_collects_violation() {
        let req = Request::post("/api/contacts")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "name": "Budi",
                    "email": "not-an-email",
                    "subject": "Halo",
                    "message": "Pertanyaan tentang paket wisata"
                })
                .to_string(),
            ))
            .unwrap();
        let res = contact_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Validation failed");
        assert_eq!(body["details"][0]["field"], "email");
    }

    #[tokio::test]
    async fn test_inbox_requires_admin_token() {
        let req = Request::get("/api/contacts").body(Body::empty()).unwrap();
        let res = contact_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_status_filter_parses_lowercase() {
        let query: ContactListQuery =
            serde_json::from_str("{\"status\":\"replied\"}").unwrap();
        assert_eq!(query.status, Some(ContactStatus::Replied));
        assert_eq!(query.limit, 20);
    }
}
