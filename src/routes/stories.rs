/**
 * Story Routes
 * Illustrated stories whose pages are kept unique and ordered on every save
 */
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::db::{
    self,
    models::{NewStory, Story, StoryPage},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::{ValidationRejection, Violations};

const COLUMNS: &str = "id, title, cover_image, pages, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct StoryListQuery {
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
pub struct StoryListResponse {
    pub stories: Vec<Story>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// Re-establish the page invariants before any save: page numbers must be
/// pairwise distinct, and pages are persisted in ascending page order no
/// matter how the caller submitted them.
fn normalize_pages(mut pages: Vec<StoryPage>) -> Result<Vec<StoryPage>, ValidationRejection> {
    pages.sort_by_key(|p| p.page_number);

    let mut v = Violations::new();
    for window in pages.windows(2) {
        if window[0].page_number == window[1].page_number {
            v.push(
                "pages",
                format!("duplicate page number {}", window[0].page_number),
            );
        }
    }
    v.into_result()?;

    Ok(pages)
}

/// GET /api/stories
pub async fn list_stories(Query(query): Query<StoryListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let total: i64 = match sqlx::query_scalar("SELECT COUNT(*) FROM stories")
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting stories: {}", e);
            return internal_error().into_response();
        }
    };

    match sqlx::query_as::<_, Story>(&format!(
        "SELECT {} FROM stories ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        COLUMNS
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool.as_ref())
    .await
    {
        Ok(stories) => (
            StatusCode::OK,
            Json(StoryListResponse {
                stories,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing stories: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/stories/{id}
pub async fn get_story(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Story>(&format!("SELECT {} FROM stories WHERE id = $1", COLUMNS))
        .bind(id)
        .fetch_optional(pool.as_ref())
        .await
    {
        Ok(Some(story)) => (StatusCode::OK, Json(story)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching story {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

/// POST /api/stories
pub async fn create_story(Json(payload): Json<NewStory>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("title", &payload.title);
    v.require_max_len("title", &payload.title, 200);
    for (i, page) in payload.pages.iter().enumerate() {
        if page.image.trim().is_empty() {
            v.push("pages", format!("page {} is missing an image", i + 1));
        }
    }
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pages = match normalize_pages(payload.pages) {
        Ok(pages) => pages,
        Err(rejection) => return rejection.into_response(),
    };

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, Story>(&format!(
        r#"
        INSERT INTO stories (title, cover_image, pages)
        VALUES ($1, $2, $3)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.title.trim())
    .bind(&payload.cover_image)
    .bind(SqlJson(pages))
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(story) => (StatusCode::CREATED, Json(story)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating story: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: i32) -> StoryPage {
        StoryPage {
            page_number: n,
            image: format!("/uploads/page-{}.jpg", n),
            text: String::new(),
        }
    }

    #[test]
    fn test_pages_are_sorted_regardless_of_submission_order() {
        let pages = normalize_pages(vec![page(3), page(1), page(2)]).unwrap();
        let numbers: Vec<i32> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_duplicate_page_numbers_abort_the_save() {
        let result = normalize_pages(vec![page(1), page(2), page(1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_and_single_page_stories_are_fine() {
        assert!(normalize_pages(vec![]).unwrap().is_empty());
        assert_eq!(normalize_pages(vec![page(7)]).unwrap().len(), 1);
    }
}
