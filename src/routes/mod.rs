/**
 * Routes Module
 * API route handlers
 */
use axum::{http::StatusCode, Json};
use serde::Serialize;

pub mod attractions;
pub mod auth;
pub mod banners;
pub mod contacts;
pub mod evaluations;
pub mod events;
pub mod health;
pub mod highlights;
pub mod news;
pub mod packages;
pub mod research;
pub mod restaurants;
pub mod souvenirs;
pub mod stories;
pub mod upload;

/// Error body shared by every route.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }
}

pub(crate) fn not_found() -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found")))
}

pub(crate) fn db_unavailable() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse::new("Database not available")),
    )
}

pub(crate) fn internal_error() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Internal server error")),
    )
}

/// Hard ceiling on page size, applied to every list endpoint.
pub(crate) const MAX_PAGE_SIZE: i64 = 100;

/// Clamp the requested window and return `(page, limit, offset)`.
pub(crate) fn page_window(page: i64, limit: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1) * limit)
}

/// `ceil(total / limit)` for the pagination envelope.
pub(crate) fn total_pages(total: i64, limit: i64) -> i64 {
    if limit <= 0 {
        return 0;
    }
    (total + limit - 1) / limit
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window_defaults_pass_through() {
        assert_eq!(page_window(1, 10), (1, 10, 0));
        assert_eq!(page_window(3, 6), (3, 6, 12));
    }

    #[test]
    fn test_page_window_clamps_bad_input() {
        assert_eq!(page_window(0, 10), (1, 10, 0));
        assert_eq!(page_window(-5, 0), (1, 1, 0));
        assert_eq!(page_window(2, 10_000), (2, MAX_PAGE_SIZE, MAX_PAGE_SIZE));
    }

    #[test]
    fn test_total_pages_is_ceil() {
        assert_eq!(total_pages(0, 6), 0);
        assert_eq!(total_pages(6, 6), 1);
        assert_eq!(total_pages(7, 6), 2);
        assert_eq!(total_pages(13, 6), 3);
    }
}
