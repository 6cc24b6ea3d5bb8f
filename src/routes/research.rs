/**
 * Research Routes
 * Published research papers with year and category filtering
 */
use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{
    self,
    models::{NewResearchPaper, ResearchPaper},
};
use crate::routes::{db_unavailable, internal_error, not_found, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str = "id, title, authors, abstract_text, pdf_file, year, category, \
     is_active, sort_order, created_at";

const MIN_YEAR: i32 = 1900;

/// Papers may be dated slightly ahead for in-press publications.
fn max_year() -> i32 {
    Utc::now().year() + 5
}

#[derive(Debug, Deserialize)]
pub struct ResearchListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub category: Option<String>,
    pub year: Option<i32>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchListResponse {
    pub research: Vec<ResearchPaper>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a ResearchListQuery) {
    qb.push(" WHERE is_active = true");
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category);
    }
    if let Some(year) = query.year {
        qb.push(" AND year = ").push_bind(year);
    }
}

/// GET /api/research
pub async fn list_research(Query(query): Query<ResearchListQuery>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM research_papers");
    push_filters(&mut count_qb, &query);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting research papers: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM research_papers", COLUMNS));
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY sort_order ASC, created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb
        .build_query_as::<ResearchPaper>()
        .fetch_all(pool.as_ref())
        .await
    {
        Ok(research) => (
            StatusCode::OK,
            Json(ResearchListResponse {
                research,
                total,
                total_pages: total_pages(total, limit),
                current_page: page,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database error listing research papers: {}", e);
            internal_error().into_response()
        }
    }
}

/// GET /api/research/{id}
pub async fn get_research(Path(id): Path<Uuid>) -> impl IntoResponse {
    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, ResearchPaper>(&format!(
        "SELECT {} FROM research_papers WHERE id = $1 AND is_active = true",
        COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool.as_ref())
    .await
    {
        Ok(Some(paper)) => (StatusCode::OK, Json(paper)).into_response(),
        Ok(None) => not_found().into_response(),
        Err(e) => {
            tracing::error!("Database error fetching research paper {}: {}", id, e);
            internal_error().into_response()
        }
    }
}

/// POST /api/research
pub async fn create_research(Json(payload): Json<NewResearchPaper>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("title", &payload.title);
    v.require_max_len("title", &payload.title, 300);
    v.require_non_empty("pdfFile", &payload.pdf_file);
    v.require_non_empty("category", &payload.category);
    v.require_range_i64("year", payload.year as i64, MIN_YEAR as i64, max_year() as i64);
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, ResearchPaper>(&format!(
        r#"
        INSERT INTO research_papers
            (title, authors, abstract_text, pdf_file, year, category, is_active, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.title.trim())
    .bind(&payload.authors)
    .bind(&payload.abstract_text)
    .bind(&payload.pdf_file)
    .bind(payload.year)
    .bind(&payload.category)
    .bind(payload.is_active.unwrap_or(true))
    .bind(payload.sort_order.unwrap_or(0))
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(paper) => (StatusCode::CREATED, Json(paper)).into_response(),
        Err(e) => {
            tracing::error!("Database error creating research paper: {}", e);
            internal_error().into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_bounds() {
        let mut v = Violations::new();
        v.require_range_i64("year", 1899, MIN_YEAR as i64, max_year() as i64);
        assert!(v.into_result().is_err());

        let mut v = Violations::new();
        v.require_range_i64("year", max_year() as i64 + 1, MIN_YEAR as i64, max_year() as i64);
        assert!(v.into_result().is_err());

        let mut v = Violations::new();
        v.require_range_i64("year", Utc::now().year() as i64, MIN_YEAR as i64, max_year() as i64);
        assert!(v.into_result().is_ok());
    }

    #[test]
    fn test_abstract_roundtrips_under_its_json_name() {
        let payload: NewResearchPaper = serde_json::from_value(serde_json::json!({
            "title": "Dampak Ekowisata",
            "authors": ["A. Putri"],
            "abstract": "ringkasan",
            "pdfFile": "/uploads/research-paper-1.pdf",
            "year": 2024,
            "category": "ekowisata"
        }))
        .unwrap();
        assert_eq!(payload.abstract_text.as_deref(), Some("ringkasan"));
    }
}
