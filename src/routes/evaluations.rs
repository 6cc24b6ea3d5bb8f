/**
 * Evaluation Routes
 * Visitor ratings attached to attractions, restaurants, packages, or events
 */
use axum::{
    extract::Query,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::{
    self,
    models::{Evaluation, EvaluationRow, EvaluationTarget, NewEvaluation},
};
use crate::routes::{db_unavailable, internal_error, page_window, total_pages};
use crate::validation::Violations;

const COLUMNS: &str =
    "id, user_id, target_type, target_id, rating, comment, images, created_at";

const MIN_RATING: i16 = 1;
const MAX_RATING: i16 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub target_type: Option<String>,
    pub target_id: Option<Uuid>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationListResponse {
    pub evaluations: Vec<Evaluation>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, query: &'a EvaluationListQuery) {
    qb.push(" WHERE 1=1");
    if let Some(target_type) = &query.target_type {
        qb.push(" AND target_type = ").push_bind(target_type);
    }
    if let Some(target_id) = query.target_id {
        qb.push(" AND target_id = ").push_bind(target_id);
    }
}

/// GET /api/evaluations
pub async fn list_evaluations(Query(query): Query<EvaluationListQuery>) -> impl IntoResponse {
    if let Some(kind) = &query.target_type {
        if EvaluationTarget::from_parts(kind, Uuid::nil()).is_none() {
            let mut v = Violations::new();
            v.push("targetType", format!("unknown target type '{}'", kind));
            if let Err(rejection) = v.into_result() {
                return rejection.into_response();
            }
        }
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    let (page, limit, offset) = page_window(query.page, query.limit);

    let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM evaluations");
    push_filters(&mut count_qb, &query);
    let total: i64 = match count_qb
        .build_query_scalar()
        .fetch_one(pool.as_ref())
        .await
    {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Database error counting evaluations: {}", e);
            return internal_error().into_response();
        }
    };

    let mut qb = QueryBuilder::new(format!("SELECT {} FROM evaluations", COLUMNS));
    push_filters(&mut qb, &query);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);

    match qb
        .build_query_as::<EvaluationRow>()
        .fetch_all(pool.as_ref())
        .await
    {
        Ok(rows) => {
            let evaluations: Vec<Evaluation> = rows
                .into_iter()
                .filter_map(|row| {
                    let id = row.id;
                    let kind = row.target_type.clone();
                    let evaluation = row.into_evaluation();
                    if evaluation.is_none() {
                        tracing::warn!(
                            "Skipping evaluation {} with unknown target type '{}'",
                            id,
                            kind
                        );
                    }
                    evaluation
                })
                .collect();
            (
                StatusCode::OK,
                Json(EvaluationListResponse {
                    evaluations,
                    total,
                    total_pages: total_pages(total, limit),
                    current_page: page,
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Database error listing evaluations: {}", e);
            internal_error().into_response()
        }
    }
}

/// POST /api/evaluations
pub async fn create_evaluation(Json(payload): Json<NewEvaluation>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_range_i64(
        "rating",
        payload.rating as i64,
        MIN_RATING as i64,
        MAX_RATING as i64,
    );
    if let Some(comment) = &payload.comment {
        v.require_max_len("comment", comment, 2000);
    }
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return db_unavailable().into_response(),
    };

    match sqlx::query_as::<_, EvaluationRow>(&format!(
        r#"
        INSERT INTO evaluations (user_id, target_type, target_id, rating, comment, images)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        COLUMNS
    ))
    .bind(payload.user_id)
    .bind(payload.target.kind())
    .bind(payload.target.id())
    .bind(payload.rating)
    .bind(&payload.comment)
    .bind(&payload.images)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(row) => match row.into_evaluation() {
            Some(evaluation) => (StatusCode::CREATED, Json(evaluation)).into_response(),
            None => internal_error().into_response(),
        },
        Err(e) => {
            tracing::error!("Database error creating evaluation: {}", e);
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

    #[tokio::test]
    async fn test_out_of_range_rating_is_rejected_before_db() {
        let app = Router::new().route("/api/evaluations", post(create_evaluation));
        let req = Request::post("/api/evaluations")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "userId": Uuid::new_v4(),
                    "targetType": "attraction",
                    "targetId": Uuid::new_v4(),
                    "rating": 6
                })
                .to_string(),
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["details"][0]["field"], "rating");
    }

    #[tokio::test]
    async fn test_unknown_target_type_fails_to_deserialize() {
        let app = Router::new().route("/api/evaluations", post(create_evaluation));
        let req = Request::post("/api/evaluations")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({
                    "userId": Uuid::new_v4(),
                    "targetType": "hotel",
                    "targetId": Uuid::new_v4(),
                    "rating": 4
                })
                .to_string(),
            ))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        // The tagged enum has no "hotel" variant, so axum rejects the body.
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_payload_target_flattens_from_wire_fields() {
        let id = Uuid::new_v4();
        let payload: NewEvaluation = serde_json::from_value(serde_json::json!({
            "userId": Uuid::new_v4(),
            "targetType": "package",
            "targetId": id,
            "rating": 5,
            "comment": "Luar biasa"
        }))
        .unwrap();
        assert_eq!(payload.target, EvaluationTarget::Package(id));
    }

    #[test]
    fn test_list_query_rejects_unknown_kind() {
        assert!(EvaluationTarget::from_parts("hotel", Uuid::nil()).is_none());
    }
}
