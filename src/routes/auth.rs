/**
 * Authentication Routes
 * JWT-based login, admin role check, and the one-time admin bootstrap
 */
use axum::{
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::{self, models::User};
use crate::routes::ErrorResponse;
use crate::validation::Violations;

lazy_static::lazy_static! {
    /// JWT secret key from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string());
}

/// Access token expiry in minutes
const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 60;

/// Minimum password length for the admin bootstrap, checked before any
/// database access.
const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // User ID
    pub email: String, // User email
    pub role: String,  // User role
    pub exp: i64,      // Expiry timestamp
    pub iat: i64,      // Issued at timestamp
}

/// Caller identity returned to the frontend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAdminResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Token helpers
// ============================================================================

fn create_access_token(
    user_id: &str,
    email: &str,
    role: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
}

/// Verify and decode an access token
pub fn verify_access_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Guard for admin-only handlers: 401 without a valid token, 403 for a
/// non-admin role.
pub(crate) fn require_admin(
    headers: &HeaderMap,
) -> Result<Claims, (StatusCode, Json<ErrorResponse>)> {
    let token = extract_bearer_token(headers).ok_or_else(|| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Authorization required")),
        )
    })?;

    let claims = verify_access_token(&token).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid or expired token")),
        )
    })?;

    if claims.role != "admin" {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Admin access required")),
        ));
    }

    Ok(claims)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(Json(payload): Json<LoginRequest>) -> impl IntoResponse {
    if payload.email.is_empty() || payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse {
                success: false,
                user: None,
                access_token: None,
                error: Some("Email and password are required".to_string()),
            }),
        );
    }

    if !payload.email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse {
                success: false,
                user: None,
                access_token: None,
                error: Some("Invalid email format".to_string()),
            }),
        );
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(LoginResponse {
                    success: false,
                    user: None,
                    access_token: None,
                    error: Some("Database not available".to_string()),
                }),
            );
        }
    };

    let row = sqlx::query_as::<_, User>(
        r#"SELECT id, name, email, password_hash, role, created_at
           FROM users WHERE LOWER(email) = LOWER($1)"#,
    )
    .bind(&payload.email)
    .fetch_optional(pool.as_ref())
    .await;

    let user = match row {
        Ok(Some(u)) => u,
        Ok(None) => {
            tracing::warn!("Login attempt for unknown user: {}", payload.email);
            return (
                StatusCode::UNAUTHORIZED,
                Json(LoginResponse {
                    success: false,
                    user: None,
                    access_token: None,
                    error: Some("Invalid credentials".to_string()),
                }),
            );
        }
        Err(e) => {
            tracing::error!("Database error during login: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LoginResponse {
                    success: false,
                    user: None,
                    access_token: None,
                    error: Some("Authentication service temporarily unavailable".to_string()),
                }),
            );
        }
    };

    // bcrypt is CPU-bound; keep the async executor free.
    let pwd = payload.password.clone();
    let stored_hash = user.password_hash.clone();
    let password_ok = tokio::task::spawn_blocking(move || verify(&pwd, &stored_hash).unwrap_or(false))
        .await
        .unwrap_or(false);

    if !password_ok {
        tracing::warn!("Failed login attempt for: {}", user.email);
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginResponse {
                success: false,
                user: None,
                access_token: None,
                error: Some("Invalid credentials".to_string()),
            }),
        );
    }

    let access_token = match create_access_token(&user.id.to_string(), &user.email, &user.role) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to create access token: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LoginResponse {
                    success: false,
                    user: None,
                    access_token: None,
                    error: Some("Failed to create token".to_string()),
                }),
            );
        }
    };

    tracing::info!("Successful login for user: {}", user.email);

    (
        StatusCode::OK,
        Json(LoginResponse {
            success: true,
            user: Some(UserInfo {
                user_id: user.id.to_string(),
                email: user.email,
                role: user.role,
            }),
            access_token: Some(access_token),
            error: None,
        }),
    )
}

/// GET /api/auth/check-admin
/// Returns the caller's identity when authenticated with the admin role.
pub async fn check_admin(headers: HeaderMap) -> impl IntoResponse {
    match require_admin(&headers) {
        Ok(claims) => (
            StatusCode::OK,
            Json(CheckAdminResponse {
                success: true,
                user: Some(UserInfo {
                    user_id: claims.sub,
                    email: claims.email,
                    role: claims.role,
                }),
                error: None,
            }),
        )
            .into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

/// POST /api/auth/create-admin
/// Bootstrap the sole administrator account. Conflicts (an existing admin,
/// or an already-registered email) answer 409; the two checks run in
/// sequence without a transaction.
pub async fn create_admin(Json(payload): Json<CreateAdminRequest>) -> impl IntoResponse {
    let mut v = Violations::new();
    v.require_non_empty("name", &payload.name);
    v.require_email("email", &payload.email);
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        v.push("password", "Password minimal 6 karakter");
    }
    if let Err(rejection) = v.into_result() {
        return rejection.into_response();
    }

    let pool = match db::get_pool() {
        Some(p) => p,
        None => return crate::routes::db_unavailable().into_response(),
    };

    let admin_count: (i64,) =
        match sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(pool.as_ref())
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("Failed to check existing admin accounts: {}", e);
                return crate::routes::internal_error().into_response();
            }
        };

    if admin_count.0 > 0 {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("Akun admin sudah terdaftar")),
        )
            .into_response();
    }

    let email_taken: (bool,) = match sqlx::query_as(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
    )
    .bind(&payload.email)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(row) => row,
        Err(e) => {
            tracing::error!("Failed to check email uniqueness: {}", e);
            return crate::routes::internal_error().into_response();
        }
    };

    if email_taken.0 {
        return (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("Email sudah terdaftar")),
        )
            .into_response();
    }

    let password = payload.password.clone();
    let password_hash = match tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
        .await
    {
        Ok(Ok(h)) => h,
        Ok(Err(e)) => {
            tracing::error!("Failed to hash password: {}", e);
            return crate::routes::internal_error().into_response();
        }
        Err(e) => {
            tracing::error!("spawn_blocking panic during hash: {}", e);
            return crate::routes::internal_error().into_response();
        }
    };

    match sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ($1, $2, $3, 'admin')
        RETURNING id, name, email, password_hash, role, created_at
        "#,
    )
    .bind(payload.name.trim())
    .bind(&payload.email)
    .bind(&password_hash)
    .fetch_one(pool.as_ref())
    .await
    {
        Ok(user) => {
            tracing::info!("Admin account created: {}", user.email);
            (StatusCode::CREATED, Json(user)).into_response()
        }
        Err(e) => {
            tracing::error!("Failed to create admin account: {}", e);
            crate::routes::internal_error().into_response()
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

    fn auth_router() -> Router {
        Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/check-admin", get(check_admin))
            .route("/api/auth/create-admin", post(create_admin))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, axum::body::Bytes) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    async fn post_json(
        app: Router,
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(json).unwrap()))
            .unwrap();
        send(app, req).await
    }

    #[test]
    fn test_verify_access_token_invalid_returns_err() {
        assert!(verify_access_token("invalid.jwt.token").is_err());
    }

    #[test]
    fn test_token_roundtrip_preserves_claims() {
        let token = create_access_token("user-1", "admin@example.com", "admin").unwrap();
        let claims = verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, "admin");
    }

    #[tokio::test]
    async fn test_login_empty_email_returns_bad_request() {
        let (status, _) = post_json(
            auth_router(),
            "/api/auth/login",
            &LoginRequest {
                email: "".to_string(),
                password: "secret123".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_admin_short_password_fails_before_db() {
        // No pool is initialized in tests; a 400 here proves the password
        // check runs before any database access.
        let (status, bytes) = post_json(
            auth_router(),
            "/api/auth/create-admin",
            &CreateAdminRequest {
                name: "Admin".to_string(),
                email: "admin@example.com".to_string(),
                password: "12345".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["details"][0]["field"], "password");
    }

    #[tokio::test]
    async fn test_check_admin_without_token_returns_unauthorized() {
        let req = Request::get("/api/auth/check-admin")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_check_admin_non_admin_role_returns_forbidden() {
        let token = create_access_token("user-2", "visitor@example.com", "user").unwrap();
        let req = Request::get("/api/auth/check-admin")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_check_admin_with_admin_token_returns_identity() {
        let token = create_access_token("user-3", "admin@example.com", "admin").unwrap();
        let req = Request::get("/api/auth/check-admin")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, bytes) = send(auth_router(), req).await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["user"]["role"], "admin");
        assert_eq!(body["user"]["email"], "admin@example.com");
    }
}
