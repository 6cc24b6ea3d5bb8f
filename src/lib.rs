//! Tourism Portal Backend - library for app logic and testing

pub mod db;
pub mod logging;
pub mod routes;
pub mod storage;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

/// Upload routes accept bodies up to this size; the handlers enforce their
/// own per-type ceilings (5MB images, 10MB PDFs) with a 400 response.
const UPLOAD_BODY_LIMIT: usize = 16 * 1024 * 1024;

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

fn api_routes() -> Router {
    Router::new()
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/check-admin", get(routes::auth::check_admin))
        .route("/api/auth/create-admin", post(routes::auth::create_admin))
        .route(
            "/api/attractions",
            get(routes::attractions::list_attractions),
        )
        .route(
            "/api/attractions/{id}",
            get(routes::attractions::get_attraction),
        )
        .route(
            "/api/restaurants",
            get(routes::restaurants::list_restaurants).post(routes::restaurants::create_restaurant),
        )
        .route(
            "/api/restaurants/{id}",
            get(routes::restaurants::get_restaurant),
        )
        .route(
            "/api/packages",
            get(routes::packages::list_packages).post(routes::packages::create_package),
        )
        .route("/api/packages/{id}", get(routes::packages::get_package))
        .route(
            "/api/news",
            get(routes::news::list_news).post(routes::news::create_news),
        )
        .route("/api/news/{id}", get(routes::news::get_news))
        .route(
            "/api/events",
            get(routes::events::list_events).post(routes::events::create_event),
        )
        .route("/api/events/{id}", get(routes::events::get_event))
        .route(
            "/api/highlights",
            get(routes::highlights::list_highlights).post(routes::highlights::create_highlight),
        )
        .route(
            "/api/highlights/{id}",
            get(routes::highlights::get_highlight),
        )
        .route(
            "/api/research",
            get(routes::research::list_research).post(routes::research::create_research),
        )
        .route("/api/research/{id}", get(routes::research::get_research))
        .route(
            "/api/souvenirs",
            get(routes::souvenirs::list_souvenirs).post(routes::souvenirs::create_souvenir),
        )
        .route("/api/souvenirs/{id}", get(routes::souvenirs::get_souvenir))
        .route(
            "/api/stories",
            get(routes::stories::list_stories).post(routes::stories::create_story),
        )
        .route("/api/stories/{id}", get(routes::stories::get_story))
        .route(
            "/api/banners",
            get(routes::banners::list_banners).post(routes::banners::create_banner),
        )
        .route("/api/banners/{id}", get(routes::banners::get_banner))
        .route(
            "/api/contacts",
            get(routes::contacts::list_contacts).post(routes::contacts::create_contact),
        )
        .route(
            "/api/evaluations",
            get(routes::evaluations::list_evaluations)
                .post(routes::evaluations::create_evaluation),
        )
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        // Global 2 MB request body cap for JSON routes
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
}

fn upload_routes() -> Router {
    Router::new()
        .route("/api/upload/image", post(routes::upload::upload_image))
        .route("/api/upload/delete", post(routes::upload::delete_files))
        .route(
            "/api/admin/highlights/upload",
            post(routes::upload::upload_highlight_thumbnail),
        )
        .route(
            "/api/admin/research/upload",
            post(routes::upload::upload_research_pdf),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

/// Create and configure the application router.
pub fn create_app() -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

    api_routes()
        .merge(upload_routes())
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init();

    // Refuse to start in production with the insecure default JWT secret.
    let environment = std::env::var("ENVIRONMENT").unwrap_or_default();
    if environment == "production" {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() || secret == "default-jwt-secret-change-in-production" {
            panic!(
                "FATAL: JWT_SECRET must be set to a secure, unique value in production. \
                 Refusing to start with the default secret."
            );
        }
    }

    match db::init_pool(None).await {
        Ok(pool) => {
            if let Err(e) = db::run_migrations(&pool).await {
                tracing::error!("Failed to run database migrations: {}", e);
            }
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Continuing without database.",
                e
            );
        }
    }

    let app = create_app();

    // Bind address is configurable via HOST / PORT env vars, defaulting to
    // 127.0.0.1:3001 so existing dev setups keep working unchanged.
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_create_app_returns_router() {
        let _app = create_app();
    }

    #[tokio::test]
    async fn test_unknown_route_answers_not_found() {
        let app = create_app();
        let res = app
            .oneshot(
                Request::get("/api/does-not-exist")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reachable_through_full_stack() {
        let app = create_app();
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
