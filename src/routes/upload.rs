/**
 * Upload Routes
 * Type/size-constrained file uploads into the blob store, plus batch deletion
 */
use axum::{
    extract::Multipart,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::routes::auth::require_admin;
use crate::routes::ErrorResponse;
use crate::storage::{object_name, BlobStore};

const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB
const MAX_PDF_SIZE: usize = 10 * 1024 * 1024; // 10MB

lazy_static::lazy_static! {
    static ref STORE: BlobStore = BlobStore::from_env();
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: usize,
    pub mime_type: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub url: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<DeleteOutcome>,
}

// ============================================================================
// Content sniffing
// ============================================================================

/// Allowed image types, detected by magic bytes rather than the declared
/// content type.
fn image_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // WebP: RIFF....WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn image_extension(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "bin",
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}

// ============================================================================
// Shared plumbing
// ============================================================================

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message)),
    )
        .into_response()
}

/// Pull the first field out of the multipart body.
async fn read_file_field(multipart: &mut Multipart) -> Result<axum::body::Bytes, Response> {
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return Err(bad_request("Tidak ada file yang diunggah")),
        Err(e) => {
            tracing::error!("Multipart error: {}", e);
            return Err(bad_request("Data multipart tidak valid"));
        }
    };

    let bytes = match field.bytes().await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Failed to read upload bytes: {}", e);
            return Err(bad_request("Gagal membaca data file"));
        }
    };

    if bytes.is_empty() {
        return Err(bad_request("File kosong"));
    }

    Ok(bytes)
}

/// Validate an image upload and persist it under `<prefix>-<ts>-<rand>.<ext>`.
async fn store_image(prefix: &str, multipart: &mut Multipart) -> Response {
    let bytes = match read_file_field(multipart).await {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };

    if bytes.len() > MAX_IMAGE_SIZE {
        return bad_request("Ukuran file maksimal 5MB");
    }

    let mime = match image_mime(&bytes) {
        Some(m) => m,
        None => return bad_request("Tipe file tidak didukung. Gunakan JPEG, PNG, atau WebP."),
    };

    let filename = object_name(prefix, image_extension(mime));
    match STORE.put(&filename, &bytes).await {
        Ok(url) => {
            tracing::info!("Image uploaded: {} ({} bytes)", filename, bytes.len());
            (
                StatusCode::CREATED,
                Json(UploadResponse {
                    url,
                    filename,
                    size: bytes.len(),
                    mime_type: mime.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to store upload {}: {}", filename, e);
            crate::routes::internal_error().into_response()
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/upload/image - general image upload
pub async fn upload_image(mut multipart: Multipart) -> Response {
    store_image("upload", &mut multipart).await
}

/// POST /api/admin/highlights/upload - highlight thumbnail (admin only)
pub async fn upload_highlight_thumbnail(headers: HeaderMap, mut multipart: Multipart) -> Response {
    if let Err(rejection) = require_admin(&headers) {
        return rejection.into_response();
    }
    store_image("highlight-thumbnail", &mut multipart).await
}

/// POST /api/admin/research/upload - research paper PDF (admin only)
pub async fn upload_research_pdf(headers: HeaderMap, mut multipart: Multipart) -> Response {
    if let Err(rejection) = require_admin(&headers) {
        return rejection.into_response();
    }

    let bytes = match read_file_field(&mut multipart).await {
        Ok(b) => b,
        Err(rejection) => return rejection,
    };

    if bytes.len() > MAX_PDF_SIZE {
        return bad_request("Ukuran file maksimal 10MB");
    }

    if !is_pdf(&bytes) {
        return bad_request("File harus berformat PDF");
    }

    let filename = object_name("research-paper", "pdf");
    match STORE.put(&filename, &bytes).await {
        Ok(url) => {
            tracing::info!("PDF uploaded: {} ({} bytes)", filename, bytes.len());
            (
                StatusCode::CREATED,
                Json(UploadResponse {
                    url,
                    filename,
                    size: bytes.len(),
                    mime_type: "application/pdf".to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to store upload {}: {}", filename, e);
            crate::routes::internal_error().into_response()
        }
    }
}

/// POST /api/upload/delete - delete a batch of previously uploaded files.
/// Each URL is attempted independently and concurrently; one failure never
/// aborts the rest.
pub async fn delete_files(headers: HeaderMap, Json(payload): Json<DeleteRequest>) -> Response {
    if let Err(rejection) = require_admin(&headers) {
        return rejection.into_response();
    }

    if payload.urls.is_empty() {
        return bad_request("Tidak ada URL yang diberikan");
    }

    let attempts = payload.urls.iter().map(|url| async move {
        match STORE.delete(url).await {
            Ok(()) => DeleteOutcome {
                url: url.clone(),
                success: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!("Failed to delete {}: {}", url, e);
                DeleteOutcome {
                    url: url.clone(),
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    });

    let results = futures::future::join_all(attempts).await;
    let successful = results.iter().filter(|r| r.success).count();
    let failed = results.len() - successful;

    (
        StatusCode::OK,
        Json(DeleteResponse {
            successful,
            failed,
            results,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    const BOUNDARY: &str = "test-boundary-7f23";

    fn upload_router() -> Router {
        // Same raised body cap the app router mounts these routes with;
        // without it the framework would 413 large uploads before the
        // handler's own size check can answer 400.
        Router::new()
            .route("/api/upload/image", post(upload_image))
            .route("/api/upload/delete", post(delete_files))
            .layer(axum::extract::DefaultBodyLimit::max(16 * 1024 * 1024))
    }

    /// All upload tests share one store root so the lazily-initialized STORE
    /// sees the same directory regardless of which test touches it first.
    fn pin_store_env() {
        let dir = std::env::temp_dir().join("tourism-upload-tests");
        std::env::set_var("UPLOAD_DIR", &dir);
    }

    fn multipart_body(filename: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn post_multipart(
        app: Router,
        uri: &str,
        filename: &str,
        bytes: &[u8],
    ) -> (StatusCode, axum::body::Bytes) {
        let req = Request::post(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(filename, bytes)))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    fn fake_jpeg(len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        bytes[0] = 0xFF;
        bytes[1] = 0xD8;
        bytes[2] = 0xFF;
        bytes
    }

    #[test]
    fn test_image_mime_detection() {
        assert_eq!(image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(image_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D]), Some("image/png"));
        assert_eq!(
            image_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some("image/webp")
        );
        // GIF is not on the allow-list
        assert_eq!(image_mime(b"GIF89a"), None);
        assert_eq!(image_mime(b"%PDF-1.7"), None);
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf(b"%PDF-1.4 rest"));
        assert!(!is_pdf(b"PDF-1.4"));
    }

    #[tokio::test]
    async fn test_oversized_jpeg_rejected_before_storage() {
        pin_store_env();
        let (status, bytes) = post_multipart(
            upload_router(),
            "/api/upload/image",
            "big.jpg",
            &fake_jpeg(6 * 1024 * 1024),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Ukuran file maksimal 5MB");
    }

    #[tokio::test]
    async fn test_wrong_type_rejected() {
        pin_store_env();
        let (status, _) = post_multipart(
            upload_router(),
            "/api/upload/image",
            "anim.gif",
            b"GIF89a-not-allowed",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_valid_jpeg_stored_with_generated_name() {
        pin_store_env();
        let (status, bytes) = post_multipart(
            upload_router(),
            "/api/upload/image",
            "photo.jpg",
            &fake_jpeg(4 * 1024 * 1024),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let url = body["url"].as_str().unwrap();
        assert!(url.contains("/uploads/upload-"));
        assert!(url.ends_with(".jpg"));
        assert_eq!(body["mimeType"], "image/jpeg");
    }

    #[tokio::test]
    async fn test_batch_delete_reports_per_url_and_never_aborts() {
        pin_store_env();
        // Seed one real file through the same store the handler uses.
        let seeded_url = STORE.put("doomed.png", b"\x89PNGdata").await.unwrap();

        let token = mint_admin_token();

        let req = Request::post("/api/upload/delete")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(
                serde_json::json!({ "urls": [seeded_url, "/uploads/does-not-exist.png"] })
                    .to_string(),
            ))
            .unwrap();
        let res = upload_router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: DeleteResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.successful, 1);
        assert_eq!(body.failed, 1);
        assert!(body.results[0].success);
        assert!(!body.results[1].success);
        assert!(body.results[1].error.is_some());
    }

    fn mint_admin_token() -> String {
        use chrono::Utc;
        use jsonwebtoken::{encode, EncodingKey, Header};
        let now = Utc::now().timestamp();
        let claims = crate::routes::auth::Claims {
            sub: "admin-1".to_string(),
            email: "admin@example.com".to_string(),
            role: "admin".to_string(),
            exp: now + 3600,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(crate::routes::auth::JWT_SECRET.as_bytes()),
        )
        .unwrap()
    }
}
