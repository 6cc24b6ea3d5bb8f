//! Request-body validation.
//!
//! Creation handlers run an explicit validation pass that collects every
//! field-level violation before touching the database, then render the lot
//! as a single 400 response instead of letting constraint failures bubble
//! up as opaque 500s.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// One violated constraint on one field.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Accumulator for a validation pass.
#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn require_non_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, format!("{} is required", field));
        }
    }

    pub fn require_max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.chars().count() > max {
            self.push(field, format!("{} must be at most {} characters", field, max));
        }
    }

    pub fn require_range_i64(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            self.push(field, format!("{} must be between {} and {}", field, min, max));
        }
    }

    pub fn require_email(&mut self, field: &str, value: &str) {
        if !value.contains('@') || value.trim().is_empty() {
            self.push(field, "invalid email format");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationRejection> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationRejection(self.errors))
        }
    }
}

/// A failed validation pass, rendered as a 400 with per-field detail.
#[derive(Debug)]
pub struct ValidationRejection(Vec<FieldError>);

impl ValidationRejection {
    pub fn field_count(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Serialize)]
struct ValidationBody {
    error: &'static str,
    details: Vec<FieldError>,
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> axum::response::Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ValidationBody {
                error: "Validation failed",
                details: self.0,
            }),
        )
            .into_response()
    }
}
