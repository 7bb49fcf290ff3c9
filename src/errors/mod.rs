use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::db::StoreError;
use crate::utils::jwt::AuthError;

pub const REQUIRED: &str = "This field is required.";
pub const BLANK: &str = "This field may not be blank.";
pub const NULL: &str = "This field may not be null.";
pub const NOT_FOUND: &str = "Not found.";
pub const SERVER_ERROR: &str = "A server error occurred.";

/// Per-field validation messages, serialized as `{field: [messages]}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0:?}")]
    Validation(FieldErrors),
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Parse Error: {0}")]
    ParseError(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
    #[error("Database Error: {0}")]
    DatabaseError(String),
}

#[derive(Serialize)]
struct ErrorResponse<'a> {
    detail: &'a str,
}

#[derive(Serialize)]
struct NonFieldErrorResponse<'a> {
    non_field_errors: [&'a str; 1],
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound(NOT_FOUND.to_string()),
            StoreError::DuplicateEmail => AppError::Validation(FieldErrors::single(
                "email",
                "employee with this email already exists.",
            )),
            StoreError::DuplicateUsername => AppError::Validation(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )),
            StoreError::Database(err) => AppError::DatabaseError(err.to_string()),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) | AppError::ParseError(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) | AppError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Validation(errors) => HttpResponse::BadRequest().json(errors),
            AppError::BadRequest(msg) => HttpResponse::BadRequest().json(NonFieldErrorResponse {
                non_field_errors: [msg.as_str()],
            }),
            AppError::ParseError(msg) => HttpResponse::BadRequest().json(ErrorResponse { detail: msg }),
            AppError::Unauthorized(err) => HttpResponse::Unauthorized()
                .insert_header((header::WWW_AUTHENTICATE, "JWT realm=\"api\""))
                .json(ErrorResponse { detail: &err.to_string() }),
            AppError::NotFound(msg) => HttpResponse::NotFound().json(ErrorResponse { detail: msg }),
            AppError::InternalServerError(msg) | AppError::DatabaseError(msg) => {
                log::error!("{}", msg);
                HttpResponse::InternalServerError().json(ErrorResponse { detail: SERVER_ERROR })
            }
        }
    }
}
