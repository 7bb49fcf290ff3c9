use actix_web::{web, HttpResponse};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, FieldErrors, BLANK};
use crate::state::AppState;
use crate::utils::password::verify_password;
use crate::utils::validation::validate_payload;

pub const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";
pub const REFRESH_EXPIRED: &str = "Refresh has expired.";

#[derive(Deserialize, Validate)]
pub struct AuthRequest {
    #[validate(required(message = "This field is required."))]
    username: Option<String>,
    #[validate(required(message = "This field is required."))]
    password: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(required(message = "This field is required."))]
    token: Option<String>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    token: String,
}

fn reject_blank(fields: &[(&str, &Option<String>)], errors: &mut FieldErrors) {
    for (field, value) in fields {
        if value.as_deref().map_or(false, str::is_empty) {
            errors.add(field, BLANK);
        }
    }
}

fn token_error(err: jsonwebtoken::errors::Error) -> AppError {
    AppError::InternalServerError(format!("Token generation error: {}", err))
}

pub async fn obtain_token(
    state: web::Data<AppState>,
    req: web::Json<AuthRequest>,
) -> Result<HttpResponse, AppError> {
    let mut errors = FieldErrors::new();
    reject_blank(
        &[("username", &req.username), ("password", &req.password)],
        &mut errors,
    );
    validate_payload(&req.0, &mut errors);
    errors.into_result()?;

    let username = req.username.as_deref().unwrap_or_default();
    let password = req.password.as_deref().unwrap_or_default();

    let user = state
        .users
        .find_user_by_username(username)
        .await?
        .filter(|user| user.is_active && verify_password(password, &user.password))
        .ok_or_else(|| {
            debug!("Rejected login for {}", username);
            AppError::BadRequest(BAD_CREDENTIALS.to_string())
        })?;

    let token = state.jwt.generate_token(&user).map_err(token_error)?;
    info!("Issued token for {}", user.username);
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

pub async fn refresh_token(
    state: web::Data<AppState>,
    req: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let mut errors = FieldErrors::new();
    reject_blank(&[("token", &req.token)], &mut errors);
    validate_payload(&req.0, &mut errors);
    errors.into_result()?;

    let claims = state
        .jwt
        .validate_token(req.token.as_deref().unwrap_or_default())
        .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let user_id = Uuid::parse_str(&claims.user_id)
        .map_err(|_| AppError::BadRequest("Invalid payload.".to_string()))?;
    let user = state
        .users
        .find_user(user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| AppError::BadRequest("User doesn't exist.".to_string()))?;

    if !state.jwt.refresh_allowed(&claims) {
        return Err(AppError::BadRequest(REFRESH_EXPIRED.to_string()));
    }

    let token = state
        .jwt
        .generate_token_since(&user, claims.orig_iat)
        .map_err(token_error)?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}
