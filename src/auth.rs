use actix_web::http::header::AUTHORIZATION;
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use log::info;
use std::fmt;
use uuid::Uuid;

use crate::db::{StoreError, UserStore};
use crate::errors::AppError;
use crate::state::AppState;
use crate::utils::jwt::{AuthError, DECODE_FAILED};
use crate::utils::password::hash_password;

pub const USER_NOT_FOUND: &str = "Invalid signature.";
pub const USER_DISABLED: &str = "User account is disabled.";

/// The authenticated caller. Taking it as a handler argument rejects the
/// request with 401 before any other extractor or store access runs.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub username: String,
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.user_id)
    }
}

impl AppState {
    /// Verifies an `Authorization` header value and resolves its user.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Principal, AppError> {
        let token = self.jwt.token_from_header(header)?;
        let claims = self.jwt.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.user_id)
            .map_err(|_| AuthError::InvalidCredential(DECODE_FAILED))?;

        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or(AuthError::InvalidCredential(USER_NOT_FOUND))?;
        if !user.is_active {
            return Err(AuthError::InvalidCredential(USER_DISABLED).into());
        }

        Ok(Principal {
            user_id: user.user_id,
            username: user.username,
        })
    }
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|auth| auth.to_str().ok())
            .map(str::to_string);

        Box::pin(async move {
            let state = state.ok_or_else(|| {
                AppError::InternalServerError("application state is not configured".to_string())
            })?;
            state.authenticate(header.as_deref()).await
        })
    }
}

/// Creates `username` unless it already exists. Used to seed the admin account.
pub async fn ensure_user(
    users: &dyn UserStore,
    username: &str,
    password: &str,
) -> Result<(), AppError> {
    if users.find_user_by_username(username).await?.is_some() {
        info!("User {} already exists", username);
        return Ok(());
    }

    let password_hash = hash_password(password)
        .map_err(|err| AppError::InternalServerError(format!("Hashing error: {}", err)))?;
    match users.create_user(username, &password_hash).await {
        Ok(user) => {
            info!("Created user {} ({})", user.username, user.user_id);
            Ok(())
        }
        // Lost a race with another instance seeding the same account.
        Err(StoreError::DuplicateUsername) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{memory_state, TEST_USER};
    use crate::utils::jwt::NO_CREDENTIALS;

    #[actix_web::test]
    async fn valid_token_resolves_principal() {
        let state = memory_state().await;
        let user = state.users.find_user_by_username(TEST_USER).await.unwrap().unwrap();
        let token = state.jwt.generate_token(&user).unwrap();

        let principal = state
            .authenticate(Some(&format!("JWT {}", token)))
            .await
            .unwrap();
        assert_eq!(principal.user_id, user.user_id);
        assert_eq!(principal.username, TEST_USER);
    }

    #[actix_web::test]
    async fn header_problems_are_auth_errors() {
        let state = memory_state().await;
        assert!(matches!(
            state.authenticate(None).await,
            Err(AppError::Unauthorized(AuthError::MissingCredential))
        ));
        assert!(matches!(
            state.authenticate(Some("JWT")).await,
            Err(AppError::Unauthorized(AuthError::MalformedCredential(msg))) if msg == NO_CREDENTIALS
        ));
        assert!(matches!(
            state.authenticate(Some("JWT not.a.token")).await,
            Err(AppError::Unauthorized(AuthError::InvalidCredential(_)))
        ));
    }

    #[actix_web::test]
    async fn token_for_unknown_user_is_rejected() {
        let state = memory_state().await;
        let stranger = crate::models::user::User {
            user_id: Uuid::new_v4(),
            username: "ghost".to_string(),
            password: String::new(),
            is_active: true,
            created_at: chrono::Utc::now(),
        };
        let token = state.jwt.generate_token(&stranger).unwrap();
        assert!(matches!(
            state.authenticate(Some(&format!("JWT {}", token))).await,
            Err(AppError::Unauthorized(AuthError::InvalidCredential(msg))) if msg == USER_NOT_FOUND
        ));
    }

    #[actix_web::test]
    async fn ensure_user_is_idempotent() {
        let state = memory_state().await;
        ensure_user(state.users.as_ref(), TEST_USER, "another-password")
            .await
            .unwrap();
        let user = state.users.find_user_by_username(TEST_USER).await.unwrap().unwrap();
        assert!(crate::utils::password::verify_password(
            crate::state::test_support::TEST_PASSWORD,
            &user.password
        ));
    }
}
