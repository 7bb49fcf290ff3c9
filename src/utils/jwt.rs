use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::user::User;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided.")]
    MissingCredential,
    #[error("{0}")]
    MalformedCredential(&'static str),
    #[error("{0}")]
    InvalidCredential(&'static str),
}

pub const NO_CREDENTIALS: &str = "Invalid Authorization header. No credentials provided.";
pub const CONTAINS_SPACES: &str =
    "Invalid Authorization header. Credentials string should not contain spaces.";
pub const SIGNATURE_EXPIRED: &str = "Signature has expired.";
pub const DECODE_FAILED: &str = "Error decoding signature.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    pub exp: i64,      // Expiration timestamp
    pub orig_iat: i64, // Issue time of the first token in a refresh chain
}

/// HS256 token issuer and verifier.
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    refresh_window: Duration,
    header_prefix: String,
}

impl JwtAuth {
    pub fn new(secret: &str, ttl: Duration, refresh_window: Duration, header_prefix: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            refresh_window,
            header_prefix: header_prefix.to_string(),
        }
    }

    pub fn generate_token(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        self.generate_token_since(user, Utc::now().timestamp())
    }

    /// Issues a fresh token that keeps the refresh chain's original issue time.
    pub fn generate_token_since(
        &self,
        user: &User,
        orig_iat: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            user_id: user.user_id.to_string(),
            username: user.username.clone(),
            exp: (Utc::now() + self.ttl).timestamp(),
            orig_iat,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::InvalidCredential(SIGNATURE_EXPIRED),
                _ => AuthError::InvalidCredential(DECODE_FAILED),
            })
    }

    pub fn refresh_allowed(&self, claims: &Claims) -> bool {
        Utc::now().timestamp() < claims.orig_iat + self.refresh_window.num_seconds()
    }

    /// Pulls the token out of an `Authorization: <prefix> <token>` header.
    /// A missing header or another scheme counts as no credentials at all.
    pub fn token_from_header<'a>(&self, header: Option<&'a str>) -> Result<&'a str, AuthError> {
        let parts: Vec<&str> = header.unwrap_or_default().split_whitespace().collect();
        match parts.as_slice() {
            [] => Err(AuthError::MissingCredential),
            [scheme, ..] if !scheme.eq_ignore_ascii_case(&self.header_prefix) => {
                Err(AuthError::MissingCredential)
            }
            [_] => Err(AuthError::MalformedCredential(NO_CREDENTIALS)),
            [_, token] => Ok(*token),
            _ => Err(AuthError::MalformedCredential(CONTAINS_SPACES)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn auth() -> JwtAuth {
        JwtAuth::new("test-secret", Duration::seconds(300), Duration::days(7), "JWT")
    }

    fn user() -> User {
        User {
            user_id: Uuid::new_v4(),
            username: "test_user".to_string(),
            password: String::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn issued_token_validates() {
        let auth = auth();
        let user = user();
        let token = auth.generate_token(&user).unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert_eq!(claims.username, "test_user");
        assert_eq!(claims.user_id, user.user_id.to_string());
        assert!(auth.refresh_allowed(&claims));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let other = JwtAuth::new("other-secret", Duration::seconds(300), Duration::days(7), "JWT");
        let token = other.generate_token(&user()).unwrap();
        assert_eq!(
            auth().validate_token(&token).unwrap_err(),
            AuthError::InvalidCredential(DECODE_FAILED)
        );
        assert_eq!(
            auth().validate_token("garbage").unwrap_err(),
            AuthError::InvalidCredential(DECODE_FAILED)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = JwtAuth::new("test-secret", Duration::seconds(-30), Duration::days(7), "JWT");
        let token = expired.generate_token(&user()).unwrap();
        assert_eq!(
            auth().validate_token(&token).unwrap_err(),
            AuthError::InvalidCredential(SIGNATURE_EXPIRED)
        );
    }

    #[test]
    fn refresh_window_is_measured_from_original_issue() {
        let auth = auth();
        let token = auth
            .generate_token_since(&user(), (Utc::now() - Duration::days(8)).timestamp())
            .unwrap();
        let claims = auth.validate_token(&token).unwrap();
        assert!(!auth.refresh_allowed(&claims));
    }

    #[test]
    fn header_parsing() {
        let auth = auth();
        assert_eq!(auth.token_from_header(None), Err(AuthError::MissingCredential));
        assert_eq!(auth.token_from_header(Some("")), Err(AuthError::MissingCredential));
        assert_eq!(
            auth.token_from_header(Some("Bearer abc")),
            Err(AuthError::MissingCredential)
        );
        assert_eq!(
            auth.token_from_header(Some("JWT")),
            Err(AuthError::MalformedCredential(NO_CREDENTIALS))
        );
        assert_eq!(
            auth.token_from_header(Some("JWT a b")),
            Err(AuthError::MalformedCredential(CONTAINS_SPACES))
        );
        assert_eq!(auth.token_from_header(Some("jwt abc")), Ok("abc"));
    }

    #[test]
    fn messages_match_wire_format() {
        assert_eq!(
            AuthError::MissingCredential.to_string(),
            "Authentication credentials were not provided."
        );
        assert_eq!(
            AuthError::MalformedCredential(NO_CREDENTIALS).to_string(),
            "Invalid Authorization header. No credentials provided."
        );
    }
}
