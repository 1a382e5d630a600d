//! Identity provider seam.
//!
//! Session validity is owned entirely by the identity provider: the server
//! keeps no session table, it only asks the provider to mint a session
//! cookie from an ID token and later to verify that cookie.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::models::{IdTokenClaims, SessionClaims, VerifiedIdentity};
use crate::config::{AuthConfig, MAX_SESSION_LIFETIME_DAYS};
use crate::error::{AppError, Result};

pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

const MIN_SESSION_LIFETIME_MINUTES: i64 = 5;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchanges a client ID token for a signed session cookie value.
    async fn create_session_cookie(&self, id_token: &str, expires_in: Duration) -> Result<String>;

    /// Verifies a session cookie value and returns the identity it asserts.
    async fn verify_session_cookie(&self, session_cookie: &str) -> Result<VerifiedIdentity>;
}

/// HS256 identity provider used for local deployments and tests.
pub struct JwtIdentityProvider {
    id_token_encoding_key: EncodingKey,
    id_token_decoding_key: DecodingKey,
    id_token_issuer: String,
    session_encoding_key: EncodingKey,
    session_decoding_key: DecodingKey,
    session_issuer: String,
}

impl JwtIdentityProvider {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        if config.id_token_secret.len() < 32 || config.session_secret.len() < 32 {
            return Err(AppError::Authentication(
                "Identity secrets must be at least 32 characters long".to_string(),
            ));
        }

        Ok(Self {
            id_token_encoding_key: EncodingKey::from_secret(config.id_token_secret.as_bytes()),
            id_token_decoding_key: DecodingKey::from_secret(config.id_token_secret.as_bytes()),
            id_token_issuer: config.id_token_issuer.clone(),
            session_encoding_key: EncodingKey::from_secret(config.session_secret.as_bytes()),
            session_decoding_key: DecodingKey::from_secret(config.session_secret.as_bytes()),
            session_issuer: config.session_issuer.clone(),
        })
    }

    pub fn into_shared(self) -> SharedIdentityProvider {
        Arc::new(self)
    }

    /// Mints an ID token the way a client sign-in flow would receive one.
    pub fn sign_id_token(&self, uid: &str, email: Option<&str>, valid_for: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = IdTokenClaims {
            sub: uid.to_string(),
            email: email.map(str::to_string),
            iss: self.id_token_issuer.clone(),
            iat: now.timestamp() as usize,
            exp: (now + valid_for).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.id_token_encoding_key)
            .map_err(|e| AppError::Authentication(format!("Failed to sign ID token: {}", e)))
    }

    fn validation(issuer: &str) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation
    }

    fn verify_id_token(&self, id_token: &str) -> Result<IdTokenClaims> {
        decode::<IdTokenClaims>(
            id_token,
            &self.id_token_decoding_key,
            &Self::validation(&self.id_token_issuer),
        )
        .map(|data| data.claims)
        .map_err(map_jwt_error)
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn create_session_cookie(&self, id_token: &str, expires_in: Duration) -> Result<String> {
        if expires_in < Duration::minutes(MIN_SESSION_LIFETIME_MINUTES)
            || expires_in > Duration::days(MAX_SESSION_LIFETIME_DAYS)
        {
            return Err(AppError::BadRequest(format!(
                "Session lifetime must be between {} minutes and {} days",
                MIN_SESSION_LIFETIME_MINUTES, MAX_SESSION_LIFETIME_DAYS
            )));
        }

        let id_claims = self.verify_id_token(id_token)?;
        if id_claims.sub.is_empty() {
            return Err(AppError::Authentication("ID token has no subject".to_string()));
        }

        let now = Utc::now();
        let claims = SessionClaims {
            sub: id_claims.sub,
            email: id_claims.email,
            iss: self.session_issuer.clone(),
            iat: now.timestamp() as usize,
            exp: (now + expires_in).timestamp() as usize,
            auth_time: id_claims.iat,
        };

        encode(&Header::default(), &claims, &self.session_encoding_key)
            .map_err(|e| AppError::Authentication(format!("Failed to sign session cookie: {}", e)))
    }

    async fn verify_session_cookie(&self, session_cookie: &str) -> Result<VerifiedIdentity> {
        let claims = decode::<SessionClaims>(
            session_cookie,
            &self.session_decoding_key,
            &Self::validation(&self.session_issuer),
        )
        .map(|data| data.claims)
        .map_err(map_jwt_error)?;

        if claims.sub.is_empty() {
            return Err(AppError::Authentication("Session has no subject".to_string()));
        }

        Ok(claims.into())
    }
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AppError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
            AppError::Authentication("Token has expired".to_string())
        }
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => {
            AppError::Authentication("Token issuer mismatch".to_string())
        }
        jsonwebtoken::errors::ErrorKind::InvalidToken => {
            AppError::Authentication("Invalid token".to_string())
        }
        _ => AppError::Authentication(format!("Token validation failed: {}", e)),
    }
}
