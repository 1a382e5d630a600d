//! Session cookie resolution.
//!
//! Every request carrying a session cookie is verified against the identity
//! provider once; the result is stored as a request extension. Verification
//! failure never rejects here: each handler decides whether an anonymous
//! caller is acceptable.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::auth::VerifiedIdentity;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct SessionUser(pub VerifiedIdentity);

pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    let cookie_name = &state.config.auth.session_cookie_name;

    if let Some(cookie) = jar.get(cookie_name) {
        match state.identity.verify_session_cookie(cookie.value()).await {
            Ok(identity) => {
                tracing::debug!(uid = %identity.uid, "Session cookie verified");
                request.extensions_mut().insert(SessionUser(identity));
            }
            Err(e) => {
                tracing::warn!(
                    path = %request.uri().path(),
                    "Session cookie verification failed, continuing anonymously: {}",
                    e
                );
            }
        }
    }

    next.run(request).await
}

/// The verified caller, if any.
pub struct CurrentUser(pub Option<VerifiedIdentity>);

impl CurrentUser {
    pub fn uid(&self) -> Option<&str> {
        self.0.as_ref().map(|identity| identity.uid.as_str())
    }

    /// Allows access to `owner`'s files only when the caller is `owner`.
    pub fn authorize_owner(&self, owner: &str) -> Result<(), AppError> {
        match self.uid() {
            None => Err(AppError::Unauthorized),
            Some(uid) if uid != owner => Err(AppError::Forbidden),
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts
            .extensions
            .get::<SessionUser>()
            .map(|SessionUser(identity)| identity.clone());
        Ok(CurrentUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str) -> CurrentUser {
        CurrentUser(Some(VerifiedIdentity {
            uid: uid.to_string(),
            email: None,
        }))
    }

    #[test]
    fn test_authorize_owner() {
        assert!(user("u1").authorize_owner("u1").is_ok());
        assert!(matches!(user("u2").authorize_owner("u1"), Err(AppError::Forbidden)));
        assert!(matches!(CurrentUser(None).authorize_owner("u1"), Err(AppError::Unauthorized)));
    }
}
