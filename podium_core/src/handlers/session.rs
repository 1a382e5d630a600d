use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, Result},
    extractors::ApiJson,
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    #[serde(default)]
    pub id_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

pub async fn create_session(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(request): ApiJson<SessionRequest>,
) -> Result<(CookieJar, Json<SuccessResponse>)> {
    let id_token = request
        .id_token
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing idToken".to_string()))?;

    let auth = &state.config.auth;
    let lifetime_days = auth.session_lifetime_days;

    let session_cookie = state
        .identity
        .create_session_cookie(&id_token, chrono::Duration::days(lifetime_days))
        .await
        .map_err(|e| match e {
            AppError::Authentication(reason) => {
                tracing::warn!("Rejected ID token: {}", reason);
                AppError::Unauthorized
            }
            other => other,
        })?;

    let cookie = Cookie::build((auth.session_cookie_name.clone(), session_cookie))
        .path("/")
        .http_only(true)
        .secure(state.config.is_production())
        .same_site(SameSite::Strict)
        .max_age(time::Duration::days(lifetime_days))
        .build();

    Ok((jar.add(cookie), SuccessResponse::ok()))
}

pub async fn delete_session(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<SuccessResponse>) {
    // Added rather than removed so the expiring cookie is sent even when the
    // request carried no session.
    let mut removal = Cookie::build((state.config.auth.session_cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .secure(state.config.is_production())
        .same_site(SameSite::Strict)
        .build();
    removal.make_removal();

    (jar.add(removal), SuccessResponse::ok())
}
