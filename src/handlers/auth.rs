//! Authentication HTTP handlers
//!
//! Password login issuing JWTs, returned in the body and set as HttpOnly
//! cookies so browser clients need no token handling.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, StatusCode},
    response::{AppendHeaders, IntoResponse},
};
use axum_extra::{headers::Cookie, TypedHeader};
use validator::Validate;

use super::AuthenticatedUser;
use crate::error::ApiError;
use crate::extract::Json;
use crate::middleware::{ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::models::{ApiResponse, AuthTokensResponse, LoginRequest, RefreshTokenRequest, UserResponse};
use crate::state::AppState;

fn cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn token_cookies(state: &AppState, tokens: &AuthTokensResponse) -> [(axum::http::HeaderName, String); 2] {
    [
        (
            SET_COOKIE,
            cookie(
                ACCESS_TOKEN_COOKIE,
                &tokens.access_token,
                state.auth_service.access_token_ttl_seconds(),
                state.secure_cookies,
            ),
        ),
        (
            SET_COOKIE,
            cookie(
                REFRESH_TOKEN_COOKIE,
                &tokens.refresh_token,
                state.auth_service.refresh_token_ttl_seconds(),
                state.secure_cookies,
            ),
        ),
    ]
}

/// POST /auth/login - Exchange email and password for tokens
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let tokens = state.auth_service.login(&req).await?;
    let cookies = token_cookies(&state, &tokens);

    Ok((AppendHeaders(cookies), Json(ApiResponse::new(tokens))))
}

/// POST /auth/refresh - New token pair from the body token or the refresh cookie
pub async fn refresh_token(
    State(state): State<AppState>,
    cookies: Option<TypedHeader<Cookie>>,
    body: Option<Json<RefreshTokenRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let token = body
        .and_then(|Json(req)| req.refresh_token)
        .or_else(|| {
            cookies.and_then(|TypedHeader(cookie)| {
                cookie.get(REFRESH_TOKEN_COOKIE).map(str::to_string)
            })
        })
        .ok_or_else(|| ApiError::Unauthorized("Refresh token required".to_string()))?;

    let tokens = state.auth_service.refresh(&token).await?;
    let cookies = token_cookies(&state, &tokens);

    Ok((AppendHeaders(cookies), Json(ApiResponse::new(tokens))))
}

/// POST /auth/logout - Clear the auth cookies; tokens expire on their own
pub async fn logout(State(state): State<AppState>, user: AuthenticatedUser) -> impl IntoResponse {
    tracing::info!(user_id = %user.user_id, "User logged out");
    (
        StatusCode::NO_CONTENT,
        AppendHeaders([
            (SET_COOKIE, cookie(ACCESS_TOKEN_COOKIE, "", 0, state.secure_cookies)),
            (SET_COOKIE, cookie(REFRESH_TOKEN_COOKIE, "", 0, state.secure_cookies)),
        ]),
    )
}

/// GET /auth/me - Current user with their permissions
pub async fn get_current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state.auth_service.get_user_by_id(user.user_id).await?;
    Ok(Json(ApiResponse::new(user.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_attributes() {
        let c = cookie(ACCESS_TOKEN_COOKIE, "abc", 900, false);
        assert_eq!(c, "access_token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=900");
        assert!(cookie(ACCESS_TOKEN_COOKIE, "abc", 900, true).ends_with("; Secure"));
    }
}
