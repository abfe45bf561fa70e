use axum::{
    Json,
    extract::{Form, FromRequestParts, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, COOKIE, InvalidHeaderValue, LOCATION, SET_COOKIE},
        request::Parts,
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::services::{AuthUser, NewUser, TokenGrant, UserSummary};

const BEARER_COOKIE_NAME: &str = "bearer";

// ============================================================================
// Request/Response Types
// ============================================================================

/// OAuth2 password-grant form body. Extra grant fields are ignored.
#[derive(Deserialize)]
pub struct LoginForm {
    /// The account email, per the password-grant convention.
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SignUpResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub name: String,
    pub is_created: bool,
    pub token: TokenGrant,
}

// ============================================================================
// Extractor
// ============================================================================

/// The authenticated caller, resolved from the `bearer` cookie or the
/// `Authorization: Bearer` header.
///
/// Rejects with 401 (`WWW-Authenticate: Bearer`) when no token resolves and
/// with 400 when the account never completed a login.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("Invalid authentication credentials".into()))?;

        let user = state.auth().resolve_token(&token).await?;

        if !user.is_active {
            return Err(ApiError::BadRequest("Inactive user".into()));
        }

        tracing::debug!(username = %user.username, "Authenticated request");

        Ok(Self(user))
    }
}

/// Extract the bearer token from the `Authorization` header or the cookie.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && !token.trim().is_empty()
    {
        return Some(token.trim().to_string());
    }

    let value = headers.get(COOKIE)?.to_str().ok()?;
    for pair in value.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == BEARER_COOKIE_NAME && !val.is_empty() {
            return Some(val.to_string());
        }
    }

    None
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /
/// Form login for the server-rendered front end. Sets the `bearer` cookie
/// and redirects to the user page.
pub async fn login_form(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let grant = state.auth().login(&payload.username, &payload.password).await?;

    let secure = state.config().read().await.server.secure_cookies;
    let cookie = bearer_cookie(&grant, secure)
        .map_err(|e| ApiError::InternalError(format!("Failed to build cookie: {e}")))?;

    let mut response = redirect_found("/users/");
    response.headers_mut().insert(SET_COOKIE, cookie);

    Ok(response)
}

/// POST /api/login/
/// Password-grant login for the JSON API.
pub async fn login_api(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<LoginForm>,
) -> Result<Json<TokenGrant>, ApiError> {
    let grant = state.auth().login(&payload.username, &payload.password).await?;

    Ok(Json(grant))
}

/// POST /api/sign-up/
/// JSON registration. The new account gets a token immediately but stays
/// inactive until its first login.
pub async fn register_api(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<SignUpResponse>, ApiError> {
    let (user, token) = state
        .auth()
        .register(NewUser {
            username: payload.username,
            email: payload.email,
            name: payload.name,
            password: payload.password,
        })
        .await?;

    Ok(Json(SignUpResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        name: user.name,
        is_created: true,
        token,
    }))
}

/// POST /create-user/
/// Form registration for the front end.
pub async fn register_form(
    State(state): State<Arc<AppState>>,
    Form(payload): Form<SignUpRequest>,
) -> Result<Response, ApiError> {
    state
        .auth()
        .register(NewUser {
            username: payload.username,
            email: payload.email,
            name: payload.name,
            password: payload.password,
        })
        .await?;

    Ok(redirect_found("/create-user/"))
}

/// GET /api/users/me/
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserSummary> {
    Json(UserSummary {
        username: user.username,
        name: user.name,
        email: user.email,
        is_active: user.is_active,
    })
}

/// GET /api/users/all/
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = state.auth().list_users().await?;
    Ok(Json(users))
}

// ============================================================================
// Helpers
// ============================================================================

/// 302 rather than axum's 303/307 helpers; form posts in the front-end flow
/// expect a plain Found.
pub fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location)]).into_response()
}

/// Build the http-only `bearer` cookie carrying the token, expiring with it.
fn bearer_cookie(grant: &TokenGrant, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let expires = grant.expires.format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie = format!(
        "{BEARER_COOKIE_NAME}={}; Path=/; Expires={expires}; HttpOnly",
        grant.token
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}
