/// Authentication Routes
///
/// Login, refresh, logout and profile. Thin adapters over `AuthService`; all
/// decisions about tokens and sessions live there.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, Claims, IssuedSession, Revocation};
use crate::error::{AccessRejection, AppError, ErrorContext, RefreshRejection, RequestError};
use crate::middleware::bearer_token;
use crate::routes::ApiResponse;
use crate::store::UserProfile;
use crate::validators::validate_login;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Optional body for clients that cannot set an Authorization header
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Token pair plus public profile, returned by login and refresh
#[derive(Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub access_token_expires_in: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl From<IssuedSession> for AuthResponse {
    fn from(issued: IssuedSession) -> Self {
        Self {
            user: issued.user,
            access_token: issued.tokens.access_token,
            access_token_expires_in: issued.tokens.access_token_ttl,
            refresh_token: issued.tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: issued.tokens.access_token_expires_in,
        }
    }
}

/// POST /api/v1/auth/login
///
/// # Errors
/// - 400: malformed body, empty username, password shorter than 8 characters
/// - 401: "Invalid credentials" for unknown user, wrong password or inactive account
/// - 500: storage failure
pub async fn login(
    req: HttpRequest,
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "user_login");
    validate_login(&form.username, &form.password).map_err(|e| context.reject(e))?;

    let issued = auth
        .login(&form.username, &form.password)
        .await
        .map_err(|e| context.reject(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %issued.user.id,
        "User logged in"
    );

    Ok(HttpResponse::Created().json(ApiResponse::new(
        "Login successful",
        AuthResponse::from(issued),
    )))
}

/// POST /api/v1/auth/refresh
///
/// Takes the refresh token from `Authorization: Bearer` or, failing that,
/// from `{"refresh_token": ...}`. The presented token is retired on success.
///
/// # Errors
/// - 403: "Invalid refresh token" for every rejection reason
/// - 500: storage failure
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "token_refresh");

    let token = bearer_token(&req)
        .or_else(|| body.and_then(|b| b.into_inner().refresh_token))
        .ok_or_else(|| context.reject(AppError::refresh_rejected(RefreshRejection::MissingToken)))?;

    let issued = auth.refresh(&token).await.map_err(|e| context.reject(e))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %issued.user.id,
        "Token refreshed"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::new(
        "Token refreshed successfully",
        AuthResponse::from(issued),
    )))
}

/// POST /api/v1/auth/logout
///
/// Requires an access token. Deletes every session of the caller; succeeds
/// even when there was nothing to delete.
pub async fn logout(
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "user_logout");
    let user_id = claims
        .user_id()
        .ok_or_else(|| context.reject(AppError::unauthorized(AccessRejection::Invalid)))?;
    let context = context.with_user_id(user_id.to_string());

    let revocation: Revocation = auth.logout(user_id).await.map_err(|e| context.reject(e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::new("Logout successful", revocation)))
}

/// GET /api/v1/auth/profile
///
/// Requires an access token.
///
/// # Errors
/// - 401: missing or invalid access token (middleware)
/// - 404: the token's user no longer exists
pub async fn profile(
    req: HttpRequest,
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, RequestError> {
    let context = ErrorContext::for_request(&req, "user_profile");
    let user_id = claims
        .user_id()
        .ok_or_else(|| context.reject(AppError::unauthorized(AccessRejection::Invalid)))?;

    let profile = auth.profile(user_id).await.map_err(|e| context.reject(e))?;

    Ok(HttpResponse::Ok().json(ApiResponse::new("Profile fetched successfully", profile)))
}
