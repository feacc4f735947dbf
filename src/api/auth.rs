/// Registration, login, profile and admin endpoints
use crate::{
    account::{
        AccountResponse, DashboardResponse, LoginRequest, RegisterRequest, TokenResponse,
        UpdateProfileRequest,
    },
    auth::{AdminAccount, AuthAccount},
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me).patch(update_me))
        .route("/auth/admin/dashboard", get(admin_dashboard))
}

/// Register a new clinic account and return its first token
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<TokenResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let (_account, token) = ctx
        .accounts
        .register(&req.name, &req.email, &req.password)
        .await?;

    Ok(Json(TokenResponse::bearer(token)))
}

/// Exchange credentials for an access token
async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let (_account, token) = ctx.accounts.login(&req.email, &req.password).await?;

    Ok(Json(TokenResponse::bearer(token)))
}

/// Logout acknowledgement. Tokens are stateless and expire on their own;
/// kept so clients have a symmetric call to clear their stored token on.
async fn logout(AuthAccount(_account): AuthAccount) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Successfully logged out" }))
}

/// Profile of the authenticated account
async fn me(AuthAccount(account): AuthAccount) -> Json<AccountResponse> {
    Json(account.into())
}

/// Update name and/or email of the authenticated account
async fn update_me(
    State(ctx): State<AppContext>,
    AuthAccount(account): AuthAccount,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<AccountResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let updated = ctx
        .accounts
        .update_profile(account.id, req.name.as_deref(), req.email.as_deref())
        .await?;

    Ok(Json(updated.into()))
}

/// Aggregate statistics, administrator role only
async fn admin_dashboard(
    State(ctx): State<AppContext>,
    AdminAccount(_admin): AdminAccount,
) -> ApiResult<Json<DashboardResponse>> {
    Ok(Json(ctx.accounts.dashboard().await?))
}
