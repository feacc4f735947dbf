/// Authentication extractors
use crate::{
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::models::{Account, Role},
    error::{ApiError, AuthError},
    identity::IdentityResolver,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated account - extracts and resolves the bearer token
#[derive(Debug, Clone)]
pub struct AuthAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppContext> for AuthAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or(AuthError::Unauthenticated)?;

        let account = state.identity.resolve(&token).await?;

        Ok(AuthAccount(account))
    }
}

/// Administrator account - resolves the token and requires the admin role
#[derive(Debug, Clone)]
pub struct AdminAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppContext> for AdminAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthAccount(account) = AuthAccount::from_request_parts(parts, state).await?;
        let account = IdentityResolver::require_role(account, Role::Admin)?;

        Ok(AdminAccount(account))
    }
}
