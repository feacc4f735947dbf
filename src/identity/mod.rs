/// Identity resolution: from bearer token to account record.
///
/// The canonical token subject is the account id as a decimal string.
/// Tokens minted by the previous schema generation carry the email
/// instead, so resolution falls back to an email lookup when the id
/// lookup fails or the subject does not parse as a number.
use crate::{
    account::AccountManager,
    db::models::{Account, Role},
    error::{ApiResult, AuthError},
    token::TokenService,
};
use std::sync::Arc;

/// Resolves verified tokens to accounts and enforces role checks.
pub struct IdentityResolver {
    tokens: Arc<TokenService>,
    accounts: Arc<AccountManager>,
}

impl IdentityResolver {
    pub fn new(tokens: Arc<TokenService>, accounts: Arc<AccountManager>) -> Self {
        Self { tokens, accounts }
    }

    /// Resolve a bearer token to its account.
    ///
    /// Every token failure collapses to `Unauthenticated`; a valid token
    /// whose subject matches no account fails with `AccountNotFound`. The
    /// boundary renders both identically. Storage failures propagate as
    /// database errors and are never retried here.
    pub async fn resolve(&self, token: &str) -> ApiResult<Account> {
        let claims = self.tokens.verify(token).map_err(|rejection| {
            tracing::debug!(?rejection, "token rejected");
            AuthError::Unauthenticated
        })?;

        let subject = claims.sub;
        if subject.is_empty() {
            return Err(AuthError::Unauthenticated.into());
        }

        // Canonical path: numeric account id.
        if let Ok(id) = subject.parse::<i64>() {
            if let Some(account) = self.accounts.find_by_id(id).await? {
                return Ok(account);
            }
        }

        // Legacy path: subject is the email.
        match self.accounts.find_by_email(&subject).await? {
            Some(account) => Ok(account),
            None => Err(AuthError::AccountNotFound.into()),
        }
    }

    /// Require a specific role, returning the account unchanged on success.
    pub fn require_role(account: Account, role: Role) -> Result<Account, AuthError> {
        if account.role != role {
            tracing::debug!(
                account_id = account.id,
                required = role.as_str(),
                "role check failed"
            );
            return Err(AuthError::Forbidden);
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, error::ApiError};
    use chrono::Duration;

    async fn setup() -> (Arc<TokenService>, Arc<AccountManager>, IdentityResolver) {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();

        let tokens = Arc::new(TokenService::new(
            "test-secret-key-for-testing-only-zzzz",
            60,
        ));
        let accounts = Arc::new(AccountManager::new(pool, Arc::clone(&tokens)));
        let resolver = IdentityResolver::new(Arc::clone(&tokens), Arc::clone(&accounts));

        (tokens, accounts, resolver)
    }

    #[tokio::test]
    async fn resolves_numeric_subject_by_id() {
        let (tokens, accounts, resolver) = setup().await;
        let (account, _) = accounts
            .register("Test Clinic", "clinic@example.com", "secret123")
            .await
            .unwrap();

        let token = tokens.issue(account.id).unwrap();
        let resolved = resolver.resolve(&token).await.unwrap();
        assert_eq!(resolved.id, account.id);
    }

    #[tokio::test]
    async fn resolves_legacy_email_subject() {
        let (tokens, accounts, resolver) = setup().await;
        accounts
            .register("Test Clinic", "clinic@example.com", "secret123")
            .await
            .unwrap();

        let token = tokens.issue("clinic@example.com").unwrap();
        let resolved = resolver.resolve(&token).await.unwrap();
        assert_eq!(resolved.email, "clinic@example.com");
    }

    #[tokio::test]
    async fn unknown_subject_is_account_not_found() {
        let (tokens, _accounts, resolver) = setup().await;

        let token = tokens.issue("notfound@x.com").unwrap();
        let err = resolver.resolve(&token).await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::AccountNotFound)));
    }

    #[tokio::test]
    async fn bad_tokens_are_unauthenticated() {
        let (tokens, accounts, resolver) = setup().await;
        let (account, _) = accounts
            .register("Test Clinic", "clinic@example.com", "secret123")
            .await
            .unwrap();

        let err = resolver.resolve("garbage").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::Unauthenticated)));

        let expired = tokens
            .issue_with_ttl(account.id, Duration::seconds(-10))
            .unwrap();
        let err = resolver.resolve(&expired).await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn role_check() {
        let (_, accounts, _) = setup().await;
        let (account, _) = accounts
            .register("Test Clinic", "clinic@example.com", "secret123")
            .await
            .unwrap();

        let err = IdentityResolver::require_role(account.clone(), Role::Admin).unwrap_err();
        assert_eq!(err, AuthError::Forbidden);

        let mut admin = account;
        admin.role = Role::Admin;
        let passed = IdentityResolver::require_role(admin, Role::Admin).unwrap();
        assert_eq!(passed.role, Role::Admin);
    }

    #[tokio::test]
    async fn register_then_resolve_end_to_end() {
        let (_, accounts, resolver) = setup().await;
        let (_, token) = accounts
            .register("Test Clinic", "a@b.com", "secret123")
            .await
            .unwrap();

        let resolved = resolver.resolve(&token).await.unwrap();
        assert_eq!(resolved.email, "a@b.com");
        assert_ne!(resolved.password_hash, "secret123");
    }
}
