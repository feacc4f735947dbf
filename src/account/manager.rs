/// Account manager implementation using runtime queries
use crate::{
    account::DashboardResponse,
    crypto::{hash_password, verify_password},
    db::models::{Account, Role},
    error::{ApiError, ApiResult, AuthError},
    token::TokenService,
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    tokens: Arc<TokenService>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, tokens: Arc<TokenService>) -> Self {
        Self { db, tokens }
    }

    /// Register a new account and issue its first access token.
    ///
    /// The token subject is the new account id in decimal string form.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> ApiResult<(Account, String)> {
        if self.email_exists(email).await? {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let password_hash = hash_password(password)
            .map_err(|_| ApiError::Internal("Password hashing failed".to_string()))?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO accounts (name, email, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(Role::Clinic)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        let account = Account {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
            role: Role::Clinic,
            created_at: now,
        };

        let token = self.tokens.issue(account.id)?;
        tracing::info!(account_id = account.id, "account registered");

        Ok((account, token))
    }

    /// Authenticate by email and password and issue an access token.
    ///
    /// Unknown email and wrong password both collapse to the same
    /// unauthenticated failure.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<(Account, String)> {
        let account = match self.find_by_email(email).await? {
            Some(account) => account,
            None => return Err(AuthError::Unauthenticated.into()),
        };

        if !verify_password(password, &account.password_hash) {
            return Err(AuthError::Unauthenticated.into());
        }

        let token = self.tokens.issue(account.id)?;
        tracing::info!(account_id = account.id, "login succeeded");

        Ok((account, token))
    }

    /// Find an account by numeric id
    pub async fn find_by_id(&self, id: i64) -> ApiResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, role, created_at
             FROM accounts WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(row.map(Self::account_from_row))
    }

    /// Find an account by email. Matching is exact: the stored email is
    /// compared as written at registration.
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<Account>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, role, created_at
             FROM accounts WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(row.map(Self::account_from_row))
    }

    /// Update profile fields. Changing the email checks uniqueness against
    /// every other account first.
    pub async fn update_profile(
        &self,
        id: i64,
        name: Option<&str>,
        email: Option<&str>,
    ) -> ApiResult<Account> {
        let mut account = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

        if let Some(new_email) = email {
            let taken: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM accounts WHERE email = ?1 AND id != ?2",
            )
            .bind(new_email)
            .bind(id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

            if taken > 0 {
                return Err(ApiError::Conflict("Email already in use".to_string()));
            }
            account.email = new_email.to_string();
        }

        if let Some(new_name) = name {
            account.name = new_name.to_string();
        }

        sqlx::query("UPDATE accounts SET name = ?1, email = ?2 WHERE id = ?3")
            .bind(&account.name)
            .bind(&account.email)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(account)
    }

    /// Aggregate counts and clinic list for the admin dashboard
    pub async fn dashboard(&self) -> ApiResult<DashboardResponse> {
        let total_clinics: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = 'clinic'")
                .fetch_one(&self.db)
                .await
                .map_err(ApiError::Database)?;

        let total_patients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM patients")
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        let rows = sqlx::query(
            "SELECT id, name, email, password_hash, role, created_at
             FROM accounts WHERE role = 'clinic' ORDER BY id",
        )
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)?;

        let clinics = rows
            .into_iter()
            .map(Self::account_from_row)
            .map(Into::into)
            .collect();

        Ok(DashboardResponse {
            total_clinics,
            total_patients,
            clinics,
        })
    }

    /// Check if an email is already registered
    async fn email_exists(&self, email: &str) -> ApiResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::Database)?;

        Ok(count > 0)
    }

    fn account_from_row(row: sqlx::sqlite::SqliteRow) -> Account {
        Account {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            role: row.get("role"),
            created_at: row.get("created_at"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn create_test_manager() -> AccountManager {
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
        AccountManager::new(pool, tokens)
    }

    #[tokio::test]
    async fn register_hashes_password_and_issues_token() {
        let manager = create_test_manager().await;
        let (account, token) = manager
            .register("Test Clinic", "a@b.com", "secret123")
            .await
            .unwrap();

        assert_eq!(account.email, "a@b.com");
        assert_eq!(account.role, Role::Clinic);
        assert_ne!(account.password_hash, "secret123");
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let manager = create_test_manager().await;
        manager
            .register("First", "a@b.com", "secret123")
            .await
            .unwrap();

        let err = manager
            .register("Second", "a@b.com", "secret456")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_accepts_correct_password_only() {
        let manager = create_test_manager().await;
        manager
            .register("Test Clinic", "a@b.com", "secret123")
            .await
            .unwrap();

        let (account, _token) = manager.login("a@b.com", "secret123").await.unwrap();
        assert_eq!(account.email, "a@b.com");

        let err = manager.login("a@b.com", "wrong-password").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::Unauthenticated)));

        let err = manager.login("nobody@b.com", "secret123").await.unwrap_err();
        assert!(matches!(err, ApiError::Auth(AuthError::Unauthenticated)));
    }

    #[tokio::test]
    async fn update_profile_checks_email_uniqueness() {
        let manager = create_test_manager().await;
        let (a, _) = manager
            .register("Clinic A", "a@b.com", "secret123")
            .await
            .unwrap();
        manager
            .register("Clinic B", "b@b.com", "secret123")
            .await
            .unwrap();

        let err = manager
            .update_profile(a.id, None, Some("b@b.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        let updated = manager
            .update_profile(a.id, Some("Renamed"), Some("a2@b.com"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.email, "a2@b.com");
    }
}
