/// Therapy-session repository with transparent results encryption
use crate::{
    crypto::FieldCipher,
    db::models::TherapySession,
    error::{ApiError, ApiResult},
};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Therapy session manager service
pub struct SessionManager {
    db: SqlitePool,
    cipher: Arc<FieldCipher>,
}

impl SessionManager {
    pub fn new(db: SqlitePool, cipher: Arc<FieldCipher>) -> Self {
        Self { db, cipher }
    }

    /// Store a session. `results` is the JSON text produced by the
    /// analysis model (or supplied by the caller); it is encrypted as a
    /// whole before hitting storage. Absent observations stay NULL and
    /// never pass through the cipher.
    pub async fn create(
        &self,
        patient_id: i64,
        date: DateTime<Utc>,
        results: &str,
        observations: Option<&str>,
    ) -> ApiResult<TherapySession> {
        let sealed_results = self.cipher.encrypt(results)?;
        let sealed_observations = self.cipher.encrypt_opt(observations)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO therapy_sessions (patient_id, date, results, observations, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(patient_id)
        .bind(date)
        .bind(&sealed_results)
        .bind(&sealed_observations)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(TherapySession {
            id: result.last_insert_rowid(),
            patient_id,
            date,
            results: results.to_string(),
            observations: observations.map(str::to_string),
            created_at: now,
        })
    }

    /// List a patient's sessions ordered by date
    pub async fn list(&self, patient_id: i64) -> ApiResult<Vec<TherapySession>> {
        let rows = sqlx::query(
            "SELECT id, patient_id, date, results, observations, created_at
             FROM therapy_sessions WHERE patient_id = ?1 ORDER BY date",
        )
        .bind(patient_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)?;

        rows.into_iter().map(|r| self.session_from_row(r)).collect()
    }

    /// Fetch one session belonging to the given patient
    pub async fn get(&self, patient_id: i64, session_id: i64) -> ApiResult<Option<TherapySession>> {
        let row = sqlx::query(
            "SELECT id, patient_id, date, results, observations, created_at
             FROM therapy_sessions WHERE id = ?1 AND patient_id = ?2",
        )
        .bind(session_id)
        .bind(patient_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        row.map(|r| self.session_from_row(r)).transpose()
    }

    /// Replace the therapist's observations on a session
    pub async fn update_observations(
        &self,
        patient_id: i64,
        session_id: i64,
        observations: &str,
    ) -> ApiResult<TherapySession> {
        let mut session = self
            .get(patient_id, session_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Therapy session not found".to_string()))?;

        let sealed = self.cipher.encrypt(observations)?;
        sqlx::query("UPDATE therapy_sessions SET observations = ?1 WHERE id = ?2")
            .bind(&sealed)
            .bind(session_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::Database)?;

        session.observations = Some(observations.to_string());
        Ok(session)
    }

    fn session_from_row(&self, row: sqlx::sqlite::SqliteRow) -> ApiResult<TherapySession> {
        let id: i64 = row.get("id");
        let results = self.cipher.decrypt(row.get("results")).map_err(|e| {
            tracing::error!(session_id = id, "failed to decrypt session results");
            e
        })?;
        let observations = self
            .cipher
            .decrypt_opt(row.get("observations"))
            .map_err(|e| {
                tracing::error!(session_id = id, "failed to decrypt session observations");
                e
            })?;

        Ok(TherapySession {
            id,
            patient_id: row.get("patient_id"),
            date: row.get("date"),
            results,
            observations,
            created_at: row.get("created_at"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::cipher::generate_key, db};

    async fn create_test_manager() -> (SessionManager, SqlitePool) {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();

        let cipher = Arc::new(FieldCipher::from_base64(&generate_key()).unwrap());
        (SessionManager::new(pool.clone(), cipher), pool)
    }

    async fn seed_patient(pool: &SqlitePool) -> i64 {
        let account = sqlx::query(
            "INSERT INTO accounts (name, email, password_hash, role, created_at)
             VALUES ('Clinic', 'c@x.com', 'hash', 'clinic', ?1)",
        )
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid();

        sqlx::query(
            "INSERT INTO patients (account_id, name, age, created_at)
             VALUES (?1, 'sealed', 25, ?2)",
        )
        .bind(account)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn results_round_trip_encrypted() {
        let (manager, pool) = create_test_manager().await;
        let patient_id = seed_patient(&pool).await;

        let results = r#"{"emotion_summary":{"happy":3,"sad":1}}"#;
        let session = manager
            .create(patient_id, Utc::now(), results, None)
            .await
            .unwrap();
        assert_eq!(session.results, results);

        let stored: String =
            sqlx::query_scalar("SELECT results FROM therapy_sessions WHERE id = ?1")
                .bind(session.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_ne!(stored, results);

        let read_back = manager.get(patient_id, session.id).await.unwrap().unwrap();
        assert_eq!(read_back.results, results);
        assert_eq!(read_back.observations, None);
    }

    #[tokio::test]
    async fn observations_update_round_trips() {
        let (manager, pool) = create_test_manager().await;
        let patient_id = seed_patient(&pool).await;
        let session = manager
            .create(patient_id, Utc::now(), "{}", None)
            .await
            .unwrap();

        let updated = manager
            .update_observations(patient_id, session.id, "calm throughout")
            .await
            .unwrap();
        assert_eq!(updated.observations.as_deref(), Some("calm throughout"));

        let stored: Option<String> =
            sqlx::query_scalar("SELECT observations FROM therapy_sessions WHERE id = ?1")
                .bind(session.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_ne!(stored.as_deref(), Some("calm throughout"));

        let read_back = manager.get(patient_id, session.id).await.unwrap().unwrap();
        assert_eq!(read_back.observations.as_deref(), Some("calm throughout"));
    }

    #[tokio::test]
    async fn wrong_patient_is_not_found() {
        let (manager, pool) = create_test_manager().await;
        let patient_id = seed_patient(&pool).await;
        let session = manager
            .create(patient_id, Utc::now(), "{}", None)
            .await
            .unwrap();

        assert!(manager.get(patient_id + 1, session.id).await.unwrap().is_none());

        let err = manager
            .update_observations(patient_id + 1, session.id, "x")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
