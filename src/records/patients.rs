/// Patient repository with transparent name/note encryption
use crate::{
    crypto::FieldCipher,
    db::models::{Patient, PatientNote},
    error::{ApiError, ApiResult},
};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;

/// Patient manager service
pub struct PatientManager {
    db: SqlitePool,
    cipher: Arc<FieldCipher>,
}

impl PatientManager {
    pub fn new(db: SqlitePool, cipher: Arc<FieldCipher>) -> Self {
        Self { db, cipher }
    }

    /// Create a patient owned by the given account
    pub async fn create(&self, account_id: i64, name: &str, age: i64) -> ApiResult<Patient> {
        let sealed_name = self.cipher.encrypt(name)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO patients (account_id, name, age, created_at)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(account_id)
        .bind(&sealed_name)
        .bind(age)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(Patient {
            id: result.last_insert_rowid(),
            account_id,
            name: name.to_string(),
            age,
            created_at: now,
        })
    }

    /// List the account's patients, optionally filtered by name.
    ///
    /// Names are ciphertext in storage, so the search filter is applied
    /// after decryption, case-insensitively on trimmed input.
    pub async fn list(&self, account_id: i64, search: Option<&str>) -> ApiResult<Vec<Patient>> {
        let rows = sqlx::query(
            "SELECT id, account_id, name, age, created_at
             FROM patients WHERE account_id = ?1 ORDER BY id",
        )
        .bind(account_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)?;

        let mut patients = Vec::with_capacity(rows.len());
        for row in rows {
            patients.push(self.patient_from_row(row)?);
        }

        if let Some(needle) = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()) {
            patients.retain(|p| p.name.to_lowercase().contains(&needle));
        }

        Ok(patients)
    }

    /// Fetch one patient, filtered by owner. Returns `None` when the id
    /// does not exist or belongs to another account.
    pub async fn get(&self, account_id: i64, patient_id: i64) -> ApiResult<Option<Patient>> {
        let row = sqlx::query(
            "SELECT id, account_id, name, age, created_at
             FROM patients WHERE id = ?1 AND account_id = ?2",
        )
        .bind(patient_id)
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        row.map(|r| self.patient_from_row(r)).transpose()
    }

    /// Attach a free-text note to a patient
    pub async fn add_note(
        &self,
        account_id: i64,
        patient_id: i64,
        text: &str,
    ) -> ApiResult<PatientNote> {
        self.require_owned(account_id, patient_id).await?;

        let sealed_text = self.cipher.encrypt(text)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO patient_notes (patient_id, text, created_at)
             VALUES (?1, ?2, ?3)",
        )
        .bind(patient_id)
        .bind(&sealed_text)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(PatientNote {
            id: result.last_insert_rowid(),
            patient_id,
            text: text.to_string(),
            created_at: now,
        })
    }

    /// List a patient's notes, oldest first
    pub async fn list_notes(
        &self,
        account_id: i64,
        patient_id: i64,
    ) -> ApiResult<Vec<PatientNote>> {
        self.require_owned(account_id, patient_id).await?;

        let rows = sqlx::query(
            "SELECT id, patient_id, text, created_at
             FROM patient_notes WHERE patient_id = ?1 ORDER BY id",
        )
        .bind(patient_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::Database)?;

        let mut notes = Vec::with_capacity(rows.len());
        for row in rows {
            let id: i64 = row.get("id");
            let text = self.cipher.decrypt(row.get("text")).map_err(|e| {
                tracing::error!(note_id = id, "failed to decrypt note text");
                e
            })?;
            notes.push(PatientNote {
                id,
                patient_id: row.get("patient_id"),
                text,
                created_at: row.get("created_at"),
            });
        }

        Ok(notes)
    }

    /// Ownership gate shared by note and session operations
    pub async fn require_owned(&self, account_id: i64, patient_id: i64) -> ApiResult<()> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM patients WHERE id = ?1 AND account_id = ?2",
        )
        .bind(patient_id)
        .bind(account_id)
        .fetch_one(&self.db)
        .await
        .map_err(ApiError::Database)?;

        if count == 0 {
            return Err(ApiError::NotFound("Patient not found".to_string()));
        }
        Ok(())
    }

    fn patient_from_row(&self, row: sqlx::sqlite::SqliteRow) -> ApiResult<Patient> {
        let id: i64 = row.get("id");
        let name = self.cipher.decrypt(row.get("name")).map_err(|e| {
            tracing::error!(patient_id = id, "failed to decrypt patient name");
            e
        })?;

        Ok(Patient {
            id,
            account_id: row.get("account_id"),
            name,
            age: row.get("age"),
            created_at: row.get("created_at"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::cipher::generate_key, db};

    async fn create_test_manager() -> (PatientManager, SqlitePool) {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();

        let cipher = Arc::new(FieldCipher::from_base64(&generate_key()).unwrap());
        (PatientManager::new(pool.clone(), cipher), pool)
    }

    async fn seed_account(pool: &SqlitePool) -> i64 {
        sqlx::query(
            "INSERT INTO accounts (name, email, password_hash, role, created_at)
             VALUES ('Clinic', 'c@x.com', 'hash', 'clinic', ?1)",
        )
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn name_is_ciphertext_at_rest_and_plaintext_in_memory() {
        let (manager, pool) = create_test_manager().await;
        let owner = seed_account(&pool).await;

        let patient = manager.create(owner, "María García", 30).await.unwrap();
        assert_eq!(patient.name, "María García");

        let stored: String = sqlx::query_scalar("SELECT name FROM patients WHERE id = ?1")
            .bind(patient.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_ne!(stored, "María García");

        let read_back = manager.get(owner, patient.id).await.unwrap().unwrap();
        assert_eq!(read_back.name, "María García");
    }

    #[tokio::test]
    async fn ownership_filter_hides_other_accounts_patients() {
        let (manager, pool) = create_test_manager().await;
        let owner = seed_account(&pool).await;
        let other = sqlx::query(
            "INSERT INTO accounts (name, email, password_hash, role, created_at)
             VALUES ('Other', 'o@x.com', 'hash', 'clinic', ?1)",
        )
        .bind(Utc::now())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let patient = manager.create(owner, "Juan Pérez", 25).await.unwrap();

        assert!(manager.get(other, patient.id).await.unwrap().is_none());
        assert!(manager.list(other, None).await.unwrap().is_empty());

        let err = manager.add_note(other, patient.id, "note").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn search_matches_decrypted_names() {
        let (manager, pool) = create_test_manager().await;
        let owner = seed_account(&pool).await;

        manager.create(owner, "Juan Pérez", 25).await.unwrap();
        manager.create(owner, "María García", 30).await.unwrap();

        let hits = manager.list(owner, Some("  garcía ")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "María García");

        let all = manager.list(owner, Some("")).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn notes_round_trip_encrypted() {
        let (manager, pool) = create_test_manager().await;
        let owner = seed_account(&pool).await;
        let patient = manager.create(owner, "Juan Pérez", 25).await.unwrap();

        let note = manager
            .add_note(owner, patient.id, "made good progress")
            .await
            .unwrap();
        assert_eq!(note.text, "made good progress");

        let stored: String = sqlx::query_scalar("SELECT text FROM patient_notes WHERE id = ?1")
            .bind(note.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_ne!(stored, "made good progress");

        let notes = manager.list_notes(owner, patient.id).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text, "made good progress");
    }

    #[tokio::test]
    async fn decrypt_failure_surfaces_not_garbage() {
        let (manager, pool) = create_test_manager().await;
        let owner = seed_account(&pool).await;
        let patient = manager.create(owner, "Juan Pérez", 25).await.unwrap();

        // Corrupt the stored ciphertext directly.
        sqlx::query("UPDATE patients SET name = 'bm90LWEtY2lwaGVydGV4dA' WHERE id = ?1")
            .bind(patient.id)
            .execute(&pool)
            .await
            .unwrap();

        let err = manager.get(owner, patient.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Crypto(_)));
    }
}
