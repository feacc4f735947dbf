/// Database models
///
/// Structs here always hold plaintext. Encrypted columns are decoded by
/// the owning manager before a model is constructed, so nothing outside
/// the repository layer ever sees ciphertext.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role. `Clinic` is the standard role assigned at registration;
/// there is no endpoint that changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Clinic,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Clinic => "clinic",
            Role::Admin => "admin",
        }
    }
}

/// A clinic/therapist identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized into API responses.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A patient owned by an account. `name` is encrypted at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub age: i64,
    pub created_at: DateTime<Utc>,
}

/// Free-text note attached to a patient. `text` is encrypted at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientNote {
    pub id: i64,
    pub patient_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A therapy session with emotion-analysis results.
/// `results` and `observations` are encrypted at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TherapySession {
    pub id: i64,
    pub patient_id: i64,
    pub date: DateTime<Utc>,
    /// JSON text with `emotion_summary` and `timeline`.
    pub results: String,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}
