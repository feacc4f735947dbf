/// Access token issuance and verification.
///
/// Tokens are stateless HS256 JWTs carrying a subject and an absolute
/// expiry. There is no server-side session store and no revocation list:
/// a token is either valid-and-unexpired or it is not.
use crate::error::{ApiError, ApiResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Account identity: the decimal string of the account id. Legacy
    /// tokens from the previous schema carry the email instead.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// Why a token failed verification.
///
/// Internal diagnostic only: every variant collapses to the same
/// unauthenticated response at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    Expired,
    BadSignature,
    Malformed,
}

/// Issues and verifies signed access tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    default_ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &str, default_ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            default_ttl: Duration::minutes(default_ttl_minutes),
        }
    }

    /// Issue a token for a subject with the default lifetime.
    ///
    /// The subject is coerced to its string form before signing, so a
    /// numeric account id becomes its decimal representation. Lookups
    /// later rely on exact string equality with that form.
    pub fn issue(&self, subject: impl ToString) -> ApiResult<String> {
        self.issue_with_ttl(subject, self.default_ttl)
    }

    /// Issue a token with an explicit lifetime.
    pub fn issue_with_ttl(&self, subject: impl ToString, ttl: Duration) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify a token's signature and expiry.
    ///
    /// Expiry is exact (no leeway). No signature-library error escapes
    /// this boundary; callers treat any rejection as "not authenticated"
    /// and must not surface the variant to the client.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenRejection> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenRejection::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenRejection::BadSignature,
                _ => TokenRejection::Malformed,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("unit-test-secret-key-of-sufficient-length", 60)
    }

    #[test]
    fn issue_and_verify() {
        let tokens = service();
        let token = tokens.issue("7").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn numeric_subject_coerced_to_string() {
        let tokens = service();
        let token = tokens.issue(42).unwrap();
        assert_eq!(tokens.verify(&token).unwrap().sub, "42");
    }

    #[test]
    fn short_ttl_expires() {
        let tokens = service();
        let token = tokens
            .issue_with_ttl("7", Duration::seconds(1))
            .unwrap();

        // Valid immediately after issuance.
        assert!(tokens.verify(&token).is_ok());

        std::thread::sleep(std::time::Duration::from_secs(2));
        assert_eq!(tokens.verify(&token), Err(TokenRejection::Expired));
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = service().issue("7").unwrap();
        let other = TokenService::new("a-completely-different-signing-secret!", 60);
        assert_eq!(other.verify(&token), Err(TokenRejection::BadSignature));
    }

    #[test]
    fn garbage_rejected_as_malformed() {
        let tokens = service();
        assert_eq!(tokens.verify("not.a.jwt"), Err(TokenRejection::Malformed));
        assert_eq!(tokens.verify(""), Err(TokenRejection::Malformed));
    }
}
