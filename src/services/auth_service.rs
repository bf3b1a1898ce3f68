use anyhow::{anyhow, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::database::IssueStore;
use crate::error::ApiError;
use crate::models::Principal;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized("Invalid credentials"),
            AuthError::InvalidOrExpiredToken => ApiError::Unauthorized("Invalid or expired token"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    name: String,
    iat: i64,
    exp: i64,
}

/// Issues and checks the signed bearer tokens handed to admins.
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(secret: &[u8], token_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            token_ttl,
        }
    }

    pub fn issue_token(&self, principal: &Principal) -> Result<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.token_ttl)
            .ok_or_else(|| anyhow!("token lifetime {} overflows the clock", self.token_ttl))?;
        let claims = Claims {
            sub: principal.id.to_string(),
            email: principal.email.clone(),
            name: principal.name.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow!("failed to sign token: {}", e))
    }

    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AuthError::InvalidOrExpiredToken
        })?;
        let claims = data.claims;
        let id = claims
            .sub
            .parse::<u64>()
            .map_err(|_| AuthError::InvalidOrExpiredToken)?;
        Ok(Principal {
            id,
            email: claims.email,
            name: claims.name,
        })
    }

    /// Checks an admin's email and password and returns a fresh token.
    pub async fn authenticate(
        &self,
        store: &dyn IssueStore,
        email: &str,
        password: &str,
    ) -> Result<(String, Principal), ApiError> {
        let admin = store
            .find_admin_by_email(email)
            .await
            .map_err(ApiError::internal("Internal server error"))?
            .ok_or(AuthError::InvalidCredentials)?;

        let valid = verify_password(password, &admin.password_hash)
            .map_err(ApiError::internal("Internal server error"))?;
        if !valid {
            tracing::info!("Failed login for {}", email);
            return Err(AuthError::InvalidCredentials.into());
        }

        let principal = Principal::from(&admin);
        let token = self
            .issue_token(&principal)
            .map_err(ApiError::internal("Internal server error"))?;
        tracing::info!("Admin {} logged in", principal.email);
        Ok((token, principal))
    }
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {}", e))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| anyhow!("stored password hash is malformed: {}", e))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow!("failed to verify password: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryIssueStore;

    fn service() -> AuthService {
        AuthService::new(b"test-secret", Duration::hours(24))
    }

    fn principal() -> Principal {
        Principal {
            id: 1,
            email: "admin@community.com".to_string(),
            name: "System Admin".to_string(),
        }
    }

    #[test]
    fn test_token_round_trip() {
        let auth = service();
        let token = auth.issue_token(&principal()).unwrap();
        assert_eq!(auth.verify(&token).unwrap(), principal());
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let other = AuthService::new(b"another-secret", Duration::hours(24));
        let token = other.issue_token(&principal()).unwrap();
        assert_eq!(service().verify(&token), Err(AuthError::InvalidOrExpiredToken));
        assert_eq!(service().verify("not-a-token"), Err(AuthError::InvalidOrExpiredToken));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let auth = service();
        let issued = Utc::now() - Duration::hours(25);
        let claims = Claims {
            sub: "1".to_string(),
            email: "admin@community.com".to_string(),
            name: "System Admin".to_string(),
            iat: issued.timestamp(),
            exp: (issued + Duration::hours(24)).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &auth.encoding_key).unwrap();
        assert_eq!(auth.verify(&token), Err(AuthError::InvalidOrExpiredToken));
    }

    #[test]
    fn test_unrepresentable_lifetime_is_an_error() {
        let auth = AuthService::new(b"test-secret", Duration::hours(3_000_000_000));
        assert!(auth.issue_token(&principal()).is_err());
    }

    #[test]
    fn test_password_hashing() {
        let hash = hash_password("admin123").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("admin123", &hash).unwrap());
        assert!(!verify_password("admin124", &hash).unwrap());
        assert!(verify_password("admin123", "plaintext").is_err());
    }

    #[tokio::test]
    async fn test_authenticate() {
        let store = InMemoryIssueStore::new();
        store
            .upsert_admin("admin@community.com", &hash_password("admin123").unwrap(), "System Admin")
            .await
            .unwrap();
        let auth = service();

        let (token, admin) = auth.authenticate(&store, "admin@community.com", "admin123").await.unwrap();
        assert_eq!(admin.email, "admin@community.com");
        assert_eq!(auth.verify(&token).unwrap().id, admin.id);

        let wrong = auth.authenticate(&store, "admin@community.com", "nope").await.unwrap_err();
        assert!(matches!(wrong, ApiError::Unauthorized("Invalid credentials")));
        let unknown = auth.authenticate(&store, "who@community.com", "admin123").await.unwrap_err();
        assert!(matches!(unknown, ApiError::Unauthorized("Invalid credentials")));
    }
}
