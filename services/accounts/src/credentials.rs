//! Credential manager: password hashing, session tokens and reset tokens
//!
//! Passwords are hashed with argon2id and a fresh salt per call. Session
//! tokens are HS256 JWTs signed with a process-wide secret. Reset tokens are
//! random values delivered out of band; only their SHA-256 digest is stored.

use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::SaltString,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Bytes of entropy in a reset token
pub const RESET_TOKEN_BYTES: usize = 20;

/// Lifetime of a reset token
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hashing(String),

    #[error("failed to sign session token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("invalid session token: {0}")]
    InvalidSessionToken(#[source] jsonwebtoken::errors::Error),
}

/// Argon2 work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// Credential configuration
#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Secret used to sign session tokens
    pub jwt_secret: String,
    /// Session token lifetime in seconds (default: 30 days)
    pub jwt_expiry: u64,
    pub hash_cost: HashCost,
}

impl CredentialConfig {
    /// Create a new CredentialConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_SECRET`: Secret for signing session tokens (required)
    /// - `JWT_EXPIRE`: Session token lifetime in seconds (default: 2592000)
    /// - `HASH_MEMORY_KIB`, `HASH_ITERATIONS`, `HASH_PARALLELISM`: argon2 cost
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable not set"))?;

        if jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let jwt_expiry = std::env::var("JWT_EXPIRE")
            .unwrap_or_else(|_| "2592000".to_string()) // 30 days
            .parse()
            .unwrap_or(2_592_000);

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: env_or("HASH_MEMORY_KIB", defaults.memory_kib),
            iterations: env_or("HASH_ITERATIONS", defaults.iterations),
            parallelism: env_or("HASH_PARALLELISM", defaults.parallelism),
        };

        Ok(CredentialConfig {
            jwt_secret,
            jwt_expiry,
            hash_cost,
        })
    }
}

fn env_or(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account ID
    pub sub: Uuid,
    /// Issued at time
    pub iat: u64,
    /// Expiration time
    pub exp: u64,
}

/// Freshly issued reset token
#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Delivered to the account owner, never stored
    pub raw: String,
    /// SHA-256 hex digest of `raw`, stored on the account
    pub hashed: String,
    pub expires_at: DateTime<Utc>,
}

/// Credential manager
#[derive(Clone)]
pub struct CredentialManager {
    params: Params,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    jwt_expiry: u64,
}

impl CredentialManager {
    pub fn new(config: CredentialConfig) -> Result<Self> {
        let params = Params::new(
            config.hash_cost.memory_kib,
            config.hash_cost.iterations,
            config.hash_cost.parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid password hash cost: {}", e))?;

        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;

        Ok(Self {
            params,
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            jwt_expiry: config.jwt_expiry,
        })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password into a PHC string
    pub fn hash_password(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut rand::thread_rng());
        let hash = self
            .hasher()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// Parameters are read from the stored hash, so hashes produced under an
    /// older cost still verify.
    pub fn verify_password(&self, plaintext: &str, stored_hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(stored_hash) else {
            return false;
        };
        self.hasher()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Issue a signed session token for an account
    pub fn issue_session_token(&self, account_id: Uuid) -> Result<String, CredentialError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: account_id,
            iat: now,
            exp: now + self.jwt_expiry,
        };

        encode(
            &Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .map_err(CredentialError::Signing)
    }

    /// Validate a session token and return the claims
    pub fn validate_session_token(&self, token: &str) -> Result<Claims, CredentialError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(CredentialError::InvalidSessionToken)?;
        Ok(token_data.claims)
    }

    /// Generate a random reset token valid for ten minutes from `now`
    pub fn issue_reset_token(&self, now: DateTime<Utc>) -> ResetToken {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let raw = hex::encode(bytes);
        let hashed = Self::hash_reset_token(&raw);

        ResetToken {
            raw,
            hashed,
            expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }

    /// SHA-256 hex digest of a raw reset token
    pub fn hash_reset_token(raw: &str) -> String {
        hex::encode(Sha256::digest(raw.as_bytes()))
    }

    /// Accept a reset token only if it matches the stored digest and has not
    /// expired. The caller clears the stored fields on acceptance.
    pub fn consume_reset_token(
        &self,
        candidate: &str,
        stored_hash: Option<&str>,
        stored_expiry: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let (Some(stored_hash), Some(stored_expiry)) = (stored_hash, stored_expiry) else {
            return false;
        };
        Self::hash_reset_token(candidate) == stored_hash && now < stored_expiry
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serial_test::serial;

    pub(crate) fn test_manager() -> CredentialManager {
        CredentialManager::new(CredentialConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiry: 3600,
            hash_cost: HashCost {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
        })
        .unwrap()
    }

    #[test]
    fn test_hash_verifies_only_matching_password() {
        let manager = test_manager();
        let hash = manager.hash_password("hunter22").unwrap();

        assert_ne!(hash, "hunter22");
        assert!(manager.verify_password("hunter22", &hash));
        assert!(!manager.verify_password("hunter23", &hash));
        assert!(!manager.verify_password("", &hash));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let manager = test_manager();
        let first = manager.hash_password("hunter22").unwrap();
        let second = manager.hash_password("hunter22").unwrap();

        assert_ne!(first, second);
        assert!(manager.verify_password("hunter22", &first));
        assert!(manager.verify_password("hunter22", &second));
    }

    #[test]
    fn test_garbage_hash_does_not_verify() {
        let manager = test_manager();
        assert!(!manager.verify_password("hunter22", "not-a-phc-string"));
        assert!(!manager.verify_password("hunter22", ""));
    }

    #[test]
    fn test_session_token_round_trip() {
        let manager = test_manager();
        let id = Uuid::new_v4();
        let token = manager.issue_session_token(id).unwrap();

        let claims = manager.validate_session_token(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_session_token_from_other_secret_is_rejected() {
        let manager = test_manager();
        let other = CredentialManager::new(CredentialConfig {
            jwt_secret: "another-secret".to_string(),
            jwt_expiry: 3600,
            hash_cost: HashCost::default(),
        })
        .unwrap();

        let token = other.issue_session_token(Uuid::new_v4()).unwrap();
        assert!(matches!(
            manager.validate_session_token(&token),
            Err(CredentialError::InvalidSessionToken(_))
        ));
    }

    #[test]
    fn test_reset_token_shape() {
        let manager = test_manager();
        let now = Utc::now();
        let token = manager.issue_reset_token(now);

        assert_eq!(token.raw.len(), RESET_TOKEN_BYTES * 2);
        assert_eq!(token.hashed.len(), 64);
        assert_ne!(token.raw, token.hashed);
        assert_eq!(token.hashed, CredentialManager::hash_reset_token(&token.raw));
        assert_eq!(token.expires_at - now, Duration::minutes(10));
        assert_ne!(token.raw, manager.issue_reset_token(now).raw);
    }

    #[test]
    fn test_reset_token_accepted_only_before_expiry() {
        let manager = test_manager();
        let now = Utc::now();
        let token = manager.issue_reset_token(now);
        let stored = Some(token.hashed.as_str());
        let expiry = Some(token.expires_at);

        assert!(manager.consume_reset_token(&token.raw, stored, expiry, now));
        assert!(manager.consume_reset_token(
            &token.raw,
            stored,
            expiry,
            token.expires_at - Duration::seconds(1)
        ));
        assert!(!manager.consume_reset_token(&token.raw, stored, expiry, token.expires_at));
        assert!(!manager.consume_reset_token(
            &token.raw,
            stored,
            expiry,
            token.expires_at + Duration::minutes(1)
        ));
    }

    #[test]
    fn test_wrong_reset_token_rejected_regardless_of_expiry() {
        let manager = test_manager();
        let now = Utc::now();
        let token = manager.issue_reset_token(now);
        let stored = Some(token.hashed.as_str());

        assert!(!manager.consume_reset_token("deadbeef", stored, Some(token.expires_at), now));
        // The stored digest itself is not a valid token
        assert!(!manager.consume_reset_token(&token.hashed, stored, Some(token.expires_at), now));
        assert!(!manager.consume_reset_token(&token.raw, None, Some(token.expires_at), now));
        assert!(!manager.consume_reset_token(&token.raw, stored, None, now));
    }

    #[test]
    #[serial]
    fn test_credential_config_requires_secret() {
        unsafe {
            std::env::remove_var("JWT_SECRET");
        }
        assert!(CredentialConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_credential_config_from_env() {
        unsafe {
            std::env::set_var("JWT_SECRET", "s3cret");
            std::env::set_var("JWT_EXPIRE", "60");
            std::env::set_var("HASH_ITERATIONS", "3");
        }

        let config = CredentialConfig::from_env().unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.jwt_expiry, 60);
        assert_eq!(config.hash_cost.iterations, 3);
        assert_eq!(config.hash_cost.memory_kib, Params::DEFAULT_M_COST);

        unsafe {
            std::env::remove_var("JWT_SECRET");
            std::env::remove_var("JWT_EXPIRE");
            std::env::remove_var("HASH_ITERATIONS");
        }
    }
}
