use crate::config::AuthConfig;
use crate::handlers::password::{hash_password, verify_password};
use crate::handlers::user_repository::{DbError, UserRepository};
use crate::models::all_models::{Principal, UserRole};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime used when the caller does not ask for one.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Covers bad signature, malformed payload and expiry alike.
    #[error("invalid token")]
    InvalidToken,

    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("credential lookup failed: {0}")]
    Lookup(#[from] DbError),
}

/// Structure representing JWT claims
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: String, // Username
    pub role: UserRole,
    pub id: Uuid,   // User ID
    pub exp: usize, // Expiration timestamp
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Issues and verifies signed access tokens with the configured secret.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    header: Header,
    validation: Validation,
    access_token_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        TokenCodec {
            encoding_key: EncodingKey::from_secret(config.secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            header: Header::new(config.algorithm),
            validation,
            access_token_ttl: config.access_token_ttl,
        }
    }

    /// Lifetime configured for tokens handed out at login.
    pub fn access_token_ttl(&self) -> Duration {
        self.access_token_ttl
    }

    /// Signs a token for `principal` expiring `ttl` from now, 15 minutes when
    /// no ttl is given.
    pub fn issue(&self, principal: &Principal, ttl: Option<Duration>) -> Result<String, AuthError> {
        let ttl = ttl.unwrap_or_else(|| Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES));
        let expiration = Utc::now()
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Encoding(format!("token lifetime {} is out of range", ttl)))?
            .timestamp()
            .max(0);

        let claims = Claims {
            sub: principal.username.clone(),
            role: principal.role,
            id: principal.user_id,
            exp: expiration as usize,
        };

        encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Encoding(e.to_string()))
    }

    /// Verifies signature and expiry. Every failure is reported as the same
    /// `InvalidToken`, the underlying reason only reaches the debug log.
    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {:?}", e.kind());
                AuthError::InvalidToken
            })
    }
}

lazy_static! {
    // Verified against when the username is unknown, so both misses cost the same.
    static ref DUMMY_HASH: String = hash_password("dummy-password").unwrap_or_default();
}

/// Checks a username/password pair against stored credentials.
///
/// Unknown user and wrong password both come back as `Ok(None)`.
pub async fn authenticate_user(
    repo: &dyn UserRepository,
    username: &str,
    password: &str,
) -> Result<Option<Principal>, AuthError> {
    let credential = repo.find_by_username(username).await?.map(|u| u.credential());

    match credential {
        Some(credential) if verify_password(password, &credential.password_hash) => {
            Ok(Some(credential.into()))
        }
        Some(_) => Ok(None),
        None => {
            verify_password(password, &DUMMY_HASH);
            Ok(None)
        }
    }
}
