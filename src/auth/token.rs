/// JWT Token Issuance, Validation and Revocation
///
/// Tokens are HS256-signed. Validation pins the algorithm: the header's `alg`
/// is compared against HS256 and never used to pick a key. Expiry is checked
/// separately against an injected [`Clock`] so that "expired" and "revoked"
/// stay independent states.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::claims::{Claims, TokenKind};
use crate::auth::clock::{Clock, SystemClock};
use crate::auth::nonce::generate_pair_nonce;
use crate::configuration::JwtSettings;
use crate::revocation::{RevocationPolicy, RevocationStore, StoreError, REVOKED_MARKER};

/// TTL for revocation entries of tokens whose expiry cannot be read
const FALLBACK_REVOCATION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token claims are invalid: {0}")]
    InvalidClaims(String),
    #[error("token is invalid")]
    InvalidToken,
    #[error("failed to sign token: {0}")]
    Signing(String),
    #[error(transparent)]
    RevocationStore(#[from] StoreError),
    #[error("unexpected token type: {0}")]
    WrongType(String),
    #[error("token has expired")]
    Expired,
    #[error("token has been revoked")]
    Revoked,
}

/// Issued access/refresh pair
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub access_token: String,
    pub refresh_token: String,
}

/// Token lifetimes in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access_secs: i64,
    pub refresh_secs: i64,
}

impl From<&JwtSettings> for TokenLifetimes {
    fn from(settings: &JwtSettings) -> Self {
        Self {
            access_secs: settings.access_token_expiry_minutes.saturating_mul(60),
            refresh_secs: settings.refresh_token_expiry_minutes.saturating_mul(60),
        }
    }
}

#[async_trait]
pub trait TokenService: Send + Sync {
    fn issue_token_pair(&self, subject_id: Uuid, pair_nonce: &str) -> Result<TokenPair, TokenError>;

    /// Verify shape and signature and decode the claims. Expiry is not checked.
    fn validate(&self, token: &str) -> Result<Claims, TokenError>;

    /// True when the token fails validation or its `exp` is in the past
    fn is_expired(&self, token: &str) -> bool;

    /// Expiry check for claims that were already validated
    fn has_expired(&self, claims: &Claims) -> bool;

    async fn revoke(&self, token: &str) -> Result<(), TokenError>;

    async fn is_revoked(&self, token: &str) -> bool;

    fn extract_subject_id(&self, token: &str) -> Result<Uuid, TokenError>;

    /// Exchange a refresh token for a new pair, revoking the presented one
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError>;
}

pub struct JwtTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetimes: TokenLifetimes,
    store: Arc<dyn RevocationStore>,
    store_timeout: Duration,
    policy: RevocationPolicy,
    clock: Arc<dyn Clock>,
}

impl JwtTokenService {
    pub fn new(settings: &JwtSettings, store: Arc<dyn RevocationStore>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            lifetimes: TokenLifetimes::from(settings),
            store,
            store_timeout: Duration::from_millis(settings.store_timeout_ms),
            policy: settings.revocation_policy,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_lifetimes(mut self, lifetimes: TokenLifetimes) -> Self {
        self.lifetimes = lifetimes;
        self
    }

    fn sign(&self, subject_id: Uuid, pair_nonce: &str, kind: TokenKind, lifetime_secs: i64) -> Result<String, TokenError> {
        let claims = Claims::new(subject_id, pair_nonce, kind, self.clock.now(), lifetime_secs);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn revocation_ttl(&self, token: &str) -> Duration {
        match self.validate(token) {
            Ok(claims) => {
                let remaining = claims.exp.saturating_sub(self.clock.now()).max(1);
                Duration::from_secs(remaining as u64)
            }
            Err(_) => FALLBACK_REVOCATION_TTL,
        }
    }
}

#[async_trait]
impl TokenService for JwtTokenService {
    fn issue_token_pair(&self, subject_id: Uuid, pair_nonce: &str) -> Result<TokenPair, TokenError> {
        let access_token = self.sign(subject_id, pair_nonce, TokenKind::Access, self.lifetimes.access_secs)?;
        let refresh_token = self.sign(subject_id, pair_nonce, TokenKind::Refresh, self.lifetimes.refresh_secs)?;

        Ok(TokenPair {
            token_type: "Bearer".to_string(),
            expires_in: self.lifetimes.access_secs,
            access_token,
            refresh_token,
        })
    }

    fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }

        // An unparseable header (including alg "none") cannot be verified.
        let header = decode_header(token).map_err(|_| TokenError::InvalidSignature)?;
        if header.alg != Algorithm::HS256 {
            return Err(TokenError::InvalidSignature);
        }

        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) | ErrorKind::Utf8(_) => {
                    TokenError::InvalidClaims(e.to_string())
                }
                _ => TokenError::InvalidSignature,
            })
    }

    fn is_expired(&self, token: &str) -> bool {
        match self.validate(token) {
            Ok(claims) => self.has_expired(&claims),
            Err(_) => true,
        }
    }

    fn has_expired(&self, claims: &Claims) -> bool {
        claims.is_expired_at(self.clock.now())
    }

    async fn revoke(&self, token: &str) -> Result<(), TokenError> {
        let ttl = self.revocation_ttl(token);

        tokio::time::timeout(self.store_timeout, self.store.put(token, REVOKED_MARKER, ttl))
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))??;

        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> bool {
        let lookup = tokio::time::timeout(self.store_timeout, self.store.get(token))
            .await
            .map_err(|_| StoreError::Timeout(self.store_timeout))
            .and_then(|result| result);

        match lookup {
            Ok(marker) => marker.is_some(),
            Err(e) => {
                let revoked = self.policy.revoked_on_failure();
                tracing::warn!(
                    error = %e,
                    policy = ?self.policy,
                    treated_as_revoked = revoked,
                    "Revocation lookup failed"
                );
                revoked
            }
        }
    }

    fn extract_subject_id(&self, token: &str) -> Result<Uuid, TokenError> {
        self.validate(token)
            .map_err(|_| TokenError::InvalidToken)?
            .subject_id()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        if self.is_revoked(refresh_token).await {
            return Err(TokenError::Revoked);
        }

        let claims = self.validate(refresh_token)?;
        if self.has_expired(&claims) {
            return Err(TokenError::Expired);
        }
        if claims.kind() != TokenKind::Refresh {
            return Err(TokenError::WrongType(claims.token_type));
        }
        let subject_id = claims.subject_id()?;

        // Only the caller that creates the revocation entry may exchange the token.
        let ttl = self.revocation_ttl(refresh_token);
        let claimed = tokio::time::timeout(
            self.store_timeout,
            self.store.put_if_absent(refresh_token, REVOKED_MARKER, ttl),
        )
        .await
        .map_err(|_| StoreError::Timeout(self.store_timeout))??;
        if !claimed {
            tracing::warn!(user_uuid = %subject_id, "Refresh token already exchanged");
            return Err(TokenError::Revoked);
        }

        let pair = self.issue_token_pair(subject_id, &generate_pair_nonce())?;
        tracing::info!(user_uuid = %subject_id, "Token pair refreshed");
        Ok(pair)
    }
}
