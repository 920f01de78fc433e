/// JWT Claims structure
///
/// Payload of a session token: subject, pair nonce, issue and expiry times
/// (unix seconds) and a `type` tag.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::token::TokenError;

/// Token type tag carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    Webview,
    Unknown,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
            TokenKind::Webview => "webview",
            TokenKind::Unknown => "unknown",
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "access" => TokenKind::Access,
            "refresh" => TokenKind::Refresh,
            "webview" => TokenKind::Webview,
            _ => TokenKind::Unknown,
        }
    }

    /// Whether a token of this kind may be presented to protected routes
    pub fn grants_resource_access(&self) -> bool {
        matches!(self, TokenKind::Access | TokenKind::Webview)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user uuid as string)
    pub user_id: String,
    /// Pair nonce shared by the access and refresh token of one issuance
    pub tokens: String,
    pub iat: i64,
    pub exp: i64,
    /// Raw tag; unknown values are kept so the gate can reject them
    #[serde(rename = "type")]
    pub token_type: String,
}

impl Claims {
    pub fn new(
        subject_id: Uuid,
        pair_nonce: &str,
        kind: TokenKind,
        issued_at: i64,
        lifetime_secs: i64,
    ) -> Self {
        Self {
            user_id: subject_id.to_string(),
            tokens: pair_nonce.to_string(),
            iat: issued_at,
            exp: issued_at.saturating_add(lifetime_secs),
            token_type: kind.as_str().to_string(),
        }
    }

    pub fn kind(&self) -> TokenKind {
        TokenKind::parse(&self.token_type)
    }

    /// # Errors
    /// Returns `TokenError::InvalidToken` if the subject is absent or not a uuid
    pub fn subject_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.user_id).map_err(|_| TokenError::InvalidToken)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp < now
    }
}
