use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Payload of a short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,       // user ID
    pub email: String,   // user email at issue time
    pub iat: usize,      // issued at (unix timestamp)
    pub exp: usize,      // expires at (unix timestamp)
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub jti: Uuid,       // unique token id
    pub kind: TokenKind, // always Access
}

/// Payload of a refresh token. Carries no email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    pub jti: Uuid,
    pub kind: TokenKind,
}

/// Claims that carry a token kind, so decoding can reject the wrong one.
pub trait KindedClaims {
    fn kind(&self) -> TokenKind;
}

impl KindedClaims for AccessClaims {
    fn kind(&self) -> TokenKind {
        self.kind
    }
}

impl KindedClaims for RefreshClaims {
    fn kind(&self) -> TokenKind {
        self.kind
    }
}
