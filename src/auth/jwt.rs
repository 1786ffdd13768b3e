use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::{AccessClaims, KindedClaims, RefreshClaims, TokenKind};
use crate::config::JwtConfig;

/// Why a token was rejected. Callers collapse all of these to a single
/// "unauthorized" outcome, but the variants stay distinct for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("expected a {expected:?} token")]
    WrongKind { expected: TokenKind },

    #[error("token signing failed: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            other => TokenError::Malformed(format!("{other:?}")),
        }
    }
}

/// A freshly signed token with its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Clone)]
struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKey {
    fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs((ttl_minutes.max(0) as u64) * 60),
        }
    }
}

/// Signs and verifies access and refresh tokens. The two kinds use separate
/// secrets and are never interchangeable.
#[derive(Clone)]
pub struct TokenCodec {
    access: SigningKey,
    refresh: SigningKey,
    issuer: String,
    audience: String,
}

impl TokenCodec {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            access: SigningKey::new(&cfg.access_secret, cfg.access_ttl_minutes),
            refresh: SigningKey::new(&cfg.refresh_secret, cfg.refresh_ttl_minutes),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    fn window(ttl: Duration, now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
        (now, now + TimeDuration::seconds(ttl.as_secs() as i64))
    }

    fn sign<C: Serialize>(&self, claims: &C, key: &SigningKey) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &key.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub fn sign_access(&self, user_id: Uuid, email: &str) -> Result<IssuedToken, TokenError> {
        self.sign_access_at(user_id, email, OffsetDateTime::now_utc())
    }

    pub(crate) fn sign_access_at(
        &self,
        user_id: Uuid,
        email: &str,
        issued_at: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        let (now, exp) = Self::window(self.access.ttl, issued_at);
        let claims = AccessClaims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            kind: TokenKind::Access,
        };
        let token = self.sign(&claims, &self.access)?;
        debug!(user_id = %user_id, kind = ?TokenKind::Access, "jwt signed");
        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    pub fn sign_refresh(&self, user_id: Uuid) -> Result<IssuedToken, TokenError> {
        self.sign_refresh_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn sign_refresh_at(
        &self,
        user_id: Uuid,
        issued_at: OffsetDateTime,
    ) -> Result<IssuedToken, TokenError> {
        let (now, exp) = Self::window(self.refresh.ttl, issued_at);
        let claims = RefreshClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4(),
            kind: TokenKind::Refresh,
        };
        let token = self.sign(&claims, &self.refresh)?;
        debug!(user_id = %user_id, kind = ?TokenKind::Refresh, "jwt signed");
        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    fn verify<C>(&self, token: &str, key: &SigningKey, expected: TokenKind) -> Result<C, TokenError>
    where
        C: DeserializeOwned + KindedClaims,
    {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);

        let data = decode::<C>(token, &key.decoding, &validation)?;
        if data.claims.kind() != expected {
            return Err(TokenError::WrongKind { expected });
        }
        Ok(data.claims)
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.verify(token, &self.access, TokenKind::Access)?;
        debug!(user_id = %claims.sub, kind = ?claims.kind, "jwt verified");
        Ok(claims)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.verify(token, &self.refresh, TokenKind::Refresh)?;
        debug!(user_id = %claims.sub, kind = ?claims.kind, "jwt verified");
        Ok(claims)
    }
}
