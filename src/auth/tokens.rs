//! Signed access/refresh token issuance and verification.
//!
//! Both token kinds carry the same payload but are signed with distinct
//! secrets and TTLs (refresh strictly longer, enforced by
//! [`AuthConfig::validate`](super::config::AuthConfig::validate)). Refresh
//! tokens are additionally anchored in the session store: a token that is no
//! longer the stored value for its user fails the existence check even while
//! its signature is still valid. That is the whole single-active-session
//! mechanism.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

use super::clock::Clock;
use super::config::AuthConfig;
use super::error::AuthError;
use super::models::{Credential, TokenClaims};
use super::store::SessionStore;

/// Hash a refresh token so raw values never touch the database.
/// The digest is what session lookups compare against.
pub(crate) fn hash_refresh_token(token: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().to_vec()
}

pub struct TokenService {
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    access_token_secret: SecretString,
    refresh_token_secret: SecretString,
    access_token_ttl_seconds: i64,
    refresh_token_ttl_seconds: i64,
}

impl TokenService {
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>, clock: Arc<dyn Clock>, config: &AuthConfig) -> Self {
        Self {
            sessions,
            clock,
            access_token_secret: config.access_token_secret().clone(),
            refresh_token_secret: config.refresh_token_secret().clone(),
            access_token_ttl_seconds: config.access_token_ttl_seconds(),
            refresh_token_ttl_seconds: config.refresh_token_ttl_seconds(),
        }
    }

    fn claims(&self, credential: &Credential, ttl_seconds: i64) -> TokenClaims {
        let iat = self.clock.now().timestamp();
        TokenClaims {
            id: credential.id,
            username: credential.username.clone(),
            reset_password: credential.reset_password,
            role: credential.role,
            iat,
            exp: iat + ttl_seconds,
        }
    }

    fn sign(claims: &TokenClaims, secret: &SecretString) -> Result<String, AuthError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
        )
        .map_err(|err| anyhow::anyhow!("failed to sign token: {err}").into())
    }

    fn decode_with(token: &str, secret: &SecretString) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
    }

    /// Issue a short-lived access token. Pure, no side effects.
    pub fn generate_access_token(&self, credential: &Credential) -> Result<String, AuthError> {
        let claims = self.claims(credential, self.access_token_ttl_seconds);
        Self::sign(&claims, &self.access_token_secret)
    }

    /// Issue a refresh token with the longer TTL and the distinct secret.
    pub fn generate_refresh_token(&self, credential: &Credential) -> Result<String, AuthError> {
        let claims = self.claims(credential, self.refresh_token_ttl_seconds);
        Self::sign(&claims, &self.refresh_token_secret)
    }

    /// Verify the bearer token in an `Authorization` header value.
    ///
    /// A missing or malformed header is unauthorized; a present token that
    /// fails signature or expiry checks is forbidden.
    pub fn verify_access_token(
        &self,
        authorization: Option<&str>,
    ) -> Result<TokenClaims, AuthError> {
        let token = authorization
            .and_then(|header| header.strip_prefix("Bearer "))
            .ok_or_else(|| AuthError::unauthorized("Access denied. No token provided."))?;
        Self::decode_with(token, &self.access_token_secret)
            .map_err(|err| AuthError::forbidden(format!("Invalid token: {err}")))
    }

    /// Verify a refresh token against the session store, then its signature.
    ///
    /// The existence check runs first and raises the not-found condition even
    /// for a correctly signed token, so an overwritten session is
    /// distinguishable from a forged or expired one.
    pub async fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let hash = hash_refresh_token(token);
        self.sessions
            .find_by_token_hash(&hash)
            .await?
            .ok_or_else(|| AuthError::not_found("Refresh token not found."))?;

        Self::decode_with(token, &self.refresh_token_secret)
            .map_err(|err| AuthError::forbidden(format!("Invalid token: {err}")))
    }

    /// Upsert the session row for `user_id`, stamping the login time.
    /// Overwrites (and thereby invalidates) any previous session.
    pub async fn store_refresh_token(&self, token: &str, user_id: Uuid) -> Result<(), AuthError> {
        let hash = hash_refresh_token(token);
        self.sessions
            .upsert(user_id, &hash, self.clock.now())
            .await
    }

    /// Delete the session holding `token`; not-found when no row matches.
    pub async fn remove_refresh_token(&self, token: &str) -> Result<(), AuthError> {
        let hash = hash_refresh_token(token);
        if self.sessions.delete_by_token_hash(&hash).await? {
            Ok(())
        } else {
            Err(AuthError::not_found("Refresh token not found."))
        }
    }

    /// Delete every session with `last_login <= cutoff`.
    pub async fn remove_expired_sessions(
        &self,
        cutoff: chrono::DateTime<chrono::Utc>,
    ) -> Result<u64, AuthError> {
        self.sessions.delete_expired(cutoff).await
    }
}
