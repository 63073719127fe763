//! Authentication orchestrator: login, refresh, password reset, logout.
//!
//! Owns every transition of the credential lockout fields. Each branch of the
//! login state machine persists its mutation before returning so the counters
//! survive restarts.

use argon2::Argon2;
use std::sync::Arc;
use uuid::Uuid;

use super::clock::Clock;
use super::config::AuthConfig;
use super::error::AuthError;
use super::models::Credential;
use super::password;
use super::store::CredentialStore;
use super::tokens::TokenService;

const INVALID_CREDENTIALS: &str = "Invalid username or password.";
const ACCOUNT_LOCKED: &str = "Account is locked. Try again later.";
const COOKIE_REQUIRED: &str = "Cookie must be provided.";

/// Token pair returned by a successful login.
#[derive(Debug)]
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<TokenService>,
    clock: Arc<dyn Clock>,
    argon2: Argon2<'static>,
    lock_duration_seconds: i64,
    max_login_attempts: i32,
}

impl AuthService {
    /// # Errors
    /// Fails if the configured argon2 work factor is out of range.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<TokenService>,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            credentials,
            tokens,
            clock,
            argon2: password::hasher(config.hash_time_cost())?,
            lock_duration_seconds: config.lock_duration_seconds(),
            max_login_attempts: config.max_login_attempts(),
        })
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Hash a plain password for storage (registration and reset side).
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        password::hash_password(&self.argon2, password)
    }

    /// Authenticate a user and issue a token pair.
    ///
    /// Unknown usernames fail with the same generic unauthorized message as a
    /// wrong password, to avoid confirming account existence. A locked
    /// account stays locked until the lock window has elapsed, regardless of
    /// the supplied password.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginTokens, AuthError> {
        let Some(mut credential) = self.credentials.find_by_username(username).await? else {
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        };

        let now = self.clock.now();

        if credential.account_locked {
            if let Some(last_failed) = credential.last_failed_login_date {
                let elapsed = now.signed_duration_since(last_failed);
                if elapsed.num_seconds() < self.lock_duration_seconds {
                    return Err(AuthError::too_many_requests(ACCOUNT_LOCKED));
                }
                // Lock window elapsed: unlock in memory; the next branch that
                // persists will write these fields out.
                credential.failed_login_attempts = 0;
                credential.account_locked = false;
                credential.last_failed_login_date = None;
            }
        }

        if credential.failed_login_attempts >= self.max_login_attempts {
            credential.account_locked = true;
            self.persist_login_state(&credential).await?;
            return Err(AuthError::too_many_requests(ACCOUNT_LOCKED));
        }

        if !password::verify_password(
            &self.argon2,
            password.trim(),
            &credential.password_hash,
        )? {
            credential.failed_login_attempts += 1;
            credential.last_failed_login_date = Some(now);
            self.persist_login_state(&credential).await?;
            return Err(AuthError::unauthorized(INVALID_CREDENTIALS));
        }

        // Successful login always leaves the counters clean.
        credential.failed_login_attempts = 0;
        credential.account_locked = false;
        credential.last_failed_login_date = None;
        self.persist_login_state(&credential).await?;

        let access_token = self.tokens.generate_access_token(&credential)?;
        let refresh_token = self.tokens.generate_refresh_token(&credential)?;
        self.tokens
            .store_refresh_token(&refresh_token, credential.id)
            .await?;

        Ok(LoginTokens {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh-token cookie for a new access token.
    ///
    /// The refresh token itself is not rotated; it stays valid until its own
    /// expiry or until the session row is replaced or removed.
    pub async fn refresh_access_token(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<String, AuthError> {
        let refresh_token = non_empty(refresh_token)
            .ok_or_else(|| AuthError::unauthorized(COOKIE_REQUIRED))?;

        let claims = self.tokens.verify_refresh_token(refresh_token).await?;

        let credential = self
            .credentials
            .find_by_id(claims.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("user {} not found for stored session", claims.id))?;

        self.tokens.generate_access_token(&credential)
    }

    /// Replace the password and revoke the current session, forcing
    /// re-authentication.
    pub async fn reset_password(
        &self,
        user_id: Uuid,
        refresh_token: Option<&str>,
        password: &str,
        confirm_password: &str,
    ) -> Result<(), AuthError> {
        let refresh_token = non_empty(refresh_token)
            .ok_or_else(|| AuthError::unauthorized(COOKIE_REQUIRED))?;

        if self.credentials.find_by_id(user_id).await?.is_none() {
            return Err(AuthError::unauthorized("Member not found."));
        }

        if password != confirm_password {
            return Err(AuthError::unauthorized("Passwords do not match."));
        }

        let password_hash = self.hash_password(password)?;
        self.credentials
            .update_password(user_id, &password_hash)
            .await?;

        self.tokens.remove_refresh_token(refresh_token).await
    }

    /// Remove the session row for the presented refresh-token cookie.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let refresh_token = non_empty(refresh_token)
            .ok_or_else(|| AuthError::unauthorized(COOKIE_REQUIRED))?;
        self.tokens.remove_refresh_token(refresh_token).await
    }

    async fn persist_login_state(&self, credential: &Credential) -> Result<(), AuthError> {
        self.credentials
            .update_login_state(
                credential.id,
                credential.failed_login_attempts,
                credential.account_locked,
                credential.last_failed_login_date,
            )
            .await
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::manual::ManualClock;
    use crate::auth::models::{NewCredential, Role};
    use crate::auth::store::memory::{InMemoryCredentialStore, InMemorySessionStore};
    use crate::auth::store::SessionStore;
    use chrono::Duration;
    use secrecy::SecretString;

    struct Harness {
        service: AuthService,
        credentials: Arc<InMemoryCredentialStore>,
        sessions: Arc<InMemorySessionStore>,
        clock: Arc<ManualClock>,
    }

    fn config() -> AuthConfig {
        AuthConfig::new(
            SecretString::from("access-secret".to_string()),
            SecretString::from("refresh-secret".to_string()),
        )
        .with_access_token_ttl_seconds(300)
        .with_refresh_token_ttl_seconds(900)
        .with_lock_duration_seconds(60)
        .with_max_login_attempts(5)
        // keep hashing cheap for the state-machine tests
        .with_hash_time_cost(1)
    }

    fn harness() -> Harness {
        let credentials = Arc::new(InMemoryCredentialStore::new());
        let sessions = Arc::new(InMemorySessionStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let config = config();
        let tokens = Arc::new(TokenService::new(
            Arc::clone(&sessions) as Arc<dyn SessionStore>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            &config,
        ));
        let service = AuthService::new(
            Arc::clone(&credentials) as Arc<dyn CredentialStore>,
            tokens,
            Arc::clone(&clock) as Arc<dyn Clock>,
            &config,
        )
        .expect("build auth service");
        Harness {
            service,
            credentials,
            sessions,
            clock,
        }
    }

    async fn seed_user(harness: &Harness, username: &str, password: &str) -> Uuid {
        let password_hash = harness.service.hash_password(password).expect("hash");
        let credential = harness
            .credentials
            .insert(NewCredential {
                username: username.to_string(),
                password_hash,
                role: Role::Employee,
            })
            .await
            .expect("seed user");
        credential.id
    }

    async fn attempts(harness: &Harness, username: &str) -> i32 {
        harness
            .credentials
            .find_by_username(username)
            .await
            .expect("lookup")
            .expect("user exists")
            .failed_login_attempts
    }

    #[tokio::test]
    async fn unknown_username_is_generic_unauthorized() {
        let harness = harness();
        let err = harness
            .service
            .login("nobody", "whatever")
            .await
            .expect_err("unknown user");
        assert!(matches!(err, AuthError::Unauthorized(ref msg) if msg == INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn wrong_password_increments_counter_and_stamps_failure() {
        let harness = harness();
        seed_user(&harness, "alice1", "hunter2hunter2").await;

        let err = harness
            .service
            .login("alice1", "wrong")
            .await
            .expect_err("wrong password");
        assert!(matches!(err, AuthError::Unauthorized(_)));
        assert_eq!(attempts(&harness, "alice1").await, 1);

        let stored = harness
            .credentials
            .find_by_username("alice1")
            .await
            .expect("lookup")
            .expect("user exists");
        assert!(stored.last_failed_login_date.is_some());
        assert!(!stored.account_locked);
    }

    #[tokio::test]
    async fn successful_login_resets_counters_and_stores_session() {
        let harness = harness();
        let user_id = seed_user(&harness, "alice1", "hunter2hunter2").await;

        for _ in 0..3 {
            let _ = harness.service.login("alice1", "wrong").await;
        }
        assert_eq!(attempts(&harness, "alice1").await, 3);

        let tokens = harness
            .service
            .login("alice1", "hunter2hunter2")
            .await
            .expect("correct password");
        assert!(!tokens.access_token.is_empty());
        assert!(!tokens.refresh_token.is_empty());
        assert_eq!(attempts(&harness, "alice1").await, 0);

        let session = harness
            .sessions
            .find_by_token_hash(&crate::auth::tokens::hash_refresh_token(
                &tokens.refresh_token,
            ))
            .await
            .expect("lookup");
        assert_eq!(session.expect("session stored").user_id, user_id);
    }

    #[tokio::test]
    async fn lockout_scenario_alice01() {
        // maxAttempts = 5, lockDuration = 60s.
        let harness = harness();
        seed_user(&harness, "alice01", "hunter2hunter2").await;

        for _ in 0..5 {
            let err = harness
                .service
                .login("alice01", "wrong")
                .await
                .expect_err("wrong password");
            assert!(matches!(err, AuthError::Unauthorized(_)));
        }
        assert_eq!(attempts(&harness, "alice01").await, 5);

        // Sixth attempt with the correct password: still locked out.
        let err = harness
            .service
            .login("alice01", "hunter2hunter2")
            .await
            .expect_err("locked account");
        assert!(matches!(err, AuthError::TooManyRequests(_)));
        assert!(
            harness
                .credentials
                .find_by_username("alice01")
                .await
                .expect("lookup")
                .expect("user exists")
                .account_locked
        );

        // Still inside the lock window.
        harness.clock.advance(Duration::seconds(30));
        let err = harness
            .service
            .login("alice01", "hunter2hunter2")
            .await
            .expect_err("still locked");
        assert!(matches!(err, AuthError::TooManyRequests(_)));

        // 61 seconds after the last failure the lock has elapsed.
        harness.clock.advance(Duration::seconds(31));
        let tokens = harness
            .service
            .login("alice01", "hunter2hunter2")
            .await
            .expect("lock elapsed");
        assert!(!tokens.access_token.is_empty());
        assert!(!tokens.refresh_token.is_empty());

        let stored = harness
            .credentials
            .find_by_username("alice01")
            .await
            .expect("lookup")
            .expect("user exists");
        assert_eq!(stored.failed_login_attempts, 0);
        assert!(!stored.account_locked);
        assert!(stored.last_failed_login_date.is_none());
    }

    #[tokio::test]
    async fn lock_elapsed_but_wrong_password_restarts_counting() {
        let harness = harness();
        seed_user(&harness, "alice1", "hunter2hunter2").await;

        for _ in 0..5 {
            let _ = harness.service.login("alice1", "wrong").await;
        }
        let _ = harness.service.login("alice1", "wrong").await; // locks
        harness.clock.advance(Duration::seconds(61));

        let err = harness
            .service
            .login("alice1", "wrong")
            .await
            .expect_err("wrong password after unlock");
        assert!(matches!(err, AuthError::Unauthorized(_)));
        let stored = harness
            .credentials
            .find_by_username("alice1")
            .await
            .expect("lookup")
            .expect("user exists");
        assert_eq!(stored.failed_login_attempts, 1);
        assert!(!stored.account_locked);
    }

    #[tokio::test]
    async fn login_overwrites_previous_session() {
        let harness = harness();
        seed_user(&harness, "alice1", "hunter2hunter2").await;

        let first = harness
            .service
            .login("alice1", "hunter2hunter2")
            .await
            .expect("first login");
        harness.clock.advance(Duration::seconds(1));
        let second = harness
            .service
            .login("alice1", "hunter2hunter2")
            .await
            .expect("second login");

        let err = harness
            .service
            .tokens()
            .verify_refresh_token(&first.refresh_token)
            .await
            .expect_err("first session overwritten");
        assert!(matches!(err, AuthError::NotFound(_)));
        assert!(harness
            .service
            .tokens()
            .verify_refresh_token(&second.refresh_token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn refresh_issues_access_token_without_rotating_refresh() {
        let harness = harness();
        seed_user(&harness, "alice1", "hunter2hunter2").await;
        let tokens = harness
            .service
            .login("alice1", "hunter2hunter2")
            .await
            .expect("login");

        let access = harness
            .service
            .refresh_access_token(Some(&tokens.refresh_token))
            .await
            .expect("refresh");
        assert!(!access.is_empty());

        // The same refresh token keeps working across renewals.
        assert!(harness
            .service
            .refresh_access_token(Some(&tokens.refresh_token))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn refresh_without_cookie_is_unauthorized() {
        let harness = harness();
        let err = harness
            .service
            .refresh_access_token(None)
            .await
            .expect_err("no cookie");
        assert!(matches!(err, AuthError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn logout_removes_session_and_requires_cookie() {
        let harness = harness();
        seed_user(&harness, "alice1", "hunter2hunter2").await;
        let tokens = harness
            .service
            .login("alice1", "hunter2hunter2")
            .await
            .expect("login");

        let err = harness.service.logout(None).await.expect_err("no cookie");
        assert!(matches!(err, AuthError::Unauthorized(_)));

        harness
            .service
            .logout(Some(&tokens.refresh_token))
            .await
            .expect("logout");
        let err = harness
            .service
            .refresh_access_token(Some(&tokens.refresh_token))
            .await
            .expect_err("session removed");
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn reset_password_updates_hash_and_revokes_session() {
        let harness = harness();
        let user_id = seed_user(&harness, "alice1", "old-password").await;
        let tokens = harness
            .service
            .login("alice1", "old-password")
            .await
            .expect("login");

        harness
            .service
            .reset_password(
                user_id,
                Some(&tokens.refresh_token),
                "new-password",
                "new-password",
            )
            .await
            .expect("reset password");

        let stored = harness
            .credentials
            .find_by_username("alice1")
            .await
            .expect("lookup")
            .expect("user exists");
        assert!(stored.reset_password);

        // Old session is revoked; old password no longer works.
        let err = harness
            .service
            .refresh_access_token(Some(&tokens.refresh_token))
            .await
            .expect_err("session revoked");
        assert!(matches!(err, AuthError::NotFound(_)));
        assert!(harness.service.login("alice1", "old-password").await.is_err());
        assert!(harness
            .service
            .login("alice1", "new-password")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn reset_password_rejects_mismatched_confirmation() {
        let harness = harness();
        let user_id = seed_user(&harness, "alice1", "old-password").await;
        let tokens = harness
            .service
            .login("alice1", "old-password")
            .await
            .expect("login");

        let err = harness
            .service
            .reset_password(
                user_id,
                Some(&tokens.refresh_token),
                "new-password",
                "different",
            )
            .await
            .expect_err("mismatched confirmation");
        assert!(matches!(err, AuthError::Unauthorized(_)));
    }
}
