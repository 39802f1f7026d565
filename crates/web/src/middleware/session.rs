//! Session middleware configuration.
//!
//! Sets up `PostgreSQL`-backed sessions using tower-sessions. The session id
//! cookie is signed with a key derived from `GOMFLOW_SESSION_SECRET`.

use std::time::Duration;

use secrecy::ExposeSecret;
use sha2::{Digest, Sha512};
use sqlx::PgPool;
use tower_sessions::cookie::Key;
use tokio::time::MissedTickBehavior;
use tower_sessions::service::SignedCookie;
use tower_sessions::session_store::{self, ExpiredDeletion};
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::GomflowConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "gomflow_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// How often expired session rows are deleted.
pub const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Create the session layer with `PostgreSQL` store.
///
/// The sessions table is created by the migrations.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &GomflowConfig,
) -> SessionManagerLayer<PostgresStore, SignedCookie> {
    session_layer(PostgresStore::new(pool.clone()), config)
}

/// Session layer over any store; tests use the in-memory store.
#[must_use]
pub fn session_layer<S: SessionStore + Clone>(
    store: S,
    config: &GomflowConfig,
) -> SessionManagerLayer<S, SignedCookie> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(signing_key(config.session_secret.expose_secret()))
}

/// Delete every session row past its expiry date.
///
/// # Errors
///
/// Returns error if the delete query fails.
pub async fn delete_expired_sessions(pool: &PgPool) -> session_store::Result<()> {
    PostgresStore::new(pool.clone()).delete_expired().await
}

/// Spawn the periodic deletion of expired sessions.
///
/// Runs until the process exits; a failed pass is logged and retried on the
/// next tick.
pub fn spawn_session_cleanup(pool: PgPool, every: Duration) {
    tracing::info!(interval_secs = every.as_secs(), "Spawning session cleanup task");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = delete_expired_sessions(&pool).await {
                tracing::warn!(error = %e, "Expired session cleanup failed");
            }
        }
    });
}

/// 64-byte cookie signing key from the configured secret.
fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signing_key_is_deterministic() {
        let a = signing_key("k7Qp2vX9mL4nR8sT1wY6zB3cF5hJ0dG");
        let b = signing_key("k7Qp2vX9mL4nR8sT1wY6zB3cF5hJ0dG");
        let c = signing_key("a different but equally long secret!!");
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }
}
