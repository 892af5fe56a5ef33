//! In-memory session token registry.
//!
//! Tokens are issued on successful admin login and die with the process.
//! The map is owned by a single [`TokenRegistry`] value; every mutation goes
//! through `issue` / `validate` / `sweep`. Eviction is idempotent — an entry,
//! once removed, never reappears.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Interval at which the periodic sweeper runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Credential failures, one variant per caller-visible message.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing credentials")]
    Missing,
    #[error("invalid or expired session")]
    Invalid,
}

/// Process-lifetime map of opaque tokens to expiry instants.
pub struct TokenRegistry {
    ttl: Duration,
    tokens: Mutex<HashMap<String, Instant>>,
}

impl TokenRegistry {
    pub fn new(ttl_minutes: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_minutes * 60),
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Generate a fresh token and register it with expiry = now + TTL.
    ///
    /// UUID v4 hex — drawn from the OS entropy source, unique with
    /// overwhelming probability.
    pub async fn issue(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut tokens = self.tokens.lock().await;
        prune(&mut tokens, Instant::now());
        tokens.insert(token.clone(), Instant::now() + self.ttl);
        token
    }

    /// Check an `Authorization` header of the form `<scheme> <token>`.
    ///
    /// Returns the accepted token. Expired entries are swept on entry, so a
    /// stale token fails exactly as if it had never been issued.
    pub async fn validate(&self, header: Option<&str>) -> Result<String, AuthError> {
        let token = header
            .and_then(|h| h.split_once(' '))
            .map(|(_, t)| t.trim())
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Missing)?;

        let mut tokens = self.tokens.lock().await;
        prune(&mut tokens, Instant::now());
        if !tokens.contains_key(token) {
            return Err(AuthError::Invalid);
        }
        Ok(token.to_string())
    }

    /// Remove every entry whose expiry has passed. Returns how many fell.
    pub async fn sweep(&self) -> usize {
        let mut tokens = self.tokens.lock().await;
        prune(&mut tokens, Instant::now())
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.tokens.lock().await.len()
    }
}

fn prune(tokens: &mut HashMap<String, Instant>, now: Instant) -> usize {
    let before = tokens.len();
    tokens.retain(|_, expires_at| *expires_at > now);
    before - tokens.len()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
