//! One-shot, time-bounded storage for OAuth state and PKCE verifiers.
//!
//! Entries are keyed by the random `state` string, consumed exactly once,
//! and expire after a fixed TTL; expired entries are pruned on every
//! access so the map cannot grow unbounded.

use std::collections::HashMap;
use std::sync::Mutex;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// How long a pending OAuth flow stays valid.
pub const STATE_TTL: Duration = Duration::minutes(10);

#[derive(Debug, Clone)]
pub struct PendingFlow {
    pub user_id: Uuid,
    /// PKCE code verifier, for platforms that use it.
    pub pkce_verifier: Option<String>,
    expires_at: OffsetDateTime,
}

pub struct StateStore {
    entries: Mutex<HashMap<String, PendingFlow>>,
    ttl: Duration,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::with_ttl(STATE_TTL)
    }
}

impl StateStore {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Start a flow: returns the random state string handed to the
    /// provider's authorization URL.
    pub fn issue(&self, user_id: Uuid, pkce_verifier: Option<String>) -> String {
        let state = random_token();
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.lock().expect("state store poisoned");
        entries.retain(|_, flow| flow.expires_at > now);
        entries.insert(
            state.clone(),
            PendingFlow {
                user_id,
                pkce_verifier,
                expires_at: now + self.ttl,
            },
        );
        state
    }

    /// Consume a flow. Returns `None` for unknown, expired or
    /// wrong-user states; the entry is gone either way (one shot).
    pub fn consume(&self, state: &str, user_id: Uuid) -> Option<PendingFlow> {
        let now = OffsetDateTime::now_utc();
        let mut entries = self.entries.lock().expect("state store poisoned");
        entries.retain(|_, flow| flow.expires_at > now);
        let flow = entries.remove(state)?;
        (flow.user_id == user_id).then_some(flow)
    }
}

/// URL-safe random token, 32 bytes of entropy.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_and_consume_roundtrip() {
        let store = StateStore::default();
        let user = Uuid::new_v4();
        let state = store.issue(user, Some("verifier".into()));

        let flow = store.consume(&state, user).expect("pending flow");
        assert_eq!(flow.user_id, user);
        assert_eq!(flow.pkce_verifier.as_deref(), Some("verifier"));
    }

    #[test]
    fn states_are_one_shot() {
        let store = StateStore::default();
        let user = Uuid::new_v4();
        let state = store.issue(user, None);

        assert!(store.consume(&state, user).is_some());
        assert!(store.consume(&state, user).is_none());
    }

    #[test]
    fn wrong_user_cannot_consume() {
        let store = StateStore::default();
        let state = store.issue(Uuid::new_v4(), None);
        assert!(store.consume(&state, Uuid::new_v4()).is_none());
    }

    #[test]
    fn unknown_state_is_rejected() {
        let store = StateStore::default();
        assert!(store.consume("never-issued", Uuid::new_v4()).is_none());
    }

    #[test]
    fn expired_states_are_pruned() {
        let store = StateStore::with_ttl(Duration::seconds(-1));
        let user = Uuid::new_v4();
        let state = store.issue(user, None);
        assert!(store.consume(&state, user).is_none());
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(random_token(), random_token());
    }
}
