//! # Authentication and Authorization
//!
//! Opaque bearer session tokens for the dashboard read endpoints. Tokens
//! are minted at OAuth completion and resolved through an injected TTL'd
//! store on application state — deliberately not an ambient global, and
//! deliberately not passwords: the placeholder password hash on a user row
//! can never authenticate anything.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use rand::RngCore;
use uuid::Uuid;

use crate::error::{ApiError, unauthorized};
use crate::server::AppState;

/// Authenticated user extracted from a session bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

struct SessionEntry {
    user_id: Uuid,
    expires_at: Instant,
}

/// In-process key-value session store with per-entry TTL.
pub struct SessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    /// Create a store whose tokens live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Mint a session token for a user.
    pub fn issue(&self, user_id: Uuid) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = base64_url::encode(&bytes);

        let mut sessions = self.sessions.lock().expect("session store poisoned");
        sessions.insert(
            token.clone(),
            SessionEntry {
                user_id,
                expires_at: Instant::now() + self.ttl,
            },
        );

        token
    }

    /// Resolve a token to its user, dropping it if expired.
    pub fn resolve(&self, token: &str) -> Option<Uuid> {
        let mut sessions = self.sessions.lock().expect("session store poisoned");

        match sessions.get(token) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.user_id),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    /// Invalidate a token.
    pub fn revoke(&self, token: &str) {
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        sessions.remove(token);
    }

    /// Drop every expired entry (periodic housekeeping).
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().expect("session store poisoned");
        sessions.retain(|_, entry| entry.expires_at > now);
    }
}

fn extract_bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))
        .and_then(|value| {
            value
                .to_str()
                .map_err(|_| unauthorized(Some("Invalid Authorization header")))
        })
        .and_then(|header| {
            header
                .strip_prefix("Bearer ")
                .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
        })
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;

        state
            .sessions
            .resolve(token)
            .map(CurrentUser)
            .ok_or_else(|| unauthorized(Some("Session expired or unknown")))
    }
}
