use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};
use sha2::{Digest, Sha512};
use std::collections::HashMap;

/// Name of the cookie carrying the signed session payload.
pub const SESSION_COOKIE: &str = "session";

/// Session
///
/// The per-caller key-value capability the gate reads and writes. Persistence and
/// expiry belong to the implementation, so the gate itself can be exercised
/// without a running server.
pub trait Session {
    fn get(&self, key: &str) -> Option<&Value>;
    fn set(&mut self, key: &str, value: Value);
    fn remove(&mut self, key: &str);
    fn clear(&mut self);
}

/// MemorySession
///
/// Plain in-memory session used by unit tests and any caller without a cookie jar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemorySession {
    values: HashMap<String, Value>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Session for MemorySession {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

/// CookieSession
///
/// A session whose whole state travels in the caller's browser. The map is JSON
/// encoded, base64url wrapped and signed by the `SignedCookieJar`, so the server
/// keeps no session table.
///
/// Lifecycle per request: `load` from the incoming jar, mutate through the
/// `Session` trait, then `commit` into the outgoing jar.
#[derive(Debug, Clone, Default)]
pub struct CookieSession {
    values: Map<String, Value>,
}

impl CookieSession {
    /// load
    ///
    /// Reads the session from the jar. The jar has already verified the signature;
    /// a missing, tampered or undecodable cookie yields an empty session.
    pub fn load(jar: &SignedCookieJar) -> Self {
        let values = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| decode_payload(cookie.value()))
            .unwrap_or_default();

        Self { values }
    }

    /// commit
    ///
    /// Writes the session back. An empty session removes the cookie altogether.
    pub fn commit(self, jar: SignedCookieJar) -> SignedCookieJar {
        if self.values.is_empty() {
            return jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
        }

        let payload = URL_SAFE_NO_PAD.encode(Value::Object(self.values).to_string());
        jar.add(
            Cookie::build((SESSION_COOKIE, payload))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        )
    }
}

impl Session for CookieSession {
    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    fn clear(&mut self) {
        self.values.clear();
    }
}

fn decode_payload(raw: &str) -> Option<Map<String, Value>> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// signing_key
///
/// Derives the cookie signing key from the configured secret. The secret is
/// stretched through SHA-512 so that any non-empty string yields the 64 bytes the
/// cookie `Key` requires.
pub fn signing_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}
