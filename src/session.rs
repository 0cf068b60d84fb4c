//! Server-side admin sessions keyed by a random id carried in the `session` cookie.

use axum::http::{header, HeaderMap};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";

#[derive(Clone, Copy, Debug)]
pub struct Session {
    pub admin_id: i32,
    pub expires_at: Instant,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// New session for `admin_id`; expired sessions are purged first.
    pub fn start(&self, admin_id: i32) -> Uuid {
        let id = Uuid::new_v4();
        let now = Instant::now();
        if let Ok(mut map) = self.inner.write() {
            map.retain(|_, s| s.expires_at > now);
            map.insert(
                id,
                Session {
                    admin_id,
                    expires_at: now + self.ttl,
                },
            );
        }
        id
    }

    /// Live session named by the request's cookie, if any.
    pub fn current(&self, headers: &HeaderMap) -> Option<Session> {
        let id = session_id(headers)?;
        let now = Instant::now();
        let found = self.inner.read().ok()?.get(&id).copied();
        match found {
            Some(s) if s.expires_at > now => Some(s),
            Some(_) => {
                if let Ok(mut map) = self.inner.write() {
                    map.remove(&id);
                }
                None
            }
            None => None,
        }
    }

    pub fn end(&self, headers: &HeaderMap) {
        if let Some(id) = session_id(headers) {
            if let Ok(mut map) = self.inner.write() {
                map.remove(&id);
            }
        }
    }

    pub fn set_cookie(&self, id: Uuid) -> String {
        format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            id,
            self.ttl.as_secs()
        )
    }

    pub fn clear_cookie(&self) -> String {
        format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", SESSION_COOKIE)
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cookie(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::COOKIE, value.parse().unwrap());
        h
    }

    #[test]
    fn start_then_current_then_end() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.start(7);
        let headers = cookie(&format!("theme=dark; session={}", id));
        assert_eq!(store.current(&headers).map(|s| s.admin_id), Some(7));
        store.end(&headers);
        assert!(store.current(&headers).is_none());
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.start(1);
        assert!(store.current(&cookie(&format!("session={}", id))).is_none());
    }

    #[test]
    fn garbage_cookies_are_ignored() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.current(&cookie("session=not-a-uuid")).is_none());
        assert!(store.current(&HeaderMap::new()).is_none());
    }

    #[test]
    fn cookie_strings() {
        let store = SessionStore::new(Duration::from_secs(43200));
        let id = Uuid::nil();
        assert_eq!(
            store.set_cookie(id),
            "session=00000000-0000-0000-0000-000000000000; Path=/; Max-Age=43200; HttpOnly; SameSite=Lax"
        );
        assert!(store.clear_cookie().contains("Max-Age=0"));
    }
}
