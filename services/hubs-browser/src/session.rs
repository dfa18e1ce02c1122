//! Session persistence behind an injectable store interface
//!
//! The gate and the auth routes only ever see `SessionStore`: get/set/delete
//! of a `Credentials` blob keyed by an opaque session id. The in-memory
//! implementation is the one the service ships; a server-side external store
//! would implement the same trait.
//!
//! Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
//! (`Arc<dyn SessionStore>`).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use aps_auth::Credentials;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Keyed storage for session credentials.
///
/// A `set` replaces the stored value whole — `Credentials` is atomic, the
/// store never mutates fields in place.
pub trait SessionStore: Send + Sync {
    fn get<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Credentials>> + Send + 'a>>;

    fn set(
        &self,
        session_id: String,
        credentials: Credentials,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;

    fn delete<'a>(&'a self, session_id: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

    /// Number of live sessions, for the health endpoint.
    fn len(&self) -> Pin<Box<dyn Future<Output = usize> + Send + '_>>;
}

/// In-memory session store: a mutexed map, safe for concurrent request
/// handlers. Sessions do not survive a restart.
///
/// Entries carry a max age measured from the last write (each gate refresh
/// re-stamps the entry). Stale entries are dropped lazily on `get` and swept
/// on every `set`, so abandoned sessions cannot grow the map without bound.
pub struct MemoryStore {
    max_age: Duration,
    state: Mutex<HashMap<String, (Instant, Credentials)>>,
}

impl MemoryStore {
    pub fn new(max_age: Duration) -> Self {
        Self {
            max_age,
            state: Mutex::new(HashMap::new()),
        }
    }
}

impl SessionStore for MemoryStore {
    fn get<'a>(
        &'a self,
        session_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<Credentials>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            match state.get(session_id) {
                Some((stored_at, credentials)) if stored_at.elapsed() <= self.max_age => {
                    Some(credentials.clone())
                }
                Some(_) => {
                    state.remove(session_id);
                    None
                }
                None => None,
            }
        })
    }

    fn set(
        &self,
        session_id: String,
        credentials: Credentials,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.retain(|_, (stored_at, _)| stored_at.elapsed() <= self.max_age);
            state.insert(session_id, (Instant::now(), credentials));
            debug!("session credentials stored");
        })
    }

    fn delete<'a>(&'a self, session_id: &'a str) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.remove(session_id);
        })
    }

    fn len(&self) -> Pin<Box<dyn Future<Output = usize> + Send + '_>> {
        Box::pin(async move {
            let state = self.state.lock().await;
            state
                .values()
                .filter(|(stored_at, _)| stored_at.elapsed() <= self.max_age)
                .count()
        })
    }
}

/// Generate a cryptographically random session id.
///
/// 32 random bytes encoded as URL-safe base64 without padding — opaque,
/// unguessable, cookie-safe.
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
