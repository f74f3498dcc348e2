use super::errors::AuthError;
use super::key::SessionKey;
use super::session::Session;
use arc_swap::ArcSwapOption;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Shared cache of authenticated sessions.
///
/// Holds at most one [`Session`] per [`SessionKey`] and a pointer to the most
/// recently resolved ("active") session. `get_or_create` is single-flight per
/// key: concurrent callers for the same key run the factory exactly once,
/// while callers for different keys proceed independently.
///
/// The cache itself never fails; errors surfacing from `get_or_create`
/// originate in the factory and are not cached.
pub struct SessionCache {
    sessions: RwLock<HashMap<SessionKey, Arc<Session>>>,
    // Per-key creation gates. The outer lock is held only long enough to
    // fetch or insert a gate, never across a factory invocation.
    inflight: Mutex<HashMap<SessionKey, Arc<Mutex<()>>>>,
    active: ArcSwapOption<Session>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            active: ArcSwapOption::const_empty(),
        }
    }

    /// Returns the cached session for `key`, if any.
    pub async fn get(&self, key: &SessionKey) -> Option<Arc<Session>> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Returns the session for `key`, invoking `factory` to build it on a
    /// miss.
    ///
    /// Exactly one factory invocation proceeds per key at a time; concurrent
    /// callers for the same key wait for the winner and observe its session.
    /// A factory failure is returned to every caller that raced on it and
    /// leaves no cache entry behind.
    pub async fn get_or_create<F, Fut>(
        &self,
        key: &SessionKey,
        factory: F,
    ) -> Result<Arc<Session>, AuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Session, AuthError>>,
    {
        if let Some(existing) = self.get(key).await {
            return Ok(existing);
        }

        let gate = {
            let mut inflight = self.inflight.lock().await;
            inflight
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = gate.lock().await;

        // A racing caller may have populated the entry while we waited.
        if let Some(existing) = self.get(key).await {
            return Ok(existing);
        }

        log::debug!("session cache miss for key {key}, acquiring");
        let outcome = match factory().await {
            Ok(session) => {
                let session = Arc::new(session);
                self.sessions
                    .write()
                    .await
                    .insert(key.clone(), session.clone());
                Ok(session)
            }
            Err(e) => Err(e),
        };

        self.inflight.lock().await.remove(key);
        outcome
    }

    /// Records `session` as the current context. Pure bookkeeping, no I/O.
    pub fn set_active(&self, session: &Arc<Session>) {
        self.active.store(Some(session.clone()));
    }

    /// The most recently resolved session, if any.
    ///
    /// The pointer is a view, not ownership: removing the underlying cache
    /// entry does not clear it, and callers observing staleness must
    /// re-resolve.
    pub fn active(&self) -> Option<Arc<Session>> {
        self.active.load_full()
    }

    /// Removes the entry for `key`. The active pointer is left untouched.
    pub async fn invalidate(&self, key: &SessionKey) {
        self.sessions.write().await.remove(key);
    }

    /// Clears all entries and the active pointer.
    ///
    /// This is a local cache clear only; no token revocation is attempted
    /// against the provider.
    pub async fn reset(&self) {
        self.sessions.write().await.clear();
        self.active.store(None);
        log::debug!("session cache reset");
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
