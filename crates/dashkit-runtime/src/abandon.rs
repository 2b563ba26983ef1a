//! Abandon registry for superseded background work
//!
//! Work started in the background (for example a dashboard preload) takes
//! a token under a key. Starting newer work under the same key, or
//! abandoning the key, flags the older token. The flag is only checked at
//! the worker's next suspension point: in-flight backend I/O is left to
//! finish and its result is ignored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub struct AbandonToken {
    key: String,
    flag: Arc<AtomicBool>,
}

impl AbandonToken {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_abandoned(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AbandonRegistry {
    active: Arc<Mutex<HashMap<String, Arc<AtomicBool>>>>,
}

impl AbandonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start work under `key`, abandoning whatever ran under it before
    pub fn begin(&self, key: impl Into<String>) -> AbandonToken {
        let key = key.into();
        let flag = Arc::new(AtomicBool::new(false));
        if let Some(previous) = self.active().insert(key.clone(), Arc::clone(&flag)) {
            previous.store(true, Ordering::SeqCst);
            tracing::debug!(key = key.as_str(), "Superseded background work abandoned");
        }
        AbandonToken { key, flag }
    }

    /// Returns `true` when there was running work to abandon
    pub fn abandon(&self, key: &str) -> bool {
        match self.active().remove(key) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Release the key if `token` still owns it
    pub fn finish(&self, token: &AbandonToken) {
        let mut active = self.active();
        if active
            .get(&token.key)
            .is_some_and(|flag| Arc::ptr_eq(flag, &token.flag))
        {
            active.remove(&token.key);
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active().contains_key(key)
    }

    fn active(&self) -> MutexGuard<'_, HashMap<String, Arc<AtomicBool>>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
