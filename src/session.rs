//! Memoized, deduplicated corporation-number checks.
//!
//! One session is owned per form engine. Clones share the same cache and
//! in-flight table, so every field bound to a session sees the same outcomes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::client::{CorporationChecker, ExceptionReporter, ReportContext, TracingReporter};

type PendingCheck = Shared<BoxFuture<'static, bool>>;

#[derive(Default)]
struct SessionState {
    cache: HashMap<String, bool>,
    in_flight: HashMap<String, PendingCheck>,
}

#[derive(Clone)]
pub struct ValidationSession {
    checker: Arc<dyn CorporationChecker>,
    reporter: Arc<dyn ExceptionReporter>,
    state: Arc<Mutex<SessionState>>,
}

impl ValidationSession {
    pub fn new(checker: Arc<dyn CorporationChecker>) -> Self {
        Self {
            checker,
            reporter: Arc::new(TracingReporter),
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ExceptionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Resolves whether `key` is a registered corporation number.
    ///
    /// Cached outcomes return without a network call, concurrent checks of the
    /// same key join one request, and failed checks resolve to `false` without
    /// being cached.
    pub async fn check_async(&self, key: &str) -> bool {
        let pending = {
            let mut state = self.lock_state();
            if let Some(valid) = state.cache.get(key) {
                tracing::debug!(len = key.len(), "corporation check served from cache");
                return *valid;
            }
            if let Some(pending) = state.in_flight.get(key) {
                tracing::debug!(len = key.len(), "joining in-flight corporation check");
                pending.clone()
            } else {
                let pending = self.start_check(key.to_string());
                state.in_flight.insert(key.to_string(), pending.clone());
                pending
            }
        };
        pending.await
    }

    pub fn cached(&self, key: &str) -> Option<bool> {
        self.lock_state().cache.get(key).copied()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.lock_state().in_flight.contains_key(key)
    }

    fn start_check(&self, key: String) -> PendingCheck {
        let checker = self.checker.clone();
        let reporter = self.reporter.clone();
        let state = self.state.clone();
        async move {
            tracing::debug!(len = key.len(), "starting corporation check");
            let outcome = checker.check_corporation(&key).await;
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.in_flight.remove(&key);
            match outcome {
                Ok(check) => {
                    state.cache.insert(key, check.valid);
                    check.valid
                }
                Err(error) => {
                    tracing::warn!(%error, "corporation check failed; result not cached");
                    reporter.report(&error, &ReportContext::new("corporation_check"));
                    false
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
