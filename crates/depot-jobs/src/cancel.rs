//! Cancellation signals for executing jobs.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

/// Tracks one [`CancellationToken`] per executing job.
///
/// The runner registers a token when it claims a job and removes it when
/// execution ends; `request_cancel` trips the token so the handler observes
/// the request at its next checkpoint. Cancellation is asynchronous-effect,
/// synchronous-acknowledgement: the status write happens immediately, the
/// handler stops later.
#[derive(Debug, Default)]
pub struct CancelMap {
    tokens: DashMap<String, CancellationToken>,
}

impl CancelMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh token for a claimed job.
    pub fn register(&self, code: &str) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens.insert(code.to_string(), token.clone());
        token
    }

    /// Trip the token for a job, if one is registered. Returns whether a
    /// signal was delivered.
    pub fn cancel(&self, code: &str) -> bool {
        match self.tokens.get(code) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the token for a job whose execution has ended.
    pub fn remove(&self, code: &str) {
        self.tokens.remove(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_trips_registered_token() {
        let map = CancelMap::new();
        let token = map.register("some-job");

        assert!(!token.is_cancelled());
        assert!(map.cancel("some-job"));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_without_registration_is_noop() {
        let map = CancelMap::new();
        assert!(!map.cancel("unknown-job"));
    }

    #[test]
    fn test_remove_forgets_token() {
        let map = CancelMap::new();
        map.register("some-job");
        map.remove("some-job");
        assert!(!map.cancel("some-job"));
    }
}
