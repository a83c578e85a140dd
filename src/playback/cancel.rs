//! Cancellation tokens for playback workers
//!
//! Tokens form a tree: cancelling a token cancels every child created from it.
//! A child keeps its parent alive, so dropping an intermediate token (a group
//! token, say) never disconnects its descendants from the root. Workers block
//! on their token while pacing, so a cancel wakes them immediately instead of
//! after the current wait.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

#[derive(Default)]
struct TokenState {
    cancelled: bool,
    children: Vec<Weak<TokenInner>>,
}

#[derive(Default)]
struct TokenInner {
    state: Mutex<TokenState>,
    wakeup: Condvar,
    parent: Option<Arc<TokenInner>>,
}

impl TokenInner {
    fn lock(&self) -> MutexGuard<'_, TokenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ancestor_cancelled(&self) -> bool {
        let mut next = self.parent.as_deref();
        while let Some(ancestor) = next {
            if ancestor.lock().cancelled {
                return true;
            }
            next = ancestor.parent.as_deref();
        }
        false
    }
}

/// Cloneable cancellation signal
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled together with `self`, but cancellable on its own
    pub fn child(&self) -> CancelToken {
        let child = CancelToken {
            inner: Arc::new(TokenInner {
                parent: Some(Arc::clone(&self.inner)),
                ..Default::default()
            }),
        };
        let mut state = self.inner.lock();
        if state.cancelled {
            child.inner.lock().cancelled = true;
        } else {
            state.children.retain(|weak| weak.strong_count() > 0);
            state.children.push(Arc::downgrade(&child.inner));
        }
        child
    }

    /// Signal cancellation to this token and all of its descendants
    pub fn cancel(&self) {
        let children = {
            let mut state = self.inner.lock();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            std::mem::take(&mut state.children)
        };
        self.inner.wakeup.notify_all();

        for child in children.iter().filter_map(Weak::upgrade) {
            CancelToken { inner: child }.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.lock().cancelled || self.inner.ancestor_cancelled()
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` if the token was cancelled before or during the wait.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let state = self.inner.lock();
        if self.inner.ancestor_cancelled() {
            return true;
        }
        let (state, _) = self
            .inner
            .wakeup
            .wait_timeout_while(state, duration, |state| !state.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        state.cancelled
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_runs_full_duration_when_not_cancelled() {
        let token = CancelToken::new();
        let start = Instant::now();
        assert!(!token.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_interrupts_wait() {
        let token = CancelToken::new();
        let remote = token.clone();

        let start = Instant::now();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        assert!(token.wait_timeout(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        canceller.join().unwrap();
    }

    #[test]
    fn test_parent_cancels_children() {
        let parent = CancelToken::new();
        let child = parent.child();
        let grandchild = child.child();

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
        assert!(grandchild.wait_timeout(Duration::from_secs(10)));
    }

    #[test]
    fn test_dropped_intermediate_token_still_propagates() {
        let root = CancelToken::new();
        let member = {
            let group = root.child();
            group.child()
        };

        root.cancel();
        assert!(member.is_cancelled());
        assert!(member.wait_timeout(Duration::from_secs(10)));
    }

    #[test]
    fn test_cancel_wakes_waiter_through_dropped_intermediate() {
        let root = CancelToken::new();
        let member = {
            let group = root.child();
            group.child()
        };

        let start = Instant::now();
        let waiter = thread::spawn(move || member.wait_timeout(Duration::from_secs(30)));
        thread::sleep(Duration::from_millis(20));
        root.cancel();

        assert!(waiter.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent_or_siblings() {
        let parent = CancelToken::new();
        let a = parent.child();
        let b = parent.child();

        a.cancel();
        assert!(a.is_cancelled());
        assert!(!b.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_child_of_cancelled_parent_starts_cancelled() {
        let parent = CancelToken::new();
        parent.cancel();
        assert!(parent.child().is_cancelled());
    }
}
