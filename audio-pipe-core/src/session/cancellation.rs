use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Hook = Box<dyn FnOnce() + Send + 'static>;

/// Handle for removing a hook registered on a [`CancellationToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

#[derive(Default)]
struct TokenInner {
    cancelled: AtomicBool,
    next_id: AtomicU64,
    hooks: Mutex<Vec<(HookId, Hook)>>,
}

/// Shared cancellation flag with teardown hooks.
///
/// Stream handles register a hook that kills their subprocess when they
/// start streaming and remove it when they close. Whoever owns the token
/// decides what cancellation means: closing a few handles, or wiring it to
/// Ctrl+C and exiting. Cancelling never terminates the process by itself.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Register `hook` to run on cancellation.
    ///
    /// If the token is already cancelled the hook runs immediately on the
    /// calling thread and `None` is returned.
    pub fn register(&self, hook: impl FnOnce() + Send + 'static) -> Option<HookId> {
        let mut hooks = self.inner.hooks.lock();
        if self.is_cancelled() {
            drop(hooks);
            hook();
            return None;
        }
        let id = HookId(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        hooks.push((id, Box::new(hook)));
        Some(id)
    }

    /// Remove a hook that has not run yet. Returns whether it was found.
    pub fn unregister(&self, id: HookId) -> bool {
        let mut hooks = self.inner.hooks.lock();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() != before
    }

    /// Number of hooks waiting to run.
    pub fn pending_hooks(&self) -> usize {
        self.inner.hooks.lock().len()
    }

    /// Set the flag and run every registered hook once, in registration
    /// order, on the calling thread. Later calls do nothing.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let hooks = std::mem::take(&mut *self.inner.hooks.lock());
        log::warn!("cancellation requested, running {} teardown hook(s)", hooks.len());
        for (_, hook) in hooks {
            hook();
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("pending_hooks", &self.pending_hooks())
            .finish()
    }
}
