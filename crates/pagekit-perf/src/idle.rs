//! Idle-time scheduling
//!
//! Delegates to a native idle-callback primitive when the embedder provides
//! one. Otherwise callbacks run on a short timer with a synthesized deadline.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use smol::Timer;

use crate::timing::lock;

/// Time budget a synthesized deadline starts with
pub const IDLE_BUDGET: Duration = Duration::from_millis(50);

const FALLBACK_DELAY: Duration = Duration::from_millis(1);

/// Deadline passed to an idle callback
#[derive(Debug, Clone, Copy)]
pub struct IdleDeadline {
    did_timeout: bool,
    started: Instant,
    budget: Duration,
}

impl IdleDeadline {
    /// A deadline whose budget starts counting down now
    pub fn new(did_timeout: bool, budget: Duration) -> Self {
        Self::starting_at(did_timeout, Instant::now(), budget)
    }

    pub fn starting_at(did_timeout: bool, started: Instant, budget: Duration) -> Self {
        Self { did_timeout, started, budget }
    }

    /// True when the callback ran because its timeout expired
    pub fn did_timeout(&self) -> bool {
        self.did_timeout
    }

    pub fn time_remaining(&self) -> Duration {
        self.budget.saturating_sub(self.started.elapsed())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleOptions {
    /// Run the callback by this point even if the runtime never goes idle
    pub timeout: Option<Duration>,
}

/// Identifies a scheduled idle callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdleHandle(pub u64);

pub type IdleCallback = Box<dyn FnOnce(IdleDeadline) + Send>;

/// Native idle-callback primitive
pub trait IdleBackend: Send + Sync {
    fn request(&self, callback: IdleCallback, options: &IdleOptions) -> IdleHandle;
    fn cancel(&self, handle: IdleHandle);
}

#[derive(Default)]
struct FallbackQueue {
    next_id: AtomicU64,
    pending: Mutex<HashSet<u64>>,
}

/// `requestIdleCallback` / `cancelIdleCallback` with a timer fallback
#[derive(Clone)]
pub struct IdleScheduler {
    native: Option<Arc<dyn IdleBackend>>,
    fallback: Arc<FallbackQueue>,
}

impl IdleScheduler {
    pub fn native(backend: Arc<dyn IdleBackend>) -> Self {
        Self {
            native: Some(backend),
            fallback: Arc::default(),
        }
    }

    pub fn fallback() -> Self {
        Self {
            native: None,
            fallback: Arc::default(),
        }
    }

    pub fn is_native(&self) -> bool {
        self.native.is_some()
    }

    pub fn request_idle_callback(
        &self,
        callback: impl FnOnce(IdleDeadline) + Send + 'static,
        options: &IdleOptions,
    ) -> IdleHandle {
        if let Some(native) = &self.native {
            return native.request(Box::new(callback), options);
        }

        let id = self.fallback.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        lock(&self.fallback.pending).insert(id);
        let requested = Instant::now();
        let queue = Arc::clone(&self.fallback);

        smol::spawn(async move {
            Timer::after(FALLBACK_DELAY).await;
            // Cancelled handles are no longer pending
            if lock(&queue.pending).remove(&id) {
                callback(IdleDeadline::starting_at(false, requested, IDLE_BUDGET));
            }
        })
        .detach();

        tracing::trace!(id, "idle callback scheduled on fallback timer");
        IdleHandle(id)
    }

    /// Unknown or already-run handles are ignored
    pub fn cancel_idle_callback(&self, handle: IdleHandle) {
        match &self.native {
            Some(native) => native.cancel(handle),
            None => {
                lock(&self.fallback.pending).remove(&handle.0);
            }
        }
    }
}

impl Default for IdleScheduler {
    fn default() -> Self {
        Self::fallback()
    }
}
