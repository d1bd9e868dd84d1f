//! Throttle and debounce
//!
//! Deferred invocations run on smol's global executor, so the wrapped
//! function must be `Send + Sync` and its argument `Send`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use smol::Timer;

type Callback<A> = Box<dyn Fn(A) + Send + Sync>;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

enum Dispatch<A> {
    Now(A),
    Later { wait: Duration, epoch: u64 },
}

/// Shared state of a deferred call: the args waiting to run and an epoch
/// that invalidates timers scheduled before it.
struct Slot<A> {
    epoch: u64,
    args: Option<A>,
}

impl<A> Slot<A> {
    fn new() -> Self {
        Self { epoch: 0, args: None }
    }

    fn schedule(&mut self, args: A) -> u64 {
        self.epoch += 1;
        self.args = Some(args);
        self.epoch
    }

    fn clear(&mut self) {
        self.epoch += 1;
        self.args = None;
    }

    fn take_if_current(&mut self, epoch: u64) -> Option<A> {
        if self.epoch == epoch { self.args.take() } else { None }
    }
}

// ============================================================================
// Throttle
// ============================================================================

struct ThrottleState<A> {
    last_call: Option<Instant>,
    trailing: Slot<A>,
}

struct ThrottleInner<A> {
    func: Callback<A>,
    delay: Duration,
    state: Mutex<ThrottleState<A>>,
}

impl<A> ThrottleInner<A> {
    fn fire_trailing(&self, epoch: u64) {
        let args = {
            let mut state = lock(&self.state);
            let Some(args) = state.trailing.take_if_current(epoch) else {
                return;
            };
            state.last_call = Some(Instant::now());
            args
        };
        (self.func)(args);
    }
}

/// Throttled function handle
///
/// The first call runs immediately; later calls inside the window collapse
/// into one trailing call at the window boundary carrying the latest args.
pub struct Throttled<A> {
    inner: Arc<ThrottleInner<A>>,
}

impl<A> Clone for Throttled<A> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

/// Wrap `func` so it runs at most once per `delay`
pub fn throttle<A, F>(func: F, delay: Duration) -> Throttled<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Throttled {
        inner: Arc::new(ThrottleInner {
            func: Box::new(func),
            delay,
            state: Mutex::new(ThrottleState {
                last_call: None,
                trailing: Slot::new(),
            }),
        }),
    }
}

impl<A: Send + 'static> Throttled<A> {
    pub fn call(&self, args: A) {
        let now = Instant::now();
        let dispatch = {
            let mut state = lock(&self.inner.state);
            let remaining = match state.last_call {
                Some(last) => self.inner.delay.saturating_sub(now.duration_since(last)),
                None => Duration::ZERO,
            };

            if remaining.is_zero() {
                state.trailing.clear();
                state.last_call = Some(now);
                Dispatch::Now(args)
            } else {
                let epoch = state.trailing.schedule(args);
                Dispatch::Later { wait: remaining, epoch }
            }
        };

        match dispatch {
            Dispatch::Now(args) => (self.inner.func)(args),
            Dispatch::Later { wait, epoch } => {
                let inner = Arc::clone(&self.inner);
                smol::spawn(async move {
                    Timer::after(wait).await;
                    inner.fire_trailing(epoch);
                })
                .detach();
            }
        }
    }

    /// Drop a scheduled trailing call
    pub fn cancel(&self) {
        lock(&self.inner.state).trailing.clear();
    }
}

// ============================================================================
// Debounce
// ============================================================================

struct DebounceInner<A> {
    func: Callback<A>,
    delay: Duration,
    pending: Mutex<Slot<A>>,
}

impl<A> DebounceInner<A> {
    fn fire(&self, epoch: u64) {
        let args = lock(&self.pending).take_if_current(epoch);
        if let Some(args) = args {
            (self.func)(args);
        }
    }
}

/// Debounced function handle
///
/// Runs the wrapped function once `delay` has passed since the latest call.
pub struct Debounced<A> {
    inner: Arc<DebounceInner<A>>,
}

impl<A> Clone for Debounced<A> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

/// Wrap `func` so bursts of calls collapse into one, `delay` after the last
pub fn debounce<A, F>(func: F, delay: Duration) -> Debounced<A>
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    Debounced {
        inner: Arc::new(DebounceInner {
            func: Box::new(func),
            delay,
            pending: Mutex::new(Slot::new()),
        }),
    }
}

impl<A: Send + 'static> Debounced<A> {
    pub fn call(&self, args: A) {
        let epoch = lock(&self.inner.pending).schedule(args);
        let inner = Arc::clone(&self.inner);
        smol::spawn(async move {
            Timer::after(inner.delay).await;
            inner.fire(epoch);
        })
        .detach();
    }

    /// Drop the pending invocation, if any
    pub fn cancel(&self) {
        lock(&self.inner.pending).clear();
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.inner.pending).args.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        (calls, move |v| sink.lock().unwrap().push(v))
    }

    #[test]
    fn test_throttle_leading_and_trailing() {
        let (calls, f) = recorder();
        let throttled = throttle(f, Duration::from_millis(100));

        for i in 1..=5 {
            throttled.call(i);
        }
        assert_eq!(*calls.lock().unwrap(), vec![1]);

        std::thread::sleep(Duration::from_millis(300));
        assert_eq!(*calls.lock().unwrap(), vec![1, 5]);
    }

    #[test]
    fn test_throttle_after_window_runs_immediately() {
        let (calls, f) = recorder();
        let throttled = throttle(f, Duration::from_millis(30));

        throttled.call(1);
        std::thread::sleep(Duration::from_millis(60));
        throttled.call(2);
        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_throttle_cancel() {
        let (calls, f) = recorder();
        let throttled = throttle(f, Duration::from_millis(50));

        throttled.call(1);
        throttled.call(2);
        throttled.cancel();
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(*calls.lock().unwrap(), vec![1]);
    }

    #[test]
    fn test_debounce_collapses_burst() {
        let (calls, f) = recorder();
        let debounced = debounce(f, Duration::from_millis(60));

        for i in 1..=4 {
            debounced.call(i);
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(calls.lock().unwrap().is_empty());
        assert!(debounced.is_pending());

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(*calls.lock().unwrap(), vec![4]);
        assert!(!debounced.is_pending());
    }

    #[test]
    fn test_debounce_cancel() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let debounced = debounce(move |_: ()| { c.fetch_add(1, Ordering::SeqCst); }, Duration::from_millis(30));

        debounced.call(());
        debounced.cancel();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
