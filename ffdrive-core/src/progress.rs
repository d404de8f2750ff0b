// ============================================================================
// ffdrive-core/src/progress.rs
// ============================================================================
//
// PROGRESS STATE: Conversion Completion Percentage and Its Observers
//
// Holds the current percentage of the active conversion and pushes every
// change to one callback and to any number of channel subscribers. The value
// only moves forward while a conversion runs; `reset` is the single way back
// to zero.
//
// KEY COMPONENTS:
// - ProgressState: Shared percentage with callback + subscriber fan-out
// - ProgressCallback: Boxed single-argument observer, no-op by default

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

/// Observer invoked with the new percentage whenever it changes.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

struct Inner {
    percent: u8,
    callback: ProgressCallback,
    subscribers: Vec<Sender<u8>>,
}

/// Shared, monotonic-until-reset conversion progress.
pub struct ProgressState {
    inner: Mutex<Inner>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProgressState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressState")
            .field("percent", &self.get())
            .finish()
    }
}

impl ProgressState {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                percent: 0,
                callback: Arc::new(|_| {}),
                subscribers: Vec::new(),
            }),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self) -> u8 {
        self.inner().percent
    }

    /// Replaces the change callback.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.inner().callback = Arc::new(callback);
    }

    /// Returns a receiver that gets every subsequent change.
    ///
    /// Dropping the receiver unsubscribes it on the next change.
    pub fn subscribe(&self) -> Receiver<u8> {
        let (tx, rx) = mpsc::channel();
        self.inner().subscribers.push(tx);
        rx
    }

    /// Back to zero for a new conversion.
    pub fn reset(&self) {
        self.store(0, true);
    }

    /// Raises the percentage to `percent` (capped at 100).
    ///
    /// Lower values are ignored. Returns whether the value changed.
    pub fn advance(&self, percent: u8) -> bool {
        self.store(percent.min(100), false)
    }

    /// Confirmed completion.
    pub fn complete(&self) {
        self.advance(100);
    }

    fn store(&self, percent: u8, allow_decrease: bool) -> bool {
        let callback = {
            let mut inner = self.inner();
            if inner.percent == percent || (!allow_decrease && percent < inner.percent) {
                return false;
            }
            inner.percent = percent;
            inner.subscribers.retain(|tx| tx.send(percent).is_ok());
            Arc::clone(&inner.callback)
        };
        debug!("Progress: {percent}%");
        // outside the lock so the callback may read the state
        callback(percent);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_advance_is_monotonic() {
        let state = ProgressState::new();
        assert!(state.advance(10));
        assert!(!state.advance(5));
        assert!(!state.advance(10));
        assert_eq!(state.get(), 10);
        assert!(state.advance(250));
        assert_eq!(state.get(), 100);
    }

    #[test]
    fn test_reset_goes_back_to_zero() {
        let state = ProgressState::new();
        state.advance(40);
        state.reset();
        assert_eq!(state.get(), 0);
    }

    #[test]
    fn test_callback_fires_only_on_change() {
        let state = ProgressState::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        state.set_callback(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        state.advance(1);
        state.advance(1);
        state.advance(0);
        state.advance(2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_can_read_state() {
        let state = Arc::new(ProgressState::new());
        let inner = Arc::clone(&state);
        let observed = Arc::new(AtomicUsize::new(0));
        let out = Arc::clone(&observed);
        state.set_callback(move |_| {
            out.store(inner.get() as usize, Ordering::SeqCst);
        });
        state.advance(42);
        assert_eq!(observed.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_subscribers_receive_changes_and_can_leave() {
        let state = ProgressState::new();
        let rx = state.subscribe();
        let dropped = state.subscribe();
        drop(dropped);
        state.advance(30);
        state.complete();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![30, 100]);
        assert_eq!(state.inner().subscribers.len(), 1);
    }
}
