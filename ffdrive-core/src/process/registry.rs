// ============================================================================
// ffdrive-core/src/process/registry.rs
// ============================================================================
//
// PROCESS REGISTRY: Live ffmpeg Processes Keyed by Caller Id
//
// The registry is the only state shared between the thread running a command
// and threads asking for it to be cancelled. Every mutation happens under one
// mutex. Each registration gets a serial number so that a finished command
// can never remove a newer handle that reused its id.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::logging::log_replaced_handle;

/// Control surface of one running process.
///
/// Implemented by [`ChildProcess`](super::manager::ChildProcess) for real
/// subprocesses and by test doubles.
pub trait ProcessControl: Send + Sync {
    /// Whether the process has not exited yet.
    fn is_running(&self) -> bool;

    /// Sends the graceful stop request (`q` plus newline on stdin).
    fn request_quit(&self) -> io::Result<()>;

    /// Force-kills the process. Killing an exited process is not an error.
    fn kill(&self) -> io::Result<()>;

    fn pid(&self) -> Option<u32> {
        None
    }
}

struct Entry {
    serial: u64,
    handle: Arc<dyn ProcessControl>,
}

/// Mutex-guarded map from caller id to process handle.
#[derive(Default)]
pub struct ProcessRegistry {
    entries: Mutex<HashMap<String, Entry>>,
    next_serial: AtomicU64,
}

impl std::fmt::Debug for ProcessRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handle` under `id`, replacing any previous handle.
    ///
    /// Returns the serial to pass to [`unregister`](Self::unregister).
    pub fn register(&self, id: &str, handle: Arc<dyn ProcessControl>) -> u64 {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .entries()
            .insert(id.to_string(), Entry { serial, handle });
        if previous.is_some_and(|p| p.handle.is_running()) {
            log_replaced_handle(id);
        }
        serial
    }

    /// Removes the entry for `id` if it still belongs to registration `serial`.
    pub fn unregister(&self, id: &str, serial: u64) -> bool {
        let mut entries = self.entries();
        match entries.get(id) {
            Some(entry) if entry.serial == serial => {
                entries.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn lookup(&self, id: &str) -> Option<Arc<dyn ProcessControl>> {
        self.entries().get(id).map(|e| Arc::clone(&e.handle))
    }

    /// Sorted ids of all registered processes.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Clones of every registered handle, taken under one lock.
    pub fn snapshot(&self) -> Vec<(String, Arc<dyn ProcessControl>)> {
        self.entries()
            .iter()
            .map(|(id, e)| (id.clone(), Arc::clone(&e.handle)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
