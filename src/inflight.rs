//! Coalescing of concurrent identical requests.
//!
//! Callers asking for a key that already has an execution in progress join
//! that execution instead of starting another one. The entry disappears as
//! soon as the execution completes, or as soon as every caller waiting on it
//! has gone away, so later callers start fresh.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;

type Pending<T> = Shared<BoxFuture<'static, T>>;

struct Entry<T> {
    id: u64,
    execution: WeakShared<BoxFuture<'static, T>>,
}

struct State<T> {
    next_id: u64,
    entries: HashMap<String, Entry<T>>,
}

/// Owned by the execution future; removes the registry entry when that
/// future is dropped, whether it ran to completion or was abandoned.
struct Registration<T> {
    registry: Arc<Mutex<State<T>>>,
    key: String,
    id: u64,
}

impl<T> Drop for Registration<T> {
    fn drop(&mut self) {
        let mut state = self.registry.lock();
        // A newer execution may already own the key.
        if state.entries.get(&self.key).map(|e| e.id) == Some(self.id) {
            state.entries.remove(&self.key);
        }
    }
}

pub struct InFlight<T: Clone> {
    state: Arc<Mutex<State<T>>>,
}

impl<T: Clone> Default for InFlight<T> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_id: 0,
                entries: HashMap::new(),
            })),
        }
    }
}

impl<T: Clone> std::fmt::Debug for InFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("pending", &self.state.lock().entries.len())
            .finish()
    }
}

impl<T> InFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of executions currently in progress.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Join the execution in progress for `key`, or start one with `start`.
    ///
    /// `start` is only called when no live execution for `key` exists.
    /// Dropping every returned handle before completion cancels the
    /// execution and frees the key.
    pub fn join_or_start<F>(&self, key: &str, start: F) -> Pending<T>
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let mut state = self.state.lock();
        if let Some(existing) = state.entries.get(key).and_then(|e| e.execution.upgrade()) {
            tracing::debug!(key, "joining in-flight request");
            return existing;
        }

        state.next_id += 1;
        let registration = Registration {
            registry: Arc::clone(&self.state),
            key: key.to_string(),
            id: state.next_id,
        };
        let execution = start();
        let shared = async move {
            let _registration = registration;
            execution.await
        }
        .boxed()
        .shared();

        if let Some(weak) = shared.downgrade() {
            let id = state.next_id;
            state.entries.insert(key.to_string(), Entry { id, execution: weak });
        }
        shared
    }
}
