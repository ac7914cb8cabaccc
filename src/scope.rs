//! Scoped instance storage and timed eviction.
//!
//! Every stored instance carries a stamp taken from a counter that only
//! grows. An eviction remembers the stamp it was scheduled for and removes
//! the instance only while that stamp is still current, so a timer left over
//! from an earlier occupant of the same scope never removes a newer one.
//!
//! Evictions run on one background thread per container. The thread sleeps
//! until the earliest deadline and exits when the container is dropped.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error};

use crate::container::Instance;

/// The unit of work a scoped instance belongs to, and how long it may live.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Scope {
    id: u64,
    ttl: Duration,
}

impl Scope {
    pub fn new(id: u64, ttl: Duration) -> Self {
        Self { id, ttl }
    }

    pub fn id(&self) -> u64 { self.id }
    pub fn ttl(&self) -> Duration { self.ttl }
}

struct ScopedInstance {
    instance: Instance,
    stamp: u64,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl ScopedInstance {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// A pending removal of one scoped instance.
#[derive(Debug, Eq, Ord, PartialEq, PartialOrd)]
pub(crate) struct Eviction {
    at: Instant,
    scope_id: u64,
    name: String,
    stamp: u64,
}

/// Scope id → registration name → instance.
#[derive(Default)]
pub(crate) struct ScopeStore {
    scopes: DashMap<u64, HashMap<String, ScopedInstance>>,
    stamps: AtomicU64,
}

impl ScopeStore {
    /// The live instance for `name` in scope `id`, ignoring expired ones the
    /// reaper has not reached yet.
    pub(crate) fn get(&self, id: u64, name: &str) -> Option<Instance> {
        let bucket = self.scopes.get(&id)?;
        let slot = bucket.get(name)?;
        slot.is_live(Instant::now()).then(|| Arc::clone(&slot.instance))
    }

    /// Stores `instance` unless a live one is already present.
    ///
    /// Returns the instance callers should use and, when `instance` was the
    /// one stored and has a deadline, the eviction to schedule for it.
    pub(crate) fn insert_if_absent(
        &self,
        scope: Scope,
        name: &str,
        instance: Instance,
    ) -> (Instance, Option<Eviction>) {
        let now = Instant::now();
        let mut bucket = self.scopes.entry(scope.id).or_default();
        if let Some(live) = bucket.get(name).filter(|slot| slot.is_live(now)) {
            return (Arc::clone(&live.instance), None);
        }

        let stamp = self.stamps.fetch_add(1, Ordering::Relaxed);
        let expires_at = now.checked_add(scope.ttl);
        bucket.insert(
            name.to_owned(),
            ScopedInstance { instance: Arc::clone(&instance), stamp, expires_at },
        );

        let eviction = expires_at.map(|at| Eviction {
            at,
            scope_id: scope.id,
            name: name.to_owned(),
            stamp,
        });
        (instance, eviction)
    }

    /// Removes the instance `eviction` was scheduled for, if it is still there.
    pub(crate) fn evict(&self, eviction: &Eviction) -> bool {
        let removed = match self.scopes.get_mut(&eviction.scope_id) {
            Some(mut bucket) => {
                let current = bucket
                    .get(&eviction.name)
                    .is_some_and(|slot| slot.stamp == eviction.stamp);
                if current {
                    bucket.remove(&eviction.name);
                }
                current
            }
            None => false,
        };
        self.scopes.remove_if(&eviction.scope_id, |_, bucket| bucket.is_empty());
        removed
    }

    /// Drops every instance held for scope `id`. Returns how many there were.
    pub(crate) fn close(&self, id: u64) -> usize {
        self.scopes.remove(&id).map_or(0, |(_, bucket)| bucket.len())
    }
}

struct Queue {
    deadlines: BinaryHeap<Reverse<Eviction>>,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    wake: Condvar,
}

/// Background thread that applies evictions when they fall due.
pub(crate) struct Reaper {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Reaper {
    pub(crate) fn spawn(store: Arc<ScopeStore>) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue { deadlines: BinaryHeap::new(), shutdown: false }),
            wake: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("gantry-scope-reaper".into())
            .spawn(move || run(&worker, &store));

        // Without the thread, expired instances are still ignored on lookup;
        // they are just not freed until the scope is closed or repopulated.
        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("failed to spawn scope reaper: {e}");
                None
            }
        };

        Self { shared, thread }
    }

    pub(crate) fn schedule(&self, eviction: Eviction) {
        self.shared.queue.lock().deadlines.push(Reverse(eviction));
        self.shared.wake.notify_one();
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.wake.notify_one();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

fn run(shared: &Shared, store: &ScopeStore) {
    let mut queue = shared.queue.lock();
    while !queue.shutdown {
        let next = queue.deadlines.peek().map(|Reverse(next)| next.at);
        match next {
            Some(at) if at <= Instant::now() => {
                if let Some(Reverse(due)) = queue.deadlines.pop() {
                    let removed = MutexGuard::unlocked(&mut queue, || store.evict(&due));
                    debug!(
                        scope = due.scope_id,
                        name = %due.name,
                        removed,
                        "scoped instance expired"
                    );
                }
            }
            Some(at) => {
                shared.wake.wait_until(&mut queue, at);
            }
            None => shared.wake.wait(&mut queue),
        }
    }
}
