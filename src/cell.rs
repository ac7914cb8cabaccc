//! Compute-once cell backing singleton registrations.
//!
//! The cell moves `Uncomputed → Computing → Computed` exactly once. The
//! caller that wins the transition runs the factory with no lock held; every
//! other caller parks on the condvar until the result lands. A factory that
//! panics puts the cell back to `Uncomputed` and wakes the waiters, so the
//! next caller retries instead of hanging.

use parking_lot::{Condvar, Mutex};

enum State<T, E> {
    Uncomputed,
    Computing,
    Computed(Result<T, E>),
}

pub(crate) struct OnceCell<T, E> {
    state: Mutex<State<T, E>>,
    ready: Condvar,
}

impl<T: Clone, E: Clone> OnceCell<T, E> {
    pub(crate) fn new() -> Self {
        Self { state: Mutex::new(State::Uncomputed), ready: Condvar::new() }
    }

    /// Returns the cached result, running `factory` first if nobody has yet.
    pub(crate) fn get_or_init(&self, factory: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let mut state = self.state.lock();
        loop {
            if let State::Computed(result) = &*state {
                return result.clone();
            }
            if matches!(*state, State::Uncomputed) {
                break;
            }
            self.ready.wait(&mut state);
        }
        *state = State::Computing;
        drop(state);

        let reset = ResetOnUnwind(self);
        let result = factory();
        std::mem::forget(reset);

        let mut state = self.state.lock();
        *state = State::Computed(result.clone());
        drop(state);
        self.ready.notify_all();
        result
    }
}

struct ResetOnUnwind<'a, T, E>(&'a OnceCell<T, E>);

impl<T, E> Drop for ResetOnUnwind<'_, T, E> {
    fn drop(&mut self) {
        *self.0.state.lock() = State::Uncomputed;
        self.0.ready.notify_all();
    }
}
