/*!
 * Wait List
 *
 * Ordered, growable collection with a FIFO queue of processes waiting for
 * it to become non-empty.
 *
 * # Wakeup rules
 *
 * - `wait_available` checks emptiness when its process is built and again
 *   under the list lock when the waiter enqueues, so an element added in
 *   between is never missed.
 * - Every added element wakes at most one waiter, oldest first. A waiter
 *   that was killed concurrently does not consume the wakeup.
 * - Waking does not reserve the element; a woken waiter only learns the
 *   list was non-empty at that moment.
 * - Killing a waiter removes it from the queue and fails it with `Killed`.
 */

use crate::combinators::{CancelHook, Closure, Empty, Resume, Suspend};
use crate::process::{BoxProcess, ProcessExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use tracing::trace;

struct Waiter {
    id: u64,
    resume: Resume,
}

struct State<T> {
    items: Vec<T>,
    waiters: VecDeque<Waiter>,
    next_waiter: u64,
}

impl<T> State<T> {
    fn enqueue(&mut self, resume: Resume) -> u64 {
        let id = self.next_waiter;
        self.next_waiter += 1;
        self.waiters.push_back(Waiter { id, resume });
        id
    }
}

/// Readiness-waiting list
pub struct WaitList<T> {
    state: Arc<Mutex<State<T>>>,
}

impl<T> Clone for WaitList<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: Send + 'static> WaitList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                items,
                waiters: VecDeque::new(),
                next_waiter: 0,
            })),
        }
    }

    /// Append an element, waking the oldest waiter
    pub fn push(&self, item: T) {
        self.state.lock().items.push(item);
        self.wake(1);
    }

    /// Append every element, waking one waiter per element
    pub fn extend<I: IntoIterator<Item = T>>(&self, items: I) {
        let added = {
            let mut state = self.state.lock();
            let before = state.items.len();
            state.items.extend(items);
            state.items.len() - before
        };
        self.wake(added);
    }

    /// Insert at `index`, waking the oldest waiter
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&self, index: usize, item: T) {
        self.state.lock().items.insert(index, item);
        self.wake(1);
    }

    /// Remove the element at `index`, if present
    pub fn remove(&self, index: usize) -> Option<T> {
        let mut state = self.state.lock();
        (index < state.items.len()).then(|| state.items.remove(index))
    }

    pub fn pop_front(&self) -> Option<T> {
        self.remove(0)
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn clear(&self) {
        self.state.lock().items.clear();
    }

    /// Number of processes currently waiting
    pub fn waiter_count(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Process that completes once the list is non-empty
    ///
    /// The emptiness check happens when the returned process is invoked,
    /// not when it is built.
    pub fn wait_available(&self) -> BoxProcess {
        let state = self.state.clone();
        Closure::new(move || {
            if !state.lock().items.is_empty() {
                return Empty::new().boxed();
            }
            Suspend::named("wait_available", move |resume| arm_waiter(&state, resume))
                .boxed()
        })
        .boxed()
    }

    fn wake(&self, mut count: usize) {
        while count > 0 {
            let waiter = self.state.lock().waiters.pop_front();
            let Some(waiter) = waiter else {
                return;
            };
            if waiter.resume.done() {
                trace!(waiter = waiter.id, "waiter woken");
                count -= 1;
            }
        }
    }
}

/// Enqueue `resume` unless the list is already non-empty
///
/// The returned hook removes the waiter again.
fn arm_waiter<T: Send + 'static>(
    state: &Arc<Mutex<State<T>>>,
    resume: Resume,
) -> Option<CancelHook> {
    let mut guard = state.lock();
    if !guard.items.is_empty() {
        drop(guard);
        resume.done();
        return None;
    }
    let id = guard.enqueue(resume);
    drop(guard);
    trace!(waiter = id, "waiting for element");

    let weak: Weak<Mutex<State<T>>> = Arc::downgrade(state);
    Some(Box::new(move || {
        if let Some(state) = weak.upgrade() {
            state.lock().waiters.retain(|w| w.id != id);
            trace!(waiter = id, "waiter removed");
        }
    }) as CancelHook)
}

impl<T: Clone + Send + 'static> WaitList<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.state.lock().items.get(index).cloned()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.state.lock().items.clone()
    }
}

impl<T: Send + 'static> Default for WaitList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> FromIterator<T> for WaitList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for WaitList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WaitList")
            .field("items", &state.items)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}
