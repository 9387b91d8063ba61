//! Lifecycle of a resource bound to a screen activation.
//!
//! A [`Lifecycle`] is a slot that holds at most one instance of some resource (a video client,
//! a UI state) and moves through these phases:
//!
//! ```text
//!            begin              commit
//!  Absent ──────────▶ Creating ─────────▶ Ready
//!    ▲                 │    │               │
//!    │ abort           │    │ release       │ release (teardown runs here)
//!    └─────────────────┘    ▼               ▼
//!                       Disposing ──────▶ Disposed ──▶ (begin again)
//!                            commit/abort
//! ```
//!
//! Creation can suspend (device acquisition is asynchronous), and the owning screen may be torn
//! down while it does. Every [`Ticket`] carries the generation it was issued for; a result
//! committed with an outdated ticket, or into a slot that was released in the meantime, is never
//! installed and is handed to the caller's discard function instead. While such an abandoned
//! creation is still in flight the slot sits in `Disposing`, and [`Lifecycle::begin`] waits for
//! it to settle, so a replacement is never created before its predecessor has been torn down.
//!
//! A ticket that is dropped without being committed or aborted (because the future driving the
//! creation was cancelled) aborts on drop, so a cancelled creation never wedges the slot.
//!
//! [`Lifecycle::release`] is idempotent: releasing an `Absent` or `Disposed` slot does nothing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Observable phase of a [`Lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Absent,
    Creating,
    Ready,
    Disposing,
    Disposed,
}

#[derive(Debug)]
enum State<T> {
    Absent,
    Creating,
    Ready(T),
    Disposing,
    Disposed,
}

impl<T> State<T> {
    fn phase(&self) -> Phase {
        match self {
            State::Absent => Phase::Absent,
            State::Creating => Phase::Creating,
            State::Ready(_) => Phase::Ready,
            State::Disposing => Phase::Disposing,
            State::Disposed => Phase::Disposed,
        }
    }
}

#[derive(Debug)]
struct Inner<T> {
    state: State<T>,
    generation: u64,
}

#[derive(Debug)]
struct Shared<T> {
    // never held across an await
    inner: Mutex<Inner<T>>,
    settled: Notify,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settle a creation that will never commit.
    fn abandon(&self, kind: &'static str, generation: u64) {
        let mut inner = self.lock();
        if inner.generation != generation {
            return;
        }
        match inner.state.phase() {
            Phase::Creating => inner.state = State::Absent,
            Phase::Disposing => {
                inner.state = State::Disposed;
                self.settled.notify_waiters();
            }
            _ => return,
        }
        tracing::trace!(kind, generation, "creation abandoned");
    }
}

/// Permission to create the resource for one generation of a [`Lifecycle`].
///
/// Dropping an unused ticket is the same as passing it to [`Lifecycle::abort`].
#[derive(Debug)]
#[must_use = "a ticket must be committed or aborted"]
pub struct Ticket<T> {
    generation: u64,
    shared: Arc<Shared<T>>,
    kind: &'static str,
    spent: bool,
}

impl<T> Drop for Ticket<T> {
    fn drop(&mut self) {
        if !self.spent {
            self.shared.abandon(self.kind, self.generation);
        }
    }
}

/// A slot holding at most one live instance of `T`.
///
/// Clones share the same slot.
#[derive(Debug)]
pub struct Lifecycle<T> {
    shared: Arc<Shared<T>>,
    kind: &'static str,
}

impl<T> Clone for Lifecycle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            kind: self.kind,
        }
    }
}

impl<T> Lifecycle<T> {
    /// An empty slot. `kind` names the resource in logs.
    pub fn new(kind: &'static str) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    state: State::Absent,
                    generation: 0,
                }),
                settled: Notify::new(),
            }),
            kind,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub async fn phase(&self) -> Phase {
        self.shared.lock().state.phase()
    }

    pub async fn is_ready(&self) -> bool {
        self.phase().await == Phase::Ready
    }

    /// Start creating the resource.
    ///
    /// Returns `None` if the slot is already `Creating` or `Ready`. If an abandoned creation is
    /// still in flight, waits for it to settle first.
    pub async fn begin(&self) -> Option<Ticket<T>> {
        loop {
            let settled = {
                let mut inner = self.shared.lock();
                match inner.state.phase() {
                    Phase::Absent | Phase::Disposed => {
                        inner.generation += 1;
                        inner.state = State::Creating;
                        tracing::trace!(kind = self.kind, generation = inner.generation, "creating");
                        return Some(Ticket {
                            generation: inner.generation,
                            shared: Arc::clone(&self.shared),
                            kind: self.kind,
                            spent: false,
                        });
                    }
                    Phase::Creating | Phase::Ready => return None,
                    // registered before the lock is released, so the wakeup cannot be missed
                    Phase::Disposing => self.shared.settled.notified(),
                }
            };
            tracing::debug!(
                kind = self.kind,
                "waiting for abandoned creation to settle"
            );
            settled.await;
        }
    }

    /// Whether `ticket` still belongs to a creation nobody has released.
    pub async fn is_current(&self, ticket: &Ticket<T>) -> bool {
        let inner = self.shared.lock();
        inner.generation == ticket.generation && inner.state.phase() == Phase::Creating
    }

    /// Install a freshly created value.
    ///
    /// If the slot was released (or re-begun) while the value was being created, the value is
    /// handed to `discard` instead and `false` is returned.
    pub async fn commit(&self, mut ticket: Ticket<T>, value: T, discard: impl FnOnce(T)) -> bool {
        ticket.spent = true;
        let mut inner = self.shared.lock();
        if inner.generation == ticket.generation {
            match inner.state.phase() {
                Phase::Creating => {
                    inner.state = State::Ready(value);
                    tracing::trace!(kind = self.kind, generation = ticket.generation, "ready");
                    return true;
                }
                Phase::Disposing => {
                    tracing::debug!(
                        kind = self.kind,
                        generation = ticket.generation,
                        "owner went away during creation; discarding result"
                    );
                    discard(value);
                    inner.state = State::Disposed;
                    self.shared.settled.notify_waiters();
                    return false;
                }
                _ => {}
            }
        }
        tracing::debug!(
            kind = self.kind,
            ticket = ticket.generation,
            current = inner.generation,
            "discarding stale result"
        );
        discard(value);
        false
    }

    /// Give up on a creation that failed.
    pub async fn abort(&self, ticket: Ticket<T>) {
        drop(ticket);
    }

    /// Create the value synchronously if the slot is empty.
    ///
    /// Returns whether a value was installed. `discard` receives the value if the slot was
    /// released before it could be installed.
    pub async fn acquire(&self, create: impl FnOnce() -> T, discard: impl FnOnce(T)) -> bool {
        let Some(ticket) = self.begin().await else {
            return false;
        };
        self.commit(ticket, create(), discard).await
    }

    /// Tear the current value down.
    ///
    /// A `Ready` value is passed to `teardown`; a creation in flight is marked abandoned so its
    /// result will be discarded. Returns whether a ready value was torn down.
    pub async fn release(&self, teardown: impl FnOnce(T)) -> bool {
        let mut inner = self.shared.lock();
        match std::mem::replace(&mut inner.state, State::Disposing) {
            State::Ready(value) => {
                tracing::trace!(kind = self.kind, generation = inner.generation, "disposing");
                teardown(value);
                inner.state = State::Disposed;
                true
            }
            State::Creating => {
                tracing::debug!(
                    kind = self.kind,
                    generation = inner.generation,
                    "released during creation"
                );
                // stays Disposing until the in-flight creation commits or aborts
                false
            }
            previous => {
                inner.state = previous;
                false
            }
        }
    }

    /// Run `f` against the ready value, if there is one.
    pub async fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut inner = self.shared.lock();
        match &mut inner.state {
            State::Ready(value) => Some(f(value)),
            _ => None,
        }
    }
}
