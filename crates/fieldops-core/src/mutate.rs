//! Optimistic-then-reconcile engine for single-entity mutations.
//!
//! A mutation is applied to visible state synchronously, then submitted
//! to the server. A response body carrying the authoritative entity
//! replaces the optimistic guess; a failure restores the exact
//! pre-mutation state by value. At most one mutation per target entity
//! is in flight at a time, so a stale response can never overwrite a
//! newer optimistic state.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::ApiResult;
use crate::events::{CoreEvent, EventSink, Notice};

/// A single-entity state change: toggle access, edit a field, add or
/// remove a collaborator.
pub trait Mutation: Send + Sync {
    /// The screen-level state this mutation runs against
    type State: Clone + Send;
    /// Authoritative server representation returned on acknowledgment
    type Ack: Send;

    /// Stable key of the entity this change targets. Changes for the
    /// same target are serialized; changes for different targets are
    /// independent.
    fn target(&self) -> String;

    /// Apply the optimistic local change. Must be a pure state
    /// transformation: no I/O, no side effects.
    fn apply(&self, state: &mut Self::State);

    /// Fold the server's representation of the mutated entity back into
    /// local state. The server's shape wins over the optimistic guess.
    fn absorb(&self, state: &mut Self::State, ack: Self::Ack);
}

/// Remote collaborator that executes mutations.
#[async_trait]
pub trait MutationBackend<M: Mutation>: Send + Sync {
    /// Submit the change. `Ok(None)` means the response carried no body
    /// worth merging; the optimistic value stands as confirmed.
    async fn submit(&self, mutation: &M) -> ApiResult<Option<M::Ack>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Accepted with no authoritative body; the optimistic value stands
    Confirmed,
    /// Accepted and reconciled against the server's representation
    Reconciled,
    /// Dropped because a change for the same target is still in flight
    AlreadyPending,
}

pub struct OptimisticMutator<M: Mutation, B: MutationBackend<M>> {
    backend: B,
    state: Mutex<M::State>,
    in_flight: Mutex<HashSet<String>>,
    events: EventSink,
}

/// Frees a target's in-flight slot on every exit path.
struct TargetSlot<'a> {
    set: &'a Mutex<HashSet<String>>,
    target: String,
}

impl Drop for TargetSlot<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.target);
    }
}

impl<M: Mutation, B: MutationBackend<M>> OptimisticMutator<M, B> {
    pub fn new(initial: M::State, backend: B, events: EventSink) -> Self {
        Self {
            backend,
            state: Mutex::new(initial),
            in_flight: Mutex::new(HashSet::new()),
            events,
        }
    }

    /// Current state, cloned for the caller's render pass.
    pub fn state(&self) -> M::State {
        self.state.lock().clone()
    }

    /// Replace local state with a server-fetched baseline.
    pub fn seed(&self, state: M::State) {
        *self.state.lock() = state;
    }

    /// Apply `mutation` optimistically and reconcile with the server.
    ///
    /// The visible state change happens before this future first
    /// suspends, so the UI renders it immediately. On failure the state
    /// captured just before the apply is restored exactly, a [`Notice`]
    /// is emitted, and the error is returned for the caller; nothing is
    /// retried automatically.
    pub async fn mutate(&self, mutation: M) -> ApiResult<MutationOutcome> {
        let target = mutation.target();
        {
            let mut in_flight = self.in_flight.lock();
            if !in_flight.insert(target.clone()) {
                debug!(%target, "change already in flight for target, ignoring");
                return Ok(MutationOutcome::AlreadyPending);
            }
        }
        let _slot = TargetSlot {
            set: &self.in_flight,
            target: target.clone(),
        };

        let snapshot = {
            let mut state = self.state.lock();
            let snapshot = state.clone();
            mutation.apply(&mut state);
            snapshot
        };
        self.events.emit(CoreEvent::EntityChanged {
            target: target.clone(),
        });

        match self.backend.submit(&mutation).await {
            Ok(Some(ack)) => {
                {
                    let mut state = self.state.lock();
                    mutation.absorb(&mut state, ack);
                }
                self.events.emit(CoreEvent::EntityChanged { target });
                Ok(MutationOutcome::Reconciled)
            }
            Ok(None) => Ok(MutationOutcome::Confirmed),
            Err(err) => {
                warn!(%target, error = %err, "mutation failed, rolling back");
                *self.state.lock() = snapshot;
                self.events.emit(CoreEvent::EntityChanged { target });
                self.events.emit(CoreEvent::Notice(Notice::error(err.to_string())));
                Err(err)
            }
        }
    }
}
