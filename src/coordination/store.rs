/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Trait for the pluggable coordination store.
//!
//! Main trait: [`CoordinationStore`].
//!
//! The engine needs four primitives from its coordination store: ephemeral group membership, a
//! non-blocking leader latch, one replicated shared value (holding the encoded
//! [`PregelState`](crate::types::pregel_state::PregelState)), and a barrier tree of named
//! children laid out per [`paths`](crate::coordination::paths). A ZooKeeper-backed
//! implementation maps these onto a group-membership recipe, a leader latch, a shared value and
//! ephemeral/persistent znodes; tests use an in-memory implementation.
//!
//! Every operation may block on the backing store, bounded by the operator-configured
//! coordination timeout; blocking past the bound surfaces as [`CoordinationError::Timeout`].

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use crate::coordination::paths::{BarrierChild, BarrierPath};
use crate::types::data_types::{Superstep, WorkerName};
use crate::types::pregel_state::PregelState;

/// Whether a barrier child outlives the session that created it.
///
/// Worker readiness attestations are `Ephemeral` so a crashed worker cannot hold a barrier
/// closed; partition markers are `Persistent` because the messages they stand for are durable in
/// the log regardless of who wrote them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateMode {
    Ephemeral,
    Persistent,
}

/// Trait for the pluggable coordination store.
///
/// Clones share one session: ephemeral nodes created through any clone disappear together when
/// the session ends. Every worker task of a process holds a clone.
pub trait CoordinationStore: Clone + Send + 'static {
    /// Bound every subsequent blocking operation issued through this handle (and handles cloned
    /// from it afterwards) at `timeout`. An exceeded bound surfaces as
    /// [`CoordinationError::Timeout`]. The engine calls this with the operator-configured
    /// coordination timeout before using a handle.
    fn set_operation_timeout(&mut self, timeout: Duration);

    /// Register `member` in the computation's group, ephemerally.
    fn join_group(&mut self, member: &WorkerName) -> Result<(), CoordinationError>;

    /// Remove this session's members from the group.
    fn leave_group(&mut self) -> Result<(), CoordinationError>;

    /// The number of members currently in the group.
    fn group_size(&self) -> Result<usize, CoordinationError>;

    /// Whether this session currently holds the leader latch. Non-blocking.
    fn has_leadership(&self) -> Result<bool, CoordinationError>;

    /// Read the replicated shared value. An empty `Vec` means the value was never written.
    fn read_shared_value(&self) -> Result<Vec<u8>, CoordinationError>;

    /// Replace the replicated shared value.
    fn write_shared_value(&mut self, value: &[u8]) -> Result<(), CoordinationError>;

    /// Add `child` under `barrier`. Idempotent: adding a child that already exists is `Ok`.
    fn add_barrier_child(
        &mut self,
        barrier: &BarrierPath,
        child: &BarrierChild,
        mode: CreateMode,
    ) -> Result<(), CoordinationError>;

    /// Remove `child` from `barrier`. Idempotent: removing an absent child is `Ok`.
    fn remove_barrier_child(
        &mut self,
        barrier: &BarrierPath,
        child: &BarrierChild,
    ) -> Result<(), CoordinationError>;

    /// Whether `child` currently exists under `barrier`.
    fn has_barrier_child(
        &self,
        barrier: &BarrierPath,
        child: &BarrierChild,
    ) -> Result<bool, CoordinationError>;

    /// All children currently under `barrier`.
    fn barrier_children(
        &self,
        barrier: &BarrierPath,
    ) -> Result<Vec<BarrierChild>, CoordinationError>;

    /// Delete every barrier node of a superstep lower than `up_to_step`, children included.
    /// Stale partition markers die here even if their partitions never drained cleanly.
    fn prune_barriers(&mut self, up_to_step: Superstep) -> Result<(), CoordinationError>;
}

/// Enumerates the ways talking to the coordination store can fail.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoordinationError {
    /// The session to the backing store was lost. Ephemeral nodes of this session are gone or
    /// going; the caller should retry on its next tick and re-attest what it still owns.
    Disconnected { detail: String },

    /// An operation blocked past the configured coordination timeout.
    Timeout { detail: String },

    /// The shared value held bytes that do not decode into a `PregelState`.
    MalformedSharedValue { detail: String },

    /// A barrier path the protocol requires was missing from the store.
    MissingBarrierPath { path: String },
}

impl Display for CoordinationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CoordinationError::Disconnected { detail } => {
                write!(f, "coordination session lost: {}", detail)
            }
            CoordinationError::Timeout { detail } => {
                write!(f, "coordination operation timed out: {}", detail)
            }
            CoordinationError::MalformedSharedValue { detail } => {
                write!(f, "shared value does not decode: {}", detail)
            }
            CoordinationError::MissingBarrierPath { path } => {
                write!(f, "barrier path missing: {}", path)
            }
        }
    }
}

/// Handle for reading and writing the [`PregelState`] held in the shared value.
///
/// Owns the encode/decode step so callers never see raw bytes. An unwritten shared value reads
/// as [`PregelState::created`], which is the state every computation is in before
/// [`run`](crate::computation::PregelComputation::run).
#[derive(Clone)]
pub(crate) struct SharedState<C: CoordinationStore> {
    store: C,
}

impl<C: CoordinationStore> SharedState<C> {
    pub(crate) fn new(store: C) -> Self {
        Self { store }
    }

    pub(crate) fn read(&self) -> Result<PregelState, CoordinationError> {
        let bytes = self.store.read_shared_value()?;
        if bytes.is_empty() {
            Ok(PregelState::created())
        } else {
            PregelState::from_bytes(&bytes)
        }
    }

    pub(crate) fn write(&mut self, state: &PregelState) -> Result<(), CoordinationError> {
        self.store.write_shared_value(&state.to_bytes())
    }
}
