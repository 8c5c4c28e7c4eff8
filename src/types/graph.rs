/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Graph-shaped payloads that travel through the topics: vertices, edges, solution-set entries
//! and work-set entries.

use std::fmt::Debug;
use std::hash::Hash;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::types::data_types::Superstep;

/// Bound on user-supplied vertex key types.
///
/// Keys are hashed by the [partition router](crate::partitioner), stored in per-worker maps, and
/// carried on the wire, so they must serialize deterministically and behave as map keys.
pub trait VertexKey:
    BorshSerialize + BorshDeserialize + Clone + Eq + Hash + Debug + Send + Sync + 'static
{
}

impl<T> VertexKey for T where
    T: BorshSerialize + BorshDeserialize + Clone + Eq + Hash + Debug + Send + Sync + 'static
{
}

/// Bound on user-supplied vertex values, edge values and messages.
pub trait PregelValue:
    BorshSerialize + BorshDeserialize + Clone + Debug + Send + Sync + 'static
{
}

impl<T> PregelValue for T where
    T: BorshSerialize + BorshDeserialize + Clone + Debug + Send + Sync + 'static
{
}

/// A vertex as handed to the user compute function.
///
/// `value` is `None` when neither the solution set nor the vertex table knows a value for the
/// key, which happens when a message is addressed to a vertex that was never loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexWithValue<K, VV> {
    pub key: K,
    pub value: Option<VV>,
}

impl<K, VV> VertexWithValue<K, VV> {
    pub fn new(key: K, value: Option<VV>) -> Self {
        Self { key, value }
    }
}

/// An outgoing edge of some source vertex: the destination key and the edge's own value.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct EdgeWithValue<K, EV> {
    pub target: K,
    pub value: EV,
}

impl<K, EV> EdgeWithValue<K, EV> {
    pub fn new(target: K, value: EV) -> Self {
        Self { target, value }
    }
}

/// A double-buffered solution-set entry: the previous and current generation of a vertex value,
/// each tagged with the superstep it became valid at.
///
/// Invariant: `cur_step >= prev_step` and `cur_step >= 0`. A reader that is lagging behind the
/// computation picks the generation applicable to the superstep it is at via
/// [`value_at`](Self::value_at), so a slow solution-set log never shows a value from the future.
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct VertexEntry<VV> {
    pub prev_step: Superstep,
    pub prev_value: Option<VV>,
    pub cur_step: Superstep,
    pub cur_value: Option<VV>,
}

impl<VV: Clone> VertexEntry<VV> {
    /// The entry a vertex is seeded with before superstep 0: `(-1, v, 0, v)`.
    pub fn seeded(value: Option<VV>) -> Self {
        Self {
            prev_step: Superstep::seed(),
            prev_value: value.clone(),
            cur_step: Superstep::init(),
            cur_value: value,
        }
    }

    /// The value applicable at `superstep`: the current generation if it had already been
    /// produced by then, the previous generation otherwise.
    pub fn value_at(&self, superstep: Superstep) -> Option<VV> {
        if self.cur_step <= superstep {
            self.cur_value.clone()
        } else {
            self.prev_value.clone()
        }
    }
}

/// One in-flight message in the work-set log.
///
/// The log key of the record carrying a `WorkSetEntry` is the *destination* vertex key, so the
/// log's partitioner routes the entry to the worker that owns the destination. `message` is
/// `None` only for the optional initial seed emitted at superstep 0.
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct WorkSetEntry<K, M> {
    pub superstep: Superstep,
    pub src: K,
    pub message: Option<M>,
}

impl<K, M> WorkSetEntry<K, M> {
    pub fn new(superstep: Superstep, src: K, message: Option<M>) -> Self {
        Self {
            superstep,
            src,
            message,
        }
    }
}
