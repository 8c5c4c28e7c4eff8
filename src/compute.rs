/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The user-supplied vertex program.
//!
//! Main trait: [`ComputeFunction`].

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use indexmap::IndexMap;

use crate::types::data_types::Superstep;
use crate::types::graph::{EdgeWithValue, PregelValue, VertexKey, VertexWithValue};

/// The vertex program run once per active vertex per superstep.
///
/// Besides implementing [`compute`](Self::compute), implementors are expected to be
/// *deterministic*: called with the same `(superstep, vertex, messages, edges)`, the function
/// must leave the same new value and the same outgoing messages in the callback every time. The
/// engine relies on this to re-invoke the function after a crash restart or a late-arriving
/// message, and does not deduplicate the effects of a re-invocation.
pub trait ComputeFunction: Clone + Send + 'static {
    /// Vertex key type.
    type K: VertexKey;
    /// Vertex value type.
    type VV: PregelValue;
    /// Edge value type.
    type EV: PregelValue;
    /// Message type.
    type M: PregelValue;

    /// Run the vertex program for `vertex` at `superstep`.
    ///
    /// `messages` holds one message per sender that reached this vertex in the previous
    /// superstep; it is empty only at superstep 0 when the computation was seeded without an
    /// initial message. `edges` is this vertex's outgoing edges, empty for a sink. Outputs go
    /// through `callback`.
    fn compute(
        &self,
        superstep: Superstep,
        vertex: &VertexWithValue<Self::K, Self::VV>,
        messages: &HashMap<Self::K, Self::M>,
        edges: &[EdgeWithValue<Self::K, Self::EV>],
        callback: &mut ComputeCallback<Self::K, Self::VV, Self::M>,
    ) -> Result<(), UserComputeError>;
}

/// Output builder handed to [`ComputeFunction::compute`].
///
/// Accumulates an optional replacement vertex value and at most one outgoing message per
/// destination. Ordering of outgoing messages is irrelevant to the protocol; the map iterates
/// in insertion order only so that dispatch and logs are reproducible.
pub struct ComputeCallback<K, VV, M> {
    new_vertex_value: Option<VV>,
    outgoing: IndexMap<K, M>,
}

impl<K: VertexKey, VV, M> ComputeCallback<K, VV, M> {
    pub(crate) fn new() -> Self {
        Self {
            new_vertex_value: None,
            outgoing: IndexMap::new(),
        }
    }

    /// Replace the vertex's value from the next superstep onwards. Not calling this leaves the
    /// value unchanged.
    pub fn set_new_vertex_value(&mut self, value: VV) {
        self.new_vertex_value = Some(value);
    }

    /// Send `message` to the vertex `target`, to be delivered in the next superstep. Sending to
    /// the same target twice in one invocation keeps the later message.
    pub fn send_message_to(&mut self, target: K, message: M) {
        self.outgoing.insert(target, message);
    }

    pub(crate) fn into_outputs(self) -> (Option<VV>, IndexMap<K, M>) {
        (self.new_vertex_value, self.outgoing)
    }
}

/// An error raised by a user compute function.
///
/// The engine logs it with the vertex it occurred on and fails the task: a vertex program error
/// is never skipped over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserComputeError {
    pub detail: String,
}

impl UserComputeError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl Display for UserComputeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "compute function failed: {}", self.detail)
    }
}
