/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Notifications that are emitted when significant things happen in the local worker.
//!
//! ## Event enum
//!
//! Significant occurrences include the leader advancing the shared state, a worker attesting
//! readiness at a barrier, a vertex being forwarded into the compute pipeline, and the
//! computation completing.
//!
//! Each occurrence corresponds to a variant of the [event enum](Event), whose inner struct
//! carries a timestamp of when the event happened plus a summary of what happened. Vertex keys
//! appear in events in their `Debug` rendering, so the event types stay independent of the
//! user's key type.
//!
//! ## Registering event handlers
//!
//! Library users can register one handler closure per event type via
//! [`UserEventHandlers`](crate::event_bus::UserEventHandlers); default handlers that log events
//! out are enabled through the [configuration](crate::config::Configuration). Events are always
//! emitted **after** the occurrence they describe has completed.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use crate::types::data_types::{PartitionId, Superstep, WorkerName};
use crate::types::pregel_state::PregelState;

/// Enumerates all events defined for the engine.
pub enum Event {
    // Driver and shared-state events.
    StartComputation(StartComputationEvent),
    AdvanceState(AdvanceStateEvent),
    CompleteComputation(CompleteComputationEvent),

    // Barrier events.
    SignalReceiveReady(SignalReceiveReadyEvent),
    SignalSendComplete(SignalSendCompleteEvent),
    ActivatePartition(ActivatePartitionEvent),
    DrainPartition(DrainPartitionEvent),

    // Pipeline events.
    ForwardVertex(ForwardVertexEvent),
    ComputeVertex(ComputeVertexEvent),
    DispatchMessages(DispatchMessagesEvent),
    GarbageCollect(GarbageCollectEvent),
}

impl Event {
    /// Publishes this event on the event publisher channel (if the channel is defined).
    pub fn publish(self, event_publisher: &Option<Sender<Event>>) {
        if let Some(event_publisher) = event_publisher {
            let _ = event_publisher.send(self);
        }
    }
}

/// The driver published the initial running state into the shared value.
pub struct StartComputationEvent {
    pub timestamp: SystemTime,
    pub max_iterations: i32,
}

/// The leader replaced the shared [`PregelState`] with its successor.
pub struct AdvanceStateEvent {
    pub timestamp: SystemTime,
    pub state: PregelState,
}

/// The computation reached the Completed lifecycle and the local completion handle was resolved.
pub struct CompleteComputationEvent {
    pub timestamp: SystemTime,
    pub state: PregelState,
    /// True when the computation converged (ran out of messages); false when it was halted by
    /// the iteration bound.
    pub converged: bool,
}

/// A worker task attested RECEIVE readiness: every message addressed to it for this superstep
/// has been buffered locally.
pub struct SignalReceiveReadyEvent {
    pub timestamp: SystemTime,
    pub worker: WorkerName,
    pub superstep: Superstep,
}

/// A worker task attested SEND completion: every buffered vertex of this superstep has been
/// forwarded, computed and dispatched.
pub struct SignalSendCompleteEvent {
    pub timestamp: SystemTime,
    pub worker: WorkerName,
    pub superstep: Superstep,
}

/// The first vertex of a partition entered the compute pipeline for this superstep; the
/// partition has in-flight work until it drains.
pub struct ActivatePartitionEvent {
    pub timestamp: SystemTime,
    pub partition: PartitionId,
    pub superstep: Superstep,
}

/// The last active vertex of a partition was dispatched; its in-flight marker was removed.
pub struct DrainPartitionEvent {
    pub timestamp: SystemTime,
    pub partition: PartitionId,
    pub superstep: Superstep,
}

/// A vertex and its buffered messages were forwarded into the compute pipeline.
pub struct ForwardVertexEvent {
    pub timestamp: SystemTime,
    pub vertex: String,
    pub superstep: Superstep,
    pub message_count: usize,
}

/// The user compute function ran for a vertex.
pub struct ComputeVertexEvent {
    pub timestamp: SystemTime,
    pub vertex: String,
    pub superstep: Superstep,
    pub updated_value: bool,
    pub outgoing_count: usize,
}

/// Every outgoing message of a computed vertex was durably enqueued and the vertex was
/// deactivated.
pub struct DispatchMessagesEvent {
    pub timestamp: SystemTime,
    pub src: String,
    /// The superstep the messages will be delivered in.
    pub superstep: Superstep,
    pub message_count: usize,
}

/// A worker task discarded the inbox, forwarded set and active set of a finished superstep.
pub struct GarbageCollectEvent {
    pub timestamp: SystemTime,
    pub superstep: Superstep,
}
