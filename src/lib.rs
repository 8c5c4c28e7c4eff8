/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! A distributed, Pregel-style bulk synchronous parallel (BSP) graph computation engine.
//!
//! The engine runs a user-supplied [vertex program](compute::ComputeFunction) over a partitioned
//! graph as a sequence of *supersteps*: in each superstep every active vertex receives the
//! messages delivered to it in the previous step, optionally updates its own value, and sends
//! messages to its neighbours. Multiple worker processes are kept in lockstep by a barrier
//! protocol: no worker enters superstep N+1 before every worker has finished superstep N.
//!
//! ## Architecture
//!
//! The engine stands on two pluggable externals:
//! - a [durable partitioned log](messaging::MessageLog) carrying the vertex, edge, solution-set
//!   and work-set streams, and
//! - a [coordination store](coordination::store::CoordinationStore) providing group membership,
//!   a leader latch, one replicated shared value, and a tree of ephemeral/persistent barrier
//!   children.
//!
//! Inside a worker process, one single-threaded [task](worker) per assigned partition buffers
//! incoming messages, and a periodic [barrier tick](worker) moves the replicated
//! [`PregelState`](types::pregel_state::PregelState) through its RECEIVE and SEND phases: the
//! leader advances the shared value when the barrier tree shows the phase is finished, and every
//! worker forwards its buffered vertices through the compute pipeline during SEND. The
//! [driver façade](computation::PregelComputation) seeds the topics, starts the worker, and
//! exposes the computation's state and result.

pub mod compute;

pub mod computation;

pub mod config;

pub mod coordination;

pub mod event_bus;

pub mod events;

pub(crate) mod logging;

pub mod messaging;

pub mod partitioner;

pub mod types;

pub mod worker;

// Re-exports
pub use compute::{ComputeCallback, ComputeFunction, UserComputeError};
pub use computation::{PregelComputation, PregelError, ResultHandle};
pub use config::{Configuration, TimingConfig, TopicNames, WorkerConfig};
pub use types::data_types::{ApplicationId, NumPartitions, PartitionId, Superstep, WorkerName};
pub use types::graph::{EdgeWithValue, VertexEntry, VertexWithValue, WorkSetEntry};
pub use types::pregel_state::{Lifecycle, Phase, PregelState};
