/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The naming convention of the barrier tree.
//!
//! A computation's subtree in the coordination store is laid out as:
//!
//! ```text
//! <root>/<applicationId>/group/<workerName>              (ephemeral)
//! <root>/<applicationId>/leader/...                      (leader latch)
//! <root>/<applicationId>/superstep                       (shared value: PregelState bytes)
//! <root>/<applicationId>/barriers/<step>/<RCV|SND>/<name>
//! ```
//!
//! The `<name>` children of a barrier node are either `worker:<hostAndPort>#<taskId>`
//! (an ephemeral readiness attestation) or `partition-<p>` (a persistent "messages in flight
//! for partition p" marker).

use std::fmt::{self, Display, Formatter};

use crate::types::data_types::{PartitionId, Superstep, WorkerName};
use crate::types::pregel_state::{Phase, PregelState};

const WORKER_PREFIX: &str = "worker:";
const PARTITION_PREFIX: &str = "partition-";

/// One barrier node: the `barriers/<step>/<RCV|SND>` path a worker or partition child hangs
/// under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BarrierPath {
    pub superstep: Superstep,
    pub phase: Phase,
}

impl BarrierPath {
    pub fn new(superstep: Superstep, phase: Phase) -> Self {
        Self { superstep, phase }
    }

    /// The barrier node a shared state points at.
    pub fn of(state: &PregelState) -> Self {
        Self::new(state.superstep(), state.phase())
    }
}

impl Display for BarrierPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "barriers/{}/{}", self.superstep, self.phase)
    }
}

/// A named child of a barrier node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BarrierChild {
    /// A worker task attesting readiness for the barrier's phase.
    Worker(WorkerName),
    /// Messages destined for this partition are in flight (produced but not yet fully forwarded
    /// through the compute pipeline and re-dispatched).
    Partition(PartitionId),
}

impl BarrierChild {
    /// Parse a child from its rendered name. Returns `None` for names this engine did not write.
    pub fn parse(name: &str) -> Option<BarrierChild> {
        if let Some(worker) = name.strip_prefix(WORKER_PREFIX) {
            Some(BarrierChild::Worker(WorkerName::from_string(
                worker.to_string(),
            )))
        } else if let Some(partition) = name.strip_prefix(PARTITION_PREFIX) {
            partition
                .parse::<u32>()
                .ok()
                .map(|p| BarrierChild::Partition(PartitionId::new(p)))
        } else {
            None
        }
    }

    pub fn is_worker(&self) -> bool {
        matches!(self, BarrierChild::Worker(_))
    }

    pub fn is_partition(&self) -> bool {
        matches!(self, BarrierChild::Partition(_))
    }
}

impl Display for BarrierChild {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BarrierChild::Worker(name) => write!(f, "{}{}", WORKER_PREFIX, name),
            BarrierChild::Partition(partition) => {
                write!(f, "{}{}", PARTITION_PREFIX, partition)
            }
        }
    }
}
