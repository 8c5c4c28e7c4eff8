/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store values, and do not have any major "active" behavior.

use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, Sub},
};

use borsh::{BorshDeserialize, BorshSerialize};

/// Number of one iteration of the bulk synchronous parallel loop.
///
/// Starts at 0 when a computation begins and increases by 1 every time the shared
/// [`PregelState`](crate::types::pregel_state::PregelState) passes through a SEND phase. The inner
/// value is signed because the solution set uses `-1` as the "before the first superstep"
/// generation of a seeded vertex value.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct Superstep(i32);

impl Superstep {
    /// Create a new `Superstep` wrapping `int`.
    pub const fn new(int: i32) -> Self {
        Self(int)
    }

    /// Get the initial `Superstep`, which is 0.
    pub const fn init() -> Self {
        Self(0)
    }

    /// Get the `Superstep` that precedes superstep 0, used by seeded solution-set entries.
    pub const fn seed() -> Self {
        Self(-1)
    }

    /// Get the inner `i32` of this `Superstep`.
    pub const fn int(&self) -> i32 {
        self.0
    }
}

impl Display for Superstep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl Add<i32> for Superstep {
    type Output = Superstep;

    fn add(self, rhs: i32) -> Self::Output {
        Superstep(self.0.add(rhs))
    }
}

impl Sub<i32> for Superstep {
    type Output = Superstep;

    fn sub(self, rhs: i32) -> Self::Output {
        Superstep(self.0.sub(rhs))
    }
}

/// Index of a partition of the work-set and solution-set logs.
///
/// Every topic of a single computation has the same number of partitions, and every partition is
/// owned by exactly one worker task at a time. The
/// [partition router](crate::partitioner::partition_for_key) maps vertex keys into this space.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct PartitionId(u32);

impl PartitionId {
    /// Create a new `PartitionId` wrapping `int`.
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    /// Get the inner `u32` of this `PartitionId`.
    pub const fn int(&self) -> u32 {
        self.0
    }
}

impl Display for PartitionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Number of partitions each topic of a computation is divided into.
///
/// Fixed for the lifetime of a computation: the engine does not repartition mid-run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshDeserialize, BorshSerialize)]
pub struct NumPartitions(u32);

impl NumPartitions {
    /// Create a new `NumPartitions` wrapping `int`.
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    /// Get the inner `u32` of this `NumPartitions`.
    pub const fn int(&self) -> u32 {
        self.0
    }
}

impl Display for NumPartitions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of a single computation.
///
/// Every coordination path and topic of a computation is namespaced under its `ApplicationId`,
/// so multiple computations can share one coordination store and one log cluster.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApplicationId(String);

impl ApplicationId {
    /// Create a new `ApplicationId` wrapping `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner `str` of this `ApplicationId`.
    pub fn str(&self) -> &str {
        &self.0
    }
}

impl Display for ApplicationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Name that uniquely identifies a worker task within a computation's group.
///
/// Rendered as `<hostAndPort>#<taskId>`: unique to a task, common to no one else, and stable for
/// as long as the task lives. Readiness attestations in the barrier tree are registered under
/// this name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkerName(String);

impl WorkerName {
    /// Create the `WorkerName` of the task that owns `partition` in the process reachable at
    /// `host_and_port`.
    pub fn new(host_and_port: &str, partition: PartitionId) -> Self {
        Self(format!("{}#{}", host_and_port, partition.int()))
    }

    /// Create a `WorkerName` from an already-rendered string.
    pub(crate) fn from_string(name: String) -> Self {
        Self(name)
    }

    /// Get the inner `str` of this `WorkerName`.
    pub fn str(&self) -> &str {
        &self.0
    }
}

impl Display for WorkerName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}
