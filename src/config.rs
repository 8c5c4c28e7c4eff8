/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Configuration as specified by the operator. This is split up into smaller, subsystem specific
//! config structs before being passed to components.

use std::time::Duration;

use crate::types::data_types::{ApplicationId, NumPartitions, PartitionId};

/// Configuration of one worker process of a computation.
#[derive(Clone)]
pub struct Configuration {
    pub worker: WorkerConfig,
    pub topics: TopicNames,
    pub timing: TimingConfig,
    /// Whether the default logging event handlers are installed.
    pub log_events: bool,
}

/// Identity and partition assignment of a worker process.
#[derive(Clone)]
pub struct WorkerConfig {
    /// Namespace of this computation inside the coordination store and the log cluster.
    pub application_id: ApplicationId,
    /// Address component of this process's worker names. Any string unique to the process works;
    /// `host:port` is the convention.
    pub host_and_port: String,
    /// The topic partitions this process's tasks own. Assignment is decided outside the engine
    /// and must cover every partition exactly once across all processes.
    pub assigned_partitions: Vec<PartitionId>,
    /// Total partition count of the computation's topics.
    pub num_partitions: NumPartitions,
}

/// Names of the four topics a computation runs over.
#[derive(Clone)]
pub struct TopicNames {
    pub vertices: String,
    pub edges_grouped_by_source: String,
    pub solution_set: String,
    pub work_set: String,
}

impl TopicNames {
    /// The conventional topic names for `application_id`.
    pub fn for_application(application_id: &ApplicationId) -> Self {
        Self {
            vertices: format!("vertices-{}", application_id),
            edges_grouped_by_source: format!("edgesGroupedBySource-{}", application_id),
            solution_set: format!("solutionSet-{}", application_id),
            work_set: format!("workSet-{}", application_id),
        }
    }
}

/// Timing knobs.
#[derive(Clone)]
pub struct TimingConfig {
    /// How often each worker task runs its barrier tick.
    pub barrier_tick_interval: Duration,
    /// Upper bound on a single blocking coordination-store operation.
    pub coordination_timeout: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            barrier_tick_interval: Duration::from_millis(250),
            coordination_timeout: Duration::from_secs(5),
        }
    }
}
