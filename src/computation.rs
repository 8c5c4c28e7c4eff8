/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The driver façade of a computation.
//!
//! Main type: [`PregelComputation`].
//!
//! A `PregelComputation` ties one worker process into a computation:
//! [`prepare`](PregelComputation::prepare) seeds the topics and spawns the
//! [`Worker`](crate::worker::Worker) threads, [`run`](PregelComputation::run) publishes the
//! initial running state into the coordination store's shared value, and
//! [`future_result`](PregelComputation::future_result) hands out a handle that resolves when the
//! computation completes or a local task dies. Every participating process constructs its own
//! `PregelComputation` with the same configuration; `prepare` is idempotent across processes
//! because seed records collapse under the inbox's last-writer-wins rule, and `run` only writes
//! the initial state if no one else has.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::time::SystemTime;

use crate::compute::ComputeFunction;
use crate::config::Configuration;
use crate::coordination::paths::{BarrierChild, BarrierPath};
use crate::coordination::store::{
    CoordinationError, CoordinationStore, CreateMode, SharedState,
};
use crate::event_bus::{EventHandlers, UserEventHandlers};
use crate::events::{Event, StartComputationEvent};
use crate::messaging::{decode, encode, LogError, MessageLog, TopicConsumer, TopicProducer};
use crate::types::data_types::{PartitionId, Superstep};
use crate::types::graph::{EdgeWithValue, VertexEntry, WorkSetEntry};
use crate::types::pregel_state::{Lifecycle, Phase, PregelState};
use crate::worker::active_set::ActiveVertexSet;
use crate::worker::pipeline::TableViews;
use crate::worker::{Worker, WorkerSpec};

/// Enumerates the ways a computation can fail.
#[derive(Clone, Debug)]
pub enum PregelError {
    /// See: [`CoordinationError`]. Transient within a barrier tick; surfaced only when
    /// persistent.
    Coordination(CoordinationError),

    /// See: [`LogError`]. Fatal for the task that hits it.
    Log(LogError),

    /// The user compute function failed on a vertex. Never skipped over.
    UserCompute {
        superstep: Superstep,
        vertex: String,
        detail: String,
    },

    /// A protocol invariant did not hold. Always a bug; fail fast.
    InvariantViolation { detail: String },
}

impl PregelError {
    /// Whether this error must fail the task that observed it. Coordination errors are retried
    /// by subsequent ticks instead.
    pub(crate) fn is_fatal(&self) -> bool {
        !matches!(self, PregelError::Coordination(_))
    }
}

impl From<CoordinationError> for PregelError {
    fn from(value: CoordinationError) -> Self {
        PregelError::Coordination(value)
    }
}

impl From<LogError> for PregelError {
    fn from(value: LogError) -> Self {
        PregelError::Log(value)
    }
}

impl Display for PregelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PregelError::Coordination(err) => write!(f, "{}", err),
            PregelError::Log(err) => write!(f, "{}", err),
            PregelError::UserCompute {
                superstep,
                vertex,
                detail,
            } => write!(
                f,
                "compute function failed at superstep {} on vertex {}: {}",
                superstep, vertex, detail
            ),
            PregelError::InvariantViolation { detail } => {
                write!(f, "invariant violated: {}", detail)
            }
        }
    }
}

/// The process-wide completion flag: resolved exactly once, either by the barrier layer
/// observing the Completed lifecycle or by a task failing fatally.
pub(crate) struct CompletionState {
    result: Mutex<Option<Result<(), PregelError>>>,
    condvar: Condvar,
}

impl CompletionState {
    pub(crate) fn new() -> Self {
        Self {
            result: Mutex::new(None),
            condvar: Condvar::new(),
        }
    }

    /// Install `result` if nothing was installed yet. Returns `true` iff this call resolved the
    /// state.
    pub(crate) fn resolve(&self, result: Result<(), PregelError>) -> bool {
        let mut guard = self.result.lock().unwrap();
        if guard.is_none() {
            *guard = Some(result);
            self.condvar.notify_all();
            true
        } else {
            false
        }
    }

    fn wait(&self) -> Result<(), PregelError> {
        let mut guard = self.result.lock().unwrap();
        while guard.is_none() {
            guard = self.condvar.wait(guard).unwrap();
        }
        guard.clone().unwrap()
    }

    fn try_get(&self) -> Option<Result<(), PregelError>> {
        self.result.lock().unwrap().clone()
    }
}

/// A handle on the eventual outcome of the computation, as seen by this process.
///
/// Resolves with the final vertex-value table for the partitions this process owns, or with the
/// error that killed a local task.
pub struct ResultHandle<CF: ComputeFunction> {
    completion: Arc<CompletionState>,
    views: TableViews<CF>,
}

impl<CF: ComputeFunction> ResultHandle<CF> {
    /// Block until the computation completes or fails.
    pub fn wait(&self) -> Result<HashMap<CF::K, CF::VV>, PregelError> {
        self.completion.wait()?;
        Ok(snapshot_solution(&self.views))
    }

    /// The outcome so far, if there is one. Does not block.
    pub fn try_result(&self) -> Option<Result<HashMap<CF::K, CF::VV>, PregelError>> {
        self.completion
            .try_get()
            .map(|result| result.map(|()| snapshot_solution(&self.views)))
    }
}

fn snapshot_solution<CF: ComputeFunction>(views: &TableViews<CF>) -> HashMap<CF::K, CF::VV> {
    views
        .solution
        .iter()
        .filter_map(|entry| {
            entry
                .value()
                .cur_value
                .clone()
                .map(|value| (entry.key().clone(), value))
        })
        .collect()
}

/// One worker process's participation in a Pregel computation.
pub struct PregelComputation<CF: ComputeFunction, C: CoordinationStore, L: MessageLog> {
    config: Configuration,
    compute_fn: CF,
    initial_message: Option<CF::M>,
    coordination: C,
    message_log: L,

    max_iterations: Arc<AtomicI32>,
    completion: Arc<CompletionState>,
    views: TableViews<CF>,
    event_publisher: Option<Sender<Event>>,
    worker: Option<Worker>,
}

impl<CF: ComputeFunction, C: CoordinationStore, L: MessageLog> PregelComputation<CF, C, L> {
    /// Create a computation that has not been prepared yet. `initial_message` is the optional
    /// seed delivered to every vertex at superstep 0.
    pub fn new(
        config: Configuration,
        compute_fn: CF,
        initial_message: Option<CF::M>,
        coordination: C,
        message_log: L,
    ) -> Self {
        Self {
            config,
            compute_fn,
            initial_message,
            coordination,
            message_log,
            max_iterations: Arc::new(AtomicI32::new(i32::MAX)),
            completion: Arc::new(CompletionState::new()),
            views: TableViews::new(),
            event_publisher: None,
            worker: None,
        }
    }

    /// Seed the solution-set and work-set topics from the vertices topic and start this
    /// process's worker threads.
    ///
    /// For every vertex `(k, v)` currently in the vertices topic, this emits a solution-set
    /// entry `(-1, v, 0, v)` and a work-set entry `(0, k, initial_message)`, and ensures a
    /// `partition-<p>` marker exists at `(0, SND)` for the partition owning `k`, so superstep 0
    /// has something to drain. Other processes preparing concurrently write the same records.
    pub fn prepare(&mut self, user_handlers: UserEventHandlers) -> Result<(), PregelError> {
        if self.worker.is_some() {
            return Err(PregelError::InvariantViolation {
                detail: "prepare called twice on one PregelComputation".to_string(),
            });
        }

        self.coordination
            .set_operation_timeout(self.config.timing.coordination_timeout);

        let log_partitions = self
            .message_log
            .num_partitions(&self.config.topics.work_set)?;
        if log_partitions != self.config.worker.num_partitions {
            return Err(PregelError::InvariantViolation {
                detail: format!(
                    "configured for {} partitions but the work set topic has {}",
                    self.config.worker.num_partitions, log_partitions
                ),
            });
        }

        self.seed()?;

        let handlers = EventHandlers::new(self.config.log_events, user_handlers);
        let event_bus = if handlers.is_empty() {
            None
        } else {
            let (event_publisher, event_subscriber) = mpsc::channel();
            self.event_publisher = Some(event_publisher);
            Some((handlers, event_subscriber))
        };

        self.worker = Some(Worker::start(WorkerSpec {
            config: self.config.clone(),
            compute_fn: self.compute_fn.clone(),
            coordination: self.coordination.clone(),
            message_log: self.message_log.clone(),
            views: self.views.clone(),
            active: Arc::new(ActiveVertexSet::new()),
            completion: self.completion.clone(),
            max_iterations: self.max_iterations.clone(),
            event_publisher: self.event_publisher.clone(),
            event_bus,
        }));

        Ok(())
    }

    /// Start the computation, bounded at `max_iterations` supersteps.
    ///
    /// Publishes `(Running, 0, Receive)` into the shared value if the computation is still in
    /// its Created lifecycle; if another process already started it, the current shared state is
    /// returned unchanged. Every process must pass the same `max_iterations`.
    pub fn run(&mut self, max_iterations: i32) -> Result<PregelState, PregelError> {
        self.max_iterations.store(max_iterations, Ordering::SeqCst);

        let mut shared = SharedState::new(self.coordination.clone());
        let current = shared.read()?;
        if current.lifecycle() != Lifecycle::Created {
            return Ok(current);
        }

        let state = PregelState::new(Lifecycle::Running, Superstep::init(), Phase::Receive);
        shared.write(&state)?;
        Event::StartComputation(StartComputationEvent {
            timestamp: SystemTime::now(),
            max_iterations,
        })
        .publish(&self.event_publisher);
        Ok(state)
    }

    /// Read and decode the shared state.
    pub fn state(&self) -> Result<PregelState, PregelError> {
        Ok(SharedState::new(self.coordination.clone()).read()?)
    }

    /// The current vertex-value table for the partitions this process owns: each vertex's
    /// `cur_value` from the solution set.
    pub fn result(&self) -> HashMap<CF::K, CF::VV> {
        snapshot_solution(&self.views)
    }

    /// A handle resolving to [`result`](Self::result) once the computation completes.
    pub fn future_result(&self) -> ResultHandle<CF> {
        ResultHandle {
            completion: self.completion.clone(),
            views: self.views.clone(),
        }
    }

    /// Read-only view of the materialized vertex table.
    pub fn vertices(&self) -> HashMap<CF::K, CF::VV> {
        self.views
            .vertices
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Read-only view of the materialized edge table.
    pub fn edges_grouped_by_source(&self) -> HashMap<CF::K, Vec<EdgeWithValue<CF::K, CF::EV>>> {
        self.views
            .edges
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn seed(&mut self) -> Result<(), PregelError> {
        let topics = &self.config.topics;
        let mut producer = self.message_log.producer()?;
        let mut coordination = self.coordination.clone();
        let step_zero_send = BarrierPath::new(Superstep::init(), Phase::Send);

        for partition in 0..self.config.worker.num_partitions.int() {
            let mut consumer = self
                .message_log
                .consumer(&topics.vertices, PartitionId::new(partition))?;
            while !consumer.is_synced()? {
                for record in consumer.poll()? {
                    let key: CF::K = decode(&record.key, &topics.vertices)?;
                    let value: CF::VV = decode(&record.value, &topics.vertices)?;

                    let solution_entry = VertexEntry::seeded(Some(value));
                    producer.send(
                        &topics.solution_set,
                        &record.key,
                        &encode(&solution_entry, &topics.solution_set)?,
                    )?;

                    let work_entry = WorkSetEntry::new(
                        Superstep::init(),
                        key,
                        self.initial_message.clone(),
                    );
                    let seeded_partition = producer.send(
                        &topics.work_set,
                        &record.key,
                        &encode(&work_entry, &topics.work_set)?,
                    )?;
                    coordination.add_barrier_child(
                        &step_zero_send,
                        &BarrierChild::Partition(seeded_partition),
                        CreateMode::Persistent,
                    )?;
                }
            }
        }

        producer.flush()?;
        Ok(())
    }
}
