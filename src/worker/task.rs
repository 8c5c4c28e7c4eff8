/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The single-threaded execute loop of one worker task.
//!
//! A task owns one partition of every topic, the pipeline state for that partition, a producer,
//! and a clone of the coordination session. Its loop alternates between draining the consumers
//! into the pipeline and running the barrier tick; nothing a task mutates is touched by any
//! other thread except the coordination store, the active-set registry and the shared table
//! views.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::compute::ComputeFunction;
use crate::computation::{CompletionState, PregelError};
use crate::config::{TimingConfig, TopicNames};
use crate::coordination::store::CoordinationStore;
use crate::events::Event;
use crate::messaging::{decode, MessageLog, TopicConsumer};
use crate::types::data_types::{NumPartitions, PartitionId, WorkerName};
use crate::types::graph::{EdgeWithValue, VertexEntry, WorkSetEntry};
use crate::worker::active_set::ActiveVertexSet;
use crate::worker::barrier::{BarrierConfig, BarrierSync};
use crate::worker::dispatcher::MessageDispatcher;
use crate::worker::pipeline::{ComputePipeline, TableViews};

/// How long the loop sleeps when it has nothing else to do.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// How many consecutive failed barrier ticks are tolerated before a coordination outage is
/// declared persistent and the task fails. At the default tick interval this is ten seconds.
const MAX_CONSECUTIVE_TICK_FAILURES: u32 = 40;

/// The four consumers a task owns, one per topic, all over the task's partition.
pub(crate) struct TopicConsumers<T: TopicConsumer> {
    pub(crate) vertices: T,
    pub(crate) edges: T,
    pub(crate) solution_set: T,
    pub(crate) work_set: T,
}

/// Everything a task needs to run, handed over by [`Worker`](crate::worker::Worker).
pub(crate) struct TaskSpec<CF: ComputeFunction, C: CoordinationStore, L: MessageLog> {
    pub(crate) partition: PartitionId,
    pub(crate) host_and_port: String,
    pub(crate) topics: TopicNames,
    pub(crate) num_partitions: NumPartitions,
    pub(crate) timing: TimingConfig,
    pub(crate) compute_fn: CF,
    pub(crate) coordination: C,
    pub(crate) message_log: L,
    pub(crate) views: TableViews<CF>,
    pub(crate) active: Arc<ActiveVertexSet<CF::K>>,
    pub(crate) completion: Arc<CompletionState>,
    pub(crate) max_iterations: Arc<AtomicI32>,
    pub(crate) event_publisher: Option<Sender<Event>>,
}

/// Spawn one worker task thread.
pub(crate) fn start_task<CF: ComputeFunction, C: CoordinationStore, L: MessageLog>(
    spec: TaskSpec<CF, C, L>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let worker_name = WorkerName::new(&spec.host_and_port, spec.partition);
        let completion = spec.completion.clone();
        if let Err(err) = run_task(spec, shutdown_signal, &worker_name) {
            log::error!("Worker task {} failed: {}", worker_name, err);
            completion.resolve(Err(err));
        }
    })
}

fn run_task<CF: ComputeFunction, C: CoordinationStore, L: MessageLog>(
    spec: TaskSpec<CF, C, L>,
    shutdown_signal: Receiver<()>,
    worker_name: &WorkerName,
) -> Result<(), PregelError> {
    log::debug!("Registering worker {}", worker_name);
    let mut coordination = spec.coordination;
    coordination.set_operation_timeout(spec.timing.coordination_timeout);
    coordination.join_group(worker_name)?;

    let mut consumers = TopicConsumers {
        vertices: spec
            .message_log
            .consumer(&spec.topics.vertices, spec.partition)?,
        edges: spec
            .message_log
            .consumer(&spec.topics.edges_grouped_by_source, spec.partition)?,
        solution_set: spec
            .message_log
            .consumer(&spec.topics.solution_set, spec.partition)?,
        work_set: spec
            .message_log
            .consumer(&spec.topics.work_set, spec.partition)?,
    };

    let mut pipeline = ComputePipeline::new(
        spec.compute_fn,
        spec.num_partitions,
        spec.topics.work_set.clone(),
        spec.views,
        spec.active.clone(),
        spec.event_publisher.clone(),
    );
    let mut dispatcher: MessageDispatcher<CF, L::Producer, C> = MessageDispatcher::new(
        spec.topics.clone(),
        spec.num_partitions,
        spec.message_log.producer()?,
        coordination.clone(),
        spec.active,
        spec.event_publisher.clone(),
    );
    let mut barrier = BarrierSync::new(
        BarrierConfig {
            worker_name: worker_name.clone(),
            max_iterations: spec.max_iterations.clone(),
        },
        coordination.clone(),
        spec.completion,
        spec.event_publisher,
    );

    let mut last_tick = Instant::now()
        .checked_sub(spec.timing.barrier_tick_interval)
        .unwrap_or_else(Instant::now);
    let mut consecutive_tick_failures: u32 = 0;

    loop {
        match shutdown_signal.try_recv() {
            Ok(()) => break,
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("Worker task thread disconnected from main thread")
            }
        }

        drain(
            &mut consumers,
            &mut pipeline,
            &mut barrier,
            &spec.topics,
            &spec.max_iterations,
        )?;

        if last_tick.elapsed() >= spec.timing.barrier_tick_interval {
            last_tick = Instant::now();
            match barrier.tick(&mut pipeline, &mut dispatcher, &mut consumers) {
                Ok(()) => consecutive_tick_failures = 0,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    consecutive_tick_failures += 1;
                    log::warn!(
                        "Barrier tick of {} failed ({} in a row): {}",
                        worker_name,
                        consecutive_tick_failures,
                        err
                    );
                    if consecutive_tick_failures >= MAX_CONSECUTIVE_TICK_FAILURES {
                        return Err(err);
                    }
                }
            }
        }

        thread::sleep(POLL_INTERVAL);
    }

    let _ = coordination.leave_group();
    Ok(())
}

/// Move everything the consumers have into the pipeline's stores.
fn drain<CF: ComputeFunction, C: CoordinationStore, T: TopicConsumer>(
    consumers: &mut TopicConsumers<T>,
    pipeline: &mut ComputePipeline<CF>,
    barrier: &mut BarrierSync<C>,
    topics: &TopicNames,
    max_iterations: &AtomicI32,
) -> Result<(), PregelError> {
    for record in consumers.vertices.poll()? {
        let key: CF::K = decode(&record.key, &topics.vertices)?;
        let value: CF::VV = decode(&record.value, &topics.vertices)?;
        pipeline.upsert_vertex(key, value);
    }

    for record in consumers.edges.poll()? {
        let key: CF::K = decode(&record.key, &topics.edges_grouped_by_source)?;
        let edges: Vec<EdgeWithValue<CF::K, CF::EV>> =
            decode(&record.value, &topics.edges_grouped_by_source)?;
        pipeline.upsert_edges(key, edges);
    }

    for record in consumers.solution_set.poll()? {
        let key: CF::K = decode(&record.key, &topics.solution_set)?;
        let entry: VertexEntry<CF::VV> = decode(&record.value, &topics.solution_set)?;
        pipeline.apply_solution_delta(key, entry);
    }

    for record in consumers.work_set.poll()? {
        let dst: CF::K = decode(&record.key, &topics.work_set)?;
        let entry: WorkSetEntry<CF::K, CF::M> = decode(&record.value, &topics.work_set)?;

        // Entries beyond the iteration bound are dropped before they reach the inbox.
        if entry.superstep.int() > max_iterations.load(Ordering::SeqCst) {
            log::trace!("Dropping work set entry beyond the iteration bound: {:?}", dst);
            continue;
        }

        let superstep = entry.superstep;
        let invalidated = pipeline.buffer(dst, entry);
        if invalidated {
            // The vertex will be re-forwarded; the leader must wait for it.
            if let Err(err) = barrier.withdraw_send_attestation(superstep) {
                log::warn!("Could not withdraw send attestation: {}", err);
            }
        }
    }

    Ok(())
}
