/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The threads that keep a worker process alive: one task per assigned partition plus the event
//! bus, and [the type](Worker) that owns them.
//!
//! A *worker* is one process participating in a computation. Within a worker there is one
//! single-threaded task per assigned topic partition; tasks share nothing mutable except the
//! coordination session, the [active-set registry](active_set) and the materialized table
//! views. Workers may crash and drop out of the group mid-computation; new workers cannot join a
//! running computation (restart to grow the group).

pub(crate) mod active_set;

pub(crate) mod barrier;

pub(crate) mod dispatcher;

pub(crate) mod pipeline;

pub(crate) mod task;

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::compute::ComputeFunction;
use crate::computation::CompletionState;
use crate::config::Configuration;
use crate::coordination::store::CoordinationStore;
use crate::event_bus::{start_event_bus, EventHandlers};
use crate::events::Event;
use crate::messaging::MessageLog;
use crate::worker::active_set::ActiveVertexSet;
use crate::worker::pipeline::TableViews;
use crate::worker::task::{start_task, TaskSpec};

use std::sync::atomic::AtomicI32;

/// Everything [`Worker::start`] needs, bundled by the
/// [driver façade](crate::computation::PregelComputation).
pub(crate) struct WorkerSpec<CF: ComputeFunction, C: CoordinationStore, L: MessageLog> {
    pub(crate) config: Configuration,
    pub(crate) compute_fn: CF,
    pub(crate) coordination: C,
    pub(crate) message_log: L,
    pub(crate) views: TableViews<CF>,
    pub(crate) active: Arc<ActiveVertexSet<CF::K>>,
    pub(crate) completion: Arc<CompletionState>,
    pub(crate) max_iterations: Arc<AtomicI32>,
    pub(crate) event_publisher: Option<Sender<Event>>,
    pub(crate) event_bus: Option<(EventHandlers, Receiver<Event>)>,
}

/// The running threads of one worker process. Dropping a `Worker` shuts its threads down in
/// order: tasks first (they publish events), the event bus last.
pub struct Worker {
    tasks: Vec<TaskHandle>,
    event_bus: Option<TaskHandle>,
}

struct TaskHandle {
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub(crate) fn start<CF: ComputeFunction, C: CoordinationStore, L: MessageLog>(
        spec: WorkerSpec<CF, C, L>,
    ) -> Worker {
        let event_bus = spec.event_bus.map(|(handlers, subscriber)| {
            let (shutdown, shutdown_receiver) = mpsc::channel();
            TaskHandle {
                shutdown,
                thread: Some(start_event_bus(handlers, subscriber, shutdown_receiver)),
            }
        });

        let tasks = spec
            .config
            .worker
            .assigned_partitions
            .iter()
            .map(|partition| {
                let (shutdown, shutdown_receiver) = mpsc::channel();
                let task_spec = TaskSpec {
                    partition: *partition,
                    host_and_port: spec.config.worker.host_and_port.clone(),
                    topics: spec.config.topics.clone(),
                    num_partitions: spec.config.worker.num_partitions,
                    timing: spec.config.timing.clone(),
                    compute_fn: spec.compute_fn.clone(),
                    coordination: spec.coordination.clone(),
                    message_log: spec.message_log.clone(),
                    views: spec.views.clone(),
                    active: spec.active.clone(),
                    completion: spec.completion.clone(),
                    max_iterations: spec.max_iterations.clone(),
                    event_publisher: spec.event_publisher.clone(),
                };
                TaskHandle {
                    shutdown,
                    thread: Some(start_task(task_spec, shutdown_receiver)),
                }
            })
            .collect();

        Worker { tasks, event_bus }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        // Safety: tasks publish into the event bus, so they are stopped before it. A send can
        // fail only if the receiving thread already exited on a fatal error, which is fine; a
        // panicked thread is re-raised by the join.
        for task in &mut self.tasks {
            let _ = task.shutdown.send(());
        }
        for task in &mut self.tasks {
            task.thread.take().unwrap().join().unwrap();
        }

        if let Some(event_bus) = &mut self.event_bus {
            let _ = event_bus.shutdown.send(());
            event_bus.thread.take().unwrap().join().unwrap();
        }
    }
}
