/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The per-task barrier synchronizer: the periodic tick that moves a computation through its
//! supersteps.
//!
//! Main type: [`BarrierSync`].
//!
//! Every worker task ticks its `BarrierSync` on a wall-clock interval. A tick reads the shared
//! [`PregelState`], performs leader-only advancement if this session holds leadership, and then
//! does the phase work every worker owes: attesting readiness in RECEIVE, forwarding buffered
//! vertices into compute in SEND, and garbage-collecting the superstep that SEND left behind.
//! The tick never blocks inside the compute pipeline; forwarding runs inline on the task thread.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::SystemTime;

use crate::compute::ComputeFunction;
use crate::computation::{CompletionState, PregelError};
use crate::coordination::paths::{BarrierChild, BarrierPath};
use crate::coordination::store::{CoordinationStore, CreateMode, SharedState};
use crate::events::{
    AdvanceStateEvent, CompleteComputationEvent, Event, SignalReceiveReadyEvent,
    SignalSendCompleteEvent,
};
use crate::messaging::{TopicConsumer, TopicProducer};
use crate::types::data_types::{Superstep, WorkerName};
use crate::types::pregel_state::{Lifecycle, Phase, PregelState};
use crate::worker::dispatcher::MessageDispatcher;
use crate::worker::pipeline::ComputePipeline;
use crate::worker::task::TopicConsumers;

/// Configuration variables for the [`BarrierSync`] struct.
pub(crate) struct BarrierConfig {
    /// The name under which this task attests readiness.
    pub(crate) worker_name: WorkerName,

    /// The iteration bound set by `run`. Shared with the driver because `run` may be called
    /// after the worker tasks have started ticking.
    pub(crate) max_iterations: Arc<AtomicI32>,
}

/// A single participant in the barrier protocol.
pub(crate) struct BarrierSync<C: CoordinationStore> {
    config: BarrierConfig,
    coordination: C,
    shared: SharedState<C>,
    completion: Arc<CompletionState>,
    event_publisher: Option<Sender<Event>>,
}

impl<C: CoordinationStore> BarrierSync<C> {
    pub(crate) fn new(
        config: BarrierConfig,
        coordination: C,
        completion: Arc<CompletionState>,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        let shared = SharedState::new(coordination.clone());
        Self {
            config,
            coordination,
            shared,
            completion,
            event_publisher,
        }
    }

    /// Run one barrier tick.
    pub(crate) fn tick<CF: ComputeFunction, P: TopicProducer, T: TopicConsumer>(
        &mut self,
        pipeline: &mut ComputePipeline<CF>,
        dispatcher: &mut MessageDispatcher<CF, P, C>,
        consumers: &mut TopicConsumers<T>,
    ) -> Result<(), PregelError> {
        // 1. Read the shared state. Nothing to do before the driver starts the computation;
        //    after it completes, resolve the local completion handle (once) and idle.
        let mut state = self.shared.read()?;
        match state.lifecycle() {
            Lifecycle::Created => return Ok(()),
            Lifecycle::Completed => {
                self.resolve_completed(&state);
                return Ok(());
            }
            Lifecycle::Running => (),
        }

        // 2. Leader-only advancement. The tick continues with the possibly-advanced state, so a
        //    leader starts its own phase work in the phase it just opened.
        if self.coordination.has_leadership()? {
            state = self.advance_if_ready(state)?;
            if state.lifecycle() == Lifecycle::Completed {
                self.resolve_completed(&state);
                return Ok(());
            }
        }

        // 3. Phase work owed by every worker.
        match state.phase() {
            Phase::Receive => self.receive_phase(&state, consumers),
            Phase::Send => self.send_phase(&state, pipeline, dispatcher, consumers),
        }
    }

    /// A late-arriving message invalidated an already-forwarded vertex of `superstep`. Withdraw
    /// this task's SEND-completion attestation so the leader waits for the re-forward.
    pub(crate) fn withdraw_send_attestation(
        &mut self,
        superstep: Superstep,
    ) -> Result<(), PregelError> {
        self.coordination.remove_barrier_child(
            &BarrierPath::new(superstep, Phase::Send),
            &BarrierChild::Worker(self.config.worker_name.clone()),
        )?;
        Ok(())
    }

    /// Advance the shared state if the barrier tree says the current phase is finished.
    /// Only called while holding leadership.
    ///
    /// Every task of the leading process holds leadership (the latch is per session), so two
    /// tasks may attempt the same advancement concurrently. Both write the same successor:
    /// advancing *past* a stale write would require a SEND attestation the stale task has not
    /// made yet, so the shared state cannot regress.
    fn advance_if_ready(&mut self, state: PregelState) -> Result<PregelState, PregelError> {
        let group_size = self.coordination.group_size()?;
        if group_size == 0 {
            return Ok(state);
        }

        match state.phase() {
            // 2.1. RECEIVE ends when every group member has attested readiness. If at that point
            //      no partition has messages in flight for this superstep, no message for it was
            //      ever produced: the computation has converged and completes here. Otherwise
            //      move to SEND.
            Phase::Receive => {
                let ready = self.count_children(&BarrierPath::of(&state), BarrierChild::is_worker)?;
                if ready < group_size {
                    log::debug!("Not ready to advance to snd: state {}", state);
                    return Ok(state);
                }

                let in_flight = self.count_children(
                    &BarrierPath::new(state.superstep(), Phase::Send),
                    BarrierChild::is_partition,
                )?;
                if in_flight == 0 {
                    let done = state.complete();
                    self.shared.write(&done)?;
                    return Ok(done);
                }

                self.write_advanced(state.next())
            }

            // 2.2. SEND ends when no partition markers remain (every in-flight message has been
            //      forwarded, computed and re-dispatched) and every group member has attested
            //      completion. The iteration bound is applied to the superstep being entered;
            //      barrier subtrees of finished supersteps are pruned defensively.
            Phase::Send => {
                let children = self.coordination.barrier_children(&BarrierPath::of(&state))?;
                let in_flight = children.iter().filter(|c| c.is_partition()).count();
                let workers_done = children.iter().filter(|c| c.is_worker()).count();
                if in_flight > 0 || workers_done < group_size {
                    log::debug!("Not ready to advance to rcv: state {}", state);
                    return Ok(state);
                }

                let next = state.next();
                if next.superstep().int() > self.config.max_iterations.load(Ordering::SeqCst) {
                    let done = next.complete();
                    self.shared.write(&done)?;
                    return Ok(done);
                }

                let next = self.write_advanced(next)?;
                self.coordination.prune_barriers(state.superstep())?;
                Ok(next)
            }
        }
    }

    fn write_advanced(&mut self, next: PregelState) -> Result<PregelState, PregelError> {
        self.shared.write(&next)?;
        Event::AdvanceState(AdvanceStateEvent {
            timestamp: SystemTime::now(),
            state: next,
        })
        .publish(&self.event_publisher);
        Ok(next)
    }

    /// RECEIVE-phase work: attest readiness once this task's consumers are synced.
    ///
    /// At superstep 0 readiness means the vertex and edge tables are fully materialized; the
    /// work-set and solution-set consumers stay paused until then so table loading is not
    /// starved, and are rewound and resumed the moment readiness is attested. At later
    /// supersteps readiness means the work-set topic is locally synced, i.e. every message
    /// produced for this superstep has been buffered.
    fn receive_phase<T: TopicConsumer>(
        &mut self,
        state: &PregelState,
        consumers: &mut TopicConsumers<T>,
    ) -> Result<(), PregelError> {
        let barrier = BarrierPath::of(state);
        let me = BarrierChild::Worker(self.config.worker_name.clone());
        if self.coordination.has_barrier_child(&barrier, &me)? {
            return Ok(());
        }

        if state.superstep() == Superstep::init() {
            if consumers.vertices.is_synced()? && consumers.edges.is_synced()? {
                self.attest(state, &barrier, &me)?;
                // Vertices and edges are in the tables; start over on the streams that were
                // held back.
                consumers.work_set.seek_to_beginning();
                consumers.work_set.resume();
                consumers.solution_set.seek_to_beginning();
                consumers.solution_set.resume();
            } else {
                consumers.work_set.pause();
                consumers.solution_set.pause();
            }
        } else if consumers.work_set.is_synced()? {
            self.attest(state, &barrier, &me)?;
        }

        Ok(())
    }

    /// SEND-phase work: forward buffered vertices into compute once the work-set topic is
    /// synced, attest completion when nothing is left to forward, and drop the previous
    /// superstep's state.
    fn send_phase<CF: ComputeFunction, P: TopicProducer, T: TopicConsumer>(
        &mut self,
        state: &PregelState,
        pipeline: &mut ComputePipeline<CF>,
        dispatcher: &mut MessageDispatcher<CF, P, C>,
        consumers: &mut TopicConsumers<T>,
    ) -> Result<(), PregelError> {
        let superstep = state.superstep();

        // The sync check ensures every message produced in the previous phase has been
        // buffered. Newer messages may slip in as well; buffering them now is harmless.
        if consumers.work_set.is_synced()? {
            if pipeline.has_unforwarded(superstep) {
                pipeline.forward_pending(superstep, dispatcher)?;
            }

            let barrier = BarrierPath::of(state);
            let me = BarrierChild::Worker(self.config.worker_name.clone());
            if !pipeline.has_unforwarded(superstep)
                && !self.coordination.has_barrier_child(&barrier, &me)?
            {
                self.attest(state, &barrier, &me)?;
            }
        }

        // Clean up the previous superstep.
        pipeline.collect_garbage(superstep);
        Ok(())
    }

    fn attest(
        &mut self,
        state: &PregelState,
        barrier: &BarrierPath,
        me: &BarrierChild,
    ) -> Result<(), PregelError> {
        self.coordination
            .add_barrier_child(barrier, me, CreateMode::Ephemeral)?;
        match state.phase() {
            Phase::Receive => Event::SignalReceiveReady(SignalReceiveReadyEvent {
                timestamp: SystemTime::now(),
                worker: self.config.worker_name.clone(),
                superstep: state.superstep(),
            })
            .publish(&self.event_publisher),
            Phase::Send => Event::SignalSendComplete(SignalSendCompleteEvent {
                timestamp: SystemTime::now(),
                worker: self.config.worker_name.clone(),
                superstep: state.superstep(),
            })
            .publish(&self.event_publisher),
        }
        Ok(())
    }

    fn count_children(
        &self,
        barrier: &BarrierPath,
        predicate: fn(&BarrierChild) -> bool,
    ) -> Result<usize, PregelError> {
        Ok(self
            .coordination
            .barrier_children(barrier)?
            .iter()
            .filter(|child| predicate(child))
            .count())
    }

    /// Resolve the process-wide completion handle, once, with the final state.
    fn resolve_completed(&mut self, state: &PregelState) {
        if self.completion.resolve(Ok(())) {
            let max_iterations = self.config.max_iterations.load(Ordering::SeqCst);
            let converged = state.superstep().int() <= max_iterations;
            if converged {
                log::info!(
                    "Pregel computation converged after {} supersteps",
                    state.superstep()
                );
            } else {
                log::info!(
                    "Pregel computation halted after {} supersteps",
                    max_iterations
                );
            }
            Event::CompleteComputation(CompleteComputationEvent {
                timestamp: SystemTime::now(),
                state: *state,
                converged,
            })
            .publish(&self.event_publisher);
        }
    }
}
