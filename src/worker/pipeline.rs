/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The per-partition compute pipeline: buffering incoming messages, joining them with edges, and
//! running the user compute function.
//!
//! Main type: [`ComputePipeline`].
//!
//! One pipeline exists per worker task and is only ever touched from that task's thread. The
//! vertex, edge and solution views it writes into are shared with the driver, but the topics
//! behind them are partitioned by the same router as the work set, so each pipeline owns a
//! disjoint slice of the key space.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;

use crate::compute::{ComputeCallback, ComputeFunction};
use crate::computation::PregelError;
use crate::coordination::store::CoordinationStore;
use crate::events::{
    ActivatePartitionEvent, ComputeVertexEvent, Event, ForwardVertexEvent, GarbageCollectEvent,
};
use crate::messaging::{LogError, TopicProducer};
use crate::partitioner::vertex_to_partition;
use crate::types::data_types::{NumPartitions, Superstep};
use crate::types::graph::{EdgeWithValue, VertexEntry, VertexWithValue, WorkSetEntry};
use crate::worker::active_set::ActiveVertexSet;
use crate::worker::dispatcher::MessageDispatcher;

/// Read-only views of the materialized tables, shared with the driver façade.
pub(crate) struct TableViews<CF: ComputeFunction> {
    pub(crate) vertices: Arc<DashMap<CF::K, CF::VV>>,
    pub(crate) edges: Arc<DashMap<CF::K, Vec<EdgeWithValue<CF::K, CF::EV>>>>,
    pub(crate) solution: Arc<DashMap<CF::K, VertexEntry<CF::VV>>>,
}

impl<CF: ComputeFunction> TableViews<CF> {
    pub(crate) fn new() -> Self {
        Self {
            vertices: Arc::new(DashMap::new()),
            edges: Arc::new(DashMap::new()),
            solution: Arc::new(DashMap::new()),
        }
    }
}

impl<CF: ComputeFunction> Clone for TableViews<CF> {
    fn clone(&self) -> Self {
        Self {
            vertices: self.vertices.clone(),
            edges: self.edges.clone(),
            solution: self.solution.clone(),
        }
    }
}

pub(crate) struct ComputePipeline<CF: ComputeFunction> {
    compute_fn: CF,
    num_partitions: NumPartitions,
    work_set_topic: String,

    /// `superstep -> dst -> src -> message`. Only the current and previous superstep are
    /// retained; [`collect_garbage`](Self::collect_garbage) deletes older entries.
    inbox: BTreeMap<Superstep, HashMap<CF::K, HashMap<CF::K, CF::M>>>,
    /// The vertices already handed to compute per superstep. A late-arriving message removes its
    /// destination from here, which re-forwards the vertex on the next SEND tick.
    forwarded: BTreeMap<Superstep, HashSet<CF::K>>,
    /// Local solution-set store, written by compute ahead of the solution-set topic.
    solution: HashMap<CF::K, VertexEntry<CF::VV>>,

    views: TableViews<CF>,
    active: Arc<ActiveVertexSet<CF::K>>,
    event_publisher: Option<Sender<Event>>,
}

impl<CF: ComputeFunction> ComputePipeline<CF> {
    pub(crate) fn new(
        compute_fn: CF,
        num_partitions: NumPartitions,
        work_set_topic: String,
        views: TableViews<CF>,
        active: Arc<ActiveVertexSet<CF::K>>,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        Self {
            compute_fn,
            num_partitions,
            work_set_topic,
            inbox: BTreeMap::new(),
            forwarded: BTreeMap::new(),
            solution: HashMap::new(),
            views,
            active,
            event_publisher,
        }
    }

    /// Materialize a record of the compacted vertices topic.
    pub(crate) fn upsert_vertex(&mut self, key: CF::K, value: CF::VV) {
        self.views.vertices.insert(key, value);
    }

    /// Materialize a record of the compacted edges topic.
    pub(crate) fn upsert_edges(&mut self, key: CF::K, edges: Vec<EdgeWithValue<CF::K, CF::EV>>) {
        self.views.edges.insert(key, edges);
    }

    /// Materialize a record of the solution-set topic into the shared view.
    pub(crate) fn apply_solution_delta(&mut self, key: CF::K, entry: VertexEntry<CF::VV>) {
        self.views.solution.insert(key, entry);
    }

    /// Buffer one work-set entry addressed to `dst`.
    ///
    /// Messages from the same source to the same destination in the same superstep overwrite
    /// each other. A `None` message (the step-0 seed) creates the destination's inbox slot
    /// without putting anything in it, so the vertex still gets forwarded.
    ///
    /// Returns `true` iff `dst` had already been forwarded for this superstep: the forward is
    /// then invalidated and the caller must withdraw any SEND-completion attestation it made.
    pub(crate) fn buffer(&mut self, dst: CF::K, entry: WorkSetEntry<CF::K, CF::M>) -> bool {
        let slot = self
            .inbox
            .entry(entry.superstep)
            .or_default()
            .entry(dst.clone())
            .or_default();
        if let Some(message) = entry.message {
            slot.insert(entry.src, message);
        }

        match self.forwarded.get_mut(&entry.superstep) {
            Some(forwarded) => forwarded.remove(&dst),
            None => false,
        }
    }

    /// Whether `superstep` has buffered vertices that were not yet forwarded.
    pub(crate) fn has_unforwarded(&self, superstep: Superstep) -> bool {
        let forwarded = self.forwarded.get(&superstep);
        self.inbox
            .get(&superstep)
            .map(|per_dst| {
                per_dst
                    .keys()
                    .any(|dst| forwarded.map_or(true, |f| !f.contains(dst)))
            })
            .unwrap_or(false)
    }

    /// Forward every not-yet-forwarded vertex of `superstep` into compute, and dispatch what
    /// compute produces. Vertices are first all marked forwarded and activated, then computed;
    /// re-invocations triggered by late messages interleave cleanly with this order.
    pub(crate) fn forward_pending<P: TopicProducer, C: CoordinationStore>(
        &mut self,
        superstep: Superstep,
        dispatcher: &mut MessageDispatcher<CF, P, C>,
    ) -> Result<usize, PregelError> {
        let pending: Vec<CF::K> = {
            let forwarded = self.forwarded.get(&superstep);
            match self.inbox.get(&superstep) {
                Some(per_dst) => per_dst
                    .keys()
                    .filter(|dst| forwarded.map_or(true, |f| !f.contains(*dst)))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            }
        };

        for dst in &pending {
            self.forwarded
                .entry(superstep)
                .or_default()
                .insert(dst.clone());
            let partition =
                vertex_to_partition(dst, self.num_partitions).map_err(|err| LogError::Codec {
                    topic: self.work_set_topic.clone(),
                    detail: err.to_string(),
                })?;
            if self.active.activate(superstep, partition, dst.clone()) {
                Event::ActivatePartition(ActivatePartitionEvent {
                    timestamp: SystemTime::now(),
                    partition,
                    superstep,
                })
                .publish(&self.event_publisher);
            }

            let message_count = self
                .inbox
                .get(&superstep)
                .and_then(|per_dst| per_dst.get(dst))
                .map(|messages| messages.len())
                .unwrap_or(0);
            Event::ForwardVertex(ForwardVertexEvent {
                timestamp: SystemTime::now(),
                vertex: format!("{:?}", dst),
                superstep,
                message_count,
            })
            .publish(&self.event_publisher);
        }

        for dst in &pending {
            self.compute_vertex(superstep, dst, dispatcher)?;
        }

        Ok(pending.len())
    }

    /// Run the user compute function for one forwarded vertex, persist and publish its solution
    /// delta, and dispatch its outgoing messages.
    fn compute_vertex<P: TopicProducer, C: CoordinationStore>(
        &mut self,
        superstep: Superstep,
        dst: &CF::K,
        dispatcher: &mut MessageDispatcher<CF, P, C>,
    ) -> Result<(), PregelError> {
        let messages = self
            .inbox
            .get(&superstep)
            .and_then(|per_dst| per_dst.get(dst))
            .cloned()
            .unwrap_or_default();
        let edges = self
            .views
            .edges
            .get(dst)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();

        let entry = match self.solution.get(dst) {
            Some(entry) => entry.clone(),
            None => {
                let value = self.views.vertices.get(dst).map(|v| v.value().clone());
                if value.is_none() {
                    log::warn!("No vertex value for {:?}", dst);
                }
                VertexEntry::seeded(value)
            }
        };

        // Find the value that applies to this superstep.
        let applicable = entry.value_at(superstep);
        let vertex = VertexWithValue::new(dst.clone(), applicable.clone());

        let mut callback = ComputeCallback::new();
        self.compute_fn
            .compute(superstep, &vertex, &messages, &edges, &mut callback)
            .map_err(|err| PregelError::UserCompute {
                superstep,
                vertex: format!("{:?}", dst),
                detail: err.detail,
            })?;
        let (new_value, outgoing) = callback.into_outputs();

        let updated_value = new_value.is_some();
        if let Some(new_value) = new_value {
            let new_entry = VertexEntry {
                prev_step: superstep,
                prev_value: applicable,
                cur_step: superstep + 1,
                cur_value: Some(new_value),
            };
            self.solution.insert(dst.clone(), new_entry.clone());
            dispatcher.publish_solution_delta(dst, &new_entry)?;
        }

        Event::ComputeVertex(ComputeVertexEvent {
            timestamp: SystemTime::now(),
            vertex: format!("{:?}", dst),
            superstep,
            updated_value,
            outgoing_count: outgoing.len(),
        })
        .publish(&self.event_publisher);

        dispatcher.dispatch(superstep, dst, &outgoing)
    }

    /// Delete the inbox and forwarded set of every superstep before `current`, and the active
    /// set of the previous superstep. Entering SEND of `current` means every older superstep
    /// finished globally, so their buffers cannot be read again; an entry older than the
    /// previous superstep can only exist through duplicated seeds.
    pub(crate) fn collect_garbage(&mut self, current: Superstep) {
        let retained = self.inbox.split_off(&current);
        let removed_inbox = !self.inbox.is_empty();
        self.inbox = retained;

        let retained = self.forwarded.split_off(&current);
        let removed_forwarded = !self.forwarded.is_empty();
        self.forwarded = retained;

        let removed_active = self.active.discard_step(current - 1);

        if removed_inbox || removed_forwarded || removed_active {
            Event::GarbageCollect(GarbageCollectEvent {
                timestamp: SystemTime::now(),
                superstep: current - 1,
            })
            .publish(&self.event_publisher);
        }
    }

    #[cfg(test)]
    fn inbox_messages(&self, superstep: Superstep, dst: &CF::K) -> Option<HashMap<CF::K, CF::M>> {
        self.inbox
            .get(&superstep)
            .and_then(|per_dst| per_dst.get(dst))
            .cloned()
    }
}
