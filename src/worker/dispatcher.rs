/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Publication of pipeline outputs back into the log: solution-set deltas and next-superstep
//! messages.
//!
//! Main type: [`MessageDispatcher`].
//!
//! The dispatcher maintains the contract between the log and the barrier tree: a partition's
//! `partition-<p>` marker exists at `(s, SND)` iff messages for that partition at superstep `s`
//! have been durably written and not yet fully processed. Markers are added on producer
//! acknowledgement and removed when the active set of a partition drains, and the producer is
//! flushed in between, so marker state never runs ahead of durable log state.

use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::SystemTime;

use indexmap::IndexMap;

use crate::compute::ComputeFunction;
use crate::computation::PregelError;
use crate::config::TopicNames;
use crate::coordination::paths::{BarrierChild, BarrierPath};
use crate::coordination::store::{CoordinationStore, CreateMode};
use crate::events::{DispatchMessagesEvent, DrainPartitionEvent, Event};
use crate::messaging::{encode, LogError, TopicProducer};
use crate::partitioner::vertex_to_partition;
use crate::types::data_types::{NumPartitions, Superstep};
use crate::types::graph::{VertexEntry, WorkSetEntry};
use crate::types::pregel_state::Phase;
use crate::worker::active_set::ActiveVertexSet;

pub(crate) struct MessageDispatcher<CF: ComputeFunction, P: TopicProducer, C: CoordinationStore> {
    topics: TopicNames,
    num_partitions: NumPartitions,
    producer: P,
    coordination: C,
    active: Arc<ActiveVertexSet<CF::K>>,
    event_publisher: Option<Sender<Event>>,
}

impl<CF: ComputeFunction, P: TopicProducer, C: CoordinationStore> MessageDispatcher<CF, P, C> {
    pub(crate) fn new(
        topics: TopicNames,
        num_partitions: NumPartitions,
        producer: P,
        coordination: C,
        active: Arc<ActiveVertexSet<CF::K>>,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        Self {
            topics,
            num_partitions,
            producer,
            coordination,
            active,
            event_publisher,
        }
    }

    /// Append a solution-set delta for `key` to the solution-set topic. Durability is settled by
    /// the flush inside the [`dispatch`](Self::dispatch) that always follows a compute.
    pub(crate) fn publish_solution_delta(
        &mut self,
        key: &CF::K,
        entry: &VertexEntry<CF::VV>,
    ) -> Result<(), PregelError> {
        let key_bytes = encode(key, &self.topics.solution_set)?;
        let value_bytes = encode(entry, &self.topics.solution_set)?;
        self.producer
            .send(&self.topics.solution_set, &key_bytes, &value_bytes)?;
        Ok(())
    }

    /// Publish every outgoing message a vertex produced at `computed_step`, tagged for delivery
    /// at `computed_step + 1`, then deactivate the vertex.
    ///
    /// In order:
    /// 1. Each message is appended to the work-set topic keyed by its destination; each
    ///    acknowledgement adds the destination partition's in-flight marker at
    ///    `(computed_step + 1, SND)`.
    /// 2. The producer is flushed.
    /// 3. `src` leaves the active set at `(computed_step, partition(src))`; if its partition
    ///    drained, the partition's marker at `(computed_step, SND)` is removed. That removal is
    ///    what eventually lets the leader advance past the SEND phase.
    ///
    /// Called with an empty `outgoing` map this still performs step 3: a vertex that sent
    /// nothing deactivates like any other.
    pub(crate) fn dispatch(
        &mut self,
        computed_step: Superstep,
        src: &CF::K,
        outgoing: &IndexMap<CF::K, CF::M>,
    ) -> Result<(), PregelError> {
        let delivery_step = computed_step + 1;
        let next_send_barrier = BarrierPath::new(delivery_step, Phase::Send);

        for (dst, message) in outgoing {
            let entry = WorkSetEntry::new(delivery_step, src.clone(), Some(message.clone()));
            let key_bytes = encode(dst, &self.topics.work_set)?;
            let value_bytes = encode(&entry, &self.topics.work_set)?;
            let partition = self
                .producer
                .send(&self.topics.work_set, &key_bytes, &value_bytes)?;
            self.coordination.add_barrier_child(
                &next_send_barrier,
                &BarrierChild::Partition(partition),
                CreateMode::Persistent,
            )?;
        }

        self.producer.flush()?;
        self.deactivate(computed_step, src)?;

        Event::DispatchMessages(DispatchMessagesEvent {
            timestamp: SystemTime::now(),
            src: format!("{:?}", src),
            superstep: delivery_step,
            message_count: outgoing.len(),
        })
        .publish(&self.event_publisher);

        Ok(())
    }

    fn deactivate(&mut self, computed_step: Superstep, src: &CF::K) -> Result<(), PregelError> {
        let partition = vertex_to_partition(src, self.num_partitions).map_err(|err| {
            LogError::Codec {
                topic: self.topics.work_set.clone(),
                detail: err.to_string(),
            }
        })?;

        if self.active.deactivate(computed_step, partition, src) {
            self.coordination.remove_barrier_child(
                &BarrierPath::new(computed_step, Phase::Send),
                &BarrierChild::Partition(partition),
            )?;
            Event::DrainPartition(DrainPartitionEvent {
                timestamp: SystemTime::now(),
                partition,
                superstep: computed_step,
            })
            .publish(&self.event_publisher);
        }
        Ok(())
    }
}
