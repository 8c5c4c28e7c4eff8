/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The shared registry of active vertices.
//!
//! A vertex becomes *active* for a superstep when it is forwarded into the compute pipeline, and
//! stops being active when every outgoing message it produced has been acknowledged by the log.
//! The registry is shared between all tasks of a process because the
//! [dispatcher](crate::worker::dispatcher) deactivates vertices while other tasks may be
//! activating their own; it is keyed by superstep so a finished step's bookkeeping can be
//! discarded in one operation.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;

use crate::types::data_types::{PartitionId, Superstep};
use crate::types::graph::VertexKey;

/// Per-superstep, per-partition sets of vertices that have been forwarded but not yet fully
/// dispatched. Safe for concurrent mutation; entries for one superstep are mutated under that
/// superstep's map entry.
pub(crate) struct ActiveVertexSet<K: VertexKey> {
    inner: DashMap<Superstep, HashMap<PartitionId, HashSet<K>>>,
}

impl<K: VertexKey> ActiveVertexSet<K> {
    pub(crate) fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Record that `vertex` was forwarded at `superstep`. Returns `true` iff this activation
    /// made the partition's set non-empty, i.e. the partition went from idle to in flight.
    pub(crate) fn activate(&self, superstep: Superstep, partition: PartitionId, vertex: K) -> bool {
        let mut step_map = self.inner.entry(superstep).or_default();
        let vertices = step_map.entry(partition).or_default();
        let was_idle = vertices.is_empty();
        vertices.insert(vertex);
        was_idle
    }

    /// Record that every outgoing message of `vertex` has been acknowledged. Returns `true` iff
    /// this deactivation emptied the partition's set, i.e. the caller should clear the
    /// partition's in-flight marker.
    pub(crate) fn deactivate(
        &self,
        superstep: Superstep,
        partition: PartitionId,
        vertex: &K,
    ) -> bool {
        let mut step_map = match self.inner.get_mut(&superstep) {
            Some(step_map) => step_map,
            // The step was already collected; nothing to drain.
            None => return false,
        };
        match step_map.get_mut(&partition) {
            Some(vertices) => {
                vertices.remove(vertex);
                if vertices.is_empty() {
                    step_map.remove(&partition);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// Whether any vertex of `partition` is active at `superstep`.
    pub(crate) fn is_partition_active(&self, superstep: Superstep, partition: PartitionId) -> bool {
        self.inner
            .get(&superstep)
            .map(|step_map| step_map.contains_key(&partition))
            .unwrap_or(false)
    }

    /// Discard the whole sub-map of `superstep` atomically.
    pub(crate) fn discard_step(&self, superstep: Superstep) -> bool {
        self.inner.remove(&superstep).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P0: PartitionId = PartitionId::new(0);
    const P1: PartitionId = PartitionId::new(1);

    #[test]
    fn deactivating_the_last_vertex_drains_the_partition() {
        let active: ActiveVertexSet<String> = ActiveVertexSet::new();
        let step = Superstep::new(1);
        assert!(active.activate(step, P0, "a".to_string()));
        assert!(!active.activate(step, P0, "b".to_string()));
        assert!(active.activate(step, P1, "c".to_string()));

        assert!(!active.deactivate(step, P0, &"a".to_string()));
        assert!(active.is_partition_active(step, P0));
        assert!(active.deactivate(step, P0, &"b".to_string()));
        assert!(!active.is_partition_active(step, P0));
        assert!(active.is_partition_active(step, P1));
    }

    #[test]
    fn deactivating_an_unknown_vertex_is_harmless() {
        let active: ActiveVertexSet<String> = ActiveVertexSet::new();
        let step = Superstep::new(2);
        assert!(!active.deactivate(step, P0, &"ghost".to_string()));
        active.activate(step, P0, "a".to_string());
        assert!(!active.deactivate(step, P1, &"a".to_string()));
    }

    #[test]
    fn discarding_a_step_removes_all_of_its_partitions() {
        let active: ActiveVertexSet<String> = ActiveVertexSet::new();
        active.activate(Superstep::new(3), P0, "a".to_string());
        active.activate(Superstep::new(3), P1, "b".to_string());
        active.activate(Superstep::new(4), P0, "c".to_string());

        assert!(active.discard_step(Superstep::new(3)));
        assert!(!active.is_partition_active(Superstep::new(3), P0));
        assert!(!active.is_partition_active(Superstep::new(3), P1));
        assert!(active.is_partition_active(Superstep::new(4), P0));
        assert!(!active.discard_step(Superstep::new(3)));
    }
}
