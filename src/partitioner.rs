/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The deterministic vertex-key to partition router.
//!
//! Routing must agree between every worker, across restarts, and with the log producer's own
//! partitioner: a message the dispatcher addresses to a vertex has to land on the partition
//! whose worker task owns that vertex. Implementations of
//! [`TopicProducer`](crate::messaging::TopicProducer) are required to route with
//! [`partition_for_key`].

use sha2::{Digest, Sha256};

use crate::types::data_types::{NumPartitions, PartitionId};
use crate::types::graph::VertexKey;

/// Map serialized key bytes to a partition: the first four bytes of the SHA-256 digest, read
/// big-endian, modulo the partition count.
pub fn partition_for_key(key: &[u8], num_partitions: NumPartitions) -> PartitionId {
    let digest = Sha256::digest(key);
    let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    PartitionId::new(prefix % num_partitions.int())
}

/// Map a vertex key to the partition that owns it, serializing with the same codec the topics
/// use.
pub fn vertex_to_partition<K: VertexKey>(
    key: &K,
    num_partitions: NumPartitions,
) -> Result<PartitionId, borsh::io::Error> {
    let bytes = borsh::to_vec(key)?;
    Ok(partition_for_key(&bytes, num_partitions))
}
