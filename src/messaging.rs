/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Traits for the pluggable durable partitioned log.
//!
//! Main traits: [`MessageLog`], [`TopicConsumer`], [`TopicProducer`].
//!
//! A computation reads and writes four topics, all partitioned by the same key hash as the
//! [partition router](crate::partitioner):
//! - *vertices* (`K -> VV`, compacted): source of truth for initial vertex values.
//! - *edges grouped by source* (`K -> Vec<(K, EV)>`, compacted): read-only once loaded.
//! - *solution set* (`K -> VertexEntry<VV>`, compacted): the authoritative vertex values.
//! - *work set* (`K -> WorkSetEntry<K, M>`, retained): in-flight messages keyed by destination.
//!
//! Consumers expose their position and end offset directly, so the barrier synchronizer can
//! decide "has everything produced so far been consumed locally" without reaching into the
//! implementation.

use std::fmt::{self, Display, Formatter};

use crate::types::data_types::{NumPartitions, PartitionId};

/// One record read from a topic partition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub offset: u64,
}

/// A consumer of a single topic partition.
///
/// The engine assigns partitions to worker tasks explicitly; a consumer never rebalances.
pub trait TopicConsumer: Send + 'static {
    /// Fetch the records between the consumer's position and the end of the partition, advancing
    /// the position past them. A paused consumer fetches nothing and holds its position.
    fn poll(&mut self) -> Result<Vec<Record>, LogError>;

    /// Stop fetching until [`resume`](Self::resume)d.
    fn pause(&mut self);

    /// Undo [`pause`](Self::pause).
    fn resume(&mut self);

    fn is_paused(&self) -> bool;

    /// Move the position back to the first retained offset.
    fn seek_to_beginning(&mut self);

    /// The offset of the next record [`poll`](Self::poll) would return.
    fn position(&self) -> u64;

    /// The offset one past the last record currently in the partition.
    fn end_offset(&self) -> Result<u64, LogError>;

    /// Whether everything produced so far has been consumed locally: position equals end offset.
    fn is_synced(&self) -> Result<bool, LogError> {
        Ok(self.position() == self.end_offset()?)
    }
}

/// A producer into the log cluster.
///
/// The producer routes each record with the same partitioner as the
/// [router](crate::partitioner::partition_for_key), so a message the engine addresses to a
/// vertex lands on the partition that vertex's worker consumes.
pub trait TopicProducer: Send + 'static {
    /// Durably append a record to `topic`, routed by `key`. Returns the partition the record
    /// landed on once the write is acknowledged.
    fn send(&mut self, topic: &str, key: &[u8], value: &[u8]) -> Result<PartitionId, LogError>;

    /// Block until every send issued so far is acknowledged. Establishes the happens-before edge
    /// between "message durably enqueued" and whatever the caller does next.
    fn flush(&mut self) -> Result<(), LogError>;
}

/// Factory for consumers and producers against one log cluster.
pub trait MessageLog: Clone + Send + 'static {
    type Consumer: TopicConsumer;
    type Producer: TopicProducer;

    /// How many partitions `topic` has. Identical across the four topics of a computation.
    fn num_partitions(&self, topic: &str) -> Result<NumPartitions, LogError>;

    /// Open a consumer over one partition of `topic`, positioned at the first retained offset.
    fn consumer(&self, topic: &str, partition: PartitionId) -> Result<Self::Consumer, LogError>;

    /// Open a producer into the cluster.
    fn producer(&self) -> Result<Self::Producer, LogError>;
}

/// Enumerates the ways log access can fail. All variants are fatal for the task that hits them:
/// the inbox is reconstructible from the log, so a crashed task loses no data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogError {
    /// A send was not acknowledged, after whatever internal retries the producer performs.
    ProduceFailed { topic: String, detail: String },

    /// A fetch failed.
    FetchFailed { topic: String, detail: String },

    /// The named topic does not exist in the cluster.
    UnknownTopic { topic: String },

    /// A record's key or value did not decode into the expected type.
    Codec { topic: String, detail: String },
}

/// Encode a value for `topic` with the codec every topic of a computation uses.
pub(crate) fn encode<T: borsh::BorshSerialize>(value: &T, topic: &str) -> Result<Vec<u8>, LogError> {
    borsh::to_vec(value).map_err(|err| LogError::Codec {
        topic: topic.to_string(),
        detail: err.to_string(),
    })
}

/// Decode a record key or value read from `topic`.
pub(crate) fn decode<T: borsh::BorshDeserialize>(bytes: &[u8], topic: &str) -> Result<T, LogError> {
    borsh::from_slice(bytes).map_err(|err| LogError::Codec {
        topic: topic.to_string(),
        detail: err.to_string(),
    })
}

impl Display for LogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LogError::ProduceFailed { topic, detail } => {
                write!(f, "produce to '{}' failed: {}", topic, detail)
            }
            LogError::FetchFailed { topic, detail } => {
                write!(f, "fetch from '{}' failed: {}", topic, detail)
            }
            LogError::UnknownTopic { topic } => write!(f, "unknown topic '{}'", topic),
            LogError::Codec { topic, detail } => {
                write!(f, "record on '{}' does not decode: {}", topic, detail)
            }
        }
    }
}
