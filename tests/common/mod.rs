/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Shared scaffolding for the integration test suite: an in-memory [`MessageLog`], an in-memory
//! [`CoordinationStore`] with crash simulation, an event recorder, and small graph fixtures.
//! These use mutex-wrapped maps to simulate the log cluster and the coordination store, and thus
//! never leave any artifacts.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, Once, TryLockError};
use std::thread;
use std::time::{Duration, Instant};

use log::LevelFilter;
use pregel_rs::computation::PregelComputation;
use pregel_rs::config::{Configuration, TimingConfig, TopicNames, WorkerConfig};
use pregel_rs::coordination::paths::{BarrierChild, BarrierPath};
use pregel_rs::coordination::store::{CoordinationError, CoordinationStore, CreateMode};
use pregel_rs::event_bus::UserEventHandlers;
use pregel_rs::messaging::{LogError, MessageLog, Record, TopicConsumer, TopicProducer};
use pregel_rs::partitioner::partition_for_key;
use pregel_rs::types::data_types::{ApplicationId, NumPartitions, PartitionId, WorkerName};
use pregel_rs::types::graph::EdgeWithValue;
use pregel_rs::types::pregel_state::PregelState;
use pregel_rs::Superstep;

static LOGGER_INIT: Once = Once::new();

// Set up a logger that logs all log messages with level `level` and above.
pub fn setup_logger(level: LevelFilter) {
    LOGGER_INIT.call_once(|| {
        fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{:?}][{}] {}",
                    thread::current().id(),
                    record.level(),
                    message
                ))
            })
            .level(level)
            .chain(io::stdout())
            .apply()
            .unwrap();
    })
}

/* In-memory message log */

struct LogInner {
    num_partitions: u32,
    // topic -> partition -> records
    topics: HashMap<String, Vec<Vec<Record>>>,
}

impl LogInner {
    fn partitions_mut(&mut self, topic: &str) -> &mut Vec<Vec<Record>> {
        let num_partitions = self.num_partitions;
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| vec![Vec::new(); num_partitions as usize])
    }
}

/// A log cluster living in one `Arc<Mutex<_>>`: per-topic partitioned offset logs, routed by the
/// engine's own partitioner.
#[derive(Clone)]
pub struct InMemoryLog {
    inner: Arc<Mutex<LogInner>>,
    num_partitions: NumPartitions,
}

impl InMemoryLog {
    pub fn new(num_partitions: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogInner {
                num_partitions,
                topics: HashMap::new(),
            })),
            num_partitions: NumPartitions::new(num_partitions),
        }
    }
}

impl MessageLog for InMemoryLog {
    type Consumer = InMemoryConsumer;
    type Producer = InMemoryProducer;

    fn num_partitions(&self, _topic: &str) -> Result<NumPartitions, LogError> {
        Ok(self.num_partitions)
    }

    fn consumer(&self, topic: &str, partition: PartitionId) -> Result<InMemoryConsumer, LogError> {
        self.inner.lock().unwrap().partitions_mut(topic);
        Ok(InMemoryConsumer {
            inner: self.inner.clone(),
            topic: topic.to_string(),
            partition: partition.int() as usize,
            position: 0,
            paused: false,
        })
    }

    fn producer(&self) -> Result<InMemoryProducer, LogError> {
        Ok(InMemoryProducer {
            inner: self.inner.clone(),
            num_partitions: self.num_partitions,
        })
    }
}

pub struct InMemoryConsumer {
    inner: Arc<Mutex<LogInner>>,
    topic: String,
    partition: usize,
    position: u64,
    paused: bool,
}

impl TopicConsumer for InMemoryConsumer {
    fn poll(&mut self) -> Result<Vec<Record>, LogError> {
        if self.paused {
            return Ok(Vec::new());
        }
        let mut inner = self.inner.lock().unwrap();
        let records = &inner.partitions_mut(&self.topic)[self.partition];
        let fetched: Vec<Record> = records[self.position as usize..].to_vec();
        self.position = records.len() as u64;
        Ok(fetched)
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn seek_to_beginning(&mut self) {
        self.position = 0;
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn end_offset(&self) -> Result<u64, LogError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner.partitions_mut(&self.topic)[self.partition].len() as u64)
    }
}

pub struct InMemoryProducer {
    inner: Arc<Mutex<LogInner>>,
    num_partitions: NumPartitions,
}

impl TopicProducer for InMemoryProducer {
    fn send(&mut self, topic: &str, key: &[u8], value: &[u8]) -> Result<PartitionId, LogError> {
        let partition = partition_for_key(key, self.num_partitions);
        let mut inner = self.inner.lock().unwrap();
        let records = &mut inner.partitions_mut(topic)[partition.int() as usize];
        let offset = records.len() as u64;
        records.push(Record {
            key: key.to_vec(),
            value: value.to_vec(),
            offset,
        });
        Ok(partition)
    }

    fn flush(&mut self) -> Result<(), LogError> {
        Ok(())
    }
}

/* In-memory coordination store */

type SessionId = u64;

#[derive(Clone, PartialEq, Eq)]
enum Owner {
    Persistent,
    Session(SessionId),
}

struct HubInner {
    next_session: SessionId,
    live_sessions: HashSet<SessionId>,
    // worker name -> owning session
    group: HashMap<String, SessionId>,
    // leader latch: first live session in the queue leads
    leader_queue: Vec<SessionId>,
    shared_value: Vec<u8>,
    barriers: HashMap<BarrierPath, HashMap<BarrierChild, Owner>>,
}

/// The coordination store all sessions of a test connect to.
#[derive(Clone)]
pub struct CoordinationHub {
    inner: Arc<Mutex<HubInner>>,
}

impl CoordinationHub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                next_session: 0,
                live_sessions: HashSet::new(),
                group: HashMap::new(),
                leader_queue: Vec::new(),
                shared_value: Vec::new(),
                barriers: HashMap::new(),
            })),
        }
    }

    /// Open a session. Clones of the returned handle share the session, like the clones of one
    /// coordination client inside a worker process.
    pub fn connect(&self) -> InMemoryCoordination {
        let mut inner = self.inner.lock().unwrap();
        let session = inner.next_session;
        inner.next_session += 1;
        inner.live_sessions.insert(session);
        inner.leader_queue.push(session);
        InMemoryCoordination {
            inner: self.inner.clone(),
            session,
            op_timeout: Duration::from_secs(5),
        }
    }

    /// The children currently under `barrier`, for assertions.
    pub fn children_at(&self, barrier: &BarrierPath) -> Vec<BarrierChild> {
        self.inner
            .lock()
            .unwrap()
            .barriers
            .get(barrier)
            .map(|children| children.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct InMemoryCoordination {
    inner: Arc<Mutex<HubInner>>,
    session: SessionId,
    op_timeout: Duration,
}

impl InMemoryCoordination {
    /// Sever this session without any cleanup, as a process crash would: its group members and
    /// ephemeral barrier children vanish, and leadership passes to the next session. Every
    /// subsequent operation through this session fails with `Disconnected`.
    pub fn crash(&self) {
        let mut inner = self.inner.lock().unwrap();
        let session = self.session;
        inner.live_sessions.remove(&session);
        inner.leader_queue.retain(|s| *s != session);
        inner.group.retain(|_, owner| *owner != session);
        for children in inner.barriers.values_mut() {
            children.retain(|_, owner| *owner != Owner::Session(session));
        }
    }

    /// Take the hub lock within the session's operation timeout, and check the session is still
    /// alive.
    fn lock(&self) -> Result<MutexGuard<'_, HubInner>, CoordinationError> {
        let deadline = Instant::now() + self.op_timeout;
        loop {
            match self.inner.try_lock() {
                Ok(inner) => {
                    return if inner.live_sessions.contains(&self.session) {
                        Ok(inner)
                    } else {
                        Err(CoordinationError::Disconnected {
                            detail: format!("session {} is closed", self.session),
                        })
                    };
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() > deadline {
                        return Err(CoordinationError::Timeout {
                            detail: format!(
                                "hub lock not acquired within {:?}",
                                self.op_timeout
                            ),
                        });
                    }
                    thread::yield_now();
                }
                Err(TryLockError::Poisoned(err)) => {
                    panic!("coordination hub mutex poisoned: {}", err)
                }
            }
        }
    }
}

impl CoordinationStore for InMemoryCoordination {
    fn set_operation_timeout(&mut self, timeout: Duration) {
        self.op_timeout = timeout;
    }

    fn join_group(&mut self, member: &WorkerName) -> Result<(), CoordinationError> {
        let mut inner = self.lock()?;
        inner.group.insert(member.str().to_string(), self.session);
        Ok(())
    }

    fn leave_group(&mut self) -> Result<(), CoordinationError> {
        let mut inner = self.lock()?;
        let session = self.session;
        inner.group.retain(|_, owner| *owner != session);
        Ok(())
    }

    fn group_size(&self) -> Result<usize, CoordinationError> {
        Ok(self.lock()?.group.len())
    }

    fn has_leadership(&self) -> Result<bool, CoordinationError> {
        Ok(self.lock()?.leader_queue.first() == Some(&self.session))
    }

    fn read_shared_value(&self) -> Result<Vec<u8>, CoordinationError> {
        Ok(self.lock()?.shared_value.clone())
    }

    fn write_shared_value(&mut self, value: &[u8]) -> Result<(), CoordinationError> {
        self.lock()?.shared_value = value.to_vec();
        Ok(())
    }

    fn add_barrier_child(
        &mut self,
        barrier: &BarrierPath,
        child: &BarrierChild,
        mode: CreateMode,
    ) -> Result<(), CoordinationError> {
        let owner = match mode {
            CreateMode::Ephemeral => Owner::Session(self.session),
            CreateMode::Persistent => Owner::Persistent,
        };
        self.lock()?
            .barriers
            .entry(*barrier)
            .or_default()
            .insert(child.clone(), owner);
        Ok(())
    }

    fn remove_barrier_child(
        &mut self,
        barrier: &BarrierPath,
        child: &BarrierChild,
    ) -> Result<(), CoordinationError> {
        if let Some(children) = self.lock()?.barriers.get_mut(barrier) {
            children.remove(child);
        }
        Ok(())
    }

    fn has_barrier_child(
        &self,
        barrier: &BarrierPath,
        child: &BarrierChild,
    ) -> Result<bool, CoordinationError> {
        Ok(self
            .lock()?
            .barriers
            .get(barrier)
            .map(|children| children.contains_key(child))
            .unwrap_or(false))
    }

    fn barrier_children(
        &self,
        barrier: &BarrierPath,
    ) -> Result<Vec<BarrierChild>, CoordinationError> {
        Ok(self
            .lock()?
            .barriers
            .get(barrier)
            .map(|children| children.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn prune_barriers(&mut self, up_to_step: Superstep) -> Result<(), CoordinationError> {
        self.lock()?
            .barriers
            .retain(|path, _| path.superstep >= up_to_step);
        Ok(())
    }
}

/* Event recording */

#[derive(Clone, Debug)]
pub enum RecordedEvent {
    Advance(PregelState),
    Compute { superstep: Superstep, vertex: String },
    Drain(PartitionId),
}

/// Captures the order in which the shared state advanced and vertices were computed, for
/// asserting the barrier ordering guarantees.
#[derive(Clone, Default)]
pub struct EventRecorder {
    entries: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl EventRecorder {
    pub fn handlers(&self) -> UserEventHandlers {
        let advances = self.entries.clone();
        let computes = self.entries.clone();
        let drains = self.entries.clone();
        UserEventHandlers {
            advance_state: Some(Box::new(move |event| {
                advances
                    .lock()
                    .unwrap()
                    .push(RecordedEvent::Advance(event.state));
            })),
            compute_vertex: Some(Box::new(move |event| {
                computes.lock().unwrap().push(RecordedEvent::Compute {
                    superstep: event.superstep,
                    vertex: event.vertex.clone(),
                });
            })),
            drain_partition: Some(Box::new(move |event| {
                drains
                    .lock()
                    .unwrap()
                    .push(RecordedEvent::Drain(event.partition));
            })),
            ..UserEventHandlers::default()
        }
    }

    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.entries.lock().unwrap().clone()
    }
}

/* Fixtures */

/// A configuration with the test tick interval (50 ms, to keep scenarios fast).
pub fn configuration(
    application_id: &str,
    host_and_port: &str,
    assigned_partitions: &[u32],
    num_partitions: u32,
) -> Configuration {
    let application_id = ApplicationId::new(application_id);
    Configuration {
        topics: TopicNames::for_application(&application_id),
        worker: WorkerConfig {
            application_id,
            host_and_port: host_and_port.to_string(),
            assigned_partitions: assigned_partitions
                .iter()
                .map(|p| PartitionId::new(*p))
                .collect(),
            num_partitions: NumPartitions::new(num_partitions),
        },
        timing: TimingConfig {
            barrier_tick_interval: Duration::from_millis(50),
            ..TimingConfig::default()
        },
        log_events: true,
    }
}

/// Load a graph into the vertices and edges topics: `vertices` are `(key, value)` pairs and
/// `edges` are `(src, dst, edge value)` triples, grouped by source before writing.
pub fn load_graph(
    log: &InMemoryLog,
    topics: &TopicNames,
    vertices: &[(&str, u32)],
    edges: &[(&str, &str, u32)],
) {
    let mut producer = log.producer().unwrap();

    for (key, value) in vertices {
        producer
            .send(
                &topics.vertices,
                &borsh::to_vec(&key.to_string()).unwrap(),
                &borsh::to_vec(value).unwrap(),
            )
            .unwrap();
    }

    let mut grouped: HashMap<String, Vec<EdgeWithValue<String, u32>>> = HashMap::new();
    for (src, dst, value) in edges {
        grouped
            .entry(src.to_string())
            .or_default()
            .push(EdgeWithValue::new(dst.to_string(), *value));
    }
    for (src, outgoing) in grouped {
        producer
            .send(
                &topics.edges_grouped_by_source,
                &borsh::to_vec(&src).unwrap(),
                &borsh::to_vec(&outgoing).unwrap(),
            )
            .unwrap();
    }

    producer.flush().unwrap();
}

/// Poll `condition` every 10 ms until it holds or `timeout` elapses. Panics on timeout.
pub fn wait_until(timeout: Duration, description: &str, mut condition: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + timeout;
    while !condition() {
        if std::time::Instant::now() > deadline {
            panic!("timed out waiting until {}", description);
        }
        thread::sleep(Duration::from_millis(10));
    }
}

/// Candidate keys of the form `v<i>` that the router places on `partition`.
pub fn keys_on_partition(partition: u32, num_partitions: u32, count: usize) -> Vec<String> {
    let mut keys = Vec::new();
    let mut i = 0u32;
    while keys.len() < count {
        let candidate = format!("v{}", i);
        let bytes = borsh::to_vec(&candidate).unwrap();
        if partition_for_key(&bytes, NumPartitions::new(num_partitions)).int() == partition {
            keys.push(candidate);
        }
        i += 1;
    }
    keys
}

/* Vertex programs */

use std::collections::HashMap as StdHashMap;

use pregel_rs::compute::{ComputeCallback, ComputeFunction, UserComputeError};
use pregel_rs::types::graph::VertexWithValue;

/// Does nothing, ever: no new value, no messages. A computation over it converges as soon as the
/// seed messages drain.
#[derive(Clone)]
pub struct Inert;

impl ComputeFunction for Inert {
    type K = String;
    type VV = u32;
    type EV = u32;
    type M = u32;

    fn compute(
        &self,
        _superstep: Superstep,
        _vertex: &VertexWithValue<String, u32>,
        _messages: &StdHashMap<String, u32>,
        _edges: &[EdgeWithValue<String, u32>],
        _callback: &mut ComputeCallback<String, u32, u32>,
    ) -> Result<(), UserComputeError> {
        Ok(())
    }
}

/// If anything arrived, take the maximum of the own value and the incoming messages, adopt it,
/// and forward it along every outgoing edge.
#[derive(Clone)]
pub struct MaxPropagate;

impl ComputeFunction for MaxPropagate {
    type K = String;
    type VV = u32;
    type EV = u32;
    type M = u32;

    fn compute(
        &self,
        _superstep: Superstep,
        vertex: &VertexWithValue<String, u32>,
        messages: &StdHashMap<String, u32>,
        edges: &[EdgeWithValue<String, u32>],
        callback: &mut ComputeCallback<String, u32, u32>,
    ) -> Result<(), UserComputeError> {
        if messages.is_empty() {
            return Ok(());
        }
        let incoming = messages.values().copied().max().unwrap();
        let value = vertex.value.unwrap_or(0).max(incoming);
        callback.set_new_vertex_value(value);
        for edge in edges {
            callback.send_message_to(edge.target.clone(), value);
        }
        Ok(())
    }
}

/// Adopts the largest incoming message and relays its increment along every edge, forever. Only
/// the iteration bound stops a computation over a cyclic graph.
#[derive(Clone)]
pub struct RelayIncrement;

impl ComputeFunction for RelayIncrement {
    type K = String;
    type VV = u32;
    type EV = u32;
    type M = u32;

    fn compute(
        &self,
        _superstep: Superstep,
        _vertex: &VertexWithValue<String, u32>,
        messages: &StdHashMap<String, u32>,
        edges: &[EdgeWithValue<String, u32>],
        callback: &mut ComputeCallback<String, u32, u32>,
    ) -> Result<(), UserComputeError> {
        if messages.is_empty() {
            return Ok(());
        }
        let incoming = messages.values().copied().max().unwrap();
        callback.set_new_vertex_value(incoming);
        for edge in edges {
            callback.send_message_to(edge.target.clone(), incoming + 1);
        }
        Ok(())
    }
}

/// Shorthand for the computation type every test uses.
pub type TestComputation<CF> = PregelComputation<CF, InMemoryCoordination, InMemoryLog>;
