/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The logical cursor of a computation, replicated through the coordination store's shared value.
//!
//! Main type: [`PregelState`].

use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use borsh::{BorshDeserialize, BorshSerialize};

use crate::coordination::store::CoordinationError;
use crate::types::data_types::Superstep;

/// Coarse lifecycle of a computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Created,
    Running,
    Completed,
}

impl Lifecycle {
    const fn code(&self) -> u8 {
        match self {
            Lifecycle::Created => 0,
            Lifecycle::Running => 1,
            Lifecycle::Completed => 2,
        }
    }

    fn from_code(code: u8) -> Option<Lifecycle> {
        match code {
            0 => Some(Lifecycle::Created),
            1 => Some(Lifecycle::Running),
            2 => Some(Lifecycle::Completed),
            _ => None,
        }
    }
}

/// The half of a superstep a computation is currently in.
///
/// Within one superstep, RECEIVE strictly precedes SEND: in RECEIVE workers ingest the messages
/// addressed to them and attest readiness; in SEND they run the compute pipeline and dispatch
/// outgoing messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Receive,
    Send,
}

impl Phase {
    const fn code(&self) -> u8 {
        match self {
            Phase::Receive => 0,
            Phase::Send => 1,
        }
    }

    fn from_code(code: u8) -> Option<Phase> {
        match code {
            0 => Some(Phase::Receive),
            1 => Some(Phase::Send),
            _ => None,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Receive => write!(f, "RCV"),
            Phase::Send => write!(f, "SND"),
        }
    }
}

/// Immutable value describing where a computation stands: its lifecycle, its superstep, and the
/// phase within that superstep.
///
/// Only the leader writes a `PregelState` into the shared value, and it only ever replaces the
/// current value with [`next`](Self::next) or [`complete`](Self::complete), so the replicated
/// state advances monotonically under the total order on `(superstep, phase)` with
/// `Receive < Send`.
///
/// # Equality
///
/// Two `PregelState`s are equal iff their `(lifecycle, superstep, phase)` triples are equal. The
/// timestamps are advisory and excluded, so that re-encoding a state on a different machine does
/// not make it "different".
#[derive(Clone, Copy, Debug)]
pub struct PregelState {
    lifecycle: Lifecycle,
    superstep: Superstep,
    phase: Phase,
    start_time: i64,
    end_time: i64,
}

impl PregelState {
    /// Create a new `PregelState`. `start_time` is stamped with the current wall clock iff
    /// `lifecycle` is [`Lifecycle::Running`].
    pub fn new(lifecycle: Lifecycle, superstep: Superstep, phase: Phase) -> Self {
        let start_time = if lifecycle == Lifecycle::Running {
            epoch_millis()
        } else {
            0
        };
        Self {
            lifecycle,
            superstep,
            phase,
            start_time,
            end_time: 0,
        }
    }

    /// The state every computation starts in: `(Created, 0, Receive)`.
    pub fn created() -> Self {
        Self::new(Lifecycle::Created, Superstep::init(), Phase::Receive)
    }

    /// Advance to the next state under the `(superstep, phase)` order: RECEIVE moves to SEND
    /// within the same superstep, SEND moves to RECEIVE of the next superstep.
    pub fn next(&self) -> Self {
        match self.phase {
            Phase::Receive => Self {
                phase: Phase::Send,
                ..*self
            },
            Phase::Send => Self {
                superstep: self.superstep + 1,
                phase: Phase::Receive,
                ..*self
            },
        }
    }

    /// Terminate at the current `(superstep, phase)`, stamping the end time.
    pub fn complete(&self) -> Self {
        Self {
            lifecycle: Lifecycle::Completed,
            end_time: epoch_millis(),
            ..*self
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn superstep(&self) -> Superstep {
        self.superstep
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// How long the computation has been running, in milliseconds: zero before it starts, wall
    /// clock minus start while running, end minus start once completed.
    pub fn running_time(&self) -> i64 {
        match self.lifecycle {
            Lifecycle::Created => 0,
            Lifecycle::Running => epoch_millis() - self.start_time,
            Lifecycle::Completed => self.end_time - self.start_time,
        }
    }

    /// Encode into the stable 22-byte wire format stored in the shared value:
    /// `{u8 lifecycle, i32 superstep, u8 phase, i64 start_time, i64 end_time}`, integers
    /// little-endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let wire = WireState {
            lifecycle: self.lifecycle.code(),
            superstep: self.superstep.int(),
            phase: self.phase.code(),
            start_time: self.start_time,
            end_time: self.end_time,
        };
        borsh::to_vec(&wire).expect("encoding a fixed-size record into a Vec cannot fail")
    }

    /// Decode from the wire format. A short buffer or an unknown lifecycle/phase code is a
    /// [`CoordinationError::MalformedSharedValue`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoordinationError> {
        let wire: WireState = borsh::from_slice(bytes).map_err(|err| {
            CoordinationError::MalformedSharedValue {
                detail: err.to_string(),
            }
        })?;
        let lifecycle = Lifecycle::from_code(wire.lifecycle).ok_or_else(|| {
            CoordinationError::MalformedSharedValue {
                detail: format!("unknown lifecycle code {}", wire.lifecycle),
            }
        })?;
        let phase =
            Phase::from_code(wire.phase).ok_or_else(|| CoordinationError::MalformedSharedValue {
                detail: format!("unknown phase code {}", wire.phase),
            })?;
        Ok(Self {
            lifecycle,
            superstep: Superstep::new(wire.superstep),
            phase,
            start_time: wire.start_time,
            end_time: wire.end_time,
        })
    }
}

impl PartialEq for PregelState {
    fn eq(&self, other: &Self) -> bool {
        self.lifecycle == other.lifecycle
            && self.superstep == other.superstep
            && self.phase == other.phase
    }
}

impl Eq for PregelState {}

impl Hash for PregelState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lifecycle.hash(state);
        self.superstep.hash(state);
        self.phase.hash(state);
    }
}

impl Display for PregelState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Superstep{{state={:?}, superstep={}, stage={}}}",
            self.lifecycle, self.superstep, self.phase
        )
    }
}

/// Wire mirror of [`PregelState`]. Borsh writes integers little-endian, which pins the layout.
#[derive(BorshSerialize, BorshDeserialize)]
struct WireState {
    lifecycle: u8,
    superstep: i32,
    phase: u8,
    start_time: i64,
    end_time: i64,
}

/// Milliseconds since the Unix epoch.
pub(crate) fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
