/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the worker's
//! [config](crate::config::Configuration).
//!
//! Logging goes through the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations).
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values
//! are always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following
//! snippet is how a [ForwardVertex](crate::events::ForwardVertexEvent) is printed:
//!
//! ```text
//! ForwardVertex, 1701329264, "B", 2, 1
//! ```
//!
//! where the third value is the vertex key, the fourth the superstep, and the fifth how many
//! buffered messages were forwarded with it.

use std::time::SystemTime;

use crate::events::*;

// Names of each event in PascalCase for printing:
pub const START_COMPUTATION: &str = "StartComputation";
pub const ADVANCE_STATE: &str = "AdvanceState";
pub const COMPLETE_COMPUTATION: &str = "CompleteComputation";

pub const SIGNAL_RECEIVE_READY: &str = "SignalReceiveReady";
pub const SIGNAL_SEND_COMPLETE: &str = "SignalSendComplete";
pub const ACTIVATE_PARTITION: &str = "ActivatePartition";
pub const DRAIN_PARTITION: &str = "DrainPartition";

pub const FORWARD_VERTEX: &str = "ForwardVertex";
pub const COMPUTE_VERTEX: &str = "ComputeVertex";
pub const DISPATCH_MESSAGES: &str = "DispatchMessages";
pub const GARBAGE_COLLECT: &str = "GarbageCollect";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for StartComputationEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &StartComputationEvent| {
            log::info!(
                "{}, {}, {}",
                START_COMPUTATION,
                secs_since_unix_epoch(event.timestamp),
                event.max_iterations
            )
        })
    }
}

impl Logger for AdvanceStateEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &AdvanceStateEvent| {
            log::info!(
                "{}, {}, {}, {}",
                ADVANCE_STATE,
                secs_since_unix_epoch(event.timestamp),
                event.state.superstep(),
                event.state.phase()
            )
        })
    }
}

impl Logger for CompleteComputationEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &CompleteComputationEvent| {
            log::info!(
                "{}, {}, {}, {}",
                COMPLETE_COMPUTATION,
                secs_since_unix_epoch(event.timestamp),
                event.state.superstep(),
                if event.converged { "converged" } else { "halted" }
            )
        })
    }
}

impl Logger for SignalReceiveReadyEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &SignalReceiveReadyEvent| {
            log::debug!(
                "{}, {}, {}, {}",
                SIGNAL_RECEIVE_READY,
                secs_since_unix_epoch(event.timestamp),
                event.worker,
                event.superstep
            )
        })
    }
}

impl Logger for SignalSendCompleteEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &SignalSendCompleteEvent| {
            log::debug!(
                "{}, {}, {}, {}",
                SIGNAL_SEND_COMPLETE,
                secs_since_unix_epoch(event.timestamp),
                event.worker,
                event.superstep
            )
        })
    }
}

impl Logger for ActivatePartitionEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &ActivatePartitionEvent| {
            log::debug!(
                "{}, {}, {}, {}",
                ACTIVATE_PARTITION,
                secs_since_unix_epoch(event.timestamp),
                event.partition,
                event.superstep
            )
        })
    }
}

impl Logger for DrainPartitionEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &DrainPartitionEvent| {
            log::debug!(
                "{}, {}, {}, {}",
                DRAIN_PARTITION,
                secs_since_unix_epoch(event.timestamp),
                event.partition,
                event.superstep
            )
        })
    }
}

impl Logger for ForwardVertexEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &ForwardVertexEvent| {
            log::debug!(
                "{}, {}, {:?}, {}, {}",
                FORWARD_VERTEX,
                secs_since_unix_epoch(event.timestamp),
                event.vertex,
                event.superstep,
                event.message_count
            )
        })
    }
}

impl Logger for ComputeVertexEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &ComputeVertexEvent| {
            log::debug!(
                "{}, {}, {:?}, {}, {}, {}",
                COMPUTE_VERTEX,
                secs_since_unix_epoch(event.timestamp),
                event.vertex,
                event.superstep,
                event.updated_value,
                event.outgoing_count
            )
        })
    }
}

impl Logger for DispatchMessagesEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &DispatchMessagesEvent| {
            log::debug!(
                "{}, {}, {:?}, {}, {}",
                DISPATCH_MESSAGES,
                secs_since_unix_epoch(event.timestamp),
                event.src,
                event.superstep,
                event.message_count
            )
        })
    }
}

impl Logger for GarbageCollectEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        Box::new(|event: &GarbageCollectEvent| {
            log::trace!(
                "{}, {}, {}",
                GARBAGE_COLLECT,
                secs_since_unix_epoch(event.timestamp),
                event.superstep
            )
        })
    }
}

/// Number of whole seconds between the Unix epoch and `time`.
fn secs_since_unix_epoch(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
