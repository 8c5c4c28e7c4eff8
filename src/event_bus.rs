/*
    Copyright © 2026, the pregel_rs authors
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Thread that receives events emitted by the worker tasks and passes them to event handlers.
//!
//! When the thread receives a message containing an [event](crate::events::Event), it triggers
//! the execution of all handlers defined for the contained event type, where the handlers for
//! each event type are stored in [`EventHandlers`].
//!
//! When no handlers are present in a worker's instance of `EventHandlers` this thread is not
//! started.

use std::{
    sync::mpsc::{Receiver, TryRecvError},
    thread,
    thread::JoinHandle,
};

use crate::{events::*, logging::Logger};

/// Pointer to a handler closure, parametrised by the argument (for our use case, event) type.
pub type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// The optional user-defined handlers, one slot per event type. Pass an instance to
/// [`prepare`](crate::computation::PregelComputation::prepare);
/// [`UserEventHandlers::default`] installs none.
#[derive(Default)]
pub struct UserEventHandlers {
    pub start_computation: Option<HandlerPtr<StartComputationEvent>>,
    pub advance_state: Option<HandlerPtr<AdvanceStateEvent>>,
    pub complete_computation: Option<HandlerPtr<CompleteComputationEvent>>,
    pub signal_receive_ready: Option<HandlerPtr<SignalReceiveReadyEvent>>,
    pub signal_send_complete: Option<HandlerPtr<SignalSendCompleteEvent>>,
    pub activate_partition: Option<HandlerPtr<ActivatePartitionEvent>>,
    pub drain_partition: Option<HandlerPtr<DrainPartitionEvent>>,
    pub forward_vertex: Option<HandlerPtr<ForwardVertexEvent>>,
    pub compute_vertex: Option<HandlerPtr<ComputeVertexEvent>>,
    pub dispatch_messages: Option<HandlerPtr<DispatchMessagesEvent>>,
    pub garbage_collect: Option<HandlerPtr<GarbageCollectEvent>>,
}

/// Stores the two optional handlers enabled for an event type that implements the [`Logger`]
/// trait, namely one logging handler, defined in [`logging`](crate::logging), and one
/// user-defined handler.
pub(crate) struct HandlerPair<T: Logger> {
    user_defined_handler: Option<HandlerPtr<T>>,
    logging_handler: Option<HandlerPtr<T>>,
}

impl<T: Logger> HandlerPair<T> {
    /// Creates a new `HandlerPair` with the user-defined handler, and the default logging
    /// handler if logging is enabled.
    fn new(log: bool, user_defined_handler: Option<HandlerPtr<T>>) -> HandlerPair<T> {
        HandlerPair {
            user_defined_handler,
            logging_handler: if log { Some(T::get_logger()) } else { None },
        }
    }

    // Checks if no event handlers are defined for this event.
    fn is_empty(&self) -> bool {
        self.user_defined_handler.is_none() && self.logging_handler.is_none()
    }

    fn handle(&self, event: &T) {
        if let Some(handler) = &self.logging_handler {
            handler(event)
        }
        if let Some(handler) = &self.user_defined_handler {
            handler(event)
        }
    }
}

/// Stores the `HandlerPair` of user-defined and optional logging handlers for each pre-defined
/// event type from [events](crate::events).
pub(crate) struct EventHandlers {
    start_computation_handlers: HandlerPair<StartComputationEvent>,
    advance_state_handlers: HandlerPair<AdvanceStateEvent>,
    complete_computation_handlers: HandlerPair<CompleteComputationEvent>,
    signal_receive_ready_handlers: HandlerPair<SignalReceiveReadyEvent>,
    signal_send_complete_handlers: HandlerPair<SignalSendCompleteEvent>,
    activate_partition_handlers: HandlerPair<ActivatePartitionEvent>,
    drain_partition_handlers: HandlerPair<DrainPartitionEvent>,
    forward_vertex_handlers: HandlerPair<ForwardVertexEvent>,
    compute_vertex_handlers: HandlerPair<ComputeVertexEvent>,
    dispatch_messages_handlers: HandlerPair<DispatchMessagesEvent>,
    garbage_collect_handlers: HandlerPair<GarbageCollectEvent>,
}

impl EventHandlers {
    /// Creates the [handler pairs](HandlerPair) for all pre-defined event types given the
    /// user-defined handlers, and information on whether logging is enabled.
    pub(crate) fn new(log: bool, user: UserEventHandlers) -> EventHandlers {
        EventHandlers {
            start_computation_handlers: HandlerPair::new(log, user.start_computation),
            advance_state_handlers: HandlerPair::new(log, user.advance_state),
            complete_computation_handlers: HandlerPair::new(log, user.complete_computation),
            signal_receive_ready_handlers: HandlerPair::new(log, user.signal_receive_ready),
            signal_send_complete_handlers: HandlerPair::new(log, user.signal_send_complete),
            activate_partition_handlers: HandlerPair::new(log, user.activate_partition),
            drain_partition_handlers: HandlerPair::new(log, user.drain_partition),
            forward_vertex_handlers: HandlerPair::new(log, user.forward_vertex),
            compute_vertex_handlers: HandlerPair::new(log, user.compute_vertex),
            dispatch_messages_handlers: HandlerPair::new(log, user.dispatch_messages),
            garbage_collect_handlers: HandlerPair::new(log, user.garbage_collect),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.start_computation_handlers.is_empty()
            && self.advance_state_handlers.is_empty()
            && self.complete_computation_handlers.is_empty()
            && self.signal_receive_ready_handlers.is_empty()
            && self.signal_send_complete_handlers.is_empty()
            && self.activate_partition_handlers.is_empty()
            && self.drain_partition_handlers.is_empty()
            && self.forward_vertex_handlers.is_empty()
            && self.compute_vertex_handlers.is_empty()
            && self.dispatch_messages_handlers.is_empty()
            && self.garbage_collect_handlers.is_empty()
    }

    fn handle(&self, event: &Event) {
        match event {
            Event::StartComputation(e) => self.start_computation_handlers.handle(e),
            Event::AdvanceState(e) => self.advance_state_handlers.handle(e),
            Event::CompleteComputation(e) => self.complete_computation_handlers.handle(e),
            Event::SignalReceiveReady(e) => self.signal_receive_ready_handlers.handle(e),
            Event::SignalSendComplete(e) => self.signal_send_complete_handlers.handle(e),
            Event::ActivatePartition(e) => self.activate_partition_handlers.handle(e),
            Event::DrainPartition(e) => self.drain_partition_handlers.handle(e),
            Event::ForwardVertex(e) => self.forward_vertex_handlers.handle(e),
            Event::ComputeVertex(e) => self.compute_vertex_handlers.handle(e),
            Event::DispatchMessages(e) => self.dispatch_messages_handlers.handle(e),
            Event::GarbageCollect(e) => self.garbage_collect_handlers.handle(e),
        }
    }
}

/// Spawn the event bus thread. It drains the subscriber channel, dispatching each event to its
/// handlers, until it receives a shutdown signal; remaining queued events are handled before it
/// exits.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) => {
                while let Ok(event) = event_subscriber.try_recv() {
                    event_handlers.handle(&event);
                }
                return;
            }
            Err(TryRecvError::Empty) => (),
            Err(TryRecvError::Disconnected) => {
                panic!("Event bus thread disconnected from main thread")
            }
        }

        match event_subscriber.try_recv() {
            Ok(event) => event_handlers.handle(&event),
            Err(TryRecvError::Empty) => thread::yield_now(),
            // All event publishers have exited; nothing more can arrive.
            Err(TryRecvError::Disconnected) => return,
        }
    })
}
