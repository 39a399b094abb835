//! In-order event delivery.
//!
//! Producers [`post`](EventDispatcher::post) events from any thread. A single
//! dispatch loop thread drains the queue in FIFO order and hands each event to
//! the one sink registered for its concrete type. A watchdog replaces the loop
//! when a sink overstays its processing limit.

mod delegate;
mod dispatcher;
mod listener;
mod sink;

pub use delegate::*;
pub use dispatcher::*;
pub use listener::*;
pub use sink::*;

#[cfg(test)]
mod dispatcher_test;

use std::fmt::Debug;

use crate::utils::time::get_now_as_millis;

/// An event describing something that happened to a subject.
pub trait Event: Debug + Send + Sync + 'static {
    type Type: Copy + Debug + PartialEq + Send + Sync + 'static;
    type Subject: Debug + Send + Sync + 'static;

    fn event_type(&self) -> Self::Type;

    fn subject(&self) -> &Self::Subject;

    /// Milliseconds since the epoch at which the event occurred
    fn time(&self) -> u64;
}

/// Plain `(type, subject, time)` event used by stores that carry nothing else.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent<T, S> {
    event_type: T,
    subject: S,
    time: u64,
}

impl<T, S> StoreEvent<T, S> {
    pub fn new(
        event_type: T,
        subject: S,
    ) -> Self {
        Self::with_time(event_type, subject, get_now_as_millis())
    }

    pub fn with_time(
        event_type: T,
        subject: S,
        time: u64,
    ) -> Self {
        Self {
            event_type,
            subject,
            time,
        }
    }

    pub fn into_subject(self) -> S {
        self.subject
    }
}

impl<T, S> Event for StoreEvent<T, S>
where
    T: Copy + Debug + PartialEq + Send + Sync + 'static,
    S: Debug + Send + Sync + 'static,
{
    type Type = T;
    type Subject = S;

    fn event_type(&self) -> T {
        self.event_type
    }

    fn subject(&self) -> &S {
        &self.subject
    }

    fn time(&self) -> u64 {
        self.time
    }
}
