//! DHCP relay bookkeeping: what the relay learned about each client host.

mod record;
mod store;

pub use record::*;
pub use store::*;

#[cfg(test)]
mod dhcp_relay_test;

use crate::event::Event;
use crate::utils::time::get_now_as_millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DhcpRelayEventType {
    Updated,
    Removed,
}

/// Record change. For removals the subject is the record that was removed.
#[derive(Debug, Clone, PartialEq)]
pub struct DhcpRelayEvent {
    event_type: DhcpRelayEventType,
    record: DhcpRecord,
    time: u64,
}

impl DhcpRelayEvent {
    pub fn new(
        event_type: DhcpRelayEventType,
        record: DhcpRecord,
    ) -> Self {
        Self {
            event_type,
            record,
            time: get_now_as_millis(),
        }
    }
}

impl Event for DhcpRelayEvent {
    type Type = DhcpRelayEventType;
    type Subject = DhcpRecord;

    fn event_type(&self) -> DhcpRelayEventType {
        self.event_type
    }

    fn subject(&self) -> &DhcpRecord {
        &self.record
    }

    fn time(&self) -> u64 {
        self.time
    }
}
