//! Multicast routes with their sources and sinks.

mod store;

pub use store::*;

#[cfg(test)]
mod mcast_test;

use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;

use crate::event::Event;
use crate::net::ConnectPoint;
use crate::utils::time::get_now_as_millis;

/// How a route came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum McastRouteType {
    Igmp,
    Pim,
    Static,
}

/// A multicast route, `(S, G)` or `(*, G)` when `source` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct McastRoute {
    source: Option<IpAddr>,
    group: IpAddr,
    route_type: McastRouteType,
}

impl McastRoute {
    pub fn new(
        source: Option<IpAddr>,
        group: IpAddr,
        route_type: McastRouteType,
    ) -> Self {
        Self {
            source,
            group,
            route_type,
        }
    }

    pub fn source(&self) -> Option<IpAddr> {
        self.source
    }

    pub fn group(&self) -> IpAddr {
        self.group
    }

    pub fn route_type(&self) -> McastRouteType {
        self.route_type
    }
}

impl fmt::Display for McastRoute {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.source {
            Some(source) => write!(f, "({source}, {})", self.group),
            None => write!(f, "(*, {})", self.group),
        }
    }
}

/// Ingress and egress points of one route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct McastRouteData {
    sources: BTreeSet<ConnectPoint>,
    sinks: BTreeSet<ConnectPoint>,
}

impl McastRouteData {
    pub fn sources(&self) -> &BTreeSet<ConnectPoint> {
        &self.sources
    }

    pub fn sinks(&self) -> &BTreeSet<ConnectPoint> {
        &self.sinks
    }
}

/// Route state carried by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McastRouteUpdate {
    route: McastRoute,
    data: McastRouteData,
}

impl McastRouteUpdate {
    pub fn new(
        route: McastRoute,
        data: McastRouteData,
    ) -> Self {
        Self { route, data }
    }

    pub fn route(&self) -> &McastRoute {
        &self.route
    }

    pub fn sources(&self) -> &BTreeSet<ConnectPoint> {
        self.data.sources()
    }

    pub fn sinks(&self) -> &BTreeSet<ConnectPoint> {
        self.data.sinks()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum McastEventType {
    RouteAdded,
    RouteRemoved,
    SourcesAdded,
    SourcesRemoved,
    SinksAdded,
    SinksRemoved,
}

/// A route change. `previous` holds the route state before the change and
/// is absent for [`McastEventType::RouteAdded`].
#[derive(Debug, Clone, PartialEq)]
pub struct McastEvent {
    event_type: McastEventType,
    subject: McastRouteUpdate,
    previous: Option<McastRouteUpdate>,
    time: u64,
}

impl McastEvent {
    pub fn new(
        event_type: McastEventType,
        subject: McastRouteUpdate,
        previous: Option<McastRouteUpdate>,
    ) -> Self {
        Self {
            event_type,
            subject,
            previous,
            time: get_now_as_millis(),
        }
    }

    pub fn previous(&self) -> Option<&McastRouteUpdate> {
        self.previous.as_ref()
    }
}

impl Event for McastEvent {
    type Type = McastEventType;
    type Subject = McastRouteUpdate;

    fn event_type(&self) -> McastEventType {
        self.event_type
    }

    fn subject(&self) -> &McastRouteUpdate {
        &self.subject
    }

    fn time(&self) -> u64 {
        self.time
    }
}
