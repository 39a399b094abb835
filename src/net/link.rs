use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::ConnectPoint;
use super::ProviderId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkType {
    /// Directly connected ports
    Direct,
    /// Connected through an unmanaged segment (e.g. a legacy L2 cloud)
    Indirect,
    /// Device to host or to a remote domain
    Edge,
    Tunnel,
    Optical,
    Virtual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    Active,
    Inactive,
}

/// Identity of a directional link.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey {
    pub src: ConnectPoint,
    pub dst: ConnectPoint,
}

impl fmt::Display for LinkKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} -> {}", self.src, self.dst)
    }
}

/// Directional infrastructure link. A bidirectional connection is two links.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    src: ConnectPoint,
    dst: ConnectPoint,
    link_type: LinkType,
    state: LinkState,
    provider_id: ProviderId,
}

impl Link {
    pub fn new(
        src: ConnectPoint,
        dst: ConnectPoint,
        link_type: LinkType,
        provider_id: ProviderId,
    ) -> Self {
        Self {
            src,
            dst,
            link_type,
            state: LinkState::Active,
            provider_id,
        }
    }

    pub fn direct(
        src: ConnectPoint,
        dst: ConnectPoint,
    ) -> Self {
        Self::new(src, dst, LinkType::Direct, ProviderId::core())
    }

    pub fn with_state(
        mut self,
        state: LinkState,
    ) -> Self {
        self.state = state;
        self
    }

    pub fn src(&self) -> &ConnectPoint {
        &self.src
    }

    pub fn dst(&self) -> &ConnectPoint {
        &self.dst
    }

    pub fn link_type(&self) -> LinkType {
        self.link_type
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    pub fn key(&self) -> LinkKey {
        LinkKey {
            src: self.src.clone(),
            dst: self.dst.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == LinkState::Active
    }
}

impl fmt::Display for Link {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{} -> {} ({:?})", self.src, self.dst, self.link_type)
    }
}
