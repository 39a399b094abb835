use serde::Deserialize;
use serde::Serialize;

use super::PortNumber;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OduSignalType {
    Odu0,
    Odu1,
    Odu2,
    Odu2e,
    Odu3,
    Odu4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CltSignalType {
    Clt1GbE,
    Clt10GbE,
    Clt40GbE,
    Clt100GbE,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OtuSignalType {
    Otu2,
    Otu4,
}

/// Flexible or fixed grid optical channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OchSignal {
    pub spacing_ghz: u32,
    pub spacing_multiplier: i32,
    pub slot_granularity: u32,
}

/// Port flavour, resolved once when the port is described.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    Copper,
    Fiber,
    Packet,
    Virtual,
    Och {
        signal_type: OduSignalType,
        tunable: bool,
        lambda: OchSignal,
    },
    OduClt {
        signal_type: CltSignalType,
    },
    Oms {
        min_frequency_mhz: u64,
        max_frequency_mhz: u64,
        grid_mhz: u64,
        total_channels: u16,
    },
    Otu {
        signal_type: OtuSignalType,
    },
}

impl PortKind {
    pub fn is_optical(&self) -> bool {
        matches!(
            self,
            PortKind::Och { .. } | PortKind::OduClt { .. } | PortKind::Oms { .. } | PortKind::Otu { .. }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Port {
    number: PortNumber,
    enabled: bool,
    speed_mbps: u64,
    kind: PortKind,
}

impl Port {
    pub fn new(
        number: PortNumber,
        enabled: bool,
        speed_mbps: u64,
        kind: PortKind,
    ) -> Self {
        Self {
            number,
            enabled,
            speed_mbps,
            kind,
        }
    }

    pub fn copper(number: PortNumber) -> Self {
        Self::new(number, true, 1_000, PortKind::Copper)
    }

    pub fn number(&self) -> PortNumber {
        self.number
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn speed_mbps(&self) -> u64 {
        self.speed_mbps
    }

    pub fn kind(&self) -> &PortKind {
        &self.kind
    }
}
