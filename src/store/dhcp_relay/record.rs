use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::net::Ipv6Addr;

use serde::Deserialize;
use serde::Serialize;

use crate::net::ConnectPoint;
use crate::net::HostId;
use crate::utils::time::get_now_as_millis;

/// DHCPv4 message type last seen for a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dhcp4State {
    Discover,
    Offer,
    Request,
    Decline,
    Ack,
    Nak,
    Release,
    Inform,
}

/// DHCPv6 message type last seen for a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dhcp6State {
    Solicit,
    Advertise,
    Request,
    Confirm,
    Renew,
    Rebind,
    Reply,
    Release,
    Decline,
    Reconfigure,
    InformationRequest,
}

/// Relay state of one DHCP client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DhcpRecord {
    host_id: HostId,
    mac: String,
    vlan: Option<u16>,
    /// Where the host was seen, with the time (ms) it was last seen there
    locations: BTreeMap<ConnectPoint, u64>,
    ip4: Option<Ipv4Addr>,
    ip4_status: Option<Dhcp4State>,
    ip6: Option<Ipv6Addr>,
    ip6_status: Option<Dhcp6State>,
    next_hop: Option<String>,
    next_hop_temp: Option<String>,
    directly_connected: bool,
    last_seen: u64,
}

impl DhcpRecord {
    pub fn new(
        mac: &str,
        vlan: Option<u16>,
    ) -> Self {
        Self {
            host_id: HostId::from_mac_vlan(mac, vlan),
            mac: mac.to_ascii_uppercase(),
            vlan,
            locations: BTreeMap::new(),
            ip4: None,
            ip4_status: None,
            ip6: None,
            ip6_status: None,
            next_hop: None,
            next_hop_temp: None,
            directly_connected: false,
            last_seen: get_now_as_millis(),
        }
    }

    pub fn host_id(&self) -> &HostId {
        &self.host_id
    }

    pub fn mac(&self) -> &str {
        &self.mac
    }

    pub fn vlan(&self) -> Option<u16> {
        self.vlan
    }

    pub fn locations(&self) -> impl Iterator<Item = &ConnectPoint> {
        self.locations.keys()
    }

    /// Records a sighting at `location`, refreshing its time.
    pub fn add_location(
        &mut self,
        location: ConnectPoint,
    ) -> &mut Self {
        self.locations.insert(location, get_now_as_millis());
        self
    }

    pub fn remove_location(
        &mut self,
        location: &ConnectPoint,
    ) -> &mut Self {
        self.locations.remove(location);
        self
    }

    pub fn ip4(&self) -> Option<Ipv4Addr> {
        self.ip4
    }

    pub fn set_ip4(
        &mut self,
        address: Ipv4Addr,
    ) -> &mut Self {
        self.ip4 = Some(address);
        self
    }

    pub fn ip4_status(&self) -> Option<Dhcp4State> {
        self.ip4_status
    }

    pub fn set_ip4_status(
        &mut self,
        status: Dhcp4State,
    ) -> &mut Self {
        self.ip4_status = Some(status);
        self
    }

    pub fn ip6(&self) -> Option<Ipv6Addr> {
        self.ip6
    }

    pub fn set_ip6(
        &mut self,
        address: Ipv6Addr,
    ) -> &mut Self {
        self.ip6 = Some(address);
        self
    }

    pub fn ip6_status(&self) -> Option<Dhcp6State> {
        self.ip6_status
    }

    pub fn set_ip6_status(
        &mut self,
        status: Dhcp6State,
    ) -> &mut Self {
        self.ip6_status = Some(status);
        self
    }

    /// Gateway MAC replies are sent through
    pub fn next_hop(&self) -> Option<&str> {
        self.next_hop.as_deref()
    }

    pub fn set_next_hop(
        &mut self,
        mac: &str,
    ) -> &mut Self {
        self.next_hop = Some(mac.to_ascii_uppercase());
        self
    }

    /// Gateway learned from an offer that has not been acknowledged yet
    pub fn next_hop_temp(&self) -> Option<&str> {
        self.next_hop_temp.as_deref()
    }

    pub fn set_next_hop_temp(
        &mut self,
        mac: &str,
    ) -> &mut Self {
        self.next_hop_temp = Some(mac.to_ascii_uppercase());
        self
    }

    pub fn is_directly_connected(&self) -> bool {
        self.directly_connected
    }

    pub fn set_directly_connected(
        &mut self,
        directly_connected: bool,
    ) -> &mut Self {
        self.directly_connected = directly_connected;
        self
    }

    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }

    pub fn update_last_seen(&mut self) -> &mut Self {
        self.last_seen = get_now_as_millis();
        self
    }
}
