use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Opaque device identity, usually a URI such as `of:0000000000000001`.
///
/// Ordering is the natural ordering of the identifier string; cluster roots
/// are chosen with it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for DeviceId {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortNumber(u64);

impl PortNumber {
    pub const fn new(number: u64) -> Self {
        Self(number)
    }

    pub const fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PortNumber {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PortNumber {
    fn from(number: u64) -> Self {
        Self(number)
    }
}

/// A (device, port) pair identifying a link or flow endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectPoint {
    device_id: DeviceId,
    port: PortNumber,
}

impl ConnectPoint {
    pub fn new(
        device_id: DeviceId,
        port: PortNumber,
    ) -> Self {
        Self { device_id, port }
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn port(&self) -> PortNumber {
        self.port
    }
}

impl fmt::Display for ConnectPoint {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}", self.device_id, self.port)
    }
}

/// Identity of the provider that reported a model object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProviderId {
    scheme: String,
    id: String,
}

impl ProviderId {
    pub fn new(
        scheme: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    /// Provider id used for objects computed by the core itself.
    pub fn core() -> Self {
        Self::new("core", "topocore.core")
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for ProviderId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.id)
    }
}

/// End-station identity (`mac/vlan`).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostId(String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_mac_vlan(
        mac: &str,
        vlan: Option<u16>,
    ) -> Self {
        match vlan {
            Some(vlan) => Self(format!("{}/{}", mac.to_ascii_uppercase(), vlan)),
            None => Self(format!("{}/None", mac.to_ascii_uppercase())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 0-based index of a topology cluster within one topology snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(usize);

impl ClusterId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
