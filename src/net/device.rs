use serde::Deserialize;
use serde::Serialize;

use super::DeviceId;
use super::ProviderId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Switch,
    Router,
    Roadm,
    Otn,
    RoadmOtn,
    Firewall,
    Balancer,
    Ips,
    Ids,
    Controller,
    Virtual,
    Fiber,
    Microwave,
    Other,
}

/// Infrastructure device.
///
/// Immutable once built; an updated description replaces the whole value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    id: DeviceId,
    device_type: DeviceType,
    provider_id: ProviderId,
    manufacturer: String,
    hw_version: String,
    sw_version: String,
    serial_number: String,
    chassis_id: Option<String>,
}

impl Device {
    pub fn new(id: DeviceId) -> Self {
        DeviceBuilder::new(id).build()
    }

    pub fn builder(id: DeviceId) -> DeviceBuilder {
        DeviceBuilder::new(id)
    }

    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn provider_id(&self) -> &ProviderId {
        &self.provider_id
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn hw_version(&self) -> &str {
        &self.hw_version
    }

    pub fn sw_version(&self) -> &str {
        &self.sw_version
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn chassis_id(&self) -> Option<&str> {
        self.chassis_id.as_deref()
    }
}

#[derive(Debug)]
pub struct DeviceBuilder {
    id: DeviceId,
    device_type: DeviceType,
    provider_id: ProviderId,
    manufacturer: String,
    hw_version: String,
    sw_version: String,
    serial_number: String,
    chassis_id: Option<String>,
}

impl DeviceBuilder {
    pub fn new(id: DeviceId) -> Self {
        Self {
            id,
            device_type: DeviceType::Switch,
            provider_id: ProviderId::core(),
            manufacturer: String::new(),
            hw_version: String::new(),
            sw_version: String::new(),
            serial_number: String::new(),
            chassis_id: None,
        }
    }

    pub fn device_type(
        mut self,
        device_type: DeviceType,
    ) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn provider_id(
        mut self,
        provider_id: ProviderId,
    ) -> Self {
        self.provider_id = provider_id;
        self
    }

    pub fn manufacturer(
        mut self,
        manufacturer: impl Into<String>,
    ) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    pub fn hw_version(
        mut self,
        hw_version: impl Into<String>,
    ) -> Self {
        self.hw_version = hw_version.into();
        self
    }

    pub fn sw_version(
        mut self,
        sw_version: impl Into<String>,
    ) -> Self {
        self.sw_version = sw_version.into();
        self
    }

    pub fn serial_number(
        mut self,
        serial_number: impl Into<String>,
    ) -> Self {
        self.serial_number = serial_number.into();
        self
    }

    pub fn chassis_id(
        mut self,
        chassis_id: impl Into<String>,
    ) -> Self {
        self.chassis_id = Some(chassis_id.into());
        self
    }

    pub fn build(self) -> Device {
        Device {
            id: self.id,
            device_type: self.device_type,
            provider_id: self.provider_id,
            manufacturer: self.manufacturer,
            hw_version: self.hw_version,
            sw_version: self.sw_version,
            serial_number: self.serial_number,
            chassis_id: self.chassis_id,
        }
    }
}
