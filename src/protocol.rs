use std::collections::BTreeMap;

use chrono::Local;
use reqwest::Method;
use serde_json::Value;

use crate::status::{decode_status, is_online};
use crate::types::*;
use crate::Result;

pub const DEFAULT_BASE_URL: &str = "https://api.scinan.com";
pub const DEFAULT_USER_AGENT: &str = "Scinan/2.1 (Linux; Android)";
pub const SENSOR_TYPE: &str = "1";

pub const SENSOR_ON_OFF: &str = "1";
pub const SENSOR_TARGET_TEMPERATURE: &str = "2";
pub const SENSOR_AWAY: &str = "3";
pub const SENSOR_MODE: &str = "12";

const V1_LIST_PATH: &str = "/v1.0/devices/list";
const V1_CONTROL_PATH: &str = "/v1.0/sensors/control";
const V2_LIST_PATH: &str = "/v2.0/device/list";
const V2_CONTROL_PATH: &str = "/v2.0/sensor/control";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub v1_list: String,
    pub v1_control: String,
    pub v2_list: String,
    pub v2_control: String,
    pub user_agent: String,
}

impl Endpoints {
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            v1_list: format!("{base}{V1_LIST_PATH}"),
            v1_control: format!("{base}{V1_CONTROL_PATH}"),
            v2_list: format!("{base}{V2_LIST_PATH}"),
            v2_control: format!("{base}{V2_CONTROL_PATH}"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::with_base(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamEncoding {
    /// Parameters are already part of `url`.
    Query,
    /// Parameters travel as an `application/x-www-form-urlencoded` body.
    Form,
}

/// A fully built, signed request ready for the transport.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub url: String,
    pub params: BTreeMap<&'static str, String>,
    pub encoding: ParamEncoding,
    pub user_agent: Option<String>,
}

/// Version-specific request building and response decoding.
pub trait ProtocolAdapter: Send + Sync {
    fn version(&self) -> ProtocolVersion;

    fn list_request_at(&self, creds: &Credentials, timestamp: &str) -> WireRequest;

    fn control_request_at(
        &self,
        creds: &Credentials,
        device_id: &str,
        command: &ControlCommand,
        timestamp: &str,
    ) -> WireRequest;

    /// Picks the device record out of a list response.
    fn find_device<'a>(&self, body: &'a Value, device_id: &str) -> Result<&'a Value>;

    /// Checks a control response body for vendor-level failures.
    fn check_control_response(&self, body: &Value) -> Result<()>;

    /// Name of the field carrying the raw status blob in a device record.
    fn status_field(&self) -> &'static str;

    /// Whether a successful write of `capability` is followed by a refresh.
    fn refreshes_after(&self, capability: Capability) -> bool;

    fn build_list_request(&self, creds: &Credentials) -> WireRequest {
        self.list_request_at(creds, &timestamp())
    }

    fn build_control_request(
        &self,
        creds: &Credentials,
        device_id: &str,
        command: &ControlCommand,
    ) -> WireRequest {
        self.control_request_at(creds, device_id, command, &timestamp())
    }

    fn decode_device(&self, record: &Value) -> Result<DeviceState> {
        let raw = record
            .get(self.status_field())
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                crate::Error::MalformedStatus(format!("missing `{}` field", self.status_field()))
            })?;
        let decoded = decode_status(raw)?;
        Ok(decoded.with_online(is_online(record.get("online"))))
    }
}

pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Value string shared by both protocol versions.
pub(crate) fn encoded_value(command: &ControlCommand) -> String {
    match command {
        ControlCommand::OnOff(on) | ControlCommand::Away(on) => bool_flag(*on).to_string(),
        ControlCommand::TargetTemperature(t) => t.to_fixed1(),
        ControlCommand::Mode(mode) => mode.to_value().to_string(),
    }
}

pub(crate) fn command_sensor_id(command: &ControlCommand) -> &'static str {
    match command {
        ControlCommand::OnOff(_) => SENSOR_ON_OFF,
        ControlCommand::TargetTemperature(_) => SENSOR_TARGET_TEMPERATURE,
        ControlCommand::Away(_) => SENSOR_AWAY,
        ControlCommand::Mode(_) => SENSOR_MODE,
    }
}

fn bool_flag(on: bool) -> &'static str {
    if on { "1" } else { "0" }
}

/// Device ids arrive as strings or numbers depending on the endpoint.
pub(crate) fn find_by_id<'a>(devices: &'a [Value], device_id: &str) -> Option<&'a Value> {
    devices.iter().find(|dev| match dev.get("id") {
        Some(Value::String(id)) => id == device_id,
        Some(Value::Number(id)) => id.to_string() == device_id,
        _ => false,
    })
}
