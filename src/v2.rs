use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::{json, Value};

use crate::protocol::*;
use crate::sign::{sign_params, SIGN_KEY};
use crate::types::*;
use crate::{Error, Result};

pub const RESULT_TOKEN_EXPIRED: &str = "10003";

/// Current API: signed form-encoded POSTs wrapped in a `result_code` envelope.
pub struct V2Adapter {
    list_url: String,
    control_url: String,
}

impl V2Adapter {
    pub fn new(endpoints: &Endpoints) -> Self {
        Self {
            list_url: endpoints.v2_list.clone(),
            control_url: endpoints.v2_control.clone(),
        }
    }

    fn signed(&self, url: &str, mut params: BTreeMap<&'static str, String>, secret: &str) -> WireRequest {
        let sign = sign_params(&params, secret);
        params.insert(SIGN_KEY, sign);
        WireRequest {
            method: Method::POST,
            url: url.to_string(),
            params,
            encoding: ParamEncoding::Form,
            user_agent: None,
        }
    }
}

fn base_params(creds: &Credentials, timestamp: &str) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("app_key", creds.app_key.clone()),
        ("company_id", creds.company_id.clone()),
        ("imei", creds.imei.clone()),
        ("timestamp", timestamp.to_string()),
        ("token", creds.token.clone()),
    ])
}

pub(crate) fn control_data(command: &ControlCommand) -> String {
    json!({ "value": encoded_value(command) }).to_string()
}

fn result_code(body: &Value) -> Option<String> {
    match body.get("result_code")? {
        Value::String(code) => Some(code.clone()),
        Value::Number(code) => Some(code.to_string()),
        _ => None,
    }
}

fn check_token(body: &Value) -> Result<()> {
    if result_code(body).as_deref() == Some(RESULT_TOKEN_EXPIRED) {
        return Err(Error::TokenExpired);
    }
    Ok(())
}

impl ProtocolAdapter for V2Adapter {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V2
    }

    fn list_request_at(&self, creds: &Credentials, timestamp: &str) -> WireRequest {
        self.signed(&self.list_url, base_params(creds, timestamp), &creds.app_secret)
    }

    fn control_request_at(
        &self,
        creds: &Credentials,
        device_id: &str,
        command: &ControlCommand,
        timestamp: &str,
    ) -> WireRequest {
        let mut params = base_params(creds, timestamp);
        params.insert("control_data", control_data(command));
        params.insert("device_id", device_id.to_string());
        params.insert("sensor_id", command_sensor_id(command).to_string());
        params.insert("sensor_type", SENSOR_TYPE.to_string());
        self.signed(&self.control_url, params, &creds.app_secret)
    }

    fn find_device<'a>(&self, body: &'a Value, device_id: &str) -> Result<&'a Value> {
        check_token(body)?;
        let devices = body
            .pointer("/result_data/0/devices")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "missing result_data devices (result_code {})",
                    result_code(body).unwrap_or_else(|| "absent".to_string())
                ))
            })?;
        find_by_id(devices, device_id).ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))
    }

    fn check_control_response(&self, body: &Value) -> Result<()> {
        check_token(body)
    }

    fn status_field(&self) -> &'static str {
        "s00"
    }

    fn refreshes_after(&self, capability: Capability) -> bool {
        matches!(capability, Capability::OnOff | Capability::Mode | Capability::Away)
    }
}
