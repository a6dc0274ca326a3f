use std::collections::BTreeMap;

use reqwest::Method;
use serde_json::Value;

use crate::protocol::*;
use crate::types::*;
use crate::{Error, Result};

/// Legacy API: positional query strings, no signature, fixed User-Agent.
pub struct V1Adapter {
    list_url: String,
    control_url: String,
    user_agent: String,
}

impl V1Adapter {
    pub fn new(endpoints: &Endpoints) -> Self {
        Self {
            list_url: endpoints.v1_list.clone(),
            control_url: endpoints.v1_control.clone(),
            user_agent: endpoints.user_agent.clone(),
        }
    }
}

/// `{%22value%22:%22<value>%22}`, with temperatures padded to four characters.
pub(crate) fn control_data(command: &ControlCommand) -> String {
    let value = match command {
        ControlCommand::TargetTemperature(_) => format!("{:0>4}", encoded_value(command)),
        _ => encoded_value(command),
    };
    format!("{{%22value%22:%22{value}%22}}")
}

impl ProtocolAdapter for V1Adapter {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1
    }

    fn list_request_at(&self, creds: &Credentials, timestamp: &str) -> WireRequest {
        let params = BTreeMap::from([
            ("format", "json".to_string()),
            ("timestamp", timestamp.to_string()),
            ("token", creds.token.clone()),
        ]);
        WireRequest {
            method: Method::GET,
            url: format!(
                "{}?format=json&timestamp={timestamp}&token={}",
                self.list_url, creds.token
            ),
            params,
            encoding: ParamEncoding::Query,
            user_agent: Some(self.user_agent.clone()),
        }
    }

    fn control_request_at(
        &self,
        creds: &Credentials,
        device_id: &str,
        command: &ControlCommand,
        timestamp: &str,
    ) -> WireRequest {
        let control_data = control_data(command);
        let sensor_id = command_sensor_id(command);
        let url = format!(
            "{}?control_data={control_data}&device_id={device_id}&format=json\
             &sensor_id={sensor_id}&sensor_type={SENSOR_TYPE}&timestamp={timestamp}&token={}",
            self.control_url, creds.token
        );
        let params = BTreeMap::from([
            ("control_data", control_data),
            ("device_id", device_id.to_string()),
            ("format", "json".to_string()),
            ("sensor_id", sensor_id.to_string()),
            ("sensor_type", SENSOR_TYPE.to_string()),
            ("timestamp", timestamp.to_string()),
            ("token", creds.token.clone()),
        ]);
        WireRequest {
            method: Method::POST,
            url,
            params,
            encoding: ParamEncoding::Query,
            user_agent: Some(self.user_agent.clone()),
        }
    }

    fn find_device<'a>(&self, body: &'a Value, device_id: &str) -> Result<&'a Value> {
        let devices = body
            .as_array()
            .ok_or_else(|| Error::Protocol("v1 device list is not an array".to_string()))?;
        find_by_id(devices, device_id).ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))
    }

    fn check_control_response(&self, _body: &Value) -> Result<()> {
        Ok(())
    }

    fn status_field(&self) -> &'static str {
        "status"
    }

    fn refreshes_after(&self, _capability: Capability) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn creds() -> Credentials {
        Credentials {
            token: "tok123".to_string(),
            imei: "860000000000001".to_string(),
            app_key: "key".to_string(),
            app_secret: "secret".to_string(),
            company_id: "1000".to_string(),
        }
    }

    fn adapter() -> V1Adapter {
        V1Adapter::new(&Endpoints::with_base("http://host"))
    }

    fn temp(c: f64) -> ControlCommand {
        ControlCommand::TargetTemperature(Temperature::from_celsius(c))
    }

    #[test]
    fn temperature_padded_to_four() {
        assert_eq!(control_data(&temp(5.0)), "{%22value%22:%2205.0%22}");
        assert_eq!(control_data(&temp(21.5)), "{%22value%22:%2221.5%22}");
    }

    #[test]
    fn exact_halves_round_before_padding() {
        assert_eq!(control_data(&temp(21.25)), "{%22value%22:%2221.3%22}");
        assert_eq!(control_data(&temp(5.25)), "{%22value%22:%2205.3%22}");
        assert_eq!(control_data(&temp(0.25)), "{%22value%22:%2200.3%22}");
    }

    #[test]
    fn flags_and_mode_unpadded() {
        assert_eq!(control_data(&ControlCommand::OnOff(true)), "{%22value%22:%221%22}");
        assert_eq!(control_data(&ControlCommand::Away(false)), "{%22value%22:%220%22}");
        assert_eq!(
            control_data(&ControlCommand::Mode(Mode::Auto)),
            "{%22value%22:%221%22}"
        );
    }

    #[test]
    fn list_request_is_get_with_query() {
        let req = adapter().list_request_at(&creds(), "2024-01-01 10:00:00");
        assert_eq!(req.method, Method::GET);
        assert_eq!(
            req.url,
            "http://host/v1.0/devices/list?format=json&timestamp=2024-01-01 10:00:00&token=tok123"
        );
        assert_eq!(req.encoding, ParamEncoding::Query);
        assert_eq!(req.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
        assert!(!req.params.contains_key("sign"));
    }

    #[test]
    fn control_request_field_order() {
        let req = adapter().control_request_at(&creds(), "dev1", &temp(5.0), "TS");
        assert_eq!(req.method, Method::POST);
        assert_eq!(
            req.url,
            "http://host/v1.0/sensors/control?control_data={%22value%22:%2205.0%22}\
             &device_id=dev1&format=json&sensor_id=2&sensor_type=1&timestamp=TS&token=tok123"
        );
    }

    #[test]
    fn find_device_in_array() {
        let body = json!([{"id": "a", "online": 1, "status": ""}, {"id": "b"}]);
        assert_eq!(adapter().find_device(&body, "b").unwrap()["id"], "b");
        assert!(matches!(
            adapter().find_device(&body, "zzz"),
            Err(Error::DeviceNotFound(id)) if id == "zzz"
        ));
        assert!(matches!(
            adapter().find_device(&json!({"devices": []}), "a"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn never_refreshes_after_write() {
        for cap in [Capability::OnOff, Capability::Mode, Capability::Away, Capability::TargetTemperature] {
            assert!(!adapter().refreshes_after(cap));
        }
    }
}
