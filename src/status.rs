use serde_json::Value;

use crate::types::*;
use crate::{Error, Result};

const FIELD_ONOFF: usize = 1;
const FIELD_MEASURE_TEMPERATURE: usize = 2;
const FIELD_TARGET_TEMPERATURE: usize = 3;
const FIELD_AWAY: usize = 5;
const FIELD_MODE: usize = 9;

/// Watts drawn per unit of the per-device `m2` setting while heating.
pub const DEFAULT_ENERGY_USAGE: f64 = 100.0;

/// Fields decoded from the raw status blob. Availability lives elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStatus {
    pub onoff: bool,
    pub target_temperature: Temperature,
    pub measure_temperature: Temperature,
    pub mode: ReportedMode,
    pub away: bool,
}

impl DecodedStatus {
    pub fn with_online(self, online: bool) -> DeviceState {
        DeviceState {
            onoff: self.onoff,
            target_temperature: self.target_temperature,
            measure_temperature: self.measure_temperature,
            mode: self.mode,
            away: self.away,
            online,
        }
    }
}

/// Decodes the comma-separated status string, e.g.
/// `1700000000,1,19.5,21.0,0,0,0,0,0,1`.
pub fn decode_status(raw: &str) -> Result<DecodedStatus> {
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();

    let onoff = parse_flag(field(&fields, FIELD_ONOFF, "onoff")?, "onoff")?;
    let measure =
        parse_temperature(field(&fields, FIELD_MEASURE_TEMPERATURE, "measure_temperature")?)?;
    let target =
        parse_temperature(field(&fields, FIELD_TARGET_TEMPERATURE, "target_temperature")?)?;
    let away = parse_flag(field(&fields, FIELD_AWAY, "away")?, "away")?;
    let mode_raw = field(&fields, FIELD_MODE, "mode")?;
    let mode: i64 = mode_raw
        .parse()
        .map_err(|_| Error::MalformedStatus(format!("mode is not an integer: {mode_raw:?}")))?;

    Ok(DecodedStatus {
        onoff,
        target_temperature: target,
        measure_temperature: measure,
        mode: ReportedMode::from(mode),
        away,
    })
}

fn field<'a>(fields: &[&'a str], idx: usize, name: &str) -> Result<&'a str> {
    fields
        .get(idx)
        .copied()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| Error::MalformedStatus(format!("missing {name} (field {idx})")))
}

fn parse_flag(value: &str, name: &str) -> Result<bool> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(Error::MalformedStatus(format!("{name} flag not 0/1: {other:?}"))),
    }
}

fn parse_temperature(value: &str) -> Result<Temperature> {
    value
        .parse::<f64>()
        .ok()
        .filter(|c| c.is_finite())
        .map(Temperature::from_celsius)
        .ok_or_else(|| Error::MalformedStatus(format!("temperature not a number: {value:?}")))
}

/// v2 reports `online` as `"1"`, v1 as `1`; either form counts.
pub fn is_online(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(s)) => s.trim() == "1",
        Some(Value::Number(n)) => n.as_i64() == Some(1) || n.as_f64() == Some(1.0),
        Some(Value::Bool(b)) => *b,
        _ => false,
    }
}

pub fn measure_power(onoff: bool, coefficient: f64, energy_usage: f64) -> f64 {
    if onoff { energy_usage * coefficient } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_all_fields() {
        let s = decode_status("1700000000,1,19.5,21.0,0,1,0,0,0,2").unwrap();
        assert!(s.onoff);
        assert_eq!(s.measure_temperature.celsius(), 19.5);
        assert_eq!(s.target_temperature.celsius(), 21.0);
        assert!(s.away);
        assert_eq!(s.mode, ReportedMode::Known(Mode::DayOrNight));
    }

    #[test]
    fn out_of_range_mode_is_unknown() {
        let s = decode_status("0,0,18.0,20.0,0,0,0,0,0,7").unwrap();
        assert_eq!(s.mode, ReportedMode::Unknown(7));
        let s = decode_status("0,0,18.0,20.0,0,0,0,0,0,-1").unwrap();
        assert_eq!(s.mode, ReportedMode::Unknown(-1));
    }

    #[test]
    fn truncated_status_is_malformed() {
        let err = decode_status("0,1,19.5,21.0").unwrap_err();
        assert!(matches!(err, Error::MalformedStatus(ref msg) if msg.contains("away")));
        assert!(matches!(decode_status(""), Err(Error::MalformedStatus(_))));
    }

    #[test]
    fn unparsable_fields_are_malformed() {
        assert!(matches!(
            decode_status("0,1,warm,21.0,0,0,0,0,0,1"),
            Err(Error::MalformedStatus(_))
        ));
        assert!(matches!(
            decode_status("0,yes,19.0,21.0,0,0,0,0,0,1"),
            Err(Error::MalformedStatus(_))
        ));
        assert!(matches!(
            decode_status("0,1,19.0,21.0,0,0,0,0,0,auto"),
            Err(Error::MalformedStatus(_))
        ));
    }

    #[test]
    fn online_flag_forms() {
        assert!(is_online(Some(&json!("1"))));
        assert!(is_online(Some(&json!(1))));
        assert!(!is_online(Some(&json!("0"))));
        assert!(!is_online(Some(&json!(0))));
        assert!(!is_online(None));
    }

    #[test]
    fn power_zero_when_off() {
        assert_eq!(measure_power(false, 12.0, DEFAULT_ENERGY_USAGE), 0.0);
        assert_eq!(measure_power(false, 0.0, DEFAULT_ENERGY_USAGE), 0.0);
        assert_eq!(measure_power(true, 12.0, DEFAULT_ENERGY_USAGE), 1200.0);
        assert_eq!(measure_power(true, 2.5, 80.0), 200.0);
    }
}
