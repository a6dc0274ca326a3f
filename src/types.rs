use std::fmt;

use serde::Deserialize;

use crate::{Error, Result};

/// Vendor API generation a device was onboarded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolVersion {
    V1,
    V2,
}

impl ProtocolVersion {
    pub fn from_setting(value: u8) -> Option<Self> {
        match value {
            1 => Some(ProtocolVersion::V1),
            2 => Some(ProtocolVersion::V2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRef {
    pub id: String,
    pub name: String,
    pub protocol_version: ProtocolVersion,
}

impl DeviceRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: ProtocolVersion) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            protocol_version: version,
        }
    }

    /// Builds the reference from the `apiVersion` stored at onboarding.
    pub fn from_settings(
        id: impl Into<String>,
        name: impl Into<String>,
        settings: &DeviceSettings,
    ) -> Result<Self> {
        Ok(Self::new(id, name, settings.protocol_version()?))
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub token: String,
    pub imei: String,
    pub app_key: String,
    pub app_secret: String,
    pub company_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("imei", &self.imei)
            .field("app_key", &self.app_key)
            .field("app_secret", &"<redacted>")
            .field("company_id", &self.company_id)
            .finish()
    }
}

/// Temperature in Celsius, reported and set with one decimal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f64);

impl Temperature {
    pub fn from_celsius(c: f64) -> Self {
        Self(c)
    }

    pub fn celsius(&self) -> f64 {
        self.0
    }

    /// One-decimal string as the vendor expects it, e.g. `21.5`.
    ///
    /// Exact halves (`21.25`) round away from zero; values that only look
    /// like halves in decimal (`0.15` is stored below it) round as stored.
    pub fn to_fixed1(&self) -> String {
        let quarters = self.0 * 4.0;
        if quarters.fract() == 0.0 && quarters % 2.0 != 0.0 {
            return format!("{:.1}", (self.0 * 10.0).round() / 10.0);
        }
        format!("{:.1}", self.0)
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}\u{00b0}C", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Comfort,
    Auto,
    DayOrNight,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Comfort, Mode::Auto, Mode::DayOrNight];

    pub fn to_value(&self) -> u8 {
        match self {
            Mode::Comfort => 0,
            Mode::Auto => 1,
            Mode::DayOrNight => 2,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Mode::Comfort),
            1 => Some(Mode::Auto),
            2 => Some(Mode::DayOrNight),
            _ => None,
        }
    }

    pub fn as_capability_str(&self) -> &'static str {
        match self {
            Mode::Comfort => "comfort",
            Mode::Auto => "auto",
            Mode::DayOrNight => "day_or_night",
        }
    }

    pub fn from_capability_str(s: &str) -> Option<Self> {
        match s {
            "comfort" => Some(Mode::Comfort),
            "auto" => Some(Mode::Auto),
            "day_or_night" => Some(Mode::DayOrNight),
            _ => None,
        }
    }
}

/// Mode as read back from the device. Raw values outside the known set are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedMode {
    Known(Mode),
    Unknown(i64),
}

impl From<i64> for ReportedMode {
    fn from(raw: i64) -> Self {
        match Mode::from_value(raw) {
            Some(mode) => ReportedMode::Known(mode),
            None => ReportedMode::Unknown(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub onoff: bool,
    pub target_temperature: Temperature,
    pub measure_temperature: Temperature,
    pub mode: ReportedMode,
    pub away: bool,
    pub online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    OnOff,
    TargetTemperature,
    Mode,
    Away,
    MeasureTemperature,
    MeasurePower,
}

impl Capability {
    pub fn id(&self) -> &'static str {
        match self {
            Capability::OnOff => "onoff",
            Capability::TargetTemperature => "target_temperature",
            Capability::Mode => "mode",
            Capability::Away => "away",
            Capability::MeasureTemperature => "measure_temperature",
            Capability::MeasurePower => "measure_power",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "onoff" => Some(Capability::OnOff),
            "target_temperature" => Some(Capability::TargetTemperature),
            "mode" => Some(Capability::Mode),
            "away" => Some(Capability::Away),
            "measure_temperature" => Some(Capability::MeasureTemperature),
            "measure_power" => Some(Capability::MeasurePower),
            _ => None,
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, Capability::MeasureTemperature | Capability::MeasurePower)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A user-issued write to one capability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlCommand {
    OnOff(bool),
    TargetTemperature(Temperature),
    Mode(Mode),
    Away(bool),
}

impl ControlCommand {
    pub fn from_capability(capability: Capability, value: &CapabilityValue) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidValue {
            capability: capability.id().to_string(),
            reason: reason.to_string(),
        };
        match (capability, value) {
            (Capability::OnOff, CapabilityValue::Bool(on)) => Ok(ControlCommand::OnOff(*on)),
            (Capability::Away, CapabilityValue::Bool(away)) => Ok(ControlCommand::Away(*away)),
            (Capability::TargetTemperature, CapabilityValue::Number(c)) => {
                if !c.is_finite() {
                    return Err(invalid("not a finite number"));
                }
                Ok(ControlCommand::TargetTemperature(Temperature::from_celsius(*c)))
            }
            (Capability::Mode, CapabilityValue::Text(s)) => Mode::from_capability_str(s)
                .map(ControlCommand::Mode)
                .ok_or_else(|| invalid(&format!("unknown mode {s:?}"))),
            (Capability::OnOff | Capability::Away, _) => Err(invalid("expected a boolean")),
            (Capability::TargetTemperature, _) => Err(invalid("expected a number")),
            (Capability::Mode, _) => Err(invalid("expected a mode string")),
            (Capability::MeasureTemperature | Capability::MeasurePower, _) => {
                Err(Error::UnsupportedCapability(capability.id().to_string()))
            }
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            ControlCommand::OnOff(_) => Capability::OnOff,
            ControlCommand::TargetTemperature(_) => Capability::TargetTemperature,
            ControlCommand::Mode(_) => Capability::Mode,
            ControlCommand::Away(_) => Capability::Away,
        }
    }
}

/// Poll interval in whole minutes. Zero is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    interval_minutes: u32,
}

impl PollConfig {
    pub fn new(interval_minutes: u32) -> Result<Self> {
        if interval_minutes == 0 {
            return Err(Error::InvalidInterval(interval_minutes));
        }
        Ok(Self { interval_minutes })
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }
}

/// Per-device settings as persisted by the host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeviceSettings {
    #[serde(default = "default_interval")]
    pub interval: u32,
    #[serde(rename = "apiVersion", default = "default_api_version")]
    pub api_version: u8,
    /// Wattage coefficient multiplied into `measure_power`.
    #[serde(default)]
    pub m2: f64,
}

fn default_interval() -> u32 {
    5
}

fn default_api_version() -> u8 {
    1
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            api_version: default_api_version(),
            m2: 0.0,
        }
    }
}

impl DeviceSettings {
    pub fn poll_config(&self) -> Result<PollConfig> {
        PollConfig::new(self.interval)
    }

    pub fn protocol_version(&self) -> Result<ProtocolVersion> {
        ProtocolVersion::from_setting(self.api_version)
            .ok_or_else(|| Error::Protocol(format!("unsupported apiVersion {}", self.api_version)))
    }
}
