use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error, info, warn};

use crate::engine::{ControlResult, SyncEngine};
use crate::scheduler::PollScheduler;
use crate::status::measure_power;
use crate::types::*;
use crate::{Error, Result};

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Host-side store for capability values and device availability.
pub trait CapabilitySink: Send + Sync {
    fn has_capability(&self, capability: Capability) -> bool;

    fn set_capability_value(
        &self,
        capability: Capability,
        value: CapabilityValue,
    ) -> std::result::Result<(), SinkError>;

    fn set_available(&self, available: bool) -> std::result::Result<(), SinkError>;
}

/// Per-write outcome of [`CapabilityBridge::apply_state`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    pub written: Vec<Capability>,
    pub failed: Vec<(Capability, String)>,
    pub availability_error: Option<String>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.availability_error.is_none()
    }
}

/// Connects one device to the host: user writes go out through the engine,
/// refreshed state comes back through the sink. Use one bridge per device id.
pub struct CapabilityBridge {
    device: DeviceRef,
    engine: Arc<SyncEngine>,
    scheduler: Arc<PollScheduler>,
    sink: Arc<dyn CapabilitySink>,
    settings: Mutex<DeviceSettings>,
}

impl CapabilityBridge {
    pub fn new(
        device: DeviceRef,
        engine: Arc<SyncEngine>,
        scheduler: Arc<PollScheduler>,
        sink: Arc<dyn CapabilitySink>,
        settings: DeviceSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            device,
            engine,
            scheduler,
            sink,
            settings: Mutex::new(settings),
        })
    }

    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    pub fn settings(&self) -> DeviceSettings {
        self.lock_settings().clone()
    }

    /// Arms the poll timer, then pulls the initial state.
    pub async fn init(self: &Arc<Self>) -> Result<ApplyReport> {
        info!(device_id = %self.device.id, name = %self.device.name, "connected to device");
        let config = self.settings().poll_config()?;
        self.arm(config);
        self.refresh().await
    }

    pub async fn refresh(&self) -> Result<ApplyReport> {
        let state = self.engine.refresh(&self.device).await?;
        Ok(self.apply_state(&state))
    }

    pub async fn on_capability_change(
        &self,
        capability: &str,
        value: CapabilityValue,
    ) -> Result<ControlResult> {
        let capability = Capability::from_id(capability)
            .filter(Capability::is_writable)
            .ok_or_else(|| Error::UnsupportedCapability(capability.to_string()))?;
        let command = ControlCommand::from_capability(capability, &value)?;

        let result = self.engine.dispatch(&self.device, command).await?;
        if let Some(ref state) = result.refreshed {
            self.apply_state(state);
        }
        Ok(result)
    }

    /// Writes every capability independently; a failed write is logged and
    /// recorded without stopping the rest.
    pub fn apply_state(&self, state: &DeviceState) -> ApplyReport {
        let mut report = ApplyReport::default();

        if let Err(e) = self.sink.set_available(state.online) {
            warn!(device_id = %self.device.id, error = %e, "failed to set availability");
            report.availability_error = Some(e.to_string());
        }

        let mode = match state.mode {
            ReportedMode::Known(mode) => Ok(CapabilityValue::Text(mode.as_capability_str().to_string())),
            ReportedMode::Unknown(raw) => Err(format!("unknown mode value {raw}")),
        };
        let mut writes = vec![
            (
                Capability::TargetTemperature,
                Ok(CapabilityValue::Number(state.target_temperature.celsius())),
            ),
            (
                Capability::MeasureTemperature,
                Ok(CapabilityValue::Number(state.measure_temperature.celsius())),
            ),
            (Capability::OnOff, Ok(CapabilityValue::Bool(state.onoff))),
            (Capability::Mode, mode),
            (Capability::Away, Ok(CapabilityValue::Bool(state.away))),
        ];
        if self.sink.has_capability(Capability::MeasurePower) {
            let watts = measure_power(state.onoff, self.lock_settings().m2, self.engine.energy_usage());
            writes.push((Capability::MeasurePower, Ok(CapabilityValue::Number(watts))));
        }

        for (capability, value) in writes {
            let outcome = value.and_then(|v| {
                self.sink
                    .set_capability_value(capability, v)
                    .map_err(|e| e.to_string())
            });
            match outcome {
                Ok(()) => report.written.push(capability),
                Err(reason) => {
                    warn!(device_id = %self.device.id, %capability, %reason, "capability write failed");
                    report.failed.push((capability, reason));
                }
            }
        }

        debug!(
            device_id = %self.device.id,
            written = report.written.len(),
            failed = report.failed.len(),
            "state applied"
        );
        report
    }

    pub fn on_interval_setting_changed(self: &Arc<Self>, minutes: u32) -> Result<()> {
        let config = PollConfig::new(minutes)?;
        self.lock_settings().interval = minutes;
        match self.scheduler.reschedule(&self.device.id, config) {
            Ok(()) => Ok(()),
            Err(Error::NotScheduled(_)) => {
                self.arm(config);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Applies a settings change from the host. `apiVersion` is fixed at
    /// onboarding and changes to it are ignored.
    pub fn on_settings(self: &Arc<Self>, new: DeviceSettings) -> Result<()> {
        let old = self.settings();
        PollConfig::new(new.interval)?;
        if new.api_version != old.api_version {
            warn!(device_id = %self.device.id, "ignoring apiVersion change");
        }
        self.lock_settings().m2 = new.m2;
        if new.interval != old.interval {
            self.on_interval_setting_changed(new.interval)?;
        }
        Ok(())
    }

    pub fn deleted(&self) {
        info!(device_id = %self.device.id, "device deleted");
        self.scheduler.stop(&self.device.id);
    }

    fn arm(self: &Arc<Self>, config: PollConfig) {
        let weak = Arc::downgrade(self);
        self.scheduler.start(&self.device.id, config, move || {
            let weak = weak.clone();
            async move {
                let Some(bridge) = weak.upgrade() else {
                    return;
                };
                if let Err(e) = bridge.refresh().await {
                    error!(device_id = %bridge.device.id, error = %e, "scheduled refresh failed");
                }
            }
        });
    }

    fn lock_settings(&self) -> MutexGuard<'_, DeviceSettings> {
        self.settings.lock().unwrap_or_else(|p| p.into_inner())
    }
}
