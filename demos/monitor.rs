use std::env;
use std::sync::Arc;
use std::time::Duration;

use saswell_cloud::{
    Capability, CapabilityBridge, CapabilitySink, CapabilityValue, Credentials, DeviceRef,
    DeviceSettings, PollScheduler, SinkError, SyncEngine,
};

/// Prints every capability write instead of storing it.
struct StdoutSink {
    name: String,
}

impl CapabilitySink for StdoutSink {
    fn has_capability(&self, _capability: Capability) -> bool {
        true
    }

    fn set_capability_value(
        &self,
        capability: Capability,
        value: CapabilityValue,
    ) -> Result<(), SinkError> {
        println!("[{}] {capability} = {value:?}", self.name);
        Ok(())
    }

    fn set_available(&self, available: bool) -> Result<(), SinkError> {
        println!("[{}] available = {available}", self.name);
        Ok(())
    }
}

fn var(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}

#[tokio::main]
async fn main() -> saswell_cloud::Result<()> {
    tracing_subscriber::fmt::init();

    let credentials = Credentials {
        token: var("SASWELL_TOKEN"),
        imei: var("SASWELL_IMEI"),
        app_key: var("SASWELL_APP_KEY"),
        app_secret: var("SASWELL_APP_SECRET"),
        company_id: var("SASWELL_COMPANY_ID"),
    };
    let device_id = var("SASWELL_DEVICE_ID");
    let settings = DeviceSettings {
        interval: env::var("SASWELL_INTERVAL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1),
        api_version: env::var("SASWELL_API_VERSION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2),
        m2: 1.0,
    };

    let engine = SyncEngine::builder(credentials)
        .on_notification(|msg| println!("NOTICE: {msg}"))
        .on_snapshot(|device, state| {
            println!(
                "[{}] {} / target {} | on: {} | mode: {:?} | away: {}",
                device.name,
                state.measure_temperature,
                state.target_temperature,
                state.onoff,
                state.mode,
                state.away,
            );
        })
        .build()?;

    let device = DeviceRef::from_settings(&device_id, "Thermostat", &settings)?;
    let sink = Arc::new(StdoutSink {
        name: device.name.clone(),
    });
    let bridge = CapabilityBridge::new(
        device,
        Arc::new(engine),
        Arc::new(PollScheduler::new()),
        sink,
        settings,
    );

    println!("Connecting to {device_id}...");
    let report = bridge.init().await?;
    println!("Initial state applied ({} writes). Polling for updates...", report.written.len());

    loop {
        tokio::time::sleep(Duration::from_secs(3600)).await;
    }
}
