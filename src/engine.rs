use std::collections::HashSet;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use reqwest::header::USER_AGENT;
use serde_json::Value;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::logger::{MessageLogMode, MessageLogger};
use crate::protocol::{Endpoints, ParamEncoding, ProtocolAdapter, WireRequest};
use crate::status::DEFAULT_ENERGY_USAGE;
use crate::types::*;
use crate::v1::V1Adapter;
use crate::v2::V2Adapter;
use crate::{Error, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type NotificationCallback = Box<dyn Fn(&str) + Send + Sync>;
type SnapshotCallback = Box<dyn Fn(&DeviceRef, &DeviceState) + Send + Sync>;

/// Outcome of a successful capability write.
#[derive(Debug, Clone)]
pub struct ControlResult {
    /// Vendor response body.
    pub response: Value,
    /// State pulled back right after the write, when the protocol asks for it.
    pub refreshed: Option<DeviceState>,
}

pub struct SyncEngineBuilder {
    credentials: Credentials,
    endpoints: Endpoints,
    timeout: Duration,
    energy_usage: f64,
    notification_callbacks: Vec<NotificationCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl SyncEngineBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            endpoints: Endpoints::default(),
            timeout: DEFAULT_TIMEOUT,
            energy_usage: DEFAULT_ENERGY_USAGE,
            notification_callbacks: Vec::new(),
            snapshot_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    /// Points all four endpoints at `base` (scheme, host and optional port).
    pub fn base_url(mut self, base: &str) -> Self {
        let user_agent = std::mem::take(&mut self.endpoints.user_agent);
        self.endpoints = Endpoints::with_base(base);
        self.endpoints.user_agent = user_agent;
        self
    }

    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.endpoints.user_agent = ua.into();
        self
    }

    /// Upper bound for each HTTP call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn energy_usage(mut self, watts: f64) -> Self {
        self.energy_usage = watts;
        self
    }

    /// Receives user-facing alerts, e.g. when the vendor host cannot be resolved.
    pub fn on_notification(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.notification_callbacks.push(Box::new(f));
        self
    }

    pub fn on_snapshot(mut self, f: impl Fn(&DeviceRef, &DeviceState) + Send + Sync + 'static) -> Self {
        self.snapshot_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SyncEngine> {
        let http = reqwest::Client::builder().timeout(self.timeout).build()?;

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => Some(Mutex::new(MessageLogger::new(mode, &path)?)),
            _ => None,
        };

        Ok(SyncEngine {
            http,
            credentials: RwLock::new(self.credentials),
            v1: V1Adapter::new(&self.endpoints),
            v2: V2Adapter::new(&self.endpoints),
            energy_usage: self.energy_usage,
            notification_callbacks: self.notification_callbacks,
            snapshot_callbacks: self.snapshot_callbacks,
            logger,
            dns_notified: Mutex::new(HashSet::new()),
        })
    }
}

/// Refreshes device state and dispatches capability writes over either API version.
///
/// All methods take `&self`; a refresh and a dispatch for the same device may
/// run concurrently and the last capability write wins.
pub struct SyncEngine {
    http: reqwest::Client,
    credentials: RwLock<Credentials>,
    v1: V1Adapter,
    v2: V2Adapter,
    energy_usage: f64,
    notification_callbacks: Vec<NotificationCallback>,
    snapshot_callbacks: Vec<SnapshotCallback>,
    logger: Option<Mutex<MessageLogger>>,
    dns_notified: Mutex<HashSet<String>>,
}

impl SyncEngine {
    pub fn builder(credentials: Credentials) -> SyncEngineBuilder {
        SyncEngineBuilder::new(credentials)
    }

    pub fn adapter(&self, version: ProtocolVersion) -> &dyn ProtocolAdapter {
        let adapter: &dyn ProtocolAdapter = match version {
            ProtocolVersion::V1 => &self.v1,
            ProtocolVersion::V2 => &self.v2,
        };
        debug_assert_eq!(adapter.version(), version);
        adapter
    }

    pub fn energy_usage(&self) -> f64 {
        self.energy_usage
    }

    /// Swaps in a new token after re-authentication.
    pub fn set_token(&self, token: impl Into<String>) {
        let mut creds = self.credentials.write().unwrap_or_else(|p| p.into_inner());
        creds.token = token.into();
    }

    fn credentials(&self) -> Credentials {
        self.credentials.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub async fn refresh(&self, device: &DeviceRef) -> Result<DeviceState> {
        debug!(device_id = %device.id, version = ?device.protocol_version, "refreshing device");
        match self.fetch_state(device).await {
            Ok(state) => {
                self.dns_latch().remove(&device.id);
                for cb in &self.snapshot_callbacks {
                    cb(device, &state);
                }
                Ok(state)
            }
            Err(e) => {
                warn!(device_id = %device.id, error = %e, "refresh failed");
                if device.protocol_version == ProtocolVersion::V1 && e.is_dns_failure() {
                    self.notify_unreachable(device);
                }
                Err(e)
            }
        }
    }

    async fn fetch_state(&self, device: &DeviceRef) -> Result<DeviceState> {
        let adapter = self.adapter(device.protocol_version);
        let req = adapter.build_list_request(&self.credentials());
        let id = Uuid::new_v4();
        self.log(|l| l.log_request(id, "list", Some(&device.id), &req));

        let (status, body) = self.send(&req).await?;
        self.log(|l| l.log_list_response(id, status, &body));

        let record = adapter.find_device(&body, &device.id)?;
        let state = adapter.decode_device(record)?;
        trace!(device_id = %device.id, ?state, "decoded state");
        Ok(state)
    }

    pub async fn dispatch(&self, device: &DeviceRef, command: ControlCommand) -> Result<ControlResult> {
        let capability = command.capability();
        debug!(device_id = %device.id, %capability, ?command, "dispatching");

        let adapter = self.adapter(device.protocol_version);
        let req = adapter.build_control_request(&self.credentials(), &device.id, &command);
        let id = Uuid::new_v4();
        self.log(|l| l.log_request(id, capability.id(), Some(&device.id), &req));

        let (status, body) = match self.send(&req).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(device_id = %device.id, %capability, error = %e, "control request failed");
                return Err(e);
            }
        };
        self.log(|l| l.log_control_response(id, status, &body));
        adapter.check_control_response(&body)?;

        let refreshed = if adapter.refreshes_after(capability) {
            Some(self.refresh(device).await?)
        } else {
            None
        };

        Ok(ControlResult {
            response: body,
            refreshed,
        })
    }

    async fn send(&self, req: &WireRequest) -> Result<(u16, Value)> {
        let mut builder = self.http.request(req.method.clone(), &req.url);
        if let Some(ref ua) = req.user_agent {
            builder = builder.header(USER_AGENT, ua);
        }
        if req.encoding == ParamEncoding::Form {
            builder = builder.form(&req.params);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }

        let text = resp.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| Error::Protocol(format!("response is not JSON: {e}")))?
        };
        Ok((status.as_u16(), body))
    }

    fn notify_unreachable(&self, device: &DeviceRef) {
        if !self.dns_latch().insert(device.id.clone()) {
            return;
        }
        error!(device_id = %device.id, "vendor host could not be resolved");
        let message = format!(
            "Your Scinan device {} has issues. Please check the community forum for more info!",
            device.name
        );
        for cb in &self.notification_callbacks {
            cb(&message);
        }
    }

    fn dns_latch(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.dns_notified.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn log(&self, f: impl FnOnce(&mut MessageLogger)) {
        if let Some(ref logger) = self.logger {
            let mut guard = logger.lock().unwrap_or_else(|p| p.into_inner());
            f(&mut guard);
        }
    }
}
