use std::fs::{File, OpenOptions};
use std::io::Write;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::warn;
use uuid::Uuid;

use crate::diff::diff_json;
use crate::protocol::WireRequest;

const REDACTED_PARAMS: &[&str] = &["token", "sign"];

pub enum MessageLogMode {
    Full,
    Diffed,
}

/// Append-only NDJSON log of wire traffic.
pub(crate) struct MessageLogger {
    mode: MessageLogMode,
    file: File,
    previous_list: Option<Value>,
}

impl MessageLogger {
    pub fn new(mode: MessageLogMode, path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            mode,
            file,
            previous_list: None,
        })
    }

    pub fn log_request(&mut self, id: Uuid, action: &str, device_id: Option<&str>, req: &WireRequest) {
        let mut params = Map::new();
        for (key, value) in &req.params {
            let shown = if REDACTED_PARAMS.contains(key) { "***" } else { value.as_str() };
            params.insert(key.to_string(), Value::String(shown.to_string()));
        }
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "id": id.to_string(),
            "dir": "req",
            "action": action,
            "device": device_id,
            "method": req.method.as_str(),
            "params": params,
        });
        self.write_line(&entry);
    }

    pub fn log_control_response(&mut self, id: Uuid, status: u16, body: &Value) {
        let entry = json!({
            "ts": Utc::now().to_rfc3339(),
            "id": id.to_string(),
            "dir": "control",
            "status": status,
            "body": body,
        });
        self.write_line(&entry);
    }

    pub fn log_list_response(&mut self, id: Uuid, status: u16, body: &Value) {
        let ts = Utc::now().to_rfc3339();
        let id = id.to_string();
        let entry = match (&self.mode, &self.previous_list) {
            (MessageLogMode::Diffed, Some(prev)) => {
                let mut changes = Vec::new();
                diff_json(prev, body, "", &mut changes);
                let change_entries: Vec<Value> = changes
                    .iter()
                    .map(|(path, old, new)| json!({ "path": path, "old": old, "new": new }))
                    .collect();
                json!({
                    "ts": ts,
                    "id": id,
                    "dir": "list",
                    "status": status,
                    "changes": change_entries,
                })
            }
            (MessageLogMode::Diffed, None) => json!({
                "ts": ts,
                "id": id,
                "dir": "list",
                "status": status,
                "full": true,
                "body": body,
            }),
            (MessageLogMode::Full, _) => json!({
                "ts": ts,
                "id": id,
                "dir": "list",
                "status": status,
                "body": body,
            }),
        };
        self.write_line(&entry);
        if matches!(self.mode, MessageLogMode::Diffed) {
            self.previous_list = Some(body.clone());
        }
    }

    fn write_line(&mut self, entry: &Value) {
        if let Ok(line) = serde_json::to_string(entry)
            && let Err(e) = writeln!(self.file, "{line}")
        {
            warn!("failed to write log entry: {e}");
        }
    }
}
