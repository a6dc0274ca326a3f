mod bridge;
mod diff;
mod engine;
mod error;
mod logger;
mod protocol;
mod scheduler;
mod sign;
mod status;
mod types;
mod v1;
mod v2;

pub use bridge::{ApplyReport, CapabilityBridge, CapabilitySink, SinkError};
pub use engine::{ControlResult, SyncEngine, SyncEngineBuilder};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use protocol::{
    timestamp, Endpoints, ParamEncoding, ProtocolAdapter, WireRequest,
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT,
};
pub use scheduler::PollScheduler;
pub use status::{decode_status, is_online, measure_power, DecodedStatus, DEFAULT_ENERGY_USAGE};
pub use types::*;
pub use v1::V1Adapter;
pub use v2::{V2Adapter, RESULT_TOKEN_EXPIRED};
