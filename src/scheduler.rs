use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::types::PollConfig;
use crate::{Error, Result};

type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type TickFn = Arc<dyn Fn() -> TickFuture + Send + Sync>;

struct Entry {
    handle: JoinHandle<()>,
    period: Duration,
    on_tick: TickFn,
}

/// One refresh timer per device id.
///
/// Ticks run inline on the timer task, so a slow tick delays the next one
/// instead of queueing it. Stopping or rescheduling while a tick is in flight
/// cancels that tick.
#[derive(Default)]
pub struct PollScheduler {
    timers: Mutex<HashMap<String, Entry>>,
}

impl PollScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer for `device_id`, replacing any existing one. The first
    /// tick fires one full period from now. Must be called inside a Tokio runtime.
    pub fn start<F, Fut>(&self, device_id: &str, config: PollConfig, on_tick: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let on_tick: TickFn = Arc::new(move || Box::pin(on_tick()) as TickFuture);
        let mut timers = self.lock();
        if let Some(old) = timers.remove(device_id) {
            old.handle.abort();
        }
        let entry = arm(device_id, config.period(), on_tick);
        info!(device_id, minutes = config.interval_minutes(), "poll timer started");
        timers.insert(device_id.to_string(), entry);
    }

    /// Cancels the current timer and arms a new one with the same tick.
    pub fn reschedule(&self, device_id: &str, config: PollConfig) -> Result<()> {
        let mut timers = self.lock();
        let old = timers
            .remove(device_id)
            .ok_or_else(|| Error::NotScheduled(device_id.to_string()))?;
        old.handle.abort();
        debug!(
            device_id,
            old_secs = old.period.as_secs(),
            new_secs = config.period().as_secs(),
            "poll timer rescheduled"
        );
        let entry = arm(device_id, config.period(), old.on_tick);
        timers.insert(device_id.to_string(), entry);
        Ok(())
    }

    /// Returns whether a timer was running. Safe to call repeatedly.
    pub fn stop(&self, device_id: &str) -> bool {
        match self.lock().remove(device_id) {
            Some(entry) => {
                entry.handle.abort();
                info!(device_id, "poll timer stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, device_id: &str) -> bool {
        self.lock().contains_key(device_id)
    }

    pub fn period(&self, device_id: &str) -> Option<Duration> {
        self.lock().get(device_id).map(|e| e.period)
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // The map stays consistent even if a holder panicked.
        self.timers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner());
        for (_, entry) in timers.drain() {
            entry.handle.abort();
        }
    }
}

fn arm(device_id: &str, period: Duration, on_tick: TickFn) -> Entry {
    let id = device_id.to_string();
    let tick = on_tick.clone();
    let handle = tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            debug!(device_id = %id, "poll tick");
            tick().await;
        }
    });
    Entry {
        handle,
        period,
        on_tick,
    }
}
