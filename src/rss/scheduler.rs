//! Background feed collection for Gator.
//!
//! The scheduler runs one ingestion tick immediately and then one per
//! interval, strictly sequentially, until it is told to shut down.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::{GatorError, Result};
use crate::rss::ingest::{IngestionEngine, TickReport};

/// Parse a Go-style duration such as `30s`, `1m`, `1h30m` or `1.5h`.
///
/// Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A zero, negative,
/// empty or malformed value is a [`GatorError::Config`] error.
pub fn parse_interval(input: &str) -> Result<Duration> {
    let invalid = |reason: &str| GatorError::Config(format!("invalid interval {input:?}: {reason}"));

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid("empty"));
    }
    if s.starts_with('-') {
        return Err(invalid("must be positive"));
    }
    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest == "0" {
        return Err(invalid("must be positive"));
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let int_part = &rest[..int_end];
        rest = &rest[int_end..];

        let mut frac_part = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let frac_end = after_dot
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(after_dot.len());
            frac_part = &after_dot[..frac_end];
            rest = &after_dot[frac_end..];
        }
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("expected a number"));
        }

        let unit_end = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let unit_nanos: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3_600 * 1_000_000_000,
            "" => return Err(invalid("missing unit")),
            other => return Err(invalid(&format!("unknown unit {other:?}"))),
        };

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| invalid("out of range"))?
        };

        // Eighteen fractional digits keep the product well inside u128.
        let frac_digits = &frac_part[..frac_part.len().min(18)];
        let frac: u128 = if frac_digits.is_empty() {
            0
        } else {
            let scale = 10u128.pow(frac_digits.len() as u32);
            let value: u128 = frac_digits.parse().map_err(|_| invalid("out of range"))?;
            value * unit_nanos / scale
        };

        total = whole
            .checked_mul(unit_nanos)
            .and_then(|n| n.checked_add(frac))
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| invalid("out of range"))?;
    }

    if total == 0 {
        return Err(invalid("must be positive"));
    }
    let nanos = u64::try_from(total).map_err(|_| invalid("out of range"))?;
    Ok(Duration::from_nanos(nanos))
}

/// Runs the ingestion engine on a fixed cadence.
pub struct Scheduler {
    engine: IngestionEngine,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler ticking every `interval`.
    ///
    /// A zero interval is a [`GatorError::Config`] error.
    pub fn new(engine: IngestionEngine, interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(GatorError::Config(
                "scheduler interval must be positive".to_string(),
            ));
        }
        Ok(Self { engine, interval })
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    ///
    /// The first tick runs immediately. A tick that overruns the interval
    /// delays the next one instead of overlapping it. Shutdown is observed
    /// both between ticks and while a tick is in flight; an in-flight tick
    /// is dropped.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        info!("Collecting feeds every {:?}", self.interval);

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Scheduler shutdown requested");
                    break;
                }
                _ = timer.tick() => {}
            }

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Scheduler shutdown requested during a tick");
                    break;
                }
                result = self.engine.run_once() => log_tick(result),
            }
        }
    }
}

fn log_tick(result: Result<TickReport>) {
    match result {
        Ok(TickReport::Idle) => debug!("No feeds registered yet"),
        Ok(TickReport::Ingested {
            feed_name,
            created,
            duplicates,
            failed,
            ..
        }) => debug!(
            "Tick for {} done: {} new, {} known, {} failed",
            feed_name, created, duplicates, failed
        ),
        Err(e) => warn!("Feed collection failed: {}", e),
    }
}

/// Handle to a scheduler running on its own task.
pub struct SchedulerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the task to finish.
    pub async fn stop(self) {
        let _ = self.cancel_tx.send(());
        if let Err(e) = self.join.await {
            error!("Scheduler task failed: {}", e);
        }
    }
}

/// Spawn the scheduler on the current runtime.
pub fn spawn_scheduler(scheduler: Scheduler) -> SchedulerHandle {
    let (cancel_tx, cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        scheduler.run(cancel_rx).await;
    });

    SchedulerHandle { cancel_tx, join }
}
