//! Periodic and final reporting of totals.
//!
//! The reporter runs on its own thread, wakes every interval, logs a
//! key/value snapshot and never mutates state.

use anyhow::{anyhow, Result};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::aggregate::{Aggregator, Totals};

/// Key/value dump of the current totals, e.g.
/// `{"odol":1,"normal":4,"total":5,"tracked_boxes":5}`.
pub fn report_line(aggregator: &Aggregator) -> Result<String> {
    let snapshot = aggregator.snapshot()?;
    Ok(serde_json::to_string(&snapshot)?)
}

/// Summary printed once at shutdown.
pub fn final_summary(totals: &Totals) -> String {
    format!(
        "=== TOTAL DETECTION RESULTS ===\n\
         Total ODOL vehicles   : {}\n\
         Total normal vehicles : {}",
        totals.odol, totals.normal
    )
}

pub struct ReporterHandle {
    stop: Sender<()>,
    join: JoinHandle<u64>,
}

impl ReporterHandle {
    /// Stops the reporter and returns how many reports it emitted.
    pub fn stop(self) -> Result<u64> {
        let _ = self.stop.send(());
        self.join
            .join()
            .map_err(|_| anyhow!("reporter thread panicked"))
    }
}

/// Spawns the periodic reporter.
pub fn spawn_reporter(aggregator: Arc<Aggregator>, interval: Duration) -> Result<ReporterHandle> {
    if interval.is_zero() {
        return Err(anyhow!("report interval must be greater than zero"));
    }
    let (stop, stop_rx) = mpsc::channel::<()>();
    let join = thread::Builder::new()
        .name("odol-reporter".to_string())
        .spawn(move || {
            let mut reports = 0u64;
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => match report_line(&aggregator) {
                        Ok(line) => {
                            reports += 1;
                            log::info!("totals {}", line);
                        }
                        Err(e) => log::warn!("totals report failed: {}", e),
                    },
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            reports
        })
        .map_err(|e| anyhow!("failed to spawn reporter thread: {}", e))?;
    Ok(ReporterHandle { stop, join })
}
