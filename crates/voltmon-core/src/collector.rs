//! Background telemetry collector.
//!
//! One cycle: fetch the battery registry, parse, and apply it to the shared
//! snapshot in a single lock; every [`CollectorConfig::slow_check_interval`]
//! also refresh condition and low-power mode; then wait out the poll interval.
//! Subprocesses and waits never run while the lock is held.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::parse::{parse_primary, parse_secondary};
use crate::snapshot::SharedSnapshot;
use crate::source::TelemetrySource;

/// Collector tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorConfig {
    /// Minimum gap between condition / low-power checks.
    pub slow_check_interval: Duration,
    /// Granularity at which a waiting collector notices shutdown.
    pub wait_slice: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            slow_check_interval: Duration::from_secs(30),
            wait_slice: Duration::from_millis(100),
        }
    }
}

// ---------------------------------------------------------------------------
// ShutdownFlag
// ---------------------------------------------------------------------------

/// Cooperative cancellation shared between the UI, signal handler and collector.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// What one cycle managed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// The primary query returned data and the snapshot was updated.
    pub primary_updated: bool,
    /// Condition / low-power mode were refreshed this cycle.
    pub slow_checked: bool,
    pub latency: Duration,
}

pub struct Collector {
    source: Box<dyn TelemetrySource>,
    shared: SharedSnapshot,
    config: CollectorConfig,
    last_slow_check: Option<Instant>,
}

impl Collector {
    pub fn new(source: Box<dyn TelemetrySource>, shared: SharedSnapshot) -> Self {
        Self {
            source,
            shared,
            config: CollectorConfig::default(),
            last_slow_check: None,
        }
    }

    pub fn with_config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Fetch, parse and apply one round of telemetry.
    pub fn run_cycle(&mut self) -> CycleReport {
        let start = Instant::now();

        let raw = self.source.battery_registry();
        let primary_updated = !raw.trim().is_empty();

        let latency = self.shared.update(|snap| {
            if primary_updated {
                let reading = parse_primary(&raw);
                snap.apply_primary(&reading);
                snap.record_history();
                snap.last_update_unix_ms = Some(unix_ms_now());
                snap.cycles += 1;
            }
            let latency = start.elapsed();
            snap.poll_latency_ms = latency.as_millis() as u64;
            latency
        });

        if primary_updated {
            log::trace!("{}: primary cycle in {}ms", self.source.name(), latency.as_millis());
        } else {
            log::debug!("{}: battery registry returned nothing", self.source.name());
        }

        let slow_checked = self.slow_check_due();
        if slow_checked {
            let profile = self.source.power_profile();
            let settings = self.source.power_settings();
            let reading = parse_secondary(&profile, &settings);
            log::debug!(
                "{}: condition={:?} low_power={:?}",
                self.source.name(),
                reading.condition,
                reading.low_power_mode
            );
            self.shared.update(|snap| snap.apply_secondary(&reading));
            self.last_slow_check = Some(Instant::now());
        }

        CycleReport {
            primary_updated,
            slow_checked,
            latency,
        }
    }

    fn slow_check_due(&self) -> bool {
        self.last_slow_check
            .is_none_or(|at| at.elapsed() >= self.config.slow_check_interval)
    }

    /// Cycle until `shutdown` is cancelled.
    pub fn run(mut self, shutdown: &ShutdownFlag) {
        log::info!("collector started ({})", self.source.name());
        while !shutdown.is_cancelled() {
            self.run_cycle();
            let interval = self.shared.poll_interval();
            self.wait(interval, shutdown);
        }
        log::info!("collector stopped");
    }

    fn wait(&self, interval: Duration, shutdown: &ShutdownFlag) {
        let deadline = Instant::now() + interval;
        loop {
            if shutdown.is_cancelled() {
                return;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return;
            }
            thread::sleep(remaining.min(self.config.wait_slice));
        }
    }

    /// Run on a dedicated thread. The returned handle stops and joins it.
    pub fn spawn(self, shutdown: ShutdownFlag) -> io::Result<CollectorHandle> {
        let flag = shutdown.clone();
        let thread = thread::Builder::new()
            .name("voltmon-collector".into())
            .spawn(move || self.run(&flag))?;
        Ok(CollectorHandle {
            shutdown,
            thread: Some(thread),
        })
    }
}

// ---------------------------------------------------------------------------
// CollectorHandle
// ---------------------------------------------------------------------------

/// Owner of a running collector thread.
pub struct CollectorHandle {
    shutdown: ShutdownFlag,
    thread: Option<JoinHandle<()>>,
}

impl CollectorHandle {
    pub fn shutdown_flag(&self) -> &ShutdownFlag {
        &self.shutdown
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancel and wait for the current cycle to wind down.
    pub fn stop(mut self) {
        self.join();
    }

    fn join(&mut self) {
        self.shutdown.cancel();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            log::warn!("collector thread panicked");
        }
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        self.join();
    }
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{PollMode, Snapshot};
    use std::sync::Mutex;

    /// Source that replays queued registry dumps, then returns empty text.
    #[derive(Default)]
    struct Scripted {
        registry: Mutex<Vec<String>>,
        profile: String,
        settings: String,
        slow_calls: Arc<Mutex<u32>>,
    }

    impl Scripted {
        fn with_registry(dumps: &[&str]) -> Self {
            let mut queued: Vec<String> = dumps.iter().map(|s| s.to_string()).collect();
            queued.reverse();
            Self {
                registry: Mutex::new(queued),
                profile: "Condition: Normal\n".into(),
                settings: " lowpowermode 1\n".into(),
                ..Default::default()
            }
        }
    }

    impl TelemetrySource for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
        fn battery_registry(&self) -> String {
            self.registry.lock().unwrap().pop().unwrap_or_default()
        }
        fn power_profile(&self) -> String {
            *self.slow_calls.lock().unwrap() += 1;
            self.profile.clone()
        }
        fn power_settings(&self) -> String {
            self.settings.clone()
        }
        fn battery_summary(&self) -> String {
            String::new()
        }
    }

    const DUMP: &str = "\"Voltage\" = 12000\n\"InstantAmperage\" = 18446744073709551116\n\"CycleCount\" = 42\n\"Temperature\" = 3000\n";

    #[test]
    fn cycle_applies_primary_and_history() {
        let shared = SharedSnapshot::default();
        let mut c = Collector::new(Box::new(Scripted::with_registry(&[DUMP])), shared.clone());
        let report = c.run_cycle();
        assert!(report.primary_updated);
        assert!(report.slow_checked);

        let s = shared.read();
        assert_eq!(s.cycle_count, 42);
        assert_eq!(s.amperage, -500);
        assert!((s.power_watts - 6.0).abs() < 1e-9);
        assert_eq!(s.power_history.len(), 1);
        assert_eq!(s.temp_history.len(), 1);
        assert_eq!(s.condition, "Normal");
        assert!(s.low_power_mode);
        assert!(s.last_update_unix_ms.is_some());
        assert_eq!(s.cycles, 1);
        assert_eq!(s.poll_latency_ms, report.latency.as_millis() as u64);
    }

    #[test]
    fn empty_fetch_leaves_snapshot_untouched() {
        let shared = SharedSnapshot::default();
        let mut c = Collector::new(Box::new(Scripted::with_registry(&[DUMP])), shared.clone());
        c.run_cycle();
        let before = shared.read();

        let report = c.run_cycle();
        assert!(!report.primary_updated);
        let after = shared.read();
        assert_eq!(after.cycle_count, 42);
        assert_eq!(after.power_history.len(), before.power_history.len());
        assert_eq!(after.cycles, 1);
        assert_eq!(after.last_update_unix_ms, before.last_update_unix_ms);
    }

    #[test]
    fn slow_checks_are_rate_limited() {
        let source = Scripted::with_registry(&[DUMP, DUMP, DUMP]);
        let calls = Arc::clone(&source.slow_calls);
        let mut c = Collector::new(Box::new(source), SharedSnapshot::default());

        assert!(c.run_cycle().slow_checked);
        assert!(!c.run_cycle().slow_checked);
        assert!(!c.run_cycle().slow_checked);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn zero_slow_interval_checks_every_cycle() {
        let source = Scripted::with_registry(&[DUMP, DUMP]);
        let calls = Arc::clone(&source.slow_calls);
        let mut c = Collector::new(Box::new(source), SharedSnapshot::default()).with_config(
            CollectorConfig {
                slow_check_interval: Duration::ZERO,
                ..Default::default()
            },
        );
        c.run_cycle();
        c.run_cycle();
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn shutdown_flag_is_shared_between_clones() {
        let a = ShutdownFlag::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn spawned_collector_stops_promptly_even_in_eco_mode() {
        let shared = SharedSnapshot::new(Snapshot::with_mode(PollMode::Eco));
        let collector = Collector::new(Box::new(Scripted::with_registry(&[DUMP])), shared.clone());
        let handle = collector.spawn(ShutdownFlag::new()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while shared.read().cycles == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(shared.read().cycles, 1);

        let start = Instant::now();
        handle.stop();
        assert!(start.elapsed() < Duration::from_secs(1), "{:?}", start.elapsed());
    }

    #[test]
    fn cancelling_through_handle_flag_ends_thread() {
        let shared = SharedSnapshot::new(Snapshot::with_mode(PollMode::Eco));
        let collector = Collector::new(Box::new(Scripted::with_registry(&[DUMP])), shared);
        let handle = collector.spawn(ShutdownFlag::new()).unwrap();
        assert!(!handle.shutdown_flag().is_cancelled());

        handle.shutdown_flag().cancel();
        let deadline = Instant::now() + Duration::from_secs(2);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(handle.is_finished());
        handle.stop();
    }

    #[test]
    fn pre_cancelled_collector_never_cycles() {
        let shared = SharedSnapshot::default();
        let flag = ShutdownFlag::new();
        flag.cancel();
        Collector::new(Box::new(Scripted::with_registry(&[DUMP])), shared.clone()).run(&flag);
        assert_eq!(shared.read().cycles, 0);
    }
}
