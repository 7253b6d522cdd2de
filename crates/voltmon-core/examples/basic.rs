//! Basic power sampling example.
//!
//! Starts the collector in performance mode, prints a few readings,
//! then stops it.
//!
//! Run: `cargo run --example basic`

use std::thread;
use std::time::Duration;

use voltmon_core::{Collector, PollMode, SharedSnapshot, ShutdownFlag, Snapshot, SystemTelemetry};

fn main() {
    let source = SystemTelemetry::new();
    if !source.is_available() {
        eprintln!("Battery registry query not found; readings will stay at defaults.");
    }

    let shared = SharedSnapshot::new(Snapshot::with_mode(PollMode::Performance));
    let handle = match Collector::new(Box::new(source), shared.clone()).spawn(ShutdownFlag::new()) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("Error starting collector: {e}");
            std::process::exit(1);
        }
    };

    for _ in 0..5 {
        thread::sleep(Duration::from_secs(1));
        let s = shared.read();
        println!(
            "{:>3}%  {:<14} {:>6.2}W  {:>5.2}V  {:>6}mA  {:.1}°C  [{}ms]",
            s.battery_percent,
            s.charging_status.to_string(),
            s.power_watts,
            s.voltage,
            s.amperage,
            s.temperature,
            s.poll_latency_ms,
        );
    }

    handle.stop();
}
