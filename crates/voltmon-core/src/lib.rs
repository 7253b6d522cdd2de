//! # voltmon-core
//!
//! Battery and power telemetry for a laptop, collected on a background thread
//! and published through one shared snapshot.
//!
//! ## Quick Start
//!
//! ```no_run
//! use voltmon_core::{Collector, SharedSnapshot, ShutdownFlag, SystemTelemetry};
//!
//! let shared = SharedSnapshot::default();
//! let handle = Collector::new(Box::new(SystemTelemetry::new()), shared.clone())
//!     .spawn(ShutdownFlag::new())
//!     .expect("spawn collector");
//!
//! std::thread::sleep(std::time::Duration::from_secs(3));
//! let snap = shared.read();
//! println!("{}% {} {:.2}W", snap.battery_percent, snap.charging_status, snap.power_watts);
//!
//! handle.stop();
//! ```
//!
//! ## Architecture
//!
//! Query (subprocess) → Parser (`Option` per field) → Snapshot (one mutex) → UI
//!
//! - [`source`]: the platform queries behind the [`TelemetrySource`] trait.
//! - [`parse`]: tolerant extraction; absent keys leave the snapshot alone.
//! - [`snapshot`]: the shared data model and bounded history.
//! - [`collector`]: the fast/slow polling loop and its shutdown flag.

pub mod collector;
pub mod command;
pub mod diagnostics;
pub mod parse;
pub mod snapshot;
pub mod source;

pub use collector::{Collector, CollectorConfig, CollectorHandle, CycleReport, ShutdownFlag};
pub use command::{DEFAULT_COMMAND_TIMEOUT, run_command, run_command_with_timeout};
pub use diagnostics::{DiagnosticReport, collect_report};
pub use parse::{AdapterReading, PrimaryReading, SecondaryReading, parse_primary, parse_secondary};
pub use snapshot::{
    ChargingStatus, HISTORY_CAPACITY, History, PollMode, PowerSource, SharedSnapshot, Snapshot,
    TimeRemaining, power_draw,
};
pub use source::{SystemTelemetry, TelemetrySource};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
