//! Telemetry sources: the queries the collector runs.
//!
//! Every source implements [`TelemetrySource`], one method per query, each
//! returning raw text (empty when nothing could be read). [`SystemTelemetry`]
//! runs the macOS power-management utilities; tests substitute canned text.

use std::time::Duration;

use crate::command::{DEFAULT_COMMAND_TIMEOUT, run_command_with_timeout};

/// A fixed program + argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

impl Query {
    pub fn is_available(&self) -> bool {
        std::path::Path::new(self.program).exists()
    }

    pub fn run(&self, timeout: Duration) -> String {
        run_command_with_timeout(self.program, self.args, timeout)
    }
}

/// Battery registry: charge, flags, voltage, amperage, capacities, adapter.
pub const BATTERY_REGISTRY: Query = Query {
    program: "/usr/sbin/ioreg",
    args: &["-w0", "-rn", "AppleSmartBattery"],
};

/// System profiler power report (battery condition).
pub const POWER_PROFILE: Query = Query {
    program: "/usr/sbin/system_profiler",
    args: &["SPPowerDataType"],
};

/// Power-management settings (low power mode).
pub const POWER_SETTINGS: Query = Query {
    program: "/usr/bin/pmset",
    args: &["-g"],
};

/// Short battery summary, used by the one-shot diagnostic dump.
pub const BATTERY_SUMMARY: Query = Query {
    program: "/usr/bin/pmset",
    args: &["-g", "batt"],
};

/// Provider of raw telemetry text.
pub trait TelemetrySource: Send {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Primary per-cycle counters.
    fn battery_registry(&self) -> String;

    /// Text containing a `Condition: <word>` line.
    fn power_profile(&self) -> String;

    /// Text containing a `lowpowermode <0|1>` line.
    fn power_settings(&self) -> String;

    /// Human-oriented battery summary.
    fn battery_summary(&self) -> String;
}

/// Subprocess-backed source using the stock macOS utilities.
#[derive(Debug, Clone)]
pub struct SystemTelemetry {
    timeout: Duration,
}

impl SystemTelemetry {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Whether the primary query can run on this machine.
    pub fn is_available(&self) -> bool {
        BATTERY_REGISTRY.is_available()
    }
}

impl Default for SystemTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySource for SystemTelemetry {
    fn name(&self) -> &'static str {
        "system"
    }

    fn battery_registry(&self) -> String {
        BATTERY_REGISTRY.run(self.timeout)
    }

    fn power_profile(&self) -> String {
        POWER_PROFILE.run(self.timeout)
    }

    fn power_settings(&self) -> String {
        POWER_SETTINGS.run(self.timeout)
    }

    fn battery_summary(&self) -> String {
        BATTERY_SUMMARY.run(self.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_use_absolute_programs() {
        for q in [BATTERY_REGISTRY, POWER_PROFILE, POWER_SETTINGS, BATTERY_SUMMARY] {
            assert!(q.program.starts_with('/'), "{}", q.program);
            assert!(!q.args.is_empty());
        }
    }

    #[test]
    fn registry_query_targets_smart_battery() {
        assert_eq!(BATTERY_REGISTRY.args, &["-w0", "-rn", "AppleSmartBattery"]);
    }

    #[test]
    fn missing_program_reads_as_empty() {
        let q = Query {
            program: "/nonexistent/voltmon",
            args: &[],
        };
        assert!(!q.is_available());
        assert!(q.run(Duration::from_millis(100)).is_empty());
    }

    #[test]
    #[cfg(target_os = "macos")]
    #[ignore] // Run with: cargo test -- --ignored
    fn system_registry_has_capacity() {
        let src = SystemTelemetry::new();
        if src.is_available() {
            assert!(src.battery_registry().contains("CurrentCapacity"));
        }
    }
}
