//! One-shot diagnostic dump for `voltmon --once`.

use std::fmt::Write as _;

use serde::Serialize;

use crate::parse::{parse_primary, parse_secondary};
use crate::snapshot::Snapshot;
use crate::source::TelemetrySource;

/// Registry keys worth echoing verbatim in the dump.
const HIGHLIGHT_KEYS: &[&str] = &["Amperage", "Voltage", "Wattage", "Temperature"];

/// Everything the one-shot mode prints.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub battery_summary: String,
    pub registry_highlights: Vec<String>,
    pub snapshot: Snapshot,
}

/// Run every query once and parse the results into a fresh snapshot.
pub fn collect_report(source: &dyn TelemetrySource) -> DiagnosticReport {
    let battery_summary = source.battery_summary();
    let registry = source.battery_registry();
    let profile = source.power_profile();
    let settings = source.power_settings();

    let mut snapshot = Snapshot::default();
    if !registry.trim().is_empty() {
        snapshot.apply_primary(&parse_primary(&registry));
    }
    snapshot.apply_secondary(&parse_secondary(&profile, &settings));

    DiagnosticReport {
        battery_summary: battery_summary.trim_end().to_string(),
        registry_highlights: registry_highlights(&registry),
        snapshot,
    }
}

/// Registry lines mentioning any of the highlight keys, trimmed.
pub fn registry_highlights(registry: &str) -> Vec<String> {
    registry
        .lines()
        .filter(|line| HIGHLIGHT_KEYS.iter().any(|k| line.contains(k)))
        .map(|line| line.trim().to_string())
        .collect()
}

impl DiagnosticReport {
    pub fn to_text(&self) -> String {
        let s = &self.snapshot;
        let mut out = String::new();
        let _ = writeln!(out, "Rapid Power Check:");
        if self.battery_summary.is_empty() {
            let _ = writeln!(out, "  (battery summary unavailable)");
        } else {
            let _ = writeln!(out, "{}", self.battery_summary);
        }
        for line in &self.registry_highlights {
            let _ = writeln!(out, "{line}");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "  Source:      {}", s.power_source);
        let _ = writeln!(out, "  Status:      {}", s.charging_status);
        let _ = writeln!(out, "  Charge:      {}%", s.battery_percent);
        let _ = writeln!(out, "  Time left:   {}", s.time_remaining);
        let _ = writeln!(
            out,
            "  Power:       {:.2}W  ({}mA @ {:.2}V)",
            s.power_watts, s.amperage, s.voltage
        );
        let _ = writeln!(out, "  Temperature: {:.1}\u{00b0}C", s.temperature);
        let _ = writeln!(
            out,
            "  Health:      {:.1}% of design, {} cycles, {}",
            s.max_capacity_percent, s.cycle_count, s.condition
        );
        if s.charger_connected {
            let _ = writeln!(
                out,
                "  Charger:     {}W  ({:.1}V, {}mA)",
                s.adapter_watts, s.adapter_voltage, s.adapter_current
            );
        }
        let _ = writeln!(
            out,
            "  Low power:   {}",
            if s.low_power_mode { "ON" } else { "OFF" }
        );
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::PowerSource;

    struct Canned;

    impl TelemetrySource for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }
        fn battery_registry(&self) -> String {
            concat!(
                "  \"ExternalConnected\" = Yes\n",
                "  \"Voltage\" = 12500\n",
                "  \"InstantAmperage\" = 2000\n",
                "  \"CycleCount\" = 12\n",
                "  \"AdapterDetails\" = {\"Watts\"=67,\"AdapterVoltage\"=20000,\"Current\"=3350}\n",
            )
            .to_string()
        }
        fn power_profile(&self) -> String {
            "Condition: Normal".into()
        }
        fn power_settings(&self) -> String {
            " lowpowermode 0".into()
        }
        fn battery_summary(&self) -> String {
            "Now drawing from 'AC Power'\n -InternalBattery-0 (id=123)\t87%; charging\n".into()
        }
    }

    #[test]
    fn highlights_filter_registry_lines() {
        let lines = registry_highlights("\"Voltage\" = 1\n\"CycleCount\" = 2\n  \"InstantAmperage\" = 3\n");
        assert_eq!(lines, vec!["\"Voltage\" = 1", "\"InstantAmperage\" = 3"]);
    }

    #[test]
    fn report_parses_all_sources() {
        let report = collect_report(&Canned);
        let s = &report.snapshot;
        assert_eq!(s.power_source, PowerSource::Ac);
        assert_eq!(s.cycle_count, 12);
        assert!((s.power_watts - 25.0).abs() < 1e-9);
        assert_eq!(s.adapter_watts, 67);
        assert_eq!(s.condition, "Normal");
        assert!(!s.low_power_mode);
        assert_eq!(report.registry_highlights.len(), 3);
    }

    #[test]
    fn text_dump_mentions_key_values() {
        let text = collect_report(&Canned).to_text();
        assert!(text.starts_with("Rapid Power Check:"));
        assert!(text.contains("87%; charging"));
        assert!(text.contains("25.00W"));
        assert!(text.contains("Charger:     67W"));
        assert!(text.contains("Low power:   OFF"));
    }

    #[test]
    fn json_dump_is_valid() {
        let json = collect_report(&Canned).to_json().unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["snapshot"]["cycle_count"], 12);
        assert_eq!(v["snapshot"]["power_source"], "Ac");
    }
}
