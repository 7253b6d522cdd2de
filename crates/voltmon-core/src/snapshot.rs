//! Shared power/battery state.
//!
//! [`Snapshot`] is the single record of everything the dashboard shows. The
//! collector thread owns every field except the poll mode, which the renderer
//! changes in response to key presses. Both sides go through
//! [`SharedSnapshot`], a cloneable handle around one mutex, so a reader always
//! sees a whole collector cycle or none of it.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use crate::parse::{PrimaryReading, SecondaryReading};

/// Samples retained per history buffer.
pub const HISTORY_CAPACITY: usize = 100;

/// Raw `TimeRemaining` value meaning the gauge has no estimate yet.
pub const TIME_REMAINING_CALCULATING: u32 = 65535;

// ---------------------------------------------------------------------------
// PollMode
// ---------------------------------------------------------------------------

/// Named polling presets for the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PollMode {
    /// 0.5s between cycles.
    Performance,
    /// 2s between cycles.
    #[default]
    Balanced,
    /// 5s between cycles.
    Eco,
}

impl PollMode {
    pub const ALL: [PollMode; 3] = [Self::Performance, Self::Balanced, Self::Eco];

    /// Delay between collector cycles, in seconds.
    pub fn interval_secs(self) -> f64 {
        match self {
            Self::Performance => 0.5,
            Self::Balanced => 2.0,
            Self::Eco => 5.0,
        }
    }

    pub fn interval(self) -> Duration {
        Duration::from_secs_f64(self.interval_secs())
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Performance => "PERFORMANCE",
            Self::Balanced => "BALANCED",
            Self::Eco => "ECO",
        }
    }
}

impl fmt::Display for PollMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PollMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "performance" | "perf" | "p" => Ok(Self::Performance),
            "balanced" | "b" => Ok(Self::Balanced),
            "eco" | "e" => Ok(Self::Eco),
            _ => Err(format!("unknown poll mode '{s}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Where the machine is drawing power from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PowerSource {
    #[default]
    Unknown,
    Ac,
    Battery,
}

impl fmt::Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Ac => write!(f, "AC Power"),
            Self::Battery => write!(f, "Battery"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ChargingStatus {
    #[default]
    Unknown,
    Charging,
    Discharging,
    /// On external power but neither charging nor full.
    Connected,
    FullyCharged,
}

impl fmt::Display for ChargingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Charging => write!(f, "Charging"),
            Self::Discharging => write!(f, "Discharging"),
            Self::Connected => write!(f, "Connected"),
            Self::FullyCharged => write!(f, "Fully Charged"),
        }
    }
}

/// Gauge estimate of time to empty (or to full while charging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TimeRemaining {
    #[default]
    Unknown,
    Calculating,
    Minutes(u32),
}

impl TimeRemaining {
    /// Interpret a raw minute count, honouring the "calculating" sentinel.
    pub fn from_minutes(raw: u32) -> Self {
        if raw == TIME_REMAINING_CALCULATING {
            Self::Calculating
        } else {
            Self::Minutes(raw)
        }
    }
}

impl fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Calculating => write!(f, "Calculating..."),
            Self::Minutes(m) => write!(f, "{}h {}m", m / 60, m % 60),
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// Fixed-capacity FIFO of samples; the oldest sample is evicted on overflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct History {
    samples: VecDeque<f64>,
    #[serde(skip)]
    capacity: usize,
}

impl History {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.capacity == 0 {
            return;
        }
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Oldest-first iterator over the retained samples.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// The most recent `n` samples, oldest first.
    pub fn recent(&self, n: usize) -> Vec<f64> {
        let skip = self.samples.len().saturating_sub(n);
        self.samples.iter().skip(skip).copied().collect()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Latest known power state plus bounded history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub power_source: PowerSource,
    pub charging_status: ChargingStatus,
    pub charger_connected: bool,
    pub low_power_mode: bool,
    /// Battery condition reported by the system profiler (e.g. `Normal`).
    pub condition: String,

    /// State of charge, 0–100.
    pub battery_percent: u8,
    /// Full-charge capacity as a percentage of design capacity.
    pub max_capacity_percent: f64,
    pub cycle_count: u64,
    pub design_capacity: u64,
    pub current_capacity: u64,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Volts.
    pub voltage: f64,
    /// Milliamps; negative while discharging.
    pub amperage: i64,
    /// Watts, always non-negative.
    pub power_watts: f64,
    pub adapter_voltage: f64,
    pub adapter_current: u64,
    pub adapter_watts: u64,

    pub time_remaining: TimeRemaining,

    pub mode: PollMode,
    /// Seconds between collector cycles.
    pub poll_interval: f64,

    pub power_history: History,
    pub temp_history: History,

    /// Wall-clock time of the last successful primary update.
    pub last_update_unix_ms: Option<u64>,
    /// Duration of the last primary fetch + parse, in milliseconds.
    pub poll_latency_ms: u64,
    /// Completed primary updates.
    pub cycles: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        let mode = PollMode::default();
        Self {
            power_source: PowerSource::Unknown,
            charging_status: ChargingStatus::Unknown,
            charger_connected: false,
            low_power_mode: false,
            condition: "Checking...".to_string(),
            battery_percent: 0,
            max_capacity_percent: 100.0,
            cycle_count: 0,
            design_capacity: 0,
            current_capacity: 0,
            temperature: 0.0,
            voltage: 0.0,
            amperage: 0,
            power_watts: 0.0,
            adapter_voltage: 0.0,
            adapter_current: 0,
            adapter_watts: 0,
            time_remaining: TimeRemaining::Unknown,
            mode,
            poll_interval: mode.interval_secs(),
            power_history: History::default(),
            temp_history: History::default(),
            last_update_unix_ms: None,
            poll_latency_ms: 0,
            cycles: 0,
        }
    }
}

impl Snapshot {
    pub fn with_mode(mode: PollMode) -> Self {
        let mut snapshot = Self::default();
        snapshot.set_mode(mode);
        snapshot
    }

    /// Switch polling preset; mode and interval always move together.
    pub fn set_mode(&mut self, mode: PollMode) {
        self.mode = mode;
        self.poll_interval = mode.interval_secs();
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval.max(0.0))
    }

    /// Whether current is flowing into the battery.
    pub fn is_charging(&self) -> bool {
        self.charging_status == ChargingStatus::Charging || self.amperage > 50
    }

    /// Merge one primary reading. Fields the reading lacks keep their value.
    pub fn apply_primary(&mut self, reading: &PrimaryReading) {
        let external = reading.external_connected;
        if let Some(connected) = external {
            self.charger_connected = connected;
            self.power_source = if connected {
                PowerSource::Ac
            } else {
                PowerSource::Battery
            };
        }

        if let (Some(current), Some(max)) = (reading.current_capacity, reading.max_capacity)
            && let Some(percent) = capacity_percent(current, max)
        {
            self.battery_percent = percent.round().clamp(0.0, 100.0) as u8;
        }

        if reading.fully_charged.is_some() || reading.is_charging.is_some() || external.is_some() {
            let connected = external.unwrap_or(self.charger_connected);
            self.charging_status = if reading.fully_charged == Some(true) {
                ChargingStatus::FullyCharged
            } else if reading.is_charging == Some(true) {
                ChargingStatus::Charging
            } else if connected {
                ChargingStatus::Connected
            } else {
                ChargingStatus::Discharging
            };
        }

        if let Some(t) = reading.time_remaining {
            self.time_remaining = t;
        }
        if let Some(t) = reading.temperature {
            self.temperature = t;
        }
        if let Some(v) = reading.voltage {
            self.voltage = v;
        }
        if let Some(a) = reading.amperage {
            self.amperage = a;
        }
        if let Some(c) = reading.cycle_count {
            self.cycle_count = c;
        }
        if let Some(d) = reading.design_capacity {
            self.design_capacity = d;
        }
        if let Some(raw_max) = reading.raw_max_capacity {
            self.current_capacity = raw_max;
            if let Some(health) = capacity_percent(raw_max, self.design_capacity) {
                self.max_capacity_percent = round_to(health, 1);
            }
        }

        let adapter = &reading.adapter;
        if let Some(v) = adapter.voltage {
            self.adapter_voltage = v;
        }
        if let Some(c) = adapter.current {
            self.adapter_current = c;
        }
        if let Some(w) = adapter.watts {
            self.adapter_watts = w;
        }

        self.recompute_power();
    }

    pub fn apply_secondary(&mut self, reading: &SecondaryReading) {
        if let Some(condition) = &reading.condition {
            self.condition.clone_from(condition);
        }
        if let Some(low_power) = reading.low_power_mode {
            self.low_power_mode = low_power;
        }
    }

    /// Power draw from the current voltage/amperage pair.
    pub fn recompute_power(&mut self) {
        self.power_watts = power_draw(self.voltage, self.amperage);
    }

    /// Append the current power draw and temperature to history.
    pub fn record_history(&mut self) {
        self.power_history.push(self.power_watts);
        self.temp_history.push(self.temperature);
    }
}

/// `voltage × |amperage| / 1000`, rounded to 2 decimals.
pub fn power_draw(voltage: f64, amperage_ma: i64) -> f64 {
    round_to(voltage * amperage_ma.unsigned_abs() as f64 / 1000.0, 2)
}

/// `part / whole × 100`, or `None` when the ratio is undefined.
fn capacity_percent(part: u64, whole: u64) -> Option<f64> {
    if whole == 0 {
        return None;
    }
    Some(part as f64 / whole as f64 * 100.0)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

// ---------------------------------------------------------------------------
// SharedSnapshot
// ---------------------------------------------------------------------------

/// Cloneable handle to the one shared [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SharedSnapshot {
    inner: Arc<Mutex<Snapshot>>,
}

impl SharedSnapshot {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            inner: Arc::new(Mutex::new(snapshot)),
        }
    }

    // A panic on the other side must not wedge the dashboard.
    fn lock(&self) -> MutexGuard<'_, Snapshot> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run `f` with exclusive access; everything it writes becomes visible at once.
    pub fn update<R>(&self, f: impl FnOnce(&mut Snapshot) -> R) -> R {
        f(&mut self.lock())
    }

    /// Consistent copy of the whole snapshot, taken under a single lock.
    pub fn read(&self) -> Snapshot {
        self.lock().clone()
    }

    pub fn set_mode(&self, mode: PollMode) {
        self.lock().set_mode(mode);
    }

    pub fn mode(&self) -> PollMode {
        self.lock().mode
    }

    pub fn poll_interval(&self) -> Duration {
        self.lock().poll_interval()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
