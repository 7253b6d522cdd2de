//! TUI rendering.
//!
//! ```text
//!              ⚡ VOLTMON ⚡
//!            Mode: BALANCED
//! ╭──────────── ⚡ POWER SOURCE ────────────╮
//! │ Source:   🔌 AC Power                    │
//! │ Status:   Charging                       │
//! │ Flow:     ━━⚡━▶━━                        │
//! ╰──────────────────────────────────────────╯
//! ╭──────────── 🔋 BATTERY STATUS ──────────╮
//! │ [█████████████████░░░░░] 87%             │
//! │ Health / Condition / Cycles / Time Left  │
//! ╰──────────────────────────────────────────╯
//! ╭── 📊 METRICS ──╮ ╭── 🔌 CHARGER ──╮
//! ╰────────────────╯ ╰────────────────╯
//! ╭──────────── 📈 HISTORY ─────────────────╮
//! │ W  ▂▃▄▅▆▇█▇▆                             │
//! │ °C ▄▄▄▅▅▅▅                               │
//! ╰──────────────────────────────────────────╯
//!   [P]erf | [B]alanced | [E]co | 'q' to quit
//!   Poll: 12ms | Interval: 2.0s | Updated 1s ago
//! ```

use ratatui::{prelude::*, widgets::*};

use voltmon_core::{PollMode, PowerSource, Snapshot};

/// Smallest terminal that fits the dashboard.
pub const MIN_WIDTH: u16 = 70;
pub const MIN_HEIGHT: u16 = 25;

/// The history panel only appears on terminals taller than this.
const HISTORY_MIN_HEIGHT: u16 = 28;

/// Width of the dashboard column.
const PANEL_WIDTH: u16 = 66;

/// Samples shown in each history row.
pub const GRAPH_WIDTH: usize = 60;

const LEVELS: [char; 8] = [' ', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Everything needed to draw one frame.
pub struct View {
    pub snapshot: Snapshot,
    pub frame: u64,
    pub now_unix_ms: u64,
}

pub fn draw(f: &mut Frame, view: &View) {
    let area = f.area();
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        draw_too_small(f, area);
        return;
    }

    let show_history = area.height > HISTORY_MIN_HEIGHT;
    let column = Layout::horizontal([
        Constraint::Length(2),
        Constraint::Length(PANEL_WIDTH),
        Constraint::Min(0),
    ])
    .split(area)[1];

    let rows = Layout::vertical([
        Constraint::Length(2),                                 // header
        Constraint::Length(5),                                 // power source
        Constraint::Length(7),                                 // battery
        Constraint::Length(6),                                 // metrics + charger
        Constraint::Length(if show_history { 4 } else { 0 }), // history
        Constraint::Min(0),
        Constraint::Length(2), // footer
    ])
    .split(column);

    let s = &view.snapshot;
    draw_header(f, rows[0], s);
    draw_power_source(f, rows[1], s, view.frame);
    draw_battery(f, rows[2], s);
    draw_metrics_row(f, rows[3], s);
    if show_history {
        draw_history(f, rows[4], s);
    }
    draw_footer(f, rows[6], view);
}

fn draw_too_small(f: &mut Frame, area: Rect) {
    let msg = Paragraph::new(format!(
        "Terminal too small (min {MIN_WIDTH}x{MIN_HEIGHT})"
    ))
    .style(Style::default().fg(Color::Red));
    f.render_widget(msg, area);
}

fn panel(title: &str) -> Block<'_> {
    Block::bordered()
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Blue))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().bold().fg(Color::White),
        ))
        .title_alignment(Alignment::Center)
}

fn label(text: &str, width: usize) -> Span<'static> {
    Span::styled(format!("{text:<width$}"), Style::default().fg(Color::White))
}

fn draw_header(f: &mut Frame, area: Rect, s: &Snapshot) {
    let mode_color = match s.mode {
        PollMode::Eco => Color::Green,
        PollMode::Balanced => Color::Yellow,
        PollMode::Performance => Color::Red,
    };
    let lines = vec![
        Line::from(Span::styled(
            "\u{26A1} VOLTMON \u{26A1}",
            Style::default().bold().fg(Color::Cyan),
        ))
        .centered(),
        Line::from(Span::styled(
            format!("Mode: {}", s.mode),
            Style::default().bold().fg(mode_color),
        ))
        .centered(),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

fn draw_power_source(f: &mut Frame, area: Rect, s: &Snapshot, frame: u64) {
    let (icon, color) = match s.power_source {
        PowerSource::Ac => ("\u{1F50C}", Color::Green),
        PowerSource::Battery => ("\u{1F50B}", Color::Yellow),
        PowerSource::Unknown => ("?", Color::DarkGray),
    };
    let charging = s.is_charging();
    let flow_color = if charging { Color::Green } else { Color::Yellow };

    let lines = vec![
        Line::from(vec![
            label("Source:", 16),
            Span::styled(
                format!("{icon} {}", s.power_source),
                Style::default().bold().fg(color),
            ),
        ]),
        Line::from(vec![label("Status:", 16), Span::raw(s.charging_status.to_string())]),
        Line::from(vec![
            label("Flow:", 16),
            Span::styled(
                flow_indicator(charging, frame),
                Style::default().bold().fg(flow_color),
            ),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines).block(panel("\u{26A1} POWER SOURCE")),
        area,
    );
}

fn draw_battery(f: &mut Frame, area: Rect, s: &Snapshot) {
    let (filled, empty) = battery_bar(s.battery_percent, 35);
    let bar_color = charge_color(s.battery_percent);
    let health_color = if s.max_capacity_percent >= 80.0 {
        Color::Green
    } else {
        Color::Yellow
    };
    let condition_color = if s.condition.contains("Normal") {
        Color::Green
    } else {
        Color::Yellow
    };

    let lines = vec![
        Line::from(vec![
            Span::raw("["),
            Span::styled("\u{2588}".repeat(filled), Style::default().bold().fg(bar_color)),
            Span::styled("\u{2591}".repeat(empty), Style::default().fg(Color::DarkGray)),
            Span::raw(format!("] {}%", s.battery_percent)),
        ]),
        Line::from(vec![
            label("Health:", 16),
            Span::styled(
                format!("{:.1}% of design", s.max_capacity_percent),
                Style::default().fg(health_color),
            ),
        ]),
        Line::from(vec![
            label("Condition:", 16),
            Span::styled(s.condition.clone(), Style::default().fg(condition_color)),
        ]),
        Line::from(vec![
            label("Cycles:", 16),
            Span::raw(format!("{} cycles", s.cycle_count)),
        ]),
        Line::from(vec![
            label("Time Left:", 16),
            Span::styled(
                s.time_remaining.to_string(),
                Style::default().bold().fg(Color::Cyan),
            ),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines).block(panel("\u{1F50B} BATTERY STATUS")),
        area,
    );
}

fn draw_metrics_row(f: &mut Frame, area: Rect, s: &Snapshot) {
    let cols = Layout::horizontal([
        Constraint::Length(32),
        Constraint::Length(2),
        Constraint::Length(32),
    ])
    .split(area);

    draw_metrics(f, cols[0], s);
    if s.charger_connected {
        draw_charger(f, cols[2], s);
    }
}

fn draw_metrics(f: &mut Frame, area: Rect, s: &Snapshot) {
    let inbound = s.amperage >= 0;
    let (arrow, power_color) = if inbound {
        ("\u{2193}", Color::Green)
    } else {
        ("\u{2191}", Color::Yellow)
    };
    let temp_color = if s.temperature < 40.0 {
        Color::Green
    } else {
        Color::Red
    };

    let lines = vec![
        Line::from(vec![
            label("Power:", 10),
            Span::styled(
                format!("{arrow} {:.2}W", s.power_watts),
                Style::default().bold().fg(power_color),
            ),
        ]),
        Line::from(vec![
            label("Current:", 10),
            Span::raw(format!("{}mA", s.amperage.unsigned_abs())),
        ]),
        Line::from(vec![
            label("Voltage:", 10),
            Span::raw(format!("{:.2}V", s.voltage)),
        ]),
        Line::from(vec![
            label("Temp:", 10),
            Span::styled(
                format!("{:.1}\u{00B0}C", s.temperature),
                Style::default().fg(temp_color),
            ),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines).block(panel("\u{1F4CA} METRICS")),
        area,
    );
}

fn draw_charger(f: &mut Frame, area: Rect, s: &Snapshot) {
    let (lpm_text, lpm_color) = if s.low_power_mode {
        ("ON", Color::Yellow)
    } else {
        ("OFF", Color::DarkGray)
    };
    let lines = vec![
        Line::from(vec![
            label("Wattage:", 12),
            Span::styled(
                format!("{}W", s.adapter_watts),
                Style::default().bold().fg(Color::Green),
            ),
        ]),
        Line::from(vec![
            label("Adapter V:", 12),
            Span::raw(format!("{:.1}V", s.adapter_voltage)),
        ]),
        Line::from(vec![
            label("Adapter I:", 12),
            Span::raw(format!("{}mA", s.adapter_current)),
        ]),
        Line::from(vec![
            label("Low Power:", 12),
            Span::styled(lpm_text, Style::default().fg(lpm_color)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines).block(panel("\u{1F50C} CHARGER")),
        area,
    );
}

fn draw_history(f: &mut Frame, area: Rect, s: &Snapshot) {
    let power = sparkline(&s.power_history.recent(GRAPH_WIDTH));
    let temp = sparkline(&s.temp_history.recent(GRAPH_WIDTH));
    let lines = vec![
        Line::from(vec![
            label("W", 3),
            Span::styled(power, Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            label("\u{00B0}C", 3),
            Span::styled(temp, Style::default().fg(Color::Magenta)),
        ]),
    ];
    f.render_widget(
        Paragraph::new(lines).block(panel("\u{1F4C8} HISTORY")),
        area,
    );
}

fn draw_footer(f: &mut Frame, area: Rect, view: &View) {
    let s = &view.snapshot;
    let updated = match s.last_update_unix_ms {
        Some(at) => format!(
            "Updated {}s ago",
            view.now_unix_ms.saturating_sub(at) / 1000
        ),
        None => "Waiting for data".to_string(),
    };
    let lines = vec![
        Line::from(" [P]erf | [B]alanced | [E]co | 'q' to quit ").centered(),
        Line::from(Span::styled(
            format!(
                " Poll: {}ms | Interval: {:.1}s | {updated} ",
                s.poll_latency_ms, s.poll_interval
            ),
            Style::default().fg(Color::DarkGray),
        ))
        .centered(),
    ];
    f.render_widget(Paragraph::new(lines), area);
}

// ---------------------------------------------------------------------------
// Pure helpers
// ---------------------------------------------------------------------------

/// Filled and empty cell counts for a charge bar of `width` cells.
pub fn battery_bar(percent: u8, width: usize) -> (usize, usize) {
    let filled = (usize::from(percent.min(100)) * width) / 100;
    (filled, width - filled)
}

fn charge_color(percent: u8) -> Color {
    match percent {
        60.. => Color::Green,
        30..=59 => Color::Yellow,
        _ => Color::Red,
    }
}

/// Animated track with a bolt moving toward the battery while charging and
/// away from it otherwise.
pub fn flow_indicator(charging: bool, frame: u64) -> String {
    const TRACK: usize = 7;
    let step = (frame % 5) as usize;
    let (bolt, arrow_at, arrow) = if charging {
        (step, 4, '\u{25B6}')
    } else {
        (TRACK - 1 - step, 2, '\u{25C0}')
    };
    (0..TRACK)
        .map(|i| {
            if i == bolt {
                '\u{26A1}'
            } else if i == arrow_at {
                arrow
            } else {
                '\u{2501}'
            }
        })
        .collect()
}

/// Map samples onto 8 intensity levels relative to the window maximum.
pub fn history_levels(samples: &[f64]) -> Vec<usize> {
    let max = samples.iter().copied().fold(0.0_f64, f64::max);
    let divisor = if max > 0.0 { max } else { 1.0 };
    samples
        .iter()
        .map(|v| ((v / divisor) * 7.0).clamp(0.0, 7.0) as usize)
        .collect()
}

pub fn sparkline(samples: &[f64]) -> String {
    history_levels(samples)
        .into_iter()
        .map(|level| LEVELS[level])
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use voltmon_core::{ChargingStatus, TimeRemaining};

    fn render(width: u16, height: u16, view: &View) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, view)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn sample_view() -> View {
        let mut snapshot = Snapshot::default();
        snapshot.power_source = PowerSource::Ac;
        snapshot.charging_status = ChargingStatus::Charging;
        snapshot.charger_connected = true;
        snapshot.battery_percent = 87;
        snapshot.cycle_count = 42;
        snapshot.adapter_watts = 96;
        snapshot.time_remaining = TimeRemaining::Minutes(125);
        snapshot.condition = "Normal".into();
        snapshot.poll_latency_ms = 12;
        snapshot.last_update_unix_ms = Some(10_000);
        for w in [1.0, 2.0, 4.0] {
            snapshot.power_history.push(w);
        }
        View {
            snapshot,
            frame: 3,
            now_unix_ms: 13_500,
        }
    }

    #[test]
    fn small_terminal_shows_placeholder() {
        let text = render(40, 10, &sample_view());
        assert!(text.contains("Terminal too small (min 70x25)"));
        assert!(!text.contains("BALANCED"));
    }

    #[test]
    fn dashboard_renders_panels() {
        let text = render(80, 30, &sample_view());
        assert!(text.contains("Mode: BALANCED"));
        assert!(text.contains("AC Power"));
        assert!(text.contains("87%"));
        assert!(text.contains("42 cycles"));
        assert!(text.contains("2h 5m"));
        assert!(text.contains("96W"));
        assert!(text.contains("Interval: 2.0s"));
        assert!(text.contains("Updated 3s ago"));
    }

    #[test]
    fn charger_panel_hidden_on_battery() {
        let mut view = sample_view();
        view.snapshot.charger_connected = false;
        let text = render(80, 30, &view);
        assert!(!text.contains("Adapter V:"));
        assert!(text.contains("Voltage:"));
    }

    #[test]
    fn history_needs_tall_terminal() {
        assert!(render(80, 29, &sample_view()).contains("HISTORY"));
        assert!(!render(80, 26, &sample_view()).contains("HISTORY"));
    }

    #[test]
    fn battery_bar_splits_width() {
        assert_eq!(battery_bar(0, 35), (0, 35));
        assert_eq!(battery_bar(100, 35), (35, 0));
        assert_eq!(battery_bar(50, 30), (15, 15));
        assert_eq!(battery_bar(255, 10), (10, 0));
    }

    #[test]
    fn charge_colors_by_threshold() {
        assert_eq!(charge_color(90), Color::Green);
        assert_eq!(charge_color(60), Color::Green);
        assert_eq!(charge_color(45), Color::Yellow);
        assert_eq!(charge_color(10), Color::Red);
    }

    #[test]
    fn history_levels_normalize_to_window_max() {
        assert_eq!(history_levels(&[0.0, 3.5, 7.0]), vec![0, 3, 7]);
        assert_eq!(history_levels(&[2.0, 2.0]), vec![7, 7]);
    }

    #[test]
    fn history_levels_all_zero_uses_unit_divisor() {
        assert_eq!(history_levels(&[0.0, 0.0, 0.0]), vec![0, 0, 0]);
        assert_eq!(history_levels(&[-1.0, 0.0]), vec![0, 0]);
        assert!(history_levels(&[]).is_empty());
    }

    #[test]
    fn sparkline_glyphs() {
        assert_eq!(sparkline(&[0.0, 7.0]), " \u{2588}");
        assert_eq!(sparkline(&[1.0; 5]).chars().count(), 5);
    }

    #[test]
    fn flow_indicator_direction_and_motion() {
        let charging = flow_indicator(true, 0);
        let discharging = flow_indicator(false, 0);
        assert_eq!(charging.chars().count(), 7);
        assert!(charging.contains('\u{25B6}'));
        assert!(discharging.contains('\u{25C0}'));
        assert_ne!(flow_indicator(true, 0), flow_indicator(true, 1));
        assert_eq!(flow_indicator(true, 0), flow_indicator(true, 5));
    }
}
