//! voltmon — live laptop power and battery dashboard.

mod commands;
mod logging;
mod tui;

use std::path::PathBuf;

use clap::Parser;
use voltmon_core::PollMode;

#[derive(Parser)]
#[command(name = "voltmon")]
#[command(about = "voltmon — real-time power in/out for your laptop battery")]
#[command(version = voltmon_core::VERSION)]
struct Cli {
    /// Print a single diagnostic dump and exit instead of opening the dashboard
    #[arg(long)]
    once: bool,

    /// With --once, print the parsed snapshot as JSON
    #[arg(long, requires = "once")]
    json: bool,

    /// Initial polling mode: performance (0.5s), balanced (2s), eco (5s)
    #[arg(long, default_value = "balanced")]
    mode: PollMode,

    /// Write diagnostic logs to this file (the dashboard never logs to the terminal)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log verbosity (default: info to --log-file, warn to stderr with --once)
    #[arg(long, value_parser = ["off", "error", "warn", "info", "debug", "trace"])]
    log_level: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    logging::init(cli.log_file.as_deref(), cli.log_level.as_deref(), !cli.once);

    if cli.once {
        commands::once::run(cli.json);
    } else {
        commands::monitor::run(cli.mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_launch_dashboard_in_balanced_mode() {
        let cli = Cli::try_parse_from(["voltmon"]).unwrap();
        assert!(!cli.once);
        assert!(!cli.json);
        assert_eq!(cli.mode, PollMode::Balanced);
        assert!(cli.log_file.is_none());
    }

    #[test]
    fn json_requires_once() {
        assert!(Cli::try_parse_from(["voltmon", "--json"]).is_err());
        let cli = Cli::try_parse_from(["voltmon", "--once", "--json"]).unwrap();
        assert!(cli.once && cli.json);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["voltmon", "--mode", "turbo"]).is_err());
        let cli = Cli::try_parse_from(["voltmon", "--mode", "eco"]).unwrap();
        assert_eq!(cli.mode, PollMode::Eco);
        let cli = Cli::try_parse_from(["voltmon", "--mode", "Performance"]).unwrap();
        assert_eq!(cli.mode, PollMode::Performance);
    }
}
