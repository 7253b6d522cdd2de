//! Logger setup.
//!
//! The dashboard owns the terminal, so in interactive mode logs go to
//! `--log-file` or nowhere. The one-shot mode logs warnings to stderr.

use std::fs::File;
use std::path::{Path, PathBuf};

use env_logger::{Builder, Target, WriteStyle};

const FILE_DEFAULT_LEVEL: &str = "info";
const STDERR_DEFAULT_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Destination {
    Off,
    File(PathBuf),
    Stderr,
}

fn plan(log_file: Option<&Path>, level: Option<&str>, interactive: bool) -> (Destination, String) {
    match (log_file, interactive) {
        (Some(path), _) => (
            Destination::File(path.to_path_buf()),
            level.unwrap_or(FILE_DEFAULT_LEVEL).to_string(),
        ),
        (None, true) => (Destination::Off, "off".to_string()),
        (None, false) => (
            Destination::Stderr,
            level.unwrap_or(STDERR_DEFAULT_LEVEL).to_string(),
        ),
    }
}

/// Install the global logger. Safe to call more than once; later calls are ignored.
pub fn init(log_file: Option<&Path>, level: Option<&str>, interactive: bool) {
    let (destination, filters) = plan(log_file, level, interactive);

    let mut builder = Builder::new();
    builder.format_timestamp_millis().parse_filters(&filters);

    match destination {
        Destination::Off => {
            builder.filter_level(log::LevelFilter::Off);
        }
        Destination::Stderr => {
            builder.target(Target::Stderr);
        }
        Destination::File(path) => match File::create(&path) {
            Ok(file) => {
                builder
                    .target(Target::Pipe(Box::new(file)))
                    .write_style(WriteStyle::Never);
            }
            Err(e) => {
                eprintln!("Warning: cannot open log file {}: {e}", path.display());
                builder.filter_level(log::LevelFilter::Off);
            }
        },
    }

    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_without_file_is_silent() {
        let (dest, filters) = plan(None, Some("debug"), true);
        assert_eq!(dest, Destination::Off);
        assert_eq!(filters, "off");
    }

    #[test]
    fn file_defaults_to_info() {
        let (dest, filters) = plan(Some(Path::new("/tmp/voltmon.log")), None, true);
        assert_eq!(dest, Destination::File(PathBuf::from("/tmp/voltmon.log")));
        assert_eq!(filters, "info");
    }

    #[test]
    fn once_mode_logs_warnings_to_stderr() {
        assert_eq!(plan(None, None, false), (Destination::Stderr, "warn".to_string()));
        assert_eq!(
            plan(None, Some("trace"), false),
            (Destination::Stderr, "trace".to_string())
        );
    }
}
