//! TUI application state and frame loop.
//!
//! The collector runs on its own thread and owns the snapshot's telemetry
//! fields. This loop waits briefly for one key press, applies it, copies the
//! snapshot under the lock, draws from the copy, then sleeps a fixed frame
//! delay.

use std::io;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;

use voltmon_core::{PollMode, SharedSnapshot, ShutdownFlag};

use super::ui::View;

/// Longest wait for a key press each frame.
pub const INPUT_WAIT: Duration = Duration::from_millis(200);

/// Pause after each frame; keeps redraws near 20 per second.
pub const FRAME_DELAY: Duration = Duration::from_millis(50);

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetMode(PollMode),
    Quit,
}

/// Map a key event to a dashboard command.
pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Command::Quit),
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Some(Command::Quit),
        KeyCode::Char('p' | 'P') => Some(Command::SetMode(PollMode::Performance)),
        KeyCode::Char('b' | 'B') => Some(Command::SetMode(PollMode::Balanced)),
        KeyCode::Char('e' | 'E') => Some(Command::SetMode(PollMode::Eco)),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    shared: SharedSnapshot,
    shutdown: ShutdownFlag,
    running: bool,
    frame: u64,
}

impl App {
    pub fn new(shared: SharedSnapshot, shutdown: ShutdownFlag) -> Self {
        Self {
            shared,
            shutdown,
            running: true,
            frame: 0,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(t) => t,
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
                return Err(e);
            }
        };

        // Install panic hook that restores terminal before printing the panic.
        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        // Always restore terminal, even if the loop returned an error.
        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        while self.running && !self.shutdown.is_cancelled() {
            if event::poll(INPUT_WAIT)?
                && let Event::Key(key) = event::read()?
                && key.kind == KeyEventKind::Press
                && let Some(cmd) = command_for_key(key)
            {
                self.apply(cmd);
            }
            if !self.running {
                break;
            }

            let view = self.view();
            terminal.draw(|f| super::ui::draw(f, &view))?;
            self.frame = self.frame.wrapping_add(1);

            thread::sleep(FRAME_DELAY);
        }

        Ok(())
    }

    pub fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::SetMode(mode) => {
                self.shared.set_mode(mode);
                log::info!("poll mode set to {mode} ({:.1}s)", mode.interval_secs());
            }
            Command::Quit => {
                log::info!("quit requested");
                self.shutdown.cancel();
                self.running = false;
            }
        }
    }

    /// Everything one frame needs, copied under a single lock.
    pub fn view(&self) -> View {
        View {
            snapshot: self.shared.read(),
            frame: self.frame,
            now_unix_ms: unix_ms_now(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

fn unix_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
