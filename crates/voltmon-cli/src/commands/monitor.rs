use voltmon_core::{Collector, PollMode, SharedSnapshot, ShutdownFlag, Snapshot, SystemTelemetry};

pub fn run(mode: PollMode) {
    let source = SystemTelemetry::new();
    if !source.is_available() {
        log::warn!("battery registry query unavailable; dashboard will show defaults");
    }

    let shared = SharedSnapshot::new(Snapshot::with_mode(mode));
    let shutdown = ShutdownFlag::new();

    // Raw mode turns Ctrl+C into a key event; this covers SIGINT from elsewhere.
    let flag = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.cancel()) {
        log::warn!("could not install SIGINT handler: {e}");
    }

    let collector = match Collector::new(Box::new(source), shared.clone()).spawn(shutdown.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error starting collector: {e}");
            std::process::exit(1);
        }
    };

    let mut app = crate::tui::app::App::new(shared, shutdown);
    let result = app.run();
    collector.stop();

    if let Err(e) = result {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
    println!("\n\u{1F44B} Power monitoring stopped.\n");
}
