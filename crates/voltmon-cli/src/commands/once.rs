use voltmon_core::{SystemTelemetry, collect_report};

pub fn run(json: bool) {
    let source = SystemTelemetry::new();
    if !source.is_available() {
        log::warn!("battery registry query unavailable on this machine");
    }

    let report = collect_report(&source);
    if json {
        match report.to_json() {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error encoding report: {e}");
                std::process::exit(1);
            }
        }
    } else {
        print!("{}", report.to_text());
    }
}
