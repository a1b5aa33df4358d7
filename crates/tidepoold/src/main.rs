use std::process::ExitCode;

fn main() -> ExitCode {
    match tidepoold::run_daemon() {
        Ok(outcome) => outcome.exit_status.into(),
        Err(error) => {
            // Telemetry may not be installed yet, so report directly.
            eprintln!("tidepoold: {error}");
            ExitCode::FAILURE
        }
    }
}
