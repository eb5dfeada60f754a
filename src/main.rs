use std::process::ExitCode;

fn main() -> ExitCode {
    // Initialize Sentry before anything else so panics during startup are captured.
    // Returns a no-op guard when SENTRY_DSN is absent (local runs).
    let _sentry_guard = sentry::init(migrate_lib::logging::sentry_options());

    ExitCode::from(migrate_lib::run())
}
