use std::sync::Arc;

use tracing::{Metadata, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{filter, fmt, prelude::*, EnvFilter, Layer};

/// Target of the per-user decision lines (`[SKIP]`, `[ENCRYPT]`, `[ERROR]`).
/// They carry the user's email, so they go to stdout only and never to Sentry.
pub const DECISION_TARGET: &str = "migrate::decision";

/// Target of the structured failure events sent to Sentry. Keyed by user id
/// and field, never by email. Kept off stdout, which already has the
/// matching decision line.
pub const REPORT_TARGET: &str = "migrate::report";

/// Initialize tracing with a stdout layer and a Sentry layer.
///
/// - Stdout: one compact line per event, no targets or file locations, so the
///   run log reads as a plain list of decisions
/// - Sentry: captures ERROR events as issues, WARN as breadcrumbs, except
///   decision lines
/// - Default level: INFO, override via RUST_LOG env
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A second init (e.g. from a test harness) keeps the first subscriber.
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer(std::io::stdout, true))
        .with(sentry_layer())
        .try_init()
        .is_err()
    {
        return;
    }

    tracing::debug!("Tracing initialized");
}

fn stdout_layer<S, W>(writer: W, ansi: bool) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(filter::filter_fn(|meta| meta.target() != REPORT_TARGET))
}

/// No-op when Sentry DSN is not configured.
fn sentry_layer<S>() -> sentry_tracing::SentryLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    sentry_tracing::layer().event_filter(sentry_event_filter)
}

fn sentry_event_filter(meta: &Metadata<'_>) -> sentry_tracing::EventFilter {
    if meta.target() == DECISION_TARGET {
        return sentry_tracing::EventFilter::Ignore;
    }
    match *meta.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Client options for the binary's Sentry guard.
pub fn sentry_options() -> sentry::ClientOptions {
    sentry::ClientOptions {
        dsn: option_env!("SENTRY_DSN").and_then(|s| s.parse().ok()),
        release: Some(env!("CARGO_PKG_VERSION").into()),
        traces_sample_rate: 0.0,
        send_default_pii: false,
        before_send: Some(Arc::new(|mut event| {
            if let Some(ref mut user) = event.user {
                user.email = None;
                user.ip_address = None;
                user.username = None;
            }
            Some(event)
        })),
        ..Default::default()
    }
}
