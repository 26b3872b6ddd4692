use tokio::task::JoinHandle;
use tracing::{Subscriber, subscriber::set_global_default};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt};

use crate::configuration::LogConfig;

/// Build a subscriber filtered by `RUST_LOG`, falling back to `env_filter`.
///
/// With `json` set every event is written as one JSON object per line.
pub fn get_subscriber<Sink>(env_filter: &str, json: bool, sink: Sink) -> impl Subscriber + Sync + Send
where
    Sink: for<'a> MakeWriter<'a> + Clone + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(sink.clone())
    });

    let fmt_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_thread_ids(true)
            .with_target(true)
            .with_writer(sink)
    });

    Registry::default()
        .with(env_filter)
        .with(json_layer)
        .with(fmt_layer)
}

pub fn spawn_blocking_with_tracing<F, R>(f: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let current_span = tracing::Span::current();
    tokio::task::spawn_blocking(move || current_span.in_scope(f))
}

pub fn init_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    LogTracer::init().expect("Failed to set logger");
    set_global_default(subscriber).expect("Failed to set subscriber");
}

/// Install the process-wide subscriber writing to stdout.
pub fn init_logger(cfg: &LogConfig) {
    let subscriber = get_subscriber(&cfg.level, cfg.json, std::io::stdout);
    init_subscriber(subscriber);
}
