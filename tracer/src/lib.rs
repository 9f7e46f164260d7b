use tracing::subscriber::set_global_default;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Initializes the process-wide tracing subscriber.
///
/// The recorder core runs on-device (§1, mobile, tight latency budget), so
/// this never wires an OTLP exporter — there is no collector to ship
/// spans to from inside a phone process. It keeps a pretty stdout layer
/// and env-filter driven level instead.
pub fn init_tracing(log_level: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.unwrap_or("info")));

    let stdout_layer = tracing_subscriber::fmt::layer().pretty();

    let subscriber = Registry::default().with(env_filter).with(stdout_layer);

    let _ = tracing_log::LogTracer::init();
    let _ = set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing(Some("debug"));
        init_tracing(Some("debug"));
    }
}
