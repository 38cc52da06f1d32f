use std::sync::{Once, OnceLock};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

static INIT: Once = Once::new();
// The non-blocking writer stops when its guard drops; pin it for the
// lifetime of the process.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub struct Logger;

impl Logger {
    /// Console plus daily-rotated file output. `RUST_LOG` overrides the
    /// configured level. Safe to call more than once; only the first call
    /// installs the subscriber.
    pub fn init(level: &str) {
        let level = level.to_string();
        INIT.call_once(|| {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

            let file_appender = rolling::daily("logs", "credai-backend.log");
            let (file_writer, guard) = non_blocking(file_appender);
            let _ = FILE_GUARD.set(guard);

            Registry::default()
                .with(filter)
                .with(fmt::layer().with_target(true))
                .with(fmt::layer().with_ansi(false).with_writer(file_writer))
                .init();
        });
    }
}
