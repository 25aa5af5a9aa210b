use std::io;
use tracing_appender::rolling;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Default stdout filter; `RUST_LOG` replaces it when set.
const STDOUT_FILTER: &str = "info,segment=warn,rewrite=warn,annotation=info";

pub fn configure_logging(log_dir: Option<&str>) {
    // Console log goes to stderr; stdout carries the JSON lines
    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(STDOUT_FILTER));
    let stdout_log = fmt::layer()
        .with_writer(io::stderr)
        .with_filter(stdout_filter);

    // File log configuration
    let file_log = log_dir.map(|dir| {
        let file_appender = rolling::daily(dir, "ctelig.log");
        fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender)
            .with_filter(EnvFilter::new("info,segment=debug,rewrite=debug"))
    });

    tracing_subscriber::Registry::default()
        .with(stdout_log)
        .with(file_log)
        .init();
}
