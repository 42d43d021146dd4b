// src/logging.rs
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter used when `RUST_LOG` is unset.
fn default_directives() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,exit_interview=trace,sqlx=info,hyper=info,reqwest=info"
    } else {
        "info,sqlx=warn,hyper=warn,reqwest=warn"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    /// One JSON object per line, for log shipping
    Json,
    Text,
}

impl LogFormat {
    fn from_env() -> Self {
        match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

/// Install the global subscriber for one of the binaries.
pub fn init_logging(service: &str) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives()))?;
    let filter_display = filter.to_string();
    let format = LogFormat::from_env();

    let layer = match format {
        LogFormat::Json => fmt::layer().json().with_current_span(false).boxed(),
        LogFormat::Text => fmt::layer().with_file(true).with_line_number(true).boxed(),
    };

    tracing_subscriber::registry().with(filter).with(layer).try_init()?;

    tracing::info!(
        service,
        version = env!("CARGO_PKG_VERSION"),
        release = !cfg!(debug_assertions),
        filter = %filter_display,
        format = ?format,
        "Logging initialised"
    );

    Ok(())
}
