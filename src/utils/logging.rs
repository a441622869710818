use std::fmt;
use std::fmt::Write;
use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{format::FmtSpan, Layer as FmtLayer};
use tracing_subscriber::{prelude::*, registry::Registry, EnvFilter};

use super::app_config::config;
use super::error::Result;

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
    pub use tracing::{debug_span, error_span, info_span, trace_span, warn_span};
    pub use tracing::{event, field::Empty, instrument, span};
}

/// Install the global subscriber as described by the `logging` config section.
///
/// Falls back to the built-in defaults when the section is missing. The returned guard
/// flushes the non-blocking writer on drop and must be held in `main`.
pub fn setup() -> Result<WorkerGuard> {
    let cfg: LoggingConfig = config().get("logging").unwrap_or_default();
    setup_with(&cfg)
}

fn setup_with(cfg: &LoggingConfig) -> Result<WorkerGuard> {
    let span_events = cfg
        .span_events
        .iter()
        .fold(FmtSpan::NONE, |f, e| f | (*e).into());
    let (writer, guard) = cfg.target.to_writer();

    let fmt = FmtLayer::default()
        .with_ansi(cfg.target.supports_color())
        .with_target(false)
        .with_span_events(span_events)
        .with_timer(ISOTimeFormat)
        .with_writer(writer);

    Registry::default()
        .with(cfg.env_filter()?)
        .with(fmt)
        .try_init()?;

    Ok(guard)
}

struct ISOTimeFormat;

impl FormatTime for ISOTimeFormat {
    fn format_time(&self, w: &mut dyn Write) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ====== Logging Config ======

#[derive(Debug, serde::Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    directives: Option<String>,
    /// Name of an environment variable that, when set, takes precedence over `directives`
    #[serde(default)]
    from_env: Option<String>,
    #[serde(default)]
    target: LoggingTarget,
    #[serde(default)]
    span_events: Vec<SpanEvent>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum LoggingTarget {
    Stdout,
    Stderr,
    File { directory: PathBuf, name: PathBuf },
}

#[derive(Copy, Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum SpanEvent {
    New,
    Enter,
    Exit,
    Close,
    Active,
    Full,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directives: Some("info".into()),
            from_env: Some("RUST_LOG".into()),
            target: Default::default(),
            span_events: vec![],
        }
    }
}

impl Default for LoggingTarget {
    fn default() -> Self {
        // stdout is reserved for command output
        LoggingTarget::Stderr
    }
}

impl LoggingConfig {
    fn env_filter(&self) -> Result<EnvFilter> {
        if let Some(var) = &self.from_env {
            if std::env::var_os(var).is_some() {
                return Ok(EnvFilter::from_env(var));
            }
        }
        let directives = self.directives.as_deref().unwrap_or("info");
        Ok(EnvFilter::try_new(directives)?)
    }
}

impl LoggingTarget {
    fn supports_color(&self) -> bool {
        !matches!(self, LoggingTarget::File { .. })
    }

    fn to_writer(&self) -> (NonBlocking, WorkerGuard) {
        match self {
            LoggingTarget::Stdout => tracing_appender::non_blocking(std::io::stdout()),
            LoggingTarget::Stderr => tracing_appender::non_blocking(std::io::stderr()),
            LoggingTarget::File { directory, name } => {
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, name))
            }
        }
    }
}

impl From<SpanEvent> for FmtSpan {
    fn from(e: SpanEvent) -> Self {
        match e {
            SpanEvent::New => FmtSpan::NEW,
            SpanEvent::Enter => FmtSpan::ENTER,
            SpanEvent::Exit => FmtSpan::EXIT,
            SpanEvent::Close => FmtSpan::CLOSE,
            SpanEvent::Active => FmtSpan::ACTIVE,
            SpanEvent::Full => FmtSpan::FULL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_directives(directives: &str) -> LoggingConfig {
        LoggingConfig {
            directives: Some(directives.into()),
            from_env: None,
            ..Default::default()
        }
    }

    #[test]
    fn accepts_target_directives() {
        assert!(with_directives("creditsim=debug,warn").env_filter().is_ok());
    }

    #[test]
    fn rejects_garbage_directives() {
        assert!(with_directives("creditsim=notalevel").env_filter().is_err());
    }

    #[test]
    fn default_target_is_stderr() {
        let cfg = LoggingConfig::default();
        assert!(matches!(cfg.target, LoggingTarget::Stderr));
        assert!(cfg.target.supports_color());
    }
}
