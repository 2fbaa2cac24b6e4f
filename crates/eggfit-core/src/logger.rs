//! Stderr logging for the eggfit tools.
//!
//! Records from the workspace crates (`eggfit*` targets) are filtered at the
//! chosen level; everything else only gets through at `external_level`, so a
//! `debug` run shows the matcher's diagnostics without dependency chatter.
//! Lines read `[elapsed LEVEL] crate::module: message`, with the `eggfit_`
//! prefix dropped from the target.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

const OWN_PREFIX: &str = "eggfit";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogConfig {
    /// Level for `eggfit*` targets.
    pub level: LevelFilter,
    /// Level for every other target.
    pub external_level: LevelFilter,
    pub show_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            external_level: LevelFilter::Warn,
            show_target: true,
        }
    }
}

impl LogConfig {
    pub fn with_level(level: LevelFilter) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    fn is_own(target: &str) -> bool {
        target.starts_with(OWN_PREFIX)
    }

    pub fn level_for(&self, target: &str) -> LevelFilter {
        if Self::is_own(target) {
            self.level
        } else {
            self.external_level
        }
    }

    fn max_level(&self) -> LevelFilter {
        self.level.max(self.external_level)
    }
}

/// `eggfit_crossmatch::matcher` -> `crossmatch::matcher`.
fn short_target(target: &str) -> &str {
    target
        .strip_prefix("eggfit_")
        .filter(|rest| !rest.is_empty())
        .unwrap_or(target)
}

fn format_line(
    elapsed: f64,
    level: Level,
    target: Option<&str>,
    args: &fmt::Arguments<'_>,
) -> String {
    match target {
        Some(target) => format!(
            "[{elapsed:7.3}s {level:>5}] {}: {args}",
            short_target(target)
        ),
        None => format!("[{elapsed:7.3}s {level:>5}] {args}"),
    }
}

struct StderrLogger {
    config: LogConfig,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.config.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            self.config.show_target.then(|| record.target()),
            record.args(),
        );
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Later calls keep the first configuration.
pub fn init(config: LogConfig) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            config,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(config.max_level());
    }
    Ok(())
}

/// [`init`] with `level` for the eggfit crates and the default elsewhere.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init(LogConfig::with_level(level))
}

/// `EnvFilter` directives equivalent to a [`LogConfig`].
#[cfg(feature = "tracing")]
fn filter_directives(config: &LogConfig) -> String {
    let mut directives = config.external_level.to_string().to_lowercase();
    let own = config.level.to_string().to_lowercase();
    for krate in [
        "eggfit",
        "eggfit_core",
        "eggfit_crossmatch",
        "eggfit_quality",
        "eggfit_sky",
    ] {
        directives.push_str(&format!(",{krate}={own}"));
    }
    directives
}

/// Install a `tracing` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the filter follows `level` the same
/// way [`init_with_level`] does. Span close events are reported so per-stage
/// timings show up in the output.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, level: LevelFilter) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&LogConfig::with_level(level))));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
