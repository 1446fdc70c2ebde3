//! Logger setup for binaries, examples and tests.
//!
//! Library code only uses the `log` macros. [`init_with_level`] installs a
//! stderr backend that shows `ringtrack*` targets at the requested level and
//! everything else at `warn`, so per-frame detector output is not drowned by
//! image decoding crates. With feature `tracing`, [`init_tracing`] installs a
//! `tracing-subscriber` instead.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable overriding the level passed to [`init_with_level`].
pub const LOG_ENV: &str = "RINGTRACK_LOG";

const OWN_TARGET_PREFIX: &str = "ringtrack";

struct FrameLogger {
    own: LevelFilter,
    foreign: LevelFilter,
    started: Instant,
}

impl FrameLogger {
    fn limit(&self, target: &str) -> LevelFilter {
        if target.starts_with(OWN_TARGET_PREFIX) {
            self.own
        } else {
            self.foreign
        }
    }
}

/// `ringtrack_detector::detector::pipeline` -> `detector::pipeline`.
fn short_target(target: &str) -> &str {
    match target.split_once("::") {
        Some((krate, rest)) if krate.starts_with(OWN_TARGET_PREFIX) => rest,
        _ => target,
    }
}

impl Log for FrameLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.limit(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "E",
            Level::Warn => "W",
            Level::Info => "I",
            Level::Debug => "D",
            Level::Trace => "T",
        };
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "{tag} {:9.4}s {:<24} {}",
            self.started.elapsed().as_secs_f64(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_from_env() -> Option<LevelFilter> {
    std::env::var(LOG_ENV).ok()?.trim().parse().ok()
}

static LOGGER: OnceLock<FrameLogger> = OnceLock::new();

/// Install the stderr logger. `RINGTRACK_LOG` (`off`, `error`, ... `trace`)
/// takes precedence over `level` when set.
///
/// Only the first call installs anything.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let own = level_from_env().unwrap_or(level);
    let logger = LOGGER.get_or_init(|| FrameLogger {
        own,
        foreign: own.min(LevelFilter::Warn),
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(own);
    Ok(())
}

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG` (default
/// `info`). Closing spans are logged, so instrumented detector calls report
/// their duration. `json` switches to one JSON object per line.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_targets_are_shortened() {
        assert_eq!(
            short_target("ringtrack_detector::detector::pipeline"),
            "detector::pipeline"
        );
        assert_eq!(short_target("png::decoder"), "png::decoder");
        assert_eq!(short_target("ringtrack"), "ringtrack");
    }

    #[test]
    fn foreign_targets_are_capped_at_warn() {
        let logger = FrameLogger {
            own: LevelFilter::Trace,
            foreign: LevelFilter::Warn,
            started: Instant::now(),
        };
        assert_eq!(logger.limit("ringtrack_detector::segment"), LevelFilter::Trace);
        assert_eq!(logger.limit("image::codecs"), LevelFilter::Warn);
    }
}
