//! Process logging through `log4rs`.
//!
//! Three destinations: stderr, `app.log`, and `audit.log` (target `coursebook::audit`).
//! The first successful [`configure_logging`] installs the logger; later calls swap
//! the configuration through the retained handle.

use crate::errors::DbError;
use log::LevelFilter;
use log4rs::Handle;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

pub const AUDIT_TARGET: &str = "coursebook::audit";
pub const QUERY_TARGET: &str = "coursebook::query";
pub const DEFAULT_RETENTION: u32 = 7;

const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const CONSOLE_PATTERN: &str = "[{l}] {m}{n}";

static HANDLE: OnceCell<Handle> = OnceCell::new();

/// `error|warn|info|debug|trace|off`, case-insensitive; anything else is `info`.
#[must_use]
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

fn config_err(e: impl std::fmt::Display) -> DbError {
    DbError::Config(format!("logging: {e}"))
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, DbError> {
    let pattern = format!("{}", base.join(format!("{stem}.{{}}.log")).display());
    let roller = FixedWindowRoller::builder().build(&pattern, keep).map_err(config_err)?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))
        .map_err(config_err)
}

/// Build the configuration without installing it.
///
/// # Errors
/// Returns `DbError::Config` when `dir` cannot be created or an appender fails to open.
pub fn build_config(dir: &Path, level: LevelFilter, retention: u32) -> Result<Config, DbError> {
    std::fs::create_dir_all(dir)?;
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("app", Box::new(rolling(dir, "app", retention)?)))
        .appender(Appender::builder().build("audit", Box::new(rolling(dir, "audit", retention)?)))
        .logger(Logger::builder().appender("audit").additive(false).build(AUDIT_TARGET, level))
        .logger(Logger::builder().appender("app").additive(false).build(QUERY_TARGET, level))
        .build(Root::builder().appender("console").appender("app").build(level))
        .map_err(config_err)
}

/// Install or replace the process logger.
///
/// - `dir`: log directory; the current directory when `None`.
/// - `level`: see [`parse_level`]; `info` when `None`.
/// - `retention`: rolled files kept per log.
///
/// # Errors
/// Returns `DbError::Config` when the configuration cannot be built or another
/// logger is already installed.
pub fn configure_logging(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<u32>,
) -> Result<(), DbError> {
    let base = match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };
    let config = build_config(
        &base,
        level.map_or(LevelFilter::Info, parse_level),
        retention.unwrap_or(DEFAULT_RETENTION),
    )?;
    if let Some(handle) = HANDLE.get() {
        handle.set_config(config);
        return Ok(());
    }
    let handle = log4rs::init_config(config).map_err(config_err)?;
    // A racing initializer already holds a handle; keep the first.
    let _ = HANDLE.set(handle);
    Ok(())
}
