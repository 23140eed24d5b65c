use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Target prefix shared by every crate in this workspace.
const OWN_TARGET: &str = "xesremote";

/// Ceiling for everything else (tungstenite, rustls, ...). Their debug
/// output is per-frame and drowns out the session log.
const DEPENDENCY_CEILING: LevelFilter = LevelFilter::WARN;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// `level` applies to the xesremote crates; dependencies never log above
/// [`DEPENDENCY_CEILING`].
fn log_targets(level: LogLevel) -> Targets {
    let level = level.as_filter();
    Targets::new()
        .with_default(level.min(DEPENDENCY_CEILING))
        .with_target(OWN_TARGET, level)
}

/// Logs go to stderr so stdout carries nothing but program output.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let targets = log_targets(level);
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.finish().with(targets).try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().finish().with(targets).try_init();
        }
    }
}
