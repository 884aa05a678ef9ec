//! Logging setup for the sweep driver: a plain or JSON `tracing-subscriber`
//! layer, to stdout/stderr or a rolling file via `tracing-appender`. Mirrors
//! the sibling `mixnet-sims`/`blendnet-sims` crates' `log.rs` convention,
//! minus their internal `nomos-tracing` wrapper.

use std::path::PathBuf;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File(PathBuf),
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stdout" => Ok(Self::Stdout),
            "stderr" => Ok(Self::Stderr),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Configures the global `tracing` subscriber. Returns the
/// `tracing-appender` guard when logging to a file; the caller must hold it
/// for the process lifetime or the non-blocking writer stops flushing.
pub fn config_tracing(
    format: LogFormat,
    output: &LogOutput,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    match output {
        LogOutput::Stdout => {
            init(format, std::io::stdout);
            None
        }
        LogOutput::Stderr => {
            init(format, std::io::stderr);
            None
        }
        LogOutput::File(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "sweep.log".to_string());
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            match format {
                LogFormat::Plain => {
                    let _ = tracing_subscriber::fmt()
                        .with_env_filter(filter())
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .try_init();
                }
                LogFormat::Json => {
                    let _ = tracing_subscriber::fmt()
                        .with_env_filter(filter())
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .json()
                        .try_init();
                }
            }
            Some(guard)
        }
    }
}

fn init<W>(format: LogFormat, writer: W)
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    match format {
        LogFormat::Plain => {
            let _ = tracing_subscriber::fmt().with_env_filter(filter()).with_writer(writer).try_init();
        }
        LogFormat::Json => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(writer)
                .json()
                .try_init();
        }
    }
}
