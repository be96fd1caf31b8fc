use std::{
    io::{Sink, sink},
    path::{Path, PathBuf},
};

use snafu::{ResultExt, Snafu};
use tracing::Level;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{
        MakeWriter,
        writer::{EitherWriter, MakeWriterExt as _},
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "failed to initialize rolling file appender in {directory}",
        directory = directory.display()
    ))]
    InitializeFileAppender {
        source: tracing_appender::rolling::InitError,
        directory: PathBuf,
    },

    #[snafu(display("failed to install the global tracing subscriber"))]
    InstallSubscriber {
        source: tracing_subscriber::util::TryInitError,
    },
}

/// Initializes `tracing` logging with the filter directives from the environment variable `env`.
///
/// If the variable is unset or invalid, the maximum log level is INFO. If `log_directory` is set,
/// log output is additionally written to a rotated file within it.
pub fn initialize_logging(env: &str, app_name: &str, log_directory: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_env(env).unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));

    let file_appender = log_directory
        .map(|directory| {
            RollingFileAppender::builder()
                .filename_suffix(format!("{app_name}.log"))
                .max_log_files(6)
                .build(directory)
                .context(InitializeFileAppenderSnafu { directory })
        })
        .transpose()?;
    let file_appender = OptionalMakeWriter::from(file_appender);

    let fmt = tracing_subscriber::fmt::layer().with_writer(std::io::stdout.and(file_appender));
    Registry::default()
        .with(filter)
        .with(fmt)
        .try_init()
        .context(InstallSubscriberSnafu)?;

    // need to delay logging until after tracing is initialized
    match log_directory {
        Some(directory) => {
            tracing::info!(directory = %directory.display(), "file logging enabled");
        }
        None => tracing::debug!("file logging disabled, because no log directory set"),
    }

    Ok(())
}

/// Like [`EitherWriter`] but implements [`MakeWriter`] instead of [`std::io::Write`], so that
/// the file appender can be switched on and off at runtime.
enum EitherMakeWriter<A, B> {
    A(A),
    B(B),
}

impl<'a, A, B> MakeWriter<'a> for EitherMakeWriter<A, B>
where
    A: MakeWriter<'a>,
    B: MakeWriter<'a>,
{
    type Writer = EitherWriter<A::Writer, B::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        match self {
            Self::A(a) => EitherWriter::A(a.make_writer()),
            Self::B(b) => EitherWriter::B(b.make_writer()),
        }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        match self {
            Self::A(a) => EitherWriter::A(a.make_writer_for(meta)),
            Self::B(b) => EitherWriter::B(b.make_writer_for(meta)),
        }
    }
}

/// Writes to the inner writer if there is one, discards everything otherwise.
type OptionalMakeWriter<T> = EitherMakeWriter<T, fn() -> Sink>;

impl<T> From<Option<T>> for OptionalMakeWriter<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(writer) => Self::A(writer),
            None => Self::B(sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use tracing::{debug, error, info};

    use super::*;

    // The global subscriber can only be installed once per process, so this is the only test
    // calling `initialize_logging`. Run
    //      cargo test default_level -- --nocapture
    // to see the ERROR and INFO messages, the DEBUG message is filtered out.
    #[test]
    fn default_level_is_info_and_file_is_written() {
        let log_directory = tempfile::tempdir().expect("create temporary directory");

        initialize_logging(
            "KUSTOMIZER_TEST_LOG_NOT_SET",
            "test",
            Some(log_directory.path()),
        )
        .expect("logging initializes");

        error!("ERROR level messages should be seen.");
        info!("INFO level messages should also be seen by default.");
        debug!("DEBUG level messages should be seen only if enabled.");

        let log_files = std::fs::read_dir(log_directory.path())
            .expect("log directory exists")
            .count();
        assert_eq!(log_files, 1);
    }
}
