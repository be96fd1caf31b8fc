use std::path::PathBuf;

use clap::Parser;
use snafu::{ResultExt, Snafu, ensure};
use stackable_kustomizer::{
    FsSource, KustomizerConfig, Profile, TypeRegistry, expander, output,
    profile::{self, CONFIG_FILE_NAME},
};
use tracing::{error, info, info_span, warn};

mod logging;

const APP_NAME: &str = "kustomizer";
const LOG_ENV: &str = "KUSTOMIZER_LOG";

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to initialize logging"))]
    InitializeLogging { source: logging::Error },

    #[snafu(display("failed to create output directory {path}", path = path.display()))]
    CreateOutputDirectory {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to load profile configuration"))]
    LoadConfig { source: profile::Error },

    #[snafu(display("profile {name:?} is not defined in {path}", path = path.display()))]
    UnknownProfile { name: String, path: PathBuf },

    #[snafu(display("failed to generate profile(s) {}", names.join(", ")))]
    FailedProfiles { names: Vec<String> },
}

#[derive(Debug, Snafu)]
enum ProfileError {
    #[snafu(display("failed to plan overlays"))]
    Plan { source: expander::Error },

    #[snafu(display("failed to write overlays"))]
    Write { source: output::Error },
}

/// Generates kustomize overlay trees from fully rendered configuration variants.
#[derive(Debug, PartialEq, Eq, Parser)]
#[command(version, about)]
struct Cli {
    /// The directory containing the source configurations and the profile configuration.
    #[arg(env = "KUSTOMIZER_INPUT_DIR")]
    input_dir: PathBuf,

    /// The directory the generated overlay trees are written to.
    #[arg(env = "KUSTOMIZER_OUTPUT_DIR")]
    output_dir: PathBuf,

    /// Provides the path to the profile configuration. Defaults to `kustomizer.yaml` within
    /// INPUT_DIR.
    #[arg(long, short = 'c', value_name = "FILE", env = "KUSTOMIZER_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    /// Only generate the given profile. Can be specified multiple times.
    #[arg(long = "profile", short = 'p', value_name = "NAME")]
    profiles: Vec<String>,

    /// Plan the overlays and log them without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Additionally write log output to rotated files in this directory.
    #[arg(long, value_name = "DIR", env = "KUSTOMIZER_LOG_DIRECTORY")]
    log_directory: Option<PathBuf>,
}

impl Cli {
    fn config_file(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| self.input_dir.join(CONFIG_FILE_NAME))
    }

    fn is_selected(&self, profile: &str) -> bool {
        self.profiles.is_empty() || self.profiles.iter().any(|name| name == profile)
    }
}

#[snafu::report]
fn main() -> Result<(), Error> {
    let cli = Cli::parse();
    logging::initialize_logging(LOG_ENV, APP_NAME, cli.log_directory.as_deref())
        .context(InitializeLoggingSnafu)?;

    run(&cli)
}

fn run(cli: &Cli) -> Result<(), Error> {
    let config_file = cli.config_file();
    let config = KustomizerConfig::load(&config_file).context(LoadConfigSnafu)?;

    for name in &cli.profiles {
        ensure!(
            config.profiles.contains_key(name),
            UnknownProfileSnafu {
                name,
                path: &config_file
            }
        );
    }

    if cli.dry_run {
        warn!("dry run, nothing is written");
    } else {
        std::fs::create_dir_all(&cli.output_dir).context(CreateOutputDirectorySnafu {
            path: &cli.output_dir,
        })?;
    }

    let source = FsSource::new(TypeRegistry::default());
    let mut failed = Vec::new();

    for (name, profile) in &config.profiles {
        if !cli.is_selected(name) {
            continue;
        }

        let _span = info_span!("profile", profile = %name).entered();
        info!("processing profile");

        if let Err(err) = generate_profile(&source, cli, profile) {
            error!(
                error = &err as &dyn std::error::Error,
                "failed to generate profile"
            );
            failed.push(name.clone());
        }
    }

    ensure!(failed.is_empty(), FailedProfilesSnafu { names: failed });
    Ok(())
}

fn generate_profile(source: &FsSource, cli: &Cli, profile: &Profile) -> Result<(), ProfileError> {
    let outputs =
        expander::plan(source, &cli.input_dir, &cli.output_dir, profile).context(PlanSnafu)?;

    if cli.dry_run {
        for output in &outputs {
            info!(directory = %output.directory().display(), "planned output");
        }
        return Ok(());
    }

    output::write_all(&outputs).context(WriteSnafu)?;
    info!(outputs = outputs.len(), "generated profile");
    Ok(())
}
