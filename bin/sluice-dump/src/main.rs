//! Serializes a file of telemetry the same way it would be sent to the intake, and writes the resulting payloads to
//! disk.

#![deny(warnings)]
#![deny(missing_docs)]

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use sluice_config::ConfigurationLoader;
use sluice_error::{ErrorContext as _, GenericError};
use sluice_serializer::{Serializer, SerializerConfiguration};
use tracing::{error, info, level_filters::LevelFilter};

mod forwarder;
use self::forwarder::DirectoryForwarder;

mod input;
use self::input::{Input, InputKind};

mod logging;
use self::logging::{fatal_and_exit, initialize_logging};

#[derive(Parser)]
#[command(about)]
struct Cli {
    /// Enable verbose output. (Specify twice for more verbosity.)
    #[arg(short = 'v', long, action = ArgAction::Count, default_value_t = 0)]
    verbose: u8,

    /// Path to a YAML configuration file.
    ///
    /// Settings can also be given as `DD_`-prefixed environment variables, which take precedence over the file.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Path to the JSON file holding the telemetry to serialize.
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Kind of telemetry in the input file.
    #[arg(short = 'k', long)]
    kind: InputKind,

    /// Directory to write payloads to.
    #[arg(short = 'o', long)]
    output_dir: PathBuf,

    /// Hostname attached to event and service check payloads.
    #[arg(long, default_value = "")]
    hostname: String,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::INFO,
            1 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = initialize_logging(cli.log_level()) {
        fatal_and_exit(format!("failed to initialize logging: {}", e));
    }

    match run(&cli) {
        Ok(()) => info!("sluice-dump finished."),
        Err(e) => {
            error!("{:?}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<(), GenericError> {
    let config = load_configuration(cli)?;
    info!(
        compression = config.compression_scheme().name(),
        max_payload_size = config.max_payload_size,
        "Loaded serializer configuration."
    );

    let input = Input::from_file(cli.kind, &cli.hostname, &cli.input)?;
    info!(kind = %cli.kind, items = input.item_count(), "Read input file.");

    let forwarder = DirectoryForwarder::new(&cli.output_dir)?;
    let serializer = Serializer::new(&config, forwarder);
    input.send(&serializer)?;

    info!(output_dir = %serializer.forwarder().root().display(), "Wrote payloads.");

    Ok(())
}

fn load_configuration(cli: &Cli) -> Result<SerializerConfiguration, GenericError> {
    let mut loader = ConfigurationLoader::default();
    if let Some(path) = &cli.config {
        loader = loader
            .from_yaml(path)
            .with_error_context(|| format!("Failed to load configuration file '{}'.", path.display()))?;
    }

    let config = loader
        .from_environment("DD")
        .error_context("Failed to load configuration from the environment.")?
        .into_generic();

    Ok(SerializerConfiguration::from_configuration(&config)?)
}
