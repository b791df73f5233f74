//! imgate CLI - serve the image operation gateway
//!
//! Without a subcommand the gateway starts listening; the subcommands
//! help with configuration files and environment checks.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use console::style;

use imgate::{init_with_config, Config, GatewayServer, TranscoderBackend};
use imgate::processing::formats::supported_input_formats;
use imgate::processing::FfmpegTranscoder;

/// imgate - HTTP gateway for resize, convert and compress
#[derive(Parser)]
#[command(
    name = "imgate",
    version,
    about = "HTTP gateway for resize, convert and compress image operations",
    long_about = "imgate serves POST /resize, /convert and /compress. Each endpoint reads an \
                  image from a path named in the JSON body, runs the operation and streams the \
                  produced file back."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (.toml or .yaml)
    #[arg(short, long, value_name = "FILE", env = "IMGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the config file)
    #[arg(short, long, value_name = "ADDR", env = "IMGATE_BIND")]
    bind: Option<SocketAddr>,

    /// Confine request paths to this directory
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Compress backend (overrides the config file)
    #[arg(long, value_enum, value_name = "BACKEND")]
    backend: Option<CliBackend>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    CheckConfig {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Write a configuration file containing every default
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "imgate.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
    /// Show version, encoder and format information
    Info,
}

/// CLI-compatible backend enum
#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliBackend {
    Ffmpeg,
    Native,
}

impl From<CliBackend> for TranscoderBackend {
    fn from(backend: CliBackend) -> Self {
        match backend {
            CliBackend::Ffmpeg => TranscoderBackend::Ffmpeg,
            CliBackend::Native => TranscoderBackend::Native,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Some(command) = cli.command.as_ref() {
        if let Err(e) = handle_subcommand(command, &cli) {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
        return;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", style("Error").red().bold(), e);
            process::exit(1);
        }
    };

    if let Err(e) = init_with_config(&config) {
        eprintln!("{}: Failed to initialize imgate: {}",
                 style("Error").red().bold(), e);
        process::exit(1);
    }

    let server = match GatewayServer::new(&config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("{}: Failed to build server: {}", style("Error").red().bold(), e);
            process::exit(1);
        }
    };

    if let Err(e) = server.serve(config.server.bind).await {
        eprintln!("{}: Server failed: {}", style("Error").red().bold(), e);
        process::exit(1);
    }
}

/// Build the effective configuration: file (if any), then CLI overrides
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(base_dir) = &cli.base_dir {
        config.paths.base_dir = Some(base_dir.clone());
    }
    if let Some(backend) = cli.backend {
        config.compress.backend = backend.into();
    }
    if cli.quiet {
        config.logging.level = "error".to_string();
    } else if cli.verbose {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

/// Handle subcommands
fn handle_subcommand(command: &Commands, cli: &Cli) -> anyhow::Result<()> {
    match command {
        Commands::CheckConfig { file } => validate_config_file(file),
        Commands::ExampleConfig { output, yaml } => generate_example_config(output, *yaml),
        Commands::Info => {
            show_info(&load_config(cli)?);
            Ok(())
        }
    }
}

/// Validate configuration file
fn validate_config_file(file_path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(file_path)?;
    config.validate()?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!("Listen address: {}", config.server.bind);
    println!("Resize output: {}", config.paths.resize_output.display());
    println!("Compress backend: {:?}", config.compress.backend);

    Ok(())
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path, use_yaml: bool) -> anyhow::Result<()> {
    let mut output_path = output_path.to_path_buf();
    let is_yaml_path = matches!(
        output_path.extension().and_then(|ext| ext.to_str()),
        Some("yaml" | "yml")
    );
    if use_yaml && !is_yaml_path {
        output_path.set_extension("yaml");
    }

    Config::default().to_file(&output_path)?;

    let format = if use_yaml || is_yaml_path { "YAML" } else { "TOML" };
    println!("{}: Generated example {} configuration: {}",
             style("Success").green().bold(),
             format,
             output_path.display());

    Ok(())
}

/// Show version, encoder and format information
fn show_info(config: &Config) {
    println!("{}", style("imgate").bold());
    println!();
    println!("{}: {}", style("Version").bold(), env!("CARGO_PKG_VERSION"));
    println!("{}: {}", style("Listen").bold(), config.server.bind);
    println!();

    println!("{}", style("Compress:").bold());
    println!("  Backend: {:?}", config.compress.backend);
    println!("  Scale: {}x{}", config.compress.width, config.compress.height);
    if config.compress.backend == TranscoderBackend::Ffmpeg {
        let program = config.compress.program.display();
        if FfmpegTranscoder::new(&config.compress.program).is_available() {
            println!("  Encoder: {} {}", style("✓").green(), program);
        } else {
            println!("  Encoder: {} {} not found", style("✗").red(), program);
        }
    }
    println!();

    println!("{}", style("Paths:").bold());
    println!("  Resize output: {}", config.paths.resize_output.display());
    println!("  Compress dir: {}", config.paths.compress_dir.display());
    match &config.paths.base_dir {
        Some(base) => println!("  Sandbox: {}", base.display()),
        None => println!("  Sandbox: {}", style("disabled").dim()),
    }
    println!();

    println!("{}", style("Input formats:").bold());
    println!("  {}", supported_input_formats().join(", "));
}
