use anyhow::Result;
use clap::Parser;
use edgewatch::{AgentConfig, AgentOrchestrator, CameraDiscoveryBuilder, TokioProcessRunner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "edgewatch")]
#[command(about = "Edge camera monitoring agent with rotating-model inference")]
#[command(version)]
#[command(long_about = "Discovers locally attached cameras, grabs a still frame from each camera \
stream at a fixed interval, submits the frames to an inference service under a rotating model \
selection, and keeps a bounded in-memory history of predictions and capture errors.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "edgewatch.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the agent")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't start polling
    #[arg(long, help = "Run discovery and model resolution, then exit without polling")]
    dry_run: bool,

    /// List discovered cameras and exit
    #[arg(long, help = "Run camera discovery, print the cameras found and exit")]
    list_cameras: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write daily rolling log files to this directory
    #[arg(long, value_name = "DIR", help = "Directory for daily rolling log files")]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let log_guard = init_logging(&args)?;

    info!("Starting edgewatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    let config = match AgentConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        println!("✓ Configuration is valid");
        return Ok(());
    }

    if args.list_cameras {
        list_cameras(&config).await?;
        return Ok(());
    }

    let mut orchestrator = AgentOrchestrator::new(config).map_err(|e| {
        error!("Failed to create agent: {}", e);
        e
    })?;

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize agent: {}", e);
        e
    })?;

    if args.dry_run {
        let status = orchestrator.monitor().status();
        info!("Dry run mode - agent initialized but not started");
        println!(
            "✓ Dry run completed: {} cameras, current model {}",
            status.camera_count,
            status.current_model.as_deref().unwrap_or("<none>")
        );
        return Ok(());
    }

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start agent: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("Agent error during execution: {}", e);
        e
    })?;

    info!("Edgewatch exited with code: {}", exit_code);
    drop(log_guard);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("edgewatch={}", log_level)));

    let stdout_layer = match args.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer().with_target(true).boxed()
        }
    };

    let (file_layer, guard) = match &args.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, "edgewatch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

async fn list_cameras(config: &AgentConfig) -> Result<()> {
    let discovery = CameraDiscoveryBuilder::new()
        .config(config.discovery.clone())
        .runner(Arc::new(TokioProcessRunner::new()))
        .build()?;

    let cameras = discovery.discover().await;
    if cameras.is_empty() {
        println!("No cameras found (probe: {})", discovery.probe_name());
        return Ok(());
    }

    println!("{:>3}  {:<32} {:<20} STREAM", "ID", "NAME", "DEVICE");
    for camera in cameras {
        println!(
            "{:>3}  {:<32} {:<20} {}",
            camera.id,
            camera.name.as_deref().unwrap_or("-"),
            camera.device,
            camera.stream_url
        );
    }
    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Edgewatch configuration file");
    println!("# Every key is optional; values shown are the built-in defaults.");
    println!("# Any key can be overridden with EDGEWATCH_<SECTION>__<KEY> environment variables.");
    println!();
    print!("{}", AgentConfig::default().to_toml_string()?);
    Ok(())
}
