use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use lockerd::{EventBus, HttpServerBuilder, LockerService, LockerdConfig};

#[derive(Parser, Debug)]
#[command(name = "lockerd")]
#[command(about = "Locker occupancy service with an open-request dispatch queue")]
#[command(version)]
#[command(long_about = "Tracks the occupancy state of a fixed fleet of physical storage \
lockers and relays open-requests to embedded relay hardware through a polling queue. \
Web clients read locker state and request openings over HTTP; the hardware poller \
drains the dispatch queue on its own cadence.")]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = "lockerd.toml",
        help = "Path to TOML configuration file"
    )]
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
    #[arg(
        long,
        help = "Validate configuration file and exit without starting the service"
    )]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - initialize but don't serve
    #[arg(long, help = "Perform dry run - build the service but don't start the server")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(
        long,
        value_name = "FORMAT",
        help = "Log output format: json, pretty, or compact"
    )]
    log_format: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Handle special modes that don't require full initialization
    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    // Initialize logging
    init_logging(&args)?;

    info!("Starting lockerd v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    // Load configuration
    let config = match LockerdConfig::load_from_file(&args.config) {
        Ok(config) => {
            info!("Configuration loaded successfully from: {}", args.config);
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Validate configuration if requested
    if args.validate_config {
        match config.validate() {
            Ok(()) => {
                info!("Configuration validation successful");
                println!("✓ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("Configuration validation failed: {}", e);
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    config.validate().map_err(|e| {
        error!("Configuration validation failed: {}", e);
        e
    })?;

    info!("Lockerd configuration loaded and validated");

    // Build the service object shared by all request handlers
    let event_bus = if args.debug {
        Arc::new(EventBus::with_debug_logging(config.system.event_bus_capacity))
    } else {
        Arc::new(EventBus::new(config.system.event_bus_capacity))
    };
    let service = Arc::new(LockerService::new(
        config.lockers.count,
        Arc::clone(&event_bus),
    ));

    // Handle dry run mode
    if args.dry_run {
        info!("Dry run mode - service initialized but server not started");
        println!("✓ Dry run completed successfully");
        return Ok(());
    }

    let server = HttpServerBuilder::new()
        .config(config.server.clone())
        .service(service)
        .event_bus(event_bus)
        .build()
        .map_err(|e| {
            error!("Failed to build HTTP server: {}", e);
            e
        })?;

    info!("Available routes:");
    info!("  GET  /casiers - list all lockers");
    info!("  GET  /casier/:id - state of one locker (1-{})", config.lockers.count);
    info!("  POST /casier/:id/ouvrir - request a locker opening");
    info!("  GET  /next-casier - next locker id to open physically");
    info!("  GET  /health - service health and aggregate counts");

    server.start().await.map_err(|e| {
        error!("Server error during execution: {}", e);
        e
    })?;

    info!("lockerd exited cleanly");
    Ok(())
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    // Determine log level based on flags
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    // Create environment filter
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lockerd={}", log_level)));

    // Configure format based on options
    let fmt_layer = match args.log_format.as_deref() {
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
            .with_file(false)
            .with_line_number(false)
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
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    let rendered = toml::to_string_pretty(&LockerdConfig::default())?;

    println!("# Lockerd Configuration File");
    println!("# This is the default configuration with all available options");
    println!();
    println!("{}", rendered);

    Ok(())
}
