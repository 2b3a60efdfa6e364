//! netmark-router: Per-interface policy routing control plane
//!
//! This is the main entry point for the administration tool.
//!
//! # Usage
//!
//! ```bash
//! # Install the base chains and hook rules
//! sudo ./netmark-router --setup-hooks
//!
//! # Run with custom configuration
//! sudo ./netmark-router -c /path/to/config.json --setup-hooks
//!
//! # Run with environment overrides
//! NETMARK_ROUTER_LOG_LEVEL=debug sudo ./netmark-router --setup-hooks
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

use netmark_router::chain::FwmarkRuleManager;
use netmark_router::config::{load_config_with_env, Config};
use netmark_router::exec::{is_root, CommandSequencer, SystemExecutor};
use netmark_router::registry::StaticRegistry;
use netmark_router::rules::{RuleRefCounter, TableMap};

/// Command-line arguments
struct Args {
    /// Configuration file path
    config_path: PathBuf,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
    /// Install the base chains and hook rules
    setup_hooks: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config_path = PathBuf::from("/etc/netmark-router/config.json");
        let mut generate_config = false;
        let mut check_config = false;
        let mut setup_hooks = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        config_path = PathBuf::from(path);
                    }
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "--setup-hooks" => {
                    setup_hooks = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("netmark-router v{}", netmark_router::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Self {
            config_path,
            generate_config,
            check_config,
            setup_hooks,
        }
    }
}

fn print_help() {
    println!(
        r#"netmark-router v{}

Per-interface policy routing control plane for Linux.

USAGE:
    netmark-router [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: /etc/netmark-router/config.json]
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and exit
    --setup-hooks           Install the base chains and hook rules, then exit
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT:
    NETMARK_ROUTER_BASE_TABLE     Override base secondary table index
    NETMARK_ROUTER_LOG_LEVEL      Override log level (trace, debug, info, warn, error)
    NETMARK_ROUTER_IP_PATH        Override the ip tool path
    NETMARK_ROUTER_IPTABLES_PATH  Override the iptables tool path

REQUIREMENTS:
    - Linux kernel with policy routing support
    - CAP_NET_ADMIN capability (or root)
    - ip, iptables and ip6tables on the tool paths

EXAMPLE:
    # Install the st_mangle_OUTPUT / st_mangle_EXEMPT hook chains
    sudo netmark-router -c /etc/netmark-router/config.json --setup-hooks
"#,
        netmark_router::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &Config) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.log.ansi)
        .init();
}

/// Check system prerequisites
fn check_prerequisites() {
    if !is_root() {
        warn!("Not running as root - editing routing state requires CAP_NET_ADMIN");
        // Don't fail - let the tool invocations fail with a clearer error
    }
}

/// Install the base chains and hook rules
fn run_setup_hooks(config: &Config) -> Result<()> {
    let sequencer = Arc::new(CommandSequencer::new(
        Arc::new(SystemExecutor::new()),
        config.tools.clone(),
    ));
    let registry = Arc::new(StaticRegistry::new());
    let counter = Arc::new(RuleRefCounter::new());
    let tables = TableMap::new(config.tables.base_index);

    let manager = FwmarkRuleManager::new(sequencer, registry, counter, tables);
    manager
        .setup_hooks()
        .map_err(|e| anyhow::anyhow!("Failed to install hook chains: {e}"))?;

    info!(base_index = tables.base(), "hook chains installed");
    Ok(())
}

/// Main application entry point
fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Handle generate-config
    if args.generate_config {
        netmark_router::config::create_default_config(&args.config_path)?;
        println!("Generated default configuration at {:?}", args.config_path);
        return Ok(());
    }

    // Load configuration
    let config = load_config_with_env(&args.config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {:?}: {e}",
            args.config_path
        )
    })?;

    // Handle check-config
    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    // Initialize logging
    init_logging(&config);

    info!("netmark-router v{}", netmark_router::VERSION);
    info!("Configuration loaded from {:?}", args.config_path);

    check_prerequisites();

    if args.setup_hooks {
        return run_setup_hooks(&config);
    }

    eprintln!("No action specified");
    print_help();
    std::process::exit(1);
}
