//! packbridge: entry point.
//!
//! ```text
//! packbridge scan --waybill <W>                         Look up an order
//! packbridge scan-window --order-no <O> --start <D> --end <D>
//! packbridge reprint --order-id <N> --waybill <W>       Fetch a label again
//! packbridge increase-reprint --order-id <N> --waybill <W>
//! packbridge log-error --category <C> --message <M>     Report an error
//! packbridge watch                                      Stay connected
//! packbridge --config <path> ...                        Load a custom config TOML
//! packbridge --server <url> ...                         Override the server URL
//! packbridge --gen-config                               Write default config to stdout
//! packbridge --init-config [--config <path>]            Write default config to a file
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use packbridge_cli::commands::{Command, Outcome};
use packbridge_cli::config::CliConfig;
use packbridge_core::{Bridge, BridgeError};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "packbridge", version, about = "Packing station bridge to the orchestration server")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "packbridge.toml")]
    config: PathBuf,

    /// Server URL, overriding the config file.
    #[arg(long)]
    server: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Write the default configuration to the --config path and exit.
    #[arg(long, conflicts_with = "gen_config")]
    init_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&CliConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    if cli.init_config {
        CliConfig::write_default(&cli.config)?;
        println!("wrote {}", cli.config.display());
        return Ok(());
    }

    let Some(command) = cli.command else {
        eprintln!("no command given (see --help)");
        std::process::exit(2);
    };

    // Load config.
    let mut config = CliConfig::load(&cli.config);
    if let Some(server) = cli.server {
        config.bridge.server_url = server;
    }
    config.bridge.validate()?;

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("packbridge v{}", env!("CARGO_PKG_VERSION"));
    info!("server: {}", config.bridge.server_url);
    info!("request timeout: {:?}", config.bridge.request_timeout());

    let bridge = Bridge::new(config.bridge);
    match command {
        Command::Watch => watch(&bridge).await?,
        command => run_once(&bridge, &command).await?,
    }

    Ok(())
}

// ── Modes ────────────────────────────────────────────────────────

async fn run_once(bridge: &Bridge, command: &Command) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = bridge.connect_with_identity().await {
        if command.is_request() {
            return Err(e.into());
        }
        warn!("server unreachable: {e}");
    }

    let outcome = command.execute(bridge).await;
    bridge.close().await;

    match outcome? {
        Outcome::Reply(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                std::process::exit(1);
            }
        }
        Outcome::Notified { queued: false } => info!("notification sent"),
        Outcome::Notified { queued: true } => {
            warn!("notification could not be delivered");
            std::process::exit(1);
        }
    }
    Ok(())
}

async fn watch(bridge: &Bridge) -> Result<(), BridgeError> {
    let interval = bridge.config().reconnect_interval();
    let mut states = bridge.state_receiver();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // The supervisor only reconnects to an address that worked once, so
    // the first connect is retried here.
    loop {
        match bridge.connect_with_identity().await {
            Ok(_) => break,
            Err(e) => {
                let Some(wait) = interval else {
                    return Err(e);
                };
                warn!("connect failed: {e}; retrying in {wait:?}");
                tokio::select! {
                    _ = &mut shutdown => return Ok(()),
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
    }

    let supervisor = interval.map(|every| bridge.spawn_reconnect_supervisor(every));

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Ctrl-C received, shutting down");
                break;
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                info!("connection state: {state}");
            }
        }
    }

    if let Some(supervisor) = supervisor {
        supervisor.shutdown().await;
    }
    let undelivered = bridge.queued_notifications().len();
    if undelivered > 0 {
        warn!(undelivered, "exiting with queued notifications");
    }
    bridge.close().await;
    Ok(())
}
