//! Protocol module runner.
//!
//! Serves any protocol with echo handlers: every endpoint answers with a body
//! that satisfies its declared shape, filled from the request params.
//!
//! ```text
//!     protocol files ──▶ ProtocolCatalog ──┐
//!                                           ├──▶ Module ──▶ listener
//!     config file + env + CLI ──▶ ModuleConfig
//! ```
//!
//! Exits with status 2 when the module cannot start.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use protocol_module::config::{load_config, FileConfig, ModuleConfig, ModuleOptions, ProcessEnv};
use protocol_module::echo::echo_handlers;
use protocol_module::lifecycle::{stop_on_signal, Module, ModuleEvent};
use protocol_module::observability::{logging, metrics};
use protocol_module::protocol::{load_protocol, Protocol, ProtocolCatalog};

#[derive(Debug, Parser)]
#[command(name = "protocol-module", version, about = "Serve a protocol with echo handlers")]
struct Args {
    /// Settings file (TOML).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Protocol file (.json or .toml). Repeatable.
    #[arg(short, long = "protocol")]
    protocols: Vec<PathBuf>,

    /// Directory of protocol files; the protocol named after the module is served
    /// when no --protocol is given.
    #[arg(long)]
    protocol_dir: Option<PathBuf>,

    /// Module name.
    #[arg(short, long)]
    name: Option<String>,

    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Shared secret; generated when no source provides one.
    #[arg(long)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Module failed to start");
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };

    logging::init_logging(&file.observability);
    tracing::info!("protocol-module v{} starting", env!("CARGO_PKG_VERSION"));

    let options = ModuleOptions {
        name: args.name.clone(),
        host: args.host.clone(),
        port: args.port,
        api_key: args.api_key.clone(),
    };
    let config = ModuleConfig::resolve(&file, &options, &ProcessEnv)?;

    tracing::info!(
        module = %config.name,
        bind_address = %config.bind_address(),
        request_timeout_secs = config.timeouts.request_secs,
        api_key_generated = config.api_key_generated,
        "Configuration loaded"
    );

    if file.observability.metrics_enabled {
        let addr = file.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let protocols = load_protocols(&args, &config.name)?;
    let handlers = echo_handlers(&protocols);

    let module = protocols
        .into_iter()
        .fold(Module::builder(config), |builder, protocol| builder.protocol(protocol))
        .handlers(handlers)
        .build();

    let mut events = module.subscribe();
    let secret = module.start().await?;
    println!("{}", secret);

    let signal = stop_on_signal(module.clone());
    while let Ok(event) = events.recv().await {
        if let ModuleEvent::Stopped { .. } = event {
            break;
        }
    }
    signal.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

fn load_protocols(args: &Args, module: &str) -> Result<Vec<Arc<Protocol>>, Box<dyn std::error::Error>> {
    let mut protocols: Vec<Arc<Protocol>> = Vec::new();
    for path in &args.protocols {
        let protocol = load_protocol(path)?;
        tracing::info!(protocol = %protocol.name(), endpoints = protocol.len(), "Protocol loaded");
        protocols.push(Arc::new(protocol));
    }

    if protocols.is_empty() {
        if let Some(dir) = &args.protocol_dir {
            let catalog = ProtocolCatalog::load_dir(dir)?;
            match catalog.get(module) {
                Some(protocol) => protocols.push(protocol),
                None => {
                    return Err(format!(
                        "no protocol named {} in {} (found: {})",
                        module,
                        dir.display(),
                        catalog.names().collect::<Vec<_>>().join(", ")
                    )
                    .into())
                }
            }
        }
    }

    if protocols.is_empty() {
        return Err("no protocol given (use --protocol or --protocol-dir)".into());
    }
    Ok(protocols)
}
