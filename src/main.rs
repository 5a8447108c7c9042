mod aci;
mod config;
mod inventory;
mod models;
mod provision;
mod render;
mod ssh;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use aci::ControllerError;
use config::Config;
use provision::Provisioner;
use render::CommandRenderer;
use ssh::SshTransport;

/// Push SNMPv3 monitoring credentials to every device in a Cisco inventory
#[derive(Debug, Parser)]
#[command(name = "snmpv3-provision", version, about)]
struct Args {
    /// Inventory CSV with DEVICE_TYPE, IP_ADDRESS and (for ACI rows) CONTROLLER_IP columns
    #[arg(short, long, env = "INVENTORY_PATH", default_value = "CISCO-SNMPv3-INVENTORY.csv")]
    inventory: PathBuf,

    /// Render and log what would be sent without connecting to anything
    #[arg(long)]
    dry_run: bool,

    /// Directory with ios.tera / nxos.tera / fxos.tera / asa.tera overriding the built-in command templates
    #[arg(long, env = "TEMPLATES_DIR")]
    templates_dir: Option<PathBuf>,

    /// Verify the controller's TLS certificate (off by default: APICs commonly use self-signed certs)
    #[arg(long)]
    verify_tls: bool,

    /// PEM CA bundle trusted for controller connections; implies --verify-tls
    #[arg(long)]
    ca_cert: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snmpv3_provision=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // .env is optional; real environment variables win
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(ControllerError::AuthFailed { .. }) = e.downcast_ref::<ControllerError>() {
                tracing::error!("{}; aborting run", e);
            } else {
                tracing::error!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut cfg = Config::load()?;
    if args.verify_tls || args.ca_cert.is_some() {
        cfg.controller_tls.verify = true;
    }
    if let Some(ca_cert) = args.ca_cert {
        cfg.controller_tls.ca_cert = Some(ca_cert);
    }
    if !cfg.controller_tls.verify {
        tracing::warn!("Controller TLS certificate verification is disabled");
    }

    tracing::info!("Starting SNMPv3 provisioning");
    tracing::info!("Inventory: {}", args.inventory.display());
    tracing::info!("SNMPv3 user: {} (auth {}, priv {})", cfg.snmp.username, cfg.snmp.auth_protocol, cfg.snmp.privacy_suffix());

    let renderer = match args.templates_dir {
        Some(ref dir) => CommandRenderer::with_overrides(dir)?,
        None => CommandRenderer::builtin()?,
    };
    let transport = Arc::new(SshTransport::new(cfg.ssh_timeout_secs));

    let records = inventory::read_inventory(&args.inventory)?;
    Provisioner::new(cfg, renderer, transport)
        .dry_run(args.dry_run)
        .run(records)
        .await?;

    Ok(())
}
