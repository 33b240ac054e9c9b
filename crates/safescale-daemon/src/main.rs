//! safescaled: multi-cloud infrastructure orchestrator daemon
//!
//! Loads the tenant configuration, registers the providers, and serves the
//! gRPC API until interrupted.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use safescale_common::defaults::DEFAULT_BIND_ADDRESS;
use safescale_daemon::iaas::tenancy;
use safescale_daemon::server::listeners::{
    ClusterListener, JobListener, NodeListener, TemplateListener, TenantListener,
};
use safescale_proto::{ClusterServer, JobServer, NodeServer, TemplateServer, TenantServer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "safescaled")]
#[command(about = "Multi-cloud infrastructure orchestrator daemon")]
#[command(version)]
struct Args {
    /// Address to serve the gRPC API on
    #[arg(long, default_value = DEFAULT_BIND_ADDRESS)]
    bind: SocketAddr,

    /// Tenant configuration file (JSON)
    #[arg(long, default_value = "tenants.json")]
    tenants: PathBuf,

    /// Log filter, e.g. "info" or "safescale_daemon=debug"
    #[arg(long, default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_filter)),
        )
        .init();

    let configs = tenancy::load_tenant_file(&args.tenants)
        .with_context(|| format!("cannot load tenants from {}", args.tenants.display()))?;
    let count = configs.len();
    for config in configs {
        tenancy::register_tenant(config).context("cannot register tenant")?;
    }
    info!(tenants = count, bind = %args.bind, "safescaled starting");

    tonic::transport::Server::builder()
        .add_service(TenantServer::new(TenantListener))
        .add_service(TemplateServer::new(TemplateListener))
        .add_service(ClusterServer::new(ClusterListener))
        .add_service(NodeServer::new(NodeListener))
        .add_service(JobServer::new(JobListener))
        .serve_with_shutdown(args.bind, async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .context("gRPC server failed")?;

    Ok(())
}
