//! httpdump - reverse proxy that records every exchange to a dump log.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use httpdump::RecorderConfiguration;

#[derive(Parser, Debug)]
#[command(name = "httpdump", about = "Record HTTP traffic passing through a reverse proxy")]
struct Cli {
    /// Backend every request is forwarded to, e.g. http://backend:port/
    #[arg(long)]
    backend: String,

    /// Address the proxy listens on
    #[arg(long, default_value = "0.0.0.0:5000")]
    listen: String,

    /// Dump log the exchanges are appended to
    #[arg(long, default_value = "httpdump.json")]
    out: PathBuf,

    /// Log every recorded exchange
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut configuration = RecorderConfiguration::new(cli.backend.as_str());
    configuration.set_listen_address(cli.listen.as_str());
    configuration.set_dump_path(&cli.out);

    httpdump::run_recorder(configuration, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
    })
    .await
    .with_context(|| format!("Recording proxy for {} failed", cli.backend))?;

    Ok(())
}
