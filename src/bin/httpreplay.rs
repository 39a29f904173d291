//! httpreplay - replays a dump log against a target and reports divergent responses.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use httpdump::{FailurePolicy, ReplayConfiguration};

#[derive(Parser, Debug)]
#[command(name = "httpreplay", about = "Replay recorded HTTP traffic and report divergences")]
struct Cli {
    /// Dump log written by httpdump
    #[arg(long, default_value = "httpdump.json")]
    dumpfile: PathBuf,

    /// Base url the requests are replayed against, e.g. http://localhost:1333/
    #[arg(long)]
    target: String,

    /// Error log, recreated on every run
    #[arg(long, default_value = "errorlog.json")]
    errorlog: PathBuf,

    /// Count exchanges that can't be replayed and carry on instead of stopping
    #[arg(long)]
    continue_on_error: bool,

    /// Send the recorded Host header instead of the target's
    #[arg(long)]
    preserve_host: bool,

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

    let mut configuration = ReplayConfiguration::new(&cli.dumpfile);
    configuration.set_target(cli.target.as_str());
    configuration.set_error_log_path(&cli.errorlog);
    configuration.set_preserve_host(cli.preserve_host);
    if cli.continue_on_error {
        configuration.set_failure_policy(FailurePolicy::Continue);
    }

    let summary = httpdump::run_replay(&configuration)
        .await
        .with_context(|| format!("Replaying {} failed", cli.dumpfile.display()))?;

    info!("{}", summary);
    if summary.divergent > 0 || summary.failed > 0 {
        process::exit(1);
    }

    Ok(())
}
