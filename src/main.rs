use clap::Parser;
use tracing_subscriber::EnvFilter;

use modrelay::config::ServerConfig;

#[derive(Parser)]
#[command(name = "modrelay")]
#[command(version, about = "Go module download protocol server")]
struct Cli {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// GitHub token against rate limiting (defaults to $GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Upstream proxy to redirect misses to
    #[arg(long)]
    redirect_base: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig {
        port: cli.port,
        github_token: cli.token.or_else(|| std::env::var("GITHUB_TOKEN").ok()),
        redirect_base: cli.redirect_base,
    };

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(modrelay::server::run(config))?;

    Ok(())
}
