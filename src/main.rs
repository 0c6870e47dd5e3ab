use clap::Parser;
use kbcore::server::run_server;

#[derive(Parser, Debug)]
#[command(name = "kbcore-server")]
#[command(about = "Multi-tenant knowledge base indexing and hybrid retrieval server")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file, layered over the embedded defaults and `KBCORE__` env vars.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    run_server(cli.config.as_deref()).await
}
