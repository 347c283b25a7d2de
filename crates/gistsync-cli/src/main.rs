mod commands;
mod signals;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gist-sync",
    version,
    about = "Mirror GitHub gists to an Opengist instance"
)]
struct Cli {
    /// Defaults to `run`
    #[command(subcommand)]
    command: Option<commands::Command>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stdout)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env may carry LOG_LEVEL, so it is read before the subscriber starts.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    commands::run(cli.command.unwrap_or_default()).await
}
