use clap::Subcommand;
use gistsync_core::config::GistSyncConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration with tokens redacted
    Show,
}

pub fn run(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = GistSyncConfig::from_env()?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
