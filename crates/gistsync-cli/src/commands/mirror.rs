use clap::Args;
use gistsync_core::config::GistSyncConfig;
use gistsync_core::models::snippet::GistId;

use super::SyncContext;

#[derive(Args)]
pub struct MirrorArgs {
    /// Gist id as shown in its URL
    gist_id: String,
    /// Persist the attempt in the default database when SYNC_DB_PATH is unset
    #[arg(long)]
    persist: bool,
}

pub async fn run(args: MirrorArgs) -> anyhow::Result<()> {
    let config = GistSyncConfig::from_env()?;
    let ctx = SyncContext::from_config(config, args.persist)?;

    let id = GistId::new(args.gist_id);
    let snippet = ctx
        .source
        .get(&id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Gist '{id}' not found"))?;

    println!("Mirroring {id} to {}...", ctx.mirror.target().remote_url(&id));

    let mirror = ctx.mirror.clone();
    let result = tokio::task::spawn_blocking(move || mirror.mirror_snippet(&snippet)).await?;
    ctx.ledger.record_attempt(&result.attempt)?;

    match &result.attempt.error {
        None => {
            println!("  {}", result.attempt.status);
            Ok(())
        }
        Some(err) => anyhow::bail!("mirroring {id} failed: {err}"),
    }
}
