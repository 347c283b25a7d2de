use gistsync_core::config::GistSyncConfig;
use gistsync_host::{GitHubGists, SnippetSource};

pub async fn run() -> anyhow::Result<()> {
    let config = GistSyncConfig::from_env()?;
    let source = GitHubGists::new(
        config.github_api_url.clone(),
        config.github_token.expose(),
        config.github_username.clone(),
    )?;

    if source.validate_credentials().await? {
        println!("GitHub token accepted for {}", source.username());
        Ok(())
    } else {
        anyhow::bail!("GitHub rejected the token for {}", source.username())
    }
}
