use anyhow::Result;
use std::path::{Path, PathBuf};

/// Expand a leading `~` in a path to the user's home directory.
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if let Some(rest) = path.strip_prefix('~') {
        let home = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("unable to determine home directory"))?
            .home_dir()
            .to_path_buf();
        Ok(home.join(rest.trim_start_matches('/')))
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Ensure a directory exists, creating it (and its parents) if necessary.
pub async fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tokio::fs::create_dir_all(path).await?;
    }
    Ok(())
}
