//! Document rendering and file output.

use std::path::{Path, PathBuf};

use crate::dynamic::DynamicConfig;
use crate::provider::generate::ProviderError;
use crate::provider::state::{unix_now, Snapshot};

/// Render `document` as YAML and JSON.
pub fn render(document: &DynamicConfig) -> Result<Snapshot, ProviderError> {
    Ok(Snapshot {
        yaml: document.to_yaml()?,
        json: document.to_json()?,
        generated_at: unix_now(),
        routers: document.router_count(),
        services: document.service_count(),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace `path` with `contents` in one rename.
///
/// Readers watching the file never observe a partial document.
pub async fn write_atomic(path: &Path, contents: &str) -> Result<(), ProviderError> {
    let tmp = temp_path(path);
    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    tracing::debug!(path = %path.display(), bytes = contents.len(), "Document written");
    Ok(())
}
