//! Snapshot export and import commands

use anyhow::{Context, Result};
use std::io::Write;

use crate::client::ApiClient;
use crate::output::print_success;

/// Download the analyzer's record store
pub async fn export_snapshot(client: &ApiClient, output: Option<String>) -> Result<()> {
    let bytes = client.get_bytes("api/v1/snapshot").await?;

    match output {
        Some(path) => {
            std::fs::write(&path, &bytes)
                .with_context(|| format!("Failed to write snapshot to {}", path))?;
            print_success(&format!("Snapshot written to {} ({} bytes)", path, bytes.len()));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

/// Replace the analyzer's record store with a local snapshot file
pub async fn import_snapshot(client: &ApiClient, file: &str) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read snapshot {}", file))?;

    client.put_json_bytes("api/v1/snapshot", bytes).await?;
    print_success(&format!("Imported snapshot from {}", file));
    Ok(())
}
