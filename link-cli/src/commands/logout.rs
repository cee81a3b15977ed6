//! Forget the stored device identity.

use anyhow::Result;
use std::path::Path;

use crate::config::DeviceRecord;

/// Run the logout command. Returns false if the device was not paired.
pub async fn run(data_dir: &Path) -> Result<bool> {
    let removed = DeviceRecord::delete(data_dir).await?;
    if removed {
        tracing::info!("Removed device identity from {}", data_dir.display());
        println!("Logged out. Run 'pairlink pair' to pair again.");
    } else {
        println!("Not paired; nothing to do.");
    }
    Ok(removed)
}
