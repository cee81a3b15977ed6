//! Show pairing status.

use anyhow::Result;
use std::path::Path;

use crate::config::DeviceRecord;

/// Run the status command.
pub async fn run(data_dir: &Path) -> Result<()> {
    println!("=== pairlink status ===");
    println!();

    match DeviceRecord::load_optional(data_dir).await? {
        Some(record) => {
            let id = record.device_id()?;
            println!("Device:");
            println!("  ID:       {:?}", id);
            println!("  Platform: {}", record.platform);
            println!("  Paired:   {}", format_timestamp(record.paired_at));
        }
        None => {
            println!("Device: NOT PAIRED");
            println!();
            println!("Run 'pairlink pair' to pair with a phone.");
        }
    }

    Ok(())
}

/// Format a Unix timestamp as a human-readable string.
fn format_timestamp(ts: u64) -> String {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let diff = now.saturating_sub(ts);

    if diff < 60 {
        "just now".to_string()
    } else if diff < 3600 {
        format!("{} minutes ago", diff / 60)
    } else if diff < 86400 {
        format!("{} hours ago", diff / 3600)
    } else {
        format!("{} days ago", diff / 86400)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_client::DeviceId;
    use tempfile::tempdir;

    #[tokio::test]
    async fn status_without_device() {
        let dir = tempdir().unwrap();

        // Should succeed but show "not paired"
        let result = run(dir.path()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn status_with_device() {
        let dir = tempdir().unwrap();
        DeviceRecord::new(DeviceId::random(), "android")
            .save(dir.path())
            .await
            .unwrap();

        let result = run(dir.path()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn status_with_corrupt_record_fails() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("device.json"), "{not json")
            .await
            .unwrap();

        assert!(run(dir.path()).await.is_err());
    }

    #[test]
    fn format_timestamp_works() {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();

        assert_eq!(format_timestamp(now), "just now");
        assert!(format_timestamp(now - 120).contains("minutes"));
        assert!(format_timestamp(now - 7200).contains("hours"));
        assert!(format_timestamp(now - 172800).contains("days"));
    }
}
