//! Pair this device with a phone.

use anyhow::{Context, Result};
use link_client::{
    Client, ClientEvent, DeviceStore, MemoryStore, PairSuccess, QrChannelError, QrChannelItem,
};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::{CliConfig, DeviceRecord};
use crate::simulator::Simulator;

/// Run the pairing flow against the simulated server.
///
/// Prints each code as it becomes current. On success the new identity is
/// written to `device.json` and returned.
pub async fn run(
    data_dir: &Path,
    config: &CliConfig,
    scan_after: Option<usize>,
) -> Result<DeviceRecord> {
    let store = Arc::new(match DeviceRecord::load_optional(data_dir).await? {
        Some(record) => MemoryStore::with_device_id(record.device_id()?),
        None => MemoryStore::new(),
    });

    let transport = Simulator::new(&config.simulator).transport(scan_after)?;
    let client = Client::new(config.client_config(), transport, store.clone());

    let paired: Arc<Mutex<Option<PairSuccess>>> = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&paired);
    client.add_event_handler(move |event| {
        if let ClientEvent::PairSuccess(success) = event {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(success.clone());
        }
    });

    let mut qr = match client.get_qr_channel().await {
        Ok(qr) => qr,
        Err(QrChannelError::IdentityAlreadyStored) => {
            anyhow::bail!("Already paired. Run 'pairlink logout' first.")
        }
        Err(e) => return Err(e).context("Cannot start pairing"),
    };
    client
        .connect()
        .await
        .context("Failed to connect to pairing server")?;

    let pump = tokio::spawn({
        let client = client.clone();
        async move { client.run().await }
    });

    println!("Scan one of these codes with your phone:");
    println!();

    let mut outcome = None;
    while let Some(item) = qr.recv().await {
        match item.code() {
            Some(code) => println!("  {}", code),
            None => outcome = Some(item),
        }
    }
    println!();

    // A timeout already disconnected the client; this covers the other outcomes.
    client.disconnect().await?;
    pump.await.context("Connection task failed")??;

    match outcome {
        Some(QrChannelItem::Success) => {}
        Some(QrChannelItem::Timeout) => anyhow::bail!("Pairing timed out: no code was scanned"),
        Some(other) => anyhow::bail!("Pairing failed: {}", other),
        None => anyhow::bail!("Pairing stream closed without an outcome"),
    }

    let success = paired
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .context("Pairing succeeded but no identity was received")?;
    let device_id = store
        .device_id()
        .context("Pairing succeeded but the identity was not stored")?;

    let record = DeviceRecord::new(device_id, &success.platform);
    record.save(data_dir).await?;

    println!("Paired with a {} phone.", success.platform);
    println!("  Device ID: {}", &record.device_id[..16]);

    Ok(record)
}
