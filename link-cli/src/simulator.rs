//! Simulated pairing server.
//!
//! Scripts a [`MockTransport`] the way a real server would talk to an
//! unpaired device: one batch of pairing codes right after connecting and,
//! if a scan is simulated, a pair-success frame while the chosen code is
//! on screen.

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use link_client::{DeviceId, MockTransport, ServerFrame};
use std::time::Duration;

use crate::config::SimulatorSection;

/// Scripted pairing server.
#[derive(Debug, Clone)]
pub struct Simulator {
    code_count: usize,
    code_timeout: Duration,
    platform: String,
}

impl Simulator {
    /// Create a simulator from its configuration section.
    pub fn new(config: &SimulatorSection) -> Self {
        Self {
            code_count: config.code_count,
            code_timeout: Duration::from_millis(config.code_timeout_ms),
            platform: config.platform.clone(),
        }
    }

    /// Build a transport that plays this script.
    ///
    /// With `scan_after = Some(n)` the phone scans the n-th code (1-based)
    /// halfway through its display time.
    pub fn transport(&self, scan_after: Option<usize>) -> Result<MockTransport> {
        let transport = MockTransport::new();

        let codes = (1..=self.code_count)
            .map(pairing_code)
            .collect::<Result<Vec<_>>>()?;
        transport.queue_frame(ServerFrame::PairDevice {
            codes,
            code_timeout: self.code_timeout,
        });

        if let Some(n) = scan_after {
            if n == 0 || n > self.code_count {
                anyhow::bail!(
                    "--scan-after must be between 1 and {} (the number of codes)",
                    self.code_count
                );
            }
            transport.queue_frame_after(
                self.scan_delay(n),
                ServerFrame::PairSuccess {
                    device_id: DeviceId::random(),
                    platform: self.platform.clone(),
                },
            );
        }

        Ok(transport)
    }

    fn scan_delay(&self, n: usize) -> Duration {
        let before = u32::try_from(n - 1).unwrap_or(u32::MAX);
        self.code_timeout.saturating_mul(before) + self.code_timeout / 2
    }
}

/// A pairing code: a server reference followed by three key blobs.
fn pairing_code(index: usize) -> Result<String> {
    let mut keys = [[0u8; 32]; 3];
    for key in &mut keys {
        getrandom::getrandom(key)
            .map_err(|e| anyhow::anyhow!("Failed to generate pairing key: {}", e))?;
    }
    Ok(format!(
        "{}@{},{},{}",
        index,
        STANDARD.encode(keys[0]),
        STANDARD.encode(keys[1]),
        STANDARD.encode(keys[2])
    ))
}
