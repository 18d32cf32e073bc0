use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::Backoff;

/// Tuning for issuance retries and change notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Lost block-claim races tolerated before `ContentionExceeded`.
    pub max_contention_retries: u32,
    /// Transient store failures on the block claim tolerated before giving up.
    pub max_unavailable_retries: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    /// Fresh certificate ids tried before `CertificateIdExhausted`.
    pub certificate_id_attempts: u32,
    /// Buffer of each subscriber's broadcast channel.
    pub event_channel_capacity: usize,
    /// Age below which a block without a certificate is reported as pending
    /// rather than orphaned.
    pub pending_window_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_contention_retries: 16,
            max_unavailable_retries: 3,
            retry_initial_delay_ms: 5,
            retry_max_delay_ms: 250,
            certificate_id_attempts: 4,
            event_channel_capacity: 1024,
            pending_window_ms: 10_000,
        }
    }
}

impl LedgerConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.retry_initial_delay_ms),
            Duration::from_millis(self.retry_max_delay_ms),
        )
    }

    pub fn pending_window(&self) -> Duration {
        Duration::from_millis(self.pending_window_ms)
    }
}
