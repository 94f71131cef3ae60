//! Scan event loop
//!
//! Decoded codes pass through a small bounded channel to a single consumer that
//! handles them one at a time. Producers never wait: when the consumer falls
//! behind (slow search or language model), further scans are dropped.

use slm_common::ScanCode;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::clients::Announcer;
use crate::scan::{feedback_message, ScanService};

/// Scans that may wait while one is being handled
pub const DEFAULT_SCAN_BUFFER: usize = 2;

/// Non-blocking producer side of the scan channel
#[derive(Debug, Clone)]
pub struct ScanSender {
    tx: mpsc::Sender<ScanCode>,
}

impl ScanSender {
    /// Queue a code; returns false if it was dropped
    pub fn offer(&self, code: ScanCode) -> bool {
        match self.tx.try_send(code) {
            Ok(()) => true,
            Err(TrySendError::Full(code)) => {
                warn!(code = %code, "Scan channel full, dropping scan");
                false
            }
            Err(TrySendError::Closed(code)) => {
                warn!(code = %code, "Scan channel closed, dropping scan");
                false
            }
        }
    }
}

/// Bounded scan channel
pub fn scan_channel(capacity: usize) -> (ScanSender, mpsc::Receiver<ScanCode>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ScanSender { tx }, rx)
}

/// Handle scans until cancelled or every sender is gone
pub async fn run_scan_loop(
    mut scans: mpsc::Receiver<ScanCode>,
    service: Arc<ScanService>,
    announcer: Arc<dyn Announcer>,
    cancel: CancellationToken,
) {
    info!("Scan loop started");

    loop {
        let code = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Scan loop stopping (cancelled)");
                return;
            }
            next = scans.recv() => match next {
                Some(code) => code,
                None => {
                    info!("Scan loop stopping (all producers gone)");
                    return;
                }
            },
        };

        let result = service.handle_scan(&code).await;
        if let Err(e) = &result {
            warn!(code = %code, error = %e, "Scan handling failed");
        }

        let message = feedback_message(&result);
        if let Err(e) = announcer.announce(&message).await {
            warn!(error = %e, feedback = %message, "Unable to announce scan feedback");
        }
    }
}
