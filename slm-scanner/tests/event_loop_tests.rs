//! Scan loop: serialized handling, feedback, overflow and shutdown

mod helpers;

use async_trait::async_trait;
use helpers::Harness;
use slm_common::ScanCode;
use slm_scanner::clients::Announcer;
use slm_scanner::event_loop::{run_scan_loop, scan_channel, DEFAULT_SCAN_BUFFER};
use slm_scanner::types::ClientError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Collects announced sentences
#[derive(Default)]
struct RecordingAnnouncer {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, text: &str) -> Result<(), ClientError> {
        self.messages.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(ClientError::Network("speaker offline".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_scans_are_handled_in_order_with_feedback() {
    let harness = Harness::offline();
    let announcer = Arc::new(RecordingAnnouncer::default());
    let (sender, receiver) = scan_channel(DEFAULT_SCAN_BUFFER);

    assert!(sender.offer(ScanCode::new("111")));
    assert!(sender.offer(ScanCode::new("111")));
    drop(sender);

    run_scan_loop(receiver, harness.service.clone(), announcer.clone(), CancellationToken::new()).await;

    assert_eq!(
        *announcer.messages.lock().unwrap(),
        vec![
            "Item added but name is unrecognized",
            "Item not added because it was already on the shopping list",
        ]
    );
    assert_eq!(harness.tasks.contents(), vec!["unrecognized barcode[111]"]);
}

#[tokio::test]
async fn test_overflow_drops_newest_scans() {
    let harness = Harness::offline();
    let announcer = Arc::new(RecordingAnnouncer::default());
    let (sender, receiver) = scan_channel(DEFAULT_SCAN_BUFFER);

    // Nothing consumes yet, so only the buffer fits
    let accepted: Vec<bool> = ["1", "2", "3", "4"]
        .iter()
        .map(|code| sender.offer(ScanCode::new(*code)))
        .collect();
    assert_eq!(accepted, vec![true, true, false, false]);
    drop(sender);

    run_scan_loop(receiver, harness.service.clone(), announcer.clone(), CancellationToken::new()).await;

    assert_eq!(
        harness.tasks.contents(),
        vec!["unrecognized barcode[1]", "unrecognized barcode[2]"]
    );
}

#[tokio::test]
async fn test_announcer_failure_does_not_stop_the_loop() {
    let harness = Harness::offline();
    let announcer = Arc::new(RecordingAnnouncer {
        fail: true,
        ..Default::default()
    });
    let (sender, receiver) = scan_channel(DEFAULT_SCAN_BUFFER);

    sender.offer(ScanCode::new("1"));
    sender.offer(ScanCode::new("2"));
    drop(sender);

    run_scan_loop(receiver, harness.service.clone(), announcer.clone(), CancellationToken::new()).await;

    assert_eq!(announcer.messages.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancellation_stops_an_idle_loop() {
    let harness = Harness::offline();
    let (sender, receiver) = scan_channel(DEFAULT_SCAN_BUFFER);
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(run_scan_loop(
        receiver,
        harness.service.clone(),
        Arc::new(RecordingAnnouncer::default()),
        cancel.clone(),
    ));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("scan loop did not stop")
        .unwrap();

    // Scans offered after shutdown are dropped
    assert!(!sender.offer(ScanCode::new("1")));
}
