//! Keystroke decoder
//!
//! Barcode readers act like a keyboard that types `<barcode>ENTER`. This module
//! turns the resulting key events back into text. Only key releases are
//! considered; each key is committed to an accumulator until ENTER, at which
//! point the accumulator is rendered as a whole, since a character can depend
//! on the key before it (shift).

use futures::{Stream, StreamExt};
use slm_common::ScanCode;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::time::SystemTime;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::event_loop::ScanSender;

/// Input device errors
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The event stream ended without a cancellation request
    #[error("input closed unexpectedly")]
    InputClosed,

    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input devices are not supported on this platform")]
    Unsupported,
}

/// Key label as the kernel names it, without the `KEY_` prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCode(Cow<'static, str>);

impl KeyCode {
    pub const ENTER: KeyCode = KeyCode::constant("ENTER");
    pub const CAPSLOCK: KeyCode = KeyCode::constant("CAPSLOCK");
    pub const LEFTSHIFT: KeyCode = KeyCode::constant("LEFTSHIFT");
    pub const RIGHTSHIFT: KeyCode = KeyCode::constant("RIGHTSHIFT");
    pub const SEMICOLON: KeyCode = KeyCode::constant("SEMICOLON");
    pub const SLASH: KeyCode = KeyCode::constant("SLASH");
    pub const DOT: KeyCode = KeyCode::constant("DOT");
    pub const MINUS: KeyCode = KeyCode::constant("MINUS");

    const fn constant(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }

    /// Key from a label; a `KEY_` prefix is stripped and case is normalized
    pub fn new(label: &str) -> Self {
        let label = label.strip_prefix("KEY_").unwrap_or(label);
        Self(Cow::Owned(label.to_ascii_uppercase()))
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    pub fn is_shift(&self) -> bool {
        *self == Self::LEFTSHIFT || *self == Self::RIGHTSHIFT
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key state transition carried by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    Press,
    Release,
    Repeat,
}

/// One key event from the input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub kind: KeyKind,
    /// Device timestamp; only event order matters to the decoder
    pub timestamp: SystemTime,
}

impl KeyEvent {
    pub fn new(key: KeyCode, kind: KeyKind) -> Self {
        Self {
            key,
            kind,
            timestamp: SystemTime::now(),
        }
    }

    pub fn release(key: KeyCode) -> Self {
        Self::new(key, KeyKind::Release)
    }

    pub fn press(key: KeyCode) -> Self {
        Self::new(key, KeyKind::Press)
    }
}

/// Decoder settings
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    /// Keys dropped before they reach the accumulator, in addition to CAPSLOCK
    pub ignored_keys: HashSet<KeyCode>,
}

/// Accumulates released keys and commits them as a scan code on ENTER
///
/// One instance per device session.
#[derive(Debug, Default)]
pub struct KeystrokeDecoder {
    config: DecoderConfig,
    keys_entered: Vec<KeyCode>,
}

impl KeystrokeDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            config,
            keys_entered: Vec::new(),
        }
    }

    /// Feed one event; returns a code when the event completes a scan
    pub fn feed(&mut self, event: &KeyEvent) -> Option<ScanCode> {
        // EV_MSC/EV_SYN are filtered by the device adapter; presses and
        // repeats carry nothing a release doesn't.
        if event.kind != KeyKind::Release {
            return None;
        }

        // If the system has caps lock on, the OS synthesizes a CAPSLOCK around
        // every scan. It must never enter the accumulator or it breaks the
        // shift lookback.
        if event.key == KeyCode::CAPSLOCK || self.config.ignored_keys.contains(&event.key) {
            return None;
        }

        if event.key == KeyCode::ENTER {
            let text = keys_to_text(&self.keys_entered);
            self.keys_entered.clear();

            if text.is_empty() {
                debug!("ENTER without preceding keys, nothing to commit");
                return None;
            }
            return Some(ScanCode::new(text));
        }

        self.keys_entered.push(event.key.clone());
        None
    }

    /// Keys accumulated since the last commit
    pub fn pending(&self) -> &[KeyCode] {
        &self.keys_entered
    }
}

/// Render accumulated keys as text
///
/// Turns something like `[LEFTSHIFT, F, O, O]` into `"Foo"`. Shift keys are
/// not output; they make the key right after them upper-case. Labels that are
/// not single characters (SEMICOLON, SLASH, ...) are mapped for the keys a
/// barcode reader emits in URLs; any other label is output as-is.
pub fn keys_to_text(keys: &[KeyCode]) -> String {
    let mut text = String::new();

    for (i, key) in keys.iter().enumerate() {
        if key.is_shift() {
            continue;
        }

        let shift_pressed = i >= 1 && keys[i - 1].is_shift();

        match key.label() {
            "SEMICOLON" => text.push(':'),
            "SLASH" => text.push('/'),
            "DOT" => text.push('.'),
            "MINUS" => text.push(if shift_pressed { '_' } else { '-' }),
            label if shift_pressed => text.push_str(label),
            label => text.push_str(&label.to_lowercase()),
        }
    }

    text
}

/// Decode events until cancelled
///
/// Committed codes are offered to `sink` without blocking; a full channel drops
/// the code (logged by the sender). Returns `Ok(())` on cancellation and
/// [`DeviceError::InputClosed`] if the stream ends on its own.
pub async fn run_decoder<S>(
    events: S,
    config: DecoderConfig,
    sink: ScanSender,
    cancel: CancellationToken,
) -> Result<(), DeviceError>
where
    S: Stream<Item = Result<KeyEvent, DeviceError>>,
{
    let mut events = std::pin::pin!(events);
    let mut decoder = KeystrokeDecoder::new(config);

    info!("Barcode decoder started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Barcode decoder stopping (cancelled)");
                return Ok(());
            }
            next = events.next() => {
                let event = match next {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => return Err(e),
                    None => return Err(DeviceError::InputClosed),
                };

                if let Some(code) = decoder.feed(&event) {
                    debug!(code = %code, "Barcode decoded");
                    sink.offer(code);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_loop::scan_channel;

    fn keys(labels: &[&str]) -> Vec<KeyCode> {
        labels.iter().map(|l| KeyCode::new(l)).collect()
    }

    fn releases(labels: &[&str]) -> Vec<KeyEvent> {
        keys(labels).into_iter().map(KeyEvent::release).collect()
    }

    fn decode_all(events: &[KeyEvent]) -> Vec<String> {
        let mut decoder = KeystrokeDecoder::default();
        events
            .iter()
            .filter_map(|e| decoder.feed(e))
            .map(|c| c.to_string())
            .collect()
    }

    #[test]
    fn test_empty_keys_render_empty() {
        assert_eq!(keys_to_text(&[]), "");
    }

    #[test]
    fn test_url_with_shifted_characters() {
        let text = keys_to_text(&keys(&[
            "H", "T", "T", "P", "S", "LEFTSHIFT", "SEMICOLON", "SLASH", "SLASH", "X", "S", "DOT",
            "F", "I", "SLASH", "0", "SLASH", "LEFTSHIFT", "U", "LEFTSHIFT", "J", "LEFTSHIFT", "N",
            "Y", "LEFTSHIFT", "J", "M", "K",
        ]));
        assert_eq!(text, "https://xs.fi/0/UJNyJmk");
    }

    #[test]
    fn test_minus_and_underscore() {
        let text = keys_to_text(&keys(&["F", "O", "O", "MINUS", "LEFTSHIFT", "MINUS"]));
        assert_eq!(text, "foo-_");
    }

    #[test]
    fn test_right_shift_counts_as_shift() {
        assert_eq!(keys_to_text(&keys(&["RIGHTSHIFT", "A", "B"])), "Ab");
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        assert_eq!(keys_to_text(&keys(&["1", "TAB", "2"])), "1tab2");
    }

    #[test]
    fn test_key_code_strips_prefix() {
        assert_eq!(KeyCode::new("KEY_ENTER"), KeyCode::ENTER);
        assert_eq!(KeyCode::new("leftshift"), KeyCode::LEFTSHIFT);
    }

    #[test]
    fn test_presses_alone_emit_nothing() {
        let mut decoder = KeystrokeDecoder::default();
        for key in keys(&["6", "4", "0", "8", "ENTER", "ENTER"]) {
            assert!(decoder.feed(&KeyEvent::press(key)).is_none());
        }
        assert!(decoder.pending().is_empty());
    }

    #[test]
    fn test_enter_commits_and_resets() {
        let codes = decode_all(&releases(&["1", "2", "ENTER", "3", "ENTER"]));
        assert_eq!(codes, vec!["12", "3"]);
    }

    #[test]
    fn test_press_and_release_pairs() {
        let mut events = Vec::new();
        for key in keys(&["LEFTSHIFT", "A", "1", "ENTER"]) {
            events.push(KeyEvent::press(key.clone()));
            events.push(KeyEvent::release(key));
        }
        assert_eq!(decode_all(&events), vec!["A1"]);
    }

    #[test]
    fn test_capslock_never_reaches_output() {
        // Caps lock between shift and the shifted key must not break the lookback
        let codes = decode_all(&releases(&[
            "CAPSLOCK", "1", "LEFTSHIFT", "CAPSLOCK", "A", "CAPSLOCK", "ENTER",
        ]));
        assert_eq!(codes, vec!["1A"]);
    }

    #[test]
    fn test_capslock_only_scan_emits_nothing() {
        assert!(decode_all(&releases(&["CAPSLOCK", "ENTER"])).is_empty());
    }

    #[test]
    fn test_configured_ignored_keys_are_dropped() {
        let mut config = DecoderConfig::default();
        config.ignored_keys.insert(KeyCode::new("NUMLOCK"));
        let mut decoder = KeystrokeDecoder::new(config);

        let mut codes = Vec::new();
        for event in releases(&["NUMLOCK", "4", "2", "NUMLOCK", "ENTER"]) {
            codes.extend(decoder.feed(&event));
        }
        assert_eq!(codes, vec![ScanCode::new("42")]);
    }

    #[tokio::test]
    async fn test_run_decoder_reports_closed_input() {
        let (sender, mut receiver) = scan_channel(2);
        let events = futures::stream::iter(releases(&["1", "2", "3", "ENTER"]).into_iter().map(Ok));

        let result = run_decoder(events, DecoderConfig::default(), sender, CancellationToken::new()).await;

        assert!(matches!(result, Err(DeviceError::InputClosed)));
        assert_eq!(receiver.try_recv().unwrap(), ScanCode::new("123"));
    }

    #[tokio::test]
    async fn test_run_decoder_stops_cleanly_on_cancel() {
        let (sender, _receiver) = scan_channel(2);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run_decoder(futures::stream::pending(), DecoderConfig::default(), sender, cancel).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_decoder_propagates_read_errors() {
        let (sender, _receiver) = scan_channel(2);
        let events = futures::stream::iter(vec![Err(DeviceError::Io(std::io::Error::other("gone")))]);

        let result = run_decoder(events, DecoderConfig::default(), sender, CancellationToken::new()).await;

        assert!(matches!(result, Err(DeviceError::Io(_))));
    }

    #[tokio::test]
    async fn test_run_decoder_drops_scans_when_channel_full() {
        let (sender, mut receiver) = scan_channel(2);
        let events = futures::stream::iter(
            releases(&["1", "ENTER", "2", "ENTER", "3", "ENTER"]).into_iter().map(Ok),
        );

        let result = run_decoder(events, DecoderConfig::default(), sender, CancellationToken::new()).await;
        assert!(matches!(result, Err(DeviceError::InputClosed)));

        assert_eq!(receiver.try_recv().unwrap(), ScanCode::new("1"));
        assert_eq!(receiver.try_recv().unwrap(), ScanCode::new("2"));
        assert!(receiver.try_recv().is_err());
    }
}
