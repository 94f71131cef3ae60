//! Barcode reader input device
//!
//! The reader is opened as a Linux evdev device and grabbed, so its keystrokes
//! go only to us and not to whatever has keyboard focus.

use futures::Stream;
use std::path::Path;

use crate::decoder::{DeviceError, KeyEvent};

/// Path that disables the device decode loop
pub const DISABLED_DEVICE: &str = "/dev/null";

#[cfg(target_os = "linux")]
mod linux {
    use super::*;
    use crate::decoder::{KeyCode, KeyKind};
    use evdev::{Device, InputEventKind};

    pub fn open(path: &Path) -> Result<impl Stream<Item = Result<KeyEvent, DeviceError>>, DeviceError> {
        let mut device = Device::open(path)?;

        tracing::info!(
            path = %path.display(),
            name = device.name().unwrap_or("unknown"),
            "Opened barcode reader"
        );

        device.grab()?;
        let mut events = device.into_event_stream()?;

        Ok(async_stream::stream! {
            loop {
                let event = match events.next_event().await {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(DeviceError::Io(e));
                        break;
                    }
                };

                // EV_MSC and EV_SYN accompany every key event
                let InputEventKind::Key(key) = event.kind() else {
                    continue;
                };

                let kind = match event.value() {
                    0 => KeyKind::Release,
                    1 => KeyKind::Press,
                    2 => KeyKind::Repeat,
                    other => {
                        tracing::debug!(value = other, "Ignoring key event with unknown value");
                        continue;
                    }
                };

                yield Ok(KeyEvent {
                    key: KeyCode::new(&format!("{:?}", key)),
                    kind,
                    timestamp: event.timestamp(),
                });
            }
        })
    }
}

/// Open and grab the device, returning its key events as a stream
#[cfg(target_os = "linux")]
pub fn open_key_events(
    path: &Path,
) -> Result<impl Stream<Item = Result<KeyEvent, DeviceError>>, DeviceError> {
    linux::open(path)
}

#[cfg(not(target_os = "linux"))]
pub fn open_key_events(
    path: &Path,
) -> Result<futures::stream::Empty<Result<KeyEvent, DeviceError>>, DeviceError> {
    tracing::error!(path = %path.display(), "Barcode reader input requires Linux evdev");
    Err(DeviceError::Unsupported)
}

/// Whether the configured device path turns the decode loop off
pub fn is_disabled(path: &Path) -> bool {
    path.as_os_str().is_empty() || path == Path::new(DISABLED_DEVICE)
}
