//! Raw-stream events.
//!
//! The raw backend pushes small, device-tagged packets; the poller drains them once
//! per frame and folds them into snapshots.
//!
//! ## Value conventions
//! - **Keys:** key codes as described in [`keys`](crate::keys); level semantics, the
//!   last packet for a key in a frame wins.
//! - **Mouse motion:** relative counts, or `0..=65535` per axis when `absolute` is set.
//! - **Wheel:** raw wheel units (typically ±120 per notch).
//! - **Buttons:** bit `i` of `buttons_down`/`buttons_up` is mouse button `i`
//!   (left, right, middle, X1, X2).

/// Opaque raw-stream device handle.
///
/// Native handles are pointer-sized; this keeps them comparable and hashable
/// without exposing platform types. Packets injected without a source device
/// carry `RawHandle(0)`; mouse packets from such a source only reach the
/// combined mouse, key packets from it are dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawHandle(pub u64);

/// Keyboard packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub device: RawHandle,
    pub code: u8,
    pub pressed: bool,
}

/// Mouse packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawMouseEvent {
    pub device: RawHandle,
    pub dx: i32,
    pub dy: i32,
    /// `dx`/`dy` are absolute coordinates in `0..=65535` rather than deltas.
    pub absolute: bool,
    pub wheel: i16,
    pub buttons_down: u8,
    pub buttons_up: u8,
}

/// One packet drained from the raw stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawEvent {
    Key(RawKeyEvent),
    Mouse(RawMouseEvent),
}

impl RawEvent {
    pub fn device(&self) -> RawHandle {
        match self {
            RawEvent::Key(k) => k.device,
            RawEvent::Mouse(m) => m.device,
        }
    }
}

/// Raw-stream device as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawDeviceInfo {
    pub handle: RawHandle,
    /// OS device path (opaque), used for naming.
    pub path: String,
    pub is_absolute: bool,
}
