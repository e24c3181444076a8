//! Backend seams.
//!
//! Each native input API is reached through one trait:
//! - [`RawInputBackend`]: per-device keyboard/mouse packets, pushed by the OS and
//!   drained once per frame. Devices are identified by [`RawHandle`].
//! - [`LegacyBackend`]: pull-based reads of one logical keyboard, one logical
//!   mouse and any number of joysticks identified by [`LegacyJoyId`]. Devices
//!   must be claimed before they deliver data. Optionally supports force-feedback
//!   effects.
//! - [`ControllerBackend`]: slot-numbered gamepads with independent triggers and
//!   two vibration motors. Always pollable; nothing to claim.
//!
//! Backends report native values; normalization happens in the poller so every
//! backend is rescaled the same way.

use crate::error::BackendError;
use crate::event::{RawDeviceInfo, RawEvent};
use crate::metadata::{JoyAxis, NUM_JOY_AXES, NUM_JOY_BUTTONS, NUM_JOY_POVS, NUM_MOUSE_BUTTONS};
use crate::snapshot::KeyboardState;

/// Raw per-device event stream.
pub trait RawInputBackend {
    fn name(&self) -> &'static str {
        "RawInput"
    }

    /// Keyboards currently attached.
    fn keyboards(&mut self) -> Vec<RawDeviceInfo>;

    /// Mice currently attached.
    fn mice(&mut self) -> Vec<RawDeviceInfo>;

    /// Start delivering packets for keyboards and mice.
    fn register(&mut self) -> Result<(), BackendError>;

    /// Stop delivering packets.
    fn unregister(&mut self);

    /// Move every packet queued since the last call into `out`. Must not block.
    fn drain(&mut self, out: &mut Vec<RawEvent>) -> Result<(), BackendError>;
}

/// Opaque legacy joystick identity (instance GUID hash, driver index, …).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LegacyJoyId(pub u64);

/// A device the legacy backend needs claimed before it delivers data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LegacyDevice {
    Keyboard,
    Mouse,
    Joystick(LegacyJoyId),
}

/// Legacy joystick as listed by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyJoyInfo {
    pub id: LegacyJoyId,
    pub name: String,
    pub vendor_id: u16,
    pub product_id: u16,
    /// Device interface path when the backend knows it.
    pub path: Option<String>,
    /// Native `(min, max)` per canonical axis; `None` when the axis is absent.
    pub axis_ranges: [Option<(i64, i64)>; NUM_JOY_AXES],
    pub num_povs: usize,
    pub num_buttons: usize,
    /// Axes that accept force-feedback effects.
    pub ff_axes: [bool; NUM_JOY_AXES],
}

impl LegacyJoyInfo {
    pub fn has_axis(&self) -> [bool; NUM_JOY_AXES] {
        std::array::from_fn(|i| self.axis_ranges[i].is_some())
    }
}

/// One bulk joystick read, in native units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyJoyReading {
    /// Native axis values; ignored for absent axes.
    pub axes: [i64; NUM_JOY_AXES],
    /// POV angles in hundredths of a degree, `None` when centred.
    pub povs: [Option<u32>; NUM_JOY_POVS],
    pub buttons: [bool; NUM_JOY_BUTTONS],
}

impl Default for LegacyJoyReading {
    fn default() -> Self {
        Self {
            axes: [0; NUM_JOY_AXES],
            povs: [None; NUM_JOY_POVS],
            buttons: [false; NUM_JOY_BUTTONS],
        }
    }
}

/// One logical-mouse read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LegacyMouseReading {
    /// Wheel movement since the previous read (wheel units).
    pub dz: i32,
    pub buttons: [bool; NUM_MOUSE_BUTTONS],
}

/// Native effect kinds understood by legacy force-feedback devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectKind {
    ConstantForce,
    Spring,
    Sine,
}

/// Native effect parameters. `magnitude` is in backend force units
/// (`-LEGACY_FF_MAX..=LEGACY_FF_MAX`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectParams {
    pub kind: EffectKind,
    pub axis: JoyAxis,
    pub magnitude: i32,
}

/// Backend-side effect object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub u64);

/// Legacy polling backend.
pub trait LegacyBackend {
    fn name(&self) -> &'static str {
        "Legacy"
    }

    /// Joysticks currently attached.
    fn joysticks(&mut self) -> Vec<LegacyJoyInfo>;

    /// Open a joystick for shared (non-exclusive) access.
    fn open_joystick(&mut self, id: LegacyJoyId) -> Result<(), BackendError>;

    fn close_joystick(&mut self, id: LegacyJoyId);

    /// Claim input focus for a device.
    fn acquire(&mut self, device: LegacyDevice) -> Result<(), BackendError>;

    fn unacquire(&mut self, device: LegacyDevice);

    /// Overwrite `keys` with the current keyboard state.
    fn read_keyboard(&mut self, keys: &mut KeyboardState) -> Result<(), BackendError>;

    fn read_mouse(&mut self) -> Result<LegacyMouseReading, BackendError>;

    fn read_joystick(&mut self, id: LegacyJoyId) -> Result<LegacyJoyReading, BackendError>;

    /// Create and start an effect.
    fn create_effect(
        &mut self,
        _id: LegacyJoyId,
        _params: &EffectParams,
    ) -> Result<EffectHandle, BackendError> {
        Err(BackendError::Unsupported)
    }

    /// Change parameters of a running effect.
    fn update_effect(
        &mut self,
        _effect: EffectHandle,
        _params: &EffectParams,
    ) -> Result<(), BackendError> {
        Err(BackendError::Unsupported)
    }

    /// Stop and destroy an effect.
    fn release_effect(&mut self, _effect: EffectHandle) {}
}

/// Controller button bits (same layout as the XInput `wButtons` field).
pub mod pad {
    pub const DPAD_UP: u16 = 0x0001;
    pub const DPAD_DOWN: u16 = 0x0002;
    pub const DPAD_LEFT: u16 = 0x0004;
    pub const DPAD_RIGHT: u16 = 0x0008;
    pub const START: u16 = 0x0010;
    pub const BACK: u16 = 0x0020;
    pub const LEFT_THUMB: u16 = 0x0040;
    pub const RIGHT_THUMB: u16 = 0x0080;
    pub const LEFT_SHOULDER: u16 = 0x0100;
    pub const RIGHT_SHOULDER: u16 = 0x0200;
    pub const A: u16 = 0x1000;
    pub const B: u16 = 0x2000;
    pub const X: u16 = 0x4000;
    pub const Y: u16 = 0x8000;
}

/// Controller capabilities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerCaps {
    pub vibration: bool,
}

/// One controller read, in native units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerReading {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

/// Controller-specific backend (slot numbered).
pub trait ControllerBackend {
    fn name(&self) -> &'static str {
        "XInput"
    }

    /// Number of slots the backend exposes.
    fn slot_count(&self) -> u32 {
        4
    }

    /// Capabilities of the controller in `slot`; `NotConnected` for an empty slot.
    fn capabilities(&mut self, slot: u32) -> Result<ControllerCaps, BackendError>;

    fn read_state(&mut self, slot: u32) -> Result<ControllerReading, BackendError>;

    /// Set motor speeds (`0..=65535`).
    fn set_vibration(&mut self, slot: u32, left: u16, right: u16) -> Result<(), BackendError>;
}
