//! Per-frame device state.
//!
//! [`Snapshot`] is the complete state captured by one
//! [`InputSystem::poll`](crate::InputSystem::poll): one [`KeyboardState`], [`MouseState`] and
//! [`JoyState`] per canonical device, plus the combined mouse used for
//! "any mouse" queries.
//!
//! # Semantics
//! - Each per-device entry is replaced as a whole when its backend read succeeds
//!   and left untouched when it fails (last-known-good).
//! - Raw-stream keyboards and mice are the exception: their packets are folded
//!   in as they are drained, since the packets themselves are the state.
//! - `Snapshot` never talks to a backend; readers see exactly what the last poll left.

use crate::metadata::{NUM_JOY_AXES, NUM_JOY_BUTTONS, NUM_JOY_POVS, NUM_KEYS, NUM_MOUSE_BUTTONS};
use crate::normalize::PovDir;

/// Level state of every key code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyboardState {
    pub keys: [bool; NUM_KEYS],
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self {
            keys: [false; NUM_KEYS],
        }
    }
}

impl KeyboardState {
    #[inline]
    pub fn is_down(&self, code: u8) -> bool {
        self.keys[code as usize]
    }
}

/// Mouse position, wheel and buttons.
///
/// `x`/`y` are window client coordinates. `z` accumulates wheel movement;
/// `wheel_dir` is the sign of the wheel movement seen during the last frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseState {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    /// Wheel units accumulated since the last frame boundary.
    pub wheel_delta: i32,
    /// `-1`, `0` or `1`.
    pub wheel_dir: i32,
    pub buttons: [bool; NUM_MOUSE_BUTTONS],
}

impl MouseState {
    /// Close the frame: publish the wheel direction and reset the pending delta.
    pub(crate) fn end_frame(&mut self) {
        self.wheel_dir = self.wheel_delta.signum();
        self.wheel_delta = 0;
    }
}

/// Joystick axes, POV hats and buttons in canonical layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoyState {
    /// Normalized axis values, indexed by [`JoyAxis`](crate::metadata::JoyAxis).
    pub axes: [i32; NUM_JOY_AXES],
    pub povs: [PovDir; NUM_JOY_POVS],
    pub buttons: [bool; NUM_JOY_BUTTONS],
}

impl Default for JoyState {
    fn default() -> Self {
        Self {
            axes: [0; NUM_JOY_AXES],
            povs: [PovDir::Centered; NUM_JOY_POVS],
            buttons: [false; NUM_JOY_BUTTONS],
        }
    }
}

/// Owned state of every enumerated device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub keyboards: Vec<KeyboardState>,
    pub mice: Vec<MouseState>,
    /// Union of all mice (raw mode) or the single logical mouse (legacy mode).
    pub combined_mouse: MouseState,
    pub joysticks: Vec<JoyState>,
}

impl Snapshot {
    pub(crate) fn sized(keyboards: usize, mice: usize, joysticks: usize) -> Self {
        Self {
            keyboards: vec![KeyboardState::default(); keyboards],
            mice: vec![MouseState::default(); mice],
            combined_mouse: MouseState::default(),
            joysticks: vec![JoyState::default(); joysticks],
        }
    }

    #[inline]
    pub fn keyboard(&self, i: usize) -> Option<&KeyboardState> {
        self.keyboards.get(i)
    }

    #[inline]
    pub fn mouse(&self, i: usize) -> Option<&MouseState> {
        self.mice.get(i)
    }

    #[inline]
    pub fn joystick(&self, i: usize) -> Option<&JoyState> {
        self.joysticks.get(i)
    }
}
