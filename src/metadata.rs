//! Device descriptors.
//!
//! [`KeyDetails`], [`MouseDetails`] and [`JoyDetails`] are produced once during
//! enumeration and never change afterwards. They are cloneable and serializable so
//! configuration UIs can list devices and persist what they saw.
//!
//! # Conventions
//! - Joystick axes use the fixed numbering of [`JoyAxis`]; a backend that does not
//!   provide an axis leaves `has_axis[i] == false` and the axis always reads `0`.
//! - `backend` records which backend serves the device. Consumers normally do not
//!   need it: axis/POV/button layout is identical whatever the backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of key slots in a keyboard snapshot (one per key code).
pub const NUM_KEYS: usize = 256;
/// Mouse buttons: left, right, middle, X1, X2.
pub const NUM_MOUSE_BUTTONS: usize = 5;
/// Canonical joystick axes (see [`JoyAxis`]).
pub const NUM_JOY_AXES: usize = 8;
/// POV hats per joystick.
pub const NUM_JOY_POVS: usize = 4;
/// Buttons per joystick.
pub const NUM_JOY_BUTTONS: usize = 128;

/// Which backend serves a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Per-device raw event stream (keyboards and mice only).
    Raw,
    /// Legacy polling API (single logical keyboard/mouse, generic joysticks).
    Legacy,
    /// Controller-specific API (slot based, independent triggers, dual-motor vibration).
    Controller,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Raw => "raw",
            BackendKind::Legacy => "legacy",
            BackendKind::Controller => "controller",
        })
    }
}

/// Canonical joystick axis numbering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoyAxis {
    X = 0,
    Y = 1,
    Z = 2,
    RX = 3,
    RY = 4,
    RZ = 5,
    S1 = 6,
    S2 = 7,
}

impl JoyAxis {
    pub const ALL: [JoyAxis; NUM_JOY_AXES] = [
        JoyAxis::X,
        JoyAxis::Y,
        JoyAxis::Z,
        JoyAxis::RX,
        JoyAxis::RY,
        JoyAxis::RZ,
        JoyAxis::S1,
        JoyAxis::S2,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(i: usize) -> Option<Self> {
        Self::ALL.get(i).copied()
    }

    /// Default display name for the axis.
    pub fn default_name(self) -> &'static str {
        match self {
            JoyAxis::X => "X-Axis",
            JoyAxis::Y => "Y-Axis",
            JoyAxis::Z => "Z-Axis",
            JoyAxis::RX => "RX-Axis",
            JoyAxis::RY => "RY-Axis",
            JoyAxis::RZ => "RZ-Axis",
            JoyAxis::S1 => "Slider 1",
            JoyAxis::S2 => "Slider 2",
        }
    }
}

/// Mouse axes. `Z` is the accumulated wheel position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseAxis {
    X = 0,
    Y = 1,
    Z = 2,
}

impl MouseAxis {
    pub fn from_index(i: usize) -> Option<Self> {
        match i {
            0 => Some(MouseAxis::X),
            1 => Some(MouseAxis::Y),
            2 => Some(MouseAxis::Z),
            _ => None,
        }
    }
}

/// Keyboard descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyDetails {
    pub name: String,
    pub backend: BackendKind,
}

/// Mouse descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseDetails {
    pub name: String,
    pub backend: BackendKind,
    /// `true` for devices reporting absolute coordinates (tablets, lightguns).
    pub is_absolute: bool,
}

/// Joystick descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoyDetails {
    pub name: String,
    pub backend: BackendKind,
    pub num_axes: usize,
    pub num_povs: usize,
    pub num_buttons: usize,
    /// Which canonical axes the device provides.
    pub has_axis: [bool; NUM_JOY_AXES],
    /// Display names per canonical axis (empty when the axis is absent).
    pub axis_names: [String; NUM_JOY_AXES],
    /// `true` if at least one axis accepts force-feedback commands.
    pub has_ffeedback: bool,
    /// Per-axis force-feedback support.
    pub axis_has_ff: [bool; NUM_JOY_AXES],
}

impl JoyDetails {
    /// Build a descriptor from a set of present axes, filling in default names.
    pub fn new(
        name: impl Into<String>,
        backend: BackendKind,
        has_axis: [bool; NUM_JOY_AXES],
        num_povs: usize,
        num_buttons: usize,
        axis_has_ff: [bool; NUM_JOY_AXES],
    ) -> Self {
        let axis_names = std::array::from_fn(|i| {
            if has_axis[i] {
                JoyAxis::ALL[i].default_name().to_string()
            } else {
                String::new()
            }
        });
        // Force feedback only counts on axes that exist.
        let axis_has_ff: [bool; NUM_JOY_AXES] = std::array::from_fn(|i| axis_has_ff[i] && has_axis[i]);
        Self {
            name: name.into(),
            backend,
            num_axes: has_axis.iter().filter(|&&a| a).count(),
            num_povs: num_povs.min(NUM_JOY_POVS),
            num_buttons: num_buttons.min(NUM_JOY_BUTTONS),
            has_axis,
            axis_names,
            has_ffeedback: axis_has_ff.iter().any(|&f| f),
            axis_has_ff,
        }
    }

    /// A device with no axes and no buttons is listed but never polled.
    #[inline]
    pub fn is_pollable(&self) -> bool {
        self.num_axes > 0 || self.num_buttons > 0 || self.num_povs > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joy_details_counts_only_present_axes() {
        let mut axes = [false; NUM_JOY_AXES];
        axes[JoyAxis::X.index()] = true;
        axes[JoyAxis::Y.index()] = true;
        let mut ff = [false; NUM_JOY_AXES];
        ff[JoyAxis::X.index()] = true;
        ff[JoyAxis::RZ.index()] = true; // absent axis, must be dropped

        let d = JoyDetails::new("Stick", BackendKind::Legacy, axes, 1, 12, ff);
        assert_eq!(d.num_axes, 2);
        assert_eq!(d.axis_names[0], "X-Axis");
        assert!(d.axis_names[JoyAxis::RZ.index()].is_empty());
        assert!(d.has_ffeedback);
        assert!(!d.axis_has_ff[JoyAxis::RZ.index()]);
    }

    #[test]
    fn empty_device_is_not_pollable() {
        let d = JoyDetails::new(
            "Nothing",
            BackendKind::Legacy,
            [false; NUM_JOY_AXES],
            0,
            0,
            [false; NUM_JOY_AXES],
        );
        assert!(!d.is_pollable());
    }
}
