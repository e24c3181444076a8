//! Axis and POV normalization.
//!
//! Every backend reports axes in its own native range (8-bit triggers, 10-bit
//! legacy sticks, 16-bit signed thumbsticks, …). The poller folds them all into
//! `AXIS_MIN..=AXIS_MAX` so consumers never see the native width.
//!
//! ## Axis policy
//! The map is piecewise linear around the native centre, defined as
//! `min + (max - min + 1) / 2` (e.g. `128` for `0..=255`, `0` for `-32768..=32767`):
//! - native `min`    → `AXIS_MIN`
//! - native centre   → `0`
//! - native `max`    → `AXIS_MAX`
//!
//! Both halves are monotonic, so the whole map is monotonic.
//!
//! ## POV policy
//! Angles are in hundredths of a degree (`0..36000`, Up = 0, clockwise). Each
//! compass direction owns a 45° sector centred on it; an angle exactly on a sector
//! boundary belongs to the sector clockwise of it.

use serde::{Deserialize, Serialize};

/// Lowest normalized axis value.
pub const AXIS_MIN: i32 = -32768;
/// Highest normalized axis value.
pub const AXIS_MAX: i32 = 32767;

/// Rescale a native axis value from `native_min..=native_max` into `AXIS_MIN..=AXIS_MAX`.
///
/// Values outside the native range are clamped first. A degenerate range
/// (`native_max <= native_min`) reads as centred.
pub fn normalize_axis(raw: i64, native_min: i64, native_max: i64) -> i32 {
    if native_max <= native_min {
        return 0;
    }
    let raw = raw.clamp(native_min, native_max);
    let center = native_min + (native_max - native_min + 1) / 2;

    let v = if raw <= center {
        // [min, center] -> [AXIS_MIN, 0]
        let span = center - native_min;
        if span == 0 {
            0
        } else {
            AXIS_MIN as i64 + (raw - native_min) * (-(AXIS_MIN as i64)) / span
        }
    } else {
        // (center, max] -> (0, AXIS_MAX]
        let span = native_max - center;
        (raw - center) * AXIS_MAX as i64 / span
    };
    v as i32
}

/// Rescale a unipolar control (e.g. an 8-bit trigger) into `0..=AXIS_MAX`.
///
/// Released reads `0`, matching the centred value of a bipolar axis at rest.
pub fn normalize_half_axis(raw: i64, native_max: i64) -> i32 {
    if native_max <= 0 {
        return 0;
    }
    (raw.clamp(0, native_max) * AXIS_MAX as i64 / native_max) as i32
}

/// One of nine POV states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PovDir {
    #[default]
    Centered,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl PovDir {
    /// Compass directions in clockwise order starting at Up.
    pub const COMPASS: [PovDir; 8] = [
        PovDir::Up,
        PovDir::UpRight,
        PovDir::Right,
        PovDir::DownRight,
        PovDir::Down,
        PovDir::DownLeft,
        PovDir::Left,
        PovDir::UpLeft,
    ];

    /// Clockwise sector index (`Up = 0`), or `None` when centred.
    pub fn sector(self) -> Option<usize> {
        Self::COMPASS.iter().position(|&d| d == self)
    }

    /// Whether a hat reading of `self` counts as pressed toward `dir`.
    ///
    /// A cardinal query matches the cardinal itself and both neighbouring
    /// diagonals (Up matches UpLeft, Up and UpRight). A diagonal query only
    /// matches itself. `Centered` matches only `Centered`.
    pub fn contains(self, dir: PovDir) -> bool {
        match (self.sector(), dir.sector()) {
            (None, None) => true,
            (Some(have), Some(want)) => {
                if want % 2 == 1 {
                    have == want
                } else {
                    have == want || have == (want + 1) % 8 || have == (want + 7) % 8
                }
            }
            _ => false,
        }
    }
}

/// Map a native POV angle (hundredths of a degree) to a [`PovDir`].
///
/// `None`, or any value outside `0..36000` (e.g. `0xFFFF`, `-1`), reads as centred.
pub fn pov_from_centidegrees(angle: Option<u32>) -> PovDir {
    match angle {
        Some(a) if a < 36000 => PovDir::COMPASS[(((a + 2250) / 4500) % 8) as usize],
        _ => PovDir::Centered,
    }
}

/// Map four D-pad buttons to a [`PovDir`]. Conflicting presses (up+down,
/// left+right) read as centred.
pub fn pov_from_dpad(up: bool, down: bool, left: bool, right: bool) -> PovDir {
    match (up, down, left, right) {
        (true, false, false, false) => PovDir::Up,
        (true, false, false, true) => PovDir::UpRight,
        (false, false, false, true) => PovDir::Right,
        (false, true, false, true) => PovDir::DownRight,
        (false, true, false, false) => PovDir::Down,
        (false, true, true, false) => PovDir::DownLeft,
        (false, false, true, false) => PovDir::Left,
        (true, false, true, false) => PovDir::UpLeft,
        _ => PovDir::Centered,
    }
}
