//! The per-frame read.
//!
//! [`InputSystem::poll`] runs once per emulated frame on the window thread:
//! 1. drain the raw stream and fold its packets into keyboards and mice,
//! 2. read the legacy keyboard and mouse (when raw mode is off),
//! 3. read every legacy joystick,
//! 4. read every controller slot,
//! 5. report [`InputError::PollDegraded`] if every attempted read failed.
//!
//! A failed read leaves that device's previous state in place.

use tracing::{debug, trace, warn};

use crate::device::{pad, ControllerReading, LegacyDevice, LegacyJoyReading};
use crate::enumerate::{JoySource, KbmSource};
use crate::error::{BackendError, InputError};
use crate::event::{RawEvent, RawMouseEvent};
use crate::manager::InputSystem;
use crate::metadata::{JoyAxis, NUM_JOY_AXES, NUM_JOY_BUTTONS, NUM_JOY_POVS, NUM_MOUSE_BUTTONS};
use crate::normalize::{normalize_axis, normalize_half_axis, pov_from_centidegrees, pov_from_dpad};
use crate::snapshot::{JoyState, KeyboardState, MouseState};

/// Full scale of absolute pointer packets.
const ABSOLUTE_MAX: i64 = 65535;

/// Controller buttons in joystick button order.
const BUTTON_MAP: [u16; 10] = [
    pad::A,
    pad::B,
    pad::X,
    pad::Y,
    pad::LEFT_SHOULDER,
    pad::RIGHT_SHOULDER,
    pad::BACK,
    pad::START,
    pad::LEFT_THUMB,
    pad::RIGHT_THUMB,
];

/// Read outcomes of one poll.
#[derive(Debug, Default)]
struct Tally {
    attempted: usize,
    failed: usize,
    /// Joysticks whose controller slot is empty; reset once the frame is kept.
    emptied: Vec<usize>,
}

impl Tally {
    fn record<T>(&mut self, r: &Result<T, BackendError>) {
        self.attempted += 1;
        if r.is_err() {
            self.failed += 1;
        }
    }

    fn all_failed(&self) -> bool {
        self.attempted > 0 && self.failed == self.attempted
    }
}

impl InputSystem {
    /// Capture the current state of every device into the snapshot.
    ///
    /// Never blocks. Devices whose read fails keep their previous state; when every
    /// read fails, the whole snapshot is left as it was and
    /// [`InputError::PollDegraded`] is returned.
    pub fn poll(&mut self) -> Result<(), InputError> {
        self.reclaim_lost();
        let mut tally = Tally::default();

        if self.raw_mode {
            self.poll_raw(&mut tally);
        } else {
            self.poll_legacy_keyboard_mouse(&mut tally);
        }
        self.poll_legacy_joysticks(&mut tally);
        self.poll_controllers(&mut tally);

        if tally.all_failed() {
            warn!(attempted = tally.attempted, "every input read failed; keeping previous state");
            return Err(InputError::PollDegraded);
        }
        for i in tally.emptied.drain(..) {
            self.snapshot.joysticks[i] = JoyState::default();
        }
        trace!(attempted = tally.attempted, failed = tally.failed, "input polled");
        Ok(())
    }

    fn poll_raw(&mut self, tally: &mut Tally) {
        let Some(raw) = self.raw.as_mut() else {
            return;
        };
        self.raw_scratch.clear();
        let r = raw.drain(&mut self.raw_scratch);
        tally.record(&r);
        if let Err(e) = r {
            debug!(error = %e, "raw input drain failed");
            return;
        }

        let extent = self.window.client_size();
        for event in self.raw_scratch.drain(..) {
            match event {
                RawEvent::Key(k) => {
                    if let Some(&i) = self.raw_keyboard_index.get(&k.device) {
                        self.snapshot.keyboards[i].keys[k.code as usize] = k.pressed;
                    }
                }
                RawEvent::Mouse(m) => {
                    if let Some(&i) = self.raw_mouse_index.get(&m.device) {
                        apply_mouse_packet(&mut self.snapshot.mice[i], &m, extent);
                    }
                    apply_mouse_packet(&mut self.snapshot.combined_mouse, &m, extent);
                }
            }
        }

        for mouse in &mut self.snapshot.mice {
            mouse.end_frame();
        }
        self.snapshot.combined_mouse.end_frame();
    }

    fn poll_legacy_keyboard_mouse(&mut self, tally: &mut Tally) {
        if self.legacy.is_none() {
            return;
        }

        let kbd = self.keyboards.iter().position(|k| k.source == KbmSource::Legacy);
        if let Some(i) = kbd.filter(|_| self.is_claimed(LegacyDevice::Keyboard)) {
            let mut keys = KeyboardState::default();
            let r = match self.legacy.as_mut() {
                Some(legacy) => legacy.read_keyboard(&mut keys),
                None => return,
            };
            tally.record(&r);
            match r {
                Ok(()) => self.snapshot.keyboards[i] = keys,
                Err(e) => self.read_failed(LegacyDevice::Keyboard, e),
            }
        }

        let mouse = self.mice.iter().position(|m| m.source == KbmSource::Legacy);
        if let Some(i) = mouse.filter(|_| self.is_claimed(LegacyDevice::Mouse)) {
            let r = match self.legacy.as_mut() {
                Some(legacy) => legacy.read_mouse(),
                None => return,
            };
            tally.record(&r);
            match r {
                Ok(reading) => {
                    let state = &mut self.snapshot.mice[i];
                    if let Some((x, y)) = self.window.cursor_pos() {
                        state.x = x;
                        state.y = y;
                    }
                    state.z += reading.dz;
                    state.wheel_delta += reading.dz;
                    state.buttons = reading.buttons;
                    state.end_frame();
                    self.snapshot.combined_mouse = *state;
                }
                Err(e) => self.read_failed(LegacyDevice::Mouse, e),
            }
        }
    }

    fn poll_legacy_joysticks(&mut self, tally: &mut Tally) {
        for i in 0..self.joysticks.len() {
            let joy = &self.joysticks[i];
            let JoySource::Legacy { id, ranges } = joy.source else {
                continue;
            };
            let device = LegacyDevice::Joystick(id);
            if !joy.pollable || !self.is_claimed(device) {
                continue;
            }
            let (num_povs, num_buttons) = (joy.details.num_povs, joy.details.num_buttons);

            let Some(legacy) = self.legacy.as_mut() else {
                return;
            };
            let r = legacy.read_joystick(id);
            tally.record(&r);
            match r {
                Ok(reading) => {
                    self.snapshot.joysticks[i] =
                        legacy_joy_state(&reading, &ranges, num_povs, num_buttons);
                }
                Err(e) => self.read_failed(device, e),
            }
        }
    }

    fn poll_controllers(&mut self, tally: &mut Tally) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        for (i, joy) in self.joysticks.iter().enumerate() {
            let JoySource::Controller { slot } = joy.source else {
                continue;
            };
            match controller.read_state(slot) {
                // An empty slot is a known state, not a failed read.
                Err(BackendError::NotConnected) => tally.emptied.push(i),
                r => {
                    tally.record(&r);
                    match r {
                        Ok(reading) => self.snapshot.joysticks[i] = controller_joy_state(&reading),
                        Err(e) => debug!(slot, error = %e, "controller read failed"),
                    }
                }
            }
        }
    }

    fn read_failed(&mut self, device: LegacyDevice, e: BackendError) {
        if e == BackendError::InputLost {
            self.mark_lost(device);
        } else {
            debug!(?device, error = %e, "legacy read failed");
        }
    }
}

/// Fold one raw mouse packet into `state`, keeping the position inside the
/// `(width, height)` client area.
fn apply_mouse_packet(state: &mut MouseState, m: &RawMouseEvent, (width, height): (u32, u32)) {
    let max_x = (width as i32 - 1).max(0);
    let max_y = (height as i32 - 1).max(0);
    if m.absolute {
        state.x = (m.dx.clamp(0, ABSOLUTE_MAX as i32) as i64 * width as i64 / ABSOLUTE_MAX) as i32;
        state.y = (m.dy.clamp(0, ABSOLUTE_MAX as i32) as i64 * height as i64 / ABSOLUTE_MAX) as i32;
        state.x = state.x.min(max_x);
        state.y = state.y.min(max_y);
    } else {
        state.x = state.x.saturating_add(m.dx).clamp(0, max_x);
        state.y = state.y.saturating_add(m.dy).clamp(0, max_y);
    }

    if m.wheel != 0 {
        state.z += m.wheel as i32;
        state.wheel_delta += m.wheel as i32;
    }

    for b in 0..NUM_MOUSE_BUTTONS {
        let bit = 1u8 << b;
        if m.buttons_down & bit != 0 {
            state.buttons[b] = true;
        }
        if m.buttons_up & bit != 0 {
            state.buttons[b] = false;
        }
    }
}

fn legacy_joy_state(
    reading: &LegacyJoyReading,
    ranges: &[Option<(i64, i64)>; NUM_JOY_AXES],
    num_povs: usize,
    num_buttons: usize,
) -> JoyState {
    let mut state = JoyState::default();
    for (i, range) in ranges.iter().enumerate() {
        if let Some((min, max)) = *range {
            state.axes[i] = normalize_axis(reading.axes[i], min, max);
        }
    }
    for p in 0..num_povs.min(NUM_JOY_POVS) {
        state.povs[p] = pov_from_centidegrees(reading.povs[p]);
    }
    let n = num_buttons.min(NUM_JOY_BUTTONS);
    state.buttons[..n].copy_from_slice(&reading.buttons[..n]);
    state
}

fn controller_joy_state(r: &ControllerReading) -> JoyState {
    let stick = |v: i16| normalize_axis(v as i64, i16::MIN as i64, i16::MAX as i64);
    // Controller Y axes grow upward; joystick Y axes grow downward.
    let stick_inverted = |v: i16| normalize_axis(-(v as i64), i16::MIN as i64, i16::MAX as i64);
    let trigger = |v: u8| normalize_half_axis(v as i64, u8::MAX as i64);

    let mut state = JoyState::default();
    state.axes[JoyAxis::X.index()] = stick(r.thumb_lx);
    state.axes[JoyAxis::Y.index()] = stick_inverted(r.thumb_ly);
    state.axes[JoyAxis::Z.index()] = trigger(r.left_trigger);
    state.axes[JoyAxis::RX.index()] = stick(r.thumb_rx);
    state.axes[JoyAxis::RY.index()] = stick_inverted(r.thumb_ry);
    state.axes[JoyAxis::RZ.index()] = trigger(r.right_trigger);

    let held = |bit: u16| r.buttons & bit != 0;
    state.povs[0] = pov_from_dpad(
        held(pad::DPAD_UP),
        held(pad::DPAD_DOWN),
        held(pad::DPAD_LEFT),
        held(pad::DPAD_RIGHT),
    );
    for (b, &bit) in BUTTON_MAP.iter().enumerate() {
        state.buttons[b] = held(bit);
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{PovDir, AXIS_MAX, AXIS_MIN};

    #[test]
    fn relative_packets_clamp_to_client_area() {
        let mut m = MouseState::default();
        let packet = RawMouseEvent {
            dx: 500,
            dy: -20,
            ..Default::default()
        };
        apply_mouse_packet(&mut m, &packet, (320, 240));
        assert_eq!((m.x, m.y), (319, 0));
    }

    #[test]
    fn absolute_packets_scale_to_client_area() {
        let mut m = MouseState::default();
        let packet = RawMouseEvent {
            dx: 32768,
            dy: 65535,
            absolute: true,
            ..Default::default()
        };
        apply_mouse_packet(&mut m, &packet, (640, 480));
        assert_eq!((m.x, m.y), (320, 479));
    }

    #[test]
    fn wheel_and_buttons_fold_in() {
        let mut m = MouseState::default();
        apply_mouse_packet(
            &mut m,
            &RawMouseEvent {
                wheel: -120,
                buttons_down: 0b101,
                ..Default::default()
            },
            (100, 100),
        );
        apply_mouse_packet(
            &mut m,
            &RawMouseEvent {
                buttons_up: 0b001,
                ..Default::default()
            },
            (100, 100),
        );
        assert_eq!(m.z, -120);
        assert_eq!(m.wheel_delta, -120);
        assert_eq!(m.buttons, [false, false, true, false, false]);
        m.end_frame();
        assert_eq!(m.wheel_dir, -1);
    }

    #[test]
    fn controller_layout() {
        let r = ControllerReading {
            buttons: pad::A | pad::START | pad::DPAD_UP | pad::DPAD_LEFT,
            left_trigger: 255,
            right_trigger: 0,
            thumb_lx: i16::MIN,
            thumb_ly: i16::MIN,
            thumb_rx: 0,
            thumb_ry: i16::MAX,
        };
        let s = controller_joy_state(&r);
        assert_eq!(s.axes[JoyAxis::X.index()], AXIS_MIN);
        assert_eq!(s.axes[JoyAxis::Y.index()], AXIS_MAX);
        assert_eq!(s.axes[JoyAxis::RX.index()], 0);
        assert_eq!(s.axes[JoyAxis::RY.index()], AXIS_MIN + 1);
        assert_eq!(s.axes[JoyAxis::Z.index()], AXIS_MAX);
        assert_eq!(s.axes[JoyAxis::RZ.index()], 0);
        assert_eq!(s.povs[0], PovDir::UpLeft);
        assert!(s.buttons[0]);
        assert!(s.buttons[7]);
        assert!(!s.buttons[1]);
    }

    #[test]
    fn legacy_reading_respects_reported_layout() {
        let mut ranges = [None; NUM_JOY_AXES];
        ranges[JoyAxis::X.index()] = Some((0, 1023));
        let mut reading = LegacyJoyReading::default();
        reading.axes[JoyAxis::X.index()] = 1023;
        reading.axes[JoyAxis::Y.index()] = 1023;
        reading.povs = [Some(9000), Some(0), None, None];
        reading.buttons[1] = true;
        reading.buttons[5] = true;

        let s = legacy_joy_state(&reading, &ranges, 1, 4);
        assert_eq!(s.axes[JoyAxis::X.index()], AXIS_MAX);
        assert_eq!(s.axes[JoyAxis::Y.index()], 0);
        assert_eq!(s.povs[0], PovDir::Right);
        assert_eq!(s.povs[1], PovDir::Centered);
        assert!(s.buttons[1]);
        assert!(!s.buttons[5]);
    }
}
