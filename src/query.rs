//! Read-only queries over the latest snapshot, plus cursor control.
//!
//! Queries never touch a backend. An index past the end of a device table, key
//! table or button range reads as a neutral value (`false`, `0`, centred).

use tracing::debug;

use crate::keys;
use crate::manager::InputSystem;
use crate::metadata::{JoyAxis, JoyDetails, KeyDetails, MouseAxis, MouseDetails};
use crate::normalize::PovDir;
use crate::snapshot::{MouseState, Snapshot};

/// Which keyboard or mouse a query addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceSel {
    /// Any device: keys are OR-ed across keyboards, mice read the combined mouse.
    Any,
    Num(usize),
}

impl From<usize> for DeviceSel {
    fn from(i: usize) -> Self {
        DeviceSel::Num(i)
    }
}

impl InputSystem {
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn num_keyboards(&self) -> usize {
        self.keyboards.len()
    }

    pub fn num_mice(&self) -> usize {
        self.mice.len()
    }

    pub fn num_joysticks(&self) -> usize {
        self.joysticks.len()
    }

    pub fn key_details(&self, kbd: usize) -> Option<&KeyDetails> {
        self.keyboards.get(kbd).map(|k| &k.details)
    }

    pub fn mouse_details(&self, mse: usize) -> Option<&MouseDetails> {
        self.mice.get(mse).map(|m| &m.details)
    }

    pub fn joy_details(&self, joy: usize) -> Option<&JoyDetails> {
        self.joysticks.get(joy).map(|j| &j.details)
    }

    /// Index of a key name such as `"A"` or `"RIGHTCTRL"` (case-insensitive).
    pub fn key_index(&self, name: &str) -> Option<usize> {
        keys::key_index(name)
    }

    pub fn key_name(&self, index: usize) -> Option<&'static str> {
        keys::key_name(index)
    }

    /// Whether key `index` (see [`key_index`](Self::key_index)) is held.
    pub fn is_key_pressed(&self, kbd: DeviceSel, index: usize) -> bool {
        let Some(code) = keys::key_code(index) else {
            return false;
        };
        match kbd {
            DeviceSel::Any => self.snapshot.keyboards.iter().any(|k| k.is_down(code)),
            DeviceSel::Num(i) => self.snapshot.keyboard(i).is_some_and(|k| k.is_down(code)),
        }
    }

    fn mouse_state(&self, mse: DeviceSel) -> Option<&MouseState> {
        match mse {
            DeviceSel::Any => Some(&self.snapshot.combined_mouse),
            DeviceSel::Num(i) => self.snapshot.mouse(i),
        }
    }

    /// X/Y in window client coordinates, Z as the accumulated wheel position.
    pub fn mouse_axis_value(&self, mse: DeviceSel, axis: MouseAxis) -> i32 {
        self.mouse_state(mse).map_or(0, |m| match axis {
            MouseAxis::X => m.x,
            MouseAxis::Y => m.y,
            MouseAxis::Z => m.z,
        })
    }

    /// Direction the wheel moved during the last frame: `-1`, `0` or `1`.
    pub fn mouse_wheel_dir(&self, mse: DeviceSel) -> i32 {
        self.mouse_state(mse).map_or(0, |m| m.wheel_dir)
    }

    pub fn is_mouse_but_pressed(&self, mse: DeviceSel, button: usize) -> bool {
        self.mouse_state(mse)
            .and_then(|m| m.buttons.get(button).copied())
            .unwrap_or(false)
    }

    /// Normalized axis value in `AXIS_MIN..=AXIS_MAX`.
    pub fn joy_axis_value(&self, joy: usize, axis: JoyAxis) -> i32 {
        self.snapshot.joystick(joy).map_or(0, |j| j.axes[axis.index()])
    }

    pub fn joy_pov(&self, joy: usize, pov: usize) -> PovDir {
        self.snapshot
            .joystick(joy)
            .and_then(|j| j.povs.get(pov).copied())
            .unwrap_or_default()
    }

    /// Whether hat `pov` points toward `dir`; cardinals include the
    /// neighbouring diagonals.
    pub fn is_joy_pov_in_dir(&self, joy: usize, pov: usize, dir: PovDir) -> bool {
        self.snapshot
            .joystick(joy)
            .and_then(|j| j.povs.get(pov))
            .is_some_and(|p| p.contains(dir))
    }

    pub fn is_joy_but_pressed(&self, joy: usize, button: usize) -> bool {
        self.snapshot
            .joystick(joy)
            .and_then(|j| j.buttons.get(button).copied())
            .unwrap_or(false)
    }

    /// Confine the cursor to the window. In raw mode every mouse is also
    /// recentred so relative motion starts from the middle.
    pub fn grab_mouse(&mut self) {
        if self.mouse_grabbed {
            return;
        }
        self.mouse_grabbed = true;
        self.window.clip_cursor(true);
        if self.raw_mode {
            let (w, h) = self.window.client_size();
            let (cx, cy) = ((w / 2) as i32, (h / 2) as i32);
            for m in self.snapshot.mice.iter_mut().chain(Some(&mut self.snapshot.combined_mouse)) {
                m.x = cx;
                m.y = cy;
            }
        }
        self.window.set_cursor_visible(!self.raw_mode);
        debug!("mouse grabbed");
    }

    pub fn ungrab_mouse(&mut self) {
        if !self.mouse_grabbed {
            return;
        }
        self.mouse_grabbed = false;
        self.window.clip_cursor(false);
        self.window.set_cursor_visible(true);
        debug!("mouse released");
    }

    pub fn is_mouse_grabbed(&self) -> bool {
        self.mouse_grabbed
    }

    /// Show or hide the cursor. Raw mode tracks mice independently of the system
    /// cursor, so the cursor stays hidden there.
    pub fn set_mouse_visibility(&mut self, visible: bool) {
        self.window.set_cursor_visible(visible && !self.raw_mode);
    }

    /// Whether the system cursor sits in the middle half of the window, used by
    /// configuration screens before they capture a mouse axis.
    pub fn config_mouse_centered(&self) -> bool {
        let (w, h) = self.window.client_size();
        let Some((x, y)) = self.window.cursor_pos() else {
            return false;
        };
        let (w, h) = (w as i32, h as i32);
        x >= w / 4 && x <= w * 3 / 4 && y >= h / 4 && y <= h * 3 / 4
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::backends::virtual_input::{VirtualLegacy, VirtualRawInput};
    use crate::backends::BackendSet;
    use crate::config::InputConfig;
    use crate::host::HeadlessWindow;

    #[test]
    fn out_of_range_reads_are_neutral() {
        let sys = InputSystem::new(
            InputConfig::default(),
            HeadlessWindow::new(100, 100),
            BackendSet::new().with_legacy(VirtualLegacy::new()),
        );
        assert!(!sys.is_key_pressed(DeviceSel::Num(5), 0));
        assert!(!sys.is_key_pressed(DeviceSel::Any, 10_000));
        assert_eq!(sys.mouse_axis_value(DeviceSel::Num(3), MouseAxis::X), 0);
        assert!(!sys.is_mouse_but_pressed(DeviceSel::Any, 9));
        assert_eq!(sys.joy_axis_value(0, JoyAxis::X), 0);
        assert_eq!(sys.joy_pov(0, 0), PovDir::Centered);
        assert!(!sys.is_joy_pov_in_dir(0, 0, PovDir::Up));
        assert!(!sys.is_joy_but_pressed(2, 0));
        assert!(sys.joy_details(0).is_none());
    }

    #[test]
    fn key_names_round_trip_through_the_facade() {
        let sys = InputSystem::new(InputConfig::default(), HeadlessWindow::new(10, 10), BackendSet::new());
        let i = sys.key_index("keypadenter").unwrap();
        assert_eq!(sys.key_name(i), Some("KEYPADENTER"));
        assert_eq!(sys.key_index("NOPE"), None);
    }

    #[test]
    fn grab_recentres_raw_mice_and_hides_cursor() {
        let raw = VirtualRawInput::new();
        let mouse = raw.add_mouse("m");
        let window = Rc::new(RefCell::new(HeadlessWindow::new(200, 100)));
        let cfg = InputConfig {
            raw_input: true,
            ..Default::default()
        };
        let mut sys = InputSystem::new(cfg, window.clone(), BackendSet::new().with_raw(raw.clone()));
        sys.activate();
        raw.move_mouse(mouse, 7, 3);
        sys.poll().unwrap();

        sys.grab_mouse();
        assert!(window.borrow().clipped);
        assert!(!window.borrow().cursor_visible);
        assert_eq!(sys.mouse_axis_value(DeviceSel::Num(0), MouseAxis::X), 100);
        assert_eq!(sys.mouse_axis_value(DeviceSel::Any, MouseAxis::Y), 50);

        sys.set_mouse_visibility(true);
        assert!(!window.borrow().cursor_visible);

        sys.ungrab_mouse();
        assert!(!window.borrow().clipped);
        assert!(window.borrow().cursor_visible);
    }

    #[test]
    fn centred_cursor_detection() {
        let window = Rc::new(RefCell::new(HeadlessWindow::new(400, 200)));
        let sys = InputSystem::new(InputConfig::default(), window.clone(), BackendSet::new());
        assert!(!sys.config_mouse_centered());
        window.borrow_mut().cursor = Some((200, 100));
        assert!(sys.config_mouse_centered());
        window.borrow_mut().cursor = Some((20, 100));
        assert!(!sys.config_mouse_centered());
    }
}
