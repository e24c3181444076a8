//! Scriptable in-memory backends.
//!
//! Each virtual backend is a cheap handle over shared state: clone it, hand one
//! clone to a [`BackendSet`](super::BackendSet), and keep the other to inject input
//! or inspect what the input system did (claims, effects, vibration).
//!
//! ```
//! use padmux::backends::virtual_input::VirtualRawInput;
//! use padmux::backends::BackendSet;
//!
//! let raw = VirtualRawInput::new();
//! let mouse = raw.add_mouse("\\\\?\\HID#VID_046D&PID_C077");
//! let set = BackendSet::new().with_raw(raw.clone());
//! raw.move_mouse(mouse, 5, -3);
//! # drop(set);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::device::{
    ControllerBackend, ControllerCaps, ControllerReading, EffectHandle, EffectParams,
    LegacyBackend, LegacyDevice, LegacyJoyId, LegacyJoyInfo, LegacyJoyReading,
    LegacyMouseReading, RawInputBackend,
};
use crate::error::BackendError;
use crate::event::{RawDeviceInfo, RawEvent, RawHandle, RawKeyEvent, RawMouseEvent};
use crate::metadata::{JoyAxis, NUM_JOY_AXES};
use crate::snapshot::KeyboardState;

// ---------------------------------------------------------------------------
// Raw stream
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RawInner {
    keyboards: Vec<RawDeviceInfo>,
    mice: Vec<RawDeviceInfo>,
    queue: VecDeque<RawEvent>,
    registered: bool,
    failing: bool,
    next_handle: u64,
}

/// Virtual raw event stream.
#[derive(Clone, Default)]
pub struct VirtualRawInput {
    inner: Rc<RefCell<RawInner>>,
}

impl VirtualRawInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&self) -> RawHandle {
        let mut s = self.inner.borrow_mut();
        s.next_handle += 1;
        RawHandle(0x1000 + s.next_handle)
    }

    pub fn add_keyboard(&self, path: &str) -> RawHandle {
        let handle = self.alloc();
        self.inner.borrow_mut().keyboards.push(RawDeviceInfo {
            handle,
            path: path.to_string(),
            is_absolute: false,
        });
        handle
    }

    pub fn add_mouse(&self, path: &str) -> RawHandle {
        self.add_pointer(path, false)
    }

    /// Pointer reporting absolute coordinates (tablet, lightgun).
    pub fn add_pointer(&self, path: &str, is_absolute: bool) -> RawHandle {
        let handle = self.alloc();
        self.inner.borrow_mut().mice.push(RawDeviceInfo {
            handle,
            path: path.to_string(),
            is_absolute,
        });
        handle
    }

    pub fn push(&self, event: RawEvent) {
        self.inner.borrow_mut().queue.push_back(event);
    }

    pub fn key(&self, device: RawHandle, code: u8, pressed: bool) {
        self.push(RawEvent::Key(RawKeyEvent {
            device,
            code,
            pressed,
        }));
    }

    pub fn move_mouse(&self, device: RawHandle, dx: i32, dy: i32) {
        self.push(RawEvent::Mouse(RawMouseEvent {
            device,
            dx,
            dy,
            ..Default::default()
        }));
    }

    /// Absolute position in `0..=65535` per axis.
    pub fn place_pointer(&self, device: RawHandle, x: i32, y: i32) {
        self.push(RawEvent::Mouse(RawMouseEvent {
            device,
            dx: x,
            dy: y,
            absolute: true,
            ..Default::default()
        }));
    }

    pub fn scroll(&self, device: RawHandle, wheel: i16) {
        self.push(RawEvent::Mouse(RawMouseEvent {
            device,
            wheel,
            ..Default::default()
        }));
    }

    pub fn mouse_button(&self, device: RawHandle, button: u8, down: bool) {
        let bit = 1u8 << button;
        self.push(RawEvent::Mouse(RawMouseEvent {
            device,
            buttons_down: if down { bit } else { 0 },
            buttons_up: if down { 0 } else { bit },
            ..Default::default()
        }));
    }

    pub fn is_registered(&self) -> bool {
        self.inner.borrow().registered
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Make every subsequent drain fail.
    pub fn set_failing(&self, failing: bool) {
        self.inner.borrow_mut().failing = failing;
    }
}

impl RawInputBackend for VirtualRawInput {
    fn name(&self) -> &'static str {
        "VirtualRaw"
    }

    fn keyboards(&mut self) -> Vec<RawDeviceInfo> {
        self.inner.borrow().keyboards.clone()
    }

    fn mice(&mut self) -> Vec<RawDeviceInfo> {
        self.inner.borrow().mice.clone()
    }

    fn register(&mut self) -> Result<(), BackendError> {
        self.inner.borrow_mut().registered = true;
        Ok(())
    }

    fn unregister(&mut self) {
        self.inner.borrow_mut().registered = false;
    }

    fn drain(&mut self, out: &mut Vec<RawEvent>) -> Result<(), BackendError> {
        let mut s = self.inner.borrow_mut();
        if s.failing {
            return Err(BackendError::Os(0x1f));
        }
        // Packets only arrive while registered.
        if !s.registered {
            s.queue.clear();
            return Ok(());
        }
        out.extend(s.queue.drain(..));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Legacy polling
// ---------------------------------------------------------------------------

#[derive(Default)]
struct LegacyInner {
    keyboard: KeyboardState,
    mouse: LegacyMouseReading,
    joysticks: Vec<(LegacyJoyInfo, LegacyJoyReading)>,
    opened: HashSet<LegacyJoyId>,
    acquired: HashSet<LegacyDevice>,
    denied: HashSet<LegacyDevice>,
    failing: bool,
    effects: HashMap<EffectHandle, (LegacyJoyId, EffectParams)>,
    effects_created: usize,
    next_effect: u64,
}

impl LegacyInner {
    fn joy_mut(&mut self, id: LegacyJoyId) -> Option<&mut (LegacyJoyInfo, LegacyJoyReading)> {
        self.joysticks.iter_mut().find(|(i, _)| i.id == id)
    }

    fn check(&self, device: LegacyDevice) -> Result<(), BackendError> {
        if self.failing {
            return Err(BackendError::Os(0x8007_001e));
        }
        if !self.acquired.contains(&device) {
            return Err(BackendError::InputLost);
        }
        Ok(())
    }
}

/// Virtual legacy polling backend.
///
/// Reads only succeed for claimed devices, like the real thing.
#[derive(Clone, Default)]
pub struct VirtualLegacy {
    inner: Rc<RefCell<LegacyInner>>,
}

impl VirtualLegacy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typical gamepad as seen through a legacy driver: 16-bit unsigned sticks,
    /// triggers folded onto a shared Z axis, one hat, ten buttons.
    pub fn gamepad_info(id: u64, name: &str, vendor_id: u16, product_id: u16) -> LegacyJoyInfo {
        let mut axis_ranges = [None; NUM_JOY_AXES];
        for axis in [JoyAxis::X, JoyAxis::Y, JoyAxis::Z, JoyAxis::RX, JoyAxis::RY] {
            axis_ranges[axis.index()] = Some((0, 65535));
        }
        LegacyJoyInfo {
            id: LegacyJoyId(id),
            name: name.to_string(),
            vendor_id,
            product_id,
            path: None,
            axis_ranges,
            num_povs: 1,
            num_buttons: 10,
            ff_axes: [false; NUM_JOY_AXES],
        }
    }

    pub fn add_joystick(&self, info: LegacyJoyInfo) -> LegacyJoyId {
        let id = info.id;
        let mut reading = LegacyJoyReading::default();
        // Rest at the centre of each native range.
        for (i, range) in info.axis_ranges.iter().enumerate() {
            if let Some((min, max)) = range {
                reading.axes[i] = min + (max - min + 1) / 2;
            }
        }
        self.inner.borrow_mut().joysticks.push((info, reading));
        id
    }

    pub fn set_key(&self, code: u8, down: bool) {
        self.inner.borrow_mut().keyboard.keys[code as usize] = down;
    }

    pub fn scroll(&self, dz: i32) {
        self.inner.borrow_mut().mouse.dz += dz;
    }

    pub fn set_mouse_button(&self, button: usize, down: bool) {
        self.inner.borrow_mut().mouse.buttons[button] = down;
    }

    pub fn set_axis(&self, id: LegacyJoyId, axis: JoyAxis, raw: i64) {
        if let Some((_, r)) = self.inner.borrow_mut().joy_mut(id) {
            r.axes[axis.index()] = raw;
        }
    }

    pub fn set_pov(&self, id: LegacyJoyId, pov: usize, angle: Option<u32>) {
        if let Some((_, r)) = self.inner.borrow_mut().joy_mut(id) {
            r.povs[pov] = angle;
        }
    }

    pub fn set_button(&self, id: LegacyJoyId, button: usize, down: bool) {
        if let Some((_, r)) = self.inner.borrow_mut().joy_mut(id) {
            r.buttons[button] = down;
        }
    }

    /// Refuse future claims of `device` (another process holds it exclusively).
    pub fn deny(&self, device: LegacyDevice, denied: bool) {
        let mut s = self.inner.borrow_mut();
        if denied {
            s.denied.insert(device);
        } else {
            s.denied.remove(&device);
        }
    }

    /// Drop the claim on `device`, as a focus loss would.
    pub fn lose(&self, device: LegacyDevice) {
        self.inner.borrow_mut().acquired.remove(&device);
    }

    pub fn is_acquired(&self, device: LegacyDevice) -> bool {
        self.inner.borrow().acquired.contains(&device)
    }

    pub fn is_open(&self, id: LegacyJoyId) -> bool {
        self.inner.borrow().opened.contains(&id)
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.borrow_mut().failing = failing;
    }

    /// Live effects on `id`.
    pub fn effects(&self, id: LegacyJoyId) -> Vec<EffectParams> {
        let s = self.inner.borrow();
        let mut v: Vec<_> = s
            .effects
            .iter()
            .filter(|(_, (j, _))| *j == id)
            .map(|(h, (_, p))| (h.0, *p))
            .collect();
        v.sort_by_key(|(h, _)| *h);
        v.into_iter().map(|(_, p)| p).collect()
    }

    /// Effects created over the backend's lifetime.
    pub fn effects_created(&self) -> usize {
        self.inner.borrow().effects_created
    }
}

impl LegacyBackend for VirtualLegacy {
    fn name(&self) -> &'static str {
        "VirtualLegacy"
    }

    fn joysticks(&mut self) -> Vec<LegacyJoyInfo> {
        self.inner
            .borrow()
            .joysticks
            .iter()
            .map(|(i, _)| i.clone())
            .collect()
    }

    fn open_joystick(&mut self, id: LegacyJoyId) -> Result<(), BackendError> {
        let mut s = self.inner.borrow_mut();
        if s.joy_mut(id).is_none() {
            return Err(BackendError::NotConnected);
        }
        s.opened.insert(id);
        Ok(())
    }

    fn close_joystick(&mut self, id: LegacyJoyId) {
        let mut s = self.inner.borrow_mut();
        s.opened.remove(&id);
        s.acquired.remove(&LegacyDevice::Joystick(id));
    }

    fn acquire(&mut self, device: LegacyDevice) -> Result<(), BackendError> {
        let mut s = self.inner.borrow_mut();
        if s.denied.contains(&device) {
            return Err(BackendError::Denied);
        }
        if let LegacyDevice::Joystick(id) = device {
            if !s.opened.contains(&id) {
                return Err(BackendError::NotConnected);
            }
        }
        s.acquired.insert(device);
        Ok(())
    }

    fn unacquire(&mut self, device: LegacyDevice) {
        self.inner.borrow_mut().acquired.remove(&device);
    }

    fn read_keyboard(&mut self, keys: &mut KeyboardState) -> Result<(), BackendError> {
        let s = self.inner.borrow();
        s.check(LegacyDevice::Keyboard)?;
        keys.keys = s.keyboard.keys;
        Ok(())
    }

    fn read_mouse(&mut self) -> Result<LegacyMouseReading, BackendError> {
        let mut s = self.inner.borrow_mut();
        s.check(LegacyDevice::Mouse)?;
        let reading = s.mouse;
        s.mouse.dz = 0;
        Ok(reading)
    }

    fn read_joystick(&mut self, id: LegacyJoyId) -> Result<LegacyJoyReading, BackendError> {
        let mut s = self.inner.borrow_mut();
        s.check(LegacyDevice::Joystick(id))?;
        s.joy_mut(id)
            .map(|(_, r)| r.clone())
            .ok_or(BackendError::NotConnected)
    }

    fn create_effect(
        &mut self,
        id: LegacyJoyId,
        params: &EffectParams,
    ) -> Result<EffectHandle, BackendError> {
        let mut s = self.inner.borrow_mut();
        let supported = s
            .joy_mut(id)
            .map(|(i, _)| i.ff_axes[params.axis.index()])
            .ok_or(BackendError::NotConnected)?;
        if !supported {
            return Err(BackendError::Unsupported);
        }
        s.next_effect += 1;
        s.effects_created += 1;
        let handle = EffectHandle(s.next_effect);
        s.effects.insert(handle, (id, *params));
        Ok(handle)
    }

    fn update_effect(
        &mut self,
        effect: EffectHandle,
        params: &EffectParams,
    ) -> Result<(), BackendError> {
        match self.inner.borrow_mut().effects.get_mut(&effect) {
            Some((_, p)) => {
                *p = *params;
                Ok(())
            }
            None => Err(BackendError::NotConnected),
        }
    }

    fn release_effect(&mut self, effect: EffectHandle) {
        self.inner.borrow_mut().effects.remove(&effect);
    }
}

// ---------------------------------------------------------------------------
// Controller slots
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ControllerInner {
    slots: [Option<(ControllerCaps, ControllerReading)>; 4],
    vibration: [(u16, u16); 4],
    failing: bool,
}

/// Virtual four-slot controller backend.
#[derive(Clone, Default)]
pub struct VirtualController {
    inner: Rc<RefCell<ControllerInner>>,
}

impl VirtualController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, slot: u32, caps: ControllerCaps) {
        self.inner.borrow_mut().slots[slot as usize] = Some((caps, ControllerReading::default()));
    }

    pub fn disconnect(&self, slot: u32) {
        self.inner.borrow_mut().slots[slot as usize] = None;
    }

    /// Replace the state reported for `slot`.
    pub fn set_state(&self, slot: u32, reading: ControllerReading) {
        if let Some((_, r)) = self.inner.borrow_mut().slots[slot as usize].as_mut() {
            *r = reading;
        }
    }

    /// Last `(left, right)` motor speeds sent to `slot`.
    pub fn vibration(&self, slot: u32) -> (u16, u16) {
        self.inner.borrow().vibration[slot as usize]
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.borrow_mut().failing = failing;
    }
}

impl ControllerBackend for VirtualController {
    fn name(&self) -> &'static str {
        "VirtualXInput"
    }

    fn capabilities(&mut self, slot: u32) -> Result<ControllerCaps, BackendError> {
        self.inner
            .borrow()
            .slots
            .get(slot as usize)
            .and_then(|s| s.as_ref())
            .map(|(c, _)| *c)
            .ok_or(BackendError::NotConnected)
    }

    fn read_state(&mut self, slot: u32) -> Result<ControllerReading, BackendError> {
        let s = self.inner.borrow();
        if s.failing {
            return Err(BackendError::Os(0x48f));
        }
        s.slots
            .get(slot as usize)
            .and_then(|s| s.as_ref())
            .map(|(_, r)| *r)
            .ok_or(BackendError::NotConnected)
    }

    fn set_vibration(&mut self, slot: u32, left: u16, right: u16) -> Result<(), BackendError> {
        let mut s = self.inner.borrow_mut();
        match s.slots.get(slot as usize) {
            Some(Some((caps, _))) if caps.vibration => {
                s.vibration[slot as usize] = (left, right);
                Ok(())
            }
            Some(Some(_)) => Err(BackendError::Unsupported),
            _ => Err(BackendError::NotConnected),
        }
    }
}
