//! Fallback legacy backend: winmm joysticks plus the system keyboard and mouse.
//! Used when DirectInput 8 cannot be created.
//!
//! winmm has no notion of exclusive access, so claims are bookkeeping only: a
//! device delivers data while claimed and reports `InputLost` otherwise. It also
//! has no force-feedback API; effect calls use the trait defaults.
//!
//! Axis mapping from the winmm `X, Y, Z, R, U, V` registers:
//! `X → X`, `Y → Y`, `Z → Z`, `R → RZ`, `U → RX`, `V → RY`.

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::debug;
use windows_sys::Win32::Media::Multimedia::{
    joyGetDevCapsW, joyGetNumDevs, joyGetPosEx, JOYCAPSW, JOYINFOEX,
};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;

use crate::device::{
    LegacyBackend, LegacyDevice, LegacyJoyId, LegacyJoyInfo, LegacyJoyReading, LegacyMouseReading,
};
use crate::error::BackendError;
use crate::keys::KEY_MAP;
use crate::metadata::{JoyAxis, NUM_JOY_AXES, NUM_JOY_BUTTONS, NUM_MOUSE_BUTTONS};
use crate::snapshot::KeyboardState;

// Local constants (avoid relying on module exports that vary by windows-sys version)
const JOYERR_NOERROR: u32 = 0;
const JOYERR_UNPLUGGED: u32 = 167;
const JOY_RETURNALL: u32 = 0x0000_00FF;
const JOY_RETURNPOVCTS: u32 = 0x0000_0200;
const JOYCAPS_HASZ: u32 = 0x0001;
const JOYCAPS_HASR: u32 = 0x0002;
const JOYCAPS_HASU: u32 = 0x0004;
const JOYCAPS_HASV: u32 = 0x0008;
const JOYCAPS_HASPOV: u32 = 0x0010;
/// winmm reports this POV value when the hat is centred.
const JOY_POVCENTERED: u32 = 0xFFFF;

/// Left, right, middle, X1, X2.
const MOUSE_VKS: [i32; NUM_MOUSE_BUTTONS] = [0x01, 0x02, 0x04, 0x05, 0x06];

/// `WHEEL_DELTA` units accumulated from `WM_MOUSEWHEEL`.
#[derive(Clone, Default)]
pub struct WheelFeed {
    pending: Rc<Cell<i32>>,
}

impl WheelFeed {
    /// Forward a `WM_MOUSEWHEEL` `wparam`.
    pub fn handle_wm_mousewheel(&self, wparam: usize) {
        let delta = ((wparam >> 16) & 0xFFFF) as u16 as i16;
        self.pending.set(self.pending.get() + delta as i32);
    }

    fn take(&self) -> i32 {
        self.pending.replace(0)
    }
}

/// winmm joysticks, `GetAsyncKeyState` keyboard and mouse buttons.
#[derive(Default)]
pub struct WinLegacy {
    acquired: HashSet<LegacyDevice>,
    opened: HashSet<LegacyJoyId>,
    wheel: WheelFeed,
    /// `(vid, pid)` → interface path, supplied by the HID catalog.
    paths: HashMap<(u16, u16), String>,
}

impl WinLegacy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interface paths used for controller signature matching.
    pub fn with_paths(mut self, paths: HashMap<(u16, u16), String>) -> Self {
        self.paths = paths;
        self
    }

    /// Handle for the host's window procedure.
    pub fn wheel_feed(&self) -> WheelFeed {
        self.wheel.clone()
    }

    fn require(&self, device: LegacyDevice) -> Result<(), BackendError> {
        if self.acquired.contains(&device) {
            Ok(())
        } else {
            Err(BackendError::InputLost)
        }
    }
}

fn map_joy_status(code: u32) -> Result<(), BackendError> {
    match code {
        JOYERR_NOERROR => Ok(()),
        JOYERR_UNPLUGGED => Err(BackendError::NotConnected),
        other => Err(BackendError::Os(other)),
    }
}

fn read_pos(index: u32) -> Result<JOYINFOEX, BackendError> {
    // FFI struct: must be manually zeroed
    let mut info: JOYINFOEX = unsafe { std::mem::zeroed() };
    info.dwSize = std::mem::size_of::<JOYINFOEX>() as u32;
    info.dwFlags = JOY_RETURNALL | JOY_RETURNPOVCTS;
    map_joy_status(unsafe { joyGetPosEx(index, &mut info) })?;
    Ok(info)
}

fn read_caps(index: u32) -> Result<JOYCAPSW, BackendError> {
    let mut caps: JOYCAPSW = unsafe { std::mem::zeroed() };
    map_joy_status(unsafe {
        joyGetDevCapsW(index as usize, &mut caps, std::mem::size_of::<JOYCAPSW>() as u32)
    })?;
    Ok(caps)
}

pub(super) fn wide_to_string(wide: &[u16]) -> String {
    let end = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end]).trim().to_string()
}

/// Native `(min, max)` of every canonical axis the device reports.
fn axis_ranges(caps: &JOYCAPSW) -> [Option<(i64, i64)>; NUM_JOY_AXES] {
    let range = |min: u32, max: u32| Some((min as i64, max as i64));
    let has = |flag: u32| caps.wCaps & flag != 0;

    let mut ranges = [None; NUM_JOY_AXES];
    ranges[JoyAxis::X.index()] = range(caps.wXmin, caps.wXmax);
    ranges[JoyAxis::Y.index()] = range(caps.wYmin, caps.wYmax);
    if has(JOYCAPS_HASZ) {
        ranges[JoyAxis::Z.index()] = range(caps.wZmin, caps.wZmax);
    }
    if has(JOYCAPS_HASR) {
        ranges[JoyAxis::RZ.index()] = range(caps.wRmin, caps.wRmax);
    }
    if has(JOYCAPS_HASU) {
        ranges[JoyAxis::RX.index()] = range(caps.wUmin, caps.wUmax);
    }
    if has(JOYCAPS_HASV) {
        ranges[JoyAxis::RY.index()] = range(caps.wVmin, caps.wVmax);
    }
    ranges
}

impl LegacyBackend for WinLegacy {
    fn name(&self) -> &'static str {
        "WinMM"
    }

    fn joysticks(&mut self) -> Vec<LegacyJoyInfo> {
        let count = unsafe { joyGetNumDevs() };
        let mut out = Vec::new();
        for index in 0..count {
            // Driver slots exist whether or not anything is plugged in.
            if read_pos(index).is_err() {
                continue;
            }
            let Ok(caps) = read_caps(index) else {
                continue;
            };
            let (vid, pid) = (caps.wMid, caps.wPid);
            let name = wide_to_string(&caps.szPname);
            debug!(index, %name, vid, pid, "winmm joystick found");
            out.push(LegacyJoyInfo {
                id: LegacyJoyId(index as u64),
                name,
                vendor_id: vid,
                product_id: pid,
                path: self.paths.get(&(vid, pid)).cloned(),
                axis_ranges: axis_ranges(&caps),
                num_povs: usize::from(caps.wCaps & JOYCAPS_HASPOV != 0),
                num_buttons: (caps.wNumButtons as usize).min(NUM_JOY_BUTTONS),
                ff_axes: [false; NUM_JOY_AXES],
            });
        }
        out
    }

    fn open_joystick(&mut self, id: LegacyJoyId) -> Result<(), BackendError> {
        read_pos(id.0 as u32)?;
        self.opened.insert(id);
        Ok(())
    }

    fn close_joystick(&mut self, id: LegacyJoyId) {
        self.opened.remove(&id);
        self.acquired.remove(&LegacyDevice::Joystick(id));
    }

    fn acquire(&mut self, device: LegacyDevice) -> Result<(), BackendError> {
        if let LegacyDevice::Joystick(id) = device {
            if !self.opened.contains(&id) {
                return Err(BackendError::NotConnected);
            }
        }
        self.acquired.insert(device);
        Ok(())
    }

    fn unacquire(&mut self, device: LegacyDevice) {
        self.acquired.remove(&device);
    }

    fn read_keyboard(&mut self, keys: &mut KeyboardState) -> Result<(), BackendError> {
        self.require(LegacyDevice::Keyboard)?;
        *keys = KeyboardState::default();
        for def in KEY_MAP {
            if let Some(vk) = def.vk {
                let state = unsafe { GetAsyncKeyState(vk as i32) } as u16;
                keys.keys[def.code as usize] = state & 0x8000 != 0;
            }
        }
        Ok(())
    }

    fn read_mouse(&mut self) -> Result<LegacyMouseReading, BackendError> {
        self.require(LegacyDevice::Mouse)?;
        let mut reading = LegacyMouseReading {
            dz: self.wheel.take(),
            ..Default::default()
        };
        for (b, &vk) in MOUSE_VKS.iter().enumerate() {
            reading.buttons[b] = unsafe { GetAsyncKeyState(vk) } as u16 & 0x8000 != 0;
        }
        Ok(reading)
    }

    fn read_joystick(&mut self, id: LegacyJoyId) -> Result<LegacyJoyReading, BackendError> {
        self.require(LegacyDevice::Joystick(id))?;
        let pos = read_pos(id.0 as u32)?;

        let mut reading = LegacyJoyReading::default();
        for (axis, value) in [
            (JoyAxis::X, pos.dwXpos),
            (JoyAxis::Y, pos.dwYpos),
            (JoyAxis::Z, pos.dwZpos),
            (JoyAxis::RZ, pos.dwRpos),
            (JoyAxis::RX, pos.dwUpos),
            (JoyAxis::RY, pos.dwVpos),
        ] {
            reading.axes[axis.index()] = value as i64;
        }
        reading.povs[0] = (pos.dwPOV != JOY_POVCENTERED).then_some(pos.dwPOV);
        for b in 0..32 {
            reading.buttons[b] = pos.dwButtons & (1 << b) != 0;
        }
        Ok(reading)
    }
}
