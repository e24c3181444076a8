//! DirectInput 8 legacy backend: game controllers plus the system keyboard and mouse.
//!
//! Every device reads through a data format built here instead of the `c_dfDI*`
//! globals exported by `dinput8.lib`:
//! - the keyboard fills 256 bytes indexed by DIK code, which is also the crate's
//!   key code;
//! - the mouse fills [`MouseData`];
//! - joysticks fill [`JoyData`]: eight axes in canonical order (`X, Y, Z, RX, RY,
//!   RZ, S1, S2`), four POVs and 128 buttons.
//!
//! Joysticks with force-feedback actuators are opened exclusive/foreground because
//! DirectInput only plays effects on exclusively acquired devices. Everything else
//! is non-exclusive.

use core::ffi::c_void;
use std::collections::HashMap;
use std::mem::{offset_of, size_of};

use tracing::{debug, info, warn};
use windows::core::{IUnknown, Interface, GUID, PCWSTR};
use windows::Win32::Devices::HumanInterfaceDevice::{
    DirectInput8Create, IDirectInput8W, IDirectInputDevice8W, IDirectInputEffect, DICONDITION,
    DICONSTANTFORCE, DIDATAFORMAT, DIDEVCAPS, DIDEVICEINSTANCEW, DIDEVICEOBJECTINSTANCEW, DIEFFECT,
    DIOBJECTDATAFORMAT, DIPERIODIC, DIPROPDWORD, DIPROPGUIDANDPATH, DIPROPHEADER, DIPROPRANGE,
};
use windows::Win32::Foundation::{BOOL, HINSTANCE, HWND};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;

use super::legacy::wide_to_string;
use crate::device::{
    EffectHandle, EffectKind, EffectParams, LegacyBackend, LegacyDevice, LegacyJoyId,
    LegacyJoyInfo, LegacyJoyReading, LegacyMouseReading,
};
use crate::error::BackendError;
use crate::force_feedback::LEGACY_FF_MAX;
use crate::metadata::{JoyAxis, NUM_JOY_AXES, NUM_JOY_BUTTONS, NUM_JOY_POVS, NUM_KEYS, NUM_MOUSE_BUTTONS};
use crate::snapshot::KeyboardState;

// Local constants (avoid relying on module exports that vary by windows version)
const DIRECTINPUT_VERSION: u32 = 0x0800;

const DI8DEVCLASS_GAMECTRL: u32 = 4;
const DIEDFL_ATTACHEDONLY: u32 = 0x0000_0001;
const DIENUM_CONTINUE: BOOL = BOOL(1);
const DIDC_FORCEFEEDBACK: u32 = 0x0000_0100;

const DIDFT_AXIS: u32 = 0x0000_0003;
const DIDFT_BUTTON: u32 = 0x0000_000C;
const DIDFT_POV: u32 = 0x0000_0010;
const DIDFT_ANYINSTANCE: u32 = 0x00FF_FF00;
const DIDFT_OPTIONAL: u32 = 0x8000_0000;
const DIDF_ABSAXIS: u32 = 0x0000_0001;
const DIDF_RELAXIS: u32 = 0x0000_0002;
const DIDOI_FFACTUATOR: u32 = 0x0000_0001;
const DIDOI_ASPECTPOSITION: u32 = 0x0000_0100;

const DISCL_EXCLUSIVE: u32 = 0x0000_0001;
const DISCL_NONEXCLUSIVE: u32 = 0x0000_0002;
const DISCL_FOREGROUND: u32 = 0x0000_0004;
const DISCL_BACKGROUND: u32 = 0x0000_0008;

const DIPH_DEVICE: u32 = 0;
const DIPH_BYOFFSET: u32 = 1;
const DIPROP_RANGE: usize = 4;
const DIPROP_AUTOCENTER: usize = 9;
const DIPROP_GUIDANDPATH: usize = 12;
const DIPROPAUTOCENTER_OFF: u32 = 0;

const DIEFF_OBJECTOFFSETS: u32 = 0x0000_0002;
const DIEFF_CARTESIAN: u32 = 0x0000_0010;
const DIEP_TYPESPECIFICPARAMS: u32 = 0x0000_0100;
const DIEB_NOTRIGGER: u32 = 0xFFFF_FFFF;
const INFINITE: u32 = 0xFFFF_FFFF;
/// Rumble period, in microseconds.
const SINE_PERIOD_US: u32 = 50_000;

const DIERR_NOTACQUIRED: u32 = 0x8007_000C;
const DIERR_INPUTLOST: u32 = 0x8007_001E;
const E_ACCESSDENIED: u32 = 0x8007_0005;
const DIERR_UNPLUGGED: u32 = 0x8004_0209;
const DIERR_DEVICENOTREG: u32 = 0x8004_0154;

const GUID_X_AXIS: GUID = GUID::from_u128(0xa36d02e0_c9f3_11cf_bfc7_444553540000);
const GUID_Y_AXIS: GUID = GUID::from_u128(0xa36d02e1_c9f3_11cf_bfc7_444553540000);
const GUID_Z_AXIS: GUID = GUID::from_u128(0xa36d02e2_c9f3_11cf_bfc7_444553540000);
const GUID_RX_AXIS: GUID = GUID::from_u128(0xa36d02f4_c9f3_11cf_bfc7_444553540000);
const GUID_RY_AXIS: GUID = GUID::from_u128(0xa36d02f5_c9f3_11cf_bfc7_444553540000);
const GUID_RZ_AXIS: GUID = GUID::from_u128(0xa36d02e3_c9f3_11cf_bfc7_444553540000);
const GUID_SLIDER: GUID = GUID::from_u128(0xa36d02e4_c9f3_11cf_bfc7_444553540000);
const GUID_POV: GUID = GUID::from_u128(0xa36d02f2_c9f3_11cf_bfc7_444553540000);
const GUID_KEY: GUID = GUID::from_u128(0x55728220_d33c_11cf_bfc7_444553540000);
const GUID_SYS_MOUSE: GUID = GUID::from_u128(0x6f1d2b60_d5a0_11cf_bfc7_444553540000);
const GUID_SYS_KEYBOARD: GUID = GUID::from_u128(0x6f1d2b61_d5a0_11cf_bfc7_444553540000);
const GUID_CONSTANT_FORCE: GUID = GUID::from_u128(0x13541c20_8e33_11d0_9ad0_00a0c9a06e35);
const GUID_SINE: GUID = GUID::from_u128(0x13541c23_8e33_11d0_9ad0_00a0c9a06e35);
const GUID_SPRING: GUID = GUID::from_u128(0x13541c27_8e33_11d0_9ad0_00a0c9a06e35);

// Data-format entries point at these, so they need a fixed address.
/// Object type per canonical axis index.
static AXIS_GUIDS: [GUID; NUM_JOY_AXES] = [
    GUID_X_AXIS,
    GUID_Y_AXIS,
    GUID_Z_AXIS,
    GUID_RX_AXIS,
    GUID_RY_AXIS,
    GUID_RZ_AXIS,
    GUID_SLIDER,
    GUID_SLIDER,
];
static POV_GUID: GUID = GUID_POV;
static KEY_GUID: GUID = GUID_KEY;

/// Joystick state buffer.
#[repr(C)]
#[derive(Clone, Copy)]
struct JoyData {
    axes: [i32; NUM_JOY_AXES],
    povs: [u32; NUM_JOY_POVS],
    buttons: [u8; NUM_JOY_BUTTONS],
}

impl Default for JoyData {
    fn default() -> Self {
        Self {
            axes: [0; NUM_JOY_AXES],
            povs: [0; NUM_JOY_POVS],
            buttons: [0; NUM_JOY_BUTTONS],
        }
    }
}

/// Mouse state buffer. Axes are relative.
#[repr(C)]
#[derive(Clone, Copy, Default)]
struct MouseData {
    x: i32,
    y: i32,
    z: i32,
    buttons: [u8; 8],
}

/// `DIDFT_MAKEINSTANCE`.
const fn instance(n: u32) -> u32 {
    (n & 0xFFFF) << 8
}

fn axis_offset(axis: JoyAxis) -> u32 {
    (offset_of!(JoyData, axes) + axis.index() * size_of::<i32>()) as u32
}

/// One object of a data format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Slot {
    guid: Option<&'static GUID>,
    offset: u32,
    kind: u32,
    flags: u32,
}

/// A custom data format: which device objects land where in the state buffer.
#[derive(Debug)]
struct Format {
    slots: Vec<Slot>,
    flags: u32,
    size: u32,
}

impl Format {
    fn joystick() -> Self {
        let mut slots = Vec::with_capacity(NUM_JOY_AXES + NUM_JOY_POVS + NUM_JOY_BUTTONS);
        for (i, guid) in AXIS_GUIDS.iter().enumerate() {
            slots.push(Slot {
                guid: Some(guid),
                offset: (offset_of!(JoyData, axes) + i * size_of::<i32>()) as u32,
                kind: DIDFT_AXIS | DIDFT_ANYINSTANCE | DIDFT_OPTIONAL,
                flags: DIDOI_ASPECTPOSITION,
            });
        }
        for i in 0..NUM_JOY_POVS {
            slots.push(Slot {
                guid: Some(&POV_GUID),
                offset: (offset_of!(JoyData, povs) + i * size_of::<u32>()) as u32,
                kind: DIDFT_POV | DIDFT_ANYINSTANCE | DIDFT_OPTIONAL,
                flags: 0,
            });
        }
        for i in 0..NUM_JOY_BUTTONS {
            slots.push(Slot {
                guid: None,
                offset: (offset_of!(JoyData, buttons) + i) as u32,
                kind: DIDFT_BUTTON | DIDFT_ANYINSTANCE | DIDFT_OPTIONAL,
                flags: 0,
            });
        }
        Self {
            slots,
            flags: DIDF_ABSAXIS,
            size: size_of::<JoyData>() as u32,
        }
    }

    fn keyboard() -> Self {
        let slots = (0..NUM_KEYS as u32)
            .map(|code| Slot {
                guid: Some(&KEY_GUID),
                offset: code,
                kind: DIDFT_BUTTON | DIDFT_OPTIONAL | instance(code),
                flags: 0,
            })
            .collect();
        Self {
            slots,
            flags: DIDF_RELAXIS,
            size: NUM_KEYS as u32,
        }
    }

    fn mouse() -> Self {
        let axis = |i: usize, offset: usize, optional: u32| Slot {
            guid: Some(&AXIS_GUIDS[i]),
            offset: offset as u32,
            kind: DIDFT_AXIS | DIDFT_ANYINSTANCE | optional,
            flags: 0,
        };
        let mut slots = vec![
            axis(0, offset_of!(MouseData, x), 0),
            axis(1, offset_of!(MouseData, y), 0),
            axis(2, offset_of!(MouseData, z), DIDFT_OPTIONAL),
        ];
        for i in 0..8 {
            slots.push(Slot {
                guid: None,
                offset: (offset_of!(MouseData, buttons) + i) as u32,
                kind: DIDFT_BUTTON | DIDFT_ANYINSTANCE | DIDFT_OPTIONAL,
                flags: 0,
            });
        }
        Self {
            slots,
            flags: DIDF_RELAXIS,
            size: size_of::<MouseData>() as u32,
        }
    }

    fn apply(&self, device: &IDirectInputDevice8W) -> Result<(), BackendError> {
        let mut objects: Vec<DIOBJECTDATAFORMAT> = self
            .slots
            .iter()
            .map(|s| DIOBJECTDATAFORMAT {
                pguid: s.guid.map_or(std::ptr::null(), |g| g as *const GUID),
                dwOfs: s.offset,
                dwType: s.kind,
                dwFlags: s.flags,
            })
            .collect();
        // FFI struct: must be manually zeroed
        let mut format: DIDATAFORMAT = unsafe { std::mem::zeroed() };
        format.dwSize = size_of::<DIDATAFORMAT>() as u32;
        format.dwObjSize = size_of::<DIOBJECTDATAFORMAT>() as u32;
        format.dwFlags = self.flags;
        format.dwDataSize = self.size;
        format.dwNumObjs = objects.len() as u32;
        format.rgodf = objects.as_mut_ptr();
        // DirectInput copies the format; `objects` only has to outlive the call.
        unsafe { device.SetDataFormat(&format) }.map_err(di_error)
    }
}

fn map_hresult(code: u32) -> BackendError {
    match code {
        DIERR_INPUTLOST | DIERR_NOTACQUIRED => BackendError::InputLost,
        E_ACCESSDENIED => BackendError::Denied,
        DIERR_UNPLUGGED | DIERR_DEVICENOTREG => BackendError::NotConnected,
        other => BackendError::Os(other),
    }
}

fn di_error(e: windows::core::Error) -> BackendError {
    map_hresult(e.code().0 as u32)
}

/// DirectInput encodes a HID product as `pid << 16 | vid` in the product GUID.
fn product_ids(product: &GUID) -> (u16, u16) {
    ((product.data1 & 0xFFFF) as u16, (product.data1 >> 16) as u16)
}

/// A POV reports `0xFFFF` in its low word when centred.
fn decode_pov(raw: u32) -> Option<u32> {
    (raw & 0xFFFF != 0xFFFF).then_some(raw)
}

fn pressed(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// Stable ids for instance GUIDs, in first-seen order.
#[derive(Debug, Default)]
struct InstanceIds {
    seen: Vec<GUID>,
}

impl InstanceIds {
    fn id(&mut self, instance: GUID) -> LegacyJoyId {
        let index = match self.seen.iter().position(|g| *g == instance) {
            Some(i) => i,
            None => {
                self.seen.push(instance);
                self.seen.len() - 1
            }
        };
        LegacyJoyId(index as u64)
    }

    fn instance(&self, id: LegacyJoyId) -> Option<GUID> {
        self.seen.get(id.0 as usize).copied()
    }
}

unsafe extern "system" fn collect_instance(
    instance: *mut DIDEVICEINSTANCEW,
    context: *mut c_void,
) -> BOOL {
    let found = &mut *(context as *mut Vec<DIDEVICEINSTANCEW>);
    if let Some(inst) = instance.as_ref() {
        found.push(*inst);
    }
    DIENUM_CONTINUE
}

fn read_state<T>(device: &IDirectInputDevice8W, out: &mut T) -> Result<(), BackendError> {
    unsafe { device.GetDeviceState(size_of::<T>() as u32, (out as *mut T).cast()) }.map_err(di_error)
}

fn prop_header<T>(obj: u32, how: u32) -> DIPROPHEADER {
    DIPROPHEADER {
        dwSize: size_of::<T>() as u32,
        dwHeaderSize: size_of::<DIPROPHEADER>() as u32,
        dwObj: obj,
        dwHow: how,
    }
}

/// Type-specific block of an effect.
enum EffectBody {
    Constant(DICONSTANTFORCE),
    Condition(DICONDITION),
    Periodic(DIPERIODIC),
}

impl EffectBody {
    fn new(params: &EffectParams) -> Self {
        let m = params.magnitude.clamp(-LEGACY_FF_MAX, LEGACY_FF_MAX);
        match params.kind {
            EffectKind::ConstantForce => Self::Constant(DICONSTANTFORCE { lMagnitude: m }),
            EffectKind::Spring => Self::Condition(DICONDITION {
                lOffset: 0,
                lPositiveCoefficient: m,
                lNegativeCoefficient: m,
                dwPositiveSaturation: LEGACY_FF_MAX as u32,
                dwNegativeSaturation: LEGACY_FF_MAX as u32,
                lDeadBand: 0,
            }),
            EffectKind::Sine => Self::Periodic(DIPERIODIC {
                dwMagnitude: m.unsigned_abs(),
                lOffset: 0,
                dwPhase: 0,
                dwPeriod: SINE_PERIOD_US,
            }),
        }
    }

    fn raw(&mut self) -> (u32, *mut c_void) {
        match self {
            Self::Constant(c) => (size_of::<DICONSTANTFORCE>() as u32, (c as *mut DICONSTANTFORCE).cast()),
            Self::Condition(c) => (size_of::<DICONDITION>() as u32, (c as *mut DICONDITION).cast()),
            Self::Periodic(p) => (size_of::<DIPERIODIC>() as u32, (p as *mut DIPERIODIC).cast()),
        }
    }
}

fn effect_guid(kind: EffectKind) -> &'static GUID {
    match kind {
        EffectKind::ConstantForce => &GUID_CONSTANT_FORCE,
        EffectKind::Spring => &GUID_SPRING,
        EffectKind::Sine => &GUID_SINE,
    }
}

/// An opened joystick.
struct Joystick {
    device: IDirectInputDevice8W,
    ff_axes: [bool; NUM_JOY_AXES],
}

struct Effect {
    joy: LegacyJoyId,
    effect: IDirectInputEffect,
}

/// DirectInput 8 devices bound to one window.
pub struct DirectInputLegacy {
    di: IDirectInput8W,
    hwnd: HWND,
    keyboard: IDirectInputDevice8W,
    mouse: IDirectInputDevice8W,
    ids: InstanceIds,
    opened: HashMap<LegacyJoyId, Joystick>,
    effects: HashMap<u64, Effect>,
    next_effect: u64,
    /// `(vid, pid)` → interface path, for devices whose driver hides the path.
    paths: HashMap<(u16, u16), String>,
}

impl DirectInputLegacy {
    /// Create the DirectInput object and the system keyboard and mouse.
    pub fn new(hwnd: windows_sys::Win32::Foundation::HWND) -> Result<Self, BackendError> {
        let hwnd = HWND(hwnd);
        let module = unsafe { GetModuleHandleW(PCWSTR::null()) }.map_err(di_error)?;
        let mut raw = std::ptr::null_mut();
        unsafe {
            DirectInput8Create(
                HINSTANCE(module.0),
                DIRECTINPUT_VERSION,
                &IDirectInput8W::IID,
                &mut raw,
                None::<&IUnknown>,
            )
        }
        .map_err(di_error)?;
        if raw.is_null() {
            return Err(BackendError::Unsupported);
        }
        let di = unsafe { IDirectInput8W::from_raw(raw) };

        let keyboard = create_device(&di, &GUID_SYS_KEYBOARD)?;
        Format::keyboard().apply(&keyboard)?;
        unsafe { keyboard.SetCooperativeLevel(hwnd, DISCL_NONEXCLUSIVE | DISCL_FOREGROUND) }
            .map_err(di_error)?;

        let mouse = create_device(&di, &GUID_SYS_MOUSE)?;
        Format::mouse().apply(&mouse)?;
        unsafe { mouse.SetCooperativeLevel(hwnd, DISCL_NONEXCLUSIVE | DISCL_FOREGROUND) }
            .map_err(di_error)?;

        info!("directinput 8 ready");
        Ok(Self {
            di,
            hwnd,
            keyboard,
            mouse,
            ids: InstanceIds::default(),
            opened: HashMap::new(),
            effects: HashMap::new(),
            next_effect: 0,
            paths: HashMap::new(),
        })
    }

    /// Interface paths to fall back on when a device does not report its own.
    pub fn with_paths(mut self, paths: HashMap<(u16, u16), String>) -> Self {
        self.paths = paths;
        self
    }

    fn open_device(&self, id: LegacyJoyId) -> Result<IDirectInputDevice8W, BackendError> {
        let instance = self.ids.instance(id).ok_or(BackendError::NotConnected)?;
        let device = create_device(&self.di, &instance)?;
        Format::joystick().apply(&device)?;
        Ok(device)
    }

    fn describe(&mut self, inst: &DIDEVICEINSTANCEW) -> Result<LegacyJoyInfo, BackendError> {
        let id = self.ids.id(inst.guidInstance);
        let device = self.open_device(id)?;

        // FFI struct: must be manually zeroed
        let mut caps: DIDEVCAPS = unsafe { std::mem::zeroed() };
        caps.dwSize = size_of::<DIDEVCAPS>() as u32;
        unsafe { device.GetCapabilities(&mut caps) }.map_err(di_error)?;
        let has_ff = caps.dwFlags & DIDC_FORCEFEEDBACK != 0;

        let mut axis_ranges = [None; NUM_JOY_AXES];
        let mut ff_axes = [false; NUM_JOY_AXES];
        for axis in JoyAxis::ALL {
            let offset = axis_offset(axis);
            let mut object: DIDEVICEOBJECTINSTANCEW = unsafe { std::mem::zeroed() };
            object.dwSize = size_of::<DIDEVICEOBJECTINSTANCEW>() as u32;
            if unsafe { device.GetObjectInfo(&mut object, offset, DIPH_BYOFFSET) }.is_err() {
                continue;
            }
            let mut range = DIPROPRANGE {
                diph: prop_header::<DIPROPRANGE>(offset, DIPH_BYOFFSET),
                lMin: 0,
                lMax: 0,
            };
            unsafe { device.GetProperty(DIPROP_RANGE as *const GUID, &mut range.diph) }
                .map_err(di_error)?;
            axis_ranges[axis.index()] = Some((range.lMin as i64, range.lMax as i64));
            ff_axes[axis.index()] = has_ff && object.dwFlags & DIDOI_FFACTUATOR != 0;
        }

        let (vid, pid) = product_ids(&inst.guidProduct);
        let path = device_path(&device).or_else(|| self.paths.get(&(vid, pid)).cloned());
        Ok(LegacyJoyInfo {
            id,
            name: wide_to_string(&inst.tszProductName),
            vendor_id: vid,
            product_id: pid,
            path,
            axis_ranges,
            num_povs: (caps.dwPOVs as usize).min(NUM_JOY_POVS),
            num_buttons: (caps.dwButtons as usize).min(NUM_JOY_BUTTONS),
            ff_axes,
        })
    }
}

fn create_device(di: &IDirectInput8W, guid: &GUID) -> Result<IDirectInputDevice8W, BackendError> {
    let mut device = None;
    unsafe { di.CreateDevice(guid, &mut device, None::<&IUnknown>) }.map_err(di_error)?;
    device.ok_or(BackendError::NotConnected)
}

fn device_path(device: &IDirectInputDevice8W) -> Option<String> {
    // FFI struct: must be manually zeroed
    let mut prop: DIPROPGUIDANDPATH = unsafe { std::mem::zeroed() };
    prop.diph = prop_header::<DIPROPGUIDANDPATH>(0, DIPH_DEVICE);
    unsafe { device.GetProperty(DIPROP_GUIDANDPATH as *const GUID, &mut prop.diph) }.ok()?;
    let path = wide_to_string(&prop.wszPath);
    (!path.is_empty()).then_some(path)
}

impl LegacyBackend for DirectInputLegacy {
    fn name(&self) -> &'static str {
        "DirectInput"
    }

    fn joysticks(&mut self) -> Vec<LegacyJoyInfo> {
        let mut found: Vec<DIDEVICEINSTANCEW> = Vec::new();
        let listed = unsafe {
            self.di.EnumDevices(
                DI8DEVCLASS_GAMECTRL,
                Some(collect_instance),
                (&mut found as *mut Vec<DIDEVICEINSTANCEW>).cast(),
                DIEDFL_ATTACHEDONLY,
            )
        };
        if let Err(e) = listed {
            warn!(error = %e, "directinput device enumeration failed");
            return Vec::new();
        }

        let mut out = Vec::with_capacity(found.len());
        for inst in &found {
            match self.describe(inst) {
                Ok(info) => {
                    debug!(id = info.id.0, name = %info.name, vid = info.vendor_id, pid = info.product_id, "directinput joystick found");
                    out.push(info);
                }
                Err(e) => warn!(error = %e, "skipping directinput joystick"),
            }
        }
        out
    }

    fn open_joystick(&mut self, id: LegacyJoyId) -> Result<(), BackendError> {
        if self.opened.contains_key(&id) {
            return Ok(());
        }
        let device = self.open_device(id)?;

        let mut caps: DIDEVCAPS = unsafe { std::mem::zeroed() };
        caps.dwSize = size_of::<DIDEVCAPS>() as u32;
        unsafe { device.GetCapabilities(&mut caps) }.map_err(di_error)?;
        let mut ff_axes = [false; NUM_JOY_AXES];
        if caps.dwFlags & DIDC_FORCEFEEDBACK != 0 {
            for axis in JoyAxis::ALL {
                let mut object: DIDEVICEOBJECTINSTANCEW = unsafe { std::mem::zeroed() };
                object.dwSize = size_of::<DIDEVICEOBJECTINSTANCEW>() as u32;
                ff_axes[axis.index()] = unsafe {
                    device.GetObjectInfo(&mut object, axis_offset(axis), DIPH_BYOFFSET)
                }
                .is_ok()
                    && object.dwFlags & DIDOI_FFACTUATOR != 0;
            }
        }

        let exclusive = ff_axes.iter().any(|&a| a);
        let level = if exclusive {
            DISCL_EXCLUSIVE | DISCL_FOREGROUND
        } else {
            DISCL_NONEXCLUSIVE | DISCL_BACKGROUND
        };
        unsafe { device.SetCooperativeLevel(self.hwnd, level) }.map_err(di_error)?;
        if exclusive {
            // The device's own centring spring would fight every effect.
            let mut autocenter = DIPROPDWORD {
                diph: prop_header::<DIPROPDWORD>(0, DIPH_DEVICE),
                dwData: DIPROPAUTOCENTER_OFF,
            };
            if let Err(e) = unsafe { device.SetProperty(DIPROP_AUTOCENTER as *const GUID, &mut autocenter.diph) } {
                debug!(id = id.0, error = %e, "autocenter left on");
            }
        }
        debug!(id = id.0, exclusive, "directinput joystick opened");
        self.opened.insert(id, Joystick { device, ff_axes });
        Ok(())
    }

    fn close_joystick(&mut self, id: LegacyJoyId) {
        self.effects.retain(|_, e| {
            if e.joy != id {
                return true;
            }
            let _ = unsafe { e.effect.Stop() };
            let _ = unsafe { e.effect.Unload() };
            false
        });
        if let Some(joy) = self.opened.remove(&id) {
            let _ = unsafe { joy.device.Unacquire() };
        }
    }

    fn acquire(&mut self, device: LegacyDevice) -> Result<(), BackendError> {
        let target = match device {
            LegacyDevice::Keyboard => &self.keyboard,
            LegacyDevice::Mouse => &self.mouse,
            LegacyDevice::Joystick(id) => &self.opened.get(&id).ok_or(BackendError::NotConnected)?.device,
        };
        unsafe { target.Acquire() }.map_err(di_error)
    }

    fn unacquire(&mut self, device: LegacyDevice) {
        let target = match device {
            LegacyDevice::Keyboard => Some(&self.keyboard),
            LegacyDevice::Mouse => Some(&self.mouse),
            LegacyDevice::Joystick(id) => self.opened.get(&id).map(|j| &j.device),
        };
        if let Some(target) = target {
            let _ = unsafe { target.Unacquire() };
        }
    }

    fn read_keyboard(&mut self, keys: &mut KeyboardState) -> Result<(), BackendError> {
        let mut buf = [0u8; NUM_KEYS];
        read_state(&self.keyboard, &mut buf)?;
        for (key, byte) in keys.keys.iter_mut().zip(buf) {
            *key = pressed(byte);
        }
        Ok(())
    }

    fn read_mouse(&mut self) -> Result<LegacyMouseReading, BackendError> {
        let mut data = MouseData::default();
        read_state(&self.mouse, &mut data)?;
        let mut reading = LegacyMouseReading {
            dz: data.z,
            ..Default::default()
        };
        for (b, &byte) in data.buttons.iter().take(NUM_MOUSE_BUTTONS).enumerate() {
            reading.buttons[b] = pressed(byte);
        }
        Ok(reading)
    }

    fn read_joystick(&mut self, id: LegacyJoyId) -> Result<LegacyJoyReading, BackendError> {
        let joy = self.opened.get(&id).ok_or(BackendError::NotConnected)?;
        // Devices that need no polling answer with a success code.
        unsafe { joy.device.Poll() }.map_err(di_error)?;
        let mut data = JoyData::default();
        read_state(&joy.device, &mut data)?;

        let mut reading = LegacyJoyReading::default();
        for (out, &value) in reading.axes.iter_mut().zip(&data.axes) {
            *out = value as i64;
        }
        for (out, &raw) in reading.povs.iter_mut().zip(&data.povs) {
            *out = decode_pov(raw);
        }
        for (out, &byte) in reading.buttons.iter_mut().zip(&data.buttons) {
            *out = pressed(byte);
        }
        Ok(reading)
    }

    fn create_effect(&mut self, id: LegacyJoyId, params: &EffectParams) -> Result<EffectHandle, BackendError> {
        let joy = self.opened.get(&id).ok_or(BackendError::NotConnected)?;
        if !joy.ff_axes[params.axis.index()] {
            return Err(BackendError::Unsupported);
        }

        let mut axes = [axis_offset(params.axis)];
        let mut direction = [0i32];
        let mut body = EffectBody::new(params);
        let (size, specific) = body.raw();
        // FFI struct: must be manually zeroed
        let mut desc: DIEFFECT = unsafe { std::mem::zeroed() };
        desc.dwSize = size_of::<DIEFFECT>() as u32;
        desc.dwFlags = DIEFF_CARTESIAN | DIEFF_OBJECTOFFSETS;
        desc.dwDuration = INFINITE;
        desc.dwGain = LEGACY_FF_MAX as u32;
        desc.dwTriggerButton = DIEB_NOTRIGGER;
        desc.cAxes = 1;
        desc.rgdwAxes = axes.as_mut_ptr();
        desc.rglDirection = direction.as_mut_ptr();
        desc.cbTypeSpecificParams = size;
        desc.lpvTypeSpecificParams = specific;

        let mut effect = None;
        unsafe { joy.device.CreateEffect(effect_guid(params.kind), &desc, &mut effect, None::<&IUnknown>) }
            .map_err(di_error)?;
        let effect = effect.ok_or(BackendError::Unsupported)?;
        unsafe { effect.Start(1, 0) }.map_err(di_error)?;

        let handle = self.next_effect;
        self.next_effect += 1;
        self.effects.insert(handle, Effect { joy: id, effect });
        Ok(EffectHandle(handle))
    }

    fn update_effect(&mut self, handle: EffectHandle, params: &EffectParams) -> Result<(), BackendError> {
        let entry = self.effects.get(&handle.0).ok_or(BackendError::NotConnected)?;
        let mut body = EffectBody::new(params);
        let (size, specific) = body.raw();
        let mut desc: DIEFFECT = unsafe { std::mem::zeroed() };
        desc.dwSize = size_of::<DIEFFECT>() as u32;
        desc.cbTypeSpecificParams = size;
        desc.lpvTypeSpecificParams = specific;
        unsafe { entry.effect.SetParameters(&desc, DIEP_TYPESPECIFICPARAMS) }.map_err(di_error)
    }

    fn release_effect(&mut self, handle: EffectHandle) {
        if let Some(entry) = self.effects.remove(&handle.0) {
            let _ = unsafe { entry.effect.Stop() };
            let _ = unsafe { entry.effect.Unload() };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joystick_buffer_layout() {
        assert_eq!(size_of::<JoyData>(), 176);
        assert_eq!(axis_offset(JoyAxis::X), 0);
        assert_eq!(axis_offset(JoyAxis::RZ), 20);
        assert_eq!(axis_offset(JoyAxis::S2), 28);

        let format = Format::joystick();
        assert_eq!(format.size, 176);
        assert_eq!(format.slots.len(), NUM_JOY_AXES + NUM_JOY_POVS + NUM_JOY_BUTTONS);
        // Both sliders share a type GUID and are told apart by instance order.
        assert_eq!(format.slots[6].guid, Some(&GUID_SLIDER));
        assert_eq!(format.slots[7].guid, Some(&GUID_SLIDER));
        assert_eq!(format.slots[8].offset, 32);
        assert_eq!(format.slots[12].offset, 48);
        assert_eq!(format.slots.last().map(|s| s.offset), Some(175));
        assert!(format.slots.iter().all(|s| s.offset % 4 == 0 || s.guid.is_none()));
    }

    #[test]
    fn keyboard_format_indexes_by_key_code() {
        let format = Format::keyboard();
        assert_eq!(format.slots.len(), NUM_KEYS);
        let enter_kp = &format.slots[0x9C];
        assert_eq!(enter_kp.offset, 0x9C);
        assert_eq!(enter_kp.kind, DIDFT_BUTTON | DIDFT_OPTIONAL | 0x9C00);
    }

    #[test]
    fn mouse_format_reads_wheel_and_buttons() {
        let format = Format::mouse();
        assert_eq!(format.size, 20);
        assert_eq!(format.slots[2].offset, 8);
        assert_ne!(format.slots[2].kind & DIDFT_OPTIONAL, 0);
        assert_eq!(format.slots[3].offset, 12);
    }

    #[test]
    fn centred_pov_has_ffff_low_word() {
        assert_eq!(decode_pov(0xFFFF_FFFF), None);
        assert_eq!(decode_pov(0x0000_FFFF), None);
        assert_eq!(decode_pov(0), Some(0));
        assert_eq!(decode_pov(27000), Some(27000));
    }

    #[test]
    fn hresults_map_to_backend_errors() {
        assert_eq!(map_hresult(DIERR_INPUTLOST), BackendError::InputLost);
        assert_eq!(map_hresult(DIERR_NOTACQUIRED), BackendError::InputLost);
        assert_eq!(map_hresult(E_ACCESSDENIED), BackendError::Denied);
        assert_eq!(map_hresult(DIERR_UNPLUGGED), BackendError::NotConnected);
        assert_eq!(map_hresult(0x8000_4005), BackendError::Os(0x8000_4005));
    }

    #[test]
    fn product_guid_carries_vid_and_pid() {
        // Xbox 360 pad: {028E045E-0000-0000-0000-504944564944}
        let product = GUID::from_u128(0x028e045e_0000_0000_0000_504944564944);
        assert_eq!(product_ids(&product), (0x045e, 0x028e));
    }

    #[test]
    fn instance_ids_are_stable() {
        let mut ids = InstanceIds::default();
        let a = GUID::from_u128(1);
        let b = GUID::from_u128(2);
        assert_eq!(ids.id(a), LegacyJoyId(0));
        assert_eq!(ids.id(b), LegacyJoyId(1));
        assert_eq!(ids.id(a), LegacyJoyId(0));
        assert_eq!(ids.instance(LegacyJoyId(1)), Some(b));
        assert_eq!(ids.instance(LegacyJoyId(5)), None);
    }

    #[test]
    fn effect_bodies_clamp_to_native_range() {
        let params = |kind, magnitude| EffectParams {
            kind,
            axis: JoyAxis::X,
            magnitude,
        };
        match EffectBody::new(&params(EffectKind::ConstantForce, -20_000)) {
            EffectBody::Constant(c) => assert_eq!(c.lMagnitude, -LEGACY_FF_MAX),
            _ => panic!("expected a constant force"),
        }
        match EffectBody::new(&params(EffectKind::Sine, -4_000)) {
            EffectBody::Periodic(p) => {
                assert_eq!(p.dwMagnitude, 4_000);
                assert_eq!(p.dwPeriod, SINE_PERIOD_US);
            }
            _ => panic!("expected a periodic effect"),
        }
        let mut spring = EffectBody::new(&params(EffectKind::Spring, 6_000));
        assert_eq!(spring.raw().0 as usize, size_of::<DICONDITION>());
    }
}
