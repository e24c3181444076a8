//! Windows Raw Input backend (keyboard + mouse).
//!
//! Packets reach the backend two ways:
//! - the host's window procedure forwards each `WM_INPUT` through a
//!   [`RawInputFeed`] handle, and
//! - [`drain`](WinRawInput::drain) pulls any `WM_INPUT` still queued for the
//!   window before handing the packets over.
//!
//! ## Conventions
//! - Key codes: set-1 scancode, `| 0x80` for `E0`-prefixed keys (see [`keys`](crate::keys)).
//! - Mouse deltas are raw OS counts; absolute devices report `0..=65535`.
//! - Wheel deltas are raw `WHEEL_DELTA` units (typically ±120 per notch).

use core::ffi::c_void;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::{GetLastError, HANDLE, HWND};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{MapVirtualKeyW, MAPVK_VK_TO_VSC_EX};
use windows_sys::Win32::UI::Input::*;
use windows_sys::Win32::UI::WindowsAndMessaging::{PeekMessageW, MSG, PM_REMOVE, WM_INPUT};

use crate::device::RawInputBackend;
use crate::error::BackendError;
use crate::event::{RawDeviceInfo, RawEvent, RawHandle, RawKeyEvent, RawMouseEvent};
use crate::keys::key_code_from_scancode;
use crate::metadata::NUM_MOUSE_BUTTONS;

// Local constants (avoid relying on module exports that vary by windows-sys version)
const RI_KEY_BREAK: u16 = 0x0001;
const RI_KEY_E0: u16 = 0x0002;
const RI_KEY_E1: u16 = 0x0004;

const MOUSE_MOVE_ABSOLUTE: u16 = 0x0001;
const RI_MOUSE_WHEEL: u16 = 0x0400;

const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
const HID_USAGE_GENERIC_MOUSE: u16 = 0x02;
const HID_USAGE_GENERIC_KEYBOARD: u16 = 0x06;
const RIDEV_REMOVE_FLAG: u32 = 0x0000_0001;

/// Path prefix of the pseudo devices a remote desktop session adds.
const RDP_DEVICE_MARKER: &str = "RDP_";

/// Shared packet queue between the window procedure and the backend.
#[derive(Clone, Default)]
pub struct RawInputFeed {
    queue: Rc<RefCell<VecDeque<RawEvent>>>,
}

impl RawInputFeed {
    /// Parse a `WM_INPUT` `lparam` and queue the packet. Returns `true` when the
    /// message carried a keyboard or mouse packet.
    pub fn handle_wm_input(&self, lparam: isize) -> bool {
        match read_wm_input(lparam) {
            Some(ev) => {
                self.queue.borrow_mut().push_back(ev);
                true
            }
            None => false,
        }
    }
}

/// Raw Input registered against one window.
pub struct WinRawInput {
    hwnd: HWND,
    feed: RawInputFeed,
    registered: bool,
}

impl WinRawInput {
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd,
            feed: RawInputFeed::default(),
            registered: false,
        }
    }

    /// Handle for the host's window procedure.
    pub fn feed(&self) -> RawInputFeed {
        self.feed.clone()
    }

    fn devices(&self, kind: u32) -> Vec<RawDeviceInfo> {
        list_devices()
            .into_iter()
            .filter(|d| d.dwType == kind)
            .filter_map(|d| {
                let path = device_name(d.hDevice)?;
                if path.contains(RDP_DEVICE_MARKER) {
                    debug!(%path, "skipping remote desktop pseudo device");
                    return None;
                }
                Some(RawDeviceInfo {
                    handle: RawHandle(d.hDevice as usize as u64),
                    path,
                    is_absolute: false,
                })
            })
            .collect()
    }

    fn set_registration(&mut self, flags: u32, target: HWND) -> Result<(), BackendError> {
        let rid = [
            RAWINPUTDEVICE {
                usUsagePage: HID_USAGE_PAGE_GENERIC,
                usUsage: HID_USAGE_GENERIC_KEYBOARD,
                dwFlags: flags,
                hwndTarget: target,
            },
            RAWINPUTDEVICE {
                usUsagePage: HID_USAGE_PAGE_GENERIC,
                usUsage: HID_USAGE_GENERIC_MOUSE,
                dwFlags: flags,
                hwndTarget: target,
            },
        ];
        let ok = unsafe {
            RegisterRawInputDevices(
                rid.as_ptr(),
                rid.len() as u32,
                core::mem::size_of::<RAWINPUTDEVICE>() as u32,
            )
        };
        if ok == 0 {
            return Err(BackendError::Os(unsafe { GetLastError() }));
        }
        Ok(())
    }
}

impl RawInputBackend for WinRawInput {
    fn keyboards(&mut self) -> Vec<RawDeviceInfo> {
        self.devices(RIM_TYPEKEYBOARD)
    }

    fn mice(&mut self) -> Vec<RawDeviceInfo> {
        self.devices(RIM_TYPEMOUSE)
    }

    fn register(&mut self) -> Result<(), BackendError> {
        self.set_registration(0, self.hwnd)?;
        self.registered = true;
        Ok(())
    }

    fn unregister(&mut self) {
        if !self.registered {
            return;
        }
        if let Err(e) = self.set_registration(RIDEV_REMOVE_FLAG, core::ptr::null_mut()) {
            warn!(error = %e, "raw input unregistration failed");
        }
        self.registered = false;
        self.feed.queue.borrow_mut().clear();
    }

    fn drain(&mut self, out: &mut Vec<RawEvent>) -> Result<(), BackendError> {
        if self.registered {
            let mut msg: MSG = unsafe { core::mem::zeroed() };
            while unsafe { PeekMessageW(&mut msg, self.hwnd, WM_INPUT, WM_INPUT, PM_REMOVE) } != 0 {
                self.feed.handle_wm_input(msg.lParam);
            }
        }
        out.extend(self.feed.queue.borrow_mut().drain(..));
        Ok(())
    }
}

fn list_devices() -> Vec<RAWINPUTDEVICELIST> {
    let entry = core::mem::size_of::<RAWINPUTDEVICELIST>() as u32;
    unsafe {
        let mut count: u32 = 0;
        if GetRawInputDeviceList(core::ptr::null_mut(), &mut count, entry) == u32::MAX || count == 0 {
            return Vec::new();
        }
        let mut list: Vec<RAWINPUTDEVICELIST> = vec![core::mem::zeroed(); count as usize];
        let got = GetRawInputDeviceList(list.as_mut_ptr(), &mut count, entry);
        if got == u32::MAX {
            return Vec::new();
        }
        list.truncate(got as usize);
        list
    }
}

#[inline]
fn vkey_to_scancode(vkey: u16) -> Option<(u16, bool)> {
    unsafe {
        // MAPVK_VK_TO_VSC_EX can encode extended keys by returning 0xE0xx.
        let sc = MapVirtualKeyW(vkey as u32, MAPVK_VK_TO_VSC_EX);
        if sc == 0 {
            return None;
        }
        if (sc & 0xFF00) == 0xE000 {
            Some(((sc & 0x00FF) as u16, true))
        } else {
            Some((sc as u16, false))
        }
    }
}

/// Parse a `WM_INPUT` lparam into a keyboard or mouse packet (if applicable).
fn read_wm_input(lparam: isize) -> Option<RawEvent> {
    unsafe {
        let header = core::mem::size_of::<RAWINPUTHEADER>() as u32;
        let mut size: u32 = 0;
        let r0 = GetRawInputData(lparam as _, RID_INPUT, core::ptr::null_mut(), &mut size, header);
        if r0 == u32::MAX || size == 0 {
            return None;
        }

        let mut buf = vec![0u8; size as usize];
        let r1 = GetRawInputData(
            lparam as _,
            RID_INPUT,
            buf.as_mut_ptr() as *mut c_void,
            &mut size,
            header,
        );
        if r1 == u32::MAX {
            return None;
        }

        read_raw_input_bytes(&buf)
    }
}

/// Parse a `RID_INPUT` payload (bytes returned by `GetRawInputData`).
fn read_raw_input_bytes(buf: &[u8]) -> Option<RawEvent> {
    let hdr_sz = core::mem::size_of::<RAWINPUTHEADER>();
    if buf.len() < hdr_sz {
        return None;
    }

    unsafe {
        // Payload is variable-sized; read the header first.
        let hdr: RAWINPUTHEADER = core::ptr::read_unaligned(buf.as_ptr() as *const RAWINPUTHEADER);
        let data_ptr = buf.as_ptr().add(hdr_sz);
        let device = RawHandle(hdr.hDevice as usize as u64);

        match hdr.dwType {
            RIM_TYPEKEYBOARD => {
                if buf.len() < hdr_sz + core::mem::size_of::<RAWKEYBOARD>() {
                    return None;
                }
                let kbd: RAWKEYBOARD = core::ptr::read_unaligned(data_ptr as *const RAWKEYBOARD);
                let flags = kbd.Flags;

                // Prefer MakeCode; if it's 0, fall back to the virtual key.
                let (scancode, ext_from_map) = if kbd.MakeCode != 0 {
                    (kbd.MakeCode, false)
                } else {
                    vkey_to_scancode(kbd.VKey)?
                };
                let code = key_code_from_scancode(
                    scancode,
                    flags & RI_KEY_E0 != 0 || ext_from_map,
                    flags & RI_KEY_E1 != 0,
                )?;

                Some(RawEvent::Key(RawKeyEvent {
                    device,
                    code,
                    pressed: flags & RI_KEY_BREAK == 0,
                }))
            }

            RIM_TYPEMOUSE => {
                if buf.len() < hdr_sz + core::mem::size_of::<RAWMOUSE>() {
                    return None;
                }
                let m: RAWMOUSE = core::ptr::read_unaligned(data_ptr as *const RAWMOUSE);
                let flags = m.Anonymous.Anonymous.usButtonFlags;
                let data = m.Anonymous.Anonymous.usButtonData;
                let (buttons_down, buttons_up) = split_button_flags(flags);

                Some(RawEvent::Mouse(RawMouseEvent {
                    device,
                    dx: m.lLastX,
                    dy: m.lLastY,
                    absolute: m.usFlags & MOUSE_MOVE_ABSOLUTE != 0,
                    wheel: if flags & RI_MOUSE_WHEEL != 0 { data as i16 } else { 0 },
                    buttons_down,
                    buttons_up,
                }))
            }

            _ => None,
        }
    }
}

/// `RI_MOUSE_BUTTON_n_DOWN`/`_UP` pairs occupy bits `2n`/`2n+1`.
fn split_button_flags(flags: u16) -> (u8, u8) {
    let mut down = 0u8;
    let mut up = 0u8;
    for b in 0..NUM_MOUSE_BUTTONS {
        if flags & (1 << (2 * b)) != 0 {
            down |= 1 << b;
        }
        if flags & (1 << (2 * b + 1)) != 0 {
            up |= 1 << b;
        }
    }
    (down, up)
}

/// Raw Input device interface path for a given `hDevice` (RIDI_DEVICENAME).
pub(crate) fn device_name(hdev: HANDLE) -> Option<String> {
    unsafe {
        // Query required size (in WCHARs, including NUL).
        let mut size: u32 = 0;
        let r0 = GetRawInputDeviceInfoW(hdev, RIDI_DEVICENAME, core::ptr::null_mut(), &mut size);
        if r0 == u32::MAX || size == 0 {
            return None;
        }

        let mut wide: Vec<u16> = vec![0u16; size as usize];
        let r1 = GetRawInputDeviceInfoW(
            hdev,
            RIDI_DEVICENAME,
            wide.as_mut_ptr() as *mut c_void,
            &mut size,
        );
        if r1 == u32::MAX {
            return None;
        }

        while wide.last() == Some(&0) {
            wide.pop();
        }
        Some(String::from_utf16_lossy(&wide))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_flags_split_into_masks() {
        // LEFT_DOWN | RIGHT_UP | BUTTON_5_DOWN
        assert_eq!(split_button_flags(0x0001 | 0x0008 | 0x0100), (0b1_0001, 0b0_0010));
        assert_eq!(split_button_flags(RI_MOUSE_WHEEL), (0, 0));
    }
}
