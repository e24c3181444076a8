//! [`HostWindow`] over a Win32 window handle.

use windows_sys::Win32::Foundation::{HWND, POINT, RECT};
use windows_sys::Win32::Graphics::Gdi::{ClientToScreen, ScreenToClient};
use windows_sys::Win32::UI::WindowsAndMessaging::{ClipCursor, GetClientRect, GetCursorPos, ShowCursor};

use crate::host::HostWindow;

pub struct Win32Window {
    hwnd: HWND,
    /// `ShowCursor` keeps a display counter; only call it on a change.
    cursor_visible: bool,
}

impl Win32Window {
    pub fn new(hwnd: HWND) -> Self {
        Self {
            hwnd,
            cursor_visible: true,
        }
    }

    fn client_rect(&self) -> Option<RECT> {
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: 0,
            bottom: 0,
        };
        (unsafe { GetClientRect(self.hwnd, &mut rect) } != 0).then_some(rect)
    }
}

impl HostWindow for Win32Window {
    fn client_size(&self) -> (u32, u32) {
        self.client_rect().map_or((0, 0), |r| {
            ((r.right - r.left).max(0) as u32, (r.bottom - r.top).max(0) as u32)
        })
    }

    fn cursor_pos(&self) -> Option<(i32, i32)> {
        let mut pt = POINT { x: 0, y: 0 };
        unsafe {
            if GetCursorPos(&mut pt) == 0 || ScreenToClient(self.hwnd, &mut pt) == 0 {
                return None;
            }
        }
        Some((pt.x, pt.y))
    }

    fn clip_cursor(&mut self, confine: bool) {
        if !confine {
            unsafe { ClipCursor(core::ptr::null()) };
            return;
        }
        let Some(rect) = self.client_rect() else {
            return;
        };
        let mut top_left = POINT {
            x: rect.left,
            y: rect.top,
        };
        let mut bottom_right = POINT {
            x: rect.right,
            y: rect.bottom,
        };
        unsafe {
            ClientToScreen(self.hwnd, &mut top_left);
            ClientToScreen(self.hwnd, &mut bottom_right);
            let screen = RECT {
                left: top_left.x,
                top: top_left.y,
                right: bottom_right.x,
                bottom: bottom_right.y,
            };
            ClipCursor(&screen);
        }
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        if visible != self.cursor_visible {
            unsafe { ShowCursor(visible as i32) };
            self.cursor_visible = visible;
        }
    }
}
