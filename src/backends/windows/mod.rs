#![cfg(target_os = "windows")]

//! Windows input backends.
//!
//! - **Raw Input** for per-device keyboards and mice (`WM_INPUT` parsing)
//! - **DirectInput 8** game controllers plus the system keyboard/mouse as the
//!   legacy backend, with force-feedback effects
//! - **winmm** joysticks as the legacy fallback when DirectInput is unavailable
//! - **XInput** controller slots
//! - **HID** product names and controller interface paths via `hidapi`
//!   (feature `hid`)
//!
//! Most hosts only call [`bind`] and forward two window messages:
//!
//! ```no_run
//! # fn demo(hwnd: windows_sys::Win32::Foundation::HWND) {
//! use padmux::backends::windows::{bind, Win32Window};
//! use padmux::{InputConfig, InputSystem};
//!
//! let bound = bind(hwnd);
//! let raw_feed = bound.raw_feed.clone();
//! let wheel_feed = bound.wheel_feed.clone();
//! let mut input = InputSystem::new(InputConfig::default(), Win32Window::new(hwnd), bound.backends);
//! // In the window procedure:
//! //   WM_INPUT      => raw_feed.handle_wm_input(lparam)
//! //   WM_MOUSEWHEEL => if let Some(w) = &wheel_feed { w.handle_wm_mousewheel(wparam) }
//! # let _ = (&mut input, raw_feed, wheel_feed);
//! # }
//! ```

#[cfg(feature = "hid")]
pub mod hid_names;
pub mod dinput;
pub mod legacy;
pub mod raw_input;
pub mod window;
pub mod xinput;

use tracing::{info, warn};
use windows_sys::Win32::Foundation::HWND;

use crate::backends::BackendSet;

pub use dinput::DirectInputLegacy;
pub use legacy::{WheelFeed, WinLegacy};
pub use raw_input::{RawInputFeed, WinRawInput};
pub use window::Win32Window;
pub use xinput::WinXInput;

/// Backends bound to one window, plus the handles its window procedure feeds.
pub struct Bound {
    pub backends: BackendSet,
    pub raw_feed: RawInputFeed,
    /// Present only when the winmm fallback serves the legacy devices; DirectInput
    /// reads the wheel itself.
    pub wheel_feed: Option<WheelFeed>,
}

/// Bind every Windows backend to `hwnd`. DirectInput 8 serves the legacy devices
/// when it can be created, winmm otherwise.
pub fn bind(hwnd: HWND) -> Bound {
    let raw = WinRawInput::new(hwnd);
    let raw_feed = raw.feed();

    #[allow(unused_mut)]
    let mut backends = BackendSet::new();
    #[allow(unused_mut)]
    let mut paths = std::collections::HashMap::new();

    #[cfg(feature = "hid")]
    {
        let catalog = hid_names::HidCatalog::load();
        paths = catalog.controller_paths();
        backends = backends.with_namer(catalog);
    }

    let (backends, wheel_feed) = match DirectInputLegacy::new(hwnd) {
        Ok(di) => (backends.with_legacy(di.with_paths(paths)), None),
        Err(e) => {
            warn!(error = %e, "directinput unavailable; falling back to winmm");
            let legacy = WinLegacy::new().with_paths(paths);
            let wheel_feed = legacy.wheel_feed();
            (backends.with_legacy(legacy), Some(wheel_feed))
        }
    };

    let backends = backends.with_raw(raw).with_controller(WinXInput::new());
    info!(backends = ?backends, "windows input backends bound");

    Bound {
        backends,
        raw_feed,
        wheel_feed,
    }
}
