//! Device enumeration and backend assignment.
//!
//! Runs once when the input system is built. Produces the canonical device tables:
//! every keyboard, mouse and joystick gets an index and exactly one source
//! backend.
//!
//! ## Assignment policy
//! - Keyboards/mice come from the raw stream when raw mode is requested and the
//!   raw backend is bound (one entry per physical device). Otherwise the legacy
//!   backend contributes one logical keyboard and one logical mouse.
//! - Joysticks are listed by the legacy backend. A joystick matching the
//!   controller signature table is handed to the next free controller slot when
//!   controller mode is active, and is *not* opened through the legacy backend.
//! - Without a legacy backend, connected controller slots are listed directly.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::backends::BackendSet;
use crate::config::{is_controller, InputConfig};
use crate::device::{ControllerBackend, LegacyJoyId, LegacyJoyInfo};
use crate::event::{RawDeviceInfo, RawHandle};
use crate::host::DeviceNamer;
use crate::metadata::{
    BackendKind, JoyAxis, JoyDetails, KeyDetails, MouseDetails, NUM_JOY_AXES,
};

/// Where a keyboard or mouse gets its data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum KbmSource {
    Raw(RawHandle),
    Legacy,
}

/// Where a joystick gets its data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum JoySource {
    Legacy {
        id: LegacyJoyId,
        /// Native `(min, max)` per canonical axis.
        ranges: [Option<(i64, i64)>; NUM_JOY_AXES],
    },
    Controller {
        slot: u32,
    },
}

#[derive(Clone, Debug)]
pub(crate) struct Keyboard {
    pub details: KeyDetails,
    pub source: KbmSource,
}

#[derive(Clone, Debug)]
pub(crate) struct Mouse {
    pub details: MouseDetails,
    pub source: KbmSource,
}

#[derive(Clone, Debug)]
pub(crate) struct Joystick {
    pub details: JoyDetails,
    pub source: JoySource,
    /// `false` for devices with nothing to read; they are listed but never polled.
    pub pollable: bool,
}

/// Result of one enumeration pass.
#[derive(Debug, Default)]
pub(crate) struct Enumeration {
    pub keyboards: Vec<Keyboard>,
    pub mice: Vec<Mouse>,
    pub joysticks: Vec<Joystick>,
    /// Keyboards and mice come from the raw stream.
    pub raw_mode: bool,
    /// Controller-compatible joysticks go to the controller backend.
    pub controller_mode: bool,
    pub raw_keyboard_index: HashMap<RawHandle, usize>,
    pub raw_mouse_index: HashMap<RawHandle, usize>,
}

pub(crate) fn enumerate(backends: &mut BackendSet, config: &InputConfig) -> Enumeration {
    let mut out = Enumeration::default();
    let namer = backends.namer.as_deref();

    // 1) Keyboards and mice.
    out.raw_mode = config.raw_input && backends.raw.is_some();
    if config.raw_input && !out.raw_mode {
        warn!("raw input requested but unavailable; falling back to legacy keyboard/mouse");
    }

    if let (true, Some(raw)) = (out.raw_mode, backends.raw.as_mut()) {
        for (n, dev) in raw.keyboards().into_iter().enumerate() {
            out.raw_keyboard_index.insert(dev.handle, out.keyboards.len());
            out.keyboards.push(Keyboard {
                details: KeyDetails {
                    name: device_name(namer, &dev, "Keyboard", n),
                    backend: BackendKind::Raw,
                },
                source: KbmSource::Raw(dev.handle),
            });
        }
        for (n, dev) in raw.mice().into_iter().enumerate() {
            out.raw_mouse_index.insert(dev.handle, out.mice.len());
            out.mice.push(Mouse {
                details: MouseDetails {
                    name: device_name(namer, &dev, "Mouse", n),
                    backend: BackendKind::Raw,
                    is_absolute: dev.is_absolute,
                },
                source: KbmSource::Raw(dev.handle),
            });
        }
    } else if backends.legacy.is_some() {
        out.keyboards.push(Keyboard {
            details: KeyDetails {
                name: "System Keyboard".into(),
                backend: BackendKind::Legacy,
            },
            source: KbmSource::Legacy,
        });
        out.mice.push(Mouse {
            details: MouseDetails {
                name: "System Mouse".into(),
                backend: BackendKind::Legacy,
                is_absolute: false,
            },
            source: KbmSource::Legacy,
        });
    }

    // 2) Joysticks.
    out.controller_mode = config.xinput && backends.controller.is_some();
    let signatures = config.signatures();

    if let Some(legacy) = backends.legacy.as_mut() {
        let mut next_slot = 0u32;
        for info in legacy.joysticks() {
            if out.controller_mode {
                if let Some(controller) = backends.controller.as_mut() {
                    if next_slot < controller.slot_count() && is_controller(&signatures, &info) {
                        let slot = next_slot;
                        next_slot += 1;
                        debug!(name = %info.name, slot, "joystick assigned to controller backend");
                        let name = joystick_name(namer, &info);
                        out.joysticks.push(controller_joystick(&mut **controller, slot, name));
                        continue;
                    }
                }
            }

            let details = legacy_details(namer, &info);
            let pollable = details.is_pollable();
            if pollable {
                // Shared access only; other applications keep working.
                if let Err(e) = legacy.open_joystick(info.id) {
                    warn!(name = %info.name, error = %e, "could not open joystick; skipped");
                    continue;
                }
            } else {
                debug!(name = %info.name, "joystick has no axes or buttons; listed but not polled");
            }
            out.joysticks.push(Joystick {
                details,
                source: JoySource::Legacy {
                    id: info.id,
                    ranges: info.axis_ranges,
                },
                pollable,
            });
        }
    } else if out.controller_mode {
        if let Some(controller) = backends.controller.as_mut() {
            for slot in 0..controller.slot_count() {
                if controller.capabilities(slot).is_ok() {
                    let name = format!("XInput Controller {}", slot + 1);
                    out.joysticks.push(controller_joystick(&mut **controller, slot, name));
                }
            }
        }
    }

    info!(
        keyboards = out.keyboards.len(),
        mice = out.mice.len(),
        joysticks = out.joysticks.len(),
        raw_mode = out.raw_mode,
        controller_mode = out.controller_mode,
        "input devices enumerated"
    );
    out
}

fn device_name(namer: Option<&dyn DeviceNamer>, dev: &RawDeviceInfo, kind: &str, n: usize) -> String {
    namer
        .and_then(|nm| nm.friendly_name(&dev.path))
        .unwrap_or_else(|| format!("{kind} {}", n + 1))
}

fn joystick_name(namer: Option<&dyn DeviceNamer>, info: &LegacyJoyInfo) -> String {
    info.path
        .as_deref()
        .and_then(|p| namer.and_then(|nm| nm.friendly_name(p)))
        .unwrap_or_else(|| info.name.clone())
}

fn legacy_details(namer: Option<&dyn DeviceNamer>, info: &LegacyJoyInfo) -> JoyDetails {
    JoyDetails::new(
        joystick_name(namer, info),
        BackendKind::Legacy,
        info.has_axis(),
        info.num_povs,
        info.num_buttons,
        info.ff_axes,
    )
}

/// Controller layout: sticks on X/Y and RX/RY, independent triggers on Z and RZ,
/// D-pad on POV 0, ten buttons. Vibration is driven through the X axis.
pub(crate) fn controller_details(name: String, vibration: bool) -> JoyDetails {
    let mut has_axis = [false; NUM_JOY_AXES];
    for axis in [JoyAxis::X, JoyAxis::Y, JoyAxis::Z, JoyAxis::RX, JoyAxis::RY, JoyAxis::RZ] {
        has_axis[axis.index()] = true;
    }
    let mut ff = [false; NUM_JOY_AXES];
    ff[JoyAxis::X.index()] = vibration;

    let mut details = JoyDetails::new(name, BackendKind::Controller, has_axis, 1, 10, ff);
    for (axis, label) in [
        (JoyAxis::X, "Left Thumb X"),
        (JoyAxis::Y, "Left Thumb Y"),
        (JoyAxis::Z, "Left Trigger"),
        (JoyAxis::RX, "Right Thumb X"),
        (JoyAxis::RY, "Right Thumb Y"),
        (JoyAxis::RZ, "Right Trigger"),
    ] {
        details.axis_names[axis.index()] = label.to_string();
    }
    details
}

fn controller_joystick(controller: &mut dyn ControllerBackend, slot: u32, name: String) -> Joystick {
    // An empty slot is still assigned: the pad may be plugged in later.
    let vibration = controller
        .capabilities(slot)
        .map(|c| c.vibration)
        .unwrap_or(false);
    Joystick {
        details: controller_details(name, vibration),
        source: JoySource::Controller { slot },
        pollable: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{VirtualController, VirtualLegacy, VirtualRawInput};
    use crate::device::ControllerCaps;

    #[test]
    fn raw_mode_lists_every_physical_device() {
        let raw = VirtualRawInput::new();
        raw.add_keyboard("kbd-a");
        raw.add_keyboard("kbd-b");
        raw.add_mouse("mouse-a");
        let mut set = BackendSet::new()
            .with_raw(raw)
            .with_legacy(VirtualLegacy::new());
        let cfg = InputConfig {
            raw_input: true,
            ..Default::default()
        };

        let e = enumerate(&mut set, &cfg);
        assert!(e.raw_mode);
        assert_eq!(e.keyboards.len(), 2);
        assert_eq!(e.mice.len(), 1);
        assert_eq!(e.keyboards[1].details.name, "Keyboard 2");
        assert!(e.keyboards.iter().all(|k| k.details.backend == BackendKind::Raw));
    }

    #[test]
    fn raw_requested_without_backend_falls_back_to_legacy() {
        let mut set = BackendSet::new().with_legacy(VirtualLegacy::new());
        let cfg = InputConfig {
            raw_input: true,
            ..Default::default()
        };
        let e = enumerate(&mut set, &cfg);
        assert!(!e.raw_mode);
        assert_eq!(e.keyboards.len(), 1);
        assert_eq!(e.mice.len(), 1);
        assert_eq!(e.mice[0].source, KbmSource::Legacy);
    }

    #[test]
    fn namer_supplies_friendly_names() {
        let raw = VirtualRawInput::new();
        raw.add_mouse("\\\\?\\HID#VID_046D&PID_C077");
        let mut names = HashMap::new();
        names.insert("\\\\?\\HID#VID_046D&PID_C077".to_string(), "Logitech Mouse".to_string());
        let mut set = BackendSet::new().with_raw(raw).with_namer(names);
        let cfg = InputConfig {
            raw_input: true,
            ..Default::default()
        };
        let e = enumerate(&mut set, &cfg);
        assert_eq!(e.mice[0].details.name, "Logitech Mouse");
    }

    #[test]
    fn controller_compatible_joystick_goes_to_a_slot_and_stays_closed() {
        let legacy = VirtualLegacy::new();
        let pad = legacy.add_joystick(VirtualLegacy::gamepad_info(1, "Xbox 360 Controller", 0x045e, 0x028e));
        let stick = legacy.add_joystick(VirtualLegacy::gamepad_info(2, "Flight Stick", 0x044f, 0xb10a));
        let controller = VirtualController::new();
        controller.connect(0, ControllerCaps { vibration: true });

        let mut set = BackendSet::new()
            .with_legacy(legacy.clone())
            .with_controller(controller);
        let e = enumerate(&mut set, &InputConfig::default());

        assert_eq!(e.joysticks.len(), 2);
        assert_eq!(e.joysticks[0].source, JoySource::Controller { slot: 0 });
        assert!(e.joysticks[0].details.has_ffeedback);
        assert!(matches!(e.joysticks[1].source, JoySource::Legacy { id, .. } if id == stick));
        assert!(!legacy.is_open(pad));
        assert!(legacy.is_open(stick));
    }

    #[test]
    fn controller_mode_off_keeps_everything_on_legacy() {
        let legacy = VirtualLegacy::new();
        legacy.add_joystick(VirtualLegacy::gamepad_info(1, "Xbox 360 Controller", 0x045e, 0x028e));
        let mut set = BackendSet::new()
            .with_legacy(legacy)
            .with_controller(VirtualController::new());
        let cfg = InputConfig {
            xinput: false,
            ..Default::default()
        };
        let e = enumerate(&mut set, &cfg);
        assert!(!e.controller_mode);
        assert_eq!(e.joysticks[0].details.backend, BackendKind::Legacy);
    }

    #[test]
    fn controller_only_lists_connected_slots() {
        let controller = VirtualController::new();
        controller.connect(0, ControllerCaps::default());
        controller.connect(2, ControllerCaps::default());
        let mut set = BackendSet::new().with_controller(controller);
        let e = enumerate(&mut set, &InputConfig::default());
        assert_eq!(e.joysticks.len(), 2);
        assert_eq!(e.joysticks[1].source, JoySource::Controller { slot: 2 });
        assert_eq!(e.joysticks[1].details.name, "XInput Controller 3");
        assert!(e.keyboards.is_empty());
    }

    #[test]
    fn empty_joystick_is_listed_but_not_opened() {
        let legacy = VirtualLegacy::new();
        let mut info = VirtualLegacy::gamepad_info(7, "Button-less Box", 0x1234, 0x0001);
        info.axis_ranges = [None; NUM_JOY_AXES];
        info.num_buttons = 0;
        info.num_povs = 0;
        let id = legacy.add_joystick(info);
        let mut set = BackendSet::new().with_legacy(legacy.clone());
        let e = enumerate(&mut set, &InputConfig::default());
        assert_eq!(e.joysticks.len(), 1);
        assert!(!e.joysticks[0].pollable);
        assert!(!legacy.is_open(id));
    }
}
