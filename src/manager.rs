//! The input system.
//!
//! [`InputSystem`] owns the bound backends, the canonical device tables built at
//! construction, and the latest [`Snapshot`]. Its behaviour is split across
//! modules by concern:
//! - construction and teardown (this module),
//! - claiming devices on focus changes (`activation`),
//! - the per-frame read (`poll`),
//! - force feedback ([`force_feedback`](crate::force_feedback)),
//! - read-only queries ([`query`](crate::query)).
//!
//! Everything runs on the thread that owns the host window; nothing locks.
//!
//! # Example
//! ```
//! use padmux::backends::virtual_input::VirtualLegacy;
//! use padmux::backends::BackendSet;
//! use padmux::config::InputConfig;
//! use padmux::host::HeadlessWindow;
//! use padmux::{DeviceSel, InputSystem};
//!
//! let legacy = VirtualLegacy::new();
//! let backends = BackendSet::new().with_legacy(legacy.clone());
//! let mut input = InputSystem::new(InputConfig::default(), HeadlessWindow::new(640, 480), backends);
//!
//! input.activate();
//! input.poll().expect("poll");
//! assert_eq!(input.num_keyboards(), 1);
//! let space = input.key_index("SPACE").unwrap();
//! legacy.set_key(0x39, true);
//! input.poll().expect("poll");
//! assert!(input.is_key_pressed(DeviceSel::Num(0), space));
//! ```

use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::backends::{Availability, BackendSet};
use crate::config::InputConfig;
use crate::device::{ControllerBackend, LegacyBackend, LegacyDevice, RawInputBackend};
use crate::enumerate::{enumerate, Joystick, Keyboard, Mouse};
use crate::error::InputError;
use crate::event::{RawEvent, RawHandle};
use crate::force_feedback::EffectTable;
use crate::host::HostWindow;
use crate::snapshot::Snapshot;

/// Multiplexed keyboard/mouse/joystick input over up to three backends.
pub struct InputSystem {
    pub(crate) config: InputConfig,
    pub(crate) window: Box<dyn HostWindow>,

    pub(crate) raw: Option<Box<dyn RawInputBackend>>,
    pub(crate) legacy: Option<Box<dyn LegacyBackend>>,
    pub(crate) controller: Option<Box<dyn ControllerBackend>>,
    pub(crate) availability: Availability,
    pub(crate) init_status: Result<(), InputError>,

    pub(crate) raw_mode: bool,
    pub(crate) controller_mode: bool,
    pub(crate) keyboards: Vec<Keyboard>,
    pub(crate) mice: Vec<Mouse>,
    pub(crate) joysticks: Vec<Joystick>,
    pub(crate) raw_keyboard_index: HashMap<RawHandle, usize>,
    pub(crate) raw_mouse_index: HashMap<RawHandle, usize>,

    pub(crate) snapshot: Snapshot,
    pub(crate) raw_scratch: Vec<RawEvent>,

    pub(crate) active: bool,
    /// Legacy devices currently claimed.
    pub(crate) claimed: HashSet<LegacyDevice>,
    /// Claimed devices whose last read reported lost focus; re-claimed next poll.
    pub(crate) lost: HashSet<LegacyDevice>,
    pub(crate) effects: EffectTable,
    pub(crate) mouse_grabbed: bool,
}

impl InputSystem {
    /// Enumerate devices across `backends` and build the input system.
    ///
    /// Never fails: when no backend is usable the system reports zero devices and
    /// [`init_status`](Self::init_status) returns [`InputError::BackendUnavailable`].
    pub fn new(
        config: InputConfig,
        window: impl HostWindow + 'static,
        mut backends: BackendSet,
    ) -> Self {
        let availability = backends.availability();
        let found = enumerate(&mut backends, &config);

        let uses_raw = found.raw_mode;
        let uses_legacy = availability.legacy;
        let uses_controller = found.controller_mode;
        let init_status = if uses_raw || uses_legacy || uses_controller {
            Ok(())
        } else {
            warn!(?availability, "no usable input backend; reporting zero devices");
            Err(InputError::BackendUnavailable)
        };

        let snapshot = Snapshot::sized(found.keyboards.len(), found.mice.len(), found.joysticks.len());

        let system = Self {
            config,
            window: Box::new(window),
            raw: backends.raw,
            legacy: backends.legacy,
            controller: backends.controller,
            availability,
            init_status,
            raw_mode: found.raw_mode,
            controller_mode: found.controller_mode,
            keyboards: found.keyboards,
            mice: found.mice,
            joysticks: found.joysticks,
            raw_keyboard_index: found.raw_keyboard_index,
            raw_mouse_index: found.raw_mouse_index,
            snapshot,
            raw_scratch: Vec::new(),
            active: false,
            claimed: HashSet::new(),
            lost: HashSet::new(),
            effects: EffectTable::default(),
            mouse_grabbed: false,
        };
        info!(name = %system.name(), "input system ready");
        system
    }

    /// Outcome of initialization.
    pub fn init_status(&self) -> Result<(), InputError> {
        self.init_status.clone()
    }

    /// Which backends were bound (not necessarily used).
    pub fn availability(&self) -> Availability {
        self.availability
    }

    pub fn config(&self) -> &InputConfig {
        &self.config
    }

    /// Keyboards and mice come from the raw event stream.
    pub fn uses_raw_input(&self) -> bool {
        self.raw_mode
    }

    /// Controller-compatible joysticks are served by the controller backend.
    pub fn uses_controller_backend(&self) -> bool {
        self.controller_mode
    }

    /// Short description of the backend combination in use: `"RawInput/XInput"`,
    /// `"RawInput/DirectInput"`, `"XInput"` or `"DirectInput"` with the native
    /// backends. The raw stream is named only while it serves keyboards and mice.
    pub fn name(&self) -> String {
        let joy = if self.controller_mode {
            self.controller.as_ref().map(|b| b.name())
        } else {
            self.legacy.as_ref().map(|b| b.name())
        };
        let raw = if self.raw_mode {
            self.raw.as_ref().map(|b| b.name())
        } else {
            None
        };
        match (raw, joy) {
            (Some(a), Some(b)) => format!("{a}/{b}"),
            (Some(a), None) | (None, Some(a)) => a.to_string(),
            (None, None) => "None".to_string(),
        }
    }

    /// Release every claim, effect and handle. Called on drop.
    fn shutdown(&mut self) {
        self.deactivate();
        self.release_all_effects();

        if let Some(legacy) = self.legacy.as_mut() {
            for joy in &self.joysticks {
                if let crate::enumerate::JoySource::Legacy { id, .. } = joy.source {
                    if joy.pollable {
                        legacy.close_joystick(id);
                    }
                }
            }
        }
    }
}

impl Drop for InputSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for InputSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSystem")
            .field("name", &self.name())
            .field("keyboards", &self.keyboards.len())
            .field("mice", &self.mice.len())
            .field("joysticks", &self.joysticks.len())
            .field("active", &self.active)
            .finish()
    }
}
