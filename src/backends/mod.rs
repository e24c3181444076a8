//! Input backends and the capability check.
//!
//! A [`BackendSet`] holds whichever of the three backends could be bound. Any of
//! them may be missing; the input system degrades to fewer devices instead of
//! failing.
//!
//! # Feature flags
//! - **`hid`**: on Windows, use `hidapi` to give joysticks their product names
//!   and interface paths (which feed controller signature matching).
//!
//! Native backends exist for Windows only ([`windows::bind`]). Elsewhere, and in
//! tests, callers build a set from [`virtual_input`] backends.

use crate::device::{ControllerBackend, LegacyBackend, RawInputBackend};
use crate::host::DeviceNamer;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

pub mod virtual_input;

/// Which backends were bound.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Availability {
    pub raw: bool,
    pub legacy: bool,
    pub controller: bool,
}

impl Availability {
    #[inline]
    pub fn any(&self) -> bool {
        self.raw || self.legacy || self.controller
    }
}

/// The bound backends, plus an optional device namer.
#[derive(Default)]
pub struct BackendSet {
    pub raw: Option<Box<dyn RawInputBackend>>,
    pub legacy: Option<Box<dyn LegacyBackend>>,
    pub controller: Option<Box<dyn ControllerBackend>>,
    pub namer: Option<Box<dyn DeviceNamer>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(mut self, raw: impl RawInputBackend + 'static) -> Self {
        self.raw = Some(Box::new(raw));
        self
    }

    pub fn with_legacy(mut self, legacy: impl LegacyBackend + 'static) -> Self {
        self.legacy = Some(Box::new(legacy));
        self
    }

    pub fn with_controller(mut self, controller: impl ControllerBackend + 'static) -> Self {
        self.controller = Some(Box::new(controller));
        self
    }

    pub fn with_namer(mut self, namer: impl DeviceNamer + 'static) -> Self {
        self.namer = Some(Box::new(namer));
        self
    }

    pub fn availability(&self) -> Availability {
        Availability {
            raw: self.raw.is_some(),
            legacy: self.legacy.is_some(),
            controller: self.controller.is_some(),
        }
    }
}

impl std::fmt::Debug for BackendSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendSet")
            .field("raw", &self.raw.as_ref().map(|b| b.name()))
            .field("legacy", &self.legacy.as_ref().map(|b| b.name()))
            .field("controller", &self.controller.as_ref().map(|b| b.name()))
            .field("namer", &self.namer.is_some())
            .finish()
    }
}
