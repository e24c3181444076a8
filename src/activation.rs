//! Claiming and releasing devices on focus changes.
//!
//! The legacy backend only delivers data for devices claimed while the host window
//! has focus; the raw stream only delivers packets while registered. Activation
//! does both, and deactivation undoes them.
//!
//! A device that cannot be claimed is skipped: it keeps its last state until the
//! next activation. A device whose read reports lost focus while active is
//! re-claimed at the start of the next poll.

use tracing::{debug, info, warn};

use crate::device::LegacyDevice;
use crate::enumerate::{JoySource, KbmSource};
use crate::error::{BackendError, InputError};
use crate::manager::InputSystem;
use crate::snapshot::KeyboardState;

impl InputSystem {
    /// Claim every device this system reads. Called when the host window gains focus.
    ///
    /// Returns the claims that failed; the affected devices report stale state.
    /// Calling this while already active does nothing.
    pub fn activate(&mut self) -> Vec<InputError> {
        if self.active {
            return Vec::new();
        }
        self.active = true;
        let mut failures = Vec::new();

        if self.raw_mode {
            if let Some(raw) = self.raw.as_mut() {
                if let Err(reason) = raw.register() {
                    warn!(error = %reason, "raw input registration failed");
                    failures.push(InputError::DeviceClaimFailed {
                        device: "raw input stream".into(),
                        reason,
                    });
                }
            }
        }

        for (device, name) in self.legacy_devices() {
            if let Err(reason) = self.claim(device) {
                warn!(device = %name, error = %reason, "device claim failed; state will be stale");
                failures.push(InputError::DeviceClaimFailed { device: name, reason });
            }
        }

        info!(claimed = self.claimed.len(), failed = failures.len(), "input activated");
        failures
    }

    /// Release every claim. Called when the host window loses focus.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if self.raw_mode {
            if let Some(raw) = self.raw.as_mut() {
                raw.unregister();
            }
            // Release packets for held keys and buttons will never arrive.
            for kbd in &mut self.snapshot.keyboards {
                *kbd = KeyboardState::default();
            }
            for mouse in self.snapshot.mice.iter_mut().chain(Some(&mut self.snapshot.combined_mouse)) {
                mouse.buttons = Default::default();
            }
        }
        if let Some(legacy) = self.legacy.as_mut() {
            for device in self.claimed.drain() {
                legacy.unacquire(device);
            }
        }
        self.lost.clear();
        info!("input deactivated");
    }

    /// Forward a host focus notification.
    pub fn on_focus_changed(&mut self, focused: bool) -> Vec<InputError> {
        if focused {
            self.activate()
        } else {
            self.deactivate();
            Vec::new()
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Legacy devices this system reads, with display names.
    fn legacy_devices(&self) -> Vec<(LegacyDevice, String)> {
        let mut out = Vec::new();
        if let Some(kbd) = self.keyboards.iter().find(|k| k.source == KbmSource::Legacy) {
            out.push((LegacyDevice::Keyboard, kbd.details.name.clone()));
        }
        if let Some(mouse) = self.mice.iter().find(|m| m.source == KbmSource::Legacy) {
            out.push((LegacyDevice::Mouse, mouse.details.name.clone()));
        }
        for joy in self.joysticks.iter().filter(|j| j.pollable) {
            if let JoySource::Legacy { id, .. } = joy.source {
                out.push((LegacyDevice::Joystick(id), joy.details.name.clone()));
            }
        }
        out
    }

    fn claim(&mut self, device: LegacyDevice) -> Result<(), BackendError> {
        let legacy = self.legacy.as_mut().ok_or(BackendError::NotConnected)?;
        legacy.acquire(device)?;
        self.claimed.insert(device);
        Ok(())
    }

    /// Note that `device` lost its claim during a read.
    pub(crate) fn mark_lost(&mut self, device: LegacyDevice) {
        if self.claimed.contains(&device) && self.lost.insert(device) {
            debug!(?device, "device input lost");
        }
    }

    /// Re-claim devices that lost focus since the last poll. Devices that still
    /// refuse stay marked and are retried next frame.
    pub(crate) fn reclaim_lost(&mut self) {
        if !self.active || self.lost.is_empty() {
            return;
        }
        let Some(legacy) = self.legacy.as_mut() else {
            return;
        };
        self.lost.retain(|&device| match legacy.acquire(device) {
            Ok(()) => {
                debug!(?device, "device re-claimed");
                false
            }
            Err(e) => {
                debug!(?device, error = %e, "re-claim failed");
                true
            }
        });
    }

    /// Whether reads of `device` should be attempted this frame.
    pub(crate) fn is_claimed(&self, device: LegacyDevice) -> bool {
        self.claimed.contains(&device) && !self.lost.contains(&device)
    }
}
