//! XInput controller backend (slots 0–3).
//!
//! Reports native values only: signed 16-bit thumbsticks, 8-bit triggers and the
//! `wButtons` bitfield. Normalization, Y inversion and the D-pad hat live in the
//! poller so every backend is treated the same way.

use tracing::debug;
use windows_sys::Win32::Foundation::{ERROR_DEVICE_NOT_CONNECTED, ERROR_SUCCESS};
use windows_sys::Win32::UI::Input::XboxController::*;

use crate::device::{ControllerBackend, ControllerCaps, ControllerReading};
use crate::error::BackendError;

/// Number of XInput user slots.
const SLOTS: u32 = 4;

/// XInput-backed controller slots.
#[derive(Debug, Default)]
pub struct WinXInput {
    /// Slots seen connected on the previous read, for connect/disconnect logging.
    connected: [bool; SLOTS as usize],
}

impl WinXInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn note_connection(&mut self, slot: u32, now: bool) {
        if let Some(was) = self.connected.get_mut(slot as usize) {
            if *was != now {
                debug!(slot, connected = now, "xinput slot changed");
                *was = now;
            }
        }
    }
}

fn map_status(code: u32) -> Result<(), BackendError> {
    match code {
        ERROR_SUCCESS => Ok(()),
        ERROR_DEVICE_NOT_CONNECTED => Err(BackendError::NotConnected),
        other => Err(BackendError::Os(other)),
    }
}

impl ControllerBackend for WinXInput {
    fn slot_count(&self) -> u32 {
        SLOTS
    }

    fn capabilities(&mut self, slot: u32) -> Result<ControllerCaps, BackendError> {
        // FFI struct: must be manually zeroed
        let mut caps: XINPUT_CAPABILITIES = unsafe { std::mem::zeroed() };
        map_status(unsafe { XInputGetCapabilities(slot, XINPUT_FLAG_GAMEPAD, &mut caps) })?;
        let vib = caps.Vibration;
        Ok(ControllerCaps {
            vibration: vib.wLeftMotorSpeed != 0 || vib.wRightMotorSpeed != 0,
        })
    }

    fn read_state(&mut self, slot: u32) -> Result<ControllerReading, BackendError> {
        let mut state: XINPUT_STATE = unsafe { std::mem::zeroed() };
        let res = map_status(unsafe { XInputGetState(slot, &mut state) });
        self.note_connection(slot, res.is_ok());
        res?;

        let gp = state.Gamepad;
        Ok(ControllerReading {
            buttons: gp.wButtons,
            left_trigger: gp.bLeftTrigger,
            right_trigger: gp.bRightTrigger,
            thumb_lx: gp.sThumbLX,
            thumb_ly: gp.sThumbLY,
            thumb_rx: gp.sThumbRX,
            thumb_ry: gp.sThumbRY,
        })
    }

    fn set_vibration(&mut self, slot: u32, left: u16, right: u16) -> Result<(), BackendError> {
        let vib = XINPUT_VIBRATION {
            wLeftMotorSpeed: left,
            wRightMotorSpeed: right,
        };
        map_status(unsafe { XInputSetState(slot, &vib) })
    }
}
