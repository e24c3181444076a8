//! Force feedback.
//!
//! Commands carry a magnitude in percent (`-100..=100`, clamped). Their effect
//! depends on which backend serves the joystick:
//!
//! - **Legacy** devices keep at most one native effect per axis. A command of the
//!   same kind updates the running effect; a different kind replaces it. `Stop`
//!   releases every effect on the device.
//! - **Controller** devices have two rumble motors. A constant force on the X axis
//!   drives the right motor when positive and the left motor when negative;
//!   `Vibrate` drives both. Each motor runs at the stronger of the two requests.
//!   `SelfCenter` has no controller equivalent.
//!
//! Commands for devices or axes without force feedback, or issued while force
//! feedback is disabled, do nothing and return
//! [`InputError::CapabilityUnsupported`].

use std::collections::HashMap;

use tracing::{debug, info};

use crate::device::{EffectHandle, EffectKind, EffectParams};
use crate::enumerate::JoySource;
use crate::error::InputError;
use crate::manager::InputSystem;
use crate::metadata::JoyAxis;

/// Full-scale legacy effect magnitude.
pub const LEGACY_FF_MAX: i32 = 10_000;
/// Legacy native units per percent.
pub const LEGACY_FF_SCALE: i32 = LEGACY_FF_MAX / 100;
/// Full-scale controller motor speed.
pub const CONTROLLER_FF_MAX: i32 = 65_535;
/// Controller motor units per percent.
pub const CONTROLLER_FF_SCALE: i32 = CONTROLLER_FF_MAX / 100;

/// A force-feedback request. Magnitudes are percentages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceFeedbackCmd {
    /// Stop every effect on the device.
    Stop,
    /// Spring pulling the axis back to centre.
    SelfCenter(i32),
    /// Steady push along the axis; the sign gives the direction.
    ConstantForce(i32),
    /// Periodic rumble.
    Vibrate(i32),
}

/// Motor requests for one controller joystick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Motors {
    constant_left: u16,
    constant_right: u16,
    vibrate: u16,
    /// Last `(left, right)` pair sent to the backend.
    sent: (u16, u16),
}

impl Motors {
    fn output(&self) -> (u16, u16) {
        (
            self.constant_left.max(self.vibrate),
            self.constant_right.max(self.vibrate),
        )
    }
}

/// Live effects, keyed by joystick index.
#[derive(Debug, Default)]
pub(crate) struct EffectTable {
    legacy: HashMap<(usize, JoyAxis), (EffectParams, EffectHandle)>,
    motors: HashMap<usize, Motors>,
}

impl EffectTable {
    /// Number of live legacy effects on `joy`.
    #[cfg(test)]
    pub(crate) fn legacy_count(&self, joy: usize) -> usize {
        self.legacy.keys().filter(|(j, _)| *j == joy).count()
    }
}

fn percent(m: i32) -> i32 {
    m.clamp(-100, 100)
}

fn motor_speed(pct: i32) -> u16 {
    (pct.clamp(0, 100) * CONTROLLER_FF_SCALE) as u16
}

impl InputSystem {
    /// Send a force-feedback command to `axis` of joystick `joy`.
    pub fn process_force_feedback_cmd(
        &mut self,
        joy: usize,
        axis: JoyAxis,
        cmd: ForceFeedbackCmd,
    ) -> Result<(), InputError> {
        let Some(joystick) = self.joysticks.get(joy) else {
            return Err(unsupported(format!("joystick {joy}"), "force feedback"));
        };
        let device = joystick.details.name.clone();
        if !self.config.force_feedback {
            debug!(joy, ?cmd, "force feedback disabled; command ignored");
            return Err(unsupported(device, "force feedback"));
        }
        if !joystick.details.has_ffeedback {
            return Err(unsupported(device, "force feedback"));
        }
        if cmd != ForceFeedbackCmd::Stop && !joystick.details.axis_has_ff[axis.index()] {
            return Err(unsupported(device, "force feedback on this axis"));
        }

        match joystick.source.clone() {
            JoySource::Legacy { id, .. } => {
                let Some(kind) = legacy_kind(cmd) else {
                    self.release_legacy_effects(joy);
                    return Ok(());
                };
                let magnitude = match cmd {
                    // Spring strength has no direction.
                    ForceFeedbackCmd::SelfCenter(m) => percent(m).abs(),
                    ForceFeedbackCmd::ConstantForce(m) | ForceFeedbackCmd::Vibrate(m) => percent(m),
                    ForceFeedbackCmd::Stop => 0,
                } * LEGACY_FF_SCALE;
                let params = EffectParams {
                    kind,
                    axis,
                    magnitude,
                };
                self.apply_legacy_effect(joy, id, device, params)
            }
            JoySource::Controller { slot } => {
                let mut motors = self.effects.motors.get(&joy).copied().unwrap_or_default();
                match cmd {
                    ForceFeedbackCmd::Stop => {
                        motors.constant_left = 0;
                        motors.constant_right = 0;
                        motors.vibrate = 0;
                    }
                    ForceFeedbackCmd::SelfCenter(_) => {
                        return Err(unsupported(device, "self-centering"));
                    }
                    ForceFeedbackCmd::ConstantForce(m) => {
                        let m = percent(m);
                        motors.constant_right = motor_speed(m);
                        motors.constant_left = motor_speed(-m);
                    }
                    ForceFeedbackCmd::Vibrate(m) => {
                        motors.vibrate = motor_speed(percent(m).abs());
                    }
                }

                let out = motors.output();
                if out != motors.sent {
                    let controller = self
                        .controller
                        .as_mut()
                        .ok_or_else(|| unsupported(device.clone(), "force feedback"))?;
                    controller
                        .set_vibration(slot, out.0, out.1)
                        .map_err(|reason| InputError::EffectFailed {
                            device: device.clone(),
                            reason,
                        })?;
                    debug!(slot, left = out.0, right = out.1, "controller vibration set");
                    motors.sent = out;
                }
                self.effects.motors.insert(joy, motors);
                Ok(())
            }
        }
    }

    fn apply_legacy_effect(
        &mut self,
        joy: usize,
        id: crate::device::LegacyJoyId,
        device: String,
        params: EffectParams,
    ) -> Result<(), InputError> {
        let Some(legacy) = self.legacy.as_mut() else {
            return Err(unsupported(device, "force feedback"));
        };
        let key = (joy, params.axis);
        let failed = |reason| InputError::EffectFailed {
            device: device.clone(),
            reason,
        };

        match self.effects.legacy.get(&key).copied() {
            Some((current, _)) if current == params => Ok(()),
            Some((current, handle)) if current.kind == params.kind => {
                legacy.update_effect(handle, &params).map_err(failed)?;
                self.effects.legacy.insert(key, (params, handle));
                Ok(())
            }
            existing => {
                if let Some((old, handle)) = existing {
                    legacy.release_effect(handle);
                    self.effects.legacy.remove(&key);
                    debug!(joy, axis = ?params.axis, kind = ?old.kind, "effect released for a different kind");
                }
                let handle = legacy.create_effect(id, &params).map_err(failed)?;
                info!(joy, axis = ?params.axis, kind = ?params.kind, "effect created");
                self.effects.legacy.insert(key, (params, handle));
                Ok(())
            }
        }
    }

    fn release_legacy_effects(&mut self, joy: usize) {
        let Some(legacy) = self.legacy.as_mut() else {
            return;
        };
        self.effects.legacy.retain(|&(j, axis), (_, handle)| {
            if j != joy {
                return true;
            }
            legacy.release_effect(*handle);
            debug!(joy, ?axis, "effect released");
            false
        });
    }

    /// Stop every effect and motor. Used at shutdown.
    pub(crate) fn release_all_effects(&mut self) {
        if let Some(legacy) = self.legacy.as_mut() {
            for (_, (_, handle)) in self.effects.legacy.drain() {
                legacy.release_effect(handle);
            }
        }
        if let Some(controller) = self.controller.as_mut() {
            for (joy, motors) in self.effects.motors.drain() {
                if motors.sent == (0, 0) {
                    continue;
                }
                if let Some(JoySource::Controller { slot }) = self.joysticks.get(joy).map(|j| &j.source) {
                    // The pad may already be gone; nothing left to stop then.
                    let _ = controller.set_vibration(*slot, 0, 0);
                }
            }
        }
    }
}

fn legacy_kind(cmd: ForceFeedbackCmd) -> Option<EffectKind> {
    match cmd {
        ForceFeedbackCmd::Stop => None,
        ForceFeedbackCmd::SelfCenter(_) => Some(EffectKind::Spring),
        ForceFeedbackCmd::ConstantForce(_) => Some(EffectKind::ConstantForce),
        ForceFeedbackCmd::Vibrate(_) => Some(EffectKind::Sine),
    }
}

fn unsupported(device: String, what: &'static str) -> InputError {
    InputError::CapabilityUnsupported { device, what }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{VirtualController, VirtualLegacy};
    use crate::backends::BackendSet;
    use crate::config::InputConfig;
    use crate::device::ControllerCaps;
    use crate::host::HeadlessWindow;
    use crate::metadata::NUM_JOY_AXES;

    fn ff_config() -> InputConfig {
        InputConfig {
            force_feedback: true,
            ..Default::default()
        }
    }

    fn wheel(legacy: &VirtualLegacy) -> crate::device::LegacyJoyId {
        let mut info = VirtualLegacy::gamepad_info(9, "FF Wheel", 0x046d, 0xc29b);
        info.ff_axes = [false; NUM_JOY_AXES];
        info.ff_axes[JoyAxis::X.index()] = true;
        legacy.add_joystick(info)
    }

    #[test]
    fn motor_mix_takes_the_stronger_request() {
        let m = Motors {
            constant_left: 0,
            constant_right: motor_speed(40),
            vibrate: motor_speed(10),
            sent: (0, 0),
        };
        assert_eq!(m.output(), (motor_speed(10), motor_speed(40)));
    }

    #[test]
    fn magnitudes_are_clamped() {
        assert_eq!(percent(250), 100);
        assert_eq!(percent(-250), -100);
        assert_eq!(motor_speed(100), 65_500);
        assert_eq!(motor_speed(-5), 0);
    }

    #[test]
    fn same_kind_updates_in_place() {
        let legacy = VirtualLegacy::new();
        let id = wheel(&legacy);
        let mut sys = InputSystem::new(ff_config(), HeadlessWindow::new(64, 64), BackendSet::new().with_legacy(legacy.clone()));

        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(20)).unwrap();
        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(-60)).unwrap();
        assert_eq!(legacy.effects_created(), 1);
        assert_eq!(legacy.effects(id)[0].magnitude, -60 * LEGACY_FF_SCALE);
    }

    #[test]
    fn different_kind_replaces_the_effect() {
        let legacy = VirtualLegacy::new();
        let id = wheel(&legacy);
        let mut sys = InputSystem::new(ff_config(), HeadlessWindow::new(64, 64), BackendSet::new().with_legacy(legacy.clone()));

        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(50)).unwrap();
        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::SelfCenter(-30)).unwrap();
        let live = legacy.effects(id);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].kind, EffectKind::Spring);
        assert_eq!(live[0].magnitude, 30 * LEGACY_FF_SCALE);
        assert_eq!(sys.effects.legacy_count(0), 1);
    }

    #[test]
    fn axis_without_ff_is_unsupported() {
        let legacy = VirtualLegacy::new();
        wheel(&legacy);
        let mut sys = InputSystem::new(ff_config(), HeadlessWindow::new(64, 64), BackendSet::new().with_legacy(legacy.clone()));
        let err = sys
            .process_force_feedback_cmd(0, JoyAxis::Y, ForceFeedbackCmd::Vibrate(50))
            .unwrap_err();
        assert!(matches!(err, InputError::CapabilityUnsupported { .. }));
        assert_eq!(legacy.effects_created(), 0);
    }

    #[test]
    fn disabled_in_config_sends_nothing() {
        let controller = VirtualController::new();
        controller.connect(0, ControllerCaps { vibration: true });
        let mut sys = InputSystem::new(
            InputConfig::default(),
            HeadlessWindow::new(64, 64),
            BackendSet::new().with_controller(controller.clone()),
        );
        assert!(sys
            .process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::Vibrate(100))
            .is_err());
        assert_eq!(controller.vibration(0), (0, 0));
    }

    #[test]
    fn controller_constant_force_picks_a_motor_by_sign() {
        let controller = VirtualController::new();
        controller.connect(0, ControllerCaps { vibration: true });
        let mut sys = InputSystem::new(ff_config(), HeadlessWindow::new(64, 64), BackendSet::new().with_controller(controller.clone()));

        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(50)).unwrap();
        assert_eq!(controller.vibration(0), (0, motor_speed(50)));
        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(-20)).unwrap();
        assert_eq!(controller.vibration(0), (motor_speed(20), 0));
        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::Vibrate(30)).unwrap();
        assert_eq!(controller.vibration(0), (motor_speed(30), motor_speed(30)));

        let err = sys
            .process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::SelfCenter(50))
            .unwrap_err();
        assert!(matches!(err, InputError::CapabilityUnsupported { what: "self-centering", .. }));

        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::Stop).unwrap();
        assert_eq!(controller.vibration(0), (0, 0));
    }

    #[test]
    fn drop_releases_effects() {
        let legacy = VirtualLegacy::new();
        let id = wheel(&legacy);
        let mut sys = InputSystem::new(ff_config(), HeadlessWindow::new(64, 64), BackendSet::new().with_legacy(legacy.clone()));
        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::Vibrate(80)).unwrap();
        assert_eq!(legacy.effects(id).len(), 1);

        drop(sys);
        assert!(legacy.effects(id).is_empty());
    }

    #[test]
    fn drop_stops_rumbling_controllers() {
        let controller = VirtualController::new();
        controller.connect(1, ControllerCaps { vibration: true });
        let mut sys = InputSystem::new(ff_config(), HeadlessWindow::new(64, 64), BackendSet::new().with_controller(controller.clone()));
        sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::Vibrate(80)).unwrap();
        assert_ne!(controller.vibration(1), (0, 0));

        drop(sys);
        assert_eq!(controller.vibration(1), (0, 0));
    }
}
