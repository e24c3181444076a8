//! Force-feedback routing through the input system.

use padmux::backends::virtual_input::{VirtualController, VirtualLegacy};
use padmux::backends::BackendSet;
use padmux::device::{ControllerCaps, EffectKind, LegacyJoyId};
use padmux::host::HeadlessWindow;
use padmux::{ForceFeedbackCmd, InputConfig, InputError, InputSystem, JoyAxis, NUM_JOY_AXES};

fn ff_config() -> InputConfig {
    InputConfig {
        force_feedback: true,
        ..Default::default()
    }
}

fn ff_wheel(legacy: &VirtualLegacy) -> LegacyJoyId {
    let mut info = VirtualLegacy::gamepad_info(11, "Racing Wheel", 0x046d, 0xc24f);
    info.ff_axes = [false; NUM_JOY_AXES];
    info.ff_axes[JoyAxis::X.index()] = true;
    legacy.add_joystick(info)
}

#[test]
fn constant_force_then_stop_leaves_no_effect_behind() {
    let legacy = VirtualLegacy::new();
    let id = ff_wheel(&legacy);
    let mut sys = InputSystem::new(
        ff_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_legacy(legacy.clone()),
    );
    assert!(sys.joy_details(0).unwrap().has_ffeedback);

    sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(100))
        .unwrap();
    let live = legacy.effects(id);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].kind, EffectKind::ConstantForce);
    assert_eq!(live[0].magnitude, 10_000);

    // Repeating the same command does not stack effects.
    sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(100))
        .unwrap();
    assert_eq!(legacy.effects(id).len(), 1);
    assert_eq!(legacy.effects_created(), 1);

    sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::Stop)
        .unwrap();
    assert!(legacy.effects(id).is_empty());
}

#[test]
fn vibrate_uses_a_periodic_effect() {
    let legacy = VirtualLegacy::new();
    let id = ff_wheel(&legacy);
    let mut sys = InputSystem::new(
        ff_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_legacy(legacy.clone()),
    );
    sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::Vibrate(25))
        .unwrap();
    let live = legacy.effects(id);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].kind, EffectKind::Sine);
    assert_eq!(live[0].magnitude, 2_500);
}

#[test]
fn joystick_without_force_feedback_reports_unsupported() {
    let legacy = VirtualLegacy::new();
    legacy.add_joystick(VirtualLegacy::gamepad_info(12, "Plain Stick", 0x0001, 0x0002));
    let mut sys = InputSystem::new(
        ff_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_legacy(legacy.clone()),
    );
    let err = sys
        .process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(50))
        .unwrap_err();
    assert!(matches!(err, InputError::CapabilityUnsupported { .. }));
    assert_eq!(legacy.effects_created(), 0);

    // Out-of-range joysticks are unsupported too, never a panic.
    assert!(sys
        .process_force_feedback_cmd(7, JoyAxis::X, ForceFeedbackCmd::Stop)
        .is_err());
}

#[test]
fn controller_motors_follow_force_direction() {
    let controller = VirtualController::new();
    controller.connect(0, ControllerCaps { vibration: true });
    let mut sys = InputSystem::new(
        ff_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_controller(controller.clone()),
    );

    sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(100))
        .unwrap();
    assert_eq!(controller.vibration(0), (0, 65_500));

    sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::ConstantForce(-50))
        .unwrap();
    assert_eq!(controller.vibration(0), (32_750, 0));

    sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::Stop)
        .unwrap();
    assert_eq!(controller.vibration(0), (0, 0));
}

#[test]
fn shutdown_stops_every_device() {
    let legacy = VirtualLegacy::new();
    let id = ff_wheel(&legacy);
    let controller = VirtualController::new();
    controller.connect(0, ControllerCaps { vibration: true });

    let mut sys = InputSystem::new(
        ff_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new()
            .with_legacy(legacy.clone())
            .with_controller(controller.clone()),
    );
    // Controller-only slots are not listed when a legacy backend exists, so the
    // wheel is the only joystick here.
    assert_eq!(sys.num_joysticks(), 1);
    sys.activate();
    sys.process_force_feedback_cmd(0, JoyAxis::X, ForceFeedbackCmd::SelfCenter(40))
        .unwrap();
    assert_eq!(legacy.effects(id).len(), 1);

    drop(sys);
    assert!(legacy.effects(id).is_empty());
    assert!(!legacy.is_acquired(padmux::device::LegacyDevice::Joystick(id)));
    assert!(!legacy.is_open(id));
}
