//! End-to-end behaviour of the input system over virtual backends.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use padmux::backends::virtual_input::{VirtualController, VirtualLegacy, VirtualRawInput};
use padmux::backends::BackendSet;
use padmux::device::{pad, ControllerCaps, ControllerReading, LegacyDevice};
use padmux::host::HeadlessWindow;
use padmux::{
    BackendKind, DeviceSel, InputConfig, InputError, InputSystem, JoyAxis, MouseAxis, PovDir,
    AXIS_MAX, AXIS_MIN,
};

fn raw_config() -> InputConfig {
    InputConfig {
        raw_input: true,
        ..Default::default()
    }
}

#[test]
fn no_backends_means_zero_devices() {
    let mut sys = InputSystem::new(InputConfig::default(), HeadlessWindow::new(640, 480), BackendSet::new());
    assert_eq!(sys.init_status(), Err(InputError::BackendUnavailable));
    assert_eq!(sys.num_keyboards(), 0);
    assert_eq!(sys.num_mice(), 0);
    assert_eq!(sys.num_joysticks(), 0);
    assert!(sys.activate().is_empty());
    assert_eq!(sys.poll(), Ok(()));
    assert_eq!(sys.name(), "None");
}

#[test]
fn joystick_assignment_is_disjoint() {
    let legacy = VirtualLegacy::new();
    let mut ig = VirtualLegacy::gamepad_info(1, "Wireless Pad", 0x1234, 0x5678);
    ig.path = Some("\\\\?\\HID#VID_1234&PID_5678&IG_00#7&1".into());
    legacy.add_joystick(ig);
    legacy.add_joystick(VirtualLegacy::gamepad_info(2, "Xbox 360 Controller", 0x045e, 0x028e));
    legacy.add_joystick(VirtualLegacy::gamepad_info(3, "Throttle", 0x044f, 0x0404));
    let controller = VirtualController::new();
    controller.connect(0, ControllerCaps::default());
    controller.connect(1, ControllerCaps::default());

    let sys = InputSystem::new(
        InputConfig::default(),
        HeadlessWindow::new(640, 480),
        BackendSet::new()
            .with_legacy(legacy.clone())
            .with_controller(controller),
    );

    assert_eq!(sys.num_joysticks(), 3);
    let backends: Vec<_> = (0..3).map(|j| sys.joy_details(j).unwrap().backend).collect();
    assert_eq!(
        backends,
        [BackendKind::Controller, BackendKind::Controller, BackendKind::Legacy]
    );
    let names: HashSet<_> = (0..3).map(|j| sys.joy_details(j).unwrap().name.clone()).collect();
    assert_eq!(names.len(), 3);
    assert_eq!(sys.name(), "VirtualXInput");
}

#[test]
fn name_mentions_the_raw_stream_only_in_raw_mode() {
    let backends = || {
        BackendSet::new()
            .with_raw(VirtualRawInput::new())
            .with_legacy(VirtualLegacy::new())
    };
    let raw = InputSystem::new(raw_config(), HeadlessWindow::new(640, 480), backends());
    assert_eq!(raw.name(), "VirtualRaw/VirtualLegacy");

    let legacy = InputSystem::new(InputConfig::default(), HeadlessWindow::new(640, 480), backends());
    assert_eq!(legacy.name(), "VirtualLegacy");
}

#[test]
fn raw_mice_move_independently() {
    let raw = VirtualRawInput::new();
    let a = raw.add_mouse("mouse-a");
    let b = raw.add_mouse("mouse-b");
    let mut sys = InputSystem::new(
        raw_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_raw(raw.clone()),
    );
    assert_eq!(sys.num_mice(), 2);
    sys.activate();

    raw.move_mouse(a, 10, 0);
    sys.poll().unwrap();
    assert_eq!(sys.mouse_axis_value(DeviceSel::Num(0), MouseAxis::X), 10);
    assert_eq!(sys.mouse_axis_value(DeviceSel::Num(1), MouseAxis::X), 0);

    raw.move_mouse(b, 3, 4);
    raw.mouse_button(b, 1, true);
    sys.poll().unwrap();
    assert_eq!(sys.mouse_axis_value(DeviceSel::Num(0), MouseAxis::X), 10);
    assert_eq!(sys.mouse_axis_value(DeviceSel::Num(1), MouseAxis::Y), 4);
    assert!(sys.is_mouse_but_pressed(DeviceSel::Num(1), 1));
    assert!(!sys.is_mouse_but_pressed(DeviceSel::Num(0), 1));
    assert!(sys.is_mouse_but_pressed(DeviceSel::Any, 1));
    // The combined mouse sees every device's motion.
    assert_eq!(sys.mouse_axis_value(DeviceSel::Any, MouseAxis::X), 13);
}

#[test]
fn raw_keyboards_are_separate_and_any_ors_them() {
    let raw = VirtualRawInput::new();
    let k1 = raw.add_keyboard("kbd-1");
    let _k2 = raw.add_keyboard("kbd-2");
    let mut sys = InputSystem::new(
        raw_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_raw(raw.clone()),
    );
    sys.activate();
    let a = sys.key_index("A").unwrap();

    raw.key(k1, 0x1E, true);
    sys.poll().unwrap();
    assert!(sys.is_key_pressed(DeviceSel::Num(0), a));
    assert!(!sys.is_key_pressed(DeviceSel::Num(1), a));
    assert!(sys.is_key_pressed(DeviceSel::Any, a));

    raw.key(k1, 0x1E, false);
    sys.poll().unwrap();
    assert!(!sys.is_key_pressed(DeviceSel::Any, a));
}

#[test]
fn legacy_mode_has_one_mouse_following_the_cursor() {
    let legacy = VirtualLegacy::new();
    let window = Rc::new(RefCell::new(HeadlessWindow::new(640, 480)));
    let mut sys = InputSystem::new(
        InputConfig::default(),
        window.clone(),
        BackendSet::new().with_legacy(legacy.clone()),
    );
    assert_eq!(sys.num_mice(), 1);
    assert_eq!(sys.mouse_details(0).unwrap().backend, BackendKind::Legacy);
    sys.activate();

    window.borrow_mut().cursor = Some((120, 45));
    legacy.scroll(240);
    legacy.set_mouse_button(0, true);
    sys.poll().unwrap();

    assert_eq!(sys.mouse_axis_value(DeviceSel::Num(0), MouseAxis::X), 120);
    assert_eq!(sys.mouse_axis_value(DeviceSel::Any, MouseAxis::Y), 45);
    assert_eq!(sys.mouse_axis_value(DeviceSel::Num(0), MouseAxis::Z), 240);
    assert_eq!(sys.mouse_wheel_dir(DeviceSel::Num(0)), 1);
    assert!(sys.is_mouse_but_pressed(DeviceSel::Any, 0));

    // The wheel direction only lasts for the frame it moved in.
    sys.poll().unwrap();
    assert_eq!(sys.mouse_wheel_dir(DeviceSel::Num(0)), 0);
    assert_eq!(sys.mouse_axis_value(DeviceSel::Num(0), MouseAxis::Z), 240);
}

#[test]
fn controller_triggers_are_independent_axes() {
    let controller = VirtualController::new();
    controller.connect(0, ControllerCaps::default());
    let mut sys = InputSystem::new(
        InputConfig::default(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_controller(controller.clone()),
    );

    controller.set_state(
        0,
        ControllerReading {
            left_trigger: 255,
            ..Default::default()
        },
    );
    sys.poll().unwrap();
    assert_eq!(sys.joy_axis_value(0, JoyAxis::Z), AXIS_MAX);
    assert_eq!(sys.joy_axis_value(0, JoyAxis::RZ), 0);

    controller.set_state(
        0,
        ControllerReading {
            left_trigger: 255,
            right_trigger: 255,
            buttons: pad::DPAD_DOWN | pad::B,
            ..Default::default()
        },
    );
    sys.poll().unwrap();
    assert_eq!(sys.joy_axis_value(0, JoyAxis::Z), AXIS_MAX);
    assert_eq!(sys.joy_axis_value(0, JoyAxis::RZ), AXIS_MAX);
    assert_eq!(sys.joy_pov(0, 0), PovDir::Down);
    assert!(sys.is_joy_but_pressed(0, 1));
}

#[test]
fn unplugged_controller_reads_neutral() {
    let controller = VirtualController::new();
    controller.connect(0, ControllerCaps::default());
    let mut sys = InputSystem::new(
        InputConfig::default(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_controller(controller.clone()),
    );
    controller.set_state(
        0,
        ControllerReading {
            buttons: pad::A,
            ..Default::default()
        },
    );
    sys.poll().unwrap();
    assert!(sys.is_joy_but_pressed(0, 0));

    controller.disconnect(0);
    sys.poll().unwrap();
    assert!(!sys.is_joy_but_pressed(0, 0));
}

#[test]
fn legacy_joystick_axes_hats_and_buttons() {
    let legacy = VirtualLegacy::new();
    let id = legacy.add_joystick(VirtualLegacy::gamepad_info(4, "Flight Stick", 0x044f, 0xb10a));
    let mut sys = InputSystem::new(
        InputConfig::default(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_legacy(legacy.clone()),
    );
    sys.activate();

    sys.poll().unwrap();
    assert_eq!(sys.joy_axis_value(0, JoyAxis::X), 0);

    legacy.set_axis(id, JoyAxis::X, 0);
    legacy.set_axis(id, JoyAxis::Y, 65535);
    legacy.set_pov(id, 0, Some(4500));
    legacy.set_button(id, 9, true);
    sys.poll().unwrap();

    assert_eq!(sys.joy_axis_value(0, JoyAxis::X), AXIS_MIN);
    assert_eq!(sys.joy_axis_value(0, JoyAxis::Y), AXIS_MAX);
    assert_eq!(sys.joy_pov(0, 0), PovDir::UpRight);
    assert!(sys.is_joy_pov_in_dir(0, 0, PovDir::Up));
    assert!(sys.is_joy_pov_in_dir(0, 0, PovDir::Right));
    assert!(!sys.is_joy_pov_in_dir(0, 0, PovDir::Down));
    assert!(sys.is_joy_but_pressed(0, 9));
}

#[test]
fn poll_without_new_input_is_idempotent() {
    let raw = VirtualRawInput::new();
    let kbd = raw.add_keyboard("kbd");
    let mouse = raw.add_mouse("mouse");
    let legacy = VirtualLegacy::new();
    let id = legacy.add_joystick(VirtualLegacy::gamepad_info(5, "Stick", 0x0001, 0x0002));

    let mut sys = InputSystem::new(
        InputConfig {
            raw_input: true,
            xinput: false,
            ..Default::default()
        },
        HeadlessWindow::new(640, 480),
        BackendSet::new()
            .with_raw(raw.clone())
            .with_legacy(legacy.clone()),
    );
    sys.activate();

    raw.key(kbd, 0x2A, true);
    raw.move_mouse(mouse, 30, 40);
    raw.mouse_button(mouse, 0, true);
    legacy.set_axis(id, JoyAxis::RX, 1000);
    legacy.set_button(id, 3, true);
    sys.poll().unwrap();

    let first = sys.snapshot().clone();
    sys.poll().unwrap();
    assert_eq!(sys.snapshot(), &first);
    sys.poll().unwrap();
    assert_eq!(sys.snapshot(), &first);
}

#[test]
fn failed_polls_keep_the_previous_snapshot() {
    let legacy = VirtualLegacy::new();
    let id = legacy.add_joystick(VirtualLegacy::gamepad_info(6, "Stick", 0x0001, 0x0002));
    let mut sys = InputSystem::new(
        InputConfig::default(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_legacy(legacy.clone()),
    );
    sys.activate();
    legacy.set_key(0x1C, true);
    legacy.set_button(id, 0, true);
    sys.poll().unwrap();
    let good = sys.snapshot().clone();

    legacy.set_failing(true);
    legacy.set_key(0x1C, false);
    legacy.set_button(id, 0, false);
    assert_eq!(sys.poll(), Err(InputError::PollDegraded));
    assert_eq!(sys.snapshot(), &good);

    legacy.set_failing(false);
    sys.poll().unwrap();
    assert!(!sys.is_joy_but_pressed(0, 0));
}

#[test]
fn degraded_frame_keeps_an_unplugged_pad_as_it_was() {
    let legacy = VirtualLegacy::new();
    let stick = legacy.add_joystick(VirtualLegacy::gamepad_info(7, "Stick", 0x044f, 0xb10a));
    legacy.add_joystick(VirtualLegacy::gamepad_info(8, "Xbox 360 Controller", 0x045e, 0x028e));
    let controller = VirtualController::new();
    controller.connect(0, ControllerCaps::default());
    let mut sys = InputSystem::new(
        InputConfig::default(),
        HeadlessWindow::new(640, 480),
        BackendSet::new()
            .with_legacy(legacy.clone())
            .with_controller(controller.clone()),
    );
    assert_eq!(sys.joy_details(1).unwrap().backend, BackendKind::Controller);
    sys.activate();

    legacy.set_button(stick, 0, true);
    controller.set_state(
        0,
        ControllerReading {
            buttons: pad::A,
            ..Default::default()
        },
    );
    sys.poll().unwrap();
    let good = sys.snapshot().clone();
    assert!(sys.is_joy_but_pressed(1, 0));

    legacy.set_failing(true);
    controller.disconnect(0);
    assert_eq!(sys.poll(), Err(InputError::PollDegraded));
    assert_eq!(sys.snapshot(), &good);

    // Once a frame is kept, the empty slot reads neutral.
    legacy.set_failing(false);
    sys.poll().unwrap();
    assert!(!sys.is_joy_but_pressed(1, 0));
    assert!(sys.is_joy_but_pressed(0, 0));
}

#[test]
fn one_failing_backend_does_not_degrade_the_frame() {
    let raw = VirtualRawInput::new();
    raw.add_keyboard("kbd");
    let controller = VirtualController::new();
    controller.connect(0, ControllerCaps::default());
    let mut sys = InputSystem::new(
        raw_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new()
            .with_raw(raw.clone())
            .with_controller(controller.clone()),
    );
    sys.activate();
    controller.set_failing(true);
    assert_eq!(sys.poll(), Ok(()));
}

#[test]
fn denied_claim_leaves_stale_state_until_next_activation() {
    let legacy = VirtualLegacy::new();
    let mut sys = InputSystem::new(
        InputConfig::default(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_legacy(legacy.clone()),
    );
    let esc = sys.key_index("ESCAPE").unwrap();
    legacy.deny(LegacyDevice::Keyboard, true);
    let failures = sys.activate();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], InputError::DeviceClaimFailed { .. }));

    legacy.set_key(0x01, true);
    sys.poll().unwrap();
    assert!(!sys.is_key_pressed(DeviceSel::Any, esc));

    legacy.deny(LegacyDevice::Keyboard, false);
    sys.on_focus_changed(false);
    assert!(sys.on_focus_changed(true).is_empty());
    sys.poll().unwrap();
    assert!(sys.is_key_pressed(DeviceSel::Any, esc));
}

#[test]
fn lost_focus_is_reclaimed_on_the_next_poll() {
    let legacy = VirtualLegacy::new();
    let mut sys = InputSystem::new(
        InputConfig::default(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_legacy(legacy.clone()),
    );
    sys.activate();
    let q = sys.key_index("Q").unwrap();

    legacy.lose(LegacyDevice::Keyboard);
    legacy.set_key(0x10, true);
    // The read that notices the loss keeps the old state.
    sys.poll().unwrap();
    assert!(!sys.is_key_pressed(DeviceSel::Num(0), q));
    assert!(legacy.is_acquired(LegacyDevice::Mouse));

    sys.poll().unwrap();
    assert!(legacy.is_acquired(LegacyDevice::Keyboard));
    assert!(sys.is_key_pressed(DeviceSel::Num(0), q));
}

#[test]
fn activation_is_reentrant_and_deactivation_releases_raw_keys() {
    let raw = VirtualRawInput::new();
    let kbd = raw.add_keyboard("kbd");
    let mut sys = InputSystem::new(
        raw_config(),
        HeadlessWindow::new(640, 480),
        BackendSet::new().with_raw(raw.clone()),
    );
    assert!(sys.activate().is_empty());
    assert!(sys.activate().is_empty());
    assert!(raw.is_registered());

    raw.key(kbd, 0x39, true);
    sys.poll().unwrap();
    let space = sys.key_index("SPACE").unwrap();
    assert!(sys.is_key_pressed(DeviceSel::Num(0), space));

    sys.deactivate();
    assert!(!raw.is_registered());
    assert!(!sys.is_key_pressed(DeviceSel::Num(0), space));

    // Packets that arrive while unregistered are never delivered.
    raw.key(kbd, 0x39, true);
    sys.poll().unwrap();
    assert!(!sys.is_key_pressed(DeviceSel::Num(0), space));
}
