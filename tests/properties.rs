//! Property tests over whole poll cycles.

use padmux::backends::virtual_input::{VirtualLegacy, VirtualRawInput};
use padmux::backends::BackendSet;
use padmux::host::HeadlessWindow;
use padmux::{DeviceSel, InputConfig, InputSystem, JoyAxis, MouseAxis, PovDir, AXIS_MAX, AXIS_MIN};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_legacy_axes_stay_in_range_and_keep_order(a in 0i64..=65535, b in 0i64..=65535) {
        let legacy = VirtualLegacy::new();
        let id = legacy.add_joystick(VirtualLegacy::gamepad_info(1, "Stick", 0x0001, 0x0002));
        let mut sys = InputSystem::new(
            InputConfig::default(),
            HeadlessWindow::new(320, 240),
            BackendSet::new().with_legacy(legacy.clone()),
        );
        sys.activate();

        legacy.set_axis(id, JoyAxis::X, a);
        legacy.set_axis(id, JoyAxis::Y, b);
        sys.poll().unwrap();
        let (na, nb) = (sys.joy_axis_value(0, JoyAxis::X), sys.joy_axis_value(0, JoyAxis::Y));

        prop_assert!((AXIS_MIN..=AXIS_MAX).contains(&na));
        prop_assert!((AXIS_MIN..=AXIS_MAX).contains(&nb));
        if a <= b {
            prop_assert!(na <= nb, "{} -> {}, {} -> {}", a, na, b, nb);
        }
    }

    #[test]
    fn prop_any_pov_angle_maps_to_a_single_state(angle in proptest::option::of(0u32..40000)) {
        let legacy = VirtualLegacy::new();
        let id = legacy.add_joystick(VirtualLegacy::gamepad_info(1, "Hat", 0x0001, 0x0002));
        let mut sys = InputSystem::new(
            InputConfig::default(),
            HeadlessWindow::new(320, 240),
            BackendSet::new().with_legacy(legacy.clone()),
        );
        sys.activate();
        legacy.set_pov(id, 0, angle);
        sys.poll().unwrap();

        let pov = sys.joy_pov(0, 0);
        match angle {
            Some(a) if a < 36000 => prop_assert_ne!(pov, PovDir::Centered),
            _ => prop_assert_eq!(pov, PovDir::Centered),
        }
        // Unused hats are always centred.
        prop_assert_eq!(sys.joy_pov(0, 1), PovDir::Centered);
    }

    #[test]
    fn prop_raw_mouse_stays_inside_the_window(moves in proptest::collection::vec((-2000i32..2000, -2000i32..2000), 1..20)) {
        let raw = VirtualRawInput::new();
        let mouse = raw.add_mouse("mouse");
        let mut sys = InputSystem::new(
            InputConfig { raw_input: true, ..Default::default() },
            HeadlessWindow::new(320, 240),
            BackendSet::new().with_raw(raw.clone()),
        );
        sys.activate();

        for (dx, dy) in moves {
            raw.move_mouse(mouse, dx, dy);
            sys.poll().unwrap();
            for sel in [DeviceSel::Num(0), DeviceSel::Any] {
                let x = sys.mouse_axis_value(sel, MouseAxis::X);
                let y = sys.mouse_axis_value(sel, MouseAxis::Y);
                prop_assert!((0..320).contains(&x));
                prop_assert!((0..240).contains(&y));
            }
        }
    }

    #[test]
    fn prop_repeated_polls_without_input_change_nothing(codes in proptest::collection::vec(1u8..0x58, 0..8)) {
        let legacy = VirtualLegacy::new();
        let mut sys = InputSystem::new(
            InputConfig::default(),
            HeadlessWindow::new(320, 240),
            BackendSet::new().with_legacy(legacy.clone()),
        );
        sys.activate();
        for &c in &codes {
            legacy.set_key(c, true);
        }
        sys.poll().unwrap();
        let first = sys.snapshot().clone();
        sys.poll().unwrap();
        prop_assert_eq!(sys.snapshot(), &first);
    }
}
