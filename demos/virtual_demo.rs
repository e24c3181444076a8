use padmux::backends::virtual_input::{VirtualController, VirtualLegacy, VirtualRawInput};
use padmux::backends::BackendSet;
use padmux::device::{pad, ControllerCaps, ControllerReading};
use padmux::host::HeadlessWindow;
use padmux::{BackendKind, DeviceSel, ForceFeedbackCmd, InputConfig, InputSystem, JoyAxis, MouseAxis};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Two keyboards and two mice on the raw stream, a flight stick on the legacy
    // backend and one pad in controller slot 0.
    let raw = VirtualRawInput::new();
    let kbd = raw.add_keyboard("virtual:kbd-left");
    raw.add_keyboard("virtual:kbd-right");
    let mouse = raw.add_mouse("virtual:mouse");
    let gun = raw.add_pointer("virtual:lightgun", true);

    let legacy = VirtualLegacy::new();
    let stick = legacy.add_joystick(VirtualLegacy::gamepad_info(1, "Flight Stick", 0x044f, 0xb10a));
    legacy.add_joystick(VirtualLegacy::gamepad_info(2, "Xbox 360 Controller", 0x045e, 0x028e));

    let controller = VirtualController::new();
    controller.connect(0, ControllerCaps { vibration: true });

    let config = InputConfig {
        raw_input: true,
        force_feedback: true,
        ..Default::default()
    };
    let mut input = InputSystem::new(
        config,
        HeadlessWindow::new(640, 480),
        BackendSet::new()
            .with_raw(raw.clone())
            .with_legacy(legacy.clone())
            .with_controller(controller.clone()),
    );
    for err in input.activate() {
        println!("claim failed: {err}");
    }

    println!("Input system: {}", input.name());
    for k in 0..input.num_keyboards() {
        println!("  keyboard {k}: {:?}", input.key_details(k));
    }
    for m in 0..input.num_mice() {
        println!("  mouse {m}: {:?}", input.mouse_details(m));
    }
    for j in 0..input.num_joysticks() {
        if let Some(d) = input.joy_details(j) {
            println!("  joystick {j}: {} via {} ({} axes, {} buttons)", d.name, d.backend, d.num_axes, d.num_buttons);
        }
    }

    // Frame 1: inject a little of everything.
    raw.key(kbd, 0x39, true);
    raw.move_mouse(mouse, 25, 10);
    raw.place_pointer(gun, 32768, 16384);
    legacy.set_axis(stick, JoyAxis::X, 60000);
    legacy.set_pov(stick, 0, Some(27000));
    controller.set_state(
        0,
        ControllerReading {
            buttons: pad::A | pad::DPAD_UP,
            right_trigger: 200,
            thumb_lx: -16000,
            ..Default::default()
        },
    );

    if let Err(e) = input.poll() {
        println!("poll: {e}");
    }

    let space = input.key_index("SPACE").unwrap_or_default();
    println!("SPACE on keyboard 0: {}", input.is_key_pressed(DeviceSel::Num(0), space));
    println!("SPACE on keyboard 1: {}", input.is_key_pressed(DeviceSel::Num(1), space));
    for m in 0..input.num_mice() {
        println!(
            "mouse {m} at ({}, {})",
            input.mouse_axis_value(DeviceSel::Num(m), MouseAxis::X),
            input.mouse_axis_value(DeviceSel::Num(m), MouseAxis::Y)
        );
    }
    for j in 0..input.num_joysticks() {
        println!(
            "joystick {j}: X={} RZ={} POV={:?} button0={}",
            input.joy_axis_value(j, JoyAxis::X),
            input.joy_axis_value(j, JoyAxis::RZ),
            input.joy_pov(j, 0),
            input.is_joy_but_pressed(j, 0)
        );
    }

    // Rumble the pad, then stop it.
    let pad_joy = (0..input.num_joysticks())
        .find(|&j| input.joy_details(j).is_some_and(|d| d.backend == BackendKind::Controller));
    if let Some(j) = pad_joy {
        if let Err(e) = input.process_force_feedback_cmd(j, JoyAxis::X, ForceFeedbackCmd::Vibrate(60)) {
            println!("force feedback: {e}");
        }
        println!("pad motors: {:?}", controller.vibration(0));
        let _ = input.process_force_feedback_cmd(j, JoyAxis::X, ForceFeedbackCmd::Stop);
        println!("pad motors after stop: {:?}", controller.vibration(0));
    }

    input.deactivate();
}
