//! Drive the streamer against the simulated runtime and print each frame.
//!
//! Usage: RUST_LOG=debug cargo run --example simulate
//! A tracker orbits the origin while a controller trigger ramps up; halfway
//! through, the runtime swaps the two devices' indices.

use trackbind::property::{PropertyPath, Value};
use trackbind::sim::{MemoryScene, SimulatedRuntime};
use trackbind::{
    Binding, Buttons, ControllerState, DeviceClass, Pose, Scene, Streamer, StreamerConfig,
};

const FRAMES: u32 = 24;

fn main() {
    env_logger::init();

    let mut runtime = SimulatedRuntime::new();
    runtime.add_device(0, DeviceClass::Hmd, "HMD-0");
    runtime.add_device(3, DeviceClass::GenericTracker, "LHR-WAIST");
    runtime.add_device(4, DeviceClass::Controller, "CTRL-RIGHT");

    let mut scene = MemoryScene::new();
    scene.add_skeleton("Armature", &["hips", "spine"]);
    *scene.properties_mut() = Value::object([(
        "rig",
        Value::object([("grab", Value::Float(0.0)), ("lean", Value::floats([0.0, 0.0]))]),
    )]);

    let mut streamer = Streamer::new(runtime, StreamerConfig::from_env());
    let events = streamer.events();
    if let Err(e) = streamer.start() {
        eprintln!("Failed to start streaming: {}", e);
        std::process::exit(1);
    }

    let created = streamer.create_targets(&mut scene);
    println!("Created {} empties under Root", created);

    let registry = streamer.registry_mut();
    registry.bind("LHR-WAIST", Binding::to_sub_part("Armature", "hips"));
    if let Some(tracker) = registry.get_mut("CTRL-RIGHT") {
        tracker.friendly_name = "Right hand".into();
        tracker.controller.trigger.property = "rig.grab".into();
        tracker.controller.trackpad_x.property = "rig.lean[0]".into();
        tracker.controller.trackpad_x.min = -30.0;
        tracker.controller.trackpad_x.max = 30.0;
    }

    let grab = PropertyPath::parse("rig.grab").ok();
    let mut waist_index = 3;
    let mut hand_index = 4;
    for frame in 0..FRAMES {
        if frame == FRAMES / 2 {
            println!("--- runtime reassigned device indices ---");
            std::mem::swap(&mut waist_index, &mut hand_index);
            let runtime = streamer.runtime_mut();
            runtime.clear_poses();
            runtime.set_index("LHR-WAIST", waist_index);
            runtime.set_index("CTRL-RIGHT", hand_index);
        }

        let t = frame as f64 / FRAMES as f64;
        let angle = t * std::f64::consts::TAU;
        let runtime = streamer.runtime_mut();
        runtime.set_pose(waist_index, orbit(angle));
        runtime.set_pose(hand_index, Pose::from_translation([0.3, 1.2, -0.2]));
        runtime.set_controller(
            hand_index,
            ControllerState {
                trigger: t,
                trackpad: [angle.sin(), 0.0],
                pressed: if frame % 6 == 0 { Buttons::GRIP } else { Buttons::empty() },
            },
        );

        let report = streamer.on_frame_advance(&mut scene);
        let hips = scene
            .bone("Armature", "hips")
            .map(|b| b.matrix.w_axis.truncate())
            .unwrap_or_default();
        let grab = grab
            .as_ref()
            .and_then(|p| scene.properties().get(p))
            .and_then(Value::as_f64)
            .unwrap_or_default();
        println!(
            "frame {:>2}  tracked={} inputs={}  hips=[{:+.3}, {:+.3}, {:+.3}]  grab={:.3}",
            frame, report.tracked, report.inputs_written, hips.x, hips.y, hips.z, grab
        );
    }

    streamer.stop();
    for event in events.try_iter() {
        println!("event: {:?}", event);
    }
}

/// Device circling the origin at 1 m, rotating to face its direction of travel.
fn orbit(angle: f64) -> Pose {
    let (s, c) = angle.sin_cos();
    Pose {
        matrix: [
            [c, 0.0, s, c],
            [0.0, 1.0, 0.0, 1.0],
            [-s, 0.0, c, s],
        ],
        is_valid: true,
    }
}
