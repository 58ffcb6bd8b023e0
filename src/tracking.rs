use crate::error::Error;
use crate::registry::{RotationHistory, Tracker};
use crate::rotation;
use crate::scene::{Keyframe, Scene, TargetId, TransformChannel};
use crate::transform::{self, Calibration};
use crate::types::Pose;

/// Resolve a tracker's binding to a concrete scene target.
///
/// Sub-part names are ignored unless the target is a skeleton with the
/// sub-part toggle on.
pub fn resolve_target<S: Scene + ?Sized>(scene: &S, tracker: &Tracker) -> Result<TargetId, Error> {
    let binding = &tracker.binding;
    let object = binding.object().ok_or_else(|| Error::BindingMissing {
        serial: tracker.serial.clone(),
    })?;
    let kind = scene.target_kind(object).ok_or_else(|| Error::TargetMissing {
        object: object.to_string(),
    })?;

    if !binding.wants_sub_part(kind) {
        return Ok(TargetId::object(object));
    }

    let sub_part = binding.sub_part_name().ok_or_else(|| Error::BindingMissing {
        serial: tracker.serial.clone(),
    })?;
    if !scene.has_sub_part(object, sub_part) {
        return Err(Error::SubPartMissing {
            object: object.to_string(),
            sub_part: sub_part.to_string(),
        });
    }
    Ok(TargetId::sub_part(object, sub_part))
}

/// Move a tracker's target to `pose`.
///
/// The full matrix goes to the scene first; the rotation is then replaced
/// with the continuity-resolved one and remembered for the next frame.
pub fn apply_tracking<S: Scene + ?Sized>(
    scene: &mut S,
    tracker: &Tracker,
    pose: &Pose,
    calibration: &Calibration,
    history: &mut RotationHistory,
) -> Result<TargetId, Error> {
    let target = resolve_target(scene, tracker)?;

    let world = transform::world_transform(pose, &tracker.binding.offset, calibration);
    let rotation_space = if target.sub_part.is_some() {
        scene.world_to_local(&target, world)
    } else {
        world
    };
    scene.set_world_matrix(&target, world);

    let mode = scene.rotation_mode(&target);
    match transform::decompose(&rotation_space) {
        Some((_, quat, _)) => {
            let rotation = rotation::resolve(quat, mode, history.get(&target));
            scene.set_rotation(&target, rotation);
            history.record(target.clone(), rotation);
        }
        None => log::debug!("Degenerate transform for {}, rotation unchanged", target),
    }

    if scene.auto_keyframe() {
        for channel in [
            TransformChannel::Location,
            TransformChannel::rotation_for(mode),
            TransformChannel::Scale,
        ] {
            scene.insert_keyframe(&Keyframe::Transform {
                target: target.clone(),
                channel,
            });
        }
    }

    Ok(target)
}
