//! Frame resolver: placements, velocities and accelerations of query
//! frames, and the supported-inertia/force accumulators.
//!
//! A frame is a fixed offset rigidly attached to a joint, so every frame
//! quantity is the parent joint's quantity transported by that offset. The
//! `*_at` functions take the parent joint and an explicit offset placement;
//! the `get_frame_*` functions look both up from the model's frame table.

use crate::data::{Data, KinematicStage};
use crate::error::KinematicsError;
use crate::kinematics::{ReferenceFrame, check_configuration, forward_kinematics};
use crate::model::{FrameIndex, JointIndex, Model};
use crate::spatial::{Force, Inertia, Motion, Placement, SpatialExt};
use nalgebra::DVector;

/// Recompute the cached absolute placement of every frame from the current
/// joint placements. Requires a prior placement propagation.
pub fn update_frame_placements(model: &Model, data: &mut Data) -> Result<(), KinematicsError> {
    data.require_stage(KinematicStage::Placement)?;
    for (cache, frame) in data.frame_placements.iter_mut().zip(model.frames()) {
        *cache = data.abs_placements[frame.parent_joint] * frame.placement;
    }
    Ok(())
}

/// Recompute the cached absolute placement of a single frame and return a
/// view into the cache. The reference stays valid until the next
/// propagation or frame update.
pub fn update_frame_placement<'a>(
    model: &Model,
    data: &'a mut Data,
    frame_id: FrameIndex,
) -> Result<&'a Placement, KinematicsError> {
    model.check_frame(frame_id)?;
    data.require_stage(KinematicStage::Placement)?;
    let frame = model.frame(frame_id);
    data.frame_placements[frame_id] = data.abs_placements[frame.parent_joint] * frame.placement;
    Ok(&data.frame_placements[frame_id])
}

/// Placement propagation followed by a full frame update, in one call.
pub fn frames_forward_kinematics(
    model: &Model,
    data: &mut Data,
    q: &DVector<f64>,
) -> Result<(), KinematicsError> {
    check_configuration(model, q)?;
    forward_kinematics(model, data, q)?;
    update_frame_placements(model, data)
}

fn transported_motion(
    data: &Data,
    joint_id: JointIndex,
    placement: &Placement,
    motion: &Motion,
    rf: ReferenceFrame,
) -> Motion {
    let abs_joint = &data.abs_placements[joint_id];
    match rf {
        ReferenceFrame::Local => placement.act_inv_motion(motion),
        ReferenceFrame::World => abs_joint.act_motion(motion),
        ReferenceFrame::LocalWorldAligned => {
            let rotation = abs_joint.rotation * placement.rotation;
            let local = placement.act_inv_motion(motion);
            Motion {
                angular: rotation * local.angular,
                linear: rotation * local.linear,
            }
        }
    }
}

/// Spatial velocity of a point rigidly attached to `joint_id` at the offset
/// `placement`, in the requested convention. Requires a velocity-order
/// propagation.
pub fn get_velocity_at(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    placement: &Placement,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    model.check_joint(joint_id)?;
    data.require_stage(KinematicStage::Velocity)?;
    Ok(transported_motion(
        data,
        joint_id,
        placement,
        &data.velocities[joint_id],
        rf,
    ))
}

/// Spatial acceleration of a point rigidly attached to `joint_id` at the
/// offset `placement`. Requires an acceleration-order propagation.
pub fn get_acceleration_at(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    placement: &Placement,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    model.check_joint(joint_id)?;
    data.require_stage(KinematicStage::Acceleration)?;
    Ok(transported_motion(
        data,
        joint_id,
        placement,
        &data.accelerations[joint_id],
        rf,
    ))
}

/// Classical acceleration at an attached point: the spatial acceleration
/// plus the centripetal term `ω × v`, both taken in the requested
/// convention. This is what a sensor at the point would measure, minus
/// gravity.
pub fn get_classical_acceleration_at(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    placement: &Placement,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    let velocity = get_velocity_at(model, data, joint_id, placement, rf)?;
    let acceleration = get_acceleration_at(model, data, joint_id, placement, rf)?;
    Ok(Motion::classical_acceleration(&velocity, &acceleration))
}

/// Spatial velocity of a model frame in the requested convention.
pub fn get_frame_velocity(
    model: &Model,
    data: &Data,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    model.check_frame(frame_id)?;
    let frame = model.frame(frame_id);
    get_velocity_at(model, data, frame.parent_joint, &frame.placement, rf)
}

/// Spatial acceleration of a model frame in the requested convention.
pub fn get_frame_acceleration(
    model: &Model,
    data: &Data,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    model.check_frame(frame_id)?;
    let frame = model.frame(frame_id);
    get_acceleration_at(model, data, frame.parent_joint, &frame.placement, rf)
}

/// Classical acceleration of a model frame in the requested convention.
pub fn get_frame_classical_acceleration(
    model: &Model,
    data: &Data,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    model.check_frame(frame_id)?;
    let frame = model.frame(frame_id);
    get_classical_acceleration_at(model, data, frame.parent_joint, &frame.placement, rf)
}

/// Inertia supported by a frame, expressed in the frame's own axes.
///
/// The sum covers the frame's own attached inertia, the inertia of sibling
/// frames on the same joint that come after it in attachment order, and,
/// when `with_subtree` is set, the composite inertia of every descendant
/// joint (read from the cache filled by
/// [`compute_subtree_inertias`](crate::dynamics::compute_subtree_inertias)).
/// Physically: were the mechanism cut at the frame, this is the inertia of
/// the part after the cut.
pub fn compute_supported_inertia_by_frame(
    model: &Model,
    data: &Data,
    frame_id: FrameIndex,
    with_subtree: bool,
) -> Result<Inertia, KinematicsError> {
    model.check_frame(frame_id)?;
    data.require_stage(KinematicStage::Placement)?;
    if with_subtree && !data.subtree_inertias_valid {
        return Err(KinematicsError::SubtreeInertiasNotComputed);
    }
    let frame = model.frame(frame_id);
    let joint_id = frame.parent_joint;

    // Accumulate in the parent joint's frame first.
    let mut total = frame.placement.act_inertia(&frame.inertia);
    for sibling in model.frames().iter().skip(frame_id + 1) {
        if sibling.parent_joint != joint_id {
            break;
        }
        total += sibling.placement.act_inertia(&sibling.inertia);
    }
    if with_subtree {
        for &child in model.children(joint_id) {
            total += data.rel_placements[child].act_inertia(&data.subtree_inertias[child]);
        }
    }
    Ok(frame.placement.act_inv_inertia(&total))
}

/// Force supported by a frame, expressed in the frame's own axes: what a
/// force-torque sensor mounted at the frame would measure. Requires the
/// per-joint force cache filled by [`rnea`](crate::dynamics::rnea).
///
/// The sum always covers the whole descendant subtree: the Newton-Euler
/// wrench of the partial body after the frame plus the forces transmitted
/// through every child joint. An external force applied at the frame's own
/// parent joint is attributed to the part before the frame and therefore
/// not counted, while external forces on child joints are; this asymmetry
/// is the intended modeling convention, not an oversight.
pub fn compute_supported_force_by_frame(
    model: &Model,
    data: &Data,
    frame_id: FrameIndex,
) -> Result<Force, KinematicsError> {
    model.check_frame(frame_id)?;
    if !data.joint_forces_valid {
        return Err(KinematicsError::JointForcesNotComputed);
    }
    let frame = model.frame(frame_id);
    let joint_id = frame.parent_joint;

    // Newton-Euler wrench of the partial body carried by the parent joint
    // after the frame (the frame itself and its after-siblings).
    let inertia = compute_supported_inertia_by_frame(model, data, frame_id, false)?;
    let velocity = frame.placement.act_inv_motion(&data.velocities[joint_id]);
    let acceleration = frame
        .placement
        .act_inv_motion(&data.gravito_accelerations[joint_id]);
    let mut force = inertia * acceleration + velocity.cross_force(&(inertia * velocity));

    // Forces transmitted through the child joints, transported to the frame.
    let frame_inv = frame.placement.inverse();
    for &child in model.children(joint_id) {
        let frame_m_child = frame_inv * data.rel_placements[child];
        force += frame_m_child.act_force(&data.joint_forces[child]);
    }
    Ok(force)
}
