//! Jacobian extraction: the 6 x nv partial-velocity matrices of joints and
//! frames, and their time variation.
//!
//! The full-tree builder fills a dense cache of world-expressed columns
//! (one per velocity coordinate, the joint's subspace columns pushed
//! through its absolute placement). Extraction then re-expresses the
//! columns of a joint's ancestor chain into the requested convention in
//! O(nv), independent of tree depth. Columns of joints outside the
//! ancestor chain are never touched, which preserves the tree sparsity:
//! the `_into` variants require the caller to have zeroed the output
//! matrix, the allocating variants zero it themselves.

use crate::data::{Data, KinematicStage};
use crate::error::KinematicsError;
use crate::frames::update_frame_placement;
use crate::kinematics::{ReferenceFrame, check_configuration, check_tangent};
use crate::model::{FrameIndex, JointIndex, Model, UNIVERSE_JOINT};
use crate::spatial::{Matrix6x, Motion, Placement, SpatialExt};
use nalgebra::{DVector, Vector3};

fn write_column(matrix: &mut Matrix6x, col: usize, motion: &Motion) {
    matrix.fixed_view_mut::<3, 1>(0, col).copy_from(&motion.angular);
    matrix.fixed_view_mut::<3, 1>(3, col).copy_from(&motion.linear);
}

fn read_column(matrix: &Matrix6x, col: usize) -> Motion {
    Motion::new(
        Vector3::new(matrix[(0, col)], matrix[(1, col)], matrix[(2, col)]),
        Vector3::new(matrix[(3, col)], matrix[(4, col)], matrix[(5, col)]),
    )
}

fn check_output(model: &Model, matrix: &Matrix6x) -> Result<(), KinematicsError> {
    if matrix.ncols() != model.nv() {
        return Err(KinematicsError::TangentDim {
            expected: model.nv(),
            found: matrix.ncols(),
        });
    }
    Ok(())
}

/// Run the placement propagation for `q` and fill the dense world-frame
/// joint-Jacobian cache in the same pass.
pub fn compute_joint_jacobians(
    model: &Model,
    data: &mut Data,
    q: &DVector<f64>,
) -> Result<(), KinematicsError> {
    check_configuration(model, q)?;
    data.begin_propagation(KinematicStage::Placement);
    data.abs_placements[UNIVERSE_JOINT] = Placement::identity();
    for i in 1..model.njoints() {
        let joint = model.joint(i);
        let q_block = &q.as_slice()[joint.idx_q..joint.idx_q + joint.kind.nq()];
        let rel = joint.placement * joint.kind.relative_placement(q_block);
        let abs = data.abs_placements[joint.parent] * rel;
        for k in 0..joint.kind.nv() {
            let column = abs.act_motion(&joint.kind.subspace_column(k));
            write_column(&mut data.joint_jacobians, joint.idx_v + k, &column);
        }
        data.rel_placements[i] = rel;
        data.abs_placements[i] = abs;
    }
    data.jacobians_valid = true;
    Ok(())
}

/// Run the velocity propagation for `q`, `v` and fill both the dense
/// world-frame Jacobian cache and its time derivative.
pub fn compute_joint_jacobians_time_variation(
    model: &Model,
    data: &mut Data,
    q: &DVector<f64>,
    v: &DVector<f64>,
) -> Result<(), KinematicsError> {
    check_configuration(model, q)?;
    check_tangent(model, v)?;
    data.begin_propagation(KinematicStage::Velocity);
    data.abs_placements[UNIVERSE_JOINT] = Placement::identity();
    data.velocities[UNIVERSE_JOINT] = Motion::zero();
    for i in 1..model.njoints() {
        let joint = model.joint(i);
        let q_block = &q.as_slice()[joint.idx_q..joint.idx_q + joint.kind.nq()];
        let v_block = &v.as_slice()[joint.idx_v..joint.idx_v + joint.kind.nv()];
        let rel = joint.placement * joint.kind.relative_placement(q_block);
        let abs = data.abs_placements[joint.parent] * rel;
        let velocity =
            rel.act_inv_motion(&data.velocities[joint.parent]) + joint.kind.joint_motion(v_block);
        // d/dt of a world column is the spatial bracket with the joint's
        // own world velocity.
        let world_velocity = abs.act_motion(&velocity);
        for k in 0..joint.kind.nv() {
            let column = abs.act_motion(&joint.kind.subspace_column(k));
            write_column(&mut data.joint_jacobians, joint.idx_v + k, &column);
            write_column(
                &mut data.joint_jacobians_dot,
                joint.idx_v + k,
                &world_velocity.cross_motion(&column),
            );
        }
        data.rel_placements[i] = rel;
        data.abs_placements[i] = abs;
        data.velocities[i] = velocity;
    }
    data.jacobians_valid = true;
    data.jacobian_derivatives_valid = true;
    Ok(())
}

/// Re-express a world-cached Jacobian column at the target placement.
fn express_column(world: &Motion, target: &Placement, rf: ReferenceFrame) -> Motion {
    match rf {
        ReferenceFrame::World => *world,
        ReferenceFrame::Local => target.act_inv_motion(world),
        ReferenceFrame::LocalWorldAligned => Motion {
            angular: world.angular,
            linear: world.linear + world.angular.cross(&target.translation.vector),
        },
    }
}

fn extract_jacobian(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    target: &Placement,
    rf: ReferenceFrame,
    out: &mut Matrix6x,
) {
    let mut ancestor = joint_id;
    while ancestor != UNIVERSE_JOINT {
        let joint = model.joint(ancestor);
        for k in 0..joint.kind.nv() {
            let world = read_column(&data.joint_jacobians, joint.idx_v + k);
            write_column(out, joint.idx_v + k, &express_column(&world, target, rf));
        }
        ancestor = joint.parent;
    }
}

/// Fill the columns of `out` that belong to the ancestor chain of
/// `joint_id` with the joint's Jacobian in the requested convention.
/// Requires the cache filled by [`compute_joint_jacobians`]; `out` must
/// have been zeroed by the caller (only relevant columns are written).
pub fn get_joint_jacobian_into(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    rf: ReferenceFrame,
    out: &mut Matrix6x,
) -> Result<(), KinematicsError> {
    model.check_joint(joint_id)?;
    check_output(model, out)?;
    if !data.jacobians_valid {
        return Err(KinematicsError::JacobiansNotComputed);
    }
    let target = data.abs_placements[joint_id];
    extract_jacobian(model, data, joint_id, &target, rf, out);
    Ok(())
}

/// Allocating variant of [`get_joint_jacobian_into`]; zeroes internally.
pub fn get_joint_jacobian(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    rf: ReferenceFrame,
) -> Result<Matrix6x, KinematicsError> {
    let mut out = Matrix6x::zeros(model.nv());
    get_joint_jacobian_into(model, data, joint_id, rf, &mut out)?;
    Ok(out)
}

/// Jacobian of a point rigidly attached to `joint_id` at the offset
/// `placement`. Same cache requirement and zeroed-output contract as
/// [`get_joint_jacobian_into`].
pub fn get_jacobian_at_into(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    placement: &Placement,
    rf: ReferenceFrame,
    out: &mut Matrix6x,
) -> Result<(), KinematicsError> {
    model.check_joint(joint_id)?;
    check_output(model, out)?;
    if !data.jacobians_valid {
        return Err(KinematicsError::JacobiansNotComputed);
    }
    let target = data.abs_placements[joint_id] * placement;
    extract_jacobian(model, data, joint_id, &target, rf, out);
    Ok(())
}

/// Allocating variant of [`get_jacobian_at_into`]; zeroes internally.
pub fn get_jacobian_at(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    placement: &Placement,
    rf: ReferenceFrame,
) -> Result<Matrix6x, KinematicsError> {
    let mut out = Matrix6x::zeros(model.nv());
    get_jacobian_at_into(model, data, joint_id, placement, rf, &mut out)?;
    Ok(out)
}

/// Jacobian of a model frame in the requested convention. Refreshes the
/// frame's cached placement as a side effect. `out` must have been zeroed
/// by the caller.
pub fn get_frame_jacobian_into(
    model: &Model,
    data: &mut Data,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
    out: &mut Matrix6x,
) -> Result<(), KinematicsError> {
    model.check_frame(frame_id)?;
    check_output(model, out)?;
    if !data.jacobians_valid {
        return Err(KinematicsError::JacobiansNotComputed);
    }
    let frame = model.frame(frame_id);
    let target = *update_frame_placement(model, data, frame_id)?;
    extract_jacobian(model, data, frame.parent_joint, &target, rf, out);
    Ok(())
}

/// Allocating variant of [`get_frame_jacobian_into`]; zeroes internally.
pub fn get_frame_jacobian(
    model: &Model,
    data: &mut Data,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
) -> Result<Matrix6x, KinematicsError> {
    let mut out = Matrix6x::zeros(model.nv());
    get_frame_jacobian_into(model, data, frame_id, rf, &mut out)?;
    Ok(out)
}

/// One-shot Jacobian of a single frame at configuration `q`: placement
/// propagation, dense cache fill and single-frame extraction in one call.
/// Equivalent to, but cheaper than, running the three steps separately,
/// because only the queried frame's placement is refreshed. `out` must
/// have been zeroed by the caller.
pub fn compute_frame_jacobian_into(
    model: &Model,
    data: &mut Data,
    q: &DVector<f64>,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
    out: &mut Matrix6x,
) -> Result<(), KinematicsError> {
    model.check_frame(frame_id)?;
    compute_joint_jacobians(model, data, q)?;
    get_frame_jacobian_into(model, data, frame_id, rf, out)
}

/// Allocating variant of [`compute_frame_jacobian_into`].
pub fn compute_frame_jacobian(
    model: &Model,
    data: &mut Data,
    q: &DVector<f64>,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
) -> Result<Matrix6x, KinematicsError> {
    let mut out = Matrix6x::zeros(model.nv());
    compute_frame_jacobian_into(model, data, q, frame_id, rf, &mut out)?;
    Ok(out)
}

/// Time variation of a frame's Jacobian, extracted from the cache filled
/// by [`compute_joint_jacobians_time_variation`]. Applying the result to
/// the velocity vector yields the bias term of the frame's acceleration
/// constraint; when only that product is needed, reading the frame's
/// spatial acceleration from a zero-acceleration propagation is cheaper.
/// `out` must have been zeroed by the caller.
pub fn get_frame_jacobian_time_variation_into(
    model: &Model,
    data: &mut Data,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
    out: &mut Matrix6x,
) -> Result<(), KinematicsError> {
    model.check_frame(frame_id)?;
    check_output(model, out)?;
    if !data.jacobian_derivatives_valid {
        return Err(KinematicsError::JacobianDerivativesNotComputed);
    }
    let frame = model.frame(frame_id);
    let joint_id = frame.parent_joint;
    let target = *update_frame_placement(model, data, frame_id)?;

    // Motion of the frame itself, needed by the moving-frame corrections.
    let joint_velocity = data.velocities[joint_id];
    let frame_velocity_local = frame.placement.act_inv_motion(&joint_velocity);
    let joint_velocity_world = data.abs_placements[joint_id].act_motion(&joint_velocity);
    let origin = target.translation.vector;
    // Velocity of the material point currently at the frame origin.
    let origin_velocity = joint_velocity_world.linear + joint_velocity_world.angular.cross(&origin);

    let mut ancestor = joint_id;
    while ancestor != UNIVERSE_JOINT {
        let joint = model.joint(ancestor);
        for k in 0..joint.kind.nv() {
            let col = joint.idx_v + k;
            let world = read_column(&data.joint_jacobians, col);
            let world_dot = read_column(&data.joint_jacobians_dot, col);
            let value = match rf {
                ReferenceFrame::World => world_dot,
                ReferenceFrame::Local => {
                    target.act_inv_motion(&world_dot)
                        - frame_velocity_local.cross_motion(&target.act_inv_motion(&world))
                }
                ReferenceFrame::LocalWorldAligned => Motion {
                    angular: world_dot.angular,
                    linear: world_dot.linear
                        + world_dot.angular.cross(&origin)
                        + world.angular.cross(&origin_velocity),
                },
            };
            write_column(out, col, &value);
        }
        ancestor = joint.parent;
    }
    Ok(())
}

/// Allocating variant of [`get_frame_jacobian_time_variation_into`].
pub fn get_frame_jacobian_time_variation(
    model: &Model,
    data: &mut Data,
    frame_id: FrameIndex,
    rf: ReferenceFrame,
) -> Result<Matrix6x, KinematicsError> {
    let mut out = Matrix6x::zeros(model.nv());
    get_frame_jacobian_time_variation_into(model, data, frame_id, rf, &mut out)?;
    Ok(out)
}
