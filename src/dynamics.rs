//! Inertia accumulation and recursive Newton-Euler inverse dynamics.
//!
//! These passes exist for the sake of the force-side frame queries: the
//! supported-inertia accumulator reads the composite subtree inertias
//! filled here, and the supported-force accumulator reads the joint
//! forces of the inverse-dynamics backward pass. The torque vector they
//! return is the set of actuator efforts realizing the supplied motion.

use crate::data::{Data, KinematicStage};
use crate::error::KinematicsError;
use crate::kinematics::{check_configuration, check_tangent};
use crate::model::{Model, UNIVERSE_JOINT};
use crate::spatial::{Force, Motion, Placement, SpatialExt};
use nalgebra::DVector;

/// Accumulate the composite inertia of every joint's subtree, expressed in
/// the joint's own frame. Requires placements from a previous propagation;
/// a single backward sweep folds each child into its parent.
pub fn compute_subtree_inertias(model: &Model, data: &mut Data) -> Result<(), KinematicsError> {
    data.require_stage(KinematicStage::Placement)?;
    for i in 0..model.njoints() {
        data.subtree_inertias[i] = model.joint(i).inertia;
    }
    for i in (1..model.njoints()).rev() {
        let folded = data.rel_placements[i].act_inertia(&data.subtree_inertias[i]);
        data.subtree_inertias[model.joint(i).parent] += folded;
    }
    data.subtree_inertias_valid = true;
    Ok(())
}

/// Inverse dynamics: the joint torques realizing the motion `(q, v, a)`
/// under the model's gravity field, with no external forces.
pub fn rnea(
    model: &Model,
    data: &mut Data,
    q: &DVector<f64>,
    v: &DVector<f64>,
    a: &DVector<f64>,
) -> Result<DVector<f64>, KinematicsError> {
    rnea_with_external_forces(model, data, q, v, a, &[])
}

/// [`rnea`] with an external force applied to each joint's body. `fext`
/// holds one wrench per joint (universe included), expressed in the
/// joint's own frame, or is empty for no external forces.
///
/// Besides the returned torque vector, the pass leaves the per-joint
/// transmitted forces and gravity-augmented accelerations in the
/// workspace, where the supported-force query picks them up.
pub fn rnea_with_external_forces(
    model: &Model,
    data: &mut Data,
    q: &DVector<f64>,
    v: &DVector<f64>,
    a: &DVector<f64>,
    fext: &[Force],
) -> Result<DVector<f64>, KinematicsError> {
    check_configuration(model, q)?;
    check_tangent(model, v)?;
    check_tangent(model, a)?;
    if !fext.is_empty() && fext.len() != model.njoints() {
        return Err(KinematicsError::MalformedModel(format!(
            "external force vector has {} entries, model has {} joints",
            fext.len(),
            model.njoints()
        )));
    }

    data.begin_propagation(KinematicStage::Velocity);
    data.abs_placements[UNIVERSE_JOINT] = Placement::identity();
    data.velocities[UNIVERSE_JOINT] = Motion::zero();
    // Seeding the sweep with -g turns the gravity field into a fictitious
    // acceleration of the whole tree.
    data.gravito_accelerations[UNIVERSE_JOINT] = -model.gravity;
    data.joint_forces[UNIVERSE_JOINT] = Force::zero();

    for i in 1..model.njoints() {
        let joint = model.joint(i);
        let q_block = &q.as_slice()[joint.idx_q..joint.idx_q + joint.kind.nq()];
        let v_block = &v.as_slice()[joint.idx_v..joint.idx_v + joint.kind.nv()];
        let a_block = &a.as_slice()[joint.idx_v..joint.idx_v + joint.kind.nv()];

        let rel = joint.placement * joint.kind.relative_placement(q_block);
        let joint_velocity = joint.kind.joint_motion(v_block);
        let velocity = rel.act_inv_motion(&data.velocities[joint.parent]) + joint_velocity;
        let acceleration = rel.act_inv_motion(&data.gravito_accelerations[joint.parent])
            + joint.kind.joint_motion(a_block)
            + velocity.cross_motion(&joint_velocity);

        let momentum = joint.inertia * velocity;
        let mut force = joint.inertia * acceleration + velocity.cross_force(&momentum);
        if !fext.is_empty() {
            force = force - fext[i];
        }

        data.rel_placements[i] = rel;
        data.abs_placements[i] = data.abs_placements[joint.parent] * rel;
        data.velocities[i] = velocity;
        data.gravito_accelerations[i] = acceleration;
        data.joint_forces[i] = force;
    }

    let mut tau = DVector::zeros(model.nv());
    for i in (1..model.njoints()).rev() {
        let joint = model.joint(i);
        let force = data.joint_forces[i];
        joint
            .kind
            .project_torque(&force, &mut tau.as_mut_slice()[joint.idx_v..joint.idx_v + joint.kind.nv()]);
        data.joint_forces[joint.parent] += data.rel_placements[i].act_force(&force);
    }
    data.joint_forces_valid = true;
    Ok(tau)
}
