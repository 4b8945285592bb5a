//! Forward kinematics: propagation of placements, velocities and
//! accelerations through the joint tree, and joint-level queries.
//!
//! The three propagation entry points form an order hierarchy: placements
//! only, placements + velocities, placements + velocities + accelerations.
//! Each walks the joints once in index order (parents come first by the
//! model invariant), composes every joint's relative placement with the
//! parent's absolute quantities, and records the reached order in the
//! workspace stage so that later queries can refuse stale reads.

use crate::data::{Data, KinematicStage};
use crate::error::KinematicsError;
use crate::model::{JointIndex, Model, UNIVERSE_JOINT};
use crate::spatial::{Motion, Placement, SpatialExt};
use nalgebra::DVector;

/// Reference convention of a reported spatial quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceFrame {
    /// Expressed in the frame's own axes, referred to the frame's origin.
    Local,
    /// Expressed in world axes, referred to the world origin.
    World,
    /// Expressed in world-parallel axes, referred to the frame's origin.
    LocalWorldAligned,
}

/// Convention used by relative-placement queries. `World` composes the two
/// cached absolute placements (O(1)); `Local` walks the joint path through
/// the relative placements (O(depth)).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Convention {
    Local,
    World,
}

pub(crate) fn check_configuration(
    model: &Model,
    q: &DVector<f64>,
) -> Result<(), KinematicsError> {
    if q.len() != model.nq() {
        return Err(KinematicsError::ConfigurationDim {
            expected: model.nq(),
            found: q.len(),
        });
    }
    Ok(())
}

pub(crate) fn check_tangent(model: &Model, v: &DVector<f64>) -> Result<(), KinematicsError> {
    if v.len() != model.nv() {
        return Err(KinematicsError::TangentDim {
            expected: model.nv(),
            found: v.len(),
        });
    }
    Ok(())
}

/// Update the joint placements according to the configuration `q`.
///
/// Overwrites the relative and absolute placement arrays entirely and marks
/// the workspace as `Placement`-consistent. Frame placement caches are left
/// untouched (stale) until the frame resolver is called. The only checked
/// precondition is the length of `q`; non-finite values propagate silently.
pub fn forward_kinematics(
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
        data.abs_placements[i] = data.abs_placements[joint.parent] * rel;
        data.rel_placements[i] = rel;
    }
    Ok(())
}

/// Update the joint placements and spatial velocities according to the
/// configuration `q` and velocity `v`.
///
/// Child velocity is the parent velocity transported through the relative
/// placement plus the joint's own contribution from its velocity block.
pub fn forward_kinematics_velocity(
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
        data.abs_placements[i] = data.abs_placements[joint.parent] * rel;
        data.velocities[i] =
            rel.act_inv_motion(&data.velocities[joint.parent]) + joint.kind.joint_motion(v_block);
        data.rel_placements[i] = rel;
    }
    Ok(())
}

/// Update the joint placements, spatial velocities and spatial
/// accelerations according to `q`, `v` and `a`.
///
/// On top of the transported parent acceleration and the joint's own
/// contribution, each joint picks up the velocity-coupling cross term
/// between its total velocity and its local joint velocity.
pub fn forward_kinematics_acceleration(
    model: &Model,
    data: &mut Data,
    q: &DVector<f64>,
    v: &DVector<f64>,
    a: &DVector<f64>,
) -> Result<(), KinematicsError> {
    check_configuration(model, q)?;
    check_tangent(model, v)?;
    check_tangent(model, a)?;
    data.begin_propagation(KinematicStage::Acceleration);
    data.abs_placements[UNIVERSE_JOINT] = Placement::identity();
    data.velocities[UNIVERSE_JOINT] = Motion::zero();
    data.accelerations[UNIVERSE_JOINT] = Motion::zero();
    for i in 1..model.njoints() {
        let joint = model.joint(i);
        let q_block = &q.as_slice()[joint.idx_q..joint.idx_q + joint.kind.nq()];
        let v_block = &v.as_slice()[joint.idx_v..joint.idx_v + joint.kind.nv()];
        let a_block = &a.as_slice()[joint.idx_v..joint.idx_v + joint.kind.nv()];
        let rel = joint.placement * joint.kind.relative_placement(q_block);
        let joint_velocity = joint.kind.joint_motion(v_block);

        data.abs_placements[i] = data.abs_placements[joint.parent] * rel;
        let velocity = rel.act_inv_motion(&data.velocities[joint.parent]) + joint_velocity;
        data.accelerations[i] = rel.act_inv_motion(&data.accelerations[joint.parent])
            + joint.kind.joint_motion(a_block)
            + velocity.cross_motion(&joint_velocity);
        data.velocities[i] = velocity;
        data.rel_placements[i] = rel;
    }
    Ok(())
}

fn depth(model: &Model, mut joint: JointIndex) -> usize {
    let mut d = 0;
    while joint != UNIVERSE_JOINT {
        joint = model.joint(joint).parent;
        d += 1;
    }
    d
}

/// Relative placement of `target` with respect to `reference`.
///
/// With [`Convention::World`] the two cached absolute placements are
/// composed directly, in O(1). With [`Convention::Local`] the path between
/// the joints is walked through the relative placements up to their common
/// ancestor, in O(depth); both produce the same value for a consistently
/// propagated workspace.
pub fn get_relative_placement(
    model: &Model,
    data: &Data,
    reference: JointIndex,
    target: JointIndex,
    convention: Convention,
) -> Result<Placement, KinematicsError> {
    model.check_joint(reference)?;
    model.check_joint(target)?;
    data.require_stage(KinematicStage::Placement)?;
    match convention {
        Convention::World => {
            Ok(data.abs_placements[reference].inverse() * data.abs_placements[target])
        }
        Convention::Local => {
            let mut a = reference;
            let mut b = target;
            // Placement of the original joints in their running ancestors.
            let mut anc_m_a = Placement::identity();
            let mut anc_m_b = Placement::identity();
            let mut depth_a = depth(model, a);
            let mut depth_b = depth(model, b);
            while depth_a > depth_b {
                anc_m_a = data.rel_placements[a] * anc_m_a;
                a = model.joint(a).parent;
                depth_a -= 1;
            }
            while depth_b > depth_a {
                anc_m_b = data.rel_placements[b] * anc_m_b;
                b = model.joint(b).parent;
                depth_b -= 1;
            }
            while a != b {
                anc_m_a = data.rel_placements[a] * anc_m_a;
                a = model.joint(a).parent;
                anc_m_b = data.rel_placements[b] * anc_m_b;
                b = model.joint(b).parent;
            }
            Ok(anc_m_a.inverse() * anc_m_b)
        }
    }
}

/// Re-express a joint-local motion in the requested convention, given the
/// joint's absolute placement.
pub(crate) fn express_motion(
    abs_placement: &Placement,
    motion: &Motion,
    rf: ReferenceFrame,
) -> Motion {
    match rf {
        ReferenceFrame::Local => *motion,
        ReferenceFrame::World => abs_placement.act_motion(motion),
        ReferenceFrame::LocalWorldAligned => Motion {
            angular: abs_placement.rotation * motion.angular,
            linear: abs_placement.rotation * motion.linear,
        },
    }
}

/// Spatial velocity of a joint in the requested convention. Requires a
/// velocity-order propagation.
pub fn get_velocity(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    model.check_joint(joint_id)?;
    data.require_stage(KinematicStage::Velocity)?;
    Ok(express_motion(
        &data.abs_placements[joint_id],
        &data.velocities[joint_id],
        rf,
    ))
}

/// Spatial acceleration of a joint in the requested convention. Requires an
/// acceleration-order propagation.
pub fn get_acceleration(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    model.check_joint(joint_id)?;
    data.require_stage(KinematicStage::Acceleration)?;
    Ok(express_motion(
        &data.abs_placements[joint_id],
        &data.accelerations[joint_id],
        rf,
    ))
}

/// Classical (point) acceleration of a joint: the spatial acceleration plus
/// the centripetal term `ω × v`, both taken in the requested convention.
/// This is what an accelerometer rigidly attached at the joint origin would
/// measure, minus gravity.
pub fn get_classical_acceleration(
    model: &Model,
    data: &Data,
    joint_id: JointIndex,
    rf: ReferenceFrame,
) -> Result<Motion, KinematicsError> {
    let velocity = get_velocity(model, data, joint_id, rf)?;
    let acceleration = get_acceleration(model, data, joint_id, rf)?;
    Ok(Motion::classical_acceleration(&velocity, &acceleration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JointKind;
    use nalgebra::Vector3;
    use std::f64::consts::FRAC_PI_2;

    const EPSILON: f64 = 1e-12;

    /// Two revolute joints about z with unit links along x.
    fn planar_2r() -> Model {
        let mut model = Model::new();
        let j1 = model
            .add_joint(
                UNIVERSE_JOINT,
                JointKind::Revolute { axis: Vector3::z_axis() },
                Placement::identity(),
                "j1",
            )
            .unwrap();
        model
            .add_joint(
                j1,
                JointKind::Revolute { axis: Vector3::z_axis() },
                Placement::translation(1.0, 0.0, 0.0),
                "j2",
            )
            .unwrap();
        model
    }

    #[test]
    fn test_placement_propagation_straight() {
        let model = planar_2r();
        let mut data = model.create_data();
        forward_kinematics(&model, &mut data, &DVector::from_vec(vec![0.0, 0.0])).unwrap();
        let tip = &data.abs_placements[2];
        assert!((tip.translation.vector - Vector3::new(1.0, 0.0, 0.0)).norm() < EPSILON);
        assert!(tip.rotation.angle() < EPSILON);
    }

    #[test]
    fn test_placement_propagation_bent() {
        let model = planar_2r();
        let mut data = model.create_data();
        forward_kinematics(&model, &mut data, &DVector::from_vec(vec![FRAC_PI_2, 0.0])).unwrap();
        let tip = &data.abs_placements[2];
        assert!((tip.translation.vector - Vector3::new(0.0, 1.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn test_configuration_dimension_is_checked() {
        let model = planar_2r();
        let mut data = model.create_data();
        let result = forward_kinematics(&model, &mut data, &DVector::from_vec(vec![0.0]));
        assert_eq!(
            result,
            Err(KinematicsError::ConfigurationDim {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_velocity_of_rotating_chain() {
        let model = planar_2r();
        let mut data = model.create_data();
        let q = DVector::from_vec(vec![0.0, 0.0]);
        let v = DVector::from_vec(vec![1.0, 0.0]);
        forward_kinematics_velocity(&model, &mut data, &q, &v).unwrap();

        // Joint 2 sits one unit out on the rotating link: its origin moves
        // tangentially at one unit per second.
        let local = get_velocity(&model, &data, 2, ReferenceFrame::LocalWorldAligned).unwrap();
        assert!((local.angular - Vector3::new(0.0, 0.0, 1.0)).norm() < EPSILON);
        assert!((local.linear - Vector3::new(0.0, 1.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn test_world_velocity_refers_to_world_origin() {
        let model = planar_2r();
        let mut data = model.create_data();
        let q = DVector::from_vec(vec![0.0, 0.0]);
        let v = DVector::from_vec(vec![1.0, 0.0]);
        forward_kinematics_velocity(&model, &mut data, &q, &v).unwrap();

        // The rotation axis passes through the world origin, so the WORLD
        // linear part vanishes for any joint of the chain.
        let world = get_velocity(&model, &data, 2, ReferenceFrame::World).unwrap();
        assert!(world.linear.norm() < EPSILON);
        assert!((world.angular - Vector3::new(0.0, 0.0, 1.0)).norm() < EPSILON);
    }

    #[test]
    fn test_velocity_query_before_velocity_propagation_fails() {
        let model = planar_2r();
        let mut data = model.create_data();
        forward_kinematics(&model, &mut data, &DVector::from_vec(vec![0.0, 0.0])).unwrap();
        let result = get_velocity(&model, &data, 1, ReferenceFrame::Local);
        assert_eq!(
            result,
            Err(KinematicsError::StageTooLow {
                required: KinematicStage::Velocity,
                current: KinematicStage::Placement,
            })
        );
    }

    #[test]
    fn test_relative_placement_world_matches_absolute() {
        let model = planar_2r();
        let mut data = model.create_data();
        forward_kinematics(&model, &mut data, &DVector::from_vec(vec![0.7, -0.3])).unwrap();
        for joint in 0..model.njoints() {
            let rel =
                get_relative_placement(&model, &data, UNIVERSE_JOINT, joint, Convention::World)
                    .unwrap();
            let abs = &data.abs_placements[joint];
            assert!((rel.translation.vector - abs.translation.vector).norm() < EPSILON);
            assert!(rel.rotation.angle_to(&abs.rotation) < EPSILON);
        }
    }

    #[test]
    fn test_relative_placement_conventions_agree() {
        let model = planar_2r();
        let mut data = model.create_data();
        forward_kinematics(&model, &mut data, &DVector::from_vec(vec![0.4, 1.1])).unwrap();
        let world = get_relative_placement(&model, &data, 1, 2, Convention::World).unwrap();
        let local = get_relative_placement(&model, &data, 1, 2, Convention::Local).unwrap();
        assert!((world.translation.vector - local.translation.vector).norm() < EPSILON);
        assert!(world.rotation.angle_to(&local.rotation) < EPSILON);
    }

    #[test]
    fn test_relative_placement_inverse_consistency() {
        let model = planar_2r();
        let mut data = model.create_data();
        forward_kinematics(&model, &mut data, &DVector::from_vec(vec![0.9, 0.2])).unwrap();
        for convention in [Convention::World, Convention::Local] {
            let ij = get_relative_placement(&model, &data, 1, 2, convention).unwrap();
            let ji = get_relative_placement(&model, &data, 2, 1, convention).unwrap();
            let product = ij * ji;
            assert!(product.translation.vector.norm() < EPSILON);
            assert!(product.rotation.angle() < EPSILON);
        }
    }

    #[test]
    fn test_classical_acceleration_centripetal_term() {
        let model = planar_2r();
        let mut data = model.create_data();
        let q = DVector::from_vec(vec![0.0, 0.0]);
        let v = DVector::from_vec(vec![1.0, 0.0]);
        let a = DVector::zeros(2);
        forward_kinematics_acceleration(&model, &mut data, &q, &v, &a).unwrap();

        for rf in [
            ReferenceFrame::Local,
            ReferenceFrame::World,
            ReferenceFrame::LocalWorldAligned,
        ] {
            let vel = get_velocity(&model, &data, 2, rf).unwrap();
            let spatial = get_acceleration(&model, &data, 2, rf).unwrap();
            let classical = get_classical_acceleration(&model, &data, 2, rf).unwrap();
            let correction = classical.linear - spatial.linear;
            assert!((correction - vel.angular.cross(&vel.linear)).norm() < EPSILON);
        }

        // Steady rotation at 1 rad/s, lever 1: the tip's measurable
        // acceleration is the unit centripetal pull toward the axis.
        let classical =
            get_classical_acceleration(&model, &data, 2, ReferenceFrame::LocalWorldAligned)
                .unwrap();
        assert!((classical.linear - Vector3::new(-1.0, 0.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn test_spherical_matches_revolute_for_planar_rotation() {
        let mut ball_model = Model::new();
        ball_model
            .add_joint(
                UNIVERSE_JOINT,
                JointKind::Spherical,
                Placement::identity(),
                "ball",
            )
            .unwrap();
        let mut ball_data = ball_model.create_data();

        let angle = 0.83_f64;
        let (s, c) = (angle / 2.0).sin_cos();
        // Quaternion [w, x, y, z] for a rotation of `angle` about z.
        let q = DVector::from_vec(vec![c, 0.0, 0.0, s]);
        forward_kinematics(&ball_model, &mut ball_data, &q).unwrap();

        let mut hinge_model = Model::new();
        hinge_model
            .add_joint(
                UNIVERSE_JOINT,
                JointKind::Revolute { axis: Vector3::z_axis() },
                Placement::identity(),
                "hinge",
            )
            .unwrap();
        let mut hinge_data = hinge_model.create_data();
        forward_kinematics(&hinge_model, &mut hinge_data, &DVector::from_vec(vec![angle]))
            .unwrap();

        let ball = &ball_data.abs_placements[1];
        let hinge = &hinge_data.abs_placements[1];
        assert!(ball.rotation.angle_to(&hinge.rotation) < EPSILON);
    }
}
