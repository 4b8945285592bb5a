//! Cross-module checks that every query refuses to read results the last
//! propagation did not produce.

use crate::data::KinematicStage;
use crate::dynamics::rnea;
use crate::error::KinematicsError;
use crate::frames::compute_supported_force_by_frame;
use crate::jacobian::{
    compute_joint_jacobians_time_variation, get_frame_jacobian_time_variation,
};
use crate::kinematics::{
    Convention, ReferenceFrame, forward_kinematics, forward_kinematics_acceleration,
    get_acceleration, get_relative_placement, get_velocity,
};
use crate::model::{FrameIndex, JointKind, Model, UNIVERSE_JOINT};
use crate::spatial::Placement;
use nalgebra::{DVector, Vector3};

fn pendulum() -> (Model, FrameIndex) {
    let mut model = Model::new();
    let j1 = model
        .add_joint(
            UNIVERSE_JOINT,
            JointKind::Revolute { axis: Vector3::z_axis() },
            Placement::identity(),
            "j1",
        )
        .unwrap();
    let tip = model
        .add_frame(j1, Placement::translation(1.0, 0.0, 0.0), "tip")
        .unwrap();
    (model, tip)
}

#[test]
fn test_fresh_workspace_rejects_placement_queries() {
    let (model, _) = pendulum();
    let data = model.create_data();
    let result = get_relative_placement(&model, &data, UNIVERSE_JOINT, 1, Convention::World);
    assert_eq!(
        result,
        Err(KinematicsError::StageTooLow {
            required: KinematicStage::Placement,
            current: KinematicStage::Uninitialized,
        })
    );
}

#[test]
fn test_inverse_dynamics_reaches_velocity_order_only() {
    let (model, _) = pendulum();
    let mut data = model.create_data();
    let zero = DVector::zeros(1);
    rnea(&model, &mut data, &zero, &zero, &zero).unwrap();

    assert!(get_velocity(&model, &data, 1, ReferenceFrame::Local).is_ok());
    let result = get_acceleration(&model, &data, 1, ReferenceFrame::Local);
    assert_eq!(
        result,
        Err(KinematicsError::StageTooLow {
            required: KinematicStage::Acceleration,
            current: KinematicStage::Velocity,
        })
    );
}

#[test]
fn test_acceleration_propagation_does_not_produce_forces() {
    let (model, tip) = pendulum();
    let mut data = model.create_data();
    let zero = DVector::zeros(1);
    forward_kinematics_acceleration(&model, &mut data, &zero, &zero, &zero).unwrap();
    let result = compute_supported_force_by_frame(&model, &data, tip);
    assert_eq!(result, Err(KinematicsError::JointForcesNotComputed));
}

#[test]
fn test_plain_propagation_invalidates_derivative_cache() {
    let (model, tip) = pendulum();
    let mut data = model.create_data();
    let zero = DVector::zeros(1);
    compute_joint_jacobians_time_variation(&model, &mut data, &zero, &zero).unwrap();
    assert!(
        get_frame_jacobian_time_variation(&model, &mut data, tip, ReferenceFrame::World).is_ok()
    );

    forward_kinematics(&model, &mut data, &zero).unwrap();
    let result = get_frame_jacobian_time_variation(&model, &mut data, tip, ReferenceFrame::World);
    assert!(matches!(
        result,
        Err(KinematicsError::JacobianDerivativesNotComputed)
    ));
}

#[test]
fn test_inverse_dynamics_checks_every_vector_length() {
    let (model, _) = pendulum();
    let mut data = model.create_data();
    let zero = DVector::zeros(1);
    let result = rnea(&model, &mut data, &zero, &zero, &DVector::zeros(3));
    assert_eq!(
        result,
        Err(KinematicsError::TangentDim {
            expected: 1,
            found: 3
        })
    );
}
