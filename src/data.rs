//! Mutable per-call workspace of the kinematics algorithms.
//!
//! One [`Data`] is allocated per [`Model`](crate::model::Model) and reused
//! across calls; the propagation routines overwrite its arrays in place and
//! never allocate. A `Data` instance is owned by one call sequence at a
//! time: it is not internally synchronized, while the model it was sized
//! from may be shared read-only between any number of workspaces.

use crate::error::KinematicsError;
use crate::model::Model;
use crate::spatial::{Force, Inertia, Matrix6x, Motion, Placement};

/// How far the workspace has been propagated for the vectors supplied in
/// the most recent propagation call. Queries of a higher order than the
/// recorded stage are rejected instead of silently reading stale numbers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KinematicStage {
    /// Freshly created; nothing can be queried yet.
    Uninitialized,
    /// Joint placements are consistent with the last configuration.
    Placement,
    /// Placements and spatial velocities are consistent.
    Velocity,
    /// Placements, velocities and spatial accelerations are consistent.
    Acceleration,
}

/// Workspace arrays, indexed by joint or frame index.
#[derive(Clone, Debug)]
pub struct Data {
    /// Placement of each joint relative to its parent joint.
    pub rel_placements: Vec<Placement>,
    /// Placement of each joint in the world frame.
    pub abs_placements: Vec<Placement>,
    /// Spatial velocity of each joint, in the joint's own frame.
    pub velocities: Vec<Motion>,
    /// Spatial acceleration of each joint, in the joint's own frame.
    pub accelerations: Vec<Motion>,
    /// Cached absolute placement of each frame. Left stale by the
    /// propagation routines; refreshed by the frame resolver.
    pub frame_placements: Vec<Placement>,
    /// Dense 6 x nv joint Jacobian, columns expressed in the world frame.
    pub joint_jacobians: Matrix6x,
    /// Time derivative of [`Data::joint_jacobians`], world frame.
    pub joint_jacobians_dot: Matrix6x,
    /// Composite inertia of each joint's subtree, in the joint frame.
    pub subtree_inertias: Vec<Inertia>,
    /// Force transmitted through each joint, in the joint frame (filled by
    /// the inverse dynamics pass).
    pub joint_forces: Vec<Force>,
    /// Joint accelerations augmented with the gravity field, as used by the
    /// inverse dynamics backward pass.
    pub gravito_accelerations: Vec<Motion>,

    pub(crate) stage: KinematicStage,
    pub(crate) jacobians_valid: bool,
    pub(crate) jacobian_derivatives_valid: bool,
    pub(crate) subtree_inertias_valid: bool,
    pub(crate) joint_forces_valid: bool,
}

impl Data {
    /// Allocate a workspace sized for `model`. All placements start at
    /// identity and all motions at zero; the stage is `Uninitialized`.
    pub fn new(model: &Model) -> Self {
        let njoints = model.njoints();
        Data {
            rel_placements: vec![Placement::identity(); njoints],
            abs_placements: vec![Placement::identity(); njoints],
            velocities: vec![Motion::zero(); njoints],
            accelerations: vec![Motion::zero(); njoints],
            frame_placements: vec![Placement::identity(); model.nframes()],
            joint_jacobians: Matrix6x::zeros(model.nv()),
            joint_jacobians_dot: Matrix6x::zeros(model.nv()),
            subtree_inertias: vec![Inertia::zero(); njoints],
            joint_forces: vec![Force::zero(); njoints],
            gravito_accelerations: vec![Motion::zero(); njoints],
            stage: KinematicStage::Uninitialized,
            jacobians_valid: false,
            jacobian_derivatives_valid: false,
            subtree_inertias_valid: false,
            joint_forces_valid: false,
        }
    }

    /// The propagation order the workspace currently holds.
    pub fn stage(&self) -> KinematicStage {
        self.stage
    }

    pub(crate) fn require_stage(&self, required: KinematicStage) -> Result<(), KinematicsError> {
        if self.stage < required {
            Err(KinematicsError::StageTooLow {
                required,
                current: self.stage,
            })
        } else {
            Ok(())
        }
    }

    /// A fresh propagation invalidates every cache derived from the
    /// previous state.
    pub(crate) fn begin_propagation(&mut self, stage: KinematicStage) {
        self.stage = stage;
        self.jacobians_valid = false;
        self.jacobian_derivatives_valid = false;
        self.subtree_inertias_valid = false;
        self.joint_forces_valid = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JointKind, Model, UNIVERSE_JOINT};
    use nalgebra::Vector3;

    #[test]
    fn test_sized_from_model() {
        let mut model = Model::new();
        model
            .add_joint(
                UNIVERSE_JOINT,
                JointKind::Revolute { axis: Vector3::z_axis() },
                Placement::identity(),
                "j1",
            )
            .unwrap();
        model
            .add_frame(1, Placement::identity(), "tip")
            .unwrap();
        let data = model.create_data();
        assert_eq!(data.rel_placements.len(), 2);
        assert_eq!(data.frame_placements.len(), 2);
        assert_eq!(data.joint_jacobians.ncols(), 1);
        assert_eq!(data.stage(), KinematicStage::Uninitialized);
    }

    #[test]
    fn test_stage_ordering() {
        assert!(KinematicStage::Uninitialized < KinematicStage::Placement);
        assert!(KinematicStage::Placement < KinematicStage::Velocity);
        assert!(KinematicStage::Velocity < KinematicStage::Acceleration);
    }
}
