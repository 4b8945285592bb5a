//! Static description of a kinematic tree.
//!
//! A [`Model`] is built once, then treated as read-only for the lifetime of
//! all kinematic calls; it may be shared freely across threads. Joint 0 is
//! the fixed universe. Every other joint names a parent with a smaller
//! index, so the joint vector is already in topological order and a single
//! forward pass visits parents before children. Frames are named query
//! points rigidly attached to a joint by a fixed offset; they take no part
//! in the propagation itself.

use crate::data::Data;
use crate::error::KinematicsError;
use crate::spatial::{Inertia, Motion, Placement, SpatialExt};
use nalgebra::{Quaternion, Unit, UnitQuaternion, Vector3};
use tracing::debug;

pub type JointIndex = usize;
pub type FrameIndex = usize;

/// Index of the universe joint (the fixed root of every tree).
pub const UNIVERSE_JOINT: JointIndex = 0;

/// Index of the universe frame, attached to the universe joint.
pub const UNIVERSE_FRAME: FrameIndex = 0;

/// The motion model of a single joint: how its block of the configuration
/// vector maps to a placement relative to the parent, and how its block of
/// the velocity vector maps to a local spatial velocity.
#[derive(Clone, Debug, PartialEq)]
pub enum JointKind {
    /// The fixed root. Contributes nothing to `nq`/`nv`; only joint 0 has it.
    Universe,
    /// Rotation of angle `q` about `axis` (one configuration coordinate).
    Revolute { axis: Unit<Vector3<f64>> },
    /// Translation of `q` along `axis` (one configuration coordinate).
    Prismatic { axis: Unit<Vector3<f64>> },
    /// Free rotation; four configuration coordinates storing a quaternion as
    /// `[w, x, y, z]`, three velocity coordinates (local angular velocity).
    Spherical,
}

impl JointKind {
    /// Number of configuration coordinates consumed by this joint.
    pub fn nq(&self) -> usize {
        match self {
            JointKind::Universe => 0,
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } => 1,
            JointKind::Spherical => 4,
        }
    }

    /// Number of velocity coordinates consumed by this joint.
    pub fn nv(&self) -> usize {
        match self {
            JointKind::Universe => 0,
            JointKind::Revolute { .. } | JointKind::Prismatic { .. } => 1,
            JointKind::Spherical => 3,
        }
    }

    /// Placement of the joint frame relative to its zero configuration, for
    /// the given block of the configuration vector.
    pub(crate) fn relative_placement(&self, q: &[f64]) -> Placement {
        match self {
            JointKind::Universe => Placement::identity(),
            JointKind::Revolute { axis } => Placement::rotation(axis.into_inner() * q[0]),
            JointKind::Prismatic { axis } => {
                let shift = axis.into_inner() * q[0];
                Placement::translation(shift.x, shift.y, shift.z)
            }
            JointKind::Spherical => {
                // Renormalize: callers integrate quaternions numerically and
                // the norm drifts.
                let quat = UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]));
                Placement::from_parts(nalgebra::Translation3::identity(), quat)
            }
        }
    }

    /// Local spatial velocity produced by the given block of the velocity
    /// vector (the motion-subspace mapping `S · v`).
    pub(crate) fn joint_motion(&self, v: &[f64]) -> Motion {
        match self {
            JointKind::Universe => Motion::zero(),
            JointKind::Revolute { axis } => Motion::new(axis.into_inner() * v[0], Vector3::zeros()),
            JointKind::Prismatic { axis } => Motion::new(Vector3::zeros(), axis.into_inner() * v[0]),
            JointKind::Spherical => Motion::new(Vector3::new(v[0], v[1], v[2]), Vector3::zeros()),
        }
    }

    /// The `k`-th column of the motion subspace, in the joint's local frame.
    /// Requires `k < self.nv()`.
    pub(crate) fn subspace_column(&self, k: usize) -> Motion {
        match self {
            JointKind::Universe => Motion::zero(),
            JointKind::Revolute { axis } => Motion::new(axis.into_inner(), Vector3::zeros()),
            JointKind::Prismatic { axis } => Motion::new(Vector3::zeros(), axis.into_inner()),
            JointKind::Spherical => {
                let mut angular = Vector3::zeros();
                angular[k] = 1.0;
                Motion::new(angular, Vector3::zeros())
            }
        }
    }

    /// Project a spatial force transmitted through the joint onto the joint
    /// torque coordinates (`Sᵀ f`), writing `self.nv()` values into `tau`.
    pub(crate) fn project_torque(&self, f: &crate::spatial::Force, tau: &mut [f64]) {
        match self {
            JointKind::Universe => {}
            JointKind::Revolute { axis } => tau[0] = f.angular.dot(axis),
            JointKind::Prismatic { axis } => tau[0] = f.linear.dot(axis),
            JointKind::Spherical => {
                tau[0] = f.angular.x;
                tau[1] = f.angular.y;
                tau[2] = f.angular.z;
            }
        }
    }
}

/// One joint of the tree, together with the body inertia it carries.
#[derive(Clone, Debug)]
pub struct Joint {
    pub name: String,
    /// Parent joint index; strictly smaller than this joint's own index.
    pub parent: JointIndex,
    /// Fixed placement of the joint's zero configuration in the parent
    /// joint's frame.
    pub placement: Placement,
    pub kind: JointKind,
    /// First configuration coordinate of this joint's block.
    pub idx_q: usize,
    /// First velocity coordinate of this joint's block.
    pub idx_v: usize,
    /// Inertia of the body rigidly attached to this joint, expressed in the
    /// joint frame. Accumulated by [`Model::append_body_to_joint`].
    pub inertia: Inertia,
}

/// A named query point rigidly attached to a joint.
#[derive(Clone, Debug)]
pub struct Frame {
    pub name: String,
    pub parent_joint: JointIndex,
    /// Fixed placement of the frame in its parent joint's frame.
    pub placement: Placement,
    /// Optional inertia attached at the frame (zero for plain query points).
    /// Only the supported-inertia/force accumulators read it.
    pub inertia: Inertia,
}

/// Immutable kinematic tree: joints, frames, dimensions and gravity.
#[derive(Clone, Debug)]
pub struct Model {
    joints: Vec<Joint>,
    frames: Vec<Frame>,
    /// Direct children of each joint, in index order.
    children: Vec<Vec<JointIndex>>,
    nq: usize,
    nv: usize,
    /// Gravity field as a spatial motion in the world frame. The default is
    /// 9.81 m/s² along negative z.
    pub gravity: Motion,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// An empty tree: only the universe joint and the universe frame.
    pub fn new() -> Self {
        Model {
            joints: vec![Joint {
                name: "universe".to_string(),
                parent: UNIVERSE_JOINT,
                placement: Placement::identity(),
                kind: JointKind::Universe,
                idx_q: 0,
                idx_v: 0,
                inertia: Inertia::zero(),
            }],
            frames: vec![Frame {
                name: "universe".to_string(),
                parent_joint: UNIVERSE_JOINT,
                placement: Placement::identity(),
                inertia: Inertia::zero(),
            }],
            children: vec![Vec::new()],
            nq: 0,
            nv: 0,
            gravity: Motion::new(Vector3::zeros(), Vector3::new(0.0, 0.0, -9.81)),
        }
    }

    /// Append a joint below `parent`. `placement` is the joint's zero
    /// configuration in the parent joint's frame. Returns the new joint's
    /// index; indices are assigned in insertion order, which keeps the
    /// parent-before-child invariant by construction.
    pub fn add_joint(
        &mut self,
        parent: JointIndex,
        kind: JointKind,
        placement: Placement,
        name: impl Into<String>,
    ) -> Result<JointIndex, KinematicsError> {
        if parent >= self.joints.len() {
            return Err(KinematicsError::MalformedModel(format!(
                "parent joint {parent} does not exist (njoints = {})",
                self.joints.len()
            )));
        }
        if matches!(kind, JointKind::Universe) {
            return Err(KinematicsError::MalformedModel(
                "the universe joint cannot be added explicitly".to_string(),
            ));
        }
        let id = self.joints.len();
        let name = name.into();
        debug!(joint = %name, id, parent, "adding joint");
        self.joints.push(Joint {
            name,
            parent,
            placement,
            idx_q: self.nq,
            idx_v: self.nv,
            inertia: Inertia::zero(),
            kind: kind.clone(),
        });
        self.children.push(Vec::new());
        self.children[parent].push(id);
        self.nq += kind.nq();
        self.nv += kind.nv();
        Ok(id)
    }

    /// Attach a body inertia to a joint. `placement` locates the body frame
    /// in the joint frame; repeated calls accumulate.
    pub fn append_body_to_joint(
        &mut self,
        joint_id: JointIndex,
        inertia: Inertia,
        placement: Placement,
    ) -> Result<(), KinematicsError> {
        if joint_id >= self.joints.len() {
            return Err(KinematicsError::JointOutOfBounds(joint_id, self.joints.len()));
        }
        self.joints[joint_id].inertia += placement.act_inertia(&inertia);
        Ok(())
    }

    /// Append a frame attached to `parent_joint` by the fixed `placement`.
    /// Frames attached to the same joint are ordered by insertion; that
    /// ordering defines the "after siblings" of the supported-inertia sum.
    pub fn add_frame(
        &mut self,
        parent_joint: JointIndex,
        placement: Placement,
        name: impl Into<String>,
    ) -> Result<FrameIndex, KinematicsError> {
        self.add_frame_with_inertia(parent_joint, placement, Inertia::zero(), name)
    }

    /// [`Model::add_frame`] with an inertia attached at the frame.
    pub fn add_frame_with_inertia(
        &mut self,
        parent_joint: JointIndex,
        placement: Placement,
        inertia: Inertia,
        name: impl Into<String>,
    ) -> Result<FrameIndex, KinematicsError> {
        if parent_joint >= self.joints.len() {
            return Err(KinematicsError::JointOutOfBounds(
                parent_joint,
                self.joints.len(),
            ));
        }
        let id = self.frames.len();
        let name = name.into();
        debug!(frame = %name, id, parent_joint, "adding frame");
        self.frames.push(Frame {
            name,
            parent_joint,
            placement,
            inertia,
        });
        Ok(id)
    }

    /// Number of joints, the universe included.
    pub fn njoints(&self) -> usize {
        self.joints.len()
    }

    /// Number of frames, the universe frame included.
    pub fn nframes(&self) -> usize {
        self.frames.len()
    }

    /// Dimension of the configuration vector.
    pub fn nq(&self) -> usize {
        self.nq
    }

    /// Dimension of the velocity (tangent) vector.
    pub fn nv(&self) -> usize {
        self.nv
    }

    pub fn joint(&self, id: JointIndex) -> &Joint {
        &self.joints[id]
    }

    pub fn frame(&self, id: FrameIndex) -> &Frame {
        &self.frames[id]
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Direct children of a joint, in index order.
    pub fn children(&self, id: JointIndex) -> &[JointIndex] {
        &self.children[id]
    }

    /// Joint index by name, if present.
    pub fn joint_id(&self, name: &str) -> Option<JointIndex> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// Frame index by name, if present.
    pub fn frame_id(&self, name: &str) -> Option<FrameIndex> {
        self.frames.iter().position(|f| f.name == name)
    }

    /// Allocate a workspace sized for this model.
    pub fn create_data(&self) -> Data {
        Data::new(self)
    }

    pub(crate) fn check_joint(&self, id: JointIndex) -> Result<(), KinematicsError> {
        if id >= self.joints.len() {
            Err(KinematicsError::JointOutOfBounds(id, self.joints.len()))
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_frame(&self, id: FrameIndex) -> Result<(), KinematicsError> {
        if id >= self.frames.len() {
            Err(KinematicsError::FrameOutOfBounds(id, self.frames.len()))
        } else {
            Ok(())
        }
    }
}
