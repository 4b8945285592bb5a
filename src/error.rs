//! Error taxonomy of the kinematics routines.
//!
//! Only two things are ever reported: arguments whose dimensions or indices
//! do not match the model, and queries issued against a workspace that has
//! not been propagated far enough (or whose derived caches are stale). Pure
//! numerical degeneracy (NaN, Inf) is never detected; it propagates through
//! the compositions silently.

use crate::data::KinematicStage;
use thiserror::Error;

/// Errors reported at the call boundary of the kinematics API.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KinematicsError {
    /// Configuration vector length does not match the model's `nq`.
    #[error("configuration vector has length {found}, model expects nq = {expected}")]
    ConfigurationDim { expected: usize, found: usize },

    /// Velocity or acceleration vector length does not match the model's `nv`.
    #[error("tangent vector has length {found}, model expects nv = {expected}")]
    TangentDim { expected: usize, found: usize },

    /// Joint index outside `[0, njoints)`.
    #[error("joint index {0} is out of bounds (njoints = {1})")]
    JointOutOfBounds(usize, usize),

    /// Frame index outside `[0, nframes)`.
    #[error("frame index {0} is out of bounds (nframes = {1})")]
    FrameOutOfBounds(usize, usize),

    /// A derived quantity was queried before the matching propagation order
    /// was run on this workspace.
    #[error("query requires {required:?} propagation, workspace is at {current:?}")]
    StageTooLow {
        required: KinematicStage,
        current: KinematicStage,
    },

    /// The dense joint-Jacobian cache is stale or was never filled.
    #[error("joint Jacobians have not been computed for the current configuration")]
    JacobiansNotComputed,

    /// The Jacobian time-derivative cache is stale or was never filled.
    #[error("joint Jacobian time variations have not been computed for the current state")]
    JacobianDerivativesNotComputed,

    /// The composite subtree-inertia cache is stale or was never filled.
    #[error("subtree inertias have not been computed for the current configuration")]
    SubtreeInertiasNotComputed,

    /// The per-joint force cache is stale or was never filled.
    #[error("joint forces have not been computed (run the inverse dynamics pass first)")]
    JointForcesNotComputed,

    /// The model under construction violates a structural constraint.
    #[error("malformed model: {0}")]
    MalformedModel(String),
}
