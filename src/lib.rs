//! Forward and differential kinematics for articulated rigid-body mechanisms
//! represented as kinematic trees.
//!
//! The tree is described once as a [`model::Model`] (joints, attached body
//! inertias, named query frames, gravity) and evaluated through a reusable
//! [`data::Data`] workspace: a propagation call sweeps the joints from the
//! root and fills the workspace arrays, after which cheap per-joint and
//! per-frame queries read them back in the reference convention of the
//! caller's choice. The workspace records how far it has been propagated,
//! so a query of a higher order than the last propagation is rejected
//! instead of returning stale numbers.
//!
//! # Features
//!
//! - Placement, velocity and acceleration propagation over revolute,
//!   prismatic and spherical joints, in a single O(n) sweep each.
//! - Joint and frame queries in three reference conventions: the frame's
//!   own axes, world axes referred to the world origin, and world-aligned
//!   axes at the frame origin.
//! - Classical (point) accelerations alongside spatial ones, for matching
//!   accelerometer readings.
//! - Dense joint-space Jacobians and their time variation, extracted per
//!   joint or per frame with the tree sparsity preserved.
//! - Recursive Newton-Euler inverse dynamics with optional external
//!   forces, and the supported-inertia / supported-force queries built on
//!   it (what a force-torque sensor at a frame would measure).
//! - Optional `parallel` feature: batch forward kinematics over many
//!   configurations via rayon.
//!
//! All placements are [`nalgebra::Isometry3`] values and all vectors are
//! `f64`; spatial velocities, forces and inertias live in [`spatial`].

pub mod spatial;

pub mod error;

pub mod model;
pub mod data;

pub mod kinematics;
pub mod frames;

pub mod jacobian;
pub mod dynamics;

#[cfg(feature = "parallel")]
pub mod batch;

#[cfg(test)]
mod tests;
