//! Batched placement propagation over many configurations at once.
//!
//! The model is shared read-only across the worker threads and every
//! worker carries its own reusable workspace, so the per-configuration
//! cost is a single allocation-free propagation.

use crate::error::KinematicsError;
use crate::frames::frames_forward_kinematics;
use crate::kinematics::forward_kinematics;
use crate::model::Model;
use crate::spatial::Placement;
use nalgebra::DVector;
use rayon::prelude::*;

/// Absolute joint placements for every configuration in `configurations`.
/// A failing configuration aborts the whole batch.
pub fn batch_forward_kinematics(
    model: &Model,
    configurations: &[DVector<f64>],
) -> Result<Vec<Vec<Placement>>, KinematicsError> {
    configurations
        .par_iter()
        .map_init(
            || model.create_data(),
            |data, q| {
                forward_kinematics(model, data, q)?;
                Ok(data.abs_placements.clone())
            },
        )
        .collect()
}

/// Absolute frame placements for every configuration in `configurations`.
pub fn batch_frame_placements(
    model: &Model,
    configurations: &[DVector<f64>],
) -> Result<Vec<Vec<Placement>>, KinematicsError> {
    configurations
        .par_iter()
        .map_init(
            || model.create_data(),
            |data, q| {
                frames_forward_kinematics(model, data, q)?;
                Ok(data.frame_placements.clone())
            },
        )
        .collect()
}
