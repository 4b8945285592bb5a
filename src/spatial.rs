//! 6D spatial algebra: placements, motions, forces and inertias.
//!
//! Everything in this crate is built on top of four primitives: a rigid
//! transform between two frames (`Placement`), a spatial motion (velocity or
//! acceleration, angular part first in spirit but stored as two named
//! vectors), a spatial force (torque + force) and a spatial inertia. The
//! composition operators follow the usual rigid-body conventions: a spatial
//! velocity `(ω, v)` describes the velocity field `x ↦ v + ω × x` of the
//! body, so re-expressing it through a placement couples the angular part
//! into the linear one via the translation.

use nalgebra::{Dyn, Isometry3, Matrix3, OMatrix, U6, Vector3, Vector6};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A rigid transform (rotation + translation) between two reference frames.
pub type Placement = Isometry3<f64>;

/// A dense 6 x nv matrix (Jacobians and their time derivatives).
pub type Matrix6x = OMatrix<f64, U6, Dyn>;

/// Spatial motion: angular and linear parts of a rigid-body velocity or
/// acceleration, expressed in some frame, referred to that frame's origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    pub angular: Vector3<f64>,
    pub linear: Vector3<f64>,
}

/// Spatial force: torque and force, dual to [`Motion`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Force {
    pub angular: Vector3<f64>,
    pub linear: Vector3<f64>,
}

/// Spatial inertia: mass, center of mass (lever) and rotational inertia
/// about the center of mass, expressed in the carrying frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Inertia {
    pub mass: f64,
    pub lever: Vector3<f64>,
    pub inertia: Matrix3<f64>,
}

impl Motion {
    pub fn new(angular: Vector3<f64>, linear: Vector3<f64>) -> Self {
        Self { angular, linear }
    }

    pub fn zero() -> Self {
        Self {
            angular: Vector3::zeros(),
            linear: Vector3::zeros(),
        }
    }

    /// Pack as a 6-vector, angular part on top.
    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(
            self.angular.x,
            self.angular.y,
            self.angular.z,
            self.linear.x,
            self.linear.y,
            self.linear.z,
        )
    }

    /// Motion cross product (Lie bracket): `self ×ₘ other`.
    pub fn cross_motion(&self, other: &Motion) -> Motion {
        Motion {
            angular: self.angular.cross(&other.angular),
            linear: self.angular.cross(&other.linear) + self.linear.cross(&other.angular),
        }
    }

    /// Dual cross product on forces: `self ×* f`.
    pub fn cross_force(&self, f: &Force) -> Force {
        Force {
            angular: self.angular.cross(&f.angular) + self.linear.cross(&f.linear),
            linear: self.angular.cross(&f.linear),
        }
    }

    /// The classical (point) acceleration obtained from a spatial
    /// acceleration and the velocity of the same frame: the linear part
    /// gains the centripetal term `ω × v`.
    pub fn classical_acceleration(velocity: &Motion, acceleration: &Motion) -> Motion {
        Motion {
            angular: acceleration.angular,
            linear: acceleration.linear + velocity.angular.cross(&velocity.linear),
        }
    }
}

impl Force {
    pub fn new(angular: Vector3<f64>, linear: Vector3<f64>) -> Self {
        Self { angular, linear }
    }

    pub fn zero() -> Self {
        Self {
            angular: Vector3::zeros(),
            linear: Vector3::zeros(),
        }
    }

    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(
            self.angular.x,
            self.angular.y,
            self.angular.z,
            self.linear.x,
            self.linear.y,
            self.linear.z,
        )
    }
}

impl Inertia {
    pub fn zero() -> Self {
        Self {
            mass: 0.0,
            lever: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// Inertia of a point mass at `lever`.
    pub fn from_point_mass(mass: f64, lever: Vector3<f64>) -> Self {
        Self {
            mass,
            lever,
            inertia: Matrix3::zeros(),
        }
    }

    /// Inertia from mass, center of mass and rotational inertia about the
    /// center of mass.
    pub fn from_parts(mass: f64, lever: Vector3<f64>, inertia: Matrix3<f64>) -> Self {
        Self {
            mass,
            lever,
            inertia,
        }
    }
}

/// Skew-symmetric (cross-product) matrix of `v`.
pub(crate) fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

impl Add for Motion {
    type Output = Motion;
    fn add(self, rhs: Motion) -> Motion {
        Motion {
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        }
    }
}

impl AddAssign for Motion {
    fn add_assign(&mut self, rhs: Motion) {
        self.angular += rhs.angular;
        self.linear += rhs.linear;
    }
}

impl Sub for Motion {
    type Output = Motion;
    fn sub(self, rhs: Motion) -> Motion {
        Motion {
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
        }
    }
}

impl Neg for Motion {
    type Output = Motion;
    fn neg(self) -> Motion {
        Motion {
            angular: -self.angular,
            linear: -self.linear,
        }
    }
}

impl Mul<Motion> for f64 {
    type Output = Motion;
    fn mul(self, rhs: Motion) -> Motion {
        Motion {
            angular: self * rhs.angular,
            linear: self * rhs.linear,
        }
    }
}

impl Add for Force {
    type Output = Force;
    fn add(self, rhs: Force) -> Force {
        Force {
            angular: self.angular + rhs.angular,
            linear: self.linear + rhs.linear,
        }
    }
}

impl AddAssign for Force {
    fn add_assign(&mut self, rhs: Force) {
        self.angular += rhs.angular;
        self.linear += rhs.linear;
    }
}

impl Sub for Force {
    type Output = Force;
    fn sub(self, rhs: Force) -> Force {
        Force {
            angular: self.angular - rhs.angular,
            linear: self.linear - rhs.linear,
        }
    }
}

impl Neg for Force {
    type Output = Force;
    fn neg(self) -> Force {
        Force {
            angular: -self.angular,
            linear: -self.linear,
        }
    }
}

impl Add for Inertia {
    type Output = Inertia;

    /// Combine two inertias carried by the same frame. The rotational parts
    /// are referred to the combined center of mass (parallel axis theorem).
    fn add(self, rhs: Inertia) -> Inertia {
        let mass = self.mass + rhs.mass;
        if mass == 0.0 {
            return Inertia {
                mass: 0.0,
                lever: Vector3::zeros(),
                inertia: self.inertia + rhs.inertia,
            };
        }
        let lever = (self.mass * self.lever + rhs.mass * rhs.lever) / mass;
        let d1 = skew(&(self.lever - lever));
        let d2 = skew(&(rhs.lever - lever));
        Inertia {
            mass,
            lever,
            inertia: self.inertia + rhs.inertia - self.mass * d1 * d1 - rhs.mass * d2 * d2,
        }
    }
}

impl AddAssign for Inertia {
    fn add_assign(&mut self, rhs: Inertia) {
        *self = *self + rhs;
    }
}

impl Mul<Motion> for Inertia {
    type Output = Force;

    /// Map a spatial velocity to a spatial momentum (or an acceleration to
    /// the corresponding inertial force), referred to the carrying frame's
    /// origin.
    fn mul(self, v: Motion) -> Force {
        let linear = self.mass * (v.linear - self.lever.cross(&v.angular));
        Force {
            angular: self.inertia * v.angular + self.lever.cross(&linear),
            linear,
        }
    }
}

/// Spatial actions of a rigid placement on motions, forces and inertias.
///
/// `act_*` re-expresses a quantity given in the placement's child frame into
/// its parent frame; `act_inv_*` goes the other way. These are the adjoint
/// map of SE(3) and its duals, written out with the rotation/translation of
/// the underlying `Isometry3`.
pub trait SpatialExt {
    fn act_motion(&self, m: &Motion) -> Motion;
    fn act_inv_motion(&self, m: &Motion) -> Motion;
    fn act_force(&self, f: &Force) -> Force;
    fn act_inv_force(&self, f: &Force) -> Force;
    fn act_inertia(&self, inertia: &Inertia) -> Inertia;
    fn act_inv_inertia(&self, inertia: &Inertia) -> Inertia;
}

impl SpatialExt for Placement {
    fn act_motion(&self, m: &Motion) -> Motion {
        let angular = self.rotation * m.angular;
        Motion {
            angular,
            linear: self.rotation * m.linear + self.translation.vector.cross(&angular),
        }
    }

    fn act_inv_motion(&self, m: &Motion) -> Motion {
        let r_inv = self.rotation.inverse();
        Motion {
            angular: r_inv * m.angular,
            linear: r_inv * (m.linear - self.translation.vector.cross(&m.angular)),
        }
    }

    fn act_force(&self, f: &Force) -> Force {
        let linear = self.rotation * f.linear;
        Force {
            angular: self.rotation * f.angular + self.translation.vector.cross(&linear),
            linear,
        }
    }

    fn act_inv_force(&self, f: &Force) -> Force {
        let r_inv = self.rotation.inverse();
        Force {
            angular: r_inv * (f.angular - self.translation.vector.cross(&f.linear)),
            linear: r_inv * f.linear,
        }
    }

    fn act_inertia(&self, inertia: &Inertia) -> Inertia {
        let rot = self.rotation.to_rotation_matrix();
        Inertia {
            mass: inertia.mass,
            lever: self.rotation * inertia.lever + self.translation.vector,
            inertia: rot * inertia.inertia * rot.transpose(),
        }
    }

    fn act_inv_inertia(&self, inertia: &Inertia) -> Inertia {
        let rot = self.rotation.to_rotation_matrix();
        Inertia {
            mass: inertia.mass,
            lever: self.rotation.inverse() * (inertia.lever - self.translation.vector),
            inertia: rot.transpose() * inertia.inertia * rot,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion};
    use std::f64::consts::FRAC_PI_2;

    const EPSILON: f64 = 1e-12;

    fn assert_motion_approx_eq(left: &Motion, right: &Motion, tolerance: f64) {
        assert!(
            (left.angular - right.angular).norm() < tolerance
                && (left.linear - right.linear).norm() < tolerance,
            "{left:?} is not approximately equal to {right:?}"
        );
    }

    #[test]
    fn test_act_then_act_inv_is_identity() {
        let placement = Placement::from_parts(
            Translation3::new(0.3, -0.2, 1.1),
            UnitQuaternion::from_euler_angles(0.4, -0.9, 0.2),
        );
        let motion = Motion::new(Vector3::new(0.1, 0.2, 0.3), Vector3::new(-1.0, 0.5, 0.7));
        let round_trip = placement.act_inv_motion(&placement.act_motion(&motion));
        assert_motion_approx_eq(&round_trip, &motion, EPSILON);
    }

    #[test]
    fn test_pure_rotation_couples_nothing() {
        let placement = Placement::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let motion = Motion::new(Vector3::zeros(), Vector3::new(1.0, 0.0, 0.0));
        let moved = placement.act_motion(&motion);
        assert!((moved.linear - Vector3::new(0.0, 1.0, 0.0)).norm() < EPSILON);
        assert!(moved.angular.norm() < EPSILON);
    }

    #[test]
    fn test_translation_couples_angular_into_linear() {
        // A body spinning about z, observed from a frame shifted along x:
        // the origin of the observed frame sees a tangential velocity.
        let placement = Placement::translation(1.0, 0.0, 0.0);
        let motion = Motion::new(Vector3::new(0.0, 0.0, 1.0), Vector3::zeros());
        let moved = placement.act_motion(&motion);
        assert!((moved.linear - Vector3::new(0.0, 1.0, 0.0)).norm() < EPSILON);
    }

    #[test]
    fn test_motion_force_duality() {
        // <X v, X* f> == <v, f> for any placement X.
        let placement = Placement::from_parts(
            Translation3::new(-0.4, 0.8, 0.1),
            UnitQuaternion::from_euler_angles(0.3, 0.1, -1.2),
        );
        let v = Motion::new(Vector3::new(0.3, -0.1, 0.9), Vector3::new(0.2, 0.2, -0.5));
        let f = Force::new(Vector3::new(1.0, 0.4, -0.3), Vector3::new(0.7, -0.2, 0.1));
        let pairing = |v: &Motion, f: &Force| v.angular.dot(&f.angular) + v.linear.dot(&f.linear);
        let lhs = pairing(&placement.act_motion(&v), &placement.act_force(&f));
        assert!((lhs - pairing(&v, &f)).abs() < EPSILON);
    }

    #[test]
    fn test_inertia_addition_point_masses() {
        let a = Inertia::from_point_mass(1.0, Vector3::new(1.0, 0.0, 0.0));
        let b = Inertia::from_point_mass(1.0, Vector3::new(-1.0, 0.0, 0.0));
        let sum = a + b;
        assert!((sum.mass - 2.0).abs() < EPSILON);
        assert!(sum.lever.norm() < EPSILON);
        // Two unit point masses at distance 1 from the combined COM: Iyy = Izz = 2.
        assert!((sum.inertia[(1, 1)] - 2.0).abs() < EPSILON);
        assert!((sum.inertia[(2, 2)] - 2.0).abs() < EPSILON);
        assert!(sum.inertia[(0, 0)].abs() < EPSILON);
    }

    #[test]
    fn test_inertia_times_motion_point_mass() {
        // Point mass on the x axis, body spinning about z: momentum is
        // tangential, angular momentum about the origin points along z.
        let inertia = Inertia::from_point_mass(2.0, Vector3::new(1.0, 0.0, 0.0));
        let motion = Motion::new(Vector3::new(0.0, 0.0, 1.0), Vector3::zeros());
        let momentum = inertia * motion;
        assert!((momentum.linear - Vector3::new(0.0, 2.0, 0.0)).norm() < EPSILON);
        assert!((momentum.angular - Vector3::new(0.0, 0.0, 2.0)).norm() < EPSILON);
    }

    #[test]
    fn test_inertia_transform_round_trip() {
        let placement = Placement::from_parts(
            Translation3::new(0.5, 0.5, -0.5),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );
        let inertia = Inertia::from_parts(
            3.0,
            Vector3::new(0.1, -0.2, 0.3),
            Matrix3::from_diagonal(&Vector3::new(1.0, 2.0, 3.0)),
        );
        let round_trip = placement.act_inv_inertia(&placement.act_inertia(&inertia));
        assert!((round_trip.mass - inertia.mass).abs() < EPSILON);
        assert!((round_trip.lever - inertia.lever).norm() < EPSILON);
        assert!((round_trip.inertia - inertia.inertia).norm() < 1e-10);
    }

    #[test]
    fn test_cross_motion_jacobi_style_antisymmetry() {
        let a = Motion::new(Vector3::new(0.2, 0.5, -0.1), Vector3::new(1.0, 0.0, 0.3));
        let b = Motion::new(Vector3::new(-0.4, 0.1, 0.9), Vector3::new(0.2, -0.7, 0.5));
        let ab = a.cross_motion(&b);
        let ba = b.cross_motion(&a);
        assert_motion_approx_eq(&ab, &-ba, EPSILON);
    }
}
