//! Per-joint coordinate bookkeeping.
//!
//! A [`JointParametrization`] is what a backend reports for one joint: where
//! the joint lives inside the generalized position/velocity vectors, its
//! neutral value, and which [`JointKind`] of coordinates it uses. The kind
//! carries the conversion logic between the position representation (`nq`
//! entries) and the minimal one (`nv` entries).

use nalgebra::{
    DVector, Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3, Vector4,
};

use crate::error::{ModelError, Result};

/// Position and velocity index layout of one joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JointInfo {
    /// Sequence index among non-fixed joints (depth-first pre-order).
    pub id: usize,
    pub iq: usize,
    pub iv: usize,
    pub nq: usize,
    pub nv: usize,
}

impl JointInfo {
    pub fn q_view(&self) -> View {
        View::new(self.iq, self.nq)
    }

    pub fn v_view(&self) -> View {
        View::new(self.iv, self.nv)
    }

    /// `true` when position and velocity spaces have the same size.
    pub fn is_euclidean(&self) -> bool {
        self.nq == self.nv
    }
}

/// Index range `{offset, count}` into a vector owned by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct View {
    pub offset: usize,
    pub count: usize,
}

impl View {
    pub fn new(offset: usize, count: usize) -> Self {
        Self { offset, count }
    }

    pub fn end(&self) -> usize {
        self.offset + self.count
    }

    pub fn of<'a>(&self, v: &'a DVector<f64>) -> nalgebra::DVectorView<'a, f64> {
        v.rows(self.offset, self.count)
    }

    pub fn of_mut<'a>(&self, v: &'a mut DVector<f64>) -> nalgebra::DVectorViewMut<'a, f64> {
        v.rows_mut(self.offset, self.count)
    }
}

/// Coordinate representation of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    /// `nq == nv`, positions are minimal coordinates.
    Euclidean,
    /// One rotational dof stored as `[cos θ, sin θ]` (nq = 2, nv = 1).
    UnitCircle,
    /// Ball joint stored as a unit quaternion `[x, y, z, w]` (nq = 4, nv = 3).
    Spherical,
    /// Free-floating joint `[x, y, z, qx, qy, qz, qw]` (nq = 7, nv = 6).
    ///
    /// Velocity is `[ν; ω]`, translation rate and angular velocity, both
    /// expressed in the joint frame.
    FreeFlyer,
}

impl JointKind {
    /// Fixed `(nq, nv)` of this kind, `None` for [`JointKind::Euclidean`].
    pub fn dims(&self) -> Option<(usize, usize)> {
        match self {
            Self::Euclidean => None,
            Self::UnitCircle => Some((2, 1)),
            Self::Spherical => Some((4, 3)),
            Self::FreeFlyer => Some((7, 6)),
        }
    }

    /// Whether minimal <-> position maps exist when `nq != nv`.
    pub fn has_minimal_map(&self) -> bool {
        !matches!(self, Self::Euclidean)
    }

    /// Whether the kind can build a pose from its coordinates and back.
    pub fn has_pose_map(&self) -> bool {
        matches!(self, Self::FreeFlyer)
    }

    pub fn neutral(&self, nq: usize) -> DVector<f64> {
        match self {
            Self::Euclidean => DVector::zeros(nq),
            Self::UnitCircle => DVector::from_column_slice(&[1., 0.]),
            Self::Spherical => DVector::from_column_slice(&[0., 0., 0., 1.]),
            Self::FreeFlyer => DVector::from_column_slice(&[0., 0., 0., 0., 0., 0., 1.]),
        }
    }

    /// Minimal coordinates (size `nv`) to position coordinates (size `nq`).
    ///
    /// Rotations use the rotation vector (axis times angle).
    pub fn minimal_to_position(&self, minimal: &[f64]) -> DVector<f64> {
        match self {
            Self::Euclidean => DVector::from_column_slice(minimal),
            Self::UnitCircle => DVector::from_column_slice(&[minimal[0].cos(), minimal[0].sin()]),
            Self::Spherical => {
                let rot = UnitQuaternion::from_scaled_axis(vec3(minimal, 0));
                DVector::from_column_slice(rot.coords.as_slice())
            }
            Self::FreeFlyer => {
                let rot = UnitQuaternion::from_scaled_axis(vec3(minimal, 3));
                let mut q = DVector::zeros(7);
                q.fixed_rows_mut::<3>(0).copy_from(&vec3(minimal, 0));
                q.fixed_rows_mut::<4>(3).copy_from(&rot.coords);
                q
            }
        }
    }

    /// Position coordinates (size `nq`) to minimal coordinates (size `nv`).
    pub fn position_to_minimal(&self, q: &[f64]) -> DVector<f64> {
        match self {
            Self::Euclidean => DVector::from_column_slice(q),
            Self::UnitCircle => DVector::from_element(1, q[1].atan2(q[0])),
            Self::Spherical => {
                let rot = quat(q, 0).scaled_axis();
                DVector::from_column_slice(rot.as_slice())
            }
            Self::FreeFlyer => {
                let mut minimal = DVector::zeros(6);
                minimal.fixed_rows_mut::<3>(0).copy_from(&vec3(q, 0));
                minimal.fixed_rows_mut::<3>(3).copy_from(&quat(q, 3).scaled_axis());
                minimal
            }
        }
    }

    /// Pose encoded by free-flyer coordinates.
    pub fn forward_kinematics(&self, q: &[f64]) -> Option<Isometry3<f64>> {
        match self {
            Self::FreeFlyer => Some(Isometry3::from_parts(
                Translation3::from(vec3(q, 0)),
                quat(q, 3),
            )),
            _ => None,
        }
    }

    pub fn inverse_kinematics(&self, pose: &Isometry3<f64>) -> Option<DVector<f64>> {
        match self {
            Self::FreeFlyer => {
                let mut q = DVector::zeros(7);
                q.fixed_rows_mut::<3>(0).copy_from(&pose.translation.vector);
                q.fixed_rows_mut::<4>(3).copy_from(&pose.rotation.coords);
                Some(q)
            }
            _ => None,
        }
    }

    /// Moves `q` along velocity `v` for `dt` seconds.
    ///
    /// Angular velocities are expressed in the joint (parent side) frame, so
    /// rotations are updated as `R <- exp(ω dt) R`.
    pub fn integrate(&self, q: &[f64], v: &[f64], dt: f64) -> DVector<f64> {
        match self {
            Self::Euclidean => {
                DVector::from_iterator(q.len(), q.iter().zip(v).map(|(q, v)| q + v * dt))
            }
            Self::UnitCircle => {
                let theta = q[1].atan2(q[0]) + v[0] * dt;
                DVector::from_column_slice(&[theta.cos(), theta.sin()])
            }
            Self::Spherical => {
                let rot = UnitQuaternion::from_scaled_axis(vec3(v, 0) * dt) * quat(q, 0);
                DVector::from_column_slice(rot.coords.as_slice())
            }
            Self::FreeFlyer => {
                let rot = UnitQuaternion::from_scaled_axis(vec3(v, 3) * dt) * quat(q, 3);
                let mut out = DVector::zeros(7);
                out.fixed_rows_mut::<3>(0)
                    .copy_from(&(vec3(q, 0) + vec3(v, 0) * dt));
                out.fixed_rows_mut::<4>(3).copy_from(&rot.coords);
                out
            }
        }
    }
}

fn vec3(s: &[f64], at: usize) -> Vector3<f64> {
    Vector3::new(s[at], s[at + 1], s[at + 2])
}

// [x, y, z, w] storage, renormalized
fn quat(s: &[f64], at: usize) -> UnitQuaternion<f64> {
    UnitQuaternion::from_quaternion(Quaternion::from_vector(Vector4::new(
        s[at],
        s[at + 1],
        s[at + 2],
        s[at + 3],
    )))
}

/// What a backend knows about one joint.
#[derive(Debug, Clone, PartialEq)]
pub struct JointParametrization {
    /// Index layout in the backend's own numbering; the finalizer replaces
    /// `id` with its own sequence index.
    pub info: JointInfo,
    /// Neutral value in position space (`info.nq` entries).
    pub neutral: DVector<f64>,
    pub kind: JointKind,
}

impl JointParametrization {
    /// Parametrization with the kind's default neutral value.
    pub fn new(info: JointInfo, kind: JointKind) -> Self {
        Self {
            neutral: kind.neutral(info.nq),
            info,
            kind,
        }
    }

    /// Checks that the reported sizes agree with each other and with the kind.
    pub(crate) fn validate(&self, joint: &str, floating: bool) -> Result<()> {
        let JointInfo { nq, nv, .. } = self.info;
        if nq < nv {
            return Err(ModelError::invalid_parametrization(
                joint,
                format!("nq ({nq}) smaller than nv ({nv})"),
            ));
        }
        if self.neutral.len() != nq {
            return Err(ModelError::invalid_parametrization(
                joint,
                format!("neutral value has {} entries, nq is {nq}", self.neutral.len()),
            ));
        }
        if nq != nv && !self.kind.has_minimal_map() {
            return Err(ModelError::MissingConversion {
                routine: "minimal <-> position map",
                joint: joint.to_string(),
            });
        }
        if floating && nq != nv && !self.kind.has_pose_map() {
            return Err(ModelError::MissingConversion {
                routine: "forward/inverse kinematics",
                joint: joint.to_string(),
            });
        }
        if let Some(dims) = self.kind.dims() {
            if dims != (nq, nv) {
                return Err(ModelError::invalid_parametrization(
                    joint,
                    format!("{:?} requires (nq, nv) = {dims:?}, got ({nq}, {nv})", self.kind),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::ErrorKind;

    fn info(nq: usize, nv: usize) -> JointInfo {
        JointInfo {
            id: 0,
            iq: 0,
            iv: 0,
            nq,
            nv,
        }
    }

    #[test]
    fn minimal_round_trip_for_rotations() {
        let rotvec = [0.3, -0.2, 0.5];
        let q = JointKind::Spherical.minimal_to_position(&rotvec);
        assert_eq!(q.len(), 4);
        assert_relative_eq!(q.norm(), 1.0, epsilon = 1e-12);
        let back = JointKind::Spherical.position_to_minimal(q.as_slice());
        assert_relative_eq!(back, DVector::from_column_slice(&rotvec), epsilon = 1e-12);

        let q = JointKind::UnitCircle.minimal_to_position(&[2.0]);
        assert_relative_eq!(q[0], 2.0_f64.cos());
        assert_relative_eq!(
            JointKind::UnitCircle.position_to_minimal(q.as_slice())[0],
            2.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn free_flyer_pose_maps_agree_with_minimal_map() {
        let minimal = [1., 2., 3., 0.1, 0.2, -0.3];
        let q = JointKind::FreeFlyer.minimal_to_position(&minimal);
        let pose = JointKind::FreeFlyer.forward_kinematics(q.as_slice()).unwrap();
        assert_relative_eq!(pose.translation.vector, Vector3::new(1., 2., 3.));
        assert_relative_eq!(
            pose.rotation.scaled_axis(),
            Vector3::new(0.1, 0.2, -0.3),
            epsilon = 1e-12
        );
        let q2 = JointKind::FreeFlyer.inverse_kinematics(&pose).unwrap();
        assert_relative_eq!(q, q2, epsilon = 1e-12);
        assert!(JointKind::Spherical.forward_kinematics(&[0., 0., 0., 1.]).is_none());
    }

    #[test]
    fn neutral_values() {
        assert_eq!(JointKind::Euclidean.neutral(3), DVector::zeros(3));
        assert_eq!(JointKind::FreeFlyer.neutral(7)[6], 1.0);
        assert_eq!(JointKind::Spherical.neutral(4)[3], 1.0);
    }

    #[test]
    fn integrate_rotates_in_joint_frame() {
        let q = JointKind::Spherical.neutral(4);
        let q1 = JointKind::Spherical.integrate(q.as_slice(), &[0., 0., 1.], 0.5);
        let rot = JointKind::Spherical.position_to_minimal(q1.as_slice());
        assert_relative_eq!(rot, DVector::from_column_slice(&[0., 0., 0.5]), epsilon = 1e-12);

        let q = JointKind::Euclidean.integrate(&[1., 2.], &[1., -1.], 0.5);
        assert_eq!(q, DVector::from_column_slice(&[1.5, 1.5]));
    }

    #[test]
    fn validation_rejects_non_euclidean_without_maps() {
        let bad = JointParametrization {
            info: info(4, 3),
            neutral: DVector::zeros(4),
            kind: JointKind::Euclidean,
        };
        let err = bad.validate("ball", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert!(err.to_string().contains("ball"));

        let good = JointParametrization::new(info(4, 3), JointKind::Spherical);
        assert!(good.validate("ball", false).is_ok());
    }

    #[test]
    fn validation_requires_pose_maps_on_floating_joints() {
        let p = JointParametrization::new(info(4, 3), JointKind::Spherical);
        let err = p.validate("base", true).unwrap_err();
        assert!(matches!(err, ModelError::MissingConversion { .. }));
        assert!(err.to_string().contains("forward/inverse kinematics"));

        let ff = JointParametrization::new(info(7, 6), JointKind::FreeFlyer);
        assert!(ff.validate("base", true).is_ok());
        // a 6-dof euclidean floating joint needs no conversions
        let euler = JointParametrization::new(info(6, 6), JointKind::Euclidean);
        assert!(euler.validate("base", true).is_ok());
    }

    #[test]
    fn validation_rejects_dimension_disagreement() {
        let p = JointParametrization::new(info(2, 2), JointKind::UnitCircle);
        assert!(matches!(
            p.validate("wheel", false),
            Err(ModelError::InvalidParametrization { .. })
        ));
    }
}
