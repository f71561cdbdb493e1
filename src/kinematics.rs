//! Absolute and relative link kinematics.
//!
//! Everything here is composed from the backend's per-link pose, Jacobian and
//! bias acceleration. Twists are `[linear; angular]`; absolute quantities use
//! world orientation with the linear part taken at the link origin, relative
//! quantities `(distal, base)` describe the distal link's origin as seen from
//! the base frame and are expressed in base coordinates.
//!
//! Name-based queries resolve links first and fail with
//! [`ModelError::LinkNotFound`](crate::ModelError::LinkNotFound). The `_by_id`
//! forms take backend link ids as returned by [`Model::link_id`] and do not
//! check them.

use nalgebra::{Isometry3, Matrix3, Vector3};

use crate::error::Result;
use crate::utils::{
    angular, change_ref_point, change_twist_ref_point, linear, rotate, rotate_twist, skew, stack,
};
use crate::{Jacobian, Model, Twist};

impl Model {
    pub fn pose(&self, link: &str) -> Result<Isometry3<f64>> {
        Ok(self.pose_by_id(self.link_id(link)?))
    }

    pub fn pose_by_id(&self, link: usize) -> Isometry3<f64> {
        self.backend.pose(link)
    }

    /// Pose of `distal` in the frame of `base`.
    pub fn relative_pose(&self, distal: &str, base: &str) -> Result<Isometry3<f64>> {
        Ok(self.relative_pose_by_id(self.link_id(distal)?, self.link_id(base)?))
    }

    pub fn relative_pose_by_id(&self, distal: usize, base: usize) -> Isometry3<f64> {
        self.backend.pose(base).inv_mul(&self.backend.pose(distal))
    }

    pub fn jacobian(&self, link: &str) -> Result<Jacobian> {
        let mut out = Jacobian::zeros(self.nv());
        self.jacobian_by_id(self.link_id(link)?, &mut out);
        Ok(out)
    }

    /// Writes the link Jacobian into `out`, reallocating it if it is not `6 x nv`.
    pub fn jacobian_by_id(&self, link: usize, out: &mut Jacobian) {
        self.fit(out);
        self.backend.jacobian(link, out);
    }

    /// Jacobian of the relative twist of `distal` with respect to `base`.
    pub fn relative_jacobian(&self, distal: &str, base: &str) -> Result<Jacobian> {
        let mut out = Jacobian::zeros(self.nv());
        self.relative_jacobian_by_id(self.link_id(distal)?, self.link_id(base)?, &mut out);
        Ok(out)
    }

    pub fn relative_jacobian_by_id(&self, distal: usize, base: usize, out: &mut Jacobian) {
        self.fit(out);
        self.backend.jacobian(distal, out);

        let (base_pose, r) = self.lever(distal, base);
        let mut base_jacobian = self.scratch.borrow_mut();
        self.backend.jacobian(base, &mut base_jacobian);
        change_ref_point(&mut base_jacobian, &r);
        *out -= &*base_jacobian;
        rotate(out, &rotation_transpose(&base_pose));
    }

    pub fn velocity_twist(&self, link: &str) -> Result<Twist> {
        Ok(self.velocity_twist_by_id(self.link_id(link)?))
    }

    /// `J(link) * v`.
    pub fn velocity_twist_by_id(&self, link: usize) -> Twist {
        let mut jacobian = self.scratch.borrow_mut();
        self.backend.jacobian(link, &mut jacobian);
        &*jacobian * &self.state.v
    }

    pub fn acceleration_twist(&self, link: &str) -> Result<Twist> {
        self.acceleration_twist_by_id(self.link_id(link)?)
    }

    /// `J(link) * a + Jdot(link) * v`.
    pub fn acceleration_twist_by_id(&self, link: usize) -> Result<Twist> {
        let bias = self.backend.jdot_times_v(link)?;
        let mut jacobian = self.scratch.borrow_mut();
        self.backend.jacobian(link, &mut jacobian);
        Ok(&*jacobian * &self.state.a + bias)
    }

    pub fn jdot_times_v(&self, link: &str) -> Result<Twist> {
        self.jdot_times_v_by_id(self.link_id(link)?)
    }

    pub fn jdot_times_v_by_id(&self, link: usize) -> Result<Twist> {
        self.backend.jdot_times_v(link)
    }

    pub fn relative_velocity_twist(&self, distal: &str, base: &str) -> Result<Twist> {
        Ok(self.relative_velocity_twist_by_id(self.link_id(distal)?, self.link_id(base)?))
    }

    pub fn relative_velocity_twist_by_id(&self, distal: usize, base: usize) -> Twist {
        let (base_pose, r) = self.lever(distal, base);
        let rot_t = rotation_transpose(&base_pose);
        let v_distal = self.velocity_twist_by_id(distal);
        let v_base = self.velocity_twist_by_id(base);
        relative(&v_distal, &v_base, &r, &rot_t)
    }

    pub fn relative_acceleration_twist(&self, distal: &str, base: &str) -> Result<Twist> {
        self.relative_acceleration_twist_by_id(self.link_id(distal)?, self.link_id(base)?)
    }

    /// Time derivative of [`Model::relative_velocity_twist_by_id`].
    pub fn relative_acceleration_twist_by_id(&self, distal: usize, base: usize) -> Result<Twist> {
        let a_distal = self.acceleration_twist_by_id(distal)?;
        let a_base = self.acceleration_twist_by_id(base)?;
        Ok(self.relative_derivative(distal, base, &a_distal, &a_base))
    }

    pub fn relative_jdot_times_v(&self, distal: &str, base: &str) -> Result<Twist> {
        self.relative_jdot_times_v_by_id(self.link_id(distal)?, self.link_id(base)?)
    }

    /// Part of the relative acceleration that does not depend on `a`.
    pub fn relative_jdot_times_v_by_id(&self, distal: usize, base: usize) -> Result<Twist> {
        let b_distal = self.backend.jdot_times_v(distal)?;
        let b_base = self.backend.jdot_times_v(base)?;
        Ok(self.relative_derivative(distal, base, &b_distal, &b_base))
    }

    // d/dt of the relative twist given the two absolute acceleration-like twists:
    //   -[w_b]x v_rel + R_b^T (acc_d - shift(acc_b, r) + [r_dot x w_b; 0])
    // with w_b the base angular velocity in base coordinates
    fn relative_derivative(
        &self,
        distal: usize,
        base: usize,
        acc_distal: &Twist,
        acc_base: &Twist,
    ) -> Twist {
        let (base_pose, r) = self.lever(distal, base);
        let rot_t = rotation_transpose(&base_pose);
        let v_distal = self.velocity_twist_by_id(distal);
        let v_base = self.velocity_twist_by_id(base);

        let v_rel = relative(&v_distal, &v_base, &r, &rot_t);
        let omega_base = angular(&v_base);
        let r_dot = linear(&v_distal) - linear(&v_base);

        let mut acc = relative(acc_distal, acc_base, &r, &Matrix3::identity());
        let mut acc_lin = acc.fixed_rows_mut::<3>(0);
        acc_lin += r_dot.cross(&omega_base);
        let acc = rotate_twist(&acc, &rot_t);

        let w = skew(&(rot_t * omega_base));
        let coriolis = stack(&(w * linear(&v_rel)), &(w * angular(&v_rel)));
        acc - coriolis
    }

    // base pose and the lever from base origin to distal origin, world frame
    fn lever(&self, distal: usize, base: usize) -> (Isometry3<f64>, Vector3<f64>) {
        let base_pose = self.backend.pose(base);
        let r = self.backend.pose(distal).translation.vector - base_pose.translation.vector;
        (base_pose, r)
    }

    fn fit(&self, out: &mut Jacobian) {
        if out.ncols() != self.nv() {
            *out = Jacobian::zeros(self.nv());
        }
    }
}

fn rotation_transpose(pose: &Isometry3<f64>) -> Matrix3<f64> {
    pose.rotation.to_rotation_matrix().into_inner().transpose()
}

// rot * (distal - base twist moved to the distal origin)
fn relative(distal: &Twist, base: &Twist, r: &Vector3<f64>, rot: &Matrix3<f64>) -> Twist {
    let mut shifted = *base;
    change_twist_ref_point(&mut shifted, r);
    rotate_twist(&(distal - shifted), rot)
}
