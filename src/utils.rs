use nalgebra::{Isometry3, Matrix3, Translation3, Unit, UnitQuaternion, Vector3};

use crate::{Jacobian, Twist};

pub(crate) fn url_is_urdf_file(url: &str) -> bool {
    std::path::Path::new(url).exists() && (url.ends_with(".urdf") || url.ends_with(".URDF"))
}

pub(crate) fn pose_to_isometry(pose: &urdf_rs::Pose) -> Isometry3<f64> {
    let rpy = pose.rpy;
    Isometry3::from_parts(
        Translation3::new(pose.xyz[0], pose.xyz[1], pose.xyz[2]),
        UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
    )
}

// normalized joint axis, falls back to x when the document gives a zero axis
pub(crate) fn joint_axis(joint: &urdf_rs::Joint) -> Unit<Vector3<f64>> {
    let axis = Vector3::new(joint.axis.xyz[0], joint.axis.xyz[1], joint.axis.xyz[2]);
    Unit::try_new(axis, f64::EPSILON).unwrap_or_else(Vector3::x_axis)
}

pub(crate) fn linear(twist: &Twist) -> Vector3<f64> {
    twist.fixed_rows::<3>(0).into_owned()
}

pub(crate) fn angular(twist: &Twist) -> Vector3<f64> {
    twist.fixed_rows::<3>(3).into_owned()
}

pub(crate) fn stack(linear: &Vector3<f64>, angular: &Vector3<f64>) -> Twist {
    Twist::new(linear.x, linear.y, linear.z, angular.x, angular.y, angular.z)
}

pub(crate) fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    v.cross_matrix()
}

/// Moves the reference point of every column by `r`: a body twist taken at
/// point `p` becomes the twist of the same body at `p + r`.
///
/// linear += angular x r, angular unchanged
pub(crate) fn change_ref_point(jacobian: &mut Jacobian, r: &Vector3<f64>) {
    for mut col in jacobian.column_iter_mut() {
        let shift = Vector3::new(col[3], col[4], col[5]).cross(r);
        col[0] += shift.x;
        col[1] += shift.y;
        col[2] += shift.z;
    }
}

pub(crate) fn change_twist_ref_point(twist: &mut Twist, r: &Vector3<f64>) {
    let shift = angular(twist).cross(r);
    let mut lin = twist.fixed_rows_mut::<3>(0);
    lin += shift;
}

/// Left-multiplies both 3-row blocks by `rot`.
pub(crate) fn rotate(jacobian: &mut Jacobian, rot: &Matrix3<f64>) {
    let lin = rot * jacobian.fixed_rows::<3>(0);
    let ang = rot * jacobian.fixed_rows::<3>(3);
    jacobian.fixed_rows_mut::<3>(0).copy_from(&lin);
    jacobian.fixed_rows_mut::<3>(3).copy_from(&ang);
}

pub(crate) fn rotate_twist(twist: &Twist, rot: &Matrix3<f64>) -> Twist {
    stack(&(rot * linear(twist)), &(rot * angular(twist)))
}
