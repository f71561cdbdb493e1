//! Joint handles.
//!
//! A [`Joint`] is immutable after finalization. Its values live in the
//! model's global state and command vectors and are reached through
//! [`JointRef`] / [`JointMut`], which resolve the joint's index views on
//! every access.

use std::ops::Deref;

use nalgebra::{DVector, DVectorView, Isometry3};

use crate::error::{ModelError, Result};
use crate::parametrization::{JointInfo, JointKind, View};
use crate::state::ControlMode;
use crate::Model;

#[derive(Debug, Clone)]
pub struct Joint {
    name: String,
    joint_type: urdf_rs::JointType,
    info: JointInfo,
    kind: JointKind,
}

impl Joint {
    pub(crate) fn new(
        name: String,
        joint_type: urdf_rs::JointType,
        info: JointInfo,
        kind: JointKind,
    ) -> Self {
        Self {
            name,
            joint_type,
            info,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joint_type(&self) -> &urdf_rs::JointType {
        &self.joint_type
    }

    pub fn info(&self) -> JointInfo {
        self.info
    }

    pub fn kind(&self) -> JointKind {
        self.kind
    }

    pub fn id(&self) -> usize {
        self.info.id
    }

    pub fn nq(&self) -> usize {
        self.info.nq
    }

    pub fn nv(&self) -> usize {
        self.info.nv
    }

    pub fn q_view(&self) -> View {
        self.info.q_view()
    }

    pub fn v_view(&self) -> View {
        self.info.v_view()
    }

    pub fn minimal_to_position(&self, minimal: &[f64]) -> Result<DVector<f64>> {
        check("minimal coordinates", self.nv(), minimal.len())?;
        Ok(self.kind.minimal_to_position(minimal))
    }

    pub fn position_to_minimal(&self, q: &[f64]) -> Result<DVector<f64>> {
        check("joint position", self.nq(), q.len())?;
        Ok(self.kind.position_to_minimal(q))
    }

    /// Pose encoded by the joint position; free-flyer joints only.
    pub fn forward_kinematics(&self, q: &[f64]) -> Result<Isometry3<f64>> {
        check("joint position", self.nq(), q.len())?;
        self.kind
            .forward_kinematics(q)
            .ok_or(ModelError::Unimplemented("joint forward kinematics"))
    }

    /// Joint position encoding a pose; free-flyer joints only.
    pub fn inverse_kinematics(&self, pose: &Isometry3<f64>) -> Result<DVector<f64>> {
        self.kind
            .inverse_kinematics(pose)
            .ok_or(ModelError::Unimplemented("joint inverse kinematics"))
    }

    pub fn integrate(&self, q: &[f64], v: &[f64], dt: f64) -> Result<DVector<f64>> {
        check("joint position", self.nq(), q.len())?;
        check("joint velocity", self.nv(), v.len())?;
        Ok(self.kind.integrate(q, v, dt))
    }
}

fn check(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ModelError::dimension(what, expected, actual))
    }
}

/// Read access to one joint's slice of the model state.
#[derive(Debug, Clone, Copy)]
pub struct JointRef<'a> {
    model: &'a Model,
    joint: &'a Joint,
}

impl<'a> Deref for JointRef<'a> {
    type Target = Joint;

    fn deref(&self) -> &Joint {
        self.joint
    }
}

impl<'a> JointRef<'a> {
    pub(crate) fn new(model: &'a Model, joint: &'a Joint) -> Self {
        Self { model, joint }
    }

    pub fn position(&self) -> DVectorView<'a, f64> {
        self.joint.q_view().of(&self.model.state.q_link)
    }

    pub fn motor_position(&self) -> DVectorView<'a, f64> {
        self.joint.q_view().of(&self.model.state.q_motor)
    }

    pub fn reference_position(&self) -> DVectorView<'a, f64> {
        self.joint.q_view().of(&self.model.state.q_ref)
    }

    pub fn velocity(&self) -> DVectorView<'a, f64> {
        self.joint.v_view().of(&self.model.state.v)
    }

    pub fn acceleration(&self) -> DVectorView<'a, f64> {
        self.joint.v_view().of(&self.model.state.a)
    }

    pub fn effort(&self) -> DVectorView<'a, f64> {
        self.joint.v_view().of(&self.model.state.effort)
    }

    pub fn position_command(&self) -> DVectorView<'a, f64> {
        self.joint.q_view().of(&self.model.cmd.q_cmd)
    }

    pub fn velocity_command(&self) -> DVectorView<'a, f64> {
        self.joint.v_view().of(&self.model.cmd.v_cmd)
    }

    pub fn effort_command(&self) -> DVectorView<'a, f64> {
        self.joint.v_view().of(&self.model.cmd.effort_cmd)
    }

    pub fn control_mode(&self) -> ControlMode {
        self.model.cmd.ctrl_mode[self.joint.id()]
    }

    /// Current link-side position in minimal coordinates.
    pub fn minimal_position(&self) -> DVector<f64> {
        let view = self.joint.q_view();
        let q = &self.model.state.q_link.as_slice()[view.offset..view.end()];
        self.joint.kind.position_to_minimal(q)
    }
}

/// Write access to one joint's slice of the model state and command.
#[derive(Debug)]
pub struct JointMut<'a> {
    model: &'a mut Model,
    id: usize,
}

impl<'a> JointMut<'a> {
    pub(crate) fn new(model: &'a mut Model, id: usize) -> Self {
        Self { model, id }
    }

    pub fn joint(&self) -> &Joint {
        &self.model.joints[self.id]
    }

    pub fn set_position(&mut self, q: &[f64]) -> Result<()> {
        let view = self.joint().q_view();
        write(view, &mut self.model.state.q_link, q, "joint position")
    }

    pub fn set_motor_position(&mut self, q: &[f64]) -> Result<()> {
        let view = self.joint().q_view();
        write(view, &mut self.model.state.q_motor, q, "motor position")
    }

    pub fn set_reference_position(&mut self, q: &[f64]) -> Result<()> {
        let view = self.joint().q_view();
        write(view, &mut self.model.state.q_ref, q, "reference position")
    }

    /// Sets the link-side position from minimal coordinates.
    pub fn set_minimal_position(&mut self, minimal: &[f64]) -> Result<()> {
        let q = self.joint().minimal_to_position(minimal)?;
        self.set_position(q.as_slice())
    }

    pub fn set_velocity(&mut self, v: &[f64]) -> Result<()> {
        let view = self.joint().v_view();
        write(view, &mut self.model.state.v, v, "joint velocity")
    }

    pub fn set_acceleration(&mut self, a: &[f64]) -> Result<()> {
        let view = self.joint().v_view();
        write(view, &mut self.model.state.a, a, "joint acceleration")
    }

    pub fn set_effort(&mut self, tau: &[f64]) -> Result<()> {
        let view = self.joint().v_view();
        write(view, &mut self.model.state.effort, tau, "joint effort")
    }

    pub fn set_position_command(&mut self, q: &[f64]) -> Result<()> {
        let view = self.joint().q_view();
        write(view, &mut self.model.cmd.q_cmd, q, "position command")
    }

    pub fn set_velocity_command(&mut self, v: &[f64]) -> Result<()> {
        let view = self.joint().v_view();
        write(view, &mut self.model.cmd.v_cmd, v, "velocity command")
    }

    pub fn set_effort_command(&mut self, tau: &[f64]) -> Result<()> {
        let view = self.joint().v_view();
        write(view, &mut self.model.cmd.effort_cmd, tau, "effort command")
    }

    pub fn set_control_mode(&mut self, mode: ControlMode) {
        self.model.cmd.ctrl_mode[self.id] = mode;
    }
}

fn write(view: View, target: &mut DVector<f64>, values: &[f64], what: &'static str) -> Result<()> {
    check(what, view.count, values.len())?;
    view.of_mut(target).copy_from_slice(values);
    Ok(())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::branched_model;

    #[test]
    fn views_read_the_joint_slice() {
        let mut model = branched_model();
        {
            let mut knee = model.joint_mut("left_knee").unwrap();
            knee.set_position(&[0.7]).unwrap();
            knee.set_velocity(&[-0.2]).unwrap();
            knee.set_control_mode(ControlMode::Position);
        }
        let knee = model.joint("left_knee").unwrap();
        assert_eq!(knee.position()[0], 0.7);
        assert_eq!(knee.velocity()[0], -0.2);
        assert_eq!(knee.control_mode(), ControlMode::Position);
        assert_eq!(model.joint_position()[knee.info().iq], 0.7);
        assert_eq!(model.joint_velocity()[knee.info().iv], -0.2);
        // untouched joints keep the unset sentinel
        assert_eq!(
            model.joint("left_hip").unwrap().control_mode(),
            ControlMode::Unset
        );
    }

    #[test]
    fn setters_reject_wrong_sizes() {
        let mut model = branched_model();
        let mut base = model.joint_mut("floating_base").unwrap();
        let err = base.set_velocity(&[0.0; 7]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert!(base.set_position(&[0.0; 7]).is_ok());
    }

    #[test]
    fn free_flyer_minimal_position_round_trip() {
        let mut model = branched_model();
        let minimal = [0.5, -0.1, 0.9, 0.2, 0.1, -0.3];
        model
            .joint_mut("floating_base")
            .unwrap()
            .set_minimal_position(&minimal)
            .unwrap();
        let base = model.joint("floating_base").unwrap();
        assert_eq!(base.position().len(), 7);
        assert_relative_eq!(
            base.minimal_position(),
            DVector::from_column_slice(&minimal),
            epsilon = 1e-12
        );
        let pose = base.forward_kinematics(base.position().as_slice()).unwrap();
        assert_relative_eq!(pose.translation.vector.z, 0.9);
        let q = base.inverse_kinematics(&pose).unwrap();
        assert_relative_eq!(q, base.position().into_owned(), epsilon = 1e-12);
    }

    #[test]
    fn euclidean_joints_have_no_pose_map() {
        let model = branched_model();
        let hip = model.joint("left_hip").unwrap();
        let err = hip.forward_kinematics(&[0.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
        assert_eq!(hip.minimal_to_position(&[0.3]).unwrap()[0], 0.3);
        assert!(hip.minimal_to_position(&[0.3, 0.1]).is_err());
    }
}
