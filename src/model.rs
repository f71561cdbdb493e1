use std::cell::RefCell;
use std::path::Path;

use hashbrown::HashMap;
use nalgebra::DVector;

use crate::backend::{BackendRegistry, KinematicsBackend};
use crate::error::{ModelError, Result};
use crate::joint::{Joint, JointMut, JointRef};
use crate::named_state::SemanticDescription;
use crate::parametrization::{JointInfo, JointParametrization};
use crate::state::{Command, ControlMode, State};
use crate::urdf::{read_robot_file, read_robot_str, LinkTree};
use crate::Jacobian;

/// Unsealed model: a robot tree, its backend and an optional semantic
/// description, waiting to be finalized.
#[derive(Debug)]
pub struct ModelBuilder {
    robot: urdf_rs::Robot,
    semantic: Option<SemanticDescription>,
    backend: Box<dyn KinematicsBackend>,
}

impl ModelBuilder {
    pub fn new(robot: urdf_rs::Robot, backend: Box<dyn KinematicsBackend>) -> Self {
        Self {
            robot,
            semantic: None,
            backend,
        }
    }

    /// Builder whose backend is created from `registry` by tag.
    pub fn with_registry(
        robot: urdf_rs::Robot,
        registry: &BackendRegistry,
        tag: &str,
    ) -> Result<Self> {
        let backend = registry.create(tag, &robot)?;
        Ok(Self::new(robot, backend))
    }

    pub fn with_semantic(mut self, semantic: SemanticDescription) -> Self {
        self.semantic = Some(semantic);
        self
    }

    /// Seals the model.
    ///
    /// Non-fixed joints are collected in depth-first pre-order and asked to
    /// the backend for their parametrization. Their index ranges must be
    /// packed back to back, and non-Euclidean joints must come with the
    /// conversions their kind requires. On success the state is sized, set to
    /// the neutral configuration and pushed through one backend update.
    pub fn finalize(self) -> Result<Model> {
        let Self {
            robot,
            semantic,
            mut backend,
        } = self;
        let tree = LinkTree::from_robot(&robot)?;

        let mut registered: Vec<(&urdf_rs::Joint, JointParametrization)> = Vec::new();
        let mut name_id_map = HashMap::new();
        let (mut nq, mut nv) = (0, 0);
        for j in tree.joints_preorder() {
            let joint = &robot.joints[j];
            if matches!(joint.joint_type, urdf_rs::JointType::Fixed) {
                tracing::debug!(joint = %joint.name, "skipping fixed joint");
                continue;
            }
            let mut param = backend
                .joint_parametrization(&joint.name)
                .ok_or_else(|| ModelError::UnknownJoint(joint.name.clone()))?;
            param.info.id = registered.len();
            nq += param.info.nq;
            nv += param.info.nv;
            name_id_map.insert(joint.name.clone(), param.info.id);
            tracing::debug!(
                joint = %joint.name,
                id = param.info.id,
                iq = param.info.iq,
                nq = param.info.nq,
                iv = param.info.iv,
                nv = param.info.nv,
                "registered joint"
            );
            registered.push((joint, param));
        }

        check_packing(&registered, nq, nv)?;
        for (joint, param) in &registered {
            let floating = matches!(joint.joint_type, urdf_rs::JointType::Floating);
            param.validate(&joint.name, floating)?;
        }

        let mut state = State::default();
        state.resize(nq, nv);
        let mut cmd = Command::default();
        cmd.resize(nq, nv, registered.len());

        let mut q_neutral = DVector::zeros(nq);
        for (_, param) in &registered {
            param.info.q_view().of_mut(&mut q_neutral).copy_from(&param.neutral);
        }
        state.q_link.copy_from(&q_neutral);
        state.q_motor.copy_from(&q_neutral);
        state.q_ref.copy_from(&q_neutral);
        cmd.q_cmd.copy_from(&q_neutral);

        let joints: Vec<Joint> = registered
            .into_iter()
            .map(|(joint, param)| {
                Joint::new(
                    joint.name.clone(),
                    joint.joint_type.clone(),
                    param.info,
                    param.kind,
                )
            })
            .collect();

        backend.update(&state);
        tracing::info!(
            robot = %robot.name,
            nq,
            nv,
            joints = joints.len(),
            "model finalized"
        );

        Ok(Model {
            robot,
            semantic,
            backend,
            joints,
            name_id_map,
            state,
            cmd,
            q_neutral,
            scratch: RefCell::new(Jacobian::zeros(nv)),
        })
    }
}

// each range ends within the totals and the next one starts where it ends
fn check_packing(
    registered: &[(&urdf_rs::Joint, JointParametrization)],
    nq: usize,
    nv: usize,
) -> Result<()> {
    let fail = |axis: &'static str, relation: &'static str, joint: &urdf_rs::Joint| {
        ModelError::IndexConsistency {
            axis,
            relation,
            joint: joint.name.clone(),
        }
    };
    for (i, (joint, param)) in registered.iter().enumerate() {
        let JointInfo { iq, iv, .. } = param.info;
        let (q_end, v_end) = (iq + param.info.nq, iv + param.info.nv);
        if q_end > nq {
            return Err(fail("q", "out of range", joint));
        }
        if v_end > nv {
            return Err(fail("v", "out of range", joint));
        }
        if let Some((next, next_param)) = registered.get(i + 1) {
            if q_end != next_param.info.iq {
                return Err(fail("q", "not consecutive", next));
            }
            if v_end != next_param.info.iv {
                return Err(fail("v", "not consecutive", next));
            }
        }
    }
    Ok(())
}

/// Sealed kinematic model.
///
/// Joint layout and identities are fixed; only the numeric contents of the
/// state and command vectors change. Kinematic queries observe the state as
/// of the last [`Model::update`].
///
/// Queries share an internal Jacobian workspace, so a model is not `Sync`.
#[derive(Debug)]
pub struct Model {
    pub(crate) robot: urdf_rs::Robot,
    pub(crate) semantic: Option<SemanticDescription>,
    pub(crate) backend: Box<dyn KinematicsBackend>,
    pub(crate) joints: Vec<Joint>,
    pub(crate) name_id_map: HashMap<String, usize>,
    pub(crate) state: State,
    pub(crate) cmd: Command,
    pub(crate) q_neutral: DVector<f64>,
    pub(crate) scratch: RefCell<Jacobian>,
}

impl Model {
    /// Parses a URDF document and finalizes it with a backend from the
    /// default registry.
    pub fn from_urdf_str(xml: &str, backend: &str) -> Result<Self> {
        let robot = read_robot_str(xml)?;
        ModelBuilder::with_registry(robot, &BackendRegistry::default(), backend)?.finalize()
    }

    pub fn from_urdf_file(path: impl AsRef<Path>, backend: &str) -> Result<Self> {
        let robot = read_robot_file(path)?;
        ModelBuilder::with_registry(robot, &BackendRegistry::default(), backend)?.finalize()
    }

    pub fn robot(&self) -> &urdf_rs::Robot {
        &self.robot
    }

    pub fn semantic(&self) -> Option<&SemanticDescription> {
        self.semantic.as_ref()
    }

    pub fn backend(&self) -> &dyn KinematicsBackend {
        self.backend.as_ref()
    }

    pub fn joint_num(&self) -> usize {
        self.joints.len()
    }

    pub fn nq(&self) -> usize {
        self.state.nq()
    }

    pub fn nv(&self) -> usize {
        self.state.nv()
    }

    pub fn has_joint(&self, name: &str) -> bool {
        self.name_id_map.contains_key(name)
    }

    pub fn joint_id(&self, name: &str) -> Result<usize> {
        self.name_id_map.get(name).copied().ok_or_else(|| {
            tracing::warn!(joint = name, "joint not found");
            ModelError::JointNotFound(name.to_string())
        })
    }

    pub fn joint_info(&self, name: &str) -> Result<JointInfo> {
        Ok(self.joints[self.joint_id(name)?].info())
    }

    pub fn joint_info_by_id(&self, id: usize) -> Result<JointInfo> {
        Ok(self.checked_joint(id)?.info())
    }

    pub fn joint(&self, name: &str) -> Result<JointRef<'_>> {
        let id = self.joint_id(name)?;
        Ok(JointRef::new(self, &self.joints[id]))
    }

    pub fn joint_by_id(&self, id: usize) -> Result<JointRef<'_>> {
        Ok(JointRef::new(self, self.checked_joint(id)?))
    }

    pub fn joint_mut(&mut self, name: &str) -> Result<JointMut<'_>> {
        let id = self.joint_id(name)?;
        Ok(JointMut::new(self, id))
    }

    pub fn joint_mut_by_id(&mut self, id: usize) -> Result<JointMut<'_>> {
        self.checked_joint(id)?;
        Ok(JointMut::new(self, id))
    }

    pub fn joints(&self) -> impl Iterator<Item = JointRef<'_>> {
        self.joints.iter().map(move |joint| JointRef::new(self, joint))
    }

    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(Joint::name).collect()
    }

    fn checked_joint(&self, id: usize) -> Result<&Joint> {
        self.joints.get(id).ok_or_else(|| {
            tracing::warn!(id, "joint index out of range");
            ModelError::JointIndexOutOfRange(id)
        })
    }

    /// Concatenation of every joint's neutral position.
    pub fn neutral_configuration(&self) -> &DVector<f64> {
        &self.q_neutral
    }

    pub fn link_id(&self, name: &str) -> Result<usize> {
        self.backend.link_id(name).ok_or_else(|| {
            tracing::warn!(link = name, "link not found");
            ModelError::LinkNotFound(name.to_string())
        })
    }

    pub fn has_link(&self, name: &str) -> bool {
        self.backend.link_id(name).is_some()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn command(&self) -> &Command {
        &self.cmd
    }

    pub fn set_position_command(&mut self, q: &DVector<f64>) -> Result<()> {
        assign(&mut self.cmd.q_cmd, q, "position command")
    }

    pub fn set_velocity_command(&mut self, v: &DVector<f64>) -> Result<()> {
        assign(&mut self.cmd.v_cmd, v, "velocity command")
    }

    pub fn set_effort_command(&mut self, tau: &DVector<f64>) -> Result<()> {
        assign(&mut self.cmd.effort_cmd, tau, "effort command")
    }

    /// One mode per joint, in id order.
    pub fn set_control_mode(&mut self, modes: &[ControlMode]) -> Result<()> {
        if modes.len() != self.cmd.ctrl_mode.len() {
            return Err(ModelError::dimension(
                "control mode",
                self.cmd.ctrl_mode.len(),
                modes.len(),
            ));
        }
        self.cmd.ctrl_mode.copy_from_slice(modes);
        Ok(())
    }

    pub fn joint_position(&self) -> &DVector<f64> {
        &self.state.q_link
    }

    pub fn motor_position(&self) -> &DVector<f64> {
        &self.state.q_motor
    }

    pub fn reference_position(&self) -> &DVector<f64> {
        &self.state.q_ref
    }

    pub fn joint_velocity(&self) -> &DVector<f64> {
        &self.state.v
    }

    pub fn joint_acceleration(&self) -> &DVector<f64> {
        &self.state.a
    }

    pub fn joint_effort(&self) -> &DVector<f64> {
        &self.state.effort
    }

    pub fn set_joint_position(&mut self, q: &DVector<f64>) -> Result<()> {
        assign(&mut self.state.q_link, q, "joint position")
    }

    pub fn set_motor_position(&mut self, q: &DVector<f64>) -> Result<()> {
        assign(&mut self.state.q_motor, q, "motor position")
    }

    pub fn set_reference_position(&mut self, q: &DVector<f64>) -> Result<()> {
        assign(&mut self.state.q_ref, q, "reference position")
    }

    pub fn set_joint_velocity(&mut self, v: &DVector<f64>) -> Result<()> {
        assign(&mut self.state.v, v, "joint velocity")
    }

    pub fn set_joint_acceleration(&mut self, a: &DVector<f64>) -> Result<()> {
        assign(&mut self.state.a, a, "joint acceleration")
    }

    pub fn set_joint_effort(&mut self, tau: &DVector<f64>) -> Result<()> {
        assign(&mut self.state.effort, tau, "joint effort")
    }

    pub fn update(&mut self) {
        self.backend.update(&self.state);
    }

    /// Copies link position, velocity, acceleration and effort from a model
    /// with the same dimensions. Motor and reference positions are left alone.
    ///
    /// Call [`Model::update`] afterwards to refresh kinematic queries.
    pub fn sync_from(&mut self, other: &Model) -> Result<()> {
        if other.nq() != self.nq() {
            return Err(ModelError::dimension("joint position", self.nq(), other.nq()));
        }
        if other.nv() != self.nv() {
            return Err(ModelError::dimension("joint velocity", self.nv(), other.nv()));
        }
        self.state.q_link.copy_from(&other.state.q_link);
        self.state.v.copy_from(&other.state.v);
        self.state.a.copy_from(&other.state.a);
        self.state.effort.copy_from(&other.state.effort);
        Ok(())
    }

    /// Moves `q` along `v` for `dt` seconds, joint by joint on its own manifold.
    pub fn integrate(&self, q: &DVector<f64>, v: &DVector<f64>, dt: f64) -> Result<DVector<f64>> {
        if q.len() != self.nq() {
            return Err(ModelError::dimension("joint position", self.nq(), q.len()));
        }
        if v.len() != self.nv() {
            return Err(ModelError::dimension("joint velocity", self.nv(), v.len()));
        }
        let mut out = q.clone();
        for joint in &self.joints {
            let (qv, vv) = (joint.q_view(), joint.v_view());
            let next = joint.kind().integrate(
                &q.as_slice()[qv.offset..qv.end()],
                &v.as_slice()[vv.offset..vv.end()],
                dt,
            );
            qv.of_mut(&mut out).copy_from(&next);
        }
        Ok(out)
    }
}

fn assign(target: &mut DVector<f64>, values: &DVector<f64>, what: &'static str) -> Result<()> {
    if target.len() != values.len() {
        return Err(ModelError::dimension(what, target.len(), values.len()));
    }
    target.copy_from(values);
    Ok(())
}
