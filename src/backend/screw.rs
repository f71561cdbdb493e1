//! Reference backend: forward recursion over the URDF tree.
//!
//! Poses are propagated from the root as `parent * origin * joint(q)`.
//! Velocities and bias accelerations follow the same recursion with the
//! classical rigid-body transport rules, and Jacobian columns are built from
//! the joint axes found on the root-to-link path.

use hashbrown::HashMap;
use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};

use super::KinematicsBackend;
use crate::error::Result;
use crate::parametrization::{JointInfo, JointKind, JointParametrization};
use crate::state::State;
use crate::urdf::LinkTree;
use crate::utils::{angular, joint_axis, linear, pose_to_isometry, stack};
use crate::{Jacobian, Twist};

#[derive(Debug, Clone, Copy)]
enum Motion {
    Fixed,
    Revolute(Unit<Vector3<f64>>),
    Prismatic(Unit<Vector3<f64>>),
    Free,
    // kinematically treated as fixed, finalize rejects it
    Unsupported,
}

impl Motion {
    fn from_joint(joint: &urdf_rs::Joint) -> Self {
        match joint.joint_type {
            urdf_rs::JointType::Revolute | urdf_rs::JointType::Continuous => {
                Self::Revolute(joint_axis(joint))
            }
            urdf_rs::JointType::Prismatic => Self::Prismatic(joint_axis(joint)),
            urdf_rs::JointType::Floating => Self::Free,
            urdf_rs::JointType::Fixed => Self::Fixed,
            _ => {
                tracing::warn!(
                    joint = %joint.name,
                    joint_type = ?joint.joint_type,
                    "joint type not supported by screw backend"
                );
                Self::Unsupported
            }
        }
    }

    fn coordinates(&self) -> Option<(usize, usize, JointKind)> {
        match self {
            Self::Revolute(_) | Self::Prismatic(_) => Some((1, 1, JointKind::Euclidean)),
            Self::Free => Some((7, 6, JointKind::FreeFlyer)),
            Self::Fixed | Self::Unsupported => None,
        }
    }

    // local transform, linear and angular velocity in the joint frame
    fn evaluate(&self, q: &[f64], v: &[f64]) -> (Isometry3<f64>, Vector3<f64>, Vector3<f64>) {
        match self {
            Self::Revolute(axis) => (
                Isometry3::from_parts(
                    Translation3::identity(),
                    UnitQuaternion::from_axis_angle(axis, q[0]),
                ),
                Vector3::zeros(),
                axis.into_inner() * v[0],
            ),
            Self::Prismatic(axis) => (
                Isometry3::from_parts(
                    Translation3::from(axis.into_inner() * q[0]),
                    UnitQuaternion::identity(),
                ),
                axis.into_inner() * v[0],
                Vector3::zeros(),
            ),
            Self::Free => (
                JointKind::FreeFlyer
                    .forward_kinematics(q)
                    .unwrap_or_else(Isometry3::identity),
                Vector3::new(v[0], v[1], v[2]),
                Vector3::new(v[3], v[4], v[5]),
            ),
            Self::Fixed | Self::Unsupported => {
                (Isometry3::identity(), Vector3::zeros(), Vector3::zeros())
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ScrewJoint {
    // joint frame relative to the parent link
    origin: Isometry3<f64>,
    motion: Motion,
    param: Option<JointParametrization>,
}

#[derive(Debug, Clone)]
struct ScrewLink {
    parent: Option<usize>,
    joint: Option<ScrewJoint>,

    // world quantities, refreshed by update()
    pose: Isometry3<f64>,
    joint_frame: Isometry3<f64>,
    twist: Twist,
    bias: Twist,
}

/// Kinematics computed directly from the URDF joint screws.
///
/// Revolute, continuous and prismatic joints are single Euclidean
/// coordinates; floating joints use [`JointKind::FreeFlyer`]. Other joint
/// types are reported as unknown.
#[derive(Debug, Clone)]
pub struct ScrewBackend {
    tree: LinkTree,
    links: Vec<ScrewLink>,
    // joint name -> child link
    joint_links: HashMap<String, usize>,
}

impl ScrewBackend {
    /// Registry tag.
    pub const TAG: &'static str = "screw";

    pub fn new(robot: &urdf_rs::Robot) -> Result<Self> {
        let tree = LinkTree::from_robot(robot)?;
        let mut links: Vec<ScrewLink> = (0..tree.link_count())
            .map(|link| ScrewLink {
                parent: tree.parent(link),
                joint: None,
                pose: Isometry3::identity(),
                joint_frame: Isometry3::identity(),
                twist: Twist::zeros(),
                bias: Twist::zeros(),
            })
            .collect();

        // pack coordinates in the same pre-order the model uses
        let mut joint_links = HashMap::with_capacity(robot.joints.len());
        let (mut id, mut iq, mut iv) = (0, 0, 0);
        for &link in tree.preorder() {
            let Some(j) = tree.parent_joint(link) else {
                continue;
            };
            let joint = &robot.joints[j];
            let motion = Motion::from_joint(joint);
            let param = motion.coordinates().map(|(nq, nv, kind)| {
                let info = JointInfo { id, iq, iv, nq, nv };
                id += 1;
                iq += nq;
                iv += nv;
                JointParametrization::new(info, kind)
            });
            links[link].joint = Some(ScrewJoint {
                origin: pose_to_isometry(&joint.origin),
                motion,
                param,
            });
            joint_links.insert(joint.name.clone(), link);
        }

        Ok(Self {
            tree,
            links,
            joint_links,
        })
    }

    /// Boxed constructor matching [`super::BackendFactory`].
    pub fn create(robot: &urdf_rs::Robot) -> Result<Box<dyn KinematicsBackend>> {
        Ok(Box::new(Self::new(robot)?))
    }
}

impl KinematicsBackend for ScrewBackend {
    fn link_id(&self, name: &str) -> Option<usize> {
        self.tree.link_id(name)
    }

    fn joint_parametrization(&self, name: &str) -> Option<JointParametrization> {
        let link = *self.joint_links.get(name)?;
        self.links[link].joint.as_ref()?.param.clone()
    }

    // state.a does not enter the bias term
    fn update(&mut self, state: &State) {
        for &link in self.tree.preorder() {
            let Some(parent) = self.links[link].parent else {
                let root = &mut self.links[link];
                root.pose = Isometry3::identity();
                root.joint_frame = Isometry3::identity();
                root.twist = Twist::zeros();
                root.bias = Twist::zeros();
                continue;
            };
            let (origin, motion, info) = match &self.links[link].joint {
                Some(joint) => (joint.origin, joint.motion, joint.param.as_ref().map(|p| p.info)),
                None => continue,
            };

            let (q, v): (&[f64], &[f64]) = match info {
                Some(info) => (
                    &state.q_link.as_slice()[info.iq..info.iq + info.nq],
                    &state.v.as_slice()[info.iv..info.iv + info.nv],
                ),
                None => (&[], &[]),
            };
            let (local, u_local, w_local) = motion.evaluate(q, v);

            let parent_link = &self.links[parent];
            let joint_frame = parent_link.pose * origin;
            let pose = joint_frame * local;
            let r = pose.translation.vector - parent_link.pose.translation.vector;
            let u = joint_frame.rotation * u_local;
            let w = joint_frame.rotation * w_local;

            let (v_p, om_p) = (linear(&parent_link.twist), angular(&parent_link.twist));
            let (a_p, alpha_p) = (linear(&parent_link.bias), angular(&parent_link.bias));

            let twist = stack(&(v_p + om_p.cross(&r) + u), &(om_p + w));
            let bias = stack(
                &(a_p + alpha_p.cross(&r) + om_p.cross(&om_p.cross(&r)) + 2.0 * om_p.cross(&u)),
                &(alpha_p + om_p.cross(&w)),
            );

            let this = &mut self.links[link];
            this.pose = pose;
            this.joint_frame = joint_frame;
            this.twist = twist;
            this.bias = bias;
        }
    }

    fn pose(&self, link: usize) -> Isometry3<f64> {
        self.links[link].pose
    }

    fn jacobian(&self, link: usize, out: &mut Jacobian) {
        out.fill(0.0);
        let p_link = self.links[link].pose.translation.vector;

        let mut current = link;
        while let Some(parent) = self.links[current].parent {
            let body = &self.links[current];
            if let Some(ScrewJoint {
                motion,
                param: Some(param),
                ..
            }) = &body.joint
            {
                let rot = body.joint_frame.rotation;
                let r = p_link - body.pose.translation.vector;
                let iv = param.info.iv;
                match motion {
                    Motion::Revolute(axis) => {
                        let w = rot * axis.into_inner();
                        out.set_column(iv, &stack(&w.cross(&r), &w));
                    }
                    Motion::Prismatic(axis) => {
                        out.set_column(iv, &stack(&(rot * axis.into_inner()), &Vector3::zeros()));
                    }
                    Motion::Free => {
                        for k in 0..3 {
                            let e = rot * Vector3::ith(k, 1.0);
                            out.set_column(iv + k, &stack(&e, &Vector3::zeros()));
                            out.set_column(iv + 3 + k, &stack(&e.cross(&r), &e));
                        }
                    }
                    Motion::Fixed | Motion::Unsupported => {}
                }
            }
            current = parent;
        }
    }

    fn jdot_times_v(&self, link: usize) -> Result<Twist> {
        Ok(self.links[link].bias)
    }
}
