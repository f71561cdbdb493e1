//! Backend-agnostic kinematic model of an articulated robot.
//!
//! A [`ModelBuilder`] takes a parsed URDF tree and a [`KinematicsBackend`]
//! and finalizes them into a [`Model`]: joints get packed position/velocity
//! index ranges in depth-first pre-order, global state and command storage is
//! sized, and the neutral configuration is seeded. The sealed model answers
//! absolute and relative pose, twist, acceleration and Jacobian queries by
//! composing the backend's per-link primitives.
//!
//! ```no_run
//! use robot_model::Model;
//!
//! let mut model = Model::from_urdf_file("robot.urdf", "screw")?;
//! let q = model.neutral_configuration().clone();
//! model.set_joint_position(&q)?;
//! model.update();
//! let pose = model.relative_pose("tool", "base")?;
//! # Ok::<(), robot_model::ModelError>(())
//! ```

mod dfs;
mod joint;
mod kinematics;
mod model;
mod utils;

pub mod backend;
pub mod config;
pub mod error;
pub mod named_state;
pub mod parametrization;
pub mod state;
pub mod urdf;

#[cfg(test)]
mod test_utils;

pub use backend::{BackendFactory, BackendRegistry, KinematicsBackend, ScrewBackend};
pub use config::ModelConfig;
pub use error::{ErrorKind, ModelError, Result};
pub use joint::{Joint, JointMut, JointRef};
pub use model::{Model, ModelBuilder};
pub use named_state::{GroupState, JointValue, SemanticDescription};
pub use parametrization::{JointInfo, JointKind, JointParametrization, View};
pub use state::{Command, ControlMode, State};
pub use urdf::LinkTree;

/// Spatial twist `[linear; angular]`, world orientation.
pub type Twist = nalgebra::Vector6<f64>;

/// `6 x nv` kinematic Jacobian, rows laid out like [`Twist`].
pub type Jacobian = nalgebra::Matrix6xX<f64>;
