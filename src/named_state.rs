//! Named joint configurations from a semantic description.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::Model;

/// Group states of a robot, as found in a semantic robot description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticDescription {
    #[serde(default)]
    pub group_states: Vec<GroupState>,
}

/// A named preset for the joints of one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupState {
    pub name: String,
    pub group: String,
    #[serde(default)]
    pub joint_values: Vec<JointValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointValue {
    pub name: String,
    pub value: Vec<f64>,
}

impl SemanticDescription {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ModelError::Config(e.to_string()))
    }

    /// First group state called `name`.
    pub fn group_state(&self, name: &str) -> Option<&GroupState> {
        self.group_states.iter().find(|state| state.name == name)
    }
}

impl Model {
    /// Neutral configuration with the single-dof entries of the named state
    /// applied.
    ///
    /// Entries for joints with more than one position coordinate, or with a
    /// non-scalar value, are skipped.
    pub fn robot_state(&self, name: &str) -> Result<DVector<f64>> {
        let semantic = self.semantic.as_ref().ok_or_else(|| {
            tracing::warn!(state = name, "no semantic description defined");
            ModelError::NoSemanticDescription
        })?;
        let state = semantic.group_state(name).ok_or_else(|| {
            tracing::warn!(state = name, "robot state not found");
            ModelError::StateNotFound(name.to_string())
        })?;

        let mut q = self.q_neutral.clone();
        for entry in &state.joint_values {
            let info = self.joint_info(&entry.name)?;
            match entry.value.as_slice() {
                [value] if info.nq == 1 => q[info.iq] = *value,
                _ => tracing::warn!(
                    state = name,
                    joint = %entry.name,
                    nq = info.nq,
                    values = entry.value.len(),
                    "skipping multi-dimensional joint value"
                ),
            }
        }
        Ok(q)
    }

    /// Whether [`Model::robot_state`] succeeds for `name`.
    pub fn has_robot_state(&self, name: &str) -> bool {
        self.robot_state(name).is_ok()
    }
}
