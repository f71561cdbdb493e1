//! Model configuration documents.
//!
//! ```toml
//! backend = "screw"
//! urdf_path = "robots/arm.urdf"
//!
//! [[semantic.group_states]]
//! name = "home"
//! group = "arm"
//! joint_values = [{ name = "shoulder", value = [0.3] }]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::{BackendRegistry, ScrewBackend};
use crate::error::{ModelError, Result};
use crate::model::{Model, ModelBuilder};
use crate::named_state::SemanticDescription;
use crate::urdf::{read_robot_file, read_robot_str};

fn default_backend() -> String {
    ScrewBackend::TAG.to_string()
}

/// Where the robot tree comes from and how it is turned into a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Registry tag of the kinematics backend.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// URDF file; relative paths are resolved against the working directory.
    #[serde(default)]
    pub urdf_path: Option<PathBuf>,
    #[serde(default)]
    pub urdf: Option<String>,
    #[serde(default)]
    pub semantic: Option<SemanticDescription>,
}

impl ModelConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ModelError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn load_robot(&self) -> Result<urdf_rs::Robot> {
        match (&self.urdf_path, &self.urdf) {
            (Some(path), None) => read_robot_file(path),
            (None, Some(xml)) => read_robot_str(xml),
            (Some(_), Some(_)) => Err(ModelError::Config(
                "both `urdf_path` and `urdf` are set".into(),
            )),
            (None, None) => Err(ModelError::Config(
                "one of `urdf_path` or `urdf` is required".into(),
            )),
        }
    }
}

impl Model {
    /// Loads, attaches the semantic description and finalizes a configured model.
    pub fn from_config(config: &ModelConfig, registry: &BackendRegistry) -> Result<Self> {
        let robot = config.load_robot()?;
        let mut builder = ModelBuilder::with_registry(robot, registry, &config.backend)?;
        if let Some(semantic) = &config.semantic {
            builder = builder.with_semantic(semantic.clone());
        }
        builder.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::SERIAL_URDF;

    fn inline_config() -> String {
        format!(
            r#"
urdf = '''{SERIAL_URDF}'''

[[semantic.group_states]]
name = "home"
group = "arm"
joint_values = [{{ name = "j2", value = [0.4] }}]
"#
        )
    }

    #[test]
    fn defaults_to_screw_backend() {
        let config = ModelConfig::from_toml_str(&inline_config()).unwrap();
        assert_eq!(config.backend, "screw");
        assert!(config.urdf_path.is_none());
    }

    #[test]
    fn builds_model_from_inline_urdf() {
        let config = ModelConfig::from_toml_str(&inline_config()).unwrap();
        let model = Model::from_config(&config, &BackendRegistry::default()).unwrap();
        assert_eq!(model.joint_num(), 3);
        assert_eq!(model.robot_state("home").unwrap()[1], 0.4);
    }

    #[test]
    fn requires_exactly_one_source() {
        let config = ModelConfig::from_toml_str(r#"backend = "screw""#).unwrap();
        let err = config.load_robot().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);

        let mut config = ModelConfig::from_toml_str(&inline_config()).unwrap();
        config.urdf_path = Some("arm.urdf".into());
        assert!(matches!(config.load_robot(), Err(ModelError::Config(_))));
    }

    #[test]
    fn unknown_backend_is_reported() {
        let mut config = ModelConfig::from_toml_str(&inline_config()).unwrap();
        config.backend = "kdl".into();
        let err = Model::from_config(&config, &BackendRegistry::default()).unwrap_err();
        assert!(matches!(err, ModelError::BackendNotFound(tag) if tag == "kdl"));
    }

    #[test]
    fn missing_file() {
        let err = ModelConfig::from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
