//! Error types for model construction and kinematic queries.

use thiserror::Error;

/// Broad category of a [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fatal, raised while finalizing; the model is never produced.
    Structural,
    /// Unknown link, joint, state or backend name.
    Lookup,
    /// Optional backend capability that was invoked but not provided.
    Unimplemented,
    /// Wrongly sized argument.
    Usage,
    /// Failure while loading description documents or configuration.
    Input,
}

/// Errors produced by this crate.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("malformed kinematic tree: {0}")]
    MalformedTree(String),

    #[error("joint '{0}' not found in backend")]
    UnknownJoint(String),

    /// Position or velocity index ranges are not packed.
    #[error("joint {axis} index consistency check failed ({relation}) at joint '{joint}'")]
    IndexConsistency {
        /// `"q"` or `"v"`.
        axis: &'static str,
        /// `"out of range"` or `"not consecutive"`.
        relation: &'static str,
        joint: String,
    },

    /// A non-Euclidean joint lacks a mandatory conversion routine.
    #[error("{routine} not provided for non-euclidean joint '{joint}'")]
    MissingConversion {
        routine: &'static str,
        joint: String,
    },

    /// The reported dimensions disagree with the joint kind.
    #[error("invalid parametrization for joint '{joint}': {reason}")]
    InvalidParametrization {
        joint: String,
        reason: String,
    },

    #[error("link '{0}' does not exist")]
    LinkNotFound(String),

    #[error("joint '{0}' not found")]
    JointNotFound(String),

    #[error("joint #{0} does not exist")]
    JointIndexOutOfRange(usize),

    #[error("cannot retrieve robot state: no such state '{0}'")]
    StateNotFound(String),

    /// Named states were requested but no semantic description was given.
    #[error("cannot retrieve robot state: no semantic description defined")]
    NoSemanticDescription,

    #[error("no kinematics backend registered as '{0}'")]
    BackendNotFound(String),

    #[error("{0} not implemented by backend")]
    Unimplemented(&'static str),

    #[error("{what}: expected size {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("URDF error: {0}")]
    Urdf(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedTree(_)
            | Self::UnknownJoint(_)
            | Self::IndexConsistency { .. }
            | Self::MissingConversion { .. }
            | Self::InvalidParametrization { .. } => ErrorKind::Structural,
            Self::LinkNotFound(_)
            | Self::JointNotFound(_)
            | Self::JointIndexOutOfRange(_)
            | Self::StateNotFound(_)
            | Self::NoSemanticDescription
            | Self::BackendNotFound(_) => ErrorKind::Lookup,
            Self::Unimplemented(_) => ErrorKind::Unimplemented,
            Self::DimensionMismatch { .. } => ErrorKind::Usage,
            Self::Urdf(_) | Self::Config(_) | Self::Io(_) => ErrorKind::Input,
        }
    }

    pub(crate) fn dimension(what: &'static str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            actual,
        }
    }

    pub(crate) fn invalid_parametrization(
        joint: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidParametrization {
            joint: joint.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_consistency_message_names_joint_and_relation() {
        let err = ModelError::IndexConsistency {
            axis: "q",
            relation: "not consecutive",
            joint: "elbow".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("elbow"));
        assert!(msg.contains("not consecutive"));
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn lookup_errors_carry_the_missing_name() {
        let err = ModelError::LinkNotFound("gripper".into());
        assert!(err.to_string().contains("gripper"));
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert_eq!(
            ModelError::Unimplemented("bias acceleration").kind(),
            ErrorKind::Unimplemented
        );
    }
}
