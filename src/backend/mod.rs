//! Pluggable numerical backends.
//!
//! A backend owns the per-link numerics (absolute pose, Jacobian, bias
//! acceleration) and reports how each joint is parametrized. The model only
//! composes these primitives; see [`crate::Model`].

use std::fmt::Debug;

use hashbrown::HashMap;
use nalgebra::Isometry3;

use crate::error::{ModelError, Result};
use crate::parametrization::JointParametrization;
use crate::state::State;
use crate::{Jacobian, Twist};

pub mod screw;

pub use screw::ScrewBackend;

/// Per-link kinematic primitives supplied by a concrete implementation.
///
/// All quantities use world orientation. Twists and Jacobian rows are
/// `[linear; angular]`, with the linear part referenced at the link origin.
pub trait KinematicsBackend: Debug {
    fn link_id(&self, name: &str) -> Option<usize>;

    /// Parametrization of a non-fixed joint, `None` if the backend does not know it.
    fn joint_parametrization(&self, name: &str) -> Option<JointParametrization>;

    /// Recomputes every link quantity from `state.q_link`, `state.v` and `state.a`.
    fn update(&mut self, state: &State);

    fn pose(&self, link: usize) -> Isometry3<f64>;

    /// Writes the `6 x nv` Jacobian of a link into `out`.
    fn jacobian(&self, link: usize, out: &mut Jacobian);

    /// Jacobian time derivative times velocity.
    fn jdot_times_v(&self, link: usize) -> Result<Twist> {
        let _ = link;
        Err(ModelError::Unimplemented("bias acceleration"))
    }
}

/// Builds a backend for a parsed robot description.
pub type BackendFactory = fn(&urdf_rs::Robot) -> Result<Box<dyn KinematicsBackend>>;

/// Backends selectable by string tag.
#[derive(Clone)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ScrewBackend::TAG, ScrewBackend::create);
        registry
    }
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Adds or replaces the factory registered under `tag`.
    pub fn register(&mut self, tag: impl Into<String>, factory: BackendFactory) -> &mut Self {
        self.factories.insert(tag.into(), factory);
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn create(&self, tag: &str, robot: &urdf_rs::Robot) -> Result<Box<dyn KinematicsBackend>> {
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| ModelError::BackendNotFound(tag.to_string()))?;
        let backend = factory(robot)?;
        tracing::info!(backend = tag, robot = %robot.name, "created kinematics backend");
        Ok(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::SERIAL_URDF;
    use crate::urdf::read_robot_str;

    #[derive(Debug)]
    struct Static;

    impl KinematicsBackend for Static {
        fn link_id(&self, _: &str) -> Option<usize> {
            None
        }
        fn joint_parametrization(&self, _: &str) -> Option<JointParametrization> {
            None
        }
        fn update(&mut self, _: &State) {}
        fn pose(&self, _: usize) -> Isometry3<f64> {
            Isometry3::identity()
        }
        fn jacobian(&self, _: usize, out: &mut Jacobian) {
            out.fill(0.0);
        }
    }

    fn make_static(_: &urdf_rs::Robot) -> Result<Box<dyn KinematicsBackend>> {
        Ok(Box::new(Static))
    }

    #[test]
    fn default_registry_knows_screw_backend() {
        let registry = BackendRegistry::default();
        assert_eq!(registry.tags(), vec!["screw"]);
        let robot = read_robot_str(SERIAL_URDF).unwrap();
        let backend = registry.create("screw", &robot).unwrap();
        assert_eq!(backend.link_id("l2"), Some(2));
    }

    #[test]
    fn unknown_tag_is_a_lookup_error() {
        let robot = read_robot_str(SERIAL_URDF).unwrap();
        let err = BackendRegistry::empty().create("pinocchio", &robot).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
        assert!(err.to_string().contains("pinocchio"));
    }

    #[test]
    fn bias_acceleration_defaults_to_unimplemented() {
        let mut registry = BackendRegistry::empty();
        registry.register("static", make_static);
        assert!(registry.contains("static"));
        let robot = read_robot_str(SERIAL_URDF).unwrap();
        let backend = registry.create("static", &robot).unwrap();
        let err = backend.jdot_times_v(0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
    }
}
