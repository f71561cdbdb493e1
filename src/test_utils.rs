//! Robot descriptions shared by the unit tests.

use nalgebra::DVector;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::named_state::{GroupState, JointValue, SemanticDescription};
use crate::Model;

/// Three revolute/prismatic joints in a row.
pub(crate) const SERIAL_URDF: &str = r#"
<robot name="serial">
    <link name="base"/>
    <link name="l1"/>
    <link name="l2"/>
    <link name="l3"/>
    <joint name="j1" type="revolute">
        <origin xyz="0 0 0.1" rpy="0 0 0"/>
        <parent link="base"/>
        <child link="l1"/>
        <axis xyz="0 0 1"/>
        <limit lower="-3" upper="3" effort="10" velocity="1"/>
    </joint>
    <joint name="j2" type="revolute">
        <origin xyz="0.3 0 0.2" rpy="0.2 0 0.1"/>
        <parent link="l1"/>
        <child link="l2"/>
        <axis xyz="0 1 0"/>
        <limit lower="-3" upper="3" effort="10" velocity="1"/>
    </joint>
    <joint name="j3" type="prismatic">
        <origin xyz="0.25 0.05 0" rpy="0 0.3 0"/>
        <parent link="l2"/>
        <child link="l3"/>
        <axis xyz="1 0 0"/>
        <limit lower="0" upper="0.5" effort="10" velocity="1"/>
    </joint>
</robot>
"#;

/// Floating base with two legs and a fixed head.
pub(crate) const BRANCHED_URDF: &str = r#"
<robot name="branched">
    <link name="world"/>
    <link name="pelvis"/>
    <link name="left_thigh"/>
    <link name="left_shin"/>
    <link name="left_foot"/>
    <link name="right_thigh"/>
    <link name="right_shin"/>
    <link name="head"/>
    <joint name="floating_base" type="floating">
        <origin xyz="0 0 0" rpy="0 0 0"/>
        <parent link="world"/>
        <child link="pelvis"/>
    </joint>
    <joint name="left_hip" type="revolute">
        <origin xyz="0 0.1 -0.1" rpy="0.1 0 0"/>
        <parent link="pelvis"/>
        <child link="left_thigh"/>
        <axis xyz="0 1 0"/>
        <limit lower="-2" upper="2" effort="10" velocity="1"/>
    </joint>
    <joint name="left_knee" type="revolute">
        <origin xyz="0 0 -0.4" rpy="0 0 0.2"/>
        <parent link="left_thigh"/>
        <child link="left_shin"/>
        <axis xyz="1 1 0"/>
        <limit lower="-2" upper="2" effort="10" velocity="1"/>
    </joint>
    <joint name="left_foot_fixed" type="fixed">
        <origin xyz="0.05 0 -0.4" rpy="0 0.3 0"/>
        <parent link="left_shin"/>
        <child link="left_foot"/>
    </joint>
    <joint name="right_hip" type="continuous">
        <origin xyz="0 -0.1 -0.1" rpy="-0.1 0 0"/>
        <parent link="pelvis"/>
        <child link="right_thigh"/>
        <axis xyz="0 1 0"/>
    </joint>
    <joint name="right_slide" type="prismatic">
        <origin xyz="0 0 -0.4" rpy="0 0.2 0"/>
        <parent link="right_thigh"/>
        <child link="right_shin"/>
        <axis xyz="0 0 1"/>
        <limit lower="-0.2" upper="0.2" effort="10" velocity="1"/>
    </joint>
    <joint name="head_fixed" type="fixed">
        <origin xyz="0 0 0.3" rpy="0 0 0.5"/>
        <parent link="pelvis"/>
        <child link="head"/>
    </joint>
</robot>
"#;

pub(crate) fn serial_model() -> Model {
    Model::from_urdf_str(SERIAL_URDF, "screw").unwrap()
}

pub(crate) fn branched_model() -> Model {
    Model::from_urdf_str(BRANCHED_URDF, "screw").unwrap()
}

pub(crate) fn semantic_description() -> SemanticDescription {
    SemanticDescription {
        group_states: vec![GroupState {
            name: "crouch".into(),
            group: "legs".into(),
            joint_values: vec![
                JointValue {
                    name: "left_knee".into(),
                    value: vec![-1.2],
                },
                JointValue {
                    name: "right_slide".into(),
                    value: vec![0.1],
                },
                // multi-dimensional entries are ignored
                JointValue {
                    name: "floating_base".into(),
                    value: vec![0., 0., 1., 0., 0., 0., 1.],
                },
            ],
        }],
    }
}

pub(crate) fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

pub(crate) fn random_vector(rng: &mut ChaCha8Rng, n: usize) -> DVector<f64> {
    DVector::from_fn(n, |_, _| rng.gen_range(-1.0..1.0))
}

/// Random configuration reached by integrating a random velocity from neutral.
pub(crate) fn random_configuration(model: &Model, rng: &mut ChaCha8Rng) -> DVector<f64> {
    let v = random_vector(rng, model.nv());
    model.integrate(model.neutral_configuration(), &v, 1.0).unwrap()
}
