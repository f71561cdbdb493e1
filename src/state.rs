use nalgebra::DVector;

/// Control mode requested for one joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControlMode {
    /// No mode selected yet.
    #[default]
    Unset,
    Position,
    Velocity,
    Effort,
}

/// Global joint state, sized `(nq, nv)` at finalization.
///
/// The three position vectors share the same layout and are mutated
/// independently; kinematic queries read `q_link`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    /// Link-side position.
    pub q_link: DVector<f64>,
    pub q_motor: DVector<f64>,
    pub q_ref: DVector<f64>,
    pub v: DVector<f64>,
    pub a: DVector<f64>,
    pub effort: DVector<f64>,
}

impl State {
    pub(crate) fn resize(&mut self, nq: usize, nv: usize) {
        self.q_link = DVector::zeros(nq);
        self.q_motor = DVector::zeros(nq);
        self.q_ref = DVector::zeros(nq);
        self.v = DVector::zeros(nv);
        self.a = DVector::zeros(nv);
        self.effort = DVector::zeros(nv);
    }

    pub fn nq(&self) -> usize {
        self.q_link.len()
    }

    pub fn nv(&self) -> usize {
        self.v.len()
    }
}

/// Global joint command, laid out like [`State`] plus one control mode per joint.
#[derive(Debug, Clone, Default, PartialEq)]
///
/// Sizes are fixed at finalization; writes go through the model setters.
pub struct Command {
    pub(crate) q_cmd: DVector<f64>,
    pub(crate) v_cmd: DVector<f64>,
    pub(crate) effort_cmd: DVector<f64>,
    pub(crate) ctrl_mode: Vec<ControlMode>,
}

impl Command {
    pub fn q_cmd(&self) -> &DVector<f64> {
        &self.q_cmd
    }

    pub fn v_cmd(&self) -> &DVector<f64> {
        &self.v_cmd
    }

    pub fn effort_cmd(&self) -> &DVector<f64> {
        &self.effort_cmd
    }

    pub fn ctrl_mode(&self) -> &[ControlMode] {
        &self.ctrl_mode
    }

    pub(crate) fn resize(&mut self, nq: usize, nv: usize, nj: usize) {
        self.q_cmd = DVector::zeros(nq);
        self.v_cmd = DVector::zeros(nv);
        self.effort_cmd = DVector::zeros(nv);
        self.ctrl_mode = vec![ControlMode::Unset; nj];
    }
}
