//! Serializable simulation configuration.
//!
//! ```json
//! {
//!     "reynolds_number": 100.0,
//!     "taylor_hood_pressure_element_degree": 1,
//!     "newton": { "tolerance": 1e-9, "max_iterations": 50, "line_search": "backtracking" },
//!     "linear_solver": "banded_lu"
//! }
//! ```
//!
//! Only `reynolds_number` is required.
use crate::linear::{BandedLuSolver, DenseLuSolver, LinearSolver};
use eyre::{eyre, WrapErr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSearchKind {
    None,
    #[default]
    Backtracking,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearSolverKind {
    #[default]
    BandedLu,
    DenseLu,
}

impl LinearSolverKind {
    pub fn create_solver(&self) -> Box<dyn LinearSolver> {
        match self {
            LinearSolverKind::BandedLu => Box::new(BandedLuSolver::new()),
            LinearSolverKind::DenseLu => Box::new(DenseLuSolver),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewtonConfig {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub line_search: LineSearchKind,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-9,
            max_iterations: 50,
            line_search: LineSearchKind::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    pub reynolds_number: f64,
    #[serde(default = "default_pressure_degree")]
    pub taylor_hood_pressure_element_degree: usize,
    #[serde(default)]
    pub quadrature_strength: Option<usize>,
    #[serde(default)]
    pub newton: NewtonConfig,
    #[serde(default)]
    pub linear_solver: LinearSolverKind,
}

fn default_pressure_degree() -> usize {
    1
}

impl SimulationConfig {
    pub fn new(reynolds_number: f64) -> Self {
        Self {
            reynolds_number,
            taylor_hood_pressure_element_degree: default_pressure_degree(),
            quadrature_strength: None,
            newton: NewtonConfig::default(),
            linear_solver: LinearSolverKind::default(),
        }
    }

    pub fn from_json_str(json: &str) -> eyre::Result<Self> {
        let config: Self = serde_json::from_str(json).wrap_err("Failed to parse simulation configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_json_str(&json).wrap_err_with(|| format!("Invalid configuration file {}", path.display()))
    }

    pub fn to_json_string(&self) -> eyre::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks the values that cannot be expressed in the types of the fields.
    pub fn validate(&self) -> eyre::Result<()> {
        if !(self.reynolds_number.is_finite() && self.reynolds_number > 0.0) {
            return Err(eyre!(
                "Reynolds number must be finite and positive, got {}",
                self.reynolds_number
            ));
        }
        if self.taylor_hood_pressure_element_degree == 0 {
            return Err(eyre!("Taylor-Hood pressure element degree must be at least 1"));
        }
        if !(self.newton.tolerance.is_finite() && self.newton.tolerance > 0.0) {
            return Err(eyre!(
                "Newton tolerance must be finite and positive, got {}",
                self.newton.tolerance
            ));
        }
        if self.quadrature_strength == Some(0) {
            return Err(eyre!("Quadrature strength must be at least 1"));
        }
        Ok(())
    }
}
