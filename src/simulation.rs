//! Steady Navier-Stokes simulations.
use crate::assembly::{apply_homogeneous_dirichlet_bc_csr, apply_homogeneous_dirichlet_bc_rhs, NavierStokesAssembler};
use crate::bc::{DirichletConstraints, VelocityBoundaryCondition};
use crate::config::{LineSearchKind, LinearSolverKind, SimulationConfig};
use crate::fields::SolutionFields;
use crate::form::{BodyForce, NavierStokesWeakForm, ResidualTerms};
use crate::io::vtk::FlowDataSetBuilder;
use crate::linear::{solve_with_nullspace, LinearSolver};
use crate::mesh::TriangleMesh2d;
use crate::nullspace::{subtract_mean_pressure, NullSpace};
use crate::quadrature::QuadratureRule;
use crate::space::TaylorHoodSpace;
use eyre::{eyre, WrapErr};
use flow_optimize::calculus::{DifferentiableVectorFunction, VectorFunction};
use flow_optimize::newton::{newton, newton_line_search, BacktrackingLineSearch, NewtonSettings};
use log::info;
use nalgebra::{DVector, DVectorView, DVectorViewMut};
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

/// Settings of the nonlinear and linear solvers.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolverSettings {
    pub newton: NewtonSettings<f64>,
    pub line_search: LineSearchKind,
    pub linear_solver: LinearSolverKind,
    /// Strength of the quadrature rule used for assembly. Defaults to three times the velocity
    /// degree.
    pub quadrature_strength: Option<usize>,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            newton: NewtonSettings {
                max_iterations: Some(50),
                tolerance: 1e-9,
            },
            line_search: LineSearchKind::default(),
            linear_solver: LinearSolverKind::default(),
            quadrature_strength: None,
        }
    }
}

/// Outcome of a successful solve.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SolveSummary {
    pub reynolds_number: f64,
    pub newton_iterations: usize,
    /// Norm of the nullspace-projected residual at the final Newton iterate.
    pub residual_norm: f64,
    /// The mean pressure that was subtracted after convergence.
    pub mean_pressure: f64,
}

#[derive(Clone)]
pub struct SimulationBuilder {
    mesh: Option<TriangleMesh2d>,
    initial_solution: Option<DVector<f64>>,
    reynolds_number: Option<f64>,
    pressure_degree: usize,
    boundary_conditions: Vec<VelocityBoundaryCondition>,
    body_force: Option<Arc<dyn BodyForce>>,
    settings: SolverSettings,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self {
            mesh: None,
            initial_solution: None,
            reynolds_number: None,
            pressure_degree: 1,
            boundary_conditions: Vec::new(),
            body_force: None,
            settings: SolverSettings::default(),
        }
    }
}

impl SimulationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder populated from a configuration. The mesh must still be provided.
    ///
    /// Fails if the configuration does not pass [`SimulationConfig::validate`].
    pub fn from_config(config: &SimulationConfig) -> eyre::Result<Self> {
        config.validate()?;
        Ok(Self::new()
            .with_reynolds_number(config.reynolds_number)
            .with_pressure_degree(config.taylor_hood_pressure_element_degree)
            .with_settings(SolverSettings {
                newton: NewtonSettings {
                    max_iterations: Some(config.newton.max_iterations),
                    tolerance: config.newton.tolerance,
                },
                line_search: config.newton.line_search,
                linear_solver: config.linear_solver,
                quadrature_strength: config.quadrature_strength,
            }))
    }

    /// A builder that continues from the current state of an existing simulation, including
    /// its solution.
    pub fn from_simulation(simulation: &Simulation) -> Self {
        Self {
            mesh: Some(simulation.space.mesh().clone()),
            initial_solution: Some(simulation.solution.clone()),
            reynolds_number: Some(simulation.reynolds_number()),
            pressure_degree: simulation.space.pressure_degree(),
            boundary_conditions: simulation.boundary_conditions.clone(),
            body_force: simulation.body_force.clone(),
            settings: simulation.settings,
        }
    }

    pub fn with_mesh(self, mesh: TriangleMesh2d) -> Self {
        Self {
            mesh: Some(mesh),
            ..self
        }
    }

    /// Starts Newton's method from the given coefficients instead of zero.
    pub fn with_initial_solution(self, initial_solution: DVector<f64>) -> Self {
        Self {
            initial_solution: Some(initial_solution),
            ..self
        }
    }

    pub fn with_reynolds_number(self, reynolds_number: f64) -> Self {
        Self {
            reynolds_number: Some(reynolds_number),
            ..self
        }
    }

    /// Sets the Taylor-Hood pressure element degree `d`. The velocity uses degree `d + 1`.
    pub fn with_pressure_degree(self, pressure_degree: usize) -> Self {
        Self { pressure_degree, ..self }
    }

    /// Adds a velocity boundary condition. Conditions added later take precedence where
    /// several conditions apply.
    pub fn with_boundary_condition(mut self, condition: VelocityBoundaryCondition) -> Self {
        self.boundary_conditions.push(condition);
        self
    }

    pub fn with_body_force(self, body_force: Arc<dyn BodyForce>) -> Self {
        Self {
            body_force: Some(body_force),
            ..self
        }
    }

    pub fn with_settings(self, settings: SolverSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn build(self) -> eyre::Result<Simulation> {
        let mesh = self
            .mesh
            .ok_or_else(|| eyre!("A mesh is required to build a simulation"))?;
        let reynolds_number = self
            .reynolds_number
            .ok_or_else(|| eyre!("A Reynolds number is required to build a simulation"))?;
        let form = NavierStokesWeakForm::new(reynolds_number)?;
        let space = TaylorHoodSpace::new(mesh, self.pressure_degree)
            .wrap_err("Failed to construct Taylor-Hood space")?;

        let strength = match self.settings.quadrature_strength {
            Some(0) => return Err(eyre!("Quadrature strength must be at least 1")),
            Some(strength) => strength,
            None => QuadratureRule::default_strength(space.velocity_degree()),
        };
        let quadrature = QuadratureRule::triangle(strength);

        let mut solution = match self.initial_solution {
            Some(initial) if initial.len() != space.num_dofs() => {
                return Err(eyre!(
                    "Initial solution has length {}, but the space has {} degrees of freedom",
                    initial.len(),
                    space.num_dofs()
                ))
            }
            Some(initial) => initial,
            None => DVector::zeros(space.num_dofs()),
        };

        let dirichlet = DirichletConstraints::from_conditions(&space, &self.boundary_conditions);
        dirichlet.apply_to_solution(&mut DVectorViewMut::from(&mut solution));
        let nullspace = NullSpace::constant_pressure(&space);

        info!(
            "Created simulation: {} cells, P{}/P{} Taylor-Hood elements, \
            {} pressure and {} velocity DOFs, {} Dirichlet DOFs",
            space.mesh().num_cells(),
            space.velocity_degree(),
            space.pressure_degree(),
            space.num_pressure_dofs(),
            space.num_velocity_dofs(),
            dirichlet.len()
        );

        Ok(Simulation {
            linear_solver: self.settings.linear_solver.create_solver(),
            space,
            form,
            quadrature,
            boundary_conditions: self.boundary_conditions,
            dirichlet,
            body_force: self.body_force,
            nullspace,
            solution,
            settings: self.settings,
        })
    }
}

/// A steady incompressible Navier-Stokes problem discretized with Taylor-Hood elements,
/// together with its current solution.
pub struct Simulation {
    space: TaylorHoodSpace,
    form: NavierStokesWeakForm,
    quadrature: QuadratureRule,
    boundary_conditions: Vec<VelocityBoundaryCondition>,
    dirichlet: DirichletConstraints,
    body_force: Option<Arc<dyn BodyForce>>,
    nullspace: NullSpace,
    solution: DVector<f64>,
    settings: SolverSettings,
    linear_solver: Box<dyn LinearSolver>,
}

impl Simulation {
    pub fn builder() -> SimulationBuilder {
        SimulationBuilder::new()
    }

    pub fn space(&self) -> &TaylorHoodSpace {
        &self.space
    }

    pub fn reynolds_number(&self) -> f64 {
        self.form.reynolds_number()
    }

    /// Changes the Reynolds number for subsequent solves, keeping the current solution.
    pub fn set_reynolds_number(&mut self, reynolds_number: f64) -> eyre::Result<()> {
        self.form = NavierStokesWeakForm::new(reynolds_number)?;
        Ok(())
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn quadrature(&self) -> &QuadratureRule {
        &self.quadrature
    }

    pub fn dirichlet_constraints(&self) -> &DirichletConstraints {
        &self.dirichlet
    }

    /// The nullspace declared to the nonlinear and linear solvers.
    pub fn nullspace(&self) -> &NullSpace {
        &self.nullspace
    }

    pub fn solution(&self) -> &DVector<f64> {
        &self.solution
    }

    pub fn solution_fields(&self) -> SolutionFields<'_> {
        SolutionFields::new(&self.space, &self.solution)
    }

    fn assembler(&self) -> NavierStokesAssembler<'_> {
        NavierStokesAssembler::with_quadrature(&self.space, self.form, self.quadrature.clone())
            .with_body_force(self.body_force.as_deref())
    }

    /// Evaluates the weak-form residual at the current solution, without boundary conditions.
    pub fn weak_form_residual(&self, terms: ResidualTerms) -> DVector<f64> {
        self.assembler()
            .assemble_residual(&DVectorView::from(&self.solution), terms)
    }

    /// Runs Newton's method from the current solution and normalizes the pressure to zero mean.
    ///
    /// On failure the solution is left at the last Newton iterate and the pressure is not
    /// normalized.
    pub fn solve(&mut self) -> eyre::Result<SolveSummary> {
        let reynolds_number = self.reynolds_number();
        info!(
            "Solving steady Navier-Stokes equations with Re = {} ({} unknowns)",
            reynolds_number,
            self.space.num_dofs()
        );

        self.dirichlet
            .apply_to_solution(&mut DVectorViewMut::from(&mut self.solution));

        let n = self.space.num_dofs();
        let mut f = DVector::zeros(n);
        let mut dx = DVector::zeros(n);
        let assembler = NavierStokesAssembler::with_quadrature(&self.space, self.form, self.quadrature.clone())
            .with_body_force(self.body_force.as_deref());
        let mut problem = NavierStokesProblem {
            assembler,
            dirichlet: &self.dirichlet,
            nullspace: &self.nullspace,
            linear_solver: self.linear_solver.as_mut(),
        };

        let newton_settings = self.settings.newton;
        let result = match self.settings.line_search {
            LineSearchKind::None => newton(&mut problem, &mut self.solution, &mut f, &mut dx, newton_settings),
            LineSearchKind::Backtracking => newton_line_search(
                &mut problem,
                &mut self.solution,
                &mut f,
                &mut dx,
                newton_settings,
                &mut BacktrackingLineSearch::default(),
            ),
        };
        let newton_iterations = result.map_err(|err| {
            eyre!(
                "Newton's method failed for Re = {} (residual norm {:e}): {}",
                reynolds_number,
                f.norm(),
                err
            )
        })?;
        info!(
            "Newton's method converged in {} iterations (residual norm {:e})",
            newton_iterations,
            f.norm()
        );

        let mean_pressure = subtract_mean_pressure(&self.space, &self.quadrature, &mut self.solution);

        Ok(SolveSummary {
            reynolds_number,
            newton_iterations,
            residual_norm: f.norm(),
            mean_pressure,
        })
    }

    /// Solves for each Reynolds number in turn, starting each solve from the previous solution.
    ///
    /// Stops at the first failure. An empty sequence leaves the simulation unchanged.
    pub fn solve_with_continuation(&mut self, reynolds_numbers: &[f64]) -> eyre::Result<Vec<SolveSummary>> {
        let mut summaries = Vec::with_capacity(reynolds_numbers.len());
        for &reynolds_number in reynolds_numbers {
            self.set_reynolds_number(reynolds_number)?;
            let summary = self
                .solve()
                .wrap_err_with(|| format!("Continuation failed at Re = {}", reynolds_number))?;
            summaries.push(summary);
        }
        Ok(summaries)
    }

    /// Writes pressure and velocity to a legacy VTK file.
    pub fn write_vtk(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        let fields = self.solution_fields();
        FlowDataSetBuilder::from_fields(&fields)
            .with_title(format!("Steady Navier-Stokes, Re = {}", self.reynolds_number()))
            .try_export(path)?;
        info!("Wrote solution to {}", path.display());
        Ok(())
    }
}

/// The Dirichlet-eliminated, nullspace-projected residual as a function of the coefficients,
/// in the form expected by Newton's method.
struct NavierStokesProblem<'a> {
    assembler: NavierStokesAssembler<'a>,
    dirichlet: &'a DirichletConstraints,
    nullspace: &'a NullSpace,
    linear_solver: &'a mut dyn LinearSolver,
}

impl<'a> VectorFunction<f64> for NavierStokesProblem<'a> {
    fn dimension(&self) -> usize {
        self.assembler.space().num_dofs()
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<f64>, x: &DVectorView<f64>) {
        self.assembler.assemble_residual_into(f, x, ResidualTerms::All);
        apply_homogeneous_dirichlet_bc_rhs(f, self.dirichlet.dofs());
        self.nullspace.project_out(f);
    }
}

impl<'a> DifferentiableVectorFunction<f64> for NavierStokesProblem<'a> {
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<f64>,
        x: &DVectorView<f64>,
        rhs: &DVectorView<f64>,
    ) -> Result<(), Box<dyn Error>> {
        let mut jacobian = self.assembler.assemble_jacobian(x);
        apply_homogeneous_dirichlet_bc_csr(&mut jacobian, self.dirichlet.dofs());
        solve_with_nullspace(self.linear_solver, &jacobian, rhs, self.nullspace, sol)?;
        Ok(())
    }
}
