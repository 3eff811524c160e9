//! Steady incompressible Navier-Stokes flow in two dimensions, discretized with Taylor-Hood
//! mixed finite elements on triangle meshes.
//!
//! The main entry point is [`simulation::Simulation`], built with
//! [`simulation::SimulationBuilder`]. The lower-level building blocks (spaces, weak form,
//! assembly, nullspace treatment and linear solvers) are exposed in their own modules.
pub mod assembly;
pub mod bc;
pub mod config;
pub mod element;
pub mod error;
pub mod fields;
pub mod form;
pub mod io;
pub mod linear;
pub mod mesh;
pub mod nullspace;
pub mod quadrature;
pub mod reorder;
pub mod simulation;
pub mod space;
pub mod strong_form;

pub mod optimize {
    pub use flow_optimize::*;
}

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;
