//! Step-driven solvers that turn input netlists into adapted schematics.
//!
//! Every solver implements [`Solver`]: a caller drives it with
//! [`Solver::step`] (or [`Solver::solve`]) from a single thread. Composite
//! solvers hold at most one active sub-solver, poll it, and harvest its
//! output once it is solved. [`SchematicLayoutPipelineSolver`] chains the
//! match and adapt phases.

mod adapt_phase;
mod config;
mod error;
mod match_phase;
mod pipeline;
mod solver;

pub use adapt_phase::{AdaptOutput, AdaptPhaseSolver, TemplateAdaptSolver};
pub use config::SolverConfig;
pub use error::SolverError;
pub use match_phase::{MatchOutput, MatchPhaseSolver, TemplateMatchSolver};
pub use pipeline::{
    DEFAULT_PHASES, PhaseConstructor, PhaseSolver, PhaseTiming, PipelineContext, PipelinePhase,
    SchematicLayoutPipelineSolver,
};
pub use solver::{Solver, SolverState, SolverStatus};
