use pcb_sch::SchError;
use pcb_sch_adapt::AdaptError;
use thiserror::Error;

/// Why a solver failed. Composite solvers hand a sub-solver's error up
/// unchanged, so this is `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolverError {
    #[error("{solver} ran out of iterations (limit {max_iterations})")]
    OutOfIterations {
        solver: &'static str,
        max_iterations: usize,
    },

    #[error("no templates to match against")]
    NoTemplates,

    #[error("netlist {0} does not exist")]
    UnknownNetlist(usize),

    #[error("template {0} is not in the library")]
    UnknownTemplate(usize),

    #[error(transparent)]
    Adapt(#[from] AdaptError),

    #[error(transparent)]
    Schematic(#[from] SchError),

    /// An error read back from a persisted [`crate::SolverState`], which
    /// only keeps the message.
    #[error("{0}")]
    Restored(String),
}
