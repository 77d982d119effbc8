//! The cooperative step machine every solver is built on.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::SolverError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Pending,
    Running,
    Solved,
    Failed,
}

/// Progress of one solver. Persists as JSON; a stored error comes back as
/// [`SolverError::Restored`] carrying its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverState {
    pub status: SolverStatus,
    pub iterations: usize,
    pub max_iterations: usize,
    #[serde(default, serialize_with = "serialize_error", deserialize_with = "deserialize_error")]
    pub error: Option<SolverError>,
}

fn serialize_error<S: Serializer>(error: &Option<SolverError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

fn deserialize_error<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SolverError>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(SolverError::Restored))
}

impl SolverState {
    pub fn new(max_iterations: usize) -> Self {
        Self {
            status: SolverStatus::Pending,
            iterations: 0,
            max_iterations,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, SolverStatus::Solved | SolverStatus::Failed)
    }

    pub fn is_solved(&self) -> bool {
        self.status == SolverStatus::Solved
    }

    pub fn is_failed(&self) -> bool {
        self.status == SolverStatus::Failed
    }

    pub fn mark_solved(&mut self) {
        self.status = SolverStatus::Solved;
    }

    pub fn fail(&mut self, error: SolverError) {
        self.status = SolverStatus::Failed;
        self.error = Some(error);
    }
}

/// A unit of work driven by repeated [`Solver::step`] calls from a single
/// thread. Implementors provide [`Solver::step_inner`] and mark themselves
/// solved through [`SolverState::mark_solved`].
pub trait Solver {
    /// Short name used in logs and iteration-limit errors.
    fn name(&self) -> &'static str;

    fn state(&self) -> &SolverState;

    fn state_mut(&mut self) -> &mut SolverState;

    /// One unit of work.
    fn step_inner(&mut self) -> Result<(), SolverError>;

    /// Advance by one unit of work. Does nothing once solved or failed. An
    /// error from the work, or running out of iterations, fails the solver
    /// and is also returned.
    fn step(&mut self) -> Result<(), SolverError> {
        if self.state().is_terminal() {
            return Ok(());
        }
        let name = self.name();
        let state = self.state_mut();
        if state.iterations >= state.max_iterations {
            let error = SolverError::OutOfIterations {
                solver: name,
                max_iterations: state.max_iterations,
            };
            log::warn!("{error}");
            state.fail(error.clone());
            return Err(error);
        }
        state.status = SolverStatus::Running;
        state.iterations += 1;

        if let Err(error) = self.step_inner() {
            log::debug!("{name} failed: {error}");
            self.state_mut().fail(error.clone());
            return Err(error);
        }
        Ok(())
    }

    /// Step until solved or failed.
    fn solve(&mut self) -> Result<(), SolverError> {
        while !self.state().is_terminal() {
            self.step()?;
        }
        match &self.state().error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn is_solved(&self) -> bool {
        self.state().is_solved()
    }

    fn is_failed(&self) -> bool {
        self.state().is_failed()
    }
}
