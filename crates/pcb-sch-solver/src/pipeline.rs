//! The top-level pipeline: an ordered list of named phases, each run by its
//! own solver, sharing one [`PipelineContext`].

use std::rc::Rc;
use std::time::{Duration, Instant};

use pcb_netlist::Netlist;
use pcb_sch::TemplateLibrary;
use serde::Serialize;

use crate::adapt_phase::{AdaptOutput, AdaptPhaseSolver};
use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::match_phase::{MatchOutput, MatchPhaseSolver};
use crate::solver::{Solver, SolverState};

/// Inputs and harvested results shared by all phases.
pub struct PipelineContext {
    pub config: SolverConfig,
    pub targets: Rc<[Netlist]>,
    pub library: Rc<TemplateLibrary>,
    pub matches: Vec<MatchOutput>,
    pub adapted: Vec<AdaptOutput>,
}

/// A phase solver that can move its results into the context once solved.
pub trait PhaseSolver: Solver {
    fn harvest(self: Box<Self>, context: &mut PipelineContext);
}

impl PhaseSolver for MatchPhaseSolver {
    fn harvest(self: Box<Self>, context: &mut PipelineContext) {
        context.matches.extend(self.into_outputs());
    }
}

impl PhaseSolver for AdaptPhaseSolver {
    fn harvest(self: Box<Self>, context: &mut PipelineContext) {
        context.adapted.extend(self.into_outputs());
    }
}

pub type PhaseConstructor = fn(&PipelineContext) -> Result<Box<dyn PhaseSolver>, SolverError>;

#[derive(Clone, Copy)]
pub struct PipelinePhase {
    pub name: &'static str,
    pub build: PhaseConstructor,
}

fn match_phase(context: &PipelineContext) -> Result<Box<dyn PhaseSolver>, SolverError> {
    let templates: Rc<[Netlist]> = context.library.netlists().into();
    Ok(Box::new(MatchPhaseSolver::new(
        context.targets.clone(),
        templates,
        context.config.clone(),
    )))
}

fn adapt_phase(context: &PipelineContext) -> Result<Box<dyn PhaseSolver>, SolverError> {
    Ok(Box::new(AdaptPhaseSolver::new(
        context.targets.clone(),
        context.library.clone(),
        context.matches.clone(),
        context.config.clone(),
    )))
}

pub const DEFAULT_PHASES: &[PipelinePhase] = &[
    PipelinePhase {
        name: "match",
        build: match_phase,
    },
    PipelinePhase {
        name: "adapt",
        build: adapt_phase,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTiming {
    pub name: &'static str,
    pub duration: Duration,
}

pub struct SchematicLayoutPipelineSolver {
    state: SolverState,
    phases: Vec<PipelinePhase>,
    next_phase: usize,
    active: Option<(PipelinePhase, Instant, Box<dyn PhaseSolver>)>,
    context: PipelineContext,
    phase_timings: Vec<PhaseTiming>,
}

impl SchematicLayoutPipelineSolver {
    pub fn new(targets: Vec<Netlist>, library: TemplateLibrary, config: SolverConfig) -> Self {
        Self::with_phases(targets, library, config, DEFAULT_PHASES.to_vec())
    }

    pub fn with_phases(
        targets: Vec<Netlist>,
        library: TemplateLibrary,
        config: SolverConfig,
        phases: Vec<PipelinePhase>,
    ) -> Self {
        Self {
            state: SolverState::new(config.max_iterations),
            phases,
            next_phase: 0,
            active: None,
            context: PipelineContext {
                config,
                targets: targets.into(),
                library: Rc::new(library),
                matches: Vec::new(),
                adapted: Vec::new(),
            },
            phase_timings: Vec::new(),
        }
    }

    /// Append a phase. Only meaningful before the pipeline reaches the end.
    pub fn push_phase(&mut self, phase: PipelinePhase) {
        self.phases.push(phase);
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn matches(&self) -> &[MatchOutput] {
        &self.context.matches
    }

    pub fn adapted(&self) -> &[AdaptOutput] {
        &self.context.adapted
    }

    /// Wall-clock time of every phase that has finished or failed, in order.
    pub fn phase_timings(&self) -> &[PhaseTiming] {
        &self.phase_timings
    }

    /// Name of the phase currently running.
    pub fn active_phase(&self) -> Option<&'static str> {
        self.active.as_ref().map(|(phase, _, _)| phase.name)
    }

    fn record_timing(&mut self, name: &'static str, started: Instant) {
        let duration = started.elapsed();
        log::debug!("phase {name} finished in {duration:?}");
        self.phase_timings.push(PhaseTiming { name, duration });
    }
}

impl Solver for SchematicLayoutPipelineSolver {
    fn name(&self) -> &'static str {
        "pipeline"
    }

    fn state(&self) -> &SolverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SolverState {
        &mut self.state
    }

    fn step_inner(&mut self) -> Result<(), SolverError> {
        if let Some((phase, started, solver)) = &mut self.active {
            let (name, started) = (phase.name, *started);
            let stepped = {
                let _span = tracing::debug_span!("pipeline_phase", phase = name).entered();
                solver.step()
            };
            if let Err(error) = stepped {
                self.active = None;
                self.record_timing(name, started);
                log::warn!("pipeline stopped in phase {name}: {error}");
                return Err(error);
            }
            if solver.is_solved()
                && let Some((_, _, finished)) = self.active.take()
            {
                finished.harvest(&mut self.context);
                self.record_timing(name, started);
            }
            return Ok(());
        }

        let Some(phase) = self.phases.get(self.next_phase).copied() else {
            self.state.mark_solved();
            return Ok(());
        };
        log::debug!("starting phase {}", phase.name);
        let solver = (phase.build)(&self.context)?;
        self.active = Some((phase, Instant::now(), solver));
        self.next_phase += 1;
        Ok(())
    }
}
