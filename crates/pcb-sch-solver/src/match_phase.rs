use std::rc::Rc;

use pcb_netlist::Netlist;
use pcb_sch_match::{Matcher, MatchingIssue, PreparedNetlist, TemplateMatch};
use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::solver::{Solver, SolverState};

/// The template chosen for one input netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOutput {
    pub netlist_index: usize,
    pub template_index: usize,
    pub distance: u32,
    pub issues: Vec<MatchingIssue>,
}

/// Scores one target against the templates, one template per step.
pub struct TemplateMatchSolver {
    state: SolverState,
    matcher: Matcher,
    target: PreparedNetlist,
    templates: Rc<[Netlist]>,
    next_template: usize,
    best: Option<TemplateMatch>,
}

impl TemplateMatchSolver {
    pub fn new(target: &Netlist, templates: Rc<[Netlist]>, config: &SolverConfig) -> Self {
        Self {
            state: SolverState::new(config.max_iterations),
            matcher: config.matcher(),
            target: PreparedNetlist::new(target),
            templates,
            next_template: 0,
            best: None,
        }
    }

    /// Best template so far; final once the solver is solved.
    pub fn best(&self) -> Option<&TemplateMatch> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<TemplateMatch> {
        self.best
    }
}

impl Solver for TemplateMatchSolver {
    fn name(&self) -> &'static str {
        "template_match"
    }

    fn state(&self) -> &SolverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SolverState {
        &mut self.state
    }

    fn step_inner(&mut self) -> Result<(), SolverError> {
        let Some(template) = self.templates.get(self.next_template) else {
            return Err(SolverError::NoTemplates);
        };
        let evaluated = self
            .matcher
            .evaluate_template(self.next_template, template, &self.target);
        if self.best.as_ref().is_none_or(|b| evaluated.distance < b.distance) {
            self.best = Some(evaluated);
        }
        self.next_template += 1;
        if self.next_template == self.templates.len() {
            self.state.mark_solved();
        }
        Ok(())
    }
}

/// Picks a template for every target netlist in turn.
pub struct MatchPhaseSolver {
    state: SolverState,
    config: SolverConfig,
    targets: Rc<[Netlist]>,
    templates: Rc<[Netlist]>,
    next_target: usize,
    active: Option<(usize, TemplateMatchSolver)>,
    outputs: Vec<MatchOutput>,
}

impl MatchPhaseSolver {
    pub fn new(targets: Rc<[Netlist]>, templates: Rc<[Netlist]>, config: SolverConfig) -> Self {
        Self {
            state: SolverState::new(config.max_iterations),
            config,
            targets,
            templates,
            next_target: 0,
            active: None,
            outputs: Vec::new(),
        }
    }

    pub fn outputs(&self) -> &[MatchOutput] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<MatchOutput> {
        self.outputs
    }
}

impl Solver for MatchPhaseSolver {
    fn name(&self) -> &'static str {
        "match_phase"
    }

    fn state(&self) -> &SolverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SolverState {
        &mut self.state
    }

    fn step_inner(&mut self) -> Result<(), SolverError> {
        if let Some((netlist_index, active)) = &mut self.active {
            active.step()?;
            if active.is_solved() {
                let netlist_index = *netlist_index;
                if let Some((_, finished)) = self.active.take()
                    && let Some(best) = finished.into_best()
                {
                    log::debug!(
                        "netlist {netlist_index}: template {} at distance {}",
                        best.template_index,
                        best.distance
                    );
                    self.outputs.push(MatchOutput {
                        netlist_index,
                        template_index: best.template_index,
                        distance: best.distance,
                        issues: best.issues,
                    });
                }
            }
            return Ok(());
        }

        if self.next_target == self.targets.len() {
            self.state.mark_solved();
            return Ok(());
        }
        let target = &self.targets[self.next_target];
        let solver = TemplateMatchSolver::new(target, self.templates.clone(), &self.config);
        self.active = Some((self.next_target, solver));
        self.next_target += 1;
        Ok(())
    }
}
