use std::rc::Rc;

use pcb_netlist::Netlist;
use pcb_sch::{Circuit, TemplateLibrary};
use pcb_sch_adapt::{EditOperation, TemplateAdapter};
use serde::{Deserialize, Serialize};

use crate::config::SolverConfig;
use crate::error::SolverError;
use crate::match_phase::MatchOutput;
use crate::solver::{Solver, SolverState};

/// An adapted template for one input netlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptOutput {
    pub netlist_index: usize,
    pub template_index: usize,
    pub circuit: Circuit,
    pub applied_operations: Vec<EditOperation>,
    pub rounds: usize,
    pub converged: bool,
}

/// Adapts one template to one target, one fixup round per step.
pub struct TemplateAdaptSolver {
    state: SolverState,
    netlist_index: usize,
    template_index: usize,
    adapter: TemplateAdapter,
}

impl TemplateAdaptSolver {
    pub fn new(
        netlist_index: usize,
        template_index: usize,
        template: &Circuit,
        target: &Netlist,
        config: &SolverConfig,
    ) -> Self {
        Self {
            state: SolverState::new(config.max_iterations),
            netlist_index,
            template_index,
            adapter: TemplateAdapter::new(template, target, config.adapt_options()),
        }
    }

    pub fn adapter(&self) -> &TemplateAdapter {
        &self.adapter
    }

    pub fn into_output(self) -> AdaptOutput {
        let result = self.adapter.into_result();
        AdaptOutput {
            netlist_index: self.netlist_index,
            template_index: self.template_index,
            circuit: result.circuit,
            applied_operations: result.applied_operations,
            rounds: result.rounds,
            converged: result.converged,
        }
    }
}

impl Solver for TemplateAdaptSolver {
    fn name(&self) -> &'static str {
        "template_adapt"
    }

    fn state(&self) -> &SolverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SolverState {
        &mut self.state
    }

    fn step_inner(&mut self) -> Result<(), SolverError> {
        self.adapter.run_round()?;
        if self.adapter.is_converged() {
            self.state.mark_solved();
        } else if self.adapter.is_exhausted() {
            log::warn!(
                "netlist {}: adaptation did not converge after {} rounds",
                self.netlist_index,
                self.adapter.rounds()
            );
            self.state.mark_solved();
        }
        Ok(())
    }
}

/// Adapts the chosen template of every match in turn.
pub struct AdaptPhaseSolver {
    state: SolverState,
    config: SolverConfig,
    targets: Rc<[Netlist]>,
    library: Rc<TemplateLibrary>,
    matches: Vec<MatchOutput>,
    next_match: usize,
    active: Option<TemplateAdaptSolver>,
    outputs: Vec<AdaptOutput>,
}

impl AdaptPhaseSolver {
    pub fn new(
        targets: Rc<[Netlist]>,
        library: Rc<TemplateLibrary>,
        matches: Vec<MatchOutput>,
        config: SolverConfig,
    ) -> Self {
        Self {
            state: SolverState::new(config.max_iterations),
            config,
            targets,
            library,
            matches,
            next_match: 0,
            active: None,
            outputs: Vec::new(),
        }
    }

    pub fn outputs(&self) -> &[AdaptOutput] {
        &self.outputs
    }

    pub fn into_outputs(self) -> Vec<AdaptOutput> {
        self.outputs
    }
}

impl Solver for AdaptPhaseSolver {
    fn name(&self) -> &'static str {
        "adapt_phase"
    }

    fn state(&self) -> &SolverState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut SolverState {
        &mut self.state
    }

    fn step_inner(&mut self) -> Result<(), SolverError> {
        if let Some(active) = &mut self.active {
            active.step()?;
            if active.is_solved()
                && let Some(finished) = self.active.take()
            {
                let output = finished.into_output();
                log::debug!(
                    "netlist {}: adapted template {} with {} operations",
                    output.netlist_index,
                    output.template_index,
                    output.applied_operations.len()
                );
                self.outputs.push(output);
            }
            return Ok(());
        }

        let Some(matched) = self.matches.get(self.next_match) else {
            self.state.mark_solved();
            return Ok(());
        };
        let target = self
            .targets
            .get(matched.netlist_index)
            .ok_or(SolverError::UnknownNetlist(matched.netlist_index))?;
        let template = self
            .library
            .get(matched.template_index)
            .ok_or(SolverError::UnknownTemplate(matched.template_index))?;
        self.active = Some(TemplateAdaptSolver::new(
            matched.netlist_index,
            matched.template_index,
            &template.circuit,
            target,
            &self.config,
        ));
        self.next_match += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pcb_test_utils::{NetlistFixture, init_logging};

    use super::*;

    fn led_target() -> Netlist {
        NetlistFixture::new()
            .chip("U5", 2, 0, 2, 0)
            .resistor("R3")
            .label(("U5", 1), "3V3")
            .label(("U5", 2), "0V")
            .wire(("U5", 3), ("R3", 1))
            .label(("R3", 2), "D1")
            .label(("U5", 4), "EN")
            .build()
    }

    #[test]
    fn one_round_per_step() {
        init_logging();
        let library = TemplateLibrary::builtin().unwrap();
        let template = library.get(library.index_of("led_driver").unwrap()).unwrap();
        let mut solver = TemplateAdaptSolver::new(0, 1, &template.circuit, &led_target(), &SolverConfig::default());
        solver.step().unwrap();
        assert_eq!(solver.adapter().applied_operations().len(), 1);
        assert!(!solver.is_solved());
        solver.step().unwrap();
        assert!(solver.is_solved());

        let output = solver.into_output();
        assert!(output.converged);
        assert_eq!(output.rounds, 2);
        insta::assert_json_snapshot!(output.applied_operations, @r#"
        [
          {
            "type": "add_label_to_pin",
            "chipId": "U1",
            "pinNumber": 4,
            "netId": "EN"
          }
        ]
        "#);
    }

    #[test]
    fn round_limit_still_solves() {
        let library = TemplateLibrary::builtin().unwrap();
        let template = library.get(library.index_of("led_driver").unwrap()).unwrap();
        let config = SolverConfig {
            max_adapt_passes: 1,
            ..SolverConfig::default()
        };
        let mut solver = TemplateAdaptSolver::new(0, 1, &template.circuit, &led_target(), &config);
        solver.solve().unwrap();
        assert_eq!(solver.state().iterations, 1);
        assert!(!solver.into_output().converged);
    }

    #[test]
    fn unknown_template_fails_the_phase() {
        let library = Rc::new(TemplateLibrary::builtin().unwrap());
        let targets: Rc<[Netlist]> = vec![led_target()].into();
        let matches = vec![MatchOutput {
            netlist_index: 0,
            template_index: 99,
            distance: 0,
            issues: Vec::new(),
        }];
        let mut phase = AdaptPhaseSolver::new(targets, library, matches, SolverConfig::default());
        assert_eq!(phase.solve(), Err(SolverError::UnknownTemplate(99)));
    }
}
