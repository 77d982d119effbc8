use pcb_netlist::Netlist;
use pcb_sch::Circuit;
use pcb_sch_match::{DetectorKind, Matcher, SimilarityMetric};
use serde::{Deserialize, Serialize};

use crate::align::align_target_to_template;
use crate::apply::apply_edit_operation;
use crate::error::AdaptError;
use crate::fixup::{chip_removal_pass, pin_level_pass, side_count_pass};
use crate::operation::EditOperation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdaptOptions {
    /// Upper bound on fixup rounds before giving up on convergence.
    pub max_adapt_passes: usize,
    pub remove_unmatched_chips: bool,
    pub shrink_sides: bool,
    /// Used to align target box ids with the template.
    pub similarity_metric: SimilarityMetric,
    pub issue_detectors: Vec<DetectorKind>,
}

impl Default for AdaptOptions {
    fn default() -> Self {
        Self {
            max_adapt_passes: 8,
            remove_unmatched_chips: true,
            shrink_sides: true,
            similarity_metric: SimilarityMetric::default(),
            issue_detectors: DetectorKind::DEFAULT.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptResult {
    pub circuit: Circuit,
    /// Operations that changed the circuit, in application order.
    pub applied_operations: Vec<EditOperation>,
    pub rounds: usize,
    pub converged: bool,
}

/// Incremental adaptation of one template, one fixup round at a time.
pub struct TemplateAdapter {
    circuit: Circuit,
    target: Netlist,
    options: AdaptOptions,
    applied: Vec<EditOperation>,
    rounds: usize,
    converged: bool,
}

impl TemplateAdapter {
    pub fn new(template: &Circuit, target: &Netlist, options: AdaptOptions) -> Self {
        let matcher = Matcher::from_kinds(&options.issue_detectors, options.similarity_metric);
        let target = align_target_to_template(&template.get_netlist(), target, &matcher);
        Self {
            circuit: template.clone(),
            target,
            options,
            applied: Vec::new(),
            rounds: 0,
            converged: false,
        }
    }

    /// Run the side-count, chip-removal and pin-level passes once. Returns
    /// how many operations changed the circuit; zero marks convergence.
    pub fn run_round(&mut self) -> Result<usize, AdaptError> {
        if self.converged {
            return Ok(0);
        }
        self.rounds += 1;
        let mut changed = 0;

        let ops = side_count_pass(
            &self.circuit.get_netlist(),
            &self.target,
            &self.circuit.passive_ids(),
            &self.options,
        );
        changed += self.apply_all(ops)?;
        let ops = chip_removal_pass(&self.circuit.get_netlist(), &self.target, &self.options);
        changed += self.apply_all(ops)?;
        let ops = pin_level_pass(&self.circuit.get_netlist(), &self.target);
        changed += self.apply_all(ops)?;

        log::debug!("adapt round {}: {changed} operations applied", self.rounds);
        if changed == 0 {
            self.converged = true;
        }
        Ok(changed)
    }

    fn apply_all(&mut self, ops: Vec<EditOperation>) -> Result<usize, AdaptError> {
        let mut changed = 0;
        for op in ops {
            if apply_edit_operation(&mut self.circuit, &op)?.is_changed() {
                self.applied.push(op);
                changed += 1;
            }
        }
        Ok(changed)
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    pub fn is_exhausted(&self) -> bool {
        self.rounds >= self.options.max_adapt_passes
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    /// The target with box ids aligned to the template.
    pub fn aligned_target(&self) -> &Netlist {
        &self.target
    }

    pub fn applied_operations(&self) -> &[EditOperation] {
        &self.applied
    }

    pub fn into_result(self) -> AdaptResult {
        AdaptResult {
            circuit: self.circuit,
            applied_operations: self.applied,
            rounds: self.rounds,
            converged: self.converged,
        }
    }
}

/// Adapt `template` until it describes the same topology as `target`, or
/// until `max_adapt_passes` rounds have run.
#[tracing::instrument(name = "adapt_template_to_target", skip_all, fields(target_boxes = target.boxes.len()))]
pub fn adapt_template_to_target(
    template: &Circuit,
    target: &Netlist,
    options: &AdaptOptions,
) -> Result<AdaptResult, AdaptError> {
    let mut adapter = TemplateAdapter::new(template, target, options.clone());
    while !adapter.is_converged() && !adapter.is_exhausted() {
        adapter.run_round()?;
    }
    if !adapter.is_converged() {
        log::warn!(
            "adaptation did not converge after {} rounds ({} operations applied)",
            adapter.rounds(),
            adapter.applied_operations().len()
        );
    }
    Ok(adapter.into_result())
}
