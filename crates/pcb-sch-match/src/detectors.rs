//! Per-box issue detectors.
//!
//! Each detector compares one candidate box against one target box and
//! reports typed [`MatchingIssue`]s. Detectors are independent of the
//! assignment algorithm; new ones plug in through [`IssueDetector`].

use std::collections::{BTreeMap, HashMap};

use pcb_canonical::{NormalizedNetlist, NormalizedPort};
use pcb_netlist::Side;
use serde::{Deserialize, Serialize};

use crate::issues::MatchingIssue;
use crate::pin_shapes::PinShapeTable;

/// Everything a detector may look at.
pub struct MatchContext<'a> {
    pub candidate: &'a NormalizedNetlist,
    pub target: &'a NormalizedNetlist,
    pub candidate_shapes: &'a PinShapeTable,
    pub target_shapes: &'a PinShapeTable,
    /// Target box index to candidate box index for pairs fixed so far.
    pub matched: &'a BTreeMap<usize, usize>,
}

pub trait IssueDetector {
    fn kind(&self) -> DetectorKind;
    fn detect(&self, ctx: &MatchContext<'_>, candidate_box: usize, target_box: usize) -> Vec<MatchingIssue>;
}

/// Names detectors in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    SidePinCount,
    MissingPinShape,
    PinShapeWrongPosition,
    MissingConnectionBetweenBoxes,
}

impl DetectorKind {
    pub const DEFAULT: [DetectorKind; 2] = [DetectorKind::SidePinCount, DetectorKind::MissingPinShape];
}

/// Instantiate detectors in the given order.
pub fn create_issue_detectors(kinds: &[DetectorKind]) -> Vec<Box<dyn IssueDetector>> {
    kinds
        .iter()
        .map(|kind| -> Box<dyn IssueDetector> {
            match kind {
                DetectorKind::SidePinCount => Box::new(SidePinCountDetector),
                DetectorKind::MissingPinShape => Box::new(MissingPinShapeDetector),
                DetectorKind::PinShapeWrongPosition => Box::new(PinShapeWrongPositionDetector),
                DetectorKind::MissingConnectionBetweenBoxes => Box::new(MissingConnectionDetector),
            }
        })
        .collect()
}

/// Any of the four side counts differ.
pub struct SidePinCountDetector;

impl IssueDetector for SidePinCountDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::SidePinCount
    }

    fn detect(&self, ctx: &MatchContext<'_>, candidate_box: usize, target_box: usize) -> Vec<MatchingIssue> {
        let (Some(candidate), Some(target)) = (
            ctx.candidate.boxes.get(candidate_box),
            ctx.target.boxes.get(target_box),
        ) else {
            return Vec::new();
        };
        Side::ALL_CCW
            .into_iter()
            .filter(|side| candidate.pin_counts.get(*side) != target.pin_counts.get(*side))
            .map(|side| MatchingIssue::SidePinCountMismatch {
                candidate_box_index: candidate_box,
                target_box_index: target_box,
                side,
                candidate_count: candidate.pin_counts.get(side),
                target_count: target.pin_counts.get(side),
            })
            .collect()
    }
}

/// Every connected target pin needs an unused candidate pin of the same
/// shape. Candidate shapes are consumed at most once.
pub struct MissingPinShapeDetector;

impl IssueDetector for MissingPinShapeDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::MissingPinShape
    }

    fn detect(&self, ctx: &MatchContext<'_>, candidate_box: usize, target_box: usize) -> Vec<MatchingIssue> {
        let mut pool: HashMap<&str, usize> = HashMap::new();
        for signature in ctx.candidate_shapes.box_signatures(candidate_box) {
            *pool.entry(signature.as_str()).or_default() += 1;
        }
        let mut issues = Vec::new();
        for (pin, signature) in ctx.target_shapes.connected_pins(target_box) {
            match pool.get_mut(signature) {
                Some(available) if *available > 0 => *available -= 1,
                _ => issues.push(MatchingIssue::MissingPinShape {
                    candidate_box_index: candidate_box,
                    target_box_index: target_box,
                    target_pin_number: pin,
                    signature: signature.to_owned(),
                }),
            }
        }
        issues
    }
}

/// The candidate has the target pin's shape, but on another pin number.
pub struct PinShapeWrongPositionDetector;

impl IssueDetector for PinShapeWrongPositionDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::PinShapeWrongPosition
    }

    fn detect(&self, ctx: &MatchContext<'_>, candidate_box: usize, target_box: usize) -> Vec<MatchingIssue> {
        let candidate_signatures = ctx.candidate_shapes.box_signatures(candidate_box);
        ctx.target_shapes
            .connected_pins(target_box)
            .filter(|(pin, signature)| {
                ctx.candidate_shapes.signature(candidate_box, *pin) != Some(*signature)
                    && candidate_signatures.iter().any(|s| s == signature)
            })
            .map(|(pin, _)| MatchingIssue::PinShapeInWrongPosition {
                candidate_box_index: candidate_box,
                target_box_index: target_box,
                target_pin_number: pin,
            })
            .collect()
    }
}

/// A target pin is wired to a box that is already matched, but the
/// candidate lacks the corresponding wire between the matched pair.
pub struct MissingConnectionDetector;

impl IssueDetector for MissingConnectionDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::MissingConnectionBetweenBoxes
    }

    fn detect(&self, ctx: &MatchContext<'_>, candidate_box: usize, target_box: usize) -> Vec<MatchingIssue> {
        let mut issues = Vec::new();
        for connection in &ctx.target.connections {
            for port in &connection.connected_ports {
                let NormalizedPort::Pin {
                    box_index,
                    pin_number,
                } = *port
                else {
                    continue;
                };
                if box_index != target_box {
                    continue;
                }
                for other in &connection.connected_ports {
                    let NormalizedPort::Pin {
                        box_index: other_box,
                        pin_number: other_pin,
                    } = *other
                    else {
                        continue;
                    };
                    if other_box == target_box {
                        continue;
                    }
                    let Some(&other_candidate) = ctx.matched.get(&other_box) else {
                        continue;
                    };
                    let wired = ctx
                        .candidate
                        .connection_for_pin(candidate_box, pin_number)
                        .is_some_and(|c| {
                            c.connected_ports.contains(&NormalizedPort::Pin {
                                box_index: other_candidate,
                                pin_number: other_pin,
                            })
                        });
                    if !wired {
                        issues.push(MatchingIssue::MissingConnectionBetweenBoxes {
                            candidate_box_index: candidate_box,
                            target_box_index: target_box,
                            target_pin_number: pin_number,
                            other_target_box_index: other_box,
                            other_target_pin_number: other_pin,
                        });
                    }
                }
            }
        }
        issues
    }
}
