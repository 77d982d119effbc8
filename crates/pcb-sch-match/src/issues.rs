use pcb_netlist::Side;
use serde::{Deserialize, Serialize};

/// A structural difference between a candidate and a target netlist.
///
/// Box indices refer to the normalized netlists being compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum MatchingIssue {
    SidePinCountMismatch {
        candidate_box_index: usize,
        target_box_index: usize,
        side: Side,
        candidate_count: u32,
        target_count: u32,
    },
    MissingPinShape {
        candidate_box_index: usize,
        target_box_index: usize,
        target_pin_number: u32,
        signature: String,
    },
    PinShapeInWrongPosition {
        candidate_box_index: usize,
        target_box_index: usize,
        target_pin_number: u32,
    },
    MissingConnectionBetweenBoxes {
        candidate_box_index: usize,
        target_box_index: usize,
        target_pin_number: u32,
        other_target_box_index: usize,
        other_target_pin_number: u32,
    },
    MissingBox {
        target_box_index: usize,
    },
    ExtraBox {
        candidate_box_index: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    SidePinCountMismatch,
    MissingPinShape,
    PinShapeInWrongPosition,
    MissingConnectionBetweenBoxes,
    MissingBox,
    ExtraBox,
}

impl IssueKind {
    /// Weight used by [`crate::SimilarityMetric::Weighted`].
    pub const fn weight(self) -> u32 {
        match self {
            IssueKind::SidePinCountMismatch => 1,
            IssueKind::MissingPinShape => 2,
            IssueKind::PinShapeInWrongPosition => 1,
            IssueKind::MissingConnectionBetweenBoxes => 2,
            IssueKind::MissingBox => 4,
            IssueKind::ExtraBox => 2,
        }
    }
}

impl MatchingIssue {
    pub fn kind(&self) -> IssueKind {
        match self {
            MatchingIssue::SidePinCountMismatch { .. } => IssueKind::SidePinCountMismatch,
            MatchingIssue::MissingPinShape { .. } => IssueKind::MissingPinShape,
            MatchingIssue::PinShapeInWrongPosition { .. } => IssueKind::PinShapeInWrongPosition,
            MatchingIssue::MissingConnectionBetweenBoxes { .. } => {
                IssueKind::MissingConnectionBetweenBoxes
            }
            MatchingIssue::MissingBox { .. } => IssueKind::MissingBox,
            MatchingIssue::ExtraBox { .. } => IssueKind::ExtraBox,
        }
    }
}
