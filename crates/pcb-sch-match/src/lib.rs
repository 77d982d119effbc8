//! Structural matching of netlists against schematic templates.
//!
//! Boxes of a target netlist are paired with boxes of a candidate (template)
//! netlist by a greedy assignment driven by pluggable [`IssueDetector`]s.
//! The issue list of the best pairing, reduced by a [`SimilarityMetric`],
//! scores the template; [`find_best_match`] picks the lowest score.

pub mod detectors;
pub mod issues;
pub mod matching;
pub mod pin_shapes;

pub use detectors::{
    DetectorKind, IssueDetector, MatchContext, MissingConnectionDetector, MissingPinShapeDetector,
    PinShapeWrongPositionDetector, SidePinCountDetector, create_issue_detectors,
};
pub use issues::{IssueKind, MatchingIssue};
pub use matching::{
    BoxMatch, MatchedBoxes, Matcher, PreparedNetlist, SimilarityMetric, TemplateMatch,
    find_best_match, get_matched_boxes, get_matching_issues,
};
pub use pin_shapes::PinShapeTable;
