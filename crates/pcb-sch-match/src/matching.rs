//! Greedy box assignment and template selection.

use std::collections::BTreeMap;

use pcb_canonical::{Normalization, normalize_netlist};
use pcb_netlist::Netlist;
use serde::{Deserialize, Serialize};

use crate::detectors::{DetectorKind, IssueDetector, MatchContext, create_issue_detectors};
use crate::issues::MatchingIssue;
use crate::pin_shapes::PinShapeTable;

/// Reduces an issue list to a scalar distance. Lower is better.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// One point per issue.
    #[default]
    IssueCount,
    /// Per-kind weights from [`crate::IssueKind::weight`].
    Weighted,
}

impl SimilarityMetric {
    pub fn distance(self, issues: &[MatchingIssue]) -> u32 {
        match self {
            SimilarityMetric::IssueCount => issues.len() as u32,
            SimilarityMetric::Weighted => issues.iter().map(|i| i.kind().weight()).sum(),
        }
    }
}

/// A netlist normalized once together with its pin-shape table.
#[derive(Debug, Clone)]
pub struct PreparedNetlist {
    pub normalization: Normalization,
    pub shapes: PinShapeTable,
}

impl PreparedNetlist {
    pub fn new(netlist: &Netlist) -> Self {
        let normalization = normalize_netlist(netlist);
        let shapes = PinShapeTable::new(&normalization.netlist);
        Self {
            normalization,
            shapes,
        }
    }

    pub fn box_count(&self) -> usize {
        self.normalization.netlist.boxes.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxMatch {
    pub target_box_index: usize,
    pub candidate_box_index: usize,
    pub distance: u32,
}

/// Result of [`Matcher::get_matched_boxes`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedBoxes {
    pub matches: Vec<BoxMatch>,
    pub unmatched_target_boxes: Vec<usize>,
    pub unmatched_candidate_boxes: Vec<usize>,
    /// Issues of the chosen pairs.
    pub issues: Vec<MatchingIssue>,
}

impl MatchedBoxes {
    pub fn candidate_for(&self, target_box_index: usize) -> Option<usize> {
        self.matches
            .iter()
            .find(|m| m.target_box_index == target_box_index)
            .map(|m| m.candidate_box_index)
    }

    /// Matched pairs as `(target_box_id, candidate_box_id)`.
    pub fn id_pairs(&self, candidate: &PreparedNetlist, target: &PreparedNetlist) -> Vec<(String, String)> {
        self.matches
            .iter()
            .filter_map(|m| {
                let target_id = target.normalization.transform.box_id(m.target_box_index)?;
                let candidate_id = candidate
                    .normalization
                    .transform
                    .box_id(m.candidate_box_index)?;
                Some((target_id.to_owned(), candidate_id.to_owned()))
            })
            .collect()
    }
}

/// Score of one template against the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMatch {
    pub template_index: usize,
    pub distance: u32,
    pub issues: Vec<MatchingIssue>,
    pub matched_boxes: MatchedBoxes,
}

pub struct Matcher {
    detectors: Vec<Box<dyn IssueDetector>>,
    metric: SimilarityMetric,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::from_kinds(&DetectorKind::DEFAULT, SimilarityMetric::default())
    }
}

impl Matcher {
    pub fn new(detectors: Vec<Box<dyn IssueDetector>>, metric: SimilarityMetric) -> Self {
        Self { detectors, metric }
    }

    pub fn from_kinds(kinds: &[DetectorKind], metric: SimilarityMetric) -> Self {
        Self::new(create_issue_detectors(kinds), metric)
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn detector_kinds(&self) -> Vec<DetectorKind> {
        self.detectors.iter().map(|d| d.kind()).collect()
    }

    /// Greedy assignment, target-major in normalized order. Each target box
    /// takes the unused candidate with the lowest distance; the first
    /// candidate wins ties.
    pub fn get_matched_boxes(&self, candidate: &PreparedNetlist, target: &PreparedNetlist) -> MatchedBoxes {
        let mut matched: BTreeMap<usize, usize> = BTreeMap::new();
        let mut used = vec![false; candidate.box_count()];
        let mut result = MatchedBoxes::default();

        for target_box in 0..target.box_count() {
            let ctx = MatchContext {
                candidate: &candidate.normalization.netlist,
                target: &target.normalization.netlist,
                candidate_shapes: &candidate.shapes,
                target_shapes: &target.shapes,
                matched: &matched,
            };
            let mut best: Option<(usize, u32, Vec<MatchingIssue>)> = None;
            for candidate_box in (0..candidate.box_count()).filter(|c| !used[*c]) {
                let issues: Vec<MatchingIssue> = self
                    .detectors
                    .iter()
                    .flat_map(|d| d.detect(&ctx, candidate_box, target_box))
                    .collect();
                let distance = self.metric.distance(&issues);
                if best.as_ref().is_none_or(|(_, d, _)| distance < *d) {
                    best = Some((candidate_box, distance, issues));
                }
                if distance == 0 {
                    break;
                }
            }

            match best {
                Some((candidate_box, distance, issues)) => {
                    log::trace!("target box {target_box} -> candidate box {candidate_box} (distance {distance})");
                    used[candidate_box] = true;
                    matched.insert(target_box, candidate_box);
                    result.matches.push(BoxMatch {
                        target_box_index: target_box,
                        candidate_box_index: candidate_box,
                        distance,
                    });
                    result.issues.extend(issues);
                }
                None => {
                    log::trace!("target box {target_box} left unmatched");
                    result.unmatched_target_boxes.push(target_box);
                }
            }
        }
        result.unmatched_candidate_boxes = (0..candidate.box_count()).filter(|c| !used[*c]).collect();
        result
    }

    /// Box-level issues plus one issue per box left without a partner.
    pub fn get_matching_issues(&self, candidate: &PreparedNetlist, target: &PreparedNetlist) -> (MatchedBoxes, Vec<MatchingIssue>) {
        let matched = self.get_matched_boxes(candidate, target);
        let mut issues = matched.issues.clone();
        issues.extend(
            matched
                .unmatched_target_boxes
                .iter()
                .map(|&target_box_index| MatchingIssue::MissingBox { target_box_index }),
        );
        issues.extend(
            matched
                .unmatched_candidate_boxes
                .iter()
                .map(|&candidate_box_index| MatchingIssue::ExtraBox {
                    candidate_box_index,
                }),
        );
        (matched, issues)
    }

    /// Score one template against an already prepared target.
    pub fn evaluate_template(&self, template_index: usize, template: &Netlist, target: &PreparedNetlist) -> TemplateMatch {
        let candidate = PreparedNetlist::new(template);
        let (matched_boxes, issues) = self.get_matching_issues(&candidate, target);
        let distance = self.metric.distance(&issues);
        log::trace!("template {template_index}: {} issues, distance {distance}", issues.len());
        TemplateMatch {
            template_index,
            distance,
            issues,
            matched_boxes,
        }
    }

    /// The template closest to `target`, first seen winning ties. `None`
    /// when there are no templates.
    #[tracing::instrument(name = "find_best_match", skip_all, fields(templates = templates.len()))]
    pub fn find_best_match(&self, target: &Netlist, templates: &[Netlist]) -> Option<TemplateMatch> {
        let target = PreparedNetlist::new(target);
        let mut best: Option<TemplateMatch> = None;
        for (index, template) in templates.iter().enumerate() {
            let evaluated = self.evaluate_template(index, template, &target);
            if best.as_ref().is_none_or(|b| evaluated.distance < b.distance) {
                best = Some(evaluated);
            }
        }
        if let Some(best) = &best {
            log::debug!(
                "best template {} at distance {}",
                best.template_index,
                best.distance
            );
        }
        best
    }
}

/// [`Matcher::get_matched_boxes`] with the default detectors and metric.
pub fn get_matched_boxes(candidate: &Netlist, target: &Netlist) -> MatchedBoxes {
    Matcher::default().get_matched_boxes(&PreparedNetlist::new(candidate), &PreparedNetlist::new(target))
}

/// [`Matcher::get_matching_issues`] with the default detectors and metric.
pub fn get_matching_issues(candidate: &Netlist, target: &Netlist) -> Vec<MatchingIssue> {
    Matcher::default()
        .get_matching_issues(&PreparedNetlist::new(candidate), &PreparedNetlist::new(target))
        .1
}

/// [`Matcher::find_best_match`] with the default detectors and metric.
pub fn find_best_match(target: &Netlist, templates: &[Netlist]) -> Option<TemplateMatch> {
    Matcher::default().find_best_match(target, templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IssueKind;
    use pcb_test_utils::NetlistFixture;

    #[test]
    fn side_count_mismatch_per_side() {
        let candidate = NetlistFixture::new().chip("U1", 1, 0, 1, 0).build();
        let target = NetlistFixture::new().chip("U1", 2, 0, 2, 0).build();
        let issues = get_matching_issues(&candidate, &target);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.kind() == IssueKind::SidePinCountMismatch));
    }

    #[test]
    fn pin_shapes_are_consumed_once() {
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 0, 0)
            .label(("U1", 1), "A")
            .label(("U1", 2), "B")
            .build();
        let candidate = NetlistFixture::new()
            .chip("U1", 2, 0, 0, 0)
            .label(("U1", 1), "A")
            .build();
        let issues = get_matching_issues(&candidate, &target);
        assert_eq!(
            issues,
            [MatchingIssue::MissingPinShape {
                candidate_box_index: 0,
                target_box_index: 0,
                target_pin_number: 2,
                signature: "L1B0R0T0|C[b0.1,n0]".into(),
            }]
        );
    }

    #[test]
    fn unmatched_boxes_are_reported() {
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 2, 0)
            .resistor("R1")
            .build();
        let candidate = NetlistFixture::new().chip("U1", 2, 0, 2, 0).build();
        let issues = get_matching_issues(&candidate, &target);
        assert_eq!(issues, [MatchingIssue::MissingBox { target_box_index: 1 }]);

        let issues = get_matching_issues(&target, &candidate);
        assert_eq!(issues, [MatchingIssue::ExtraBox { candidate_box_index: 1 }]);
    }

    #[test]
    fn weighted_metric_uses_kind_weights() {
        let issues = [
            MatchingIssue::MissingBox { target_box_index: 0 },
            MatchingIssue::ExtraBox { candidate_box_index: 1 },
        ];
        assert_eq!(SimilarityMetric::IssueCount.distance(&issues), 2);
        assert_eq!(SimilarityMetric::Weighted.distance(&issues), 6);
    }

    #[test]
    fn wrong_position_detector() {
        let target = NetlistFixture::new()
            .chip("U1", 2, 0, 0, 0)
            .label(("U1", 2), "A")
            .build();
        let candidate = NetlistFixture::new()
            .chip("U1", 2, 0, 0, 0)
            .label(("U1", 1), "A")
            .build();
        assert!(get_matching_issues(&candidate, &target).is_empty());

        let matcher = Matcher::from_kinds(
            &[DetectorKind::MissingPinShape, DetectorKind::PinShapeWrongPosition],
            SimilarityMetric::IssueCount,
        );
        let (_, issues) = matcher.get_matching_issues(&PreparedNetlist::new(&candidate), &PreparedNetlist::new(&target));
        assert_eq!(
            issues,
            [MatchingIssue::PinShapeInWrongPosition {
                candidate_box_index: 0,
                target_box_index: 0,
                target_pin_number: 2,
            }]
        );
    }

    #[test]
    fn missing_connection_between_matched_boxes() {
        let target = NetlistFixture::new()
            .chip("U1", 0, 0, 1, 0)
            .chip("U2", 1, 0, 0, 0)
            .wire(("U1", 1), ("U2", 1))
            .build();
        let candidate = NetlistFixture::new()
            .chip("U1", 0, 0, 1, 0)
            .chip("U2", 1, 0, 0, 0)
            .label(("U1", 1), "A")
            .label(("U2", 1), "B")
            .build();
        let matcher = Matcher::from_kinds(
            &[DetectorKind::MissingConnectionBetweenBoxes],
            SimilarityMetric::IssueCount,
        );
        let (matched, issues) =
            matcher.get_matching_issues(&PreparedNetlist::new(&candidate), &PreparedNetlist::new(&target));
        assert_eq!(matched.matches.len(), 2);
        assert_eq!(
            issues,
            [MatchingIssue::MissingConnectionBetweenBoxes {
                candidate_box_index: 1,
                target_box_index: 1,
                target_pin_number: 1,
                other_target_box_index: 0,
                other_target_pin_number: 1,
            }]
        );
    }

    #[test]
    fn no_templates_means_no_match() {
        let target = NetlistFixture::new().chip("U1", 1, 0, 0, 0).build();
        assert!(find_best_match(&target, &[]).is_none());
    }
}
