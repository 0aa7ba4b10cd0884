//! Display layout and measure numbering.
//!
//! Systems are laid side by side in display space: the first at
//! `(init_x, init_y)`, each next one `inter_system` pixels after the last
//! column of its predecessor. Measures are numbered from 1 across the score;
//! every part of a system shares the numbers of that system's first part.

use super::node::{MeasureData, NodeId, PartData, StaffData, SystemData};
use super::tree::ScoreTree;
use super::visitor::ScoreVisitor;
use super::TreeError;
use crate::geometry::DisplayPoint;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutParams {
    pub init_x: i32,
    pub init_y: i32,
    /// Horizontal gap between consecutive systems in display space.
    pub inter_system: i32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            init_x: 0,
            init_y: 0,
            inter_system: 100,
        }
    }
}

/// How many setters actually changed something.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LayoutReport {
    pub systems: usize,
    pub measures: usize,
    pub origins_changed: usize,
    pub numbers_changed: usize,
}

/// Collects the target origins and numbers in one read-only pass.
struct LayoutPlanner<'a> {
    params: &'a LayoutParams,
    next_x: i32,
    offset: i32,
    first_part_measures: i32,
    first_part_seen: bool,
    in_first_part: bool,
    index: i32,
    origins: Vec<(NodeId, DisplayPoint)>,
    numbers: Vec<(NodeId, i32)>,
}

impl<'a> LayoutPlanner<'a> {
    fn new(params: &'a LayoutParams) -> Self {
        Self {
            params,
            next_x: params.init_x,
            offset: 0,
            first_part_measures: 0,
            first_part_seen: false,
            in_first_part: false,
            index: 0,
            origins: Vec::new(),
            numbers: Vec::new(),
        }
    }
}

impl ScoreVisitor for LayoutPlanner<'_> {
    fn visit_system(&mut self, _: &ScoreTree, id: NodeId, data: &SystemData) -> bool {
        self.offset += self.first_part_measures;
        self.first_part_measures = 0;
        self.first_part_seen = false;
        self.origins
            .push((id, DisplayPoint::new(self.next_x, self.params.init_y)));
        self.next_x += data.frame.width - 1 + self.params.inter_system;
        true
    }

    fn visit_part(&mut self, _: &ScoreTree, _: NodeId, _: &PartData) -> bool {
        self.in_first_part = !self.first_part_seen;
        self.first_part_seen = true;
        self.index = 0;
        true
    }

    fn visit_staff(&mut self, _: &ScoreTree, _: NodeId, _: &StaffData) -> bool {
        false
    }

    fn visit_measure(&mut self, _: &ScoreTree, id: NodeId, _: &MeasureData) -> bool {
        self.index += 1;
        self.numbers.push((id, self.offset + self.index));
        if self.in_first_part {
            self.first_part_measures += 1;
        }
        false
    }
}

/// Assign display origins and measure numbers; idempotent.
pub fn apply_layout(tree: &mut ScoreTree, params: &LayoutParams) -> Result<LayoutReport, TreeError> {
    let mut planner = LayoutPlanner::new(params);
    tree.accept(tree.root(), &mut planner);
    let mut report = LayoutReport {
        systems: planner.origins.len(),
        measures: planner.numbers.len(),
        ..LayoutReport::default()
    };
    for (id, origin) in planner.origins {
        if tree.set_display_origin(id, origin)? {
            report.origins_changed += 1;
        }
    }
    for (id, number) in planner.numbers {
        if tree.set_measure_number(id, number)? {
            report.numbers_changed += 1;
        }
    }
    debug!(
        "apply_layout systems={} measures={} changed={}/{}",
        report.systems, report.measures, report.origins_changed, report.numbers_changed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PixelPoint, PixelRect, SystemFrame};
    use crate::score::{NodeKind, ScoreData};

    fn measure(x: i32) -> NodeKind {
        NodeKind::Measure(MeasureData {
            number: 0,
            area: PixelRect::new(x, 0, 100, 40),
            left_bar: None,
            right_bar: None,
        })
    }

    /// System 1: two parts of 3 measures; system 2: one part of 2 measures.
    fn tree() -> ScoreTree {
        let mut tree = ScoreTree::new(ScoreData::default());
        let root = tree.root();
        for (rank, (parts, per_part)) in [(2, 3), (1, 2)].into_iter().enumerate() {
            let frame = SystemFrame::new(PixelPoint::new(0, rank as i32 * 400), 900, 400);
            let sys = tree
                .add_child(root, NodeKind::System(SystemData { id: rank + 1, frame }))
                .unwrap();
            for p in 0..parts {
                let part = tree.add_child(sys, NodeKind::Part(PartData { id: p + 1 })).unwrap();
                for m in 0..per_part {
                    tree.add_child(part, measure(m * 100)).unwrap();
                }
            }
        }
        tree
    }

    #[test]
    fn systems_are_laid_side_by_side() {
        let mut tree = tree();
        let params = LayoutParams {
            init_x: 10,
            init_y: 5,
            inter_system: 100,
        };
        apply_layout(&mut tree, &params).unwrap();
        let s = tree.systems();
        let f0 = tree.system(s[0]).unwrap().frame;
        let f1 = tree.system(s[1]).unwrap().frame;
        assert_eq!(f0.display_origin, DisplayPoint::new(10, 5));
        assert_eq!(f1.display_origin, DisplayPoint::new(10 + 899 + 100, 5));
    }

    #[test]
    fn measures_are_numbered_across_systems() {
        let mut tree = tree();
        apply_layout(&mut tree, &LayoutParams::default()).unwrap();
        let s = tree.systems();
        let numbers = |part| -> Vec<i32> {
            tree.measures(part)
                .into_iter()
                .map(|m| tree.measure(m).unwrap().number)
                .collect()
        };
        let parts1 = tree.parts(s[0]);
        assert_eq!(numbers(parts1[0]), vec![1, 2, 3]);
        assert_eq!(numbers(parts1[1]), vec![1, 2, 3]);
        assert_eq!(numbers(tree.parts(s[1])[0]), vec![4, 5]);
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut tree = tree();
        let first = apply_layout(&mut tree, &LayoutParams::default()).unwrap();
        assert_eq!(first.numbers_changed, 8);
        let revisions: Vec<u64> = tree.systems().iter().map(|&s| tree.revision(s).unwrap()).collect();
        let second = apply_layout(&mut tree, &LayoutParams::default()).unwrap();
        assert_eq!(second.origins_changed, 0);
        assert_eq!(second.numbers_changed, 0);
        let after: Vec<u64> = tree.systems().iter().map(|&s| tree.revision(s).unwrap()).collect();
        assert_eq!(revisions, after);
    }
}
