//! Traversal by double dispatch on node kind.
//!
//! Every visit method returns whether to descend into the node's children;
//! the defaults descend everywhere, so a visitor only overrides the kinds it
//! cares about.

use super::node::{
    ChordData, MeasureData, NodeId, NodeKind, NoteData, PartData, ScoreData, SlotData, StaffData,
    SystemData,
};
use super::tree::ScoreTree;
use crate::geometry::PixelRect;
use log::warn;
use serde::Serialize;
use std::fmt::Write as _;

#[allow(unused_variables)]
pub trait ScoreVisitor {
    fn visit_score(&mut self, tree: &ScoreTree, id: NodeId, data: &ScoreData) -> bool {
        true
    }
    fn visit_system(&mut self, tree: &ScoreTree, id: NodeId, data: &SystemData) -> bool {
        true
    }
    fn visit_part(&mut self, tree: &ScoreTree, id: NodeId, data: &PartData) -> bool {
        true
    }
    fn visit_staff(&mut self, tree: &ScoreTree, id: NodeId, data: &StaffData) -> bool {
        true
    }
    fn visit_measure(&mut self, tree: &ScoreTree, id: NodeId, data: &MeasureData) -> bool {
        true
    }
    fn visit_slot(&mut self, tree: &ScoreTree, id: NodeId, data: &SlotData) -> bool {
        true
    }
    fn visit_chord(&mut self, tree: &ScoreTree, id: NodeId, data: &ChordData) -> bool {
        true
    }
    fn visit_note(&mut self, tree: &ScoreTree, id: NodeId, data: &NoteData) -> bool {
        true
    }
}

impl ScoreTree {
    /// Dispatch `visitor` on `id`, then on its subtree if the visit asks for it.
    ///
    /// Returns the visit's descend flag; an unknown id is logged and skipped.
    pub fn accept<V: ScoreVisitor + ?Sized>(&self, id: NodeId, visitor: &mut V) -> bool {
        let Some(node) = self.get(id) else {
            warn!("ScoreTree::accept skipping unknown node {id}");
            return false;
        };
        let descend = match node.kind() {
            NodeKind::Score(d) => visitor.visit_score(self, id, d),
            NodeKind::System(d) => visitor.visit_system(self, id, d),
            NodeKind::Part(d) => visitor.visit_part(self, id, d),
            NodeKind::Staff(d) => visitor.visit_staff(self, id, d),
            NodeKind::Measure(d) => visitor.visit_measure(self, id, d),
            NodeKind::Slot(d) => visitor.visit_slot(self, id, d),
            NodeKind::Chord(d) => visitor.visit_chord(self, id, d),
            NodeKind::Note(d) => visitor.visit_note(self, id, d),
        };
        if descend {
            self.accept_children(id, visitor);
        }
        descend
    }

    pub fn accept_children<V: ScoreVisitor + ?Sized>(&self, id: NodeId, visitor: &mut V) {
        for &child in self.children(id) {
            self.accept(child, visitor);
        }
    }

    /// Depth of a node below the root.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }

    /// Indented one-line-per-node listing of the whole tree.
    pub fn dump(&self) -> String {
        let mut dumper = TreeDumper::default();
        self.accept(self.root(), &mut dumper);
        dumper.out
    }

    /// Structural snapshot of a subtree, free of arena ids.
    pub fn snapshot(&self, id: NodeId) -> Option<NodeSnapshot> {
        let node = self.get(id)?;
        Some(NodeSnapshot {
            kind: node.kind().name(),
            label: node.kind().describe(),
            bounds: self.bounds(id).ok(),
            children: self
                .children(id)
                .iter()
                .filter_map(|&c| self.snapshot(c))
                .collect(),
        })
    }
}

/// Collects [`NodeKind::describe`] lines indented by depth.
#[derive(Debug, Default)]
pub struct TreeDumper {
    pub out: String,
}

impl TreeDumper {
    fn line(&mut self, tree: &ScoreTree, id: NodeId) -> bool {
        if let Some(node) = tree.get(id) {
            let indent = "  ".repeat(tree.depth(id));
            let _ = writeln!(self.out, "{indent}{}", node.kind().describe());
        }
        true
    }
}

impl ScoreVisitor for TreeDumper {
    fn visit_score(&mut self, tree: &ScoreTree, id: NodeId, _: &ScoreData) -> bool {
        self.line(tree, id)
    }
    fn visit_system(&mut self, tree: &ScoreTree, id: NodeId, _: &SystemData) -> bool {
        self.line(tree, id)
    }
    fn visit_part(&mut self, tree: &ScoreTree, id: NodeId, _: &PartData) -> bool {
        self.line(tree, id)
    }
    fn visit_staff(&mut self, tree: &ScoreTree, id: NodeId, _: &StaffData) -> bool {
        self.line(tree, id)
    }
    fn visit_measure(&mut self, tree: &ScoreTree, id: NodeId, _: &MeasureData) -> bool {
        self.line(tree, id)
    }
    fn visit_slot(&mut self, tree: &ScoreTree, id: NodeId, _: &SlotData) -> bool {
        self.line(tree, id)
    }
    fn visit_chord(&mut self, tree: &ScoreTree, id: NodeId, _: &ChordData) -> bool {
        self.line(tree, id)
    }
    fn visit_note(&mut self, tree: &ScoreTree, id: NodeId, _: &NoteData) -> bool {
        self.line(tree, id)
    }
}

/// Comparable image of a subtree: kinds, descriptions and boxes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub kind: &'static str,
    pub label: String,
    pub bounds: Option<PixelRect>,
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    /// Number of nodes in the snapshot.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(NodeSnapshot::count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{PixelPoint, SystemFrame};

    #[derive(Default)]
    struct KindCounter {
        staves: usize,
        measures: usize,
    }

    impl ScoreVisitor for KindCounter {
        fn visit_staff(&mut self, _: &ScoreTree, _: NodeId, _: &StaffData) -> bool {
            self.staves += 1;
            false
        }
        fn visit_measure(&mut self, _: &ScoreTree, _: NodeId, _: &MeasureData) -> bool {
            self.measures += 1;
            false
        }
    }

    fn two_systems() -> ScoreTree {
        let mut tree = ScoreTree::new(ScoreData::default());
        for (rank, y) in [(1usize, 0), (2, 300)] {
            let root = tree.root();
            let sys = tree
                .add_child(
                    root,
                    NodeKind::System(SystemData {
                        id: rank,
                        frame: SystemFrame::new(PixelPoint::new(0, y), 600, 300),
                    }),
                )
                .unwrap();
            let part = tree.add_child(sys, NodeKind::Part(PartData { id: 1 })).unwrap();
            tree.add_child(
                part,
                NodeKind::Staff(StaffData {
                    id: 1,
                    lines: vec![y + 100, y + 110, y + 120, y + 130, y + 140],
                    area: PixelRect::new(10, y + 100, 500, 41),
                }),
            )
            .unwrap();
            for k in 0..2 {
                tree.add_child(
                    part,
                    NodeKind::Measure(MeasureData {
                        number: 0,
                        area: PixelRect::new(10 + k * 250, y + 100, 250, 41),
                        left_bar: None,
                        right_bar: None,
                    }),
                )
                .unwrap();
            }
        }
        tree
    }

    #[test]
    fn visitor_reaches_every_kind_it_overrides() {
        let tree = two_systems();
        let mut counter = KindCounter::default();
        tree.accept(tree.root(), &mut counter);
        assert_eq!(counter.staves, 2);
        assert_eq!(counter.measures, 4);
    }

    #[test]
    fn dump_indents_by_depth() {
        let tree = two_systems();
        let dump = tree.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), tree.len());
        assert!(lines[0].starts_with("Score"));
        assert!(lines[1].starts_with("  System 1"));
        assert!(lines[2].starts_with("    Part 1"));
    }

    #[test]
    fn snapshots_ignore_arena_ids() {
        let a = two_systems();
        let mut b = two_systems();
        let root = b.root();
        let sys = b.systems()[0];
        b.remove_subtree(sys).unwrap();
        assert_ne!(a.snapshot(a.root()), b.snapshot(root));
        let sys_a = a.systems()[1];
        let sys_b = b.systems()[0];
        assert_eq!(a.snapshot(sys_a), b.snapshot(sys_b));
        assert_eq!(a.snapshot(a.root()).unwrap().count(), a.len());
    }
}
