//! Arena-backed score tree with lazily cached geometry.
//!
//! Nodes live in a vector indexed by [`NodeId`]; a node stores its parent id
//! and its ordered child ids, so ancestor navigation is a chain of index
//! lookups and there is no ownership cycle.
//!
//! Geometry caches are dirty bits: `None` means unknown. A box is computed on
//! read only, as the union of the node's intrinsic box (if its kind has one)
//! and the boxes of its children. Every structural mutation clears the caches
//! of the mutated node and of all its ancestors up to the root, and bumps
//! their revision, so a stale box is never observed.
//!
//! Caches use `Cell`, which makes the tree `Send` but not `Sync`: only the
//! thread that owns a sheet's tree reads or mutates it.

use super::node::{
    ChordData, MeasureData, Node, NodeId, NodeKind, NoteData, PartData, ScoreData, SlotData,
    StaffData, SystemData,
};
use super::TreeError;
use crate::geometry::{
    nearest_by_ordinate, union_all, DisplayPoint, PixelPoint, PixelRect, SystemFrame,
    SystemPoint,
};
use log::warn;
use std::cell::Cell;

#[derive(Debug)]
pub struct ScoreTree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
    /// Most recently located system; an optimisation only.
    pub(crate) recent_system: Cell<Option<NodeId>>,
    pub(crate) locate_cache: bool,
    deferred_root: bool,
    root_stale: bool,
}

pub(crate) fn unsupported(kind: &'static str, operation: &'static str) -> TreeError {
    warn!("unsupported operation `{operation}` on {kind}");
    TreeError::Unsupported { kind, operation }
}

impl ScoreTree {
    pub fn new(score: ScoreData) -> Self {
        Self {
            nodes: vec![Some(Node::new(NodeKind::Score(score), None))],
            root: NodeId(0),
            recent_system: Cell::new(None),
            locate_cache: true,
            deferred_root: false,
            root_stale: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn score(&self) -> Option<&ScoreData> {
        match self.get(self.root).map(|n| &n.kind) {
            Some(NodeKind::Score(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize).and_then(|n| n.as_ref())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        self.get(id).ok_or(TreeError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TreeError> {
        self.nodes
            .get_mut(id.0 as usize)
            .and_then(|n| n.as_mut())
            .ok_or(TreeError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> Result<&NodeKind, TreeError> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn revision(&self, id: NodeId) -> Result<u64, TreeError> {
        self.node(id).map(|n| n.revision)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.systems().is_empty()
    }

    // --- Mutation ------------------------------------------------------------

    /// Append a child node; the parent's kind must accept the child's kind.
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, TreeError> {
        let parent_kind = self.kind(parent)?;
        if !parent_kind.accepts(&kind) {
            return Err(unsupported(parent_kind.name(), "add child of this kind"));
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(Node::new(kind, Some(parent))));
        self.node_mut(parent)?.children.push(id);
        self.invalidate_from(parent);
        Ok(id)
    }

    /// Discard a node and everything below it.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<(), TreeError> {
        let parent = match self.node(id)?.parent {
            Some(p) => p,
            None => return Err(unsupported("Score", "remove root")),
        };
        self.drop_descendants(id);
        self.node_mut(parent)?.children.retain(|&c| c != id);
        self.invalidate_from(parent);
        Ok(())
    }

    /// Discard all children of a node; returns how many were dropped.
    pub fn clear_children(&mut self, id: NodeId) -> Result<usize, TreeError> {
        let children = std::mem::take(&mut self.node_mut(id)?.children);
        for &child in &children {
            self.drop_descendants(child);
        }
        if !children.is_empty() {
            self.invalidate_from(id);
        }
        Ok(children.len())
    }

    fn drop_descendants(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0 as usize).and_then(|n| n.take()) {
                stack.extend(node.children);
            }
            if self.recent_system.get() == Some(current) {
                self.recent_system.set(None);
            }
        }
    }

    /// Replace the intrinsic box of a node whose kind carries one.
    pub fn set_intrinsic_box(&mut self, id: NodeId, rect: PixelRect) -> Result<(), TreeError> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            NodeKind::Staff(StaffData { area, .. })
            | NodeKind::Measure(MeasureData { area, .. })
            | NodeKind::Slot(SlotData { area, .. })
            | NodeKind::Note(NoteData { area, .. }) => *area = rect,
            NodeKind::Chord(ChordData { stem_area, .. }) => *stem_area = Some(rect),
            other @ (NodeKind::Score(_) | NodeKind::System(_) | NodeKind::Part(_)) => {
                return Err(unsupported(other.name(), "set intrinsic box"));
            }
        }
        self.invalidate_from(id);
        Ok(())
    }

    /// Set the display origin of a system. No-op (no revision bump) when
    /// unchanged.
    pub fn set_display_origin(&mut self, system: NodeId, origin: DisplayPoint) -> Result<bool, TreeError> {
        let node = self.node_mut(system)?;
        match &mut node.kind {
            NodeKind::System(s) if s.frame.display_origin == origin => Ok(false),
            NodeKind::System(s) => {
                s.frame.display_origin = origin;
                node.revision += 1;
                Ok(true)
            }
            other => Err(unsupported(other.name(), "set display origin")),
        }
    }

    /// Set the score-wide number of a measure. No-op when unchanged.
    pub fn set_measure_number(&mut self, measure: NodeId, number: i32) -> Result<bool, TreeError> {
        let node = self.node_mut(measure)?;
        match &mut node.kind {
            NodeKind::Measure(m) if m.number == number => Ok(false),
            NodeKind::Measure(m) => {
                m.number = number;
                node.revision += 1;
                Ok(true)
            }
            other => Err(unsupported(other.name(), "set measure number")),
        }
    }

    /// Clear cached geometry of `id` and every ancestor, bumping revisions.
    fn invalidate_from(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(cid) = current {
            if cid == self.root && self.deferred_root {
                self.root_stale = true;
                break;
            }
            match self.nodes.get_mut(cid.0 as usize).and_then(|n| n.as_mut()) {
                Some(node) => {
                    node.reset_geometry();
                    node.revision += 1;
                    current = node.parent;
                }
                None => break,
            }
        }
    }

    /// Run a batch of mutations with root invalidation deferred to the end.
    ///
    /// Subtree caches are still cleared eagerly; only the root (shared by all
    /// systems) is invalidated once, after the whole batch.
    pub fn with_deferred_root<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let outer = self.deferred_root;
        self.deferred_root = true;
        let result = f(self);
        self.deferred_root = outer;
        if !outer && self.root_stale {
            self.root_stale = false;
            let root = self.root;
            self.invalidate_from(root);
        }
        result
    }

    // --- Navigation ----------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    fn sibling(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|&c| c == id)? as isize + offset;
        if pos < 0 {
            None
        } else {
            siblings.get(pos as usize).copied()
        }
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(id, -1)
    }

    fn ancestor_where(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(cid) = current {
            let node = self.get(cid)?;
            if pred(&node.kind) {
                return Some(cid);
            }
            current = node.parent;
        }
        None
    }

    /// The system this node belongs to (itself when it is a system).
    pub fn containing_system(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor_where(id, |k| matches!(k, NodeKind::System(_)))
    }

    /// The part this node belongs to (itself when it is a part).
    pub fn containing_part(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor_where(id, |k| matches!(k, NodeKind::Part(_)))
    }

    pub fn containing_measure(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor_where(id, |k| matches!(k, NodeKind::Measure(_)))
    }

    fn children_where(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.get(c).map(|n| pred(&n.kind)).unwrap_or(false))
            .collect()
    }

    pub fn systems(&self) -> Vec<NodeId> {
        self.children(self.root).to_vec()
    }

    pub fn parts(&self, system: NodeId) -> Vec<NodeId> {
        self.children_where(system, |k| matches!(k, NodeKind::Part(_)))
    }

    pub fn staves(&self, part: NodeId) -> Vec<NodeId> {
        self.children_where(part, |k| matches!(k, NodeKind::Staff(_)))
    }

    /// Union of the staff boxes of a part.
    pub fn staff_area(&self, part: NodeId) -> Option<PixelRect> {
        let areas: Vec<PixelRect> = self
            .staves(part)
            .into_iter()
            .filter_map(|s| self.staff(s).map(|d| d.area))
            .collect();
        union_all(&areas).ok()
    }

    /// Part of `system` whose staves are vertically closest to `y`.
    ///
    /// Symbols are attached with this rule, so corrections use it too.
    pub fn nearest_part(&self, system: NodeId, y: i32) -> Option<NodeId> {
        let parts: Vec<(NodeId, PixelRect)> = self
            .parts(system)
            .into_iter()
            .filter_map(|p| Some((p, self.staff_area(p)?)))
            .collect();
        nearest_by_ordinate(parts.iter().map(|(_, area)| area), y).map(|i| parts[i].0)
    }

    pub fn measures(&self, part: NodeId) -> Vec<NodeId> {
        self.children_where(part, |k| matches!(k, NodeKind::Measure(_)))
    }

    pub fn slots(&self, measure: NodeId) -> Vec<NodeId> {
        self.children_where(measure, |k| matches!(k, NodeKind::Slot(_)))
    }

    pub fn chords(&self, measure: NodeId) -> Vec<NodeId> {
        self.children_where(measure, |k| matches!(k, NodeKind::Chord(_)))
    }

    pub fn notes(&self, chord: NodeId) -> Vec<NodeId> {
        self.children_where(chord, |k| matches!(k, NodeKind::Note(_)))
    }

    pub fn system(&self, id: NodeId) -> Option<&SystemData> {
        match self.get(id)?.kind() {
            NodeKind::System(s) => Some(s),
            _ => None,
        }
    }

    pub fn part(&self, id: NodeId) -> Option<&PartData> {
        match self.get(id)?.kind() {
            NodeKind::Part(p) => Some(p),
            _ => None,
        }
    }

    pub fn staff(&self, id: NodeId) -> Option<&StaffData> {
        match self.get(id)?.kind() {
            NodeKind::Staff(s) => Some(s),
            _ => None,
        }
    }

    pub fn measure(&self, id: NodeId) -> Option<&MeasureData> {
        match self.get(id)?.kind() {
            NodeKind::Measure(m) => Some(m),
            _ => None,
        }
    }

    pub fn slot(&self, id: NodeId) -> Option<&SlotData> {
        match self.get(id)?.kind() {
            NodeKind::Slot(s) => Some(s),
            _ => None,
        }
    }

    pub fn note(&self, id: NodeId) -> Option<&NoteData> {
        match self.get(id)?.kind() {
            NodeKind::Note(n) => Some(n),
            _ => None,
        }
    }

    /// Locator such as `S2P1M7` naming the system, part and measure of a node.
    pub fn context_string(&self, id: NodeId) -> String {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            let Some(node) = self.get(cid) else { break };
            match &node.kind {
                NodeKind::System(s) => chain.push(format!("S{}", s.id)),
                NodeKind::Part(p) => chain.push(format!("P{}", p.id)),
                NodeKind::Measure(m) => chain.push(format!("M{}", m.number)),
                _ => {}
            }
            current = node.parent;
        }
        chain.reverse();
        chain.concat()
    }

    // --- Geometry ------------------------------------------------------------

    /// Bounding box in pixel space, computed on first request and cached.
    pub fn bounds(&self, id: NodeId) -> Result<PixelRect, TreeError> {
        let node = self.node(id)?;
        let stale = id == self.root && self.root_stale;
        if !stale {
            if let Some(b) = node.bounds.get() {
                return Ok(b);
            }
        }
        let mut rects = Vec::with_capacity(node.children.len() + 1);
        if let Some(r) = node.kind.intrinsic_box() {
            rects.push(r);
        }
        for &child in &node.children {
            rects.push(self.bounds(child)?);
        }
        let b = union_all(&rects).map_err(|source| {
            warn!("{} {} has no geometry: {}", node.kind.name(), id, source);
            TreeError::Geometry {
                id,
                kind: node.kind.name(),
                source,
            }
        })?;
        if !stale {
            node.bounds.set(Some(b));
        }
        Ok(b)
    }

    /// Center of the bounding box, cached alongside it.
    pub fn center(&self, id: NodeId) -> Result<PixelPoint, TreeError> {
        let node = self.node(id)?;
        let stale = id == self.root && self.root_stale;
        if !stale {
            if let Some(c) = node.center.get() {
                return Ok(c);
            }
        }
        let c = self.bounds(id)?.center();
        if !stale {
            node.center.set(Some(c));
        }
        Ok(c)
    }

    /// `(width, height)` of the bounding box.
    pub fn dimension(&self, id: NodeId) -> Result<(i32, i32), TreeError> {
        self.bounds(id).map(|b| (b.width, b.height))
    }

    /// Frame of the system owning `id`.
    pub fn system_frame(&self, id: NodeId) -> Result<SystemFrame, TreeError> {
        let kind = self.kind(id)?;
        self.containing_system(id)
            .and_then(|s| self.system(s))
            .map(|s| s.frame)
            .ok_or_else(|| unsupported(kind.name(), "system frame"))
    }

    pub fn to_system_point(&self, id: NodeId, p: PixelPoint) -> Result<SystemPoint, TreeError> {
        self.system_frame(id).map(|f| f.to_system(p))
    }

    pub fn to_display_point(&self, id: NodeId, p: PixelPoint) -> Result<DisplayPoint, TreeError> {
        self.system_frame(id).map(|f| f.pixel_to_display(p))
    }

    /// Center of a node expressed in its system's frame.
    pub fn system_center(&self, id: NodeId) -> Result<SystemPoint, TreeError> {
        let c = self.center(id)?;
        self.to_system_point(id, c)
    }
}
