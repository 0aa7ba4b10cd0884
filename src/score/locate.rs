//! Point to system lookup.
//!
//! Systems tile the sheet vertically in pixel space and horizontally in
//! display space. A point belongs to the first system it does not lie after:
//! inside a band that system, in the gap before a band the following system,
//! past the last band the last system.
//!
//! Consecutive lookups tend to hit the same or an adjacent system, so the
//! most recent answer is remembered. The cache is an optimisation only and must
//! agree with a plain scan for every point.

use super::node::NodeId;
use super::tree::ScoreTree;
use crate::geometry::{BandPosition, DisplayPoint, PixelPoint, SystemFrame};

impl ScoreTree {
    /// Enable or disable the recent-system cache (enabled by default).
    pub fn set_locate_cache(&mut self, enabled: bool) {
        self.locate_cache = enabled;
        self.recent_system.set(None);
    }

    /// System a pixel-space point belongs to, by ordinate.
    pub fn locate_system(&self, p: PixelPoint) -> Option<NodeId> {
        self.locate_with(|f| f.locate_pixel(p))
    }

    /// System a display-space point belongs to, by abscissa.
    pub fn locate_system_display(&self, p: DisplayPoint) -> Option<NodeId> {
        self.locate_with(|f| f.locate_display(p))
    }

    /// Uncached lookup, pixel space.
    pub fn scan_system(&self, p: PixelPoint) -> Option<NodeId> {
        self.scan_with(&|f| f.locate_pixel(p)).map(|(_, id)| id)
    }

    /// Uncached lookup, display space.
    pub fn scan_system_display(&self, p: DisplayPoint) -> Option<NodeId> {
        self.scan_with(&|f| f.locate_display(p)).map(|(_, id)| id)
    }

    fn frame_of(&self, id: NodeId) -> Option<SystemFrame> {
        self.system(id).map(|s| s.frame)
    }

    fn scan_with(&self, position: &dyn Fn(&SystemFrame) -> BandPosition) -> Option<(usize, NodeId)> {
        let systems = self.children(self.root());
        let last = systems.len().checked_sub(1)?;
        systems
            .iter()
            .enumerate()
            .find(|(_, &id)| {
                self.frame_of(id)
                    .map(|f| position(&f) != BandPosition::Below)
                    .unwrap_or(false)
            })
            .map(|(i, &id)| (i, id))
            .or(Some((last, systems[last])))
    }

    fn locate_with(&self, position: impl Fn(&SystemFrame) -> BandPosition) -> Option<NodeId> {
        if !self.locate_cache {
            return self.scan_with(&position).map(|(_, id)| id);
        }
        if let Some(hit) = self.cached_hit(&position) {
            return Some(hit);
        }
        let found = self.scan_with(&position);
        self.recent_system.set(found.map(|(_, id)| id));
        found.map(|(_, id)| id)
    }

    /// Answer from the recent system or one of its neighbours, when that is enough.
    fn cached_hit(&self, position: &impl Fn(&SystemFrame) -> BandPosition) -> Option<NodeId> {
        let recent = self.recent_system.get()?;
        let frame = self.frame_of(recent)?;
        let systems = self.children(self.root());
        let index = systems.iter().position(|&s| s == recent)?;
        let hit = match position(&frame) {
            BandPosition::Within => return Some(recent),
            BandPosition::Above if index == 0 => return Some(recent),
            BandPosition::Above => {
                let previous = systems[index - 1];
                match position(&self.frame_of(previous)?) {
                    BandPosition::Above => return None,
                    BandPosition::Within => previous,
                    // Gap between the two bands.
                    BandPosition::Below => return Some(recent),
                }
            }
            BandPosition::Below => match systems.get(index + 1) {
                None => return Some(recent),
                Some(&next) => {
                    if position(&self.frame_of(next)?) == BandPosition::Below {
                        return None;
                    }
                    next
                }
            },
        };
        self.recent_system.set(Some(hit));
        Some(hit)
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::{DisplayPoint, PixelPoint, SystemFrame};
    use crate::score::{NodeKind, ScoreData, ScoreTree, SystemData};

    /// Bands [0,249], [251,499] (gap at 250), [501,749].
    fn banded() -> ScoreTree {
        let mut tree = ScoreTree::new(ScoreData::default());
        for (rank, (y, h)) in [(0, 250), (251, 249), (501, 249)].into_iter().enumerate() {
            let mut frame = SystemFrame::new(PixelPoint::new(0, y), 1000, h);
            frame.display_origin = DisplayPoint::new(rank as i32 * 1100, 0);
            let root = tree.root();
            tree.add_child(root, NodeKind::System(SystemData { id: rank + 1, frame }))
                .unwrap();
        }
        tree
    }

    #[test]
    fn gaps_and_ends_resolve_to_neighbours() {
        let tree = banded();
        let s = tree.systems();
        assert_eq!(tree.locate_system(PixelPoint::new(5, -20)), Some(s[0]));
        assert_eq!(tree.locate_system(PixelPoint::new(5, 249)), Some(s[0]));
        assert_eq!(tree.locate_system(PixelPoint::new(5, 250)), Some(s[1]));
        assert_eq!(tree.locate_system(PixelPoint::new(5, 500)), Some(s[2]));
        assert_eq!(tree.locate_system(PixelPoint::new(5, 750)), Some(s[2]));
        assert_eq!(tree.locate_system(PixelPoint::new(5, 120)), Some(s[0]));
    }

    #[test]
    fn display_lookup_uses_abscissa() {
        let tree = banded();
        let s = tree.systems();
        assert_eq!(tree.locate_system_display(DisplayPoint::new(999, 5)), Some(s[0]));
        assert_eq!(tree.locate_system_display(DisplayPoint::new(1050, 5)), Some(s[1]));
        assert_eq!(tree.locate_system_display(DisplayPoint::new(5000, 5)), Some(s[2]));
    }

    #[test]
    fn cache_agrees_with_scan_in_gaps_after_recent() {
        let tree = banded();
        let s = tree.systems();
        assert_eq!(tree.locate_system(PixelPoint::new(0, 10)), Some(s[0]));
        // Recent is the first system; the gap after it belongs to the second.
        assert_eq!(tree.locate_system(PixelPoint::new(0, 250)), Some(s[1]));
        assert_eq!(tree.scan_system(PixelPoint::new(0, 250)), Some(s[1]));
        // Jump back above the recent system.
        assert_eq!(tree.locate_system(PixelPoint::new(0, 3)), Some(s[0]));
    }

    #[test]
    fn upward_walk_moves_the_cache_to_the_previous_system() {
        let tree = banded();
        let s = tree.systems();
        assert_eq!(tree.locate_system(PixelPoint::new(0, 600)), Some(s[2]));
        assert_eq!(tree.locate_system(PixelPoint::new(0, 400)), Some(s[1]));
        assert_eq!(tree.recent_system.get(), Some(s[1]));
        // Gap row above the recent system stays with it.
        assert_eq!(tree.locate_system(PixelPoint::new(0, 250)), Some(s[1]));
        assert_eq!(tree.recent_system.get(), Some(s[1]));
        assert_eq!(tree.locate_system(PixelPoint::new(0, 100)), Some(s[0]));
        assert_eq!(tree.recent_system.get(), Some(s[0]));
        // Two systems up falls back to the scan.
        assert_eq!(tree.locate_system(PixelPoint::new(0, 700)), Some(s[2]));
        assert_eq!(tree.locate_system(PixelPoint::new(0, 10)), Some(s[0]));
        assert_eq!(tree.recent_system.get(), Some(s[0]));
    }

    #[test]
    fn empty_tree_locates_nothing() {
        let tree = ScoreTree::new(ScoreData::default());
        assert_eq!(tree.locate_system(PixelPoint::new(0, 0)), None);
    }
}
