use super::{labelled, spans_staff, StageContext, StageOutcome};
use crate::geometry::{PixelPoint, PixelRect, SystemFrame};
use crate::pipeline::error::Interrupt;
use crate::pipeline::sheet::{Issue, Sheet, StaffInfo};
use crate::pipeline::StepId;
use crate::score::{NodeKind, PartData, StaffData, SystemData};
use log::{debug, warn};

/// Disjoint sets over staff indices.
struct Groups {
    parent: Vec<usize>,
}

impl Groups {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        let mut root = i;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = i;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the upper staff as representative.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }

    /// Groups of indices, each sorted, ordered by their first index.
    fn collect(mut self, members: impl Iterator<Item = usize>) -> Vec<Vec<usize>> {
        let mut out: Vec<(usize, Vec<usize>)> = Vec::new();
        for i in members {
            let root = self.find(i);
            match out.iter_mut().find(|(r, _)| *r == root) {
                Some((_, group)) => group.push(i),
                None => out.push((root, vec![i])),
            }
        }
        out.sort_by_key(|(_, g)| g[0]);
        out.into_iter().map(|(_, g)| g).collect()
    }
}

/// Link the staves spanned by each stick; `horizontal` also requires the
/// stick to stand within the staff width.
fn link(
    groups: &mut Groups,
    staves: &[StaffInfo],
    sticks: &[PixelRect],
    tolerance: f64,
    horizontal: bool,
) {
    for stick in sticks {
        let spanned: Vec<usize> = staves
            .iter()
            .filter(|s| spans_staff(stick, &s.area, tolerance, horizontal))
            .map(|s| s.index)
            .collect();
        for pair in spanned.windows(2) {
            groups.union(pair[0], pair[1]);
        }
    }
}

/// Row range of each system band, from the `(top, bottom)` rows of its
/// staves.
///
/// Bands follow each other without overlap and hold at least one row. A
/// system reaching down past the top of the next one still gets a band
/// starting right after the previous band; its index is returned among the
/// overlaps.
fn bands(extents: &[(i32, i32)], height: i32) -> (Vec<(i32, i32)>, Vec<usize>) {
    let mut out = Vec::with_capacity(extents.len());
    let mut overlaps = Vec::new();
    let mut top = 0;
    for (i, &(_, bottom)) in extents.iter().enumerate() {
        let last = match extents.get(i + 1) {
            None => height - 1,
            Some(&(below, _)) => {
                if below <= bottom {
                    overlaps.push(i);
                }
                (bottom + below) / 2
            }
        };
        let last = last.max(top);
        out.push((top, last));
        top = last + 1;
    }
    (out, overlaps)
}

/// Group staves into systems (bar lines) and parts (braces, brackets), then
/// rebuild every System, Part and Staff node of the score.
///
/// System bands tile the sheet vertically: each gap between two systems is
/// split at its middle row. Overlapping systems are recorded as issues.
pub(super) fn run(sheet: &mut Sheet, ctx: &StageContext<'_>) -> Result<StageOutcome, Interrupt> {
    let tolerance = ctx.params.bars.span_tolerance * sheet.interline;
    let staves = &sheet.staves;

    let bars: Vec<_> = labelled(&sheet.nest, |s| s.is_barline())
        .map(|g| g.bounds())
        .collect();
    let links: Vec<_> = labelled(&sheet.nest, |s| s.is_part_link())
        .map(|g| g.bounds())
        .collect();

    let mut system_groups = Groups::new(staves.len());
    link(&mut system_groups, staves, &bars, tolerance, true);
    let mut part_groups = Groups::new(staves.len());
    link(&mut part_groups, staves, &links, tolerance, false);
    let systems = system_groups.collect(0..staves.len());

    let (width, height) = sheet.dimension();
    let extents: Vec<(i32, i32)> = systems
        .iter()
        .map(|members| {
            let first = members.first().map_or(0, |&i| staves[i].top());
            let last = members.last().map_or(first, |&i| staves[i].bottom());
            (first, last)
        })
        .collect();
    let (rows, overlaps) = bands(&extents, height);
    let mut issues = Vec::with_capacity(overlaps.len());
    for i in overlaps {
        warn!("SYSTEMS S{} reaches past the top of S{}", i + 1, i + 2);
        issues.push(Issue {
            stage: StepId::Systems,
            system: Some(i + 1),
            part: None,
            context: format!("S{}", i + 1),
            glyph: None,
            text: format!("system overlaps S{}", i + 2),
        });
    }

    let mut plans = Vec::with_capacity(systems.len());
    for (rank, (members, &(top, bottom))) in systems.iter().zip(&rows).enumerate() {
        let frame = SystemFrame::new(PixelPoint::new(0, top), width, bottom - top + 1);
        let mut by_part = Groups::new(staves.len());
        for &m in members {
            let root = part_groups.find(m);
            if members.contains(&root) {
                by_part.union(root, m);
            }
        }
        plans.push((rank + 1, frame, by_part.collect(members.iter().copied())));
    }

    let staff_nodes: Vec<Vec<Vec<StaffData>>> = plans
        .iter()
        .map(|(_, _, parts)| {
            parts
                .iter()
                .map(|part| {
                    part.iter()
                        .map(|&i| StaffData {
                            id: 0,
                            lines: staves[i].lines.clone(),
                            area: staves[i].area,
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        })
        .collect();

    sheet.issues.retain(|i| i.stage != StepId::Systems);
    sheet.issues.extend(issues);

    let tree = &mut sheet.tree;
    let root = tree.root();
    let built = tree.with_deferred_root(|tree| -> Result<usize, Interrupt> {
        tree.clear_children(root)?;
        for ((rank, frame, _), parts) in plans.iter().zip(staff_nodes) {
            let system = tree.add_child(
                root,
                NodeKind::System(SystemData {
                    id: *rank,
                    frame: *frame,
                }),
            )?;
            let mut staff_rank = 0;
            for (p, part_staves) in parts.into_iter().enumerate() {
                let part = tree.add_child(system, NodeKind::Part(PartData { id: p + 1 }))?;
                for mut staff in part_staves {
                    staff_rank += 1;
                    staff.id = staff_rank;
                    tree.add_child(part, NodeKind::Staff(staff))?;
                }
            }
        }
        Ok(plans.len())
    })?;
    debug!(
        "SYSTEMS staves={} bars={} links={} systems={}",
        staves.len(),
        bars.len(),
        links.len(),
        built
    );
    Ok(StageOutcome {
        systems: built,
        items: staves.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::bands;

    #[test]
    fn gaps_split_at_their_middle_row() {
        let (rows, overlaps) = bands(&[(100, 181), (400, 481), (700, 781)], 1000);
        assert_eq!(rows, vec![(0, 290), (291, 590), (591, 999)]);
        assert!(overlaps.is_empty());
        let (rows, _) = bands(&[(100, 181)], 300);
        assert_eq!(rows, vec![(0, 299)]);
    }

    #[test]
    fn overlapping_systems_keep_ordered_nonempty_bands() {
        // The first system holds staves above and below the second one.
        let (rows, overlaps) = bands(&[(100, 581), (300, 381)], 700);
        assert_eq!(overlaps, vec![0]);
        assert_eq!(rows, vec![(0, 440), (441, 699)]);

        let (rows, overlaps) = bands(&[(100, 900), (200, 281), (300, 381)], 400);
        assert_eq!(overlaps, vec![0]);
        for pair in rows.windows(2) {
            assert_eq!(pair[1].0, pair[0].1 + 1);
        }
        assert!(rows.iter().all(|(top, last)| last >= top));
        assert_eq!(rows, vec![(0, 550), (551, 551), (552, 552)]);
    }
}
