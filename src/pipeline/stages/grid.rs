use super::{apply_labels, candidates, labelled, map_units, StageContext, StageOutcome};
use crate::geometry::union_all;
use crate::glyph::{Glyph, GlyphId, Orientation, Shape};
use crate::pipeline::error::{Interrupt, StageError};
use crate::pipeline::params::GridParams;
use crate::pipeline::sheet::{Sheet, StaffInfo};
use log::{debug, warn};
use std::collections::HashMap;

const OWNED: &[Shape] = &[Shape::StaffLine];

/// Long, thin, horizontal.
fn is_staff_line(g: &Glyph, interline: f64, params: &GridParams) -> bool {
    matches!(g.orientation(), Ok(Orientation::Horizontal))
        && g.length(Orientation::Horizontal) as f64 >= params.min_line_length * interline
        && g.mean_thickness(Orientation::Horizontal) <= params.max_line_thickness * interline
}

#[derive(Clone, Copy, Debug)]
struct LineCandidate {
    id: GlyphId,
    y: i32,
    x0: i32,
    x1: i32,
}

/// Classify staff lines and group them into staves of equally spaced lines.
pub(super) fn run(sheet: &mut Sheet, ctx: &StageContext<'_>) -> Result<StageOutcome, Interrupt> {
    let params = &ctx.params.grid;
    let interline = sheet.interline;

    let pool: Vec<&Glyph> = candidates(&sheet.nest, OWNED).collect();
    let mut lines: Vec<LineCandidate> =
        map_units(&pool, ctx.params.parallel, |g| is_staff_line(g, interline, params))
            .into_iter()
            .zip(&pool)
            .filter(|(keep, _)| *keep)
            .map(|(_, g)| *g)
            .chain(labelled(&sheet.nest, |s| s == Shape::StaffLine).filter(|g| g.is_manual()))
            .filter_map(|g| {
                let y = g.mid_pos(Orientation::Horizontal).ok()?;
                Some(LineCandidate {
                    id: g.id(),
                    y,
                    x0: g.bounds().x,
                    x1: g.bounds().last_x(),
                })
            })
            .collect();
    lines.sort_by_key(|l| (l.y, l.x0));
    let total = lines.len();

    let tolerance = params.spacing_tolerance * interline;
    let per_staff = params.lines_per_staff.max(1);
    let mut chains: Vec<Vec<LineCandidate>> = Vec::new();
    for line in lines {
        let extends = chains.last().and_then(|c| c.last()).map_or(false, |last| {
            let gap = (line.y - last.y) as f64;
            (gap - interline).abs() <= tolerance && line.x0 <= last.x1 && last.x0 <= line.x1
        });
        match chains.last_mut() {
            Some(chain) if extends => chain.push(line),
            _ => chains.push(vec![line]),
        }
    }

    let mut staves: Vec<StaffInfo> = Vec::new();
    let mut labels = HashMap::new();
    for chain in chains {
        let leftover = chain.len() % per_staff;
        if leftover != 0 {
            warn!(
                "GRID {} line(s) near y={} do not complete a staff",
                leftover,
                chain[chain.len() - leftover].y
            );
        }
        for group in chain.chunks_exact(per_staff) {
            let boxes: Vec<_> = group
                .iter()
                .filter_map(|l| sheet.nest.get(l.id).map(|g| g.bounds()))
                .collect();
            let area = union_all(&boxes)?;
            for l in group {
                labels.insert(l.id, Shape::StaffLine);
            }
            staves.push(StaffInfo {
                index: staves.len(),
                lines: group.iter().map(|l| l.y).collect(),
                area,
                glyphs: group.iter().map(|l| l.id).collect(),
            });
        }
    }

    let changed = apply_labels(&mut sheet.nest, OWNED, &labels);
    debug!(
        "GRID candidates={} staves={} relabelled={}",
        total,
        staves.len(),
        changed
    );
    if staves.is_empty() {
        sheet.staves.clear();
        return Err(StageError::NoStaff { candidates: total }.into());
    }
    let items = staves.len();
    sheet.staves = staves;
    Ok(StageOutcome { systems: 0, items })
}
