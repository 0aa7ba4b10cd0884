use super::{apply_labels, candidates, map_units, StageContext, StageOutcome};
use crate::geometry::PixelRect;
use crate::glyph::{Glyph, Orientation, Shape};
use crate::pipeline::error::Interrupt;
use crate::pipeline::params::BarParams;
use crate::pipeline::sheet::{Sheet, StaffInfo};
use log::debug;
use std::collections::HashMap;

const OWNED: &[Shape] = &[Shape::Barline, Shape::ThickBarline];

/// Whether a stick with box `stick` runs from the top line to the bottom line
/// of `staff`, with `tolerance` pixels of slack on each edge.
///
/// With `horizontal` set, the stick abscissa must also fall within the staff.
pub(crate) fn spans_staff(stick: &PixelRect, staff: &PixelRect, tolerance: f64, horizontal: bool) -> bool {
    let tol = tolerance.round() as i32;
    let vertical = stick.y <= staff.y + tol && stick.last_y() >= staff.last_y() - tol;
    let x = stick.center().x;
    vertical && (!horizontal || (x >= staff.x - tol && x <= staff.last_x() + tol))
}

fn classify(g: &Glyph, staves: &[StaffInfo], interline: f64, params: &BarParams) -> Option<Shape> {
    if !matches!(g.orientation(), Ok(Orientation::Vertical)) {
        return None;
    }
    let thickness = g.mean_thickness(Orientation::Vertical);
    if thickness > params.max_thickness * interline {
        return None;
    }
    let tolerance = params.span_tolerance * interline;
    let bounds = g.bounds();
    if !staves
        .iter()
        .any(|s| spans_staff(&bounds, &s.area, tolerance, true))
    {
        return None;
    }
    if thickness > params.thick_threshold * interline {
        Some(Shape::ThickBarline)
    } else {
        Some(Shape::Barline)
    }
}

/// Classify vertical sticks spanning at least one whole staff.
pub(super) fn run(sheet: &mut Sheet, ctx: &StageContext<'_>) -> Result<StageOutcome, Interrupt> {
    let params = &ctx.params.bars;
    let interline = sheet.interline;
    let staves = &sheet.staves;

    let pool: Vec<&Glyph> = candidates(&sheet.nest, OWNED).collect();
    let total = pool.len();
    let decisions = map_units(&pool, ctx.params.parallel, |g| {
        classify(g, staves, interline, params).map(|s| (g.id(), s))
    });
    let labels: HashMap<_, _> = decisions.into_iter().flatten().collect();
    let found = labels.len();
    let changed = apply_labels(&mut sheet.nest, OWNED, &labels);
    debug!("BARS candidates={total} bars={found} relabelled={changed}");
    Ok(StageOutcome { systems: 0, items: found })
}
