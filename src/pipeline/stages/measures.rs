use super::{labelled, map_units, spans_staff, system_views, PartView, StageContext, StageOutcome, SystemView};
use crate::geometry::PixelRect;
use crate::glyph::{GlyphId, GlyphNest};
use crate::pipeline::error::Interrupt;
use crate::pipeline::params::BarParams;
use crate::pipeline::sheet::Sheet;
use crate::score::{MeasureData, NodeId, NodeKind};
use log::debug;
use std::collections::BTreeSet;

/// Measure boundary: an abscissa and the bar line drawn there, if any.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Boundary {
    x: i32,
    bar: Option<GlyphId>,
}

struct PartMeasures {
    part: NodeId,
    measures: Vec<MeasureData>,
}

/// Boundaries of one part: its bar lines, merged when closer than
/// `merge_distance`, plus the staff edges when no bar stands there.
fn boundaries(part: &PartView, nest: &GlyphNest, interline: f64, params: &BarParams) -> Vec<Boundary> {
    let tolerance = params.span_tolerance * interline;
    let mut bars: Vec<Boundary> = labelled(nest, |s| s.is_barline())
        .filter(|g| {
            part.staves
                .iter()
                .any(|s| spans_staff(&g.bounds(), &s.area, tolerance, true))
        })
        .map(|g| Boundary {
            x: g.center().x,
            bar: Some(g.id()),
        })
        .collect();
    bars.sort_by_key(|b| b.x);

    let merge = params.merge_distance * interline;
    let mut merged: Vec<Boundary> = Vec::with_capacity(bars.len());
    for bar in bars {
        match merged.last_mut() {
            Some(last) if ((bar.x - last.x) as f64) < merge => *last = bar,
            _ => merged.push(bar),
        }
    }

    let (left, right) = (part.area.x, part.area.last_x());
    let near = |a: i32, b: i32| ((a - b).abs() as f64) <= merge;
    let mut out = Vec::with_capacity(merged.len() + 2);
    if merged.first().map_or(true, |b| !near(b.x, left)) {
        out.push(Boundary { x: left, bar: None });
    }
    out.extend(merged);
    if out.last().map_or(true, |b| !near(b.x, right)) {
        out.push(Boundary { x: right, bar: None });
    }
    out
}

fn plan_system(view: &SystemView, nest: &GlyphNest, interline: f64, params: &BarParams) -> Vec<PartMeasures> {
    view.parts
        .iter()
        .map(|part| {
            let edges = boundaries(part, nest, interline, params);
            let measures = edges
                .windows(2)
                .filter(|w| w[1].x > w[0].x)
                .map(|w| MeasureData {
                    number: 0,
                    area: PixelRect::new(
                        w[0].x,
                        part.area.y,
                        w[1].x - w[0].x + 1,
                        part.area.height,
                    ),
                    left_bar: w[0].bar,
                    right_bar: w[1].bar,
                })
                .collect();
            PartMeasures {
                part: part.node,
                measures,
            }
        })
        .collect()
}

/// Rebuild the measures of every part of the systems in scope.
pub(super) fn run(sheet: &mut Sheet, ctx: &StageContext<'_>) -> Result<StageOutcome, Interrupt> {
    let views = system_views(&sheet.tree, ctx.scope);
    let nest = &sheet.nest;
    let interline = sheet.interline;
    let params = &ctx.params.bars;
    let plans = map_units(&views, ctx.params.parallel, |view| {
        plan_system(view, nest, interline, params)
    });

    let tree = &mut sheet.tree;
    let cancel = ctx.cancel;
    let scope = ctx.scope;
    let (systems, measures) = tree.with_deferred_root(|tree| -> Result<(usize, usize), Interrupt> {
        let mut systems = 0;
        let mut measures = 0;
        for (k, (view, plan)) in views.iter().zip(plans).enumerate() {
            if cancel.is_cancelled() {
                let remaining: BTreeSet<usize> = views[k..].iter().map(|v| v.rank).collect();
                debug!("MEASURES cancelled before S{}", view.rank);
                return Err(Interrupt::Cancelled(scope.restrict(&remaining)));
            }
            for part in plan {
                for old in tree.measures(part.part) {
                    tree.remove_subtree(old)?;
                }
                for data in part.measures {
                    tree.add_child(part.part, NodeKind::Measure(data))?;
                    measures += 1;
                }
            }
            systems += 1;
        }
        Ok((systems, measures))
    })?;
    debug!("MEASURES systems={systems} measures={measures}");
    Ok(StageOutcome {
        systems,
        items: measures,
    })
}
