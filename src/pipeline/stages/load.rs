use super::{map_units, StageContext, StageOutcome};
use crate::glyph::{GlyphNest, Shape};
use crate::pipeline::error::{Interrupt, StageError};
use crate::pipeline::sheet::Sheet;
use crate::score::ScoreTree;
use log::{debug, warn};

/// Register the source glyphs into a fresh nest and fit their lines.
///
/// Everything downstream is reset: the score tree, the staves and the
/// recorded issues. Degenerate glyphs stay registered (ids follow the
/// source order) but are labelled noise so that no stage considers them.
pub(super) fn run(sheet: &mut Sheet, ctx: &StageContext<'_>) -> Result<StageOutcome, Interrupt> {
    let populations = ctx
        .source
        .glyphs(&sheet.raster)
        .map_err(StageError::Source)?;

    let mut nest = GlyphNest::new();
    let mut invalid = 0usize;
    for pixels in populations {
        if let Err(err) = nest.register(pixels) {
            warn!("LOAD skipping glyph: {err}");
            invalid += 1;
        }
    }

    let glyphs: Vec<_> = nest.iter().collect();
    let degenerate: Vec<_> = map_units(&glyphs, ctx.params.parallel, |g| g.alignment().err())
        .into_iter()
        .flatten()
        .collect();
    for err in &degenerate {
        warn!("LOAD excluding {err}");
        nest.label(err.id, Some(Shape::Noise));
    }

    debug!(
        "LOAD registered={} invalid={} degenerate={}",
        nest.len(),
        invalid,
        degenerate.len()
    );
    let items = nest.len();
    sheet.nest = nest;
    sheet.staves.clear();
    sheet.issues.clear();
    sheet.tree = ScoreTree::new(Sheet::score_data(&sheet.raster, sheet.interline, sheet.skew));
    Ok(StageOutcome { systems: 0, items })
}
