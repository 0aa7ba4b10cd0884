use super::{apply_labels, candidates, map_units, spans_staff, StageContext, StageOutcome};
use crate::glyph::{Glyph, GlyphNest, Orientation, Shape};
use crate::image::BinaryImage;
use crate::pipeline::error::Interrupt;
use crate::pipeline::params::EngineParams;
use crate::pipeline::sheet::{Sheet, StaffInfo};
use log::{debug, trace};
use std::collections::HashMap;

const OWNED: &[Shape] = &[
    Shape::Stem,
    Shape::Ledger,
    Shape::NoteheadBlack,
    Shape::NoteheadVoid,
];

struct Classifier<'a> {
    staves: &'a [StaffInfo],
    /// Sheet raster with the staff lines erased.
    no_staff: &'a BinaryImage,
    interline: f64,
    params: &'a EngineParams,
}

impl Classifier<'_> {
    fn classify(&self, g: &Glyph) -> Option<Shape> {
        self.head(g).or_else(|| match g.orientation().ok()? {
            Orientation::Vertical => self.stem(g),
            Orientation::Horizontal => self.ledger(g),
        })
    }

    /// Blob about one interline in both directions; fill decides the kind.
    fn head(&self, g: &Glyph) -> Option<Shape> {
        let p = &self.params.shapes;
        let (lo, hi) = (p.min_head_size * self.interline, p.max_head_size * self.interline);
        let b = g.bounds();
        let fits = |v: i32| (v as f64) >= lo && (v as f64) <= hi;
        if !fits(b.width) || !fits(b.height) {
            return None;
        }
        let fill = g.weight() as f64 / b.area() as f64;
        if fill >= p.black_fill {
            Some(Shape::NoteheadBlack)
        } else if fill >= p.void_fill {
            Some(Shape::NoteheadVoid)
        } else {
            None
        }
    }

    /// Thin vertical stick that does not span a staff.
    fn stem(&self, g: &Glyph) -> Option<Shape> {
        let p = &self.params.shapes;
        let length = g.length(Orientation::Vertical) as f64;
        if length < p.min_stem_length * self.interline || length > p.max_stem_length * self.interline {
            return None;
        }
        let max_thickness = p.max_stem_thickness * self.interline;
        let mid = (g.bounds().y + g.bounds().last_y()) as f64 * 0.5;
        let window = self.params.alignment.window_width;
        let thickness = g.mean_thickness(Orientation::Vertical);
        if thickness > max_thickness
            || g.thickness_at(mid, Orientation::Vertical, window) > max_thickness
        {
            return None;
        }
        let tolerance = self.params.bars.span_tolerance * self.interline;
        if self
            .staves
            .iter()
            .any(|s| spans_staff(&g.bounds(), &s.area, tolerance, true))
        {
            return None;
        }
        if !self.straight(g) {
            return None;
        }
        let (top, bottom) = g.stuck_counts(self.no_staff).ok()?;
        let fused = |stuck: usize| stuck as f64 >= p.fused_end_ratio * thickness;
        if fused(top) && fused(bottom) {
            trace!("SHAPES {} fused at both ends, top={} bottom={}", g.id(), top, bottom);
            return None;
        }
        Some(Shape::Stem)
    }

    fn straight(&self, g: &Glyph) -> bool {
        let limit = self.params.shapes.max_line_distance * self.interline;
        match g.mean_distance() {
            Ok(d) if d <= limit => true,
            Ok(d) => {
                trace!("SHAPES {} too crooked, distance={:.2}", g.id(), d);
                false
            }
            Err(_) => false,
        }
    }

    /// Short, thin, horizontal.
    fn ledger(&self, g: &Glyph) -> Option<Shape> {
        let p = &self.params.shapes;
        let length = g.length(Orientation::Horizontal) as f64;
        let fits = length >= p.min_ledger_length * self.interline
            && length <= p.max_ledger_length * self.interline
            && g.mean_thickness(Orientation::Horizontal) <= p.max_ledger_thickness * self.interline;
        (fits && self.straight(g)).then_some(Shape::Ledger)
    }
}

/// Copy of `raster` without the staff line pixels, so that sticks crossing
/// or ending on a line are not taken for fused ones.
fn erase_staff_lines(raster: &BinaryImage, nest: &GlyphNest, staves: &[StaffInfo]) -> BinaryImage {
    let mut erased = raster.clone();
    for id in staves.iter().flat_map(|s| s.glyphs.iter()) {
        if let Some(line) = nest.get(*id) {
            for p in line.pixels() {
                erased.set(p.x, p.y, false);
            }
        }
    }
    erased
}

/// Classify stems, ledgers and note heads among the unlabelled glyphs.
pub(super) fn run(sheet: &mut Sheet, ctx: &StageContext<'_>) -> Result<StageOutcome, Interrupt> {
    let no_staff = erase_staff_lines(&sheet.raster, &sheet.nest, &sheet.staves);
    let classifier = Classifier {
        staves: &sheet.staves,
        no_staff: &no_staff,
        interline: sheet.interline,
        params: ctx.params,
    };
    let pool: Vec<&Glyph> = candidates(&sheet.nest, OWNED).collect();
    let total = pool.len();
    let labels: HashMap<_, _> = map_units(&pool, ctx.params.parallel, |g| {
        classifier.classify(g).map(|s| (g.id(), s))
    })
    .into_iter()
    .flatten()
    .collect();

    let mut counts: HashMap<Shape, usize> = HashMap::new();
    for shape in labels.values() {
        *counts.entry(*shape).or_default() += 1;
    }
    let found = labels.len();
    let changed = apply_labels(&mut sheet.nest, OWNED, &labels);
    debug!(
        "SHAPES candidates={} stems={} ledgers={} heads={} relabelled={}",
        total,
        counts.get(&Shape::Stem).copied().unwrap_or(0),
        counts.get(&Shape::Ledger).copied().unwrap_or(0),
        counts.get(&Shape::NoteheadBlack).copied().unwrap_or(0)
            + counts.get(&Shape::NoteheadVoid).copied().unwrap_or(0),
        changed
    );
    Ok(StageOutcome { systems: 0, items: found })
}
