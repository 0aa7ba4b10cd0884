//! Stage implementations and the helpers they share.
//!
//! Stages
//! - `load`: register glyphs from the source, fit their lines.
//! - `grid`: staff lines and staves.
//! - `bars`: thin and thick bar lines.
//! - `shapes`: stems, ledgers and note heads.
//! - `systems`: systems, parts and staves in the score tree.
//! - `measures`: measures between bar lines, per system.
//! - `symbols`: chords, notes and slots, per part.
//! - LAYOUT delegates to [`crate::score::apply_layout`].
//!
//! Classification stages own a set of labels. They only (re)label glyphs
//! that are automatic and either unlabelled or carrying one of their own
//! labels, so re-running a stage converges to the same labels and manual
//! assignments are never overridden.
//!
//! Tree-building stages plan from read-only views (one unit per system,
//! optionally on the rayon pool) and then commit the plans one system at a
//! time, checking for cancellation between systems.

mod bars;
mod grid;
mod load;
mod measures;
mod shapes;
mod symbols;
mod systems;

use super::error::Interrupt;
use super::params::EngineParams;
use super::scope::Scope;
use super::sheet::{GlyphSource, Sheet};
use super::step::{ScopePolicy, StepId};
use super::CancelToken;
use crate::geometry::{nearest_by_ordinate, PixelRect, SystemFrame};
use crate::glyph::{Glyph, GlyphId, GlyphNest, Shape};
use crate::score::{apply_layout, NodeId, ScoreTree, StaffData};
use log::debug;
use std::collections::{BTreeSet, HashMap};

pub(crate) use bars::spans_staff;

pub(crate) struct StageContext<'a> {
    pub params: &'a EngineParams,
    pub scope: &'a Scope,
    pub cancel: &'a CancelToken,
    pub source: &'a dyn GlyphSource,
}

/// What a stage produced, for the run report.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StageOutcome {
    pub systems: usize,
    pub items: usize,
}

pub(crate) fn run(step: StepId, sheet: &mut Sheet, ctx: &StageContext<'_>) -> Result<StageOutcome, Interrupt> {
    if step.scope_policy() == ScopePolicy::Sheet && ctx.cancel.is_cancelled() {
        return Err(Interrupt::Cancelled(Scope::Sheet));
    }
    match step {
        StepId::Load => load::run(sheet, ctx),
        StepId::Grid => grid::run(sheet, ctx),
        StepId::Bars => bars::run(sheet, ctx),
        StepId::Shapes => shapes::run(sheet, ctx),
        StepId::Systems => systems::run(sheet, ctx),
        StepId::Measures => measures::run(sheet, ctx),
        StepId::Symbols => symbols::run(sheet, ctx),
        StepId::Layout => {
            let report = apply_layout(&mut sheet.tree, &ctx.params.layout)?;
            Ok(StageOutcome {
                systems: report.systems,
                items: report.measures,
            })
        }
    }
}

/// Map over independent units, on the rayon pool when enabled.
pub(crate) fn map_units<T, R, F>(items: &[T], parallel: bool, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        if parallel && items.len() > 1 {
            use rayon::prelude::*;
            return items.par_iter().map(f).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    items.iter().map(f).collect()
}

/// Glyphs a stage owning `owned` may classify.
pub(crate) fn candidates<'a>(
    nest: &'a GlyphNest,
    owned: &'a [Shape],
) -> impl Iterator<Item = &'a Glyph> + 'a {
    nest.actives()
        .filter(move |g| !g.is_manual() && g.shape().map_or(true, |s| owned.contains(&s)))
}

/// Apply a stage's decisions; candidates without a decision lose the
/// stage's label. Returns how many labels changed.
pub(crate) fn apply_labels(
    nest: &mut GlyphNest,
    owned: &[Shape],
    labels: &HashMap<GlyphId, Shape>,
) -> usize {
    let ids: Vec<GlyphId> = candidates(nest, owned).map(Glyph::id).collect();
    ids.into_iter()
        .filter(|id| nest.label(*id, labels.get(id).copied()))
        .count()
}

/// Active glyphs carrying `pred` labels, manual or automatic.
pub(crate) fn labelled<'a>(
    nest: &'a GlyphNest,
    pred: impl Fn(Shape) -> bool + 'a,
) -> impl Iterator<Item = &'a Glyph> + 'a {
    nest.actives().filter(move |g| g.shape().map_or(false, &pred))
}

/// Read-only copy of a part, handed to planning workers.
#[derive(Clone, Debug)]
pub(crate) struct PartView {
    pub id: usize,
    pub node: NodeId,
    pub staves: Vec<StaffData>,
    pub measures: Vec<(NodeId, PixelRect)>,
    /// Union of the staff boxes.
    pub area: PixelRect,
}

/// Read-only copy of a system, handed to planning workers.
#[derive(Clone, Debug)]
pub(crate) struct SystemView {
    pub rank: usize,
    pub node: NodeId,
    pub frame: SystemFrame,
    pub parts: Vec<PartView>,
}

impl SystemView {
    /// Index of the part whose staves are vertically closest to `y`.
    pub fn nearest_part(&self, y: i32) -> Option<usize> {
        nearest_by_ordinate(self.parts.iter().map(|p| &p.area), y)
    }
}

/// Views of the systems named by `scope`, in score order.
pub(crate) fn system_views(tree: &ScoreTree, scope: &Scope) -> Vec<SystemView> {
    let mut views = Vec::new();
    for sys in tree.systems() {
        let Some(data) = tree.system(sys) else { continue };
        if !scope.covers_system(data.id) {
            continue;
        }
        let mut parts = Vec::new();
        for part in tree.parts(sys) {
            let Some(pdata) = tree.part(part) else { continue };
            let staves: Vec<StaffData> = tree
                .staves(part)
                .into_iter()
                .filter_map(|s| tree.staff(s).cloned())
                .collect();
            let Some(area) = tree.staff_area(part) else {
                continue;
            };
            let measures = tree
                .measures(part)
                .into_iter()
                .filter_map(|m| tree.measure(m).map(|d| (m, d.area)))
                .collect();
            parts.push(PartView {
                id: pdata.id,
                node: part,
                staves,
                measures,
                area,
            });
        }
        views.push(SystemView {
            rank: data.id,
            node: sys,
            frame: data.frame,
            parts,
        });
    }
    if let Some(ranks) = scope.system_ranks() {
        let found: BTreeSet<usize> = views.iter().map(|v| v.rank).collect();
        for missing in ranks.difference(&found) {
            debug!("scope names unknown system S{missing}");
        }
    }
    views
}
