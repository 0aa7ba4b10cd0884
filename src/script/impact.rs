use super::task::{CommandRejected, Task};
use crate::geometry::PixelPoint;
use crate::glyph::{GlyphId, NestError, Shape};
use crate::pipeline::{Scope, Sheet, StepId};
use crate::score::ScoreTree;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Stage to re-run after a task, and over which scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impact {
    pub stage: StepId,
    pub scope: Scope,
}

/// Check the task against the nest without touching anything.
fn validate(task: &Task, sheet: &Sheet) -> Result<(), CommandRejected> {
    let glyphs = task.glyphs();
    if glyphs.is_empty() {
        return Err(CommandRejected::new("no glyph given"));
    }
    let mut seen = HashSet::with_capacity(glyphs.len());
    for &id in glyphs {
        if !seen.insert(id) {
            return Err(CommandRejected::new(format!("glyph {id} given twice")));
        }
        sheet.nest.active(id).map_err(|e| CommandRejected::new(e.to_string()))?;
    }
    if let Task::Assign { compound: true, .. } = task {
        if glyphs.len() < 2 {
            return Err(CommandRejected::new("a compound needs at least two glyphs"));
        }
    }
    Ok(())
}

/// Ranks of the system located at `p` and of its part nearest to `p`.
fn locate_part(tree: &ScoreTree, p: PixelPoint) -> (Option<usize>, Option<usize>) {
    let Some(system) = tree.locate_system(p) else {
        return (None, None);
    };
    let rank = tree.system(system).map(|s| s.id);
    let part = tree
        .nearest_part(system, p.y)
        .and_then(|part| tree.part(part).map(|d| d.id));
    (rank, part)
}

/// Scope of a non-structural change: the parts holding the glyphs, or their
/// systems when a part cannot be told, or the whole sheet.
fn local_scope(tree: &ScoreTree, points: &[PixelPoint]) -> Scope {
    let mut parts = BTreeSet::new();
    let mut systems = BTreeSet::new();
    let mut partial = false;
    for &p in points {
        match locate_part(tree, p) {
            (Some(s), Some(part)) => {
                parts.insert((s, part));
                systems.insert(s);
            }
            (Some(s), None) => {
                partial = true;
                systems.insert(s);
            }
            (None, _) => return Scope::Sheet,
        }
    }
    if partial {
        Scope::Systems(systems)
    } else {
        Scope::Parts(parts)
    }
}

/// Impact of a classification change from `before` to `after`.
///
/// Staff lines feed the grid; other structural shapes regroup systems.
/// Anything else only needs the symbols of the parts it lies in.
pub(crate) fn impact_of(
    tree: &ScoreTree,
    before: &[Option<Shape>],
    after: Option<Shape>,
    points: &[PixelPoint],
) -> Impact {
    let shapes = || before.iter().copied().chain(std::iter::once(after)).flatten();
    if shapes().any(|s| s == Shape::StaffLine) {
        return Impact {
            stage: StepId::Grid,
            scope: Scope::Sheet,
        };
    }
    if shapes().any(Shape::is_structural) {
        return Impact {
            stage: StepId::Systems,
            scope: Scope::Sheet,
        };
    }
    Impact {
        stage: StepId::Symbols,
        scope: local_scope(tree, points),
    }
}

/// Validate and perform a task on the sheet.
///
/// Returns the impact to invalidate and the compound glyph, if one was made.
pub(crate) fn perform(task: &Task, sheet: &mut Sheet) -> Result<(Impact, Option<GlyphId>), CommandRejected> {
    validate(task, sheet)?;
    let glyphs = task.glyphs();
    let before: Vec<Option<Shape>> = glyphs
        .iter()
        .map(|&id| sheet.nest.get(id).and_then(|g| g.shape()))
        .collect();

    let rejected = |e: NestError| CommandRejected::new(e.to_string());
    let (targets, compound) = match task {
        Task::Assign {
            compound: true,
            ..
        } => {
            let id = sheet.nest.merge(glyphs).map_err(rejected)?;
            (vec![id], Some(id))
        }
        _ => (glyphs.to_vec(), None),
    };
    for &id in &targets {
        sheet.nest.assign(id, task.shape()).map_err(rejected)?;
    }

    let points: Vec<PixelPoint> = targets
        .iter()
        .filter_map(|&id| sheet.nest.get(id).map(|g| g.center()))
        .collect();
    let impact = impact_of(&sheet.tree, &before, task.shape(), &points);
    debug!(
        "task on {} glyph(s) -> {} over {}",
        glyphs.len(),
        impact.stage,
        impact.scope
    );
    Ok((impact, compound))
}
