use super::{map_units, system_views, PartView, StageContext, StageOutcome, SystemView};
use crate::geometry::{union_all, BandPosition, PixelRect};
use crate::glyph::{Glyph, GlyphId, GlyphNest, Shape};
use crate::pipeline::error::Interrupt;
use crate::pipeline::params::SymbolParams;
use crate::pipeline::scope::Scope;
use crate::pipeline::sheet::{Issue, Sheet};
use crate::pipeline::step::StepId;
use crate::score::{ChordData, NodeId, NodeKind, NoteData, SlotData, StaffData, StaffPosition};
use log::{debug, warn};
use std::collections::BTreeSet;

struct ChordPlan {
    x: i32,
    stem: Option<GlyphId>,
    stem_area: Option<PixelRect>,
    notes: Vec<NoteData>,
    area: PixelRect,
}

struct SlotPlan {
    x: i32,
    area: PixelRect,
    /// Indices into the measure's chords.
    chords: Vec<usize>,
}

struct MeasurePlan {
    node: NodeId,
    chords: Vec<ChordPlan>,
    slots: Vec<SlotPlan>,
}

struct IssuePlan {
    measure: Option<NodeId>,
    glyph: Option<GlyphId>,
    text: String,
}

struct PartPlan {
    id: usize,
    node: NodeId,
    measures: Vec<MeasurePlan>,
    issues: Vec<IssuePlan>,
}

struct SystemPlan {
    rank: usize,
    parts: Vec<PartPlan>,
}

/// Glyphs of one part, split by role.
#[derive(Default)]
struct PartGlyphs<'a> {
    heads: Vec<&'a Glyph>,
    stems: Vec<&'a Glyph>,
    ledgers: Vec<&'a Glyph>,
}

struct Planner<'a> {
    interline: f64,
    params: &'a SymbolParams,
}

fn staff_position(pitch: i32) -> StaffPosition {
    if pitch < -4 {
        StaffPosition::AboveStaves
    } else if pitch > 4 {
        StaffPosition::BelowStaves
    } else {
        StaffPosition::WithinStaves
    }
}

impl Planner<'_> {
    fn note(&self, head: &Glyph, part: &PartView, ledgers: &[&Glyph], issues: &mut Vec<IssuePlan>) -> Option<NoteData> {
        let cy = head.center().y;
        let staff: &StaffData = part.staves.iter().min_by(|a, b| {
            let da = (cy as f64 - a.middle()).abs();
            let db = (cy as f64 - b.middle()).abs();
            da.total_cmp(&db)
        })?;
        let pitch = ((cy as f64 - staff.middle()) / (self.interline * 0.5)).round() as i32;
        if pitch.abs() >= self.params.ledger_pitch && !self.has_ledger(head, staff, pitch, ledgers) {
            issues.push(IssuePlan {
                measure: None,
                glyph: Some(head.id()),
                text: format!("note at pitch {pitch} has no ledger"),
            });
        }
        Some(NoteData {
            glyph: head.id(),
            shape: head.shape().unwrap_or(Shape::NoteheadBlack),
            area: head.bounds(),
            staff: staff.id,
            pitch_position: pitch,
            staff_position: staff_position(pitch),
        })
    }

    /// A ledger overlapping the head horizontally, between it and the staff.
    fn has_ledger(&self, head: &Glyph, staff: &StaffData, pitch: i32, ledgers: &[&Glyph]) -> bool {
        let edge = if pitch < 0 { staff.top() } else { staff.bottom() };
        let cy = head.center().y;
        let reach = (self.params.ledger_reach * self.interline).round() as i32;
        let (lo, hi) = (edge.min(cy) - reach, edge.max(cy) + reach);
        let hb = head.bounds();
        ledgers.iter().any(|l| {
            let lb = l.bounds();
            let y = lb.center().y;
            lb.x <= hb.last_x() && hb.x <= lb.last_x() && y >= lo && y <= hi
        })
    }

    fn plan_part(&self, part: &PartView, glyphs: PartGlyphs<'_>) -> PartPlan {
        let mut issues = Vec::new();
        let attach = (self.params.stem_attach * self.interline).round() as i32;

        let mut heads = glyphs.heads;
        heads.sort_by_key(|h| (h.center().x, h.center().y));
        let mut stem_heads: Vec<Vec<&Glyph>> = vec![Vec::new(); glyphs.stems.len()];
        let mut lone: Vec<&Glyph> = Vec::new();
        for head in heads {
            let hx = head.center().x;
            let best = glyphs
                .stems
                .iter()
                .enumerate()
                .filter(|(_, s)| s.bounds().inflate(attach, attach).intersects(&head.bounds()))
                .min_by_key(|(_, s)| (s.center().x - hx).abs())
                .map(|(i, _)| i);
            match best {
                Some(i) => stem_heads[i].push(head),
                None => lone.push(head),
            }
        }

        let mut chords: Vec<ChordPlan> = Vec::new();
        for (stem, attached) in glyphs.stems.iter().zip(stem_heads) {
            if attached.is_empty() {
                issues.push(IssuePlan {
                    measure: None,
                    glyph: Some(stem.id()),
                    text: "stem without head".to_string(),
                });
                continue;
            }
            let mut notes: Vec<NoteData> = attached
                .iter()
                .filter_map(|h| self.note(h, part, &glyphs.ledgers, &mut issues))
                .collect();
            notes.sort_by_key(|n| n.area.y);
            let mut boxes: Vec<PixelRect> = notes.iter().map(|n| n.area).collect();
            boxes.push(stem.bounds());
            if let Ok(area) = union_all(&boxes) {
                chords.push(ChordPlan {
                    x: stem.center().x,
                    stem: Some(stem.id()),
                    stem_area: Some(stem.bounds()),
                    notes,
                    area,
                });
            }
        }
        for head in lone {
            if head.has_shape(Shape::NoteheadBlack) {
                issues.push(IssuePlan {
                    measure: None,
                    glyph: Some(head.id()),
                    text: "black head without stem".to_string(),
                });
            }
            if let Some(note) = self.note(head, part, &glyphs.ledgers, &mut issues) {
                chords.push(ChordPlan {
                    x: head.center().x,
                    stem: None,
                    stem_area: None,
                    area: note.area,
                    notes: vec![note],
                });
            }
        }
        chords.sort_by_key(|c| (c.x, c.area.y));

        let mut measures: Vec<MeasurePlan> = part
            .measures
            .iter()
            .map(|(node, _)| MeasurePlan {
                node: *node,
                chords: Vec::new(),
                slots: Vec::new(),
            })
            .collect();
        for chord in chords {
            let target = part.measures.iter().enumerate().min_by_key(|(_, (_, area))| {
                if chord.x < area.x {
                    area.x - chord.x
                } else if chord.x > area.last_x() {
                    chord.x - area.last_x()
                } else {
                    0
                }
            });
            match target {
                Some((i, _)) => measures[i].chords.push(chord),
                None => issues.push(IssuePlan {
                    measure: None,
                    glyph: chord.stem.or(chord.notes.first().map(|n| n.glyph)),
                    text: "chord outside any measure".to_string(),
                }),
            }
        }

        let margin = self.params.slot_margin * self.interline;
        for measure in &mut measures {
            let mut slots: Vec<SlotPlan> = Vec::new();
            for (i, chord) in measure.chords.iter().enumerate() {
                match slots.last_mut() {
                    Some(slot) if ((chord.x - slot.x) as f64) <= margin => {
                        slot.area = slot.area.union(&chord.area);
                        slot.chords.push(i);
                    }
                    _ => slots.push(SlotPlan {
                        x: chord.x,
                        area: chord.area,
                        chords: vec![i],
                    }),
                }
            }
            measure.slots = slots;
        }
        for issue in &mut issues {
            let Some(glyph) = issue.glyph else { continue };
            issue.measure = measures
                .iter()
                .find(|m| {
                    m.chords.iter().any(|c| {
                        c.stem == Some(glyph) || c.notes.iter().any(|n| n.glyph == glyph)
                    })
                })
                .map(|m| m.node);
        }

        PartPlan {
            id: part.id,
            node: part.node,
            measures,
            issues,
        }
    }

    fn plan_system(&self, view: &SystemView, nest: &GlyphNest, scope: &Scope) -> SystemPlan {
        let mut per_part: Vec<PartGlyphs<'_>> = view.parts.iter().map(|_| PartGlyphs::default()).collect();
        for g in nest.actives() {
            let Some(shape) = g.shape() else { continue };
            let center = g.center();
            if view.frame.locate_pixel(center) != BandPosition::Within {
                continue;
            }
            let Some(index) = view.nearest_part(center.y) else {
                continue;
            };
            let bucket = &mut per_part[index];
            match shape {
                s if s.is_head() => bucket.heads.push(g),
                Shape::Stem => bucket.stems.push(g),
                Shape::Ledger => bucket.ledgers.push(g),
                _ => {}
            }
        }
        let parts = view
            .parts
            .iter()
            .zip(per_part)
            .filter(|(p, _)| scope.covers_part(view.rank, p.id))
            .map(|(p, glyphs)| self.plan_part(p, glyphs))
            .collect();
        SystemPlan {
            rank: view.rank,
            parts,
        }
    }
}

/// Rebuild chords, notes and slots of the parts in scope.
pub(super) fn run(sheet: &mut Sheet, ctx: &StageContext<'_>) -> Result<StageOutcome, Interrupt> {
    let scope = ctx.scope;
    let views = system_views(&sheet.tree, scope);
    let nest = &sheet.nest;
    let planner = Planner {
        interline: sheet.interline,
        params: &ctx.params.symbols,
    };
    let plans = map_units(&views, ctx.params.parallel, |view| planner.plan_system(view, nest, scope));

    if *scope == Scope::Sheet {
        sheet.issues.retain(|i| i.stage != StepId::Symbols);
    }
    let tree = &mut sheet.tree;
    let issues = &mut sheet.issues;
    let cancel = ctx.cancel;
    let (systems, chords) = tree.with_deferred_root(|tree| -> Result<(usize, usize), Interrupt> {
        let mut systems = 0;
        let mut chords = 0;
        for (k, plan) in plans.into_iter().enumerate() {
            if cancel.is_cancelled() {
                let remaining: BTreeSet<usize> = views[k..].iter().map(|v| v.rank).collect();
                debug!("SYMBOLS cancelled before S{}", plan.rank);
                return Err(Interrupt::Cancelled(scope.restrict(&remaining)));
            }
            for part in plan.parts {
                issues.retain(|i| {
                    !(i.stage == StepId::Symbols && i.system == Some(plan.rank) && i.part == Some(part.id))
                });
                for measure in part.measures {
                    tree.clear_children(measure.node)?;
                    let mut ids = Vec::with_capacity(measure.chords.len());
                    for chord in measure.chords {
                        let id = tree.add_child(
                            measure.node,
                            NodeKind::Chord(ChordData {
                                stem: chord.stem,
                                stem_area: chord.stem_area,
                            }),
                        )?;
                        for note in chord.notes {
                            tree.add_child(id, NodeKind::Note(note))?;
                        }
                        ids.push(id);
                    }
                    chords += ids.len();
                    for slot in measure.slots {
                        tree.add_child(
                            measure.node,
                            NodeKind::Slot(SlotData {
                                x: slot.x,
                                area: slot.area,
                                chords: slot.chords.iter().map(|&i| ids[i]).collect(),
                            }),
                        )?;
                    }
                }
                for issue in part.issues {
                    let context = tree.context_string(issue.measure.unwrap_or(part.node));
                    warn!("SYMBOLS {context}: {}", issue.text);
                    issues.push(Issue {
                        stage: StepId::Symbols,
                        system: Some(plan.rank),
                        part: Some(part.id),
                        context,
                        glyph: issue.glyph,
                        text: issue.text,
                    });
                }
            }
            systems += 1;
        }
        Ok((systems, chords))
    })?;
    debug!("SYMBOLS systems={systems} chords={chords}");
    Ok(StageOutcome {
        systems,
        items: chords,
    })
}
