mod common;

use common::sheets::{config, init_logging, params, recognized, standard_pipeline};
use omr_engine::geometry::{union_all, PixelRect};
use omr_engine::glyph::{Assignment, GlyphId, Shape};
use omr_engine::synthetic::{SheetBuilder, StandardSheet};
use omr_engine::{Pipeline, Scope, StageState, StepId, Task, TaskLog};

/// One staff with bars at both ends and a middle bar broken in three pieces.
fn broken_bar_pipeline() -> (Pipeline, Vec<GlyphId>) {
    let mut b = SheetBuilder::new(1000, 400, 20);
    b.staff(100, 150, 800);
    b.barline(100, 150, 231, 3);
    b.barline(897, 150, 231, 3);
    let pieces = vec![
        b.barline(500, 150, 175, 3),
        b.barline(500, 176, 205, 3),
        b.barline(500, 206, 231, 3),
    ];
    let (input, source) = b.build();
    let mut pipeline = Pipeline::new(input, Box::new(source), params());
    pipeline.run().unwrap();
    (pipeline, pieces)
}

fn measure_count(pipeline: &Pipeline) -> usize {
    let tree = pipeline.sheet().tree();
    tree.systems()
        .into_iter()
        .flat_map(|s| tree.parts(s))
        .map(|p| tree.measures(p).len())
        .sum()
}

#[test]
fn compound_barline_splits_the_measure() {
    init_logging();
    let (mut pipeline, pieces) = broken_bar_pipeline();
    assert_eq!(measure_count(&pipeline), 1);
    for &id in &pieces {
        assert_eq!(pipeline.sheet().nest().get(id).unwrap().shape(), None);
    }
    let boxes: Vec<PixelRect> = pieces
        .iter()
        .map(|&id| pipeline.sheet().nest().get(id).unwrap().bounds())
        .collect();

    let record = pipeline.assign(&pieces, Shape::Barline, true).unwrap();
    assert_eq!(record.seq, 1);
    assert_eq!(record.impact.stage, StepId::Systems);
    assert_eq!(record.impact.scope, Scope::Sheet);
    let compound = record.compound.unwrap();

    let nest = pipeline.sheet().nest();
    let merged = nest.get(compound).unwrap();
    assert_eq!(merged.bounds(), union_all(&boxes).unwrap());
    assert_eq!(merged.bounds(), PixelRect::new(500, 150, 3, 82));
    assert_eq!(merged.members(), pieces.as_slice());
    assert_eq!(merged.shape(), Some(Shape::Barline));
    assert_eq!(merged.assignment(), Assignment::Manual);
    for &id in &pieces {
        let piece = nest.get(id).unwrap();
        assert!(!piece.is_active());
        assert_eq!(piece.compound(), Some(compound));
    }

    assert_eq!(pipeline.state(StepId::Bars), StageState::Done);
    let report = pipeline.run().unwrap();
    assert_eq!(
        report.executed(),
        vec![StepId::Systems, StepId::Measures, StepId::Symbols, StepId::Layout]
    );
    assert_eq!(measure_count(&pipeline), 2);
}

#[test]
fn local_correction_reruns_only_the_part() {
    let (sheet, mut pipeline) = recognized(&config(3, 1));
    let note = sheet.notes[1][0];
    assert_eq!(note.pitch, 0);

    // Prime the geometry caches of every system and of the corrected part.
    let tree = pipeline.sheet().tree();
    let systems = tree.systems();
    let kept: Vec<_> = [systems[0], systems[2]]
        .into_iter()
        .map(|s| (s, tree.bounds(s).unwrap(), tree.revision(s).unwrap()))
        .collect();
    let part = tree.parts(systems[1])[0];
    tree.bounds(part).unwrap();

    let record = pipeline.assign(&[note.head], Shape::Sharp, false).unwrap();
    assert_eq!(record.impact.stage, StepId::Symbols);
    assert_eq!(record.impact.scope, Scope::parts([(2, 1)]));
    assert_eq!(record.compound, None);
    for step in [StepId::Grid, StepId::Systems, StepId::Measures, StepId::Layout] {
        assert_eq!(pipeline.state(step), StageState::Done);
    }

    let report = pipeline.run().unwrap();
    assert_eq!(report.executed(), vec![StepId::Symbols]);
    assert_eq!(report.stages[0].scope, Scope::parts([(2, 1)]));

    let tree = pipeline.sheet().tree();
    for &(system, bounds, revision) in &kept {
        assert_eq!(tree.revision(system).unwrap(), revision);
        assert_eq!(tree.get(system).unwrap().cached_bounds(), Some(bounds));
    }
    assert_eq!(tree.parts(systems[1]), vec![part]);
    let children: Vec<PixelRect> = tree
        .children(part)
        .iter()
        .map(|&c| tree.bounds(c).unwrap())
        .collect();
    assert_eq!(tree.bounds(part).unwrap(), union_all(&children).unwrap());
    let first = tree.measures(part)[0];
    assert_eq!(tree.chords(first).len(), 2);
    let untouched = tree.measures(tree.parts(systems[0])[0])[0];
    assert_eq!(tree.chords(untouched).len(), 3);

    let issues = pipeline.sheet().issues();
    assert_eq!(issues.len(), 1, "{issues:?}");
    assert_eq!(issues[0].text, "stem without head");
    assert_eq!(issues[0].system, Some(2));
    assert_eq!(issues[0].glyph, note.stem);

    // Removing the wrong label gives the stem back nothing: still one issue.
    let record = pipeline.deassign(&[note.head]).unwrap();
    assert_eq!(record.seq, 2);
    assert_eq!(record.impact.scope, Scope::parts([(2, 1)]));
    pipeline.run().unwrap();
    assert_eq!(pipeline.sheet().issues().len(), 1);
}

#[test]
fn deassigned_glyph_stays_unlabelled_across_reruns() {
    let (sheet, mut pipeline) = recognized(&config(1, 1));
    let note = sheet.notes[0][0];
    pipeline.deassign(&[note.head]).unwrap();
    pipeline.invalidate(StepId::Shapes, Scope::Sheet);
    let report = pipeline.run().unwrap();
    assert!(report.executed().contains(&StepId::Shapes));

    let glyph = pipeline.sheet().nest().get(note.head).unwrap();
    assert_eq!(glyph.shape(), None);
    assert_eq!(glyph.assignment(), Assignment::Manual);
    let issues = pipeline.sheet().issues();
    assert!(
        issues
            .iter()
            .any(|i| i.glyph == note.stem && i.text == "stem without head"),
        "{issues:?}"
    );
}

#[test]
fn corrections_between_staves_follow_symbol_attachment() {
    let mut sheet = StandardSheet::generate(&config(1, 2));
    // Small blob in the gap, 24 rows below the upper staff.
    let blob = sheet.builder.block(220, 201, 8, 8);
    let (input, source) = sheet.builder.build();
    let mut pipeline = Pipeline::new(input, Box::new(source), params());
    pipeline.run().unwrap();
    assert_eq!(pipeline.sheet().nest().get(blob).unwrap().shape(), None);

    let tree = pipeline.sheet().tree();
    let system = tree.systems()[0];
    let parts = tree.parts(system);
    let upper = tree.bounds(parts[0]).unwrap();
    let lower = tree.bounds(parts[1]).unwrap();
    // Stems of the lower part come closer to the blob than the upper staff.
    assert!(lower.y - 205 < 205 - upper.last_y(), "{upper:?} {lower:?}");
    assert_eq!(tree.nearest_part(system, 205), Some(parts[0]));

    let record = pipeline.assign(&[blob], Shape::NoteheadBlack, false).unwrap();
    assert_eq!(record.impact.stage, StepId::Symbols);
    assert_eq!(record.impact.scope, Scope::parts([(1, 1)]));
    pipeline.run().unwrap();
    let issues: Vec<_> = pipeline
        .sheet()
        .issues()
        .iter()
        .filter(|i| i.glyph == Some(blob))
        .collect();
    assert!(!issues.is_empty());
    assert!(issues.iter().all(|i| i.part == Some(1)), "{issues:?}");
}

#[test]
fn staff_line_changes_restart_from_the_grid() {
    let (sheet, mut pipeline) = recognized(&config(2, 1));
    let line = sheet.staves[0][0].lines[2];
    let record = pipeline.deassign(&[line]).unwrap();
    assert_eq!(record.impact.stage, StepId::Grid);
    assert_eq!(record.impact.scope, Scope::Sheet);
    assert_eq!(pipeline.state(StepId::Load), StageState::Done);
    for step in &StepId::ALL[1..] {
        assert_eq!(pipeline.pending_scope(*step), Some(&Scope::Sheet), "{step}");
    }

    // A bar line becoming a stem regroups systems.
    let bar = sheet.bars[1][0];
    let record = pipeline.assign(&[bar], Shape::Stem, false).unwrap();
    assert_eq!(record.impact.stage, StepId::Systems);
}

#[test]
fn invalid_commands_are_rejected_untouched() {
    let (sheet, mut pipeline) = recognized(&config(1, 1));
    let head = sheet.notes[0][0].head;
    let stem = sheet.notes[0][0].stem.unwrap();

    let reason = |task: Task, pipeline: &mut Pipeline| pipeline.apply(task).unwrap_err().reason;
    assert_eq!(
        reason(Task::Deassign { glyphs: vec![] }, &mut pipeline),
        "no glyph given"
    );
    assert_eq!(
        reason(
            Task::Assign {
                glyphs: vec![head, head],
                shape: Shape::NoteheadVoid,
                compound: false
            },
            &mut pipeline
        ),
        format!("glyph {head} given twice")
    );
    assert!(reason(Task::Deassign { glyphs: vec![GlyphId(99_999)] }, &mut pipeline)
        .contains("unknown glyph"));
    assert_eq!(
        reason(
            Task::Assign {
                glyphs: vec![head],
                shape: Shape::NoteheadBlack,
                compound: true
            },
            &mut pipeline
        ),
        "a compound needs at least two glyphs"
    );
    assert!(pipeline.log().is_empty());
    assert!(StepId::ALL.iter().all(|s| pipeline.state(*s) == StageState::Done));
    assert_eq!(
        pipeline.sheet().nest().get(head).unwrap().assignment(),
        Assignment::Automatic
    );

    let record = pipeline.assign(&[head, stem], Shape::NoteheadBlack, true).unwrap();
    let compound = record.compound.unwrap();
    let err = pipeline.deassign(&[stem]).unwrap_err();
    assert_eq!(err.reason, format!("glyph {stem} was merged into compound {compound}"));
    assert_eq!(pipeline.log().len(), 1);
}

#[test]
fn replayed_log_reproduces_the_score() {
    let cfg = config(3, 1);
    let (sheet, mut original) = recognized(&cfg);
    let s2 = &sheet.notes[1];
    original.assign(&[s2[0].head], Shape::Sharp, false).unwrap();
    original
        .assign(&[s2[1].head, s2[1].stem.unwrap()], Shape::NoteheadBlack, true)
        .unwrap();
    original.deassign(&[sheet.notes[2][4].head]).unwrap();
    original.assign(&[sheet.bars[0][1]], Shape::ThickBarline, false).unwrap();
    original.run().unwrap();

    let json = original.log().to_json().unwrap();
    assert!(json.contains("\"kind\": \"assign\""));
    let log = TaskLog::from_json(&json).unwrap();
    assert_eq!(&log, original.log());

    let (_, mut replica) = standard_pipeline(&cfg, params());
    replica.run().unwrap();
    assert_eq!(log.replay(&mut replica).unwrap(), 4);
    replica.run().unwrap();

    let a = original.sheet().tree();
    let b = replica.sheet().tree();
    assert_eq!(a.snapshot(a.root()), b.snapshot(b.root()));
    assert_eq!(original.sheet().issues(), replica.sheet().issues());
    assert_eq!(original.log().records(), replica.log().records());
}
