mod common;

use common::sheets::{config, init_logging, params, recognized, standard_pipeline};
use omr_engine::geometry::union_all;
use omr_engine::glyph::Shape;
use omr_engine::pipeline::{PipelineError, StageError, StageFailure, VecGlyphSource};
use omr_engine::score::StaffPosition;
use omr_engine::synthetic::SheetBuilder;
use omr_engine::{process_sheets, EngineParams, Pipeline, Scope, StageState, StepId};
use std::collections::HashMap;

#[test]
fn standard_sheet_builds_the_expected_score() {
    init_logging();
    let (sheet, pipeline) = recognized(&config(3, 1));
    for step in StepId::ALL {
        assert_eq!(pipeline.state(step), StageState::Done, "{step} should be done");
    }
    let report = pipeline.last_report().unwrap();
    assert_eq!(report.executed(), StepId::ALL.to_vec());
    assert!(report.skipped.is_empty());

    let s = pipeline.sheet();
    assert_eq!(s.staves().len(), 3);
    assert_eq!(s.nest().with_shape(Shape::Barline).count(), 9);
    assert_eq!(s.nest().with_shape(Shape::ThickBarline).count(), 3);
    assert!(s.issues().is_empty(), "unexpected issues: {:?}", s.issues());

    let tree = s.tree();
    let systems = tree.systems();
    assert_eq!(systems.len(), 3);
    let mut numbers = Vec::new();
    for (k, &system) in systems.iter().enumerate() {
        assert_eq!(tree.system(system).unwrap().id, k + 1);
        let parts = tree.parts(system);
        assert_eq!(parts.len(), 1);
        let measures = tree.measures(parts[0]);
        assert_eq!(measures.len(), 3);
        for &m in &measures {
            numbers.push(tree.measure(m).unwrap().number);
            assert_eq!(tree.chords(m).len(), 3);
            assert_eq!(tree.slots(m).len(), 3);
        }
    }
    assert_eq!(numbers, (1..=9).collect::<Vec<_>>());
    assert_eq!(sheet.notes.iter().map(Vec::len).sum::<usize>(), 27);
}

#[test]
fn notes_carry_drawn_pitches() {
    let (sheet, pipeline) = recognized(&config(2, 1));
    let tree = pipeline.sheet().tree();
    let mut found = HashMap::new();
    for system in tree.systems() {
        for part in tree.parts(system) {
            for measure in tree.measures(part) {
                for chord in tree.chords(measure) {
                    for note in tree.notes(chord) {
                        let data = tree.note(note).unwrap();
                        found.insert(data.glyph, (data.pitch_position, data.staff_position));
                    }
                }
            }
        }
    }
    for drawn in sheet.notes.iter().flatten() {
        let (pitch, position) = found[&drawn.head];
        assert_eq!(pitch, drawn.pitch, "pitch of {}", drawn.head);
        let expected = match drawn.pitch {
            p if p < -4 => StaffPosition::AboveStaves,
            p if p > 4 => StaffPosition::BelowStaves,
            _ => StaffPosition::WithinStaves,
        };
        assert_eq!(position, expected);
    }
}

#[test]
fn two_staff_systems_have_one_part_per_staff() {
    let (_, pipeline) = recognized(&config(2, 2));
    let tree = pipeline.sheet().tree();
    for system in tree.systems() {
        let parts = tree.parts(system);
        assert_eq!(parts.len(), 2);
        let staff_ids: Vec<usize> = parts
            .iter()
            .flat_map(|&p| tree.staves(p))
            .map(|s| tree.staff(s).unwrap().id)
            .collect();
        assert_eq!(staff_ids, vec![1, 2]);
        for &part in &parts {
            assert_eq!(tree.measures(part).len(), 3);
        }
    }
}

#[test]
fn composite_boxes_are_unions_of_their_children() {
    let (_, pipeline) = recognized(&config(3, 2));
    let tree = pipeline.sheet().tree();
    let mut composites = vec![tree.root()];
    for system in tree.systems() {
        composites.push(system);
        composites.extend(tree.parts(system));
    }
    for id in composites {
        let boxes: Vec<_> = tree
            .children(id)
            .iter()
            .map(|&c| tree.bounds(c).unwrap())
            .collect();
        assert_eq!(
            tree.bounds(id).unwrap(),
            union_all(&boxes).unwrap(),
            "box of {} ({})",
            id,
            tree.context_string(id)
        );
    }
}

#[test]
fn rerunning_a_stage_rebuilds_an_equal_subtree() {
    let (_, mut pipeline) = recognized(&config(3, 1));
    let root = pipeline.sheet().tree().root();
    let before = pipeline.sheet().tree().snapshot(root).unwrap();

    pipeline.invalidate(StepId::Symbols, Scope::Sheet);
    pipeline.run().unwrap();
    assert_eq!(pipeline.sheet().tree().snapshot(root).unwrap(), before);

    pipeline.invalidate(StepId::Systems, Scope::Sheet);
    let report = pipeline.run().unwrap();
    assert_eq!(
        report.executed(),
        vec![StepId::Systems, StepId::Measures, StepId::Symbols, StepId::Layout]
    );
    assert_eq!(pipeline.sheet().tree().snapshot(root).unwrap(), before);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let cfg = config(3, 2);
    let (_, mut sequential) = standard_pipeline(&cfg, params());
    let (_, mut parallel) = standard_pipeline(&cfg, EngineParams::default());
    sequential.run().unwrap();
    parallel.run().unwrap();
    let a = sequential.sheet().tree();
    let b = parallel.sheet().tree();
    assert_eq!(a.snapshot(a.root()), b.snapshot(b.root()));
}

#[test]
fn scoped_rerun_leaves_other_systems_untouched() {
    let (_, mut pipeline) = recognized(&config(3, 1));
    let tree = pipeline.sheet().tree();
    let systems = tree.systems();
    let watch: Vec<_> = systems
        .iter()
        .map(|&s| {
            let part = tree.parts(s)[0];
            (s, tree.bounds(s).unwrap(), tree.revision(s).unwrap(), tree.measures(part))
        })
        .collect();

    pipeline.invalidate(StepId::Measures, Scope::systems([2]));
    assert_eq!(pipeline.pending_scope(StepId::Symbols), Some(&Scope::systems([2])));
    assert_eq!(pipeline.pending_scope(StepId::Layout), Some(&Scope::Sheet));
    let report = pipeline.run().unwrap();
    assert_eq!(report.find(StepId::Measures).unwrap().systems, 1);

    let tree = pipeline.sheet().tree();
    assert_eq!(tree.systems(), systems);
    for (rank, (id, bounds, revision, measures)) in watch.into_iter().enumerate() {
        let part = tree.parts(id)[0];
        if rank == 1 {
            assert!(tree.revision(id).unwrap() > revision);
            assert_ne!(tree.measures(part), measures, "S2 measures are rebuilt");
            continue;
        }
        assert_eq!(tree.revision(id).unwrap(), revision, "S{} revision", rank + 1);
        assert_eq!(tree.get(id).unwrap().cached_bounds(), Some(bounds));
        assert_eq!(tree.measures(part), measures, "S{} measures", rank + 1);
    }
}

#[test]
fn missing_staves_fail_the_grid_stage() {
    init_logging();
    let mut builder = SheetBuilder::new(400, 300, 20);
    builder.block(50, 50, 30, 30);
    builder.block(150, 60, 3, 120);
    let (input, source) = builder.build();
    let mut pipeline = Pipeline::new(input, Box::new(source), params());

    let err = pipeline.run().unwrap_err();
    assert_eq!(
        err,
        PipelineError::Stage(StageFailure {
            stage: StepId::Grid,
            scope: Scope::Sheet,
            cause: StageError::NoStaff { candidates: 0 },
        })
    );
    assert_eq!(pipeline.state(StepId::Load), StageState::Done);
    assert_eq!(pipeline.state(StepId::Grid), StageState::Failed);
    let report = pipeline.last_report().unwrap();
    assert_eq!(report.executed(), vec![StepId::Load]);
    assert_eq!(
        report.skipped,
        vec![
            StepId::Bars,
            StepId::Shapes,
            StepId::Systems,
            StepId::Measures,
            StepId::Symbols,
            StepId::Layout
        ]
    );

    // Failed stages wait for an invalidation; nothing else can run.
    let again = pipeline.run();
    assert!(again.is_ok());
    assert!(pipeline.last_report().unwrap().stages.is_empty());
    assert_eq!(pipeline.state(StepId::Grid), StageState::Failed);
}

#[test]
fn failing_source_is_reported_by_load() {
    struct Broken;
    impl omr_engine::pipeline::GlyphSource for Broken {
        fn glyphs(
            &self,
            _: &omr_engine::image::BinaryImage,
        ) -> Result<Vec<Vec<omr_engine::geometry::PixelPoint>>, String> {
            Err("scanner offline".to_string())
        }
    }
    let (input, _) = SheetBuilder::new(100, 100, 20).build();
    let mut pipeline = Pipeline::new(input, Box::new(Broken), params());
    match pipeline.run() {
        Err(PipelineError::Stage(failure)) => {
            assert_eq!(failure.stage, StepId::Load);
            assert_eq!(failure.cause, StageError::Source("scanner offline".to_string()));
        }
        other => panic!("expected a LOAD failure, got {other:?}"),
    }
}

#[test]
fn blocked_stage_names_its_prerequisite() {
    let (_, mut pipeline) = standard_pipeline(&config(1, 1), params());
    assert_eq!(
        pipeline.run_stage(StepId::Systems).unwrap_err(),
        PipelineError::Blocked {
            stage: StepId::Systems,
            prerequisite: StepId::Grid
        }
    );
    pipeline.run_stage(StepId::Load).unwrap();
    pipeline.run_stage(StepId::Grid).unwrap();
    assert_eq!(pipeline.sheet().staves().len(), 1);
}

#[test]
fn interleaved_systems_keep_ordered_bands() {
    init_logging();
    let mut b = SheetBuilder::new(1500, 800, 20);
    b.staff(100, 100, 800);
    b.staff(1000, 300, 400);
    b.staff(100, 500, 800);
    // The outer staves share bar lines; the middle one stands to their right.
    b.barline(100, 100, 581, 3);
    b.barline(897, 100, 581, 3);
    b.barline(1000, 300, 381, 3);
    b.barline(1397, 300, 381, 3);
    let (input, source) = b.build();
    let mut pipeline = Pipeline::new(input, Box::new(source), params());
    for step in [StepId::Load, StepId::Grid, StepId::Bars, StepId::Shapes, StepId::Systems] {
        pipeline.run_stage(step).unwrap();
    }

    let tree = pipeline.sheet().tree();
    let systems = tree.systems();
    assert_eq!(systems.len(), 2);
    let frames: Vec<_> = systems.iter().map(|&s| tree.system(s).unwrap().frame).collect();
    assert_eq!((frames[0].origin.y, frames[0].height), (0, 441));
    assert_eq!((frames[1].origin.y, frames[1].height), (441, 359));
    assert_eq!(tree.parts(systems[0]).len(), 2);

    let issues = pipeline.sheet().issues();
    assert_eq!(issues.len(), 1, "{issues:?}");
    assert_eq!(issues[0].stage, StepId::Systems);
    assert_eq!(issues[0].context, "S1");
    assert_eq!(issues[0].text, "system overlaps S2");

    pipeline.invalidate(StepId::Systems, Scope::Sheet);
    pipeline.run_stage(StepId::Systems).unwrap();
    assert_eq!(pipeline.sheet().issues().len(), 1);
}

#[test]
fn cancelled_stage_stays_pending_over_the_remaining_systems() {
    let (_, mut pipeline) = recognized(&config(3, 1));
    let root = pipeline.sheet().tree().root();
    let before = pipeline.sheet().tree().snapshot(root).unwrap();

    pipeline.invalidate(StepId::Measures, Scope::Sheet);
    let token = pipeline.cancel_token();
    token.cancel();
    let err = pipeline.run().unwrap_err();
    assert_eq!(
        err,
        PipelineError::Cancelled {
            stage: StepId::Measures,
            remaining: Scope::systems([1, 2, 3]),
        }
    );
    assert_eq!(pipeline.state(StepId::Measures), StageState::Pending);
    assert_eq!(
        pipeline.pending_scope(StepId::Measures),
        Some(&Scope::systems([1, 2, 3]))
    );
    assert_eq!(pipeline.sheet().tree().snapshot(root).unwrap(), before);

    // The request was consumed; the next run resumes without a reset.
    assert!(!token.is_cancelled());
    pipeline.run().unwrap();
    assert_eq!(pipeline.sheet().tree().snapshot(root).unwrap(), before);
    assert_eq!(pipeline.state(StepId::Layout), StageState::Done);
}

#[test]
fn independent_sheets_process_together() {
    let configs = [config(1, 1), config(2, 2), config(3, 1)];
    let mut pipelines: Vec<Pipeline> = configs
        .iter()
        .map(|c| standard_pipeline(c, EngineParams::default()).1)
        .collect();
    let results = process_sheets(&mut pipelines);
    assert_eq!(results.len(), 3);
    for ((result, pipeline), cfg) in results.iter().zip(&pipelines).zip(&configs) {
        assert!(result.is_ok(), "{result:?}");
        assert_eq!(pipeline.sheet().tree().systems().len(), cfg.systems);
    }
}

#[test]
fn recognition_issues_name_their_measure() {
    let mut b = SheetBuilder::new(1000, 400, 20);
    let staff = b.staff(100, 150, 800);
    for x in [100, 500] {
        b.barline(x, 150, 231, 3);
    }
    b.barline(897, 150, 231, 3);
    // Black head without stem.
    b.note(&staff, 200, 0, true, true);
    // Head and stem above the staff without the ledger.
    let cy = b.pitch_y(&staff, -6);
    b.head(300, cy, true);
    b.stem(310, cy, 60);
    // Stem alone.
    b.stem(700, 190, 60);
    let (input, source): (_, VecGlyphSource) = b.build();
    let mut pipeline = Pipeline::new(input, Box::new(source), params());
    pipeline.run().unwrap();

    let issues: Vec<(String, String)> = pipeline
        .sheet()
        .issues()
        .iter()
        .map(|i| (i.context.clone(), i.text.clone()))
        .collect();
    assert_eq!(issues.len(), 3, "{issues:?}");
    assert!(issues.contains(&("S1P1M1".to_string(), "black head without stem".to_string())));
    assert!(issues.contains(&("S1P1M1".to_string(), "note at pitch -6 has no ledger".to_string())));
    assert!(issues.contains(&("S1P1".to_string(), "stem without head".to_string())));
    assert!(pipeline.sheet().issues().iter().all(|i| i.stage == StepId::Symbols));

    // Re-running the symbols replaces, not accumulates.
    pipeline.invalidate(StepId::Symbols, Scope::parts([(1, 1)]));
    pipeline.run().unwrap();
    assert_eq!(pipeline.sheet().issues().len(), 3);
}
