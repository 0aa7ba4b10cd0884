use omr_engine::geometry::{PixelPoint, SystemFrame};
use omr_engine::score::{NodeKind, ScoreData, SystemData};
use omr_engine::synthetic::{StandardSheet, SyntheticConfig};
use omr_engine::{EngineParams, NodeId, Pipeline, ScoreTree};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sequential params, so failures do not depend on the thread pool.
pub fn params() -> EngineParams {
    EngineParams {
        parallel: false,
        ..EngineParams::default()
    }
}

pub fn config(systems: usize, staves_per_system: usize) -> SyntheticConfig {
    SyntheticConfig {
        systems,
        staves_per_system,
        ..SyntheticConfig::default()
    }
}

/// Standard sheet and a pipeline over it, not yet run.
pub fn standard_pipeline(config: &SyntheticConfig, params: EngineParams) -> (StandardSheet, Pipeline) {
    let sheet = StandardSheet::generate(config);
    let (input, source) = sheet.builder.clone().build();
    let pipeline = Pipeline::new(input, Box::new(source), params);
    (sheet, pipeline)
}

/// Standard sheet, fully recognized.
pub fn recognized(config: &SyntheticConfig) -> (StandardSheet, Pipeline) {
    let (sheet, mut pipeline) = standard_pipeline(config, params());
    pipeline.run().expect("standard sheet recognition");
    (sheet, pipeline)
}

/// Bare score tree with one system per `(top, height)` band.
pub fn banded_tree(width: i32, bands: &[(i32, i32)]) -> (ScoreTree, Vec<NodeId>) {
    let height = bands.iter().map(|(t, h)| t + h).max().unwrap_or(0);
    let mut tree = ScoreTree::new(ScoreData {
        dimension: (width, height),
        interline: 20.0,
        skew: 0.0,
    });
    let root = tree.root();
    let systems = bands
        .iter()
        .enumerate()
        .map(|(i, &(top, h))| {
            tree.add_child(
                root,
                NodeKind::System(SystemData {
                    id: i + 1,
                    frame: SystemFrame::new(PixelPoint::new(0, top), width, h),
                }),
            )
            .unwrap()
        })
        .collect();
    (tree, systems)
}
