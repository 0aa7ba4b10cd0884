use omr_engine::config::sheet::{self, OutputFormat, RuntimeConfig};
use omr_engine::diagnostics::{RunReport, TimingBreakdown};
use omr_engine::synthetic::StandardSheet;
use omr_engine::{Pipeline, StepId};
use std::env;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let program = env::args()
        .next()
        .unwrap_or_else(|| "sheet_demo".to_string());
    let config = sheet::parse_cli(&program)?;

    let standard = StandardSheet::generate(&config.synthetic);
    let (input, source) = standard.builder.build();
    let mut pipeline = Pipeline::new(input, Box::new(source), config.engine.clone());

    let mut reports = Vec::new();
    let report = pipeline.run().map_err(|e| e.to_string())?;
    report_run(&config, &pipeline, "initial run", &report);
    reports.push(report);

    for task in &config.tasks {
        let record = pipeline.apply(task.clone()).map_err(|e| e.to_string())?;
        if config.output.format.includes_text() {
            println!(
                "\nTask #{}: {:?} -> {} over {}",
                record.seq, record.task, record.impact.stage, record.impact.scope
            );
        }
        let report = pipeline.run().map_err(|e| e.to_string())?;
        report_run(&config, &pipeline, "re-run", &report);
        reports.push(report);
    }

    if config.output.format.includes_text() && reports.len() > 1 {
        let timing = TimingBreakdown::from_reports(&reports);
        println!("\nStage timing over {} runs (total {:.3} ms):", reports.len(), timing.total_ms);
        for stage in &timing.stages {
            println!(
                "  {:<9} runs={} mean={:.3} ms max={:.3} ms",
                stage.stage.name(),
                stage.runs,
                stage.mean_ms(),
                stage.max_ms
            );
        }
    }

    if config.output.format.includes_json() {
        match &config.output.json_out {
            Some(path) => {
                sheet::write_json_file(path, &reports)?;
                println!("JSON report written to {}", path.display());
            }
            None => {
                let json = serde_json::to_string_pretty(&reports)
                    .map_err(|e| format!("Failed to serialize JSON: {e}"))?;
                if config.output.format == OutputFormat::Both {
                    println!("\nJSON report:\n{json}");
                } else {
                    println!("{json}");
                }
            }
        }
    }

    if let Some(path) = &config.output.task_log_out {
        let json = pipeline.log().to_json()?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {e}", path.display()))?;
        eprintln!("Task log written to {}", path.display());
    }
    Ok(())
}

fn report_run(config: &RuntimeConfig, pipeline: &Pipeline, title: &str, report: &RunReport) {
    if !config.output.format.includes_text() {
        return;
    }
    let sheet = pipeline.sheet();
    let (w, h) = sheet.dimension();
    println!("Sheet {w}x{h} interline={} ({title})", sheet.interline());
    println!("  glyphs: {}  staves: {}", sheet.nest().len(), sheet.staves().len());
    println!("  stages (total {:.3} ms):", report.total_ms);
    for run in &report.stages {
        println!(
            "    {:<9} {:<20} systems={:<3} items={:<5} {:.3} ms",
            run.stage.name(),
            run.scope.to_string(),
            run.systems,
            run.items,
            run.elapsed_ms
        );
    }
    if !report.skipped.is_empty() {
        let names: Vec<&str> = report.skipped.iter().map(|s| s.name()).collect();
        println!("  skipped: {}", names.join(", "));
    }
    let tree = sheet.tree();
    println!(
        "  score: systems={} nodes={} layout={:?}",
        tree.systems().len(),
        tree.len(),
        pipeline.state(StepId::Layout)
    );
    for issue in sheet.issues() {
        println!("  issue {} [{}]: {}", issue.context, issue.stage, issue.text);
    }
    if config.output.dump_tree {
        println!("\n{}", tree.dump());
    }
}
