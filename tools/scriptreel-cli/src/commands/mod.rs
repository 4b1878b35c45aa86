pub mod backends;
pub mod build;
pub mod export;
pub mod init_config;
pub mod inspect;

use scriptreel_render::PipelineReport;

/// Print the artifact list and warnings shared by `build` and `export`.
fn print_artifacts(report: &PipelineReport) {
    let plan = &report.plan;
    println!(
        "  Segments: {} ({} split into sub-slides)",
        plan.segments().len(),
        plan.sub_slides().len()
    );
    println!("  Duration: {:.3}s", plan.total_duration_seconds());
    println!("  Plan: {}", report.plan_path.display());
    for path in &report.subtitle_paths {
        println!("  Subtitles: {}", path.display());
    }

    if !report.warnings.is_empty() {
        println!();
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [WARN] {warning}");
        }
    }
}
