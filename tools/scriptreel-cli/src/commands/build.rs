//! Build the timeline plan and subtitle tracks.

use std::path::PathBuf;

use scriptreel_common::config::AppConfig;
use scriptreel_render::{run_pipeline, PipelineInputs};

pub async fn run(
    config: AppConfig,
    script: PathBuf,
    audio_dir: Option<PathBuf>,
    output: PathBuf,
) -> anyhow::Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
    println!("Building timeline for: {}", script.display());

    let inputs = PipelineInputs {
        script_path: script,
        audio_dir,
        output_dir: output,
    };
    let report = run_pipeline(&config, &inputs, None)
        .await
        .map_err(|e| anyhow::anyhow!("Build failed: {e}"))?;

    super::print_artifacts(&report);
    Ok(())
}
