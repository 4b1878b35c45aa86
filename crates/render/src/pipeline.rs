//! One script-to-video run.
//!
//! parse -> resolve audio -> build plan -> write `timeline_plan.json` ->
//! write subtitles -> export -> write `export_result.json`.
//!
//! Skipped lines and degraded audio are collected as warnings. A plan that
//! fails its invariants aborts the run before any backend is touched.

use std::path::{Path, PathBuf};

use scriptreel_common::config::AppConfig;
use scriptreel_common::error::ReelResult;
use scriptreel_model::{parse_script_file, AssetStatus, TimelinePlan};
use scriptreel_timeline::{AudioAssetResolver, SubtitleEmitter, TimelineBuilder};

use crate::backend::RenderRequest;
use crate::fallback::{ExportFallbackManager, ExportResult};

pub const PLAN_FILE_NAME: &str = "timeline_plan.json";
pub const EXPORT_RESULT_FILE_NAME: &str = "export_result.json";
pub const SUBTITLE_STEM: &str = "subtitles";

/// Inputs of one run. Concurrent runs must use distinct output directories.
#[derive(Debug, Clone)]
pub struct PipelineInputs {
    pub script_path: PathBuf,
    pub audio_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

/// A plan plus the warnings collected while building it.
#[derive(Debug, Clone)]
pub struct BuiltTimeline {
    pub plan: TimelinePlan,
    pub row_count: usize,
    pub warnings: Vec<String>,
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub plan: TimelinePlan,
    pub plan_path: PathBuf,
    pub subtitle_paths: Vec<PathBuf>,
    pub export: Option<ExportResult>,
    pub export_result_path: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl PipelineReport {
    /// `false` only when an export ran and every backend failed.
    pub fn succeeded(&self) -> bool {
        self.export.as_ref().map_or(true, |e| e.success)
    }
}

/// Parse the script, resolve audio and build the plan.
pub fn build_timeline(
    config: &AppConfig,
    script_path: &Path,
    audio_dir: Option<&Path>,
) -> ReelResult<BuiltTimeline> {
    let script = parse_script_file(script_path)?;
    let mut warnings: Vec<String> = script
        .skipped
        .iter()
        .map(|s| format!("line {} skipped: {}", s.line_number, s.reason))
        .collect();
    tracing::info!(
        rows = script.rows.len(),
        skipped = script.skipped.len(),
        path = %script_path.display(),
        "Parsed script"
    );

    let resolver = AudioAssetResolver::from_config(audio_dir.map(Path::to_path_buf), &config.timeline);
    let assets = resolver.resolve_all(&script.rows);
    for asset in &assets {
        match asset.status {
            AssetStatus::Probed => {}
            AssetStatus::Missing => warnings.push(format!(
                "row {}: no audio clip, using {}s",
                asset.row_index, config.timeline.default_duration_secs
            )),
            AssetStatus::ProbeFailed => warnings.push(format!(
                "row {}: audio clip could not be measured, using {}s",
                asset.row_index, config.timeline.default_duration_secs
            )),
        }
    }

    let plan = TimelineBuilder::new(config.timeline.clone()).build(&script.rows, &assets)?;
    Ok(BuiltTimeline {
        plan,
        row_count: script.rows.len(),
        warnings,
    })
}

/// Run every stage. Without a manager the run stops after the subtitles.
///
/// Backend exhaustion is not an error here: the report carries the failed
/// [`ExportResult`] and it is also written to `export_result.json`.
pub async fn run_pipeline(
    config: &AppConfig,
    inputs: &PipelineInputs,
    manager: Option<&ExportFallbackManager>,
) -> ReelResult<PipelineReport> {
    let built = build_timeline(config, &inputs.script_path, inputs.audio_dir.as_deref())?;
    std::fs::create_dir_all(&inputs.output_dir)?;

    let plan_path = inputs.output_dir.join(PLAN_FILE_NAME);
    built.plan.save_json(&plan_path)?;
    tracing::info!(path = %plan_path.display(), "Wrote timeline plan");

    let subtitle_paths = SubtitleEmitter::from_config(&config.subtitles).write_tracks(
        &built.plan,
        &inputs.output_dir,
        SUBTITLE_STEM,
        &config.subtitles.formats,
    )?;

    let (export, export_result_path) = match manager {
        Some(manager) => {
            let request = RenderRequest {
                plan: &built.plan,
                audio_dir: inputs.audio_dir.as_deref(),
                output_dir: &inputs.output_dir,
                quality: config.export.quality,
            };
            let result = manager.export(&request).await;
            let path = inputs.output_dir.join(EXPORT_RESULT_FILE_NAME);
            result.save_json(&path)?;
            (Some(result), Some(path))
        }
        None => (None, None),
    };

    Ok(PipelineReport {
        plan: built.plan,
        plan_path,
        subtitle_paths,
        export,
        export_result_path,
        warnings: built.warnings,
    })
}
