//! Programmatic composition with ffmpeg.
//!
//! The video track is a solid background for the full plan duration with the
//! plan's SRT track burnt in. The audio track concatenates one stream per
//! segment: the row's clip padded or trimmed to the segment duration, or
//! generated silence when the row has no clip.

use std::path::{Path, PathBuf};
use std::time::Instant;

use scriptreel_common::config::{BackendKind, FfmpegSettings, QualityPreset, SubtitleFormat};
use scriptreel_model::TimelinePlan;
use scriptreel_timeline::{CueTime, SubtitleEmitter};
use tokio::process::Command;

use crate::backend::{RenderBackend, RenderError, RenderRequest, Unavailable};
use crate::process::{clear_stale_output, command_exists, spawn_logged, wait_with_lines};

const WORK_DIR: &str = "composer";
const SUBTITLE_FILE: &str = "subtitles.srt";
const OUTPUT_FILE: &str = "composer_output.mp4";

/// Renders with a local ffmpeg binary.
#[derive(Debug, Clone)]
pub struct ComposerBackend {
    settings: FfmpegSettings,
}

/// Fully resolved ffmpeg invocation.
#[derive(Debug, Clone)]
struct CompositionPlan {
    args: Vec<String>,
    expected_duration_secs: f64,
}

impl ComposerBackend {
    pub fn new(settings: FfmpegSettings) -> Self {
        Self { settings }
    }

    fn build_plan(
        &self,
        plan: &TimelinePlan,
        quality: QualityPreset,
        burn_subtitles: bool,
        output_path: &Path,
    ) -> CompositionPlan {
        let total = plan.total_duration_seconds();
        let total_ms = CueTime::from_secs(total).millis();
        let (width, height) = quality.dimensions();
        let sample_rate = self.settings.audio_sample_rate;

        let mut args: Vec<String> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostats".into(),
            "-progress".into(),
            "pipe:1".into(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!(
                "color=c={}:s={width}x{height}:r={}:d={}",
                self.settings.background_color,
                self.settings.fps,
                millis(total_ms)
            ),
        ];

        let mut filters = Vec::new();
        let mut labels = String::new();
        let mut input_index = 1usize;
        for segment in plan.segments() {
            // Same millisecond boundaries as the burnt-in subtitles, so the
            // concatenated audio never drifts from the cues.
            let duration_ms = CueTime::from_secs(segment.end_seconds())
                .millis()
                .saturating_sub(CueTime::from_secs(segment.start_seconds).millis());
            if duration_ms == 0 {
                continue;
            }
            let duration = millis(duration_ms);
            match &segment.audio_path {
                Some(path) => {
                    args.push("-i".into());
                    args.push(path.display().to_string());
                }
                None => {
                    args.extend([
                        "-f".into(),
                        "lavfi".into(),
                        "-t".into(),
                        duration.clone(),
                        "-i".into(),
                        format!("anullsrc=r={sample_rate}:cl=stereo"),
                    ]);
                }
            }
            let label = format!("a{}", segment.segment_id);
            filters.push(format!(
                "[{input_index}:a]aformat=sample_rates={sample_rate}:channel_layouts=stereo,\
                 apad,atrim=0:{duration},asetpts=PTS-STARTPTS[{label}]"
            ));
            labels.push_str(&format!("[{label}]"));
            input_index += 1;
        }

        let audio_streams = input_index - 1;
        if audio_streams > 0 {
            filters.push(format!(
                "{labels}concat=n={audio_streams}:v=0:a=1[aout]"
            ));
        }
        if burn_subtitles {
            filters.push(format!("[0:v]subtitles={SUBTITLE_FILE}[vout]"));
        } else {
            filters.push("[0:v]null[vout]".to_string());
        }

        args.push("-filter_complex".into());
        args.push(filters.join(";"));
        args.extend(["-map".into(), "[vout]".into()]);
        if audio_streams > 0 {
            args.extend(["-map".into(), "[aout]".into()]);
        }
        args.extend([
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            "medium".into(),
            "-crf".into(),
            quality.crf().to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            "-c:a".into(),
            "aac".into(),
            "-b:a".into(),
            "192k".into(),
            "-t".into(),
            millis(total_ms),
            "-movflags".into(),
            "+faststart".into(),
            output_path.display().to_string(),
        ]);

        CompositionPlan {
            args,
            expected_duration_secs: total,
        }
    }

    async fn run_ffmpeg(&self, composition: &CompositionPlan, work_dir: &Path) -> Result<(), RenderError> {
        tracing::debug!(args = ?composition.args, "Running ffmpeg");
        let mut cmd = Command::new(&self.settings.binary);
        cmd.args(&composition.args).current_dir(work_dir);
        let child = spawn_logged(&mut cmd, "ffmpeg")?;

        let started = Instant::now();
        let mut progress = ProgressState::default();
        let expected = composition.expected_duration_secs;
        let outcome = wait_with_lines(child, "ffmpeg", |line| {
            if let Some((key, value)) = line.split_once('=') {
                progress.update(key, value);
                if key == "progress" {
                    tracing::debug!(
                        percent = progress.percent(expected),
                        out_time_secs = progress.out_time_secs,
                        elapsed_secs = started.elapsed().as_secs_f64(),
                        "ffmpeg progress"
                    );
                }
            }
        })
        .await?;

        outcome.into_result("ffmpeg")
    }
}

#[async_trait::async_trait]
impl RenderBackend for ComposerBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Composer
    }

    async fn check_available(&self) -> Result<(), Unavailable> {
        if command_exists(&self.settings.binary) {
            Ok(())
        } else {
            Err(Unavailable::new(format!(
                "{} not found in PATH",
                self.settings.binary
            )))
        }
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError> {
        let plan = request.plan;
        if plan.is_empty() || plan.total_duration_seconds() <= 0.0 {
            return Err(RenderError::failed("timeline plan has nothing to render"));
        }

        let work_dir = absolute(&request.output_dir.join(WORK_DIR))?;
        std::fs::create_dir_all(&work_dir).map_err(|e| {
            RenderError::failed(format!("Failed to create {}: {e}", work_dir.display()))
        })?;

        let track = SubtitleEmitter::default().emit(plan, SubtitleFormat::Srt);
        let burn_subtitles = track.cue_count > 0;
        if burn_subtitles {
            let path = work_dir.join(SUBTITLE_FILE);
            std::fs::write(&path, &track.content).map_err(|e| {
                RenderError::failed(format!("Failed to write {}: {e}", path.display()))
            })?;
        }

        let absolute_plan = with_absolute_audio(plan)?;
        let output_path = absolute(&request.output_dir.join(OUTPUT_FILE))?;
        let composition =
            self.build_plan(&absolute_plan, request.quality, burn_subtitles, &output_path);

        clear_stale_output(&output_path)?;
        let started = Instant::now();
        self.run_ffmpeg(&composition, &work_dir).await?;
        tracing::info!(
            output = %output_path.display(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "ffmpeg composition finished"
        );
        Ok(output_path)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, RenderError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| RenderError::failed(format!("Failed to resolve working directory: {e}")))?;
    Ok(cwd.join(path))
}

/// ffmpeg runs inside the work directory, so clip paths must not be
/// relative to the caller's directory.
fn with_absolute_audio(plan: &TimelinePlan) -> Result<TimelinePlan, RenderError> {
    let mut segments = plan.segments().to_vec();
    for segment in &mut segments {
        if let Some(path) = &segment.audio_path {
            segment.audio_path = Some(absolute(path)?);
        }
    }
    TimelinePlan::from_parts(segments, plan.sub_slides().clone())
        .map_err(|e| RenderError::failed(e.to_string()))
}

fn millis(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    fn percent(&self, expected_duration_secs: f64) -> f64 {
        if self.complete {
            return 100.0;
        }
        if expected_duration_secs <= 0.0 {
            return 0.0;
        }
        (self.out_time_secs / expected_duration_secs * 100.0).clamp(0.0, 100.0)
    }
}
