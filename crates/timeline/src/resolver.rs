//! Per-row audio clip resolution.
//!
//! Row `n` expects a clip named `{n:0width$}.{ext}` (e.g. `007.wav`) in the
//! audio directory. Missing clips and probe failures are never fatal: the
//! row gets the configured default duration and a warning is logged. The
//! resolver does not retry; each row is probed at most once.

use std::path::{Path, PathBuf};

use scriptreel_common::config::TimelineConfig;
use scriptreel_model::{AssetStatus, AudioAsset, ScriptRow};

use crate::probe::{probe_for, DurationProbe};

/// Maps script rows to audio clips and their durations.
pub struct AudioAssetResolver {
    audio_dir: Option<PathBuf>,
    extension: String,
    pad_width: usize,
    default_duration_secs: f64,
    probe: Box<dyn DurationProbe>,
}

impl std::fmt::Debug for AudioAssetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioAssetResolver")
            .field("audio_dir", &self.audio_dir)
            .field("extension", &self.extension)
            .field("pad_width", &self.pad_width)
            .field("default_duration_secs", &self.default_duration_secs)
            .field("probe", &self.probe.name())
            .finish()
    }
}

/// Expected clip file name for a row.
pub fn audio_file_name(row_index: u32, pad_width: usize, extension: &str) -> String {
    format!(
        "{row_index:0pad_width$}.{}",
        extension.trim_start_matches('.')
    )
}

impl AudioAssetResolver {
    /// Create a resolver. `audio_dir = None` resolves every row as missing.
    pub fn new(
        audio_dir: Option<PathBuf>,
        config: &TimelineConfig,
        probe: Box<dyn DurationProbe>,
    ) -> Self {
        Self {
            audio_dir,
            extension: config.audio_extension.clone(),
            pad_width: config.index_pad_width,
            default_duration_secs: config.default_duration_secs,
            probe,
        }
    }

    /// Create a resolver using the probe selected in `config`.
    pub fn from_config(audio_dir: Option<PathBuf>, config: &TimelineConfig) -> Self {
        Self::new(audio_dir, config, probe_for(config.probe))
    }

    pub fn audio_dir(&self) -> Option<&Path> {
        self.audio_dir.as_deref()
    }

    /// Where the clip for `row_index` would live.
    pub fn expected_path(&self, row_index: u32) -> Option<PathBuf> {
        self.audio_dir.as_ref().map(|dir| {
            dir.join(audio_file_name(
                row_index,
                self.pad_width,
                &self.extension,
            ))
        })
    }

    /// Resolve one row.
    pub fn resolve(&self, row_index: u32) -> AudioAsset {
        let Some(path) = self.expected_path(row_index) else {
            tracing::debug!(row = row_index, "No audio directory, using default duration");
            return AudioAsset::missing(row_index, self.default_duration_secs);
        };

        if !path.is_file() {
            tracing::warn!(
                row = row_index,
                path = %path.display(),
                default_secs = self.default_duration_secs,
                "Audio clip missing, using default duration"
            );
            return AudioAsset::missing(row_index, self.default_duration_secs);
        }

        match self.probe.probe_duration(&path) {
            Ok(duration) => {
                tracing::debug!(row = row_index, path = %path.display(), duration, "Probed audio clip");
                AudioAsset::probed(row_index, path, duration)
            }
            Err(e) => {
                tracing::warn!(
                    row = row_index,
                    path = %path.display(),
                    probe = self.probe.name(),
                    error = %e,
                    default_secs = self.default_duration_secs,
                    "Audio probe failed, using default duration"
                );
                AudioAsset {
                    row_index,
                    file_path: Some(path),
                    duration_seconds: Some(self.default_duration_secs),
                    status: AssetStatus::ProbeFailed,
                }
            }
        }
    }

    /// Resolve every row of a script, in row order.
    pub fn resolve_all(&self, rows: &[ScriptRow]) -> Vec<AudioAsset> {
        if let Some(dir) = &self.audio_dir {
            if !dir.is_dir() {
                tracing::warn!(dir = %dir.display(), "Audio directory does not exist");
            }
        }

        let assets: Vec<AudioAsset> = rows.iter().map(|row| self.resolve(row.index)).collect();
        let degraded = assets.iter().filter(|a| a.is_degraded()).count();
        tracing::info!(
            rows = rows.len(),
            degraded,
            "Resolved audio assets"
        );
        assets
    }
}
