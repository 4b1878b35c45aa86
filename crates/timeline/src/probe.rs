//! Audio duration probes.
//!
//! The resolver only needs "how long is this clip". Two implementations are
//! provided: container metadata read in-process with Symphonia, and an
//! `ffprobe` subprocess for formats Symphonia cannot read.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Command;

use scriptreel_common::config::ProbeKind;
use scriptreel_common::error::ReelError;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Measures the playable duration of an audio file.
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds. Implementations must return a finite, positive
    /// value or an error.
    fn probe_duration(&self, path: &Path) -> Result<f64, ProbeError>;

    /// Probe name for logging.
    fn name(&self) -> &str;
}

/// Errors from duration probing. Always recoverable at the resolver level.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported audio file {path}: {message}")]
    Unsupported { path: PathBuf, message: String },

    #[error("No audio track in {path}")]
    NoAudioTrack { path: PathBuf },

    #[error("Container does not declare a duration: {path}")]
    UnknownDuration { path: PathBuf },

    #[error("Probe command failed: {message}")]
    Command { message: String },

    #[error("Probed duration {duration} is not usable")]
    InvalidDuration { duration: f64 },
}

impl From<ProbeError> for ReelError {
    fn from(e: ProbeError) -> Self {
        match e {
            ProbeError::Open { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                Self::FileNotFound { path }
            }
            other => Self::audio(other.to_string()),
        }
    }
}

/// Build the probe selected in configuration.
pub fn probe_for(kind: ProbeKind) -> Box<dyn DurationProbe> {
    match kind {
        ProbeKind::Symphonia => Box::new(SymphoniaProbe),
        ProbeKind::Ffprobe => Box::new(FfprobeProbe::default()),
    }
}

fn checked(duration: f64) -> Result<f64, ProbeError> {
    if duration.is_finite() && duration > 0.0 {
        Ok(duration)
    } else {
        Err(ProbeError::InvalidDuration { duration })
    }
}

/// Reads the frame count and time base from the container header.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn probe_duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let file = File::open(path).map_err(|e| ProbeError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| ProbeError::Unsupported {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let track = probed
            .format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| ProbeError::NoAudioTrack {
                path: path.to_path_buf(),
            })?;

        let params = &track.codec_params;
        let n_frames = params.n_frames.ok_or_else(|| ProbeError::UnknownDuration {
            path: path.to_path_buf(),
        })?;

        let duration = if let Some(time_base) = params.time_base {
            let time = time_base.calc_time(n_frames);
            time.seconds as f64 + time.frac
        } else if let Some(sample_rate) = params.sample_rate.filter(|r| *r > 0) {
            n_frames as f64 / sample_rate as f64
        } else {
            return Err(ProbeError::UnknownDuration {
                path: path.to_path_buf(),
            });
        };

        checked(duration)
    }

    fn name(&self) -> &str {
        "symphonia"
    }
}

/// Asks `ffprobe` for the container duration.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: String,
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl DurationProbe for FfprobeProbe {
    fn probe_duration(&self, path: &Path) -> Result<f64, ProbeError> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| ProbeError::Command {
                message: format!("failed to run {}: {e}", self.binary),
            })?;

        if !output.status.success() {
            return Err(ProbeError::Command {
                message: format!(
                    "{} exited with {}: {}",
                    self.binary,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        parse_ffprobe_duration(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &str {
        "ffprobe"
    }
}

fn parse_ffprobe_duration(stdout: &str) -> Result<f64, ProbeError> {
    let line = stdout.lines().next().unwrap_or("").trim();
    let duration = line.parse::<f64>().map_err(|_| ProbeError::Command {
        message: format!("unexpected ffprobe output: {line:?}"),
    })?;
    checked(duration)
}
