//! Run configuration.
//!
//! A single [`AppConfig`] is loaded once per run and passed explicitly to the
//! components that need it. Nothing in the workspace reads configuration from
//! process-wide state.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReelError, ReelResult};

/// Top-level configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Timeline construction settings.
    pub timeline: TimelineConfig,

    /// Subtitle track settings.
    pub subtitles: SubtitleConfig,

    /// Ordered render backend chain (sorted by `priority` at use time).
    pub backends: Vec<BackendConfig>,

    /// Settings consumed by the concrete render backends.
    pub export: ExportSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Settings for turning script rows and audio clips into a timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Character budget for a single on-screen slide.
    pub max_chars_per_slide: usize,

    /// Duration used for rows without a usable audio clip.
    /// Must be finite and strictly positive.
    pub default_duration_secs: f64,

    /// Audio file extension, without the leading dot.
    pub audio_extension: String,

    /// Zero-pad width of the row index in audio file names (`007.wav`).
    pub index_pad_width: usize,

    /// How audio durations are measured.
    pub probe: ProbeKind,
}

/// Audio duration probe implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    /// Read container metadata in-process.
    #[default]
    Symphonia,
    /// Shell out to `ffprobe`.
    Ffprobe,
}

/// Subtitle output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleConfig {
    /// Formats written by the pipeline.
    pub formats: Vec<SubtitleFormat>,

    /// Prefix every cue with `Speaker: `.
    pub include_speaker: bool,
}

/// Supported subtitle track formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// SubRip, millisecond precision.
    Srt,
    /// WebVTT, millisecond precision.
    Vtt,
    /// Plain sequential cue list with whole-second timestamps.
    Txt,
}

impl SubtitleFormat {
    pub const ALL: [SubtitleFormat; 3] = [Self::Srt, Self::Vtt, Self::Txt];

    /// File extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Txt => "txt",
        }
    }
}

impl FromStr for SubtitleFormat {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "vtt" | "webvtt" => Ok(Self::Vtt),
            "txt" | "text" => Ok(Self::Txt),
            other => Err(ReelError::config(format!(
                "Unknown subtitle format: {other}. Use: srt, vtt, txt"
            ))),
        }
    }
}

/// The closed set of render backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Programmatic composition (ffmpeg).
    Composer,
    /// Scripted automation of a third-party editor.
    EditorAutomation,
    /// Remote rendering service.
    RemoteApi,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [Self::Composer, Self::EditorAutomation, Self::RemoteApi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Composer => "composer",
            Self::EditorAutomation => "editor_automation",
            Self::RemoteApi => "remote_api",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "composer" | "ffmpeg" => Ok(Self::Composer),
            "editor_automation" | "editor" => Ok(Self::EditorAutomation),
            "remote_api" | "remote" => Ok(Self::RemoteApi),
            other => Err(ReelError::config(format!(
                "Unknown backend: {other}. Use: composer, editor_automation, remote_api"
            ))),
        }
    }
}

/// One entry of the fallback chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Which backend this entry drives.
    pub backend_kind: BackendKind,

    /// Lower values are tried first.
    pub priority: i32,

    /// Disabled entries are skipped without an attempt.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Deadline for a single attempt.
    pub timeout_seconds: f64,

    /// Extra attempts after the first failure (0 = single attempt).
    #[serde(default)]
    pub retry_count: u32,

    /// Pause between attempts of the same backend.
    #[serde(default)]
    pub retry_delay_seconds: f64,
}

fn default_true() -> bool {
    true
}

impl BackendConfig {
    pub fn new(backend_kind: BackendKind, priority: i32, timeout_seconds: f64) -> Self {
        Self {
            backend_kind,
            priority,
            enabled: true,
            timeout_seconds,
            retry_count: 0,
            retry_delay_seconds: 0.0,
        }
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Total number of attempts this entry may consume.
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Attempt deadline. Call [`AppConfig::validate`] first; invalid values
    /// saturate instead of panicking.
    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::MAX)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.retry_delay_seconds).unwrap_or(Duration::ZERO)
    }
}

/// Output quality preset handed to backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    #[serde(rename = "720p")]
    Hd720,
    #[default]
    #[serde(rename = "1080p")]
    Hd1080,
    #[serde(rename = "2160p")]
    Uhd2160,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hd720 => "720p",
            Self::Hd1080 => "1080p",
            Self::Uhd2160 => "2160p",
        }
    }

    /// Output frame size in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Hd720 => (1280, 720),
            Self::Hd1080 => (1920, 1080),
            Self::Uhd2160 => (3840, 2160),
        }
    }

    /// x264 constant rate factor.
    pub fn crf(&self) -> u32 {
        match self {
            Self::Hd720 => 26,
            Self::Hd1080 => 23,
            Self::Uhd2160 => 20,
        }
    }
}

impl FromStr for QualityPreset {
    type Err = ReelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "720p" | "720" => Ok(Self::Hd720),
            "1080p" | "1080" => Ok(Self::Hd1080),
            "2160p" | "2160" | "4k" => Ok(Self::Uhd2160),
            other => Err(ReelError::config(format!(
                "Unknown quality preset: {other}. Use: 720p, 1080p, 2160p"
            ))),
        }
    }
}

/// Settings consumed by the concrete backends.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExportSettings {
    /// Quality preset for every backend.
    pub quality: QualityPreset,

    /// Composition backend settings.
    pub ffmpeg: FfmpegSettings,

    /// Editor automation backend settings.
    pub editor: EditorSettings,

    /// Remote rendering backend settings.
    pub remote: RemoteSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FfmpegSettings {
    /// ffmpeg executable name or path.
    pub binary: String,

    /// Background color (ffmpeg color syntax).
    pub background_color: String,

    /// Output frame rate.
    pub fps: u32,

    /// Sample rate for generated silence.
    pub audio_sample_rate: u32,
}

impl Default for FfmpegSettings {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            background_color: "#1a1a1a".to_string(),
            fps: 30,
            audio_sample_rate: 48000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Automation program (for example an AutoHotkey interpreter).
    /// `None` leaves the backend unavailable.
    pub program: Option<String>,

    /// Arguments; `{plan}`, `{output}`, `{project_dir}`, `{audio}` and
    /// `{quality}` are substituted per attempt.
    pub args: Vec<String>,

    /// Optional editor project template copied into the workspace.
    pub project_template: Option<PathBuf>,

    /// Name of the video file the automation is expected to produce.
    pub output_file_name: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            program: None,
            args: vec![
                "{project_dir}".to_string(),
                "--plan".to_string(),
                "{plan}".to_string(),
                "--output".to_string(),
                "{output}".to_string(),
            ],
            project_template: None,
            output_file_name: "editor_output.mp4".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Render endpoint URL. `None` leaves the backend unavailable.
    pub endpoint: Option<String>,

    /// Environment variable holding the bearer token.
    pub token_env: String,

    /// Name of the downloaded video file.
    pub output_file_name: String,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            token_env: "SCRIPTREEL_REMOTE_TOKEN".to_string(),
            output_file_name: "remote_output.mp4".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "scriptreel_render=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            timeline: TimelineConfig::default(),
            subtitles: SubtitleConfig::default(),
            backends: default_backend_chain(),
            export: ExportSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            max_chars_per_slide: 200,
            default_duration_secs: 3.0,
            audio_extension: "wav".to_string(),
            index_pad_width: 3,
            probe: ProbeKind::Symphonia,
        }
    }
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            formats: vec![SubtitleFormat::Srt, SubtitleFormat::Vtt],
            include_speaker: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Remote API first (disabled until configured), then editor automation,
/// then ffmpeg composition as the last resort.
pub fn default_backend_chain() -> Vec<BackendConfig> {
    vec![
        BackendConfig::new(BackendKind::RemoteApi, 1, 600.0).disabled(),
        BackendConfig::new(BackendKind::EditorAutomation, 2, 300.0).with_retries(1),
        BackendConfig::new(BackendKind::Composer, 3, 180.0),
    ]
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> ReelResult<PathBuf> {
        let config_path = config_file_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ReelResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject values that would make the timeline degenerate or the
    /// fallback chain ambiguous.
    pub fn validate(&self) -> ReelResult<()> {
        let timeline = &self.timeline;
        if timeline.max_chars_per_slide == 0 {
            return Err(ReelError::config("max_chars_per_slide must be at least 1"));
        }
        if !timeline.default_duration_secs.is_finite() || timeline.default_duration_secs <= 0.0 {
            return Err(ReelError::config(format!(
                "default_duration_secs must be finite and positive, got {}",
                timeline.default_duration_secs
            )));
        }
        if timeline.index_pad_width == 0 {
            return Err(ReelError::config("index_pad_width must be at least 1"));
        }
        if timeline.audio_extension.trim_start_matches('.').is_empty() {
            return Err(ReelError::config("audio_extension must not be empty"));
        }

        let mut seen = Vec::with_capacity(self.backends.len());
        for backend in &self.backends {
            if seen.contains(&backend.backend_kind) {
                return Err(ReelError::config(format!(
                    "Backend {} is configured more than once",
                    backend.backend_kind
                )));
            }
            seen.push(backend.backend_kind);

            if !backend.timeout_seconds.is_finite() || backend.timeout_seconds <= 0.0 {
                return Err(ReelError::config(format!(
                    "Backend {} timeout_seconds must be finite and positive, got {}",
                    backend.backend_kind, backend.timeout_seconds
                )));
            }
            if !backend.retry_delay_seconds.is_finite() || backend.retry_delay_seconds < 0.0 {
                return Err(ReelError::config(format!(
                    "Backend {} retry_delay_seconds must be finite and non-negative",
                    backend.backend_kind
                )));
            }
        }
        Ok(())
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("scriptreel").join("config.json")
}
