//! The render backend boundary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use scriptreel_common::config::{BackendKind, ExportSettings, QualityPreset};
use scriptreel_common::error::ReelError;
use scriptreel_model::TimelinePlan;

use crate::editor::EditorAutomationBackend;
use crate::ffmpeg::ComposerBackend;
use crate::remote::RemoteApiBackend;

/// Everything a backend needs for one render.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub plan: &'a TimelinePlan,

    /// Directory holding the per-row audio clips, if any.
    pub audio_dir: Option<&'a Path>,

    /// Directory the backend writes into. Each backend owns a file or
    /// subdirectory below it.
    pub output_dir: &'a Path,

    pub quality: QualityPreset,
}

/// Why a backend could not be used at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct Unavailable {
    pub reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors from a single render attempt.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The attempt overran its deadline and was cancelled.
    #[error("timeout")]
    Timeout { after: Duration },

    #[error("backend unavailable: {0}")]
    Unavailable(#[from] Unavailable),

    #[error("{message}")]
    Failed { message: String },

    #[error("backend reported success but {path} does not exist")]
    NoOutput { path: PathBuf },
}

impl RenderError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed {
            message: msg.into(),
        }
    }

    /// Whether another attempt on the same backend could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }
}

impl From<RenderError> for ReelError {
    fn from(e: RenderError) -> Self {
        ReelError::render(e.to_string())
    }
}

/// A way of turning a timeline plan into a video file.
///
/// Implementations must be cancel-safe: dropping the `render` future has to
/// stop any external work it started.
#[async_trait::async_trait]
pub trait RenderBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Cheap capability check. An unavailable backend is skipped without
    /// counting as an attempt.
    async fn check_available(&self) -> Result<(), Unavailable>;

    /// Render and return the path of the finished video.
    async fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError>;
}

/// Build the concrete backend for a kind.
pub fn backend_for(kind: BackendKind, settings: &ExportSettings) -> Arc<dyn RenderBackend> {
    match kind {
        BackendKind::Composer => Arc::new(ComposerBackend::new(settings.ffmpeg.clone())),
        BackendKind::EditorAutomation => {
            Arc::new(EditorAutomationBackend::new(settings.editor.clone()))
        }
        BackendKind::RemoteApi => Arc::new(RemoteApiBackend::new(settings.remote.clone())),
    }
}
