//! ScriptReel Render
//!
//! Turns a finished `TimelinePlan` into a video by trying a prioritised
//! chain of render backends, and drives the whole script-to-video run.
//!
//! # Export Flow
//!
//! ```text
//! TimelinePlan ──┐
//!                ├── remote_api        (priority 1) ── ok ──► output.mp4
//!                │        │ fail / timeout / unavailable
//!                │        ▼
//!                ├── editor_automation (priority 2) ── ok ──► output.mp4
//!                │        │ fail / timeout / unavailable
//!                │        ▼
//!                └── composer (ffmpeg) (priority 3) ── ok ──► output.mp4
//!                         │
//!                         ▼
//!                  ExportResult { success: false, attempts: [...] }
//! ```

pub mod backend;
pub mod editor;
pub mod fallback;
pub mod ffmpeg;
pub mod pipeline;
pub mod process;
pub mod remote;

pub use backend::*;
pub use fallback::*;
pub use pipeline::*;

pub use editor::EditorAutomationBackend;
pub use ffmpeg::ComposerBackend;
pub use remote::RemoteApiBackend;

