//! Audio assets resolved for script rows.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How an asset's duration was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// Clip found and measured.
    Probed,
    /// No clip exists for the row; the default duration applies.
    Missing,
    /// Clip exists but could not be measured; the default duration applies.
    ProbeFailed,
}

/// The audio clip (if any) belonging to one script row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAsset {
    /// 1-based row index this asset belongs to.
    pub row_index: u32,

    /// Clip path, `None` when no file matched the naming convention.
    pub file_path: Option<PathBuf>,

    /// Duration in seconds. `None` lets the timeline builder apply its default.
    pub duration_seconds: Option<f64>,

    /// Provenance of `duration_seconds`.
    pub status: AssetStatus,
}

impl AudioAsset {
    /// A measured clip.
    pub fn probed(row_index: u32, file_path: impl Into<PathBuf>, duration_seconds: f64) -> Self {
        Self {
            row_index,
            file_path: Some(file_path.into()),
            duration_seconds: Some(duration_seconds),
            status: AssetStatus::Probed,
        }
    }

    /// A row without a clip, carrying the fallback duration.
    pub fn missing(row_index: u32, default_duration_seconds: f64) -> Self {
        Self {
            row_index,
            file_path: None,
            duration_seconds: Some(default_duration_seconds),
            status: AssetStatus::Missing,
        }
    }

    /// Whether the duration is a fallback rather than a measurement.
    pub fn is_degraded(&self) -> bool {
        self.status != AssetStatus::Probed
    }
}
