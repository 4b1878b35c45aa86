//! Timeline construction.
//!
//! Rows are laid end to end starting at zero. Each row becomes exactly one
//! segment whose duration comes from its audio asset (or the configured
//! default). Rows whose text exceeds the slide budget additionally get
//! sub-slides. Structural corruption in the inputs is a hard error: a
//! corrupt plan must never reach a render backend.

use std::collections::{BTreeMap, HashMap, HashSet};

use scriptreel_common::config::TimelineConfig;
use scriptreel_common::error::ReelError;
use scriptreel_model::{AudioAsset, ModelError, ScriptRow, TimelinePlan, TimelineSegment};

use crate::splitter::split_segment;

/// Build invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("Duplicate script row index {index}")]
    DuplicateRowIndex { index: u32 },

    #[error("Duplicate audio asset for row {index}")]
    DuplicateAssetIndex { index: u32 },

    #[error("Row {row_index} has invalid duration {duration}")]
    InvalidDuration { row_index: u32, duration: f64 },

    #[error("Invalid timeline configuration: {message}")]
    InvalidConfig { message: String },

    #[error(transparent)]
    Plan(#[from] ModelError),
}

impl From<TimelineError> for ReelError {
    fn from(e: TimelineError) -> Self {
        ReelError::timeline(e.to_string())
    }
}

/// Composes rows and assets into a [`TimelinePlan`].
#[derive(Debug, Clone)]
pub struct TimelineBuilder {
    config: TimelineConfig,
}

impl TimelineBuilder {
    pub fn new(config: TimelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Build the plan. Assets are joined to rows by `row_index`; rows without
    /// an asset get the default duration.
    pub fn build(
        &self,
        rows: &[ScriptRow],
        assets: &[AudioAsset],
    ) -> Result<TimelinePlan, TimelineError> {
        let max_chars = self.config.max_chars_per_slide;
        let default_duration = self.config.default_duration_secs;
        if max_chars == 0 {
            return Err(TimelineError::InvalidConfig {
                message: "max_chars_per_slide must be at least 1".to_string(),
            });
        }
        if !default_duration.is_finite() || default_duration <= 0.0 {
            return Err(TimelineError::InvalidConfig {
                message: format!("default duration must be finite and positive, got {default_duration}"),
            });
        }

        let mut seen_rows = HashSet::with_capacity(rows.len());
        for row in rows {
            if !seen_rows.insert(row.index) {
                return Err(TimelineError::DuplicateRowIndex { index: row.index });
            }
        }

        let mut by_row: HashMap<u32, &AudioAsset> = HashMap::with_capacity(assets.len());
        for asset in assets {
            if by_row.insert(asset.row_index, asset).is_some() {
                return Err(TimelineError::DuplicateAssetIndex {
                    index: asset.row_index,
                });
            }
            if !seen_rows.contains(&asset.row_index) {
                tracing::debug!(row = asset.row_index, "Ignoring asset without a script row");
            }
        }

        let mut segments = Vec::with_capacity(rows.len());
        let mut sub_slides = BTreeMap::new();
        let mut cursor_seconds = 0.0f64;

        for (position, row) in rows.iter().enumerate() {
            let asset = by_row.get(&row.index);
            let duration = asset
                .and_then(|a| a.duration_seconds)
                .unwrap_or(default_duration);
            if !duration.is_finite() || duration < 0.0 {
                return Err(TimelineError::InvalidDuration {
                    row_index: row.index,
                    duration,
                });
            }

            let segment_id = position as u32 + 1;
            if row.text.chars().count() > max_chars {
                let subs = split_segment(segment_id, &row.text, cursor_seconds, duration, max_chars);
                if subs.len() > 1 {
                    tracing::debug!(
                        segment = segment_id,
                        sub_slides = subs.len(),
                        "Split long segment"
                    );
                    sub_slides.insert(segment_id, subs);
                }
            }

            segments.push(TimelineSegment {
                segment_id,
                row_index: row.index,
                speaker: row.speaker.clone(),
                text: row.text.clone(),
                start_seconds: cursor_seconds,
                duration_seconds: duration,
                audio_path: asset.and_then(|a| a.file_path.clone()),
            });
            cursor_seconds += duration;
        }

        let plan = TimelinePlan::from_parts(segments, sub_slides)?;
        tracing::info!(
            segments = plan.segments().len(),
            split_segments = plan.sub_slides().len(),
            total_secs = plan.total_duration_seconds(),
            "Built timeline plan"
        );
        Ok(plan)
    }
}
