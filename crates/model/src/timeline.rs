//! Timeline plan types.
//!
//! A [`TimelinePlan`] is the backend-independent description of a video:
//! contiguous segments (one per script row) plus optional sub-slides for
//! segments whose text exceeds the slide budget. Plans are immutable once
//! constructed; [`TimelinePlan::from_parts`] is the only way in and it
//! enforces the invariants below.
//!
//! - `segments[0].start_seconds == 0`
//! - `segments[i + 1].start_seconds == segments[i].end_seconds()`
//! - sub-slide durations of a segment sum to the segment duration
//! - `total_duration_seconds` is the end of the last segment

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Tolerance for contiguity checks on plans loaded from disk.
pub const CONTIGUITY_TOLERANCE_SECS: f64 = 1e-9;

/// Tolerance for the sum of sub-slide durations against their parent.
pub const SPLIT_TOLERANCE_SECS: f64 = 1e-3;

/// One timed unit derived from a single script row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSegment {
    /// 1-based position in the plan.
    pub segment_id: u32,
    /// Source row index.
    pub row_index: u32,
    pub speaker: String,
    pub text: String,
    pub start_seconds: f64,
    pub duration_seconds: f64,
    /// Audio clip to play under this segment, if one was found.
    pub audio_path: Option<PathBuf>,
}

impl TimelineSegment {
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// A budget-sized fragment of a segment's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSlide {
    pub parent_segment_id: u32,
    /// 0-based position among the parent's sub-slides.
    pub order: u32,
    /// Number of sub-slides of the parent.
    pub count: u32,
    pub text: String,
    /// Absolute timeline position.
    pub start_seconds: f64,
    pub duration_seconds: f64,
    /// True for every fragment after the first.
    pub is_continuation: bool,
}

impl SubSlide {
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }
}

/// The complete, time-ordered description of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelinePlan {
    segments: Vec<TimelineSegment>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    sub_slides: BTreeMap<u32, Vec<SubSlide>>,
    total_duration_seconds: f64,
}

/// A single on-screen text interval, in presentation order.
///
/// Segments with sub-slides contribute one cue per sub-slide; segments with
/// empty text contribute none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineCue<'a> {
    pub segment_id: u32,
    pub speaker: &'a str,
    pub text: &'a str,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl TimelinePlan {
    /// Assemble a plan, validating every invariant.
    pub fn from_parts(
        segments: Vec<TimelineSegment>,
        sub_slides: BTreeMap<u32, Vec<SubSlide>>,
    ) -> Result<Self, ModelError> {
        let total_duration_seconds = segments.last().map(|s| s.end_seconds()).unwrap_or(0.0);
        let plan = Self {
            segments,
            sub_slides,
            total_duration_seconds,
        };
        plan.validate()?;
        Ok(plan)
    }

    pub fn segments(&self) -> &[TimelineSegment] {
        &self.segments
    }

    pub fn sub_slides(&self) -> &BTreeMap<u32, Vec<SubSlide>> {
        &self.sub_slides
    }

    /// Sub-slides of one segment, empty when the segment was not split.
    pub fn sub_slides_for(&self, segment_id: u32) -> &[SubSlide] {
        self.sub_slides
            .get(&segment_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_duration_seconds(&self) -> f64 {
        self.total_duration_seconds
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// On-screen text intervals in segment/sub-slide order.
    pub fn cues(&self) -> Vec<TimelineCue<'_>> {
        let mut cues = Vec::new();
        for segment in &self.segments {
            let subs = self.sub_slides_for(segment.segment_id);
            if subs.is_empty() {
                if segment.text.trim().is_empty() {
                    continue;
                }
                cues.push(TimelineCue {
                    segment_id: segment.segment_id,
                    speaker: &segment.speaker,
                    text: &segment.text,
                    start_seconds: segment.start_seconds,
                    end_seconds: segment.end_seconds(),
                });
            } else {
                let last = subs.len() - 1;
                for (i, sub) in subs.iter().enumerate() {
                    // The final fragment ends exactly where its parent does.
                    let end_seconds = if i == last {
                        segment.end_seconds()
                    } else {
                        subs[i + 1].start_seconds
                    };
                    cues.push(TimelineCue {
                        segment_id: segment.segment_id,
                        speaker: &segment.speaker,
                        text: &sub.text,
                        start_seconds: sub.start_seconds,
                        end_seconds,
                    });
                }
            }
        }
        cues
    }

    /// Check every plan invariant.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut expected_start = 0.0f64;
        let mut previous_id = 0u32;

        for segment in &self.segments {
            if segment.segment_id <= previous_id {
                return Err(ModelError::invalid(format!(
                    "segment ids must be strictly increasing, found {} after {}",
                    segment.segment_id, previous_id
                )));
            }
            previous_id = segment.segment_id;

            if !segment.duration_seconds.is_finite() || segment.duration_seconds < 0.0 {
                return Err(ModelError::invalid(format!(
                    "segment {} has invalid duration {}",
                    segment.segment_id, segment.duration_seconds
                )));
            }
            if (segment.start_seconds - expected_start).abs() > CONTIGUITY_TOLERANCE_SECS {
                return Err(ModelError::invalid(format!(
                    "segment {} starts at {} but the previous segment ends at {}",
                    segment.segment_id, segment.start_seconds, expected_start
                )));
            }
            expected_start = segment.end_seconds();
        }

        if (self.total_duration_seconds - expected_start).abs() > CONTIGUITY_TOLERANCE_SECS {
            return Err(ModelError::invalid(format!(
                "total duration {} does not match timeline end {}",
                self.total_duration_seconds, expected_start
            )));
        }

        for (segment_id, subs) in &self.sub_slides {
            let parent = self
                .segments
                .iter()
                .find(|s| s.segment_id == *segment_id)
                .ok_or_else(|| {
                    ModelError::invalid(format!("sub-slides reference unknown segment {segment_id}"))
                })?;

            let count = subs.len() as u32;
            let mut sum = 0.0;
            for (i, sub) in subs.iter().enumerate() {
                if sub.parent_segment_id != *segment_id || sub.order != i as u32 || sub.count != count
                {
                    return Err(ModelError::invalid(format!(
                        "sub-slide {i} of segment {segment_id} has inconsistent numbering"
                    )));
                }
                if !sub.duration_seconds.is_finite() || sub.duration_seconds < 0.0 {
                    return Err(ModelError::invalid(format!(
                        "sub-slide {i} of segment {segment_id} has invalid duration"
                    )));
                }
                sum += sub.duration_seconds;
            }
            if (sum - parent.duration_seconds).abs() > SPLIT_TOLERANCE_SECS {
                return Err(ModelError::invalid(format!(
                    "sub-slides of segment {segment_id} last {sum}s, parent lasts {}s",
                    parent.duration_seconds
                )));
            }
        }

        Ok(())
    }

    /// Pretty JSON for external editing tools. Identical plans serialize to
    /// identical bytes.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the plan artifact.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ModelError> {
        let path = path.as_ref();
        let json = self.to_json_string().map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ModelError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, json).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Read and validate a plan artifact.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ModelError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let plan: Self = serde_json::from_str(&json).map_err(|e| ModelError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        plan.validate()?;
        Ok(plan)
    }
}

/// Errors that can occur when working with model artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid timeline plan: {message}")]
    ValidationError { message: String },
}

impl From<ModelError> for scriptreel_common::ReelError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::IoError { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                Self::FileNotFound { path }
            }
            parse @ ModelError::ParseError { .. } => Self::parse(parse.to_string()),
            other => Self::timeline(other.to_string()),
        }
    }
}

impl ModelError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}
