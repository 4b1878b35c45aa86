//! Subtitle tracks in SRT, WebVTT and plain-text cue-list formats.
//!
//! Every format is rendered from the same cue list, and each cue time is
//! rounded to whole milliseconds exactly once. Formats with coarser precision
//! truncate that millisecond value, so two tracks of the same plan can never
//! disagree about where a cue starts.

use std::path::{Path, PathBuf};

use scriptreel_common::config::{SubtitleConfig, SubtitleFormat};
use scriptreel_common::error::{ReelError, ReelResult};
use scriptreel_model::{TimelineCue, TimelinePlan};

/// A cue boundary in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CueTime(u64);

impl CueTime {
    pub fn from_secs(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self(0);
        }
        Self((secs * 1000.0).round() as u64)
    }

    pub fn millis(&self) -> u64 {
        self.0
    }

    fn parts(&self) -> (u64, u64, u64, u64) {
        let total_ms = self.0;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let seconds = (total_ms % 60_000) / 1000;
        let millis = total_ms % 1000;
        (hours, minutes, seconds, millis)
    }

    /// `HH:MM:SS,mmm`
    pub fn srt(&self) -> String {
        let (h, m, s, ms) = self.parts();
        format!("{h:02}:{m:02}:{s:02},{ms:03}")
    }

    /// `HH:MM:SS.mmm`
    pub fn vtt(&self) -> String {
        let (h, m, s, ms) = self.parts();
        format!("{h:02}:{m:02}:{s:02}.{ms:03}")
    }

    /// `HH:MM:SS`, truncated to the whole second.
    pub fn whole_seconds(&self) -> String {
        let (h, m, s, _) = self.parts();
        format!("{h:02}:{m:02}:{s:02}")
    }
}

/// One rendered subtitle track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub format: SubtitleFormat,
    pub content: String,
    pub cue_count: usize,
}

/// Renders a [`TimelinePlan`] into subtitle tracks.
#[derive(Debug, Clone, Default)]
pub struct SubtitleEmitter {
    include_speaker: bool,
}

struct Entry {
    number: usize,
    start: CueTime,
    end: CueTime,
    text: String,
}

impl SubtitleEmitter {
    pub fn new(include_speaker: bool) -> Self {
        Self { include_speaker }
    }

    pub fn from_config(config: &SubtitleConfig) -> Self {
        Self::new(config.include_speaker)
    }

    fn entries(&self, plan: &TimelinePlan) -> Vec<Entry> {
        plan.cues()
            .into_iter()
            .enumerate()
            .map(|(i, cue)| Entry {
                number: i + 1,
                start: CueTime::from_secs(cue.start_seconds),
                end: CueTime::from_secs(cue.end_seconds),
                text: self.cue_text(&cue),
            })
            .collect()
    }

    fn cue_text(&self, cue: &TimelineCue<'_>) -> String {
        let text = cue.text.trim();
        if self.include_speaker && !cue.speaker.is_empty() {
            format!("{}: {}", cue.speaker, text)
        } else {
            text.to_string()
        }
    }

    /// Render a single format.
    pub fn emit(&self, plan: &TimelinePlan, format: SubtitleFormat) -> SubtitleTrack {
        let entries = self.entries(plan);
        let mut content = String::new();

        match format {
            SubtitleFormat::Srt => {
                for e in &entries {
                    content.push_str(&format!("{}\n", e.number));
                    content.push_str(&format!("{} --> {}\n", e.start.srt(), e.end.srt()));
                    content.push_str(&e.text);
                    content.push_str("\n\n");
                }
            }
            SubtitleFormat::Vtt => {
                content.push_str("WEBVTT\n\n");
                for e in &entries {
                    content.push_str(&format!("{}\n", e.number));
                    content.push_str(&format!("{} --> {}\n", e.start.vtt(), e.end.vtt()));
                    content.push_str(&e.text);
                    content.push_str("\n\n");
                }
            }
            SubtitleFormat::Txt => {
                for e in &entries {
                    content.push_str(&format!(
                        "{} [{} --> {}] {}\n",
                        e.number,
                        e.start.whole_seconds(),
                        e.end.whole_seconds(),
                        e.text
                    ));
                }
            }
        }

        SubtitleTrack {
            format,
            content,
            cue_count: entries.len(),
        }
    }

    /// Render several formats from the same plan.
    pub fn emit_all(&self, plan: &TimelinePlan, formats: &[SubtitleFormat]) -> Vec<SubtitleTrack> {
        formats.iter().map(|f| self.emit(plan, *f)).collect()
    }

    /// Render and write `<stem>.<ext>` for each format into `dir`.
    pub fn write_tracks(
        &self,
        plan: &TimelinePlan,
        dir: &Path,
        stem: &str,
        formats: &[SubtitleFormat],
    ) -> ReelResult<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(formats.len());
        for track in self.emit_all(plan, formats) {
            let path = dir.join(format!("{stem}.{}", track.format.extension()));
            std::fs::write(&path, &track.content).map_err(|e| {
                ReelError::subtitle(format!("failed to write {}: {e}", path.display()))
            })?;
            tracing::info!(
                path = %path.display(),
                cues = track.cue_count,
                "Wrote subtitle track"
            );
            written.push(path);
        }
        Ok(written)
    }
}
