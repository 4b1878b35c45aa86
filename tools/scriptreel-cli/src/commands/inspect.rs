//! Inspect a timeline plan: a saved `timeline_plan.json` or a script built on the fly.

use std::path::PathBuf;

use scriptreel_common::config::AppConfig;
use scriptreel_model::{SubSlide, TimelinePlan};
use scriptreel_render::build_timeline;

pub fn run(
    config: AppConfig,
    path: PathBuf,
    audio_dir: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let is_plan = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let (plan, warnings) = if is_plan {
        let plan = TimelinePlan::load_json(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load plan: {e}"))?;
        (plan, Vec::new())
    } else {
        let built = build_timeline(&config, &path, audio_dir.as_deref())
            .map_err(|e| anyhow::anyhow!("Failed to build timeline: {e}"))?;
        (built.plan, built.warnings)
    };

    if json {
        println!("{}", plan.to_json_string()?);
        return Ok(());
    }

    println!("Timeline: {}", path.display());
    println!("  Segments: {}", plan.segments().len());
    println!("  Duration: {:.3}s", plan.total_duration_seconds());
    println!();
    println!(
        "  {:>4}  {:>4}  {:>9}  {:>9}  {:<12}  {}",
        "ID", "ROW", "START", "DUR", "SPEAKER", "TEXT"
    );
    for segment in plan.segments() {
        println!(
            "  {:>4}  {:>4}  {:>9.3}  {:>9.3}  {:<12}  {}",
            segment.segment_id,
            segment.row_index,
            segment.start_seconds,
            segment.duration_seconds,
            truncate(&segment.speaker, 12),
            truncate(&segment.text, 48),
        );
        if segment.audio_path.is_none() {
            println!("  {:>4}  {:>4}  (no audio)", "", "");
        }
        for slide in plan.sub_slides_for(segment.segment_id) {
            println!(
                "  {:>4}  {:>4}  {:>9.3}  {:>9.3}  {:<12}  {}",
                "",
                slide_position(slide),
                slide.start_seconds,
                slide.duration_seconds,
                "",
                truncate(&slide.text, 48),
            );
        }
    }

    let split = plan.sub_slides().len();
    let fragments: usize = plan.sub_slides().values().map(Vec::len).sum();
    println!();
    println!("  Split segments: {split} ({fragments} sub-slides)");
    println!("  Subtitle cues: {}", plan.cues().len());

    for warning in &warnings {
        println!("  [WARN] {warning}");
    }
    Ok(())
}

/// 1-based "n/total" label for a sub-slide.
fn slide_position(slide: &SubSlide) -> String {
    format!("{}/{}", slide.order + 1, slide.count)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slide_position_is_one_based() {
        let slides: Vec<String> = (0..3)
            .map(|order| {
                slide_position(&SubSlide {
                    parent_segment_id: 1,
                    order,
                    count: 3,
                    text: "part".into(),
                    start_seconds: f64::from(order),
                    duration_seconds: 1.0,
                    is_continuation: order > 0,
                })
            })
            .collect();
        assert_eq!(slides, vec!["1/3", "2/3", "3/3"]);
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 12), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("日本語のテキストです", 6), "日本語...");
    }
}
