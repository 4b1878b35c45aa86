//! End-to-end timeline scenarios: CSV text and WAV clips in, plan and
//! subtitles out.

use std::path::Path;

use scriptreel_common::config::{SubtitleFormat, TimelineConfig};
use scriptreel_model::{parse_script, AssetStatus, TimelinePlan};
use scriptreel_timeline::{AudioAssetResolver, SubtitleEmitter, SymphoniaProbe, TimelineBuilder};

const SAMPLE_RATE: u32 = 16_000;

/// Write a silent 16-bit mono PCM WAV of the given length.
fn write_wav(path: &Path, seconds: f64) {
    let samples = (seconds * SAMPLE_RATE as f64).round() as u32;
    let data_len = samples * 2;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    bytes.extend_from_slice(&(SAMPLE_RATE * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    std::fs::write(path, bytes).unwrap();
}

fn build(csv: &str, audio_dir: Option<&Path>, config: &TimelineConfig) -> TimelinePlan {
    let script = parse_script(csv);
    let resolver = AudioAssetResolver::new(
        audio_dir.map(Path::to_path_buf),
        config,
        Box::new(SymphoniaProbe),
    );
    let assets = resolver.resolve_all(&script.rows);
    TimelineBuilder::new(config.clone())
        .build(&script.rows, &assets)
        .unwrap()
}

#[test]
fn test_symphonia_measures_generated_wav() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("001.wav");
    write_wav(&path, 2.0);
    let config = TimelineConfig::default();
    let resolver =
        AudioAssetResolver::new(Some(dir.path().to_path_buf()), &config, Box::new(SymphoniaProbe));
    let asset = resolver.resolve(1);
    assert_eq!(asset.status, AssetStatus::Probed);
    assert!((asset.duration_seconds.unwrap() - 2.0).abs() < 1e-6);
}

#[test]
fn test_csv_and_wav_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("001.wav"), 2.0);
    write_wav(&dir.path().join("002.wav"), 3.0);

    let config = TimelineConfig::default();
    let plan = build("Alice,Hello\nBob,Hi there\n", Some(dir.path()), &config);

    let segs = plan.segments();
    assert_eq!(segs.len(), 2);
    assert!((segs[0].duration_seconds - 2.0).abs() < 1e-6);
    assert!((segs[1].start_seconds - 2.0).abs() < 1e-6);
    assert!((plan.total_duration_seconds() - 5.0).abs() < 1e-6);

    let srt = SubtitleEmitter::default().emit(&plan, SubtitleFormat::Srt);
    assert!(srt.content.contains("1\n00:00:00,000 --> 00:00:02,000\nHello"));
    assert!(srt.content.contains("2\n00:00:02,000 --> 00:00:05,000\nHi there"));
}

#[test]
fn test_missing_audio_falls_back_to_default() {
    let dir = tempfile::tempdir().unwrap();
    let config = TimelineConfig::default();
    let plan = build("Alice,Hello\nBob,Hi there\n", Some(dir.path()), &config);

    let default = config.default_duration_secs;
    assert_eq!(plan.segments()[1].start_seconds, default);
    assert_eq!(plan.total_duration_seconds(), 2.0 * default);
}

#[test]
fn test_partial_audio_keeps_timeline_contiguous() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("002.wav"), 1.5);
    std::fs::write(dir.path().join("003.wav"), b"not a wav").unwrap();

    let config = TimelineConfig::default();
    let plan = build("A,one\nB,two\nC,three\n", Some(dir.path()), &config);
    let segs = plan.segments();
    let default = config.default_duration_secs;

    assert_eq!(segs[0].duration_seconds, default);
    assert!((segs[1].duration_seconds - 1.5).abs() < 1e-6);
    assert_eq!(segs[2].duration_seconds, default);
    assert!((segs[2].start_seconds - (default + 1.5)).abs() < 1e-6);
}

#[test]
fn test_identical_inputs_give_identical_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("001.wav"), 1.25);
    write_wav(&dir.path().join("002.wav"), 0.75);
    let csv = "Narrator,\"Once upon a time, in a land far away.\"\nHero,\"Let's go!\"\n";
    let config = TimelineConfig {
        max_chars_per_slide: 20,
        ..TimelineConfig::default()
    };

    let first = build(csv, Some(dir.path()), &config);
    let second = build(csv, Some(dir.path()), &config);
    assert_eq!(first.to_json_string().unwrap(), second.to_json_string().unwrap());

    let out = tempfile::tempdir().unwrap();
    let a = out.path().join("a.json");
    let b = out.path().join("b.json");
    first.save_json(&a).unwrap();
    second.save_json(&b).unwrap();
    assert_eq!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());

    let reloaded = TimelinePlan::load_json(&a).unwrap();
    assert_eq!(reloaded, first);
}

#[test]
fn test_long_text_split_scenario() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("001.wav"), 9.0);
    let config = TimelineConfig {
        max_chars_per_slide: 60,
        ..TimelineConfig::default()
    };
    let csv = format!("Reader,{}\n", "x".repeat(150));
    let plan = build(&csv, Some(dir.path()), &config);

    let subs = plan.sub_slides_for(1);
    assert_eq!(subs.len(), 3);
    let durations: Vec<f64> = subs.iter().map(|s| s.duration_seconds).collect();
    assert!((durations[0] - 3.6).abs() < 1e-3);
    assert!((durations[1] - 3.6).abs() < 1e-3);
    assert!((durations[2] - 1.8).abs() < 1e-3);
    assert!((durations.iter().sum::<f64>() - 9.0).abs() < 1e-3);

    let vtt = SubtitleEmitter::default().emit(&plan, SubtitleFormat::Vtt);
    assert_eq!(vtt.cue_count, 3);
    assert!(vtt.content.contains("00:00:03.600 --> 00:00:07.200"));
}

#[test]
fn test_written_plan_uses_camel_case_keys() {
    let config = TimelineConfig::default();
    let plan = build("Alice,Hello\n", None, &config);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timeline_plan.json");
    plan.save_json(&path).unwrap();

    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("\"totalDurationSeconds\""));
    assert!(json.contains("\"segmentId\""));
    assert!(!json.contains("\"subSlides\""));
}
