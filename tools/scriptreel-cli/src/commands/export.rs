//! Build the timeline, then render it through the backend chain.

use std::path::PathBuf;

use scriptreel_common::config::{AppConfig, BackendKind};
use scriptreel_render::{run_pipeline, ExportFallbackManager, ExportState, PipelineInputs};

pub async fn run(
    config: AppConfig,
    script: PathBuf,
    audio_dir: Option<PathBuf>,
    output: PathBuf,
    prefer: Option<BackendKind>,
    disable: Vec<BackendKind>,
) -> anyhow::Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;
    println!("Exporting script: {}", script.display());
    println!("  Output: {}", output.display());
    println!("  Quality: {}", config.export.quality.as_str());

    let mut manager = ExportFallbackManager::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Invalid backend chain: {e}"))?
        .with_preferred_backend(prefer)
        .with_observer(Box::new(|state: ExportState| {
            if let ExportState::Trying { backend, attempt } = state {
                println!("  Trying {backend} (attempt {attempt})...");
            }
        }));
    for kind in disable {
        if !manager.set_backend_enabled(kind, false) {
            tracing::warn!(backend = %kind, "Backend is not configured, nothing to disable");
        }
    }

    let inputs = PipelineInputs {
        script_path: script,
        audio_dir,
        output_dir: output,
    };
    let report = run_pipeline(&config, &inputs, Some(&manager))
        .await
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;

    super::print_artifacts(&report);

    let Some(export) = &report.export else {
        return Ok(());
    };
    println!();
    println!("Attempts:");
    for attempt in &export.attempts {
        println!(
            "  [{}] {} #{} ({:.2}s){}",
            if attempt.succeeded { "OK" } else { "FAIL" },
            attempt.backend_kind,
            attempt.attempt,
            attempt.elapsed_seconds,
            attempt
                .error_message
                .as_deref()
                .map(|m| format!(": {m}"))
                .unwrap_or_default()
        );
    }
    if let Some(path) = &report.export_result_path {
        println!("  Result: {}", path.display());
    }

    match (&export.used_backend, &export.output_path) {
        (Some(backend), Some(path)) if export.success => {
            println!();
            println!("Export complete via {backend}: {}", path.display());
            Ok(())
        }
        _ => {
            let reason = if export.attempts.is_empty() {
                "no backend was enabled and available"
            } else if export.all_timed_out() {
                "every attempt timed out"
            } else {
                "every backend failed"
            };
            Err(anyhow::anyhow!("Export failed: {reason}"))
        }
    }
}
