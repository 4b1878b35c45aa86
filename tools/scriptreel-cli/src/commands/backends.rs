//! Show the configured backend chain and which backends can run here.

use scriptreel_common::config::AppConfig;
use scriptreel_render::ExportFallbackManager;

pub async fn run(config: AppConfig, json: bool) -> anyhow::Result<()> {
    let manager = ExportFallbackManager::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Invalid backend chain: {e}"))?;
    let statuses = manager.status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    println!("Backend chain (priority order):");
    println!();
    for status in &statuses {
        let marker = match (status.enabled, status.available) {
            (true, true) => "[OK]",
            (false, _) => "[--]",
            (true, false) => "[!!]",
        };
        println!(
            "  {marker} {:<18} priority {:>3}  timeout {:>6.1}s  retries {}",
            status.backend_kind.as_str(),
            status.priority,
            status.timeout_seconds,
            status.retry_count
        );
        if !status.enabled {
            println!("       disabled");
        } else if let Some(reason) = &status.unavailable_reason {
            println!("       {reason}");
        }
    }

    let usable = statuses.iter().filter(|s| s.enabled && s.available).count();
    println!();
    if usable == 0 {
        println!("No backend can export on this machine.");
    } else {
        println!("{usable} of {} backends ready.", statuses.len());
    }
    Ok(())
}
