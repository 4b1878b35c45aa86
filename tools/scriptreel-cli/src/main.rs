//! ScriptReel CLI: turn a speaker/text script and per-line audio into a
//! timeline, subtitles, and a rendered video.
//!
//! Usage:
//!   scriptreel build <SCRIPT>      Build the timeline plan and subtitles
//!   scriptreel export <SCRIPT>     Build, then render through the backend chain
//!   scriptreel inspect <PATH>      Show a plan (JSON) or a script's timeline
//!   scriptreel backends            Show the backend chain and availability
//!   scriptreel init-config         Write the default configuration file

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scriptreel_common::config::{AppConfig, BackendKind, QualityPreset, SubtitleFormat};

mod commands;

#[derive(Parser)]
#[command(
    name = "scriptreel",
    about = "Script-to-video timelines, subtitles, and exports",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (defaults to the user config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the timeline plan and subtitle tracks
    Build {
        /// Script file (speaker,text per line)
        script: PathBuf,

        /// Directory with per-line audio clips (001.wav, 002.wav, ...)
        #[arg(short, long)]
        audio_dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        output: PathBuf,

        /// Maximum characters per slide before splitting
        #[arg(long)]
        max_chars: Option<usize>,

        /// Subtitle formats to write (repeatable): srt, vtt, txt
        #[arg(long = "format")]
        formats: Vec<SubtitleFormat>,

        /// Prefix subtitle cues with the speaker name
        #[arg(long)]
        speaker: bool,
    },

    /// Build, then render the video through the backend chain
    Export {
        /// Script file (speaker,text per line)
        script: PathBuf,

        /// Directory with per-line audio clips
        #[arg(short, long)]
        audio_dir: Option<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = "out")]
        output: PathBuf,

        /// Quality preset: 720p, 1080p, 2160p
        #[arg(short, long)]
        quality: Option<QualityPreset>,

        /// Try this backend first: composer, editor_automation, remote_api
        #[arg(long)]
        prefer: Option<BackendKind>,

        /// Disable a backend for this run (repeatable)
        #[arg(long)]
        disable: Vec<BackendKind>,

        /// Maximum characters per slide before splitting
        #[arg(long)]
        max_chars: Option<usize>,
    },

    /// Show a timeline plan, from a saved plan or a script
    Inspect {
        /// `timeline_plan.json` or a script file
        path: PathBuf,

        /// Audio directory when inspecting a script
        #[arg(short, long)]
        audio_dir: Option<PathBuf>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the backend chain and which backends are available
    Backends {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Destination (defaults to the user config location)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display())),
        None => Ok(AppConfig::load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    scriptreel_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Build {
            script,
            audio_dir,
            output,
            max_chars,
            formats,
            speaker,
        } => {
            if let Some(max_chars) = max_chars {
                config.timeline.max_chars_per_slide = max_chars;
            }
            if !formats.is_empty() {
                config.subtitles.formats = formats;
            }
            if speaker {
                config.subtitles.include_speaker = true;
            }
            commands::build::run(config, script, audio_dir, output).await
        }
        Commands::Export {
            script,
            audio_dir,
            output,
            quality,
            prefer,
            disable,
            max_chars,
        } => {
            if let Some(quality) = quality {
                config.export.quality = quality;
            }
            if let Some(max_chars) = max_chars {
                config.timeline.max_chars_per_slide = max_chars;
            }
            commands::export::run(config, script, audio_dir, output, prefer, disable).await
        }
        Commands::Inspect {
            path,
            audio_dir,
            json,
        } => commands::inspect::run(config, path, audio_dir, json),
        Commands::Backends { json } => commands::backends::run(config, json).await,
        Commands::InitConfig { path, force } => commands::init_config::run(path, force),
    }
}
