//! Scripted automation of a third-party video editor.
//!
//! Each attempt gets a fresh, timestamped workspace holding the plan, the
//! project file and a short run sheet for doing the export by hand. The
//! configured automation program is then run against that workspace and
//! must leave the finished video at the expected output path.

use std::path::{Path, PathBuf};

use scriptreel_common::config::{BackendKind, EditorSettings};
use tokio::process::Command;

use crate::backend::{RenderBackend, RenderError, RenderRequest, Unavailable};
use crate::process::{clear_stale_output, command_exists, spawn_logged, wait_with_lines};

const PLAN_FILE: &str = "timeline_plan.json";
const INSTRUCTIONS_FILE: &str = "RUN_INSTRUCTIONS.txt";
const METADATA_FILE: &str = "render_metadata.json";

/// Drives an external editor through an automation command.
#[derive(Debug, Clone)]
pub struct EditorAutomationBackend {
    settings: EditorSettings,
}

/// Paths substituted into the automation arguments.
#[derive(Debug, Clone)]
struct Workspace {
    project_dir: PathBuf,
    project_file: PathBuf,
    plan_path: PathBuf,
    output_path: PathBuf,
}

impl EditorAutomationBackend {
    pub fn new(settings: EditorSettings) -> Self {
        Self { settings }
    }

    fn prepare_workspace(&self, request: &RenderRequest<'_>) -> Result<Workspace, RenderError> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let project_dir = request.output_dir.join(format!("editor_project_{stamp}"));
        std::fs::create_dir_all(&project_dir).map_err(|e| {
            RenderError::failed(format!("Failed to create {}: {e}", project_dir.display()))
        })?;

        let project_file = self.prepare_project_file(&project_dir);

        let plan_path = project_dir.join(PLAN_FILE);
        request
            .plan
            .save_json(&plan_path)
            .map_err(|e| RenderError::failed(e.to_string()))?;
        tracing::info!(path = %plan_path.display(), "Wrote editor timeline plan");

        let workspace = Workspace {
            project_dir,
            project_file,
            plan_path,
            output_path: request.output_dir.join(&self.settings.output_file_name),
        };
        self.write_instructions(&workspace, request);
        Ok(workspace)
    }

    /// Copy the project template, or leave an empty project file when the
    /// template is missing.
    fn prepare_project_file(&self, project_dir: &Path) -> PathBuf {
        let Some(template) = &self.settings.project_template else {
            return project_dir.join("project");
        };
        let file_name = template
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("project"));
        let project_file = project_dir.join(file_name);

        if template.is_file() {
            match std::fs::copy(template, &project_file) {
                Ok(_) => {
                    tracing::info!(path = %project_file.display(), "Copied editor project template");
                    return project_file;
                }
                Err(e) => {
                    tracing::warn!(error = %e, template = %template.display(), "Failed to copy project template");
                }
            }
        } else {
            tracing::warn!(template = %template.display(), "Editor project template not found");
        }
        if let Err(e) = std::fs::write(&project_file, b"") {
            tracing::warn!(error = %e, path = %project_file.display(), "Failed to create empty project file");
        }
        project_file
    }

    fn write_instructions(&self, workspace: &Workspace, request: &RenderRequest<'_>) {
        let program = self.settings.program.as_deref().unwrap_or("<automation program>");
        let command = self
            .substituted_args(workspace, request)
            .into_iter()
            .map(|a| format!("\"{a}\""))
            .collect::<Vec<_>>()
            .join(" ");
        let content = [
            "# Editor export".to_string(),
            format!("1. Open {} in the editor", workspace.project_file.display()),
            format!("2. Import the timeline from {}", workspace.plan_path.display()),
            "3. Adjust the timeline if needed".to_string(),
            format!("4. To automate the export run: {program} {command}"),
            format!("5. Export the video to {}", workspace.output_path.display()),
        ]
        .join("\n");

        let path = workspace.project_dir.join(INSTRUCTIONS_FILE);
        if let Err(e) = std::fs::write(&path, content) {
            tracing::warn!(error = %e, path = %path.display(), "Failed to write run instructions");
        }
    }

    fn substituted_args(&self, workspace: &Workspace, request: &RenderRequest<'_>) -> Vec<String> {
        let audio = request
            .audio_dir
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        self.settings
            .args
            .iter()
            .map(|arg| {
                arg.replace("{plan}", &workspace.plan_path.display().to_string())
                    .replace("{output}", &workspace.output_path.display().to_string())
                    .replace("{project_dir}", &workspace.project_dir.display().to_string())
                    .replace("{audio}", &audio)
                    .replace("{quality}", request.quality.as_str())
            })
            .collect()
    }

    fn write_metadata(&self, workspace: &Workspace, request: &RenderRequest<'_>) {
        let payload = serde_json::json!({
            "videoFile": workspace.output_path,
            "durationSeconds": request.plan.total_duration_seconds(),
            "quality": request.quality.as_str(),
            "createdAt": chrono::Utc::now().to_rfc3339(),
        });
        let path = workspace.project_dir.join(METADATA_FILE);
        let written = serde_json::to_string_pretty(&payload)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            tracing::warn!(error = %e, path = %path.display(), "Failed to write render metadata");
        }
    }
}

#[async_trait::async_trait]
impl RenderBackend for EditorAutomationBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::EditorAutomation
    }

    async fn check_available(&self) -> Result<(), Unavailable> {
        let Some(program) = &self.settings.program else {
            return Err(Unavailable::new("no editor automation program configured"));
        };
        if command_exists(program) {
            Ok(())
        } else {
            Err(Unavailable::new(format!("{program} not found")))
        }
    }

    async fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError> {
        let program = self
            .settings
            .program
            .clone()
            .ok_or_else(|| Unavailable::new("no editor automation program configured"))?;

        let workspace = self.prepare_workspace(request)?;
        let args = self.substituted_args(&workspace, request);
        clear_stale_output(&workspace.output_path)?;

        let mut cmd = Command::new(&program);
        cmd.args(&args).current_dir(&workspace.project_dir);
        let child = spawn_logged(&mut cmd, &program)?;
        let outcome = wait_with_lines(child, &program, |line| {
            tracing::debug!(output = line, "Editor automation output");
        })
        .await?;
        outcome.into_result(&program)?;

        if !workspace.output_path.is_file() {
            return Err(RenderError::NoOutput {
                path: workspace.output_path,
            });
        }
        self.write_metadata(&workspace, request);
        Ok(workspace.output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use scriptreel_common::config::QualityPreset;
    use scriptreel_model::{TimelinePlan, TimelineSegment};

    fn plan() -> TimelinePlan {
        TimelinePlan::from_parts(
            vec![TimelineSegment {
                segment_id: 1,
                row_index: 1,
                speaker: "Alice".into(),
                text: "Hello".into(),
                start_seconds: 0.0,
                duration_seconds: 2.0,
                audio_path: None,
            }],
            BTreeMap::new(),
        )
        .unwrap()
    }

    fn request<'a>(plan: &'a TimelinePlan, dir: &'a Path) -> RenderRequest<'a> {
        RenderRequest {
            plan,
            audio_dir: Some(Path::new("/audio")),
            output_dir: dir,
            quality: QualityPreset::Hd720,
        }
    }

    #[tokio::test]
    async fn test_unconfigured_program_is_unavailable() {
        let backend = EditorAutomationBackend::new(EditorSettings::default());
        let err = backend.check_available().await.unwrap_err();
        assert!(err.reason.contains("no editor automation program"));
    }

    #[test]
    fn test_argument_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let backend = EditorAutomationBackend::new(EditorSettings {
            program: Some("automate".into()),
            args: vec![
                "--plan={plan}".into(),
                "{output}".into(),
                "{audio}".into(),
                "{quality}".into(),
            ],
            ..EditorSettings::default()
        });
        let req = request(&plan, dir.path());
        let workspace = backend.prepare_workspace(&req).unwrap();
        let args = backend.substituted_args(&workspace, &req);

        assert_eq!(args[0], format!("--plan={}", workspace.plan_path.display()));
        assert_eq!(args[1], dir.path().join("editor_output.mp4").display().to_string());
        assert_eq!(args[2], "/audio");
        assert_eq!(args[3], "720p");
        assert!(workspace.plan_path.is_file());
        assert!(workspace.project_dir.join(INSTRUCTIONS_FILE).is_file());
    }

    #[test]
    fn test_template_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.proj");
        std::fs::write(&template, b"template body").unwrap();
        let plan = plan();
        let backend = EditorAutomationBackend::new(EditorSettings {
            project_template: Some(template),
            ..EditorSettings::default()
        });
        let out = dir.path().join("out");
        let workspace = backend.prepare_workspace(&request(&plan, &out)).unwrap();
        assert_eq!(
            std::fs::read(&workspace.project_file).unwrap(),
            b"template body"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_zero_without_output_is_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let backend = EditorAutomationBackend::new(EditorSettings {
            program: Some("true".into()),
            args: vec![],
            ..EditorSettings::default()
        });
        let err = backend.render(&request(&plan, dir.path())).await.unwrap_err();
        assert!(matches!(err, RenderError::NoOutput { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_output_from_an_earlier_run_does_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("editor_output.mp4");
        std::fs::write(&stale, b"stale from yesterday").unwrap();

        let plan = plan();
        let backend = EditorAutomationBackend::new(EditorSettings {
            program: Some("true".into()),
            args: vec![],
            ..EditorSettings::default()
        });
        let err = backend.render(&request(&plan, dir.path())).await.unwrap_err();
        assert!(matches!(err, RenderError::NoOutput { ref path } if *path == stale));
        assert!(!stale.exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_deadline_kills_helpers_started_by_the_program() {
        use crate::process::test_support::wait_until_gone;

        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("helper.pid");
        let plan = plan();
        let backend = EditorAutomationBackend::new(EditorSettings {
            program: Some("sh".into()),
            args: vec![
                "-c".into(),
                "sleep 30 & echo $! > \"$0\"; wait".into(),
                pid_file.display().to_string(),
            ],
            ..EditorSettings::default()
        });

        let req = request(&plan, dir.path());
        let outcome =
            tokio::time::timeout(std::time::Duration::from_millis(500), backend.render(&req)).await;
        assert!(outcome.is_err(), "render should still be running at the deadline");

        let helper: u32 = std::fs::read_to_string(&pid_file)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(
            wait_until_gone(helper).await,
            "helper {helper} outlived the cancelled render"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_program_writing_output_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let backend = EditorAutomationBackend::new(EditorSettings {
            program: Some("sh".into()),
            args: vec!["-c".into(), "echo video > \"$0\"".into(), "{output}".into()],
            ..EditorSettings::default()
        });
        let path = backend.render(&request(&plan, dir.path())).await.unwrap();
        assert_eq!(path, dir.path().join("editor_output.mp4"));
        assert!(path.is_file());
    }
}
