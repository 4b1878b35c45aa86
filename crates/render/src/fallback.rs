//! Prioritised export with fallback.
//!
//! Enabled backends are tried in ascending priority (ties keep configuration
//! order). Each attempt runs under its backend's deadline; an expired
//! deadline drops the render future, which cancels the backend's work.
//! Errors and timeouts are retried up to `retry_count` extra times, an
//! unavailable backend is skipped without recording an attempt, and the
//! first success ends the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use scriptreel_common::config::{AppConfig, BackendConfig, BackendKind};
use scriptreel_common::error::{ReelError, ReelResult};
use serde::{Deserialize, Serialize};

use crate::backend::{backend_for, RenderBackend, RenderError, RenderRequest};

/// One backend invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAttempt {
    pub backend_kind: BackendKind,

    /// 1-based attempt number for this backend.
    pub attempt: u32,

    pub succeeded: bool,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,

    pub elapsed_seconds: f64,
}

/// Outcome of a whole export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub success: bool,
    pub used_backend: Option<BackendKind>,
    pub output_path: Option<PathBuf>,
    pub attempts: Vec<ExportAttempt>,
}

impl ExportResult {
    /// Write as pretty JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> ReelResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Whether every recorded failure was a deadline expiry.
    pub fn all_timed_out(&self) -> bool {
        !self.attempts.is_empty()
            && self
                .attempts
                .iter()
                .all(|a| a.error_message.as_deref() == Some("timeout"))
    }
}

/// Export state machine: `Pending -> Trying -> (Succeeded | Exhausted)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Pending,
    Trying { backend: BackendKind, attempt: u32 },
    Succeeded { backend: BackendKind },
    Exhausted,
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Exhausted)
    }
}

/// Receives every state transition of an export run.
pub type StateObserver = Box<dyn Fn(ExportState) + Send + Sync>;

/// Per-backend report for `status()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    pub backend_kind: BackendKind,
    pub priority: i32,
    pub enabled: bool,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable_reason: Option<String>,
    pub timeout_seconds: f64,
    pub retry_count: u32,
}

struct BackendEntry {
    config: BackendConfig,
    backend: Arc<dyn RenderBackend>,
}

/// Tries render backends in priority order until one succeeds.
pub struct ExportFallbackManager {
    entries: Vec<BackendEntry>,
    preferred: Option<BackendKind>,
    observer: Option<StateObserver>,
}

impl std::fmt::Debug for ExportFallbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportFallbackManager")
            .field(
                "backends",
                &self.entries.iter().map(|e| &e.config).collect::<Vec<_>>(),
            )
            .field("preferred", &self.preferred)
            .finish()
    }
}

impl ExportFallbackManager {
    /// Pair each config with the backend of the same kind.
    ///
    /// Every configured kind needs a backend and may appear only once.
    pub fn new(
        configs: Vec<BackendConfig>,
        backends: Vec<Arc<dyn RenderBackend>>,
    ) -> ReelResult<Self> {
        let mut entries: Vec<BackendEntry> = Vec::with_capacity(configs.len());
        for config in configs {
            if entries
                .iter()
                .any(|e| e.config.backend_kind == config.backend_kind)
            {
                return Err(ReelError::config(format!(
                    "backend {} configured more than once",
                    config.backend_kind
                )));
            }
            let backend = backends
                .iter()
                .find(|b| b.kind() == config.backend_kind)
                .cloned()
                .ok_or_else(|| {
                    ReelError::config(format!("no implementation for backend {}", config.backend_kind))
                })?;
            entries.push(BackendEntry { config, backend });
        }
        entries.sort_by_key(|e| e.config.priority);

        Ok(Self {
            entries,
            preferred: None,
            observer: None,
        })
    }

    /// Build the chain configured in `config` with the concrete backends.
    pub fn from_config(config: &AppConfig) -> ReelResult<Self> {
        let backends = config
            .backends
            .iter()
            .map(|c| backend_for(c.backend_kind, &config.export))
            .collect();
        Self::new(config.backends.clone(), backends)
    }

    /// Try `kind` first regardless of its priority.
    pub fn with_preferred_backend(mut self, kind: Option<BackendKind>) -> Self {
        self.preferred = kind;
        self
    }

    pub fn with_observer(mut self, observer: StateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Enable or disable a configured backend. Returns `false` if the kind
    /// is not part of the chain.
    pub fn set_backend_enabled(&mut self, kind: BackendKind, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.config.backend_kind == kind) {
            Some(entry) => {
                entry.config.enabled = enabled;
                true
            }
            None => false,
        }
    }

    fn execution_order(&self) -> Vec<&BackendEntry> {
        let mut order: Vec<&BackendEntry> = Vec::with_capacity(self.entries.len());
        if let Some(preferred) = self.preferred {
            order.extend(self.entries.iter().filter(|e| e.config.backend_kind == preferred));
        }
        order.extend(
            self.entries
                .iter()
                .filter(|e| Some(e.config.backend_kind) != self.preferred),
        );
        order
    }

    /// Enabled backends in the order they would be tried.
    pub fn enabled_backends(&self) -> Vec<BackendKind> {
        self.execution_order()
            .into_iter()
            .filter(|e| e.config.enabled)
            .map(|e| e.config.backend_kind)
            .collect()
    }

    /// Configuration and availability of every backend, in execution order.
    pub async fn status(&self) -> Vec<BackendStatus> {
        let mut report = Vec::with_capacity(self.entries.len());
        for entry in self.execution_order() {
            let availability = entry.backend.check_available().await;
            report.push(BackendStatus {
                backend_kind: entry.config.backend_kind,
                priority: entry.config.priority,
                enabled: entry.config.enabled,
                available: availability.is_ok(),
                unavailable_reason: availability.err().map(|u| u.reason),
                timeout_seconds: entry.config.timeout_seconds,
                retry_count: entry.config.retry_count,
            });
        }
        report
    }

    fn notify(&self, state: ExportState) {
        tracing::debug!(?state, "Export state");
        if let Some(observer) = &self.observer {
            observer(state);
        }
    }

    /// Run the chain. Never fails: total exhaustion is an unsuccessful
    /// result carrying every attempt.
    pub async fn export(&self, request: &RenderRequest<'_>) -> ExportResult {
        self.notify(ExportState::Pending);
        let mut attempts = Vec::new();

        for entry in self.execution_order() {
            let config = &entry.config;
            let kind = config.backend_kind;
            if !config.enabled {
                tracing::debug!(backend = %kind, "Skipping disabled backend");
                continue;
            }

            match tokio::time::timeout(config.timeout(), entry.backend.check_available()).await {
                Ok(Ok(())) => {}
                Ok(Err(unavailable)) => {
                    tracing::warn!(backend = %kind, reason = %unavailable, "Skipping unavailable backend");
                    continue;
                }
                Err(_) => {
                    tracing::warn!(backend = %kind, "Availability check timed out, skipping backend");
                    continue;
                }
            }

            let max_attempts = config.max_attempts();
            for attempt in 1..=max_attempts {
                self.notify(ExportState::Trying {
                    backend: kind,
                    attempt,
                });
                tracing::info!(backend = %kind, attempt, max_attempts, "Trying render backend");

                let started = Instant::now();
                let outcome = match tokio::time::timeout(config.timeout(), entry.backend.render(request)).await {
                    Ok(Ok(path)) if path.exists() => Ok(path),
                    Ok(Ok(path)) => Err(RenderError::NoOutput { path }),
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(RenderError::Timeout {
                        after: config.timeout(),
                    }),
                };
                let elapsed_seconds = started.elapsed().as_secs_f64();

                match outcome {
                    Ok(path) => {
                        tracing::info!(
                            backend = %kind,
                            attempt,
                            elapsed_secs = elapsed_seconds,
                            output = %path.display(),
                            "Export succeeded"
                        );
                        attempts.push(ExportAttempt {
                            backend_kind: kind,
                            attempt,
                            succeeded: true,
                            error_message: None,
                            elapsed_seconds,
                        });
                        self.notify(ExportState::Succeeded { backend: kind });
                        return ExportResult {
                            success: true,
                            used_backend: Some(kind),
                            output_path: Some(path),
                            attempts,
                        };
                    }
                    Err(e) => {
                        tracing::warn!(
                            backend = %kind,
                            attempt,
                            elapsed_secs = elapsed_seconds,
                            error = %e,
                            "Render attempt failed"
                        );
                        attempts.push(ExportAttempt {
                            backend_kind: kind,
                            attempt,
                            succeeded: false,
                            error_message: Some(e.to_string()),
                            elapsed_seconds,
                        });
                        if !e.is_retryable() {
                            break;
                        }
                        if attempt < max_attempts && !config.retry_delay().is_zero() {
                            tokio::time::sleep(config.retry_delay()).await;
                        }
                    }
                }
            }
        }

        tracing::error!(attempts = attempts.len(), "All render backends failed");
        self.notify(ExportState::Exhausted);
        ExportResult {
            success: false,
            used_backend: None,
            output_path: None,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use scriptreel_common::config::QualityPreset;
    use scriptreel_model::{TimelinePlan, TimelineSegment};

    use crate::backend::Unavailable;

    enum Behaviour {
        Fail,
        Succeed,
        Sleep(Duration),
        Unavailable,
        SucceedWithoutFile,
    }

    struct MockBackend {
        kind: BackendKind,
        behaviour: Behaviour,
        calls: AtomicU32,
    }

    impl MockBackend {
        fn new(kind: BackendKind, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                kind,
                behaviour,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RenderBackend for MockBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn check_available(&self) -> Result<(), Unavailable> {
            match self.behaviour {
                Behaviour::Unavailable => Err(Unavailable::new("not configured")),
                _ => Ok(()),
            }
        }

        async fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let path = request.output_dir.join(format!("{}.mp4", self.kind));
            match &self.behaviour {
                Behaviour::Fail => Err(RenderError::failed("boom")),
                Behaviour::Succeed => {
                    std::fs::write(&path, b"video").unwrap();
                    Ok(path)
                }
                Behaviour::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(path)
                }
                Behaviour::Unavailable => Err(Unavailable::new("not configured").into()),
                Behaviour::SucceedWithoutFile => Ok(path),
            }
        }
    }

    fn plan() -> TimelinePlan {
        TimelinePlan::from_parts(
            vec![TimelineSegment {
                segment_id: 1,
                row_index: 1,
                speaker: "A".into(),
                text: "Hello".into(),
                start_seconds: 0.0,
                duration_seconds: 1.0,
                audio_path: None,
            }],
            BTreeMap::new(),
        )
        .unwrap()
    }

    fn request<'a>(plan: &'a TimelinePlan, dir: &'a Path) -> RenderRequest<'a> {
        RenderRequest {
            plan,
            audio_dir: None,
            output_dir: dir,
            quality: QualityPreset::default(),
        }
    }

    fn config(kind: BackendKind, priority: i32) -> BackendConfig {
        BackendConfig::new(kind, priority, 30.0)
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let a = MockBackend::new(BackendKind::RemoteApi, Behaviour::Fail);
        let b = MockBackend::new(BackendKind::EditorAutomation, Behaviour::Succeed);
        let c = MockBackend::new(BackendKind::Composer, Behaviour::Succeed);
        let manager = ExportFallbackManager::new(
            vec![
                config(BackendKind::Composer, 3),
                config(BackendKind::RemoteApi, 1),
                config(BackendKind::EditorAutomation, 2),
            ],
            vec![a.clone(), b.clone(), c.clone()],
        )
        .unwrap();

        let result = manager.export(&request(&plan, dir.path())).await;
        assert!(result.success);
        assert_eq!(result.used_backend, Some(BackendKind::EditorAutomation));
        assert_eq!(result.attempts.len(), 2);
        assert_eq!(result.attempts[0].backend_kind, BackendKind::RemoteApi);
        assert!(!result.attempts[0].succeeded);
        assert_eq!(result.attempts[0].error_message.as_deref(), Some("boom"));
        assert!(result.attempts[1].succeeded);
        assert_eq!(c.calls(), 0);
        assert_eq!(
            result.output_path,
            Some(dir.path().join("editor_automation.mp4"))
        );
    }

    #[tokio::test]
    async fn test_timeout_cancels_slow_backend() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let slow = MockBackend::new(BackendKind::RemoteApi, Behaviour::Sleep(Duration::from_secs(5)));
        let fast = MockBackend::new(BackendKind::Composer, Behaviour::Succeed);
        let manager = ExportFallbackManager::new(
            vec![
                BackendConfig::new(BackendKind::RemoteApi, 1, 1.0),
                config(BackendKind::Composer, 2),
            ],
            vec![slow, fast],
        )
        .unwrap();

        let started = Instant::now();
        let result = manager.export(&request(&plan, dir.path())).await;
        let wall = started.elapsed();

        assert!(result.success);
        assert_eq!(result.used_backend, Some(BackendKind::Composer));
        assert_eq!(result.attempts[0].error_message.as_deref(), Some("timeout"));
        assert!(result.attempts[0].elapsed_seconds < 2.0);
        assert!(wall < Duration::from_secs(3), "took {wall:?}");
    }

    #[tokio::test]
    async fn test_exhaustion_records_every_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let manager = ExportFallbackManager::new(
            vec![
                config(BackendKind::RemoteApi, 1).with_retries(2),
                config(BackendKind::EditorAutomation, 2),
                config(BackendKind::Composer, 3).with_retries(1),
            ],
            vec![
                MockBackend::new(BackendKind::RemoteApi, Behaviour::Fail),
                MockBackend::new(BackendKind::EditorAutomation, Behaviour::Fail),
                MockBackend::new(BackendKind::Composer, Behaviour::Fail),
            ],
        )
        .unwrap();

        let result = manager.export(&request(&plan, dir.path())).await;
        assert!(!result.success);
        assert_eq!(result.used_backend, None);
        assert_eq!(result.output_path, None);
        assert_eq!(result.attempts.len(), 3 + 1 + 2);
        let numbers: Vec<u32> = result.attempts.iter().map(|a| a.attempt).collect();
        assert_eq!(numbers, vec![1, 2, 3, 1, 1, 2]);
        assert!(!result.all_timed_out());
    }

    #[tokio::test]
    async fn test_disabled_and_unavailable_backends_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let disabled = MockBackend::new(BackendKind::RemoteApi, Behaviour::Succeed);
        let unavailable = MockBackend::new(BackendKind::EditorAutomation, Behaviour::Unavailable);
        let composer = MockBackend::new(BackendKind::Composer, Behaviour::Succeed);
        let manager = ExportFallbackManager::new(
            vec![
                config(BackendKind::RemoteApi, 1).disabled(),
                config(BackendKind::EditorAutomation, 2),
                config(BackendKind::Composer, 3),
            ],
            vec![disabled.clone(), unavailable.clone(), composer],
        )
        .unwrap();

        let result = manager.export(&request(&plan, dir.path())).await;
        assert!(result.success);
        assert_eq!(result.attempts.len(), 1);
        assert_eq!(result.used_backend, Some(BackendKind::Composer));
        assert_eq!(disabled.calls(), 0);
        assert_eq!(unavailable.calls(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_during_render_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();

        struct LateUnavailable(AtomicU32);

        #[async_trait::async_trait]
        impl RenderBackend for LateUnavailable {
            fn kind(&self) -> BackendKind {
                BackendKind::RemoteApi
            }
            async fn check_available(&self) -> Result<(), Unavailable> {
                Ok(())
            }
            async fn render(&self, _request: &RenderRequest<'_>) -> Result<PathBuf, RenderError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Err(Unavailable::new("token revoked").into())
            }
        }

        let backend = Arc::new(LateUnavailable(AtomicU32::new(0)));
        let manager = ExportFallbackManager::new(
            vec![config(BackendKind::RemoteApi, 1).with_retries(3)],
            vec![backend.clone()],
        )
        .unwrap();
        let result = manager.export(&request(&plan, dir.path())).await;
        assert!(!result.success);
        assert_eq!(result.attempts.len(), 1);
        assert_eq!(backend.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_without_output_file_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let manager = ExportFallbackManager::new(
            vec![config(BackendKind::Composer, 1)],
            vec![MockBackend::new(BackendKind::Composer, Behaviour::SucceedWithoutFile)],
        )
        .unwrap();
        let result = manager.export(&request(&plan, dir.path())).await;
        assert!(!result.success);
        assert!(result.attempts[0]
            .error_message
            .as_deref()
            .unwrap()
            .contains("does not exist"));
    }

    #[tokio::test]
    async fn test_preferred_backend_goes_first() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let remote = MockBackend::new(BackendKind::RemoteApi, Behaviour::Succeed);
        let composer = MockBackend::new(BackendKind::Composer, Behaviour::Succeed);
        let manager = ExportFallbackManager::new(
            vec![config(BackendKind::RemoteApi, 1), config(BackendKind::Composer, 2)],
            vec![remote.clone(), composer.clone()],
        )
        .unwrap()
        .with_preferred_backend(Some(BackendKind::Composer));

        assert_eq!(
            manager.enabled_backends(),
            vec![BackendKind::Composer, BackendKind::RemoteApi]
        );
        let result = manager.export(&request(&plan, dir.path())).await;
        assert_eq!(result.used_backend, Some(BackendKind::Composer));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let seen: Arc<Mutex<Vec<ExportState>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let manager = ExportFallbackManager::new(
            vec![config(BackendKind::RemoteApi, 1), config(BackendKind::Composer, 2)],
            vec![
                MockBackend::new(BackendKind::RemoteApi, Behaviour::Fail),
                MockBackend::new(BackendKind::Composer, Behaviour::Succeed),
            ],
        )
        .unwrap()
        .with_observer(Box::new(move |state: ExportState| sink.lock().unwrap().push(state)));

        manager.export(&request(&plan, dir.path())).await;
        let states = seen.lock().unwrap().clone();
        assert_eq!(
            states,
            vec![
                ExportState::Pending,
                ExportState::Trying {
                    backend: BackendKind::RemoteApi,
                    attempt: 1
                },
                ExportState::Trying {
                    backend: BackendKind::Composer,
                    attempt: 1
                },
                ExportState::Succeeded {
                    backend: BackendKind::Composer
                },
            ]
        );
        assert!(states.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_set_backend_enabled_and_status() {
        let mut manager = ExportFallbackManager::new(
            vec![config(BackendKind::RemoteApi, 1), config(BackendKind::Composer, 2)],
            vec![
                MockBackend::new(BackendKind::RemoteApi, Behaviour::Unavailable),
                MockBackend::new(BackendKind::Composer, Behaviour::Succeed),
            ],
        )
        .unwrap();

        assert!(manager.set_backend_enabled(BackendKind::Composer, false));
        assert!(!manager.set_backend_enabled(BackendKind::EditorAutomation, true));
        assert_eq!(manager.enabled_backends(), vec![BackendKind::RemoteApi]);

        let status = manager.status().await;
        assert_eq!(status.len(), 2);
        assert!(!status[0].available);
        assert_eq!(status[0].unavailable_reason.as_deref(), Some("not configured"));
        assert!(!status[1].enabled);
        assert!(status[1].available);
    }

    #[test]
    fn test_duplicate_or_unbacked_kinds_are_rejected() {
        let dup = ExportFallbackManager::new(
            vec![config(BackendKind::Composer, 1), config(BackendKind::Composer, 2)],
            vec![MockBackend::new(BackendKind::Composer, Behaviour::Succeed)],
        );
        assert!(dup.is_err());

        let missing = ExportFallbackManager::new(vec![config(BackendKind::Composer, 1)], vec![]);
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_result_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let result = ExportResult {
            success: false,
            used_backend: None,
            output_path: None,
            attempts: vec![ExportAttempt {
                backend_kind: BackendKind::EditorAutomation,
                attempt: 1,
                succeeded: false,
                error_message: Some("timeout".into()),
                elapsed_seconds: 1.0,
            }],
        };
        let path = dir.path().join("export_result.json");
        result.save_json(&path).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"usedBackend\": null"));
        assert!(json.contains("\"backendKind\": \"editor_automation\""));
        assert!(json.contains("\"errorMessage\": \"timeout\""));
        assert!(result.all_timed_out());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_backend_subprocess() {
        use crate::process::test_support::wait_until_gone;
        use crate::process::{spawn_logged, wait_with_lines};

        struct SleepyProcess(Arc<Mutex<Option<u32>>>);

        #[async_trait::async_trait]
        impl RenderBackend for SleepyProcess {
            fn kind(&self) -> BackendKind {
                BackendKind::EditorAutomation
            }
            async fn check_available(&self) -> Result<(), Unavailable> {
                Ok(())
            }
            async fn render(&self, request: &RenderRequest<'_>) -> Result<PathBuf, RenderError> {
                let mut cmd = tokio::process::Command::new("sleep");
                cmd.arg("30");
                let child = spawn_logged(&mut cmd, "sleep")?;
                *self.0.lock().unwrap() = child.id();
                wait_with_lines(child, "sleep", |_| {}).await?.into_result("sleep")?;
                Ok(request.output_dir.join("never.mp4"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let plan = plan();
        let pid = Arc::new(Mutex::new(None));
        let manager = ExportFallbackManager::new(
            vec![BackendConfig::new(BackendKind::EditorAutomation, 1, 0.5)],
            vec![Arc::new(SleepyProcess(pid.clone()))],
        )
        .unwrap();

        let result = manager.export(&request(&plan, dir.path())).await;
        assert!(!result.success);
        assert_eq!(result.attempts[0].error_message.as_deref(), Some("timeout"));

        let pid = (*pid.lock().unwrap()).expect("child was spawned");
        assert!(
            wait_until_gone(pid).await,
            "backend process {pid} survived its deadline"
        );
    }
}
