//! The backend engine: the stateful executor of one job.
//!
//! An engine is created by loading a plugin from the catalog, is assigned
//! exactly one role by the first role operation invoked on it, emits typed
//! events to its subscribers while the job runs, reaches `Finished` exactly
//! once and is then done. Engines are not reused; a new job needs a new
//! engine.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use pakbroker_core::{
    Action, ErrorCode, ExitStatus, Filter, PackageGroup, RestartKind, Role, Status,
};

use crate::api::{EngineConfig, EngineEvent};
use crate::plugin::{PluginCatalog, PluginDescriptor};
use crate::pool::TaskPool;
use crate::protocol::{self, HelperEvent};
use crate::spawn::{HelperMessage, HelperSpawn, StreamKind};

/// Errors that make an engine unusable.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No plugin of that name is registered.
    #[error("plugin '{0}' not found")]
    PluginNotFound(String),
    /// The plugin module exists but exports no descriptor.
    #[error("plugin '{0}' has no descriptor")]
    MissingDescriptor(String),
}

struct JobState {
    role: Role,
    package_id: Option<String>,
    status: Status,
    exit: ExitStatus,
    assigned: bool,
    killable: bool,
    finished: bool,
    last_percentage: u8,
    last_sub_percentage: u8,
    last_package: Option<String>,
    helper: Option<HelperSpawn>,
}

struct EngineInner {
    plugin_name: String,
    descriptor: &'static PluginDescriptor,
    config: EngineConfig,
    event_tx: broadcast::Sender<EngineEvent>,
    state: Mutex<JobState>,
    tasks: TaskPool,
    started_at: Instant,
    destroyed: AtomicBool,
}

/// The pluggable execution unit that owns a single job.
///
/// Cheap to clone; clones share the same job.
#[derive(Clone)]
pub struct BackendEngine {
    inner: Arc<EngineInner>,
}

impl BackendEngine {
    /// Resolve `plugin_name` in the catalog, bind the descriptor and run its
    /// `initialize` hook. A failure here is fatal for the engine.
    pub fn load(
        catalog: &PluginCatalog,
        plugin_name: &str,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        debug!("loading plugin '{plugin_name}'");
        let descriptor = catalog.resolve(plugin_name)?;

        let (event_tx, _) = broadcast::channel(1024);
        let engine = Self {
            inner: Arc::new(EngineInner {
                plugin_name: plugin_name.to_string(),
                descriptor,
                config,
                event_tx,
                state: Mutex::new(JobState {
                    role: Role::Unknown,
                    package_id: None,
                    status: Status::Unknown,
                    exit: ExitStatus::Success,
                    assigned: false,
                    killable: false,
                    finished: false,
                    last_percentage: 0,
                    last_sub_percentage: 0,
                    last_package: None,
                    helper: None,
                }),
                tasks: TaskPool::new(),
                started_at: Instant::now(),
                destroyed: AtomicBool::new(false),
            }),
        };

        if let Some(initialize) = descriptor.initialize {
            initialize(&engine);
        }
        Ok(engine)
    }

    /// Name the plugin was loaded by; selects the helper-script directory.
    pub fn plugin_name(&self) -> &str {
        &self.inner.plugin_name
    }

    /// Subscribe to this engine's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Actions the loaded plugin advertises.
    pub fn actions(&self) -> BTreeSet<Action> {
        self.inner.descriptor.actions()
    }

    /// Package groups the loaded plugin advertises; empty when the plugin
    /// has no `get_groups` entry.
    pub fn groups(&self) -> Vec<PackageGroup> {
        match self.inner.descriptor.get_groups {
            Some(entry) => entry(self),
            None => Vec::new(),
        }
    }

    /// Search filters the loaded plugin advertises; empty when the plugin
    /// has no `get_filters` entry.
    pub fn filters(&self) -> Vec<Filter> {
        match self.inner.descriptor.get_filters {
            Some(entry) => entry(self),
            None => Vec::new(),
        }
    }

    /// Time since this engine was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.started_at.elapsed()
    }

    /// Last emitted percentage, for late subscribers.
    pub fn percentage(&self) -> u8 {
        self.inner.state.lock().unwrap().last_percentage
    }

    /// Last emitted sub-percentage, for late subscribers.
    pub fn sub_percentage(&self) -> u8 {
        self.inner.state.lock().unwrap().last_sub_percentage
    }

    /// Last emitted package identifier, for late subscribers.
    pub fn last_package(&self) -> Option<String> {
        self.inner.state.lock().unwrap().last_package.clone()
    }

    /// Current status tag; `None` until a role has been assigned.
    pub fn job_status(&self) -> Option<Status> {
        let state = self.inner.state.lock().unwrap();
        if !state.assigned {
            warn!("status requested but no role assigned");
            return None;
        }
        Some(state.status)
    }

    /// Assigned role and target identifier; `None` until a role has been
    /// assigned.
    pub fn job_role(&self) -> Option<(Role, Option<String>)> {
        let state = self.inner.state.lock().unwrap();
        if !state.assigned {
            warn!("role requested but no role assigned");
            return None;
        }
        Some((state.role, state.package_id.clone()))
    }

    // ---- emit API used by plugins and the helper stream ----

    /// Set the job status and notify subscribers.
    pub fn set_status(&self, status: Status) {
        self.inner.state.lock().unwrap().status = status;
        debug!("emit job-status-changed {status}");
        self.emit(EngineEvent::JobStatusChanged { status });
    }

    /// Report overall progress and notify subscribers.
    pub fn set_percentage(&self, percentage: u8) {
        self.inner.state.lock().unwrap().last_percentage = percentage;
        debug!("emit percentage-changed {percentage}");
        self.emit(EngineEvent::PercentageChanged { percentage });
    }

    /// Report sub-task progress and notify subscribers.
    pub fn set_sub_percentage(&self, percentage: u8) {
        self.inner.state.lock().unwrap().last_sub_percentage = percentage;
        debug!("emit sub-percentage-changed {percentage}");
        self.emit(EngineEvent::SubPercentageChanged { percentage });
    }

    /// Declare that this job will not report percentages.
    pub fn no_percentage_updates(&self) {
        debug!("emit no-percentage-updates");
        self.emit(EngineEvent::NoPercentageUpdates);
    }

    /// Open or close the killability window.
    pub fn allow_interrupt(&self, allow: bool) {
        self.inner.state.lock().unwrap().killable = allow;
        debug!("emit allow-interrupt {allow}");
        self.emit(EngineEvent::AllowInterruptChanged { allow });
    }

    /// Report a package row.
    pub fn package(&self, info: u32, package_id: &str, summary: &str) {
        self.inner.state.lock().unwrap().last_package = Some(package_id.to_string());
        debug!("emit package {info}, {package_id}, {summary}");
        self.emit(EngineEvent::Package {
            info,
            package_id: package_id.to_string(),
            summary: summary.to_string(),
        });
    }

    /// Report a package description.
    pub fn description(
        &self,
        package_id: &str,
        licence: &str,
        group: PackageGroup,
        detail: &str,
        url: &str,
    ) {
        debug!("emit description {package_id}, {licence}, {group}");
        self.emit(EngineEvent::Description {
            package_id: package_id.to_string(),
            licence: licence.to_string(),
            group,
            detail: detail.to_string(),
            url: url.to_string(),
        });
    }

    /// Report detail about an available update.
    pub fn update_detail(
        &self,
        package_id: &str,
        updates: &str,
        obsoletes: &str,
        url: &str,
        restart: &str,
        update_text: &str,
    ) {
        debug!("emit update-detail {package_id}");
        self.emit(EngineEvent::UpdateDetail {
            package_id: package_id.to_string(),
            updates: updates.to_string(),
            obsoletes: obsoletes.to_string(),
            url: url.to_string(),
            restart: restart.to_string(),
            update_text: update_text.to_string(),
        });
    }

    /// Report a restart requirement.
    pub fn require_restart(&self, kind: RestartKind, detail: &str) {
        debug!("emit require-restart {kind}, {detail}");
        self.emit(EngineEvent::RequireRestart {
            kind,
            detail: detail.to_string(),
        });
    }

    /// Report an error. Latches the exit tag to `Failed`; a later success
    /// cannot clear it.
    pub fn error_code(&self, code: ErrorCode, message: &str) {
        self.inner.state.lock().unwrap().exit = ExitStatus::Failed;
        debug!("emit error-code {code}, {message}");
        self.emit(EngineEvent::ErrorCode {
            code,
            message: message.to_string(),
        });
    }

    /// Mark the job canceled. Only upgrades a still-successful exit tag;
    /// a latched failure stays failed.
    pub fn set_canceled(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if state.exit == ExitStatus::Success {
            state.exit = ExitStatus::Canceled;
        }
    }

    /// Complete the job: join all background activities, wait one deferral
    /// tick so freshly attached subscribers see the completion, then emit
    /// `Finished`. The emission is scheduled, never inline.
    pub fn finished(&self) {
        debug!("scheduling finished for plugin '{}'", self.inner.plugin_name);
        let engine = self.clone();
        tokio::spawn(async move {
            engine.inner.tasks.wait_all().await;
            tokio::time::sleep(engine.inner.config.finished_delay).await;
            engine.emit_finished();
        });
    }

    /// Start a background activity for this job. All activities are joined
    /// before the `Finished` event is delivered.
    pub fn start_task<F>(&self, activity: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.inner.tasks.start(activity);
    }

    // ---- helper supervision ----

    /// Spawn a helper script for this job. The script lives at
    /// `<helper-root>/<plugin-name>/<script>` and speaks the wire protocol
    /// on its stdout/stderr. On spawn failure an `internal-error` is
    /// reported and the job finishes failed.
    pub fn spawn_helper(&self, script: &str, args: &[&str]) -> bool {
        let path = self
            .inner
            .config
            .helper_root
            .join(&self.inner.plugin_name)
            .join(script);
        debug!("using helper {}", path.display());

        let mut command = Command::new(&path);
        command.args(args);

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let launched = {
            let mut state = self.inner.state.lock().unwrap();
            if state.helper.is_some() {
                panic!("helper already in use for plugin '{}'", self.inner.plugin_name);
            }
            match HelperSpawn::launch(command, line_tx) {
                Ok(helper) => {
                    state.helper = Some(helper);
                    Ok(())
                }
                Err(err) => Err(err),
            }
        };

        match launched {
            Ok(()) => {
                let engine = self.clone();
                tokio::spawn(engine.drive_helper(line_rx));
                true
            }
            Err(err) => {
                warn!("helper spawn failed: {err}");
                self.error_code(
                    ErrorCode::InternalError,
                    &format!("Spawn of helper '{}' failed: {err}", path.display()),
                );
                self.finished();
                false
            }
        }
    }

    /// Send a termination signal to the running helper. A no-op warning
    /// when no helper is live.
    pub fn spawn_kill(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        match &state.helper {
            Some(helper) => {
                helper.kill();
                true
            }
            None => {
                warn!("cannot kill missing helper");
                false
            }
        }
    }

    /// Try to cancel the running job. Valid only when the plugin has a
    /// cancel hook and the job is assigned, killable and has a live helper;
    /// every other case refuses without emitting events.
    pub fn cancel(&self) -> bool {
        let Some(hook) = self.inner.descriptor.cancel_job_try else {
            warn!("plugin '{}' has no cancel hook", self.inner.plugin_name);
            return false;
        };
        {
            let state = self.inner.state.lock().unwrap();
            if !state.assigned {
                warn!("cancel refused: no role assigned");
                return false;
            }
            if !state.killable {
                warn!("cancel refused: job is not safe to interrupt");
                return false;
            }
            if state.helper.is_none() {
                warn!("cancel refused: no helper running");
                return false;
            }
        }
        hook(self);
        true
    }

    // ---- role operations ----

    /// List the dependencies of `package_id`.
    pub fn get_depends(&self, package_id: &str) -> bool {
        let Some(entry) = self.inner.descriptor.get_depends else {
            self.not_implemented("get-depends");
            return false;
        };
        self.set_job_role(Role::Query, Some(package_id));
        entry(self, package_id);
        self.mark_assigned();
        true
    }

    /// Describe `package_id`.
    pub fn get_description(&self, package_id: &str) -> bool {
        let Some(entry) = self.inner.descriptor.get_description else {
            self.not_implemented("get-description");
            return false;
        };
        self.set_job_role(Role::Query, Some(package_id));
        entry(self, package_id);
        self.mark_assigned();
        true
    }

    /// List the packages requiring `package_id`.
    pub fn get_requires(&self, package_id: &str) -> bool {
        let Some(entry) = self.inner.descriptor.get_requires else {
            self.not_implemented("get-requires");
            return false;
        };
        self.set_job_role(Role::Query, Some(package_id));
        entry(self, package_id);
        self.mark_assigned();
        true
    }

    /// List available updates.
    pub fn get_updates(&self) -> bool {
        let Some(entry) = self.inner.descriptor.get_updates else {
            self.not_implemented("get-updates");
            return false;
        };
        self.set_job_role(Role::Query, None);
        entry(self);
        self.mark_assigned();
        true
    }

    /// Detail the update identified by `package_id`.
    pub fn get_update_detail(&self, package_id: &str) -> bool {
        let Some(entry) = self.inner.descriptor.get_update_detail else {
            self.not_implemented("get-update-detail");
            return false;
        };
        self.set_job_role(Role::Query, Some(package_id));
        entry(self, package_id);
        self.mark_assigned();
        true
    }

    /// Install `package_id`.
    pub fn install_package(&self, package_id: &str) -> bool {
        let Some(entry) = self.inner.descriptor.install_package else {
            self.not_implemented("install-package");
            return false;
        };
        self.set_job_role(Role::Install, Some(package_id));
        entry(self, package_id);
        self.mark_assigned();
        true
    }

    /// Refresh the package cache.
    pub fn refresh_cache(&self, force: bool) -> bool {
        let Some(entry) = self.inner.descriptor.refresh_cache else {
            self.not_implemented("refresh-cache");
            return false;
        };
        self.set_job_role(Role::RefreshCache, None);
        entry(self, force);
        self.mark_assigned();
        true
    }

    /// Remove `package_id`.
    pub fn remove_package(&self, package_id: &str, allow_deps: bool) -> bool {
        let Some(entry) = self.inner.descriptor.remove_package else {
            self.not_implemented("remove-package");
            return false;
        };
        self.set_job_role(Role::Remove, Some(package_id));
        entry(self, package_id, allow_deps);
        self.mark_assigned();
        true
    }

    /// Search package descriptions for `search`.
    pub fn search_details(&self, filter: &str, search: &str) -> bool {
        let Some(entry) = self.inner.descriptor.search_details else {
            self.not_implemented("search-details");
            return false;
        };
        self.set_job_role(Role::Query, Some(search));
        entry(self, filter, search);
        self.mark_assigned();
        true
    }

    /// Search for the package owning `search`.
    pub fn search_file(&self, filter: &str, search: &str) -> bool {
        let Some(entry) = self.inner.descriptor.search_file else {
            self.not_implemented("search-file");
            return false;
        };
        self.set_job_role(Role::Query, Some(search));
        entry(self, filter, search);
        self.mark_assigned();
        true
    }

    /// Search the package group `search`.
    pub fn search_group(&self, filter: &str, search: &str) -> bool {
        let Some(entry) = self.inner.descriptor.search_group else {
            self.not_implemented("search-group");
            return false;
        };
        self.set_job_role(Role::Query, Some(search));
        entry(self, filter, search);
        self.mark_assigned();
        true
    }

    /// Search package names for `search`.
    pub fn search_name(&self, filter: &str, search: &str) -> bool {
        let Some(entry) = self.inner.descriptor.search_name else {
            self.not_implemented("search-name");
            return false;
        };
        self.set_job_role(Role::Query, Some(search));
        entry(self, filter, search);
        self.mark_assigned();
        true
    }

    /// Update `package_id`.
    pub fn update_package(&self, package_id: &str) -> bool {
        let Some(entry) = self.inner.descriptor.update_package else {
            self.not_implemented("update-package");
            return false;
        };
        self.set_job_role(Role::Update, Some(package_id));
        entry(self, package_id);
        self.mark_assigned();
        true
    }

    /// Update the whole system.
    pub fn update_system(&self) -> bool {
        let Some(entry) = self.inner.descriptor.update_system else {
            self.not_implemented("update-system");
            return false;
        };
        self.set_job_role(Role::SystemUpdate, None);
        entry(self);
        self.mark_assigned();
        true
    }

    // ---- internals ----

    fn emit(&self, event: EngineEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    fn set_job_role(&self, role: Role, package_id: Option<&str>) {
        let mut state = self.inner.state.lock().unwrap();
        if state.role != Role::Unknown {
            panic!("cannot set role more than once, already {}", state.role);
        }
        debug!("setting role to {role} (target '{package_id:?}')");
        state.role = role;
        state.package_id = package_id.map(str::to_string);
        state.status = Status::Setup;
    }

    fn mark_assigned(&self) {
        self.inner.state.lock().unwrap().assigned = true;
    }

    fn not_implemented(&self, method: &str) {
        self.error_code(
            ErrorCode::NotSupported,
            &format!(
                "the method '{method}' is not implemented in plugin '{}'",
                self.inner.plugin_name
            ),
        );
        // Nothing ran, so there is nothing to join or defer for.
        self.emit_finished();
    }

    fn emit_finished(&self) {
        let exit = {
            let mut state = self.inner.state.lock().unwrap();
            if state.finished {
                warn!("job finished twice");
                return;
            }
            state.finished = true;
            state.killable = false;
            state.exit
        };
        debug!("emit finished {exit}");
        self.emit(EngineEvent::Finished { exit });
    }

    async fn drive_helper(self, mut lines: mpsc::UnboundedReceiver<HelperMessage>) {
        while let Some(message) = lines.recv().await {
            match message {
                HelperMessage::Line { stream, line } => self.helper_line(stream, &line),
                HelperMessage::Exited { code } => {
                    self.helper_exited(code);
                    break;
                }
            }
        }
    }

    fn helper_line(&self, stream: StreamKind, line: &str) {
        let event = match stream {
            StreamKind::Output => {
                debug!("helper stdout = '{line}'");
                protocol::parse_output_line(line)
            }
            StreamKind::Error => {
                debug!("helper stderr = '{line}'");
                protocol::parse_error_line(line)
            }
        };
        if let Some(event) = event {
            self.apply_helper_event(event);
        }
    }

    fn apply_helper_event(&self, event: HelperEvent) {
        match event {
            HelperEvent::Package {
                info,
                package_id,
                summary,
            } => self.package(info, &package_id, &summary),
            HelperEvent::Description {
                package_id,
                licence,
                group,
                detail,
                url,
            } => self.description(&package_id, &licence, group, &detail, &url),
            HelperEvent::Percentage(percentage) => self.set_percentage(percentage),
            HelperEvent::SubPercentage(percentage) => self.set_sub_percentage(percentage),
            HelperEvent::ErrorCode { code, message } => self.error_code(code, &message),
            HelperEvent::RequireRestart { kind, detail } => self.require_restart(kind, &detail),
            HelperEvent::Status(status) => self.set_status(status),
            HelperEvent::AllowInterrupt(allow) => self.allow_interrupt(allow),
            HelperEvent::NoPercentageUpdates => self.no_percentage_updates(),
        }
    }

    fn helper_exited(&self, code: i32) {
        let exit = {
            let mut state = self.inner.state.lock().unwrap();
            state.helper = None;
            state.exit
        };
        // A helper that fails must say why; synthesize an error when it
        // exits non-zero without having set one. A canceled job is not
        // misreported as an internal error.
        if code != 0 && exit == ExitStatus::Success {
            warn!("helper returned non-zero but did not set an error");
            self.error_code(
                ErrorCode::InternalError,
                "helper returned non-zero return value but did not set an error",
            );
        }
        self.finished();
    }

    pub(crate) fn plugin_destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(destroy) = self.inner.descriptor.destroy {
            destroy(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::broadcast::error::RecvError;

    use super::*;

    static BARE: PluginDescriptor = PluginDescriptor::empty("Bare", "tests");

    fn fast_config() -> EngineConfig {
        EngineConfig {
            helper_root: std::env::temp_dir(),
            finished_delay: Duration::from_millis(10),
        }
    }

    fn bare_catalog() -> PluginCatalog {
        let mut catalog = PluginCatalog::new();
        catalog.register("bare", &BARE);
        catalog
    }

    async fn collect_until_finished(
        rx: &mut broadcast::Receiver<EngineEvent>,
    ) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for finished");
            match event {
                Ok(event) => {
                    let is_finished = matches!(event, EngineEvent::Finished { .. });
                    events.push(event);
                    if is_finished {
                        return events;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event stream closed before finished"),
            }
        }
    }

    #[tokio::test]
    async fn load_fails_for_unknown_plugin() {
        let catalog = PluginCatalog::new();
        assert!(matches!(
            BackendEngine::load(&catalog, "nope", fast_config()),
            Err(EngineError::PluginNotFound(_))
        ));
    }

    #[tokio::test]
    async fn missing_entry_reports_not_supported_then_failed() {
        let engine = BackendEngine::load(&bare_catalog(), "bare", fast_config()).unwrap();
        let mut rx = engine.subscribe();

        assert!(!engine.install_package("foo;1.0;i386;repo"));

        let events = collect_until_finished(&mut rx).await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            EngineEvent::ErrorCode {
                code: ErrorCode::NotSupported,
                ..
            }
        ));
        assert_eq!(
            events[1],
            EngineEvent::Finished {
                exit: ExitStatus::Failed
            }
        );
    }

    #[tokio::test]
    async fn error_code_latches_failure() {
        let engine = BackendEngine::load(&bare_catalog(), "bare", fast_config()).unwrap();
        let mut rx = engine.subscribe();

        engine.error_code(ErrorCode::NoNetwork, "mirror unreachable");
        engine.finished();

        let events = collect_until_finished(&mut rx).await;
        assert_eq!(
            events.last(),
            Some(&EngineEvent::Finished {
                exit: ExitStatus::Failed
            })
        );
    }

    #[tokio::test]
    async fn canceled_does_not_override_failure() {
        let engine = BackendEngine::load(&bare_catalog(), "bare", fast_config()).unwrap();
        engine.error_code(ErrorCode::NoNetwork, "mirror unreachable");
        engine.set_canceled();

        let mut rx = engine.subscribe();
        engine.finished();
        let events = collect_until_finished(&mut rx).await;
        assert_eq!(
            events.last(),
            Some(&EngineEvent::Finished {
                exit: ExitStatus::Failed
            })
        );
    }

    #[tokio::test]
    async fn progress_is_memoized_for_late_subscribers() {
        let engine = BackendEngine::load(&bare_catalog(), "bare", fast_config()).unwrap();
        engine.set_percentage(42);
        engine.set_sub_percentage(7);
        engine.package(1, "foo;1.0;i386;repo", "Foo");

        assert_eq!(engine.percentage(), 42);
        assert_eq!(engine.sub_percentage(), 7);
        assert_eq!(engine.last_package().as_deref(), Some("foo;1.0;i386;repo"));
    }

    #[tokio::test]
    async fn coldplug_getters_refuse_before_assignment() {
        let engine = BackendEngine::load(&bare_catalog(), "bare", fast_config()).unwrap();
        assert!(engine.job_status().is_none());
        assert!(engine.job_role().is_none());
    }

    #[tokio::test]
    #[should_panic(expected = "cannot set role more than once")]
    async fn second_role_assignment_panics() {
        static NOOP: PluginDescriptor = PluginDescriptor {
            get_updates: Some(|_engine| {}),
            update_system: Some(|_engine| {}),
            ..PluginDescriptor::empty("Noop", "tests")
        };
        let mut catalog = PluginCatalog::new();
        catalog.register("noop", &NOOP);

        let engine = BackendEngine::load(&catalog, "noop", fast_config()).unwrap();
        assert!(engine.get_updates());
        engine.update_system();
    }

    #[tokio::test]
    async fn cancel_refused_without_hook_or_state() {
        let engine = BackendEngine::load(&bare_catalog(), "bare", fast_config()).unwrap();
        // No cancel hook at all.
        assert!(!engine.cancel());

        static WITH_HOOK: PluginDescriptor = PluginDescriptor {
            cancel_job_try: Some(|engine| {
                engine.spawn_kill();
            }),
            get_updates: Some(|_engine| {}),
            ..PluginDescriptor::empty("Hooked", "tests")
        };
        let mut catalog = PluginCatalog::new();
        catalog.register("hooked", &WITH_HOOK);
        let engine = BackendEngine::load(&catalog, "hooked", fast_config()).unwrap();

        // Not assigned yet.
        assert!(!engine.cancel());
        assert!(engine.get_updates());
        // Assigned but not killable.
        assert!(!engine.cancel());
        engine.allow_interrupt(true);
        // Killable but no helper running.
        assert!(!engine.cancel());
    }

    #[tokio::test]
    async fn finished_emits_exactly_once() {
        let engine = BackendEngine::load(&bare_catalog(), "bare", fast_config()).unwrap();
        let mut rx = engine.subscribe();
        engine.finished();
        engine.finished();

        let events = collect_until_finished(&mut rx).await;
        assert_eq!(events.len(), 1);
        // Give the second emission a chance to (wrongly) arrive.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(rx.try_recv(), Err(_)));
    }

    #[tokio::test]
    async fn finished_joins_background_activities_first() {
        static WORKER: PluginDescriptor = PluginDescriptor {
            get_updates: Some(|engine| {
                engine.set_status(Status::Query);
                let job = engine.clone();
                engine.start_task(async move {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    job.package(1, "late;1.0;i386;repo", "Emitted from a worker");
                });
                engine.finished();
            }),
            ..PluginDescriptor::empty("Worker", "tests")
        };
        let mut catalog = PluginCatalog::new();
        catalog.register("worker", &WORKER);

        let engine = BackendEngine::load(&catalog, "worker", fast_config()).unwrap();
        let mut rx = engine.subscribe();
        assert!(engine.get_updates());

        let events = collect_until_finished(&mut rx).await;
        let package_idx = events
            .iter()
            .position(|e| matches!(e, EngineEvent::Package { .. }))
            .expect("worker package event missing");
        let finished_idx = events
            .iter()
            .position(|e| matches!(e, EngineEvent::Finished { .. }))
            .unwrap();
        assert!(package_idx < finished_idx);
    }
}
