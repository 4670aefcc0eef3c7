//! Public configuration and event types for the `pakbroker` engine.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pakbroker_core::config::DEFAULT_HELPER_ROOT;
use pakbroker_core::{ErrorCode, ExitStatus, PackageGroup, RestartKind, Status};

/// Per-engine configuration, shared by every transaction the list creates.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory containing per-plugin helper-script subdirectories.
    pub helper_root: PathBuf,

    /// How long a finished job is deferred before the `Finished` event is
    /// emitted, so subscribers that triggered the job can attach first.
    pub finished_delay: Duration,
}

impl EngineConfig {
    /// Default `Finished` deferral.
    pub const DEFAULT_FINISHED_DELAY: Duration = Duration::from_millis(500);

    /// Configuration rooted at `helper_root` with default timings.
    pub fn new(helper_root: impl Into<PathBuf>) -> Self {
        Self {
            helper_root: helper_root.into(),
            finished_delay: Self::DEFAULT_FINISHED_DELAY,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HELPER_ROOT)
    }
}

/// Configuration for the transaction list.
#[derive(Debug, Clone)]
pub struct ListConfig {
    /// Plugin loaded into every new transaction's backend engine.
    pub backend: String,

    /// Engine configuration handed to every backend engine.
    pub engine: EngineConfig,

    /// How long a finished transaction stays resolvable by TID.
    pub keep_finished: Duration,
}

impl ListConfig {
    /// Default grace window for finished transactions.
    pub const DEFAULT_KEEP_FINISHED: Duration = Duration::from_secs(5);

    /// List configuration for the given plugin with default timings.
    pub fn new(backend: impl Into<String>, engine: EngineConfig) -> Self {
        Self {
            backend: backend.into(),
            engine,
            keep_finished: Self::DEFAULT_KEEP_FINISHED,
        }
    }
}

/// Event stream payload of a backend engine (and of its transaction).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EngineEvent {
    /// The job's coarse progress tag changed.
    JobStatusChanged {
        /// New status tag.
        status: Status,
    },
    /// Overall progress percentage changed.
    PercentageChanged {
        /// Percentage in `[0, 100]`.
        percentage: u8,
    },
    /// Progress percentage of the current sub-task changed.
    SubPercentageChanged {
        /// Percentage in `[0, 100]`.
        percentage: u8,
    },
    /// The helper declared it will not report percentages for this job.
    NoPercentageUpdates,
    /// The helper changed whether the job may be interrupted.
    AllowInterruptChanged {
        /// Whether cancel is currently permitted.
        allow: bool,
    },
    /// A package row produced by the job.
    Package {
        /// Numeric info code attached by the helper.
        info: u32,
        /// Package identifier (`name;version;arch;data`).
        package_id: String,
        /// One-line summary.
        summary: String,
    },
    /// A package description produced by the job.
    Description {
        /// Package identifier.
        package_id: String,
        /// Licence text.
        licence: String,
        /// Package group.
        group: PackageGroup,
        /// Long description.
        detail: String,
        /// Upstream URL.
        url: String,
    },
    /// Detail about an available update.
    UpdateDetail {
        /// Package identifier of the update.
        package_id: String,
        /// Packages this update replaces.
        updates: String,
        /// Packages this update obsoletes.
        obsoletes: String,
        /// Vendor URL for the update.
        url: String,
        /// Restart requirement, as wire text.
        restart: String,
        /// Human-readable update text.
        update_text: String,
    },
    /// Something must be restarted once the job completes.
    RequireRestart {
        /// What needs restarting.
        kind: RestartKind,
        /// Helper-provided detail.
        detail: String,
    },
    /// The job reported an error; the job's exit tag is now `Failed`.
    ErrorCode {
        /// Error code.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
    /// The job completed. Always the last event of a job.
    Finished {
        /// Outcome tag.
        exit: ExitStatus,
    },
}

/// Event stream payload of the transaction list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ListEvent {
    /// The set of committed, unfinished transactions changed.
    Changed,
}
