//! Wire enums shared between the engine, the helper protocol and clients.
//!
//! `from_text`/`to_text` use the helper wire names; the serde names (kebab
//! case) are only used for JSON event output.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Semantic category of a job. Set exactly once per backend engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Unknown,
    Query,
    RefreshCache,
    Install,
    Remove,
    Update,
    SystemUpdate,
}

impl Role {
    pub fn to_text(self) -> &'static str {
        match self {
            Role::Unknown => "unknown",
            Role::Query => "query",
            Role::RefreshCache => "refresh-cache",
            Role::Install => "install",
            Role::Remove => "remove",
            Role::Update => "update",
            Role::SystemUpdate => "system-update",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}

/// Coarse progress tag, updated many times during a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Unknown,
    Setup,
    Query,
    Remove,
    Download,
    Install,
    Update,
    Exit,
}

impl Status {
    /// Wire-name lookup; unrecognised names map to `Unknown`.
    pub fn from_text(text: &str) -> Self {
        match text {
            "setup" => Status::Setup,
            "query" => Status::Query,
            "remove" => Status::Remove,
            "download" => Status::Download,
            "install" => Status::Install,
            "update" => Status::Update,
            "exit" => Status::Exit,
            _ => Status::Unknown,
        }
    }

    pub fn to_text(self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Setup => "setup",
            Status::Query => "query",
            Status::Remove => "remove",
            Status::Download => "download",
            Status::Install => "install",
            Status::Update => "update",
            Status::Exit => "exit",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}

/// Job outcome tag. Failure is sticky: once a job fails it stays failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExitStatus {
    Success,
    Failed,
    Canceled,
}

impl ExitStatus {
    pub fn to_text(self) -> &'static str {
        match self {
            ExitStatus::Success => "success",
            ExitStatus::Failed => "failed",
            ExitStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}

/// Package group advertised in description events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageGroup {
    Accessibility,
    Accessories,
    Education,
    Games,
    Graphics,
    Internet,
    Office,
    Other,
    Programming,
    Multimedia,
    System,
    Unknown,
}

impl PackageGroup {
    /// Wire-name lookup; unknown group names land in the `Unknown` bucket
    /// rather than failing the event.
    pub fn from_text(text: &str) -> Self {
        match text {
            "accessibility" => PackageGroup::Accessibility,
            "accessories" => PackageGroup::Accessories,
            "education" => PackageGroup::Education,
            "games" => PackageGroup::Games,
            "graphics" => PackageGroup::Graphics,
            "internet" => PackageGroup::Internet,
            "office" => PackageGroup::Office,
            "other" => PackageGroup::Other,
            "programming" => PackageGroup::Programming,
            "multimedia" => PackageGroup::Multimedia,
            "system" => PackageGroup::System,
            _ => PackageGroup::Unknown,
        }
    }

    pub fn to_text(self) -> &'static str {
        match self {
            PackageGroup::Accessibility => "accessibility",
            PackageGroup::Accessories => "accessories",
            PackageGroup::Education => "education",
            PackageGroup::Games => "games",
            PackageGroup::Graphics => "graphics",
            PackageGroup::Internet => "internet",
            PackageGroup::Office => "office",
            PackageGroup::Other => "other",
            PackageGroup::Programming => "programming",
            PackageGroup::Multimedia => "multimedia",
            PackageGroup::System => "system",
            PackageGroup::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PackageGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}

/// Error codes a helper or plugin can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    Oom,
    NoNetwork,
    NotSupported,
    InternalError,
    GpgFailure,
    PackageIdInvalid,
    PackageNotInstalled,
    PackageAlreadyInstalled,
    PackageDownloadFailed,
    DepResolutionFailed,
    FilterInvalid,
    TransactionError,
    Unknown,
}

impl ErrorCode {
    /// Wire-name lookup; unknown code names land in the `Unknown` bucket.
    pub fn from_text(text: &str) -> Self {
        match text {
            "out-of-memory" => ErrorCode::Oom,
            "no-network" => ErrorCode::NoNetwork,
            "not-supported" => ErrorCode::NotSupported,
            "internal-error" => ErrorCode::InternalError,
            "gpg-failure" => ErrorCode::GpgFailure,
            "package-id-invalid" => ErrorCode::PackageIdInvalid,
            "package-not-installed" => ErrorCode::PackageNotInstalled,
            "package-already-installed" => ErrorCode::PackageAlreadyInstalled,
            "package-download-failed" => ErrorCode::PackageDownloadFailed,
            "dep-resolution-failed" => ErrorCode::DepResolutionFailed,
            "filter-invalid" => ErrorCode::FilterInvalid,
            "transaction-error" => ErrorCode::TransactionError,
            _ => ErrorCode::Unknown,
        }
    }

    pub fn to_text(self) -> &'static str {
        match self {
            ErrorCode::Oom => "out-of-memory",
            ErrorCode::NoNetwork => "no-network",
            ErrorCode::NotSupported => "not-supported",
            ErrorCode::InternalError => "internal-error",
            ErrorCode::GpgFailure => "gpg-failure",
            ErrorCode::PackageIdInvalid => "package-id-invalid",
            ErrorCode::PackageNotInstalled => "package-not-installed",
            ErrorCode::PackageAlreadyInstalled => "package-already-installed",
            ErrorCode::PackageDownloadFailed => "package-download-failed",
            ErrorCode::DepResolutionFailed => "dep-resolution-failed",
            ErrorCode::FilterInvalid => "filter-invalid",
            ErrorCode::TransactionError => "transaction-error",
            ErrorCode::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}

/// What must be restarted after a job completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartKind {
    None,
    Application,
    Session,
    System,
    Unknown,
}

impl RestartKind {
    /// Wire-name lookup; unknown kinds land in the `Unknown` bucket.
    pub fn from_text(text: &str) -> Self {
        match text {
            "none" => RestartKind::None,
            "application" => RestartKind::Application,
            "session" => RestartKind::Session,
            "system" => RestartKind::System,
            _ => RestartKind::Unknown,
        }
    }

    pub fn to_text(self) -> &'static str {
        match self {
            RestartKind::None => "none",
            RestartKind::Application => "application",
            RestartKind::Session => "session",
            RestartKind::System => "system",
            RestartKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RestartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}

/// Search filter a plugin can advertise support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Filter {
    None,
    Installed,
    NotInstalled,
    Devel,
    NotDevel,
    Gui,
    NotGui,
}

impl Filter {
    pub fn to_text(self) -> &'static str {
        match self {
            Filter::None => "none",
            Filter::Installed => "installed",
            Filter::NotInstalled => "~installed",
            Filter::Devel => "devel",
            Filter::NotDevel => "~devel",
            Filter::Gui => "gui",
            Filter::NotGui => "~gui",
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}

/// Operation a loaded plugin advertises, derived from descriptor entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    CancelJob,
    GetDepends,
    GetDescription,
    GetRequires,
    GetUpdates,
    GetUpdateDetail,
    InstallPackage,
    RefreshCache,
    RemovePackage,
    SearchDetails,
    SearchFile,
    SearchGroup,
    SearchName,
    UpdatePackage,
    UpdateSystem,
}

impl Action {
    pub fn to_text(self) -> &'static str {
        match self {
            Action::CancelJob => "cancel-job",
            Action::GetDepends => "get-depends",
            Action::GetDescription => "get-description",
            Action::GetRequires => "get-requires",
            Action::GetUpdates => "get-updates",
            Action::GetUpdateDetail => "get-update-detail",
            Action::InstallPackage => "install-package",
            Action::RefreshCache => "refresh-cache",
            Action::RemovePackage => "remove-package",
            Action::SearchDetails => "search-details",
            Action::SearchFile => "search-file",
            Action::SearchGroup => "search-group",
            Action::SearchName => "search-name",
            Action::UpdatePackage => "update-package",
            Action::UpdateSystem => "update-system",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_text())
    }
}
