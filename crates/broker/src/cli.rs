use std::path::PathBuf;

use clap::{Parser, Subcommand};

use pakbroker_engine::RoleRequest;

#[derive(Debug, Clone, Parser)]
#[command(name = "pakbrokerd", version, about = "Package-management transaction broker")]
pub struct Cli {
    /// Plugin to load for this transaction.
    #[arg(long, env = "PAKBROKER_BACKEND")]
    pub backend: Option<String>,

    /// Root directory of the per-plugin helper scripts.
    #[arg(long, env = "PAKBROKER_HELPER_ROOT")]
    pub helper_root: Option<PathBuf>,

    /// Print events as JSON lines instead of human-readable text.
    #[arg(long, env = "PAKBROKER_JSON", default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: RoleCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum RoleCommand {
    /// Print the plugin's advertised actions and exit.
    Actions,
    /// List the dependencies of a package.
    GetDepends { package_id: String },
    /// Describe a package.
    GetDescription { package_id: String },
    /// List the packages requiring a package.
    GetRequires { package_id: String },
    /// List available updates.
    GetUpdates,
    /// Detail one available update.
    GetUpdateDetail { package_id: String },
    /// Install a package.
    Install { package_id: String },
    /// Remove a package.
    Remove {
        package_id: String,
        /// Also remove packages depending on it.
        #[arg(long, default_value_t = false)]
        allow_deps: bool,
    },
    /// Refresh the package cache.
    RefreshCache {
        /// Refresh even when the cache looks current.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Search by package name.
    SearchName {
        search: String,
        /// Filter expression (e.g. `none` or `installed;~devel`).
        #[arg(long, default_value = "none")]
        filter: String,
    },
    /// Search package descriptions.
    SearchDetails {
        search: String,
        /// Filter expression.
        #[arg(long, default_value = "none")]
        filter: String,
    },
    /// Search for the package owning a file.
    SearchFile {
        search: String,
        /// Filter expression.
        #[arg(long, default_value = "none")]
        filter: String,
    },
    /// Search a package group.
    SearchGroup {
        search: String,
        /// Filter expression.
        #[arg(long, default_value = "none")]
        filter: String,
    },
    /// Update one package.
    Update { package_id: String },
    /// Update the whole system.
    UpdateSystem,
}

impl RoleCommand {
    /// The engine request this command maps to; `None` for commands that do
    /// not submit a transaction.
    pub fn to_request(&self) -> Option<RoleRequest> {
        let request = match self {
            RoleCommand::Actions => return None,
            RoleCommand::GetDepends { package_id } => RoleRequest::GetDepends {
                package_id: package_id.clone(),
            },
            RoleCommand::GetDescription { package_id } => RoleRequest::GetDescription {
                package_id: package_id.clone(),
            },
            RoleCommand::GetRequires { package_id } => RoleRequest::GetRequires {
                package_id: package_id.clone(),
            },
            RoleCommand::GetUpdates => RoleRequest::GetUpdates,
            RoleCommand::GetUpdateDetail { package_id } => RoleRequest::GetUpdateDetail {
                package_id: package_id.clone(),
            },
            RoleCommand::Install { package_id } => RoleRequest::Install {
                package_id: package_id.clone(),
            },
            RoleCommand::Remove {
                package_id,
                allow_deps,
            } => RoleRequest::Remove {
                package_id: package_id.clone(),
                allow_deps: *allow_deps,
            },
            RoleCommand::RefreshCache { force } => RoleRequest::RefreshCache { force: *force },
            RoleCommand::SearchName { search, filter } => RoleRequest::SearchName {
                filter: filter.clone(),
                search: search.clone(),
            },
            RoleCommand::SearchDetails { search, filter } => RoleRequest::SearchDetails {
                filter: filter.clone(),
                search: search.clone(),
            },
            RoleCommand::SearchFile { search, filter } => RoleRequest::SearchFile {
                filter: filter.clone(),
                search: search.clone(),
            },
            RoleCommand::SearchGroup { search, filter } => RoleRequest::SearchGroup {
                filter: filter.clone(),
                search: search.clone(),
            },
            RoleCommand::Update { package_id } => RoleRequest::UpdatePackage {
                package_id: package_id.clone(),
            },
            RoleCommand::UpdateSystem => RoleRequest::UpdateSystem,
        };
        Some(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_is_not_a_role_command() {
        assert!(RoleCommand::Actions.to_request().is_none());
    }

    #[test]
    fn remove_carries_its_flag() {
        let cmd = RoleCommand::Remove {
            package_id: "foo;1.0;i386;repo".to_string(),
            allow_deps: true,
        };
        assert_eq!(
            cmd.to_request(),
            Some(RoleRequest::Remove {
                package_id: "foo;1.0;i386;repo".to_string(),
                allow_deps: true,
            })
        );
    }
}
