//! One client-visible unit of work: a stable identifier bound to a backend
//! engine and a role selection.

use std::sync::Mutex;

use tokio::sync::broadcast;
use tracing::warn;

use pakbroker_core::Role;

use crate::api::EngineEvent;
use crate::backend::BackendEngine;

/// The role a client selected for a transaction, with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequest {
    /// List the dependencies of a package.
    GetDepends {
        /// Package identifier.
        package_id: String,
    },
    /// Describe a package.
    GetDescription {
        /// Package identifier.
        package_id: String,
    },
    /// List the packages requiring a package.
    GetRequires {
        /// Package identifier.
        package_id: String,
    },
    /// List available updates.
    GetUpdates,
    /// Detail one available update.
    GetUpdateDetail {
        /// Package identifier.
        package_id: String,
    },
    /// Install a package.
    Install {
        /// Package identifier.
        package_id: String,
    },
    /// Remove a package.
    Remove {
        /// Package identifier.
        package_id: String,
        /// Whether dependent packages may be removed too.
        allow_deps: bool,
    },
    /// Refresh the package cache.
    RefreshCache {
        /// Whether to refresh even when the cache looks current.
        force: bool,
    },
    /// Search by package name.
    SearchName {
        /// Filter expression.
        filter: String,
        /// Search term.
        search: String,
    },
    /// Search package descriptions.
    SearchDetails {
        /// Filter expression.
        filter: String,
        /// Search term.
        search: String,
    },
    /// Search by owned file.
    SearchFile {
        /// Filter expression.
        filter: String,
        /// Search term.
        search: String,
    },
    /// Search by package group.
    SearchGroup {
        /// Filter expression.
        filter: String,
        /// Search term.
        search: String,
    },
    /// Update one package.
    UpdatePackage {
        /// Package identifier.
        package_id: String,
    },
    /// Update the whole system.
    UpdateSystem,
}

impl RoleRequest {
    /// The role this request assigns to the engine when it runs.
    pub fn role(&self) -> Role {
        match self {
            RoleRequest::GetDepends { .. }
            | RoleRequest::GetDescription { .. }
            | RoleRequest::GetRequires { .. }
            | RoleRequest::GetUpdates
            | RoleRequest::GetUpdateDetail { .. }
            | RoleRequest::SearchName { .. }
            | RoleRequest::SearchDetails { .. }
            | RoleRequest::SearchFile { .. }
            | RoleRequest::SearchGroup { .. } => Role::Query,
            RoleRequest::Install { .. } => Role::Install,
            RoleRequest::Remove { .. } => Role::Remove,
            RoleRequest::RefreshCache { .. } => Role::RefreshCache,
            RoleRequest::UpdatePackage { .. } => Role::Update,
            RoleRequest::UpdateSystem => Role::SystemUpdate,
        }
    }
}

/// A transaction: TID, engine, and the selected role. Transactions are
/// never restarted; after `Finished` they are retired by the list.
pub struct Transaction {
    tid: String,
    engine: BackendEngine,
    request: Mutex<Option<RoleRequest>>,
}

impl Transaction {
    pub(crate) fn new(tid: String, engine: BackendEngine) -> Self {
        Self {
            tid,
            engine,
            request: Mutex::new(None),
        }
    }

    /// This transaction's identifier.
    pub fn tid(&self) -> &str {
        &self.tid
    }

    /// The backend engine bound to this transaction.
    pub fn engine(&self) -> &BackendEngine {
        &self.engine
    }

    /// Subscribe to this transaction's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.engine.subscribe()
    }

    /// Select the role for this transaction. May be done once; a second
    /// selection is refused.
    pub fn set_request(&self, request: RoleRequest) -> bool {
        let mut slot = self.request.lock().unwrap();
        if slot.is_some() {
            warn!("transaction {} already has a role selected", self.tid);
            return false;
        }
        *slot = Some(request);
        true
    }

    /// The selected role, if any.
    pub fn role(&self) -> Option<Role> {
        self.request.lock().unwrap().as_ref().map(RoleRequest::role)
    }

    /// Try to cancel the running job.
    pub fn cancel(&self) -> bool {
        self.engine.cancel()
    }

    /// Invoke the selected role's entry point on the engine. Returns
    /// whether the job was dispatched.
    pub fn run(&self) -> bool {
        let request = match self.request.lock().unwrap().clone() {
            Some(request) => request,
            None => {
                warn!("transaction {} has no role selected", self.tid);
                return false;
            }
        };
        match request {
            RoleRequest::GetDepends { package_id } => self.engine.get_depends(&package_id),
            RoleRequest::GetDescription { package_id } => self.engine.get_description(&package_id),
            RoleRequest::GetRequires { package_id } => self.engine.get_requires(&package_id),
            RoleRequest::GetUpdates => self.engine.get_updates(),
            RoleRequest::GetUpdateDetail { package_id } => {
                self.engine.get_update_detail(&package_id)
            }
            RoleRequest::Install { package_id } => self.engine.install_package(&package_id),
            RoleRequest::Remove {
                package_id,
                allow_deps,
            } => self.engine.remove_package(&package_id, allow_deps),
            RoleRequest::RefreshCache { force } => self.engine.refresh_cache(force),
            RoleRequest::SearchName { filter, search } => {
                self.engine.search_name(&filter, &search)
            }
            RoleRequest::SearchDetails { filter, search } => {
                self.engine.search_details(&filter, &search)
            }
            RoleRequest::SearchFile { filter, search } => {
                self.engine.search_file(&filter, &search)
            }
            RoleRequest::SearchGroup { filter, search } => {
                self.engine.search_group(&filter, &search)
            }
            RoleRequest::UpdatePackage { package_id } => {
                self.engine.update_package(&package_id)
            }
            RoleRequest::UpdateSystem => self.engine.update_system(),
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.engine.plugin_destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::EngineConfig;
    use crate::plugin::{PluginCatalog, PluginDescriptor};

    static BARE: PluginDescriptor = PluginDescriptor::empty("Bare", "tests");

    fn transaction() -> Transaction {
        let mut catalog = PluginCatalog::new();
        catalog.register("bare", &BARE);
        let engine = BackendEngine::load(&catalog, "bare", EngineConfig::default()).unwrap();
        Transaction::new("/1_test".to_string(), engine)
    }

    #[test]
    fn role_selection_is_one_shot() {
        let txn = transaction();
        assert!(txn.role().is_none());
        assert!(txn.set_request(RoleRequest::GetUpdates));
        assert!(!txn.set_request(RoleRequest::UpdateSystem));
        assert_eq!(txn.role(), Some(Role::Query));
    }

    #[tokio::test]
    async fn run_without_selection_is_refused() {
        let txn = transaction();
        assert!(!txn.run());
    }

    #[test]
    fn request_role_mapping() {
        assert_eq!(
            RoleRequest::Install {
                package_id: "foo;;;".into()
            }
            .role(),
            Role::Install
        );
        assert_eq!(RoleRequest::RefreshCache { force: true }.role(), Role::RefreshCache);
        assert_eq!(RoleRequest::UpdateSystem.role(), Role::SystemUpdate);
        assert_eq!(
            RoleRequest::SearchName {
                filter: "none".into(),
                search: "foo".into()
            }
            .role(),
            Role::Query
        );
    }
}
