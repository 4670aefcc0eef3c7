//! Plugin descriptors and the catalog they are resolved from.
//!
//! A plugin is a record of optional function entries. Missing entries
//! disable the corresponding engine operations; presence is used to derive
//! the advertised action set. Plugins are registered in a [`PluginCatalog`]
//! under the name the backend engine loads them by; the name also selects
//! the helper-script subdirectory for helper-backed plugins.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use pakbroker_core::{Action, Filter, PackageGroup};

use crate::backend::{BackendEngine, EngineError};

/// Lifecycle or cancel hook.
pub type HookFn = fn(&BackendEngine);

/// Entry taking a single package identifier.
pub type PackageFn = fn(&BackendEngine, &str);

/// Entry taking a filter and a search term.
pub type SearchFn = fn(&BackendEngine, &str, &str);

/// Entry taking a package identifier and the allow-deps flag.
pub type RemoveFn = fn(&BackendEngine, &str, bool);

/// Entry taking the force flag.
pub type RefreshFn = fn(&BackendEngine, bool);

/// Entry taking no job arguments.
pub type PlainFn = fn(&BackendEngine);

/// Entry advertising the package groups the plugin understands.
pub type GroupsFn = fn(&BackendEngine) -> Vec<PackageGroup>;

/// Entry advertising the search filters the plugin understands.
pub type FiltersFn = fn(&BackendEngine) -> Vec<Filter>;

/// Capability record of a plugin. Every entry is optional.
#[derive(Clone, Copy)]
pub struct PluginDescriptor {
    /// Human-readable plugin name.
    pub name: &'static str,
    /// Plugin author.
    pub author: &'static str,
    /// Called once when the plugin is loaded into an engine.
    pub initialize: Option<HookFn>,
    /// Called once when the owning transaction is dropped.
    pub destroy: Option<HookFn>,
    /// Asked to interrupt the running job.
    pub cancel_job_try: Option<HookFn>,
    /// List the dependencies of a package.
    pub get_depends: Option<PackageFn>,
    /// Describe a package.
    pub get_description: Option<PackageFn>,
    /// List the packages requiring a package.
    pub get_requires: Option<PackageFn>,
    /// Detail one available update.
    pub get_update_detail: Option<PackageFn>,
    /// List available updates.
    pub get_updates: Option<PlainFn>,
    /// Install a package.
    pub install_package: Option<PackageFn>,
    /// Refresh the package cache.
    pub refresh_cache: Option<RefreshFn>,
    /// Remove a package.
    pub remove_package: Option<RemoveFn>,
    /// Search package descriptions.
    pub search_details: Option<SearchFn>,
    /// Search by owned file.
    pub search_file: Option<SearchFn>,
    /// Search by package group.
    pub search_group: Option<SearchFn>,
    /// Search by package name.
    pub search_name: Option<SearchFn>,
    /// Update one package.
    pub update_package: Option<PackageFn>,
    /// Update the whole system.
    pub update_system: Option<PlainFn>,
    /// Advertise understood package groups.
    pub get_groups: Option<GroupsFn>,
    /// Advertise understood search filters.
    pub get_filters: Option<FiltersFn>,
}

impl PluginDescriptor {
    /// A descriptor with every entry absent.
    pub const fn empty(name: &'static str, author: &'static str) -> Self {
        Self {
            name,
            author,
            initialize: None,
            destroy: None,
            cancel_job_try: None,
            get_depends: None,
            get_description: None,
            get_requires: None,
            get_update_detail: None,
            get_updates: None,
            install_package: None,
            refresh_cache: None,
            remove_package: None,
            search_details: None,
            search_file: None,
            search_group: None,
            search_name: None,
            update_package: None,
            update_system: None,
            get_groups: None,
            get_filters: None,
        }
    }

    /// The action set derived from present entries.
    pub fn actions(&self) -> BTreeSet<Action> {
        let mut actions = BTreeSet::new();
        if self.cancel_job_try.is_some() {
            actions.insert(Action::CancelJob);
        }
        if self.get_depends.is_some() {
            actions.insert(Action::GetDepends);
        }
        if self.get_description.is_some() {
            actions.insert(Action::GetDescription);
        }
        if self.get_requires.is_some() {
            actions.insert(Action::GetRequires);
        }
        if self.get_updates.is_some() {
            actions.insert(Action::GetUpdates);
        }
        if self.get_update_detail.is_some() {
            actions.insert(Action::GetUpdateDetail);
        }
        if self.install_package.is_some() {
            actions.insert(Action::InstallPackage);
        }
        if self.refresh_cache.is_some() {
            actions.insert(Action::RefreshCache);
        }
        if self.remove_package.is_some() {
            actions.insert(Action::RemovePackage);
        }
        if self.search_details.is_some() {
            actions.insert(Action::SearchDetails);
        }
        if self.search_file.is_some() {
            actions.insert(Action::SearchFile);
        }
        if self.search_group.is_some() {
            actions.insert(Action::SearchGroup);
        }
        if self.search_name.is_some() {
            actions.insert(Action::SearchName);
        }
        if self.update_package.is_some() {
            actions.insert(Action::UpdatePackage);
        }
        if self.update_system.is_some() {
            actions.insert(Action::UpdateSystem);
        }
        actions
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("name", &self.name)
            .field("author", &self.author)
            .field("actions", &self.actions())
            .finish()
    }
}

/// Named plugins available to the engine.
#[derive(Debug, Default)]
pub struct PluginCatalog {
    // `None` models a registered module that exports no descriptor.
    plugins: BTreeMap<String, Option<&'static PluginDescriptor>>,
}

impl PluginCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog of built-in plugins (`test` and `script`).
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register("test", &crate::plugins::test::DESCRIPTOR);
        catalog.register("script", &crate::plugins::script::DESCRIPTOR);
        catalog
    }

    /// Register a plugin under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, descriptor: &'static PluginDescriptor) {
        self.plugins.insert(name.into(), Some(descriptor));
    }

    /// Register a module that exports no descriptor. Loading it fails with
    /// [`EngineError::MissingDescriptor`].
    pub fn register_stub(&mut self, name: impl Into<String>) {
        self.plugins.insert(name.into(), None);
    }

    /// Resolve a plugin by name.
    pub fn resolve(&self, name: &str) -> Result<&'static PluginDescriptor, EngineError> {
        match self.plugins.get(name) {
            Some(Some(descriptor)) => Ok(descriptor),
            Some(None) => Err(EngineError::MissingDescriptor(name.to_string())),
            None => Err(EngineError::PluginNotFound(name.to_string())),
        }
    }

    /// Names of registered plugins, in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }
}
