//! A plugin whose every role is performed by a helper script speaking the
//! wire protocol. The scripts live in the helper directory named after the
//! plugin, so several distribution backends can share this descriptor by
//! registering it under different names.

use crate::backend::BackendEngine;
use crate::plugin::PluginDescriptor;

/// Descriptor of the `script` plugin.
pub static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    name: "Script",
    author: "pakbroker",
    initialize: None,
    destroy: None,
    cancel_job_try: Some(cancel_job_try),
    get_depends: Some(get_depends),
    get_description: Some(get_description),
    get_requires: Some(get_requires),
    get_update_detail: Some(get_update_detail),
    get_updates: Some(get_updates),
    install_package: Some(install_package),
    refresh_cache: Some(refresh_cache),
    remove_package: Some(remove_package),
    search_details: Some(search_details),
    search_file: Some(search_file),
    search_group: Some(search_group),
    search_name: Some(search_name),
    update_package: Some(update_package),
    update_system: Some(update_system),
    get_groups: None,
    get_filters: None,
};

fn cancel_job_try(engine: &BackendEngine) {
    // The killed helper still reports completion through the normal exit
    // path.
    engine.spawn_kill();
}

fn get_depends(engine: &BackendEngine, package_id: &str) {
    engine.spawn_helper("get-depends.sh", &[package_id]);
}

fn get_description(engine: &BackendEngine, package_id: &str) {
    engine.spawn_helper("get-description.sh", &[package_id]);
}

fn get_requires(engine: &BackendEngine, package_id: &str) {
    engine.spawn_helper("get-requires.sh", &[package_id]);
}

fn get_update_detail(engine: &BackendEngine, package_id: &str) {
    engine.spawn_helper("get-update-detail.sh", &[package_id]);
}

fn get_updates(engine: &BackendEngine) {
    engine.spawn_helper("get-updates.sh", &[]);
}

fn install_package(engine: &BackendEngine, package_id: &str) {
    engine.spawn_helper("install.sh", &[package_id]);
}

fn refresh_cache(engine: &BackendEngine, force: bool) {
    engine.spawn_helper("refresh-cache.sh", &[bool_text(force)]);
}

fn remove_package(engine: &BackendEngine, package_id: &str, allow_deps: bool) {
    engine.spawn_helper("remove.sh", &[bool_text(allow_deps), package_id]);
}

fn search_details(engine: &BackendEngine, filter: &str, search: &str) {
    engine.spawn_helper("search-details.sh", &[filter, search]);
}

fn search_file(engine: &BackendEngine, filter: &str, search: &str) {
    engine.spawn_helper("search-file.sh", &[filter, search]);
}

fn search_group(engine: &BackendEngine, filter: &str, search: &str) {
    engine.spawn_helper("search-group.sh", &[filter, search]);
}

fn search_name(engine: &BackendEngine, filter: &str, search: &str) {
    engine.spawn_helper("search-name.sh", &[filter, search]);
}

fn update_package(engine: &BackendEngine, package_id: &str) {
    engine.spawn_helper("update.sh", &[package_id]);
}

fn update_system(engine: &BackendEngine) {
    engine.spawn_helper("update-system.sh", &[]);
}

fn bool_text(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
