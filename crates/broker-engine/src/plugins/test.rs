//! A plugin that completes every role directly, without helpers. It backs
//! the default configuration so the daemon works on a machine with no
//! distribution tooling, and it exercises the whole event surface,
//! including worker-pool activities.

use pakbroker_core::{Filter, PackageGroup, RestartKind, Status};

use crate::backend::BackendEngine;
use crate::plugin::PluginDescriptor;

/// Descriptor of the `test` plugin.
pub static DESCRIPTOR: PluginDescriptor = PluginDescriptor {
    name: "Test",
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
    search_details: Some(search),
    search_file: Some(search),
    search_group: Some(search),
    search_name: Some(search),
    update_package: Some(update_package),
    update_system: Some(update_system),
    get_groups: Some(get_groups),
    get_filters: Some(get_filters),
};

fn cancel_job_try(engine: &BackendEngine) {
    engine.spawn_kill();
}

fn get_depends(engine: &BackendEngine, _package_id: &str) {
    engine.set_status(Status::Query);
    let job = engine.clone();
    engine.start_task(async move {
        job.package(1, "glib2;2.14.0;i386;fedora", "The GLib library");
        job.package(1, "gtk2;2.11.6-6.fc8;i386;fedora", "GTK+ widget toolkit");
        job.finished();
    });
}

fn get_description(engine: &BackendEngine, package_id: &str) {
    engine.set_status(Status::Query);
    engine.description(
        package_id,
        "GPLv2",
        PackageGroup::Programming,
        "A test package used to exercise the daemon",
        "http://example.invalid/test",
    );
    engine.finished();
}

fn get_requires(engine: &BackendEngine, _package_id: &str) {
    engine.set_status(Status::Query);
    let job = engine.clone();
    engine.start_task(async move {
        job.package(1, "glib2;2.14.0;i386;fedora", "The GLib library");
        job.finished();
    });
}

fn get_updates(engine: &BackendEngine) {
    engine.set_status(Status::Query);
    let job = engine.clone();
    engine.start_task(async move {
        job.package(2, "powertop;1.8-1.fc8;i386;fedora", "Power consumption monitor");
        job.finished();
    });
}

fn get_update_detail(engine: &BackendEngine, package_id: &str) {
    engine.set_status(Status::Query);
    engine.update_detail(
        package_id,
        "",
        "",
        "http://example.invalid/advisory",
        RestartKind::None.to_text(),
        "Update to the newest upstream release",
    );
    engine.finished();
}

fn install_package(engine: &BackendEngine, package_id: &str) {
    engine.set_status(Status::Install);
    let job = engine.clone();
    let package_id = package_id.to_string();
    engine.start_task(async move {
        job.set_percentage(0);
        job.package(1, &package_id, "Requested by client");
        job.set_percentage(50);
        job.set_percentage(100);
        job.finished();
    });
}

fn refresh_cache(engine: &BackendEngine, _force: bool) {
    engine.set_status(Status::Download);
    let job = engine.clone();
    engine.start_task(async move {
        job.set_sub_percentage(0);
        job.set_sub_percentage(100);
        job.finished();
    });
}

fn remove_package(engine: &BackendEngine, package_id: &str, _allow_deps: bool) {
    engine.set_status(Status::Remove);
    let job = engine.clone();
    let package_id = package_id.to_string();
    engine.start_task(async move {
        job.package(1, &package_id, "Removed");
        job.finished();
    });
}

fn search(engine: &BackendEngine, _filter: &str, search: &str) {
    engine.set_status(Status::Query);
    let job = engine.clone();
    let search = search.to_string();
    engine.start_task(async move {
        job.package(
            1,
            &format!("{search};0.0.1;i386;data"),
            "An example package matching the search",
        );
        job.finished();
    });
}

fn update_package(engine: &BackendEngine, package_id: &str) {
    engine.set_status(Status::Update);
    let job = engine.clone();
    let package_id = package_id.to_string();
    engine.start_task(async move {
        job.package(1, &package_id, "Updated");
        job.finished();
    });
}

fn update_system(engine: &BackendEngine) {
    engine.set_status(Status::Update);
    engine.no_percentage_updates();
    let job = engine.clone();
    engine.start_task(async move {
        job.package(1, "powertop;1.8-1.fc8;i386;fedora", "Power consumption monitor");
        job.finished();
    });
}

fn get_groups(_engine: &BackendEngine) -> Vec<PackageGroup> {
    vec![
        PackageGroup::Internet,
        PackageGroup::Programming,
        PackageGroup::System,
    ]
}

fn get_filters(_engine: &BackendEngine) -> Vec<Filter> {
    vec![Filter::Installed, Filter::Devel, Filter::Gui]
}
