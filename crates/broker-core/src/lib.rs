//! Shared vocabulary for the `pakbroker` daemon: package identifiers, wire
//! enums, transaction IDs and on-disk configuration.

pub mod config;
pub mod enums;
pub mod package_id;
pub mod tid;

pub use config::BrokerConfig;
pub use enums::{
    Action, ErrorCode, ExitStatus, Filter, PackageGroup, RestartKind, Role, Status,
};
pub use package_id::PackageId;
