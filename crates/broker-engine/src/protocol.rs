//! The line protocol spoken by helper scripts.
//!
//! Helpers emit tab-separated fields, one event per line. Content events
//! (`package`, `description`) arrive on stdout; control events (`status`,
//! `percentage`, `error`, ...) are multiplexed onto stderr. Lines without a
//! tab are not events and are ignored; anything else that fails the grammar
//! is logged at warn level and dropped without failing the job.

use std::fmt;

use tracing::{debug, warn};

use pakbroker_core::{ErrorCode, PackageGroup, PackageId, RestartKind, Status};

/// A single decoded helper event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperEvent {
    /// `package\t<info>\t<package-id>\t<summary>` (stdout).
    Package {
        /// Numeric info code.
        info: u32,
        /// Package identifier; guaranteed to pass the syntactic check.
        package_id: String,
        /// One-line summary.
        summary: String,
    },
    /// `description\t<package-id>\t<licence>\t<group>\t<detail>\t<url>` (stdout).
    Description {
        /// Package identifier.
        package_id: String,
        /// Licence text.
        licence: String,
        /// Package group; unknown names map to [`PackageGroup::Unknown`].
        group: PackageGroup,
        /// Long description.
        detail: String,
        /// Upstream URL.
        url: String,
    },
    /// `percentage\t<0..=100>` (stderr).
    Percentage(u8),
    /// `subpercentage\t<0..=100>` (stderr).
    SubPercentage(u8),
    /// `error\t<code>\t<message>` (stderr).
    ErrorCode {
        /// Error code; unknown names map to [`ErrorCode::Unknown`].
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },
    /// `requirerestart\t<kind>\t<detail>` (stderr).
    RequireRestart {
        /// Restart kind; unknown names map to [`RestartKind::Unknown`].
        kind: RestartKind,
        /// Helper-provided detail.
        detail: String,
    },
    /// `status\t<status>` (stderr).
    Status(Status),
    /// `allow-interrupt\ttrue|false` (stderr).
    AllowInterrupt(bool),
    /// `no-percentage-updates` (stderr).
    NoPercentageUpdates,
}

fn parse_percentage(text: &str) -> Option<u8> {
    match text.parse::<u8>() {
        Ok(value) if value <= 100 => Some(value),
        _ => {
            warn!("invalid percentage '{text}'");
            None
        }
    }
}

/// Decode one stdout line. Returns `None` for non-event lines and for
/// protocol violations.
pub fn parse_output_line(line: &str) -> Option<HelperEvent> {
    if !line.contains('\t') {
        debug!("ignoring non-event output line '{line}'");
        return None;
    }

    let sections: Vec<&str> = line.split('\t').collect();
    match sections[0] {
        "package" => {
            if sections.len() != 4 {
                warn!("invalid command 'package' ({} fields)", sections.len());
                return None;
            }
            if !PackageId::check(sections[2]) {
                warn!("invalid package_id '{}'", sections[2]);
                return None;
            }
            let Ok(info) = sections[1].parse::<u32>() else {
                warn!("invalid info code '{}'", sections[1]);
                return None;
            };
            Some(HelperEvent::Package {
                info,
                package_id: sections[2].to_string(),
                summary: sections[3].to_string(),
            })
        }
        "description" => {
            if sections.len() != 6 {
                warn!("invalid command 'description' ({} fields)", sections.len());
                return None;
            }
            if !PackageId::check(sections[1]) {
                warn!("invalid package_id '{}'", sections[1]);
                return None;
            }
            Some(HelperEvent::Description {
                package_id: sections[1].to_string(),
                licence: sections[2].to_string(),
                group: PackageGroup::from_text(sections[3]),
                detail: sections[4].to_string(),
                url: sections[5].to_string(),
            })
        }
        command => {
            warn!("invalid output command '{command}'");
            None
        }
    }
}

/// Decode one stderr line. Returns `None` for non-event lines and for
/// protocol violations.
pub fn parse_error_line(line: &str) -> Option<HelperEvent> {
    if !line.contains('\t') {
        // `no-percentage-updates` is the only zero-field command.
        if line == "no-percentage-updates" {
            return Some(HelperEvent::NoPercentageUpdates);
        }
        debug!("ignoring non-event error line '{line}'");
        return None;
    }

    let sections: Vec<&str> = line.split('\t').collect();
    match sections[0] {
        "percentage" => {
            if sections.len() != 2 {
                warn!("invalid command 'percentage' ({} fields)", sections.len());
                return None;
            }
            parse_percentage(sections[1]).map(HelperEvent::Percentage)
        }
        "subpercentage" => {
            if sections.len() != 2 {
                warn!("invalid command 'subpercentage' ({} fields)", sections.len());
                return None;
            }
            parse_percentage(sections[1]).map(HelperEvent::SubPercentage)
        }
        "error" => {
            if sections.len() != 3 {
                warn!("invalid command 'error' ({} fields)", sections.len());
                return None;
            }
            Some(HelperEvent::ErrorCode {
                code: ErrorCode::from_text(sections[1]),
                message: sections[2].to_string(),
            })
        }
        "requirerestart" => {
            if sections.len() != 3 {
                warn!("invalid command 'requirerestart' ({} fields)", sections.len());
                return None;
            }
            Some(HelperEvent::RequireRestart {
                kind: RestartKind::from_text(sections[1]),
                detail: sections[2].to_string(),
            })
        }
        "status" => {
            if sections.len() != 2 {
                warn!("invalid command 'status' ({} fields)", sections.len());
                return None;
            }
            Some(HelperEvent::Status(Status::from_text(sections[1])))
        }
        "allow-interrupt" => {
            if sections.len() != 2 {
                warn!("invalid command 'allow-interrupt' ({} fields)", sections.len());
                return None;
            }
            match sections[1] {
                "true" => Some(HelperEvent::AllowInterrupt(true)),
                "false" => Some(HelperEvent::AllowInterrupt(false)),
                other => {
                    warn!("invalid section '{other}'");
                    None
                }
            }
        }
        "no-percentage-updates" => {
            warn!("invalid command 'no-percentage-updates' ({} fields)", sections.len());
            None
        }
        command => {
            warn!("invalid error command '{command}'");
            None
        }
    }
}

impl fmt::Display for HelperEvent {
    /// Render the canonical wire line for this event.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HelperEvent::Package {
                info,
                package_id,
                summary,
            } => write!(f, "package\t{info}\t{package_id}\t{summary}"),
            HelperEvent::Description {
                package_id,
                licence,
                group,
                detail,
                url,
            } => write!(
                f,
                "description\t{package_id}\t{licence}\t{group}\t{detail}\t{url}"
            ),
            HelperEvent::Percentage(p) => write!(f, "percentage\t{p}"),
            HelperEvent::SubPercentage(p) => write!(f, "subpercentage\t{p}"),
            HelperEvent::ErrorCode { code, message } => write!(f, "error\t{code}\t{message}"),
            HelperEvent::RequireRestart { kind, detail } => {
                write!(f, "requirerestart\t{kind}\t{detail}")
            }
            HelperEvent::Status(status) => write!(f, "status\t{status}"),
            HelperEvent::AllowInterrupt(allow) => write!(f, "allow-interrupt\t{allow}"),
            HelperEvent::NoPercentageUpdates => f.write_str("no-percentage-updates"),
        }
    }
}
