use std::fmt;

use serde::{Deserialize, Serialize};

/// A package identifier of the form `name;version;arch;data`.
///
/// Only the name is mandatory; the remaining fields may be empty, which is
/// how helpers describe packages they cannot fully resolve yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub data: String,
}

impl PackageId {
    /// Parse an identifier, returning `None` unless it has exactly four
    /// `;`-separated fields and a non-empty name.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(';');
        let name = parts.next()?;
        let version = parts.next()?;
        let arch = parts.next()?;
        let data = parts.next()?;
        if parts.next().is_some() || name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            version: version.to_string(),
            arch: arch.to_string(),
            data: data.to_string(),
        })
    }

    /// Syntactic check used by the helper-protocol parser.
    pub fn check(text: &str) -> bool {
        Self::parse(text).is_some()
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{};{};{}", self.name, self.version, self.arch, self.data)
    }
}
