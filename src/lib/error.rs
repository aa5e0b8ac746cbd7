// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Please report this as bug to upstream
    Bug,
    /// Two devices claim the same config file name
    ConfigConflict,
    /// Device membership graph contains a cycle
    DependencyCycle,
    /// Failed to read a MAC address from the live system
    HardwareLookup,
    /// An ifup/ifdown/rename/service command reported failure
    ExternalCommand,
    /// Invalid argument
    InvalidArgument,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Bug => "bug",
            Self::ConfigConflict => "config-conflict",
            Self::DependencyCycle => "dependency-cycle",
            Self::HardwareLookup => "hardware-lookup",
            Self::ExternalCommand => "external-command",
            Self::InvalidArgument => "invalid-argument",
        };
        write!(f, "{s}")
    }
}

// Try not implement From for NetifError here unless you are sure this
// error should always convert to certain type of ErrorKind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct NetifError {
    pub kind: ErrorKind,
    pub msg: String,
}

impl std::fmt::Display for NetifError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl NetifError {
    pub fn new(kind: ErrorKind, msg: String) -> Self {
        Self { kind, msg }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn msg(&self) -> &str {
        self.msg.as_str()
    }
}

impl std::error::Error for NetifError {}

impl From<std::io::Error> for NetifError {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorKind::Bug, format!("std::io::Error: {e}"))
    }
}
