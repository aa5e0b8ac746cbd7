// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use crate::{ErrorKind, NetifError};

const SYS_CLASS_NET: &str = "/sys/class/net";

/// How a device should be brought up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlKind {
    Interface,
    Bridge,
}

impl std::fmt::Display for CtlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interface => write!(f, "interface"),
            Self::Bridge => write!(f, "bridge"),
        }
    }
}

/// OS primitives the applier drives. Every operation may fail and a
/// failure aborts the remainder of the run.
pub trait NetOps {
    fn deactivate(&self, name: &str, kind: CtlKind)
        -> Result<(), NetifError>;

    fn activate(&self, name: &str, kind: CtlKind) -> Result<(), NetifError>;

    fn rename(&self, old_name: &str, new_name: &str)
        -> Result<(), NetifError>;

    fn remove_artifact(&self, path: &Path) -> Result<(), NetifError>;

    fn set_active_slave(
        &self,
        bond_name: &str,
        member_name: &str,
    ) -> Result<(), NetifError>;

    fn run_command(
        &self,
        desc: &str,
        program: &str,
        args: &[&str],
    ) -> Result<(), NetifError>;

    /// MAC address of a live device, read from the running system.
    fn hardware_address(&self, name: &str) -> Result<String, NetifError>;
}

/// [NetOps] backed by the initscripts ifup/ifdown helpers and sysfs.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysNetOps {}

impl SysNetOps {
    pub fn new() -> Self {
        Self {}
    }
}

impl NetOps for SysNetOps {
    fn deactivate(
        &self,
        name: &str,
        kind: CtlKind,
    ) -> Result<(), NetifError> {
        self.run_command(
            &format!("running ifdown on {kind}: {name}"),
            "/usr/sbin/ifdown",
            &[name],
        )
    }

    fn activate(&self, name: &str, kind: CtlKind) -> Result<(), NetifError> {
        self.run_command(
            &format!("running ifup on {kind}: {name}"),
            "/usr/sbin/ifup",
            &[name],
        )
    }

    fn rename(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), NetifError> {
        self.run_command(
            &format!("renaming {old_name} to {new_name}"),
            "/usr/sbin/ip",
            &["link", "set", "dev", old_name, "name", new_name],
        )
    }

    fn remove_artifact(&self, path: &Path) -> Result<(), NetifError> {
        log::info!("removing config file: {}", path.display());
        std::fs::remove_file(path).map_err(|e| {
            NetifError::new(
                ErrorKind::ExternalCommand,
                format!("Failed to remove {}: {e}", path.display()),
            )
        })
    }

    fn set_active_slave(
        &self,
        bond_name: &str,
        member_name: &str,
    ) -> Result<(), NetifError> {
        self.run_command(
            &format!(
                "setting active slave of {bond_name} to {member_name}"
            ),
            "/usr/bin/ovs-appctl",
            &["bond/set-active-slave", bond_name, member_name],
        )
    }

    fn run_command(
        &self,
        desc: &str,
        program: &str,
        args: &[&str],
    ) -> Result<(), NetifError> {
        log::info!("{desc}");
        let output = std::process::Command::new(program)
            .args(args)
            .output()
            .map_err(|e| {
                NetifError::new(
                    ErrorKind::ExternalCommand,
                    format!("Failed to execute {program}: {e}"),
                )
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(NetifError::new(
                ErrorKind::ExternalCommand,
                format!(
                    "Command '{program} {}' failed with {}: {}",
                    args.join(" "),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ))
        }
    }

    fn hardware_address(&self, name: &str) -> Result<String, NetifError> {
        let path = format!("{SYS_CLASS_NET}/{name}/address");
        let mac = std::fs::read_to_string(&path).map_err(|e| {
            NetifError::new(
                ErrorKind::HardwareLookup,
                format!("Unable to read mac address of {name}: {e}"),
            )
        })?;
        let mac = mac.trim().to_string();
        if mac.is_empty() {
            return Err(NetifError::new(
                ErrorKind::HardwareLookup,
                format!("Device {name} reports an empty mac address"),
            ));
        }
        Ok(mac)
    }
}
