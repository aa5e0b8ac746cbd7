// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detect::{differs, write_config};
use crate::graph::MemberGraph;
use crate::paths::{
    ifcfg_config_path, ivs_config_path, route6_config_path,
    route_config_path, scripts_dir, IFCFG_PREFIX,
};
use crate::render::{render_device, render_ivs_config, render_routes};
use crate::{
    CtlKind, Device, DeviceKind, ErrorKind, NetOps, NetifError,
};

/// Options fixed at applier construction.
///
/// `noop` computes and returns the artifact map without writing files
/// or issuing any external command. `root_dir` prefixes every artifact
/// path, which makes sandboxed runs possible.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case", default)]
pub struct ApplyConfig {
    pub noop: bool,
    pub root_dir: String,
}

/// Config file family a device belongs to. Families only exist to
/// honor the fixed deactivate/reactivate type ordering, OVS bonds ride
/// with plain interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Interface,
    IvsInterface,
    Vlan,
    Bridge,
    LinuxBridge,
    LinuxBond,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Interface => "interface",
            Self::IvsInterface => "ivs interface",
            Self::Vlan => "vlan interface",
            Self::Bridge => "bridge",
            Self::LinuxBridge => "linux bridge",
            Self::LinuxBond => "linux bond",
        };
        write!(f, "{s}")
    }
}

/// One-shot reconciliation of declared devices against on-disk ifcfg
/// files and the running system.
///
/// All per-run state lives here and is dropped with the value, nothing
/// survives a run. Register devices with [IfcfgApplier::add_device],
/// then drive the deactivate/write/reactivate sequence with
/// [IfcfgApplier::apply].
#[derive(Debug, Clone, Default)]
pub struct IfcfgApplier {
    config: ApplyConfig,
    interface_data: BTreeMap<String, String>,
    ivsinterface_data: BTreeMap<String, String>,
    vlan_data: BTreeMap<String, String>,
    bridge_data: BTreeMap<String, String>,
    linuxbridge_data: BTreeMap<String, String>,
    linuxbond_data: BTreeMap<String, String>,
    route_data: HashMap<String, String>,
    route6_data: HashMap<String, String>,
    member_graph: MemberGraph,
    // original hardware name to declared name
    renamed_interfaces: BTreeMap<String, String>,
    bond_primary_members: BTreeMap<String, String>,
    ivs_uplink_names: HashSet<String>,
}

impl IfcfgApplier {
    pub fn new(config: ApplyConfig) -> Self {
        log::info!("Ifcfg net config applier created");
        Self {
            config,
            ..Default::default()
        }
    }

    fn has_device(&self, name: &str) -> bool {
        self.interface_data.contains_key(name)
            || self.ivsinterface_data.contains_key(name)
            || self.vlan_data.contains_key(name)
            || self.bridge_data.contains_key(name)
            || self.linuxbridge_data.contains_key(name)
            || self.linuxbond_data.contains_key(name)
    }

    /// Render a device and register it for the next [IfcfgApplier::apply].
    ///
    /// Every device claims `ifcfg-<name>` in a namespace shared by all
    /// kinds, a second device with the same name is a fatal conflict.
    pub fn add_device(
        &mut self,
        device: &Device,
        ops: &dyn NetOps,
    ) -> Result<(), NetifError> {
        if device.name.is_empty() {
            return Err(NetifError::new(
                ErrorKind::InvalidArgument,
                "Cannot add a device with an empty name".to_string(),
            ));
        }
        if self.has_device(&device.name) {
            return Err(NetifError::new(
                ErrorKind::ConfigConflict,
                format!(
                    "Device {} is declared twice, \
                     ifcfg file names are shared across all kinds",
                    device.name
                ),
            ));
        }
        log::info!("adding {}: {}", device.kind, device.name);
        let data = render_device(device, ops)?;
        log::debug!("{} data: {data}", device.kind);
        match device.kind {
            DeviceKind::Interface | DeviceKind::OvsBond => {
                self.interface_data.insert(device.name.clone(), data);
            }
            DeviceKind::IvsInterface => {
                self.ivsinterface_data
                    .insert(device.name.clone(), data);
            }
            DeviceKind::Vlan => {
                self.vlan_data.insert(device.name.clone(), data);
            }
            DeviceKind::OvsBridge => {
                self.bridge_data.insert(device.name.clone(), data);
            }
            DeviceKind::LinuxBridge => {
                self.linuxbridge_data
                    .insert(device.name.clone(), data);
            }
            DeviceKind::LinuxBond => {
                self.linuxbond_data.insert(device.name.clone(), data);
            }
        }

        if !device.members.is_empty()
            && matches!(
                device.kind,
                DeviceKind::OvsBridge
                    | DeviceKind::OvsBond
                    | DeviceKind::LinuxBridge
                    | DeviceKind::LinuxBond
            )
        {
            self.member_graph
                .insert(&device.name, device.members.clone());
        }
        if device.kind == DeviceKind::OvsBond {
            if let Some(primary) = device.primary_member.as_ref() {
                self.bond_primary_members
                    .insert(device.name.clone(), primary.clone());
            }
        }
        if matches!(
            device.kind,
            DeviceKind::Interface | DeviceKind::OvsBond
        ) && device.ivs_bridge_name.is_some()
        {
            self.ivs_uplink_names.insert(device.name.clone());
        }

        if !device.routes.is_empty() {
            let (route_data, route6_data) =
                render_routes(&device.name, &device.routes);
            self.route_data.insert(device.name.clone(), route_data);
            self.route6_data
                .insert(device.name.clone(), route6_data);
        }

        if device.renamed && device.kind == DeviceKind::Interface {
            let hwname = device.hwname.as_ref().ok_or_else(|| {
                NetifError::new(
                    ErrorKind::InvalidArgument,
                    format!(
                        "Renamed device {} has no original \
                         hardware name",
                        device.name
                    ),
                )
            })?;
            log::info!(
                "Interface {hwname} being renamed to {}",
                device.name
            );
            self.renamed_interfaces
                .insert(hwname.clone(), device.name.clone());
        }
        Ok(())
    }

    fn family_maps(
        &self,
    ) -> [(&BTreeMap<String, String>, Family); 6] {
        [
            (&self.interface_data, Family::Interface),
            (&self.ivsinterface_data, Family::IvsInterface),
            (&self.vlan_data, Family::Vlan),
            (&self.bridge_data, Family::Bridge),
            (&self.linuxbridge_data, Family::LinuxBridge),
            (&self.linuxbond_data, Family::LinuxBond),
        ]
    }

    /// Members restart along with their parent, in a stable order.
    fn sorted_children(
        &self,
        name: &str,
    ) -> Result<Vec<String>, NetifError> {
        let mut children: Vec<String> = self
            .member_graph
            .transitive_members(name)?
            .into_iter()
            .collect();
        children.sort();
        Ok(children)
    }

    /// Run one reconciliation pass.
    ///
    /// `cleanup` deactivates and deletes ifcfg files not owned by the
    /// current device set (the loopback device is exempt). `activate`
    /// drives ifdown/ifup around the file updates; deactivation also
    /// happens when only `cleanup` is requested.
    ///
    /// Returns the map of file path to content that was written, or
    /// would have been written in noop mode. Unchanged artifacts are
    /// never rewritten and never restart their devices.
    pub fn apply(
        &self,
        cleanup: bool,
        activate: bool,
        ops: &dyn NetOps,
    ) -> Result<BTreeMap<String, String>, NetifError> {
        log::info!("applying network configs...");
        let root_dir = self.config.root_dir.as_str();
        let noop = self.config.noop;

        let mut restart_interfaces: Vec<String> = Vec::new();
        let mut restart_vlans: Vec<String> = Vec::new();
        let mut restart_bridges: Vec<String> = Vec::new();
        let mut restart_linux_bonds: Vec<String> = Vec::new();
        let mut update_files: BTreeMap<String, String> = BTreeMap::new();
        let mut all_file_names: HashSet<String> = HashSet::new();
        let mut ivs_uplinks: Vec<String> = Vec::new();
        let mut ivs_internal_ports: Vec<String> = Vec::new();

        for (family_data, family) in self.family_maps() {
            for (name, data) in family_data {
                let route_data = self
                    .route_data
                    .get(name)
                    .cloned()
                    .unwrap_or_default();
                let route6_data = self
                    .route6_data
                    .get(name)
                    .cloned()
                    .unwrap_or_default();
                let config_path = ifcfg_config_path(root_dir, name);
                let route_path = route_config_path(root_dir, name);
                let route6_path = route6_config_path(root_dir, name);
                all_file_names.insert(config_path.clone());
                all_file_names.insert(route_path.clone());
                all_file_names.insert(route6_path.clone());
                if family == Family::Interface
                    && self.ivs_uplink_names.contains(name)
                {
                    ivs_uplinks.push(name.clone());
                }
                if family == Family::IvsInterface {
                    ivs_internal_ports.push(name.clone());
                }
                let changed = differs(Path::new(&config_path), data)
                    || differs(Path::new(&route_path), &route_data)
                    || differs(Path::new(&route6_path), &route6_data);
                if !changed {
                    log::info!(
                        "No changes required for {family}: {name}"
                    );
                    continue;
                }
                let children = self.sorted_children(name)?;
                match family {
                    Family::Vlan => {
                        restart_vlans.push(name.clone());
                        restart_vlans.extend(children);
                    }
                    Family::Interface | Family::IvsInterface => {
                        restart_interfaces.push(name.clone());
                        restart_interfaces.extend(children);
                    }
                    Family::Bridge | Family::LinuxBridge => {
                        restart_bridges.push(name.clone());
                        restart_interfaces.extend(children);
                    }
                    Family::LinuxBond => {
                        restart_linux_bonds.push(name.clone());
                        restart_interfaces.extend(children);
                    }
                }
                update_files.insert(config_path, data.clone());
                update_files.insert(route_path, route_data);
                update_files.insert(route6_path, route6_data);
            }
        }

        if cleanup {
            for (stale_path, stale_name) in
                self.stale_config_files(&all_file_names)
            {
                log::info!("cleaning up interface: {stale_name}");
                if !noop {
                    ops.deactivate(&stale_name, CtlKind::Interface)
                        .map_err(|e| stage_err("cleanup", e))?;
                    ops.remove_artifact(Path::new(&stale_path))
                        .map_err(|e| stage_err("cleanup", e))?;
                }
            }
        }

        if (activate || cleanup) && !noop {
            for vlan in &restart_vlans {
                ops.deactivate(vlan, CtlKind::Interface)
                    .map_err(|e| stage_err("deactivate", e))?;
            }
            for interface in &restart_interfaces {
                ops.deactivate(interface, CtlKind::Interface)
                    .map_err(|e| stage_err("deactivate", e))?;
            }
            for linux_bond in &restart_linux_bonds {
                ops.deactivate(linux_bond, CtlKind::Interface)
                    .map_err(|e| stage_err("deactivate", e))?;
            }
            for bridge in &restart_bridges {
                ops.deactivate(bridge, CtlKind::Bridge)
                    .map_err(|e| stage_err("deactivate", e))?;
            }
        }

        if activate && !noop {
            for (old_name, new_name) in &self.renamed_interfaces {
                ops.rename(old_name, new_name)
                    .map_err(|e| stage_err("rename", e))?;
            }
        }

        // The shared IVS service config lists every uplink and internal
        // port of the run, so it only changes when membership changes.
        let mut ivs_changed = false;
        if !ivs_uplinks.is_empty() || !ivs_internal_ports.is_empty() {
            let ivs_path = ivs_config_path(root_dir);
            let ivs_data =
                render_ivs_config(&ivs_uplinks, &ivs_internal_ports);
            ivs_changed = differs(Path::new(&ivs_path), &ivs_data);
            if ivs_changed {
                update_files.insert(ivs_path, ivs_data);
            }
        }

        for (path, data) in &update_files {
            log::info!("writing config file: {path}");
            if !noop {
                write_config(Path::new(path), data)
                    .map_err(|e| stage_err("write", e))?;
            }
        }

        if activate && !noop {
            for linux_bond in &restart_linux_bonds {
                ops.activate(linux_bond, CtlKind::Interface)
                    .map_err(|e| stage_err("reactivate", e))?;
            }
            for bridge in &restart_bridges {
                ops.activate(bridge, CtlKind::Bridge)
                    .map_err(|e| stage_err("reactivate", e))?;
            }
            for interface in &restart_interfaces {
                ops.activate(interface, CtlKind::Interface)
                    .map_err(|e| stage_err("reactivate", e))?;
            }
            for (bond_name, primary) in &self.bond_primary_members {
                if restart_interfaces.iter().any(|n| n == bond_name) {
                    ops.set_active_slave(bond_name, primary)
                        .map_err(|e| stage_err("reactivate", e))?;
                }
            }
            let ivs_restarted = ivs_changed
                || ivs_uplinks
                    .iter()
                    .chain(ivs_internal_ports.iter())
                    .any(|n| restart_interfaces.contains(n));
            if ivs_restarted {
                log::info!(
                    "Attach to ivs with uplinks: {ivs_uplinks:?}, \
                     interfaces: {ivs_internal_ports:?}"
                );
                for ivs_uplink in &ivs_uplinks {
                    ops.activate(ivs_uplink, CtlKind::Interface)
                        .map_err(|e| stage_err("reactivate", e))?;
                }
                for ivs_interface in &ivs_internal_ports {
                    ops.activate(ivs_interface, CtlKind::Interface)
                        .map_err(|e| stage_err("reactivate", e))?;
                }
                ops.run_command(
                    "Restart ivs",
                    "/usr/bin/systemctl",
                    &["restart", "ivs"],
                )
                .map_err(|e| stage_err("reactivate", e))?;
            }
            for vlan in &restart_vlans {
                ops.activate(vlan, CtlKind::Interface)
                    .map_err(|e| stage_err("reactivate", e))?;
            }
        }

        Ok(update_files)
    }

    /// On-disk ifcfg files not owned by the current run, loopback
    /// excluded, as (path, device name) pairs in a stable order.
    fn stale_config_files(
        &self,
        all_file_names: &HashSet<String>,
    ) -> Vec<(String, String)> {
        let dir = scripts_dir(&self.config.root_dir);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            // a missing scripts dir has nothing to clean up
            Err(_) => return Vec::new(),
        };
        let mut stale: Vec<(String, String)> = Vec::new();
        for entry in entries.flatten() {
            let file_name =
                entry.file_name().to_string_lossy().to_string();
            let Some(device_name) =
                file_name.strip_prefix(IFCFG_PREFIX)
            else {
                continue;
            };
            let path = format!("{dir}/{file_name}");
            if all_file_names.contains(&path) || device_name == "lo" {
                continue;
            }
            stale.push((path, device_name.to_string()));
        }
        stale.sort();
        stale
    }
}

fn stage_err(stage: &str, e: NetifError) -> NetifError {
    NetifError::new(
        e.kind,
        format!("apply stage '{stage}' failed: {}", e.msg),
    )
}
