// SPDX-License-Identifier: Apache-2.0

pub(crate) const SCRIPTS_DIR: &str = "/etc/sysconfig/network-scripts";
pub(crate) const IFCFG_PREFIX: &str = "ifcfg-";

pub(crate) fn ifcfg_config_path(root_dir: &str, name: &str) -> String {
    format!("{root_dir}{SCRIPTS_DIR}/{IFCFG_PREFIX}{name}")
}

pub(crate) fn route_config_path(root_dir: &str, name: &str) -> String {
    format!("{root_dir}{SCRIPTS_DIR}/route-{name}")
}

pub(crate) fn route6_config_path(root_dir: &str, name: &str) -> String {
    format!("{root_dir}{SCRIPTS_DIR}/route6-{name}")
}

/// The IVS service config is shared by the whole node, not per-device.
pub(crate) fn ivs_config_path(root_dir: &str) -> String {
    format!("{root_dir}/etc/sysconfig/ivs")
}

pub(crate) fn scripts_dir(root_dir: &str) -> String {
    format!("{root_dir}{SCRIPTS_DIR}")
}
