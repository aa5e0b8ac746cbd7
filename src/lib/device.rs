// SPDX-License-Identifier: Apache-2.0

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, NetifError};

/// Kind of network device backing an ifcfg file.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum DeviceKind {
    /// Physical or plain kernel interface.
    #[default]
    Interface,
    /// 802.1q VLAN interface.
    Vlan,
    /// OpenvSwitch bridge.
    OvsBridge,
    /// OpenvSwitch bond.
    OvsBond,
    /// Bridge provided by Linux kernel.
    LinuxBridge,
    /// Bond provided by Linux kernel.
    LinuxBond,
    /// IVS internal port.
    IvsInterface,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Interface => "interface",
            Self::Vlan => "vlan",
            Self::OvsBridge => "ovs-bridge",
            Self::OvsBond => "ovs-bond",
            Self::LinuxBridge => "linux-bridge",
            Self::LinuxBond => "linux-bond",
            Self::IvsInterface => "ivs-interface",
        };
        write!(f, "{s}")
    }
}

/// IP address with prefix length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub ip: IpAddr,
    pub prefix: u8,
}

impl Address {
    pub fn new(ip: IpAddr, prefix: u8) -> Result<Self, NetifError> {
        let max_prefix = if ip.is_ipv6() { 128 } else { 32 };
        if prefix > max_prefix {
            return Err(NetifError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid prefix length {prefix} for address {ip}"),
            ));
        }
        Ok(Self { ip, prefix })
    }

    pub fn is_ipv6(&self) -> bool {
        self.ip.is_ipv6()
    }

    /// Dotted-quad netmask, only meaningful for IPv4 addresses.
    pub fn netmask(&self) -> String {
        let bits: u32 = if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        };
        Ipv4Addr::from(bits).to_string()
    }

    pub fn ip_netmask(&self) -> String {
        format!("{}/{}", self.ip, self.prefix)
    }
}

impl FromStr for Address {
    type Err = NetifError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip_str, prefix_str) = s.split_once('/').ok_or_else(|| {
            NetifError::new(
                ErrorKind::InvalidArgument,
                format!("Address '{s}' is not in <ip>/<prefix> form"),
            )
        })?;
        let ip = IpAddr::from_str(ip_str).map_err(|e| {
            NetifError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid IP address '{ip_str}': {e}"),
            )
        })?;
        let prefix = prefix_str.parse::<u8>().map_err(|e| {
            NetifError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid prefix length '{prefix_str}': {e}"),
            )
        })?;
        Self::new(ip, prefix)
    }
}

/// Static route owned by a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case", default)]
#[non_exhaustive]
pub struct Route {
    pub next_hop: String,
    /// Destination in `<ip>/<prefix>` form, ignored for default routes.
    pub destination: Option<String>,
    pub default: bool,
}

impl Route {
    pub fn new(next_hop: &str, destination: &str) -> Self {
        Self {
            next_hop: next_hop.to_string(),
            destination: Some(destination.to_string()),
            default: false,
        }
    }

    pub fn new_default(next_hop: &str) -> Self {
        Self {
            next_hop: next_hop.to_string(),
            destination: None,
            default: true,
        }
    }

    /// IP family is inferred from the next hop syntax.
    pub fn is_ipv6(&self) -> bool {
        self.next_hop.contains(':')
    }
}

/// Declarative description of one network device.
///
/// The `name` is the key into the shared ifcfg file namespace, no two
/// devices may share it regardless of their kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
#[non_exhaustive]
pub struct Device {
    pub name: String,
    pub kind: DeviceKind,
    pub mtu: Option<u32>,
    /// Explicit MAC address override.
    pub hwaddr: Option<String>,
    pub use_dhcp: bool,
    pub use_dhcpv6: bool,
    /// First address of each family is primary, the rest are secondary.
    pub addresses: Vec<Address>,
    pub routes: Vec<Route>,
    pub dns_servers: Vec<String>,
    /// Direct members, only meaningful for bridge and bond kinds.
    pub members: Vec<String>,
    /// Member whose MAC is inherited and which becomes the active slave.
    pub primary_member: Option<String>,
    /// Device is plugged into an OVS bridge as a port.
    pub ovs_port: bool,
    /// Owning OVS bridge.
    pub bridge_name: Option<String>,
    pub vlan_id: Option<u16>,
    /// Physical parent of a VLAN device.
    pub physdev: Option<String>,
    pub linux_bridge_name: Option<String>,
    pub linux_bond_name: Option<String>,
    pub ivs_bridge_name: Option<String>,
    pub ovs_options: Option<String>,
    pub ovs_extra: Vec<String>,
    pub bonding_options: Option<String>,
    /// Device is renamed from `hwname` to `name` during apply.
    pub renamed: bool,
    pub hwname: Option<String>,
    /// When false, `DEFROUTE=no` is emitted.
    pub defroute: bool,
    pub dhclient_args: Option<String>,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: DeviceKind::default(),
            mtu: None,
            hwaddr: None,
            use_dhcp: false,
            use_dhcpv6: false,
            addresses: Vec::new(),
            routes: Vec::new(),
            dns_servers: Vec::new(),
            members: Vec::new(),
            primary_member: None,
            ovs_port: false,
            bridge_name: None,
            vlan_id: None,
            physdev: None,
            linux_bridge_name: None,
            linux_bond_name: None,
            ivs_bridge_name: None,
            ovs_options: None,
            ovs_extra: Vec::new(),
            bonding_options: None,
            renamed: false,
            hwname: None,
            defroute: true,
            dhclient_args: None,
        }
    }
}

impl Device {
    pub fn new(name: &str, kind: DeviceKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ..Default::default()
        }
    }

    pub fn v4_addresses(&self) -> Vec<&Address> {
        self.addresses.iter().filter(|a| !a.is_ipv6()).collect()
    }

    pub fn v6_addresses(&self) -> Vec<&Address> {
        self.addresses.iter().filter(|a| a.is_ipv6()).collect()
    }

    /// IPv6 is in play when DHCPv6 is requested or any IPv6 address is
    /// assigned.
    pub fn is_ipv6_enabled(&self) -> bool {
        self.use_dhcpv6 || self.addresses.iter().any(|a| a.is_ipv6())
    }
}
