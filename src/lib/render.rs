// SPDX-License-Identifier: Apache-2.0

use crate::{Device, DeviceKind, NetOps, NetifError, Route};

/// Names shaped like `eth0.100` are VLAN devices even when declared as
/// plain interfaces.
fn is_vlan_style_name(name: &str) -> bool {
    match name.split_once('.') {
        Some((prefix, suffix)) => {
            !prefix.is_empty()
                && prefix
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Render the ifcfg file content for one device. Deterministic: the
/// same device always renders to byte-identical output, which is what
/// keeps change detection stable across runs.
///
/// MAC inheritance from a primary member is resolved through `ops`, a
/// failed lookup aborts the run.
pub(crate) fn render_device(
    device: &Device,
    ops: &dyn NetOps,
) -> Result<String, NetifError> {
    let mut data = String::from(
        "# This file is autogenerated by netifcfg\n",
    );
    let mut ovs_extra: Vec<String> = Vec::new();

    data.push_str(&format!("DEVICE={}\n", device.name));
    data.push_str("ONBOOT=yes\n");
    data.push_str("HOTPLUG=no\n");
    data.push_str("NM_CONTROLLED=no\n");
    if device.dns_servers.is_empty() && !device.use_dhcp {
        data.push_str("PEERDNS=no\n");
    }

    match device.kind {
        DeviceKind::Vlan => {
            // VLANs on OVS bridges are internal ports, no PHYSDEV
            if !device.ovs_port {
                data.push_str("VLAN=yes\n");
                if let Some(physdev) = device.physdev.as_ref() {
                    data.push_str(&format!("PHYSDEV={physdev}\n"));
                } else if let Some(bond_name) =
                    device.linux_bond_name.as_ref()
                {
                    data.push_str(&format!("PHYSDEV={bond_name}\n"));
                }
            }
        }
        DeviceKind::IvsInterface => {
            data.push_str("TYPE=IVSIntPort\n");
        }
        _ => {
            if is_vlan_style_name(&device.name) {
                data.push_str("VLAN=yes\n");
            }
        }
    }

    if let Some(bond_name) = device.linux_bond_name.as_ref() {
        data.push_str(&format!("MASTER={bond_name}\n"));
        data.push_str("SLAVE=yes\n");
    }
    if let Some(ivs_bridge) = device.ivs_bridge_name.as_ref() {
        data.push_str("DEVICETYPE=ivs\n");
        data.push_str(&format!("IVS_BRIDGE={ivs_bridge}\n"));
    }
    if device.ovs_port {
        data.push_str("DEVICETYPE=ovs\n");
        if let Some(bridge_name) = device.bridge_name.as_ref() {
            if device.kind == DeviceKind::Vlan {
                data.push_str("TYPE=OVSIntPort\n");
                data.push_str(&format!("OVS_BRIDGE={bridge_name}\n"));
                data.push_str(&format!(
                    "OVS_OPTIONS=\"tag={}\"\n",
                    device.vlan_id.unwrap_or_default()
                ));
            } else {
                data.push_str("TYPE=OVSPort\n");
                data.push_str(&format!("OVS_BRIDGE={bridge_name}\n"));
            }
        }
    }
    if let Some(bridge_name) = device.linux_bridge_name.as_ref() {
        data.push_str(&format!("BRIDGE={bridge_name}\n"));
    }

    match device.kind {
        DeviceKind::OvsBridge => {
            data.push_str("DEVICETYPE=ovs\n");
            data.push_str("TYPE=OVSBridge\n");
            if device.use_dhcp {
                data.push_str("OVSBOOTPROTO=dhcp\n");
                if !device.members.is_empty() {
                    data.push_str(&format!(
                        "OVSDHCPINTERFACES=\"{}\"\n",
                        device.members.join(" ")
                    ));
                }
            }
            if let Some(primary) = device.primary_member.as_ref() {
                let mac = ops.hardware_address(primary)?;
                ovs_extra.push(format!(
                    "set bridge {} other-config:hwaddr={mac}",
                    device.name
                ));
            }
            if let Some(options) = device.ovs_options.as_ref() {
                data.push_str(&format!("OVS_OPTIONS=\"{options}\"\n"));
            }
            ovs_extra.extend(device.ovs_extra.iter().cloned());
        }
        DeviceKind::OvsBond => {
            data.push_str("DEVICETYPE=ovs\n");
            data.push_str("TYPE=OVSBond\n");
            if device.use_dhcp {
                data.push_str("OVSBOOTPROTO=dhcp\n");
            }
            if !device.members.is_empty() {
                data.push_str(&format!(
                    "BOND_IFACES=\"{}\"\n",
                    device.members.join(" ")
                ));
            }
            if let Some(options) = device.ovs_options.as_ref() {
                data.push_str(&format!("OVS_OPTIONS=\"{options}\"\n"));
            }
            ovs_extra.extend(device.ovs_extra.iter().cloned());
        }
        DeviceKind::LinuxBridge => {
            data.push_str("TYPE=Bridge\n");
            data.push_str("DELAY=0\n");
            if device.use_dhcp {
                data.push_str("BOOTPROTO=dhcp\n");
            }
            if let Some(primary) = device.primary_member.as_ref() {
                let mac = ops.hardware_address(primary)?;
                data.push_str(&format!("MACADDR=\"{mac}\"\n"));
            }
        }
        DeviceKind::LinuxBond => {
            if let Some(primary) = device.primary_member.as_ref() {
                let mac = ops.hardware_address(primary)?;
                data.push_str(&format!("MACADDR=\"{mac}\"\n"));
            }
            if device.use_dhcp {
                data.push_str("BOOTPROTO=dhcp\n");
            }
            if let Some(options) = device.bonding_options.as_ref() {
                data.push_str(&format!("BONDING_OPTS=\"{options}\"\n"));
            }
        }
        _ => {
            if device.use_dhcp {
                data.push_str("BOOTPROTO=dhcp\n");
            } else if device.addresses.is_empty() {
                data.push_str("BOOTPROTO=none\n");
            }
        }
    }

    if let Some(mtu) = device.mtu {
        data.push_str(&format!("MTU={mtu}\n"));
    }
    if device.is_ipv6_enabled() {
        data.push_str("IPV6INIT=yes\n");
        if let Some(mtu) = device.mtu {
            data.push_str(&format!("IPV6_MTU={mtu}\n"));
        }
    }
    // DHCPv6 wins over static IPv6 addressing
    if device.use_dhcpv6 {
        data.push_str("DHCPV6C=yes\n");
    } else if !device.addresses.is_empty() {
        let v4_addresses = device.v4_addresses();
        if !v4_addresses.is_empty() {
            data.push_str("BOOTPROTO=static\n");
            for (i, address) in v4_addresses.iter().enumerate() {
                let num = if i == 0 {
                    String::new()
                } else {
                    i.to_string()
                };
                data.push_str(&format!("IPADDR{num}={}\n", address.ip));
                data.push_str(&format!(
                    "NETMASK{num}={}\n",
                    address.netmask()
                ));
            }
        }
        let v6_addresses = device.v6_addresses();
        if let Some(first_v6) = v6_addresses.first() {
            data.push_str("IPV6_AUTOCONF=no\n");
            data.push_str(&format!(
                "IPV6ADDR={}\n",
                first_v6.ip_netmask()
            ));
            if v6_addresses.len() > 1 {
                let secondaries_v6 = v6_addresses[1..]
                    .iter()
                    .map(|a| a.ip_netmask())
                    .collect::<Vec<String>>()
                    .join(" ");
                data.push_str(&format!(
                    "IPV6ADDR_SECONDARIES=\"{secondaries_v6}\"\n"
                ));
            }
        }
    }

    if let Some(hwaddr) = device.hwaddr.as_ref() {
        data.push_str(&format!("HWADDR={hwaddr}\n"));
    }
    if !ovs_extra.is_empty() {
        data.push_str(&format!(
            "OVS_EXTRA=\"{}\"\n",
            ovs_extra.join(" -- ")
        ));
    }
    if !device.defroute {
        data.push_str("DEFROUTE=no\n");
    }
    if let Some(dhclient_args) = device.dhclient_args.as_ref() {
        data.push_str(&format!("DHCLIENTARGS={dhclient_args}\n"));
    }
    if let Some(dns1) = device.dns_servers.first() {
        data.push_str(&format!("DNS1={dns1}\n"));
        if let Some(dns2) = device.dns_servers.get(1) {
            data.push_str(&format!("DNS2={dns2}\n"));
        }
        if device.dns_servers.len() > 2 {
            log::warn!(
                "ifcfg format supports a max of 2 dns servers, \
                 dropping extra entries of {}",
                device.name
            );
        }
    }
    Ok(data)
}

/// Route file content for one device, IPv4 and IPv6 files separately.
/// A default route always occupies the first line of its family. More
/// than one default per family keeps last-wins placement, with a
/// warning.
pub(crate) fn render_routes(
    device_name: &str,
    routes: &[Route],
) -> (String, String) {
    log::info!("adding custom route for interface: {device_name}");
    let mut first_line = String::new();
    let mut data = String::new();
    let mut first_line6 = String::new();
    let mut data6 = String::new();
    for route in routes {
        if route.is_ipv6() {
            if route.default {
                if !first_line6.is_empty() {
                    log::warn!(
                        "Multiple IPv6 default routes for {device_name}, \
                         last one wins"
                    );
                }
                first_line6 = format!(
                    "default via {} dev {device_name}\n",
                    route.next_hop
                );
            } else {
                data6.push_str(&format!(
                    "{} via {} dev {device_name}\n",
                    route.destination.as_deref().unwrap_or_default(),
                    route.next_hop
                ));
            }
        } else if route.default {
            if !first_line.is_empty() {
                log::warn!(
                    "Multiple IPv4 default routes for {device_name}, \
                     last one wins"
                );
            }
            first_line = format!(
                "default via {} dev {device_name}\n",
                route.next_hop
            );
        } else {
            data.push_str(&format!(
                "{} via {} dev {device_name}\n",
                route.destination.as_deref().unwrap_or_default(),
                route.next_hop
            ));
        }
    }
    let route_data = first_line + &data;
    let route6_data = first_line6 + &data6;
    log::debug!("route data: {route_data}");
    log::debug!("ipv6 route data: {route6_data}");
    (route_data, route6_data)
}

/// Daemon arguments for the shared IVS service config, one `-u` per
/// uplink and one `--internal-port=` per internal port.
pub(crate) fn render_ivs_config(
    uplinks: &[String],
    internal_ports: &[String],
) -> String {
    let uplink_str: String = uplinks
        .iter()
        .map(|name| format!(" -u {name}"))
        .collect();
    let port_str: String = internal_ports
        .iter()
        .map(|name| format!(" --internal-port={name}"))
        .collect();
    format!(
        "DAEMON_ARGS=\"--hitless --certificate /etc/ivs \
         --inband-vlan 4092{uplink_str}{port_str}\""
    )
}
