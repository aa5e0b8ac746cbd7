// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use super::RecordingOps;
use crate::{
    Address, ApplyConfig, CtlKind, Device, DeviceKind, ErrorKind,
    IfcfgApplier, NetOps, NetifError, Route,
};

fn sandbox() -> (tempfile::TempDir, ApplyConfig) {
    super::init_logger();
    let dir = tempfile::tempdir().unwrap();
    let root_dir = dir.path().to_str().unwrap().to_string();
    std::fs::create_dir_all(format!(
        "{root_dir}/etc/sysconfig/network-scripts"
    ))
    .unwrap();
    (
        dir,
        ApplyConfig {
            noop: false,
            root_dir,
        },
    )
}

/// OVS bridge with two ports, the shape a deployment host usually has.
fn bridge_model() -> Vec<Device> {
    let mut bridge = Device::new("br-ex", DeviceKind::OvsBridge);
    bridge.members = vec!["em1".to_string(), "em2".to_string()];
    bridge.addresses = vec!["10.0.0.5/24".parse::<Address>().unwrap()];
    let mut em1 = Device::new("em1", DeviceKind::Interface);
    em1.ovs_port = true;
    em1.bridge_name = Some("br-ex".to_string());
    let mut em2 = Device::new("em2", DeviceKind::Interface);
    em2.ovs_port = true;
    em2.bridge_name = Some("br-ex".to_string());
    vec![bridge, em1, em2]
}

fn applier_with(
    config: &ApplyConfig,
    devices: &[Device],
    ops: &dyn NetOps,
) -> IfcfgApplier {
    let mut applier = IfcfgApplier::new(config.clone());
    for device in devices {
        applier.add_device(device, ops).unwrap();
    }
    applier
}

#[test]
fn test_first_run_writes_all_artifacts() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let applier = applier_with(&config, &bridge_model(), &ops);
    let written = applier.apply(false, true, &ops).unwrap();

    let scripts = format!("{}/etc/sysconfig/network-scripts", config.root_dir);
    // three devices, each owning ifcfg + route + route6
    assert_eq!(written.len(), 9);
    for name in ["br-ex", "em1", "em2"] {
        let path = format!("{scripts}/ifcfg-{name}");
        assert!(written.contains_key(&path));
        assert!(Path::new(&path).exists());
    }
    // empty route files are still owned and written
    assert_eq!(
        written.get(&format!("{scripts}/route-em1")),
        Some(&String::new())
    );
}

#[test]
fn test_second_run_is_idempotent() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let applier = applier_with(&config, &bridge_model(), &ops);
    applier.apply(false, true, &ops).unwrap();

    let ops2 = RecordingOps::default();
    let applier2 = applier_with(&config, &bridge_model(), &ops2);
    let written = applier2.apply(false, true, &ops2).unwrap();
    assert!(written.is_empty());
    // no-op isolation, nothing differs so no command runs at all
    assert!(ops2.recorded().is_empty());
}

#[test]
fn test_bridge_change_restarts_transitive_members() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let applier = applier_with(&config, &bridge_model(), &ops);
    applier.apply(false, true, &ops).unwrap();

    let mut devices = bridge_model();
    devices[0].mtu = Some(9000);
    let ops2 = RecordingOps::default();
    let applier2 = applier_with(&config, &devices, &ops2);
    let written = applier2.apply(false, true, &ops2).unwrap();

    // only the bridge's own files changed on disk
    assert_eq!(written.len(), 3);
    let calls = ops2.recorded();
    // members go down before the bridge and come up after it
    assert!(calls.contains(&"ifdown interface em1".to_string()));
    assert!(calls.contains(&"ifdown interface em2".to_string()));
    assert!(calls.contains(&"ifdown bridge br-ex".to_string()));
    let down_em1 = calls
        .iter()
        .position(|c| c == "ifdown interface em1")
        .unwrap();
    let down_bridge = calls
        .iter()
        .position(|c| c == "ifdown bridge br-ex")
        .unwrap();
    let up_bridge = calls
        .iter()
        .position(|c| c == "ifup bridge br-ex")
        .unwrap();
    let up_em1 = calls
        .iter()
        .position(|c| c == "ifup interface em1")
        .unwrap();
    assert!(down_em1 < down_bridge);
    assert!(down_bridge < up_bridge);
    assert!(up_bridge < up_em1);
}

#[test]
fn test_noop_returns_identical_map_without_side_effects() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let applier = applier_with(&config, &bridge_model(), &ops);
    let written = applier.apply(false, true, &ops).unwrap();

    let (_dir2, mut noop_config) = sandbox();
    noop_config.noop = true;
    let ops2 = RecordingOps::default();
    let applier2 = applier_with(&noop_config, &bridge_model(), &ops2);
    let noop_written = applier2.apply(false, true, &ops2).unwrap();

    // identical artifact content, modulo the differing root prefix
    assert_eq!(written.len(), noop_written.len());
    for (path, data) in &written {
        let relative = path
            .strip_prefix(config.root_dir.as_str())
            .unwrap()
            .to_string();
        let noop_path =
            format!("{}{relative}", noop_config.root_dir);
        assert_eq!(noop_written.get(&noop_path), Some(data));
        assert!(!Path::new(&noop_path).exists());
    }
    assert!(ops2.recorded().is_empty());
}

#[test]
fn test_cleanup_removes_stale_files_but_never_loopback() {
    let (_dir, config) = sandbox();
    let scripts = format!("{}/etc/sysconfig/network-scripts", config.root_dir);
    std::fs::write(format!("{scripts}/ifcfg-lo"), "DEVICE=lo\n").unwrap();
    std::fs::write(
        format!("{scripts}/ifcfg-stale0"),
        "DEVICE=stale0\n",
    )
    .unwrap();

    let ops = RecordingOps::default();
    let applier = applier_with(&config, &bridge_model(), &ops);
    applier.apply(true, false, &ops).unwrap();

    assert!(!Path::new(&format!("{scripts}/ifcfg-stale0")).exists());
    assert!(Path::new(&format!("{scripts}/ifcfg-lo")).exists());
    let calls = ops.recorded();
    assert!(calls.contains(&"ifdown interface stale0".to_string()));
    assert!(!calls.iter().any(|c| c.contains(" lo")));
    // cleanup alone still deactivates changed devices ...
    assert!(calls.contains(&"ifdown bridge br-ex".to_string()));
    // ... but does not reactivate them
    assert!(!calls.iter().any(|c| c.starts_with("ifup")));
}

#[test]
fn test_duplicate_device_name_is_a_conflict() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let mut applier = IfcfgApplier::new(config);
    let interface = Device::new("em1", DeviceKind::Interface);
    let mut bridge = Device::new("em1", DeviceKind::LinuxBridge);
    bridge.members = vec!["eth3".to_string()];
    applier.add_device(&interface, &ops).unwrap();
    let result = applier.add_device(&bridge, &ops);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::ConfigConflict);
    }
}

#[test]
fn test_route_files_carry_rendered_routes() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let mut em1 = Device::new("em1", DeviceKind::Interface);
    em1.addresses = vec!["10.0.0.5/24".parse::<Address>().unwrap()];
    em1.routes = vec![
        Route::new("10.0.0.1", "10.1.0.0/24"),
        Route::new_default("10.0.0.1"),
    ];
    let applier = applier_with(&config, &[em1], &ops);
    let written = applier.apply(false, false, &ops).unwrap();
    let scripts = format!("{}/etc/sysconfig/network-scripts", config.root_dir);
    assert_eq!(
        written.get(&format!("{scripts}/route-em1")),
        Some(
            &"default via 10.0.0.1 dev em1\n\
              10.1.0.0/24 via 10.0.0.1 dev em1\n"
                .to_string()
        )
    );
    assert_eq!(
        written.get(&format!("{scripts}/route6-em1")),
        Some(&String::new())
    );
}

#[test]
fn test_renamed_interface_is_remapped() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let mut em1 = Device::new("em1", DeviceKind::Interface);
    em1.renamed = true;
    em1.hwname = Some("eth0".to_string());
    let applier = applier_with(&config, &[em1], &ops);
    applier.apply(false, true, &ops).unwrap();
    assert!(ops
        .recorded()
        .contains(&"rename eth0 em1".to_string()));
}

#[test]
fn test_renamed_interface_requires_hardware_name() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let mut applier = IfcfgApplier::new(config);
    let mut em1 = Device::new("em1", DeviceKind::Interface);
    em1.renamed = true;
    let result = applier.add_device(&em1, &ops);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_ovs_bond_primary_member_becomes_active_slave() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let mut bond = Device::new("bond0", DeviceKind::OvsBond);
    bond.members = vec!["em1".to_string(), "em2".to_string()];
    bond.primary_member = Some("em1".to_string());
    let applier = applier_with(&config, &[bond], &ops);
    applier.apply(false, true, &ops).unwrap();
    assert!(ops
        .recorded()
        .contains(&"set-active-slave bond0 em1".to_string()));
}

#[test]
fn test_linux_bridge_primary_mac_reaches_the_artifact() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::with_mac("eth0", "52:54:00:aa:bb:00");
    let mut bridge = Device::new("br0", DeviceKind::LinuxBridge);
    bridge.members = vec!["eth0".to_string()];
    bridge.primary_member = Some("eth0".to_string());
    let mut eth0 = Device::new("eth0", DeviceKind::Interface);
    eth0.linux_bridge_name = Some("br0".to_string());
    let applier = applier_with(&config, &[bridge, eth0], &ops);
    let written = applier.apply(false, false, &ops).unwrap();
    let scripts = format!("{}/etc/sysconfig/network-scripts", config.root_dir);
    let bridge_data = written.get(&format!("{scripts}/ifcfg-br0")).unwrap();
    assert!(bridge_data.contains("MACADDR=\"52:54:00:aa:bb:00\"\n"));
    let eth0_data = written.get(&format!("{scripts}/ifcfg-eth0")).unwrap();
    assert!(eth0_data.contains("BRIDGE=br0\n"));
}

#[test]
fn test_ivs_participants_write_service_config_and_restart() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let mut uplink = Device::new("em1", DeviceKind::Interface);
    uplink.ivs_bridge_name = Some("ivs".to_string());
    let mut port = Device::new("storage5", DeviceKind::IvsInterface);
    port.ivs_bridge_name = Some("ivs".to_string());
    let devices = vec![uplink, port];
    let applier = applier_with(&config, &devices, &ops);
    let written = applier.apply(false, true, &ops).unwrap();

    let ivs_path = format!("{}/etc/sysconfig/ivs", config.root_dir);
    assert_eq!(
        written.get(&ivs_path),
        Some(
            &"DAEMON_ARGS=\"--hitless --certificate /etc/ivs \
               --inband-vlan 4092 -u em1 --internal-port=storage5\""
                .to_string()
        )
    );
    let calls = ops.recorded();
    assert!(calls.contains(&"ifup interface em1".to_string()));
    assert!(calls.contains(&"ifup interface storage5".to_string()));
    assert!(calls
        .contains(&"run /usr/bin/systemctl restart ivs".to_string()));

    // unchanged second run leaves the ivs service alone
    let ops2 = RecordingOps::default();
    let applier2 = applier_with(&config, &devices, &ops2);
    let written2 = applier2.apply(false, true, &ops2).unwrap();
    assert!(written2.is_empty());
    assert!(ops2.recorded().is_empty());
}

#[test]
fn test_member_cycle_aborts_the_run() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let mut br0 = Device::new("br0", DeviceKind::LinuxBridge);
    br0.members = vec!["bond0".to_string()];
    let mut bond0 = Device::new("bond0", DeviceKind::LinuxBond);
    bond0.members = vec!["br0".to_string()];
    let applier = applier_with(&config, &[br0, bond0], &ops);
    let result = applier.apply(false, true, &ops);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::DependencyCycle);
    }
}

#[test]
fn test_failing_deactivate_aborts_with_stage_context() {
    struct FailingOps {}

    impl NetOps for FailingOps {
        fn deactivate(
            &self,
            name: &str,
            _kind: CtlKind,
        ) -> Result<(), NetifError> {
            Err(NetifError::new(
                ErrorKind::ExternalCommand,
                format!("ifdown {name} exited with status 1"),
            ))
        }

        fn activate(
            &self,
            _name: &str,
            _kind: CtlKind,
        ) -> Result<(), NetifError> {
            Ok(())
        }

        fn rename(
            &self,
            _old_name: &str,
            _new_name: &str,
        ) -> Result<(), NetifError> {
            Ok(())
        }

        fn remove_artifact(
            &self,
            _path: &Path,
        ) -> Result<(), NetifError> {
            Ok(())
        }

        fn set_active_slave(
            &self,
            _bond_name: &str,
            _member_name: &str,
        ) -> Result<(), NetifError> {
            Ok(())
        }

        fn run_command(
            &self,
            _desc: &str,
            _program: &str,
            _args: &[&str],
        ) -> Result<(), NetifError> {
            Ok(())
        }

        fn hardware_address(
            &self,
            _name: &str,
        ) -> Result<String, NetifError> {
            Ok("52:54:00:aa:bb:00".to_string())
        }
    }

    let (_dir, config) = sandbox();
    let ops = FailingOps {};
    let applier = applier_with(&config, &bridge_model(), &ops);
    let result = applier.apply(false, true, &ops);
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::ExternalCommand);
        assert!(e.msg().contains("deactivate"));
    }
    // fail-fast, nothing was written
    let scripts = format!("{}/etc/sysconfig/network-scripts", config.root_dir);
    assert!(!Path::new(&format!("{scripts}/ifcfg-br-ex")).exists());
}

#[test]
fn test_vlan_restart_ordering() {
    let (_dir, config) = sandbox();
    let ops = RecordingOps::default();
    let mut vlan = Device::new("vlan100", DeviceKind::Vlan);
    vlan.vlan_id = Some(100);
    vlan.physdev = Some("em1".to_string());
    let em1 = Device::new("em1", DeviceKind::Interface);
    let applier = applier_with(&config, &[vlan, em1], &ops);
    applier.apply(false, true, &ops).unwrap();

    let calls = ops.recorded();
    let down_vlan = calls
        .iter()
        .position(|c| c == "ifdown interface vlan100")
        .unwrap();
    let down_em1 = calls
        .iter()
        .position(|c| c == "ifdown interface em1")
        .unwrap();
    let up_em1 = calls
        .iter()
        .position(|c| c == "ifup interface em1")
        .unwrap();
    let up_vlan = calls
        .iter()
        .position(|c| c == "ifup interface vlan100")
        .unwrap();
    // vlans go down first and come back up last
    assert!(down_vlan < down_em1);
    assert!(up_em1 < up_vlan);
}
