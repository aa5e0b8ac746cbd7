// SPDX-License-Identifier: Apache-2.0

mod apply;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use crate::{CtlKind, ErrorKind, NetOps, NetifError};

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// [NetOps] double recording every call instead of touching the
/// system.
#[derive(Debug, Default)]
pub(crate) struct RecordingOps {
    pub(crate) calls: RefCell<Vec<String>>,
    pub(crate) macs: HashMap<String, String>,
}

impl RecordingOps {
    pub(crate) fn with_mac(name: &str, mac: &str) -> Self {
        let mut macs = HashMap::new();
        macs.insert(name.to_string(), mac.to_string());
        Self {
            calls: RefCell::new(Vec::new()),
            macs,
        }
    }

    pub(crate) fn recorded(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl NetOps for RecordingOps {
    fn deactivate(
        &self,
        name: &str,
        kind: CtlKind,
    ) -> Result<(), NetifError> {
        self.record(format!("ifdown {kind} {name}"));
        Ok(())
    }

    fn activate(&self, name: &str, kind: CtlKind) -> Result<(), NetifError> {
        self.record(format!("ifup {kind} {name}"));
        Ok(())
    }

    fn rename(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<(), NetifError> {
        self.record(format!("rename {old_name} {new_name}"));
        Ok(())
    }

    fn remove_artifact(&self, path: &Path) -> Result<(), NetifError> {
        self.record(format!("remove {}", path.display()));
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn set_active_slave(
        &self,
        bond_name: &str,
        member_name: &str,
    ) -> Result<(), NetifError> {
        self.record(format!(
            "set-active-slave {bond_name} {member_name}"
        ));
        Ok(())
    }

    fn run_command(
        &self,
        _desc: &str,
        program: &str,
        args: &[&str],
    ) -> Result<(), NetifError> {
        self.record(format!("run {program} {}", args.join(" ")));
        Ok(())
    }

    fn hardware_address(&self, name: &str) -> Result<String, NetifError> {
        self.macs.get(name).cloned().ok_or_else(|| {
            NetifError::new(
                ErrorKind::HardwareLookup,
                format!("Unable to read mac address of {name}"),
            )
        })
    }
}
