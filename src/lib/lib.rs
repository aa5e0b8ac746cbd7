// SPDX-License-Identifier: Apache-2.0

mod apply;
mod detect;
mod device;
mod error;
mod graph;
mod nics;
mod ops;
mod paths;
mod render;

#[cfg(test)]
mod unit_tests;

pub use self::apply::{ApplyConfig, IfcfgApplier};
pub use self::detect::{differs, get_file_data};
pub use self::device::{Address, Device, DeviceKind, Route};
pub use self::error::{ErrorKind, NetifError};
pub use self::nics::{ordered_active_nics, ordered_active_nics_in};
pub use self::ops::{CtlKind, NetOps, SysNetOps};
