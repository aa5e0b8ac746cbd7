// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

use crate::{ErrorKind, NetifError};

/// Current content of a config file. A missing or unreadable file reads
/// as empty so that change detection treats it as "everything differs".
pub fn get_file_data(path: &Path) -> String {
    if !path.exists() {
        return String::new();
    }
    match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) => {
            log::error!("Error reading file {}: {e}", path.display());
            String::new()
        }
    }
}

/// Byte-for-byte comparison of candidate content against on-disk
/// content. No normalization, rendering must be deterministic.
pub fn differs(path: &Path, data: &str) -> bool {
    let file_data = get_file_data(path);
    log::debug!("Diff file data:\n{file_data}");
    log::debug!("Diff data:\n{data}");
    file_data != data
}

/// Write config content through a temp file in the same directory and
/// rename into place, so a crash cannot leave a half-written file.
pub(crate) fn write_config(
    path: &Path,
    data: &str,
) -> Result<(), NetifError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            NetifError::new(
                ErrorKind::InvalidArgument,
                format!("Invalid config path {}", path.display()),
            )
        })?;
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));
    std::fs::write(&tmp_path, data).map_err(|e| {
        NetifError::new(
            ErrorKind::Bug,
            format!("Failed to write {}: {e}", tmp_path.display()),
        )
    })?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        NetifError::new(
            ErrorKind::Bug,
            format!(
                "Failed to rename {} to {}: {e}",
                tmp_path.display(),
                path.display()
            ),
        )
    })
}
