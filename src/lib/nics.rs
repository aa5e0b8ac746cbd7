// SPDX-License-Identifier: Apache-2.0

use std::path::Path;

const SYS_CLASS_NET: &str = "/sys/class/net";

// On-board NICs are expected to enumerate before add-on cards.
const EMBEDDED_PREFIXES: [&str; 3] = ["em", "eth", "eno"];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortToken {
    // Num before Text so a digit run sorts ahead of a letter run at the
    // same position.
    Num(u64),
    Text(String),
}

/// Split a name into alternating non-digit/digit runs so that digit
/// runs compare numerically, e.g. `eth2` sorts before `eth10`.
fn natural_sort_key(name: &str) -> Vec<SortToken> {
    let mut tokens: Vec<SortToken> = Vec::new();
    for c in name.chars() {
        let is_digit = c.is_ascii_digit();
        match tokens.last_mut() {
            Some(SortToken::Num(n)) if is_digit => {
                *n = n
                    .saturating_mul(10)
                    .saturating_add(u64::from(c as u8 - b'0'));
            }
            Some(SortToken::Text(s)) if !is_digit => s.push(c),
            _ => {
                if is_digit {
                    tokens.push(SortToken::Num(u64::from(c as u8 - b'0')));
                } else {
                    tokens.push(SortToken::Text(c.to_string()));
                }
            }
        }
    }
    tokens
}

fn is_active_nic(sys_class_net: &Path, name: &str) -> bool {
    if name == "lo" {
        return false;
    }
    let nic_dir = sys_class_net.join(name);
    if !nic_dir.join("device").is_dir() {
        return false;
    }
    // Unreadable sysfs entries mean "not active", never an error.
    let operstate = match std::fs::read_to_string(nic_dir.join("operstate"))
    {
        Ok(s) => s.trim().to_lowercase(),
        Err(_) => return false,
    };
    let address = match std::fs::read_to_string(nic_dir.join("address")) {
        Ok(s) => s.trim().to_string(),
        Err(_) => return false,
    };
    operstate == "up" && !address.is_empty()
}

/// Active NICs ordered with embedded (`em`/`eth`/`eno`) devices first,
/// each group naturally sorted.
pub fn ordered_active_nics() -> Vec<String> {
    ordered_active_nics_in(Path::new(SYS_CLASS_NET))
}

pub fn ordered_active_nics_in(sys_class_net: &Path) -> Vec<String> {
    let mut embedded_nics: Vec<String> = Vec::new();
    let mut nics: Vec<String> = Vec::new();
    log::debug!("Finding active nics");
    let entries = match std::fs::read_dir(sys_class_net) {
        Ok(entries) => entries,
        Err(e) => {
            log::error!(
                "Failed to list {}: {e}",
                sys_class_net.display()
            );
            return Vec::new();
        }
    };
    for entry in entries.flatten() {
        let nic = entry.file_name().to_string_lossy().to_string();
        if is_active_nic(sys_class_net, &nic) {
            if EMBEDDED_PREFIXES.iter().any(|p| nic.starts_with(p)) {
                log::debug!("{nic} is an embedded active nic");
                embedded_nics.push(nic);
            } else {
                log::debug!("{nic} is an active nic");
                nics.push(nic);
            }
        } else {
            log::debug!("{nic} is not an active nic");
        }
    }
    embedded_nics.sort_by_key(|n| natural_sort_key(n));
    nics.sort_by_key(|n| natural_sort_key(n));
    embedded_nics.extend(nics);
    log::debug!("Active nics are {embedded_nics:?}");
    embedded_nics
}
