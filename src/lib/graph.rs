// SPDX-License-Identifier: Apache-2.0

use std::collections::{HashMap, HashSet};

use crate::{ErrorKind, NetifError};

/// Parent device name to direct member names.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemberGraph {
    members: HashMap<String, Vec<String>>,
}

impl MemberGraph {
    pub(crate) fn insert(&mut self, parent: &str, members: Vec<String>) {
        self.members.insert(parent.to_string(), members);
    }

    /// All devices reachable through the member relation, the queried
    /// device excluded. A device with no members yields an empty set.
    /// The member relation must be acyclic.
    pub(crate) fn transitive_members(
        &self,
        name: &str,
    ) -> Result<HashSet<String>, NetifError> {
        enum Visit<'a> {
            Enter(&'a str),
            Leave(&'a str),
        }

        let mut result: HashSet<String> = HashSet::new();
        let mut in_path: HashSet<&str> = HashSet::new();
        let mut done: HashSet<&str> = HashSet::new();
        let mut stack = vec![Visit::Enter(name)];

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(node) => {
                    if done.contains(node) {
                        continue;
                    }
                    if !in_path.insert(node) {
                        return Err(cycle_error(name, node));
                    }
                    stack.push(Visit::Leave(node));
                    for member in
                        self.members.get(node).into_iter().flatten()
                    {
                        if in_path.contains(member.as_str()) {
                            return Err(cycle_error(name, member));
                        }
                        result.insert(member.to_string());
                        if !done.contains(member.as_str()) {
                            stack.push(Visit::Enter(member));
                        }
                    }
                }
                Visit::Leave(node) => {
                    in_path.remove(node);
                    done.insert(node);
                }
            }
        }
        Ok(result)
    }
}

fn cycle_error(name: &str, node: &str) -> NetifError {
    NetifError::new(
        ErrorKind::DependencyCycle,
        format!(
            "Member graph of {name} is not acyclic, \
             {node} is its own ancestor"
        ),
    )
}
