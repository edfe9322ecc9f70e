//! Chain resolution: reconstruct the linear chains a sanitized link batch
//! forms.
//!
//! # Algorithm
//!
//! Pure unlinks only detach and take no part in chain building. Over the
//! remaining links, the terminal parents are the parents that are nobody's
//! child, and the terminal children are the children that are nobody's
//! parent. From each terminal child the chain is walked upward, marking each
//! link as checked, until a terminal parent is reached.
//!
//! # Failure modes
//!
//! - a walk that runs longer than the configured maximum depth without
//!   reaching a terminal parent rejects the batch (`DepthExceeded`)
//! - a link never reached by any walk is part of a cycle confined to the
//!   batch, since no terminal child leads into it (`PackageLoop`)

use std::collections::{HashMap, HashSet};

use crate::config::ValidationConfig;
use crate::error::LinkError;
use crate::link::Link;
use crate::model::package::PackageId;

/// A resolved chain: `length` links from terminal `child` up to terminal
/// `parent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    pub length: u32,
    pub parent: PackageId,
    pub child: PackageId,
}

/// Resolve the chains formed by a sanitized link batch.
///
/// Expects sanitized input (each child at most once); a duplicate child is
/// reported as [`LinkError::AmbiguousMove`].
///
/// # Errors
///
/// Returns [`LinkError::DepthExceeded`] if a walk exceeds
/// `config.max_package_depth`, or [`LinkError::PackageLoop`] if any link is
/// unreachable from a terminal child.
pub fn resolve_chains(
    links: &[Link],
    config: &ValidationConfig,
) -> Result<Vec<Chain>, LinkError> {
    let effective: Vec<(usize, &PackageId, &PackageId)> = links
        .iter()
        .enumerate()
        .filter_map(|(index, link)| {
            link.parent.as_ref().map(|parent| (index, parent, &link.child))
        })
        .collect();

    let mut link_by_child: HashMap<&PackageId, (usize, &PackageId)> = HashMap::new();
    for &(index, parent, child) in &effective {
        if link_by_child.insert(child, (index, parent)).is_some() {
            return Err(LinkError::AmbiguousMove {
                child: child.clone(),
            });
        }
    }

    let parents: HashSet<&PackageId> = effective.iter().map(|(_, parent, _)| *parent).collect();
    let terminal_children: Vec<&PackageId> = effective
        .iter()
        .map(|(_, _, child)| *child)
        .filter(|child| !parents.contains(*child))
        .collect();

    let mut checked: HashSet<usize> = HashSet::new();
    let mut chains = Vec::with_capacity(terminal_children.len());

    for terminal_child in terminal_children {
        let mut current = terminal_child;
        let mut length: u32 = 0;

        loop {
            let Some(&(index, parent)) = link_by_child.get(current) else {
                // current has no link of its own: it is the terminal parent
                chains.push(Chain {
                    length,
                    parent: current.clone(),
                    child: terminal_child.clone(),
                });
                break;
            };
            checked.insert(index);
            length += 1;
            if length > config.max_package_depth {
                return Err(LinkError::DepthExceeded {
                    total: length,
                    max: config.max_package_depth,
                });
            }
            current = parent;
        }
    }

    if let Some((_, _, child)) = effective.iter().find(|(index, _, _)| !checked.contains(index))
    {
        return Err(LinkError::PackageLoop {
            package: (*child).clone(),
        });
    }

    Ok(chains)
}
