//! Link sanitization: at most one effective link per child.
//!
//! A movement may legitimately produce two links for the same child: an
//! unlink from the old parent plus a link into the new one ("moved out,
//! moved in"). Sanitization collapses that pair to the single effective
//! link. Anything else touching one child more than once is unrecoverable
//! ambiguity and rejects the batch.
//!
//! Sanitization is idempotent: a sanitized set passes through unchanged.

use std::collections::HashMap;

use crate::error::LinkError;
use crate::link::Link;
use crate::model::package::PackageId;

/// Reduce a batch of links so each child appears at most once.
///
/// - one link per child: kept as-is
/// - two links, exactly one of them an unlink: the unlink is discarded
/// - anything else: [`LinkError::AmbiguousMove`]
///
/// Output preserves the order in which children first appear.
///
/// # Errors
///
/// Returns [`LinkError::AmbiguousMove`] when a child's links cannot be
/// reduced to one.
pub fn sanitize_links(links: Vec<Link>) -> Result<Vec<Link>, LinkError> {
    let mut order: Vec<PackageId> = Vec::new();
    let mut by_child: HashMap<PackageId, Vec<Link>> = HashMap::new();

    for link in links {
        let group = by_child.entry(link.child.clone()).or_default();
        if group.is_empty() {
            order.push(link.child.clone());
        }
        group.push(link);
    }

    let mut sanitized = Vec::with_capacity(order.len());
    for child in order {
        let Some(group) = by_child.remove(&child) else {
            continue;
        };
        match group.len() {
            1 => sanitized.extend(group),
            2 => {
                let unlinks = group.iter().filter(|link| link.is_unlink()).count();
                if unlinks != 1 {
                    return Err(LinkError::AmbiguousMove { child });
                }
                tracing::debug!(child = %child, "collapsing unlink into effective move");
                sanitized.extend(group.into_iter().filter(|link| !link.is_unlink()));
            }
            _ => return Err(LinkError::AmbiguousMove { child }),
        }
    }

    Ok(sanitized)
}
