//! Depth and ancestry validation of resolved chains against the existing
//! forest.
//!
//! Chain resolution only looks at the batch itself; this module holds the
//! batch up against the stored forest:
//!
//! - the chain's child must not already be an ancestor of its prospective
//!   parent (a cycle spanning the old forest and the new links)
//! - the resulting total depth (existing ancestors above the parent, plus
//!   the chain itself, plus the child's existing subtree below) must stay
//!   within the configured maximum
//! - a prospective parent's contents must not end up spanning more than one
//!   physical location
//!
//! All checks for all chains run before any mutation; one failing chain
//! rejects the entire batch.

use rusqlite::Connection;
use std::collections::{BTreeSet, HashSet};

use crate::config::ValidationConfig;
use crate::error::LinkError;
use crate::graph::chain::{Chain, resolve_chains};
use crate::graph::forest;
use crate::graph::sanitize::sanitize_links;
use crate::link::Link;
use crate::model::package::PackageId;

/// Validate resolved chains against the stored forest.
///
/// `links` must be the sanitized batch the chains were resolved from; the
/// unlinks in it zero out `length_above` for parents that are about to
/// become roots.
///
/// # Errors
///
/// Returns [`LinkError::SelfAncestor`], [`LinkError::DepthExceeded`],
/// [`LinkError::MultiLocationConflict`], [`LinkError::PackageNotFound`], or
/// [`LinkError::Db`].
pub fn validate_chains(
    conn: &Connection,
    chains: &[Chain],
    links: &[Link],
    config: &ValidationConfig,
) -> Result<(), LinkError> {
    let unlinked: HashSet<&PackageId> = links
        .iter()
        .filter(|link| link.is_unlink())
        .map(|link| &link.child)
        .collect();

    for chain in chains {
        let ancestors = forest::ancestors_of(conn, &chain.parent)?;
        if ancestors
            .iter()
            .any(|ancestor| ancestor.package_id == chain.child)
        {
            return Err(LinkError::SelfAncestor {
                child: chain.child.clone(),
                parent: chain.parent.clone(),
            });
        }

        let length_above = if unlinked.contains(&chain.parent) {
            0
        } else {
            u32::try_from(ancestors.len()).unwrap_or(u32::MAX)
        };
        let length_below = forest::package_depth(conn, &chain.child)?.saturating_sub(1);

        let total = length_above
            .saturating_add(length_below)
            .saturating_add(chain.length);
        if total > config.max_package_depth {
            return Err(LinkError::DepthExceeded {
                total,
                max: config.max_package_depth,
            });
        }
    }

    check_single_location(conn, links)?;

    Ok(())
}

/// Reject links whose prospective parent would end up containing quants in
/// more than one location.
fn check_single_location(conn: &Connection, links: &[Link]) -> Result<(), LinkError> {
    for link in links {
        let Some(parent) = &link.parent else {
            continue;
        };
        let mut locations: BTreeSet<String> = forest::contained_locations(conn, parent)?;
        locations.extend(forest::contained_locations(conn, &link.child)?);
        if locations.len() > 1 {
            return Err(LinkError::MultiLocationConflict {
                package: parent.clone(),
                locations: locations.into_iter().collect(),
            });
        }
    }
    Ok(())
}

/// Run the full pre-commit pipeline over a raw link batch: sanitize, resolve
/// chains, validate against the forest. Returns the sanitized links ready
/// for [`crate::graph::construct::construct`].
///
/// # Errors
///
/// Returns any batch-rejection error from the pipeline stages; the batch
/// must be resubmitted with corrected inputs.
pub fn validate_batch(
    conn: &Connection,
    links: Vec<Link>,
    config: &ValidationConfig,
) -> Result<Vec<Link>, LinkError> {
    let sanitized = sanitize_links(links)?;
    let chains = resolve_chains(&sanitized, config)?;
    validate_chains(conn, &chains, &sanitized, config)?;
    Ok(sanitized)
}
