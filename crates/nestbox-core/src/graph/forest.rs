//! Typed graph queries over the stored package forest.
//!
//! This module answers the forest questions the validation pipeline needs,
//! using the package store as the source of truth:
//!
//! - What are the ancestors of a package (nearest first)?
//! - What is the subtree below a package?
//! - How deep is a package's subtree?
//! - Which quants, quantities, and locations does a package contain?
//!
//! # Depth convention
//!
//! A childless package has depth **1**; a package's depth is
//! `1 + max(depth of children)`. Traversals are cycle-guarded with visited
//! sets so a corrupted store cannot hang a walk, though a validated forest
//! never contains cycles.

#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::db::query::{self, QueryPackage, QueryQuant};
use crate::error::LinkError;
use crate::model::movement::QuantKey;
use crate::model::package::PackageId;

/// Get the ancestor chain of a package, from immediate parent up to root.
///
/// Returns an empty vec if the package has no parent. The first element is
/// the immediate parent, the last is the root. A repeated id in the chain
/// truncates the walk (cycle guard).
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `id` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn ancestors_of(conn: &Connection, id: &PackageId) -> Result<Vec<QueryPackage>, LinkError> {
    let start = query::get_package(conn, id)?
        .ok_or_else(|| LinkError::PackageNotFound(id.clone()))?;

    let mut ancestors: Vec<QueryPackage> = Vec::new();
    let mut visited: HashSet<PackageId> = HashSet::new();
    visited.insert(start.package_id.clone());

    let mut current_parent = start.parent_id;
    while let Some(parent_id) = current_parent {
        if !visited.insert(parent_id.clone()) {
            break; // cycle guard
        }
        let parent = query::get_package(conn, &parent_id)?
            .ok_or_else(|| LinkError::PackageNotFound(parent_id.clone()))?;
        current_parent = parent.parent_id.clone();
        ancestors.push(parent);
    }

    Ok(ancestors)
}

/// Get all package ids in the subtree rooted at `id`, including `id` itself,
/// in BFS order.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `id` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn descendants_of(conn: &Connection, id: &PackageId) -> Result<Vec<PackageId>, LinkError> {
    if query::get_package(conn, id)?.is_none() {
        return Err(LinkError::PackageNotFound(id.clone()));
    }

    let mut visited: HashSet<PackageId> = HashSet::new();
    let mut queue: VecDeque<PackageId> = VecDeque::new();
    let mut result: Vec<PackageId> = Vec::new();

    queue.push_back(id.clone());
    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.clone()) {
            continue; // cycle guard
        }
        result.push(current.clone());

        for child in query::get_children(conn, &current)? {
            if !visited.contains(&child.package_id) {
                queue.push_back(child.package_id);
            }
        }
    }

    Ok(result)
}

/// Depth of a package's subtree: 1 for a childless package, else
/// `1 + max(depth of children)`.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `id` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn package_depth(conn: &Connection, id: &PackageId) -> Result<u32, LinkError> {
    if query::get_package(conn, id)?.is_none() {
        return Err(LinkError::PackageNotFound(id.clone()));
    }

    let mut visited: HashSet<PackageId> = HashSet::new();
    subtree_depth(conn, id, &mut visited)
}

fn subtree_depth(
    conn: &Connection,
    id: &PackageId,
    visited: &mut HashSet<PackageId>,
) -> Result<u32, LinkError> {
    if !visited.insert(id.clone()) {
        return Ok(0); // cycle guard
    }

    let mut max_child = 0;
    for child in query::get_children(conn, id)? {
        max_child = max_child.max(subtree_depth(conn, &child.package_id, visited)?);
    }
    Ok(1 + max_child)
}

/// Topmost ancestor of a package, or `None` if it is already a root.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `id` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn top_parent(conn: &Connection, id: &PackageId) -> Result<Option<PackageId>, LinkError> {
    let ancestors = ancestors_of(conn, id)?;
    Ok(ancestors.last().map(|p| p.package_id.clone()))
}

/// Display name of a package: `"parent/name"` when a parent exists, else the
/// bare name.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `id` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn display_name(conn: &Connection, id: &PackageId) -> Result<String, LinkError> {
    let package = query::get_package(conn, id)?
        .ok_or_else(|| LinkError::PackageNotFound(id.clone()))?;

    match package.parent_id {
        Some(parent_id) => {
            let parent = query::get_package(conn, &parent_id)?
                .ok_or_else(|| LinkError::PackageNotFound(parent_id.clone()))?;
            Ok(format!("{}/{}", parent.name, package.name))
        }
        None => Ok(package.name),
    }
}

/// Live quants contained anywhere in the package's subtree.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `id` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn contained_quants(conn: &Connection, id: &PackageId) -> Result<Vec<QueryQuant>, LinkError> {
    let subtree = descendants_of(conn, id)?;
    Ok(query::quants_for(conn, &subtree)?)
}

/// Contained quantities of a package's subtree, summed per `(product, lot)`.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `id` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn quantities_by_key(
    conn: &Connection,
    id: &PackageId,
) -> Result<HashMap<QuantKey, f64>, LinkError> {
    let mut quantities: HashMap<QuantKey, f64> = HashMap::new();
    for quant in contained_quants(conn, id)? {
        let key = QuantKey::new(quant.product.clone(), quant.lot.clone());
        *quantities.entry(key).or_insert(0.0) += quant.quantity;
    }
    Ok(quantities)
}

/// Distinct locations of the package's contained quants.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `id` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn contained_locations(
    conn: &Connection,
    id: &PackageId,
) -> Result<BTreeSet<String>, LinkError> {
    Ok(contained_quants(conn, id)?
        .into_iter()
        .map(|quant| quant.location_id)
        .collect())
}
