//! Forest mutation: apply a validated link batch to the stored forest.
//!
//! Links are grouped by parent and every child's parent pointer is set (or
//! cleared, for the root group) inside a single transaction. There is no
//! partial application: if any write fails (a package vanished underneath
//! the batch, a store-level integrity guard fired), the whole transaction
//! rolls back and the batch is rejected.

use anyhow::Context;
use rusqlite::Connection;
use std::collections::BTreeMap;

use crate::config::ValidationConfig;
use crate::db::query;
use crate::error::LinkError;
use crate::graph::validate::validate_batch;
use crate::link::Link;
use crate::model::package::PackageId;

/// Apply a validated, sanitized link batch: set or clear the parent pointer
/// of every affected package.
///
/// Runs inside one `BEGIN IMMEDIATE … COMMIT` transaction so the batch is
/// all-or-nothing. Call only after [`validate_batch`] has accepted the same
/// links (or use [`apply_batch`]).
///
/// # Errors
///
/// Returns [`LinkError::Db`] if any write fails; nothing is applied in that
/// case.
pub fn construct(conn: &Connection, links: &[Link]) -> Result<(), LinkError> {
    if links.is_empty() {
        return Ok(());
    }

    let mut groups: BTreeMap<Option<PackageId>, Vec<&PackageId>> = BTreeMap::new();
    for link in links {
        groups.entry(link.parent.clone()).or_default().push(&link.child);
    }

    conn.execute_batch("BEGIN IMMEDIATE")
        .context("begin construct transaction")?;

    match apply_groups(conn, &groups) {
        Ok(applied) => {
            conn.execute_batch("COMMIT")
                .context("commit construct transaction")?;
            tracing::info!(applied, groups = groups.len(), "applied package link batch");
            Ok(())
        }
        Err(error) => {
            if let Err(rollback_error) = conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %rollback_error, "rollback after failed construct");
            }
            Err(error)
        }
    }
}

fn apply_groups(
    conn: &Connection,
    groups: &BTreeMap<Option<PackageId>, Vec<&PackageId>>,
) -> Result<usize, LinkError> {
    let mut applied = 0;
    for (parent, children) in groups {
        for child in children {
            query::set_parent(conn, child, parent.as_ref())?;
            applied += 1;
        }
    }
    Ok(applied)
}

/// Validate a raw link batch and, if it is accepted, apply it.
///
/// # Errors
///
/// Returns any batch-rejection error from validation, or [`LinkError::Db`]
/// if the mutation fails.
pub fn apply_batch(
    conn: &Connection,
    links: Vec<Link>,
    config: &ValidationConfig,
) -> Result<(), LinkError> {
    let sanitized = validate_batch(conn, links, config)?;
    construct(conn, &sanitized)
}
