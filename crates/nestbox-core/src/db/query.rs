//! SQLite query helpers for the package store.
//!
//! Typed row structs and access functions over a shared `&Connection`; all
//! functions return `anyhow::Result<T>` with typed structs (never raw rows).
//! Graph-level traversal (ancestors, subtrees, depth) lives in
//! [`crate::graph::forest`]; this module stays row-level.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use std::collections::HashSet;

use crate::model::package::PackageId;

/// Timestamp expression used for insert/update bookkeeping (microseconds).
const NOW_US_SQL: &str = "CAST(strftime('%s', 'now') AS INTEGER) * 1000000";

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// A package row from the `packages` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPackage {
    pub package_id: PackageId,
    pub name: String,
    pub parent_id: Option<PackageId>,
    pub company_id: Option<String>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

/// A stored quant row: part of one package's contents.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryQuant {
    pub quant_id: i64,
    pub package_id: PackageId,
    pub product: String,
    pub lot: Option<String>,
    pub location_id: String,
    pub quantity: f64,
    pub reserved_quantity: f64,
}

fn row_to_package(row: &Row<'_>) -> rusqlite::Result<QueryPackage> {
    Ok(QueryPackage {
        package_id: PackageId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        parent_id: row.get::<_, Option<String>>(2)?.map(PackageId::new),
        company_id: row.get(3)?,
        created_at_us: row.get(4)?,
        updated_at_us: row.get(5)?,
    })
}

fn row_to_quant(row: &Row<'_>) -> rusqlite::Result<QueryQuant> {
    Ok(QueryQuant {
        quant_id: row.get(0)?,
        package_id: PackageId::new(row.get::<_, String>(1)?),
        product: row.get(2)?,
        lot: row.get(3)?,
        location_id: row.get(4)?,
        quantity: row.get(5)?,
        reserved_quantity: row.get(6)?,
    })
}

const PACKAGE_COLUMNS: &str =
    "package_id, name, parent_id, company_id, created_at_us, updated_at_us";

const QUANT_COLUMNS: &str =
    "quant_id, package_id, product, lot, location_id, quantity, reserved_quantity";

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetch a single package by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_package(conn: &Connection, id: &PackageId) -> Result<Option<QueryPackage>> {
    let sql = format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE package_id = ?1");
    conn.query_row(&sql, [id.as_str()], row_to_package)
        .optional()
        .with_context(|| format!("get package '{id}'"))
}

/// Fetch the direct children of a package, ordered by id.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn get_children(conn: &Connection, id: &PackageId) -> Result<Vec<QueryPackage>> {
    let sql = format!(
        "SELECT {PACKAGE_COLUMNS} FROM packages WHERE parent_id = ?1 ORDER BY package_id"
    );
    let mut stmt = conn.prepare(&sql).context("prepare children query")?;
    let rows = stmt
        .query_map([id.as_str()], row_to_package)
        .with_context(|| format!("query children of '{id}'"))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("read children of '{id}'"))
}

/// Fetch the live quants (nonzero quantity or reservation) stored directly
/// on any of the given packages.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn quants_for(conn: &Connection, ids: &[PackageId]) -> Result<Vec<QueryQuant>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; ids.len()].join(", ");
    let sql = format!(
        "SELECT {QUANT_COLUMNS} FROM package_quants \
         WHERE package_id IN ({placeholders}) \
           AND (quantity != 0 OR reserved_quantity != 0) \
         ORDER BY quant_id"
    );
    let mut stmt = conn.prepare(&sql).context("prepare quants query")?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter().map(PackageId::as_str)), row_to_quant)
        .context("query quants")?;

    rows.collect::<rusqlite::Result<Vec<_>>>().context("read quants")
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Insert a new package row.
///
/// # Errors
///
/// Returns an error if the insert violates schema constraints (bad id shape,
/// unknown parent) or the statement fails.
pub fn insert_package(
    conn: &Connection,
    id: &PackageId,
    name: &str,
    parent: Option<&PackageId>,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO packages (package_id, name, parent_id, created_at_us, updated_at_us) \
         VALUES (?1, ?2, ?3, {NOW_US_SQL}, {NOW_US_SQL})"
    );
    conn.execute(&sql, params![id.as_str(), name, parent.map(PackageId::as_str)])
        .with_context(|| format!("insert package '{id}'"))?;
    Ok(())
}

/// Insert a quant row for a package.
///
/// # Errors
///
/// Returns an error if the package does not exist or the statement fails.
pub fn insert_quant(
    conn: &Connection,
    package: &PackageId,
    product: &str,
    lot: Option<&str>,
    location_id: &str,
    quantity: f64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO package_quants (package_id, product, lot, location_id, quantity) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![package.as_str(), product, lot, location_id, quantity],
    )
    .with_context(|| format!("insert quant for '{package}'"))?;
    Ok(())
}

/// Set or clear the parent pointer of a package.
///
/// Refuses a write that would make the package its own ancestor, independent
/// of batch validation. The walk is bounded by the number of stored packages.
///
/// # Errors
///
/// Returns an error if the child does not exist, the write would close a
/// parent-pointer cycle, or the statement fails.
pub fn set_parent(
    conn: &Connection,
    child: &PackageId,
    parent: Option<&PackageId>,
) -> Result<()> {
    if let Some(parent_id) = parent {
        let mut visited: HashSet<PackageId> = HashSet::new();
        let mut current = Some(parent_id.clone());
        while let Some(id) = current {
            if id == *child {
                bail!("package '{child}' would become its own ancestor under '{parent_id}'");
            }
            if !visited.insert(id.clone()) {
                bail!("existing parent chain of '{parent_id}' contains a cycle");
            }
            current = get_package(conn, &id)?
                .with_context(|| format!("package '{id}' missing from parent chain"))?
                .parent_id;
        }
    }

    let sql = format!(
        "UPDATE packages SET parent_id = ?1, updated_at_us = {NOW_US_SQL} WHERE package_id = ?2"
    );
    let changed = conn
        .execute(&sql, params![parent.map(PackageId::as_str), child.as_str()])
        .with_context(|| format!("set parent of '{child}'"))?;
    if changed != 1 {
        bail!("package not found: '{child}'");
    }
    Ok(())
}
