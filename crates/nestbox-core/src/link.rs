//! Links: proposed parent/child relations for one transactional batch.
//!
//! A link either attaches a child to a new parent or, with `parent = None`,
//! detaches it from its current one. Each link carries the move lines that
//! justify it; links are transient, built when a movement completes and
//! consumed by [`crate::graph::construct`] once the batch validates.

use rusqlite::Connection;
use std::collections::BTreeSet;
use std::fmt;

use crate::config::ValidationConfig;
use crate::error::LinkError;
use crate::fulfill;
use crate::graph::forest;
use crate::model::movement::{MoveLine, MoveLineId};
use crate::model::package::PackageId;

/// One proposed edge (or explicit detachment) in a link batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// New parent, or `None` to detach the child from its current parent.
    pub parent: Option<PackageId>,
    /// The package being moved.
    pub child: PackageId,
    /// Move lines justifying this link.
    pub move_line_ids: Vec<MoveLineId>,
}

impl Link {
    /// A link attaching `child` under `parent`.
    #[must_use]
    pub fn attach(parent: PackageId, child: PackageId, move_line_ids: Vec<MoveLineId>) -> Self {
        Self {
            parent: Some(parent),
            child,
            move_line_ids,
        }
    }

    /// A link detaching `child` from its current parent.
    #[must_use]
    pub const fn detach(child: PackageId, move_line_ids: Vec<MoveLineId>) -> Self {
        Self {
            parent: None,
            child,
            move_line_ids,
        }
    }

    /// True for a pure detachment.
    #[must_use]
    pub const fn is_unlink(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "Link {parent} and {}", self.child),
            None => write!(f, "Unlink parent of {}", self.child),
        }
    }
}

/// Emit unlinks for candidate top-level packages whose contents are fully
/// accounted for by `move_lines`.
///
/// For each candidate that currently has a parent and is fulfilled by the
/// move lines, one `parent = None` link is emitted carrying the lines that
/// belong to the candidate's subtree. Candidates without a parent, or not
/// fulfilled, emit nothing.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if a candidate does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn create_top_level_unlinks(
    conn: &Connection,
    candidates: &[PackageId],
    move_lines: &[MoveLine],
    config: &ValidationConfig,
) -> Result<Vec<Link>, LinkError> {
    let mut links = Vec::new();

    for candidate in candidates {
        let package = crate::db::query::get_package(conn, candidate)?
            .ok_or_else(|| LinkError::PackageNotFound(candidate.clone()))?;
        if package.parent_id.is_none() {
            continue;
        }
        if !fulfill::is_fulfilled_by(conn, candidate, move_lines, config)? {
            continue;
        }

        let line_ids: Vec<MoveLineId> = fulfill::move_lines_for(conn, candidate, move_lines)?
            .iter()
            .map(|line| line.line_id)
            .collect();
        tracing::debug!(package = %candidate, lines = line_ids.len(), "unlinking fulfilled package");
        links.push(Link::detach(candidate.clone(), line_ids));
    }

    Ok(links)
}

/// Derive top-level unlinks from a completed movement.
///
/// Candidates are the ancestors-or-self of every package the move lines
/// touch. Of those, the fulfilled packages whose parent is not itself
/// fulfilled are the top level; they are handed to
/// [`create_top_level_unlinks`].
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if a touched package does not
/// exist, or [`LinkError::Db`] for store failures.
pub fn plan_unlinks_for_moves(
    conn: &Connection,
    move_lines: &[MoveLine],
    config: &ValidationConfig,
) -> Result<Vec<Link>, LinkError> {
    let mut candidates: BTreeSet<PackageId> = BTreeSet::new();
    for line in move_lines {
        for touched in line.touched_packages() {
            if candidates.insert(touched.clone()) {
                for ancestor in forest::ancestors_of(conn, touched)? {
                    candidates.insert(ancestor.package_id);
                }
            }
        }
    }

    let mut fulfilled: BTreeSet<PackageId> = BTreeSet::new();
    for candidate in &candidates {
        if fulfill::is_fulfilled_by(conn, candidate, move_lines, config)? {
            fulfilled.insert(candidate.clone());
        }
    }

    let mut top_level: Vec<PackageId> = Vec::new();
    for candidate in &fulfilled {
        let package = crate::db::query::get_package(conn, candidate)?
            .ok_or_else(|| LinkError::PackageNotFound(candidate.clone()))?;
        let parent_fulfilled = package
            .parent_id
            .as_ref()
            .is_some_and(|parent| fulfilled.contains(parent));
        if !parent_fulfilled {
            top_level.push(candidate.clone());
        }
    }

    create_top_level_unlinks(conn, &top_level, move_lines, config)
}

#[cfg(test)]
mod tests {
    use super::{Link, create_top_level_unlinks, plan_unlinks_for_moves};
    use crate::config::ValidationConfig;
    use crate::db::open_in_memory;
    use crate::db::query::{insert_package, insert_quant};
    use crate::error::LinkError;
    use crate::model::movement::{MoveLine, MoveLineId};
    use crate::model::package::PackageId;
    use rusqlite::Connection;

    fn pk(id: &str) -> PackageId {
        PackageId::from(id)
    }

    fn line(id: i64, package: &str, product: &str, qty: f64) -> MoveLine {
        MoveLine {
            line_id: MoveLineId(id),
            package_id: Some(pk(package)),
            result_package_id: None,
            product: product.to_string(),
            lot: None,
            qty,
        }
    }

    /// pk-x (5 WIDGET) inside pk-y.
    fn two_level_store() -> Connection {
        let conn = open_in_memory().expect("open store");
        insert_package(&conn, &pk("pk-y"), "Y", None).expect("insert");
        insert_package(&conn, &pk("pk-x"), "X", Some(&pk("pk-y"))).expect("insert");
        insert_quant(&conn, &pk("pk-x"), "WIDGET", None, "WH/A", 5.0).expect("quant");
        conn
    }

    #[test]
    fn display_names_link_and_unlink() {
        let attach = Link::attach(pk("pk-a"), pk("pk-b"), vec![]);
        assert_eq!(attach.to_string(), "Link pk-a and pk-b");

        let detach = Link::detach(pk("pk-b"), vec![]);
        assert_eq!(detach.to_string(), "Unlink parent of pk-b");
        assert!(detach.is_unlink());
        assert!(!attach.is_unlink());
    }

    #[test]
    fn fulfilled_candidate_with_parent_emits_unlink() {
        let conn = two_level_store();
        let lines = vec![line(1, "pk-x", "WIDGET", 5.0)];

        let links = create_top_level_unlinks(
            &conn,
            &[pk("pk-x")],
            &lines,
            &ValidationConfig::default(),
        )
        .expect("create unlinks");

        assert_eq!(links.len(), 1);
        assert_eq!(links[0], Link::detach(pk("pk-x"), vec![MoveLineId(1)]));
    }

    #[test]
    fn candidate_without_parent_emits_nothing() {
        let conn = two_level_store();
        let lines = vec![line(1, "pk-x", "WIDGET", 5.0)];

        let links = create_top_level_unlinks(
            &conn,
            &[pk("pk-y")],
            &lines,
            &ValidationConfig::default(),
        )
        .expect("create unlinks");
        // pk-y is fulfilled (its contents are pk-x's) but it is a root.
        assert!(links.is_empty());
    }

    #[test]
    fn unfulfilled_candidate_emits_nothing() {
        let conn = two_level_store();
        let lines = vec![line(1, "pk-x", "WIDGET", 2.0)];

        let links = create_top_level_unlinks(
            &conn,
            &[pk("pk-x")],
            &lines,
            &ValidationConfig::default(),
        )
        .expect("create unlinks");
        assert!(links.is_empty());
    }

    #[test]
    fn unknown_candidate_is_an_error() {
        let conn = two_level_store();
        let err = create_top_level_unlinks(
            &conn,
            &[pk("pk-ghost")],
            &[],
            &ValidationConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::PackageNotFound(_)));
    }

    #[test]
    fn plan_whole_fulfilled_stack_emits_nothing() {
        // pallet > box > bag, with all content in the bag; every level is
        // fulfilled, so the top-level fulfilled package is the pallet.
        let conn = open_in_memory().expect("open store");
        insert_package(&conn, &pk("pk-pallet"), "PAL", None).expect("insert");
        insert_package(&conn, &pk("pk-box"), "BOX", Some(&pk("pk-pallet"))).expect("insert");
        insert_package(&conn, &pk("pk-bag"), "BAG", Some(&pk("pk-box"))).expect("insert");
        insert_quant(&conn, &pk("pk-bag"), "WIDGET", None, "WH/A", 4.0).expect("quant");

        let lines = vec![line(1, "pk-bag", "WIDGET", 4.0)];
        let links =
            plan_unlinks_for_moves(&conn, &lines, &ValidationConfig::default()).expect("plan");

        // The pallet is a root, so nothing unlinks. Only packages below a
        // non-fulfilled parent produce an unlink.
        assert!(links.is_empty());
    }

    #[test]
    fn plan_unlinks_fulfilled_subtree_below_busy_parent() {
        // pallet holds its own stock plus the box; the box's contents move
        // out entirely, so the box unlinks from the pallet.
        let conn = open_in_memory().expect("open store");
        insert_package(&conn, &pk("pk-pallet"), "PAL", None).expect("insert");
        insert_package(&conn, &pk("pk-box"), "BOX", Some(&pk("pk-pallet"))).expect("insert");
        insert_quant(&conn, &pk("pk-pallet"), "GADGET", None, "WH/A", 9.0).expect("quant");
        insert_quant(&conn, &pk("pk-box"), "WIDGET", None, "WH/A", 4.0).expect("quant");

        let lines = vec![line(1, "pk-box", "WIDGET", 4.0)];
        let links =
            plan_unlinks_for_moves(&conn, &lines, &ValidationConfig::default()).expect("plan");

        assert_eq!(links.len(), 1);
        assert_eq!(links[0].child, pk("pk-box"));
        assert!(links[0].is_unlink());
        assert_eq!(links[0].move_line_ids, vec![MoveLineId(1)]);
    }
}
