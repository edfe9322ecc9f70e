//! Fulfillment: does a set of move lines account for a package's entire
//! contents?
//!
//! The contained quantities of the package's subtree and the quantities of
//! the move lines belonging to that subtree are both keyed by
//! `(product, lot)` and must agree on every key, an absent key counting as
//! zero. Comparison is decimal-precision-aware, never exact floating
//! equality. Move lines carrying *more* than the package holds do not
//! fulfill it.

use rusqlite::Connection;
use std::collections::{HashMap, HashSet};

use crate::config::ValidationConfig;
use crate::error::LinkError;
use crate::graph::forest;
use crate::model::movement::{MoveLine, QuantKey};
use crate::model::package::PackageId;

/// True when `value` rounds to zero at the given decimal precision.
#[must_use]
pub fn qty_is_zero(value: f64, digits: u32) -> bool {
    let digits = i32::try_from(digits).unwrap_or(i32::MAX).min(15);
    let factor = 10f64.powi(digits);
    let rounded = (value * factor).round() / factor;
    rounded.abs() < 10f64.powi(-digits)
}

/// The move lines (by reference) that belong to the package's subtree.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `package` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn move_lines_for<'a>(
    conn: &Connection,
    package: &PackageId,
    move_lines: &'a [MoveLine],
) -> Result<Vec<&'a MoveLine>, LinkError> {
    let subtree: HashSet<PackageId> =
        forest::descendants_of(conn, package)?.into_iter().collect();
    Ok(move_lines
        .iter()
        .filter(|line| line.touches(&subtree))
        .collect())
}

/// Decide whether `move_lines` account for the package's entire contents.
///
/// # Errors
///
/// Returns [`LinkError::PackageNotFound`] if `package` does not exist, or
/// [`LinkError::Db`] for store failures.
pub fn is_fulfilled_by(
    conn: &Connection,
    package: &PackageId,
    move_lines: &[MoveLine],
    config: &ValidationConfig,
) -> Result<bool, LinkError> {
    let pack_qtys = forest::quantities_by_key(conn, package)?;

    let mut line_qtys: HashMap<QuantKey, f64> = HashMap::new();
    for line in move_lines_for(conn, package, move_lines)? {
        *line_qtys.entry(line.key()).or_insert(0.0) += line.qty;
    }

    let keys: HashSet<&QuantKey> = pack_qtys.keys().chain(line_qtys.keys()).collect();
    for key in keys {
        let pack = pack_qtys.get(key).copied().unwrap_or(0.0);
        let moved = line_qtys.get(key).copied().unwrap_or(0.0);
        if !qty_is_zero(pack - moved, config.unit_precision_digits) {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::{is_fulfilled_by, move_lines_for, qty_is_zero};
    use crate::config::ValidationConfig;
    use crate::db::open_in_memory;
    use crate::db::query::{insert_package, insert_quant};
    use crate::model::movement::{MoveLine, MoveLineId};
    use crate::model::package::PackageId;
    use rusqlite::Connection;

    fn pk(id: &str) -> PackageId {
        PackageId::from(id)
    }

    fn line(id: i64, package: &str, product: &str, lot: Option<&str>, qty: f64) -> MoveLine {
        MoveLine {
            line_id: MoveLineId(id),
            package_id: Some(pk(package)),
            result_package_id: None,
            product: product.to_string(),
            lot: lot.map(str::to_string),
            qty,
        }
    }

    /// pk-box inside pk-pallet; box holds 5 WIDGET and 2 GADGET/LOT1.
    fn store_with_contents() -> Connection {
        let conn = open_in_memory().expect("open store");
        insert_package(&conn, &pk("pk-pallet"), "PAL1", None).expect("insert");
        insert_package(&conn, &pk("pk-box"), "BOX1", Some(&pk("pk-pallet"))).expect("insert");
        insert_quant(&conn, &pk("pk-box"), "WIDGET", None, "WH/A", 5.0).expect("quant");
        insert_quant(&conn, &pk("pk-box"), "GADGET", Some("LOT1"), "WH/A", 2.0).expect("quant");
        conn
    }

    #[test]
    fn qty_is_zero_respects_precision() {
        assert!(qty_is_zero(0.0, 3));
        assert!(qty_is_zero(0.0004, 3));
        assert!(qty_is_zero(-0.0004, 3));
        assert!(!qty_is_zero(0.001, 3));
        assert!(!qty_is_zero(0.01, 3));
    }

    #[test]
    fn fulfilled_when_all_keys_balance() {
        let conn = store_with_contents();
        let lines = vec![
            line(1, "pk-box", "WIDGET", None, 5.0),
            line(2, "pk-box", "GADGET", Some("LOT1"), 2.0),
        ];

        let fulfilled =
            is_fulfilled_by(&conn, &pk("pk-box"), &lines, &ValidationConfig::default())
                .expect("check");
        assert!(fulfilled);
    }

    #[test]
    fn partial_quantity_does_not_fulfill() {
        let conn = store_with_contents();
        let lines = vec![
            line(1, "pk-box", "WIDGET", None, 3.0),
            line(2, "pk-box", "GADGET", Some("LOT1"), 2.0),
        ];

        let fulfilled =
            is_fulfilled_by(&conn, &pk("pk-box"), &lines, &ValidationConfig::default())
                .expect("check");
        assert!(!fulfilled);
    }

    #[test]
    fn missing_key_does_not_fulfill() {
        let conn = store_with_contents();
        let lines = vec![line(1, "pk-box", "WIDGET", None, 5.0)];

        let fulfilled =
            is_fulfilled_by(&conn, &pk("pk-box"), &lines, &ValidationConfig::default())
                .expect("check");
        assert!(!fulfilled);
    }

    #[test]
    fn excess_quantity_does_not_fulfill() {
        let conn = store_with_contents();
        let lines = vec![
            line(1, "pk-box", "WIDGET", None, 7.0),
            line(2, "pk-box", "GADGET", Some("LOT1"), 2.0),
        ];

        let fulfilled =
            is_fulfilled_by(&conn, &pk("pk-box"), &lines, &ValidationConfig::default())
                .expect("check");
        assert!(!fulfilled);
    }

    #[test]
    fn sub_precision_drift_still_fulfills() {
        let conn = store_with_contents();
        let lines = vec![
            line(1, "pk-box", "WIDGET", None, 5.000_4),
            line(2, "pk-box", "GADGET", Some("LOT1"), 2.0),
        ];

        let fulfilled =
            is_fulfilled_by(&conn, &pk("pk-box"), &lines, &ValidationConfig::default())
                .expect("check");
        assert!(fulfilled);
    }

    #[test]
    fn lines_for_other_packages_are_ignored() {
        let conn = store_with_contents();
        insert_package(&conn, &pk("pk-other"), "OTHER", None).expect("insert");
        let lines = vec![
            line(1, "pk-box", "WIDGET", None, 5.0),
            line(2, "pk-box", "GADGET", Some("LOT1"), 2.0),
            line(3, "pk-other", "WIDGET", None, 99.0),
        ];

        let belonging = move_lines_for(&conn, &pk("pk-box"), &lines).expect("filter");
        assert_eq!(belonging.len(), 2);

        let fulfilled =
            is_fulfilled_by(&conn, &pk("pk-box"), &lines, &ValidationConfig::default())
                .expect("check");
        assert!(fulfilled);
    }

    #[test]
    fn fulfillment_rolls_up_to_the_parent() {
        // The pallet's contents are exactly the box's contents, so lines
        // covering the box cover the pallet too.
        let conn = store_with_contents();
        let lines = vec![
            line(1, "pk-box", "WIDGET", None, 5.0),
            line(2, "pk-box", "GADGET", Some("LOT1"), 2.0),
        ];

        let fulfilled =
            is_fulfilled_by(&conn, &pk("pk-pallet"), &lines, &ValidationConfig::default())
                .expect("check");
        assert!(fulfilled);
    }

    #[test]
    fn empty_package_and_no_lines_is_fulfilled() {
        let conn = open_in_memory().expect("open store");
        insert_package(&conn, &pk("pk-empty"), "EMPTY", None).expect("insert");

        let fulfilled =
            is_fulfilled_by(&conn, &pk("pk-empty"), &[], &ValidationConfig::default())
                .expect("check");
        assert!(fulfilled);
    }
}
