//! Movement records supplied by the surrounding inventory workflow.
//!
//! nestbox does not own the movement lifecycle. The workflow collaborator
//! hands over the completed move lines of one transactional unit (one
//! picking completion, one putaway) and those lines justify the link batch
//! that is validated and applied against the forest.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::package::PackageId;

/// Identifier of one completed move line within the triggering transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveLineId(pub i64);

impl fmt::Display for MoveLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ml-{}", self.0)
    }
}

/// Grouping key for quantity reconciliation: one product, one optional lot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuantKey {
    pub product: String,
    pub lot: Option<String>,
}

impl QuantKey {
    pub fn new(product: impl Into<String>, lot: Option<String>) -> Self {
        Self {
            product: product.into(),
            lot,
        }
    }
}

impl fmt::Display for QuantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.lot {
            Some(lot) => write!(f, "{}/{lot}", self.product),
            None => f.write_str(&self.product),
        }
    }
}

/// One completed stock move line.
///
/// `package_id` is the package the goods were taken from, `result_package_id`
/// the package they ended up in; either may be absent (loose stock).
#[derive(Debug, Clone, PartialEq)]
pub struct MoveLine {
    pub line_id: MoveLineId,
    pub package_id: Option<PackageId>,
    pub result_package_id: Option<PackageId>,
    pub product: String,
    pub lot: Option<String>,
    pub qty: f64,
}

impl MoveLine {
    /// Reconciliation key of this line.
    #[must_use]
    pub fn key(&self) -> QuantKey {
        QuantKey::new(self.product.clone(), self.lot.clone())
    }

    /// A move line belongs to a package when its source or result package
    /// lies inside that package's subtree.
    #[must_use]
    pub fn touches(&self, subtree: &HashSet<PackageId>) -> bool {
        self.package_id
            .as_ref()
            .is_some_and(|p| subtree.contains(p))
            || self
                .result_package_id
                .as_ref()
                .is_some_and(|p| subtree.contains(p))
    }

    /// Packages this line references directly (source and result).
    pub fn touched_packages(&self) -> impl Iterator<Item = &PackageId> {
        self.package_id
            .iter()
            .chain(self.result_package_id.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::{MoveLine, MoveLineId, PackageId, QuantKey};
    use std::collections::HashSet;

    fn line(id: i64, package: Option<&str>, result: Option<&str>) -> MoveLine {
        MoveLine {
            line_id: MoveLineId(id),
            package_id: package.map(PackageId::from),
            result_package_id: result.map(PackageId::from),
            product: "WIDGET".to_string(),
            lot: None,
            qty: 1.0,
        }
    }

    #[test]
    fn quant_key_display_with_and_without_lot() {
        assert_eq!(QuantKey::new("WIDGET", None).to_string(), "WIDGET");
        assert_eq!(
            QuantKey::new("WIDGET", Some("LOT7".to_string())).to_string(),
            "WIDGET/LOT7"
        );
    }

    #[test]
    fn touches_matches_source_or_result() {
        let subtree: HashSet<PackageId> = [PackageId::from("pk-a")].into_iter().collect();

        assert!(line(1, Some("pk-a"), None).touches(&subtree));
        assert!(line(2, None, Some("pk-a")).touches(&subtree));
        assert!(!line(3, Some("pk-b"), Some("pk-c")).touches(&subtree));
        assert!(!line(4, None, None).touches(&subtree));
    }

    #[test]
    fn touched_packages_yields_both_ends() {
        let ml = line(1, Some("pk-a"), Some("pk-b"));
        let touched: Vec<_> = ml.touched_packages().map(PackageId::as_str).collect();
        assert_eq!(touched, vec!["pk-a", "pk-b"]);
    }
}
