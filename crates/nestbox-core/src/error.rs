use std::fmt;

use crate::model::package::PackageId;

/// Machine-readable error codes for workflow-integration decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    PackageNotFound,
    AmbiguousMove,
    DepthExceeded,
    PackageLoop,
    MultiLocationConflict,
    CorruptStore,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::PackageNotFound => "E2001",
            Self::AmbiguousMove => "E2002",
            Self::DepthExceeded => "E2003",
            Self::PackageLoop => "E2004",
            Self::MultiLocationConflict => "E2005",
            Self::CorruptStore => "E3001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::PackageNotFound => "Package not found",
            Self::AmbiguousMove => "Package moved to several packages at once",
            Self::DepthExceeded => "Maximum package depth exceeded",
            Self::PackageLoop => "Package loop",
            Self::MultiLocationConflict => "Package contents span multiple locations",
            Self::CorruptStore => "Corrupt package store",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in the nestbox config file and retry."),
            Self::PackageNotFound => None,
            Self::AmbiguousMove => {
                Some("Split the movement so each package has a single destination.")
            }
            Self::DepthExceeded => {
                Some("Reduce nesting or raise max_package_depth for this warehouse.")
            }
            Self::PackageLoop => Some("Remove/adjust the links so packages form a forest."),
            Self::MultiLocationConflict => {
                Some("Move the package contents to a single location first.")
            }
            Self::CorruptStore => Some("Rebuild the package store from the source of truth."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Batch-rejection errors raised while building, validating, or applying a
/// link batch.
///
/// Every variant aborts the whole batch before any mutation; there is no
/// partial-success mode. The triggering movement must be resubmitted with
/// corrected inputs.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// A referenced package does not exist in the store.
    #[error("package not found: '{0}'")]
    PackageNotFound(PackageId),

    /// A child has links to more than one new parent, or two links without
    /// exactly one unlink among them.
    #[error("package '{child}' is being moved to several different packages")]
    AmbiguousMove { child: PackageId },

    /// A chain walk or the resulting total depth exceeds the configured
    /// maximum.
    #[error("maximum package depth exceeded: {total} > {max}")]
    DepthExceeded { total: u32, max: u32 },

    /// The chain's child is already an ancestor of its prospective parent.
    #[error("package '{child}' would be an ancestor of itself via '{parent}'")]
    SelfAncestor { child: PackageId, parent: PackageId },

    /// A link is unreachable from any terminal child: a cycle confined to
    /// the batch.
    #[error("package loop: link for '{package}' is unreachable from any terminal child")]
    PackageLoop { package: PackageId },

    /// A package's contents would span more than one physical location.
    #[error("package '{package}' cannot be in multiple locations: {}", locations.join(", "))]
    MultiLocationConflict {
        package: PackageId,
        locations: Vec<String>,
    },

    /// An underlying store error.
    #[error("store error: {0}")]
    Db(#[from] anyhow::Error),
}

impl LinkError {
    /// The machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::PackageNotFound(_) => ErrorCode::PackageNotFound,
            Self::AmbiguousMove { .. } => ErrorCode::AmbiguousMove,
            Self::DepthExceeded { .. } => ErrorCode::DepthExceeded,
            Self::SelfAncestor { .. } | Self::PackageLoop { .. } => ErrorCode::PackageLoop,
            Self::MultiLocationConflict { .. } => ErrorCode::MultiLocationConflict,
            Self::Db(_) => ErrorCode::CorruptStore,
        }
    }
}
