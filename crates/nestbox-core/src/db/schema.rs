//! Canonical SQLite schema for the package store.
//!
//! The schema is normalized for queryability:
//! - `packages` keeps the authoritative parent pointer of every package
//! - `package_quants` models package contents, one row per product/lot/location
//! - `store_meta` tracks the schema version alongside `PRAGMA user_version`
//!
//! Parent pointers are nulled when the parent is deleted; quants are removed
//! with their package.

/// Migration v1: core tables plus store metadata.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    package_id TEXT PRIMARY KEY,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    parent_id TEXT REFERENCES packages(package_id) ON DELETE SET NULL,
    company_id TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL,
    CHECK (package_id LIKE 'pk-%'),
    CHECK (parent_id IS NULL OR parent_id <> package_id)
);

CREATE TABLE IF NOT EXISTS package_quants (
    quant_id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id TEXT NOT NULL REFERENCES packages(package_id) ON DELETE CASCADE,
    product TEXT NOT NULL CHECK (length(trim(product)) > 0),
    lot TEXT,
    location_id TEXT NOT NULL CHECK (length(trim(location_id)) > 0),
    quantity REAL NOT NULL DEFAULT 0,
    reserved_quantity REAL NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL
);

INSERT OR IGNORE INTO store_meta (id, schema_version) VALUES (1, 1);
"#;

/// Migration v2: read-path indexes for forest traversal and reconciliation.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_packages_parent
    ON packages(parent_id);

CREATE INDEX IF NOT EXISTS idx_quants_package
    ON package_quants(package_id);

CREATE INDEX IF NOT EXISTS idx_quants_product_lot
    ON package_quants(product, lot);
"#;
