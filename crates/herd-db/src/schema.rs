//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- ============================================================
-- Revenue split configuration
-- ============================================================

-- `position` preserves insertion order; the resolver picks the first match.
CREATE TABLE IF NOT EXISTS split_configs (
    position INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    category TEXT NOT NULL,
    farmer_share INTEGER NOT NULL,
    platform_share INTEGER NOT NULL,
    description TEXT,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_split_configs_category ON split_configs(category, active);

-- ============================================================
-- Livestock registry
-- ============================================================

CREATE TABLE IF NOT EXISTS livestock (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    breed TEXT NOT NULL,
    category TEXT NOT NULL,
    owner_identity TEXT,
    current_weight_kg REAL,
    health_score INTEGER CHECK (health_score IS NULL OR health_score BETWEEN 0 AND 100),
    lifecycle_status TEXT NOT NULL
        CHECK (lifecycle_status IN ('active', 'ready', 'sold', 'settled')),
    version INTEGER NOT NULL DEFAULT 0,
    registered_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_livestock_status ON livestock(lifecycle_status);

CREATE TABLE IF NOT EXISTS supply_chain_events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    asset_id TEXT NOT NULL REFERENCES livestock(id),
    kind TEXT NOT NULL,
    actor TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    data TEXT NOT NULL,
    content_ref TEXT
);

CREATE INDEX IF NOT EXISTS idx_events_asset ON supply_chain_events(asset_id, seq);

-- ============================================================
-- Settlements
-- ============================================================

CREATE TABLE IF NOT EXISTS settlements (
    asset_id TEXT PRIMARY KEY REFERENCES livestock(id),
    split_id TEXT NOT NULL,
    farmer_share INTEGER NOT NULL,
    platform_share INTEGER NOT NULL,
    gross_amount INTEGER NOT NULL,
    expenses INTEGER NOT NULL,
    net_amount INTEGER NOT NULL,
    farmer_amount INTEGER NOT NULL,
    platform_amount INTEGER NOT NULL,
    farmer TEXT NOT NULL,
    platform TEXT NOT NULL,
    payment_token TEXT NOT NULL UNIQUE,
    certificate TEXT NOT NULL,
    facility TEXT NOT NULL,
    slaughtered_at INTEGER NOT NULL,
    final_weight_kg REAL NOT NULL,
    settled_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_settlements_settled_at ON settlements(settled_at);

-- ============================================================
-- Custodial wallets
-- ============================================================

CREATE TABLE IF NOT EXISTS custodial_wallets (
    identity TEXT PRIMARY KEY,
    owner_email TEXT NOT NULL UNIQUE,
    sealed_key BLOB NOT NULL,
    nonce BLOB NOT NULL,
    created_at INTEGER NOT NULL
);

-- ============================================================
-- Sandbox ledger and certificate store
-- ============================================================

-- `seq` orders payments and seeds their tokens.
CREATE TABLE IF NOT EXISTS sandbox_payments (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    reference TEXT NOT NULL UNIQUE,
    token TEXT NOT NULL UNIQUE,
    disbursements TEXT NOT NULL,
    confirmed_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS sandbox_certificates (
    content_ref TEXT PRIMARY KEY,
    document BLOB NOT NULL
);

-- ============================================================
-- Settings
-- ============================================================

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
