//! SQLite 連線與資料表結構
//!
//! 資料表沿用 ERP 的命名（product / mrp_bom / mrp_bom_line /
//! purchase_order_line / stock_valuation_layer）。數量與金額以 TEXT 儲存，
//! 讀出後轉為 `Decimal`，避免浮點誤差。

use std::time::Duration;

use rusqlite::Connection;

/// 預設 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 時間欄位格式（固定六位小數秒，字典序即時間序）
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// 查詢邊界格式（不帶小數秒，不大於同一秒的任何寫法）
pub const BOUND_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS product (
    id           TEXT PRIMARY KEY,
    default_code TEXT,
    name         TEXT NOT NULL,
    uom          TEXT NOT NULL DEFAULT '',
    uom_factor   TEXT NOT NULL DEFAULT '1',
    category     TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS mrp_bom (
    id          TEXT PRIMARY KEY,
    code        TEXT,
    product_id  TEXT NOT NULL,
    product_qty TEXT NOT NULL DEFAULT '1',
    active      INTEGER NOT NULL DEFAULT 1,
    type        TEXT NOT NULL DEFAULT 'normal'
);

CREATE TABLE IF NOT EXISTS mrp_bom_line (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    bom_id      TEXT NOT NULL REFERENCES mrp_bom(id) ON DELETE CASCADE,
    product_id  TEXT NOT NULL,
    product_qty TEXT NOT NULL,
    sequence    INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS purchase_order_line (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id  TEXT NOT NULL,
    price_unit  TEXT NOT NULL,
    product_qty TEXT NOT NULL DEFAULT '1',
    state       TEXT NOT NULL,
    create_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS stock_valuation_layer (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id  TEXT NOT NULL,
    quantity    TEXT NOT NULL,
    unit_cost   TEXT NOT NULL,
    create_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_mrp_bom_product ON mrp_bom(product_id, active, type);
CREATE INDEX IF NOT EXISTS idx_mrp_bom_line_bom ON mrp_bom_line(bom_id, sequence);
CREATE INDEX IF NOT EXISTS idx_pol_product_date ON purchase_order_line(product_id, create_date);
CREATE INDEX IF NOT EXISTS idx_svl_product_date ON stock_valuation_layer(product_id, create_date);
"#;

/// 統一的連線設定（外鍵與 busy_timeout 需逐連線設定）
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 開啟 SQLite 連線並套用統一設定
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建立資料表（已存在則略過）
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
