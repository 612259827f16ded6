//! SQLite 資料來源

use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDateTime;
use cost_core::source::average;
use cost_core::{
    BillOfMaterials, BomLine, BomType, Component, CostDataSource, CostLot, DateWindow,
    PurchaseLine, PurchaseLineState,
};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::db::{initialize_schema, open_sqlite_connection, BOUND_FORMAT, TIMESTAMP_FORMAT};
use crate::error::{StoreError, StoreResult};

type ComponentRow = (String, Option<String>, String, String, String, String);
type BomRow = (String, Option<String>, String, String, bool, String);

/// SQLite 資料來源（唯讀查詢，另提供寫入輔助供測試與示例建立資料）
pub struct SqliteSource {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSource {
    /// 開啟資料庫檔案
    pub fn open(db_path: &str) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        tracing::info!("已開啟成本資料庫: {}", db_path);
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 記憶體資料庫（已建立資料表）
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        crate::db::configure_sqlite_connection(&conn)?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 從已有連線建立
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 建立資料表（已存在則略過）
    pub fn initialize_schema(&self) -> StoreResult<()> {
        let conn = self.get_conn()?;
        initialize_schema(&conn)?;
        Ok(())
    }

    fn get_conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    // ===== 寫入輔助 =====

    pub fn insert_component(&self, component: &Component) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO product (id, default_code, name, uom, uom_factor, category) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                component.component_id,
                component.code,
                component.name,
                component.uom,
                component.uom_factor.to_string(),
                component.category_path,
            ],
        )?;
        Ok(())
    }

    /// BOM 與其所有行在同一交易中寫入
    pub fn insert_bom(&self, bom: &BillOfMaterials) -> StoreResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO mrp_bom (id, code, product_id, product_qty, active, type) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                bom.bom_id,
                bom.code,
                bom.product_id,
                bom.product_qty.to_string(),
                bom.active,
                bom.bom_type.as_str(),
            ],
        )?;
        for line in &bom.lines {
            tx.execute(
                "INSERT INTO mrp_bom_line (bom_id, product_id, product_qty, sequence) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    bom.bom_id,
                    line.component_id,
                    line.quantity.to_string(),
                    line.sequence,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn insert_purchase_line(&self, line: &PurchaseLine) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO purchase_order_line (product_id, price_unit, product_qty, state, create_date) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                line.component_id,
                line.price_unit.to_string(),
                line.quantity.to_string(),
                line.state.as_str(),
                format_timestamp(line.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn insert_valuation_layer(&self, component_id: &str, lot: &CostLot) -> StoreResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO stock_valuation_layer (product_id, quantity, unit_cost, create_date) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                component_id,
                lot.quantity.to_string(),
                lot.unit_cost.to_string(),
                format_timestamp(lot.created_at),
            ],
        )?;
        Ok(())
    }

    // ===== 查詢 =====

    fn query_component(&self, where_clause: &str, key: &str) -> StoreResult<Option<Component>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, default_code, name, uom, uom_factor, category FROM product WHERE {} \
             ORDER BY id LIMIT 1",
            where_clause
        );
        let row: Option<ComponentRow> = conn
            .query_row(&sql, params![key], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .optional()?;
        row.map(component_from_row).transpose()
    }

    fn query_all_components(&self) -> StoreResult<Vec<Component>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, default_code, name, uom, uom_factor, category FROM product ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<ComponentRow>>>()?;
        rows.into_iter().map(component_from_row).collect()
    }

    fn query_bom(&self, where_clause: &str, args: &[&str]) -> StoreResult<Option<BillOfMaterials>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT id, code, product_id, product_qty, active, type FROM mrp_bom WHERE {} \
             ORDER BY rowid LIMIT 1",
            where_clause
        );
        let row: Option<BomRow> = conn
            .query_row(&sql, params_from_iter(args.iter()), |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })
            .optional()?;

        let Some((bom_id, code, product_id, product_qty, active, bom_type)) = row else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT product_id, product_qty, sequence FROM mrp_bom_line \
             WHERE bom_id = ?1 ORDER BY sequence, id",
        )?;
        let line_rows = stmt
            .query_map(params![bom_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let lines = line_rows
            .into_iter()
            .map(|(component_id, qty, sequence)| -> StoreResult<BomLine> {
                Ok(BomLine::new(component_id, parse_decimal("mrp_bom_line.product_qty", &qty)?)
                    .with_sequence(sequence))
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Some(BillOfMaterials {
            bom_id,
            code,
            product_id,
            product_qty: parse_decimal("mrp_bom.product_qty", &product_qty)?,
            active,
            bom_type: BomType::from_str(&bom_type).map_err(|e| StoreError::FieldValueError {
                field: "mrp_bom.type".to_string(),
                message: e.to_string(),
            })?,
            lines,
        }))
    }

    fn query_purchase_prices(
        &self,
        component_id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> StoreResult<Vec<Decimal>> {
        if states.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders: Vec<String> = (0..states.len()).map(|i| format!("?{}", i + 4)).collect();
        let sql = format!(
            "SELECT price_unit FROM purchase_order_line \
             WHERE product_id = ?1 AND create_date >= ?2 AND create_date < ?3 \
             AND state IN ({})",
            placeholders.join(", ")
        );

        let mut args: Vec<String> = vec![
            component_id.to_string(),
            format_bound(window.start_datetime()),
            format_bound(window.end_datetime_exclusive()),
        ];
        args.extend(states.iter().map(|s| s.as_str().to_string()));

        let mut stmt = conn.prepare(&sql)?;
        let prices = stmt
            .query_map(params_from_iter(args.iter()), |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        prices
            .iter()
            .map(|p| parse_decimal("purchase_order_line.price_unit", p))
            .collect()
    }

    fn query_layers(
        &self,
        component_id: &str,
        window: Option<&DateWindow>,
    ) -> StoreResult<Vec<CostLot>> {
        let conn = self.get_conn()?;
        let (sql, args) = match window {
            Some(window) => (
                "SELECT quantity, unit_cost, create_date FROM stock_valuation_layer \
                 WHERE product_id = ?1 AND create_date >= ?2 AND create_date < ?3 \
                 ORDER BY create_date, id",
                vec![
                    component_id.to_string(),
                    format_bound(window.start_datetime()),
                    format_bound(window.end_datetime_exclusive()),
                ],
            ),
            None => (
                "SELECT quantity, unit_cost, create_date FROM stock_valuation_layer \
                 WHERE product_id = ?1 ORDER BY create_date, id",
                vec![component_id.to_string()],
            ),
        };

        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(quantity, unit_cost, created_at)| -> StoreResult<CostLot> {
                Ok(CostLot::new(
                    parse_decimal("stock_valuation_layer.quantity", &quantity)?,
                    parse_decimal("stock_valuation_layer.unit_cost", &unit_cost)?,
                    parse_timestamp("stock_valuation_layer.create_date", &created_at)?,
                ))
            })
            .collect()
    }
}

impl CostDataSource for SqliteSource {
    fn find_component(&self, component_id: &str) -> cost_core::Result<Option<Component>> {
        Ok(self.query_component("id = ?1", component_id)?)
    }

    fn find_component_by_code(&self, code: &str) -> cost_core::Result<Option<Component>> {
        Ok(self.query_component("default_code = ?1", code)?)
    }

    fn list_components(&self) -> cost_core::Result<Vec<Component>> {
        Ok(self.query_all_components()?)
    }

    fn find_active_bom(
        &self,
        product_id: &str,
        bom_type: BomType,
    ) -> cost_core::Result<Option<BillOfMaterials>> {
        Ok(self.query_bom(
            "product_id = ?1 AND active = 1 AND type = ?2",
            &[product_id, bom_type.as_str()],
        )?)
    }

    fn find_bom(&self, bom_id: &str) -> cost_core::Result<Option<BillOfMaterials>> {
        Ok(self.query_bom("id = ?1", &[bom_id])?)
    }

    fn average_purchase_price(
        &self,
        component_id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> cost_core::Result<Option<Decimal>> {
        Ok(average(self.query_purchase_prices(component_id, window, states)?))
    }

    fn count_purchase_lines(
        &self,
        component_id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> cost_core::Result<usize> {
        Ok(self.query_purchase_prices(component_id, window, states)?.len())
    }

    fn average_valuation_cost(
        &self,
        component_id: &str,
        window: &DateWindow,
    ) -> cost_core::Result<Option<Decimal>> {
        let layers = self.query_layers(component_id, Some(window))?;
        Ok(average(layers.iter().map(|lot| lot.unit_cost)))
    }

    fn count_valuation_layers(
        &self,
        component_id: &str,
        window: &DateWindow,
    ) -> cost_core::Result<usize> {
        Ok(self.query_layers(component_id, Some(window))?.len())
    }

    fn valuation_history(&self, component_id: &str) -> cost_core::Result<Vec<CostLot>> {
        Ok(self.query_layers(component_id, None)?)
    }
}

fn component_from_row(row: ComponentRow) -> StoreResult<Component> {
    let (id, code, name, uom, uom_factor, category) = row;
    let mut component = Component::new(id, name, uom)
        .with_uom_factor(parse_decimal("product.uom_factor", &uom_factor)?)
        .with_category_path(category);
    component.code = code;
    Ok(component)
}

fn parse_decimal(field: &str, value: &str) -> StoreResult<Decimal> {
    Decimal::from_str(value.trim()).map_err(|e| StoreError::FieldValueError {
        field: field.to_string(),
        message: format!("{} ({})", e, value),
    })
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn format_bound(at: NaiveDateTime) -> String {
    at.format(BOUND_FORMAT).to_string()
}

/// 接受帶或不帶小數秒的寫法（外部寫入的資料未必有小數）
fn parse_timestamp(field: &str, value: &str) -> StoreResult<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value, BOUND_FORMAT))
        .map_err(|e| StoreError::FieldValueError {
            field: field.to_string(),
            message: format!("{} ({})", e, value),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cost_core::CostError;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn store() -> SqliteSource {
        let store = SqliteSource::open_in_memory().unwrap();
        store
            .insert_component(
                &Component::new("FLOUR".into(), "Flour".into(), "kg".into())
                    .with_code("RM-001".into())
                    .with_uom_factor(dec!(1000))
                    .with_category_path("Raw Materials / Dry".into()),
            )
            .unwrap();
        store
            .insert_component(&Component::new("BREAD".into(), "Bread".into(), "Piece".into()))
            .unwrap();
        store
            .insert_bom(
                &BillOfMaterials::new("BOM-OLD".into(), "BREAD".into())
                    .inactive()
                    .with_line("LARD", dec!(1)),
            )
            .unwrap();
        store
            .insert_bom(
                &BillOfMaterials::new("BOM-BREAD".into(), "BREAD".into())
                    .with_code("BREAD-STD".into())
                    .with_product_qty(dec!(4))
                    .with_line("FLOUR", dec!(2.5))
                    .with_line("YEAST", dec!(0.1)),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_components() {
        let store = store();

        let flour = store.find_component("FLOUR").unwrap().unwrap();
        assert_eq!(flour.code.as_deref(), Some("RM-001"));
        assert_eq!(flour.uom_factor, dec!(1000));
        assert_eq!(flour.category_level(1), Some("Raw Materials"));

        let by_code = store.find_component_by_code("RM-001").unwrap().unwrap();
        assert_eq!(by_code.component_id, "FLOUR");

        assert!(store.find_component("SALT").unwrap().is_none());
        assert_eq!(store.list_components().unwrap().len(), 2);
    }

    #[test]
    fn test_boms() {
        let store = store();

        let active = store
            .find_active_bom("BREAD", BomType::Normal)
            .unwrap()
            .unwrap();
        assert_eq!(active.bom_id, "BOM-BREAD");
        assert_eq!(active.product_qty, dec!(4));
        assert_eq!(active.lines.len(), 2);
        assert_eq!(active.lines[0].component_id, "FLOUR");
        assert_eq!(active.lines[0].quantity, dec!(2.5));
        assert_eq!(active.line_ratio(&active.lines[0]), Some(dec!(0.625)));

        assert!(store
            .find_active_bom("BREAD", BomType::Phantom)
            .unwrap()
            .is_none());

        let old = store.find_bom("BOM-OLD").unwrap().unwrap();
        assert!(!old.active);
    }

    #[rstest]
    // 窗口含結束日整天
    #[case(at(12, 31, 23), true)]
    #[case(at(1, 1, 0), true)]
    #[case(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap(),
        false
    )]
    #[case(
        NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(23, 59, 59).unwrap(),
        false
    )]
    fn test_window_bounds(#[case] created_at: NaiveDateTime, #[case] inside: bool) {
        let store = store();
        store
            .insert_purchase_line(&PurchaseLine::new("FLOUR".into(), dec!(30), created_at))
            .unwrap();
        store
            .insert_valuation_layer("FLOUR", &CostLot::new(dec!(5), dec!(28), created_at))
            .unwrap();

        let window = DateWindow::calendar_year(2024).unwrap();
        let states = [PurchaseLineState::Purchase, PurchaseLineState::Done];
        let expected = usize::from(inside);

        assert_eq!(
            store.count_purchase_lines("FLOUR", &window, &states).unwrap(),
            expected
        );
        assert_eq!(store.count_valuation_layers("FLOUR", &window).unwrap(), expected);
    }

    #[test]
    fn test_cost_signals() {
        let store = store();
        store
            .insert_purchase_line(&PurchaseLine::new("FLOUR".into(), dec!(30), at(3, 1, 9)))
            .unwrap();
        store
            .insert_purchase_line(
                &PurchaseLine::new("FLOUR".into(), dec!(36), at(4, 1, 9))
                    .with_state(PurchaseLineState::Done),
            )
            .unwrap();
        store
            .insert_purchase_line(
                &PurchaseLine::new("FLOUR".into(), dec!(99), at(4, 2, 9))
                    .with_state(PurchaseLineState::Cancel),
            )
            .unwrap();
        store
            .insert_valuation_layer("FLOUR", &CostLot::new(dec!(10), dec!(28), at(3, 2, 9)))
            .unwrap();
        store
            .insert_valuation_layer("FLOUR", &CostLot::new(dec!(-4), dec!(30), at(3, 3, 9)))
            .unwrap();

        let window = DateWindow::calendar_year(2024).unwrap();
        let states = [PurchaseLineState::Purchase, PurchaseLineState::Done];

        assert_eq!(
            store.average_purchase_price("FLOUR", &window, &states).unwrap(),
            Some(dec!(33))
        );
        assert_eq!(
            store.average_purchase_price("FLOUR", &window, &[]).unwrap(),
            None
        );
        assert_eq!(
            store.average_valuation_cost("FLOUR", &window).unwrap(),
            Some(dec!(29))
        );
        assert_eq!(store.average_valuation_cost("YEAST", &window).unwrap(), None);
    }

    #[test]
    fn test_valuation_history_is_time_ordered() {
        let store = store();
        store
            .insert_valuation_layer("FLOUR", &CostLot::new(dec!(-3), dec!(20), at(5, 1, 9)))
            .unwrap();
        store
            .insert_valuation_layer("FLOUR", &CostLot::new(dec!(5), dec!(20), at(2, 1, 9)))
            .unwrap();
        // 同一時間保持寫入順序
        store
            .insert_valuation_layer("FLOUR", &CostLot::new(dec!(1), dec!(21), at(2, 1, 9)))
            .unwrap();

        let history = store.valuation_history("FLOUR").unwrap();
        let costs: Vec<Decimal> = history.iter().map(|l| l.unit_cost).collect();
        assert_eq!(costs, vec![dec!(20), dec!(21), dec!(20)]);
        assert_eq!(history[2].quantity, dec!(-3));
    }

    #[test]
    fn test_subsecond_timestamps_keep_fifo_order() {
        let store = store();
        let base = at(5, 1, 10);
        // 先寫入的批次時間較晚
        store
            .insert_valuation_layer(
                "FLOUR",
                &CostLot::new(dec!(5), dec!(10), base + chrono::Duration::milliseconds(900)),
            )
            .unwrap();
        store
            .insert_valuation_layer(
                "FLOUR",
                &CostLot::new(dec!(5), dec!(20), base + chrono::Duration::milliseconds(100)),
            )
            .unwrap();

        let history = store.valuation_history("FLOUR").unwrap();
        assert_eq!(history[0].unit_cost, dec!(20));
        assert_eq!(history[0].created_at, base + chrono::Duration::milliseconds(100));
        assert_eq!(history[1].created_at, base + chrono::Duration::milliseconds(900));
    }

    #[test]
    fn test_plain_timestamps_written_externally() {
        let store = store();
        {
            let conn = store.get_conn().unwrap();
            conn.execute(
                "INSERT INTO stock_valuation_layer (product_id, quantity, unit_cost, create_date) \
                 VALUES ('FLOUR', '5', '12', '2024-01-01 00:00:00')",
                [],
            )
            .unwrap();
        }

        let history = store.valuation_history("FLOUR").unwrap();
        assert_eq!(history[0].created_at, at(1, 1, 0));

        let window = DateWindow::calendar_year(2024).unwrap();
        assert_eq!(store.count_valuation_layers("FLOUR", &window).unwrap(), 1);
    }

    #[test]
    fn test_corrupt_value_is_a_data_source_error() {
        let store = store();
        {
            let conn = store.get_conn().unwrap();
            conn.execute(
                "INSERT INTO stock_valuation_layer (product_id, quantity, unit_cost, create_date) \
                 VALUES ('FLOUR', 'n/a', '1', '2024-01-01 00:00:00')",
                [],
            )
            .unwrap();
        }

        let result = store.valuation_history("FLOUR");
        assert!(matches!(result, Err(CostError::DataSource(_))));
    }

    #[test]
    fn test_duplicate_component_is_rejected() {
        let store = store();
        let result = store.insert_component(&Component::new(
            "FLOUR".into(),
            "Flour".into(),
            "kg".into(),
        ));
        assert!(matches!(
            result,
            Err(StoreError::UniqueConstraintViolation(_))
        ));
    }
}
