//! SQLite 成本彙總範例
//!
//! 用法：`cargo run --example sqlite_rollup -- [資料庫路徑] [料號] [月數]`
//! 未指定資料庫時建立記憶體資料庫並寫入示範資料。

use anyhow::Context;
use bomcost::logging;
use bomcost::prelude::*;
use chrono::Local;
use rust_decimal_macros::dec;

fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let store = match args.first() {
        Some(path) => SqliteSource::open(path)
            .with_context(|| format!("無法開啟資料庫 {}", path))?,
        None => seed_demo_store()?,
    };
    let code = args.get(1).map(String::as_str).unwrap_or("FG-COOKIE");
    let months: u32 = args
        .get(2)
        .map(|m| m.parse())
        .transpose()
        .context("月數必須是整數")?
        .unwrap_or(12);

    println!("===== SQLite Cost Rollup =====\n");

    let catalog = ProductCatalog::new(&store);
    println!("Finished goods:");
    for product in catalog.list(&CatalogFilter::finished_goods())? {
        println!(
            "    {:<12} {:<32} {}",
            product.code.as_deref().unwrap_or("-"),
            product.name,
            product.uom
        );
    }

    let product = catalog
        .find_by_code(code)?
        .with_context(|| format!("找不到料號 {}", code))?;

    let today = Local::now().date_naive();
    let window = DateWindow::last_months(today, months)?;
    println!("\n{} ({}) over {}", product.name, code, window);

    let calculator = RollupCalculator::new(&store, CostConfig::default());
    let result = calculator.rollup(&product.component_id, CostView::PointInTime(window))?;
    if result.is_empty() {
        println!("    No active BOM");
        return Ok(());
    }
    for (parent, subtotal) in &result.per_parent_subtotal {
        println!("    under {:<12} {:>10}", parent, subtotal.round_dp(2));
    }
    println!("    Total:       {:>10}", result.total_cost.round_dp(2));

    let fifo = calculator.rollup(&product.component_id, CostView::CurrentFifo)?;
    println!("    FIFO total:  {:>10}", fifo.total_cost.round_dp(2));
    println!("    run id: {}", result.run_id);

    Ok(())
}

fn seed_demo_store() -> anyhow::Result<SqliteSource> {
    let store = SqliteSource::open_in_memory()?;
    let today = Local::now().date_naive();
    let recent = |days_ago: i64| {
        (today - chrono::Duration::days(days_ago))
            .and_hms_opt(9, 0, 0)
            .unwrap_or_default()
    };

    store.insert_component(
        &Component::new("P-COOKIE".into(), "Butter Cookie (Tin, 12 Pack)".into(), "Carton".into())
            .with_code("FG-COOKIE".into())
            .with_category_path("Finished Goods / Bakery / Factory".into()),
    )?;
    store.insert_component(
        &Component::new("P-DOUGH".into(), "Cookie Dough".into(), "kg".into())
            .with_code("SF-DOUGH".into()),
    )?;
    for (id, name, uom) in [
        ("P-FLOUR", "Flour", "kg"),
        ("P-BUTTER", "Butter", "kg"),
        ("P-TIN", "Tin", "Piece"),
    ] {
        store.insert_component(&Component::new(id.into(), name.into(), uom.into()))?;
    }

    store.insert_bom(
        &BillOfMaterials::new("BOM-COOKIE".into(), "P-COOKIE".into())
            .with_line("P-DOUGH", dec!(1.2))
            .with_line("P-TIN", dec!(1)),
    )?;
    store.insert_bom(
        &BillOfMaterials::new("BOM-DOUGH".into(), "P-DOUGH".into())
            .with_product_qty(dec!(10))
            .with_line("P-FLOUR", dec!(6))
            .with_line("P-BUTTER", dec!(4)),
    )?;

    store.insert_purchase_line(&PurchaseLine::new("P-FLOUR".into(), dec!(1.1), recent(40)))?;
    store.insert_purchase_line(&PurchaseLine::new("P-BUTTER".into(), dec!(7.5), recent(20)))?;
    store.insert_valuation_layer("P-TIN", &CostLot::new(dec!(200), dec!(0.8), recent(60)))?;
    store.insert_valuation_layer("P-TIN", &CostLot::new(dec!(-50), dec!(0.8), recent(10)))?;
    store.insert_valuation_layer("P-FLOUR", &CostLot::new(dec!(500), dec!(1.05), recent(35)))?;
    store.insert_valuation_layer(
        "P-COOKIE",
        &CostLot::new(dec!(100), dec!(9.2), recent(5)),
    )?;

    Ok(store)
}
