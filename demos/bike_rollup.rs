//! 腳踏車成本彙總範例
//!
//! 展示多層 BOM 展開、區間成本與 FIFO 成本彙總、直接行核對

use bomcost::logging;
use bomcost::prelude::*;
use chrono::NaiveDate;
use rust_decimal_macros::dec;

fn main() -> anyhow::Result<()> {
    logging::init();
    println!("===== Bike Cost Rollup Example =====\n");

    // 步驟 1: 建立資料
    println!("[1] Load master data");
    let source = create_bike_data();
    println!("    Components: {}\n", source.list_components()?.len());

    // 步驟 2: 展開 BOM
    println!("[2] Expand BOM");
    let config = CostConfig::default();
    let expansion = BomExpander::new(&source, &config).expand("BIKE-001")?;
    for node in &expansion.nodes {
        println!(
            "    {}L{} {:<12} x {:<6} {}",
            "  ".repeat(node.level as usize),
            node.level,
            node.component_id,
            node.multiplier,
            if node.is_leaf { "(leaf)" } else { "" }
        );
    }
    println!();

    // 步驟 3: 2024 全年平均成本
    println!("[3] Rollup: average cost over 2024");
    let window = DateWindow::calendar_year(2024)?;
    let calculator = RollupCalculator::new(&source, config.clone());
    let result = calculator.rollup("BIKE-001", CostView::PointInTime(window))?;
    for leaf in &result.leaf_costs {
        println!(
            "    {:<28} {:>6} x {:>8} = {:>8}  [{}]",
            leaf.path.join(" > "),
            leaf.multiplier,
            leaf.unit_cost.round_dp(2),
            leaf.line_cost.round_dp(2),
            leaf.source
        );
    }
    for (level, subtotal) in &result.per_level_subtotal {
        println!("    Level {} subtotal: {}", level, subtotal.round_dp(2));
    }
    println!("    Total: {}", result.total_cost.round_dp(2));
    if let Some(recorded) = result.root_recorded_cost {
        println!("    ERP recorded cost: {}", recorded.round_dp(2));
    }
    for warning in &result.warnings {
        println!("    ! {:?}: {}", warning.kind, warning.message);
    }
    println!();

    // 步驟 4: 目前 FIFO 成本
    println!("[4] Rollup: current FIFO cost");
    let fifo = calculator.rollup("BIKE-001", CostView::CurrentFifo)?;
    println!(
        "    Total: {} ({} leaves without stock)\n",
        fifo.total_cost.round_dp(2),
        fifo.missing_cost_count()
    );

    // 步驟 5: 直接行核對
    println!("[5] Direct lines of BOM-BIKE");
    let breakdown = DirectBreakdownCalculator::new(&source, config.clone())
        .breakdown_bom("BOM-BIKE", CostView::PointInTime(window))?;
    if let Some(breakdown) = breakdown {
        for line in &breakdown.lines {
            println!(
                "    {:<10} qty {:>4} / {:<4} cost {:>8}  (po lines: {:?}, layers: {:?})",
                line.component_id,
                line.line_qty,
                line.bom_qty,
                line.computed_cost.round_dp(2),
                line.purchase_line_count,
                line.valuation_layer_count
            );
        }
        println!("    Direct total: {}", breakdown.total_cost.round_dp(2));
    }
    println!();

    // 步驟 6: 月度趨勢
    println!("[6] Monthly trend of BOM-WHEEL");
    let wheel_bom = source.require_bom("BOM-WHEEL")?;
    let series = MonthlyCostCalculator::new(&source, &config).series(&wheel_bom)?;
    for point in &series {
        println!(
            "    {}  avg {:>8}  rolling {:>8}",
            point.month.format("%Y-%m"),
            point.weighted_average.round_dp(4),
            point
                .rolling_average
                .map(|v| v.round_dp(4).to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }

    println!("\n===== Done =====");
    Ok(())
}

fn create_bike_data() -> InMemorySource {
    let date = |y, m, d| {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap_or_default()
    };
    let part = |id: &str, name: &str, uom: &str| {
        Component::new(id.to_string(), name.to_string(), uom.to_string())
    };

    InMemorySource::new()
        .with_component(
            part("BIKE-001", "City Bike (Blue)", "Piece")
                .with_category_path("Finished Goods / Bikes / Factory".to_string()),
        )
        .with_component(part("FRAME-001", "Frame", "Piece"))
        .with_component(part("WHEEL-001", "Wheel", "Piece"))
        .with_component(part("TUBE-001", "Steel Tube", "m"))
        .with_component(part("SPOKE-001", "Spoke", "Piece"))
        .with_component(part("RIM-001", "Rim", "Piece"))
        .with_bom(
            BillOfMaterials::new("BOM-BIKE".into(), "BIKE-001".into())
                .with_line("FRAME-001", dec!(1))
                .with_line("WHEEL-001", dec!(2)),
        )
        .with_bom(
            BillOfMaterials::new("BOM-FRAME".into(), "FRAME-001".into())
                .with_line("TUBE-001", dec!(3)),
        )
        .with_bom(
            BillOfMaterials::new("BOM-WHEEL".into(), "WHEEL-001".into())
                .with_line("RIM-001", dec!(1))
                .with_line("SPOKE-001", dec!(36)),
        )
        .with_purchase_line(PurchaseLine::new("TUBE-001".into(), dec!(20), date(2024, 3, 1)))
        .with_purchase_line(PurchaseLine::new("RIM-001".into(), dec!(15), date(2024, 4, 1)))
        .with_valuation_layer("BIKE-001", CostLot::new(dec!(5), dec!(140), date(2024, 7, 1)))
        .with_valuation_layer("SPOKE-001", CostLot::new(dec!(500), dec!(0.45), date(2024, 2, 1)))
        .with_valuation_layer("SPOKE-001", CostLot::new(dec!(800), dec!(0.40), date(2025, 1, 6)))
        .with_valuation_layer("SPOKE-001", CostLot::new(dec!(-700), dec!(0.45), date(2025, 2, 3)))
        .with_valuation_layer("SPOKE-001", CostLot::new(dec!(600), dec!(0.55), date(2025, 3, 9)))
        .with_valuation_layer("RIM-001", CostLot::new(dec!(40), dec!(16), date(2025, 1, 20)))
        .with_valuation_layer("TUBE-001", CostLot::new(dec!(100), dec!(21), date(2025, 2, 14)))
}
