//! 直接子件成本核對
//!
//! 只看單一 BOM 的直接行（不遞迴，中間件照樣計價），
//! 用來對照多層彙總的結果。

use cost_core::{
    BillOfMaterials, CostConfig, CostDataSource, CostSource, CostView, ResolvedCost,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::fifo::FifoTracker;
use crate::resolver::CostResolver;

/// 直接行成本
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectLineCost {
    pub component_id: String,
    pub component_name: String,
    /// BOM 行數量
    pub line_qty: Decimal,
    /// BOM 產出數量
    pub bom_qty: Decimal,
    /// line_qty / bom_qty，產出數量為 0 時為 `None`
    pub multiplier: Option<Decimal>,
    pub unit_cost: Decimal,
    pub source: CostSource,
    pub computed_cost: Decimal,
    pub degenerate: bool,
    /// 區間內符合狀態的採購行數（僅區間檢視）
    pub purchase_line_count: Option<usize>,
    /// 區間內估價層數（僅區間檢視）
    pub valuation_layer_count: Option<usize>,
}

/// 單一 BOM 的直接行核對結果
#[derive(Debug, Clone, Serialize)]
pub struct DirectBreakdown {
    pub bom_id: String,
    pub product_id: String,
    pub view: CostView,
    pub lines: Vec<DirectLineCost>,
    pub total_cost: Decimal,
}

impl DirectBreakdown {
    /// 查無成本的行
    pub fn missing_costs(&self) -> impl Iterator<Item = &DirectLineCost> {
        self.lines.iter().filter(|l| l.source == CostSource::None)
    }
}

/// 直接行核對計算器
pub struct DirectBreakdownCalculator<'a> {
    source: &'a dyn CostDataSource,
    config: CostConfig,
}

impl<'a> DirectBreakdownCalculator<'a> {
    pub fn new(source: &'a dyn CostDataSource, config: CostConfig) -> Self {
        Self { source, config }
    }

    /// 依 BOM ID 核對，BOM 不存在時返回 `None`
    pub fn breakdown_bom(
        &self,
        bom_id: &str,
        view: CostView,
    ) -> cost_core::Result<Option<DirectBreakdown>> {
        match self.source.find_bom(bom_id)? {
            Some(bom) => self.breakdown(&bom, view).map(Some),
            None => Ok(None),
        }
    }

    /// 核對 BOM 的每一條直接行
    pub fn breakdown(
        &self,
        bom: &BillOfMaterials,
        view: CostView,
    ) -> cost_core::Result<DirectBreakdown> {
        let resolver = CostResolver::new(self.source, &self.config);
        let tracker = FifoTracker::new(self.source);

        let mut lines = Vec::with_capacity(bom.lines.len());
        for line in &bom.lines {
            let name = self
                .source
                .find_component(&line.component_id)?
                .map(|c| c.name)
                .unwrap_or_else(|| line.component_id.clone());

            let (cost, purchase_line_count, valuation_layer_count): (ResolvedCost, _, _) =
                match view {
                    CostView::PointInTime(window) => (
                        resolver.resolve(&line.component_id, &window)?,
                        Some(self.source.count_purchase_lines(
                            &line.component_id,
                            &window,
                            &self.config.purchase_states,
                        )?),
                        Some(
                            self.source
                                .count_valuation_layers(&line.component_id, &window)?,
                        ),
                    ),
                    CostView::CurrentFifo => (tracker.resolve(&line.component_id)?, None, None),
                };

            let multiplier = bom.line_ratio(line);
            lines.push(DirectLineCost {
                component_id: line.component_id.clone(),
                component_name: name,
                line_qty: line.quantity,
                bom_qty: bom.product_qty,
                multiplier,
                unit_cost: cost.unit_cost,
                source: cost.source,
                computed_cost: multiplier.unwrap_or(Decimal::ZERO) * cost.unit_cost,
                degenerate: multiplier.is_none(),
                purchase_line_count,
                valuation_layer_count,
            });
        }

        let total_cost: Decimal = lines.iter().map(|l| l.computed_cost).sum();
        tracing::info!(
            "BOM {} 直接行核對：{} 行，合計 {}",
            bom.bom_id,
            lines.len(),
            total_cost
        );

        Ok(DirectBreakdown {
            bom_id: bom.bom_id.clone(),
            product_id: bom.product_id.clone(),
            view,
            lines,
            total_cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, component, UnreachableSource};
    use cost_core::{CostError, CostLot, DateWindow, InMemorySource, PurchaseLine};
    use rust_decimal_macros::dec;

    fn source() -> InMemorySource {
        InMemorySource::new()
            .with_component(component("PIE"))
            .with_component(component("CRUST"))
            .with_component(component("APPLE"))
            .with_bom(
                BillOfMaterials::new("BOM-PIE".into(), "PIE".into())
                    .with_product_qty(dec!(2))
                    .with_line("CRUST", dec!(2))
                    .with_line("APPLE", dec!(6)),
            )
            .with_bom(
                BillOfMaterials::new("BOM-CRUST".into(), "CRUST".into())
                    .with_line("FLOUR", dec!(1)),
            )
            // 中間件也以自身價格計價
            .with_purchase_line(PurchaseLine::new("CRUST".into(), dec!(12), at(2024, 5, 1)))
            .with_purchase_line(PurchaseLine::new("CRUST".into(), dec!(14), at(2024, 6, 1)))
            .with_valuation_layer("APPLE", CostLot::new(dec!(30), dec!(2), at(2024, 5, 3)))
            .with_valuation_layer("APPLE", CostLot::new(dec!(30), dec!(3), at(2024, 7, 3)))
            .with_valuation_layer("APPLE", CostLot::new(dec!(-40), dec!(4), at(2024, 8, 3)))
    }

    fn year_2024() -> CostView {
        CostView::PointInTime(DateWindow::calendar_year(2024).unwrap())
    }

    #[test]
    fn test_direct_breakdown_point_in_time() {
        let source = source();
        let calculator = DirectBreakdownCalculator::new(&source, CostConfig::default());

        let breakdown = calculator
            .breakdown_bom("BOM-PIE", year_2024())
            .unwrap()
            .unwrap();

        let crust = &breakdown.lines[0];
        assert_eq!(crust.component_id, "CRUST");
        assert_eq!(crust.multiplier, Some(dec!(1)));
        assert_eq!(crust.unit_cost, dec!(13));
        assert_eq!(crust.source, CostSource::PurchasePrice);
        assert_eq!(crust.purchase_line_count, Some(2));
        assert_eq!(crust.valuation_layer_count, Some(0));

        // 估價層平均 (2 + 3 + 4) / 3
        let apple = &breakdown.lines[1];
        assert_eq!(apple.multiplier, Some(dec!(3)));
        assert_eq!(apple.source, CostSource::ValuationLayer);
        assert_eq!(apple.valuation_layer_count, Some(3));
        assert_eq!(apple.computed_cost, dec!(9));

        assert_eq!(breakdown.total_cost, dec!(22));
    }

    #[test]
    fn test_flat_fifo_breakdown() {
        let source = source();
        let calculator = DirectBreakdownCalculator::new(&source, CostConfig::default());

        let breakdown = calculator
            .breakdown_bom("BOM-PIE", CostView::CurrentFifo)
            .unwrap()
            .unwrap();

        // APPLE：第一批耗盡，第二批剩 20 @3
        assert_eq!(breakdown.lines[1].unit_cost, dec!(3));
        assert_eq!(breakdown.lines[1].computed_cost, dec!(9));
        assert!(breakdown.lines[1].purchase_line_count.is_none());
        assert_eq!(breakdown.missing_costs().count(), 1);
        assert_eq!(breakdown.total_cost, dec!(9));
    }

    #[test]
    fn test_degenerate_line() {
        let source = source();
        let bom = BillOfMaterials::new("BOM-ZERO".into(), "PIE".into())
            .with_product_qty(Decimal::ZERO)
            .with_line("CRUST", dec!(1));
        let calculator = DirectBreakdownCalculator::new(&source, CostConfig::default());

        let breakdown = calculator.breakdown(&bom, year_2024()).unwrap();

        assert!(breakdown.lines[0].degenerate);
        assert_eq!(breakdown.lines[0].multiplier, None);
        assert_eq!(breakdown.lines[0].unit_cost, dec!(13));
        assert_eq!(breakdown.total_cost, Decimal::ZERO);
    }

    #[test]
    fn test_missing_bom() {
        let source = source();
        let calculator = DirectBreakdownCalculator::new(&source, CostConfig::default());
        assert!(calculator
            .breakdown_bom("BOM-NONE", year_2024())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_data_source_failure_propagates() {
        let source = UnreachableSource;
        let calculator = DirectBreakdownCalculator::new(&source, CostConfig::default());
        let result = calculator.breakdown_bom("BOM-PIE", year_2024());
        assert!(matches!(result, Err(CostError::DataSource(_))));
    }
}
