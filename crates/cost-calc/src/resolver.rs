//! 單位成本解析
//!
//! 依序嘗試各成本訊號，第一個有結果者勝出：
//! 區間內採購行平均單價 → 區間內估價層平均成本 → 0（來源 `none`）

use cost_core::{
    CostConfig, CostDataSource, CostSource, DateWindow, PurchaseLineState, ResolvedCost,
};
use rust_decimal::Decimal;

/// 成本訊號
pub trait CostSignal {
    /// 訊號對應的成本來源
    fn source(&self) -> CostSource;

    /// 查詢區間內的單位成本，無資料時返回 `None`
    fn lookup(
        &self,
        data: &dyn CostDataSource,
        component_id: &str,
        window: &DateWindow,
    ) -> cost_core::Result<Option<Decimal>>;
}

/// 採購價訊號：指定狀態採購行的平均單價
#[derive(Debug, Clone)]
pub struct PurchasePriceSignal {
    states: Vec<PurchaseLineState>,
}

impl PurchasePriceSignal {
    pub fn new(states: Vec<PurchaseLineState>) -> Self {
        Self { states }
    }
}

impl Default for PurchasePriceSignal {
    fn default() -> Self {
        Self::new(vec![PurchaseLineState::Purchase, PurchaseLineState::Done])
    }
}

impl CostSignal for PurchasePriceSignal {
    fn source(&self) -> CostSource {
        CostSource::PurchasePrice
    }

    fn lookup(
        &self,
        data: &dyn CostDataSource,
        component_id: &str,
        window: &DateWindow,
    ) -> cost_core::Result<Option<Decimal>> {
        data.average_purchase_price(component_id, window, &self.states)
    }
}

/// 估價層訊號：估價層平均單位成本
#[derive(Debug, Clone, Copy, Default)]
pub struct ValuationLayerSignal;

impl CostSignal for ValuationLayerSignal {
    fn source(&self) -> CostSource {
        CostSource::ValuationLayer
    }

    fn lookup(
        &self,
        data: &dyn CostDataSource,
        component_id: &str,
        window: &DateWindow,
    ) -> cost_core::Result<Option<Decimal>> {
        data.average_valuation_cost(component_id, window)
    }
}

/// 成本解析器
pub struct CostResolver<'a> {
    source: &'a dyn CostDataSource,
    signals: Vec<Box<dyn CostSignal>>,
}

impl<'a> CostResolver<'a> {
    /// 使用預設訊號鏈（採購價 → 估價層）
    pub fn new(source: &'a dyn CostDataSource, config: &CostConfig) -> Self {
        let signals: Vec<Box<dyn CostSignal>> = vec![
            Box::new(PurchasePriceSignal::new(config.purchase_states.clone())),
            Box::new(ValuationLayerSignal),
        ];
        Self::with_signals(source, signals)
    }

    /// 使用自訂訊號鏈
    pub fn with_signals(source: &'a dyn CostDataSource, signals: Vec<Box<dyn CostSignal>>) -> Self {
        Self { source, signals }
    }

    /// 解析物料在區間內的單位成本
    ///
    /// 查無任何訊號時返回 0 並標記來源為 `none`，不視為錯誤；
    /// 資料來源查詢失敗則直接傳遞錯誤
    pub fn resolve(
        &self,
        component_id: &str,
        window: &DateWindow,
    ) -> cost_core::Result<ResolvedCost> {
        for signal in &self.signals {
            if let Some(unit_cost) = signal.lookup(self.source, component_id, window)? {
                tracing::debug!(
                    "物料 {} 成本 {} 來源 {} ({})",
                    component_id,
                    unit_cost,
                    signal.source(),
                    window
                );
                return Ok(ResolvedCost::new(
                    component_id.to_string(),
                    unit_cost,
                    signal.source(),
                    Some(*window),
                ));
            }
        }

        tracing::debug!("物料 {} 在 {} 無成本資料", component_id, window);
        Ok(ResolvedCost::missing(component_id.to_string(), Some(*window)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use crate::testing::UnreachableSource;
    use cost_core::{CostError, CostLot, InMemorySource, PurchaseLine};
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::calendar_year(2024).unwrap()
    }

    fn source() -> InMemorySource {
        InMemorySource::new()
            // 兩種訊號都有
            .with_purchase_line(PurchaseLine::new("FLOUR".to_string(), dec!(30), at(2, 1)))
            .with_purchase_line(
                PurchaseLine::new("FLOUR".to_string(), dec!(34), at(6, 1))
                    .with_state(PurchaseLineState::Done),
            )
            .with_valuation_layer("FLOUR", CostLot::new(dec!(10), dec!(28), at(2, 2)))
            // 只有估價層
            .with_valuation_layer("SUGAR", CostLot::new(dec!(10), dec!(18), at(3, 1)))
            .with_valuation_layer("SUGAR", CostLot::new(dec!(-4), dec!(22), at(4, 1)))
            // 採購行只有草稿狀態，估價層在區間外
            .with_purchase_line(
                PurchaseLine::new("SALT".to_string(), dec!(5), at(5, 1))
                    .with_state(PurchaseLineState::Draft),
            )
            .with_valuation_layer(
                "SALT",
                CostLot::new(
                    dec!(1),
                    dec!(6),
                    NaiveDate::from_ymd_opt(2023, 12, 31)
                        .unwrap()
                        .and_hms_opt(23, 0, 0)
                        .unwrap(),
                ),
            )
    }

    #[rstest]
    #[case("FLOUR", dec!(32), CostSource::PurchasePrice)]
    #[case("SUGAR", dec!(20), CostSource::ValuationLayer)]
    #[case("SALT", dec!(0), CostSource::None)]
    #[case("WATER", dec!(0), CostSource::None)]
    fn test_resolver_precedence(
        #[case] component_id: &str,
        #[case] expected_cost: Decimal,
        #[case] expected_source: CostSource,
    ) {
        let source = source();
        let resolver = CostResolver::new(&source, &CostConfig::default());

        let resolved = resolver.resolve(component_id, &window()).unwrap();

        assert_eq!(resolved.component_id, component_id);
        assert_eq!(resolved.unit_cost, expected_cost);
        assert_eq!(resolved.source, expected_source);
        assert_eq!(resolved.window, Some(window()));
    }

    #[test]
    fn test_configured_purchase_states() {
        let source = source();
        let config = CostConfig::default().with_purchase_states(vec![PurchaseLineState::Done]);
        let resolver = CostResolver::new(&source, &config);

        let resolved = resolver.resolve("FLOUR", &window()).unwrap();
        assert_eq!(resolved.unit_cost, dec!(34));
    }

    #[test]
    fn test_custom_signal_chain() {
        let source = source();
        let signals: Vec<Box<dyn CostSignal>> = vec![Box::new(ValuationLayerSignal)];
        let resolver = CostResolver::with_signals(&source, signals);

        let resolved = resolver.resolve("FLOUR", &window()).unwrap();
        assert_eq!(resolved.unit_cost, dec!(28));
        assert_eq!(resolved.source, CostSource::ValuationLayer);
    }

    #[test]
    fn test_data_source_failure_propagates() {
        let source = UnreachableSource;
        let resolver = CostResolver::new(&source, &CostConfig::default());

        let result = resolver.resolve("FLOUR", &window());
        assert!(matches!(result, Err(CostError::DataSource(_))));
    }
}
