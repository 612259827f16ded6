//! 記憶體資料來源（測試與示例用）

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::source::{average, CostDataSource};
use crate::{
    BillOfMaterials, BomType, Component, CostLot, DateWindow, PurchaseLine, PurchaseLineState,
};

/// 記憶體資料來源
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    components: BTreeMap<String, Component>,
    boms: Vec<BillOfMaterials>,
    purchase_lines: Vec<PurchaseLine>,
    valuation_layers: BTreeMap<String, Vec<CostLot>>,
}

impl InMemorySource {
    /// 創建空的資料來源
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加物料
    pub fn add_component(&mut self, component: Component) {
        self.components
            .insert(component.component_id.clone(), component);
    }

    /// 添加 BOM
    pub fn add_bom(&mut self, mut bom: BillOfMaterials) {
        bom.sort_lines();
        self.boms.push(bom);
    }

    /// 添加採購行
    pub fn add_purchase_line(&mut self, line: PurchaseLine) {
        self.purchase_lines.push(line);
    }

    /// 添加估價層（保持時間升冪，同一時間依插入順序）
    pub fn add_valuation_layer(&mut self, component_id: &str, lot: CostLot) {
        let layers = self
            .valuation_layers
            .entry(component_id.to_string())
            .or_default();
        let position = layers.partition_point(|l| l.created_at <= lot.created_at);
        layers.insert(position, lot);
    }

    /// 建構器模式：添加物料
    pub fn with_component(mut self, component: Component) -> Self {
        self.add_component(component);
        self
    }

    /// 建構器模式：添加 BOM
    pub fn with_bom(mut self, bom: BillOfMaterials) -> Self {
        self.add_bom(bom);
        self
    }

    /// 建構器模式：添加採購行
    pub fn with_purchase_line(mut self, line: PurchaseLine) -> Self {
        self.add_purchase_line(line);
        self
    }

    /// 建構器模式：添加估價層
    pub fn with_valuation_layer(mut self, component_id: &str, lot: CostLot) -> Self {
        self.add_valuation_layer(component_id, lot);
        self
    }

    fn matching_purchase_lines<'a>(
        &'a self,
        component_id: &'a str,
        window: &'a DateWindow,
        states: &'a [PurchaseLineState],
    ) -> impl Iterator<Item = &'a PurchaseLine> + 'a {
        self.purchase_lines.iter().filter(move |line| {
            line.component_id == component_id
                && states.contains(&line.state)
                && window.contains(line.created_at)
        })
    }

    fn layers_in_window<'a>(
        &'a self,
        component_id: &str,
        window: &'a DateWindow,
    ) -> impl Iterator<Item = &'a CostLot> + 'a {
        self.valuation_layers
            .get(component_id)
            .into_iter()
            .flatten()
            .filter(move |lot| window.contains(lot.created_at))
    }
}

impl CostDataSource for InMemorySource {
    fn find_component(&self, component_id: &str) -> crate::Result<Option<Component>> {
        Ok(self.components.get(component_id).cloned())
    }

    fn find_component_by_code(&self, code: &str) -> crate::Result<Option<Component>> {
        Ok(self
            .components
            .values()
            .find(|c| c.code.as_deref() == Some(code))
            .cloned())
    }

    fn list_components(&self) -> crate::Result<Vec<Component>> {
        Ok(self.components.values().cloned().collect())
    }

    fn find_active_bom(
        &self,
        product_id: &str,
        bom_type: BomType,
    ) -> crate::Result<Option<BillOfMaterials>> {
        Ok(self
            .boms
            .iter()
            .find(|bom| bom.product_id == product_id && bom.matches(bom_type))
            .cloned())
    }

    fn find_bom(&self, bom_id: &str) -> crate::Result<Option<BillOfMaterials>> {
        Ok(self.boms.iter().find(|bom| bom.bom_id == bom_id).cloned())
    }

    fn average_purchase_price(
        &self,
        component_id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> crate::Result<Option<Decimal>> {
        Ok(average(
            self.matching_purchase_lines(component_id, window, states)
                .map(|line| line.price_unit),
        ))
    }

    fn count_purchase_lines(
        &self,
        component_id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> crate::Result<usize> {
        Ok(self
            .matching_purchase_lines(component_id, window, states)
            .count())
    }

    fn average_valuation_cost(
        &self,
        component_id: &str,
        window: &DateWindow,
    ) -> crate::Result<Option<Decimal>> {
        Ok(average(
            self.layers_in_window(component_id, window)
                .map(|lot| lot.unit_cost),
        ))
    }

    fn count_valuation_layers(
        &self,
        component_id: &str,
        window: &DateWindow,
    ) -> crate::Result<usize> {
        Ok(self.layers_in_window(component_id, window).count())
    }

    fn valuation_history(&self, component_id: &str) -> crate::Result<Vec<CostLot>> {
        Ok(self
            .valuation_layers
            .get(component_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal_macros::dec;

    fn at(month: u32, day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, month, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::calendar_year(2024).unwrap()
    }

    #[test]
    fn test_purchase_price_filters_state_and_window() {
        let states = [PurchaseLineState::Purchase, PurchaseLineState::Done];
        let source = InMemorySource::new()
            .with_purchase_line(PurchaseLine::new("FLOUR".to_string(), dec!(10), at(2, 1)))
            .with_purchase_line(
                PurchaseLine::new("FLOUR".to_string(), dec!(20), at(3, 1))
                    .with_state(PurchaseLineState::Done),
            )
            .with_purchase_line(
                PurchaseLine::new("FLOUR".to_string(), dec!(99), at(4, 1))
                    .with_state(PurchaseLineState::Draft),
            )
            .with_purchase_line(PurchaseLine::new(
                "FLOUR".to_string(),
                dec!(99),
                NaiveDate::from_ymd_opt(2025, 1, 2)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ));

        assert_eq!(
            source
                .average_purchase_price("FLOUR", &window(), &states)
                .unwrap(),
            Some(dec!(15))
        );
        assert_eq!(
            source
                .count_purchase_lines("FLOUR", &window(), &states)
                .unwrap(),
            2
        );
        assert_eq!(
            source
                .average_purchase_price("SUGAR", &window(), &states)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_valuation_history_is_time_ordered() {
        let source = InMemorySource::new()
            .with_valuation_layer("SUGAR", CostLot::new(dec!(5), dec!(3), at(5, 1)))
            .with_valuation_layer("SUGAR", CostLot::new(dec!(5), dec!(1), at(1, 1)))
            .with_valuation_layer("SUGAR", CostLot::new(dec!(-2), dec!(1), at(5, 1)));

        let history = source.valuation_history("SUGAR").unwrap();
        let costs: Vec<Decimal> = history.iter().map(|l| l.unit_cost).collect();
        let quantities: Vec<Decimal> = history.iter().map(|l| l.quantity).collect();

        assert_eq!(costs, vec![dec!(1), dec!(3), dec!(1)]);
        assert_eq!(quantities, vec![dec!(5), dec!(5), dec!(-2)]);
        assert_eq!(
            source.average_valuation_cost("SUGAR", &window()).unwrap(),
            Some(dec!(5) / dec!(3))
        );
        assert!(source.valuation_history("SALT").unwrap().is_empty());
    }

    #[test]
    fn test_find_active_bom() {
        let source = InMemorySource::new()
            .with_bom(BillOfMaterials::new("OLD".to_string(), "BIKE".to_string()).inactive())
            .with_bom(
                BillOfMaterials::new("KIT".to_string(), "BIKE".to_string())
                    .with_bom_type(BomType::Phantom),
            )
            .with_bom(BillOfMaterials::new("STD".to_string(), "BIKE".to_string()));

        let bom = source.find_active_bom("BIKE", BomType::Normal).unwrap();
        assert_eq!(bom.map(|b| b.bom_id), Some("STD".to_string()));
        assert!(source.find_active_bom("FRAME", BomType::Normal).unwrap().is_none());
        assert!(source.find_bom("OLD").unwrap().is_some());
    }

    #[test]
    fn test_find_component_by_code() {
        let source = InMemorySource::new().with_component(
            Component::new("42".to_string(), "Bike".to_string(), "Unit".to_string())
                .with_code("BIKE-001".to_string()),
        );

        let found = source.find_component_by_code("BIKE-001").unwrap();
        assert_eq!(found.map(|c| c.component_id), Some("42".to_string()));
        assert!(source.find_component_by_code("BIKE-002").unwrap().is_none());
    }
}
