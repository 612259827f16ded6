//! 測試輔助

use chrono::{NaiveDate, NaiveDateTime};
use cost_core::{
    BillOfMaterials, BomType, Component, CostDataSource, CostError, CostLot, DateWindow,
    PurchaseLineState,
};
use rust_decimal::Decimal;

pub fn component(id: &str) -> Component {
    Component::new(id.to_string(), id.to_lowercase(), "Unit".to_string())
}

pub fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
}

fn unreachable<T>() -> cost_core::Result<T> {
    Err(CostError::DataSource("connection refused".to_string()))
}

/// 查詢一律失敗的資料來源
pub struct UnreachableSource;

impl CostDataSource for UnreachableSource {
    fn find_component(&self, _: &str) -> cost_core::Result<Option<Component>> {
        unreachable()
    }

    fn find_component_by_code(&self, _: &str) -> cost_core::Result<Option<Component>> {
        unreachable()
    }

    fn list_components(&self) -> cost_core::Result<Vec<Component>> {
        unreachable()
    }

    fn find_active_bom(&self, _: &str, _: BomType) -> cost_core::Result<Option<BillOfMaterials>> {
        unreachable()
    }

    fn find_bom(&self, _: &str) -> cost_core::Result<Option<BillOfMaterials>> {
        unreachable()
    }

    fn average_purchase_price(
        &self,
        _: &str,
        _: &DateWindow,
        _: &[PurchaseLineState],
    ) -> cost_core::Result<Option<Decimal>> {
        unreachable()
    }

    fn count_purchase_lines(
        &self,
        _: &str,
        _: &DateWindow,
        _: &[PurchaseLineState],
    ) -> cost_core::Result<usize> {
        unreachable()
    }

    fn average_valuation_cost(&self, _: &str, _: &DateWindow) -> cost_core::Result<Option<Decimal>> {
        unreachable()
    }

    fn count_valuation_layers(&self, _: &str, _: &DateWindow) -> cost_core::Result<usize> {
        unreachable()
    }

    fn valuation_history(&self, _: &str) -> cost_core::Result<Vec<CostLot>> {
        unreachable()
    }
}

/// 只有估價層查詢失敗的資料來源（BOM 結構正常）
pub struct FlakyValuationSource<'a> {
    pub inner: &'a dyn CostDataSource,
}

impl CostDataSource for FlakyValuationSource<'_> {
    fn find_component(&self, id: &str) -> cost_core::Result<Option<Component>> {
        self.inner.find_component(id)
    }

    fn find_component_by_code(&self, code: &str) -> cost_core::Result<Option<Component>> {
        self.inner.find_component_by_code(code)
    }

    fn list_components(&self) -> cost_core::Result<Vec<Component>> {
        self.inner.list_components()
    }

    fn find_active_bom(
        &self,
        product_id: &str,
        bom_type: BomType,
    ) -> cost_core::Result<Option<BillOfMaterials>> {
        self.inner.find_active_bom(product_id, bom_type)
    }

    fn find_bom(&self, bom_id: &str) -> cost_core::Result<Option<BillOfMaterials>> {
        self.inner.find_bom(bom_id)
    }

    fn average_purchase_price(
        &self,
        id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> cost_core::Result<Option<Decimal>> {
        self.inner.average_purchase_price(id, window, states)
    }

    fn count_purchase_lines(
        &self,
        id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> cost_core::Result<usize> {
        self.inner.count_purchase_lines(id, window, states)
    }

    fn average_valuation_cost(&self, _: &str, _: &DateWindow) -> cost_core::Result<Option<Decimal>> {
        unreachable()
    }

    fn count_valuation_layers(&self, _: &str, _: &DateWindow) -> cost_core::Result<usize> {
        unreachable()
    }

    fn valuation_history(&self, _: &str) -> cost_core::Result<Vec<CostLot>> {
        unreachable()
    }
}
