//! 外部資料來源契約（唯讀）
//!
//! 引擎不擁有持久層，只透過此 trait 讀取 ERP 資料。每個實作的查詢失敗
//! 一律以 [`CostError::DataSource`](crate::CostError::DataSource) 回報。

use rust_decimal::Decimal;

use crate::{
    BillOfMaterials, BomType, Component, CostError, CostLot, DateWindow, PurchaseLineState,
};

/// 成本計算所需的唯讀資料來源
pub trait CostDataSource {
    /// 依物料ID查詢
    fn find_component(&self, component_id: &str) -> crate::Result<Option<Component>>;

    /// 依料號查詢
    fn find_component_by_code(&self, code: &str) -> crate::Result<Option<Component>>;

    /// 列出所有物料
    fn list_components(&self) -> crate::Result<Vec<Component>>;

    /// 查詢父件的啟用 BOM（符合類型者，最多一張）
    fn find_active_bom(
        &self,
        product_id: &str,
        bom_type: BomType,
    ) -> crate::Result<Option<BillOfMaterials>>;

    /// 依 BOM ID 查詢（不論啟用狀態）
    fn find_bom(&self, bom_id: &str) -> crate::Result<Option<BillOfMaterials>>;

    /// 區間內指定狀態採購行的平均單價，無資料時返回 `None`
    fn average_purchase_price(
        &self,
        component_id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> crate::Result<Option<Decimal>>;

    /// 區間內指定狀態採購行的筆數
    fn count_purchase_lines(
        &self,
        component_id: &str,
        window: &DateWindow,
        states: &[PurchaseLineState],
    ) -> crate::Result<usize>;

    /// 區間內估價層的平均單位成本，無資料時返回 `None`
    fn average_valuation_cost(
        &self,
        component_id: &str,
        window: &DateWindow,
    ) -> crate::Result<Option<Decimal>>;

    /// 區間內估價層的筆數
    fn count_valuation_layers(&self, component_id: &str, window: &DateWindow)
        -> crate::Result<usize>;

    /// 物料的完整異動歷史（依建立時間升冪）
    fn valuation_history(&self, component_id: &str) -> crate::Result<Vec<CostLot>>;

    /// 依物料ID查詢，不存在視為錯誤
    fn require_component(&self, component_id: &str) -> crate::Result<Component> {
        self.find_component(component_id)?
            .ok_or_else(|| CostError::ComponentNotFound(component_id.to_string()))
    }

    /// 依 BOM ID 查詢，不存在視為錯誤
    fn require_bom(&self, bom_id: &str) -> crate::Result<BillOfMaterials> {
        self.find_bom(bom_id)?
            .ok_or_else(|| CostError::BomNotFound(bom_id.to_string()))
    }
}

/// 算術平均，空集合返回 `None`
pub fn average<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let (sum, count) = values
        .into_iter()
        .fold((Decimal::ZERO, 0u32), |(sum, count), v| (sum + v, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / Decimal::from(count))
    }
}
